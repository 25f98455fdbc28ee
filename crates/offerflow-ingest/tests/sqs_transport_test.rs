//! SqsTransport against a mocked SQS JSON endpoint

#![allow(clippy::unwrap_used, clippy::expect_used)]

use offerflow_common::checksum::fingerprint;
use offerflow_ingest::transport::{BatchAck, BatchEntry};
use offerflow_ingest::{IngestError, QueueTransport, SqsConfig, SqsTransport};
use serde_json::{json, Value};
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AMZ_JSON: &str = "application/x-amz-json-1.0";

async fn transport(server: &MockServer) -> SqsTransport {
    SqsTransport::new(SqsConfig::for_local(server.uri())).await
}

fn queue_url(server: &MockServer) -> String {
    format!("{}/000000000000/offers", server.uri())
}

fn entries(count: usize) -> Vec<BatchEntry> {
    (0..count)
        .map(|i| BatchEntry {
            id: i.to_string(),
            body: format!("{{\"id\":{}}}", i),
        })
        .collect()
}

fn service_error(shape: &str) -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_raw(
        json!({ "__type": format!("com.amazonaws.sqs#{}", shape), "message": "mocked failure" }).to_string(),
        AMZ_JSON,
    )
}

async fn mount(server: &MockServer, operation: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(header("x-amz-target", format!("AmazonSQS.{}", operation).as_str()))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_receive_from_missing_queue_is_queue_unavailable() {
    let server = MockServer::start().await;
    mount(&server, "ReceiveMessage", service_error("QueueDoesNotExist")).await;

    let err = transport(&server)
        .await
        .receive(&queue_url(&server), 10)
        .await
        .unwrap_err();

    match err {
        IngestError::QueueUnavailable { queue, .. } => assert_eq!(queue, queue_url(&server)),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_send_to_missing_queue_is_queue_unavailable() {
    let server = MockServer::start().await;
    mount(&server, "SendMessageBatch", service_error("QueueDoesNotExist")).await;

    let err = transport(&server)
        .await
        .send_batch(&queue_url(&server), entries(2))
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::QueueUnavailable { .. }));
}

#[tokio::test]
async fn test_service_empty_batch_is_empty_batch_rejected() {
    let server = MockServer::start().await;
    mount(&server, "SendMessageBatch", service_error("EmptyBatchRequest")).await;

    let err = transport(&server)
        .await
        .send_batch(&queue_url(&server), entries(1))
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::EmptyBatchRejected));
}

#[tokio::test]
async fn test_service_too_many_entries_is_transport_limit_exceeded() {
    let server = MockServer::start().await;
    mount(&server, "SendMessageBatch", service_error("TooManyEntriesInBatchRequest")).await;

    let err = transport(&server)
        .await
        .send_batch(&queue_url(&server), entries(10))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IngestError::TransportLimitExceeded {
            requested: 11,
            ceiling: 10
        }
    ));
}

#[tokio::test]
async fn test_other_service_error_is_transport_error_with_code() {
    let server = MockServer::start().await;
    mount(&server, "SendMessageBatch", service_error("InvalidAddress")).await;

    let err = transport(&server)
        .await
        .send_batch(&queue_url(&server), entries(1))
        .await
        .unwrap_err();

    match err {
        IngestError::Transport(message) => assert!(message.contains("InvalidAddress"), "{message}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_send_batch_maps_successful_and_failed_entries() {
    let server = MockServer::start().await;
    let batch = entries(2);
    let body: Value = json!({
        "Successful": [{
            "Id": "0",
            "MessageId": "m-0",
            "MD5OfMessageBody": fingerprint(batch[0].body.as_bytes())
        }],
        "Failed": [{
            "Id": "1",
            "SenderFault": true,
            "Code": "InvalidMessageContents",
            "Message": "bad body"
        }]
    });
    mount(
        &server,
        "SendMessageBatch",
        ResponseTemplate::new(200).set_body_raw(body.to_string(), AMZ_JSON),
    )
    .await;

    let acks = transport(&server)
        .await
        .send_batch(&queue_url(&server), batch.clone())
        .await
        .unwrap();

    assert_eq!(acks.len(), 2);
    assert!(acks.contains(&BatchAck::Delivered {
        id: "0".to_string(),
        message_id: "m-0".to_string(),
        md5_of_body: fingerprint(batch[0].body.as_bytes()),
    }));
    assert!(acks.contains(&BatchAck::Rejected {
        id: "1".to_string(),
        code: "InvalidMessageContents".to_string(),
        message: "bad body".to_string(),
        sender_fault: true,
    }));
}
