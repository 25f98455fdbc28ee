use super::{check_batch_size, check_receive_size, BatchAck, BatchEntry, QueueTransport, ReceivedMessage};
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_sqs::{
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    operation::{receive_message::ReceiveMessageError, send_message_batch::SendMessageBatchError},
    types::SendMessageBatchRequestEntry,
    Client,
};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, info, instrument};

/// Connection settings for Amazon SQS (or a compatible endpoint such as LocalStack)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqsConfig {
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Long-poll wait per receive; 0 returns immediately when the queue is empty
    pub wait_time_secs: i32,
}

impl Default for SqsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            wait_time_secs: 0,
        }
    }
}

impl SqsConfig {
    pub fn from_env() -> Result<Self> {
        let wait_time_secs = match env::var("SQS_WAIT_TIME_SECS") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| IngestError::config(format!("SQS_WAIT_TIME_SECS has an invalid value: '{}'", raw)))?,
            Err(_) => 0,
        };
        if !(0..=20).contains(&wait_time_secs) {
            return Err(IngestError::config("SQS_WAIT_TIME_SECS must be between 0 and 20"));
        }

        Ok(Self {
            region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint: env::var("SQS_ENDPOINT").ok(),
            access_key: env::var("SQS_ACCESS_KEY").ok(),
            secret_key: env::var("SQS_SECRET_KEY").ok(),
            wait_time_secs,
        })
    }

    /// Settings for a local SQS-compatible endpoint with static test credentials
    pub fn for_local(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            access_key: Some("test".to_string()),
            secret_key: Some("test".to_string()),
            ..Self::default()
        }
    }
}

/// [`QueueTransport`] backed by Amazon SQS
#[derive(Clone)]
pub struct SqsTransport {
    client: Client,
    wait_time_secs: i32,
}

impl SqsTransport {
    pub async fn new(config: SqsConfig) -> Self {
        debug!(region = %config.region, endpoint = ?config.endpoint, "Initializing SQS transport");

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "offerflow-sqs",
            ));
        }

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let shared = loader.load().await;
        info!(region = %config.region, "SQS transport initialized");

        Self {
            client: Client::new(&shared),
            wait_time_secs: config.wait_time_secs,
        }
    }
}

#[async_trait]
impl QueueTransport for SqsTransport {
    #[instrument(skip(self))]
    async fn receive(&self, queue_url: &str, max_messages: usize) -> Result<Vec<ReceivedMessage>> {
        check_receive_size(max_messages)?;

        let output = self
            .client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(max_messages as i32)
            .wait_time_seconds(self.wait_time_secs)
            .send()
            .await
            .map_err(|err| receive_error(queue_url, err))?;

        let messages = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|message| ReceivedMessage {
                message_id: message.message_id.unwrap_or_default(),
                body: message.body.unwrap_or_default(),
            })
            .collect::<Vec<_>>();

        debug!(count = messages.len(), "Received messages from SQS");
        Ok(messages)
    }

    #[instrument(skip(self, entries), fields(entries = entries.len()))]
    async fn send_batch(&self, queue_url: &str, entries: Vec<BatchEntry>) -> Result<Vec<BatchAck>> {
        check_batch_size(entries.len())?;

        let request_entries = entries
            .into_iter()
            .map(|entry| {
                SendMessageBatchRequestEntry::builder()
                    .id(entry.id)
                    .message_body(entry.body)
                    .build()
                    .map_err(|err| IngestError::transport(format!("invalid batch entry: {}", err)))
            })
            .collect::<Result<Vec<_>>>()?;

        let output = self
            .client
            .send_message_batch()
            .queue_url(queue_url)
            .set_entries(Some(request_entries))
            .send()
            .await
            .map_err(|err| send_error(queue_url, err))?;

        let delivered = output.successful().iter().map(|entry| BatchAck::Delivered {
            id: entry.id().to_string(),
            message_id: entry.message_id().to_string(),
            md5_of_body: entry.md5_of_message_body().to_string(),
        });
        let rejected = output.failed().iter().map(|entry| BatchAck::Rejected {
            id: entry.id().to_string(),
            code: entry.code().to_string(),
            message: entry.message().unwrap_or_default().to_string(),
            sender_fault: entry.sender_fault(),
        });

        Ok(delivered.chain(rejected).collect())
    }
}

fn receive_error<R>(queue_url: &str, err: SdkError<ReceiveMessageError, R>) -> IngestError
where
    R: std::fmt::Debug + Send + Sync + 'static,
{
    match err.into_service_error() {
        ReceiveMessageError::QueueDoesNotExist(inner) => {
            IngestError::queue_unavailable(queue_url, DisplayErrorContext(&inner))
        },
        other => IngestError::transport(format!(
            "receive from {} failed ({}): {}",
            queue_url,
            other.code().unwrap_or("unknown"),
            DisplayErrorContext(&other)
        )),
    }
}

fn send_error<R>(queue_url: &str, err: SdkError<SendMessageBatchError, R>) -> IngestError
where
    R: std::fmt::Debug + Send + Sync + 'static,
{
    match err.into_service_error() {
        SendMessageBatchError::QueueDoesNotExist(inner) => {
            IngestError::queue_unavailable(queue_url, DisplayErrorContext(&inner))
        },
        SendMessageBatchError::EmptyBatchRequest(_) => IngestError::EmptyBatchRejected,
        SendMessageBatchError::TooManyEntriesInBatchRequest(_) => IngestError::TransportLimitExceeded {
            requested: super::TRANSPORT_BATCH_CEILING + 1,
            ceiling: super::TRANSPORT_BATCH_CEILING,
        },
        other => IngestError::transport(format!(
            "send batch to {} failed ({}): {}",
            queue_url,
            other.code().unwrap_or("unknown"),
            DisplayErrorContext(&other)
        )),
    }
}
