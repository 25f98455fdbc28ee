//! League filter

use super::taxonomy::LeagueSet;
use offerflow_common::types::Offer;
use tracing::debug;

/// Keep offers whose league id is a taxonomy leaf, preserving input order.
pub fn filter_offers(offers: Vec<Offer>, leagues: &LeagueSet) -> Vec<Offer> {
    offers
        .into_iter()
        .filter(|offer| {
            let keep = leagues.contains(offer.league_id);
            if !keep {
                debug!(offer_id = offer.id, league_id = offer.league_id, "Dropping offer for unsupported league");
            }
            keep
        })
        .collect()
}
