//! Combination records.

use crate::{OutboxError, OutboxResult};
use serde::{Deserialize, Serialize};

/// Number of flavors in one combination.
pub const FLAVORS_PER_COMBINATION: usize = 3;

/// A single rating submission captured at the kiosk.
///
/// Once enqueued a combination is immutable; it is serialized unchanged on
/// every delivery attempt so the server sees an identical payload each time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combination {
    /// Flavor identifiers, in selection order.
    pub flavor_ids: [String; FLAVORS_PER_COMBINATION],
    /// Identifier of the submitting user.
    pub user_id: String,
    /// Rating on the 1-5 kiosk scale.
    pub rating: u8,
    /// Free-text comment.
    pub comment: String,
}

impl Combination {
    /// Build a combination from the producer's buffers.
    ///
    /// Identifiers are copied into owned strings so the queue never aliases
    /// producer state the kiosk may still mutate, and the rating is checked
    /// against the 1-5 scale.
    pub fn new(
        flavor_ids: [&str; FLAVORS_PER_COMBINATION],
        user_id: &str,
        rating: u8,
        comment: &str,
    ) -> OutboxResult<Self> {
        if !(1..=5).contains(&rating) {
            return Err(OutboxError::InvalidRating(rating));
        }

        Ok(Self {
            flavor_ids: flavor_ids.map(str::to_string),
            user_id: user_id.to_string(),
            rating,
            comment: comment.to_string(),
        })
    }
}
