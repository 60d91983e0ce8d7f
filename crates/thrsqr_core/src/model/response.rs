//! Participant response records and derived counts.
//!
//! # Invariants
//! - At most one `Response` exists per (event, participant) pair.
//! - `Tally::going + Tally::not_going` equals the number of tallied responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable participant identity, allocated on first contact.
pub type ParticipantId = Uuid;

/// One participant's answer for the current occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub participant_id: ParticipantId,
    pub display_name: String,
    pub attending: bool,
    pub comment: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Going / not-going counts for a response sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub going: usize,
    pub not_going: usize,
}

impl Tally {
    /// Counts attending responses; everything else is "not going".
    pub fn from_responses(responses: &[Response]) -> Self {
        let going = responses
            .iter()
            .filter(|response| response.attending)
            .count();
        Self {
            going,
            not_going: responses.len() - going,
        }
    }

    pub fn total(&self) -> usize {
        self.going + self.not_going
    }
}

#[cfg(test)]
mod tests {
    use super::{Response, Tally};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn response(attending: bool) -> Response {
        Response {
            participant_id: Uuid::new_v4(),
            display_name: "kim".to_string(),
            attending,
            comment: None,
            updated_at: Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_sequence_tallies_to_zero() {
        assert_eq!(Tally::from_responses(&[]), Tally::default());
    }

    #[test]
    fn counts_sum_to_sequence_length() {
        let responses = vec![response(true), response(false), response(true)];
        let tally = Tally::from_responses(&responses);
        assert_eq!(tally.going, 2);
        assert_eq!(tally.not_going, 1);
        assert_eq!(tally.total(), responses.len());
    }
}
