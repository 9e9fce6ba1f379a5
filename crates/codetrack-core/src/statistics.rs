//! Per-request statistics value.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::problem::UserProfile;

/// Label → count, in first-encounter order.
///
/// The order has no display meaning. It is the tie-break every stable
/// ranking falls back to, which keeps chart output deterministic.
pub type Distribution = IndexMap<String, u64>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_problems: u64,
    pub solved_problems: u64,
    pub pending_problems: u64,
    pub started_problems: u64,
    /// Percentage in `[0, 100]`, rounded to two decimals.
    pub completion_rate: f64,
}

impl Summary {
    pub fn has_any_status(&self) -> bool {
        self.solved_problems > 0 || self.started_problems > 0 || self.pending_problems > 0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Distributions {
    pub ratings: Distribution,
    pub tags: Distribution,
}

impl Distributions {
    pub fn record_rating(&mut self, label: &str) {
        bump(&mut self.ratings, label);
    }

    pub fn record_tag(&mut self, tag: &str) {
        bump(&mut self.tags, tag);
    }
}

fn bump(map: &mut Distribution, key: &str) {
    if let Some(count) = map.get_mut(key) {
        *count += 1;
    } else {
        let _ = map.insert(key.to_owned(), 1);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub user: UserProfile,
    pub summary: Summary,
    pub distributions: Distributions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::UserId;
    use serde_json::json;

    #[test]
    fn bump_counts_and_keeps_encounter_order() {
        let mut d = Distributions::default();
        d.record_tag("math");
        d.record_tag("dp");
        d.record_tag("math");
        assert_eq!(d.tags.get("math"), Some(&2));
        assert_eq!(d.tags.keys().collect::<Vec<_>>(), vec!["math", "dp"]);
    }

    #[test]
    fn serializes_camel_case() {
        let stats = Statistics {
            user: UserProfile {
                id: UserId::new(1),
                username: "ada".into(),
                email: "ada@example.com".into(),
            },
            summary: Summary {
                total_problems: 2,
                solved_problems: 1,
                pending_problems: 1,
                started_problems: 0,
                completion_rate: 50.0,
            },
            distributions: Distributions::default(),
        };
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["user"], json!({"id": 1, "username": "ada", "email": "ada@example.com"}));
        assert_eq!(value["summary"]["totalProblems"], 2);
        assert_eq!(value["summary"]["completionRate"], 50.0);
        assert_eq!(value["distributions"], json!({"ratings": {}, "tags": {}}));
    }

    #[test]
    fn has_any_status() {
        assert!(!Summary::default().has_any_status());
        let summary = Summary {
            started_problems: 1,
            ..Summary::default()
        };
        assert!(summary.has_any_status());
    }
}
