//! Problem and user records as the persistence layer hands them out.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::ReportError;
use crate::ids::{ProblemId, UserId};

/// Lifecycle of a tracked problem. The three states are exhaustive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemStatus {
    Pending,
    Started,
    Done,
}

impl ProblemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Started => "started",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for ProblemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProblemStatus {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "started" => Ok(Self::Started),
            "done" => Ok(Self::Done),
            other => Err(ReportError::Validation(format!("unknown problem status: {other}"))),
        }
    }
}

/// Free-form metadata attached to a problem.
///
/// `rating` is normalized to a canonical label while deserializing, see
/// [`rating_label`]. `tags` keeps the stored order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_rating",
        skip_serializing_if = "Option::is_none"
    )]
    pub rating: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_tags",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tags: Vec<String>,
}

impl ProblemMetadata {
    pub fn with_rating(mut self, rating: impl Into<String>) -> Self {
        self.rating = Some(rating.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Canonical string label for a raw rating value.
///
/// Numbers print without a fractional part when they are integral, strings
/// are kept verbatim. Absent, `null`, `false`, zero and empty-string ratings
/// never form a bucket and map to `None`.
pub fn rating_label(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some("true".to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                (i != 0).then(|| i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                let f = n.as_f64()?;
                if f == 0.0 {
                    None
                } else if f.fract() == 0.0 && f.abs() < 1e15 {
                    Some(format!("{}", f as i64))
                } else {
                    Some(f.to_string())
                }
            }
        }
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn deserialize_rating<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(rating_label(&value))
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect()),
        other => Err(D::Error::custom(format!("tags must be an array, got {other}"))),
    }
}

/// One tracked problem, reduced to what the statistics path reads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemRecord {
    pub id: ProblemId,
    pub status: ProblemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ProblemMetadata>,
}

impl ProblemRecord {
    pub fn new(id: impl Into<ProblemId>, status: ProblemStatus) -> Self {
        Self {
            id: id.into(),
            status,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: ProblemMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn rating(&self) -> Option<&str> {
        self.metadata.as_ref()?.rating.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        self.metadata
            .as_ref()
            .map(|m| m.tags.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn metadata(value: Value) -> ProblemMetadata {
        serde_json::from_value(value).unwrap()
    }

    // ── status ──────────────────────────────────────────────────────

    #[test]
    fn status_round_trips_lowercase() {
        for status in [ProblemStatus::Pending, ProblemStatus::Started, ProblemStatus::Done] {
            let parsed: ProblemStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
            assert_eq!(serde_json::to_value(status).unwrap(), json!(status.as_str()));
        }
    }

    #[test]
    fn unknown_status_is_validation_error() {
        assert_matches!("solved".parse::<ProblemStatus>(), Err(ReportError::Validation(_)));
    }

    // ── rating normalization ────────────────────────────────────────

    #[test]
    fn integer_rating_becomes_label() {
        assert_eq!(rating_label(&json!(1500)), Some("1500".into()));
        assert_eq!(rating_label(&json!(-3)), Some("-3".into()));
    }

    #[test]
    fn integral_float_prints_as_integer() {
        assert_eq!(rating_label(&json!(1500.0)), Some("1500".into()));
        assert_eq!(rating_label(&json!(1500.5)), Some("1500.5".into()));
    }

    #[test]
    fn string_rating_kept_verbatim() {
        assert_eq!(rating_label(&json!("Unrated")), Some("Unrated".into()));
        assert_eq!(rating_label(&json!(" 800")), Some(" 800".into()));
    }

    #[test]
    fn falsy_ratings_are_absent() {
        assert_eq!(rating_label(&json!(null)), None);
        assert_eq!(rating_label(&json!(0)), None);
        assert_eq!(rating_label(&json!(0.0)), None);
        assert_eq!(rating_label(&json!("")), None);
        assert_eq!(rating_label(&json!(false)), None);
        assert_eq!(rating_label(&json!(true)), Some("true".into()));
    }

    // ── metadata deserialization ────────────────────────────────────

    #[test]
    fn metadata_normalizes_numeric_rating() {
        let meta = metadata(json!({"rating": 1200, "tags": ["dp", "math"]}));
        assert_eq!(meta.rating.as_deref(), Some("1200"));
        assert_eq!(meta.tags, vec!["dp", "math"]);
    }

    #[test]
    fn metadata_missing_fields_default() {
        let meta = metadata(json!({"title": "Two Sum"}));
        assert_eq!(meta.title.as_deref(), Some("Two Sum"));
        assert!(meta.rating.is_none());
        assert!(meta.tags.is_empty());
    }

    #[test]
    fn metadata_null_tags_are_empty() {
        let meta = metadata(json!({"rating": null, "tags": null}));
        assert!(meta.rating.is_none());
        assert!(meta.tags.is_empty());
    }

    #[test]
    fn metadata_rejects_non_array_tags() {
        let result = serde_json::from_value::<ProblemMetadata>(json!({"tags": "dp"}));
        assert!(result.is_err());
    }

    #[test]
    fn non_string_tags_are_stringified() {
        let meta = metadata(json!({"tags": ["dp", 2]}));
        assert_eq!(meta.tags, vec!["dp", "2"]);
    }

    // ── record accessors ────────────────────────────────────────────

    #[test]
    fn record_without_metadata_has_no_rating_or_tags() {
        let record = ProblemRecord::new(1, ProblemStatus::Done);
        assert_eq!(record.rating(), None);
        assert!(record.tags().is_empty());
    }

    #[test]
    fn record_builder_sets_metadata() {
        let record = ProblemRecord::new(2, ProblemStatus::Pending).with_metadata(
            ProblemMetadata::default().with_rating("1500").with_tags(["dp"]),
        );
        assert_eq!(record.rating(), Some("1500"));
        assert_eq!(record.tags(), ["dp".to_string()]);
    }
}
