//! Event data model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Arbitrary domain payload carried by an event. Opaque to the repository.
pub type Attrs = serde_json::Map<String, serde_json::Value>;

/// Document tag distinguishing event documents from other document kinds.
pub const EVENT_DOCUMENT_TYPE: &str = "event";

/// Identifier of the aggregate an event belongs to.
///
/// Callers may use either numeric or textual identifiers. `Number(1)` and
/// `Text("1")` are distinct aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregateId {
    /// Numeric aggregate identifier.
    Number(i64),
    /// Textual aggregate identifier.
    Text(String),
}

impl AggregateId {
    /// Returns the JSON value used as the aggregate component of an index key.
    #[must_use]
    pub fn to_key(&self) -> serde_json::Value {
        match self {
            Self::Number(n) => serde_json::Value::from(*n),
            Self::Text(s) => serde_json::Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for AggregateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for AggregateId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for AggregateId {
    fn from(value: i32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<String> for AggregateId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for AggregateId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// Opaque ordering token assigned to every event at append time.
///
/// Tokens have a total order. On the wire they are rendered as fixed-width
/// zero-padded decimal strings, so lexicographic order of the encoded form
/// matches numeric order and the token can sit inside a composite index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventTime(u64);

impl EventTime {
    /// Lower sentinel: compares below or equal to every real token.
    pub const MIN: Self = Self(0);

    /// Upper sentinel: compares above or equal to every real token.
    pub const MAX: Self = Self(u64::MAX);

    /// Width of the encoded form (`u64::MAX` has 20 decimal digits).
    pub const ENCODED_WIDTH: usize = 20;

    /// Wraps a raw token value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw token value.
    #[must_use]
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = Self::ENCODED_WIDTH)
    }
}

/// Error returned when a string is not a valid encoded [`EventTime`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid event time token: {0:?}")]
pub struct ParseEventTimeError(pub String);

impl FromStr for EventTime {
    type Err = ParseEventTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseEventTimeError(s.to_owned()));
        }
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| ParseEventTimeError(s.to_owned()))
    }
}

impl Serialize for EventTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// An immutable fact about something that happened to an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Aggregate this event belongs to.
    pub aggregate_id: AggregateId,
    /// Event type discriminator.
    pub name: String,
    /// Ordering token assigned by the repository.
    pub time: EventTime,
    /// Domain payload.
    pub attrs: Attrs,
}

/// One or more event names to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventNames {
    /// A single event name, read straight from its index range.
    Single(String),
    /// A set of names whose streams are merged into one timeline.
    Many(Vec<String>),
}

impl EventNames {
    /// Returns the distinct names in first-occurrence order.
    #[must_use]
    pub fn distinct(&self) -> Vec<&str> {
        match self {
            Self::Single(name) => vec![name.as_str()],
            Self::Many(names) => {
                let mut seen = Vec::with_capacity(names.len());
                for name in names {
                    if !seen.contains(&name.as_str()) {
                        seen.push(name.as_str());
                    }
                }
                seen
            }
        }
    }
}

impl From<&str> for EventNames {
    fn from(value: &str) -> Self {
        Self::Single(value.to_owned())
    }
}

impl From<String> for EventNames {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for EventNames {
    fn from(value: Vec<String>) -> Self {
        Self::Many(value)
    }
}

impl From<Vec<&str>> for EventNames {
    fn from(value: Vec<&str>) -> Self {
        Self::Many(value.into_iter().map(str::to_owned).collect())
    }
}

impl<const N: usize> From<[&str; N]> for EventNames {
    fn from(value: [&str; N]) -> Self {
        Self::Many(value.iter().map(|s| (*s).to_owned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_time_encodes_as_fixed_width_string() {
        assert_eq!(EventTime::from_raw(42).to_string(), "00000000000000000042");
        assert_eq!(EventTime::MAX.to_string(), "18446744073709551615");
        assert_eq!(EventTime::MIN.to_string().len(), EventTime::ENCODED_WIDTH);
    }

    #[test]
    fn test_event_time_encoded_order_matches_numeric_order() {
        let small = EventTime::from_raw(9).to_string();
        let large = EventTime::from_raw(10).to_string();

        assert!(small < large);
        assert!(EventTime::MIN.to_string() < small);
        assert!(large < EventTime::MAX.to_string());
    }

    #[test]
    fn test_event_time_parse_rejects_non_digits() {
        assert!("".parse::<EventTime>().is_err());
        assert!("-1".parse::<EventTime>().is_err());
        assert!("12a".parse::<EventTime>().is_err());
        assert!("99999999999999999999999".parse::<EventTime>().is_err());
        assert_eq!(
            "00000000000000000007".parse::<EventTime>().unwrap(),
            EventTime::from_raw(7)
        );
    }

    #[test]
    fn test_aggregate_id_serializes_untagged() {
        assert_eq!(
            serde_json::to_value(AggregateId::Number(1)).unwrap(),
            serde_json::json!(1)
        );
        assert_eq!(
            serde_json::to_value(AggregateId::from("acc-1")).unwrap(),
            serde_json::json!("acc-1")
        );
        let parsed: AggregateId = serde_json::from_value(serde_json::json!(7)).unwrap();
        assert_eq!(parsed, AggregateId::Number(7));
    }

    #[test]
    fn test_numeric_and_textual_aggregate_keys_differ() {
        assert_ne!(
            AggregateId::Number(1).to_key(),
            AggregateId::from("1").to_key()
        );
    }

    #[test]
    fn test_event_names_distinct_preserves_first_occurrence() {
        let names = EventNames::from(["withdraw", "deposit", "withdraw"]);

        assert_eq!(names.distinct(), vec!["withdraw", "deposit"]);
    }
}
