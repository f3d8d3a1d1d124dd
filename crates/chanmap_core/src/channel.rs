use std::fmt::{Display, Formatter};

use serde::de::{Error, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::Display as StrumDisplay;

/// Tuning target of a channel. Providers encode it differently, so it is kept as text and
/// never interpreted.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ChannelNumber(String);

impl ChannelNumber {
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ChannelNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelNumber {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Serialize for ChannelNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

struct ChannelNumberVisitor;

impl Visitor<'_> for ChannelNumberVisitor {
    type Value = ChannelNumber;

    fn expecting(&self, f: &mut Formatter) -> std::fmt::Result {
        f.write_str("a channel number as a string or an integer")
    }

    fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(ChannelNumber(v.to_string()))
    }

    fn visit_u64<E: Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(ChannelNumber(v.to_string()))
    }

    fn visit_i64<E: Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(ChannelNumber(v.to_string()))
    }
}

impl<'de> Deserialize<'de> for ChannelNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ChannelNumberVisitor)
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ChannelRecord {
    pub id: String,
    pub name: String,
    pub number: ChannelNumber,
}

impl ChannelRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        number: impl Into<ChannelNumber>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            number: number.into(),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, StrumDisplay)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChannelSource {
    Base,
    Custom,
}

/// A channel as it appears after the lineup and the user's customization are merged.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ActiveChannel<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub number: &'a ChannelNumber,
    pub source: ChannelSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_from_string_or_integer() {
        let records: Vec<ChannelRecord> = serde_json::from_str(
            r#"[
                {"id": "1", "name": "RTL HD", "number": 12},
                {"id": "2", "name": "M1", "number": "1-A"}
            ]"#,
        )
        .unwrap();

        assert_eq!(records[0].number.as_str(), "12");
        assert_eq!(records[1].number.as_str(), "1-A");
    }

    #[test]
    fn test_number_serializes_as_string() {
        let record = ChannelRecord::new("1", "RTL HD", "12");

        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"id":"1","name":"RTL HD","number":"12"}"#,
        );
    }

    #[test]
    fn test_number_rejects_other_types() {
        assert!(serde_json::from_str::<ChannelNumber>("1.5").is_err());
        assert!(serde_json::from_str::<ChannelNumber>("null").is_err());
    }
}
