//! Response shapes of the upstream game query API.

use serde::Deserialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::dto::events::WireRoundId;

/// `GET /rounds/current` body. An empty object means no active round.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentRoundDto {
    #[serde(default, alias = "round_id")]
    pub round_id: Option<WireRoundId>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "countdown_seconds", alias = "timeLeft")]
    pub countdown_seconds: Option<i64>,
}

impl CurrentRoundDto {
    /// True for `{}`-style bodies carrying no round at all.
    pub fn is_empty(&self) -> bool {
        self.round_id.is_none() && self.status.is_none() && self.countdown_seconds.is_none()
    }
}

/// Timestamp of a results-page entry: RFC 3339 text or Unix milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    Text(String),
    Millis(i64),
}

impl WireTimestamp {
    /// Convert to an [`OffsetDateTime`], `None` when unparseable.
    pub fn to_datetime(&self) -> Option<OffsetDateTime> {
        match self {
            WireTimestamp::Text(text) => OffsetDateTime::parse(text, &Rfc3339).ok(),
            WireTimestamp::Millis(millis) => {
                OffsetDateTime::from_unix_timestamp_nanos(i128::from(*millis) * 1_000_000).ok()
            }
        }
    }
}

/// One entry of `GET /rounds/results`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntryDto {
    #[serde(default, alias = "round_id")]
    pub round_id: Option<WireRoundId>,
    #[serde(default, alias = "result")]
    pub positions: Option<Vec<i64>>,
    #[serde(default)]
    pub timestamp: Option<WireTimestamp>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_no_active_round() {
        let dto: CurrentRoundDto = serde_json::from_str("{}").unwrap();
        assert!(dto.is_empty());

        let dto: Option<CurrentRoundDto> = serde_json::from_str("null").unwrap();
        assert!(dto.is_none());
    }

    #[test]
    fn snapshot_accepts_numeric_round_id() {
        let dto: CurrentRoundDto =
            serde_json::from_str(r#"{"roundId": 20240101, "status": "betting", "countdownSeconds": 12}"#)
                .unwrap();
        assert_eq!(dto.round_id, Some(WireRoundId::Integer(20240101)));
        assert_eq!(dto.countdown_seconds, Some(12));
    }

    #[test]
    fn timestamps_parse_from_text_and_millis() {
        let text = WireTimestamp::Text("2024-05-01T12:00:00Z".into());
        let millis = WireTimestamp::Millis(1_714_564_800_000);
        assert_eq!(text.to_datetime(), millis.to_datetime());
        assert!(WireTimestamp::Text("yesterday".into()).to_datetime().is_none());
    }
}
