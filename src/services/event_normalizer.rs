//! Event normalization boundary.
//!
//! The only place payload shapes are validated. Push frames and REST bodies come in
//! loosely typed (string or numeric round ids, optional fields, aliases) and leave as
//! typed coordinator input.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::{
    dto::{
        events::{
            BettingClosedPayload, ResultConfirmedPayload, RoundStartedPayload, TransportFrame,
            WireRoundId,
        },
        snapshot::{CurrentRoundDto, ResultEntryDto},
    },
    state::round::{
        Positions, PositionsError, RoundId, RoundResult, RoundSnapshot, RoundStatus,
        UnknownStatus,
    },
};

/// Countdown used when a round start omits `timeLeft`.
pub const DEFAULT_COUNTDOWN_SECS: u32 = 60;

/// Reasons a payload is rejected at the boundary.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing or empty round id")]
    MissingRoundId,
    #[error("invalid countdown {0}")]
    InvalidCountdown(i64),
    #[error("missing result positions")]
    MissingPositions,
    #[error("invalid result positions: {0}")]
    Positions(#[from] PositionsError),
    #[error(transparent)]
    Status(#[from] UnknownStatus),
}

/// Typed event produced by the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    RoundStarted { round_id: RoundId, countdown: u32 },
    BettingClosed { round_id: Option<RoundId> },
    ResultConfirmed { round_id: RoundId, positions: Positions },
    /// Forwarded verbatim to the account stream; not coordinator input.
    BalanceUpdated(Value),
}

/// Normalizes transport frames and REST bodies.
#[derive(Debug, Clone)]
pub struct EventNormalizer {
    default_countdown: u32,
}

impl Default for EventNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTDOWN_SECS)
    }
}

impl EventNormalizer {
    /// Normalizer applying `default_countdown` to round starts without `timeLeft`.
    pub fn new(default_countdown: u32) -> Self {
        Self { default_countdown }
    }

    /// Parse one text frame. `Ok(None)` means an event this core does not handle.
    pub fn parse_frame(&self, text: &str) -> Result<Option<InboundEvent>, NormalizeError> {
        let frame: TransportFrame = serde_json::from_str(text)?;
        self.normalize(frame)
    }

    /// Translate a decoded frame into an [`InboundEvent`].
    pub fn normalize(&self, frame: TransportFrame) -> Result<Option<InboundEvent>, NormalizeError> {
        let event = match frame.event.as_str() {
            "round_started" | "roundStarted" | "round:started" | "new_round" => {
                let payload: RoundStartedPayload = decode(frame.data)?;
                let round_id = required_round_id(payload.round_id)?;
                let countdown = match payload.time_left {
                    Some(value) => countdown(value)?,
                    None => self.default_countdown,
                };
                InboundEvent::RoundStarted {
                    round_id,
                    countdown,
                }
            }
            "betting_closed" | "bettingClosed" | "betting:closed" => {
                let payload: BettingClosedPayload = decode(frame.data)?;
                InboundEvent::BettingClosed {
                    round_id: payload
                        .round_id
                        .and_then(|id| RoundId::new(id.into_string())),
                }
            }
            "result_confirmed" | "resultConfirmed" | "result:confirmed" | "round_result" => {
                let payload: ResultConfirmedPayload = decode(frame.data)?;
                let round_id = required_round_id(payload.round_id)?;
                let values = payload.result.ok_or(NormalizeError::MissingPositions)?;
                InboundEvent::ResultConfirmed {
                    round_id,
                    positions: Positions::try_from_values(&values)?,
                }
            }
            "balance_updated" | "balanceUpdated" | "balance:updated" => {
                InboundEvent::BalanceUpdated(frame.data)
            }
            _ => return Ok(None),
        };

        Ok(Some(event))
    }

    /// Normalize a current-round snapshot.
    ///
    /// Empty bodies, `waiting` and `finished` reports all mean no active round.
    pub fn snapshot(
        &self,
        dto: Option<CurrentRoundDto>,
    ) -> Result<Option<RoundSnapshot>, NormalizeError> {
        let Some(dto) = dto.filter(|dto| !dto.is_empty()) else {
            return Ok(None);
        };

        let status = match dto.status.as_deref() {
            Some(status) => status.parse::<RoundStatus>()?,
            None if dto.round_id.is_none() => return Ok(None),
            None => RoundStatus::Betting,
        };
        if matches!(status, RoundStatus::Waiting | RoundStatus::Finished) {
            return Ok(None);
        }

        let round_id = required_round_id(dto.round_id)?;
        let countdown_seconds = match (status, dto.countdown_seconds) {
            (RoundStatus::Betting, Some(value)) => countdown(value)?,
            (RoundStatus::Betting, None) => self.default_countdown,
            _ => 0,
        };

        Ok(Some(RoundSnapshot {
            round_id,
            status,
            countdown_seconds,
        }))
    }

    /// Normalize a results page, dropping (and logging) malformed entries individually.
    pub fn results_page(&self, entries: Vec<ResultEntryDto>) -> Vec<RoundResult> {
        entries
            .into_iter()
            .filter_map(|entry| match result_entry(entry) {
                Ok(result) => Some(result),
                Err(err) => {
                    warn!(error = %err, "dropping malformed results page entry");
                    None
                }
            })
            .collect()
    }
}

fn result_entry(entry: ResultEntryDto) -> Result<RoundResult, NormalizeError> {
    let round_id = required_round_id(entry.round_id)?;
    let values = entry.positions.ok_or(NormalizeError::MissingPositions)?;
    let positions = Positions::try_from_values(&values)?;
    let drawn_at = entry.timestamp.as_ref().and_then(|ts| ts.to_datetime());
    Ok(RoundResult::new(round_id, positions).with_drawn_at(drawn_at))
}

fn decode<T: DeserializeOwned>(data: Value) -> Result<T, NormalizeError> {
    let data = if data.is_null() {
        Value::Object(Map::new())
    } else {
        data
    };
    Ok(serde_json::from_value(data)?)
}

fn required_round_id(raw: Option<WireRoundId>) -> Result<RoundId, NormalizeError> {
    raw.and_then(|id| RoundId::new(id.into_string()))
        .ok_or(NormalizeError::MissingRoundId)
}

fn countdown(value: i64) -> Result<u32, NormalizeError> {
    u32::try_from(value).map_err(|_| NormalizeError::InvalidCountdown(value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dto::snapshot::WireTimestamp;

    fn id(value: &str) -> RoundId {
        RoundId::new(value).unwrap()
    }

    fn parse(text: &str) -> Result<Option<InboundEvent>, NormalizeError> {
        EventNormalizer::default().parse_frame(text)
    }

    #[test]
    fn round_started_with_string_or_numeric_id() {
        assert_eq!(
            parse(r#"{"event":"round_started","data":{"roundId":"R1","timeLeft":30}}"#).unwrap(),
            Some(InboundEvent::RoundStarted {
                round_id: id("R1"),
                countdown: 30
            })
        );
        assert_eq!(
            parse(r#"{"event":"roundStarted","data":{"round_id":1042}}"#).unwrap(),
            Some(InboundEvent::RoundStarted {
                round_id: id("1042"),
                countdown: DEFAULT_COUNTDOWN_SECS
            })
        );
    }

    #[test]
    fn round_started_rejects_missing_id_and_negative_countdown() {
        assert!(matches!(
            parse(r#"{"event":"round_started","data":{"timeLeft":30}}"#),
            Err(NormalizeError::MissingRoundId)
        ));
        assert!(matches!(
            parse(r#"{"event":"round_started","data":{"roundId":"","timeLeft":30}}"#),
            Err(NormalizeError::MissingRoundId)
        ));
        assert!(matches!(
            parse(r#"{"event":"round_started","data":{"roundId":"R1","timeLeft":-5}}"#),
            Err(NormalizeError::InvalidCountdown(-5))
        ));
        assert!(matches!(
            parse(r#"{"event":"round_started","data":{"roundId":"R1","timeLeft":"soon"}}"#),
            Err(NormalizeError::Json(_))
        ));
    }

    #[test]
    fn betting_closed_round_id_is_optional() {
        assert_eq!(
            parse(r#"{"event":"betting_closed"}"#).unwrap(),
            Some(InboundEvent::BettingClosed { round_id: None })
        );
        assert_eq!(
            parse(r#"{"event":"betting:closed","data":{"roundId":7}}"#).unwrap(),
            Some(InboundEvent::BettingClosed {
                round_id: Some(id("7"))
            })
        );
    }

    #[test]
    fn result_confirmed_validates_positions() {
        let event =
            parse(r#"{"event":"result_confirmed","data":{"roundId":"R1","result":[7,4,2,9,1,6,3,10,5,8]}}"#)
                .unwrap();
        assert!(matches!(
            event,
            Some(InboundEvent::ResultConfirmed { round_id, .. }) if round_id == id("R1")
        ));

        assert!(matches!(
            parse(r#"{"event":"result_confirmed","data":{"roundId":"R1","result":[1,2,3]}}"#),
            Err(NormalizeError::Positions(PositionsError::Length(3)))
        ));
        assert!(matches!(
            parse(r#"{"event":"result_confirmed","data":{"roundId":"R1"}}"#),
            Err(NormalizeError::MissingPositions)
        ));
    }

    #[test]
    fn balance_is_forwarded_verbatim_and_unknown_events_ignored() {
        assert_eq!(
            parse(r#"{"event":"balance_updated","data":{"balance":1200,"currency":"pt"}}"#)
                .unwrap(),
            Some(InboundEvent::BalanceUpdated(
                json!({"balance": 1200, "currency": "pt"})
            ))
        );
        assert_eq!(parse(r#"{"event":"heartbeat","data":{}}"#).unwrap(), None);
        assert!(matches!(parse("not json"), Err(NormalizeError::Json(_))));
    }

    #[test]
    fn snapshot_normalization() {
        let normalizer = EventNormalizer::default();
        assert_eq!(normalizer.snapshot(None).unwrap(), None);
        assert_eq!(
            normalizer.snapshot(Some(CurrentRoundDto::default())).unwrap(),
            None
        );

        let snapshot = normalizer
            .snapshot(Some(CurrentRoundDto {
                round_id: Some(WireRoundId::Integer(88)),
                status: Some("Playing".into()),
                countdown_seconds: Some(12),
            }))
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.round_id, id("88"));
        assert_eq!(snapshot.status, RoundStatus::Playing);
        assert_eq!(snapshot.countdown_seconds, 0);

        assert_eq!(
            normalizer
                .snapshot(Some(CurrentRoundDto {
                    round_id: None,
                    status: Some("waiting".into()),
                    countdown_seconds: Some(0),
                }))
                .unwrap(),
            None
        );
        assert_eq!(
            normalizer
                .snapshot(Some(CurrentRoundDto {
                    round_id: Some(WireRoundId::Text("R1".into())),
                    status: Some("finished".into()),
                    countdown_seconds: None,
                }))
                .unwrap(),
            None
        );
        assert!(matches!(
            normalizer.snapshot(Some(CurrentRoundDto {
                round_id: None,
                status: Some("betting".into()),
                countdown_seconds: Some(20),
            })),
            Err(NormalizeError::MissingRoundId)
        ));

        assert!(matches!(
            normalizer.snapshot(Some(CurrentRoundDto {
                round_id: Some(WireRoundId::Text("R1".into())),
                status: Some("settled".into()),
                countdown_seconds: None,
            })),
            Err(NormalizeError::Status(_))
        ));
    }

    #[test]
    fn results_page_drops_malformed_entries() {
        let entries = vec![
            ResultEntryDto {
                round_id: Some(WireRoundId::Text("R2".into())),
                positions: Some(vec![9, 8, 1, 2, 3, 4, 5, 6, 7, 10]),
                timestamp: Some(WireTimestamp::Millis(1_714_564_800_000)),
            },
            ResultEntryDto {
                round_id: None,
                positions: Some(vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10]),
                timestamp: None,
            },
            ResultEntryDto {
                round_id: Some(WireRoundId::Text("R0".into())),
                positions: Some(vec![1, 2, 3, 4, 5, 6, 7, 8, 9]),
                timestamp: None,
            },
        ];

        let results = EventNormalizer::default().results_page(entries);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].round_id(), &id("R2"));
        assert_eq!(results[0].sum(), 17);
        assert!(results[0].drawn_at().is_some());
    }
}
