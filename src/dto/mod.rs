use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod bets;
pub mod events;
pub mod health;
pub mod round;
pub mod snapshot;
pub mod sse;

fn format_timestamp(time: OffsetDateTime) -> String {
    time.format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
