//! Off-peak window predicate (spec.md §4.3).

use chrono::NaiveTime;

#[derive(Debug, thiserror::Error)]
pub enum OffpeakError {
    #[error("invalid offpeak_start {raw:?}: {source}")]
    Start {
        raw: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("invalid offpeak_end {raw:?}: {source}")]
    End {
        raw: String,
        #[source]
        source: chrono::ParseError,
    },
}

fn parse(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
}

/// Whether `now` falls inside the `[start, end)`-ish off-peak window. A
/// window where `start < end` is a same-day range; otherwise it is treated
/// as crossing midnight.
pub fn is_offpeak(start: &str, end: &str, now: NaiveTime) -> Result<bool, OffpeakError> {
    let start_time = parse(start).map_err(|source| OffpeakError::Start {
        raw: start.to_string(),
        source,
    })?;
    let end_time = parse(end).map_err(|source| OffpeakError::End {
        raw: end.to_string(),
        source,
    })?;
    if start_time < end_time {
        Ok(start_time <= now && now <= end_time)
    } else {
        Ok(now >= start_time || now <= end_time)
    }
}
