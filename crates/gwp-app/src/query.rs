//! Read-only access to stored emission detail rows.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use gwp_model::ModelVariant;
use gwp_store::{DetailFilter, EmissionDetailRow};

use crate::error::{AppError, AppResult};
use crate::persist_service::Persistence;

/// Which end of a time range a bare date stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBound {
    Start,
    End,
}

/// Parse an RFC 3339 timestamp, a naive `YYYY-MM-DDTHH:MM:SS` (UTC) or a
/// bare `YYYY-MM-DD` date, which covers the whole day.
pub fn parse_time_bound(raw: &str, bound: TimeBound) -> AppResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(t.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let time = match bound {
            TimeBound::Start => NaiveTime::MIN,
            TimeBound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN),
        };
        return Ok(date.and_time(time).and_utc());
    }
    Err(AppError::InvalidInput(format!(
        "Unrecognized time {raw:?}; expected RFC 3339 or YYYY-MM-DD"
    )))
}

/// Build a conjunctive filter from optional raw parameters; blanks are ignored.
pub fn build_filter(
    start: Option<&str>,
    end: Option<&str>,
    location: Option<&str>,
) -> AppResult<DetailFilter> {
    fn present(v: Option<&str>) -> Option<&str> {
        v.map(str::trim).filter(|v| !v.is_empty())
    }

    let filter = DetailFilter {
        start: present(start)
            .map(|s| parse_time_bound(s, TimeBound::Start))
            .transpose()?,
        end: present(end)
            .map(|s| parse_time_bound(s, TimeBound::End))
            .transpose()?,
        location: present(location).map(str::to_string),
    };
    if let (Some(start), Some(end)) = (filter.start, filter.end)
        && start > end
    {
        return Err(AppError::InvalidInput(format!(
            "start {start} is after end {end}"
        )));
    }
    Ok(filter)
}

/// Detail rows of `variant` matching `filter`, newest first.
///
/// An unconfigured datastore is an error, not an empty list.
pub fn list_emissions(
    persistence: &Persistence,
    variant: ModelVariant,
    filter: &DetailFilter,
) -> AppResult<Vec<EmissionDetailRow>> {
    let store = persistence.store()?;
    Ok(store.list_details(persistence.detail_table(variant), filter)?)
}
