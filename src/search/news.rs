//! Date range handling for the news vertical

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Publication window for news searches.
///
/// A `since` later than `until` is swapped rather than rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Bounds")]
pub struct DateRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

/// Serialized form of a range, ordered on the way in
#[derive(Deserialize)]
struct Bounds {
    #[serde(default)]
    since: Option<DateTime<Utc>>,
    #[serde(default)]
    until: Option<DateTime<Utc>>,
}

impl From<Bounds> for DateRange {
    fn from(bounds: Bounds) -> Self {
        Self::new(bounds.since, bounds.until)
    }
}

/// Raw date parameters from a news search request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateParams {
    /// Relative window: `h`, `d`, `w`, `m` or `y`
    pub tbs: Option<String>,
    pub since_date: Option<String>,
    pub until_date: Option<String>,
}

impl DateRange {
    pub fn new(since: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Self {
        match (since, until) {
            (Some(s), Some(u)) if s > u => Self {
                since: Some(u),
                until: Some(s),
            },
            _ => Self { since, until },
        }
    }

    /// Resolve request parameters into a range, relative to `now`.
    ///
    /// Explicit dates win over `tbs`. Dates use the locale's format
    /// (`%d/%m/%Y` for Spanish, `%m/%d/%Y` otherwise).
    pub fn from_params(params: &DateParams, locale: &str, now: DateTime<Utc>) -> Option<Self> {
        let since_raw = non_blank(params.since_date.as_deref());
        let until_raw = non_blank(params.until_date.as_deref());

        if since_raw.is_none() && until_raw.is_none() {
            return Self::from_tbs(params.tbs.as_deref(), now);
        }

        let today = now.date_naive();
        let until = until_raw.map(|raw| parse_date(raw, locale).unwrap_or(today));
        let since = since_raw.map(|raw| {
            parse_date(raw, locale).unwrap_or_else(|| {
                let anchor = until.unwrap_or(today);
                anchor.checked_sub_months(Months::new(12)).unwrap_or(anchor)
            })
        });

        let (since, until) = match (since, until) {
            (Some(s), Some(u)) if s > u => (Some(u), Some(s)),
            other => other,
        };

        Some(Self {
            since: since.map(beginning_of_day),
            until: until.map(end_of_day),
        })
    }

    /// Relative windows: the last hour, or the start of the day one
    /// day/week/month/year ago
    pub fn from_tbs(tbs: Option<&str>, now: DateTime<Utc>) -> Option<Self> {
        let today = now.date_naive();
        let since = match tbs?.trim() {
            "h" => return Some(Self::new(Some(now - Duration::hours(1)), None)),
            "d" => today - Duration::days(1),
            "w" => today - Duration::weeks(1),
            "m" => today.checked_sub_months(Months::new(1))?,
            "y" => today.checked_sub_months(Months::new(12))?,
            _ => return None,
        };
        Some(Self::new(Some(beginning_of_day(since)), None))
    }

    /// Range fragment used in news cache keys
    pub fn key_fragment(&self) -> String {
        let fmt = |d: &DateTime<Utc>| d.format("%Y-%m-%d").to_string();
        match (&self.since, &self.until) {
            (Some(s), Some(u)) => format!("{}..{}", fmt(s), fmt(u)),
            (Some(s), None) => fmt(s),
            (None, Some(u)) => format!("..{}", fmt(u)),
            (None, None) => String::new(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(raw: &str, locale: &str) -> Option<NaiveDate> {
    let format = if locale.starts_with("es") {
        "%d/%m/%Y"
    } else {
        "%m/%d/%Y"
    };
    NaiveDate::parse_from_str(raw, format).ok()
}

fn beginning_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default();
    Utc.from_utc_datetime(&date.and_time(last_second))
}
