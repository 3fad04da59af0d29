use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Source of "now" for everything that stamps or compares dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// A clock pinned to midday of `date`, mostly for tests.
    pub fn fixed_on(date: NaiveDate) -> Self {
        let noon = date.and_hms_opt(12, 0, 0).unwrap_or_default();
        Self::Fixed(noon.and_utc())
    }

    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Self::System => Utc::now(),
            Self::Fixed(at) => *at,
        }
    }

    pub fn today(&self) -> NaiveDate {
        match self {
            Self::System => Local::now().date_naive(),
            Self::Fixed(at) => at.date_naive(),
        }
    }

    /// Calendar date of a stored timestamp, in the same zone as `today`.
    pub fn date_of(&self, at: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::System => at.with_timezone(&Local).date_naive(),
            Self::Fixed(_) => at.date_naive(),
        }
    }
}

/// Weekday code as persisted in recurrence schedules (`mon` .. `sun`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Mon,
        Day::Tue,
        Day::Wed,
        Day::Thu,
        Day::Fri,
        Day::Sat,
        Day::Sun,
    ];

    pub fn of(date: NaiveDate) -> Self {
        Self::ALL[date.weekday().num_days_from_monday() as usize]
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Mon => "mon",
            Self::Tue => "tue",
            Self::Wed => "wed",
            Self::Thu => "thu",
            Self::Fri => "fri",
            Self::Sat => "sat",
            Self::Sun => "sun",
        }
    }

    pub fn from_code(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|d| s.starts_with(d.code()))
    }

    /// Translation key of the short weekday name, e.g. `dates.weekdays.mon`.
    pub fn label_key(&self) -> String {
        format!("dates.weekdays.{}", self.code())
    }
}

/// Whole days from `from` to `to` (negative when `to` is earlier).
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp and keeps the date part.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

/// `dd-mm-yyyy`, the display format used on every card.
pub fn format_display(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// Where a due date sits relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueStatus {
    Overdue(i64),
    Today,
    Tomorrow,
    InDays(i64),
}

impl DueStatus {
    pub fn classify(due: NaiveDate, today: NaiveDate) -> Self {
        match days_between(today, due) {
            d if d < 0 => Self::Overdue(-d),
            0 => Self::Today,
            1 => Self::Tomorrow,
            d => Self::InDays(d),
        }
    }

    pub fn label_key(&self) -> &'static str {
        match self {
            Self::Overdue(_) => "dates.overdue",
            Self::Today => "dates.dueToday",
            Self::Tomorrow => "dates.dueTomorrow",
            Self::InDays(_) => "dates.dueInDays",
        }
    }

    /// Day count for the `{count}` parameter, zero for today and tomorrow.
    pub fn days(&self) -> i64 {
        match self {
            Self::Overdue(days) | Self::InDays(days) => *days,
            Self::Today | Self::Tomorrow => 0,
        }
    }
}

/// Serde helpers that read legacy or hand-edited values without failing the
/// whole document: empty or malformed dates become `None`.
pub mod lenient {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::collections::BTreeSet;

    use super::parse_date;

    pub fn date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value.as_str().and_then(parse_date))
    }

    pub fn date_set<'de, D>(deserializer: D) -> Result<BTreeSet<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().and_then(parse_date))
                    .collect()
            })
            .unwrap_or_default())
    }

    pub fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(parse_timestamp(&value))
    }

    /// Missing or unreadable creation stamps fall back to now.
    pub fn timestamp_or_now<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(parse_timestamp(&value).unwrap_or_else(Utc::now))
    }

    fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    parse_date(s)
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                        .map(|dt| dt.and_utc())
                }),
            // Server timestamps arrive as {"seconds": .., "nanoseconds": ..}.
            Value::Object(map) => {
                let secs = map
                    .get("seconds")
                    .or_else(|| map.get("_seconds"))
                    .and_then(Value::as_i64)?;
                DateTime::from_timestamp(secs, 0)
            }
            _ => None,
        }
    }
}
