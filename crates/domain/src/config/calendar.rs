use chrono::{NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Calendar / locale configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Locale inputs for the scheduling engine.
///
/// The engine itself only ever sees local calendar dates.  `timezone` is
/// used by front-ends to decide what "today" is for the user; it never
/// reaches date arithmetic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// First day of the week for the active locale (e.g. `"sunday"`, `"monday"`).
    #[serde(default = "d_first_weekday")]
    pub first_weekday: String,

    /// IANA timezone used to derive the local "today".
    #[serde(default = "d_timezone")]
    pub timezone: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            first_weekday: d_first_weekday(),
            timezone: d_timezone(),
        }
    }
}

impl CalendarConfig {
    /// Parsed first weekday, or `None` when the configured name is unknown.
    pub fn first_weekday(&self) -> Option<Weekday> {
        self.first_weekday.trim().parse::<Weekday>().ok()
    }

    /// Parsed timezone, falling back to UTC.
    pub fn tz(&self) -> chrono_tz::Tz {
        parse_tz(&self.timezone)
    }

    /// The current local date in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz()).date_naive()
    }
}

/// Parse a timezone string into a `chrono_tz::Tz`, falling back to UTC.
pub fn parse_tz(tz: &str) -> chrono_tz::Tz {
    tz.parse::<chrono_tz::Tz>().unwrap_or(chrono_tz::UTC)
}

/// Validate an IANA timezone string.
pub fn validate_timezone(tz: &str) -> Result<(), String> {
    if tz.parse::<chrono_tz::Tz>().is_err() {
        Err(format!(
            "invalid timezone: '{}' (use IANA names like 'America/New_York' or 'UTC')",
            tz
        ))
    } else {
        Ok(())
    }
}

fn d_first_weekday() -> String {
    "sunday".into()
}

fn d_timezone() -> String {
    "UTC".into()
}
