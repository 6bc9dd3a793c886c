use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange { start: CalendarDay, end: CalendarDay },
    #[error("invalid calendar date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },
}

/// A calendar date with the time of day stripped. Two values are equal when
/// they name the same calendar date, regardless of the offset the source
/// timestamp carried.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CalendarDay(NaiveDate);

impl CalendarDay {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Accepts `YYYY-MM-DD` or a full ISO-8601 timestamp. For timestamps the
    /// date component is taken as written; the time and offset are dropped.
    pub fn parse(value: &str) -> Result<Self, CalendarError> {
        let trimmed = value.trim();
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Ok(Self(date));
        }
        DateTime::parse_from_rfc3339(trimmed)
            .map(|timestamp| Self(timestamp.date_naive()))
            .map_err(|error| CalendarError::InvalidDate {
                value: trimmed.to_string(),
                reason: error.to_string(),
            })
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn succ(&self) -> Option<CalendarDay> {
        self.0.succ_opt().map(Self)
    }

    /// Canonical wire form: midnight UTC on this date, RFC 3339.
    pub fn to_utc_midnight(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.0.and_time(NaiveTime::MIN))
    }

    pub fn to_wire_timestamp(&self) -> String {
        self.to_utc_midnight().to_rfc3339()
    }
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// A confirmed reservation's date span. Owned by the booking subsystem; the
/// calendar only reads it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookedInterval {
    pub check_in: CalendarDay,
    pub check_out: CalendarDay,
}

impl BookedInterval {
    pub fn validate(&self) -> Result<(), String> {
        if self.check_out <= self.check_in {
            return Err("booked.check_out must be after booked.check_in".to_string());
        }
        Ok(())
    }
}

/// A host-created exclusion on the property record. Mutated only through
/// create/delete requests against the marketplace API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockedInterval {
    pub id: String,
    pub start_date: CalendarDay,
    pub end_date: CalendarDay,
}

impl BlockedInterval {
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("blocked.id must not be empty".to_string());
        }
        if self.end_date < self.start_date {
            return Err("blocked.end_date must not be before blocked.start_date".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Empty,
    CheckInSet,
    BothSet,
}

/// Transient screen state for the date-range picker. `check_in < check_out`
/// strictly whenever both are set.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct Selection {
    pub check_in: Option<CalendarDay>,
    pub check_out: Option<CalendarDay>,
}

impl Selection {
    pub fn state(&self) -> SelectionState {
        match (self.check_in, self.check_out) {
            (None, _) => SelectionState::Empty,
            (Some(_), None) => SelectionState::CheckInSet,
            (Some(_), Some(_)) => SelectionState::BothSet,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.check_in.is_none()
    }

    pub fn validate(&self) -> Result<(), String> {
        if let (Some(check_in), Some(check_out)) = (self.check_in, self.check_out) {
            if check_out <= check_in {
                return Err("selection.check_out must be after selection.check_in".to_string());
            }
        }
        if self.check_in.is_none() && self.check_out.is_some() {
            return Err("selection.check_out requires selection.check_in".to_string());
        }
        Ok(())
    }
}

/// Per-day display state, recomputed on every query and never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DayClassification {
    Past,
    Blocked,
    Booked,
    Selected,
    Available,
}

impl DayClassification {
    pub const ALL: [DayClassification; 5] = [
        DayClassification::Past,
        DayClassification::Blocked,
        DayClassification::Booked,
        DayClassification::Selected,
        DayClassification::Available,
    ];

    pub fn css_class(self) -> &'static str {
        match self {
            Self::Past => "day-past",
            Self::Blocked => "day-blocked",
            Self::Booked => "day-booked",
            Self::Selected => "day-selected",
            Self::Available => "day-available",
        }
    }

    pub fn legend_label(self) -> &'static str {
        match self {
            Self::Past => "Already elapsed",
            Self::Blocked => "Blocked by you",
            Self::Booked => "Booked by a guest",
            Self::Selected => "Your check-in pick",
            Self::Available => "Open for booking",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionRole {
    Admin,
    Host,
}

/// The token the marketplace issues at sign-in. Sign-in itself happens
/// outside the console; this is only the stored credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionToken {
    pub access_token: String,
    pub role: SessionRole,
    pub issued_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn is_usable(&self) -> bool {
        !self.access_token.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(value: &str) -> CalendarDay {
        CalendarDay::parse(value).expect("valid calendar day")
    }

    fn sample_booked() -> BookedInterval {
        BookedInterval {
            check_in: day("2024-06-10"),
            check_out: day("2024-06-13"),
        }
    }

    fn sample_blocked() -> BlockedInterval {
        BlockedInterval {
            id: "blk-64f1".to_string(),
            start_date: day("2024-07-01"),
            end_date: day("2024-07-05"),
        }
    }

    #[test]
    fn calendar_day_parses_plain_dates_and_timestamps() {
        assert_eq!(day("2024-06-10"), day("2024-06-10T00:00:00Z"));
        assert_eq!(day("2024-06-10"), day("2024-06-10T23:30:00+05:00"));
        assert_eq!(day("2024-06-10"), day("2024-06-10T01:15:00-08:00"));
    }

    #[test]
    fn calendar_day_rejects_garbage() {
        assert!(CalendarDay::parse("not-a-date").is_err());
        assert!(CalendarDay::parse("2024-13-40").is_err());
    }

    #[test]
    fn calendar_day_wire_timestamp_is_midnight_utc() {
        let wire = day("2024-06-10").to_wire_timestamp();
        assert_eq!(wire, "2024-06-10T00:00:00+00:00");
    }

    #[test]
    fn calendar_day_succ_advances_across_month_boundary() {
        assert_eq!(day("2024-06-30").succ(), Some(day("2024-07-01")));
    }

    #[test]
    fn booked_interval_validate_rejects_zero_length_stay() {
        let mut booked = sample_booked();
        booked.check_out = booked.check_in;
        assert!(booked.validate().is_err());
        assert!(sample_booked().validate().is_ok());
    }

    #[test]
    fn blocked_interval_validate_accepts_single_day_block() {
        let mut blocked = sample_blocked();
        blocked.end_date = blocked.start_date;
        assert!(blocked.validate().is_ok());
    }

    #[test]
    fn blocked_interval_validate_rejects_empty_id_and_reversed_span() {
        let mut blocked = sample_blocked();
        blocked.id = "  ".to_string();
        assert!(blocked.validate().is_err());

        let mut blocked = sample_blocked();
        blocked.end_date = day("2024-06-30");
        assert!(blocked.validate().is_err());
    }

    #[test]
    fn selection_state_transitions_through_the_three_shapes() {
        let mut selection = Selection::default();
        assert_eq!(selection.state(), SelectionState::Empty);
        assert!(selection.is_empty());

        selection.check_in = Some(day("2024-06-10"));
        assert_eq!(selection.state(), SelectionState::CheckInSet);

        selection.check_out = Some(day("2024-06-13"));
        assert_eq!(selection.state(), SelectionState::BothSet);
        assert!(selection.validate().is_ok());
    }

    #[test]
    fn selection_validate_rejects_inverted_and_orphaned_endpoints() {
        let inverted = Selection {
            check_in: Some(day("2024-06-13")),
            check_out: Some(day("2024-06-10")),
        };
        assert!(inverted.validate().is_err());

        let orphaned = Selection {
            check_in: None,
            check_out: Some(day("2024-06-10")),
        };
        assert!(orphaned.validate().is_err());
    }

    #[test]
    fn domain_models_support_serde_roundtrip() {
        let booked = sample_booked();
        let blocked = sample_blocked();

        let booked_roundtrip: BookedInterval =
            serde_json::from_str(&serde_json::to_string(&booked).expect("serialize booked"))
                .expect("deserialize booked");
        let blocked_roundtrip: BlockedInterval =
            serde_json::from_str(&serde_json::to_string(&blocked).expect("serialize blocked"))
                .expect("deserialize blocked");

        assert_eq!(booked_roundtrip, booked);
        assert_eq!(blocked_roundtrip, blocked);
    }

    #[test]
    fn session_token_usability_depends_on_a_non_blank_token() {
        let token = SessionToken {
            access_token: "host-token".to_string(),
            role: SessionRole::Host,
            issued_at: DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
                .expect("valid datetime")
                .with_timezone(&Utc),
        };
        assert!(token.is_usable());

        let blank = SessionToken {
            access_token: "   ".to_string(),
            ..token
        };
        assert!(!blank.is_usable());
    }

    #[test]
    fn classification_exposes_stable_css_classes() {
        assert_eq!(DayClassification::Past.css_class(), "day-past");
        assert_eq!(DayClassification::Available.css_class(), "day-available");
        assert_eq!(DayClassification::ALL.len(), 5);
    }
}
