use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
    /// No clock-in recorded for the day
    Absent,
    /// Clocked in, not yet out
    Partial,
    /// Completed cycle with the minimum session satisfied
    Present,
}

/// Where a day sits in the single-cycle clock state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayState {
    NotStarted,
    ClockedIn { since: DateTime<Utc> },
    ClockedOut { at: DateTime<Utc> },
}

/// One employee's attendance for one calendar day. Keyed by
/// `(employee_id, date)`; there is never more than one per key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "employee_id": 1000,
    "date": "2026-01-05",
    "clock_in_at": "2026-01-05T09:00:00Z",
    "clock_out_at": "2026-01-05T17:30:00Z",
    "status": "present",
    "total_worked_hours": 8.5,
    "overtime_hours": 0.5
}))]
pub struct ClockRecord {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub clock_in_at: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub clock_out_at: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    #[schema(example = 8.5)]
    pub total_worked_hours: f64,
    #[schema(example = 0.5)]
    pub overtime_hours: f64,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Hours between two instants, rounded to 2 decimals. Never negative.
pub fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let seconds = (end - start).num_seconds().max(0);
    round2(seconds as f64 / 3600.0)
}

pub fn overtime_for(worked_hours: f64, standard_hours: f64) -> f64 {
    round2((worked_hours - standard_hours).max(0.0))
}

impl ClockRecord {
    /// A fresh record for the first clock-in of the day.
    pub fn clocked_in(employee_id: u64, date: NaiveDate, at: DateTime<Utc>) -> Self {
        Self {
            employee_id,
            date,
            clock_in_at: Some(at),
            clock_out_at: None,
            status: AttendanceStatus::Partial,
            total_worked_hours: 0.0,
            overtime_hours: 0.0,
        }
    }

    pub fn derive_status(&self, min_session: Duration) -> AttendanceStatus {
        match (self.clock_in_at, self.clock_out_at) {
            (None, _) => AttendanceStatus::Absent,
            (Some(_), None) => AttendanceStatus::Partial,
            (Some(start), Some(end)) if end > start && end - start >= min_session => {
                AttendanceStatus::Present
            }
            (Some(_), Some(_)) => AttendanceStatus::Partial,
        }
    }

    pub fn derive_worked_hours(&self) -> f64 {
        match (self.clock_in_at, self.clock_out_at) {
            (Some(start), Some(end)) => hours_between(start, end),
            _ => 0.0,
        }
    }

    /// Stamps the clock-out and recomputes every derived field.
    pub fn complete(
        mut self,
        at: DateTime<Utc>,
        standard_hours: f64,
        min_session: Duration,
    ) -> Self {
        self.clock_out_at = Some(at);
        self.total_worked_hours = self.derive_worked_hours();
        self.overtime_hours = overtime_for(self.total_worked_hours, standard_hours);
        self.status = self.derive_status(min_session);
        self
    }

    pub fn day_state(&self) -> DayState {
        match (self.clock_in_at, self.clock_out_at) {
            (None, _) => DayState::NotStarted,
            (Some(since), None) => DayState::ClockedIn { since },
            (Some(_), Some(at)) => DayState::ClockedOut { at },
        }
    }
}

#[cfg(test)]
impl ClockRecord {
    /// True when the stored status and timestamps agree with each other.
    pub fn is_consistent(&self, min_session: Duration) -> bool {
        if let (Some(start), Some(end)) = (self.clock_in_at, self.clock_out_at) {
            if end <= start {
                return false;
            }
        }
        if self.clock_in_at.is_none() && self.clock_out_at.is_some() {
            return false;
        }
        self.status == self.derive_status(min_session)
    }

    pub fn derive_overtime(&self, standard_hours: f64) -> f64 {
        overtime_for(self.derive_worked_hours(), standard_hours)
    }
}
