use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::LeaveError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
    Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Unpaid,
    Other,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
    Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    /// Statuses that still hold a claim on the calendar.
    pub const BLOCKING: [LeaveStatus; 2] = [LeaveStatus::Pending, LeaveStatus::Approved];

    pub fn blocks_overlap(self) -> bool {
        Self::BLOCKING.contains(&self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeaveDecision {
    Approve,
    Reject,
}

impl LeaveDecision {
    pub fn target_status(self) -> LeaveStatus {
        match self {
            LeaveDecision::Approve => LeaveStatus::Approved,
            LeaveDecision::Reject => LeaveStatus::Rejected,
        }
    }
}

/// Inclusive day count of `[start, end]`.
pub fn days_between_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Two inclusive date intervals overlap iff each starts no later than the other ends.
pub fn spans_overlap(a: (NaiveDate, NaiveDate), b: (NaiveDate, NaiveDate)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

/// A validated leave span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveSpan {
    start_date: NaiveDate,
    end_date: NaiveDate,
    total_days: u32,
}

impl LeaveSpan {
    pub fn validate(
        start_date: NaiveDate,
        end_date: NaiveDate,
        today: NaiveDate,
        max_days: u32,
    ) -> Result<Self, LeaveError> {
        if start_date < today {
            return Err(LeaveError::StartInPast { start_date, today });
        }
        if end_date < start_date {
            return Err(LeaveError::EndBeforeStart {
                start_date,
                end_date,
            });
        }
        let total_days = days_between_inclusive(start_date, end_date);
        if total_days > i64::from(max_days) {
            return Err(LeaveError::ExceedsMaxSpan {
                total_days,
                max_days,
            });
        }
        Ok(Self {
            start_date,
            end_date,
            total_days: total_days as u32,
        })
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn total_days(&self) -> u32 {
        self.total_days
    }

    pub fn bounds(&self) -> (NaiveDate, NaiveDate) {
        (self.start_date, self.end_date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "leave_type": "annual",
    "start_date": "2026-01-05",
    "end_date": "2026-01-07",
    "reason": "Family trip",
    "status": "pending",
    "reviewed_by": null,
    "reviewed_at": null,
    "total_days": 3,
    "created_at": "2026-01-01T08:00:00Z"
}))]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    pub leave_type: LeaveType,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    pub reviewed_by: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub total_days: u32,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl LeaveRequest {
    pub fn bounds(&self) -> (NaiveDate, NaiveDate) {
        (self.start_date, self.end_date)
    }

    pub fn overlaps(&self, bounds: (NaiveDate, NaiveDate)) -> bool {
        spans_overlap(self.bounds(), bounds)
    }

    /// Only the owner's pending requests that have not yet begun can be withdrawn.
    pub fn ensure_cancellable(&self, today: NaiveDate) -> Result<(), LeaveError> {
        if self.status == LeaveStatus::Pending && self.start_date > today {
            Ok(())
        } else {
            Err(LeaveError::NotCancellable {
                leave_id: self.id,
                status: self.status,
                start_date: self.start_date,
            })
        }
    }

    pub fn ensure_reviewable(&self) -> Result<(), LeaveError> {
        match self.status {
            LeaveStatus::Pending => Ok(()),
            status => Err(LeaveError::AlreadyReviewed {
                leave_id: self.id,
                status,
            }),
        }
    }

    pub fn reviewed(
        mut self,
        decision: LeaveDecision,
        reviewer_id: u64,
        at: DateTime<Utc>,
    ) -> Result<Self, LeaveError> {
        self.ensure_reviewable()?;
        self.status = decision.target_status();
        self.reviewed_by = Some(reviewer_id);
        self.reviewed_at = Some(at);
        Ok(self)
    }
}

/// A validated request that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLeaveRequest {
    pub employee_id: u64,
    pub leave_type: LeaveType,
    pub span: LeaveSpan,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl NewLeaveRequest {
    pub fn into_pending(self, id: u64) -> LeaveRequest {
        LeaveRequest {
            id,
            employee_id: self.employee_id,
            leave_type: self.leave_type,
            start_date: self.span.start_date(),
            end_date: self.span.end_date(),
            reason: self.reason,
            status: LeaveStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            total_days: self.span.total_days(),
            created_at: self.created_at,
        }
    }
}

/// What a caller needs to render one conflicting request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConflictingLeave {
    pub id: u64,
    pub leave_type: LeaveType,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub status: LeaveStatus,
}

impl From<&LeaveRequest> for ConflictingLeave {
    fn from(request: &LeaveRequest) -> Self {
        Self {
            id: request.id,
            leave_type: request.leave_type,
            start_date: request.start_date,
            end_date: request.end_date,
            status: request.status,
        }
    }
}
