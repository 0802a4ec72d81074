//! Persistence seams for the attendance and leave services.
//!
//! The services own every business rule. A store only guarantees that the
//! final write is conditional on the state the rule was evaluated against:
//! the `(employee_id, work_date)` key is unique, clock-out only applies to an
//! open record, and leave inserts re-run the overlap check inside the same
//! write step. Anything that loses such a race is reported back, never merged.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::StoreError;
use crate::model::attendance::ClockRecord;
use crate::model::employee::EmployeeProfile;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest};
use crate::utils::date_range::DateRange;

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn get_employee(&self, employee_id: u64) -> Result<Option<EmployeeProfile>, StoreError>;
}

/// Result of trying to open the day's record.
#[derive(Debug, Clone, PartialEq)]
pub enum ClockInWrite {
    Created(ClockRecord),
    /// The day already has a clock-in; carries the stored record.
    AlreadyOpen(ClockRecord),
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn get_clock_record(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<ClockRecord>, StoreError>;

    /// Stores the first clock-in of the day. A pre-existing record without a
    /// clock-in is filled in; one with a clock-in is left untouched.
    async fn insert_clock_in(&self, record: &ClockRecord) -> Result<ClockInWrite, StoreError>;

    /// Applies a completed record only if the stored one is still open.
    /// `None` means another clock-out got there first.
    async fn complete_clock_out(&self, record: &ClockRecord)
    -> Result<Option<ClockRecord>, StoreError>;

    async fn list_clock_records(
        &self,
        employee_id: u64,
        range: DateRange,
    ) -> Result<Vec<ClockRecord>, StoreError>;

    /// Every employee's records in the range, ordered by employee then date.
    async fn list_all_clock_records(&self, range: DateRange) -> Result<Vec<ClockRecord>, StoreError>;
}

/// Result of an insert that re-checked overlap at write time.
#[derive(Debug, Clone, PartialEq)]
pub enum LeaveInsert {
    Created(LeaveRequest),
    Conflicts(Vec<LeaveRequest>),
}

#[derive(Debug, Clone, Default)]
pub struct LeavePageQuery {
    pub employee_id: Option<u64>,
    pub status: Option<LeaveStatus>,
    pub limit: u64,
    pub offset: u64,
}

#[async_trait]
pub trait LeaveStore: Send + Sync {
    async fn get_leave_request(&self, leave_id: u64) -> Result<Option<LeaveRequest>, StoreError>;

    /// An employee's requests with one of `statuses` (all when empty), by start date.
    async fn list_leave_requests(
        &self,
        employee_id: u64,
        statuses: &[LeaveStatus],
    ) -> Result<Vec<LeaveRequest>, StoreError>;

    /// Newest first, with the total matching count.
    async fn list_leave_page(
        &self,
        query: &LeavePageQuery,
    ) -> Result<(Vec<LeaveRequest>, i64), StoreError>;

    async fn insert_leave_request(&self, request: NewLeaveRequest) -> Result<LeaveInsert, StoreError>;

    /// Writes the review fields of `reviewed` if the stored request is still
    /// pending. `None` when it is not.
    async fn review_leave_request(
        &self,
        reviewed: &LeaveRequest,
    ) -> Result<Option<LeaveRequest>, StoreError>;

    /// Deletes the owner's request if it is pending and starts after `today`.
    async fn delete_pending_leave(
        &self,
        leave_id: u64,
        employee_id: u64,
        today: NaiveDate,
    ) -> Result<bool, StoreError>;
}
