use std::sync::Arc;

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use tracing::{debug, info, instrument};

use crate::error::{AppError, LeaveError, StoreError};
use crate::model::leave_request::{
    ConflictingLeave, LeaveDecision, LeaveRequest, LeaveSpan, LeaveStatus, LeaveType,
    NewLeaveRequest,
};
use crate::services::overlap::{Availability, assess, find_conflicts};
use crate::services::stats::{LeaveSummary, summarize_leave};
use crate::store::{EmployeeDirectory, LeaveInsert, LeavePageQuery, LeaveStore};
use crate::utils::date_range::DateRange;

#[derive(Debug, Clone, PartialEq)]
pub struct LeavePolicy {
    pub max_days: u32,
}

impl Default for LeavePolicy {
    fn default() -> Self {
        Self { max_days: 90 }
    }
}

pub struct LeaveService {
    directory: Arc<dyn EmployeeDirectory>,
    store: Arc<dyn LeaveStore>,
    policy: LeavePolicy,
}

fn overlap_conflict(conflicts: &[LeaveRequest]) -> AppError {
    LeaveError::OverlapConflict {
        conflicts: conflicts.iter().map(ConflictingLeave::from).collect(),
    }
    .into()
}

impl LeaveService {
    pub fn new(
        directory: Arc<dyn EmployeeDirectory>,
        store: Arc<dyn LeaveStore>,
        policy: LeavePolicy,
    ) -> Self {
        Self {
            directory,
            store,
            policy,
        }
    }

    async fn ensure_active(&self, employee_id: u64) -> Result<(), AppError> {
        match self.directory.get_employee(employee_id).await? {
            None => Err(AppError::EmployeeNotFound { employee_id }),
            Some(e) if !e.is_active => Err(AppError::EmployeeInactive { employee_id }),
            Some(_) => Ok(()),
        }
    }

    async fn blocking_requests(&self, employee_id: u64) -> Result<Vec<LeaveRequest>, AppError> {
        Ok(self
            .store
            .list_leave_requests(employee_id, &LeaveStatus::BLOCKING)
            .await?)
    }

    pub async fn check_availability(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<Availability, AppError> {
        self.ensure_active(employee_id).await?;
        let existing = self.blocking_requests(employee_id).await?;
        Ok(assess(
            &existing,
            employee_id,
            start,
            end,
            today,
            self.policy.max_days,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    #[instrument(name = "leave_create", skip(self, reason, now))]
    pub async fn create_request(
        &self,
        employee_id: u64,
        leave_type: LeaveType,
        start: NaiveDate,
        end: NaiveDate,
        reason: String,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, AppError> {
        self.ensure_active(employee_id).await?;
        let span = LeaveSpan::validate(start, end, today, self.policy.max_days)?;

        let existing = self.blocking_requests(employee_id).await?;
        let conflicts: Vec<LeaveRequest> = find_conflicts(&existing, employee_id, span.bounds())
            .into_iter()
            .cloned()
            .collect();
        if !conflicts.is_empty() {
            debug!(employee_id, conflicts = conflicts.len(), "Leave overlaps");
            return Err(overlap_conflict(&conflicts));
        }

        let request = NewLeaveRequest {
            employee_id,
            leave_type,
            span,
            reason,
            created_at: now.trunc_subsecs(0),
        };
        match self.store.insert_leave_request(request).await? {
            LeaveInsert::Created(created) => {
                info!(
                    employee_id,
                    leave_id = created.id,
                    total_days = created.total_days,
                    "Leave requested"
                );
                Ok(created)
            }
            LeaveInsert::Conflicts(conflicts) => {
                info!(employee_id, "Leave overlap detected at write time");
                Err(overlap_conflict(&conflicts))
            }
        }
    }

    /// Withdraws the owner's pending request. Someone else's request is
    /// reported as missing.
    #[instrument(name = "leave_cancel", skip(self))]
    pub async fn cancel_request(
        &self,
        leave_id: u64,
        employee_id: u64,
        today: NaiveDate,
    ) -> Result<(), AppError> {
        let request = self.owned_request(leave_id, employee_id).await?;
        request.ensure_cancellable(today)?;

        if self
            .store
            .delete_pending_leave(leave_id, employee_id, today)
            .await?
        {
            info!(employee_id, leave_id, "Leave cancelled");
            return Ok(());
        }

        // reviewed or deleted in between
        let current = self.owned_request(leave_id, employee_id).await?;
        current.ensure_cancellable(today)?;
        Err(StoreError::Conflict("leave_requests".into()).into())
    }

    #[instrument(name = "leave_review", skip(self, at))]
    pub async fn review_request(
        &self,
        leave_id: u64,
        reviewer_id: u64,
        decision: LeaveDecision,
        at: DateTime<Utc>,
    ) -> Result<LeaveRequest, AppError> {
        let reviewed = self
            .get_request(leave_id)
            .await?
            .reviewed(decision, reviewer_id, at.trunc_subsecs(0))?;

        if let Some(updated) = self.store.review_leave_request(&reviewed).await? {
            info!(leave_id, reviewer_id, status = %updated.status, "Leave reviewed");
            return Ok(updated);
        }

        // reviewed by someone else in between
        let current = self.get_request(leave_id).await?;
        current.ensure_reviewable()?;
        Err(StoreError::Conflict("leave_requests".into()).into())
    }

    pub async fn get_request(&self, leave_id: u64) -> Result<LeaveRequest, AppError> {
        self.store
            .get_leave_request(leave_id)
            .await?
            .ok_or_else(|| LeaveError::NotFound { leave_id }.into())
    }

    async fn owned_request(&self, leave_id: u64, employee_id: u64) -> Result<LeaveRequest, AppError> {
        match self.store.get_leave_request(leave_id).await? {
            Some(request) if request.employee_id == employee_id => Ok(request),
            _ => Err(LeaveError::NotFound { leave_id }.into()),
        }
    }

    pub async fn list_own(
        &self,
        employee_id: u64,
        statuses: &[LeaveStatus],
    ) -> Result<Vec<LeaveRequest>, AppError> {
        Ok(self.store.list_leave_requests(employee_id, statuses).await?)
    }

    pub async fn list_page(
        &self,
        query: &LeavePageQuery,
    ) -> Result<(Vec<LeaveRequest>, i64), AppError> {
        Ok(self.store.list_leave_page(query).await?)
    }

    pub async fn summary(&self, employee_id: u64, range: DateRange) -> Result<LeaveSummary, AppError> {
        let requests = self.store.list_leave_requests(employee_id, &[]).await?;
        Ok(summarize_leave(&requests, range))
    }
}
