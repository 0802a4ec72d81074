use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, SubsecRound, Utc};
use serde::Serialize;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::error::{AppError, AttendanceError, StoreError};
use crate::model::attendance::{AttendanceStatus, ClockRecord, DayState, hours_between};
use crate::model::employee::EmployeeProfile;
use crate::services::stats::{AttendanceSummary, EmployeeAttendanceSummary, summarize_attendance};
use crate::store::{AttendanceStore, ClockInWrite, EmployeeDirectory};
use crate::utils::date_range::DateRange;

/// Attendance rules, fixed for the lifetime of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendancePolicy {
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub min_session: Duration,
    pub default_work_hours: f64,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            window_start: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or_default(),
            window_end: NaiveTime::from_hms_opt(23, 0, 0).unwrap_or_default(),
            min_session: Duration::minutes(10),
            default_work_hours: 8.0,
        }
    }
}

impl AttendancePolicy {
    /// Both ends inclusive.
    pub fn allows_clock_in_at(&self, local_time: NaiveTime) -> bool {
        self.window_start <= local_time && local_time <= self.window_end
    }
}

/* =========================
State machine
========================= */

/// Opens the day. `existing` is the stored record for `now`'s calendar day.
pub fn clock_in(
    existing: Option<&ClockRecord>,
    employee_id: u64,
    now: DateTime<FixedOffset>,
    policy: &AttendancePolicy,
) -> Result<ClockRecord, AttendanceError> {
    let now = now.trunc_subsecs(0);
    if !policy.allows_clock_in_at(now.time()) {
        return Err(AttendanceError::OutOfWindow {
            local_time: now.time(),
            window_start: policy.window_start,
            window_end: policy.window_end,
        });
    }

    if let Some(record) = existing {
        if let Some(clock_in_at) = record.clock_in_at {
            return Err(AttendanceError::AlreadyClockedIn {
                clock_in_at,
                can_clock_out: record.clock_out_at.is_none(),
            });
        }
    }

    Ok(ClockRecord::clocked_in(
        employee_id,
        now.date_naive(),
        now.with_timezone(&Utc),
    ))
}

/// Closes the day and derives worked hours and overtime.
pub fn clock_out(
    existing: Option<&ClockRecord>,
    now: DateTime<FixedOffset>,
    standard_hours: f64,
    policy: &AttendancePolicy,
) -> Result<ClockRecord, AttendanceError> {
    let local_now = now.trunc_subsecs(0);
    let now = local_now.with_timezone(&Utc);

    let record = match existing {
        Some(record) => record,
        None => {
            return Err(AttendanceError::NotClockedIn {
                date: local_now.date_naive(),
            });
        }
    };

    match record.day_state() {
        DayState::NotStarted => Err(AttendanceError::NotClockedIn { date: record.date }),
        DayState::ClockedOut { at } => Err(AttendanceError::AlreadyClockedOut {
            clock_out_at: at,
            total_worked_hours: record.total_worked_hours,
        }),
        DayState::ClockedIn { since } => {
            let elapsed = now - since;
            if elapsed <= Duration::zero() || elapsed < policy.min_session {
                return Err(AttendanceError::SessionTooShort {
                    elapsed_minutes: elapsed.num_minutes().max(0),
                    minimum_minutes: policy.min_session.num_minutes(),
                });
            }
            Ok(record
                .clone()
                .complete(now, standard_hours, policy.min_session))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DayPhase {
    NotStarted,
    ClockedIn,
    ClockedOut,
}

/// Live view of the day, computed without touching the store.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TodayStatus {
    pub employee_id: u64,
    #[schema(format = "date", value_type = String)]
    pub date: NaiveDate,
    pub phase: DayPhase,
    pub status: AttendanceStatus,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub clock_in_at: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub clock_out_at: Option<DateTime<Utc>>,
    pub can_clock_in: bool,
    pub can_clock_out: bool,
    /// Running total while clocked in, final total once clocked out
    pub hours_worked_so_far: f64,
    pub overtime_hours: f64,
    pub minimum_session_minutes: i64,
}

pub fn today_status(
    record: Option<&ClockRecord>,
    employee_id: u64,
    now: DateTime<FixedOffset>,
    policy: &AttendancePolicy,
) -> TodayStatus {
    let now = now.trunc_subsecs(0);
    let now_utc = now.with_timezone(&Utc);
    let state = record.map_or(DayState::NotStarted, ClockRecord::day_state);

    let (phase, hours_worked_so_far, can_clock_out) = match state {
        DayState::NotStarted => (DayPhase::NotStarted, 0.0, false),
        DayState::ClockedIn { since } => (
            DayPhase::ClockedIn,
            hours_between(since, now_utc),
            now_utc - since >= policy.min_session && now_utc > since,
        ),
        DayState::ClockedOut { .. } => (
            DayPhase::ClockedOut,
            record.map_or(0.0, |r| r.total_worked_hours),
            false,
        ),
    };

    TodayStatus {
        employee_id,
        date: now.date_naive(),
        phase,
        status: record.map_or(AttendanceStatus::Absent, |r| r.status),
        clock_in_at: record.and_then(|r| r.clock_in_at),
        clock_out_at: record.and_then(|r| r.clock_out_at),
        can_clock_in: phase == DayPhase::NotStarted && policy.allows_clock_in_at(now.time()),
        can_clock_out,
        hours_worked_so_far,
        overtime_hours: record.map_or(0.0, |r| r.overtime_hours),
        minimum_session_minutes: policy.min_session.num_minutes(),
    }
}

/* =========================
Service
========================= */
pub struct AttendanceService {
    directory: Arc<dyn EmployeeDirectory>,
    store: Arc<dyn AttendanceStore>,
    policy: AttendancePolicy,
}

impl AttendanceService {
    pub fn new(
        directory: Arc<dyn EmployeeDirectory>,
        store: Arc<dyn AttendanceStore>,
        policy: AttendancePolicy,
    ) -> Self {
        Self {
            directory,
            store,
            policy,
        }
    }

    async fn active_employee(&self, employee_id: u64) -> Result<EmployeeProfile, AppError> {
        let employee = self
            .directory
            .get_employee(employee_id)
            .await?
            .ok_or(AppError::EmployeeNotFound { employee_id })?;
        if !employee.is_active {
            return Err(AppError::EmployeeInactive { employee_id });
        }
        Ok(employee)
    }

    #[instrument(name = "attendance_clock_in", skip(self, now), fields(now = %now))]
    pub async fn clock_in(
        &self,
        employee_id: u64,
        now: DateTime<FixedOffset>,
    ) -> Result<ClockRecord, AppError> {
        self.active_employee(employee_id).await?;

        let existing = self
            .store
            .get_clock_record(employee_id, now.date_naive())
            .await?;
        let record = clock_in(existing.as_ref(), employee_id, now, &self.policy)?;

        match self.store.insert_clock_in(&record).await? {
            ClockInWrite::Created(record) => {
                info!(employee_id, date = %record.date, "Clocked in");
                Ok(record)
            }
            ClockInWrite::AlreadyOpen(stored) => {
                let rejection = clock_in(Some(&stored), employee_id, now, &self.policy).err();
                Err(rejection
                    .map(AppError::from)
                    .unwrap_or_else(|| StoreError::Conflict("attendance_records".into()).into()))
            }
        }
    }

    #[instrument(name = "attendance_clock_out", skip(self, now), fields(now = %now))]
    pub async fn clock_out(
        &self,
        employee_id: u64,
        now: DateTime<FixedOffset>,
    ) -> Result<ClockRecord, AppError> {
        let employee = self.active_employee(employee_id).await?;
        let standard_hours = employee.standard_hours(self.policy.default_work_hours);

        let today = now.date_naive();
        let existing = self.store.get_clock_record(employee_id, today).await?;
        let completed = clock_out(existing.as_ref(), now, standard_hours, &self.policy)?;

        if let Some(record) = self.store.complete_clock_out(&completed).await? {
            info!(
                employee_id,
                date = %record.date,
                worked = record.total_worked_hours,
                overtime = record.overtime_hours,
                "Clocked out"
            );
            return Ok(record);
        }

        // lost the race to another clock-out; report what is stored now
        let stored = self.store.get_clock_record(employee_id, today).await?;
        match clock_out(stored.as_ref(), now, standard_hours, &self.policy) {
            Err(e) => Err(e.into()),
            Ok(_) => Err(StoreError::Conflict("attendance_records".into()).into()),
        }
    }

    pub async fn today_status(
        &self,
        employee_id: u64,
        now: DateTime<FixedOffset>,
    ) -> Result<TodayStatus, AppError> {
        self.active_employee(employee_id).await?;
        let record = self
            .store
            .get_clock_record(employee_id, now.date_naive())
            .await?;
        Ok(today_status(record.as_ref(), employee_id, now, &self.policy))
    }

    pub async fn history(
        &self,
        employee_id: u64,
        range: DateRange,
    ) -> Result<Vec<ClockRecord>, AppError> {
        Ok(self.store.list_clock_records(employee_id, range).await?)
    }

    pub async fn summary(
        &self,
        employee_id: u64,
        range: DateRange,
    ) -> Result<AttendanceSummary, AppError> {
        let records = self.store.list_clock_records(employee_id, range).await?;
        Ok(summarize_attendance(&records, range))
    }

    /// Per-employee summaries for everyone with a record in the range.
    pub async fn team_report(
        &self,
        range: DateRange,
    ) -> Result<Vec<EmployeeAttendanceSummary>, AppError> {
        let records = self.store.list_all_clock_records(range).await?;
        let mut by_employee: BTreeMap<u64, Vec<ClockRecord>> = BTreeMap::new();
        for record in records {
            by_employee.entry(record.employee_id).or_default().push(record);
        }
        Ok(by_employee
            .into_iter()
            .map(|(employee_id, records)| EmployeeAttendanceSummary {
                employee_id,
                summary: summarize_attendance(&records, range),
            })
            .collect())
    }
}
