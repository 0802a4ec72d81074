use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{Mutex, RwLock};

use crate::error::StoreError;
use crate::model::attendance::ClockRecord;
use crate::model::employee::EmployeeProfile;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest};
use crate::model::role::Role;
use crate::services::overlap::find_conflicts;
use crate::store::{
    AttendanceStore, ClockInWrite, EmployeeDirectory, LeaveInsert, LeavePageQuery, LeaveStore,
};
use crate::utils::date_range::DateRange;

#[derive(Default)]
struct LeaveTable {
    last_id: u64,
    rows: BTreeMap<u64, LeaveRequest>,
}

/// Store backed by process memory. Each table sits behind one lock, so every
/// read-check-write below is serialized the same way the database does it.
#[derive(Default)]
pub struct MemoryStore {
    employees: RwLock<HashMap<u64, EmployeeProfile>>,
    attendance: Mutex<BTreeMap<(u64, NaiveDate), ClockRecord>>,
    leave: Mutex<LeaveTable>,
}

impl MemoryStore {
    pub async fn with_employee(self, id: u64, work_hours_per_day: Option<f64>, is_active: bool) -> Self {
        self.employees.write().await.insert(
            id,
            EmployeeProfile {
                id,
                work_hours_per_day,
                is_active,
                role: Role::Employee,
            },
        );
        self
    }

    pub async fn put_clock_record(&self, record: ClockRecord) {
        self.attendance
            .lock()
            .await
            .insert((record.employee_id, record.date), record);
    }
}

#[async_trait]
impl EmployeeDirectory for MemoryStore {
    async fn get_employee(&self, employee_id: u64) -> Result<Option<EmployeeProfile>, StoreError> {
        Ok(self.employees.read().await.get(&employee_id).cloned())
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn get_clock_record(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<ClockRecord>, StoreError> {
        Ok(self.attendance.lock().await.get(&(employee_id, date)).cloned())
    }

    async fn insert_clock_in(&self, record: &ClockRecord) -> Result<ClockInWrite, StoreError> {
        let mut table = self.attendance.lock().await;
        let key = (record.employee_id, record.date);
        match table.get(&key) {
            Some(existing) if existing.clock_in_at.is_some() => {
                Ok(ClockInWrite::AlreadyOpen(existing.clone()))
            }
            _ => {
                table.insert(key, record.clone());
                Ok(ClockInWrite::Created(record.clone()))
            }
        }
    }

    async fn complete_clock_out(
        &self,
        record: &ClockRecord,
    ) -> Result<Option<ClockRecord>, StoreError> {
        let mut table = self.attendance.lock().await;
        match table.get_mut(&(record.employee_id, record.date)) {
            Some(stored) if stored.clock_in_at.is_some() && stored.clock_out_at.is_none() => {
                *stored = record.clone();
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list_clock_records(
        &self,
        employee_id: u64,
        range: DateRange,
    ) -> Result<Vec<ClockRecord>, StoreError> {
        Ok(self
            .attendance
            .lock()
            .await
            .range((employee_id, range.start)..=(employee_id, range.end))
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn list_all_clock_records(&self, range: DateRange) -> Result<Vec<ClockRecord>, StoreError> {
        Ok(self
            .attendance
            .lock()
            .await
            .values()
            .filter(|r| range.contains(r.date))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LeaveStore for MemoryStore {
    async fn get_leave_request(&self, leave_id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        Ok(self.leave.lock().await.rows.get(&leave_id).cloned())
    }

    async fn list_leave_requests(
        &self,
        employee_id: u64,
        statuses: &[LeaveStatus],
    ) -> Result<Vec<LeaveRequest>, StoreError> {
        let table = self.leave.lock().await;
        let mut rows: Vec<LeaveRequest> = table
            .rows
            .values()
            .filter(|r| r.employee_id == employee_id)
            .filter(|r| statuses.is_empty() || statuses.contains(&r.status))
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.start_date, r.id));
        Ok(rows)
    }

    async fn list_leave_page(
        &self,
        query: &LeavePageQuery,
    ) -> Result<(Vec<LeaveRequest>, i64), StoreError> {
        let table = self.leave.lock().await;
        let matching: Vec<&LeaveRequest> = table
            .rows
            .values()
            .rev()
            .filter(|r| query.employee_id.is_none_or(|id| r.employee_id == id))
            .filter(|r| query.status.is_none_or(|s| r.status == s))
            .collect();
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn insert_leave_request(&self, request: NewLeaveRequest) -> Result<LeaveInsert, StoreError> {
        let mut table = self.leave.lock().await;
        let existing: Vec<LeaveRequest> = table.rows.values().cloned().collect();
        let conflicts = find_conflicts(&existing, request.employee_id, request.span.bounds());
        if !conflicts.is_empty() {
            return Ok(LeaveInsert::Conflicts(conflicts.into_iter().cloned().collect()));
        }

        table.last_id += 1;
        let created = request.into_pending(table.last_id);
        table.rows.insert(created.id, created.clone());
        Ok(LeaveInsert::Created(created))
    }

    async fn review_leave_request(
        &self,
        reviewed: &LeaveRequest,
    ) -> Result<Option<LeaveRequest>, StoreError> {
        let mut table = self.leave.lock().await;
        match table.rows.get_mut(&reviewed.id) {
            Some(row) if row.status == LeaveStatus::Pending => {
                row.status = reviewed.status;
                row.reviewed_by = reviewed.reviewed_by;
                row.reviewed_at = reviewed.reviewed_at;
                Ok(Some(row.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_pending_leave(
        &self,
        leave_id: u64,
        employee_id: u64,
        today: NaiveDate,
    ) -> Result<bool, StoreError> {
        let mut table = self.leave.lock().await;
        let removable = table.rows.get(&leave_id).is_some_and(|r| {
            r.employee_id == employee_id && r.status == LeaveStatus::Pending && r.start_date > today
        });
        if removable {
            table.rows.remove(&leave_id);
        }
        Ok(removable)
    }
}

/// Serves the first `stale` single-row or per-employee reads from `before`,
/// a copy of the data as a caller saw it, while writes and later reads go to
/// `live`. Replays a caller whose read was overtaken by a concurrent write.
pub struct StaleReads {
    before: Arc<MemoryStore>,
    live: Arc<MemoryStore>,
    stale: AtomicUsize,
}

impl StaleReads {
    pub fn new(before: Arc<MemoryStore>, live: Arc<MemoryStore>, stale: usize) -> Self {
        Self {
            before,
            live,
            stale: AtomicUsize::new(stale),
        }
    }

    fn read_side(&self) -> &MemoryStore {
        let stale = self
            .stale
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale { self.before.as_ref() } else { self.live.as_ref() }
    }
}

#[async_trait]
impl EmployeeDirectory for StaleReads {
    async fn get_employee(&self, employee_id: u64) -> Result<Option<EmployeeProfile>, StoreError> {
        self.live.get_employee(employee_id).await
    }
}

#[async_trait]
impl AttendanceStore for StaleReads {
    async fn get_clock_record(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<ClockRecord>, StoreError> {
        self.read_side().get_clock_record(employee_id, date).await
    }

    async fn insert_clock_in(&self, record: &ClockRecord) -> Result<ClockInWrite, StoreError> {
        self.live.insert_clock_in(record).await
    }

    async fn complete_clock_out(
        &self,
        record: &ClockRecord,
    ) -> Result<Option<ClockRecord>, StoreError> {
        self.live.complete_clock_out(record).await
    }

    async fn list_clock_records(
        &self,
        employee_id: u64,
        range: DateRange,
    ) -> Result<Vec<ClockRecord>, StoreError> {
        self.live.list_clock_records(employee_id, range).await
    }

    async fn list_all_clock_records(&self, range: DateRange) -> Result<Vec<ClockRecord>, StoreError> {
        self.live.list_all_clock_records(range).await
    }
}

#[async_trait]
impl LeaveStore for StaleReads {
    async fn get_leave_request(&self, leave_id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        self.read_side().get_leave_request(leave_id).await
    }

    async fn list_leave_requests(
        &self,
        employee_id: u64,
        statuses: &[LeaveStatus],
    ) -> Result<Vec<LeaveRequest>, StoreError> {
        self.read_side().list_leave_requests(employee_id, statuses).await
    }

    async fn list_leave_page(
        &self,
        query: &LeavePageQuery,
    ) -> Result<(Vec<LeaveRequest>, i64), StoreError> {
        self.live.list_leave_page(query).await
    }

    async fn insert_leave_request(&self, request: NewLeaveRequest) -> Result<LeaveInsert, StoreError> {
        self.live.insert_leave_request(request).await
    }

    async fn review_leave_request(
        &self,
        reviewed: &LeaveRequest,
    ) -> Result<Option<LeaveRequest>, StoreError> {
        self.live.review_leave_request(reviewed).await
    }

    async fn delete_pending_leave(
        &self,
        leave_id: u64,
        employee_id: u64,
        today: NaiveDate,
    ) -> Result<bool, StoreError> {
        self.live.delete_pending_leave(leave_id, employee_id, today).await
    }
}
