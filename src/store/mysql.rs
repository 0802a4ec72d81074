use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySqlPool};
use tracing::{debug, warn};

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

const CLOCK_COLUMNS: &str =
    "employee_id, work_date, clock_in_at, clock_out_at, status, total_worked_hours, overtime_hours";

const LEAVE_COLUMNS: &str = "id, employee_id, leave_type, start_date, end_date, reason, status, \
     reviewed_by, reviewed_at, total_days, created_at";

pub(crate) const EMPLOYEE_SELECT: &str = r#"
    SELECT e.id, e.work_hours_per_day, e.status, u.role_id
    FROM employees e
    LEFT JOIN users u ON u.employee_id = e.id
"#;

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/* =========================
Row mapping
========================= */
#[derive(FromRow)]
struct ClockRecordRow {
    employee_id: u64,
    work_date: NaiveDate,
    clock_in_at: Option<DateTime<Utc>>,
    clock_out_at: Option<DateTime<Utc>>,
    status: String,
    total_worked_hours: f64,
    overtime_hours: f64,
}

impl TryFrom<ClockRecordRow> for ClockRecord {
    type Error = StoreError;

    fn try_from(row: ClockRecordRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|_| StoreError::Corrupt {
            entity: "attendance",
            detail: format!("status '{}'", row.status),
        })?;
        Ok(ClockRecord {
            employee_id: row.employee_id,
            date: row.work_date,
            clock_in_at: row.clock_in_at,
            clock_out_at: row.clock_out_at,
            status,
            total_worked_hours: row.total_worked_hours,
            overtime_hours: row.overtime_hours,
        })
    }
}

#[derive(FromRow)]
struct LeaveRow {
    id: u64,
    employee_id: u64,
    leave_type: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: Option<String>,
    status: String,
    reviewed_by: Option<u64>,
    reviewed_at: Option<DateTime<Utc>>,
    total_days: u32,
    created_at: DateTime<Utc>,
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = StoreError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        let corrupt = |detail: String| StoreError::Corrupt {
            entity: "leave_request",
            detail,
        };
        let leave_type = row
            .leave_type
            .parse()
            .map_err(|_| corrupt(format!("leave_type '{}'", row.leave_type)))?;
        let status = row
            .status
            .parse()
            .map_err(|_| corrupt(format!("status '{}'", row.status)))?;
        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            leave_type,
            start_date: row.start_date,
            end_date: row.end_date,
            reason: row.reason.unwrap_or_default(),
            status,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
            total_days: row.total_days,
            created_at: row.created_at,
        })
    }
}

fn leave_rows(rows: Vec<LeaveRow>) -> Result<Vec<LeaveRequest>, StoreError> {
    rows.into_iter().map(LeaveRequest::try_from).collect()
}

#[derive(FromRow)]
pub(crate) struct EmployeeRow {
    id: u64,
    work_hours_per_day: Option<f64>,
    status: Option<String>,
    role_id: Option<u8>,
}

impl From<EmployeeRow> for EmployeeProfile {
    fn from(row: EmployeeRow) -> Self {
        EmployeeProfile {
            id: row.id,
            work_hours_per_day: row.work_hours_per_day,
            is_active: row
                .status
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("active")),
            role: row.role_id.and_then(Role::from_id).unwrap_or(Role::Employee),
        }
    }
}

/// SQLSTATE classes that mean a concurrent writer got there first:
/// `23000` duplicate key, `40001` deadlock victim.
fn is_race_sqlstate(code: Option<&str>) -> bool {
    matches!(code, Some("23000" | "40001"))
}

fn is_lost_race(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if is_race_sqlstate(db_err.code().as_deref()))
}

/* =========================
Employee directory
========================= */
#[async_trait]
impl EmployeeDirectory for MySqlStore {
    async fn get_employee(&self, employee_id: u64) -> Result<Option<EmployeeProfile>, StoreError> {
        let sql = format!("{EMPLOYEE_SELECT} WHERE e.id = ? LIMIT 1");
        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(EmployeeProfile::from))
    }
}

/* =========================
Attendance
========================= */
#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn get_clock_record(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<ClockRecord>, StoreError> {
        let sql = format!(
            "SELECT {CLOCK_COLUMNS} FROM attendance_records WHERE employee_id = ? AND work_date = ?"
        );
        sqlx::query_as::<_, ClockRecordRow>(&sql)
            .bind(employee_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?
            .map(ClockRecord::try_from)
            .transpose()
    }

    async fn insert_clock_in(&self, record: &ClockRecord) -> Result<ClockInWrite, StoreError> {
        // the (employee_id, work_date) key decides who clocks in first
        let inserted = sqlx::query(
            r#"
            INSERT INTO attendance_records
                (employee_id, work_date, clock_in_at, status, total_worked_hours, overtime_hours)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.employee_id)
        .bind(record.date)
        .bind(record.clock_in_at)
        .bind(record.status.to_string())
        .bind(record.total_worked_hours)
        .bind(record.overtime_hours)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => return Ok(ClockInWrite::Created(record.clone())),
            Err(e) if is_lost_race(&e) => {}
            Err(e) => return Err(e.into()),
        }

        // the row exists: either an absent placeholder or someone else's clock-in
        let claimed = sqlx::query(
            r#"
            UPDATE attendance_records
            SET clock_in_at = ?, status = ?, total_worked_hours = 0, overtime_hours = 0
            WHERE employee_id = ? AND work_date = ? AND clock_in_at IS NULL
            "#,
        )
        .bind(record.clock_in_at)
        .bind(record.status.to_string())
        .bind(record.employee_id)
        .bind(record.date)
        .execute(&self.pool)
        .await;

        match claimed {
            Ok(done) if done.rows_affected() == 1 => {
                return Ok(ClockInWrite::Created(record.clone()));
            }
            Ok(_) => {}
            Err(e) if is_lost_race(&e) => {}
            Err(e) => return Err(e.into()),
        }

        warn!(employee_id = record.employee_id, date = %record.date, "Concurrent clock-in rejected");
        match self.get_clock_record(record.employee_id, record.date).await? {
            Some(stored) if stored.clock_in_at.is_some() => Ok(ClockInWrite::AlreadyOpen(stored)),
            _ => Err(StoreError::Conflict("attendance_records".into())),
        }
    }

    async fn complete_clock_out(
        &self,
        record: &ClockRecord,
    ) -> Result<Option<ClockRecord>, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance_records
            SET clock_out_at = ?, status = ?, total_worked_hours = ?, overtime_hours = ?
            WHERE employee_id = ?
            AND work_date = ?
            AND clock_in_at IS NOT NULL
            AND clock_out_at IS NULL
            "#,
        )
        .bind(record.clock_out_at)
        .bind(record.status.to_string())
        .bind(record.total_worked_hours)
        .bind(record.overtime_hours)
        .bind(record.employee_id)
        .bind(record.date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(record.clone()))
    }

    async fn list_clock_records(
        &self,
        employee_id: u64,
        range: DateRange,
    ) -> Result<Vec<ClockRecord>, StoreError> {
        let sql = format!(
            "SELECT {CLOCK_COLUMNS} FROM attendance_records \
             WHERE employee_id = ? AND work_date BETWEEN ? AND ? ORDER BY work_date"
        );
        sqlx::query_as::<_, ClockRecordRow>(&sql)
            .bind(employee_id)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(ClockRecord::try_from)
            .collect()
    }

    async fn list_all_clock_records(&self, range: DateRange) -> Result<Vec<ClockRecord>, StoreError> {
        let sql = format!(
            "SELECT {CLOCK_COLUMNS} FROM attendance_records \
             WHERE work_date BETWEEN ? AND ? ORDER BY employee_id, work_date"
        );
        sqlx::query_as::<_, ClockRecordRow>(&sql)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(ClockRecord::try_from)
            .collect()
    }
}

/* =========================
Leave requests
========================= */
// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Str(String),
}

#[async_trait]
impl LeaveStore for MySqlStore {
    async fn get_leave_request(&self, leave_id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");
        sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(leave_id)
            .fetch_optional(&self.pool)
            .await?
            .map(LeaveRequest::try_from)
            .transpose()
    }

    async fn list_leave_requests(
        &self,
        employee_id: u64,
        statuses: &[LeaveStatus],
    ) -> Result<Vec<LeaveRequest>, StoreError> {
        let mut sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE employee_id = ?");
        if !statuses.is_empty() {
            let marks = vec!["?"; statuses.len()].join(", ");
            sql.push_str(&format!(" AND status IN ({marks})"));
        }
        sql.push_str(" ORDER BY start_date, id");

        let mut query = sqlx::query_as::<_, LeaveRow>(&sql).bind(employee_id);
        for status in statuses {
            query = query.bind(status.to_string());
        }
        leave_rows(query.fetch_all(&self.pool).await?)
    }

    async fn list_leave_page(
        &self,
        query: &LeavePageQuery,
    ) -> Result<(Vec<LeaveRequest>, i64), StoreError> {
        // -------------------------
        // WHERE clause
        // -------------------------
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(employee_id) = query.employee_id {
            where_sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(employee_id));
        }
        if let Some(status) = query.status {
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Str(status.to_string()));
        }

        // -------------------------
        // COUNT query
        // -------------------------
        let count_sql = format!("SELECT COUNT(*) FROM leave_requests{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(s.clone()),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        // -------------------------
        // DATA query
        // -------------------------
        let data_sql = format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests{where_sql} \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        debug!(sql = %data_sql, limit = query.limit, offset = query.offset, "Fetching leave page");

        let mut data_q = sqlx::query_as::<_, LeaveRow>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::Str(s) => data_q.bind(s),
            };
        }
        let rows = data_q
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((leave_rows(rows)?, total))
    }

    async fn insert_leave_request(&self, request: NewLeaveRequest) -> Result<LeaveInsert, StoreError> {
        let mut tx = self.pool.begin().await?;

        // serializes every leave write of this employee until commit
        sqlx::query("SELECT id FROM employees WHERE id = ? FOR UPDATE")
            .bind(request.employee_id)
            .execute(&mut *tx)
            .await?;

        let sql = format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests \
             WHERE employee_id = ? AND status IN (?, ?) AND start_date <= ? AND end_date >= ?"
        );
        let (start, end) = request.span.bounds();
        let rows = sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(request.employee_id)
            .bind(LeaveStatus::Pending.to_string())
            .bind(LeaveStatus::Approved.to_string())
            .bind(end)
            .bind(start)
            .fetch_all(&mut *tx)
            .await?;
        let existing = leave_rows(rows)?;

        let conflicts = find_conflicts(&existing, request.employee_id, (start, end));
        if !conflicts.is_empty() {
            let conflicts = conflicts.into_iter().cloned().collect();
            tx.rollback().await?;
            return Ok(LeaveInsert::Conflicts(conflicts));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, leave_type, start_date, end_date, reason, status, total_days, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.employee_id)
        .bind(request.leave_type.to_string())
        .bind(start)
        .bind(end)
        .bind(request.reason.clone())
        .bind(LeaveStatus::Pending.to_string())
        .bind(request.span.total_days())
        .bind(request.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(LeaveInsert::Created(request.into_pending(result.last_insert_id())))
    }

    async fn review_leave_request(
        &self,
        reviewed: &LeaveRequest,
    ) -> Result<Option<LeaveRequest>, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, reviewed_by = ?, reviewed_at = ?
            WHERE id = ?
            AND status = ?
            "#,
        )
        .bind(reviewed.status.to_string())
        .bind(reviewed.reviewed_by)
        .bind(reviewed.reviewed_at)
        .bind(reviewed.id)
        .bind(LeaveStatus::Pending.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(reviewed.clone()))
    }

    async fn delete_pending_leave(
        &self,
        leave_id: u64,
        employee_id: u64,
        today: NaiveDate,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM leave_requests
            WHERE id = ?
            AND employee_id = ?
            AND status = ?
            AND start_date > ?
            "#,
        )
        .bind(leave_id)
        .bind(employee_id)
        .bind(LeaveStatus::Pending.to_string())
        .bind(today)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
