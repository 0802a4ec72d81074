use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance::{AttendanceStatus, ClockRecord, round2};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use crate::utils::date_range::DateRange;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceSummary {
    pub range: DateRange,
    /// Days with a record in the range
    pub total_days: u32,
    pub present_days: u32,
    pub partial_days: u32,
    pub absent_days: u32,
    pub total_worked_hours: f64,
    pub total_overtime_hours: f64,
    /// Mean over days with worked time
    pub average_hours_per_day: f64,
    /// `present_days / total_days * 100`, rounded
    pub attendance_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EmployeeAttendanceSummary {
    pub employee_id: u64,
    pub summary: AttendanceSummary,
}

/// Folds the records whose day falls in `range`; others are ignored.
pub fn summarize_attendance(records: &[ClockRecord], range: DateRange) -> AttendanceSummary {
    let mut summary = AttendanceSummary {
        range,
        total_days: 0,
        present_days: 0,
        partial_days: 0,
        absent_days: 0,
        total_worked_hours: 0.0,
        total_overtime_hours: 0.0,
        average_hours_per_day: 0.0,
        attendance_rate: 0,
    };
    let mut worked_days = 0u32;

    for record in records.iter().filter(|r| range.contains(r.date)) {
        summary.total_days += 1;
        match record.status {
            AttendanceStatus::Present => summary.present_days += 1,
            AttendanceStatus::Partial => summary.partial_days += 1,
            AttendanceStatus::Absent => summary.absent_days += 1,
        }
        if record.total_worked_hours > 0.0 {
            worked_days += 1;
        }
        summary.total_worked_hours += record.total_worked_hours;
        summary.total_overtime_hours += record.overtime_hours;
    }

    summary.total_worked_hours = round2(summary.total_worked_hours);
    summary.total_overtime_hours = round2(summary.total_overtime_hours);
    if worked_days > 0 {
        summary.average_hours_per_day = round2(summary.total_worked_hours / f64::from(worked_days));
    }
    if summary.total_days > 0 {
        summary.attendance_rate =
            (f64::from(summary.present_days) / f64::from(summary.total_days) * 100.0).round() as u32;
    }
    summary
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaveTally {
    pub requests: u32,
    /// Leave days that fall inside the range
    pub days: i64,
}

impl LeaveTally {
    fn add(&mut self, days: i64) {
        self.requests += 1;
        self.days += days;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LeaveSummary {
    pub range: DateRange,
    pub total: LeaveTally,
    #[schema(value_type = Object)]
    pub by_status: BTreeMap<LeaveStatus, LeaveTally>,
    #[schema(value_type = Object)]
    pub by_type: BTreeMap<LeaveType, LeaveTally>,
}

/// Groups requests touching `range`. Day totals are clipped to the range so a
/// leave crossing a month boundary counts in each month for its own days.
pub fn summarize_leave(requests: &[LeaveRequest], range: DateRange) -> LeaveSummary {
    let mut summary = LeaveSummary {
        range,
        total: LeaveTally::default(),
        by_status: BTreeMap::new(),
        by_type: BTreeMap::new(),
    };

    for request in requests {
        let days = range.overlap_days(request.start_date, request.end_date);
        if days == 0 {
            continue;
        }
        summary.total.add(days);
        summary.by_status.entry(request.status).or_default().add(days);
        summary.by_type.entry(request.leave_type).or_default().add(days);
    }
    summary
}
