use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::LeaveError;
use crate::model::leave_request::{
    ConflictingLeave, LeaveRequest, LeaveSpan, days_between_inclusive,
};

/// Every pending or approved request of `employee_id` that shares a day with
/// `bounds`. Never short-circuits, so callers can show each conflict.
pub fn find_conflicts<'a>(
    existing: &'a [LeaveRequest],
    employee_id: u64,
    bounds: (NaiveDate, NaiveDate),
) -> Vec<&'a LeaveRequest> {
    existing
        .iter()
        .filter(|r| r.employee_id == employee_id)
        .filter(|r| r.status.blocks_overlap())
        .filter(|r| r.overlaps(bounds))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[schema(example = json!({
    "available": false,
    "total_days": 3,
    "conflicts": [{
        "id": 1,
        "leave_type": "annual",
        "start_date": "2025-06-10",
        "end_date": "2025-06-12",
        "status": "pending"
    }],
    "invalid_reason": null
}))]
pub struct Availability {
    pub available: bool,
    pub total_days: i64,
    pub conflicts: Vec<ConflictingLeave>,
    /// Set when the span itself fails validation
    #[schema(value_type = Option<Object>)]
    pub invalid_reason: Option<LeaveError>,
}

/// Admissibility of `[start, end]` for one employee: the span must validate
/// on its own and must not overlap any blocking request.
pub fn assess(
    existing: &[LeaveRequest],
    employee_id: u64,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
    max_days: u32,
) -> Availability {
    let invalid_reason = LeaveSpan::validate(start, end, today, max_days).err();
    let conflicts: Vec<ConflictingLeave> = if end >= start {
        find_conflicts(existing, employee_id, (start, end))
            .into_iter()
            .map(ConflictingLeave::from)
            .collect()
    } else {
        Vec::new()
    };

    Availability {
        available: invalid_reason.is_none() && conflicts.is_empty(),
        total_days: days_between_inclusive(start, end).max(0),
        conflicts,
        invalid_reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::leave_request::{LeaveStatus, LeaveType, NewLeaveRequest};
    use chrono::{TimeZone, Utc};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    fn request(id: u64, employee_id: u64, start: NaiveDate, end: NaiveDate, status: LeaveStatus) -> LeaveRequest {
        let mut r = NewLeaveRequest {
            employee_id,
            leave_type: LeaveType::Annual,
            span: LeaveSpan::validate(start, end, start, 90).unwrap(),
            reason: String::new(),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
        }
        .into_pending(id);
        r.status = status;
        r
    }

    #[test]
    fn collects_every_conflict() {
        let existing = vec![
            request(1, 7, d(6, 10), d(6, 12), LeaveStatus::Pending),
            request(2, 7, d(6, 13), d(6, 13), LeaveStatus::Approved),
            request(3, 7, d(6, 20), d(6, 21), LeaveStatus::Pending),
        ];
        let ids: Vec<u64> = find_conflicts(&existing, 7, (d(6, 11), d(6, 14)))
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn rejected_and_foreign_requests_never_block() {
        let existing = vec![
            request(1, 7, d(6, 10), d(6, 12), LeaveStatus::Rejected),
            request(2, 8, d(6, 10), d(6, 12), LeaveStatus::Approved),
        ];
        assert!(find_conflicts(&existing, 7, (d(6, 10), d(6, 12))).is_empty());
    }

    #[test]
    fn assess_reports_overlap_with_first_request() {
        let existing = vec![request(1, 7, d(6, 10), d(6, 12), LeaveStatus::Pending)];
        let availability = assess(&existing, 7, d(6, 11), d(6, 13), d(6, 1), 90);
        assert!(!availability.available);
        assert_eq!(availability.total_days, 3);
        assert_eq!(availability.conflicts.len(), 1);
        assert_eq!(availability.conflicts[0].id, 1);
        assert!(availability.invalid_reason.is_none());
    }

    #[test]
    fn assess_flags_invalid_span_without_conflicts() {
        let availability = assess(&[], 7, d(5, 30), d(6, 2), d(6, 1), 90);
        assert!(!availability.available);
        assert!(matches!(
            availability.invalid_reason,
            Some(LeaveError::StartInPast { .. })
        ));

        let reversed = assess(&[], 7, d(6, 5), d(6, 3), d(6, 1), 90);
        assert_eq!(reversed.total_days, 0);
        assert!(matches!(
            reversed.invalid_reason,
            Some(LeaveError::EndBeforeStart { .. })
        ));
    }

    #[test]
    fn assess_accepts_free_span() {
        let existing = vec![request(1, 7, d(6, 10), d(6, 12), LeaveStatus::Approved)];
        let availability = assess(&existing, 7, d(6, 13), d(6, 15), d(6, 1), 90);
        assert!(availability.available);
        assert_eq!(availability.total_days, 3);
    }
}
