use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

/// Read-only view of an employee, as supplied by the employee directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1000,
    "work_hours_per_day": 8.0,
    "is_active": true,
    "role": "employee"
}))]
pub struct EmployeeProfile {
    #[schema(example = 1000)]
    pub id: u64,

    /// Standard daily hours; the policy default applies when unset
    #[schema(example = 8.0, nullable = true)]
    pub work_hours_per_day: Option<f64>,

    #[schema(example = true)]
    pub is_active: bool,

    pub role: Role,
}

impl EmployeeProfile {
    pub fn standard_hours(&self, default_hours: f64) -> f64 {
        match self.work_hours_per_day {
            Some(hours) if hours > 0.0 => hours,
            _ => default_hours,
        }
    }
}
