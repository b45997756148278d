use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

/// Vacation entitlement bookkeeping. `remaining` is always `total - used`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"total": 30.0, "used": 3.0, "remaining": 27.0, "carry_over": 0.0}))]
pub struct VacationBalance {
    pub total: f64,
    pub used: f64,
    pub remaining: f64,
    pub carry_over: f64,
}

impl VacationBalance {
    pub fn new(total: f64) -> Self {
        Self {
            total,
            used: 0.0,
            remaining: total,
            carry_over: 0.0,
        }
    }

    pub fn debit(&mut self, days: f64) {
        self.used += days;
        self.remaining = self.total - self.used;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Directory object id
    #[schema(example = "6e1c1b3a-7f2d-4f0e-9b55-0c3a2d1e9f10")]
    pub id: String,
    #[schema(example = "john.doe@company.com")]
    pub email: String,
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = "Engineering", nullable = true)]
    pub department: Option<String>,
    #[schema(nullable = true)]
    pub job_title: Option<String>,
    #[schema(nullable = true)]
    pub manager_id: Option<String>,
    #[schema(nullable = true)]
    pub manager_email: Option<String>,
    pub role: Role,
    pub vacation: VacationBalance,
    pub is_active: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}
