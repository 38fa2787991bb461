use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Birthday leave: must fall in the birth month and cost at most one unit.
pub const BIRTHDAY_LEAVE: &str = "BL";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveType {
    #[schema(example = 3)]
    pub id: i64,
    #[schema(example = "SL")]
    pub code: String,
    #[schema(example = "Sick Leave")]
    pub name: String,
    pub counts_against_balance: bool,
    pub requires_med_cert: bool,
    pub requires_prior_notice_days: i64,
}

/// Per-school-year override. `employment_class = None` is the generic row;
/// a class-specific row always wins when one exists.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeavePolicy {
    pub id: i64,
    pub school_year_id: i64,
    pub leave_type_id: i64,
    pub employment_class: Option<String>,
    pub requires_med_cert: Option<bool>,
    pub prior_notice_days: Option<i64>,
}
