use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "first_name": "John",
        "last_name": "Doe",
        "birth_date": "1990-03-14",
        "employment_class": "faculty"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: i64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "1990-03-14", value_type = String, format = "date")]
    pub birth_date: NaiveDate,

    /// Employment class used to pick class-specific leave policies and capacity rules
    #[schema(example = "faculty", nullable = true)]
    pub employment_class: Option<String>,
}
