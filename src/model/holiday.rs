use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::period::DateRange;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Holiday {
    pub id: i64,
    pub school_year_id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// A declared paid "no-class" day; it does not reduce leave units.
    pub is_working_day: bool,
}

impl Holiday {
    pub fn period(&self) -> DateRange {
        DateRange::new_unchecked(self.start_date, self.end_date)
    }
}
