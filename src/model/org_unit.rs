use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrgUnit {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub reports_to_president: bool,
}

/// Time-bounded grant of a role within an org unit, valid over `[valid_from, valid_to)`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoleAssignment {
    pub id: i64,
    pub employee_id: i64,
    pub org_unit_id: i64,
    pub role_code: String,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
}

impl RoleAssignment {
    pub fn role(&self) -> Option<RoleCode> {
        self.role_code.parse().ok()
    }
}

/// Role codes that take part in approval routing. Any other code on an
/// assignment (e.g. `STAFF`, `FACULTY`) is plain membership of the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleCode {
    UnitHead,
    Dean,
    Director,
    Vp,
    President,
}

impl RoleCode {
    pub const HEAD_LEVEL: [RoleCode; 3] = [RoleCode::UnitHead, RoleCode::Dean, RoleCode::Director];

    pub fn is_head_level(self) -> bool {
        Self::HEAD_LEVEL.contains(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_codes_round_trip_through_text() {
        assert_eq!("UNIT_HEAD".parse::<RoleCode>().unwrap(), RoleCode::UnitHead);
        assert_eq!(RoleCode::Vp.to_string(), "VP");
        assert!("STAFF".parse::<RoleCode>().is_err());
    }

    #[test]
    fn membership_codes_have_no_routing_role() {
        let a = RoleAssignment {
            id: 1,
            employee_id: 7,
            org_unit_id: 2,
            role_code: "DEAN".into(),
            valid_from: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            valid_to: None,
        };
        assert_eq!(a.role(), Some(RoleCode::Dean));
        assert!(RoleCode::Dean.is_head_level());
        assert!(!RoleCode::Vp.is_head_level());

        let staff = RoleAssignment {
            role_code: "STAFF".into(),
            ..a
        };
        assert_eq!(staff.role(), None);
    }
}
