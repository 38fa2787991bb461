pub mod employee;
pub mod holiday;
pub mod leave_request;
pub mod leave_type;
pub mod ledger;
pub mod org_unit;
pub mod period;
pub mod role;
pub mod staffing;
