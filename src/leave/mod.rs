pub mod approver;
pub mod calendar;
pub mod capacity;
pub mod catalog;
pub mod clock;
pub mod directory;
pub mod ledger;
pub mod notify;
pub mod policy;
pub mod posting;
pub mod requests;
pub mod validation;
pub mod workflow;

pub use workflow::{Actor, LeaveService};
