use std::sync::Mutex;

use serde::Serialize;

use crate::model::leave_request::LeaveStatus;

/// Facts handed to the notification collaborator after key transitions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LeaveEvent {
    ApproverNeeded {
        request_id: i64,
        approver_employee_id: i64,
        employee_id: i64,
        leave_type: String,
        dates: String,
    },
    StatusChanged {
        request_id: i64,
        employee_id: i64,
        status: LeaveStatus,
        leave_type: String,
        dates: String,
    },
    BalanceThreshold {
        employee_id: i64,
        school_year_id: i64,
        leave_type: String,
        remaining: f64,
        requested: f64,
    },
}

/// Fire-and-forget outbound port. Delivery failures are the implementor's
/// concern and never fail a leave operation.
pub trait LeaveNotifier: Send + Sync {
    fn notify(&self, event: LeaveEvent);
}

/// Records events in the application log.
pub struct TracingNotifier;

impl LeaveNotifier for TracingNotifier {
    fn notify(&self, event: LeaveEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => tracing::info!(%payload, "Leave notification"),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize leave notification"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<LeaveEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<LeaveEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl LeaveNotifier for RecordingNotifier {
    fn notify(&self, event: LeaveEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
