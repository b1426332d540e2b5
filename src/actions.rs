//! Simulated enforcement actions.
//!
//! Nothing here touches a mail store, a gateway or a user session. Each
//! call describes what would have happened, records it in the audit trail
//! and returns the description.

use crate::alert::now_iso;
use crate::audit::{ActionRecord, AuditEvent, AuditSink};
use std::sync::Arc;

#[derive(Clone)]
pub struct Enforcer {
    sink: Arc<dyn AuditSink>,
}

impl Enforcer {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    pub fn quarantine_email(&self, email_id: &str, reason: &str) -> String {
        self.record(format!(
            "Email {} quarantined (simulated): {}",
            email_id, reason
        ))
    }

    pub fn block_url(&self, url: &str, reason: &str) -> String {
        self.record(format!(
            "URL blocked at gateway (simulated): {} - {}",
            url, reason
        ))
    }

    pub fn alert_user(&self, user: &str, message: &str) -> String {
        self.record(format!("User alert for {}: {}", user, message))
    }

    fn record(&self, action: String) -> String {
        log::info!("{}", action);
        self.sink.append(&AuditEvent::Action(ActionRecord {
            timestamp: now_iso(),
            action: action.clone(),
        }));
        action
    }
}
