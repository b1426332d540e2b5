use crate::audit::{AuditEvent, AuditSink};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

pub const THREAT_ID_PREFIX: &str = "phish_";
const THREAT_ID_SUFFIX_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 0.9 => Severity::Critical,
            s if s >= 0.7 => Severity::High,
            s if s >= 0.4 => Severity::Medium,
            _ => Severity::Low,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatVector {
    Url,
    Email,
}

/// UTC now, second precision, `Z` suffix.
pub fn now_iso() -> String {
    format_timestamp(Utc::now())
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

pub fn new_threat_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{}", THREAT_ID_PREFIX, &suffix[..THREAT_ID_SUFFIX_LEN])
}

/// What a caller supplies to raise an alert.
#[derive(Debug, Clone)]
pub struct AlertRequest {
    pub vector: ThreatVector,
    pub target: String,
    pub threat_type: String,
    pub risk_score: f64,
    pub analysis: serde_json::Value,
    pub actions: Vec<String>,
}

/// An audited detection event. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    timestamp: String,
    threat_id: String,
    vector: ThreatVector,
    target: String,
    threat_type: String,
    risk_score: f64,
    severity: Severity,
    analysis: serde_json::Value,
    action_taken: Vec<String>,
    knowledge_base_updated: bool,
}

impl Alert {
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn threat_id(&self) -> &str {
        &self.threat_id
    }

    pub fn vector(&self) -> ThreatVector {
        self.vector
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn threat_type(&self) -> &str {
        &self.threat_type
    }

    pub fn risk_score(&self) -> f64 {
        self.risk_score
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn analysis(&self) -> &serde_json::Value {
        &self.analysis
    }

    pub fn action_taken(&self) -> &[String] {
        &self.action_taken
    }

    pub fn knowledge_base_updated(&self) -> bool {
        self.knowledge_base_updated
    }
}

/// Builds alerts and records each one before handing it back.
#[derive(Clone)]
pub struct AlertBuilder {
    sink: Arc<dyn AuditSink>,
}

impl AlertBuilder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    pub fn make_alert(&self, request: AlertRequest) -> Alert {
        let risk_score = sanitize_score(request.risk_score);
        if risk_score.to_bits() != request.risk_score.to_bits() {
            log::warn!(
                "Risk score {} for {} outside [0, 1], recorded as {}",
                request.risk_score,
                request.target,
                risk_score
            );
        }

        let alert = Alert {
            timestamp: now_iso(),
            threat_id: new_threat_id(),
            vector: request.vector,
            target: request.target,
            threat_type: request.threat_type,
            risk_score,
            severity: Severity::from_score(risk_score),
            analysis: request.analysis,
            action_taken: request.actions,
            knowledge_base_updated: false,
        };

        self.sink.append(&AuditEvent::Alert(alert.clone()));
        log::info!(
            "Alert {} [{}] {} score {:.2} for {}",
            alert.threat_id,
            alert.severity,
            alert.threat_type,
            alert.risk_score,
            alert.target
        );
        alert
    }
}

/// Non-finite scores become 0; the rest are clamped to [0, 1].
fn sanitize_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
