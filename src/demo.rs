//! The bundled walk-through: one URL and one email, rule-scored, with
//! alerts raised when a score reaches the threshold.

use crate::alert::{Alert, AlertBuilder, AlertRequest, ThreatVector};
use crate::audit::AuditSink;
use crate::features::UrlHeuristics;
use crate::scoring::{analyze_email, analyze_url, EmailAnalysis, UrlAnalysis};
use std::collections::HashMap;
use std::sync::Arc;

pub const SAMPLE_URL: &str = "http://paypal.com.user.verify.verify-login.info";
pub const SAMPLE_FROM: &str = "\"PayPal Support\" <no-reply@paypal.com.user.verify.verify-login.info>";
pub const SAMPLE_BODY: &str =
    "Your account will be suspended unless you verify now: http://paypal.com.user.verify.verify-login.info/login";
pub const SAMPLE_TARGET: &str = "user@example.com";

pub struct DemoReport {
    pub url: UrlAnalysis,
    pub url_alert: Option<Alert>,
    pub email: EmailAnalysis,
    pub email_alert: Option<Alert>,
}

pub fn url_alert_request(analysis: &UrlAnalysis, target: &str) -> AlertRequest {
    AlertRequest {
        vector: ThreatVector::Url,
        target: target.to_string(),
        threat_type: "URL-based phishing (heuristic)".to_string(),
        risk_score: analysis.suspicion_score,
        analysis: serde_json::json!({
            "technique_detected": "heuristic_url",
            "features_used": UrlHeuristics::KEYS,
            "triggered": analysis.triggered,
        }),
        actions: vec!["simulated_block".to_string()],
    }
}

pub fn email_alert_request(analysis: &EmailAnalysis, target: &str) -> AlertRequest {
    AlertRequest {
        vector: ThreatVector::Email,
        target: target.to_string(),
        threat_type: "Email phishing (heuristic)".to_string(),
        risk_score: analysis.suspicion_score,
        analysis: serde_json::json!({
            "technique_detected": "display_name_mismatch/urgent_language",
            "features_used": ["display_name_mismatch", "urgency_score"],
            "triggered": analysis.triggered,
        }),
        actions: vec!["simulated_quarantine".to_string()],
    }
}

pub fn run_demo(sink: Arc<dyn AuditSink>, threshold: f64) -> DemoReport {
    let builder = AlertBuilder::new(sink);

    let url = analyze_url(SAMPLE_URL);
    let url_alert = (url.suspicion_score >= threshold)
        .then(|| builder.make_alert(url_alert_request(&url, SAMPLE_TARGET)));

    let mut headers = HashMap::new();
    headers.insert("From".to_string(), SAMPLE_FROM.to_string());
    let email = analyze_email(&headers, SAMPLE_BODY);
    let email_alert = (email.suspicion_score >= threshold)
        .then(|| builder.make_alert(email_alert_request(&email, SAMPLE_TARGET)));

    DemoReport {
        url,
        url_alert,
        email,
        email_alert,
    }
}
