//! Model-free suspicion scores.
//!
//! The weights and thresholds below are policy constants. Severity grading
//! and the alert threshold are tuned against these exact sums, so changing
//! any of them changes which inputs alert.

use crate::features::{email_heuristics, url_heuristics, EmailHeuristics, UrlHeuristics};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Additive score clamped to [0, 1], with the rules that contributed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleScore {
    pub score: f64,
    pub triggered: Vec<String>,
}

struct Accumulator {
    total: f64,
    triggered: Vec<String>,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            total: 0.0,
            triggered: Vec::new(),
        }
    }

    fn add_if(&mut self, condition: bool, weight: f64, rule: &str) {
        if condition {
            self.add(weight, rule);
        }
    }

    fn add(&mut self, weight: f64, rule: &str) {
        if weight > 0.0 {
            self.total += weight;
            self.triggered.push(rule.to_string());
        }
    }

    fn finish(self) -> RuleScore {
        RuleScore {
            score: self.total.clamp(0.0, 1.0),
            triggered: self.triggered,
        }
    }
}

pub fn score_url(h: &UrlHeuristics) -> RuleScore {
    let mut acc = Accumulator::new();
    acc.add_if(h.has_ip == 1, 0.3, "has_ip");
    acc.add_if(h.count_dots > 3, 0.2, "count_dots");
    acc.add_if(h.count_hyphen > 2, 0.15, "count_hyphen");
    acc.add_if(h.shannon_entropy > 4.0, 0.15, "shannon_entropy");
    acc.add_if(h.suspicious_tld == 1, 0.1, "suspicious_tld");
    acc.add_if(h.digit_count > 5, 0.1, "digit_count");
    acc.finish()
}

pub fn score_email(h: &EmailHeuristics) -> RuleScore {
    let mut acc = Accumulator::new();
    acc.add_if(h.display_name_mismatch, 0.3, "display_name_mismatch");
    acc.add_if(h.links > 2, 0.25, "links");
    acc.add(0.3 * h.urgency_score, "urgency_score");
    acc.add_if(h.exclamation_count > 3, 0.05, "exclamation_count");
    acc.add_if(h.html_like, 0.1, "html_like");
    acc.finish()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlAnalysis {
    pub url: String,
    pub heuristics: UrlHeuristics,
    pub suspicion_score: f64,
    pub triggered: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAnalysis {
    pub from: String,
    pub links: usize,
    pub urgency_score: f64,
    pub display_name_mismatch: bool,
    pub exclamation_count: usize,
    pub html_like: bool,
    pub suspicion_score: f64,
    pub triggered: Vec<String>,
}

pub fn analyze_url(url: &str) -> UrlAnalysis {
    let heuristics = url_heuristics(url);
    let RuleScore { score, triggered } = score_url(&heuristics);
    log::debug!("URL rule score {:.2} for {} ({:?})", score, url, triggered);

    UrlAnalysis {
        url: url.to_string(),
        heuristics,
        suspicion_score: score,
        triggered,
    }
}

pub fn analyze_email(headers: &HashMap<String, String>, body: &str) -> EmailAnalysis {
    let h = email_heuristics(headers, body);
    let RuleScore { score, triggered } = score_email(&h);
    log::debug!("Email rule score {:.2} ({:?})", score, triggered);

    EmailAnalysis {
        from: h.sender,
        links: h.links,
        urgency_score: h.urgency_score,
        display_name_mismatch: h.display_name_mismatch,
        exclamation_count: h.exclamation_count,
        html_like: h.html_like,
        suspicion_score: score,
        triggered,
    }
}
