use super::get_header_case_insensitive;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Brand tokens checked against the `From` display name.
pub const BRAND_TOKENS: [&str; 5] = ["microsoft", "paypal", "google", "bank", "apple"];

/// Each distinct keyword found in the body adds `URGENCY_STEP`.
pub const URGENCY_KEYWORDS: [&str; 9] = [
    "urgent",
    "immediately",
    "asap",
    "action required",
    "verify",
    "password",
    "expire",
    "suspend",
    "security alert",
];

pub const URGENCY_STEP: f64 = 0.2;

lazy_static! {
    static ref DISPLAY_NAME_REGEX: Regex = Regex::new(r#""?([^"]+)"?\s*<([^>]+)>"#).unwrap();
    static ref LINK_REGEX: Regex = Regex::new(r"https?://").unwrap();
    static ref MARKUP_REGEX: Regex = Regex::new(r"<[^>]+>").unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailHeuristics {
    pub sender: String,
    pub links: usize,
    pub urgency_score: f64,
    pub display_name_mismatch: bool,
    pub exclamation_count: usize,
    pub html_like: bool,
}

pub fn extract_sender(headers: &HashMap<String, String>) -> String {
    get_header_case_insensitive(headers, "From")
        .cloned()
        .unwrap_or_default()
}

pub fn count_links(text: &str) -> usize {
    LINK_REGEX.find_iter(text).count()
}

/// Split a `From` value into (display name, address).
///
/// Accepts `"Name" <addr>` and `Name <addr>`; anything else yields `None`.
pub fn parse_display_name(from_header: &str) -> Option<(String, String)> {
    let caps = DISPLAY_NAME_REGEX.captures(from_header)?;
    let display = caps.get(1)?.as_str().trim().to_string();
    let address = caps.get(2)?.as_str().trim().to_string();
    Some((display, address))
}

fn address_domain(address: &str) -> &str {
    match address.rfind('@') {
        Some(pos) => &address[pos + 1..],
        None => address,
    }
}

/// A brand named in the display name that the sending domain does not carry.
pub fn has_display_name_mismatch(headers: &HashMap<String, String>) -> bool {
    let from = match get_header_case_insensitive(headers, "From") {
        Some(from) => from,
        None => return false,
    };
    let (display, address) = match parse_display_name(from) {
        Some(parts) => parts,
        None => return false,
    };

    let display = display.to_lowercase();
    let address = address.to_lowercase();
    let domain = address_domain(&address);

    BRAND_TOKENS
        .iter()
        .any(|brand| display.contains(brand) && !domain.contains(brand))
}

/// Keyword-based urgency in [0, 1].
///
/// A coarse proxy: counts distinct keywords from a closed list, with no
/// notion of negation or context.
pub fn urgency_score(text: &str) -> f64 {
    let lowered = text.to_lowercase();
    let matched = URGENCY_KEYWORDS
        .iter()
        .filter(|keyword| lowered.contains(*keyword))
        .count();
    (matched as f64 * URGENCY_STEP).min(1.0)
}

pub fn email_heuristics(headers: &HashMap<String, String>, body: &str) -> EmailHeuristics {
    EmailHeuristics {
        sender: extract_sender(headers),
        links: count_links(body),
        urgency_score: urgency_score(body),
        display_name_mismatch: has_display_name_mismatch(headers),
        exclamation_count: body.matches('!').count(),
        html_like: MARKUP_REGEX.is_match(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_header(value: &str) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("From".to_string(), value.to_string());
        headers
    }

    #[test]
    fn test_paypal_display_name_mismatch() {
        let headers = from_header("\"PayPal Support\" <no-reply@totally-different.biz>");
        assert!(has_display_name_mismatch(&headers));
    }

    #[test]
    fn test_brand_in_domain_is_not_mismatch() {
        let headers = from_header("\"PayPal Support\" <service@paypal.com>");
        assert!(!has_display_name_mismatch(&headers));
    }

    #[test]
    fn test_brand_only_in_local_part_is_mismatch() {
        let headers = from_header("PayPal <paypal-support@evil.example>");
        assert!(has_display_name_mismatch(&headers));
    }

    #[test]
    fn test_unquoted_display_name() {
        assert_eq!(
            parse_display_name("Apple Store <store@apple.com>"),
            Some(("Apple Store".to_string(), "store@apple.com".to_string()))
        );
    }

    #[test]
    fn test_unparseable_from_is_not_mismatch() {
        assert!(!has_display_name_mismatch(&from_header("paypal@evil.example")));
        assert!(!has_display_name_mismatch(&from_header("\"PayPal <broken")));
        assert!(!has_display_name_mismatch(&HashMap::new()));
    }

    #[test]
    fn test_urgency_counts_distinct_keywords_and_caps() {
        assert_eq!(urgency_score("hello there"), 0.0);
        assert!((urgency_score("URGENT urgent urgent") - 0.2).abs() < 1e-12);
        assert!((urgency_score("Verify your password") - 0.4).abs() < 1e-12);

        let all = URGENCY_KEYWORDS.join(" ");
        assert_eq!(urgency_score(&all), 1.0);
    }

    #[test]
    fn test_email_heuristics_record() {
        let headers = from_header("\"Google\" <alerts@google.com>");
        let body = "<p>Hi!!</p> see http://a.com and https://b.com!";
        let h = email_heuristics(&headers, body);

        assert_eq!(h.sender, "\"Google\" <alerts@google.com>");
        assert_eq!(h.links, 2);
        assert_eq!(h.exclamation_count, 3);
        assert!(h.html_like);
        assert!(!h.display_name_mismatch);
    }

    #[test]
    fn test_missing_from_yields_empty_sender() {
        let h = email_heuristics(&HashMap::new(), "");
        assert_eq!(h.sender, "");
        assert_eq!(h.links, 0);
        assert!(!h.html_like);
    }
}
