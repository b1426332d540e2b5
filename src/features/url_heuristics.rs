use super::information::{kolmogorov_approx, shannon_entropy};
use crate::model::schema::HEURISTIC_COLUMN_COUNT;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// TLDs that add to the rule score when the host ends in one of them.
pub const SUSPICIOUS_TLDS: [&str; 5] = ["info", "xyz", "top", "ru", "cn"];

lazy_static! {
    static ref IPV4_REGEX: Regex = Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap();
}

/// Lexical and statistical signals for one URL.
///
/// Field order is the key order of the record and must not change: it is
/// serialized positionally into audit analysis and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlHeuristics {
    pub length: usize,
    pub count_dots: usize,
    pub count_hyphen: usize,
    pub count_at: usize,
    pub count_question: usize,
    pub has_ip: u8,
    pub starts_https: u8,
    pub shannon_entropy: f64,
    pub kolmogorov_approx: f64,
    pub suspicious_tld: u8,
    pub digit_count: usize,
}

impl UrlHeuristics {
    pub const KEYS: [&'static str; 11] = [
        "length",
        "count_dots",
        "count_hyphen",
        "count_at",
        "count_question",
        "has_ip",
        "starts_https",
        "shannon_entropy",
        "kolmogorov_approx",
        "suspicious_tld",
        "digit_count",
    ];

    /// Values paired with their keys, in key order.
    pub fn entries(&self) -> [(&'static str, f64); 11] {
        [
            (Self::KEYS[0], self.length as f64),
            (Self::KEYS[1], self.count_dots as f64),
            (Self::KEYS[2], self.count_hyphen as f64),
            (Self::KEYS[3], self.count_at as f64),
            (Self::KEYS[4], self.count_question as f64),
            (Self::KEYS[5], self.has_ip as f64),
            (Self::KEYS[6], self.starts_https as f64),
            (Self::KEYS[7], self.shannon_entropy),
            (Self::KEYS[8], self.kolmogorov_approx),
            (Self::KEYS[9], self.suspicious_tld as f64),
            (Self::KEYS[10], self.digit_count as f64),
        ]
    }
}

pub fn has_ip(url: &str) -> bool {
    IPV4_REGEX.is_match(url)
}

/// Unicode numeric characters, so non-ASCII digit scripts count too.
pub fn count_digits(url: &str) -> usize {
    url.chars().filter(|c| c.is_numeric()).count()
}

/// Host component of `url`, lower-cased.
///
/// The host is taken as written: `Url::parse` rewrites numeric hosts such
/// as `3232235777` into dotted quads, which would invent dots. Falls back
/// to the whole string when the URL has no parseable host (schemeless
/// input, `mailto:` and the like).
pub fn extract_host(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) if !host.is_empty() => {
                raw_authority_host(url).unwrap_or(host).to_lowercase()
            }
            _ => url.to_lowercase(),
        },
        Err(_) => url.to_lowercase(),
    }
}

/// Host text between `://` and the path, without userinfo or port.
fn raw_authority_host(url: &str) -> Option<&str> {
    let rest = &url[url.find("://")? + 3..];
    let end = rest.find(&['/', '?', '#', '\\'][..]).unwrap_or(rest.len());
    let authority = &rest[..end];
    let host = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let host = if host.starts_with('[') {
        host.find(']').map_or(host, |i| &host[..=i])
    } else {
        host.rsplit_once(':').map_or(host, |(h, _)| h)
    };
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

pub fn has_suspicious_tld(host: &str) -> bool {
    SUSPICIOUS_TLDS
        .iter()
        .any(|tld| host.ends_with(&format!(".{}", tld)))
}

/// Heuristic record for a URL. Surrounding whitespace is ignored.
pub fn url_heuristics(url: &str) -> UrlHeuristics {
    let u = url.trim();
    let host = extract_host(u);

    UrlHeuristics {
        length: u.chars().count(),
        count_dots: host.matches('.').count(),
        count_hyphen: u.matches('-').count(),
        count_at: u.matches('@').count(),
        count_question: u.matches('?').count(),
        has_ip: has_ip(u) as u8,
        starts_https: u.starts_with("https") as u8,
        shannon_entropy: shannon_entropy(u),
        kolmogorov_approx: kolmogorov_approx(u),
        suspicious_tld: has_suspicious_tld(&host) as u8,
        digit_count: count_digits(u),
    }
}

/// Heuristic columns appended to the lexical features of a model row.
///
/// Order matches `schema::HEURISTIC_COLUMNS`. The URL is used exactly as
/// given so that training and inference see the same string.
pub fn model_heuristics(url: &str) -> [f64; HEURISTIC_COLUMN_COUNT] {
    [
        url.chars().count() as f64,
        url.matches('@').count() as f64,
        url.matches('-').count() as f64,
        url.matches('?').count() as f64,
        url.matches('%').count() as f64,
        url.starts_with("https") as u8 as f64,
        has_ip(url) as u8 as f64,
        count_digits(url) as f64,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_url_heuristics() {
        let h = url_heuristics("http://1.2.3.4/login-verify-account?x=1");

        assert_eq!(h.has_ip, 1);
        assert_eq!(h.starts_https, 0);
        assert_eq!(h.count_hyphen, 2);
        assert_eq!(h.count_question, 1);
        assert_eq!(h.count_dots, 3);
        assert_eq!(h.digit_count, 5);
        assert_eq!(h.suspicious_tld, 0);
    }

    #[test]
    fn test_host_dots_ignore_path() {
        let h = url_heuristics("https://example.com/a.b.c.d.e");
        assert_eq!(h.count_dots, 1);
        assert_eq!(h.starts_https, 1);
    }

    #[test]
    fn test_numeric_host_keeps_its_written_form() {
        assert_eq!(extract_host("http://3232235777/login"), "3232235777");
        let h = url_heuristics("http://3232235777/login");
        assert_eq!(h.count_dots, 0);
        assert_eq!(h.has_ip, 0);

        assert_eq!(extract_host("http://User@Mail.Example.com:8080/x"), "mail.example.com");
        assert_eq!(extract_host("http://[::1]:80/"), "[::1]");
    }

    #[test]
    fn test_non_ascii_digits_are_counted() {
        assert_eq!(url_heuristics("http://a.com/١٢٣٤٥٦").digit_count, 6);
        assert_eq!(count_digits("abc123"), 3);
    }

    #[test]
    fn test_unparseable_url_uses_whole_string() {
        assert_eq!(extract_host("Paypal.Com.verify.info"), "paypal.com.verify.info");
        let h = url_heuristics("paypal.com.verify.info");
        assert_eq!(h.count_dots, 3);
        assert_eq!(h.suspicious_tld, 1);
    }

    #[test]
    fn test_suspicious_tld_is_suffix_match() {
        assert!(has_suspicious_tld("login.example.ru"));
        assert!(has_suspicious_tld("paypal.com.user.verify.verify-login.info"));
        // substring, not suffix
        assert!(!has_suspicious_tld("info.example.com"));
        // suffix without the dot boundary
        assert!(!has_suspicious_tld("example.guru"));
    }

    #[test]
    fn test_malformed_input_never_panics() {
        for input in ["", "   ", "http://", "://::", "http://[::1", "\u{0}\u{1}"] {
            let h = url_heuristics(input);
            assert!(h.shannon_entropy >= 0.0);
        }
    }

    #[test]
    fn test_key_order_is_stable() {
        let h = url_heuristics("https://a-b.example.xyz/?q=1");
        let keys: Vec<&str> = h.entries().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, UrlHeuristics::KEYS.to_vec());

        let json = serde_json::to_string(&h).unwrap();
        let positions: Vec<usize> = UrlHeuristics::KEYS
            .iter()
            .map(|k| json.find(&format!("\"{}\"", k)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_model_heuristics_column_order() {
        let v = model_heuristics("https://a@b-c.com/x?y=%20-1");
        assert_eq!(
            v,
            [27.0, 1.0, 2.0, 1.0, 1.0, 1.0, 0.0, 3.0]
        );
    }

    #[test]
    fn test_model_heuristics_do_not_trim() {
        let padded = model_heuristics(" http://a.com ");
        let plain = model_heuristics("http://a.com");
        assert_eq!(padded[0], plain[0] + 2.0);
        assert_eq!(padded[5], 0.0);
    }
}
