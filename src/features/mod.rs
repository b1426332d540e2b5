pub mod email_heuristics;
pub mod information;
pub mod url_heuristics;

pub use email_heuristics::{email_heuristics, EmailHeuristics};
pub use information::{kolmogorov_approx, shannon_entropy};
pub use url_heuristics::{model_heuristics, url_heuristics, UrlHeuristics};

use std::collections::HashMap;

/// Case-insensitive header lookup utility function
pub fn get_header_case_insensitive<'a>(
    headers: &'a HashMap<String, String>,
    header_name: &str,
) -> Option<&'a String> {
    let header_lower = header_name.to_lowercase();
    headers
        .iter()
        .find(|(k, _)| k.to_lowercase() == header_lower)
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_ignores_case() {
        let mut headers = HashMap::new();
        headers.insert("FROM".to_string(), "a@b.com".to_string());

        assert_eq!(
            get_header_case_insensitive(&headers, "From"),
            Some(&"a@b.com".to_string())
        );
        assert_eq!(get_header_case_insensitive(&headers, "Reply-To"), None);
    }
}
