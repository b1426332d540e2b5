use crate::error::{DetectorError, Result};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

pub const HEURISTIC_COLUMN_COUNT: usize = 8;

/// Heuristic columns that follow the lexical block in every feature row.
pub const HEURISTIC_COLUMNS: [&str; HEURISTIC_COLUMN_COUNT] = [
    "length",
    "count_at",
    "count_hyphen",
    "count_question",
    "count_percent",
    "starts_https",
    "has_ip",
    "digit_count",
];

/// Column layout shared by the trainer and every inference call.
///
/// Persisted inside both artifacts; a row whose width disagrees with the
/// schema is rejected instead of being scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub lexical_width: usize,
    pub heuristic_columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(lexical_width: usize) -> Self {
        Self {
            version: SCHEMA_VERSION,
            lexical_width,
            heuristic_columns: HEURISTIC_COLUMNS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.lexical_width + self.heuristic_columns.len()
    }

    /// Whether a persisted schema describes the layout this build produces.
    pub fn check_compatible(&self) -> std::result::Result<(), String> {
        if self.version != SCHEMA_VERSION {
            return Err(format!(
                "schema version {} is not supported (expected {})",
                self.version, SCHEMA_VERSION
            ));
        }
        if self.heuristic_columns.len() != HEURISTIC_COLUMN_COUNT
            || self
                .heuristic_columns
                .iter()
                .zip(HEURISTIC_COLUMNS.iter())
                .any(|(a, b)| a != b)
        {
            return Err(format!(
                "heuristic columns {:?} do not match {:?}",
                self.heuristic_columns, HEURISTIC_COLUMNS
            ));
        }
        Ok(())
    }

    pub fn check_width(&self, got: usize) -> Result<()> {
        let expected = self.width();
        if got != expected {
            return Err(DetectorError::SchemaMismatch { expected, got });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_is_lexical_plus_heuristics() {
        assert_eq!(FeatureSchema::new(2000).width(), 2008);
        assert_eq!(FeatureSchema::new(0).width(), 8);
    }

    #[test]
    fn test_check_width() {
        let schema = FeatureSchema::new(10);
        assert!(schema.check_width(18).is_ok());
        assert!(matches!(
            schema.check_width(17),
            Err(DetectorError::SchemaMismatch {
                expected: 18,
                got: 17
            })
        ));
    }

    #[test]
    fn test_reordered_columns_are_incompatible() {
        let mut schema = FeatureSchema::new(4);
        assert!(schema.check_compatible().is_ok());

        schema.heuristic_columns.swap(0, 1);
        assert!(schema.check_compatible().is_err());

        let mut schema = FeatureSchema::new(4);
        schema.version = SCHEMA_VERSION + 1;
        assert!(schema.check_compatible().is_err());
    }
}
