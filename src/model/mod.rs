//! Hybrid lexical + heuristic URL model.
//!
//! ```text
//! url ─┬─→ TF-IDF char n-grams ──→ [lexical_width columns] ─┐
//!      └─→ model_heuristics ─────→ [8 columns] ─────────────┴─→ σ(w·x + b)
//! ```
//!
//! Fitting happens offline in `training`; at inference the fitted pair is
//! loaded once through an `ArtifactStore` and only read.

pub mod artifacts;
pub mod classifier;
pub mod composer;
pub mod schema;
pub mod vectorizer;

pub use artifacts::{ArtifactStore, Artifacts, FileArtifactStore};
pub use classifier::{LogisticModel, ProbabilisticModel};
pub use composer::{compose, compose_batch, feature_names, FeatureRow};
pub use schema::{FeatureSchema, HEURISTIC_COLUMNS, HEURISTIC_COLUMN_COUNT};
pub use vectorizer::{LexicalVector, TfidfVectorizer, VectorizerParams};
