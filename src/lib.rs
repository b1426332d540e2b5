pub mod actions;
pub mod alert;
pub mod audit;
pub mod config;
pub mod demo;
pub mod detector;
pub mod error;
pub mod explain;
pub mod features;
pub mod model;
pub mod scoring;
pub mod training;

pub use actions::Enforcer;
pub use alert::{Alert, AlertBuilder, AlertRequest, Severity, ThreatVector};
pub use audit::{AuditEvent, AuditSink, JsonLineSink, MemorySink, Rotation};
pub use config::Config;
pub use detector::{Detector, Explanation, Prediction};
pub use error::{DetectorError, Result};
pub use explain::{Contribution, Explainer};
pub use model::{ArtifactStore, Artifacts, FileArtifactStore};
pub use scoring::{analyze_email, analyze_url, EmailAnalysis, UrlAnalysis};
pub use training::{load_labeled_csv, retrain_and_check, Trainer, TrainingReport};
