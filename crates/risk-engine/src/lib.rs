pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod merge;
pub mod model;
pub mod popup;
pub mod registry;
pub mod rules;
pub mod scoring;

pub use config::EngineConfig;
pub use engine::{DocumentSet, RiskEngine};
pub use error::EngineError;
pub use model::{
    Category, CategoryScores, DetectedRisk, OverallLevel, PageMode, PageSnapshot,
    RiskCardDefinition, RiskResult, Severity,
};
pub use registry::RiskCardRegistry;
pub use rules::RuleCatalog;
