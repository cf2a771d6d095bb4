//! `shoplens-insights`: Customer behaviour analytics engine.
//!
//! Pure engine crate: receives a pre-loaded transaction ledger, returns RFM
//! scores, segments, cohort retention, churn exposure and headline metrics
//! as one serializable bundle. No filesystem or network access.

pub mod cache;
pub mod churn;
pub mod cohort;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod model;
pub mod profile;
pub mod score;
pub mod segment;

pub use cache::{AnalysisCache, CacheKey};
pub use config::{AnalysisConfig, CohortGranularity};
pub use engine::run;
pub use error::{InsightsError, InsightsResult};
pub use ledger::load_csv_transactions;
pub use model::{AnalysisResult, LedgerInput, Segment, Transaction};
pub use segment::{SegmentRule, SegmentRules};
