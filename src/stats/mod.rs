//! Weighted survey statistics: estimation, grouping, and screening.

pub mod estimator;
pub mod group;
pub mod reliability;

pub use estimator::{ConfidenceInterval, ConfidenceLevel, PrevalenceEstimate, WeightedTally};
pub use group::{summarize_by, tally_by, Category, GroupSummary};
pub use reliability::ReliabilityPolicy;
