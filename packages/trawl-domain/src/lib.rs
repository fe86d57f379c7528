pub mod confidence;
pub mod entity;
pub mod links;
pub mod maritime;
pub mod model;
pub mod similarity;
pub mod text;
pub mod tier;

pub use model::{
	AggregatedResult, CachedResult, Confidence, ConfidenceLabel, Diagnostics, Priority, QueryPlan,
	Source, Strategy, SubQuery, Tier, TierCounts,
};
