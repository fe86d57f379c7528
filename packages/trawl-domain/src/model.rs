use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
	High,
	Medium,
	Low,
}
impl Priority {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"high" => Some(Self::High),
			"medium" | "med" => Some(Self::Medium),
			"low" => Some(Self::Low),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuery {
	pub query: String,
	pub purpose: String,
	pub priority: Priority,
}
impl SubQuery {
	pub fn new(query: impl Into<String>, purpose: impl Into<String>, priority: Priority) -> Self {
		Self { query: query.into(), purpose: purpose.into(), priority }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
	Comprehensive,
	Focused,
	Comparative,
}
impl Strategy {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"comprehensive" => Some(Self::Comprehensive),
			"focused" => Some(Self::Focused),
			"comparative" => Some(Self::Comparative),
			_ => None,
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			Self::Comprehensive => "comprehensive",
			Self::Focused => "focused",
			Self::Comparative => "comparative",
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlan {
	pub main_query: String,
	pub sub_queries: Vec<SubQuery>,
	pub strategy: Strategy,
	pub estimated_execution_time_ms: u64,
	/// Set when the plan came from the heuristic path instead of the decomposition provider.
	pub fallback: bool,
}

/// Authority tier. Lower is more authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
	T1,
	T2,
	T3,
}
impl Tier {
	pub fn rank(self) -> u8 {
		match self {
			Self::T1 => 1,
			Self::T2 => 2,
			Self::T3 => 3,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
	pub url: String,
	pub title: String,
	pub content: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub score: Option<f32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tier: Option<Tier>,
}
impl Source {
	pub fn new(
		url: impl Into<String>,
		title: impl Into<String>,
		content: impl Into<String>,
		score: Option<f32>,
	) -> Self {
		Self { url: url.into(), title: title.into(), content: content.into(), score, tier: None }
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
	pub t1: usize,
	pub t2: usize,
	pub t3: usize,
}
impl TierCounts {
	pub fn from_sources(sources: &[Source]) -> Self {
		let mut counts = Self::default();

		for source in sources {
			match source.tier.unwrap_or(Tier::T3) {
				Tier::T1 => counts.t1 += 1,
				Tier::T2 => counts.t2 += 1,
				Tier::T3 => counts.t3 += 1,
			}
		}

		counts
	}

	pub fn total(&self) -> usize {
		self.t1 + self.t2 + self.t3
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLabel {
	High,
	Medium,
	Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confidence {
	pub score: u8,
	pub label: ConfidenceLabel,
	pub tier_counts: TierCounts,
	pub reasoning: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
	pub sub_queries_planned: usize,
	pub sub_queries_executed: usize,
	pub sub_queries_timed_out: usize,
	pub total_sources_found: usize,
	pub sources_by_tier: TierCounts,
	pub deduplicated_count: usize,
	pub execution_time_ms: u64,
	pub cache_hits: usize,
	pub cache_hit: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub strategy: Option<Strategy>,
	pub fallback_plan: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
	pub sources: Vec<Source>,
	pub answer: Option<String>,
	pub confidence: Confidence,
	pub diagnostics: Diagnostics,
}

/// The payload both cache tiers store for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResult {
	pub sources: Vec<Source>,
	pub answer: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub diagnostics: Option<Diagnostics>,
}
