use std::time::Duration;

use ahash::AHashSet;
use serde_json::Value;
use tokio::time;

use trawl_domain::{
	Priority, QueryPlan, Strategy, SubQuery,
	entity::{self, EntityKind},
	text,
};
use trawl_providers::generation;

use crate::{ResearchService, executor};

/// Rough cost of one grounded-search round trip.
pub const ESTIMATED_TASK_MS: u64 = 2_500;

const ORIGINAL_PURPOSE: &str = "original query";

impl ResearchService {
	/// Decomposes a query into prioritized sub-queries. Never fails: any provider or parsing
	/// problem falls back to the heuristic plan.
	pub async fn plan(&self, query: &str, entity_context: Option<&str>) -> QueryPlan {
		let planner = &self.cfg.planner;

		if !planner.enabled {
			return fallback_plan(query, entity_context, planner, &self.cfg.executor);
		}

		let prompt = build_decomposition_prompt(query, entity_context, planner.max_sub_queries);
		let policy = self.retry_policy();
		let call = self.providers.decomposition.decompose(
			&self.cfg.providers.planner,
			&policy,
			&prompt,
		);
		let response = match time::timeout(Duration::from_millis(planner.timeout_ms), call).await {
			Ok(Ok(response)) => response,
			Ok(Err(err)) => {
				tracing::warn!(error = %err, "Query decomposition failed. Using fallback plan.");

				return fallback_plan(query, entity_context, planner, &self.cfg.executor);
			},
			Err(_) => {
				tracing::warn!(
					timeout_ms = planner.timeout_ms,
					"Query decomposition timed out. Using fallback plan."
				);

				return fallback_plan(query, entity_context, planner, &self.cfg.executor);
			},
		};
		let parsed = generation::parse_json_answer(&response).ok().and_then(|json| {
			parse_plan(&json, query, entity_context, planner, &self.cfg.executor)
		});

		match parsed {
			Some(plan) => plan,
			None => {
				tracing::warn!("Query decomposition output is malformed. Using fallback plan.");

				fallback_plan(query, entity_context, planner, &self.cfg.executor)
			},
		}
	}
}

pub fn build_decomposition_prompt(
	query: &str,
	entity_context: Option<&str>,
	max_sub_queries: usize,
) -> String {
	let mut prompt = format!(
		"Split the research question below into at most {} focused web search queries.\n\
		 Respond with JSON only: {{\"subQueries\":[{{\"query\":string,\"purpose\":string,\
		 \"priority\":\"high\"|\"medium\"|\"low\"}}],\"strategy\":\"comprehensive\"|\"focused\"|\
		 \"comparative\"}}.\n\nQuestion: {}\n",
		max_sub_queries.saturating_sub(1).max(1),
		query.trim()
	);

	if let Some(context) = entity_context.map(str::trim).filter(|context| !context.is_empty()) {
		prompt.push_str("\nKnown entity context:\n");
		prompt.push_str(context);
		prompt.push('\n');
	}

	prompt
}

/// Builds a plan from decomposition output. `None` when the output lacks a sub-query list.
pub fn parse_plan(
	json: &Value,
	query: &str,
	entity_context: Option<&str>,
	planner: &trawl_config::Planner,
	executor: &trawl_config::Executor,
) -> Option<QueryPlan> {
	let items = json.get("subQueries").and_then(Value::as_array)?;
	let mut sub_queries = vec![SubQuery::new(query.trim(), ORIGINAL_PURPOSE, Priority::High)];

	for item in items {
		let Some(text) = item.get("query").and_then(Value::as_str).map(str::trim) else { continue };

		if text.is_empty() {
			continue;
		}

		let purpose = item.get("purpose").and_then(Value::as_str).unwrap_or_default().trim();
		let priority = item
			.get("priority")
			.and_then(Value::as_str)
			.and_then(Priority::parse)
			.unwrap_or(Priority::Medium);

		sub_queries.push(SubQuery::new(text, purpose, priority));
	}

	let strategy = json
		.get("strategy")
		.and_then(Value::as_str)
		.and_then(Strategy::parse)
		.unwrap_or_else(|| infer_strategy(query));

	Some(finish_plan(query, entity_context, sub_queries, strategy, false, planner, executor))
}

/// Deterministic plan: the original query plus heuristic sub-queries for the detected entity kind.
pub fn fallback_plan(
	query: &str,
	entity_context: Option<&str>,
	planner: &trawl_config::Planner,
	executor: &trawl_config::Executor,
) -> QueryPlan {
	let sub_queries = vec![SubQuery::new(query.trim(), ORIGINAL_PURPOSE, Priority::High)];

	finish_plan(query, entity_context, sub_queries, infer_strategy(query), true, planner, executor)
}

/// One or two sub-queries derived from keyword patterns in the query and entity context.
pub fn heuristic_sub_queries(query: &str, entity_context: Option<&str>) -> Vec<SubQuery> {
	let query = query.trim().trim_end_matches(['?', '.', '!']);
	let probe = match entity_context {
		Some(context) => format!("{query}\n{context}"),
		None => query.to_string(),
	};
	let subject = match entity::imo_number(&probe) {
		Some(imo) if !query.contains(&imo) => format!("{query} IMO {imo}"),
		_ => query.to_string(),
	};
	let mut out = Vec::new();

	for kind in entity::detect_kinds(&probe) {
		let derived = match kind {
			EntityKind::Vessel => SubQuery::new(
				format!("{subject} vessel particulars flag owner"),
				"vessel registry details",
				Priority::Medium,
			),
			EntityKind::Company => SubQuery::new(
				format!("{subject} company fleet and ownership"),
				"company profile",
				Priority::Medium,
			),
			EntityKind::Equipment => SubQuery::new(
				format!("{subject} manufacturer specifications"),
				"equipment specifications",
				Priority::Medium,
			),
		};

		out.push(derived);
	}

	out.push(SubQuery::new(format!("{subject} official source"), "authoritative sources", Priority::Low));
	out.push(SubQuery::new(format!("{subject} latest news"), "recent developments", Priority::Low));
	out.truncate(2);

	out
}

/// Case- and whitespace-insensitive dedup. The first occurrence wins.
pub fn dedup_sub_queries(sub_queries: &[SubQuery]) -> Vec<SubQuery> {
	let mut seen = AHashSet::new();

	sub_queries
		.iter()
		.filter(|sub_query| {
			let normalized = text::normalize_query(&sub_query.query);

			!normalized.is_empty() && seen.insert(normalized)
		})
		.cloned()
		.collect()
}

/// `min(global budget, ceil(n / workers(n)) * ESTIMATED_TASK_MS)`.
pub fn estimate_execution_time_ms(task_count: usize, executor: &trawl_config::Executor) -> u64 {
	if task_count == 0 {
		return 0;
	}

	let workers = executor::worker_count(task_count, executor.min_workers, executor.max_workers);
	let rounds = task_count.div_ceil(workers.max(1)) as u64;

	(rounds * ESTIMATED_TASK_MS).min(executor.global_budget_ms)
}

fn finish_plan(
	query: &str,
	entity_context: Option<&str>,
	sub_queries: Vec<SubQuery>,
	strategy: Strategy,
	fallback: bool,
	planner: &trawl_config::Planner,
	executor: &trawl_config::Executor,
) -> QueryPlan {
	let mut sub_queries = dedup_sub_queries(&sub_queries);

	// Stable, so the original query stays first among the high-priority entries.
	sub_queries.sort_by_key(|sub_query| sub_query.priority);

	if sub_queries.len() < planner.min_sub_queries {
		let mut padded = sub_queries;

		padded.extend(heuristic_sub_queries(query, entity_context));

		sub_queries = dedup_sub_queries(&padded);
	}

	sub_queries.truncate(planner.max_sub_queries);

	let estimated_execution_time_ms = estimate_execution_time_ms(sub_queries.len(), executor);

	QueryPlan {
		main_query: query.trim().to_string(),
		sub_queries,
		strategy,
		estimated_execution_time_ms,
		fallback,
	}
}

fn infer_strategy(query: &str) -> Strategy {
	let normalized = text::normalize_query(query);
	let comparative = [" vs ", " vs. ", " versus ", "compare", "difference between"]
		.iter()
		.any(|marker| normalized.contains(marker));

	if comparative { Strategy::Comparative } else { Strategy::Comprehensive }
}
