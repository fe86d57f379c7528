use std::sync::Arc;

use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use trawl_domain::{AggregatedResult, Diagnostics, TierCounts, confidence};

use crate::{
	ResearchService, aggregate,
	status::{StatusEvent, StatusSink},
};

impl ResearchService {
	/// Plans, executes, and aggregates one research request. Never fails; the worst case is an
	/// empty result with zero confidence.
	pub async fn research(
		&self,
		query: &str,
		entity_context: Option<&str>,
		sink: Option<Arc<dyn StatusSink>>,
	) -> AggregatedResult {
		let request_id = Uuid::new_v4();
		let span = tracing::info_span!("research", %request_id);

		self.research_inner(query, entity_context, sink).instrument(span).await
	}

	async fn research_inner(
		&self,
		query: &str,
		entity_context: Option<&str>,
		sink: Option<Arc<dyn StatusSink>>,
	) -> AggregatedResult {
		let started = Instant::now();

		if query.trim().is_empty() {
			tracing::warn!("Empty research query.");

			return empty_result();
		}

		let result_cache = self.cache.as_ref().filter(|_| self.cfg.cache.cache_final_results);

		if let Some(cache) = result_cache
			&& let Some(mut cached) = cache.lookup_result(query, entity_context).await
		{
			tracing::info!(query = %query, "Serving research result from cache.");

			cached.diagnostics.cache_hit = true;
			cached.diagnostics.execution_time_ms = elapsed_ms(started);

			emit_metrics(&sink, &cached.diagnostics);

			return cached;
		}

		let plan = self.plan(query, entity_context).await;

		tracing::info!(
			query = %query,
			sub_queries = plan.sub_queries.len(),
			strategy = plan.strategy.label(),
			fallback = plan.fallback,
			"Research plan ready."
		);

		let report = self.execute(&plan.sub_queries, entity_context, sink.clone()).await;
		let total_sources_found = report.sources.len();
		let ranked = aggregate::aggregate_and_rank(
			report.sources,
			Some(query),
			self.cfg.aggregation.top_k,
		);
		let confidence = confidence::calculate_confidence(&ranked.sources);
		let diagnostics = Diagnostics {
			sub_queries_planned: plan.sub_queries.len(),
			sub_queries_executed: report.executed,
			sub_queries_timed_out: report.timed_out,
			total_sources_found,
			sources_by_tier: TierCounts::from_sources(&ranked.sources),
			deduplicated_count: ranked.deduplicated_count,
			execution_time_ms: elapsed_ms(started),
			cache_hits: report.cache_hits,
			cache_hit: false,
			strategy: Some(plan.strategy),
			fallback_plan: plan.fallback,
		};
		let result = AggregatedResult {
			sources: ranked.sources,
			answer: report.answer,
			confidence,
			diagnostics,
		};

		if let Some(cache) = result_cache
			&& !result.sources.is_empty()
		{
			cache.store_result(query, entity_context, &result).await;
		}

		emit_metrics(&sink, &result.diagnostics);

		result
	}
}

fn empty_result() -> AggregatedResult {
	AggregatedResult {
		sources: Vec::new(),
		answer: None,
		confidence: confidence::calculate_confidence(&[]),
		diagnostics: Diagnostics::default(),
	}
}

fn elapsed_ms(started: Instant) -> u64 {
	u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn emit_metrics(sink: &Option<Arc<dyn StatusSink>>, diagnostics: &Diagnostics) {
	if let Some(sink) = sink {
		sink.emit(&StatusEvent::Metrics { diagnostics: diagnostics.clone() });
	}
}
