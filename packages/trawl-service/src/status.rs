//! Progress events for callers that want to watch a research run. Purely observational: a sink
//! never influences the result.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use trawl_domain::Diagnostics;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum StatusEvent {
	Searching { index: usize, total: usize, query: String },
	SubQueryCompleted { index: usize, query: String, sources: usize, cache_hit: bool },
	SubQueryTimedOut { index: usize, query: String },
	Metrics { diagnostics: Diagnostics },
}

pub trait StatusSink
where
	Self: Send + Sync,
{
	fn emit(&self, event: &StatusEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;
impl StatusSink for TracingSink {
	fn emit(&self, event: &StatusEvent) {
		match event {
			StatusEvent::Searching { index, total, query } => {
				tracing::info!(index, total, query = %query, "Searching sub-query.");
			},
			StatusEvent::SubQueryCompleted { index, query, sources, cache_hit } => {
				tracing::info!(index, query = %query, sources, cache_hit, "Sub-query completed.");
			},
			StatusEvent::SubQueryTimedOut { index, query } => {
				tracing::warn!(index, query = %query, "Sub-query timed out.");
			},
			StatusEvent::Metrics { diagnostics } => {
				tracing::info!(
					executed = diagnostics.sub_queries_executed,
					timed_out = diagnostics.sub_queries_timed_out,
					sources = diagnostics.total_sources_found,
					unique = diagnostics.deduplicated_count,
					elapsed_ms = diagnostics.execution_time_ms,
					cache_hit = diagnostics.cache_hit,
					"Research finished."
				);
			},
		}
	}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
	events: Mutex<Vec<StatusEvent>>,
}
impl RecordingSink {
	pub fn events(&self) -> Vec<StatusEvent> {
		self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
	}
}
impl StatusSink for RecordingSink {
	fn emit(&self, event: &StatusEvent) {
		self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event.clone());
	}
}
