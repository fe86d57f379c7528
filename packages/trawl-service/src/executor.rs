//! Bounded parallel execution of sub-queries.
//!
//! Workers pull indices from a shared cursor and run one sub-query at a time. Each sub-query runs
//! in its own spawned task awaited under the per-task deadline. On expiry the handle is dropped,
//! which detaches the task, so a late response still lands in the cache. The global budget only
//! stops new sub-queries from starting. Work already in flight is never cancelled.

use std::{
	sync::{
		Arc, OnceLock,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	time::Duration,
};

use tokio::time;

use trawl_config::{GenerationProviderConfig, KeywordSearchConfig};
use trawl_domain::{CachedResult, Source, SubQuery, entity, maritime, text};
use trawl_providers::{RetryPolicy, generation};

use crate::{
	Providers, ResearchCache, ResearchService, extract, planner,
	status::{StatusEvent, StatusSink},
};

/// What the executor hands to aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
	/// Flat source list in sub-query index order.
	pub sources: Vec<Source>,
	/// First non-empty answer in sub-query index order.
	pub answer: Option<String>,
	pub planned: usize,
	pub executed: usize,
	pub timed_out: usize,
	pub cache_hits: usize,
	pub maritime_filtered: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct SubQueryOutcome {
	sources: Vec<Source>,
	answer: Option<String>,
	cache_hit: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum SlotOutcome {
	Completed(SubQueryOutcome),
	TimedOut,
	Failed,
}

/// Everything a detached sub-query task needs, owned.
struct TaskEnv {
	providers: Providers,
	cache: Option<ResearchCache>,
	grounded_search: GenerationProviderConfig,
	keyword_search: Option<KeywordSearchConfig>,
	fallback_search: bool,
	max_content_chars: usize,
	retry: RetryPolicy,
	entity_context: Option<String>,
}

#[derive(Clone)]
struct Pool {
	env: Arc<TaskEnv>,
	queries: Arc<[SubQuery]>,
	slots: Arc<[OnceLock<SlotOutcome>]>,
	cursor: Arc<AtomicUsize>,
	closed: Arc<AtomicBool>,
	per_task: Duration,
	sink: Option<Arc<dyn StatusSink>>,
}

impl ResearchService {
	/// Runs sub-queries through the worker pool and returns the flat source list. Per-sub-query
	/// failures leave an empty slot; the batch itself never fails.
	pub async fn execute(
		&self,
		sub_queries: &[SubQuery],
		entity_context: Option<&str>,
		sink: Option<Arc<dyn StatusSink>>,
	) -> ExecutionReport {
		let executor = &self.cfg.executor;
		let unique = planner::dedup_sub_queries(sub_queries);
		let total = unique.len();

		if total == 0 {
			return ExecutionReport { planned: sub_queries.len(), ..Default::default() };
		}

		let budget = Duration::from_millis(executor.global_budget_ms);
		let per_task =
			per_task_timeout(budget, Duration::from_millis(executor.min_task_timeout_ms), total);
		let workers = worker_count(total, executor.min_workers, executor.max_workers);
		let pool = Pool {
			env: Arc::new(TaskEnv {
				providers: self.providers.clone(),
				cache: self.cache.clone(),
				grounded_search: self.cfg.providers.grounded_search.clone(),
				keyword_search: self.cfg.providers.keyword_search.clone(),
				fallback_search: executor.fallback_search,
				max_content_chars: self.cfg.aggregation.max_content_chars,
				retry: self.retry_policy(),
				entity_context: entity_context.map(str::to_string),
			}),
			queries: unique.into(),
			slots: (0..total).map(|_| OnceLock::new()).collect(),
			cursor: Arc::new(AtomicUsize::new(0)),
			closed: Arc::new(AtomicBool::new(false)),
			per_task,
			sink,
		};

		tracing::info!(
			sub_queries = total,
			workers,
			per_task_ms = per_task.as_millis() as u64,
			budget_ms = budget.as_millis() as u64,
			"Executing sub-queries."
		);

		let mut handles: Vec<_> =
			(0..workers).map(|_| tokio::spawn(run_worker(pool.clone()))).collect();
		let joined = time::timeout(budget, async {
			for handle in handles.iter_mut() {
				if let Err(err) = handle.await {
					tracing::error!(error = %err, "Executor worker panicked.");
				}
			}
		})
		.await;

		if joined.is_err() {
			pool.closed.store(true, Ordering::Release);

			tracing::warn!(
				budget_ms = budget.as_millis() as u64,
				"Global research budget exhausted. Returning partial results."
			);
		}

		// Dropping the handles detaches any worker still finishing an in-flight sub-query.
		drop(handles);

		let mut report = collect_report(&pool.slots, sub_queries.len());

		if self.cfg.executor.maritime_filter
			&& pool.queries.iter().any(|sub_query| entity::has_vessel_identifier(&sub_query.query))
		{
			let (sources, filtered) = apply_maritime_filter(std::mem::take(&mut report.sources));

			report.sources = sources;
			report.maritime_filtered = filtered;
		}

		report
	}
}

/// `max(floor, budget / task_count)`.
pub fn per_task_timeout(budget: Duration, floor: Duration, task_count: usize) -> Duration {
	let share = budget / u32::try_from(task_count.max(1)).unwrap_or(u32::MAX);

	share.max(floor)
}

/// `min(max_workers, max(min_workers, task_count))`.
pub fn worker_count(task_count: usize, min_workers: usize, max_workers: usize) -> usize {
	task_count.max(min_workers).min(max_workers).max(1)
}

/// Keeps sources with a maritime signal, unless that would leave fewer than `min(3, N)` of them.
/// The flag reports whether filtering was applied.
pub fn apply_maritime_filter(sources: Vec<Source>) -> (Vec<Source>, bool) {
	let floor = sources.len().min(3);
	let kept = sources.iter().filter(|source| maritime::has_maritime_signal(source)).count();

	if kept < floor {
		tracing::debug!(kept, total = sources.len(), "Maritime filter skipped to avoid over-pruning.");

		return (sources, false);
	}

	let filtered = sources.into_iter().filter(maritime::has_maritime_signal).collect();

	(filtered, true)
}

async fn run_worker(pool: Pool) {
	let total = pool.queries.len();

	loop {
		if pool.closed.load(Ordering::Acquire) {
			break;
		}

		let index = pool.cursor.fetch_add(1, Ordering::AcqRel);

		if index >= total {
			break;
		}

		let sub_query = pool.queries[index].clone();

		emit(&pool.sink, StatusEvent::Searching { index, total, query: sub_query.query.clone() });

		let task = tokio::spawn(run_sub_query(pool.env.clone(), sub_query.query.clone()));
		let outcome = match time::timeout(pool.per_task, task).await {
			Ok(Ok(outcome)) => {
				emit(
					&pool.sink,
					StatusEvent::SubQueryCompleted {
						index,
						query: sub_query.query.clone(),
						sources: outcome.sources.len(),
						cache_hit: outcome.cache_hit,
					},
				);

				SlotOutcome::Completed(outcome)
			},
			Ok(Err(err)) => {
				tracing::error!(index, error = %err, "Sub-query task failed.");

				SlotOutcome::Failed
			},
			Err(_) => {
				tracing::warn!(
					index,
					query = %sub_query.query,
					timeout_ms = pool.per_task.as_millis() as u64,
					"Sub-query abandoned after its deadline."
				);
				emit(&pool.sink, StatusEvent::SubQueryTimedOut { index, query: sub_query.query });

				SlotOutcome::TimedOut
			},
		};

		// The cursor hands out each index once, so the slot is still empty.
		let filled = pool.slots[index].set(outcome);

		debug_assert!(filled.is_ok(), "Sub-query slot {index} was filled twice.");
	}
}

/// Cache check, grounded search, keyword fallback, cache write.
async fn run_sub_query(env: Arc<TaskEnv>, query: String) -> SubQueryOutcome {
	let entity_context = env.entity_context.as_deref();
	let lookup = match &env.cache {
		Some(cache) => Some(cache.lookup(&query, entity_context).await),
		None => None,
	};
	let embedding = match lookup {
		Some(lookup) => {
			if let Some((cached, tier)) = lookup.hit {
				tracing::debug!(query = %query, tier = ?tier, "Serving sub-query from cache.");

				return SubQueryOutcome {
					sources: cached.sources,
					answer: cached.answer,
					cache_hit: true,
				};
			}

			lookup.embedding
		},
		None => None,
	};
	let (mut sources, answer) = grounded_search(&env, &query).await;

	if sources.is_empty() && env.fallback_search {
		sources = keyword_fallback(&env, &query).await;
	}

	for source in &mut sources {
		source.content = text::truncate_chars(&source.content, env.max_content_chars);
	}

	if !sources.is_empty()
		&& let Some(cache) = &env.cache
	{
		let cached = CachedResult { sources: sources.clone(), answer: answer.clone(), diagnostics: None };

		cache.store(&query, entity_context, &cached, embedding).await;
	}

	SubQueryOutcome { sources, answer, cache_hit: false }
}

async fn grounded_search(env: &TaskEnv, query: &str) -> (Vec<Source>, Option<String>) {
	match env.providers.grounded_search.search(&env.grounded_search, &env.retry, query).await {
		Ok(response) => {
			let answer = generation::answer_text(&response);
			let sources = extract::extract_sources(&response, query, answer.as_deref());

			(sources, answer)
		},
		Err(err) => {
			tracing::warn!(query = %query, error = %err, "Grounded search failed.");

			(Vec::new(), None)
		},
	}
}

async fn keyword_fallback(env: &TaskEnv, query: &str) -> Vec<Source> {
	let Some(cfg) = &env.keyword_search else { return Vec::new() };

	match env.providers.keyword_search.search(cfg, &env.retry, query).await {
		Ok(response) => {
			let sources = extract::keyword_sources(&response);

			tracing::debug!(query = %query, sources = sources.len(), "Keyword fallback search finished.");

			sources
		},
		Err(err) => {
			tracing::warn!(query = %query, error = %err, "Keyword fallback search failed.");

			Vec::new()
		},
	}
}

fn collect_report(slots: &[OnceLock<SlotOutcome>], planned: usize) -> ExecutionReport {
	let mut report = ExecutionReport { planned, ..Default::default() };

	for slot in slots {
		match slot.get() {
			Some(SlotOutcome::Completed(outcome)) => {
				report.executed += 1;

				if outcome.cache_hit {
					report.cache_hits += 1;
				}
				if report.answer.is_none() {
					report.answer = outcome.answer.clone().filter(|answer| !answer.trim().is_empty());
				}

				report.sources.extend(outcome.sources.iter().cloned());
			},
			Some(SlotOutcome::Failed) => report.executed += 1,
			Some(SlotOutcome::TimedOut) => report.timed_out += 1,
			None => {},
		}
	}

	report
}

fn emit(sink: &Option<Arc<dyn StatusSink>>, event: StatusEvent) {
	if let Some(sink) = sink {
		sink.emit(&event);
	}
}
