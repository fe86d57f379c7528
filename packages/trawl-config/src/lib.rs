mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Aggregation, Cache, CacheStore, Config, EmbeddingProviderConfig, Executor,
	GenerationProviderConfig, KeywordSearchConfig, Planner, Providers, Retry, Service,
};

use std::{env, fs, path::Path};

const ENV_SECRET_PREFIX: &str = "env:";
/// Ten years.
const MAX_TTL_SECONDS: u64 = 315_360_000;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	resolve_secrets(&mut cfg)?;

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}

	for (label, provider) in [
		("grounded_search", &cfg.providers.grounded_search),
		("planner", &cfg.providers.planner),
	] {
		if provider.api_base.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_base must be non-empty."),
			});
		}
		if provider.timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("Provider {label} timeout_ms must be greater than zero."),
			});
		}
		if provider.max_output_tokens == 0 {
			return Err(Error::Validation {
				message: format!("Provider {label} max_output_tokens must be greater than zero."),
			});
		}
	}

	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}

	for (label, key) in [
		("grounded_search", &cfg.providers.grounded_search.api_key),
		("planner", &cfg.providers.planner.api_key),
		("embedding", &cfg.providers.embedding.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	if let Some(keyword) = cfg.providers.keyword_search.as_ref() {
		if keyword.engine_id.trim().is_empty() || keyword.api_key.trim().is_empty() {
			return Err(Error::Validation {
				message: "providers.keyword_search requires api_key and engine_id.".to_string(),
			});
		}
		if !(1..=10).contains(&keyword.result_count) {
			return Err(Error::Validation {
				message: "providers.keyword_search.result_count must be in the range 1-10."
					.to_string(),
			});
		}
	}

	if cfg.retry.base_delay_ms == 0 {
		return Err(Error::Validation {
			message: "retry.base_delay_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.retry.max_delay_ms < cfg.retry.base_delay_ms {
		return Err(Error::Validation {
			message: "retry.max_delay_ms must be at least retry.base_delay_ms.".to_string(),
		});
	}
	if cfg.retry.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "retry.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.retry.retryable_statuses.iter().any(|status| !(100..=599).contains(status)) {
		return Err(Error::Validation {
			message: "retry.retryable_statuses must contain HTTP status codes.".to_string(),
		});
	}

	if cfg.executor.global_budget_ms == 0 {
		return Err(Error::Validation {
			message: "executor.global_budget_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.executor.min_task_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "executor.min_task_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.executor.min_workers == 0 || cfg.executor.min_workers > cfg.executor.max_workers {
		return Err(Error::Validation {
			message: "executor.min_workers must be between 1 and executor.max_workers."
				.to_string(),
		});
	}

	if cfg.planner.min_sub_queries == 0
		|| cfg.planner.min_sub_queries > cfg.planner.max_sub_queries
	{
		return Err(Error::Validation {
			message: "planner.min_sub_queries must be between 1 and planner.max_sub_queries."
				.to_string(),
		});
	}

	validate_cache(&cfg.cache)?;

	if cfg.aggregation.top_k == 0 {
		return Err(Error::Validation {
			message: "aggregation.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.aggregation.max_content_chars == 0 {
		return Err(Error::Validation {
			message: "aggregation.max_content_chars must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_cache(cache: &Cache) -> Result<()> {
	if !cache.semantic_threshold.is_finite() || !(0.0..=1.0).contains(&cache.semantic_threshold)
	{
		return Err(Error::Validation {
			message: "cache.semantic_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cache.enabled && cache.exact_ttl_seconds == 0 {
		return Err(Error::Validation {
			message: "cache.exact_ttl_seconds must be greater than zero.".to_string(),
		});
	}
	if cache.semantic_enabled && cache.semantic_ttl_seconds == 0 {
		return Err(Error::Validation {
			message: "cache.semantic_ttl_seconds must be greater than zero.".to_string(),
		});
	}
	for (label, value) in [
		("cache.exact_ttl_seconds", cache.exact_ttl_seconds),
		("cache.semantic_ttl_seconds", cache.semantic_ttl_seconds),
		("cache.semantic_ttl_floor_seconds", cache.semantic_ttl_floor_seconds),
	] {
		if value > MAX_TTL_SECONDS {
			return Err(Error::Validation {
				message: format!("{label} must be at most {MAX_TTL_SECONDS}."),
			});
		}
	}
	if cache.key_prefix.trim().is_empty() {
		return Err(Error::Validation {
			message: "cache.key_prefix must be non-empty.".to_string(),
		});
	}

	match cache.store.kind.as_str() {
		"memory" => {},
		"http" => {
			for (label, value) in [
				("cache.store.api_base", &cache.store.api_base),
				("cache.store.account_id", &cache.store.account_id),
				("cache.store.namespace_id", &cache.store.namespace_id),
				("cache.store.api_token", &cache.store.api_token),
			] {
				if value.is_none() {
					return Err(Error::Validation {
						message: format!("{label} is required when cache.store.kind is http."),
					});
				}
			}
		},
		_ => {
			return Err(Error::Validation {
				message: "cache.store.kind must be one of memory or http.".to_string(),
			});
		},
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg
		.providers
		.grounded_search
		.auth_header
		.as_deref()
		.map(|header| header.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.providers.grounded_search.auth_header = None;
	}
	if cfg.providers.planner.auth_header.as_deref().map(|h| h.trim().is_empty()).unwrap_or(false) {
		cfg.providers.planner.auth_header = None;
	}

	let store = &mut cfg.cache.store;

	for value in
		[&mut store.api_base, &mut store.account_id, &mut store.namespace_id, &mut store.api_token]
	{
		if value.as_deref().map(|v| v.trim().is_empty()).unwrap_or(false) {
			*value = None;
		}
	}

	cfg.cache.store.kind = cfg.cache.store.kind.trim().to_ascii_lowercase();

	cfg.retry.retryable_statuses.sort_unstable();
	cfg.retry.retryable_statuses.dedup();
}

fn resolve_secrets(cfg: &mut Config) -> Result<()> {
	resolve_secret("providers.grounded_search.api_key", &mut cfg.providers.grounded_search.api_key)?;
	resolve_secret("providers.planner.api_key", &mut cfg.providers.planner.api_key)?;
	resolve_secret("providers.embedding.api_key", &mut cfg.providers.embedding.api_key)?;

	if let Some(keyword) = cfg.providers.keyword_search.as_mut() {
		resolve_secret("providers.keyword_search.api_key", &mut keyword.api_key)?;
	}
	if let Some(token) = cfg.cache.store.api_token.as_mut() {
		resolve_secret("cache.store.api_token", token)?;
	}

	Ok(())
}

fn resolve_secret(field: &str, value: &mut String) -> Result<()> {
	let Some(name) = value.trim().strip_prefix(ENV_SECRET_PREFIX) else { return Ok(()) };
	let name = name.trim().to_string();
	let resolved = env::var(&name)
		.map_err(|_| Error::MissingSecret { field: field.to_string(), name: name.clone() })?;

	*value = resolved;

	Ok(())
}
