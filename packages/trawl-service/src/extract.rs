//! Turns a raw grounded-search response into a flat, validated, deduplicated source list.
//!
//! Responses come in several layouts. Each layout has a matcher; matchers run in priority order
//! and the first one that recognises the payload decides how it is read. Nothing matching yields
//! [`GroundingShape::Empty`].

use std::sync::LazyLock;

use ahash::AHashMap;
use regex::Regex;
use serde_json::Value;

use trawl_domain::{Source, links, text};

pub const WEB_RESULT_SCORE: f32 = 0.8;
pub const CHUNK_SCORE: f32 = 0.7;
pub const SEARCH_LINK_SCORE: f32 = 0.3;
pub const KEYWORD_SCORE: f32 = 0.5;
pub const CHIP_SIMILARITY_FLOOR: f32 = 0.35;

const SEARCH_LINK_BASE: &str = "https://www.google.com/search?q=";

static CHIP_RE: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r#"(?is)<a\s[^>]*class="chip"[^>]*>(.*?)</a>"#).ok());
static TAG_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]+>").ok());
static DOMAIN_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(r"(?i)\b((?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,24})\b").ok()
});
static BARE_DOMAIN_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(r"(?i)^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,24}$").ok()
});

/// Known layouts of grounding metadata, in matching order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroundingShape<'a> {
	/// A ready-made result list.
	WebResults(&'a [Value]),
	/// Cited chunks, optionally tied to answer spans through supports.
	Chunks { chunks: &'a [Value], supports: &'a [Value], rendered: Option<&'a str> },
	/// Only the rendered search widget survived.
	EntryPoint { rendered: &'a str },
	Empty,
}

type ShapeMatcher = for<'a> fn(&'a Value) -> Option<GroundingShape<'a>>;

const MATCHERS: [ShapeMatcher; 3] = [match_web_results, match_chunks, match_entry_point];

pub fn classify(response: &Value) -> GroundingShape<'_> {
	let Some(metadata) = grounding_metadata(response) else { return GroundingShape::Empty };

	MATCHERS.iter().find_map(|matcher| matcher(metadata)).unwrap_or(GroundingShape::Empty)
}

/// Sources for one sub-query. Invalid URLs are dropped and duplicates merged.
pub fn extract_sources(response: &Value, query: &str, answer: Option<&str>) -> Vec<Source> {
	let sources = match classify(response) {
		GroundingShape::WebResults(items) => web_result_sources(items),
		GroundingShape::Chunks { chunks, supports, rendered } =>
			chunk_sources(chunks, supports, rendered, query, answer),
		GroundingShape::EntryPoint { .. } => vec![search_link_source(query, query, answer)],
		GroundingShape::Empty => Vec::new(),
	};

	dedup_sources(sources)
}

/// Maps a keyword search response's `items` to sources with a neutral score.
pub fn keyword_sources(response: &Value) -> Vec<Source> {
	let Some(items) = response.get("items").and_then(Value::as_array) else { return Vec::new() };
	let sources = items
		.iter()
		.filter_map(|item| {
			let url = str_field(item, &["link", "url"])?;

			if !links::is_valid_source_url(url) {
				return None;
			}

			let title = str_field(item, &["title"]).unwrap_or(url);
			let content = str_field(item, &["snippet", "htmlSnippet"]).unwrap_or_default();

			Some(Source::new(url, title, content, Some(KEYWORD_SCORE)))
		})
		.collect();

	dedup_sources(sources)
}

/// Keeps one source per URL key: the higher score, then the longer content. First-seen order is
/// preserved.
pub fn dedup_sources(sources: Vec<Source>) -> Vec<Source> {
	let mut positions: AHashMap<String, usize> = AHashMap::new();
	let mut out: Vec<Source> = Vec::with_capacity(sources.len());

	for source in sources {
		let key = links::normalize_url_key(&source.url);

		match positions.get(&key) {
			Some(&position) => {
				let current = &out[position];
				let (new_score, old_score) =
					(source.score.unwrap_or(0.0), current.score.unwrap_or(0.0));

				if new_score > old_score
					|| new_score == old_score && source.content.len() > current.content.len()
				{
					out[position] = source;
				}
			},
			None => {
				positions.insert(key, out.len());
				out.push(source);
			},
		}
	}

	out
}

/// Best-guess real URL for a redirect-only citation, from its title or the rendered chips.
pub fn resolve_redirect(title: &str, rendered: Option<&str>) -> Option<String> {
	let title = title.trim();

	if is_bare_domain(title) {
		return Some(format!("https://{}", title.to_lowercase()));
	}

	let title_tokens = text::tokenize(title);

	if title_tokens.is_empty() {
		return None;
	}

	let (best, score) = chip_texts(rendered?)
		.into_iter()
		.filter_map(|chip| {
			let domain = first_domain(&chip)?;
			let score = text::jaccard(&text::tokenize(&chip), &title_tokens);

			Some((domain, score))
		})
		.fold(None, |best: Option<(String, f32)>, candidate| match best {
			Some(best) if best.1 >= candidate.1 => Some(best),
			_ => Some(candidate),
		})?;

	if score < CHIP_SIMILARITY_FLOOR {
		return None;
	}

	Some(format!("https://{best}"))
}

pub fn search_link(query: &str) -> String {
	let encoded: String = url::form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();

	format!("{SEARCH_LINK_BASE}{encoded}")
}

fn search_link_source(query: &str, title: &str, answer: Option<&str>) -> Source {
	Source::new(
		search_link(query),
		format!("Search: {}", title.trim()),
		answer.unwrap_or_default(),
		Some(SEARCH_LINK_SCORE),
	)
}

fn grounding_metadata(response: &Value) -> Option<&Value> {
	response
		.get("candidates")
		.and_then(Value::as_array)
		.and_then(|candidates| candidates.first())
		.and_then(|candidate| candidate.get("groundingMetadata"))
		.or_else(|| response.get("groundingMetadata"))
}

fn match_web_results(metadata: &Value) -> Option<GroundingShape<'_>> {
	let items = metadata.get("webResults").and_then(Value::as_array)?;

	(!items.is_empty()).then_some(GroundingShape::WebResults(items))
}

fn match_chunks(metadata: &Value) -> Option<GroundingShape<'_>> {
	let chunks = metadata.get("groundingChunks").and_then(Value::as_array)?;

	if chunks.is_empty() {
		return None;
	}

	let supports =
		metadata.get("groundingSupports").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);

	Some(GroundingShape::Chunks { chunks, supports, rendered: rendered_content(metadata) })
}

fn match_entry_point(metadata: &Value) -> Option<GroundingShape<'_>> {
	rendered_content(metadata).map(|rendered| GroundingShape::EntryPoint { rendered })
}

fn rendered_content(metadata: &Value) -> Option<&str> {
	metadata
		.get("searchEntryPoint")
		.and_then(|entry| entry.get("renderedContent"))
		.and_then(Value::as_str)
		.filter(|rendered| !rendered.trim().is_empty())
}

fn web_result_sources(items: &[Value]) -> Vec<Source> {
	items
		.iter()
		.filter_map(|item| {
			let url = str_field(item, &["url", "uri", "link"])?;

			if !links::is_valid_source_url(url) {
				return None;
			}

			let title = str_field(item, &["title"]).unwrap_or(url);
			let content = str_field(item, &["content", "snippet", "text"]).unwrap_or_default();
			let score = item.get("score").and_then(Value::as_f64).map(|score| score as f32);

			Some(Source::new(url, title, content, Some(score.unwrap_or(WEB_RESULT_SCORE))))
		})
		.collect()
}

fn chunk_sources(
	chunks: &[Value],
	supports: &[Value],
	rendered: Option<&str>,
	query: &str,
	answer: Option<&str>,
) -> Vec<Source> {
	let mut segments: Vec<Vec<&str>> = vec![Vec::new(); chunks.len()];
	let mut confidences: Vec<Option<f32>> = vec![None; chunks.len()];

	for support in supports {
		let text = support
			.get("segment")
			.and_then(|segment| segment.get("text"))
			.and_then(Value::as_str)
			.filter(|text| !text.trim().is_empty());
		let indices = support.get("groundingChunkIndices").and_then(Value::as_array);
		let scores = support.get("confidenceScores").and_then(Value::as_array);

		for (position, index) in indices.into_iter().flatten().enumerate() {
			let Some(index) = index.as_u64().map(|index| index as usize) else { continue };

			if index >= chunks.len() {
				continue;
			}
			if let Some(text) = text
				&& !segments[index].contains(&text)
			{
				segments[index].push(text);
			}
			if let Some(score) =
				scores.and_then(|scores| scores.get(position)).and_then(Value::as_f64)
			{
				let score = score as f32;

				confidences[index] = Some(confidences[index].map_or(score, |best| best.max(score)));
			}
		}
	}

	let mut sources = Vec::with_capacity(chunks.len());

	for (index, chunk) in chunks.iter().enumerate() {
		let Some(web) = chunk.get("web").or_else(|| chunk.get("retrievedContext")) else { continue };
		let Some(uri) = str_field(web, &["uri", "url"]) else { continue };
		let title = str_field(web, &["title"]).unwrap_or_default();
		let content = if segments[index].is_empty() {
			answer.unwrap_or_default().to_string()
		} else {
			segments[index].join(" ")
		};
		let score = confidences[index].unwrap_or(CHUNK_SCORE);

		if links::is_redirect_url(uri) {
			match resolve_redirect(title, rendered) {
				Some(url) if links::is_valid_source_url(&url) => {
					let title = if title.is_empty() { url.clone() } else { title.to_string() };

					sources.push(Source::new(url, title, content, Some(score)));
				},
				_ => {
					tracing::debug!(title = %title, "Redirect citation could not be resolved.");

					let title = if title.is_empty() { query } else { title };

					sources.push(search_link_source(query, title, Some(content.as_str())));
				},
			}

			continue;
		}
		if !links::is_valid_source_url(uri) {
			continue;
		}

		let title = if title.is_empty() { uri } else { title };

		sources.push(Source::new(uri, title, content, Some(score)));
	}

	sources
}

fn chip_texts(rendered: &str) -> Vec<String> {
	let Some(chip_re) = CHIP_RE.as_ref() else { return Vec::new() };

	chip_re
		.captures_iter(rendered)
		.filter_map(|caps| caps.get(1))
		.map(|inner| {
			let stripped = match TAG_RE.as_ref() {
				Some(tag_re) => tag_re.replace_all(inner.as_str(), " ").into_owned(),
				None => inner.as_str().to_string(),
			};

			text::normalize_query(&stripped)
		})
		.filter(|chip| !chip.is_empty())
		.collect()
}

fn first_domain(text: &str) -> Option<String> {
	let re = DOMAIN_RE.as_ref()?;

	re.captures(text).and_then(|caps| caps.get(1)).map(|m| m.as_str().to_lowercase())
}

fn is_bare_domain(text: &str) -> bool {
	BARE_DOMAIN_RE.as_ref().map(|re| re.is_match(text)).unwrap_or(false)
}

fn str_field<'a>(value: &'a Value, names: &[&str]) -> Option<&'a str> {
	names
		.iter()
		.find_map(|name| value.get(*name).and_then(Value::as_str))
		.map(str::trim)
		.filter(|raw| !raw.is_empty())
}
