use std::cmp::Ordering;

use ahash::AHashMap;

use trawl_domain::{
	Source, Tier,
	entity::{self, QueryEntity},
	links, text, tier,
};

const TITLE_PHRASE_WEIGHT: f32 = 3.0;
const CONTENT_PHRASE_WEIGHT: f32 = 2.0;
const TOKEN_OVERLAP_WEIGHT: f32 = 2.0;
const REGISTRY_BOOST: f32 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
	pub sources: Vec<Source>,
	/// Unique sources after URL dedup, before truncation.
	pub deduplicated_count: usize,
}

/// Tiers, dedups by URL key keeping the best tier, sorts, and keeps the top `top_k`.
pub fn aggregate_and_rank(sources: Vec<Source>, query: Option<&str>, top_k: usize) -> Ranked {
	let entity = query.and_then(entity::extract_query_entity);
	let mut by_key: AHashMap<String, usize> = AHashMap::new();
	let mut unique: Vec<(String, Source)> = Vec::with_capacity(sources.len());

	for mut source in sources {
		source.tier = Some(tier::assign_tier(&source, entity.as_ref()));

		let key = links::normalize_url_key(&source.url);

		match by_key.get(&key) {
			Some(&position) =>
				if is_better(&source, &unique[position].1) {
					unique[position].1 = source;
				},
			None => {
				by_key.insert(key.clone(), unique.len());
				unique.push((key, source));
			},
		}
	}

	let deduplicated_count = unique.len();
	let mut weighted: Vec<(f32, String, Source)> = unique
		.into_iter()
		.map(|(key, source)| (relevance_weight(&source, entity.as_ref()), key, source))
		.collect();

	weighted.sort_by(|a, b| {
		cmp_f32_desc(a.0, b.0)
			.then_with(|| tier_of(&a.2).cmp(&tier_of(&b.2)))
			.then_with(|| a.1.cmp(&b.1))
			.then_with(|| a.2.title.cmp(&b.2.title))
	});
	weighted.truncate(top_k);

	Ranked { sources: weighted.into_iter().map(|(_, _, source)| source).collect(), deduplicated_count }
}

/// Phrase and token overlap with the query entity, boosted for registry hosts.
pub fn relevance_weight(source: &Source, entity: Option<&QueryEntity>) -> f32 {
	let Some(entity) = entity else { return 0.0 };

	if entity.tokens.is_empty() {
		return 0.0;
	}

	let title = source.title.to_lowercase();
	let content = source.content.to_lowercase();
	let mut weight = 0.0;

	if !entity.phrase.is_empty() {
		if title.contains(&entity.phrase) {
			weight += TITLE_PHRASE_WEIGHT;
		}
		if content.contains(&entity.phrase) {
			weight += CONTENT_PHRASE_WEIGHT;
		}
	}

	let source_tokens = text::tokenize(&format!("{title} {content}"));
	let matched = entity.tokens.iter().filter(|token| source_tokens.contains(token)).count();

	weight += TOKEN_OVERLAP_WEIGHT * matched as f32 / entity.tokens.len() as f32;

	if weight > 0.0
		&& links::host_of(&source.url).is_some_and(|host| tier::is_registry_host(&host))
	{
		weight += REGISTRY_BOOST;
	}

	weight
}

fn is_better(candidate: &Source, current: &Source) -> bool {
	match tier_of(candidate).cmp(&tier_of(current)) {
		Ordering::Less => true,
		Ordering::Greater => false,
		Ordering::Equal => candidate.content.len() > current.content.len(),
	}
}

fn tier_of(source: &Source) -> Tier {
	source.tier.unwrap_or(Tier::T3)
}

fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}
