use trawl_domain::{
	CachedResult, Diagnostics, Priority, QueryPlan, Source, Strategy, SubQuery, Tier, TierCounts,
	confidence, links,
};

#[test]
fn plan_serializes_with_camel_case_fields() {
	let plan = QueryPlan {
		main_query: "Ever Given tonnage".to_string(),
		sub_queries: vec![SubQuery::new("Ever Given tonnage", "original query", Priority::High)],
		strategy: Strategy::Focused,
		estimated_execution_time_ms: 2_500,
		fallback: false,
	};
	let json = serde_json::to_value(&plan).expect("Failed to serialize plan.");

	assert_eq!(json["mainQuery"], "Ever Given tonnage");
	assert_eq!(json["subQueries"][0]["priority"], "high");
	assert_eq!(json["strategy"], "focused");
	assert_eq!(json["estimatedExecutionTimeMs"], 2_500);
}

#[test]
fn cached_result_round_trips_without_optional_fields() {
	let cached = CachedResult {
		sources: vec![Source::new("https://www.dnv.com/a", "A", "content", Some(0.7))],
		answer: None,
		diagnostics: None,
	};
	let json = serde_json::to_string(&cached).expect("Failed to serialize cached result.");

	assert!(!json.contains("diagnostics"));
	assert!(!json.contains("tier"));

	let decoded: CachedResult = serde_json::from_str(&json).expect("Failed to decode.");

	assert_eq!(decoded, cached);
}

#[test]
fn tier_counts_treat_untiered_sources_as_t3() {
	let mut tiered = Source::new("https://www.dnv.com/a", "A", "", None);

	tiered.tier = Some(Tier::T1);

	let untiered = Source::new("https://b.com", "B", "", None);
	let counts = TierCounts::from_sources(&[tiered, untiered]);

	assert_eq!(counts, TierCounts { t1: 1, t2: 0, t3: 1 });
	assert_eq!(confidence::score_tier_counts(counts).score, 70);
}

#[test]
fn diagnostics_default_is_empty() {
	let diagnostics = Diagnostics::default();

	assert_eq!(diagnostics.sub_queries_executed, 0);
	assert!(!diagnostics.cache_hit);
}

#[test]
fn scheme_does_not_split_keys() {
	assert_eq!(
		links::normalize_url_key("http://www.vesselfinder.com/vessels/details/9811000/"),
		links::normalize_url_key("https://vesselfinder.com/vessels/details/9811000")
	);
}
