use std::path::PathBuf;

use clap::Parser;

use trawl_research::Args;
use trawl_service::ResearchService;

fn example_config() -> PathBuf {
	PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../trawl.example.toml")
}

#[test]
fn args_parse_query_and_flags() {
	let args = Args::try_parse_from([
		"trawl-research",
		"--config",
		"trawl.toml",
		"--entity",
		"IMO 9811000",
		"--plan-only",
		"Who owns the Ever Given?",
	])
	.expect("Arguments must parse.");

	assert_eq!(args.config, PathBuf::from("trawl.toml"));
	assert_eq!(args.query, "Who owns the Ever Given?");
	assert_eq!(args.entity.as_deref(), Some("IMO 9811000"));
	assert!(args.plan_only);
}

#[test]
fn query_is_required() {
	assert!(Args::try_parse_from(["trawl-research", "--config", "trawl.toml"]).is_err());
}

#[test]
fn example_config_is_valid() {
	let cfg = trawl_config::load(&example_config()).expect("Example config must load.");

	assert_eq!(cfg.cache.store.kind, "memory");
}

#[tokio::test]
async fn plan_only_renders_offline_plan() {
	let mut cfg = trawl_config::load(&example_config()).expect("Example config must load.");

	cfg.planner.enabled = false;

	let service = ResearchService::from_config(cfg).expect("Service must build.");
	let args = Args {
		config: example_config(),
		query: "Who owns the tanker Nordic Star?".to_string(),
		entity: Some("IMO 9387421".to_string()),
		plan_only: true,
	};
	let output = trawl_research::render(&service, &args).await.expect("Plan must render.");

	assert_eq!(output["mainQuery"], "Who owns the tanker Nordic Star?");
	assert_eq!(output["fallback"], true);
	assert_eq!(output["subQueries"].as_array().map(Vec::len), Some(3));
}
