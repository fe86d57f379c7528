use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use serde_json::Value;

use trawl_service::{ResearchService, StatusSink, TracingSink};

#[derive(Debug, Parser)]
#[command(
	version = trawl_cli::VERSION,
	rename_all = "kebab",
	styles = trawl_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Research question.
	#[arg(value_name = "QUERY")]
	pub query: String,
	/// Known entity context, for example `IMO 9811000` or a company name.
	#[arg(long, short = 'e', value_name = "TEXT")]
	pub entity: Option<String>,
	/// Print the query plan without executing it.
	#[arg(long)]
	pub plan_only: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = trawl_config::load(&args.config)?;

	trawl_cli::init_tracing(&config.service.log_level);

	let service = ResearchService::from_config(config)?;
	let output = render(&service, &args).await?;

	println!("{}", serde_json::to_string_pretty(&output)?);

	Ok(())
}

/// The JSON document the binary prints: the plan with `--plan-only`, otherwise the full result.
pub async fn render(service: &ResearchService, args: &Args) -> color_eyre::Result<Value> {
	let entity = args.entity.as_deref();

	if args.plan_only {
		let plan = service.plan(&args.query, entity).await;

		return Ok(serde_json::to_value(plan)?);
	}

	let sink: Arc<dyn StatusSink> = Arc::new(TracingSink);
	let result = service.research(&args.query, entity, Some(sink)).await;

	tracing::info!(
		sources = result.sources.len(),
		confidence = result.confidence.score,
		"Research finished."
	);

	Ok(serde_json::to_value(result)?)
}
