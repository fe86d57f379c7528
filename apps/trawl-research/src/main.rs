use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = trawl_research::Args::parse();

	trawl_research::run(args).await
}
