use clap::builder::{
	Styles,
	styling::{AnsiColor, Effects},
};
use tracing_subscriber::EnvFilter;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Red.on_default() | Effects::BOLD)
		.usage(AnsiColor::Red.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}

/// Falls back to `info` when the directive does not parse.
pub fn env_filter(log_level: &str) -> EnvFilter {
	EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Logs go to stderr so stdout stays reserved for command output.
pub fn init_tracing(log_level: &str) {
	tracing_subscriber::fmt().with_env_filter(env_filter(log_level)).with_writer(std::io::stderr).init();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn invalid_filter_falls_back_to_info() {
		assert_eq!(env_filter("trawl=[[").to_string(), "info");
		assert_eq!(env_filter("debug").to_string(), "debug");
	}
}
