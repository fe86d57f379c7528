#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	Provider(#[from] trawl_providers::Error),
	#[error("Invalid store configuration: {message}")]
	InvalidConfig { message: String },
	#[error("Store request failed: {message}")]
	Store { message: String },
}
