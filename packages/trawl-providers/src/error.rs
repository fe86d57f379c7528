use crate::retry::RetryError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("Request timed out after {attempts} attempt(s).")]
	Timeout { attempts: u32 },
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
}
impl From<RetryError<reqwest::Error>> for Error {
	fn from(err: RetryError<reqwest::Error>) -> Self {
		match err {
			RetryError::Timeout { attempts } => Self::Timeout { attempts },
			RetryError::Transport { source, .. } => Self::Reqwest(source),
		}
	}
}
