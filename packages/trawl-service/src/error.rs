pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<trawl_storage::Error> for Error {
	fn from(err: trawl_storage::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}
