pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Qdrant error: {message}")]
	Qdrant { message: String },
	#[error("Validation error: {message}")]
	Validation { message: String },
	#[error("Data error: {message}")]
	Data { message: String },
	#[error("Timed out after {timeout_ms} ms: {operation}")]
	Timeout { operation: String, timeout_ms: u64 },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<hm_storage::Error> for Error {
	fn from(err: hm_storage::Error) -> Self {
		match err {
			hm_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			hm_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			hm_storage::Error::NotFound(message) => Self::NotFound { message },
			hm_storage::Error::Conflict(message) => Self::Conflict { message },
			hm_storage::Error::Qdrant(inner) => Self::Qdrant { message: inner.to_string() },
		}
	}
}

impl From<hm_providers::Error> for Error {
	fn from(err: hm_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<hm_domain::Error> for Error {
	fn from(err: hm_domain::Error) -> Self {
		match err {
			hm_domain::Error::Validation { message } => Self::Validation { message },
			hm_domain::Error::InvariantViolation { message } => Self::Data { message },
		}
	}
}
