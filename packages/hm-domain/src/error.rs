pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invariant violation: {message}")]
	InvariantViolation { message: String },
	#[error("Validation error: {message}")]
	Validation { message: String },
}
