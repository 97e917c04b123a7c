pub mod decision;
pub mod mandatory;
pub mod profile;
pub mod record;
pub mod score;
pub mod scoring;
pub mod text;

mod error;

pub use error::{Error, Result};
