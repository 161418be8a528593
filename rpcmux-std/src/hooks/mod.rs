//! Standard hook implementations.

mod logging;
mod validate;

pub use logging::LoggingAfter;
pub use validate::TypedValidator;
