pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use cli::{CliApp, Command, USAGE};
pub use commands::execute;
pub use error::AppError;
pub use logging::init_logging;
