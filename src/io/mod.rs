pub mod csv_reader;
pub mod error;
pub mod parse;

// Re-export commonly used types
pub use csv_reader::{SourceReader, csv_reader, open_source};
pub use error::IoError;
pub use parse::{MIN_COLUMNS, RawRow, parse_date, parse_row};
