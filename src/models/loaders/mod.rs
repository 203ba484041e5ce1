pub mod toml_loader;

pub use toml_loader::{load_records, parse_records};
