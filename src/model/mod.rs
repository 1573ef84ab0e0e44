//! BRISQUE model files: download cache and parsing.

mod loader;
mod opencv;

pub use loader::{ModelCache, ModelFile};
pub use opencv::{parse_range, parse_svm, read_range, read_svm};
