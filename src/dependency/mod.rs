//! Objects a workload refers to, and whether they exist in cluster

mod extract;
mod lookup;

pub use extract::{extract_dependencies, unique, ExtractError, SUPPORTED_KINDS};
pub use lookup::{DependencyLookup, KubeLookup, LookupError};
