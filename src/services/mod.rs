pub mod discovery;
pub mod similarity;
pub mod tmdb;

pub use discovery::{DiscoveryEngine, DiscoveryOutcome};
pub use tmdb::{DiscoverFilters, MetadataProvider, TmdbClient};
