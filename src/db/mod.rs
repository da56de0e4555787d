pub mod sqlite;
pub mod store;

pub use sqlite::{create_pool, create_schema};
pub use store::Store;
