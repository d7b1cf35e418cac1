pub mod base;
pub mod memory_store;
pub mod mongodb_store;

// Re-export the primary Store items so code outside can do
// "use crate::store::{Store, create_store};"
pub use base::{
    create_store, CounterOp, ImageField, Store, StoreConfig, StoreError, StoreResult, VideoListing,
    VideoSort, VideoUpdate,
};
pub use memory_store::MemoryStore;
pub use mongodb_store::MongoDbConfig;
