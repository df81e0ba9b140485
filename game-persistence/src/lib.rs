pub mod connection;
pub mod entities;
pub mod memory;
pub mod repositories;
pub mod store;

pub use memory::MemoryStore;
pub use repositories::SeaOrmStore;
pub use store::{GameStore, StoreError};
