pub mod manager;
pub mod memory;
pub mod repository;
pub mod resources;

pub use manager::{DatabaseManager, DatabaseError};
pub use memory::MemoryRepository;
pub use repository::{OwnedRecord, PgRepository, ResourceRepository};
pub use resources::Resource;
