pub mod memory;
pub mod records;
pub mod traits;

pub use memory::InMemoryStore;
pub use records::OrgRecord;
pub use traits::{Storage, StorageError};
