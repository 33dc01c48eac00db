pub mod catalog;
pub mod collection;
pub mod memory;
pub mod persistence;

pub use catalog::Catalog;
pub use collection::Collection;
pub use memory::EntityStore;
pub use persistence::{StoreSnapshot, load_snapshot, save_snapshot};
