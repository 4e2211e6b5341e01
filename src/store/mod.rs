pub mod disk;
pub mod memory;

pub use disk::DiskProductStore;
pub use memory::MemoryProductStore;
