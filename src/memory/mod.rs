//! Shared memory region management backing the frame channel

pub mod config;
pub mod regions;

pub use config::{BackingType, RegionConfig, DEFAULT_REGION_PERMISSIONS};
pub use regions::{RegionMetadata, SharedMemoryRegion};
