//! Resource implementations

pub mod openzfs_volume;

pub use openzfs_volume::OpenZfsVolumeResource;
