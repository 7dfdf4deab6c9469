pub mod client;
pub mod common;
pub mod error;
pub mod sigv4;
pub mod volumes;
pub mod waiter;

pub use client::{Client, ClientConfig, RetryConfig};
pub use common::{Tag, Volume};
pub use error::ApiError;
pub use sigv4::Credentials;
pub use volumes::VolumesApi;
pub use waiter::{wait_volume_created, wait_volume_deleted, wait_volume_updated, WaitConfig};
