//! Provider data structure passed to resources

use crate::api::{Client, WaitConfig};
use std::sync::Arc;

#[derive(Clone)]
pub struct FsxProviderData {
    pub client: Arc<Client>,
    pub wait: WaitConfig,
}

impl FsxProviderData {
    pub fn new(client: Client, wait: WaitConfig) -> Self {
        Self {
            client: Arc::new(client),
            wait,
        }
    }
}
