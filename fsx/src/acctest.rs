//! Acceptance test support for FSx resources

use async_trait::async_trait;
use tfplug::acctest::{FindError, RemoteFinder, RemoteObject};

use crate::api::{Client, Volume};
use crate::resources::openzfs_volume::TYPE_NAME;

impl RemoteObject for Volume {
    const KIND: &'static str = "FSx OpenZFS Volume";

    fn identity(&self) -> &str {
        &self.volume_id
    }
}

/// Looks volumes up with DescribeVolumes, bypassing the resource's read
pub struct VolumeFinder {
    client: Client,
}

impl VolumeFinder {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteFinder for VolumeFinder {
    type Object = Volume;

    fn resource_type(&self) -> &str {
        TYPE_NAME
    }

    async fn find(&self, id: &str) -> Result<Volume, FindError> {
        match self.client.volumes().find_by_id(id).await {
            Ok(volume) => Ok(volume),
            Err(e) if e.is_not_found() => Err(FindError::NotFound(e.to_string())),
            Err(e) => Err(FindError::Remote(e.to_string())),
        }
    }
}
