//! OpenZFS volume operations

use crate::api::common::{
    CreateVolumeRequest, DeleteVolumeRequest, DeleteVolumeResponse, DescribeVolumesRequest,
    DescribeVolumesResponse, Empty, Tag, TagResourceRequest, UntagResourceRequest,
    UpdateVolumeRequest, Volume, VolumeResponse,
};
use crate::api::{error::ApiError, Client};

/// Fresh idempotency token for mutating calls
pub fn client_request_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Volumes API
pub struct VolumesApi<'a> {
    client: &'a Client,
}

impl<'a> VolumesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// DescribeVolumes
    pub async fn describe(&self, volume_ids: &[&str]) -> Result<Vec<Volume>, ApiError> {
        let request = DescribeVolumesRequest {
            volume_ids: volume_ids.iter().map(|id| id.to_string()).collect(),
        };
        let response: DescribeVolumesResponse =
            self.client.call("DescribeVolumes", &request).await?;
        Ok(response.volumes)
    }

    /// Exactly one volume by id; an empty answer is `NotFound`
    pub async fn find_by_id(&self, volume_id: &str) -> Result<Volume, ApiError> {
        let mut volumes = self.describe(&[volume_id]).await?;
        match volumes.iter().position(|v| v.volume_id == volume_id) {
            Some(index) => Ok(volumes.swap_remove(index)),
            None => Err(ApiError::NotFound {
                code: "VolumeNotFound".to_string(),
                message: format!("Volume {} not found", volume_id),
            }),
        }
    }

    /// CreateVolume
    pub async fn create(&self, request: &CreateVolumeRequest) -> Result<Volume, ApiError> {
        tracing::debug!("Creating volume {}", request.name);
        let response: VolumeResponse = self.client.call("CreateVolume", request).await?;
        Ok(response.volume)
    }

    /// UpdateVolume
    pub async fn update(&self, request: &UpdateVolumeRequest) -> Result<Volume, ApiError> {
        tracing::debug!("Updating volume {}", request.volume_id);
        let response: VolumeResponse = self.client.call("UpdateVolume", request).await?;
        Ok(response.volume)
    }

    /// DeleteVolume
    pub async fn delete(&self, volume_id: &str) -> Result<(), ApiError> {
        tracing::debug!("Deleting volume {}", volume_id);
        let request = DeleteVolumeRequest {
            client_request_token: client_request_token(),
            volume_id: volume_id.to_string(),
        };
        let response: DeleteVolumeResponse = self.client.call("DeleteVolume", &request).await?;
        tracing::debug!(
            "Volume {} delete accepted, lifecycle {:?}",
            response.volume_id.as_deref().unwrap_or(volume_id),
            response.lifecycle
        );
        Ok(())
    }

    /// TagResource
    pub async fn tag_resource(&self, arn: &str, tags: Vec<Tag>) -> Result<(), ApiError> {
        if tags.is_empty() {
            return Ok(());
        }
        let request = TagResourceRequest {
            resource_arn: arn.to_string(),
            tags,
        };
        let _: Empty = self.client.call("TagResource", &request).await?;
        Ok(())
    }

    /// UntagResource
    pub async fn untag_resource(&self, arn: &str, tag_keys: Vec<String>) -> Result<(), ApiError> {
        if tag_keys.is_empty() {
            return Ok(());
        }
        let request = UntagResourceRequest {
            resource_arn: arn.to_string(),
            tag_keys,
        };
        let _: Empty = self.client.call("UntagResource", &request).await?;
        Ok(())
    }
}
