//! Wire types for the FSx JSON protocol

use serde::{Deserialize, Serialize};

/// Volume lifecycle states
pub mod lifecycle {
    pub const CREATING: &str = "CREATING";
    pub const PENDING: &str = "PENDING";
    pub const AVAILABLE: &str = "AVAILABLE";
    pub const DELETING: &str = "DELETING";
    pub const FAILED: &str = "FAILED";
    pub const MISCONFIGURED: &str = "MISCONFIGURED";
}

/// Administrative action statuses
pub mod action_status {
    pub const PENDING: &str = "PENDING";
    pub const IN_PROGRESS: &str = "IN_PROGRESS";
    pub const COMPLETED: &str = "COMPLETED";
    pub const FAILED: &str = "FAILED";
}

pub const VOLUME_UPDATE: &str = "VOLUME_UPDATE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClientConfiguration {
    pub clients: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NfsExport {
    pub client_configurations: Vec<ClientConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserAndGroupQuota {
    pub id: i64,
    #[serde(rename = "StorageCapacityQuotaGiB")]
    pub storage_capacity_quota_gib: i64,
    #[serde(rename = "Type")]
    pub quota_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OriginSnapshot {
    #[serde(rename = "SnapshotARN")]
    pub snapshot_arn: String,
    pub copy_strategy: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OpenZfsConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_volume_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy_tags_to_snapshots: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_compression_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(rename = "RecordSizeKiB", skip_serializing_if = "Option::is_none")]
    pub record_size_kib: Option<i64>,
    #[serde(
        rename = "StorageCapacityQuotaGiB",
        skip_serializing_if = "Option::is_none"
    )]
    pub storage_capacity_quota_gib: Option<i64>,
    #[serde(
        rename = "StorageCapacityReservationGiB",
        skip_serializing_if = "Option::is_none"
    )]
    pub storage_capacity_reservation_gib: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nfs_exports: Option<Vec<NfsExport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_and_group_quotas: Option<Vec<UserAndGroupQuota>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_snapshot: Option<OriginSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdministrativeAction {
    pub administrative_action_type: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleTransitionReason {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Volume {
    pub volume_id: String,
    #[serde(rename = "ResourceARN", default)]
    pub resource_arn: Option<String>,
    #[serde(default)]
    pub file_system_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lifecycle: Option<String>,
    #[serde(default)]
    pub lifecycle_transition_reason: Option<LifecycleTransitionReason>,
    #[serde(default)]
    pub volume_type: Option<String>,
    #[serde(default)]
    pub administrative_actions: Vec<AdministrativeAction>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(rename = "OpenZFSConfiguration", default)]
    pub open_zfs_configuration: Option<OpenZfsConfiguration>,
}

impl Volume {
    pub fn lifecycle(&self) -> &str {
        self.lifecycle.as_deref().unwrap_or_default()
    }

    /// A volume update that has not finished yet
    pub fn has_pending_update(&self) -> bool {
        self.administrative_actions.iter().any(|a| {
            a.administrative_action_type == VOLUME_UPDATE
                && matches!(
                    a.status.as_deref(),
                    Some(action_status::PENDING) | Some(action_status::IN_PROGRESS)
                )
        })
    }

    /// Most recent failed volume update, if any
    pub fn failed_update(&self) -> Option<&AdministrativeAction> {
        self.administrative_actions.iter().find(|a| {
            a.administrative_action_type == VOLUME_UPDATE
                && a.status.as_deref() == Some(action_status::FAILED)
        })
    }

    pub fn transition_reason(&self) -> String {
        self.lifecycle_transition_reason
            .as_ref()
            .and_then(|r| r.message.clone())
            .unwrap_or_default()
    }
}

/// `OpenZFSConfiguration` for CreateVolume
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateOpenZfsConfiguration {
    pub parent_volume_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy_tags_to_snapshots: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_compression_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(rename = "RecordSizeKiB", skip_serializing_if = "Option::is_none")]
    pub record_size_kib: Option<i64>,
    #[serde(
        rename = "StorageCapacityQuotaGiB",
        skip_serializing_if = "Option::is_none"
    )]
    pub storage_capacity_quota_gib: Option<i64>,
    #[serde(
        rename = "StorageCapacityReservationGiB",
        skip_serializing_if = "Option::is_none"
    )]
    pub storage_capacity_reservation_gib: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nfs_exports: Option<Vec<NfsExport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_and_group_quotas: Option<Vec<UserAndGroupQuota>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_snapshot: Option<OriginSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateVolumeRequest {
    pub client_request_token: String,
    pub name: String,
    pub volume_type: String,
    #[serde(rename = "OpenZFSConfiguration")]
    pub open_zfs_configuration: CreateOpenZfsConfiguration,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// `OpenZFSConfiguration` for UpdateVolume; only set fields change
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateOpenZfsConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_compression_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(rename = "RecordSizeKiB", skip_serializing_if = "Option::is_none")]
    pub record_size_kib: Option<i64>,
    #[serde(
        rename = "StorageCapacityQuotaGiB",
        skip_serializing_if = "Option::is_none"
    )]
    pub storage_capacity_quota_gib: Option<i64>,
    #[serde(
        rename = "StorageCapacityReservationGiB",
        skip_serializing_if = "Option::is_none"
    )]
    pub storage_capacity_reservation_gib: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nfs_exports: Option<Vec<NfsExport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_and_group_quotas: Option<Vec<UserAndGroupQuota>>,
}

impl UpdateOpenZfsConfiguration {
    pub fn is_empty(&self) -> bool {
        self.data_compression_type.is_none()
            && self.read_only.is_none()
            && self.record_size_kib.is_none()
            && self.storage_capacity_quota_gib.is_none()
            && self.storage_capacity_reservation_gib.is_none()
            && self.nfs_exports.is_none()
            && self.user_and_group_quotas.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateVolumeRequest {
    pub client_request_token: String,
    pub volume_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "OpenZFSConfiguration")]
    pub open_zfs_configuration: UpdateOpenZfsConfiguration,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteVolumeRequest {
    pub client_request_token: String,
    pub volume_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeVolumesRequest {
    pub volume_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagResourceRequest {
    #[serde(rename = "ResourceARN")]
    pub resource_arn: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UntagResourceRequest {
    #[serde(rename = "ResourceARN")]
    pub resource_arn: String,
    pub tag_keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeResponse {
    pub volume: Volume,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeVolumesResponse {
    #[serde(default)]
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteVolumeResponse {
    #[serde(default)]
    pub volume_id: Option<String>,
    #[serde(default)]
    pub lifecycle: Option<String>,
}

/// Operations with an empty response body
#[derive(Debug, Default, Deserialize)]
pub struct Empty {}

/// JSON protocol error body
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "__type", default)]
    pub error_type: Option<String>,
    #[serde(alias = "message", rename = "Message", default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Error code without the namespace prefix
    pub fn code(&self) -> &str {
        let raw = self.error_type.as_deref().unwrap_or("UnknownError");
        raw.rsplit('#').next().unwrap_or(raw)
    }
}
