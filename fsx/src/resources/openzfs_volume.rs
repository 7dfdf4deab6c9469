//! `aws_fsx_openzfs_volume` resource

use async_trait::async_trait;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::import_state_passthrough_id;
use tfplug::plan_modifier::{values_equal, RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, ResourceWithImportState, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{
    AttributeBuilder, AttributeType, NestedBlockBuilder, Schema, SchemaBuilder,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{
    ListLengthValidator, NumberOneOfValidator, NumberRangeValidator, StringLengthValidator,
    StringOneOfValidator, StringPatternValidator,
};

use crate::api::common::{
    ClientConfiguration, CreateOpenZfsConfiguration, CreateVolumeRequest, NfsExport,
    OriginSnapshot, Tag, UpdateOpenZfsConfiguration, UpdateVolumeRequest, UserAndGroupQuota,
};
use crate::api::volumes::client_request_token;
use crate::api::{wait_volume_created, wait_volume_deleted, wait_volume_updated, Volume};

pub const TYPE_NAME: &str = "aws_fsx_openzfs_volume";

const DATA_COMPRESSION_TYPES: &[&str] = &["NONE", "ZSTD", "LZ4"];
const RECORD_SIZES_KIB: &[f64] = &[4.0, 8.0, 16.0, 32.0, 64.0, 128.0, 256.0, 512.0, 1024.0];

#[derive(Default)]
pub struct OpenZfsVolumeResource {
    provider_data: Option<crate::FsxProviderData>,
}

impl OpenZfsVolumeResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn path(name: &str) -> AttributePath {
    AttributePath::new(name)
}

pub(crate) fn volume_schema() -> Result<Schema, regex::Error> {
    let printable = Regex::new(r"^[ -~]+$")?;
    let volume_id = Regex::new(r"^fsvol-[0-9a-f]{8,}$")?;

    let client_configurations = NestedBlockBuilder::set("client_configurations")
        .description("NFS clients and the options they mount with")
        .min_items(1)
        .max_items(25)
        .attribute(
            AttributeBuilder::new("clients", AttributeType::String)
                .description("Clients allowed to mount: `*`, a hostname, or a CIDR block")
                .required()
                .validator(StringLengthValidator::between(1, 128))
                .validator(StringPatternValidator::create(printable, "printable ASCII"))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("options", AttributeType::List(Box::new(AttributeType::String)))
                .description("NFS export options such as `rw` or `crossmnt`")
                .required()
                .validator(ListLengthValidator::create(Some(1), Some(20)))
                .build(),
        )
        .build();

    Ok(SchemaBuilder::new()
        .version(0)
        .description("Manages an Amazon FSx for OpenZFS volume")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .description("Volume ID")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("arn", AttributeType::String)
                .description("Amazon Resource Name of the volume")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .description("Name of the volume")
                .required()
                .validator(StringLengthValidator::between(1, 203))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("parent_volume_id", AttributeType::String)
                .description("Volume to nest this volume under")
                .required()
                .validator(StringPatternValidator::create(volume_id, "an FSx volume ID (fsvol-...)"))
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("copy_tags_to_snapshots", AttributeType::Bool)
                .optional()
                .default(StaticDefault::bool(false))
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("data_compression_type", AttributeType::String)
                .optional()
                .default(StaticDefault::string("NONE"))
                .validator(StringOneOfValidator::create(DATA_COMPRESSION_TYPES))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("read_only", AttributeType::Bool)
                .optional()
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("record_size_kib", AttributeType::Number)
                .optional()
                .default(StaticDefault::number(128.0))
                .validator(NumberOneOfValidator::create(RECORD_SIZES_KIB))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("storage_capacity_quota_gib", AttributeType::Number)
                .optional()
                .computed()
                .validator(NumberRangeValidator::create(Some(0.0), Some(2147483647.0)))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("storage_capacity_reservation_gib", AttributeType::Number)
                .optional()
                .computed()
                .validator(NumberRangeValidator::create(Some(0.0), Some(2147483647.0)))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("volume_type", AttributeType::String)
                .optional()
                .default(StaticDefault::string("OPENZFS"))
                .validator(StringOneOfValidator::create(&["OPENZFS"]))
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("tags", AttributeType::Map(Box::new(AttributeType::String)))
                .optional()
                .build(),
        )
        .block(
            NestedBlockBuilder::list("nfs_exports")
                .description("NFS export configuration; the service adds a default when omitted")
                .max_items(1)
                .computed()
                .block(client_configurations)
                .build(),
        )
        .block(
            NestedBlockBuilder::list("user_and_group_quotas")
                .description("Per user and per group storage quotas")
                .max_items(100)
                .computed()
                .attribute(
                    AttributeBuilder::new("id", AttributeType::Number)
                        .required()
                        .validator(NumberRangeValidator::create(Some(0.0), Some(2147483647.0)))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("storage_capacity_quota_gib", AttributeType::Number)
                        .required()
                        .validator(NumberRangeValidator::create(Some(0.0), Some(2147483647.0)))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("type", AttributeType::String)
                        .required()
                        .validator(StringOneOfValidator::create(&["USER", "GROUP"]))
                        .build(),
                )
                .build(),
        )
        .block(
            NestedBlockBuilder::list("origin_snapshot")
                .description("Snapshot to create the volume from")
                .max_items(1)
                .plan_modifier(RequiresReplace::create())
                .attribute(
                    AttributeBuilder::new("copy_strategy", AttributeType::String)
                        .required()
                        .validator(StringOneOfValidator::create(&["CLONE", "FULL_COPY"]))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("snapshot_arn", AttributeType::String)
                        .required()
                        .validator(StringLengthValidator::between(8, 512))
                        .build(),
                )
                .build(),
        )
        .build())
}

fn known_string(value: &DynamicValue, name: &str) -> Option<String> {
    value.get(&path(name)).and_then(|v| v.as_string()).map(str::to_string)
}

fn known_number(value: &DynamicValue, name: &str) -> Option<i64> {
    value.get(&path(name)).and_then(|v| v.as_number()).map(|n| n as i64)
}

fn known_bool(value: &DynamicValue, name: &str) -> Option<bool> {
    value.get(&path(name)).and_then(|v| v.as_bool())
}

fn field<'a>(value: &'a Dynamic, name: &str) -> Option<&'a Dynamic> {
    value.as_map().and_then(|m| m.get(name))
}

fn field_string(value: &Dynamic, name: &str) -> String {
    field(value, name)
        .and_then(|v| v.as_string())
        .unwrap_or_default()
        .to_string()
}

fn field_number(value: &Dynamic, name: &str) -> i64 {
    field(value, name).and_then(|v| v.as_number()).unwrap_or_default() as i64
}

/// The configured blocks under `name`; None when unknown or absent
fn blocks<'a>(value: &'a DynamicValue, name: &str) -> Option<&'a [Dynamic]> {
    value.get(&path(name)).and_then(|v| v.as_list())
}

fn expand_nfs_exports(value: &DynamicValue) -> Option<Vec<NfsExport>> {
    let exports = blocks(value, "nfs_exports")?;
    if exports.is_empty() {
        return None;
    }
    Some(
        exports
            .iter()
            .map(|export| NfsExport {
                client_configurations: field(export, "client_configurations")
                    .and_then(|v| v.as_list())
                    .unwrap_or(&[])
                    .iter()
                    .map(|cc| ClientConfiguration {
                        clients: field_string(cc, "clients"),
                        options: field(cc, "options")
                            .and_then(|v| v.as_list())
                            .unwrap_or(&[])
                            .iter()
                            .filter_map(|o| o.as_string().map(str::to_string))
                            .collect(),
                    })
                    .collect(),
            })
            .collect(),
    )
}

fn expand_quotas(value: &DynamicValue) -> Option<Vec<UserAndGroupQuota>> {
    let quotas = blocks(value, "user_and_group_quotas")?;
    Some(
        quotas
            .iter()
            .map(|q| UserAndGroupQuota {
                id: field_number(q, "id"),
                storage_capacity_quota_gib: field_number(q, "storage_capacity_quota_gib"),
                quota_type: field_string(q, "type"),
            })
            .collect(),
    )
}

fn expand_origin_snapshot(value: &DynamicValue) -> Option<OriginSnapshot> {
    let snapshot = blocks(value, "origin_snapshot")?.first()?;
    Some(OriginSnapshot {
        snapshot_arn: field_string(snapshot, "snapshot_arn"),
        copy_strategy: field_string(snapshot, "copy_strategy"),
    })
}

fn expand_tags(value: &DynamicValue) -> BTreeMap<String, String> {
    value
        .get(&path("tags"))
        .and_then(|v| v.as_map())
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| v.as_string().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn to_tags(tags: &BTreeMap<String, String>) -> Vec<Tag> {
    tags.iter()
        .map(|(key, value)| Tag {
            key: key.clone(),
            value: value.clone(),
        })
        .collect()
}

fn expand_create(planned: &DynamicValue) -> Result<CreateVolumeRequest, Diagnostic> {
    let name = known_string(planned, "name")
        .ok_or_else(|| Diagnostic::error("Missing name", "The 'name' attribute is required"))?;
    let parent_volume_id = known_string(planned, "parent_volume_id").ok_or_else(|| {
        Diagnostic::error(
            "Missing parent_volume_id",
            "The 'parent_volume_id' attribute must be known before the volume can be created",
        )
    })?;

    Ok(CreateVolumeRequest {
        client_request_token: client_request_token(),
        name,
        volume_type: known_string(planned, "volume_type").unwrap_or_else(|| "OPENZFS".to_string()),
        open_zfs_configuration: CreateOpenZfsConfiguration {
            parent_volume_id,
            copy_tags_to_snapshots: known_bool(planned, "copy_tags_to_snapshots"),
            data_compression_type: known_string(planned, "data_compression_type"),
            read_only: known_bool(planned, "read_only"),
            record_size_kib: known_number(planned, "record_size_kib"),
            storage_capacity_quota_gib: known_number(planned, "storage_capacity_quota_gib"),
            storage_capacity_reservation_gib: known_number(
                planned,
                "storage_capacity_reservation_gib",
            ),
            nfs_exports: expand_nfs_exports(planned),
            user_and_group_quotas: expand_quotas(planned).filter(|q| !q.is_empty()),
            origin_snapshot: expand_origin_snapshot(planned),
        },
        tags: to_tags(&expand_tags(planned)),
    })
}

/// Fields that differ between prior and planned state and are known in the plan
fn changed<'a>(prior: &DynamicValue, planned: &'a DynamicValue, name: &str) -> Option<&'a Dynamic> {
    let new = planned.get(&path(name))?;
    if !new.is_known() {
        return None;
    }
    let old = prior.get(&path(name)).unwrap_or(&Dynamic::Null);
    if values_equal(old, new) {
        None
    } else {
        Some(new)
    }
}

fn expand_update(prior: &DynamicValue, planned: &DynamicValue, volume_id: &str) -> UpdateVolumeRequest {
    let number = |name: &str| changed(prior, planned, name).and_then(|v| v.as_number()).map(|n| n as i64);

    UpdateVolumeRequest {
        client_request_token: client_request_token(),
        volume_id: volume_id.to_string(),
        name: changed(prior, planned, "name")
            .and_then(|v| v.as_string())
            .map(str::to_string),
        open_zfs_configuration: UpdateOpenZfsConfiguration {
            data_compression_type: changed(prior, planned, "data_compression_type")
                .and_then(|v| v.as_string())
                .map(str::to_string),
            read_only: changed(prior, planned, "read_only").and_then(|v| v.as_bool()),
            record_size_kib: number("record_size_kib"),
            storage_capacity_quota_gib: number("storage_capacity_quota_gib"),
            storage_capacity_reservation_gib: number("storage_capacity_reservation_gib"),
            nfs_exports: changed(prior, planned, "nfs_exports").and(expand_nfs_exports(planned)),
            user_and_group_quotas: changed(prior, planned, "user_and_group_quotas")
                .and(expand_quotas(planned)),
        },
    }
}

fn number(n: Option<i64>) -> Dynamic {
    n.map(|n| Dynamic::Number(n as f64)).unwrap_or(Dynamic::Null)
}

fn string(s: Option<&str>) -> Dynamic {
    s.map(Dynamic::from).unwrap_or(Dynamic::Null)
}

fn bool_value(b: Option<bool>) -> Dynamic {
    b.map(Dynamic::Bool).unwrap_or(Dynamic::Null)
}

/// State for a volume as the API reports it
pub(crate) fn flatten_volume(volume: &Volume) -> DynamicValue {
    let config = volume.open_zfs_configuration.clone().unwrap_or_default();

    let nfs_exports = config
        .nfs_exports
        .unwrap_or_default()
        .into_iter()
        .map(|export| {
            Dynamic::object([(
                "client_configurations",
                Dynamic::List(
                    export
                        .client_configurations
                        .into_iter()
                        .map(|cc| {
                            Dynamic::object([
                                ("clients", Dynamic::String(cc.clients)),
                                (
                                    "options",
                                    Dynamic::List(cc.options.into_iter().map(Dynamic::String).collect()),
                                ),
                            ])
                        })
                        .collect(),
                ),
            )])
        })
        .collect();

    let quotas = config
        .user_and_group_quotas
        .unwrap_or_default()
        .into_iter()
        .map(|q| {
            Dynamic::object([
                ("id", Dynamic::Number(q.id as f64)),
                (
                    "storage_capacity_quota_gib",
                    Dynamic::Number(q.storage_capacity_quota_gib as f64),
                ),
                ("type", Dynamic::String(q.quota_type)),
            ])
        })
        .collect();

    let origin_snapshot = config
        .origin_snapshot
        .map(|s| {
            vec![Dynamic::object([
                ("copy_strategy", Dynamic::String(s.copy_strategy)),
                ("snapshot_arn", Dynamic::String(s.snapshot_arn)),
            ])]
        })
        .unwrap_or_default();

    let tags: HashMap<String, Dynamic> = volume
        .tags
        .iter()
        .map(|t| (t.key.clone(), Dynamic::String(t.value.clone())))
        .collect();

    DynamicValue::new(Dynamic::object([
        ("id", Dynamic::String(volume.volume_id.clone())),
        ("arn", string(volume.resource_arn.as_deref())),
        ("name", string(volume.name.as_deref())),
        ("parent_volume_id", string(config.parent_volume_id.as_deref())),
        ("copy_tags_to_snapshots", bool_value(config.copy_tags_to_snapshots)),
        ("data_compression_type", string(config.data_compression_type.as_deref())),
        ("read_only", bool_value(config.read_only)),
        ("record_size_kib", number(config.record_size_kib)),
        ("storage_capacity_quota_gib", number(config.storage_capacity_quota_gib)),
        (
            "storage_capacity_reservation_gib",
            number(config.storage_capacity_reservation_gib),
        ),
        ("volume_type", string(volume.volume_type.as_deref())),
        (
            "tags",
            if tags.is_empty() {
                Dynamic::Null
            } else {
                Dynamic::Map(tags)
            },
        ),
        ("nfs_exports", Dynamic::List(nfs_exports)),
        ("user_and_group_quotas", Dynamic::List(quotas)),
        ("origin_snapshot", Dynamic::List(origin_snapshot)),
    ]))
}

fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

#[async_trait]
impl Resource for OpenZfsVolumeResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        match volume_schema() {
            Ok(schema) => ResourceSchemaResponse {
                schema,
                diagnostics: vec![],
            },
            Err(e) => ResourceSchemaResponse {
                schema: SchemaBuilder::new().build(),
                diagnostics: vec![Diagnostic::error("Invalid schema", e.to_string())],
            },
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        // A reservation larger than the quota can never be satisfied
        let quota = known_number(&request.config, "storage_capacity_quota_gib");
        let reservation = known_number(&request.config, "storage_capacity_reservation_gib");
        if let (Some(quota), Some(reservation)) = (quota, reservation) {
            if quota > 0 && reservation > quota {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid storage capacity",
                        format!(
                            "storage_capacity_reservation_gib ({}) cannot exceed storage_capacity_quota_gib ({})",
                            reservation, quota
                        ),
                    )
                    .with_attribute(path("storage_capacity_reservation_gib")),
                );
            }
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        };

        let create_request = match expand_create(&request.planned_state) {
            Ok(r) => r,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let volume = match provider_data.client.volumes().create(&create_request).await {
            Ok(volume) => volume,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create volume",
                    format!("API error: {}", e),
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };
        tracing::info!(volume_id = %volume.volume_id, "FSx OpenZFS Volume created");

        match wait_volume_created(&provider_data.client, &ctx, &provider_data.wait, &volume.volume_id).await {
            Ok(volume) => CreateResourceResponse {
                new_state: flatten_volume(&volume),
                diagnostics,
            },
            Err(e) => {
                // Keep the id so the half-created volume is tracked and destroyed
                let mut new_state = request.planned_state;
                if let Err(set_err) = new_state.set_string(&path("id"), volume.volume_id.clone()) {
                    diagnostics.push(Diagnostic::error(
                        "Failed to record volume id",
                        format!("{}; recording the created volume instead", set_err),
                    ));
                    new_state = flatten_volume(&volume);
                }
                diagnostics.push(Diagnostic::error(
                    "Failed to create volume",
                    format!("waiting for creation: {}", e),
                ));
                CreateResourceResponse {
                    new_state,
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        let Some(volume_id) = known_string(&request.current_state, "id") else {
            return ReadResourceResponse {
                new_state: None,
                diagnostics,
            };
        };

        match provider_data.client.volumes().find_by_id(&volume_id).await {
            Ok(volume) => ReadResourceResponse {
                new_state: Some(flatten_volume(&volume)),
                diagnostics,
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!("FSx OpenZFS Volume ({}) not found, removing from state", volume_id);
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read volume",
                    format!("API error: {}", e),
                ));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                }
            }
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        };
        let volumes = provider_data.client.volumes();

        let Some(volume_id) = known_string(&request.prior_state, "id") else {
            diagnostics.push(Diagnostic::error("Missing id", "The prior state has no volume id"));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        };

        let update_request = expand_update(&request.prior_state, &request.planned_state, &volume_id);
        if update_request.name.is_some() || !update_request.open_zfs_configuration.is_empty() {
            if let Err(e) = volumes.update(&update_request).await {
                diagnostics.push(Diagnostic::error(
                    "Failed to update volume",
                    format!("API error: {}", e),
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
            if let Err(e) =
                wait_volume_updated(&provider_data.client, &ctx, &provider_data.wait, &volume_id).await
            {
                diagnostics.push(Diagnostic::error(
                    "Failed to update volume",
                    format!("waiting for update: {}", e),
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        }

        let old_tags = expand_tags(&request.prior_state);
        let new_tags = expand_tags(&request.planned_state);
        if old_tags != new_tags {
            let arn = known_string(&request.prior_state, "arn").unwrap_or_default();
            let removed: Vec<String> = old_tags
                .keys()
                .filter(|k| !new_tags.contains_key(*k))
                .cloned()
                .collect();
            let upserted: BTreeMap<String, String> = new_tags
                .iter()
                .filter(|(k, v)| old_tags.get(*k) != Some(*v))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            let result = match volumes.untag_resource(&arn, removed).await {
                Ok(()) => volumes.tag_resource(&arn, to_tags(&upserted)).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                diagnostics.push(Diagnostic::error(
                    "Failed to update tags",
                    format!("API error: {}", e),
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        }

        match volumes.find_by_id(&volume_id).await {
            Ok(volume) => UpdateResourceResponse {
                new_state: flatten_volume(&volume),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read volume after update",
                    format!("API error: {}", e),
                ));
                UpdateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                }
            }
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return DeleteResourceResponse { diagnostics };
        };

        let Some(volume_id) = known_string(&request.prior_state, "id") else {
            return DeleteResourceResponse { diagnostics };
        };

        match provider_data.client.volumes().delete(&volume_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return DeleteResourceResponse { diagnostics },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete volume",
                    format!("API error: {}", e),
                ));
                return DeleteResourceResponse { diagnostics };
            }
        }

        if let Err(e) =
            wait_volume_deleted(&provider_data.client, &ctx, &provider_data.wait, &volume_id).await
        {
            diagnostics.push(Diagnostic::error(
                "Failed to delete volume",
                format!("waiting for deletion: {}", e),
            ));
        } else {
            tracing::info!(volume_id = %volume_id, "FSx OpenZFS Volume deleted");
        }
        DeleteResourceResponse { diagnostics }
    }

    fn import_support(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for OpenZfsVolumeResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<crate::FsxProviderData>() {
                self.provider_data = Some(provider_data.clone());
            } else {
                diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract provider data",
                ));
            }
        } else {
            diagnostics.push(Diagnostic::error(
                "No provider data",
                "No provider data was provided",
            ));
        }

        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for OpenZfsVolumeResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(&ctx, path("id"), &request, &mut response);
        response
    }
}
