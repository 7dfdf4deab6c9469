//! Shared fixtures for the volume lifecycle tests
//!
//! By default the tests run against [`FsxFake`], a mockito server that keeps
//! volumes in memory and walks them through the same lifecycle states the
//! service reports. With `TF_ACC` and `FSX_OPENZFS_ROOT_VOLUME_ID` set they
//! run against the real service instead, using the usual AWS env vars.

#![allow(dead_code)]

use mockito::{Mock, Request, Server, ServerGuard};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tfplug::acctest::{check_destroy, is_acceptance_enabled, BoxCheck, TestCase};
use tfplug::types::{Dynamic, DynamicValue};

use fsx::acctest::VolumeFinder;
use fsx::api::{Client, ClientConfig, Credentials, WaitConfig};
use fsx::FsxProvider;

pub const ROOT_VOLUME_ENV: &str = "FSX_OPENZFS_ROOT_VOLUME_ID";
pub const FAKE_ROOT_VOLUME_ID: &str = "fsvol-0123456789abcdef0";

const TARGET_PREFIX: &str = "AWSSimbaAPIService_v20180301";
const REGION: &str = "us-east-1";
const FILE_SYSTEM_ID: &str = "fs-0123456789abcdef0";
const ACCESS_KEY: &str = "AKIDFAKE";
const SECRET_KEY: &str = "fake-secret";

/// A volume kept by the fake, plus what the next describe should report
struct StoredVolume {
    body: Value,
    /// Lifecycle reported once more before `settle` applies
    settle: Option<Settle>,
}

enum Settle {
    Available,
    UpdateCompleted,
    Gone,
}

#[derive(Default)]
struct FakeState {
    volumes: BTreeMap<String, StoredVolume>,
    next_id: u64,
    calls: Vec<String>,
}

type SharedState = Arc<Mutex<FakeState>>;

/// In-memory FSx endpoint speaking the JSON 1.1 protocol
pub struct FsxFake {
    server: ServerGuard,
    state: SharedState,
    _mocks: Vec<Mock>,
}

impl FsxFake {
    pub async fn start() -> Self {
        let mut server = Server::new_async().await;
        let state: SharedState = Arc::new(Mutex::new(FakeState::default()));
        state.lock().unwrap().volumes.insert(
            FAKE_ROOT_VOLUME_ID.to_string(),
            StoredVolume {
                body: volume_body(FAKE_ROOT_VOLUME_ID, "fsx", &json!({}), &json!([])),
                settle: None,
            },
        );

        let operations: [(&str, fn(&mut FakeState, Value) -> Value); 6] = [
            ("CreateVolume", create_volume),
            ("DescribeVolumes", describe_volumes),
            ("UpdateVolume", update_volume),
            ("DeleteVolume", delete_volume),
            ("TagResource", tag_resource),
            ("UntagResource", untag_resource),
        ];

        let mut mocks = Vec::new();
        for (operation, handler) in operations {
            let shared = Arc::clone(&state);
            let mock = server
                .mock("POST", "/")
                .match_header("x-amz-target", format!("{}.{}", TARGET_PREFIX, operation).as_str())
                .match_header(
                    "authorization",
                    mockito::Matcher::Regex(format!(
                        r"^AWS4-HMAC-SHA256 Credential={}/\d{{8}}/{}/fsx/aws4_request",
                        ACCESS_KEY, REGION
                    )),
                )
                .with_header("content-type", "application/x-amz-json-1.1")
                .with_body_from_request(move |request: &Request| {
                    let input = request
                        .body()
                        .ok()
                        .and_then(|b| serde_json::from_slice(b).ok())
                        .unwrap_or(Value::Null);
                    let mut state = shared.lock().unwrap();
                    state.calls.push(operation.to_string());
                    handler(&mut state, input).to_string().into_bytes()
                })
                .create_async()
                .await;
            mocks.push(mock);
        }

        Self {
            server,
            state,
            _mocks: mocks,
        }
    }

    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Operations received so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Volumes other than the seeded root
    pub fn volume_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .volumes
            .keys()
            .filter(|id| id.as_str() != FAKE_ROOT_VOLUME_ID)
            .count()
    }
}

fn volume_body(id: &str, name: &str, config: &Value, tags: &Value) -> Value {
    let mut zfs = Map::new();
    zfs.insert("ParentVolumeId".into(), config.get("ParentVolumeId").cloned().unwrap_or(Value::Null));
    zfs.insert(
        "CopyTagsToSnapshots".into(),
        config.get("CopyTagsToSnapshots").cloned().unwrap_or(json!(false)),
    );
    zfs.insert(
        "DataCompressionType".into(),
        config.get("DataCompressionType").cloned().unwrap_or(json!("NONE")),
    );
    zfs.insert("ReadOnly".into(), config.get("ReadOnly").cloned().unwrap_or(json!(false)));
    zfs.insert("RecordSizeKiB".into(), config.get("RecordSizeKiB").cloned().unwrap_or(json!(128)));
    for key in ["StorageCapacityQuotaGiB", "StorageCapacityReservationGiB", "OriginSnapshot"] {
        if let Some(value) = config.get(key) {
            zfs.insert(key.into(), value.clone());
        }
    }
    zfs.insert(
        "NfsExports".into(),
        config.get("NfsExports").cloned().unwrap_or_else(|| {
            json!([{"ClientConfigurations": [{"Clients": "*", "Options": ["crossmnt"]}]}])
        }),
    );
    zfs.insert(
        "UserAndGroupQuotas".into(),
        config.get("UserAndGroupQuotas").cloned().unwrap_or(json!([])),
    );

    json!({
        "VolumeId": id,
        "ResourceARN": format!("arn:aws:fsx:{}:123456789012:volume/{}/{}", REGION, FILE_SYSTEM_ID, id),
        "FileSystemId": FILE_SYSTEM_ID,
        "Name": name,
        "VolumeType": "OPENZFS",
        "Lifecycle": "AVAILABLE",
        "AdministrativeActions": [],
        "Tags": tags,
        "OpenZFSConfiguration": Value::Object(zfs),
    })
}

fn create_volume(state: &mut FakeState, input: Value) -> Value {
    state.next_id += 1;
    let id = format!("fsvol-{:017x}", 0xa000 + state.next_id);
    let name = input["Name"].as_str().unwrap_or_default();
    let config = input.get("OpenZFSConfiguration").cloned().unwrap_or(json!({}));
    let tags = input.get("Tags").cloned().unwrap_or(json!([]));

    let mut body = volume_body(&id, name, &config, &tags);
    body["Lifecycle"] = json!("CREATING");
    state.volumes.insert(
        id,
        StoredVolume {
            body: body.clone(),
            settle: Some(Settle::Available),
        },
    );
    json!({ "Volume": body })
}

fn describe_volumes(state: &mut FakeState, input: Value) -> Value {
    let ids: Vec<String> = input["VolumeIds"]
        .as_array()
        .map(|ids| ids.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();

    let mut volumes = Vec::new();
    for id in ids {
        let Some(stored) = state.volumes.get_mut(&id) else {
            continue;
        };
        volumes.push(stored.body.clone());
        match stored.settle.take() {
            Some(Settle::Available) => stored.body["Lifecycle"] = json!("AVAILABLE"),
            Some(Settle::UpdateCompleted) => {
                stored.body["AdministrativeActions"] =
                    json!([{"AdministrativeActionType": "VOLUME_UPDATE", "Status": "COMPLETED"}]);
            }
            Some(Settle::Gone) => {
                state.volumes.remove(&id);
            }
            None => {}
        }
    }
    json!({ "Volumes": volumes })
}

fn update_volume(state: &mut FakeState, input: Value) -> Value {
    let id = input["VolumeId"].as_str().unwrap_or_default();
    let Some(stored) = state.volumes.get_mut(id) else {
        return json!({});
    };
    if let Some(name) = input.get("Name") {
        stored.body["Name"] = name.clone();
    }
    if let Some(Value::Object(changes)) = input.get("OpenZFSConfiguration") {
        for (key, value) in changes {
            stored.body["OpenZFSConfiguration"][key] = value.clone();
        }
    }
    stored.body["AdministrativeActions"] =
        json!([{"AdministrativeActionType": "VOLUME_UPDATE", "Status": "IN_PROGRESS"}]);
    stored.settle = Some(Settle::UpdateCompleted);
    json!({ "Volume": stored.body })
}

fn delete_volume(state: &mut FakeState, input: Value) -> Value {
    let id = input["VolumeId"].as_str().unwrap_or_default();
    if let Some(stored) = state.volumes.get_mut(id) {
        stored.body["Lifecycle"] = json!("DELETING");
        stored.settle = Some(Settle::Gone);
    }
    json!({ "VolumeId": id, "Lifecycle": "DELETING" })
}

fn by_arn<'a>(state: &'a mut FakeState, input: &Value) -> Option<&'a mut StoredVolume> {
    let arn = input["ResourceARN"].as_str()?;
    state
        .volumes
        .values_mut()
        .find(|v| v.body["ResourceARN"].as_str() == Some(arn))
}

fn tag_resource(state: &mut FakeState, input: Value) -> Value {
    let new_tags = input["Tags"].as_array().cloned().unwrap_or_default();
    if let Some(stored) = by_arn(state, &input) {
        let mut tags = stored.body["Tags"].as_array().cloned().unwrap_or_default();
        for tag in new_tags {
            tags.retain(|t| t["Key"] != tag["Key"]);
            tags.push(tag);
        }
        stored.body["Tags"] = Value::Array(tags);
    }
    json!({})
}

fn untag_resource(state: &mut FakeState, input: Value) -> Value {
    let keys = input["TagKeys"].as_array().cloned().unwrap_or_default();
    if let Some(stored) = by_arn(state, &input) {
        let mut tags = stored.body["Tags"].as_array().cloned().unwrap_or_default();
        tags.retain(|t| !keys.contains(&t["Key"]));
        stored.body["Tags"] = Value::Array(tags);
    }
    json!({})
}

/// Where a scenario runs: the in-memory fake or a real account
pub struct Harness {
    fake: Option<FsxFake>,
    root_volume_id: String,
    provider_config: DynamicValue,
    client: Client,
}

impl Harness {
    pub async fn new() -> Self {
        match std::env::var(ROOT_VOLUME_ENV) {
            Ok(root) if is_acceptance_enabled() && !root.is_empty() => Self::live(root),
            _ => Self::start_fake().await,
        }
    }

    async fn start_fake() -> Self {
        let fake = FsxFake::start().await;
        let client = Client::new(
            ClientConfig::new(REGION, Credentials::new(ACCESS_KEY, SECRET_KEY, None))
                .with_endpoint(&fake.url()),
        )
        .unwrap();
        let provider_config = DynamicValue::new(Dynamic::object([
            ("region", Dynamic::from(REGION)),
            ("endpoint", Dynamic::from(fake.url())),
            ("access_key", Dynamic::from(ACCESS_KEY)),
            ("secret_key", Dynamic::from(SECRET_KEY)),
        ]));
        Self {
            fake: Some(fake),
            root_volume_id: FAKE_ROOT_VOLUME_ID.to_string(),
            provider_config,
            client,
        }
    }

    fn live(root_volume_id: String) -> Self {
        let env = |name: &str| std::env::var(name).unwrap_or_default();
        let region = std::env::var("AWS_REGION").unwrap_or_else(|_| env("AWS_DEFAULT_REGION"));
        let token = std::env::var("AWS_SESSION_TOKEN").ok();
        let credentials = Credentials::new(
            &env("AWS_ACCESS_KEY_ID"),
            &env("AWS_SECRET_ACCESS_KEY"),
            token.as_deref(),
        );
        let mut config = ClientConfig::new(&region, credentials);
        if let Ok(endpoint) = std::env::var("AWS_ENDPOINT_URL_FSX") {
            config = config.with_endpoint(&endpoint);
        }
        Self {
            fake: None,
            root_volume_id,
            provider_config: DynamicValue::empty_object(),
            client: Client::new(config).unwrap(),
        }
    }

    pub fn fake(&self) -> Option<&FsxFake> {
        self.fake.as_ref()
    }

    pub fn root_volume_id(&self) -> &str {
        &self.root_volume_id
    }

    pub fn finder(&self) -> Arc<VolumeFinder> {
        Arc::new(VolumeFinder::new(self.client.clone()))
    }

    pub fn destroy_check(&self) -> BoxCheck {
        check_destroy(self.finder())
    }

    /// A case wired to this harness with the destroy check installed
    pub fn case(&self) -> TestCase {
        let wait = if self.fake.is_some() {
            WaitConfig::fast()
        } else {
            WaitConfig::default()
        };
        TestCase::new(FsxProvider::new().with_wait_config(wait))
            .provider_config(self.provider_config.clone())
            .variable("root_volume_id", self.root_volume_id.clone())
            .pre_check(|| {
                for var in ["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY"] {
                    if is_acceptance_enabled() && std::env::var(var).is_err() {
                        return Err(format!("{} must be set for acceptance tests", var));
                    }
                }
                Ok(())
            })
            .check_destroy(self.destroy_check())
    }
}
