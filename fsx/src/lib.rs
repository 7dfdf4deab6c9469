pub mod acctest;
pub mod api;
pub mod provider_data;
pub mod resources;

pub use provider_data::FsxProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::defaults::{EnvDefault, StaticDefault};
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::NumberRangeValidator;
use tfplug::Provider;

use api::{Client, ClientConfig, Credentials, RetryConfig, WaitConfig};

/// The `aws` provider, limited to FSx for OpenZFS
pub struct FsxProvider {
    wait: WaitConfig,
    provider_data: Option<FsxProviderData>,
}

impl Default for FsxProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FsxProvider {
    pub fn new() -> Self {
        Self {
            wait: WaitConfig::default(),
            provider_data: None,
        }
    }

    /// Override how long and how often resources poll the service
    pub fn with_wait_config(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    /// Provider data from the last successful configure
    pub fn provider_data(&self) -> Option<&FsxProviderData> {
        self.provider_data.as_ref()
    }
}

fn config_string(config: &DynamicValue, name: &str) -> Option<String> {
    config
        .get_string(&AttributePath::new(name))
        .ok()
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl Provider for FsxProvider {
    fn type_name(&self) -> &str {
        "aws"
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .description("Amazon FSx for OpenZFS")
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .description("AWS region (AWS_REGION or AWS_DEFAULT_REGION)")
                    .optional()
                    .default(EnvDefault::any_of(&["AWS_REGION", "AWS_DEFAULT_REGION"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("endpoint", AttributeType::String)
                    .description("FSx endpoint override (AWS_ENDPOINT_URL_FSX)")
                    .optional()
                    .default(EnvDefault::any_of(&["AWS_ENDPOINT_URL_FSX"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("access_key", AttributeType::String)
                    .description("Access key ID (AWS_ACCESS_KEY_ID)")
                    .optional()
                    .default(EnvDefault::create_required("AWS_ACCESS_KEY_ID"))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("secret_key", AttributeType::String)
                    .description("Secret access key (AWS_SECRET_ACCESS_KEY)")
                    .optional()
                    .sensitive()
                    .default(EnvDefault::create_required("AWS_SECRET_ACCESS_KEY"))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("token", AttributeType::String)
                    .description("Session token (AWS_SESSION_TOKEN)")
                    .optional()
                    .sensitive()
                    .default(EnvDefault::create_required("AWS_SESSION_TOKEN"))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_retries", AttributeType::Number)
                    .description("Retries for throttled or failed API calls")
                    .optional()
                    .default(StaticDefault::number(3.0))
                    .validator(NumberRangeValidator::create(Some(0.0), Some(25.0)))
                    .build(),
            )
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let config = &request.config;
        let mut diagnostics = vec![];

        let region = config_string(config, "region");
        let access_key = config_string(config, "access_key");
        let secret_key = config_string(config, "secret_key");

        if region.is_none() {
            diagnostics.push(Diagnostic::error(
                "region is required",
                "Set region in the provider config or the AWS_REGION env var",
            ));
        }
        if access_key.is_none() || secret_key.is_none() {
            diagnostics.push(Diagnostic::error(
                "credentials are required",
                "Set access_key and secret_key in the provider config or the AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY env vars",
            ));
        }

        let (Some(region), Some(access_key), Some(secret_key)) = (region, access_key, secret_key)
        else {
            return ConfigureProviderResponse {
                diagnostics,
                provider_data: None,
            };
        };

        let token = config_string(config, "token");
        let credentials = Credentials::new(&access_key, &secret_key, token.as_deref());
        let retry = RetryConfig {
            max_retries: config
                .get_number(&AttributePath::new("max_retries"))
                .map(|n| n as u32)
                .unwrap_or(3),
            ..Default::default()
        };

        let mut client_config = ClientConfig::new(&region, credentials).with_retry(retry);
        if let Some(endpoint) = config_string(config, "endpoint") {
            client_config = client_config.with_endpoint(&endpoint);
        }

        match Client::new(client_config) {
            Ok(client) => {
                tracing::debug!("FSx client configured for {}", client.endpoint());
                let data = FsxProviderData::new(client, self.wait.clone());
                self.provider_data = Some(data.clone());
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: Some(Arc::new(data)),
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create API client",
                    e.to_string(),
                ));
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut resources: HashMap<String, ResourceFactory> = HashMap::new();
        resources.insert(
            resources::openzfs_volume::TYPE_NAME.to_string(),
            Box::new(|| -> Box<dyn ResourceWithConfigure> {
                Box::new(resources::OpenZfsVolumeResource::new())
            }),
        );
        resources
    }
}
