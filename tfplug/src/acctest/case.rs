//! Lifecycle driver
//!
//! A `TestCase` configures a provider once, then runs its steps in order
//! against a single evolving state. Config steps converge real resources on
//! the step's fixture; import steps re-import a resource and compare the
//! result with what the config step recorded. Whatever happens, every
//! resource the case created is destroyed at the end.

use super::check::BoxCheck;
use super::config::{Config, ResourceBlock};
use super::error::AcctestError;
use super::state::{ResourceState, TestState};
use crate::context::Context;
use crate::error::TfplugError;
use crate::plan::{apply_defaults, plan_resource_change, validate_config, ChangeAction, ResourcePlan};
use crate::provider::{ConfigureProviderRequest, Provider, ProviderSchemaRequest, ResourceFactory};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest, ResourceSchemaRequest,
    ResourceWithConfigure, UpdateResourceRequest, ValidateResourceConfigRequest,
};
use crate::schema::Schema;
use crate::types::{error_summary, has_errors, AttributePath, Dynamic, DynamicValue};
use regex::Regex;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable that enables acceptance runs against real services
pub const ACCEPTANCE_ENV: &str = "TF_ACC";

pub fn is_acceptance_enabled() -> bool {
    std::env::var(ACCEPTANCE_ENV)
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

type PreCheck = Box<dyn Fn() -> Result<(), String> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    /// The pre-check declined to run the case
    Skipped,
}

/// One step of a test case: either a configuration to converge on or an
/// import of an existing resource
#[derive(Default)]
pub struct TestStep {
    pub config: Option<Config>,
    pub check: Option<BoxCheck>,

    /// Address of the resource an import step targets
    pub resource_name: Option<String>,
    pub import_state: bool,
    pub import_state_verify: bool,
    /// Attribute prefixes excluded from import verification
    pub import_state_verify_ignore: Vec<String>,
    /// Import this ID instead of the one recorded in state
    pub import_state_id: Option<String>,

    /// The step must fail with an error matching this pattern
    pub expect_error: Option<Regex>,
    pub expect_non_empty_plan: bool,
}

impl TestStep {
    pub fn config(config: Config) -> Self {
        Self {
            config: Some(config),
            ..Default::default()
        }
    }

    pub fn import(resource_name: &str) -> Self {
        Self {
            resource_name: Some(resource_name.to_string()),
            import_state: true,
            ..Default::default()
        }
    }

    pub fn check(mut self, check: BoxCheck) -> Self {
        self.check = Some(check);
        self
    }

    pub fn verify(mut self) -> Self {
        self.import_state_verify = true;
        self
    }

    pub fn verify_ignore(mut self, prefixes: &[&str]) -> Self {
        self.import_state_verify_ignore
            .extend(prefixes.iter().map(|p| p.to_string()));
        self
    }

    pub fn import_id(mut self, id: &str) -> Self {
        self.import_state_id = Some(id.to_string());
        self
    }

    pub fn expect_error(mut self, pattern: Regex) -> Self {
        self.expect_error = Some(pattern);
        self
    }

    pub fn expect_non_empty_plan(mut self) -> Self {
        self.expect_non_empty_plan = true;
        self
    }

    fn kind(&self) -> &'static str {
        if self.import_state {
            "import"
        } else {
            "config"
        }
    }
}

pub struct TestCase {
    provider: Box<dyn Provider>,
    provider_config: DynamicValue,
    variables: HashMap<String, Dynamic>,
    pre_check: Option<PreCheck>,
    steps: Vec<TestStep>,
    check_destroy: Option<BoxCheck>,
    timeout: Option<Duration>,
}

impl TestCase {
    pub fn new(provider: impl Provider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            provider_config: DynamicValue::empty_object(),
            variables: HashMap::new(),
            pre_check: None,
            steps: Vec::new(),
            check_destroy: None,
            timeout: None,
        }
    }

    /// Provider block; unset attributes fall back to schema defaults
    pub fn provider_config(mut self, config: DynamicValue) -> Self {
        self.provider_config = config;
        self
    }

    /// Value for a `var.<name>` used by the fixtures
    pub fn variable(mut self, name: &str, value: impl Into<Dynamic>) -> Self {
        self.variables.insert(name.to_string(), value.into());
        self
    }

    /// Runs before anything else; an Err skips the case with that reason
    pub fn pre_check<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<(), String> + Send + Sync + 'static,
    {
        self.pre_check = Some(Box::new(f));
        self
    }

    pub fn step(mut self, step: TestStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Runs after teardown against the last state the case recorded
    pub fn check_destroy(mut self, check: BoxCheck) -> Self {
        self.check_destroy = Some(check);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn run(self) -> Result<TestOutcome, AcctestError> {
        self.run_with_context(&Context::new()).await
    }

    pub async fn run_with_context(mut self, parent: &Context) -> Result<TestOutcome, AcctestError> {
        if let Some(pre_check) = &self.pre_check {
            if let Err(reason) = pre_check() {
                info!(%reason, "skipping test case");
                return Ok(TestOutcome::Skipped);
            }
        }

        let ctx = match self.timeout {
            Some(timeout) => parent.with_timeout(timeout),
            None => parent.child_context(),
        };

        let mut runner = Runner::new(&ctx, self.provider.as_mut(), &self.provider_config).await?;
        runner.variables = self.variables.clone();
        let steps = std::mem::take(&mut self.steps);

        let result = tokio::select! {
            result = runner.run_steps(&ctx, &steps) => result,
            _ = ctx.cancelled() => Err(context_error(&ctx)),
        };

        // Teardown gets its own context so an expired case still cleans up
        let teardown_ctx = Context::new();
        let last_state = runner.state.clone();
        let destroyed = runner.destroy_all(&teardown_ctx).await;
        let destroy_check = match (&self.check_destroy, &destroyed) {
            (Some(check), Ok(())) => check.check(&last_state).await,
            _ => Ok(()),
        };

        match result {
            Ok(()) => {
                destroyed?;
                destroy_check?;
                info!(steps = steps.len(), "test case passed");
                Ok(TestOutcome::Passed)
            }
            Err(e) => {
                if let Err(de) = destroyed {
                    warn!(error = %de, "teardown after failed test case");
                }
                if let Err(ce) = destroy_check {
                    warn!(error = %ce, "destroy check after failed test case");
                }
                Err(e)
            }
        }
    }
}

fn context_error(ctx: &Context) -> AcctestError {
    match ctx.err_if_done() {
        Err(TfplugError::DeadlineExceeded(timeout)) => AcctestError::Timeout(timeout),
        _ => AcctestError::Cancelled,
    }
}

fn split_address(address: &str) -> (&str, &str) {
    address.split_once('.').unwrap_or((address, ""))
}

/// Flatmap differences as `key: "before" => "after"` lines. Prefixes in
/// `ignore` are skipped and an absent collection equals an empty one.
pub(crate) fn attribute_diff(
    before: &BTreeMap<String, String>,
    after: &BTreeMap<String, String>,
    ignore: &[String],
) -> Vec<String> {
    let empty_count = |key: &str, value: Option<&String>| {
        (key.ends_with(".#") || key.ends_with(".%")) && value.map_or(true, |v| v == "0")
    };
    let show = |value: Option<&String>| match value {
        Some(v) => format!("{:?}", v),
        None => "<absent>".to_string(),
    };

    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    keys.into_iter()
        .filter(|key| !ignore.iter().any(|prefix| key.starts_with(prefix.as_str())))
        .filter_map(|key| {
            let (a, b) = (before.get(key), after.get(key));
            if a == b || (empty_count(key, a) && empty_count(key, b)) {
                return None;
            }
            Some(format!("  {}: {} => {}", key, show(a), show(b)))
        })
        .collect()
}

/// Resources in an order where every reference is applied before its
/// referrer; ties keep declaration order
fn dependency_order(config: &Config) -> Result<Vec<&ResourceBlock>, AcctestError> {
    let addresses: Vec<String> = config.resources.iter().map(|r| r.address()).collect();
    let deps: Vec<Vec<usize>> = config
        .resources
        .iter()
        .map(|r| {
            r.body
                .references()
                .iter()
                .filter_map(|a| addresses.iter().position(|x| x == a))
                .collect()
        })
        .collect();

    let mut done = vec![false; addresses.len()];
    let mut order = Vec::with_capacity(addresses.len());
    while order.len() < addresses.len() {
        let next = (0..addresses.len()).find(|&i| !done[i] && deps[i].iter().all(|&d| done[d]));
        match next {
            Some(i) => {
                done[i] = true;
                order.push(&config.resources[i]);
            }
            None => {
                let stuck: Vec<&str> = addresses
                    .iter()
                    .zip(&done)
                    .filter(|(_, d)| !**d)
                    .map(|(a, _)| a.as_str())
                    .collect();
                return Err(AcctestError::DependencyCycle(stuck.join(", ")));
            }
        }
    }
    Ok(order)
}

type Instance = (Arc<dyn ResourceWithConfigure>, Arc<Schema>);

struct Runner {
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
    factories: HashMap<String, ResourceFactory>,
    instances: HashMap<String, Instance>,
    state: TestState,
    /// Addresses in creation order; teardown walks it backwards
    created: Vec<String>,
    variables: HashMap<String, Dynamic>,
}

impl Runner {
    async fn new(
        ctx: &Context,
        provider: &mut dyn Provider,
        provider_config: &DynamicValue,
    ) -> Result<Self, AcctestError> {
        let schema = provider.schema(ctx.clone(), ProviderSchemaRequest).await;
        if has_errors(&schema.diagnostics) {
            return Err(AcctestError::ProviderConfigure(error_summary(
                &schema.diagnostics,
            )));
        }

        let diagnostics = validate_config(&schema.schema.block, provider_config);
        if has_errors(&diagnostics) {
            return Err(AcctestError::ProviderConfigure(error_summary(&diagnostics)));
        }

        let config = apply_defaults(&schema.schema.block, provider_config);
        let response = provider
            .configure(ctx.clone(), ConfigureProviderRequest { config })
            .await;
        if has_errors(&response.diagnostics) {
            return Err(AcctestError::ProviderConfigure(error_summary(
                &response.diagnostics,
            )));
        }
        debug!(provider = provider.type_name(), "provider configured");

        Ok(Self {
            provider_data: response.provider_data,
            factories: provider.resources(),
            instances: HashMap::new(),
            state: TestState::default(),
            created: Vec::new(),
            variables: HashMap::new(),
        })
    }

    /// Configured resource implementation and schema for a type, created
    /// on first use
    async fn instance(&mut self, ctx: &Context, type_name: &str) -> Result<Instance, AcctestError> {
        if let Some(instance) = self.instances.get(type_name) {
            return Ok(instance.clone());
        }

        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| AcctestError::UnknownResourceType(type_name.to_string()))?;
        let mut resource = factory();

        let configured = resource
            .configure(
                ctx.clone(),
                ConfigureResourceRequest {
                    provider_data: self.provider_data.clone(),
                },
            )
            .await;
        if has_errors(&configured.diagnostics) {
            return Err(AcctestError::ProviderConfigure(error_summary(
                &configured.diagnostics,
            )));
        }

        let schema = resource.schema(ctx.clone(), ResourceSchemaRequest).await;
        if has_errors(&schema.diagnostics) {
            return Err(AcctestError::Configuration {
                address: type_name.to_string(),
                message: error_summary(&schema.diagnostics),
            });
        }

        let instance: Instance = (Arc::from(resource), Arc::new(schema.schema));
        self.instances
            .insert(type_name.to_string(), instance.clone());
        Ok(instance)
    }

    async fn run_steps(&mut self, ctx: &Context, steps: &[TestStep]) -> Result<(), AcctestError> {
        for (i, step) in steps.iter().enumerate() {
            info!(step = i + 1, total = steps.len(), kind = step.kind(), "running test step");
            let result = if step.import_state {
                self.import_step(ctx, step).await
            } else {
                self.config_step(ctx, step).await
            };

            match (&step.expect_error, result) {
                (None, result) => result?,
                (Some(pattern), Ok(())) => {
                    return Err(AcctestError::ExpectedErrorNotRaised(pattern.to_string()))
                }
                (Some(pattern), Err(e)) => {
                    let message = e.to_string();
                    if !pattern.is_match(&message) {
                        return Err(AcctestError::UnexpectedError {
                            pattern: pattern.to_string(),
                            message,
                        });
                    }
                    debug!(step = i + 1, %message, "step failed as expected");
                }
            }
        }
        Ok(())
    }

    async fn config_step(&mut self, ctx: &Context, step: &TestStep) -> Result<(), AcctestError> {
        let Some(config) = &step.config else {
            return Err(AcctestError::Configuration {
                address: String::new(),
                message: "test step has neither a config nor an import".to_string(),
            });
        };
        debug!(config = %config, "applying configuration");
        let variables = config.variable_values(&self.variables);

        self.refresh(ctx).await?;

        let wanted: HashSet<String> = config.resources.iter().map(|r| r.address()).collect();
        let orphans: Vec<String> = self
            .created
            .iter()
            .rev()
            .filter(|a| !wanted.contains(*a))
            .cloned()
            .collect();
        for address in orphans {
            self.destroy(ctx, &address).await?;
        }

        for block in dependency_order(config)? {
            self.apply_resource(ctx, block, &variables).await?;
        }

        self.refresh(ctx).await?;

        if let Some((address, plan)) = self.pending_change(ctx, config, &variables).await? {
            if !step.expect_non_empty_plan {
                return Err(AcctestError::NonEmptyPlan {
                    detail: self.plan_detail(&address, &plan),
                    action: plan.action.to_string(),
                    address,
                });
            }
        } else if step.expect_non_empty_plan {
            debug!("expected a non-empty plan but the plan was empty");
        }

        if let Some(check) = &step.check {
            check.check(&self.state).await?;
        }
        Ok(())
    }

    async fn evaluate_and_plan(
        &mut self,
        ctx: &Context,
        block: &ResourceBlock,
        variables: &HashMap<String, Dynamic>,
    ) -> Result<(Instance, DynamicValue, ResourcePlan), AcctestError> {
        let address = block.address();
        let (resource, schema) = self.instance(ctx, &block.resource_type).await?;

        let config = DynamicValue::new(block.body.evaluate(
            Some(&schema.block),
            variables,
            &self.state,
        )?);

        let mut diagnostics = validate_config(&schema.block, &config);
        let validated = resource
            .validate(
                ctx.clone(),
                ValidateResourceConfigRequest {
                    type_name: block.resource_type.clone(),
                    config: config.clone(),
                },
            )
            .await;
        diagnostics.extend(validated.diagnostics);
        if has_errors(&diagnostics) {
            return Err(AcctestError::Configuration {
                address,
                message: error_summary(&diagnostics),
            });
        }

        let prior = self.state.get(&address).map(|r| r.value.clone());
        let plan = plan_resource_change(&schema.block, prior.as_ref(), &config);
        if has_errors(&plan.diagnostics) {
            return Err(AcctestError::Configuration {
                address,
                message: error_summary(&plan.diagnostics),
            });
        }
        Ok(((resource, schema), config, plan))
    }

    async fn apply_resource(
        &mut self,
        ctx: &Context,
        block: &ResourceBlock,
        variables: &HashMap<String, Dynamic>,
    ) -> Result<(), AcctestError> {
        let address = block.address();
        let ((resource, schema), config, plan) = self.evaluate_and_plan(ctx, block, variables).await?;
        debug!(%address, action = %plan.action, "planned change");

        match plan.action {
            ChangeAction::NoOp => Ok(()),
            ChangeAction::Create => {
                self.create(ctx, &resource, &schema, block, plan.planned_state, config)
                    .await
            }
            ChangeAction::Replace => {
                let forced: Vec<String> = plan.requires_replace.iter().map(|p| p.to_string()).collect();
                info!(%address, forced_by = %forced.join(", "), "replacing resource");
                self.destroy(ctx, &address).await?;
                self.create(ctx, &resource, &schema, block, plan.planned_state, config)
                    .await
            }
            ChangeAction::Update => {
                info!(%address, "updating resource");
                let prior_state = self
                    .state
                    .get(&address)
                    .map(|r| r.value.clone())
                    .ok_or_else(|| AcctestError::ResourceNotInState(address.clone()))?;
                let response = resource
                    .update(
                        ctx.clone(),
                        UpdateResourceRequest {
                            type_name: block.resource_type.clone(),
                            prior_state,
                            planned_state: plan.planned_state,
                            config,
                        },
                    )
                    .await;
                if has_errors(&response.diagnostics) {
                    return Err(AcctestError::Apply {
                        address,
                        action: "update".to_string(),
                        message: error_summary(&response.diagnostics),
                    });
                }
                self.record(block, &schema, response.new_state);
                Ok(())
            }
        }
    }

    async fn create(
        &mut self,
        ctx: &Context,
        resource: &Arc<dyn ResourceWithConfigure>,
        schema: &Schema,
        block: &ResourceBlock,
        planned_state: DynamicValue,
        config: DynamicValue,
    ) -> Result<(), AcctestError> {
        let address = block.address();
        info!(%address, "creating resource");
        let response = resource
            .create(
                ctx.clone(),
                CreateResourceRequest {
                    type_name: block.resource_type.clone(),
                    planned_state,
                    config,
                },
            )
            .await;

        if has_errors(&response.diagnostics) {
            // A partially created object still has to be torn down
            let has_id = response
                .new_state
                .get_string(&AttributePath::new("id"))
                .map(|id| !id.is_empty())
                .unwrap_or(false);
            if has_id {
                self.record(block, schema, response.new_state);
            }
            return Err(AcctestError::Apply {
                address,
                action: "create".to_string(),
                message: error_summary(&response.diagnostics),
            });
        }

        self.record(block, schema, response.new_state);
        Ok(())
    }

    fn record(&mut self, block: &ResourceBlock, schema: &Schema, value: DynamicValue) {
        let state = ResourceState::new(&block.resource_type, &block.name, value, &schema.block);
        let address = state.address();
        self.state.insert(state);
        if !self.created.contains(&address) {
            self.created.push(address);
        }
    }

    fn forget(&mut self, address: &str) {
        self.state.remove(address);
        self.created.retain(|a| a != address);
    }

    async fn destroy(&mut self, ctx: &Context, address: &str) -> Result<(), AcctestError> {
        let Some(prior_state) = self.state.get(address).map(|r| r.value.clone()) else {
            self.forget(address);
            return Ok(());
        };
        let (type_name, _) = split_address(address);
        let (resource, _) = self.instance(ctx, type_name).await?;

        info!(%address, "destroying resource");
        let response = resource
            .delete(
                ctx.clone(),
                DeleteResourceRequest {
                    type_name: type_name.to_string(),
                    prior_state,
                },
            )
            .await;
        if has_errors(&response.diagnostics) {
            return Err(AcctestError::Apply {
                address: address.to_string(),
                action: "destroy".to_string(),
                message: error_summary(&response.diagnostics),
            });
        }
        self.forget(address);
        Ok(())
    }

    async fn destroy_all(&mut self, ctx: &Context) -> Result<(), AcctestError> {
        let mut failures = Vec::new();
        for address in self.created.clone().into_iter().rev() {
            if let Err(e) = self.destroy(ctx, &address).await {
                failures.push(e.to_string());
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(AcctestError::Destroy(failures.join("; ")))
        }
    }

    /// Read every resource back; objects that vanished leave state
    async fn refresh(&mut self, ctx: &Context) -> Result<(), AcctestError> {
        for address in self.created.clone() {
            let Some(current) = self.state.get(&address).cloned() else {
                continue;
            };
            let (resource, schema) = self.instance(ctx, &current.resource_type).await?;
            let response = resource
                .read(
                    ctx.clone(),
                    ReadResourceRequest {
                        type_name: current.resource_type.clone(),
                        current_state: current.value.clone(),
                    },
                )
                .await;
            if has_errors(&response.diagnostics) {
                return Err(AcctestError::Refresh {
                    address,
                    message: error_summary(&response.diagnostics),
                });
            }
            match response.new_state {
                Some(value) => {
                    self.state.insert(ResourceState::new(
                        &current.resource_type,
                        &current.name,
                        value,
                        &schema.block,
                    ));
                }
                None => {
                    warn!(%address, "resource no longer exists, removing from state");
                    self.forget(&address);
                }
            }
        }
        Ok(())
    }

    /// First resource whose follow-up plan is not a no-op
    async fn pending_change(
        &mut self,
        ctx: &Context,
        config: &Config,
        variables: &HashMap<String, Dynamic>,
    ) -> Result<Option<(String, ResourcePlan)>, AcctestError> {
        for block in dependency_order(config)? {
            let (_, _, plan) = self.evaluate_and_plan(ctx, block, variables).await?;
            if plan.has_changes() {
                return Ok(Some((block.address(), plan)));
            }
        }
        Ok(None)
    }

    fn plan_detail(&self, address: &str, plan: &ResourcePlan) -> String {
        let mut lines = Vec::new();
        if !plan.requires_replace.is_empty() {
            let forced: Vec<String> = plan.requires_replace.iter().map(|p| p.to_string()).collect();
            lines.push(format!("  forces replacement: {}", forced.join(", ")));
        }
        if let Some(prior) = self.state.get(address) {
            if let Some((_, schema)) = self.instances.get(&prior.resource_type) {
                let planned = ResourceState::new(
                    &prior.resource_type,
                    &prior.name,
                    plan.planned_state.clone(),
                    &schema.block,
                );
                lines.extend(attribute_diff(&prior.attributes, &planned.attributes, &[]));
            }
        }
        if lines.is_empty() {
            String::new()
        } else {
            format!(":\n{}", lines.join("\n"))
        }
    }

    async fn import_step(&mut self, ctx: &Context, step: &TestStep) -> Result<(), AcctestError> {
        let address = step.resource_name.clone().ok_or_else(|| AcctestError::Configuration {
            address: String::new(),
            message: "import step requires a resource name".to_string(),
        })?;
        let (type_name, name) = split_address(&address);
        let (resource, schema) = self.instance(ctx, type_name).await?;

        let id = match &step.import_state_id {
            Some(id) => id.clone(),
            None => self
                .state
                .get(&address)
                .map(|r| r.id.clone())
                .ok_or_else(|| AcctestError::ResourceNotInState(address.clone()))?,
        };
        info!(%address, %id, "importing resource");

        let importer = resource
            .import_support()
            .ok_or_else(|| AcctestError::ImportNotSupported(type_name.to_string()))?;
        let imported = importer
            .import_state(
                ctx.clone(),
                ImportResourceStateRequest {
                    type_name: type_name.to_string(),
                    id: id.clone(),
                },
            )
            .await;
        if has_errors(&imported.diagnostics) {
            return Err(AcctestError::Import {
                address,
                message: error_summary(&imported.diagnostics),
            });
        }
        let Some(imported) = imported.imported_resources.into_iter().next() else {
            return Err(AcctestError::Import {
                address,
                message: format!("no resources were imported for ID {}", id),
            });
        };

        let read = resource
            .read(
                ctx.clone(),
                ReadResourceRequest {
                    type_name: type_name.to_string(),
                    current_state: imported.state,
                },
            )
            .await;
        if has_errors(&read.diagnostics) {
            return Err(AcctestError::Import {
                address,
                message: error_summary(&read.diagnostics),
            });
        }
        let Some(value) = read.new_state else {
            return Err(AcctestError::Import {
                address,
                message: format!("cannot import non-existent remote object {}", id),
            });
        };
        let imported = ResourceState::new(type_name, name, value, &schema.block);

        if step.import_state_verify {
            let recorded = self
                .state
                .get(&address)
                .ok_or_else(|| AcctestError::ResourceNotInState(address.clone()))?;
            let diff = attribute_diff(
                &recorded.attributes,
                &imported.attributes,
                &step.import_state_verify_ignore,
            );
            if !diff.is_empty() {
                return Err(AcctestError::ImportStateVerify {
                    address,
                    diff: diff.join("\n"),
                });
            }
        }

        if let Some(check) = &step.check {
            let mut imported_state = TestState::default();
            imported_state.insert(imported);
            check.check(&imported_state).await?;
        }
        Ok(())
    }
}
