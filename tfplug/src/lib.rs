//! tfplug - Terraform Plugin Framework for Rust
//!
//! Resource and provider traits, schemas and framework planning, plus the
//! `acctest` harness that drives resources through real lifecycles.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod provider;
pub mod resource;

// Helper modules
pub mod defaults;
pub mod import;
pub mod plan_modifier;
pub mod validator;

// Framework implementation
pub mod plan;

// Acceptance testing
pub mod acctest;

// Re-exports for convenience
pub use context::Context;
pub use error::{Result, TfplugError};
pub use import::import_state_passthrough_id;
pub use plan::{plan_resource_change, validate_config, ChangeAction, ResourcePlan};
pub use provider::{Provider, ResourceFactory};
pub use resource::{Resource, ResourceWithConfigure, ResourceWithImportState};
pub use schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, Schema, SchemaBuilder};
pub use types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
