//! Resource lifecycle verification harness
//!
//! Drives a provider's resources through multi-step scenarios: build a
//! fixture, converge on it, check the recorded state, re-import and compare,
//! and finally destroy everything and confirm the remote objects are gone.

pub mod case;
pub mod check;
pub mod config;
pub mod error;
pub mod finder;
pub mod logging;
pub mod state;

pub use case::{is_acceptance_enabled, TestCase, TestOutcome, TestStep, ACCEPTANCE_ENV};
pub use check::{
    capture_resource_id, check_fn, check_no_resource_attr, check_resource_attr,
    check_resource_attr_pair, check_resource_attr_ptr, check_resource_attr_set,
    check_type_set_elem_nested_attrs, compose, compose_aggregate, match_resource_attr, BoxCheck,
    Capture, StateCheck,
};
pub use config::{
    compose as compose_config, random_with_prefix, Body, Config, Expr, ResourceBlock,
    RESOURCE_PREFIX,
};
pub use error::{AcctestError, AggregateErrors};
pub use finder::{
    check_destroy, check_exists, check_not_recreated, check_recreated, FindError, RemoteFinder,
    RemoteObject,
};
pub use logging::init_logging;
pub use state::{ResourceState, TestState};
