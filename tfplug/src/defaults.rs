//! Default value providers for attributes
//!
//! Defaults are evaluated during planning when an attribute is absent from
//! configuration. They only run when the value is null, never when it is
//! unknown.
//!
//! ```no_run
//! use tfplug::schema::{AttributeBuilder, AttributeType};
//! use tfplug::defaults::{StaticDefault, EnvDefault};
//!
//! let compression = AttributeBuilder::new("data_compression_type", AttributeType::String)
//!     .optional()
//!     .default(StaticDefault::string("NONE"))
//!     .build();
//!
//! let region = AttributeBuilder::new("region", AttributeType::String)
//!     .optional()
//!     .default(EnvDefault::create("AWS_DEFAULT_REGION", "us-east-1"))
//!     .build();
//! ```

use crate::schema::{Default, DefaultRequest, DefaultResponse};
use crate::types::{Dynamic, DynamicValue};
use std::env;

/// StaticDefault provides a static default value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    pub fn create(value: Dynamic) -> Box<dyn Default> {
        Box::new(Self { value })
    }

    pub fn string(value: &str) -> Box<dyn Default> {
        Self::create(Dynamic::String(value.to_string()))
    }

    pub fn number(value: f64) -> Box<dyn Default> {
        Self::create(Dynamic::Number(value))
    }

    pub fn bool(value: bool) -> Box<dyn Default> {
        Self::create(Dynamic::Bool(value))
    }
}

impl Default for StaticDefault {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: DynamicValue::new(self.value.clone()),
        }
    }
}

/// EnvDefault reads the default value from the first set environment
/// variable, falling back to a fixed value
pub struct EnvDefault {
    env_vars: Vec<String>,
    fallback: Option<String>,
}

impl EnvDefault {
    pub fn create(env_var: &str, fallback: &str) -> Box<dyn Default> {
        Box::new(Self {
            env_vars: vec![env_var.to_string()],
            fallback: Some(fallback.to_string()),
        })
    }

    /// Create an environment variable default without a fallback
    pub fn create_required(env_var: &str) -> Box<dyn Default> {
        Self::any_of(&[env_var])
    }

    /// Try several variables in order, null when none is set
    pub fn any_of(env_vars: &[&str]) -> Box<dyn Default> {
        Box::new(Self {
            env_vars: env_vars.iter().map(|v| v.to_string()).collect(),
            fallback: None,
        })
    }
}

impl Default for EnvDefault {
    fn description(&self) -> String {
        let vars = self.env_vars.join(", ");
        match &self.fallback {
            Some(fallback) => format!(
                "default from environment variable {} (fallback: {})",
                vars, fallback
            ),
            None => format!("default from environment variable {}", vars),
        }
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        let value = self
            .env_vars
            .iter()
            .find_map(|var| env::var(var).ok().filter(|v| !v.is_empty()))
            .or_else(|| self.fallback.clone())
            .map(Dynamic::String)
            .unwrap_or(Dynamic::Null);

        DefaultResponse {
            value: DynamicValue::new(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributePath;
    use serial_test::serial;

    fn request() -> DefaultRequest {
        DefaultRequest {
            path: AttributePath::new("test"),
        }
    }

    #[test]
    fn static_default_returns_value() {
        let default = StaticDefault::number(128.0);
        assert_eq!(
            default.default_value(request()).value.value,
            Dynamic::Number(128.0)
        );
        assert!(default.description().contains("128"));
    }

    #[test]
    #[serial]
    fn env_default_prefers_environment() {
        env::set_var("TFPLUG_TEST_REGION", "eu-west-1");
        let default = EnvDefault::create("TFPLUG_TEST_REGION", "us-east-1");
        assert_eq!(
            default.default_value(request()).value.value,
            Dynamic::from("eu-west-1")
        );
        env::remove_var("TFPLUG_TEST_REGION");
    }

    #[test]
    #[serial]
    fn env_default_uses_fallback_then_null() {
        env::remove_var("TFPLUG_TEST_MISSING");
        let default = EnvDefault::create("TFPLUG_TEST_MISSING", "us-east-1");
        assert_eq!(
            default.default_value(request()).value.value,
            Dynamic::from("us-east-1")
        );

        let default = EnvDefault::any_of(&["TFPLUG_TEST_MISSING"]);
        assert!(default.default_value(request()).value.is_null());
    }

    #[test]
    #[serial]
    fn env_default_checks_variables_in_order() {
        env::remove_var("TFPLUG_TEST_FIRST");
        env::set_var("TFPLUG_TEST_SECOND", "second");
        let default = EnvDefault::any_of(&["TFPLUG_TEST_FIRST", "TFPLUG_TEST_SECOND"]);
        assert_eq!(
            default.default_value(request()).value.value,
            Dynamic::from("second")
        );
        env::remove_var("TFPLUG_TEST_SECOND");
    }
}
