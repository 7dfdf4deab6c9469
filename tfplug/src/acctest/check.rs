//! State checks run after each test step
//!
//! A check receives the refreshed state and fails with a message naming the
//! resource and the expected versus actual condition.

use super::error::{AcctestError, AggregateErrors};
use super::state::{ResourceState, TestState};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait StateCheck: Send + Sync {
    async fn check(&self, state: &TestState) -> Result<(), AcctestError>;
}

pub type BoxCheck = Box<dyn StateCheck>;

/// Slot for a value captured in one step and compared in a later one
pub struct Capture<T> {
    inner: Arc<RwLock<Option<T>>>,
}

impl<T> Clone for Capture<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync> Capture<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn set(&self, value: T) {
        *self.inner.write().await = Some(value);
    }

    pub async fn get(&self) -> Option<T> {
        self.inner.read().await.clone()
    }
}

impl<T: Clone + Send + Sync> Default for Capture<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Synchronous check built from a closure
struct FnCheck<F> {
    f: F,
}

#[async_trait]
impl<F> StateCheck for FnCheck<F>
where
    F: Fn(&TestState) -> Result<(), AcctestError> + Send + Sync,
{
    async fn check(&self, state: &TestState) -> Result<(), AcctestError> {
        (self.f)(state)
    }
}

pub fn check_fn<F>(f: F) -> BoxCheck
where
    F: Fn(&TestState) -> Result<(), AcctestError> + Send + Sync + 'static,
{
    Box::new(FnCheck { f })
}

struct Composed {
    checks: Vec<BoxCheck>,
    aggregate: bool,
}

#[async_trait]
impl StateCheck for Composed {
    async fn check(&self, state: &TestState) -> Result<(), AcctestError> {
        let total = self.checks.len();
        let mut errors = Vec::new();
        for (i, check) in self.checks.iter().enumerate() {
            if let Err(e) = check.check(state).await {
                let err = AcctestError::check(format!("Check {}/{} error: {}", i + 1, total, e));
                if !self.aggregate {
                    return Err(err);
                }
                errors.push(err);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AcctestError::Aggregate(AggregateErrors(errors)))
        }
    }
}

/// Run checks in order, stopping at the first failure
pub fn compose(checks: Vec<BoxCheck>) -> BoxCheck {
    Box::new(Composed {
        checks,
        aggregate: false,
    })
}

/// Run every check and report all failures together
pub fn compose_aggregate(checks: Vec<BoxCheck>) -> BoxCheck {
    Box::new(Composed {
        checks,
        aggregate: true,
    })
}

pub(crate) fn resource<'a>(
    state: &'a TestState,
    name: &str,
) -> Result<&'a ResourceState, AcctestError> {
    state
        .get(name)
        .ok_or_else(|| AcctestError::ResourceNotInState(name.to_string()))
}

fn is_count_key(key: &str) -> bool {
    key.ends_with(".#") || key.ends_with(".%")
}

/// The attribute equals `value`. A missing collection count equals "0".
pub fn check_resource_attr(name: &str, key: &str, value: &str) -> BoxCheck {
    let (name, key, value) = (name.to_string(), key.to_string(), value.to_string());
    check_fn(move |state| {
        let rs = resource(state, &name)?;
        match rs.attr(&key) {
            Some(actual) if actual == value => Ok(()),
            None if is_count_key(&key) && value == "0" => Ok(()),
            Some(actual) => Err(AcctestError::check(format!(
                "{}: Attribute '{}' expected \"{}\", got \"{}\"",
                name, key, value, actual
            ))),
            None => Err(AcctestError::check(format!(
                "{}: Attribute '{}' expected \"{}\", got no value",
                name, key, value
            ))),
        }
    })
}

/// The attribute has a non-empty value
pub fn check_resource_attr_set(name: &str, key: &str) -> BoxCheck {
    let (name, key) = (name.to_string(), key.to_string());
    check_fn(move |state| {
        let rs = resource(state, &name)?;
        match rs.attr(&key) {
            Some(v) if !v.is_empty() => Ok(()),
            _ => Err(AcctestError::check(format!(
                "{}: Attribute '{}' expected to be set",
                name, key
            ))),
        }
    })
}

/// The attribute is absent; an empty collection counts as absent
pub fn check_no_resource_attr(name: &str, key: &str) -> BoxCheck {
    let (name, key) = (name.to_string(), key.to_string());
    check_fn(move |state| {
        let rs = resource(state, &name)?;
        match rs.attr(&key) {
            None => Ok(()),
            Some("0") if is_count_key(&key) => Ok(()),
            Some(v) => Err(AcctestError::check(format!(
                "{}: Attribute '{}' found when not expected, value \"{}\"",
                name, key, v
            ))),
        }
    })
}

struct AttrPtrCheck {
    name: String,
    key: String,
    expected: Capture<String>,
}

#[async_trait]
impl StateCheck for AttrPtrCheck {
    async fn check(&self, state: &TestState) -> Result<(), AcctestError> {
        let expected = self.expected.get().await.ok_or_else(|| {
            AcctestError::check(format!(
                "{}: nothing captured to compare '{}' against",
                self.name, self.key
            ))
        })?;
        let rs = resource(state, &self.name)?;
        match rs.attr(&self.key) {
            Some(actual) if actual == expected => Ok(()),
            actual => Err(AcctestError::check(format!(
                "{}: Attribute '{}' expected \"{}\", got \"{}\"",
                self.name,
                self.key,
                expected,
                actual.unwrap_or_default()
            ))),
        }
    }
}

/// The attribute equals a value captured earlier in the same step
pub fn check_resource_attr_ptr(name: &str, key: &str, expected: &Capture<String>) -> BoxCheck {
    Box::new(AttrPtrCheck {
        name: name.to_string(),
        key: key.to_string(),
        expected: expected.clone(),
    })
}

/// Two attributes, possibly on different resources, hold the same value
pub fn check_resource_attr_pair(name1: &str, key1: &str, name2: &str, key2: &str) -> BoxCheck {
    let (name1, key1, name2, key2) = (
        name1.to_string(),
        key1.to_string(),
        name2.to_string(),
        key2.to_string(),
    );
    check_fn(move |state| {
        let first = resource(state, &name1)?.attr(&key1);
        let second = resource(state, &name2)?.attr(&key2);
        if first == second {
            return Ok(());
        }
        Err(AcctestError::check(format!(
            "{}: Attribute '{}' \"{}\" does not match {}: Attribute '{}' \"{}\"",
            name1,
            key1,
            first.unwrap_or_default(),
            name2,
            key2,
            second.unwrap_or_default()
        )))
    })
}

/// The attribute matches the regular expression
pub fn match_resource_attr(name: &str, key: &str, pattern: Regex) -> BoxCheck {
    let (name, key) = (name.to_string(), key.to_string());
    check_fn(move |state| {
        let rs = resource(state, &name)?;
        let actual = rs.attr(&key).ok_or_else(|| {
            AcctestError::check(format!("{}: Attribute '{}' not found", name, key))
        })?;
        if pattern.is_match(actual) {
            Ok(())
        } else {
            Err(AcctestError::check(format!(
                "{}: Attribute '{}' didn't match \"{}\", got \"{}\"",
                name, key, pattern, actual
            )))
        }
    })
}

/// Some element of the set at `path` (written `a.0.b.*`) has every listed
/// nested attribute. Set elements have no stable index, so every element
/// is tried.
pub fn check_type_set_elem_nested_attrs(
    name: &str,
    path: &str,
    values: HashMap<&str, &str>,
) -> BoxCheck {
    let name = name.to_string();
    let path = path.to_string();
    let values: Vec<(String, String)> = values
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    check_fn(move |state| {
        let rs = resource(state, &name)?;
        let prefix = path.strip_suffix(".*").ok_or_else(|| {
            AcctestError::check(format!("{}: set path '{}' must end in .*", name, path))
        })?;
        let count: usize = rs
            .attr(&format!("{}.#", prefix))
            .and_then(|c| c.parse().ok())
            .unwrap_or(0);

        let found = (0..count).any(|i| {
            values.iter().all(|(k, v)| {
                let key = format!("{}.{}.{}", prefix, i, k);
                match rs.attr(&key) {
                    Some(actual) => actual == v,
                    None => is_count_key(&key) && v == "0",
                }
            })
        });
        if found {
            Ok(())
        } else {
            let mut wanted: Vec<String> = values.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            wanted.sort();
            Err(AcctestError::check(format!(
                "{}: no TypeSet element in \"{}\", with nested attrs {{{}}}",
                name,
                path,
                wanted.join(", ")
            )))
        }
    })
}

struct CaptureIdCheck {
    name: String,
    capture: Capture<String>,
}

#[async_trait]
impl StateCheck for CaptureIdCheck {
    async fn check(&self, state: &TestState) -> Result<(), AcctestError> {
        let rs = resource(state, &self.name)?;
        self.capture.set(rs.id.clone()).await;
        Ok(())
    }
}

/// Record the resource's identity for later checks
pub fn capture_resource_id(name: &str, capture: &Capture<String>) -> BoxCheck {
    Box::new(CaptureIdCheck {
        name: name.to_string(),
        capture: capture.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, SchemaBuilder};
    use crate::types::{Dynamic, DynamicValue};

    fn state() -> TestState {
        let schema = SchemaBuilder::new()
            .attribute(AttributeBuilder::new("id", AttributeType::String).computed().build())
            .attribute(AttributeBuilder::new("name", AttributeType::String).required().build())
            .attribute(
                AttributeBuilder::new("parent_volume_id", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::Map(Box::new(AttributeType::String)))
                    .optional()
                    .build(),
            )
            .block(
                NestedBlockBuilder::set("rules")
                    .attribute(AttributeBuilder::new("clients", AttributeType::String).required().build())
                    .attribute(
                        AttributeBuilder::new("options", AttributeType::List(Box::new(AttributeType::String)))
                            .required()
                            .build(),
                    )
                    .build(),
            )
            .build();

        let rule = |clients: &str, options: &[&str]| {
            Dynamic::object([
                ("clients", Dynamic::from(clients)),
                (
                    "options",
                    Dynamic::List(options.iter().map(|o| Dynamic::from(*o)).collect()),
                ),
            ])
        };

        let mut state = TestState::default();
        state.insert(ResourceState::new(
            "vol",
            "parent",
            DynamicValue::new(Dynamic::object([
                ("id", Dynamic::from("fsvol-parent")),
                ("name", Dynamic::from("parent")),
            ])),
            &schema.block,
        ));
        state.insert(ResourceState::new(
            "vol",
            "child",
            DynamicValue::new(Dynamic::object([
                ("id", Dynamic::from("fsvol-child")),
                ("name", Dynamic::from("child")),
                ("parent_volume_id", Dynamic::from("fsvol-parent")),
                (
                    "rules",
                    Dynamic::List(vec![rule("10.0.1.0/24", &["async", "rw"]), rule("*", &["sync", "rw"])]),
                ),
            ])),
            &schema.block,
        ));
        state
    }

    #[tokio::test]
    async fn resource_attr_checks() {
        let state = state();
        assert!(check_resource_attr("vol.child", "name", "child").check(&state).await.is_ok());
        assert!(check_resource_attr("vol.child", "tags.%", "0").check(&state).await.is_ok());

        let err = check_resource_attr("vol.child", "name", "other").check(&state).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "vol.child: Attribute 'name' expected \"other\", got \"child\""
        );

        let err = check_resource_attr("vol.missing", "name", "x").check(&state).await.unwrap_err();
        assert_eq!(err.to_string(), "Not found: vol.missing in state");

        assert!(check_resource_attr_set("vol.child", "parent_volume_id").check(&state).await.is_ok());
        assert!(check_resource_attr_set("vol.parent", "parent_volume_id").check(&state).await.is_err());
        assert!(check_no_resource_attr("vol.parent", "parent_volume_id").check(&state).await.is_ok());
        assert!(check_no_resource_attr("vol.child", "name").check(&state).await.is_err());
    }

    #[tokio::test]
    async fn pair_and_pattern_checks() {
        let state = state();
        assert!(check_resource_attr_pair("vol.child", "parent_volume_id", "vol.parent", "id")
            .check(&state)
            .await
            .is_ok());
        assert!(check_resource_attr_pair("vol.child", "id", "vol.parent", "id")
            .check(&state)
            .await
            .is_err());
        assert!(match_resource_attr("vol.child", "id", Regex::new("^fsvol-").unwrap())
            .check(&state)
            .await
            .is_ok());
        assert!(match_resource_attr("vol.child", "id", Regex::new("^fs-").unwrap())
            .check(&state)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn captured_values_feed_later_checks() {
        let state = state();
        let parent_id = Capture::new();

        assert!(check_resource_attr_ptr("vol.child", "parent_volume_id", &parent_id)
            .check(&state)
            .await
            .is_err());

        capture_resource_id("vol.parent", &parent_id).check(&state).await.unwrap();
        assert_eq!(parent_id.get().await.as_deref(), Some("fsvol-parent"));
        assert!(check_resource_attr_ptr("vol.child", "parent_volume_id", &parent_id)
            .check(&state)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn set_element_search_ignores_order() {
        let state = state();
        let found = check_type_set_elem_nested_attrs(
            "vol.child",
            "rules.*",
            HashMap::from([("clients", "*"), ("options.0", "sync"), ("options.1", "rw")]),
        );
        assert!(found.check(&state).await.is_ok());

        let missing = check_type_set_elem_nested_attrs(
            "vol.child",
            "rules.*",
            HashMap::from([("clients", "*"), ("options.0", "async")]),
        );
        let err = missing.check(&state).await.unwrap_err();
        assert!(err.to_string().contains("no TypeSet element"));
    }

    #[tokio::test]
    async fn compose_stops_and_aggregate_collects() {
        let state = state();
        let failing = || check_resource_attr("vol.child", "name", "nope");

        let err = compose(vec![
            check_resource_attr("vol.child", "name", "child"),
            failing(),
            check_resource_attr("vol.missing", "name", "x"),
        ])
        .check(&state)
        .await
        .unwrap_err();
        assert!(err.to_string().starts_with("Check 2/3 error:"));

        let err = compose_aggregate(vec![failing(), check_resource_attr("vol.missing", "name", "x")])
            .check(&state)
            .await
            .unwrap_err();
        match err {
            AcctestError::Aggregate(all) => assert_eq!(all.0.len(), 2),
            other => panic!("expected aggregate error, got {}", other),
        }
    }
}
