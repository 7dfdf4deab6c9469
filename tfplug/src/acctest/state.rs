//! Recorded resource state seen by checks
//!
//! Besides the structured value, every resource carries the flattened
//! attribute map checks assert against: lists and sets as `key.#` plus
//! `key.N...`, maps as `key.%` plus `key.<k>`. Null and unknown values are
//! omitted.

use crate::schema::{AttributeType, Block};
use crate::types::{AttributePath, Dynamic, DynamicValue};
use std::collections::BTreeMap;

static STRING_TYPE: AttributeType = AttributeType::String;

#[derive(Debug, Clone)]
pub struct ResourceState {
    pub resource_type: String,
    pub name: String,
    /// Remote identity, the `id` attribute
    pub id: String,
    pub attributes: BTreeMap<String, String>,
    pub value: DynamicValue,
}

impl ResourceState {
    pub fn new(resource_type: &str, name: &str, value: DynamicValue, schema: &Block) -> Self {
        let id = value
            .get_string(&AttributePath::new("id"))
            .unwrap_or_default();
        let mut attributes = BTreeMap::new();
        flatten_block(schema, &value.value, "", &mut attributes);
        Self {
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            id,
            attributes,
            value,
        }
    }

    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// State of every resource after a step, keyed by address
#[derive(Debug, Clone, Default)]
pub struct TestState {
    resources: BTreeMap<String, ResourceState>,
}

impl TestState {
    pub fn get(&self, address: &str) -> Option<&ResourceState> {
        self.resources.get(address)
    }

    pub fn insert(&mut self, resource: ResourceState) {
        self.resources.insert(resource.address(), resource);
    }

    pub fn remove(&mut self, address: &str) -> Option<ResourceState> {
        self.resources.remove(address)
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceState> {
        self.resources.values()
    }

    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a ResourceState> + 'a {
        self.resources
            .values()
            .filter(move |r| r.resource_type == resource_type)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// Render a scalar the way state stores it
pub fn scalar_string(value: &Dynamic) -> Option<String> {
    match value {
        Dynamic::String(s) => Some(s.clone()),
        Dynamic::Bool(b) => Some(b.to_string()),
        Dynamic::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
        Dynamic::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn flatten_block(
    block: &Block,
    value: &Dynamic,
    prefix: &str,
    out: &mut BTreeMap<String, String>,
) {
    let Some(map) = value.as_map() else {
        return;
    };

    for attr in &block.attributes {
        if let Some(v) = map.get(&attr.name) {
            flatten_value(&attr.r#type, v, &join(prefix, &attr.name), out);
        }
    }

    for nested in &block.block_types {
        let key = join(prefix, &nested.type_name);
        match map.get(&nested.type_name) {
            Some(Dynamic::List(items)) => {
                out.insert(format!("{}.#", key), items.len().to_string());
                for (i, item) in items.iter().enumerate() {
                    flatten_block(&nested.block, item, &format!("{}.{}", key, i), out);
                }
            }
            Some(single @ Dynamic::Map(_)) => {
                out.insert(format!("{}.#", key), "1".to_string());
                flatten_block(&nested.block, single, &format!("{}.0", key), out);
            }
            _ => {}
        }
    }
}

fn element_type(ty: &AttributeType) -> &AttributeType {
    match ty {
        AttributeType::List(e) | AttributeType::Set(e) | AttributeType::Map(e) => e,
        _ => &STRING_TYPE,
    }
}

fn flatten_value(ty: &AttributeType, value: &Dynamic, key: &str, out: &mut BTreeMap<String, String>) {
    match value {
        Dynamic::Null | Dynamic::Unknown => {}
        Dynamic::List(items) => {
            out.insert(format!("{}.#", key), items.len().to_string());
            let elem = element_type(ty);
            for (i, item) in items.iter().enumerate() {
                flatten_value(elem, item, &format!("{}.{}", key, i), out);
            }
        }
        Dynamic::Map(m) => {
            if let AttributeType::Object(fields) = ty {
                for (name, field_ty) in fields {
                    if let Some(v) = m.get(name) {
                        flatten_value(field_ty, v, &format!("{}.{}", key, name), out);
                    }
                }
                return;
            }
            out.insert(format!("{}.%", key), m.len().to_string());
            let elem = element_type(ty);
            for (k, v) in m {
                flatten_value(elem, v, &format!("{}.{}", key, k), out);
            }
        }
        scalar => {
            if let Some(s) = scalar_string(scalar) {
                out.insert(key.to_string(), s);
            }
        }
    }
}
