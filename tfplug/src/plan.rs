//! Framework planning
//!
//! Turns a prior state and a configuration into a planned state the same way
//! for every resource: validation, defaults, computed values, plan modifiers
//! and the create/update/replace decision.

use crate::plan_modifier::values_equal;
use crate::schema::{
    AttributeType, Block, DefaultRequest, NestedBlock, NestingMode, PlanModifier,
    PlanModifierRequest, ValidatorRequest,
};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;
use std::fmt;

static NULL: Dynamic = Dynamic::Null;

/// What applying a plan will do to the remote object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Create,
    Update,
    /// Destroy the existing object, then create a new one
    Replace,
    NoOp,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeAction::Create => "create",
            ChangeAction::Update => "update",
            ChangeAction::Replace => "replace",
            ChangeAction::NoOp => "no-op",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct ResourcePlan {
    pub action: ChangeAction,
    pub planned_state: DynamicValue,
    /// Attributes whose change forced the replacement
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ResourcePlan {
    pub fn has_changes(&self) -> bool {
        self.action != ChangeAction::NoOp
    }
}

fn field<'a>(value: &'a Dynamic, name: &str) -> &'a Dynamic {
    value.as_map().and_then(|m| m.get(name)).unwrap_or(&NULL)
}

fn items(value: &Dynamic) -> &[Dynamic] {
    value.as_list().unwrap_or(&[])
}

fn set_field(target: &mut Dynamic, name: &str, value: Dynamic) {
    if let Dynamic::Map(m) = target {
        m.insert(name.to_string(), value);
    }
}

/// Validate a configuration against a schema block. Unknown values are
/// skipped; they are validated again once known.
pub fn validate_config(block: &Block, config: &DynamicValue) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(block, &config.value, &AttributePath::root(), &mut diagnostics);
    diagnostics
}

fn validate_block(
    block: &Block,
    config: &Dynamic,
    path: &AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Some(map) = config.as_map() {
        let mut names: Vec<&String> = map.keys().collect();
        names.sort();
        for name in names {
            if block.attribute(name).is_none() && block.block_type(name).is_none() {
                diagnostics.push(
                    Diagnostic::error(
                        "Unsupported argument",
                        format!("An argument named \"{}\" is not expected here.", name),
                    )
                    .with_attribute(path.clone().attribute(name)),
                );
            }
        }
    }

    for attr in &block.attributes {
        let attr_path = path.clone().attribute(&attr.name);
        let value = field(config, &attr.name);

        if value.is_null() {
            if attr.required {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing required argument",
                        format!("The argument \"{}\" is required, but no definition was found.", attr.name),
                    )
                    .with_attribute(attr_path),
                );
            }
            continue;
        }

        if attr.computed && !attr.optional && !attr.required {
            diagnostics.push(
                Diagnostic::error(
                    "Invalid configuration",
                    format!("\"{}\" is computed and cannot be set in configuration", attr.name),
                )
                .with_attribute(attr_path),
            );
            continue;
        }

        if !value.is_known() {
            continue;
        }

        if !type_matches(&attr.r#type, value) {
            diagnostics.push(
                Diagnostic::error(
                    "Incorrect attribute value type",
                    format!("\"{}\" does not accept a {} value", attr.name, value.type_name()),
                )
                .with_attribute(attr_path),
            );
            continue;
        }

        for validator in &attr.validators {
            let response = validator.validate(ValidatorRequest {
                config_value: DynamicValue::new(value.clone()),
                path: attr_path.clone(),
            });
            diagnostics.extend(response.diagnostics);
        }
    }

    for nested in &block.block_types {
        let block_path = path.clone().attribute(&nested.type_name);
        let value = field(config, &nested.type_name);
        if value.is_unknown() {
            continue;
        }

        if nested.nesting == NestingMode::Single {
            if value.is_null() {
                if nested.min_items > 0 {
                    diagnostics.push(missing_block(nested, block_path));
                }
            } else {
                validate_block(&nested.block, value, &block_path, diagnostics);
            }
            continue;
        }

        let elements = items(value);
        let count = elements.len() as i64;
        if count < nested.min_items {
            diagnostics.push(if count == 0 {
                missing_block(nested, block_path.clone())
            } else {
                Diagnostic::error(
                    "Insufficient blocks",
                    format!(
                        "At least {} \"{}\" blocks are required.",
                        nested.min_items, nested.type_name
                    ),
                )
                .with_attribute(block_path.clone())
            });
        }
        if nested.max_items > 0 && count > nested.max_items {
            diagnostics.push(
                Diagnostic::error(
                    "Too many blocks",
                    format!(
                        "No more than {} \"{}\" blocks are allowed.",
                        nested.max_items, nested.type_name
                    ),
                )
                .with_attribute(block_path.clone()),
            );
        }

        for (i, element) in elements.iter().enumerate() {
            validate_block(&nested.block, element, &block_path.clone().index(i as i64), diagnostics);
        }
    }
}

fn missing_block(nested: &NestedBlock, path: AttributePath) -> Diagnostic {
    Diagnostic::error(
        "Missing required block",
        format!("A \"{}\" block is required.", nested.type_name),
    )
    .with_attribute(path)
}

fn type_matches(ty: &AttributeType, value: &Dynamic) -> bool {
    match (ty, value) {
        (_, Dynamic::Null) | (_, Dynamic::Unknown) => true,
        (AttributeType::String, Dynamic::String(_)) => true,
        (AttributeType::Number, Dynamic::Number(_)) => true,
        (AttributeType::Bool, Dynamic::Bool(_)) => true,
        (AttributeType::List(elem), Dynamic::List(l)) | (AttributeType::Set(elem), Dynamic::List(l)) => {
            l.iter().all(|v| type_matches(elem, v))
        }
        (AttributeType::Map(elem), Dynamic::Map(m)) => m.values().all(|v| type_matches(elem, v)),
        (AttributeType::Object(fields), Dynamic::Map(m)) => m
            .iter()
            .all(|(k, v)| fields.get(k).is_some_and(|t| type_matches(t, v))),
        _ => false,
    }
}

/// Fill unset attributes that carry a default. Used for provider
/// configuration, where there is no prior state.
pub fn apply_defaults(block: &Block, config: &DynamicValue) -> DynamicValue {
    DynamicValue::new(defaults_for_block(block, &config.value, &AttributePath::root()))
}

fn defaults_for_block(block: &Block, config: &Dynamic, path: &AttributePath) -> Dynamic {
    let mut out = config.as_map().cloned().unwrap_or_default();
    for attr in &block.attributes {
        if !field(config, &attr.name).is_null() {
            continue;
        }
        if let Some(default) = &attr.default {
            let value = default
                .default_value(DefaultRequest {
                    path: path.clone().attribute(&attr.name),
                })
                .value
                .value;
            if !value.is_null() {
                out.insert(attr.name.clone(), value);
            }
        }
    }
    Dynamic::Map(out)
}

/// Plan the change from `prior` (None when the resource does not exist yet)
/// to `config`
pub fn plan_resource_change(
    block: &Block,
    prior: Option<&DynamicValue>,
    config: &DynamicValue,
) -> ResourcePlan {
    let prior = match prior {
        Some(p) if !p.is_null() => &p.value,
        _ => return plan_create(block, config),
    };
    let config = &config.value;

    let proposed = propose_block(block, prior, config, &AttributePath::root(), true);
    if block_equal(block, prior, &proposed) {
        return ResourcePlan {
            action: ChangeAction::NoOp,
            planned_state: DynamicValue::new(prior.clone()),
            requires_replace: Vec::new(),
            diagnostics: Vec::new(),
        };
    }

    let mut planned = proposed;
    mark_computed_unknown(block, config, &mut planned);

    let mut replace = Vec::new();
    let mut diagnostics = Vec::new();
    run_modifiers(
        block,
        config,
        prior,
        &mut planned,
        &AttributePath::root(),
        &mut replace,
        &mut diagnostics,
    );

    if replace.is_empty() {
        return ResourcePlan {
            action: ChangeAction::Update,
            planned_state: DynamicValue::new(planned),
            requires_replace: replace,
            diagnostics,
        };
    }

    let mut created = plan_create(block, &DynamicValue::new(config.clone()));
    created.action = ChangeAction::Replace;
    created.requires_replace = replace;
    diagnostics.append(&mut created.diagnostics);
    created.diagnostics = diagnostics;
    created
}

fn plan_create(block: &Block, config: &DynamicValue) -> ResourcePlan {
    let mut planned = propose_block(block, &NULL, &config.value, &AttributePath::root(), false);
    let mut ignored = Vec::new();
    let mut diagnostics = Vec::new();
    run_modifiers(
        block,
        &config.value,
        &NULL,
        &mut planned,
        &AttributePath::root(),
        &mut ignored,
        &mut diagnostics,
    );
    ResourcePlan {
        action: ChangeAction::Create,
        planned_state: DynamicValue::new(planned),
        requires_replace: Vec::new(),
        diagnostics,
    }
}

/// Merge configuration, defaults and prior computed values into the
/// proposed new state
fn propose_block(
    block: &Block,
    prior: &Dynamic,
    config: &Dynamic,
    path: &AttributePath,
    exists: bool,
) -> Dynamic {
    let mut out = HashMap::new();

    for attr in &block.attributes {
        let cfg = field(config, &attr.name);
        let value = if !cfg.is_null() {
            cfg.clone()
        } else if let Some(default) = &attr.default {
            default
                .default_value(DefaultRequest {
                    path: path.clone().attribute(&attr.name),
                })
                .value
                .value
        } else if attr.computed {
            if exists {
                field(prior, &attr.name).clone()
            } else {
                Dynamic::Unknown
            }
        } else {
            Dynamic::Null
        };
        out.insert(attr.name.clone(), value);
    }

    for nested in &block.block_types {
        let cfg = field(config, &nested.type_name);
        let pri = field(prior, &nested.type_name);
        let nested_path = path.clone().attribute(&nested.type_name);

        let value = if cfg.is_null_or_empty() {
            if nested.computed {
                if exists {
                    pri.clone()
                } else {
                    Dynamic::Unknown
                }
            } else if nested.nesting == NestingMode::Single {
                Dynamic::Null
            } else {
                Dynamic::List(Vec::new())
            }
        } else if cfg.is_unknown() {
            Dynamic::Unknown
        } else {
            match nested.nesting {
                NestingMode::Single => {
                    propose_block(&nested.block, pri, cfg, &nested_path, exists && !pri.is_null())
                }
                NestingMode::List => Dynamic::List(
                    items(cfg)
                        .iter()
                        .enumerate()
                        .map(|(i, c)| {
                            let p = items(pri).get(i).unwrap_or(&NULL);
                            propose_block(
                                &nested.block,
                                p,
                                c,
                                &nested_path.clone().index(i as i64),
                                exists && !p.is_null(),
                            )
                        })
                        .collect(),
                ),
                NestingMode::Set => Dynamic::List(
                    items(cfg)
                        .iter()
                        .enumerate()
                        .map(|(i, c)| {
                            let p = items(pri)
                                .iter()
                                .find(|p| configured_subset_equal(&nested.block, c, p))
                                .unwrap_or(&NULL);
                            propose_block(
                                &nested.block,
                                p,
                                c,
                                &nested_path.clone().index(i as i64),
                                exists && !p.is_null(),
                            )
                        })
                        .collect(),
                ),
            }
        };
        out.insert(nested.type_name.clone(), value);
    }

    Dynamic::Map(out)
}

/// True when every attribute set in `config` has the same value in `prior`
fn configured_subset_equal(block: &Block, config: &Dynamic, prior: &Dynamic) -> bool {
    block.attributes.iter().all(|attr| {
        let cfg = field(config, &attr.name);
        cfg.is_null() || attr_equal(&attr.r#type, field(prior, &attr.name), cfg)
    })
}

fn unordered_equal(a: &[Dynamic], b: &[Dynamic], eq: impl Fn(&Dynamic, &Dynamic) -> bool) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; a.len()];
    b.iter().all(|item| {
        let found = a
            .iter()
            .enumerate()
            .find(|(i, candidate)| !used[*i] && eq(candidate, item))
            .map(|(i, _)| i);
        match found {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

/// Semantic equality of a prior value and a planned value. Unknown planned
/// values never count as a difference.
fn attr_equal(ty: &AttributeType, prior: &Dynamic, planned: &Dynamic) -> bool {
    if !planned.is_known() {
        return true;
    }
    match ty {
        AttributeType::Set(_) => unordered_equal(items(prior), items(planned), values_equal),
        _ => values_equal(prior, planned),
    }
}

fn block_equal(block: &Block, prior: &Dynamic, planned: &Dynamic) -> bool {
    if planned.is_unknown() {
        return true;
    }
    let attrs_equal = block
        .attributes
        .iter()
        .all(|attr| attr_equal(&attr.r#type, field(prior, &attr.name), field(planned, &attr.name)));

    attrs_equal
        && block.block_types.iter().all(|nested| {
            nested_equal(
                nested,
                field(prior, &nested.type_name),
                field(planned, &nested.type_name),
            )
        })
}

fn nested_equal(nested: &NestedBlock, prior: &Dynamic, planned: &Dynamic) -> bool {
    if planned.is_unknown() {
        return true;
    }
    match nested.nesting {
        NestingMode::Single => match (prior.is_null(), planned.is_null()) {
            (true, true) => true,
            (false, false) => block_equal(&nested.block, prior, planned),
            _ => false,
        },
        NestingMode::List => {
            let (a, b) = (items(prior), items(planned));
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(x, y)| block_equal(&nested.block, x, y))
        }
        NestingMode::Set => unordered_equal(items(prior), items(planned), |x, y| {
            block_equal(&nested.block, x, y)
        }),
    }
}

/// Once a resource changes, computed values the configuration does not pin
/// are recomputed by the remote system
fn mark_computed_unknown(block: &Block, config: &Dynamic, planned: &mut Dynamic) {
    for attr in &block.attributes {
        if attr.computed && attr.default.is_none() && field(config, &attr.name).is_null() {
            set_field(planned, &attr.name, Dynamic::Unknown);
        }
    }
    for nested in &block.block_types {
        if nested.computed && field(config, &nested.type_name).is_null_or_empty() {
            set_field(planned, &nested.type_name, Dynamic::Unknown);
        }
    }
}

fn run_modifiers(
    block: &Block,
    config: &Dynamic,
    prior: &Dynamic,
    planned: &mut Dynamic,
    path: &AttributePath,
    replace: &mut Vec<AttributePath>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for attr in &block.attributes {
        if attr.plan_modifiers.is_empty() {
            continue;
        }
        let attr_path = path.clone().attribute(&attr.name);
        let value = apply_modifiers(
            &attr.plan_modifiers,
            field(config, &attr.name),
            field(prior, &attr.name),
            field(planned, &attr.name).clone(),
            &attr_path,
            replace,
            diagnostics,
        );
        set_field(planned, &attr.name, value);
    }

    for nested in &block.block_types {
        let block_path = path.clone().attribute(&nested.type_name);
        let cfg = field(config, &nested.type_name);
        let pri = field(prior, &nested.type_name);

        if !nested.plan_modifiers.is_empty() {
            let value = apply_modifiers(
                &nested.plan_modifiers,
                cfg,
                pri,
                field(planned, &nested.type_name).clone(),
                &block_path,
                replace,
                diagnostics,
            );
            set_field(planned, &nested.type_name, value);
        }

        let Dynamic::Map(planned_map) = &mut *planned else {
            continue;
        };
        let Some(planned_value) = planned_map.get_mut(&nested.type_name) else {
            continue;
        };
        match (nested.nesting, planned_value) {
            (NestingMode::Single, value @ Dynamic::Map(_)) => {
                run_modifiers(&nested.block, cfg, pri, value, &block_path, replace, diagnostics);
            }
            (NestingMode::List, Dynamic::List(planned_items)) => {
                for (i, item) in planned_items.iter_mut().enumerate() {
                    let c = items(cfg).get(i).unwrap_or(&NULL);
                    let p = items(pri).get(i).unwrap_or(&NULL);
                    run_modifiers(
                        &nested.block,
                        c,
                        p,
                        item,
                        &block_path.clone().index(i as i64),
                        replace,
                        diagnostics,
                    );
                }
            }
            _ => {}
        }
    }
}

fn apply_modifiers(
    modifiers: &[Box<dyn PlanModifier>],
    config: &Dynamic,
    prior: &Dynamic,
    planned: Dynamic,
    path: &AttributePath,
    replace: &mut Vec<AttributePath>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Dynamic {
    let mut value = planned;
    for modifier in modifiers {
        let response = modifier.modify(PlanModifierRequest {
            config_value: DynamicValue::new(config.clone()),
            state_value: DynamicValue::new(prior.clone()),
            plan_value: DynamicValue::new(value),
            path: path.clone(),
        });
        value = response.plan_value.value;
        diagnostics.extend(response.diagnostics);
        if response.requires_replace && !replace.contains(path) {
            replace.push(path.clone());
        }
    }
    value
}
