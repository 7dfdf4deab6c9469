//! Test fixture configuration
//!
//! Fixtures are built as typed values instead of format strings, then
//! rendered as canonical HCL for logs and error messages and evaluated
//! directly by the lifecycle driver.

use super::error::AcctestError;
use super::state::TestState;
use crate::schema::{Block, NestingMode};
use crate::types::{AttributePath, Dynamic};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Prefix for every randomly named acceptance test resource
pub const RESOURCE_PREFIX: &str = "tf-acc-test";

/// `<prefix>-<random digits>`, unique per call
pub fn random_with_prefix(prefix: &str) -> String {
    let n = uuid::Uuid::new_v4().as_u128() as u64;
    format!("{}-{}", prefix, n)
}

/// Configuration expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Expr>),
    /// Map literal, keys kept in declaration order
    Map(Vec<(String, Expr)>),
    /// `<address>.<attribute>` of another resource in the same config
    Reference { address: String, attribute: String },
    /// `var.<name>`
    Variable(String),
}

impl Expr {
    pub fn reference(address: &str, attribute: &str) -> Self {
        Expr::Reference {
            address: address.to_string(),
            attribute: attribute.to_string(),
        }
    }

    pub fn var(name: &str) -> Self {
        Expr::Variable(name.to_string())
    }

    pub fn strings(values: &[&str]) -> Self {
        Expr::List(values.iter().map(|v| Expr::from(*v)).collect())
    }

    pub fn map<K: Into<String>, V: Into<Expr>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Expr::Map(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    fn is_multiline(&self) -> bool {
        matches!(self, Expr::Map(pairs) if !pairs.is_empty())
    }

    fn collect_references(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Reference { address, .. } => {
                out.insert(address.clone());
            }
            Expr::List(items) => items.iter().for_each(|i| i.collect_references(out)),
            Expr::Map(pairs) => pairs.iter().for_each(|(_, v)| v.collect_references(out)),
            _ => {}
        }
    }

    /// Resolve to a value. References must point at resources that are
    /// already in `state`.
    pub fn evaluate(
        &self,
        variables: &HashMap<String, Dynamic>,
        state: &TestState,
    ) -> Result<Dynamic, AcctestError> {
        Ok(match self {
            Expr::Null => Dynamic::Null,
            Expr::Bool(b) => Dynamic::Bool(*b),
            Expr::Number(n) => Dynamic::Number(*n),
            Expr::String(s) => Dynamic::String(s.clone()),
            Expr::List(items) => Dynamic::List(
                items
                    .iter()
                    .map(|i| i.evaluate(variables, state))
                    .collect::<Result<_, _>>()?,
            ),
            Expr::Map(pairs) => Dynamic::Map(
                pairs
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.evaluate(variables, state)?)))
                    .collect::<Result<_, AcctestError>>()?,
            ),
            Expr::Variable(name) => variables
                .get(name)
                .cloned()
                .ok_or_else(|| AcctestError::UndefinedVariable(name.clone()))?,
            Expr::Reference { address, attribute } => {
                let resource = state
                    .get(address)
                    .ok_or_else(|| AcctestError::UnresolvedReference(self.to_string()))?;
                resource
                    .value
                    .get(&AttributePath::new(attribute))
                    .filter(|v| v.is_known())
                    .cloned()
                    .ok_or_else(|| AcctestError::UnresolvedReference(self.to_string()))?
            }
        })
    }

    fn render(&self, out: &mut String, indent: usize) {
        match self {
            Expr::Null => out.push_str("null"),
            Expr::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Expr::Number(n) => out.push_str(&format_number(*n)),
            Expr::String(s) => out.push_str(&quote(s)),
            Expr::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.render(out, indent);
                }
                out.push(']');
            }
            Expr::Map(pairs) if pairs.is_empty() => out.push_str("{}"),
            Expr::Map(pairs) => {
                out.push_str("{\n");
                let width = pairs.iter().map(|(k, _)| quote(k).len()).max().unwrap_or(0);
                for (k, v) in pairs {
                    push_indent(out, indent + 1);
                    out.push_str(&format!("{:<width$} = ", quote(k), width = width));
                    v.render(out, indent + 1);
                    out.push('\n');
                }
                push_indent(out, indent);
                out.push('}');
            }
            Expr::Reference { address, attribute } => {
                out.push_str(&format!("{}.{}", address, attribute))
            }
            Expr::Variable(name) => out.push_str(&format!("var.{}", name)),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(&mut out, 0);
        f.write_str(&out)
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Expr::String(value.to_string())
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Expr::String(value)
    }
}

impl From<&String> for Expr {
    fn from(value: &String) -> Self {
        Expr::String(value.clone())
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Expr::Bool(value)
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::Number(value as f64)
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::Number(value as f64)
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Number(value)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn push_indent(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push_str("  ");
    }
}

#[derive(Debug, Clone, PartialEq)]
enum BodyItem {
    Attribute(String, Expr),
    Block(String, Body),
}

/// Ordered contents of a resource or nested block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body {
    items: Vec<BodyItem>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: &str, value: impl Into<Expr>) -> Self {
        self.items
            .push(BodyItem::Attribute(name.to_string(), value.into()));
        self
    }

    /// Append a nested block; repeat the call for repeated blocks
    pub fn block(mut self, name: &str, body: Body) -> Self {
        self.items.push(BodyItem::Block(name.to_string(), body));
        self
    }

    /// Addresses of every resource this body refers to
    pub fn references(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut BTreeSet<String>) {
        for item in &self.items {
            match item {
                BodyItem::Attribute(_, expr) => expr.collect_references(out),
                BodyItem::Block(_, body) => body.collect_references(out),
            }
        }
    }

    /// Evaluate into an object value. Repeated blocks become a list in
    /// declaration order; single-nested blocks become an object.
    pub fn evaluate(
        &self,
        schema: Option<&Block>,
        variables: &HashMap<String, Dynamic>,
        state: &TestState,
    ) -> Result<Dynamic, AcctestError> {
        let mut out: HashMap<String, Dynamic> = HashMap::new();
        for item in &self.items {
            match item {
                BodyItem::Attribute(name, expr) => {
                    out.insert(name.clone(), expr.evaluate(variables, state)?);
                }
                BodyItem::Block(name, body) => {
                    let nested = schema.and_then(|s| s.block_type(name));
                    let value = body.evaluate(nested.map(|n| &n.block), variables, state)?;
                    if nested.is_some_and(|n| n.nesting == NestingMode::Single) {
                        out.insert(name.clone(), value);
                        continue;
                    }
                    match out
                        .entry(name.clone())
                        .or_insert_with(|| Dynamic::List(Vec::new()))
                    {
                        Dynamic::List(items) => items.push(value),
                        other => *other = Dynamic::List(vec![value]),
                    }
                }
            }
        }
        Ok(Dynamic::Map(out))
    }

    fn render(&self, out: &mut String, indent: usize) {
        let mut i = 0;
        while i < self.items.len() {
            match &self.items[i] {
                BodyItem::Attribute(_, expr) if !expr.is_multiline() => {
                    // Consecutive single-line attributes align their '='
                    let run_end = self.items[i..]
                        .iter()
                        .position(|item| {
                            !matches!(item, BodyItem::Attribute(_, e) if !e.is_multiline())
                        })
                        .map(|p| i + p)
                        .unwrap_or(self.items.len());
                    let width = self.items[i..run_end]
                        .iter()
                        .map(|item| match item {
                            BodyItem::Attribute(name, _) => name.len(),
                            BodyItem::Block(..) => 0,
                        })
                        .max()
                        .unwrap_or(0);
                    for item in &self.items[i..run_end] {
                        if let BodyItem::Attribute(name, expr) = item {
                            push_indent(out, indent);
                            out.push_str(&format!("{:<width$} = ", name, width = width));
                            expr.render(out, indent);
                            out.push('\n');
                        }
                    }
                    i = run_end;
                    continue;
                }
                BodyItem::Attribute(name, expr) => {
                    push_indent(out, indent);
                    out.push_str(&format!("{} = ", name));
                    expr.render(out, indent);
                    out.push('\n');
                }
                BodyItem::Block(name, body) => {
                    push_indent(out, indent);
                    out.push_str(&format!("{} {{\n", name));
                    body.render(out, indent + 1);
                    push_indent(out, indent);
                    out.push_str("}\n");
                }
            }
            i += 1;
        }
    }
}

/// A `resource "<type>" "<name>"` block
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceBlock {
    pub resource_type: String,
    pub name: String,
    pub body: Body,
}

impl ResourceBlock {
    pub fn new(resource_type: &str, name: &str, body: Body) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            body,
        }
    }

    /// `<type>.<name>`, the key used in state and in references
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub default: Option<Expr>,
}

/// A complete configuration: variable declarations and resources
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub variables: Vec<Variable>,
    pub resources: Vec<ResourceBlock>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable(mut self, name: &str) -> Self {
        self.variables.push(Variable {
            name: name.to_string(),
            default: None,
        });
        self
    }

    pub fn variable_with_default(mut self, name: &str, default: impl Into<Expr>) -> Self {
        self.variables.push(Variable {
            name: name.to_string(),
            default: Some(default.into()),
        });
        self
    }

    pub fn resource(mut self, resource_type: &str, name: &str, body: Body) -> Self {
        self.resources
            .push(ResourceBlock::new(resource_type, name, body));
        self
    }

    pub fn find(&self, address: &str) -> Option<&ResourceBlock> {
        self.resources.iter().find(|r| r.address() == address)
    }

    /// Variable values: declared defaults overridden by `supplied`
    pub fn variable_values(&self, supplied: &HashMap<String, Dynamic>) -> HashMap<String, Dynamic> {
        let mut values = HashMap::new();
        for var in &self.variables {
            if let Some(value) = supplied.get(&var.name) {
                values.insert(var.name.clone(), value.clone());
            } else if let Some(default) = &var.default {
                if let Ok(value) = default.evaluate(&HashMap::new(), &TestState::default()) {
                    values.insert(var.name.clone(), value);
                }
            }
        }
        values
    }

    pub fn to_hcl(&self) -> String {
        let mut blocks = Vec::new();
        for var in &self.variables {
            match &var.default {
                None => blocks.push(format!("variable \"{}\" {{}}\n", var.name)),
                Some(default) => {
                    let mut out = format!("variable \"{}\" {{\n", var.name);
                    Body::new().attr("default", default.clone()).render(&mut out, 1);
                    out.push_str("}\n");
                    blocks.push(out);
                }
            }
        }
        for resource in &self.resources {
            let mut out = format!(
                "resource \"{}\" \"{}\" {{\n",
                resource.resource_type, resource.name
            );
            resource.body.render(&mut out, 1);
            out.push_str("}\n");
            blocks.push(out);
        }
        blocks.join("\n")
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hcl())
    }
}

/// Concatenate fixtures; a variable declared by several parts is kept once
pub fn compose(configs: impl IntoIterator<Item = Config>) -> Config {
    let mut out = Config::new();
    for config in configs {
        for var in config.variables {
            if !out.variables.iter().any(|v| v.name == var.name) {
                out.variables.push(var);
            }
        }
        out.resources.extend(config.resources);
    }
    out
}
