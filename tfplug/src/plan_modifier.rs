//! Built-in plan modifiers
//!
//! Plan modifiers run after the framework has computed the proposed value of
//! an attribute or block. They can:
//! - Replace the planned value (e.g. keep prior state for computed values)
//! - Mark the attribute as requiring replacement
//! - Add warnings or errors to the plan

use crate::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse};
use crate::types::{Diagnostic, Dynamic};

/// Marks an attribute as requiring replacement when its value changes
pub struct RequiresReplace;

impl RequiresReplace {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "changing this value forces replacement of the resource".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let state = &request.state_value.value;
        let plan = &request.plan_value.value;
        let requires_replace = state.is_known() && plan.is_known() && !values_equal(state, plan);

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: Vec::new(),
        }
    }
}

/// A plan modifier that uses the prior state value when the planned value is
/// unknown. Keeps identifiers and other stable computed attributes from
/// showing up as "known after apply" on every in-place update.
pub struct UseStateForUnknown;

impl UseStateForUnknown {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "once set, the value of this attribute in state will not change".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let plan_value = if request.plan_value.is_unknown() && !request.state_value.is_null() {
            request.state_value
        } else {
            request.plan_value
        };

        PlanModifierResponse {
            plan_value,
            requires_replace: false,
            diagnostics: Vec::new(),
        }
    }
}

type ReplacePredicate = dyn Fn(&PlanModifierRequest) -> bool + Send + Sync;

/// Requires replacement when the predicate holds for the proposed change
pub struct RequiresReplaceIf {
    predicate: Box<ReplacePredicate>,
    description: String,
}

impl RequiresReplaceIf {
    pub fn create<F>(predicate: F, description: impl Into<String>) -> Box<dyn PlanModifier>
    where
        F: Fn(&PlanModifierRequest) -> bool + Send + Sync + 'static,
    {
        Box::new(Self {
            predicate: Box::new(predicate),
            description: description.into(),
        })
    }
}

impl PlanModifier for RequiresReplaceIf {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let mut diagnostics = Vec::new();
        let requires_replace = (self.predicate)(&request);

        if requires_replace {
            diagnostics.push(
                Diagnostic::warning(
                    format!("Attribute '{}' requires resource replacement", request.path),
                    self.description.clone(),
                )
                .with_attribute(request.path.clone()),
            );
        }

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics,
        }
    }
}

/// Compare two values the way planning does: null equals an empty
/// collection, numbers compare within epsilon
pub fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (a, b) if a.is_null_or_empty() && b.is_null_or_empty() => true,
        (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::String(a), Dynamic::String(b)) => a == b,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            let keys_a = a.iter().filter(|(_, v)| !v.is_null()).count();
            let keys_b = b.iter().filter(|(_, v)| !v.is_null()).count();
            keys_a == keys_b
                && a.iter().all(|(k, v)| match b.get(k) {
                    Some(v2) => values_equal(v, v2),
                    None => v.is_null(),
                })
        }
        (Dynamic::Unknown, Dynamic::Unknown) => true,
        _ => false,
    }
}
