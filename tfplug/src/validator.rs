//! Built-in attribute validators
//!
//! Validators only inspect known, non-null values. Null and unknown values
//! are left to the required/optional checks in planning.

use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{Diagnostic, Dynamic};
use regex::Regex;

fn error(request: &ValidatorRequest, summary: String, detail: String) -> Diagnostic {
    Diagnostic::error(summary, detail).with_attribute(request.path.clone())
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl StringLengthValidator {
    pub fn create(min: Option<usize>, max: Option<usize>) -> Box<dyn Validator> {
        Box::new(Self { min, max })
    }

    pub fn between(min: usize, max: usize) -> Box<dyn Validator> {
        Self::create(Some(min), Some(max))
    }
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("string length must be between {} and {}", min, max),
            (Some(min), None) => format!("string length must be at least {}", min),
            (None, Some(max)) => format!("string length must be at most {}", max),
            (None, None) => "any string length".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut response = ValidatorResponse::default();
        let Some(s) = request.config_value.value.as_string() else {
            return response;
        };
        let len = s.chars().count();

        if let Some(min) = self.min {
            if len < min {
                response.diagnostics.push(error(
                    &request,
                    format!("{} must have minimum length of {}", request.path, min),
                    format!("Got length {}", len),
                ));
            }
        }
        if let Some(max) = self.max {
            if len > max {
                response.diagnostics.push(error(
                    &request,
                    format!("{} must have maximum length of {}", request.path, max),
                    format!("Got length {}", len),
                ));
            }
        }
        response
    }
}

pub struct StringPatternValidator {
    pub pattern: Regex,
    pub description: String,
}

impl StringPatternValidator {
    pub fn create(pattern: Regex, description: &str) -> Box<dyn Validator> {
        Box::new(Self {
            pattern,
            description: description.to_string(),
        })
    }
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        format!("string must match {}", self.description)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut response = ValidatorResponse::default();
        if let Some(s) = request.config_value.value.as_string() {
            if !self.pattern.is_match(s) {
                response.diagnostics.push(error(
                    &request,
                    format!("{} must match {}", request.path, self.description),
                    format!("Value '{}' does not match pattern", s),
                ));
            }
        }
        response
    }
}

pub struct StringOneOfValidator {
    pub values: Vec<String>,
}

impl StringOneOfValidator {
    pub fn create(values: &[&str]) -> Box<dyn Validator> {
        Box::new(Self {
            values: values.iter().map(|v| v.to_string()).collect(),
        })
    }
}

impl Validator for StringOneOfValidator {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.values.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut response = ValidatorResponse::default();
        if let Some(s) = request.config_value.value.as_string() {
            if !self.values.iter().any(|v| v == s) {
                response.diagnostics.push(error(
                    &request,
                    format!("{} has an invalid value", request.path),
                    format!("expected one of [{}], got \"{}\"", self.values.join(", "), s),
                ));
            }
        }
        response
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumberRangeValidator {
    pub fn create(min: Option<f64>, max: Option<f64>) -> Box<dyn Validator> {
        Box::new(Self { min, max })
    }

    pub fn at_least(min: f64) -> Box<dyn Validator> {
        Self::create(Some(min), None)
    }
}

impl Validator for NumberRangeValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("number must be between {} and {}", min, max),
            (Some(min), None) => format!("number must be at least {}", min),
            (None, Some(max)) => format!("number must be at most {}", max),
            (None, None) => "any number".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut response = ValidatorResponse::default();
        let Some(n) = request.config_value.value.as_number() else {
            return response;
        };

        if let Some(min) = self.min {
            if n < min {
                response.diagnostics.push(error(
                    &request,
                    format!("{} must be at least {}", request.path, min),
                    format!("Got {}", n),
                ));
            }
        }
        if let Some(max) = self.max {
            if n > max {
                response.diagnostics.push(error(
                    &request,
                    format!("{} must be at most {}", request.path, max),
                    format!("Got {}", n),
                ));
            }
        }
        response
    }
}

pub struct NumberOneOfValidator {
    pub values: Vec<f64>,
}

impl NumberOneOfValidator {
    pub fn create(values: &[f64]) -> Box<dyn Validator> {
        Box::new(Self {
            values: values.to_vec(),
        })
    }
}

impl Validator for NumberOneOfValidator {
    fn description(&self) -> String {
        let values: Vec<String> = self.values.iter().map(|v| v.to_string()).collect();
        format!("number must be one of: {}", values.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut response = ValidatorResponse::default();
        if let Some(n) = request.config_value.value.as_number() {
            if !self.values.iter().any(|v| (v - n).abs() < f64::EPSILON) {
                response.diagnostics.push(error(
                    &request,
                    format!("{} has an invalid value", request.path),
                    self.description(),
                ));
            }
        }
        response
    }
}

pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl ListLengthValidator {
    pub fn create(min: Option<usize>, max: Option<usize>) -> Box<dyn Validator> {
        Box::new(Self { min, max })
    }
}

impl Validator for ListLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("list must have between {} and {} items", min, max),
            (Some(min), None) => format!("list must have at least {} items", min),
            (None, Some(max)) => format!("list must have at most {} items", max),
            (None, None) => "any number of items".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut response = ValidatorResponse::default();
        let Dynamic::List(items) = &request.config_value.value else {
            return response;
        };

        if let Some(min) = self.min {
            if items.len() < min {
                response.diagnostics.push(error(
                    &request,
                    format!("{} must have at least {} items", request.path, min),
                    format!("Got {} items", items.len()),
                ));
            }
        }
        if let Some(max) = self.max {
            if items.len() > max {
                response.diagnostics.push(error(
                    &request,
                    format!("{} must have at most {} items", request.path, max),
                    format!("Got {} items", items.len()),
                ));
            }
        }
        response
    }
}
