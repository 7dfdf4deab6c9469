//! Import helpers for simplifying resource import implementations

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, DynamicValue};

/// Sets the import ID to a specific attribute in state
///
/// This is useful for simple resources where the import ID maps directly to
/// a single attribute in the resource state; read fills in the rest.
///
/// Example: ID "fsvol-0123456789abcdef0" -> state.id = "fsvol-0123456789abcdef0"
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    if request.id.is_empty() {
        response.diagnostics.push(
            Diagnostic::error(
                "Missing import ID",
                format!("An ID is required to import {}", request.type_name),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    let mut state = DynamicValue::empty_object();
    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!(
                    "Could not set attribute '{}' to value '{}'",
                    attr_path, request.id
                ),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(id: &str) -> ImportResourceStateResponse {
        let request = ImportResourceStateRequest {
            type_name: "aws_fsx_openzfs_volume".to_string(),
            id: id.to_string(),
        };
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(
            &Context::new(),
            AttributePath::new("id"),
            &request,
            &mut response,
        );
        response
    }

    #[test]
    fn passthrough_sets_id() {
        let response = run("fsvol-0123456789abcdef0");
        assert!(response.diagnostics.is_empty());
        assert_eq!(response.imported_resources.len(), 1);
        assert_eq!(
            response.imported_resources[0]
                .state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "fsvol-0123456789abcdef0"
        );
    }

    #[test]
    fn passthrough_rejects_empty_id() {
        let response = run("");
        assert!(response.imported_resources.is_empty());
        assert_eq!(response.diagnostics.len(), 1);
    }
}
