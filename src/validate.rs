//! Adapter over the `validator` crate.
//!
//! Rules are declared on the type with `#[derive(Validate)]` and evaluated by
//! generated code, so there is no engine instance to construct or share.

use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Runs `object`'s declared rules and returns one message per violation.
///
/// Every message reads `<path>: <detail>`, where the path names the offending
/// field (`address.city`, `items[2].sku`) and the detail is the rule's custom
/// `message` or, when none is declared, `failed on the '<code>' rule`. The
/// result is sorted so the same input always yields the same list.
pub fn validate<T: Validate>(object: &T) -> Vec<String> {
    let mut messages = Vec::new();
    if let Err(errors) = object.validate() {
        flatten(&errors, "", &mut messages);
    }
    messages.sort();
    messages
}

fn flatten(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() { field.to_string() } else { format!("{prefix}.{field}") };
        match kind {
            ValidationErrorsKind::Field(violations) => {
                out.extend(violations.iter().map(|v| match &v.message {
                    Some(message) => format!("{path}: {message}"),
                    None => format!("{path}: failed on the '{}' rule", v.code),
                }));
            }
            ValidationErrorsKind::Struct(nested) => flatten(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    flatten(nested, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}
