use std::path::PathBuf;

use serde_json::Value;

use crate::types::FieldType;

const MAX_ECHO_CHARS: usize = 80;

/// Failure to turn a contract source into a [`crate::ContractStore`].
#[derive(thiserror::Error, Debug)]
pub enum ContractLoadError {
    #[error("contract source not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read contract {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed contract: {0}")]
    Malformed(String),
    #[error("contract has no top-level 'operations' section")]
    MissingOperations,
    #[error("operation '{name}' is invalid: {reason}")]
    InvalidOperation { name: String, reason: String },
}

impl From<serde_json::Error> for ContractLoadError {
    fn from(err: serde_json::Error) -> Self {
        ContractLoadError::Malformed(err.to_string())
    }
}

impl From<serde_yaml::Error> for ContractLoadError {
    fn from(err: serde_yaml::Error) -> Self {
        ContractLoadError::Malformed(err.to_string())
    }
}

/// Lookup miss for an operation name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("operation '{0}' not found")]
pub struct UnknownOperation(pub String);

/// A raw value that cannot be represented as the declared field type.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot cast value '{value}' to type '{expected}'")]
pub struct CastError {
    pub expected: FieldType,
    pub value: String,
}

impl CastError {
    pub(crate) fn new(expected: FieldType, raw: &Value) -> Self {
        let text = crate::cast::to_text(raw);
        let value = if text.chars().count() > MAX_ECHO_CHARS {
            let mut cut: String = text.chars().take(MAX_ECHO_CHARS).collect();
            cut.push_str("...");
            cut
        } else {
            text
        };
        Self { expected, value }
    }
}

/// Rejection of a call's inputs. Nothing is executed when this is returned.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("missing required input{}: {}", plural(.fields), quoted(.fields))]
    MissingRequired { fields: Vec<String> },
    #[error("invalid input '{field}': {source}")]
    Cast {
        field: String,
        expected: FieldType,
        #[source]
        source: CastError,
    },
    #[error("input '{field}' must be one of [{}], got '{value}'", quoted(.allowed))]
    NotAllowed {
        field: String,
        value: String,
        allowed: Vec<String>,
    },
}

impl ValidationError {
    /// The first field the error is about.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::MissingRequired { fields } => fields.first().map(String::as_str),
            ValidationError::Cast { field, .. } | ValidationError::NotAllowed { field, .. } => {
                Some(field.as_str())
            }
        }
    }
}

fn plural(items: &[String]) -> &'static str {
    if items.len() == 1 {
        ""
    } else {
        "s"
    }
}

fn quoted(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("'{item}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_required_message_lists_every_field() {
        let one = ValidationError::MissingRequired {
            fields: vec!["threshold".into()],
        };
        assert_eq!(one.to_string(), "missing required input: 'threshold'");

        let two = ValidationError::MissingRequired {
            fields: vec!["threshold".into(), "unit".into()],
        };
        assert_eq!(
            two.to_string(),
            "missing required inputs: 'threshold', 'unit'"
        );
        assert_eq!(two.field(), Some("threshold"));
    }

    #[test]
    fn cast_error_truncates_long_values() {
        let long = "x".repeat(200);
        let err = CastError::new(FieldType::Number, &json!(long));
        assert!(err.value.ends_with("..."));
        assert_eq!(err.value.chars().count(), MAX_ECHO_CHARS + 3);
    }

    #[test]
    fn not_allowed_names_field_and_choices() {
        let err = ValidationError::NotAllowed {
            field: "unit".into(),
            value: "psi".into(),
            allowed: vec!["C".into(), "dB".into(), "mm/s".into()],
        };
        assert_eq!(
            err.to_string(),
            "input 'unit' must be one of ['C', 'dB', 'mm/s'], got 'psi'"
        );
    }
}
