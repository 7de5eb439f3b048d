use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::cast::{cast, to_text};
use crate::error::ValidationError;
use crate::types::OperationContract;

/// Measurement units accepted for a `unit` field unless configured otherwise.
pub const DEFAULT_UNITS: &[&str] = &["mm/s", "C", "dB"];

/// Field-name keyed whitelists applied after casting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRules {
    whitelists: BTreeMap<String, BTreeSet<String>>,
}

impl Default for DomainRules {
    fn default() -> Self {
        Self::empty().with_whitelist("unit", DEFAULT_UNITS.iter().copied())
    }
}

impl DomainRules {
    pub fn empty() -> Self {
        Self {
            whitelists: BTreeMap::new(),
        }
    }

    /// Replace the whitelist for `field`.
    pub fn with_whitelist<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelists
            .insert(field.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn allowed_for(&self, field: &str) -> Option<&BTreeSet<String>> {
        self.whitelists.get(field)
    }
}

/// Inputs that passed validation, cast to their declared types.
///
/// Only produced by [`Validator::validate`]; holds schema keys that the caller
/// actually supplied.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ValidatedInputs(Map<String, Value>);

impl ValidatedInputs {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct Validator {
    rules: DomainRules,
}

impl Validator {
    pub fn new(rules: DomainRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &DomainRules {
        &self.rules
    }

    /// Check required fields, cast present fields and apply whitelists.
    ///
    /// Keys that the schema does not declare are dropped. Either every check
    /// passes or an error is returned; there is no partial result.
    pub fn validate(
        &self,
        contract: &OperationContract,
        raw: &Map<String, Value>,
    ) -> Result<ValidatedInputs, ValidationError> {
        let schema = &contract.input_schema;

        let missing: Vec<String> = schema
            .required()
            .filter(|field| !raw.contains_key(*field))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingRequired { fields: missing });
        }

        let mut validated = Map::new();
        for (field, spec) in schema.iter() {
            let Some(value) = raw.get(field) else {
                continue;
            };
            let cast_value =
                cast(value, spec.field_type).map_err(|source| ValidationError::Cast {
                    field: field.to_string(),
                    expected: spec.field_type,
                    source,
                })?;
            validated.insert(field.to_string(), cast_value);
        }

        for (field, spec) in schema.iter() {
            let Some(value) = validated.get(field) else {
                continue;
            };
            let allowed: Option<BTreeSet<String>> = match &spec.allowed {
                Some(declared) => Some(declared.iter().cloned().collect()),
                None => self.rules.allowed_for(field).cloned(),
            };
            let Some(allowed) = allowed else {
                continue;
            };
            let text = to_text(value);
            if !allowed.contains(&text) {
                return Err(ValidationError::NotAllowed {
                    field: field.to_string(),
                    value: text,
                    allowed: allowed.into_iter().collect(),
                });
            }
        }

        Ok(ValidatedInputs(validated))
    }
}

/// Validate with the default domain rules.
pub fn validate(
    contract: &OperationContract,
    raw: &Map<String, Value>,
) -> Result<ValidatedInputs, ValidationError> {
    Validator::default().validate(contract, raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldSpec, FieldType, InputSchema};
    use crate::CastError;
    use serde_json::json;

    fn vibration_contract() -> OperationContract {
        let input_schema: InputSchema = [
            (
                "threshold".to_string(),
                FieldSpec::new(FieldType::Number, true),
            ),
            ("unit".to_string(), FieldSpec::new(FieldType::String, true)),
            ("limit".to_string(), FieldSpec::new(FieldType::Number, false)),
        ]
        .into_iter()
        .collect();
        OperationContract {
            name: "highVibrationMachines".into(),
            description: Some("Machines above a vibration threshold".into()),
            input_schema,
            output_schema: Vec::new(),
            query_template: "MATCH (m:Machine) WHERE m.vibration > $threshold RETURN m".into(),
            examples: Vec::new(),
        }
    }

    fn raw(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn casts_present_fields_and_skips_absent_optionals() {
        let out = validate(
            &vibration_contract(),
            &raw(json!({"threshold": "7.5", "unit": "mm/s"})),
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            json!({"threshold": 7.5, "unit": "mm/s"})
        );
        assert!(out.get("limit").is_none());
    }

    #[test]
    fn reports_every_missing_required_field() {
        let err = validate(&vibration_contract(), &raw(json!({"limit": 3}))).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingRequired {
                fields: vec!["threshold".into(), "unit".into()]
            }
        );
    }

    #[test]
    fn drops_unknown_keys() {
        let out = validate(
            &vibration_contract(),
            &raw(json!({"threshold": 7.5, "unit": "C", "extra": "x"})),
        )
        .unwrap();
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["threshold", "unit"]);
    }

    #[test]
    fn cast_failure_names_field_and_type() {
        let err = validate(
            &vibration_contract(),
            &raw(json!({"threshold": "abc", "unit": "dB"})),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::Cast {
                field: "threshold".into(),
                expected: FieldType::Number,
                source: CastError {
                    expected: FieldType::Number,
                    value: "abc".into()
                },
            }
        );
        assert_eq!(err.field(), Some("threshold"));
    }

    #[test]
    fn unit_whitelist_applies() {
        let contract = vibration_contract();
        let err = validate(&contract, &raw(json!({"threshold": 1, "unit": "psi"}))).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::NotAllowed { ref field, ref value, .. } if field == "unit" && value == "psi"
        ));
        assert!(validate(&contract, &raw(json!({"threshold": 1, "unit": "mm/s"}))).is_ok());
    }

    #[test]
    fn declared_allowed_set_overrides_domain_rules() {
        let mut contract = vibration_contract();
        let input_schema: InputSchema = [(
            "unit".to_string(),
            FieldSpec {
                allowed: Some(vec!["psi".into()]),
                ..FieldSpec::new(FieldType::String, false)
            },
        )]
        .into_iter()
        .collect();
        contract.input_schema = input_schema;
        assert!(validate(&contract, &raw(json!({"unit": "psi"}))).is_ok());
        assert!(validate(&contract, &raw(json!({"unit": "mm/s"}))).is_err());
    }

    #[test]
    fn custom_rules_replace_defaults() {
        let validator = Validator::new(DomainRules::empty().with_whitelist("unit", ["bar"]));
        let contract = vibration_contract();
        assert!(validator
            .validate(&contract, &raw(json!({"threshold": 2, "unit": "bar"})))
            .is_ok());
        assert!(validator
            .validate(&contract, &raw(json!({"threshold": 2, "unit": "dB"})))
            .is_err());
    }

    #[test]
    fn rules_only_touch_declared_fields() {
        let mut contract = vibration_contract();
        contract.input_schema = InputSchema::default();
        let out = validate(&contract, &raw(json!({"unit": "psi"}))).unwrap();
        assert!(out.is_empty());
    }
}
