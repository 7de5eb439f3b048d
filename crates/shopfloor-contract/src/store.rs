use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{ContractLoadError, UnknownOperation};
use crate::types::{ContractDocument, OperationContract};

/// Immutable set of operation contracts, in document order.
#[derive(Debug, Clone, Default)]
pub struct ContractStore {
    operations: Vec<OperationContract>,
    index: HashMap<String, usize>,
}

impl ContractStore {
    /// Load a contract file. `.yaml`/`.yml` files are parsed as YAML, anything
    /// else as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContractLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ContractLoadError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| ContractLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_yaml = matches!(
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.to_ascii_lowercase())
                .as_deref(),
            Some("yaml" | "yml")
        );
        let store = if is_yaml {
            Self::from_yaml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };
        info!(
            path = %path.display(),
            operations = store.len(),
            "loaded operation contract"
        );
        Ok(store)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ContractLoadError> {
        let document: ContractDocument = serde_json::from_str(content)?;
        Self::from_document(document)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ContractLoadError> {
        let document: ContractDocument = serde_yaml::from_str(content)?;
        Self::from_document(document)
    }

    /// Operations come out in the map order of `value`, which is sorted by
    /// name unless `serde_json` preserves insertion order. Parse from text
    /// when document order matters.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ContractLoadError> {
        let document: ContractDocument = serde_json::from_value(value)?;
        Self::from_document(document)
    }

    fn from_document(document: ContractDocument) -> Result<Self, ContractLoadError> {
        let entries = document
            .operations
            .ok_or(ContractLoadError::MissingOperations)?;
        let mut store = Self::default();
        for (name, source) in entries.0 {
            if name.trim().is_empty() {
                return Err(ContractLoadError::InvalidOperation {
                    name,
                    reason: "operation name is empty".into(),
                });
            }
            if source.cypher.trim().is_empty() {
                return Err(ContractLoadError::InvalidOperation {
                    name,
                    reason: "query template is empty".into(),
                });
            }
            debug!(operation = %name, inputs = source.inputs.len(), "registered operation");
            store.index.insert(name.clone(), store.operations.len());
            store.operations.push(source.into_contract(name));
        }
        Ok(store)
    }

    pub fn lookup(&self, name: &str) -> Result<&OperationContract, UnknownOperation> {
        self.index
            .get(name)
            .map(|&idx| &self.operations[idx])
            .ok_or_else(|| UnknownOperation(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.operations.iter().map(|op| op.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationContract> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldType;
    use serde_json::json;

    #[test]
    fn parses_operations_in_document_order() {
        let store = ContractStore::from_json_str(
            r#"{
                "operations": {
                    "zoneTemperatures": {
                        "description": "Latest temperature per zone",
                        "inputs": {"zone": {"type": "string"}},
                        "outputs": [{"name": "zone", "type": "string"}],
                        "cypher": "MATCH (z:Zone {id: $zone}) RETURN z.id AS zone"
                    },
                    "allMachines": {
                        "query": "MATCH (m:Machine) RETURN m.id AS id"
                    }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(store.names(), vec!["zoneTemperatures", "allMachines"]);

        let op = store.lookup("zoneTemperatures").unwrap();
        assert_eq!(op.description.as_deref(), Some("Latest temperature per zone"));
        assert_eq!(
            op.input_schema.get("zone").unwrap().field_type,
            FieldType::String
        );
        assert_eq!(op.output_schema[0].name, "zone");

        let bare = store.lookup("allMachines").unwrap();
        assert!(bare.description.is_none());
        assert!(bare.input_schema.is_empty());
    }

    #[test]
    fn unknown_operation_is_distinguishable() {
        let store = ContractStore::from_value(json!({"operations": {}})).unwrap();
        assert!(store.is_empty());
        assert_eq!(
            store.lookup("noSuchOp").unwrap_err(),
            UnknownOperation("noSuchOp".into())
        );
    }

    #[test]
    fn missing_operations_section_fails() {
        let err = ContractStore::from_value(json!({"name": "shopfloor"})).unwrap_err();
        assert!(matches!(err, ContractLoadError::MissingOperations));
        let err = ContractStore::from_value(json!({"operations": null})).unwrap_err();
        assert!(matches!(err, ContractLoadError::MissingOperations));
    }

    #[test]
    fn malformed_documents_fail() {
        assert!(matches!(
            ContractStore::from_json_str("{not json").unwrap_err(),
            ContractLoadError::Malformed(_)
        ));
        assert!(matches!(
            ContractStore::from_value(json!({"operations": {"op": {"inputs": {}}}})).unwrap_err(),
            ContractLoadError::Malformed(_)
        ));
        assert!(matches!(
            ContractStore::from_value(json!({"operations": ["op"]})).unwrap_err(),
            ContractLoadError::Malformed(_)
        ));
    }

    #[test]
    fn empty_template_is_rejected() {
        let err = ContractStore::from_value(json!({"operations": {"op": {"cypher": "  "}}}))
            .unwrap_err();
        assert!(matches!(
            err,
            ContractLoadError::InvalidOperation { ref name, .. } if name == "op"
        ));
    }

    #[test]
    fn yaml_source_is_supported() {
        let store = ContractStore::from_yaml_str(
            "operations:\n  ping:\n    inputs:\n      n: {type: number, required: true}\n    cypher: RETURN $n AS n\n",
        )
        .unwrap();
        let op = store.lookup("ping").unwrap();
        assert!(op.input_schema.get("n").unwrap().required);
    }
}
