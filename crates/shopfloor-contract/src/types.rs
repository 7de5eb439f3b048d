use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Semantic type of an input field. Unrecognized names fall back to `Opaque`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum FieldType {
    Number,
    String,
    #[default]
    Opaque,
}

impl From<String> for FieldType {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "number" => FieldType::Number,
            "string" => FieldType::String,
            _ => FieldType::Opaque,
        }
    }
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Number => "number",
            FieldType::String => "string",
            FieldType::Opaque => "opaque",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FieldSpec {
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Contract-declared whitelist; takes precedence over configured domain rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSpec {
    pub fn new(field_type: FieldType, required: bool) -> Self {
        Self {
            field_type,
            required,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputField {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OperationExample {
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub outputs: Value,
}

/// Input fields in declaration order.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "Entries<FieldSpec>")]
pub struct InputSchema {
    fields: Vec<(String, FieldSpec)>,
}

impl InputSchema {
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, spec)| spec)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(key, spec)| (key.as_str(), spec))
    }

    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, spec)| spec.required)
            .map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Entries<FieldSpec>> for InputSchema {
    fn from(entries: Entries<FieldSpec>) -> Self {
        Self { fields: entries.0 }
    }
}

impl FromIterator<(String, FieldSpec)> for InputSchema {
    fn from_iter<I: IntoIterator<Item = (String, FieldSpec)>>(iter: I) -> Self {
        let mut fields: Vec<(String, FieldSpec)> = Vec::new();
        for (key, spec) in iter {
            if let Some(slot) = fields.iter_mut().find(|(k, _)| *k == key) {
                slot.1 = spec;
            } else {
                fields.push((key, spec));
            }
        }
        Self { fields }
    }
}

impl Serialize for InputSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, spec) in &self.fields {
            map.serialize_entry(key, spec)?;
        }
        map.end()
    }
}

/// A named, pre-declared query with its typed input and output schema.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationContract {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: InputSchema,
    pub output_schema: Vec<OutputField>,
    pub query_template: String,
    pub examples: Vec<OperationExample>,
}

/// Wire form of one operation inside the contract document.
#[derive(Debug, Deserialize)]
pub(crate) struct OperationSource {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub inputs: InputSchema,
    #[serde(default)]
    pub outputs: Vec<OutputField>,
    #[serde(alias = "query")]
    pub cypher: String,
    #[serde(default)]
    pub examples: Vec<OperationExample>,
}

impl OperationSource {
    pub(crate) fn into_contract(self, name: String) -> OperationContract {
        OperationContract {
            name,
            description: self.description,
            input_schema: self.inputs,
            output_schema: self.outputs,
            query_template: self.cypher,
            examples: self.examples,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContractDocument {
    #[serde(default)]
    pub operations: Option<Entries<OperationSource>>,
}

/// Map entries kept in document order; duplicate keys are rejected.
#[derive(Debug)]
pub struct Entries<T>(pub(crate) Vec<(String, T)>);

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Entries<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = Entries<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out: Vec<(String, T)> = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, T>()? {
                    if out.iter().any(|(existing, _)| *existing == key) {
                        return Err(de::Error::custom(format!("duplicate key '{key}'")));
                    }
                    out.push((key, value));
                }
                Ok(Entries(out))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}
