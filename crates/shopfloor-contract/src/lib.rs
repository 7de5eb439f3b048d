//! Declarative operation contracts for the shopfloor gateway.
//!
//! A contract maps operation names to an input schema, an output schema and a
//! trusted query template. This crate loads contracts, casts weakly-typed
//! caller input into the declared field types and validates the result before
//! anything reaches the graph store.

mod cast;
mod error;
mod lint;
mod store;
mod types;
mod validate;

pub use cast::{cast, to_text};
pub use error::{CastError, ContractLoadError, UnknownOperation, ValidationError};
pub use lint::{lint, placeholders, LintReport};
pub use store::ContractStore;
pub use types::{FieldSpec, FieldType, InputSchema, OperationContract, OperationExample, OutputField};
pub use validate::{validate, DomainRules, ValidatedInputs, Validator, DEFAULT_UNITS};

/// Raw caller input: an untyped JSON object.
pub type RawInputs = serde_json::Map<String, serde_json::Value>;
