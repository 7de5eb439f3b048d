use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::types::OperationContract;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("placeholder regex"));

/// Advisory comparison between a query template and its input schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintReport {
    pub operation: String,
    /// Placeholders with no matching schema field; the store will reject these.
    pub unbound: Vec<String>,
    /// Schema fields the template never references.
    pub unused: Vec<String>,
}

impl LintReport {
    pub fn is_clean(&self) -> bool {
        self.unbound.is_empty() && self.unused.is_empty()
    }
}

/// Named `$param` placeholders referenced by a template.
pub fn placeholders(template: &str) -> BTreeSet<String> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn lint(contract: &OperationContract) -> LintReport {
    let referenced = placeholders(&contract.query_template);
    let unbound = referenced
        .iter()
        .filter(|name| !contract.input_schema.contains(name))
        .cloned()
        .collect();
    let unused = contract
        .input_schema
        .iter()
        .map(|(name, _)| name)
        .filter(|name| !referenced.contains(*name))
        .map(str::to_string)
        .collect();
    LintReport {
        operation: contract.name.clone(),
        unbound,
        unused,
    }
}
