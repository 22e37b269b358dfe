use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::{Parser, Schema};

string_enum! {
    /// How strictly a guardrail is applied at runtime.
    pub enum Enforcement {
        #[default]
        Hard => "hard",
        Soft => "soft",
    }
}

/// A named constraint, declared either agent-wide or on a single skill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guardrail {
    pub name: String,
    pub constraint: String,
    #[serde(default)]
    pub enforcement: Enforcement,
}

impl Guardrail {
    pub fn new(name: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: constraint.into(),
            enforcement: Enforcement::Hard,
        }
    }
}

impl Schema for Guardrail {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            name: p.non_empty_string(obj, "name"),
            constraint: p.required(obj, "constraint"),
            enforcement: p.defaulted(obj, "enforcement", Enforcement::Hard),
        })
    }
}
