use serde::Deserialize;

/// Boolean as sent by clients, either a JSON bool or its textual form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Flag::Bool(value) => Some(*value),
            Flag::Text(text) => parse_flag(text),
        }
    }

    pub fn raw(&self) -> String {
        match self {
            Flag::Bool(value) => value.to_string(),
            Flag::Text(text) => text.clone(),
        }
    }
}

pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
