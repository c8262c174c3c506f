use serde::{Deserialize, Serialize};

/// JSON document describing a row list.
#[derive(Debug, Serialize, Deserialize)]
pub struct RowListFixture {
    pub columns: Vec<ColumnFixture>,
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    pub cycling: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<WarningFixture>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ColumnFixture {
    pub label: String,
    /// Canonical SQL type name, e.g. `"INTEGER"`.
    #[serde(rename = "type")]
    pub sql_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
}

/// Either a bare reason or a reason with its SQL state.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WarningFixture {
    Reason(String),
    Detailed {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sql_state: Option<String>,
    },
}

/// Array cell: base SQL type name plus elements.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArrayFixture {
    pub base: String,
    #[serde(default)]
    pub elements: Vec<serde_json::Value>,
}
