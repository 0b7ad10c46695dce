// Employee Records - Data Model
// Shapes produced by the dump parser and read back from the store

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ============================================================================
// PARSED RECORDS
// ============================================================================

/// Employee as built by a single parse pass.
///
/// Fields the dump never provided stay `None` and are left out of the JSON
/// document entirely, so a stored record never carries placeholder values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Always present; `{}` when the dump had no Department section
    #[serde(default)]
    pub department: Department,

    /// In the order the Statement markers appeared
    #[serde(default)]
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Department {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A single dated monetary transaction attributed to an employee
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// `Some(NaN)` when the dump value was not a number (serialized as null)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl Employee {
    /// Identifier as found in the dump, or "" when the dump had none
    pub fn id_or_empty(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }
}

// ============================================================================
// STORED DOCUMENTS
// ============================================================================

/// The `statements` field as it may come back from the document store.
///
/// Documents written by this service always hold a sequence, but the store
/// is shared and a keyed mapping (e.g. `{"0": {...}, "1": {...}}`) is also
/// a legal shape for the same data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatementsField {
    Sequence(Vec<Statement>),
    Keyed(BTreeMap<String, Statement>),
    Other(Value),
}

impl StatementsField {
    /// Flatten into an ordered sequence.
    ///
    /// Keyed entries follow property order: integer-like keys ascending by
    /// value, then every other key. Any other shape flattens to nothing.
    pub fn into_sequence(self) -> Vec<Statement> {
        match self {
            StatementsField::Sequence(statements) => statements,
            StatementsField::Keyed(map) => {
                let mut entries: Vec<(String, Statement)> = map.into_iter().collect();
                entries.sort_by(|(a, _), (b, _)| property_order(a).cmp(&property_order(b)));
                entries.into_iter().map(|(_, statement)| statement).collect()
            }
            StatementsField::Other(_) => Vec::new(),
        }
    }
}

fn property_order(key: &str) -> (u8, u64, &str) {
    match key.parse::<u64>() {
        Ok(index) if index.to_string() == key => (0, index, ""),
        _ => (1, 0, key),
    }
}

/// Employee record as read back from the store.
///
/// Decoding is field by field: a value of the wrong type leaves that one
/// field absent instead of rejecting the document. Only a document that is
/// not a JSON object fails to decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct EmployeeDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub department: Department,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub statements: Option<StatementsField>,
}

impl TryFrom<Value> for EmployeeDocument {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => return Err(format!("expected an employee object, found {}", other)),
        };

        Ok(EmployeeDocument {
            id: lenient_string(fields.get("id")),
            name: lenient_string(fields.get("name")),
            department: fields
                .get("department")
                .map(lenient_department)
                .unwrap_or_default(),
            statements: fields.remove("statements").and_then(lenient_statements),
        })
    }
}

// Scalars keep their text; anything else counts as absent
fn lenient_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_department(value: &Value) -> Department {
    Department {
        id: lenient_string(value.get("id")),
        name: lenient_string(value.get("name")),
    }
}

fn lenient_statement(value: &Value) -> Statement {
    Statement {
        id: lenient_string(value.get("id")),
        amount: value.get("amount").and_then(Value::as_f64),
        date: lenient_string(value.get("date")),
    }
}

fn lenient_statements(value: Value) -> Option<StatementsField> {
    match value {
        Value::Null => None,
        Value::Array(items) => Some(StatementsField::Sequence(
            items.iter().map(lenient_statement).collect(),
        )),
        Value::Object(entries) => Some(StatementsField::Keyed(keyed_statements(&entries))),
        other => Some(StatementsField::Other(other)),
    }
}

fn keyed_statements(entries: &Map<String, Value>) -> BTreeMap<String, Statement> {
    entries
        .iter()
        .map(|(key, value)| (key.clone(), lenient_statement(value)))
        .collect()
}

impl EmployeeDocument {
    /// Normalize into an `Employee`, flattening keyed statements
    pub fn into_employee(self) -> Employee {
        Employee {
            id: self.id,
            name: self.name,
            department: self.department,
            statements: self
                .statements
                .map(StatementsField::into_sequence)
                .unwrap_or_default(),
        }
    }
}

impl From<Employee> for EmployeeDocument {
    fn from(employee: Employee) -> Self {
        EmployeeDocument {
            id: employee.id,
            name: employee.name,
            department: employee.department,
            statements: Some(StatementsField::Sequence(employee.statements)),
        }
    }
}

// ============================================================================
// REWARDS
// ============================================================================

/// Share of the reward pool for one qualifying employee (never persisted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub employee_id: String,
    pub reward: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_are_omitted() {
        let employee = Employee {
            id: Some("1".to_string()),
            ..Default::default()
        };

        let value = serde_json::to_value(&employee).unwrap();
        assert_eq!(value, json!({"id": "1", "department": {}, "statements": []}));
    }

    #[test]
    fn test_nan_amount_serializes_as_null() {
        let statement = Statement {
            id: Some("S1".to_string()),
            amount: Some(f64::NAN),
            date: None,
        };

        let value = serde_json::to_value(&statement).unwrap();
        assert_eq!(value, json!({"id": "S1", "amount": null}));
    }

    #[test]
    fn test_document_with_sequence_statements() {
        let doc: EmployeeDocument = serde_json::from_value(json!({
            "id": "7",
            "statements": [{"id": "S1", "amount": 10.5}]
        }))
        .unwrap();

        assert!(matches!(doc.statements, Some(StatementsField::Sequence(ref s)) if s.len() == 1));
    }

    #[test]
    fn test_keyed_statements_flatten_in_property_order() {
        let doc: EmployeeDocument = serde_json::from_value(json!({
            "id": "7",
            "statements": {
                "10": {"id": "S10"},
                "2": {"id": "S2"},
                "b": {"id": "Sb"},
                "0": {"id": "S0"}
            }
        }))
        .unwrap();

        let employee = doc.into_employee();
        let ids: Vec<&str> = employee
            .statements
            .iter()
            .map(|s| s.id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, vec!["S0", "S2", "S10", "Sb"]);
    }

    #[test]
    fn test_unexpected_statements_shape_is_tolerated() {
        let doc: EmployeeDocument =
            serde_json::from_value(json!({"id": "7", "statements": "n/a"})).unwrap();

        assert!(matches!(doc.statements, Some(StatementsField::Other(_))));
        assert!(doc.into_employee().statements.is_empty());
    }

    #[test]
    fn test_numeric_ids_are_kept_as_text() {
        let doc: EmployeeDocument = serde_json::from_value(json!({
            "id": 5,
            "name": ["not", "a", "name"],
            "department": {"id": 12, "name": "Ops"}
        }))
        .unwrap();

        assert_eq!(doc.id.as_deref(), Some("5"));
        assert_eq!(doc.name, None);
        assert_eq!(doc.department.id.as_deref(), Some("12"));
        assert_eq!(doc.department.name.as_deref(), Some("Ops"));
        assert_eq!(doc.statements, None);
    }

    #[test]
    fn test_odd_statement_element_keeps_the_sequence() {
        let doc: EmployeeDocument = serde_json::from_value(json!({
            "id": "9",
            "statements": [{"id": 3, "amount": 200}, {"id": "S2", "amount": "1"}, null]
        }))
        .unwrap();

        let employee = doc.into_employee();
        assert_eq!(employee.statements.len(), 3);
        assert_eq!(employee.statements[0].id.as_deref(), Some("3"));
        assert_eq!(employee.statements[0].amount, Some(200.0));
        assert_eq!(employee.statements[1].id.as_deref(), Some("S2"));
        assert_eq!(employee.statements[1].amount, None);
        assert_eq!(employee.statements[2], Statement::default());
    }

    #[test]
    fn test_non_object_document_is_rejected() {
        let result: Result<EmployeeDocument, _> = serde_json::from_value(json!("employee"));
        assert!(result.is_err());
    }

    #[test]
    fn test_reward_uses_camel_case() {
        let reward = Reward {
            employee_id: "k1".to_string(),
            reward: 42.0,
        };

        let value = serde_json::to_value(&reward).unwrap();
        assert_eq!(value, json!({"employeeId": "k1", "reward": 42.0}));
    }
}
