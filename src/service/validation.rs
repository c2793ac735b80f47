//! Request validation and coercion from the column definitions.

use crate::config::{ColumnDefinition, DataType, EntitySchema};
use crate::error::AppError;
use crate::sql::Record;
use regex::Regex;
use serde_json::{Number, Value};
use std::collections::HashMap;

pub struct RequestValidator;

impl RequestValidator {
    /// Raw form strings to typed values, in schema order. Empty strings become NULL.
    pub fn coerce_form(schema: &EntitySchema, raw: &HashMap<String, String>) -> Result<Record, AppError> {
        reject_unknown(schema, raw.keys())?;
        let mut out = Record::new();
        for col in &schema.columns {
            if let Some(s) = raw.get(&col.name) {
                out.insert(col.name.clone(), coerce_value(col, &Value::String(s.clone()))?);
            }
        }
        Ok(out)
    }

    /// Full row for INSERT: every editable column, defaults applied, rules checked.
    /// The primary key and admin columns are dropped if supplied.
    pub fn prepare_insert(schema: &EntitySchema, data: &Record) -> Result<Record, AppError> {
        reject_unknown(schema, data.keys())?;
        let mut out = Record::new();
        for col in schema.editable_columns() {
            let value = match data.get(&col.name) {
                Some(v) => coerce_value(col, v)?,
                None => col.default_value.clone().unwrap_or(Value::Null),
            };
            out.insert(col.name.clone(), value);
        }
        Self::check_complete(schema, &out)?;
        Ok(out)
    }

    /// Only the supplied editable columns, coerced and checked. Absent columns stay untouched.
    pub fn prepare_update(schema: &EntitySchema, data: &Record) -> Result<Record, AppError> {
        reject_unknown(schema, data.keys())?;
        let mut out = Record::new();
        for col in schema.editable_columns() {
            if let Some(v) = data.get(&col.name) {
                let value = coerce_value(col, v)?;
                validate_field(col, &value)?;
                out.insert(col.name.clone(), value);
            }
        }
        if out.is_empty() {
            return Err(AppError::Validation(format!("no editable {} columns supplied", schema.name)));
        }
        Ok(out)
    }

    /// Every rule over a complete row: required columns present, domains respected.
    pub fn check_complete(schema: &EntitySchema, record: &Record) -> Result<(), AppError> {
        for col in schema.editable_columns() {
            validate_field(col, record.get(&col.name).unwrap_or(&Value::Null))?;
        }
        Ok(())
    }
}

/// Soft domain check: an absent or unknown value falls back to `default` with a warning.
pub fn validate_choice(field: &str, value: Option<&str>, allowed: &[&str], default: &str) -> String {
    match value {
        Some(v) if allowed.contains(&v) => v.to_string(),
        Some(v) => {
            tracing::warn!(field = %field, value = %v, default = %default, "invalid value, using default");
            default.to_string()
        }
        None => {
            tracing::warn!(field = %field, default = %default, "missing value, using default");
            default.to_string()
        }
    }
}

fn reject_unknown<'a, I>(schema: &EntitySchema, keys: I) -> Result<(), AppError>
where
    I: IntoIterator<Item = &'a String>,
{
    for k in keys {
        if !schema.has_column(k) {
            return Err(AppError::Validation(format!("{} has no column {}", schema.name, k)));
        }
    }
    Ok(())
}

/// Converts one value to the column's data type.
pub fn coerce_value(col: &ColumnDefinition, v: &Value) -> Result<Value, AppError> {
    if let Value::String(s) = v {
        if s.trim().is_empty() && col.data_type != DataType::String {
            return Ok(Value::Null);
        }
        if s.is_empty() {
            return Ok(Value::Null);
        }
    }
    match (col.data_type, v) {
        (_, Value::Null) => Ok(Value::Null),
        (DataType::Int, Value::Number(n)) => match n.as_i64() {
            Some(i) => Ok(Value::from(i)),
            None => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| Value::from(f as i64))
                .ok_or_else(|| not_a(col, "an integer")),
        },
        (DataType::Int, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| not_a(col, "an integer")),
        (DataType::Int, Value::Bool(b)) => Ok(Value::from(i64::from(*b))),
        (DataType::Numeric, Value::Number(_)) => Ok(v.clone()),
        (DataType::Numeric, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| not_a(col, "a number")),
        (DataType::String, Value::String(_)) => Ok(v.clone()),
        (DataType::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
        (DataType::String, Value::Bool(b)) => Ok(Value::String(b.to_string())),
        (DataType::Blob, Value::Array(items)) if items.iter().all(|i| i.as_u64().is_some_and(|n| n <= 255)) => {
            Ok(v.clone())
        }
        (DataType::Blob, Value::String(s)) => Ok(Value::Array(s.bytes().map(Value::from).collect())),
        (DataType::Int, _) => Err(not_a(col, "an integer")),
        (DataType::Numeric, _) => Err(not_a(col, "a number")),
        (DataType::String, _) => Err(not_a(col, "text")),
        (DataType::Blob, _) => Err(not_a(col, "binary data")),
    }
}

fn not_a(col: &ColumnDefinition, what: &str) -> AppError {
    AppError::Validation(format!("{} must be {}", col.display_name, what))
}

fn validate_field(col: &ColumnDefinition, v: &Value) -> Result<(), AppError> {
    if v.is_null() {
        if col.required {
            return Err(AppError::Validation(format!("{} is required", col.display_name)));
        }
        return Ok(());
    }
    if let Some(ref allowed) = col.allowed_values {
        let text = match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if !allowed.iter().any(|a| *a == text) {
            return Err(AppError::Validation(format!(
                "{} must be one of: {}",
                col.display_name,
                allowed.join(", ")
            )));
        }
    }
    if let (Some(pattern), Some(s)) = (&col.pattern, v.as_str()) {
        let re = Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|_| AppError::Validation(format!("invalid pattern for {}", col.name)))?;
        if !re.is_match(s) {
            return Err(AppError::Validation(format!(
                "{} does not match required pattern",
                col.display_name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_builtin;
    use serde_json::json;
    use std::sync::Arc;

    fn schema(name: &str) -> Arc<EntitySchema> {
        load_builtin().unwrap().get_schema(name).unwrap()
    }

    fn record(v: Value) -> Record {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn form_strings_are_typed() {
        let parts = schema("Parts");
        let raw: HashMap<String, String> = [
            ("PartName", "Bolt"),
            ("DrawingID", " 12 "),
            ("PartWeight", "0.25"),
            ("Notes", ""),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let rec = RequestValidator::coerce_form(&parts, &raw).unwrap();
        assert_eq!(rec["PartName"], json!("Bolt"));
        assert_eq!(rec["DrawingID"], json!(12));
        assert_eq!(rec["PartWeight"], json!(0.25));
        assert_eq!(rec["Notes"], Value::Null);
    }

    #[test]
    fn bad_number_names_the_column() {
        let parts = schema("Parts");
        let raw: HashMap<String, String> = [("PartWeight".to_string(), "heavy".to_string())].into();
        let err = RequestValidator::coerce_form(&parts, &raw).unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m.contains("Weight")));
    }

    #[test]
    fn insert_applies_defaults_and_drops_identity() {
        let parts = schema("Parts");
        let rec = RequestValidator::prepare_insert(&parts, &record(json!({"PartID": 9, "PartName": "Bolt"}))).unwrap();
        assert!(!rec.contains_key("PartID"));
        assert_eq!(rec["ProcurementType"], json!("Purchase"));
        assert_eq!(rec["PartWeight"], json!(0));
        assert_eq!(rec["DrawingID"], Value::Null);
    }

    #[test]
    fn insert_drops_admin_columns() {
        let assemblies = schema("Assemblies");
        let rec = RequestValidator::prepare_insert(
            &assemblies,
            &record(json!({"AssemName": "Arm", "CreationDate": "1999-01-01"})),
        )
        .unwrap();
        assert!(!rec.contains_key("CreationDate"));
        assert!(!rec.contains_key("AssemImage"));
    }

    #[test]
    fn insert_enforces_required_and_domain() {
        let parts = schema("Parts");
        assert!(RequestValidator::prepare_insert(&parts, &record(json!({"Model": "M8"}))).is_err());
        let err = RequestValidator::prepare_insert(
            &parts,
            &record(json!({"PartName": "Bolt", "ProcurementType": "Hybrid"})),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m.contains("Purchase, Make")));
    }

    #[test]
    fn unknown_column_is_rejected() {
        let parts = schema("Parts");
        let err = RequestValidator::prepare_update(&parts, &record(json!({"Colour": "red"}))).unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m.contains("Colour")));
    }

    #[test]
    fn update_keeps_only_supplied_columns() {
        let parts = schema("Parts");
        let rec = RequestValidator::prepare_update(&parts, &record(json!({"Model": "M10"}))).unwrap();
        assert_eq!(rec.len(), 1);
        assert!(RequestValidator::prepare_update(&parts, &record(json!({"PartName": null}))).is_err());
    }

    #[test]
    fn pattern_must_match_whole_value() {
        let suppliers = schema("Suppliers");
        let ok = record(json!({"SupplierName": "Acme", "WebRef": "https://acme.example/bolts"}));
        assert!(RequestValidator::prepare_insert(&suppliers, &ok).is_ok());
        let bad = record(json!({"SupplierName": "Acme", "WebRef": "see catalogue https://acme.example"}));
        assert!(RequestValidator::prepare_insert(&suppliers, &bad).is_err());
    }

    #[test]
    fn blob_accepts_bytes_only() {
        let col = ColumnDefinition::new("Data", DataType::Blob);
        assert_eq!(coerce_value(&col, &json!([1, 2, 255])).unwrap(), json!([1, 2, 255]));
        assert!(coerce_value(&col, &json!([256])).is_err());
        assert_eq!(coerce_value(&col, &json!("ab")).unwrap(), json!([97, 98]));
    }

    #[test]
    fn integers_accept_whole_floats() {
        let col = ColumnDefinition::new("N", DataType::Int);
        assert_eq!(coerce_value(&col, &json!(3.0)).unwrap(), json!(3));
        assert!(coerce_value(&col, &json!(3.5)).is_err());
        assert_eq!(coerce_value(&col, &json!(true)).unwrap(), json!(1));
    }

    #[test]
    fn choice_falls_back_to_default() {
        let allowed = ["Purchase", "Make"];
        assert_eq!(validate_choice("ProcurementType", Some("Make"), &allowed, "Purchase"), "Make");
        assert_eq!(validate_choice("ProcurementType", Some("Buy"), &allowed, "Purchase"), "Purchase");
        assert_eq!(validate_choice("ProcurementType", None, &allowed, "Purchase"), "Purchase");
    }
}
