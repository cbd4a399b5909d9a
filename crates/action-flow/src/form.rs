//! Form definitions consumed by `fillform`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::errors::FlowError;

/// A named set of fields filled in one `fillform` step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormConfiguration {
    #[serde(default)]
    pub form_id: String,
    #[serde(default)]
    pub form_name: String,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    #[serde(default)]
    pub field_name: String,
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub data_value: String,
    /// Raw type name; checked when the form is filled
    #[serde(default)]
    pub field_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Email,
    Password,
    Textarea,
    Select,
    Radio,
    Checkbox,
    File,
}

impl FieldType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Some(FieldType::Text),
            "email" => Some(FieldType::Email),
            "password" => Some(FieldType::Password),
            "textarea" => Some(FieldType::Textarea),
            "select" => Some(FieldType::Select),
            "radio" => Some(FieldType::Radio),
            "checkbox" => Some(FieldType::Checkbox),
            "file" => Some(FieldType::File),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Password => "password",
            FieldType::Textarea => "textarea",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::File => "file",
        };
        f.write_str(name)
    }
}

impl FieldConfig {
    pub fn kind(&self) -> Result<FieldType, FlowError> {
        FieldType::parse(&self.field_type).ok_or_else(|| {
            FlowError::Configuration(format!(
                "unsupported field type '{}' for field '{}'",
                self.field_type, self.field_name
            ))
        })
    }
}

impl FormConfiguration {
    /// Parse a form document; property names match case-insensitively.
    pub fn from_json(text: &str) -> Result<Self, FlowError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| FlowError::Configuration(format!("invalid form document: {err}")))?;
        if !value.is_object() {
            return Err(FlowError::Configuration(
                "form document must be a JSON object".to_string(),
            ));
        }
        serde_json::from_value(canonical_keys(value))
            .map_err(|err| FlowError::Configuration(format!("invalid form document: {err}")))
    }
}

const KNOWN_KEYS: [&str; 7] = [
    "formId",
    "formName",
    "fields",
    "fieldName",
    "selector",
    "dataValue",
    "fieldType",
];

fn canonical_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    let key = KNOWN_KEYS
                        .iter()
                        .find(|known| known.eq_ignore_ascii_case(&key))
                        .map(|known| known.to_string())
                        .unwrap_or(key);
                    (key, canonical_keys(value))
                })
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(canonical_keys).collect()),
        other => other,
    }
}

/// Parse a checkbox value the way `bool` literals are written in forms.
pub fn parse_checkbox(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitive_properties() {
        let form = FormConfiguration::from_json(
            r##"{"FormId":"apply","FORMNAME":"Apply","Fields":[
                {"FieldName":"email","Selector":"#email","DataValue":"${UserEmail}","FieldType":"Email"}
            ]}"##,
        )
        .unwrap();
        assert_eq!(form.form_id, "apply");
        assert_eq!(form.form_name, "Apply");
        assert_eq!(form.fields.len(), 1);
        assert_eq!(form.fields[0].data_value, "${UserEmail}");
        assert_eq!(form.fields[0].kind().unwrap(), FieldType::Email);
    }

    #[test]
    fn unknown_field_type_is_configuration_error() {
        let field = FieldConfig {
            field_name: "x".into(),
            field_type: "unsupported".into(),
            ..FieldConfig::default()
        };
        assert!(matches!(field.kind(), Err(FlowError::Configuration(_))));
    }

    #[test]
    fn checkbox_values() {
        assert_eq!(parse_checkbox(" True "), Some(true));
        assert_eq!(parse_checkbox("false"), Some(false));
        assert_eq!(parse_checkbox("yes"), None);
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let form = FormConfiguration::from_json(r#"{"formId":"empty"}"#).unwrap();
        assert!(form.fields.is_empty());
        assert!(FormConfiguration::from_json("[]").is_err());
    }
}
