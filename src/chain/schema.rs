use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// JSON types supported for structured-output fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    StringArray,
}

impl FieldKind {
    fn expected(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Integer => "an integer",
            Self::Number => "a number",
            Self::Boolean => "a boolean",
            Self::StringArray => "an array of strings",
        }
    }
}

/// One field of a structured-output contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Instruction shown to the model for this field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Restricts a string field to a closed set of values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
}

fn default_required() -> bool {
    true
}

impl FieldSpec {
    /// A required field of the given kind.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: None,
            allowed: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn one_of(mut self, values: Vec<String>) -> Self {
        self.allowed = Some(values);
        self
    }
}

/// Expected shape of a structured model reply: named fields with
/// required/optional flags and per-field validation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSchema {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

/// Structured-output failures.
#[derive(Debug)]
pub enum SchemaError {
    /// The reply was not valid JSON.
    Parse(serde_json::Error),
    /// The reply parsed but is not a JSON object.
    NotAnObject,
    /// A field violated the schema; names the offending field.
    Violation { field: String, reason: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(source) => write!(f, "structured reply is not valid JSON: {source}"),
            Self::NotAnObject => write!(f, "structured reply is not a JSON object"),
            Self::Violation { field, reason } => {
                write!(f, "schema violation on field '{field}': {reason}")
            }
        }
    }
}

impl Error for SchemaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(source) => Some(source),
            _ => None,
        }
    }
}

impl OutputSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Loads a schema from a JSON file.
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Serializes the contract as a JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in &self.fields {
            let mut spec = Map::new();
            match field.kind {
                FieldKind::String => {
                    spec.insert("type".to_string(), Value::String("string".to_string()));
                }
                FieldKind::Integer => {
                    spec.insert("type".to_string(), Value::String("integer".to_string()));
                }
                FieldKind::Number => {
                    spec.insert("type".to_string(), Value::String("number".to_string()));
                }
                FieldKind::Boolean => {
                    spec.insert("type".to_string(), Value::String("boolean".to_string()));
                }
                FieldKind::StringArray => {
                    spec.insert("type".to_string(), Value::String("array".to_string()));
                    spec.insert("items".to_string(), json!({ "type": "string" }));
                }
            }
            if let Some(description) = &field.description {
                spec.insert(
                    "description".to_string(),
                    Value::String(description.clone()),
                );
            }
            if let Some(allowed) = &field.allowed {
                spec.insert(
                    "enum".to_string(),
                    Value::Array(
                        allowed
                            .iter()
                            .map(|value| Value::String(value.clone()))
                            .collect(),
                    ),
                );
            }
            properties.insert(field.name.clone(), Value::Object(spec));
            if field.required {
                required.push(Value::String(field.name.clone()));
            }
        }

        let mut schema = Map::new();
        schema.insert("title".to_string(), Value::String(self.name.clone()));
        schema.insert("type".to_string(), Value::String("object".to_string()));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        Value::Object(schema)
    }

    /// System-prompt text steering the model toward the contract.
    pub fn instruction(&self) -> String {
        let schema = serde_json::to_string_pretty(&self.to_json_schema())
            .unwrap_or_else(|_| "{}".to_string());
        format!(
            "Reply with a single JSON object matching this JSON Schema, \
             with no surrounding prose and no Markdown code fences:\n{schema}"
        )
    }

    /// Parses a raw model reply (tolerating Markdown code fences) and
    /// validates it against the schema.
    pub fn parse_reply(&self, reply: &str) -> Result<Map<String, Value>, SchemaError> {
        let body = strip_code_fences(reply);
        let value: Value = serde_json::from_str(body).map_err(SchemaError::Parse)?;
        self.validate(&value)
    }

    /// Checks required fields, per-field types, and closed value sets.
    /// Extra fields not named by the schema are ignored. Returns the
    /// validated object.
    pub fn validate(&self, value: &Value) -> Result<Map<String, Value>, SchemaError> {
        let object = value.as_object().ok_or(SchemaError::NotAnObject)?;

        for field in &self.fields {
            let entry = object.get(&field.name).filter(|v| !v.is_null());
            let Some(entry) = entry else {
                if field.required {
                    return Err(SchemaError::Violation {
                        field: field.name.clone(),
                        reason: "missing required field".to_string(),
                    });
                }
                continue;
            };

            let ok = match field.kind {
                FieldKind::String => entry.is_string(),
                FieldKind::Integer => entry.is_i64() || entry.is_u64(),
                FieldKind::Number => entry.is_number(),
                FieldKind::Boolean => entry.is_boolean(),
                FieldKind::StringArray => entry
                    .as_array()
                    .is_some_and(|items| items.iter().all(Value::is_string)),
            };
            if !ok {
                return Err(SchemaError::Violation {
                    field: field.name.clone(),
                    reason: format!("expected {}", field.kind.expected()),
                });
            }

            if let (Some(allowed), Some(actual)) = (&field.allowed, entry.as_str()) {
                if !allowed.iter().any(|candidate| candidate == actual) {
                    return Err(SchemaError::Violation {
                        field: field.name.clone(),
                        reason: format!("'{actual}' is not one of {allowed:?}"),
                    });
                }
            }
        }

        Ok(object.clone())
    }
}

fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::{FieldKind, FieldSpec, OutputSchema, SchemaError};
    use serde_json::json;

    fn review_schema() -> OutputSchema {
        OutputSchema::new("Review")
            .with_field(
                FieldSpec::new("summary", FieldKind::String)
                    .describe("A brief summary of the review"),
            )
            .with_field(
                FieldSpec::new("sentiment", FieldKind::String)
                    .one_of(vec!["pos".to_string(), "neg".to_string()]),
            )
            .with_field(FieldSpec::new("key_themes", FieldKind::StringArray))
            .with_field(FieldSpec::new("pros", FieldKind::StringArray).optional())
            .with_field(FieldSpec::new("name", FieldKind::String).optional())
    }

    #[test]
    fn valid_reply_passes_and_keeps_fields() {
        let reply = json!({
            "summary": "Great hardware, bloated software.",
            "sentiment": "neg",
            "key_themes": ["hardware", "software"],
            "name": "Vanshdeep Singh",
        });
        let object = review_schema().validate(&reply).unwrap();
        assert_eq!(object["sentiment"], "neg");
        assert!(object.get("pros").is_none());
    }

    #[test]
    fn missing_required_field_names_the_field() {
        let err = review_schema()
            .validate(&json!({ "sentiment": "pos", "key_themes": [] }))
            .unwrap_err();
        match err {
            SchemaError::Violation { field, reason } => {
                assert_eq!(field, "summary");
                assert_eq!(reason, "missing required field");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn type_mismatch_is_a_violation() {
        let err = review_schema()
            .validate(&json!({
                "summary": "ok",
                "sentiment": "pos",
                "key_themes": "not an array",
            }))
            .unwrap_err();
        assert!(matches!(err, SchemaError::Violation { field, .. } if field == "key_themes"));
    }

    #[test]
    fn closed_value_set_is_enforced() {
        let err = review_schema()
            .validate(&json!({
                "summary": "ok",
                "sentiment": "mixed",
                "key_themes": [],
            }))
            .unwrap_err();
        assert!(matches!(err, SchemaError::Violation { field, .. } if field == "sentiment"));
    }

    #[test]
    fn optional_null_field_is_accepted() {
        let reply = json!({
            "summary": "ok",
            "sentiment": "pos",
            "key_themes": [],
            "pros": null,
        });
        review_schema().validate(&reply).unwrap();
    }

    #[test]
    fn code_fences_are_stripped_before_parsing() {
        let reply = "```json\n{\"summary\": \"ok\", \"sentiment\": \"pos\", \"key_themes\": []}\n```";
        let object = review_schema().parse_reply(reply).unwrap();
        assert_eq!(object["summary"], "ok");
    }

    #[test]
    fn non_object_reply_is_rejected() {
        assert!(matches!(
            review_schema().parse_reply("[1, 2]"),
            Err(SchemaError::NotAnObject)
        ));
        assert!(matches!(
            review_schema().parse_reply("not json at all"),
            Err(SchemaError::Parse(_))
        ));
    }

    #[test]
    fn json_schema_lists_required_and_enum() {
        let schema = review_schema().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["sentiment"]["enum"][0], "pos");
        assert_eq!(schema["properties"]["key_themes"]["type"], "array");
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 3);
    }

    #[test]
    fn instruction_embeds_the_schema() {
        let instruction = review_schema().instruction();
        assert!(instruction.contains("JSON"));
        assert!(instruction.contains("sentiment"));
    }
}
