//! Scalar inference over seed records.
//!
//! The first record of a collection fixes the field set. A whole-valued
//! number is an `Int` even when stored as a float; anything that is not a
//! string, number, or boolean fails inference.

use serde_json::{Map, Value};

use crate::errors::GeneratorError;

/// GraphQL scalar inferred from a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Int,
    Float,
    Boolean,
}

impl ScalarType {
    pub fn as_str(self) -> &'static str {
        match self {
            ScalarType::String => "String",
            ScalarType::Int => "Int",
            ScalarType::Float => "Float",
            ScalarType::Boolean => "Boolean",
        }
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Required-ness policy for a field list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMode {
    /// Everything except `id` is required.
    Create,
    /// Only `id` is required.
    Update,
}

/// One field of a collection type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub scalar: ScalarType,
}

impl FieldDef {
    /// Whether the field is non-null under the given mode.
    pub fn required(&self, mode: FieldMode) -> bool {
        match mode {
            FieldMode::Create => self.name != "id",
            FieldMode::Update => self.name == "id",
        }
    }
}

/// Infers the field set from a single record, in key order.
pub(crate) fn infer_fields(
    collection: &str,
    record: &Map<String, Value>,
) -> Result<Vec<FieldDef>, GeneratorError> {
    record
        .iter()
        .map(|(name, value)| {
            let scalar =
                infer_scalar(value).ok_or_else(|| GeneratorError::UnsupportedFieldType {
                    collection: collection.to_string(),
                    field: name.clone(),
                    kind: json_kind(value),
                })?;
            Ok(FieldDef {
                name: name.clone(),
                scalar,
            })
        })
        .collect()
}

/// Comma-joined `name: Type` tokens, with `!` on required fields.
pub(crate) fn signature(fields: &[FieldDef], mode: FieldMode) -> String {
    fields
        .iter()
        .map(|field| {
            let bang = if field.required(mode) { "!" } else { "" };
            format!("{}: {}{bang}", field.name, field.scalar)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn infer_scalar(value: &Value) -> Option<ScalarType> {
    match value {
        Value::String(_) => Some(ScalarType::String),
        Value::Number(n) => Some(if is_whole(n) {
            ScalarType::Int
        } else {
            ScalarType::Float
        }),
        Value::Bool(_) => Some(ScalarType::Boolean),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn is_whole(n: &serde_json::Number) -> bool {
    n.as_i64().is_some() || n.as_u64().is_some() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn fields_of(record: Value) -> Vec<FieldDef> {
        infer_fields("animes", record.as_object().unwrap()).unwrap()
    }

    #[test]
    fn test_create_signature_requires_everything_but_id() {
        let fields = fields_of(json!({
            "id": 1,
            "title": "Naruto",
            "rating": 90.6,
            "episodes": 12,
            "manga": true
        }));

        assert_eq!(
            signature(&fields, FieldMode::Create),
            "id: Int, title: String!, rating: Float!, episodes: Int!, manga: Boolean!"
        );
    }

    #[test]
    fn test_update_signature_requires_only_id() {
        let fields = fields_of(json!({
            "id": 1,
            "title": "Naruto",
            "rating": 90.6,
            "episodes": 12,
            "manga": true
        }));

        assert_eq!(
            signature(&fields, FieldMode::Update),
            "id: Int!, title: String, rating: Float, episodes: Int, manga: Boolean"
        );
    }

    #[test]
    fn test_signatures_follow_record_key_order() {
        let fields = fields_of(json!({ "id": 1, "name": "Berserk" }));

        assert_eq!(signature(&fields, FieldMode::Create), "id: Int, name: String!");
        assert_eq!(signature(&fields, FieldMode::Update), "id: Int!, name: String");
    }

    #[rstest]
    #[case(json!(90), ScalarType::Int)]
    #[case(json!(90.0), ScalarType::Int)]
    #[case(json!(90.6), ScalarType::Float)]
    #[case(json!(-3), ScalarType::Int)]
    #[case(json!("x"), ScalarType::String)]
    #[case(json!(false), ScalarType::Boolean)]
    fn test_scalar_inference(#[case] value: Value, #[case] expected: ScalarType) {
        assert_eq!(infer_scalar(&value), Some(expected));
    }

    #[rstest]
    #[case(json!({ "id": 1, "tags": ["a", "b"] }), "array")]
    #[case(json!({ "id": 1, "owner": { "name": "x" } }), "object")]
    #[case(json!({ "id": 1, "notes": null }), "null")]
    fn test_unsupported_values_fail_inference(#[case] record: Value, #[case] kind: &str) {
        let result = infer_fields("animes", record.as_object().unwrap());

        match result {
            Err(GeneratorError::UnsupportedFieldType {
                collection,
                field,
                kind: reported,
            }) => {
                assert_eq!(collection, "animes");
                assert_ne!(field, "id");
                assert_eq!(reported, kind);
            }
            other => panic!("expected an unsupported-type error, got {other:?}"),
        }
    }
}
