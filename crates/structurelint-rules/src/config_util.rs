use serde_yaml::Value;

use structurelint_core::rule::ConfigFieldError;

fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Number(n) if n.is_u64() || n.is_i64() => "integer".to_string(),
        Value::Number(_) => "float".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Sequence(_) => "sequence".to_string(),
        Value::Mapping(_) => "mapping".to_string(),
        Value::Tagged(_) => "tagged value".to_string(),
    }
}

/// `value[field]` must be a non-negative integer if present at all.
pub fn validate_u64_field(value: &Value, field: &str) -> Result<(), ConfigFieldError> {
    match value.get(field) {
        None => Ok(()),
        Some(v) if v.as_u64().is_some() => Ok(()),
        Some(v) => Err(ConfigFieldError {
            field: field.to_string(),
            expected: "integer".to_string(),
            got: describe_value(v),
        }),
    }
}

/// `value[field]` must be a number (integer or float) if present at all.
pub fn validate_number_field(value: &Value, field: &str) -> Result<(), ConfigFieldError> {
    match value.get(field) {
        None => Ok(()),
        Some(v) if v.as_f64().is_some() => Ok(()),
        Some(v) => Err(ConfigFieldError {
            field: field.to_string(),
            expected: "number".to_string(),
            got: describe_value(v),
        }),
    }
}

/// `value[field]` must be a sequence if present at all.
pub fn validate_sequence_field(value: &Value, field: &str) -> Result<(), ConfigFieldError> {
    match value.get(field) {
        None => Ok(()),
        Some(v) if v.as_sequence().is_some() => Ok(()),
        Some(v) => Err(ConfigFieldError {
            field: field.to_string(),
            expected: "sequence".to_string(),
            got: describe_value(v),
        }),
    }
}

/// The rule's whole config value must be a mapping (or the trivial
/// `true`/absent shape, which leaves the rule a no-op rather than an error).
pub fn validate_is_mapping(value: &Value) -> Result<(), ConfigFieldError> {
    match value {
        Value::Mapping(_) | Value::Bool(_) | Value::Null => Ok(()),
        other => Err(ConfigFieldError {
            field: "<rule>".to_string(),
            expected: "mapping".to_string(),
            got: describe_value(other),
        }),
    }
}

/// The rule's whole config value must be a sequence (or the trivial
/// `true`/absent shape, which leaves the rule a no-op rather than an error).
pub fn validate_is_sequence(value: &Value) -> Result<(), ConfigFieldError> {
    match value {
        Value::Sequence(_) | Value::Bool(_) | Value::Null => Ok(()),
        other => Err(ConfigFieldError {
            field: "<rule>".to_string(),
            expected: "sequence".to_string(),
            got: describe_value(other),
        }),
    }
}

pub fn as_u64(value: &Value, key: &str) -> Option<u64> {
    value.get(key).and_then(Value::as_u64)
}

pub fn as_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// `value` itself treated as a YAML sequence of strings.
pub fn as_sequence_of_strings(value: &Value) -> Vec<String> {
    value
        .as_sequence()
        .map(|seq| seq.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default()
}

/// `value[key]` treated as a YAML sequence of strings.
pub fn as_str_list(value: &Value, key: &str) -> Vec<String> {
    value.get(key).map(as_sequence_of_strings).unwrap_or_default()
}

/// `value` treated as a YAML mapping with string keys, in declaration order.
pub fn as_mapping(value: &Value) -> Vec<(String, Value)> {
    value
        .as_mapping()
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), v.clone())))
                .collect()
        })
        .unwrap_or_default()
}
