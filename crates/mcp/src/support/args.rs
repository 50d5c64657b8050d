#![forbid(unsafe_code)]

use super::ai::ai_error;
use serde_json::Value;

pub(crate) fn require_string(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<String, Value> {
    let Some(v) = args.get(key).and_then(|v| v.as_str()) else {
        return Err(ai_error("INVALID_ARGS", &format!("{key} is required")));
    };
    Ok(v.to_string())
}

pub(crate) fn optional_string(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<String>, Value> {
    let Some(value) = args.get(key) else {
        return Ok(None);
    };
    match value {
        Value::Null => Ok(None),
        Value::String(v) => Ok(Some(v.to_string())),
        _ => Err(ai_error(
            "INVALID_ARGS",
            &format!("{key} must be a string"),
        )),
    }
}

pub(crate) fn optional_string_array(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<Vec<String>>, Value> {
    let Some(value) = args.get(key) else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }
    let Some(arr) = value.as_array() else {
        return Err(ai_error(
            "INVALID_ARGS",
            &format!("{key} must be an array of strings"),
        ));
    };
    let mut out = Vec::with_capacity(arr.len());
    for item in arr {
        let Some(s) = item.as_str() else {
            return Err(ai_error(
                "INVALID_ARGS",
                &format!("{key} must be an array of strings"),
            ));
        };
        out.push(s.to_string());
    }
    Ok(Some(out))
}

pub(crate) fn require_string_array(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Vec<String>, Value> {
    match optional_string_array(args, key)? {
        Some(list) => Ok(list),
        None => Err(ai_error("INVALID_ARGS", &format!("{key} is required"))),
    }
}

pub(crate) fn optional_bool(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<bool>, Value> {
    let Some(value) = args.get(key) else {
        return Ok(None);
    };
    match value {
        Value::Null => Ok(None),
        Value::Bool(v) => Ok(Some(*v)),
        _ => Err(ai_error(
            "INVALID_ARGS",
            &format!("{key} must be a boolean"),
        )),
    }
}

pub(crate) fn optional_f64(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<f64>, Value> {
    let Some(value) = args.get(key) else {
        return Ok(None);
    };
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => match n.as_f64() {
            Some(v) => Ok(Some(v)),
            None => Err(ai_error("INVALID_ARGS", &format!("{key} must be a number"))),
        },
        _ => Err(ai_error("INVALID_ARGS", &format!("{key} must be a number"))),
    }
}

pub(crate) fn optional_usize(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<usize>, Value> {
    let Some(value) = args.get(key) else {
        return Ok(None);
    };
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => match n.as_u64() {
            Some(v) => Ok(Some(v as usize)),
            None => Err(ai_error(
                "INVALID_ARGS",
                &format!("{key} must be a non-negative integer"),
            )),
        },
        _ => Err(ai_error(
            "INVALID_ARGS",
            &format!("{key} must be a non-negative integer"),
        )),
    }
}

pub(crate) fn args_object(args: &Value) -> Result<&serde_json::Map<String, Value>, Value> {
    args.as_object()
        .ok_or_else(|| ai_error("INVALID_ARGS", "arguments must be an object"))
}
