//! A deliberately small JSON-path subset.
//!
//! This is not a general JSON-path implementation. It accepts exactly three
//! forms, per the Design Notes' call to document the dialect precisely:
//!
//! - `$.a.b` — nested object field access.
//! - `$.a[n].b` — numeric array indexing.
//! - `$.a[*].b` — wildcard: projects the rest of the path over every element
//!   of the array, yielding a JSON array of results.
//!
//! Anything else is rejected with [`JsonPathError::InvalidPath`].

use serde_json::Value;

/// Failure modes for [`extract`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonPathError {
    /// The path expression itself is malformed or outside the accepted dialect.
    InvalidPath(String),
    /// The path was well-formed but did not resolve to a value in the body.
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
    Wildcard,
}

fn parse(path: &str) -> Result<Vec<Segment>, JsonPathError> {
    let invalid = || JsonPathError::InvalidPath(path.to_string());

    if path == "$" {
        return Ok(Vec::new());
    }
    let rest = path.strip_prefix("$.").ok_or_else(invalid)?;
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut segments = Vec::new();
    for component in rest.split('.') {
        if component.is_empty() {
            return Err(invalid());
        }
        let bracket_start = component.find('[');
        let key_part = match bracket_start {
            Some(idx) => &component[..idx],
            None => component,
        };
        if !key_part.is_empty() {
            if !key_part.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(invalid());
            }
            segments.push(Segment::Key(key_part.to_string()));
        }

        let mut remainder = bracket_start.map(|idx| &component[idx..]).unwrap_or("");
        while !remainder.is_empty() {
            let rest_after_open = remainder.strip_prefix('[').ok_or_else(invalid)?;
            let close = rest_after_open.find(']').ok_or_else(invalid)?;
            let inner = &rest_after_open[..close];
            if inner == "*" {
                segments.push(Segment::Wildcard);
            } else {
                let index: usize = inner.parse().map_err(|_| invalid())?;
                segments.push(Segment::Index(index));
            }
            remainder = &rest_after_open[close + 1..];
        }
    }
    Ok(segments)
}

fn eval(value: &Value, segments: &[Segment]) -> Result<Value, JsonPathError> {
    let Some((head, tail)) = segments.split_first() else {
        return Ok(value.clone());
    };
    match head {
        Segment::Key(key) => {
            let next = value.get(key).ok_or(JsonPathError::NotFound)?;
            eval(next, tail)
        }
        Segment::Index(i) => {
            let next = value.get(i).ok_or(JsonPathError::NotFound)?;
            eval(next, tail)
        }
        Segment::Wildcard => {
            let array = value.as_array().ok_or(JsonPathError::NotFound)?;
            let mut out = Vec::with_capacity(array.len());
            for element in array {
                out.push(eval(element, tail)?);
            }
            Ok(Value::Array(out))
        }
    }
}

/// Evaluates `path` against `root`, returning the matched JSON value.
pub fn extract(path: &str, root: &Value) -> Result<Value, JsonPathError> {
    let segments = parse(path)?;
    eval(root, &segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_field_access() {
        let body = json!({"id": "abc", "user": {"name": "alice"}});
        assert_eq!(extract("$.id", &body).unwrap(), json!("abc"));
        assert_eq!(extract("$.user.name", &body).unwrap(), json!("alice"));
    }

    #[test]
    fn numeric_index() {
        let body = json!({"list": [{"name": "a"}, {"name": "b"}]});
        assert_eq!(extract("$.list[0].name", &body).unwrap(), json!("a"));
        assert_eq!(extract("$.list[1].name", &body).unwrap(), json!("b"));
    }

    #[test]
    fn wildcard_projects_over_array() {
        let body = json!({"list": [{"name": "a"}, {"name": "b"}]});
        assert_eq!(extract("$.list[*].name", &body).unwrap(), json!(["a", "b"]));
    }

    #[test]
    fn missing_path_not_found() {
        let body = json!({"id": "abc"});
        assert_eq!(extract("$.missing", &body).unwrap_err(), JsonPathError::NotFound);
    }

    #[test]
    fn malformed_path_rejected() {
        let body = json!({});
        assert!(matches!(extract("foo.bar", &body), Err(JsonPathError::InvalidPath(_))));
        assert!(matches!(extract("$.a[abc]", &body), Err(JsonPathError::InvalidPath(_))));
    }

    #[test]
    fn root_path_returns_whole_body() {
        let body = json!({"a": 1});
        assert_eq!(extract("$", &body).unwrap(), body);
    }
}
