//! `${...}` placeholder substitution.
//!
//! Grounded in the teacher's error-accumulation style (thiserror variants
//! collected rather than returned on the first failure): every placeholder
//! in a template is evaluated, and all failures are reported together
//! instead of stopping at the first one (§4.4).

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde_json::Value;

use crate::error::{TemplateError, TemplateErrors};

/// Per-iteration key-value scope, written by step extraction and read by the
/// template engine on subsequent steps.
///
/// Values preserve JSON types so extracted numbers/bools/null round-trip;
/// plain `${name}` substitution stringifies them (strings are inserted
/// without surrounding quotes, everything else uses its JSON rendering).
pub type Variables = HashMap<String, Value>;

/// Renders `value` the way `${name}` substitution does: strings unquoted,
/// everything else via its JSON text form.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Substitutes every `${...}` occurrence in `input` against `vars`.
///
/// Returns the substituted string, or the accumulated [`TemplateErrors`] from
/// every placeholder that failed to resolve.
pub fn substitute(input: &str, vars: &Variables) -> Result<String, TemplateErrors> {
    let mut out = String::with_capacity(input.len());
    let mut errors = Vec::new();
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated placeholder: emit literally and stop scanning.
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let expr = &after[..end];
        match resolve(expr, vars) {
            Ok(value) => out.push_str(&value),
            Err(e) => errors.push(e),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    if errors.is_empty() { Ok(out) } else { Err(TemplateErrors(errors)) }
}

/// Applies [`substitute`] to every value of a string-keyed map, aggregating
/// errors from every entry rather than stopping at the first failing key.
pub fn substitute_map(
    input: &HashMap<String, String>,
    vars: &Variables,
) -> Result<HashMap<String, String>, TemplateErrors> {
    let mut out = HashMap::with_capacity(input.len());
    let mut errors = Vec::new();
    for (key, value) in input {
        match substitute(value, vars) {
            Ok(rendered) => {
                out.insert(key.clone(), rendered);
            }
            Err(TemplateErrors(mut e)) => errors.append(&mut e),
        }
    }
    if errors.is_empty() { Ok(out) } else { Err(TemplateErrors(errors)) }
}

fn resolve(expr: &str, vars: &Variables) -> Result<String, TemplateError> {
    if let Some(name) = expr.strip_prefix("env:") {
        return std::env::var(name).map_err(|_| TemplateError::MissingEnv(name.to_string()));
    }

    if let Some(open) = expr.find('(') {
        if expr.ends_with(')') {
            let func = &expr[..open];
            let args = &expr[open + 1..expr.len() - 1];
            return call_function(func, args);
        }
    }

    vars.get(expr)
        .map(render)
        .ok_or_else(|| TemplateError::MissingVariable(expr.to_string()))
}

fn call_function(func: &str, args: &str) -> Result<String, TemplateError> {
    let args = args.trim();
    match func {
        "uuid" => Ok(uuid::Uuid::new_v4().to_string()),
        "timestamp" => Ok(now_secs().to_string()),
        "timestamp_ms" => Ok(now_millis().to_string()),
        "random" => random_range(args),
        "random_string" => random_string(args),
        "date" => Ok(format_date(args)),
        _ => Err(TemplateError::MissingVariable(func.to_string())),
    }
}

fn split_args(args: &str) -> Vec<&str> {
    if args.is_empty() { Vec::new() } else { args.split(',').map(str::trim).collect() }
}

fn random_range(args: &str) -> Result<String, TemplateError> {
    let invalid = |reason: &str| TemplateError::InvalidArgs {
        func: "random".to_string(),
        reason: reason.to_string(),
    };
    let parts = split_args(args);
    let [lo, hi] = parts.as_slice() else {
        return Err(invalid("expected random(lo,hi)"));
    };
    let lo: i64 = lo.parse().map_err(|_| invalid("lo must be an integer"))?;
    let hi: i64 = hi.parse().map_err(|_| invalid("hi must be an integer"))?;
    if lo > hi {
        return Err(invalid("lo must be <= hi"));
    }
    let value = rand::thread_rng().gen_range(lo..=hi);
    Ok(value.to_string())
}

fn random_string(args: &str) -> Result<String, TemplateError> {
    let invalid = |reason: &str| TemplateError::InvalidArgs {
        func: "random_string".to_string(),
        reason: reason.to_string(),
    };
    let n: usize = args.parse().map_err(|_| invalid("n must be an integer"))?;
    if n == 0 || n > 1000 {
        return Err(invalid("n must be in (0, 1000]"));
    }
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    let s: String = (0..n).map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char).collect();
    Ok(s)
}

fn format_date(layout: &str) -> String {
    let now = chrono::Utc::now();
    if layout.is_empty() { now.to_rfc3339() } else { now.format(layout).to_string() }
}

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

fn now_millis() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs.iter().map(|(k, v)| (k.to_string(), Value::String(v.to_string()))).collect()
    }

    #[test]
    fn substitutes_plain_variable() {
        let v = vars(&[("name", "alice")]);
        assert_eq!(substitute("hello ${name}", &v).unwrap(), "hello alice");
    }

    #[test]
    fn missing_variable_errors() {
        let v = Variables::new();
        let err = substitute("${nonexistent}", &v).unwrap_err();
        assert!(err.0[0].to_string().contains("nonexistent"));
    }

    #[test]
    fn accumulates_multiple_errors() {
        let v = Variables::new();
        let err = substitute("${a} and ${b}", &v).unwrap_err();
        assert_eq!(err.0.len(), 2);
    }

    #[test]
    fn env_lookup() {
        std::env::set_var("RLT_FLOW_TEST_VAR", "ok");
        let v = Variables::new();
        assert_eq!(substitute("${env:RLT_FLOW_TEST_VAR}", &v).unwrap(), "ok");
    }

    #[test]
    fn missing_env_errors() {
        std::env::remove_var("RLT_FLOW_TEST_MISSING");
        let v = Variables::new();
        let err = substitute("${env:RLT_FLOW_TEST_MISSING}", &v).unwrap_err();
        assert!(matches!(err.0[0], TemplateError::MissingEnv(_)));
    }

    #[test]
    fn uuid_function() {
        let v = Variables::new();
        let out = substitute("${uuid()}", &v).unwrap();
        assert_eq!(out.len(), 36);
    }

    #[test]
    fn random_function_within_bounds() {
        let v = Variables::new();
        for _ in 0..20 {
            let out = substitute("${random(1,3)}", &v).unwrap();
            let n: i64 = out.parse().unwrap();
            assert!((1..=3).contains(&n));
        }
    }

    #[test]
    fn random_string_length() {
        let v = Variables::new();
        let out = substitute("${random_string(8)}", &v).unwrap();
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn unknown_function_is_missing_variable() {
        let v = Variables::new();
        let err = substitute("${bogus(1)}", &v).unwrap_err();
        assert!(matches!(err.0[0], TemplateError::MissingVariable(_)));
    }

    #[test]
    fn substitute_map_aggregates_across_keys() {
        let mut input = HashMap::new();
        input.insert("a".to_string(), "${missing_a}".to_string());
        input.insert("b".to_string(), "${missing_b}".to_string());
        let err = substitute_map(&input, &Variables::new()).unwrap_err();
        assert_eq!(err.0.len(), 2);
    }
}
