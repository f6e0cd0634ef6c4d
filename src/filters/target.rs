//! target filter extractor - canonicalizes a style layer's filter expression
//!
//! supports:
//! - `["==", property, value]` with a bare property or `["get", property]`
//! - `["all", ...]` flattening immediate equalities
//! - `["any", ...]` keeping the first equality
//!
//! everything else canonicalizes to the empty set without error.

use serde_json::Value as JsonValue;

use super::types::{normalize_literal, normalize_number, Condition, FilterShape};

/// canonical condition set of a layer filter; `None` means no filter
pub fn extract_conditions(filter: Option<&JsonValue>) -> Vec<Condition> {
    filter.map(filter_shape).unwrap_or(FilterShape::Unsupported).into_conditions()
}

/// classify a filter expression into one of the supported shapes
pub fn filter_shape(expr: &JsonValue) -> FilterShape {
    let Some((op, args)) = split_expression(expr) else {
        return FilterShape::Unsupported;
    };

    match op {
        "==" => equality(args)
            .map(FilterShape::Equality)
            .unwrap_or(FilterShape::Unsupported),
        "all" => FilterShape::Conjunction(equality_args(args)),
        "any" => FilterShape::Disjunction(equality_args(args)),
        _ => FilterShape::Unsupported,
    }
}

fn split_expression(expr: &JsonValue) -> Option<(&str, &[JsonValue])> {
    let arr = expr.as_array()?;
    let (op, args) = arr.split_first()?;
    Some((op.as_str()?, args))
}

/// immediate `==` sub-expressions; combinators and other tests are skipped
fn equality_args(args: &[JsonValue]) -> Vec<Condition> {
    args.iter()
        .filter_map(|arg| match split_expression(arg) {
            Some(("==", inner)) => equality(inner),
            _ => None,
        })
        .collect()
}

fn equality(args: &[JsonValue]) -> Option<Condition> {
    let [property, value] = args else {
        return None;
    };
    Some(Condition::eq(property_name(property)?, literal(value)?))
}

fn property_name(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Array(_) => match split_expression(value) {
            Some(("get", [JsonValue::String(name)])) => Some(name.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn literal(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(normalize_literal(s)),
        JsonValue::Number(n) => n.as_f64().map(normalize_number),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
