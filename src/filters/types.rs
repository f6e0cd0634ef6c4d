//! core types for canonical filter conditions

use std::fmt;

use regex::Regex;
use serde::Serialize;

lazy_static::lazy_static! {
    /// plain decimal: no leading zeros, plus sign or exponent
    static ref CANONICAL_NUMBER: Regex = Regex::new(r"^-?(?:0|[1-9][0-9]*)(?:\.[0-9]+)?$").unwrap();
    static ref ZERO_FRACTION: Regex = Regex::new(r"^(-?(?:0|[1-9][0-9]*))\.0+$").unwrap();
}

/// comparison operators that survive canonicalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompareOp {
    /// equality: ==, PropertyIsEqualTo
    #[serde(rename = "==")]
    Eq,
    /// greater than or equal: >=, PropertyIsGreaterThanOrEqualTo
    #[serde(rename = ">=")]
    Gte,
    /// less than: <, PropertyIsLessThan
    #[serde(rename = "<")]
    Lt,
    /// less than or equal: <=, PropertyIsLessThanOrEqualTo
    #[serde(rename = "<=")]
    Lte,
}

impl CompareOp {
    /// parse operator from a style expression or an SLD element name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "==" | "PropertyIsEqualTo" => Some(CompareOp::Eq),
            ">=" | "PropertyIsGreaterThanOrEqualTo" => Some(CompareOp::Gte),
            "<" | "PropertyIsLessThan" => Some(CompareOp::Lt),
            "<=" | "PropertyIsLessThanOrEqualTo" => Some(CompareOp::Lte),
            _ => None,
        }
    }

    /// operator token used in style expressions
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// a single property comparison, value always in string form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Condition {
    pub property: String,
    #[serde(rename = "operator")]
    pub op: CompareOp,
    pub value: String,
}

impl Condition {
    pub fn new(property: impl Into<String>, op: CompareOp, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            op,
            value: value.into(),
        }
    }

    /// create an equality condition
    pub fn eq(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(property, CompareOp::Eq, value)
    }

    /// canonical comparison key: operator is not part of it
    pub fn same_test(&self, other: &Condition) -> bool {
        self.property == other.property && self.value == other.value
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} \"{}\"", self.property, self.op, self.value)
    }
}

/// the shapes of filter actually authored in practice
///
/// both the legacy and the declarative side reduce their filter tree to one
/// of these before matching. anything deeper than one level of and/or is
/// `Unsupported` and contributes nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterShape {
    /// a single equality test
    Equality(Condition),
    /// one level of AND over equality tests
    Conjunction(Vec<Condition>),
    /// one level of OR over equality tests
    Disjunction(Vec<Condition>),
    /// no filter, or a filter we do not model
    Unsupported,
}

impl FilterShape {
    /// flatten into the canonical condition set
    ///
    /// a disjunction is sampled by its first branch only; the result is a
    /// matching aid, not a logically faithful translation.
    pub fn into_conditions(self) -> Vec<Condition> {
        match self {
            FilterShape::Equality(c) => vec![c],
            FilterShape::Conjunction(cs) => cs,
            FilterShape::Disjunction(mut cs) => {
                cs.truncate(1);
                cs
            }
            FilterShape::Unsupported => Vec::new(),
        }
    }
}

/// a legacy rule reduced to what label matching needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleRule {
    pub title: String,
    pub conditions: Vec<Condition>,
}

impl StyleRule {
    pub fn new(title: impl Into<String>, conditions: Vec<Condition>) -> Self {
        Self {
            title: title.into(),
            conditions,
        }
    }
}

/// normalize a numeric literal to its canonical string form
///
/// integral values drop the fractional part so `3`, `3.0` and `"3"` compare
/// equal across the two document formats.
pub fn normalize_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// normalize a text literal
///
/// only an all-zero fraction is dropped (`"3.0"` -> `"3"`). codes such as
/// `"007"` or `"1e3"` are distinct values and stay verbatim.
pub fn normalize_literal(s: &str) -> String {
    let trimmed = s.trim();
    match ZERO_FRACTION.captures(trimmed) {
        Some(caps) if &caps[1] == "-0" => "0".to_string(),
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    }
}

/// whether a canonical value reads as a plain decimal number
pub fn is_canonical_number(value: &str) -> bool {
    CANONICAL_NUMBER.is_match(value)
}
