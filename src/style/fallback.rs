//! heuristic style compiler for legacy documents the primary translator
//! could not handle
//!
//! works on the raw text with regular expressions instead of a strict XML
//! parse, so truncated or badly namespaced documents still yield whatever
//! rules can be recognized. the geometry is decided once for the whole
//! document: any `PointSymbolizer` makes it a point style.

use std::collections::HashSet;

use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use super::label::decode_entities;
use super::types::{Layer, LegendEntry, StyleDocument};
use crate::filters::{
    is_canonical_number, normalize_literal, normalize_number, CompareOp, Condition,
};

/// fill color used when a rule has none, and for unmatched class values
pub const DEFAULT_FILL: &str = "#888888";
/// circle radius when no complete size ramp is given
pub const DEFAULT_RADIUS: f64 = 6.0;
/// rules visible only up to this scale denominator are legend entries only
pub const LEGEND_ONLY_MAX_SCALE: f64 = 10.0;

const DEFAULT_STYLE_COLOR: &str = "#088";
const OUTLINE_COLOR: &str = "#000000";
const OUTLINE_WIDTH: f64 = 0.5;
const FILL_OPACITY: f64 = 0.6;
const CIRCLE_OPACITY: f64 = 0.8;
const CIRCLE_STROKE_COLOR: &str = "#ffffff";
const CIRCLE_STROKE_WIDTH: f64 = 1.0;

// element names may carry any namespace prefix
lazy_static::lazy_static! {
    static ref RULE: Regex = tag_block("Rule");
    static ref TITLE: Regex = tag_block("Title");
    static ref NAME: Regex = tag_block("Name");
    static ref SIZE: Regex = tag_block("Size");
    static ref LITERAL: Regex = tag_block("Literal");
    static ref PROPERTY_NAME: Regex = tag_block("PropertyName");
    static ref MAX_SCALE: Regex = tag_block("MaxScaleDenominator");
    static ref COMPARISON: Regex = Regex::new(
        r"(?s)<(?:[\w.\-]+:)?PropertyIs(GreaterThanOrEqualTo|LessThanOrEqualTo|LessThan|EqualTo)\b[^>]*>(.*?)</(?:[\w.\-]+:)?PropertyIs(?:GreaterThanOrEqualTo|LessThanOrEqualTo|LessThan|EqualTo)\s*>"
    ).unwrap();
    static ref FILL: Regex = Regex::new(
        r#"(?s)<(?:[\w.\-]+:)?(?:Css|Svg)Parameter\s+name\s*=\s*["']fill["'][^>]*>(.*?)</(?:[\w.\-]+:)?(?:Css|Svg)Parameter\s*>"#
    ).unwrap();
    static ref INTERPOLATE: Regex =
        Regex::new(r#"<(?:[\w.\-]+:)?Function\s+name\s*=\s*["']Interpolate["']"#).unwrap();
    static ref ANY_SYMBOLIZER: Regex =
        Regex::new(r"<(?:[\w.\-]+:)?(?:Point|Polygon|Line|Text|Raster)Symbolizer\b").unwrap();
    static ref POINT_SYMBOLIZER: Regex =
        Regex::new(r"<(?:[\w.\-]+:)?PointSymbolizer\b").unwrap();
    static ref AREA_SYMBOLIZER: Regex =
        Regex::new(r"<(?:[\w.\-]+:)?(?:Polygon|Line)Symbolizer\b").unwrap();
    static ref CDATA: Regex = Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap();
    static ref TAG: Regex = Regex::new(r"<[^>]*>").unwrap();
}

/// `<prefix:Name ...>content</prefix:Name>`, content in group 1
fn tag_block(name: &str) -> Regex {
    Regex::new(&format!(
        r"(?s)<(?:[\w.\-]+:)?{name}(?:\s[^>]*)?>(.*?)</(?:[\w.\-]+:)?{name}\s*>"
    ))
    .unwrap()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Geometry {
    Point,
    Polygon,
}

/// point size: fixed, or a linear ramp over one property
#[derive(Debug, Clone, PartialEq)]
pub enum Radius {
    Constant(f64),
    Interpolate { property: String, stops: [f64; 4] },
}

impl Radius {
    fn to_expression(&self) -> JsonValue {
        match self {
            Radius::Constant(r) => json!(r),
            Radius::Interpolate { property, stops } => json!([
                "interpolate",
                ["linear"],
                ["get", property],
                stops[0],
                stops[1],
                stops[2],
                stops[3]
            ]),
        }
    }
}

/// one rule as recovered from the raw text
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    pub title: String,
    pub color: String,
    pub equality: Option<Condition>,
    pub ranges: Vec<Condition>,
    pub radius: Radius,
    pub max_scale: Option<f64>,
}

impl CompiledRule {
    pub fn is_legend_only(&self) -> bool {
        self.max_scale
            .map(|s| s <= LEGEND_ONLY_MAX_SCALE)
            .unwrap_or(false)
    }

    fn legend_entry(&self) -> LegendEntry {
        LegendEntry {
            label: self.title.clone(),
            color: self.color.clone(),
        }
    }

    /// equality and range tests as a style filter expression
    fn filter_expression(&self) -> Option<JsonValue> {
        let mut tests: Vec<JsonValue> = self
            .equality
            .iter()
            .chain(self.ranges.iter())
            .map(comparison_expression)
            .collect();

        match tests.len() {
            0 => None,
            1 => tests.pop(),
            _ => {
                tests.insert(0, json!("all"));
                Some(JsonValue::Array(tests))
            }
        }
    }
}

/// where compiled layers read their tiles from
#[derive(Debug, Clone, PartialEq)]
pub struct StyleTarget {
    /// constituent name, also the source layer
    pub name: String,
    /// style source id
    pub source: String,
    /// tile archive reference
    pub url: String,
}

impl StyleTarget {
    pub fn new(name: impl Into<String>, source: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            url: url.into(),
        }
    }

    fn document(&self) -> StyleDocument {
        StyleDocument::new(&self.name).with_vector_source(&self.source, &self.url)
    }

    fn layer(&self, suffix: &str, kind: &str) -> Layer {
        Layer::new(format!("{}-{}", self.name, suffix), kind).with_source(&self.source, &self.name)
    }
}

/// everything the heuristic pass recovered from one document
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub geometry: Geometry,
    /// both point and area symbolizers occur; the point flag wins
    pub mixed_geometry: bool,
    pub rules: Vec<CompiledRule>,
}

impl Analysis {
    /// every extracted rule in document order, legend-only ones included
    pub fn legend(&self) -> Vec<LegendEntry> {
        self.rules.iter().map(CompiledRule::legend_entry).collect()
    }

    pub fn renderable(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter().filter(|r| !r.is_legend_only())
    }

    /// compile into a style, `None` when no rule is renderable
    pub fn to_style(&self, target: &StyleTarget) -> Option<StyleDocument> {
        if self.renderable().next().is_none() {
            return None;
        }
        let legend = json!(self.legend());

        let mut doc = target.document();
        match self.geometry {
            Geometry::Point => {
                for (index, rule) in self.rules.iter().enumerate() {
                    if rule.is_legend_only() {
                        debug!(title = %rule.title, "legend-only rule, not rendered");
                        continue;
                    }
                    doc.layers.push(
                        target
                            .layer(&index.to_string(), "circle")
                            .with_filter(rule.filter_expression())
                            .with_paint("circle-radius", rule.radius.to_expression())
                            .with_paint("circle-color", json!(rule.color))
                            .with_paint("circle-opacity", json!(CIRCLE_OPACITY))
                            .with_paint("circle-stroke-color", json!(CIRCLE_STROKE_COLOR))
                            .with_paint("circle-stroke-width", json!(CIRCLE_STROKE_WIDTH))
                            .with_metadata("label", json!(rule.title))
                            .with_metadata("legend", legend.clone()),
                    );
                }
            }
            Geometry::Polygon => {
                doc.layers.push(
                    target
                        .layer("fill", "fill")
                        .with_paint("fill-color", self.fill_color())
                        .with_paint("fill-opacity", json!(FILL_OPACITY))
                        .with_metadata("legend", legend.clone()),
                );
                doc.layers.push(outline_layer(target).with_metadata("legend", legend));
            }
        }

        Some(doc)
    }

    /// equality property shared by the most renderable rules, ties to the first seen
    pub fn classification_property(&self) -> Option<&str> {
        let mut groups: Vec<(&str, usize)> = Vec::new();
        for eq in self.renderable().filter_map(|r| r.equality.as_ref()) {
            match groups.iter_mut().find(|(p, _)| *p == eq.property) {
                Some((_, count)) => *count += 1,
                None => groups.push((eq.property.as_str(), 1)),
            }
        }
        // max_by_key keeps the last maximum, so walk backwards
        groups.into_iter().rev().max_by_key(|(_, count)| *count).map(|(p, _)| p)
    }

    /// `match` lookup from class value to rule color
    ///
    /// every label shares one type: integers when each class value is an
    /// integer, strings otherwise.
    fn fill_color(&self) -> JsonValue {
        let Some(property) = self.classification_property() else {
            let color = self
                .renderable()
                .next()
                .map(|r| r.color.as_str())
                .unwrap_or(DEFAULT_FILL);
            return json!(color);
        };

        let mut seen = HashSet::new();
        let classes: Vec<(&str, &str)> = self
            .renderable()
            .filter_map(|rule| {
                let eq = rule.equality.as_ref().filter(|eq| eq.property == property)?;
                Some((eq.value.as_str(), rule.color.as_str()))
            })
            .filter(|(value, _)| seen.insert(*value))
            .collect();

        let integers: Option<Vec<i64>> = classes
            .iter()
            .map(|(value, _)| integer_literal(value))
            .collect();

        let mut expr = vec![json!("match"), json!(["get", property])];
        match integers {
            Some(labels) => {
                for (label, (_, color)) in labels.into_iter().zip(&classes) {
                    expr.push(json!(label));
                    expr.push(json!(color));
                }
            }
            None => {
                for (value, color) in &classes {
                    expr.push(json!(value));
                    expr.push(json!(color));
                }
            }
        }
        expr.push(json!(DEFAULT_FILL));
        JsonValue::Array(expr)
    }
}

/// document-wide geometry flag
pub fn detect_geometry(text: &str) -> Geometry {
    if POINT_SYMBOLIZER.is_match(text) {
        Geometry::Point
    } else {
        Geometry::Polygon
    }
}

/// recover geometry and rules from raw legacy text
pub fn analyze(text: &str) -> Analysis {
    let geometry = detect_geometry(text);
    let mixed_geometry = geometry == Geometry::Point && AREA_SYMBOLIZER.is_match(text);
    if mixed_geometry {
        warn!("legacy document mixes point and area symbolizers; styling every rule as points");
    }

    let rules = RULE
        .captures_iter(text)
        .filter_map(|caps| compile_rule(&caps[1], geometry))
        .collect();

    Analysis {
        geometry,
        mixed_geometry,
        rules,
    }
}

/// heuristic compile straight from text, `None` when nothing renders
pub fn compile(text: &str, target: &StyleTarget) -> Option<StyleDocument> {
    analyze(text).to_style(target)
}

/// the fixed style used when nothing could be recovered
pub fn default_style(geometry: Geometry, target: &StyleTarget, legend: &[LegendEntry]) -> StyleDocument {
    let mut doc = target.document();

    match geometry {
        Geometry::Polygon => {
            doc.layers.push(
                target
                    .layer("fill", "fill")
                    .with_paint("fill-color", json!(DEFAULT_STYLE_COLOR))
                    .with_paint("fill-opacity", json!(FILL_OPACITY)),
            );
            doc.layers.push(outline_layer(target));
        }
        Geometry::Point => {
            doc.layers.push(
                target
                    .layer("circle", "circle")
                    .with_paint("circle-color", json!(DEFAULT_STYLE_COLOR))
                    .with_paint("circle-radius", json!(DEFAULT_RADIUS))
                    .with_paint("circle-stroke-color", json!(OUTLINE_COLOR))
                    .with_paint("circle-stroke-width", json!(OUTLINE_WIDTH)),
            );
        }
    }

    if !legend.is_empty() {
        let legend = json!(legend);
        for layer in &mut doc.layers {
            layer.set_metadata("legend", legend.clone());
        }
    }

    doc
}

fn outline_layer(target: &StyleTarget) -> Layer {
    target
        .layer("outline", "line")
        .with_paint("line-color", json!(OUTLINE_COLOR))
        .with_paint("line-width", json!(OUTLINE_WIDTH))
}

fn compile_rule(body: &str, geometry: Geometry) -> Option<CompiledRule> {
    if !ANY_SYMBOLIZER.is_match(body) {
        debug!("skipping rule without a symbolizer");
        return None;
    }

    let title = first_text(&TITLE, body).or_else(|| first_text(&NAME, body))?;
    if title.to_lowercase().contains("no legend") {
        debug!(title = %title, "skipping no-legend placeholder rule");
        return None;
    }

    let color = FILL
        .captures(body)
        .map(|caps| clean_text(&caps[1]))
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_FILL.to_string());

    let (equality, ranges) = comparisons(body);

    let radius = match geometry {
        Geometry::Point => size_ramp(body).unwrap_or(Radius::Constant(DEFAULT_RADIUS)),
        Geometry::Polygon => Radius::Constant(DEFAULT_RADIUS),
    };

    let max_scale = first_text(&MAX_SCALE, body).and_then(|s| s.parse::<f64>().ok());

    Some(CompiledRule {
        title,
        color,
        equality,
        ranges,
        radius,
        max_scale,
    })
}

/// the first usable equality, else every numeric range test
fn comparisons(body: &str) -> (Option<Condition>, Vec<Condition>) {
    let mut equality = None;
    let mut ranges = Vec::new();

    for caps in COMPARISON.captures_iter(body) {
        let inner = &caps[2];
        let (Some(property), Some(literal)) =
            (first_text(&PROPERTY_NAME, inner), first_text(&LITERAL, inner))
        else {
            continue;
        };

        match &caps[1] {
            "EqualTo" => {
                if equality.is_none() {
                    equality = Some(Condition::eq(property, normalize_literal(&literal)));
                }
            }
            op => {
                let Some(op) = CompareOp::parse(&format!("PropertyIs{}", op)) else {
                    continue;
                };
                match literal.parse::<f64>() {
                    Ok(n) if n.is_finite() => {
                        ranges.push(Condition::new(property, op, normalize_number(n)))
                    }
                    _ => debug!(literal = %literal, "dropping non-numeric range bound"),
                }
            }
        }
    }

    match equality {
        Some(eq) => (Some(eq), Vec::new()),
        None => (None, ranges),
    }
}

/// `Interpolate` inside `Size` with a property and four numeric literals
fn size_ramp(body: &str) -> Option<Radius> {
    let size = SIZE.captures(body)?;
    let size = &size[1];
    if !INTERPOLATE.is_match(size) {
        return None;
    }

    let property = first_text(&PROPERTY_NAME, size)?;
    let numbers: Vec<f64> = LITERAL
        .captures_iter(size)
        .filter_map(|caps| clean_text(&caps[1]).parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .take(4)
        .collect();

    match numbers.as_slice() {
        [x0, y0, x1, y1] => Some(Radius::Interpolate {
            property,
            stops: [*x0, *y0, *x1, *y1],
        }),
        _ => {
            debug!(property = %property, "incomplete size ramp, using constant radius");
            None
        }
    }
}

fn first_text(re: &Regex, haystack: &str) -> Option<String> {
    re.captures_iter(haystack)
        .map(|caps| clean_text(&caps[1]))
        .find(|s| !s.is_empty())
}

/// unwrap CDATA, drop nested tags, decode entities, trim
fn clean_text(raw: &str) -> String {
    let unwrapped = CDATA.replace_all(raw, "$1");
    let untagged = TAG.replace_all(&unwrapped, "");
    decode_entities(untagged.trim()).trim().to_string()
}

fn comparison_expression(condition: &Condition) -> JsonValue {
    json!([
        condition.op.as_str(),
        ["get", condition.property],
        typed_literal(&condition.value)
    ])
}

/// plain decimal values go into expressions as numbers, codes like `007` stay text
fn typed_literal(value: &str) -> JsonValue {
    if !is_canonical_number(value) {
        return json!(value);
    }
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => json!(n),
        _ => json!(value),
    }
}

fn integer_literal(value: &str) -> Option<i64> {
    if is_canonical_number(value) {
        value.parse().ok()
    } else {
        None
    }
}
