//! rule extractor - turns an SLD document into an ordered list of titled rules
//!
//! element names are compared by local name only, so `sld:Rule`, `se:Rule`
//! and `Rule` are the same thing. documents that use a prefix without
//! declaring it get a second, relaxed parse with the prefixes stripped.

use regex::Regex;
use roxmltree::{Document, Node, ParsingOptions};
use tracing::{debug, warn};

use super::types::{normalize_literal, Condition, FilterShape, StyleRule};

/// extract every titled rule in document order
///
/// an unparseable document is logged and yields no rules; the caller falls
/// through to the heuristic compiler in that case.
pub fn extract_rules(text: &str) -> Vec<StyleRule> {
    match try_extract_rules(text) {
        Ok(rules) => rules,
        Err(e) => {
            warn!("legacy document could not be parsed: {}", e);
            Vec::new()
        }
    }
}

/// like [`extract_rules`] but surfaces the parse error
pub fn try_extract_rules(text: &str) -> Result<Vec<StyleRule>, roxmltree::Error> {
    match parse(text) {
        Ok(doc) => Ok(rules_from_document(&doc)),
        Err(strict) => {
            let relaxed = strip_prefixes(text);
            match parse(&relaxed) {
                Ok(doc) => {
                    debug!("parsed legacy document after stripping namespace prefixes");
                    Ok(rules_from_document(&doc))
                }
                Err(_) => Err(strict),
            }
        }
    }
}

fn parse(text: &str) -> Result<Document<'_>, roxmltree::Error> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(text, options)
}

lazy_static::lazy_static! {
    static ref ELEMENT_PREFIX: Regex = Regex::new(r"(</?)[A-Za-z_][\w.\-]*:").unwrap();
    static ref PREFIXED_ATTRIBUTE: Regex =
        Regex::new(r#"\s[A-Za-z_][\w.\-]*:[A-Za-z_][\w.\-]*\s*=\s*("[^"]*"|'[^']*')"#).unwrap();
}

/// drop element-name prefixes and prefixed attributes
fn strip_prefixes(text: &str) -> String {
    let text = ELEMENT_PREFIX.replace_all(text, "$1");
    PREFIXED_ATTRIBUTE.replace_all(&text, "").into_owned()
}

fn rules_from_document(doc: &Document<'_>) -> Vec<StyleRule> {
    let mut rules = Vec::new();

    for style in doc
        .descendants()
        .filter(|n| is_named(n, "UserStyle"))
    {
        for fts in children_named(style, "FeatureTypeStyle") {
            for rule in children_named(fts, "Rule") {
                match resolve_title(rule, style) {
                    Some(title) => {
                        let conditions = rule_shape(rule).into_conditions();
                        debug!(title = %title, conditions = conditions.len(), "extracted rule");
                        rules.push(StyleRule::new(title, conditions));
                    }
                    None => debug!("dropping rule without a resolvable title"),
                }
            }
        }
    }

    rules
}

/// rule title -> rule name -> style title -> style name
fn resolve_title(rule: Node<'_, '_>, style: Node<'_, '_>) -> Option<String> {
    title_of(rule)
        .or_else(|| name_of(rule))
        .or_else(|| title_of(style))
        .or_else(|| name_of(style))
}

fn title_of(node: Node<'_, '_>) -> Option<String> {
    children_named(node, "Title")
        .chain(
            children_named(node, "Description").flat_map(|d| children_named(d, "Title")),
        )
        .find_map(non_blank_text)
}

fn name_of(node: Node<'_, '_>) -> Option<String> {
    children_named(node, "Name").find_map(non_blank_text)
}

fn rule_shape(rule: Node<'_, '_>) -> FilterShape {
    let Some(filter) = children_named(rule, "Filter").next() else {
        return FilterShape::Unsupported;
    };
    let Some(root) = filter.children().find(|n| n.is_element()) else {
        return FilterShape::Unsupported;
    };

    match root.tag_name().name() {
        "PropertyIsEqualTo" => equality(root)
            .map(FilterShape::Equality)
            .unwrap_or(FilterShape::Unsupported),
        "And" => FilterShape::Conjunction(equality_children(root)),
        "Or" => FilterShape::Disjunction(equality_children(root)),
        other => {
            debug!(operator = other, "unsupported legacy filter");
            FilterShape::Unsupported
        }
    }
}

/// immediate `PropertyIsEqualTo` children only; nested and/or are skipped
fn equality_children(node: Node<'_, '_>) -> Vec<Condition> {
    children_named(node, "PropertyIsEqualTo")
        .filter_map(equality)
        .collect()
}

fn equality(node: Node<'_, '_>) -> Option<Condition> {
    let property = children_named(node, "PropertyName").find_map(non_blank_text)?;
    let literal = children_named(node, "Literal").next().map(text_content)?;
    Some(Condition::eq(property, normalize_literal(&literal)))
}

fn is_named(node: &Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

fn children_named<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |n| is_named(n, name))
}

fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

fn non_blank_text(node: Node<'_, '_>) -> Option<String> {
    let text = text_content(node);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
