//! label injector - copies legacy rule titles onto matching style layers

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use super::types::StyleDocument;
use crate::filters::{extract_conditions, select_rule, StyleRule};

/// the only entities recognized in legacy titles
const ENTITIES: [(&str, char); 5] = [
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&amp;", '&'),
    ("&quot;", '"'),
    ("&#39;", '\''),
];

/// decode the five fixed character entities in one left-to-right pass
///
/// unknown entities are left as-is, and a decoded `&` never combines with
/// the text after it (`&amp;lt;` decodes to `&lt;`, not `<`).
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
            Some((entity, ch)) => {
                out.push(*ch);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// what a labelling pass did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelReport {
    /// number of layers that received a label
    pub labelled: usize,
    /// ids of layers no rule matched
    pub unmatched: Vec<String>,
}

/// label every layer with the title of the first rule whose conditions match
///
/// only `metadata.label` is written; layers without a matching rule are not
/// touched at all.
pub fn inject_labels(document: &mut StyleDocument, rules: &[StyleRule]) -> LabelReport {
    let mut report = LabelReport::default();

    for layer in &mut document.layers {
        let conditions = extract_conditions(layer.filter.as_ref());

        match select_rule(rules, &conditions) {
            Some(rule) => {
                let label = decode_entities(&rule.title);
                debug!(layer = %layer.id, label = %label, "labelled layer");
                layer.set_metadata("label", JsonValue::String(label));
                report.labelled += 1;
            }
            None => {
                debug!(layer = %layer.id, "no legacy rule matches layer");
                report.unmatched.push(layer.id.clone());
            }
        }
    }

    report
}
