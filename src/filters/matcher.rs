//! filter matcher - decides which legacy rule describes a target layer
//!
//! matching is by filter content, never by position: a rule applies to a
//! layer when every one of its conditions is present on the layer.

use super::types::{Condition, StyleRule};

/// does a rule's condition set `rule` hold for a layer's condition set `layer`
///
/// an empty set only matches another empty set. otherwise `rule` must be a
/// subset of `layer`; extra conditions on the layer never break a match.
pub fn matches(rule: &[Condition], layer: &[Condition]) -> bool {
    match (rule.is_empty(), layer.is_empty()) {
        (true, true) => true,
        (true, false) | (false, true) => false,
        (false, false) => rule
            .iter()
            .all(|wanted| layer.iter().any(|have| wanted.same_test(have))),
    }
}

/// first rule in document order whose conditions match the layer
pub fn select_rule<'a>(rules: &'a [StyleRule], layer: &[Condition]) -> Option<&'a StyleRule> {
    rules.iter().find(|rule| matches(&rule.conditions, layer))
}
