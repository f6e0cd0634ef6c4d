//! the three-tier producer chain
//!
//! each tier either produces a complete style or declines with a reason;
//! the chain tries them in order and the fixed default never declines.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::translator::StyleTranslator;
use crate::filters::extract_rules;
use crate::style::{analyze, default_style, inject_labels, StyleDocument, StyleTarget};

/// which producer made a constituent's style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// external translator output, labelled from the legacy rules
    Primary,
    /// heuristic compile from the raw legacy text
    Heuristic,
    /// fixed default style
    Default,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Primary => write!(f, "primary"),
            Tier::Heuristic => write!(f, "heuristic"),
            Tier::Default => write!(f, "default"),
        }
    }
}

/// everything a producer may look at
#[derive(Debug, Clone, Copy)]
pub struct ProducerInput<'a> {
    pub legacy_path: &'a Path,
    pub legacy_text: &'a str,
    pub target: &'a StyleTarget,
}

/// a successfully produced style
#[derive(Debug, Clone)]
pub struct Production {
    pub style: StyleDocument,
    /// rules recognized in the legacy document
    pub rules: usize,
    /// layers carrying a label
    pub labelled: usize,
    pub mixed_geometry: bool,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Produced(Production),
    Declined(String),
}

pub trait Producer {
    fn tier(&self) -> Tier;
    fn produce(&self, input: &ProducerInput<'_>) -> Outcome;
}

/// external translator plus label injection
pub struct PrimaryProducer<'t> {
    translator: Option<&'t dyn StyleTranslator>,
}

impl<'t> PrimaryProducer<'t> {
    pub fn new(translator: Option<&'t dyn StyleTranslator>) -> Self {
        Self { translator }
    }
}

impl Producer for PrimaryProducer<'_> {
    fn tier(&self) -> Tier {
        Tier::Primary
    }

    fn produce(&self, input: &ProducerInput<'_>) -> Outcome {
        let Some(translator) = self.translator else {
            return Outcome::Declined("no translator configured".to_string());
        };

        let rules = extract_rules(input.legacy_text);
        if rules.is_empty() {
            return Outcome::Declined("no titled rules in legacy document".to_string());
        }

        match translator.translate(input.legacy_path) {
            Ok(mut style) => {
                let report = inject_labels(&mut style, &rules);
                if !report.unmatched.is_empty() {
                    debug!(unmatched = ?report.unmatched, "layers left without a label");
                }
                Outcome::Produced(Production {
                    style,
                    rules: rules.len(),
                    labelled: report.labelled,
                    mixed_geometry: false,
                })
            }
            Err(e) => Outcome::Declined(format!("{}: {}", translator.describe(), e)),
        }
    }
}

/// regex-based compile of the raw text
pub struct HeuristicProducer;

impl Producer for HeuristicProducer {
    fn tier(&self) -> Tier {
        Tier::Heuristic
    }

    fn produce(&self, input: &ProducerInput<'_>) -> Outcome {
        let analysis = analyze(input.legacy_text);
        match analysis.to_style(input.target) {
            Some(style) => Outcome::Produced(Production {
                labelled: style.layers.iter().filter(|l| l.label().is_some()).count(),
                style,
                rules: analysis.rules.len(),
                mixed_geometry: analysis.mixed_geometry,
            }),
            None => Outcome::Declined(format!(
                "no renderable rules ({} recognized)",
                analysis.rules.len()
            )),
        }
    }
}

/// fixed neutral style for the document's geometry
pub struct DefaultProducer;

impl DefaultProducer {
    fn build(input: &ProducerInput<'_>) -> Production {
        let analysis = analyze(input.legacy_text);
        Production {
            style: default_style(analysis.geometry, input.target, &analysis.legend()),
            rules: analysis.rules.len(),
            labelled: 0,
            mixed_geometry: analysis.mixed_geometry,
        }
    }
}

impl Producer for DefaultProducer {
    fn tier(&self) -> Tier {
        Tier::Default
    }

    fn produce(&self, input: &ProducerInput<'_>) -> Outcome {
        Outcome::Produced(Self::build(input))
    }
}

/// a tier that declined, and why
#[derive(Debug, Clone, Serialize)]
pub struct Declined {
    pub tier: Tier,
    pub reason: String,
}

/// result of running the chain for one constituent
#[derive(Debug, Clone)]
pub struct ChainResult {
    pub tier: Tier,
    pub production: Production,
    pub declined: Vec<Declined>,
}

/// try each producer in order until one produces
pub fn run_chain(producers: &[&dyn Producer], input: &ProducerInput<'_>) -> ChainResult {
    let mut declined = Vec::new();

    for producer in producers {
        match producer.produce(input) {
            Outcome::Produced(production) => {
                info!(
                    constituent = %input.target.name,
                    tier = %producer.tier(),
                    layers = production.style.layers.len(),
                    "style produced"
                );
                return ChainResult {
                    tier: producer.tier(),
                    production,
                    declined,
                };
            }
            Outcome::Declined(reason) => {
                warn!(
                    constituent = %input.target.name,
                    tier = %producer.tier(),
                    "{}",
                    reason
                );
                declined.push(Declined {
                    tier: producer.tier(),
                    reason,
                });
            }
        }
    }

    ChainResult {
        tier: Tier::Default,
        production: DefaultProducer::build(input),
        declined,
    }
}

/// primary -> heuristic -> default
pub fn standard_chain(input: &ProducerInput<'_>, translator: Option<&dyn StyleTranslator>) -> ChainResult {
    let primary = PrimaryProducer::new(translator);
    run_chain(&[&primary, &HeuristicProducer, &DefaultProducer], input)
}
