//! per-constituent style production and the combined build
//!
//! every constituent runs its own producer chain; one constituent failing
//! never affects another. the merge always follows configured order, even
//! when constituents are produced in parallel.

mod producer;
mod translator;

pub use producer::{
    run_chain, standard_chain, ChainResult, Declined, DefaultProducer, HeuristicProducer, Outcome,
    PrimaryProducer, Producer, ProducerInput, Production, Tier,
};
pub use translator::{CommandTranslator, StyleFile, StyleTranslator};

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ConvertError;
use crate::style::{merge, Constituent, MergeTarget, StyleDocument, StyleTarget, ZoomRange};

lazy_static::lazy_static! {
    static ref DESCRIPTOR_ROOT: Regex =
        Regex::new(r"<(?:[\w.\-]+:)?StyledLayerDescriptor\b").unwrap();
}

/// one named layer to produce a style for
#[derive(Debug, Clone)]
pub struct ConstituentJob {
    pub name: String,
    pub legacy: PathBuf,
    /// pre-translated style used instead of the configured translator
    pub style: Option<PathBuf>,
    pub min_zoom: Option<u8>,
    pub max_zoom: Option<u8>,
}

impl ConstituentJob {
    pub fn new(name: impl Into<String>, legacy: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            legacy: legacy.into(),
            style: None,
            min_zoom: None,
            max_zoom: None,
        }
    }
}

/// what happened to one constituent
#[derive(Debug, Clone, Serialize)]
pub struct ConstituentReport {
    pub name: String,
    pub tier: Tier,
    pub rules: usize,
    pub layers: usize,
    pub labelled: usize,
    pub mixed_geometry: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub declined: Vec<Declined>,
}

/// summary written next to a combined build
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub name: String,
    pub generated_at: DateTime<Utc>,
    pub zoom: ZoomRange,
    pub constituents: Vec<ConstituentReport>,
}

/// read a legacy document, rejecting anything that is not an SLD at all
pub fn load_legacy(path: &Path) -> Result<String, ConvertError> {
    let text = fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
    if !DESCRIPTOR_ROOT.is_match(&text) {
        return Err(ConvertError::Unsupported {
            path: path.to_path_buf(),
        });
    }
    Ok(text)
}

/// run the producer chain for one constituent
///
/// a pre-translated style on the job takes precedence over `translator`.
pub fn produce(
    job: &ConstituentJob,
    legacy_text: &str,
    target: &StyleTarget,
    translator: Option<&dyn StyleTranslator>,
) -> (StyleDocument, ConstituentReport) {
    let style_file = job.style.as_ref().map(StyleFile::new);
    let translator = match &style_file {
        Some(file) => Some(file as &dyn StyleTranslator),
        None => translator,
    };

    let input = ProducerInput {
        legacy_path: &job.legacy,
        legacy_text,
        target,
    };
    finish(job, standard_chain(&input, translator))
}

/// default style for a constituent whose document could not be used
///
/// the primary and heuristic tiers are recorded as declined with `reason`.
pub fn produce_rejected(
    job: &ConstituentJob,
    reason: &str,
    target: &StyleTarget,
) -> (StyleDocument, ConstituentReport) {
    let input = ProducerInput {
        legacy_path: &job.legacy,
        legacy_text: "",
        target,
    };
    let mut result = run_chain(&[&DefaultProducer], &input);
    let mut declined: Vec<Declined> = [Tier::Primary, Tier::Heuristic]
        .into_iter()
        .map(|tier| Declined {
            tier,
            reason: reason.to_string(),
        })
        .collect();
    declined.append(&mut result.declined);
    result.declined = declined;
    finish(job, result)
}

fn finish(job: &ConstituentJob, result: ChainResult) -> (StyleDocument, ConstituentReport) {
    let ChainResult {
        tier,
        production,
        declined,
    } = result;

    let report = ConstituentReport {
        name: job.name.clone(),
        tier,
        rules: production.rules,
        layers: production.style.layers.len(),
        labelled: production.labelled,
        mixed_geometry: production.mixed_geometry,
        declined,
    };
    (production.style, report)
}

/// a single constituent as a complete style with its own source
pub fn convert(
    job: &ConstituentJob,
    target: &MergeTarget,
    translator: Option<&dyn StyleTranslator>,
) -> Result<(StyleDocument, ConstituentReport), ConvertError> {
    let text = load_legacy(&job.legacy)?;
    let style_target = StyleTarget::new(&job.name, &target.source, &target.url);
    let (style, report) = produce(job, &text, &style_target, translator);

    let (style, _) = merge(
        target,
        vec![Constituent {
            name: job.name.clone(),
            style,
            min_zoom: job.min_zoom,
            max_zoom: job.max_zoom,
        }],
    );
    Ok((style, report))
}

/// produce every constituent and merge them into one style
///
/// a constituent whose document is unreadable or not an SLD gets the
/// default style and its siblings are unaffected. the run fails only when
/// no constituent has a usable document.
pub fn build(
    jobs: &[ConstituentJob],
    target: &MergeTarget,
    translator: Option<&dyn StyleTranslator>,
    parallel: bool,
) -> Result<(StyleDocument, BuildReport), ConvertError> {
    let mut inputs: Vec<Result<String, String>> = Vec::with_capacity(jobs.len());
    let mut first_error = None;
    for job in jobs {
        match load_legacy(&job.legacy) {
            Ok(text) => inputs.push(Ok(text)),
            Err(e) => {
                warn!(constituent = %job.name, "{}; using the default style", e);
                inputs.push(Err(e.to_string()));
                first_error.get_or_insert(e);
            }
        }
    }
    if let Some(error) = first_error {
        if inputs.iter().all(Result::is_err) {
            return Err(error);
        }
    }

    let run = |job: &ConstituentJob, input: &Result<String, String>| {
        let style_target = StyleTarget::new(&job.name, &target.source, &target.url);
        match input {
            Ok(text) => produce(job, text, &style_target, translator),
            Err(reason) => produce_rejected(job, reason, &style_target),
        }
    };

    let produced: Vec<(StyleDocument, ConstituentReport)> = if parallel && jobs.len() > 1 {
        thread::scope(|scope| {
            let handles: Vec<_> = jobs
                .iter()
                .zip(&inputs)
                .map(|(job, input)| scope.spawn(move || run(job, input)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        })
    } else {
        jobs.iter()
            .zip(&inputs)
            .map(|(job, input)| run(job, input))
            .collect()
    };

    let mut constituents = Vec::with_capacity(jobs.len());
    let mut reports = Vec::with_capacity(jobs.len());
    for (job, (style, report)) in jobs.iter().zip(produced) {
        constituents.push(Constituent {
            name: job.name.clone(),
            style,
            min_zoom: job.min_zoom,
            max_zoom: job.max_zoom,
        });
        reports.push(report);
    }

    let (style, zoom) = merge(target, constituents);
    info!(
        layers = style.layers.len(),
        min_zoom = zoom.min,
        max_zoom = zoom.max,
        "merged combined style"
    );

    let report = BuildReport {
        name: target.name.clone(),
        generated_at: Utc::now(),
        zoom,
        constituents: reports,
    };
    Ok((style, report))
}
