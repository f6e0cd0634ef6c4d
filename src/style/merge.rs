//! multi-layer merge - one combined style from per-constituent fragments

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use super::types::{Source, StyleDocument};

/// a zoom interval, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoomRange {
    pub min: u8,
    pub max: u8,
}

impl ZoomRange {
    pub fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    /// widest range covering every configured bound
    ///
    /// unset bounds do not take part; a side nobody configured falls back
    /// to `default`. a result with `min > max` is collapsed onto `min`.
    pub fn unified<I>(bounds: I, default: ZoomRange) -> Self
    where
        I: IntoIterator<Item = (Option<u8>, Option<u8>)>,
    {
        let mut min: Option<u8> = None;
        let mut max: Option<u8> = None;

        for (lo, hi) in bounds {
            if let Some(lo) = lo {
                min = Some(min.map_or(lo, |m| m.min(lo)));
            }
            if let Some(hi) = hi {
                max = Some(max.map_or(hi, |m| m.max(hi)));
            }
        }

        let min = min.unwrap_or(default.min);
        let max = max.unwrap_or(default.max).max(min);
        Self { min, max }
    }
}

/// one named layer's finished style fragment
#[derive(Debug, Clone)]
pub struct Constituent {
    pub name: String,
    pub style: StyleDocument,
    pub min_zoom: Option<u8>,
    pub max_zoom: Option<u8>,
}

/// the combined document's identity
#[derive(Debug, Clone)]
pub struct MergeTarget {
    pub name: String,
    pub source: String,
    pub url: String,
    pub default_zoom: ZoomRange,
}

/// concatenate constituent layers in order, all reading one vector source
///
/// each layer's `source` becomes the shared source and its `source-layer`
/// the constituent's name. ids already taken by an earlier constituent get
/// the constituent name as a prefix.
pub fn merge(target: &MergeTarget, constituents: Vec<Constituent>) -> (StyleDocument, ZoomRange) {
    let zoom = ZoomRange::unified(
        constituents.iter().map(|c| (c.min_zoom, c.max_zoom)),
        target.default_zoom,
    );

    let mut source = Source::vector(&target.url);
    source.minzoom = Some(zoom.min);
    source.maxzoom = Some(zoom.max);

    let mut merged = StyleDocument::new(&target.name);
    merged.sources.insert(target.source.clone(), source);

    let mut ids = HashSet::new();
    for constituent in constituents {
        let Constituent { name, style, .. } = constituent;

        for (key, value) in style.extra {
            merged.extra.entry(key).or_insert(value);
        }

        for mut layer in style.layers {
            layer.source = Some(target.source.clone());
            layer.source_layer = Some(name.clone());

            if !ids.insert(layer.id.clone()) {
                let renamed = format!("{}-{}", name, layer.id);
                debug!(from = %layer.id, to = %renamed, "renaming colliding layer id");
                ids.insert(renamed.clone());
                layer.id = renamed;
            }
            merged.layers.push(layer);
        }
    }

    (merged, zoom)
}
