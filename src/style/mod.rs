//! declarative style documents: model, labelling, fallback compiler, merge

pub mod fallback;
mod label;
mod merge;
mod types;

pub use fallback::{analyze, compile, default_style, detect_geometry, Analysis, Geometry, StyleTarget};
pub use label::{decode_entities, inject_labels, LabelReport};
pub use merge::{merge, Constituent, MergeTarget, ZoomRange};
pub use types::{Layer, LegendEntry, Source, StyleDocument, STYLE_VERSION};
