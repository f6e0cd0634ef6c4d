//! canonical filter conditions shared by the legacy and declarative sides
//!
//! - `legacy`: SLD rules -> titled condition sets
//! - `target`: style layer filter expressions -> condition sets
//! - `matcher`: subset matching and first-rule selection

mod legacy;
mod matcher;
mod target;
mod types;

pub use legacy::{extract_rules, try_extract_rules};
pub use matcher::{matches, select_rule};
pub use target::{extract_conditions, filter_shape};
pub use types::{
    is_canonical_number, normalize_literal, normalize_number, CompareOp, Condition, FilterShape,
    StyleRule,
};
