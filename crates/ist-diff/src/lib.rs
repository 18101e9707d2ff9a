//! Spec diff for the image stream tag engine.
//!
//! Compares two versions of a stream's `spec.tags` map. Tag references are
//! compared by their *effective* source (kind, namespace defaulted to the
//! owning stream's, name), so cosmetic edits such as spelling out the owning
//! namespace do not count as retargeting.
//!
//! # Key Types
//!
//! - [`SpecDiff`] / [`TagRefChange`] -- per-tag changes between two reference maps
//! - [`EffectiveReference`] -- the normalized source of a tag reference

pub mod spec_diff;

pub use spec_diff::{diff_tag_references, tag_ref_changed, EffectiveReference, SpecDiff, TagRefChange};
