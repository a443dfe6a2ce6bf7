//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use telar::prelude::*;
//! ```

pub use crate::concept::{Concept, ConceptKind, ConceptSpec, NameList};
pub use crate::error::{Result, TelarError};
pub use crate::filler::{FillerItem, FillerTable};
pub use crate::metatemplate::{
    merge_context_target, CompileOutcome, MetaTemplateCompiler, MetaTemplateSpec,
    MetaTemplateUnit, ProbeSpec, SegmentSpec,
};
pub use crate::pattern::{Probe, StringOrSeq, Target, TargetSpec};
pub use crate::sampler::{resolve_template, SampleOptions};
pub use crate::suite::{compile_filter, compile_slot_transforms, Dataset, SlotTransform};
pub use crate::table::{Row, Table, CANARY, TEMPLATE_COLUMNS, TEXT_COLUMNS};
