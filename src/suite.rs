//! Dataset assembly: templates + fillers -> resolved test suites.
//!
//! Orchestrates the sampling stage over many compiled template tables.
//! Slot transforms (renames and added restrictions) are compiled once from
//! their declarative spec string and applied to every text column before
//! sampling; the post-filter regex prunes resolved rows by `ItemTags`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use regex::Regex;
use tracing::{info, warn};

use crate::error::{Result, TelarError};
use crate::filler::FillerTable;
use crate::sampler::{resolve_template, SampleOptions};
use crate::slots::{find_slot_keys, SlotKey};
use crate::table::{Table, TEMPLATE_COLUMNS, TEXT_COLUMNS};

/// One compiled slot transform from a `source->target` spec entry.
///
/// When `target` extends `source` the transform appends the extension as an
/// extra restriction (`agent->agent:sex=nonbinary`); otherwise it renames
/// the slot base, dropping restrictions and recording provenance
/// (`agent->profession` yields `profession_from_agent1`).
#[derive(Debug, Clone)]
pub enum SlotTransform {
    /// Append a constraint suffix to every matching slot.
    Restrict {
        /// Matches the brace contents of affected slots.
        pattern: Regex,
        /// Suffix appended before the closing brace, e.g. `:sex=nonbinary`.
        suffix: String,
    },
    /// Rename the slot base, dropping restrictions.
    Rename {
        /// Matches the brace contents of affected slots.
        pattern: Regex,
        /// Original base name.
        source: String,
        /// Replacement base name.
        target: String,
    },
}

impl SlotTransform {
    /// Apply this transform to one text column value.
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        match self {
            Self::Restrict { pattern, suffix } => pattern
                .replace_all(text, |caps: &regex::Captures<'_>| {
                    format!("{{{}{suffix}}}", &caps[1])
                })
                .into_owned(),
            Self::Rename {
                pattern,
                source,
                target,
            } => pattern
                .replace_all(text, |caps: &regex::Captures<'_>| {
                    let digits: String = caps[1]
                        .chars()
                        .skip_while(|c| !c.is_ascii_digit())
                        .take_while(char::is_ascii_digit)
                        .collect();
                    format!("{{{target}_from_{source}{digits}}}")
                })
                .into_owned(),
        }
    }
}

/// Compile a comma-separated transform spec (`agent->profession,...`).
///
/// # Errors
///
/// Returns a parse error on a malformed entry.
pub fn compile_slot_transforms(spec: &str) -> Result<Vec<SlotTransform>> {
    let mut transforms = Vec::new();
    for entry in spec.split(',') {
        if entry.is_empty() {
            continue;
        }
        let (source, target) = entry.split_once("->").ok_or_else(|| {
            TelarError::parse(format!("slot transform `{entry}` is not `source->target`"))
        })?;
        let pattern = Regex::new(&format!(r"\{{({}[^}}]*)\}}", regex::escape(source)))
            .map_err(|e| TelarError::parse(format!("slot transform `{entry}`: {e}")))?;
        if target.contains(source) {
            transforms.push(SlotTransform::Restrict {
                pattern,
                suffix: target.replacen(source, "", 1),
            });
        } else {
            transforms.push(SlotTransform::Rename {
                pattern,
                source: source.to_string(),
                target: target.to_string(),
            });
        }
    }
    Ok(transforms)
}

/// Apply transforms to every text column of a template table.
pub fn apply_slot_transforms(table: &mut Table, transforms: &[SlotTransform]) {
    if transforms.is_empty() {
        return;
    }
    for row in table.rows_mut() {
        for col in TEXT_COLUMNS {
            let mut text = row.get_or_empty(col).to_string();
            for transform in transforms {
                text = transform.apply(&text);
            }
            row.set(col, text);
        }
    }
}

/// Compile the `ItemTags` post-filter; an empty pattern keeps everything.
///
/// # Errors
///
/// Returns a parse error on an invalid regular expression.
pub fn compile_filter(pattern: &str) -> Result<Option<Regex>> {
    if pattern.is_empty() {
        return Ok(None);
    }
    Regex::new(pattern)
        .map(Some)
        .map_err(|e| TelarError::parse(format!("invalid filter pattern `{pattern}`: {e}")))
}

/// Full slot keys a template references across all of its rows.
#[must_use]
pub fn required_slot_keys(template: &Table) -> BTreeSet<String> {
    template
        .rows()
        .iter()
        .flat_map(|row| find_slot_keys(&row.joined_text()))
        .collect()
}

/// A compiled dataset: one resolved suite per surviving template, plus the
/// errors that excluded templates along the way.
#[derive(Debug)]
pub struct Dataset {
    /// Resolved test-suite tables.
    pub suites: Vec<Table>,
    /// Per-template failures (missing fillers, key mismatches).
    pub errors: Vec<TelarError>,
}

impl Dataset {
    /// Resolve every template against the filler lexicons.
    ///
    /// `fillers_by_base` is keyed by slot base name (`agent`); each
    /// template's full slot keys are resolved to bases to pick the backing
    /// table. A template whose fillers are missing is skipped and its error
    /// collected; a template emptied by the filter is skipped with a
    /// warning; every other failure mode degrades per row inside the
    /// sampler. Each template gets a fresh sampler context.
    #[must_use]
    pub fn compile(
        templates: Vec<Table>,
        fillers_by_base: &BTreeMap<String, FillerTable>,
        options: &SampleOptions,
        transforms: &[SlotTransform],
        filter: Option<&Regex>,
    ) -> Self {
        let mut suites = Vec::new();
        let mut errors = Vec::new();

        for mut template in templates {
            if let Err(e) = template.require_columns(&TEMPLATE_COLUMNS) {
                errors.push(e);
                continue;
            }
            apply_slot_transforms(&mut template, transforms);

            match Self::fillers_for(&template, fillers_by_base) {
                Ok(fillers) => match resolve_template(&template, &fillers, options, filter) {
                    Ok(Some(suite)) => {
                        info!(
                            suite = suite.identifier(),
                            rows = suite.len(),
                            "test suite resolved"
                        );
                        suites.push(suite);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(template = template.identifier(), %e, "skipping template");
                        errors.push(e);
                    }
                },
                Err(e) => {
                    warn!(template = template.identifier(), %e, "skipping template");
                    errors.push(e);
                }
            }
        }
        Self { suites, errors }
    }

    fn fillers_for<'a>(
        template: &Table,
        fillers_by_base: &'a BTreeMap<String, FillerTable>,
    ) -> Result<HashMap<String, &'a FillerTable>> {
        let mut fillers = HashMap::new();
        for key_raw in required_slot_keys(template) {
            let key = SlotKey::parse(&key_raw)?;
            let table = fillers_by_base.get(&key.base).ok_or_else(|| {
                TelarError::specification(format!(
                    "filler table not found for slot `{key_raw}`; expected base `{}`",
                    key.base
                ))
            })?;
            fillers.insert(key_raw, table);
        }
        Ok(fillers)
    }
}
