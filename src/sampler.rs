//! Constraint-satisfaction filler sampling.
//!
//! Resolves every placeholder slot of a template row to a concrete filler
//! item, honoring per-slot constraints, in one of two modes:
//!
//! - **Fixed** (`fix_fillers`): one deterministic pick per slot key via a
//!   greedy skip list over the filler table's seed-42 order, skipping
//!   globally consumed item texts and the first `2 × version` eligible
//!   items, memoized so repeated slots reuse the same selection.
//! - **Cross-product**: the full Cartesian product of eligible items per
//!   row, shuffled with the RNG seeded by `version`, consuming up to
//!   `num_fillers` combinations with pairwise-distinct item texts.
//!
//! All mutable sampling state (consumed texts, memo, per-key-set caches)
//! lives in an explicit context created per invocation, so independent
//! compilation runs cannot contaminate each other.

use std::collections::{BTreeSet, HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use regex::Regex;
use tracing::{info, warn};

use crate::error::{Result, TelarError};
use crate::filler::{FillerItem, FillerTable};
use crate::slots::{find_slot_keys, SlotKey, MAGNET_ITEM};
use crate::table::{Row, Table, SUITE_EXTRA_COLUMNS, TEMPLATE_COLUMNS, TEXT_COLUMNS};

/// Seed of the run RNG in fixed mode.
pub const FIXED_MODE_SEED: u64 = 42;

/// Sampling configuration for one dataset compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleOptions {
    /// Substitution combinations requested per template row.
    pub num_fillers: usize,
    /// Fixed mode when `true`, cross-product mode otherwise.
    pub fix_fillers: bool,
    /// Dataset version: skip window in fixed mode, RNG seed in
    /// cross-product mode.
    pub version: u64,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            num_fillers: 1,
            fix_fillers: true,
            version: 0,
        }
    }
}

/// One resolved slot: the full slot key and the chosen item.
type Fill = (String, FillerItem);

/// Per-invocation sampling state, threaded explicitly through every pick.
///
/// The consumed-text set prevents one concrete item from serving two
/// different slots within a run; the memo makes fixed-mode picks stable
/// across rows; the key-set caches avoid recomputing picks and products for
/// recurring slot combinations. A fresh context is created per resolved
/// template, so none of this state leaks across runs.
#[derive(Debug)]
struct SamplerContext {
    rng: rand::rngs::StdRng,
    version: u64,
    consumed: HashSet<String>,
    memo: HashMap<String, FillerItem>,
    fixed_cache: HashMap<Vec<String>, Option<Vec<Fill>>>,
    product_cache: HashMap<Vec<String>, Vec<Vec<Fill>>>,
}

impl SamplerContext {
    /// Create a fresh context for one compilation run.
    fn new(options: &SampleOptions) -> Self {
        let seed = if options.fix_fillers {
            FIXED_MODE_SEED
        } else {
            options.version
        };
        let mut consumed = HashSet::new();
        consumed.insert(MAGNET_ITEM.to_string());
        Self {
            rng: rand::rngs::StdRng::seed_from_u64(seed),
            version: options.version,
            consumed,
            memo: HashMap::new(),
            fixed_cache: HashMap::new(),
            product_cache: HashMap::new(),
        }
    }

    /// Greedy skip-list pick for one slot key.
    ///
    /// Items are considered in the filler table's fixed shuffled order,
    /// skipping the first `2 × version` eligible items and any text already
    /// consumed in this run. The first remaining candidate is selected and
    /// memoized under the key, its bare slot name, and one alias per item
    /// attribute, so constrained and unconstrained references to the same
    /// slot resolve identically.
    fn pick_first_memoized(
        &mut self,
        key_raw: &str,
        table: &FillerTable,
    ) -> Result<Option<FillerItem>> {
        if let Some(item) = self.memo.get(key_raw) {
            return Ok(Some(item.clone()));
        }
        let key = SlotKey::parse(key_raw)?;
        let options = table.eligible(&key)?;

        if key.is_magnet {
            let [only] = options.as_slice() else {
                return Err(TelarError::specification(format!(
                    "magnet slot `{key_raw}` must match exactly one item, found {}",
                    options.len()
                )));
            };
            if only.item != MAGNET_ITEM {
                return Err(TelarError::specification(format!(
                    "magnet slot `{key_raw}` resolved to `{}`",
                    only.item
                )));
            }
            let item = (*only).clone();
            self.memo.insert(key_raw.to_string(), item.clone());
            return Ok(Some(item));
        }

        let skip = 2 * self.version as usize;
        if options.len() <= skip {
            return Ok(None);
        }
        for candidate in &options[skip..] {
            if self.consumed.contains(&candidate.item) {
                continue;
            }
            let item = (*candidate).clone();
            self.consumed.insert(item.item.clone());
            self.memo.insert(key_raw.to_string(), item.clone());
            self.memo
                .entry(key.name.clone())
                .or_insert_with(|| item.clone());
            for (attr, value) in &item.attrs {
                self.memo
                    .entry(format!("{}:{attr}={value}", key.name))
                    .or_insert_with(|| item.clone());
            }
            return Ok(Some(item));
        }
        Ok(None)
    }

    /// Fixed-mode assignment for a key set: one pick per key, or `None`
    /// when any key fails. Cached per key set.
    fn pick_one_fill(
        &mut self,
        keys: &BTreeSet<String>,
        fillers: &HashMap<String, &FillerTable>,
    ) -> Result<Option<Vec<Fill>>> {
        let cache_key: Vec<String> = keys.iter().cloned().collect();
        if let Some(cached) = self.fixed_cache.get(&cache_key) {
            return Ok(cached.clone());
        }
        let mut fills = Vec::with_capacity(cache_key.len());
        let mut complete = true;
        for key in &cache_key {
            let table = fillers.get(key).ok_or_else(|| {
                TelarError::specification(format!("no filler table supplied for slot `{key}`"))
            })?;
            match self.pick_first_memoized(key, table)? {
                Some(item) => fills.push((key.clone(), item)),
                None => {
                    complete = false;
                    break;
                }
            }
        }
        let result = complete.then_some(fills);
        self.fixed_cache.insert(cache_key, result.clone());
        Ok(result)
    }

    /// Cross-product assignments for a key set, reshuffled for each row.
    fn shuffled_product(
        &mut self,
        keys: &BTreeSet<String>,
        fillers: &HashMap<String, &FillerTable>,
    ) -> Result<Vec<Vec<Fill>>> {
        let cache_key: Vec<String> = keys.iter().cloned().collect();
        if !self.product_cache.contains_key(&cache_key) {
            let mut product: Vec<Vec<Fill>> = vec![Vec::new()];
            for key in &cache_key {
                let table = fillers.get(key).ok_or_else(|| {
                    TelarError::specification(format!("no filler table supplied for slot `{key}`"))
                })?;
                let eligible = table.eligible(&SlotKey::parse(key)?)?;
                let mut extended = Vec::with_capacity(product.len() * eligible.len());
                for combo in &product {
                    for item in &eligible {
                        let mut combo = combo.clone();
                        combo.push((key.clone(), (*item).clone()));
                        extended.push(combo);
                    }
                }
                product = extended;
            }
            self.product_cache.insert(cache_key.clone(), product);
        }
        let product = self
            .product_cache
            .get_mut(&cache_key)
            .expect("product cached above");
        product.shuffle(&mut self.rng);
        Ok(product.clone())
    }
}

/// Comma-joined `slot=item` associations of one resolved combination.
fn item_tags(fills: &[Fill]) -> String {
    fills
        .iter()
        .map(|(key, item)| format!("{key}={}", item.item))
        .collect::<Vec<_>>()
        .join(",")
}

/// Normalize a generated sentence: trim, capitalize the first letter,
/// ensure terminal punctuation, and capitalize after sentence-ending
/// punctuation followed by a space.
#[must_use]
pub fn unify_sentence(sentence: &str) -> String {
    let trimmed = sentence.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let mut chars = trimmed.chars();
    let first = chars.next().expect("nonempty after trim");
    let mut out: String = first.to_uppercase().chain(chars).collect();
    if !matches!(out.chars().last(), Some('.' | '!' | '?')) {
        out.push('.');
    }
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = RE
        .get_or_init(|| Regex::new(r"([.!?]) ([a-z])").expect("static sentence pattern compiles"));
    re.replace_all(&out, |caps: &regex::Captures<'_>| {
        format!("{} {}", &caps[1], caps[2].to_uppercase())
    })
    .into_owned()
}

/// Resolve one template table into a test suite table.
///
/// `fillers` maps every full slot key required by the template to its
/// filler table; the key sets must match exactly. Returns `Ok(None)` when
/// no resolved row survives (no viable assignment, or the post-filter
/// removed everything), in which case the whole template is skipped with a
/// warning.
///
/// # Errors
///
/// Returns [`TelarError::Specification`] on a slot/filler key mismatch or a
/// violated magnet requirement.
pub fn resolve_template(
    template: &Table,
    fillers: &HashMap<String, &FillerTable>,
    options: &SampleOptions,
    filter: Option<&Regex>,
) -> Result<Option<Table>> {
    let required: BTreeSet<String> = template
        .rows()
        .iter()
        .flat_map(|row| find_slot_keys(&row.joined_text()))
        .collect();
    let provided: BTreeSet<String> = fillers.keys().cloned().collect();
    if required != provided {
        return Err(TelarError::specification(format!(
            "template `{}` requires fillers {required:?} but {provided:?} were provided",
            template.identifier()
        )));
    }

    let mut ctx = SamplerContext::new(options);
    let columns: Vec<&str> = TEMPLATE_COLUMNS
        .iter()
        .chain(SUITE_EXTRA_COLUMNS.iter())
        .copied()
        .collect();
    let mut suite = Table::new(template.identifier(), &columns).with_identifier_prefix("testsuite");

    info!(
        template = template.identifier(),
        fix = options.fix_fillers,
        "sampling fillers for template"
    );

    for (index, row) in template.rows().iter().enumerate() {
        let row_keys: BTreeSet<String> = find_slot_keys(&row.joined_text());
        let fills_available: Vec<Vec<Fill>> = if options.fix_fillers {
            ctx.pick_one_fill(&row_keys, fillers)?
                .map(|fill| vec![fill])
                .unwrap_or_default()
        } else {
            ctx.shuffled_product(&row_keys, fillers)?
        };

        let mut count = 0;
        for fills in fills_available {
            if count >= options.num_fillers {
                break;
            }
            // no two slots may share one concrete item text within a row
            let distinct: HashSet<&str> = fills.iter().map(|(_, item)| item.item.as_str()).collect();
            if distinct.len() != fills.len() {
                continue;
            }
            count += 1;
            let mut resolved = row.clone();
            for col in TEXT_COLUMNS {
                let mut text = resolved.get_or_empty(col).to_string();
                for (key, item) in &fills {
                    text = text.replace(&format!("{{{key}}}"), &item.item);
                }
                resolved.set(col, unify_sentence(&text));
            }
            resolved.set("TemplateName", template.identifier());
            resolved.set("TemplateIndex", index.to_string());
            resolved.set("ItemTags", item_tags(&fills));
            if let Some(filter) = filter {
                if !filter.is_match(resolved.get_or_empty("ItemTags")) {
                    continue;
                }
            }
            suite.push(&resolved);
        }
        if count < options.num_fillers {
            warn!(
                template = template.identifier(),
                row = index,
                available = count,
                requested = options.num_fillers,
                slots = ?row_keys,
                "fewer filler combinations than requested, degrading"
            );
        }
    }

    if suite.is_empty() {
        warn!(
            template = template.identifier(),
            "no resolved rows survive the requested filter, skipping template"
        );
        return Ok(None);
    }
    Ok(Some(suite))
}

#[cfg(test)]
#[path = "sampler_tests.rs"]
mod tests;
