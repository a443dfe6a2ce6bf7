//! Placeholder slot parsing, constraint propagation, and occurrence swaps.
//!
//! Pattern strings carry typed slots of the form `name<index>` with optional
//! comma-joined constraints, e.g. `{agent1:sex=female}`. Two bracket styles
//! are recognized: `{}` slots render literally as braces, `[]` slots are
//! alternate brackets rewritten to braces when a pattern is rendered.
//!
//! A slot referenced with partial constraints in one pattern and full
//! constraints in a co-occurring pattern must be constrained identically
//! everywhere, otherwise filler selection would diverge between the two
//! sides of one pair. [`maximal_constraints`] computes the union per slot
//! name and [`propagate_constraints`] rewrites every occurrence to carry it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Result, TelarError};

/// Constraint key/value pair whose presence pins a slot to one fixed item.
const MAGNET_CONSTRAINT: (&str, &str) = ("is_magnet", "true");

/// The one item text a magnet slot may resolve to.
pub const MAGNET_ITEM: &str = "the magnet";

fn slot_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // one pass over both bracket styles, like the constraint grammar demands:
    // name, optionally `:k=v,k=v` (colons also accepted as joiners, see
    // `SlotKey::parse`)
    RE.get_or_init(|| {
        Regex::new(r"[\[{](\w+((?::[\w=,]*))*)[\]}]").expect("static slot pattern compiles")
    })
}

fn braces_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(\w+)((?::[\w=,]*)*)\}").expect("static slot pattern compiles"))
}

fn squares_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[(\w+)((?::[\w=,]*)*)\]").expect("static slot pattern compiles")
    })
}

/// Parse every slot in `s` (both bracket styles) into an ordered
/// `(name, raw_constraint_string)` list.
///
/// Order follows first occurrence; a repeated name keeps its last raw
/// constraint string (occurrences agree after propagation anyway).
///
/// # Examples
///
/// ```
/// use telar::slots::parse_slots;
///
/// let slots = parse_slots("{agent1} gave [object1:size=small] to {agent2}");
/// assert_eq!(
///     slots,
///     vec![
///         ("agent1".to_string(), String::new()),
///         ("object1".to_string(), "size=small".to_string()),
///         ("agent2".to_string(), String::new()),
///     ]
/// );
/// ```
#[must_use]
pub fn parse_slots(s: &str) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    for cap in slot_re().captures_iter(s) {
        let group = &cap[1];
        let (name, raw) = match group.split_once(':') {
            Some((n, c)) => (n.to_string(), c.to_string()),
            None => (group.to_string(), String::new()),
        };
        if let Some(slot) = out.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = raw;
        } else {
            out.push((name, raw));
        }
    }
    out
}

/// Names of every slot in `s`, order of first occurrence, duplicates kept.
#[must_use]
pub fn slot_names(s: &str) -> Vec<String> {
    slot_re()
        .captures_iter(s)
        .map(|cap| match cap[1].split_once(':') {
            Some((n, _)) => n.to_string(),
            None => cap[1].to_string(),
        })
        .collect()
}

/// Full slot keys (brace contents, constraints included) referenced by a
/// rendered sentence, e.g. `agent1:sex=female`. Sorted for determinism.
#[must_use]
pub fn find_slot_keys(text: &str) -> BTreeSet<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\{([^}]+)\}").expect("static slot pattern compiles"));
    re.captures_iter(text).map(|cap| cap[1].to_string()).collect()
}

/// Entity type of a slot name: the name with its trailing index digits
/// stripped (`agent2` → `agent`).
#[must_use]
pub fn slot_type(name: &str) -> &str {
    name.trim_end_matches(|c: char| c.is_ascii_digit())
}

/// Count slot occurrences per entity type in a rendered pattern string.
#[must_use]
pub fn type_counts(s: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for name in slot_names(s) {
        *counts.entry(slot_type(&name).to_string()).or_insert(0) += 1;
    }
    counts
}

/// Union of constraints per slot name across all supplied strings.
///
/// Constraints are comma-split per occurrence and collected as a set, so
/// the result is order-independent; emission sorts lexicographically.
///
/// # Examples
///
/// ```
/// use telar::slots::maximal_constraints;
///
/// let cons = maximal_constraints(&[
///     "I am going to {location1:place=nebraska}",
///     "Acadia is located in {location1:place=usa}",
/// ]);
/// let joined: Vec<_> = cons["location1"].iter().cloned().collect();
/// assert_eq!(joined, vec!["place=nebraska", "place=usa"]);
/// ```
#[must_use]
pub fn maximal_constraints(strings: &[&str]) -> BTreeMap<String, BTreeSet<String>> {
    let mut constraints: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for s in strings {
        for cap in slot_re().captures_iter(s) {
            let group = &cap[1];
            let (name, raw) = match group.split_once(':') {
                Some((n, c)) => (n, c),
                None => (group, ""),
            };
            let entry = constraints.entry(name.to_string()).or_default();
            for con in raw.split([',', ':']) {
                if !con.is_empty() {
                    entry.insert(con.to_string());
                }
            }
        }
    }
    constraints
}

/// Rewrite every slot occurrence in `s` to carry its maximal constraint set
/// (sorted, comma-joined), regardless of what it currently carries. Slots
/// absent from `constraints` are emitted bare.
#[must_use]
pub fn propagate_constraints(s: &str, constraints: &BTreeMap<String, BTreeSet<String>>) -> String {
    let rewrite = |re: &Regex, opening: char, closing: char, input: &str| -> String {
        re.replace_all(input, |cap: &regex::Captures<'_>| {
            let name = &cap[1];
            let joined = constraints
                .get(name)
                .filter(|set| !set.is_empty())
                .map(|set| set.iter().cloned().collect::<Vec<_>>().join(","));
            match joined {
                Some(cons) => format!("{opening}{name}:{cons}{closing}"),
                None => format!("{opening}{name}{closing}"),
            }
        })
        .into_owned()
    };
    let s = rewrite(braces_re(), '{', '}', s);
    rewrite(squares_re(), '[', ']', &s)
}

/// Swap two substrings with one another everywhere in `s`.
#[must_use]
pub fn swap_words(s: &str, x: &str, y: &str) -> String {
    s.split(x)
        .map(|part| part.replace(y, x))
        .collect::<Vec<_>>()
        .join(y)
}

/// Swap the two same-type slot occurrences of the most frequent slot type
/// within a rendered string.
///
/// The first and second occurrence are exchanged for a doubled type, the
/// second and third for a tripled type. More than three occurrences of one
/// type cannot be swapped reliably, and a single occurrence has nothing to
/// swap with. The two swapped occurrences must carry identical maximal
/// constraints or the swap would change filler eligibility between the two
/// sentences of the pair.
///
/// # Errors
///
/// Returns [`TelarError::ConstraintConflict`] whenever no legal swap
/// exists; callers skip the swap branch on that error.
pub fn swap_slot_occurrences(s: &str) -> Result<String> {
    let slots = parse_slots(s);
    if slots.is_empty() {
        return Err(TelarError::conflict(format!(
            "cannot do a variable swap: no variables found in `{s}`"
        )));
    }

    let mut counts: Vec<(String, usize)> = Vec::new();
    for (name, _) in &slots {
        let ty = slot_type(name).to_string();
        if let Some(entry) = counts.iter_mut().find(|(t, _)| *t == ty) {
            entry.1 += 1;
        } else {
            counts.push((ty, 1));
        }
    }
    // most frequent type wins, first occurrence breaks ties
    let mut best: Option<(String, usize)> = None;
    for (ty, c) in &counts {
        if best.as_ref().map_or(true, |(_, bc)| *c > *bc) {
            best = Some((ty.clone(), *c));
        }
    }
    let (ty, count) = best.expect("counts nonempty when slots nonempty");

    if count > 3 {
        return Err(TelarError::conflict(format!(
            "too many occurrences of variable type `{ty}` ({count}) to reliably swap"
        )));
    }
    if count < 2 {
        return Err(TelarError::conflict(format!(
            "no swap possible for variable type `{ty}` with {count} occurrence"
        )));
    }

    let (index1, index2) = if count == 2 { (1, 2) } else { (2, 3) };
    let name1 = format!("{ty}{index1}");
    let name2 = format!("{ty}{index2}");

    let raw1 = slots.iter().find(|(n, _)| *n == name1).map(|(_, c)| c.clone());
    let raw2 = slots.iter().find(|(n, _)| *n == name2).map(|(_, c)| c.clone());
    let (Some(raw1), Some(raw2)) = (raw1, raw2) else {
        return Err(TelarError::conflict(format!(
            "expected slots `{name1}` and `{name2}` not both present in `{s}`"
        )));
    };

    let maximal = maximal_constraints(&[s]);
    let empty = BTreeSet::new();
    let cons1 = maximal.get(&name1).unwrap_or(&empty);
    let cons2 = maximal.get(&name2).unwrap_or(&empty);
    if cons1 != cons2 {
        return Err(TelarError::conflict(format!(
            "no swap possible for `{ty}`: constraints mismatch between occurrences ({cons1:?} vs {cons2:?})"
        )));
    }

    let braced = |name: &str, raw: &str| {
        if raw.is_empty() {
            format!("{{{name}}}")
        } else {
            format!("{{{name}:{raw}}}")
        }
    };
    Ok(swap_words(s, &braced(&name1, &raw1), &braced(&name2, &raw2)))
}

/// A parsed slot key: the full brace contents of one placeholder as used to
/// look up and constrain filler items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotKey {
    /// The full key as it appears between braces.
    pub raw: String,
    /// Slot name with index, before any constraints (`agent1`).
    pub name: String,
    /// Filler table base name (`agent`); `_from_` renames and indices are
    /// stripped.
    pub base: String,
    /// Attribute constraints a filler item must satisfy.
    pub constraints: Vec<(String, String)>,
    /// Whether the magnet literal pins this slot to [`MAGNET_ITEM`].
    pub is_magnet: bool,
}

impl SlotKey {
    /// Parse a full slot key such as `agent1:sex=female,western=false`.
    ///
    /// # Errors
    ///
    /// Returns a parse error when the base name cannot be extracted or a
    /// constraint is not `key=value` shaped.
    pub fn parse(raw: &str) -> Result<Self> {
        static BASE_RE: OnceLock<Regex> = OnceLock::new();
        let base_re = BASE_RE
            .get_or_init(|| Regex::new(r"^(.*?)(\d+|:|_from_)").expect("static base pattern compiles"));

        let name = raw.split(':').next().unwrap_or(raw).to_string();
        let base = base_re
            .captures(raw)
            .map(|cap| cap[1].to_string())
            .ok_or_else(|| TelarError::parse(format!("could not parse filler key `{raw}`")))?;

        let mut constraints = Vec::new();
        if let Some((_, rest)) = raw.split_once(':') {
            for part in rest.split([':', ',']) {
                if part.is_empty() {
                    continue;
                }
                let (k, v) = part.split_once('=').ok_or_else(|| {
                    TelarError::parse(format!("malformed constraint `{part}` in key `{raw}`"))
                })?;
                constraints.push((k.to_string(), v.to_string()));
            }
        }
        let is_magnet = constraints
            .iter()
            .any(|(k, v)| (k.as_str(), v.as_str()) == MAGNET_CONSTRAINT);

        Ok(Self {
            raw: raw.to_string(),
            name,
            base,
            constraints,
            is_magnet,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slots_both_styles() {
        let slots = parse_slots("{agent1:sex=female} saw [object1] near {location1}");
        assert_eq!(
            slots,
            vec![
                ("agent1".to_string(), "sex=female".to_string()),
                ("object1".to_string(), String::new()),
                ("location1".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_slot_type_strips_index() {
        assert_eq!(slot_type("agent2"), "agent");
        assert_eq!(slot_type("quantObject1"), "quantObject");
        assert_eq!(slot_type("segment12"), "segment");
    }

    #[test]
    fn test_type_counts() {
        let counts = type_counts("{agent1} told {agent2} about {object1}");
        assert_eq!(counts["agent"], 2);
        assert_eq!(counts["object"], 1);
    }

    #[test]
    fn test_maximal_constraints_union_sorted() {
        let cons = maximal_constraints(&[
            "{agent1:sex=female} is here",
            "[agent1:western=false] left with {agent2}",
        ]);
        let agent1: Vec<_> = cons["agent1"].iter().cloned().collect();
        assert_eq!(agent1, vec!["sex=female", "western=false"]);
        assert!(cons["agent2"].is_empty());
    }

    #[test]
    fn test_propagate_rewrites_all_occurrences() {
        let cons = maximal_constraints(&[
            "{agent1:sex=female} waved",
            "[agent1:western=false] waved back",
        ]);
        assert_eq!(
            propagate_constraints("{agent1:sex=female} waved", &cons),
            "{agent1:sex=female,western=false} waved"
        );
        assert_eq!(
            propagate_constraints("[agent1:western=false] waved back", &cons),
            "[agent1:sex=female,western=false] waved back"
        );
    }

    #[test]
    fn test_propagate_leaves_unknown_slots_bare() {
        let cons = maximal_constraints(&["{agent1}"]);
        assert_eq!(propagate_constraints("{agent1} and {x}", &cons), "{agent1} and {x}");
    }

    #[test]
    fn test_swap_words() {
        assert_eq!(swap_words("a b a c", "a", "c"), "c b c a");
        assert_eq!(swap_words("{x1} loves {x2}", "{x1}", "{x2}"), "{x2} loves {x1}");
    }

    #[test]
    fn test_swap_occurrences_doubled_type() {
        let swapped = swap_slot_occurrences("{agent1} is taller than {agent2}")
            .expect("legal swap");
        assert_eq!(swapped, "{agent2} is taller than {agent1}");
    }

    #[test]
    fn test_swap_occurrences_tripled_type_swaps_second_and_third() {
        let swapped =
            swap_slot_occurrences("{agent1} put {agent2} before {agent3}").expect("legal swap");
        assert_eq!(swapped, "{agent1} put {agent3} before {agent2}");
    }

    #[test]
    fn test_swap_rejects_mismatched_constraints() {
        let err = swap_slot_occurrences("{agent1:sex=female} greets {agent2}").unwrap_err();
        assert!(matches!(
            err,
            crate::error::TelarError::ConstraintConflict { .. }
        ));
    }

    #[test]
    fn test_swap_accepts_identical_constraints() {
        let swapped =
            swap_slot_occurrences("{agent1:sex=female} greets {agent2:sex=female}")
                .expect("legal swap");
        assert_eq!(swapped, "{agent2:sex=female} greets {agent1:sex=female}");
    }

    #[test]
    fn test_swap_rejects_single_occurrence() {
        let err = swap_slot_occurrences("{agent1} waves").unwrap_err();
        assert!(err.to_string().contains("1 occurrence"));
    }

    #[test]
    fn test_swap_rejects_no_slots() {
        assert!(swap_slot_occurrences("nothing here").is_err());
    }

    #[test]
    fn test_find_slot_keys_sorted_with_constraints() {
        let keys = find_slot_keys("{b1} and {a1:sex=female} and {b1}");
        let keys: Vec<_> = keys.into_iter().collect();
        assert_eq!(keys, vec!["a1:sex=female".to_string(), "b1".to_string()]);
    }

    #[test]
    fn test_slot_key_parse_plain() {
        let key = SlotKey::parse("agent1").expect("parses");
        assert_eq!(key.name, "agent1");
        assert_eq!(key.base, "agent");
        assert!(key.constraints.is_empty());
        assert!(!key.is_magnet);
    }

    #[test]
    fn test_slot_key_parse_constraints_comma_and_colon_joined() {
        let key = SlotKey::parse("agent1:sex=female,western=false:age=old").expect("parses");
        assert_eq!(
            key.constraints,
            vec![
                ("sex".to_string(), "female".to_string()),
                ("western".to_string(), "false".to_string()),
                ("age".to_string(), "old".to_string()),
            ]
        );
    }

    #[test]
    fn test_slot_key_parse_from_rename() {
        let key = SlotKey::parse("profession_from_agent1").expect("parses");
        assert_eq!(key.base, "profession");
        assert_eq!(key.name, "profession_from_agent1");
    }

    #[test]
    fn test_slot_key_magnet() {
        let key = SlotKey::parse("object1:is_magnet=true").expect("parses");
        assert!(key.is_magnet);
    }

    #[test]
    fn test_slot_key_malformed_constraint() {
        assert!(SlotKey::parse("agent1:nonsense").is_err());
    }
}
