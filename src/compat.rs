//! Target–probe compatibility matching.
//!
//! Decides whether a rendered target sentence may legally pair with a
//! rendered context sentence by comparing per-entity-type slot counts.
//! This is a heuristic linguistic plausibility filter, not a strict formal
//! constraint; the rule order and numeric thresholds are load-bearing for
//! downstream dataset content and must not be re-derived.

use std::collections::BTreeMap;

use tracing::debug;

use crate::slots::type_counts;

/// Per-entity-type slot counts of a rendered sentence, with `quantObject`
/// and `quantSubstance` folded additively into `object`.
#[must_use]
pub fn entity_counts(sentence: &str) -> BTreeMap<String, usize> {
    let mut counts = type_counts(sentence);
    let quant = counts.get("quantObject").copied().unwrap_or(0)
        + counts.get("quantSubstance").copied().unwrap_or(0);
    if quant > 0 {
        *counts.entry("object".to_string()).or_insert(0) += quant;
    }
    counts
}

fn count(counts: &BTreeMap<String, usize>, ty: &str) -> usize {
    counts.get(ty).copied().unwrap_or(0)
}

/// Whether the variables of `target_sentence` can coexist with those of
/// `context_sentence`.
///
/// Three ordered rejection rules apply, each on the folded entity counts:
///
/// 1. An excess agent in the target is tolerated only in an
///    object-evaluative context (exactly one context object, matched object
///    counts). A context with more agents than the target while the target
///    has more objects is a mismatched focus. Any non-agent type may exceed
///    its context count by at most 1.
/// 2. No type's count may differ by 2 or more in either direction.
/// 3. No two distinct types may both differ in count.
///
/// A pair passes only if all three rules pass.
#[must_use]
pub fn is_compatible(target_sentence: &str, context_sentence: &str) -> bool {
    let target = entity_counts(target_sentence);
    let context = entity_counts(context_sentence);

    // rule 1: excess-agent and one-new-inanimate-entity allowances
    if count(&target, "agent") > count(&context, "agent")
        && (count(&context, "object") != 1
            || count(&target, "object") != count(&context, "object"))
    {
        debug!(
            target_sentence,
            context_sentence,
            "rejected: excess agent in target outside an object-evaluative context"
        );
        return false;
    }
    if count(&context, "agent") > count(&target, "agent")
        && count(&target, "object") > count(&context, "object")
    {
        debug!(
            target_sentence,
            context_sentence,
            "rejected: excess object in target while context is about agents"
        );
        return false;
    }
    for (ty, n) in &target {
        if ty != "agent" && *n > count(&context, ty) + 1 {
            debug!(
                target_sentence,
                context_sentence,
                entity = ty.as_str(),
                "rejected: two or more new non-agent entities in target"
            );
            return false;
        }
    }

    // rule 2: gross mismatch in any single type
    let mut types: Vec<&String> = target.keys().chain(context.keys()).collect();
    types.sort();
    types.dedup();
    for ty in &types {
        let t = count(&target, ty);
        let c = count(&context, ty);
        if t >= c + 2 || t + 2 <= c {
            debug!(
                target_sentence,
                context_sentence,
                entity = ty.as_str(),
                "rejected: entity count differs by 2 or more"
            );
            return false;
        }
    }

    // rule 3: divergence across two entity dimensions at once
    let differing = types
        .iter()
        .filter(|ty| count(&target, ty) != count(&context, ty))
        .count();
    if differing >= 2 {
        debug!(
            target_sentence,
            context_sentence,
            differing,
            "rejected: two entity types differ in count simultaneously"
        );
        return false;
    }

    debug!(
        target_sentence,
        context_sentence,
        "target and context are compatible"
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_accepted() {
        // {agent:1, object:1} on both sides trivially satisfies all rules
        assert!(is_compatible(
            "{agent1} holds {object1}",
            "{agent1} sees {object1}"
        ));
    }

    #[test]
    fn test_excess_agent_rejected_without_object_evaluative_context() {
        // target {agent:2}, context {agent:1}: no single context object
        assert!(!is_compatible(
            "{agent1} is teaching {agent2}",
            "{agent1} is an expert"
        ));
    }

    #[test]
    fn test_excess_agent_allowed_in_object_evaluative_context() {
        // context has exactly one object and object counts match
        assert!(is_compatible(
            "{agent1} gives {agent2} the {object1}",
            "{agent1} likes the {object1}"
        ));
    }

    #[test]
    fn test_gross_mismatch_rejected() {
        // target {agent:3} vs context {agent:1}: difference >= 2
        assert!(!is_compatible(
            "{agent1} and {agent2} and {agent3}",
            "{agent1} is here"
        ));
    }

    #[test]
    fn test_context_gross_excess_rejected() {
        assert!(!is_compatible(
            "the {object1} is heavy",
            "{location1} and {location2} and {location3} have the {object1}"
        ));
    }

    #[test]
    fn test_one_new_inanimate_entity_allowed() {
        // one location in target absent from context
        assert!(is_compatible(
            "{agent1} went to {location1}",
            "{agent1} left home"
        ));
    }

    #[test]
    fn test_two_new_inanimate_entities_rejected() {
        assert!(!is_compatible(
            "{agent1} moved {object1} and {object2}",
            "{agent1} stood up"
        ));
    }

    #[test]
    fn test_mismatched_focus_rejected() {
        // context about two agents, target introduces an object instead
        assert!(!is_compatible(
            "{agent1} cleaned {object1}",
            "{agent1} met {agent2}"
        ));
    }

    #[test]
    fn test_dual_divergence_rejected() {
        // T: {agent, location}; C: {agent, agent}: both agent and location
        // counts differ -- but agent diff also trips rule 2? counts are
        // agent 1 vs 2 and location 1 vs 0, each within 1, so only rule 3
        // rejects this pair.
        assert!(!is_compatible(
            "{agent1} is at {location1}",
            "{agent1} waves at {agent2}"
        ));
    }

    #[test]
    fn test_quant_slots_fold_into_object() {
        let counts = entity_counts("{agent1} pours {quantSubstance1}");
        assert_eq!(counts.get("object"), Some(&1));
        assert_eq!(counts.get("quantSubstance"), Some(&1));
        // folded object count lets a quant target pair with an object context
        assert!(is_compatible(
            "{agent1} pours {quantSubstance1}",
            "{agent1} holds {object1}"
        ));
    }
}
