// =========================================================================
// FALSIFY-SV: sampling and generation contracts
//
// Each test tries to falsify one documented invariant of the pipeline over
// randomized inputs. A failure message names the violated contract.
// =========================================================================

use std::collections::{BTreeMap, HashMap, HashSet};

use proptest::prelude::*;

use telar::filler::{FillerItem, FillerTable};
use telar::sampler::{resolve_template, SampleOptions};
use telar::slots::swap_slot_occurrences;
use telar::suite::Dataset;
use telar::table::{Row, Table, CANARY, TEMPLATE_COLUMNS};

fn two_agent_template() -> Table {
    let mut table = Table::new("template-contract", &TEMPLATE_COLUMNS);
    table.push(
        &Row::new()
            .with("MetaTemplateID", "1")
            .with("TemplateID", "1")
            .with("Domain", "contract-suite")
            .with("Target1", "{agent1} follows {agent2}")
            .with("Target2", "{agent2} follows {agent1}")
            .with("TargetDiff", "variable swap")
            .with("Context1", "{agent1} walks ahead of {agent2}")
            .with("Context2", "{agent2} walks ahead of {agent1}")
            .with("ContextDiff", "variable swap")
            .with("ContextType", "indirect"),
    );
    table
}

fn agent_table(n: usize) -> FillerTable {
    FillerTable::new(
        "agent",
        (0..n)
            .map(|i| FillerItem {
                item: format!("walker {i}"),
                attrs: vec![],
            })
            .collect(),
    )
}

fn tag_items(tags: &str) -> Vec<&str> {
    tags.split(',')
        .map(|t| t.split_once('=').expect("tag is key=item").1)
        .collect()
}

proptest! {
    /// FALSIFY-SV-001: within one resolved row, no two slots share an item
    /// text, in either sampling mode.
    #[test]
    fn falsify_sv_001_no_item_reuse_within_row(
        n in 4usize..12,
        version in 0u64..3,
        fix in any::<bool>(),
        num_fillers in 1usize..4,
    ) {
        let agents = agent_table(n);
        let fillers: HashMap<String, &FillerTable> =
            [("agent1", &agents), ("agent2", &agents)]
                .iter()
                .map(|(k, t)| ((*k).to_string(), *t))
                .collect();
        let options = SampleOptions { num_fillers, fix_fillers: fix, version };
        if let Some(suite) =
            resolve_template(&two_agent_template(), &fillers, &options, None)
                .expect("resolution succeeds")
        {
            for row in suite.rows() {
                let items = tag_items(row.get_or_empty("ItemTags"));
                let unique: HashSet<&&str> = items.iter().collect();
                prop_assert_eq!(
                    unique.len(),
                    items.len(),
                    "FALSIFIED SV-001: item reused within row: {}",
                    row.get_or_empty("ItemTags")
                );
            }
        }
    }

    /// FALSIFY-SV-002: resolution of the same template with the same
    /// options is byte-identical.
    #[test]
    fn falsify_sv_002_resolution_is_deterministic(
        n in 4usize..12,
        version in 0u64..3,
        fix in any::<bool>(),
        num_fillers in 1usize..4,
    ) {
        let agents = agent_table(n);
        let fillers: HashMap<String, &FillerTable> =
            [("agent1", &agents), ("agent2", &agents)]
                .iter()
                .map(|(k, t)| ((*k).to_string(), *t))
                .collect();
        let options = SampleOptions { num_fillers, fix_fillers: fix, version };
        let a = resolve_template(&two_agent_template(), &fillers, &options, None)
            .expect("resolution succeeds")
            .map(|t| t.to_csv_string());
        let b = resolve_template(&two_agent_template(), &fillers, &options, None)
            .expect("resolution succeeds")
            .map(|t| t.to_csv_string());
        prop_assert_eq!(a, b, "FALSIFIED SV-002: repeated resolution diverged");
    }

    /// FALSIFY-SV-003: resolved rows keep target and context distinct on
    /// both sides.
    #[test]
    fn falsify_sv_003_duplication_invariant(n in 4usize..12, version in 0u64..2) {
        let agents = agent_table(n);
        let fillers: HashMap<String, &FillerTable> =
            [("agent1", &agents), ("agent2", &agents)]
                .iter()
                .map(|(k, t)| ((*k).to_string(), *t))
                .collect();
        let options = SampleOptions { num_fillers: 1, fix_fillers: true, version };
        if let Some(suite) =
            resolve_template(&two_agent_template(), &fillers, &options, None)
                .expect("resolution succeeds")
        {
            for row in suite.rows() {
                prop_assert_ne!(
                    row.get_or_empty("Target1"),
                    row.get_or_empty("Context1"),
                    "FALSIFIED SV-003: Target1 equals Context1"
                );
                prop_assert_ne!(
                    row.get_or_empty("Target2"),
                    row.get_or_empty("Context2"),
                    "FALSIFIED SV-003: Target2 equals Context2"
                );
            }
        }
    }

    /// FALSIFY-SV-004: swapping slot occurrences twice restores the
    /// original string.
    #[test]
    fn falsify_sv_004_swap_is_involutive(
        head in "[a-z ]{0,8}",
        mid in "[a-z ]{1,8}",
        tail in "[a-z ]{0,8}",
    ) {
        let sentence = format!("{head}{{agent1}} {mid} {{agent2}}{tail}");
        let once = swap_slot_occurrences(&sentence).expect("swap is legal");
        let twice = swap_slot_occurrences(&once).expect("swap is legal");
        prop_assert_eq!(
            twice,
            sentence,
            "FALSIFIED SV-004: double swap did not restore the original"
        );
    }
}

/// FALSIFY-SV-005: every table serialized by the crate is canary-prefixed.
#[test]
fn falsify_sv_005_serialized_tables_carry_canary() {
    let agents = agent_table(6);
    let mut fillers = BTreeMap::new();
    fillers.insert("agent".to_string(), agents);
    let dataset = Dataset::compile(
        vec![two_agent_template()],
        &fillers,
        &SampleOptions::default(),
        &[],
        None,
    );
    assert!(dataset.errors.is_empty());
    for suite in &dataset.suites {
        assert!(
            suite.to_csv_string().starts_with(CANARY),
            "FALSIFIED SV-005: suite `{}` missing canary",
            suite.identifier()
        );
    }
}
