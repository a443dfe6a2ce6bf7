//! Reproducibility tests: identical inputs and configuration must produce
//! byte-identical output tables, in both sampling modes.
//!
//! All randomness in the pipeline derives from explicit seeds (the filler
//! shuffle seed, the fixed-mode seed, and the requested version), so there
//! is no tolerance here: any byte difference is a failure.

use std::collections::BTreeMap;

use telar::prelude::*;

fn concepts() -> Vec<Concept> {
    [("warmer", "colder"), ("colder", "warmer")]
        .iter()
        .map(|(name, opposite)| {
            Concept::from_spec(ConceptSpec {
                concept: (*name).to_string(),
                domain: "physical-relations".to_string(),
                concept_type: "relation".to_string(),
                directional: true,
                opposite_concepts: NameList::One((*opposite).to_string()),
                ..ConceptSpec::default()
            })
            .expect("valid concept")
        })
        .collect()
}

fn compile_templates() -> Table {
    let targets = vec![Target {
        pattern: "the {object1} is {CONCEPT} than the {object2}".to_string(),
        criteria: vec!["directional".to_string()],
        tags: vec![],
        swappable_variables: true,
    }];
    let specs = vec![MetaTemplateSpec {
        concept_a: "warmer".to_string(),
        concept_b: Some("colder".to_string()),
        probes: vec![ProbeSpec {
            pattern: "{agent1} touches the {object1} and the {object2}. {segment1}".to_string(),
            context_type: Some("indirect".to_string()),
            swappable_variables: false,
            segments: vec![SegmentSpec {
                context_type: None,
                contrast: Some("felt/ignored".to_string()),
                segment_a: StringOrSeq::One("It felt different".to_string()),
                segment_b: Some(StringOrSeq::One("Nothing was noticed".to_string())),
            }],
        }],
    }];
    let mut compiler = MetaTemplateCompiler::new("physical", "relations");
    let outcome = compiler.compile(&specs, &concepts(), &targets);
    assert!(outcome.errors.is_empty());
    outcome.table
}

fn fillers() -> BTreeMap<String, FillerTable> {
    let mut fillers = BTreeMap::new();
    fillers.insert(
        "object".to_string(),
        FillerTable::new(
            "object",
            (0..10)
                .map(|i| FillerItem {
                    item: format!("thing {i}"),
                    attrs: vec![],
                })
                .collect(),
        ),
    );
    fillers.insert(
        "agent".to_string(),
        FillerTable::new(
            "agent",
            (0..6)
                .map(|i| FillerItem {
                    item: format!("visitor {i}"),
                    attrs: vec![],
                })
                .collect(),
        ),
    );
    fillers
}

fn run(options: &SampleOptions) -> Vec<String> {
    let dataset = Dataset::compile(vec![compile_templates()], &fillers(), options, &[], None);
    assert!(dataset.errors.is_empty());
    dataset.suites.iter().map(Table::to_csv_string).collect()
}

#[test]
fn template_compilation_is_deterministic() {
    assert_eq!(
        compile_templates().to_csv_string(),
        compile_templates().to_csv_string()
    );
}

#[test]
fn fixed_mode_runs_are_byte_identical() {
    let options = SampleOptions {
        num_fillers: 1,
        fix_fillers: true,
        version: 0,
    };
    assert_eq!(run(&options), run(&options));
}

#[test]
fn fixed_mode_is_deterministic_per_version() {
    for version in [0, 1, 2] {
        let options = SampleOptions {
            num_fillers: 1,
            fix_fillers: true,
            version,
        };
        assert_eq!(run(&options), run(&options), "version {version} diverged");
    }
}

#[test]
fn cross_product_runs_are_byte_identical() {
    let options = SampleOptions {
        num_fillers: 5,
        fix_fillers: false,
        version: 3,
    };
    assert_eq!(run(&options), run(&options));
}

#[test]
fn cross_product_versions_differ() {
    let a = run(&SampleOptions {
        num_fillers: 5,
        fix_fillers: false,
        version: 1,
    });
    let b = run(&SampleOptions {
        num_fillers: 5,
        fix_fillers: false,
        version: 2,
    });
    assert_ne!(a, b);
}
