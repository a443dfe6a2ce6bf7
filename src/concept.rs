//! Concepts: named linguistic units with capability flags and surface forms.
//!
//! A [`Concept`] defines the domain it can be used in, how it should be
//! inflected in various uses, and which opposite concepts it can have.
//! Concepts are read-only once constructed.
//!
//! Specialized behavior is a closed set of [`ConceptKind`] variants resolved
//! by a single constructor keyed on `concept_type` and `domain`. Each kind
//! restricts which capability flags and surface forms its specification may
//! set; identity semantics never differ by kind. Capability lookups via
//! [`Concept::flag`] are total: an unknown or unset flag is `false`, never
//! absent.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::error::{Result, TelarError};

/// Every capability flag a concept specification may carry.
pub const KNOWN_FLAGS: [&str; 22] = [
    "symmetric",
    "directional",
    "agentive",
    "non_agentive",
    "comparative",
    "intent_based",
    "object_level",
    "surface_level",
    "checks_equality",
    "absolute_quantity_obj",
    "absolute_quantity_sub",
    "descriptive_obj",
    "descriptive_sub",
    "comparative_sub",
    "comparative_obj",
    "absolute_count_quantity_obj",
    "absolute_count_quantity_sub",
    "swappable_variables",
    "perception_based",
    "belief_based",
    "intent_based_comparative",
    "agent_as_object",
];

/// Surface-form tags a specification may define.
pub const KNOWN_FORMS: [&str; 5] = [
    "ing_form",
    "present_3sg_form",
    "present_modal_form",
    "plural_form",
    "prepositional_form",
];

/// Closed set of concept specializations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConceptKind {
    /// Spatial/social relations (`on`, `taller than`).
    Relation,
    /// Actions and interactions.
    Action,
    /// Properties of materials and objects.
    MaterialProperty,
    /// Properties of agents (beliefs, percepts, intents).
    AgentProperty,
    /// Anything else; accepts the full flag and form set.
    General,
}

impl ConceptKind {
    /// Resolve the kind for a `concept_type`/`domain` pair.
    #[must_use]
    pub fn resolve(concept_type: &str, domain: &str) -> Self {
        match concept_type {
            "relation" => Self::Relation,
            "action" | "interaction" => Self::Action,
            "property" if domain == "material-properties" => Self::MaterialProperty,
            "property" if domain == "agent" => Self::AgentProperty,
            _ => Self::General,
        }
    }

    /// Capability flags a specification of this kind may set.
    #[must_use]
    pub fn permitted_flags(&self) -> &'static [&'static str] {
        match self {
            Self::Relation => &["directional", "symmetric"],
            Self::Action => &["agentive", "non_agentive", "swappable_variables", "symmetric"],
            Self::MaterialProperty => &["object_level", "surface_level"],
            Self::AgentProperty => &[
                "perception_based",
                "belief_based",
                "comparative",
                "intent_based",
                "intent_based_comparative",
                "agent_as_object",
                "symmetric",
            ],
            Self::General => &KNOWN_FLAGS,
        }
    }

    /// Surface forms a specification of this kind may define.
    #[must_use]
    pub fn permitted_forms(&self) -> &'static [&'static str] {
        match self {
            Self::Relation => &["plural_form", "prepositional_form"],
            Self::Action => &["ing_form", "present_3sg_form"],
            Self::MaterialProperty => &[],
            Self::AgentProperty => &["ing_form", "present_3sg_form", "present_modal_form"],
            Self::General => &KNOWN_FORMS,
        }
    }
}

/// A string or a list of strings, as concept name lists appear in specs.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NameList {
    /// Single name, possibly a comma-separated list within one string.
    One(String),
    /// Explicit list of names.
    Many(Vec<String>),
}

impl Default for NameList {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl NameList {
    /// Flatten to a list of trimmed, non-empty names.
    #[must_use]
    pub fn into_names(self) -> Vec<String> {
        match self {
            Self::One(s) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Self::Many(v) => v,
        }
    }
}

/// One declarative concept record. Every field is explicitly named; there is
/// no free-form key bag, so an unexpected flag fails deserialization rather
/// than silently passing through.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConceptSpec {
    /// Concept lemma, e.g. `taller`.
    pub concept: String,
    /// Domain classification, e.g. `social-relations`.
    pub domain: String,
    /// One of `relation`, `action`, `interaction`, `property`.
    pub concept_type: String,

    pub symmetric: bool,
    pub directional: bool,
    pub agentive: bool,
    pub non_agentive: bool,
    pub comparative: bool,
    pub intent_based: bool,
    pub object_level: bool,
    pub surface_level: bool,
    pub checks_equality: bool,
    pub absolute_quantity_obj: bool,
    pub absolute_quantity_sub: bool,
    pub descriptive_obj: bool,
    pub descriptive_sub: bool,
    pub comparative_sub: bool,
    pub comparative_obj: bool,
    pub absolute_count_quantity_obj: bool,
    pub absolute_count_quantity_sub: bool,
    pub swappable_variables: bool,
    pub perception_based: bool,
    pub belief_based: bool,
    pub intent_based_comparative: bool,
    pub agent_as_object: bool,

    pub ing_form: Option<String>,
    pub present_3sg_form: Option<String>,
    pub present_modal_form: Option<String>,
    pub plural_form: Option<String>,
    pub prepositional_form: Option<String>,

    pub opposite_concepts: NameList,
    pub similar_concepts: NameList,
}

impl ConceptSpec {
    fn set_flags(&self) -> Vec<&'static str> {
        let pairs: [(&'static str, bool); 22] = [
            ("symmetric", self.symmetric),
            ("directional", self.directional),
            ("agentive", self.agentive),
            ("non_agentive", self.non_agentive),
            ("comparative", self.comparative),
            ("intent_based", self.intent_based),
            ("object_level", self.object_level),
            ("surface_level", self.surface_level),
            ("checks_equality", self.checks_equality),
            ("absolute_quantity_obj", self.absolute_quantity_obj),
            ("absolute_quantity_sub", self.absolute_quantity_sub),
            ("descriptive_obj", self.descriptive_obj),
            ("descriptive_sub", self.descriptive_sub),
            ("comparative_sub", self.comparative_sub),
            ("comparative_obj", self.comparative_obj),
            ("absolute_count_quantity_obj", self.absolute_count_quantity_obj),
            ("absolute_count_quantity_sub", self.absolute_count_quantity_sub),
            ("swappable_variables", self.swappable_variables),
            ("perception_based", self.perception_based),
            ("belief_based", self.belief_based),
            ("intent_based_comparative", self.intent_based_comparative),
            ("agent_as_object", self.agent_as_object),
        ];
        pairs.iter().filter(|(_, v)| *v).map(|(k, _)| *k).collect()
    }

    fn set_forms(&self) -> Vec<(&'static str, &String)> {
        [
            ("ing_form", self.ing_form.as_ref()),
            ("present_3sg_form", self.present_3sg_form.as_ref()),
            ("present_modal_form", self.present_modal_form.as_ref()),
            ("plural_form", self.plural_form.as_ref()),
            ("prepositional_form", self.prepositional_form.as_ref()),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect()
    }
}

/// An immutable concept, ready for template compilation.
#[derive(Debug, Clone)]
pub struct Concept {
    name: String,
    domain: String,
    kind: ConceptKind,
    flags: BTreeSet<&'static str>,
    ing_form: Option<String>,
    present_3sg_form: Option<String>,
    present_modal_form: Option<String>,
    plural_form: Option<String>,
    prepositional_form: Option<String>,
    opposites: Vec<String>,
    similars: Vec<String>,
}

impl Concept {
    /// Construct a concept from its specification record, resolving the
    /// [`ConceptKind`] and validating flags and forms against it.
    ///
    /// # Errors
    ///
    /// Returns [`TelarError::Specification`] when a flag or surface form not
    /// permitted by the resolved kind is set.
    pub fn from_spec(spec: ConceptSpec) -> Result<Self> {
        let kind = ConceptKind::resolve(&spec.concept_type, &spec.domain);

        let set_flags = spec.set_flags();
        for flag in &set_flags {
            if !kind.permitted_flags().contains(flag) {
                return Err(TelarError::specification(format!(
                    "concept `{}` ({:?}) does not accept flag `{flag}`",
                    spec.concept, kind
                )));
            }
        }
        for (form, _) in spec.set_forms() {
            if !kind.permitted_forms().contains(&form) {
                return Err(TelarError::specification(format!(
                    "concept `{}` ({:?}) does not accept surface form `{form}`",
                    spec.concept, kind
                )));
            }
        }

        Ok(Self {
            name: spec.concept,
            domain: spec.domain,
            kind,
            flags: set_flags.into_iter().collect(),
            ing_form: spec.ing_form,
            present_3sg_form: spec.present_3sg_form,
            present_modal_form: spec.present_modal_form,
            plural_form: spec.plural_form,
            prepositional_form: spec.prepositional_form,
            opposites: spec.opposite_concepts.into_names(),
            similars: spec.similar_concepts.into_names(),
        })
    }

    /// Concept lemma.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Domain classification.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Resolved specialization.
    #[must_use]
    pub fn kind(&self) -> ConceptKind {
        self.kind
    }

    /// Total capability lookup: `true` iff the flag is known and set.
    /// Criterion names may use hyphens; they are normalized to underscores.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        let normalized = name.replace('-', "_");
        self.flags.contains(normalized.as_str())
    }

    /// Shorthand for the `symmetric` capability.
    #[must_use]
    pub fn symmetric(&self) -> bool {
        self.flag("symmetric")
    }

    /// Declared surface form for a tag, if the specification defined one.
    #[must_use]
    pub fn surface_form(&self, tag: &str) -> Option<&str> {
        match tag {
            "ing_form" => self.ing_form.as_deref(),
            "present_3sg_form" => self.present_3sg_form.as_deref(),
            "present_modal_form" => self.present_modal_form.as_deref(),
            "plural_form" => self.plural_form.as_deref(),
            "prepositional_form" => self.prepositional_form.as_deref(),
            _ => None,
        }
    }

    /// Names of concepts declared opposite to this one.
    #[must_use]
    pub fn opposites(&self) -> &[String] {
        &self.opposites
    }

    /// Names of concepts declared similar to this one.
    #[must_use]
    pub fn similars(&self) -> &[String] {
        &self.similars
    }

    /// Whether `self` and `other` list each other as opposites.
    #[must_use]
    pub fn mutual_opposites(&self, other: &Concept) -> bool {
        self.opposites.iter().any(|n| n == other.name())
            && other.opposites.iter().any(|n| n == self.name())
    }
}

/// Best-effort inflection when a concept does not define a requested form.
///
/// `plural_form` applies s/es/ies pluralization, `ing_form` appends `ing`,
/// `present_3sg_form` applies s/es/ies verb rules, `present_modal_form`
/// prefixes `can`. Unknown tags return the lemma unchanged.
#[must_use]
pub fn fallback_form(tag: &str, lemma: &str) -> String {
    match tag {
        "plural_form" => pluralize(lemma),
        "ing_form" => format!("{lemma}ing"),
        "present_3sg_form" => third_singular(lemma),
        "present_modal_form" => format!("can {lemma}"),
        _ => lemma.to_string(),
    }
}

/// Present simple third-person-singular form of an infinitive.
fn third_singular(verb: &str) -> String {
    const ES_ENDINGS: [&str; 6] = ["o", "ch", "s", "sh", "x", "z"];
    if let Some(stem) = verb.strip_suffix('y') {
        format!("{stem}ies")
    } else if ES_ENDINGS.iter().any(|e| verb.ends_with(e)) {
        format!("{verb}es")
    } else {
        format!("{verb}s")
    }
}

/// Heuristic noun pluralization.
fn pluralize(noun: &str) -> String {
    const ES_ENDINGS: [&str; 5] = ["s", "x", "z", "ch", "sh"];
    let mut chars = noun.chars().rev();
    let last = chars.next();
    let second_last = chars.next();
    if last == Some('y') && second_last.is_some_and(|c| !"aeiou".contains(c)) {
        format!("{}ies", &noun[..noun.len() - 1])
    } else if ES_ENDINGS.iter().any(|e| noun.ends_with(e)) {
        format!("{noun}es")
    } else {
        format!("{noun}s")
    }
}
