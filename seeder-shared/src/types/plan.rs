//! Seed plan types.
//!
//! A seed plan declares which collections are seeded, which of their fields
//! reference other collections, and how each reference is filled once the
//! record store has assigned canonical ids. Plans can be built in code or
//! deserialized from JSON.

use serde::{Deserialize, Serialize};

/// How a reference field is filled during reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipMode {
    /// Copy the original references through the identifier mapping.
    #[default]
    Direct,
    /// Replace the field with a random sample of known ids from the target
    /// collection, `min_count..=max_count` entries long.
    Synthetic { min_count: usize, max_count: usize },
}

/// A field holding one or more ids of records in `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceField {
    pub name: String,
    pub target: String,
    #[serde(default)]
    pub mode: RelationshipMode,
}

impl ReferenceField {
    /// A reference copied through from the source data.
    pub fn direct(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            mode: RelationshipMode::Direct,
        }
    }

    /// A reference synthesized by sampling the target collection.
    pub fn synthetic(
        name: impl Into<String>,
        target: impl Into<String>,
        min_count: usize,
        max_count: usize,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            mode: RelationshipMode::Synthetic {
                min_count,
                max_count,
            },
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self.mode, RelationshipMode::Synthetic { .. })
    }
}

/// What the inserter does with references into the record's own collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfReferencePolicy {
    /// Strip self-references before insertion like any other reference.
    #[default]
    Suppress,
    /// Send the self-references that already point at an inserted record of
    /// the same collection. Everything is still relinked on reconciliation.
    ResolveKnown,
}

/// Seeding instructions for one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    #[serde(default)]
    pub references: Vec<ReferenceField>,
    /// Fields dropped from every record before insertion and never restored.
    #[serde(default)]
    pub omit_fields: Vec<String>,
    /// Prefix used to assign placeholder ids to records that have none.
    #[serde(default)]
    pub placeholder_prefix: Option<String>,
    #[serde(default)]
    pub self_references: SelfReferencePolicy,
    /// Keep the record's own `id` in the create payload.
    #[serde(default)]
    pub send_original_id: bool,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            references: Vec::new(),
            omit_fields: Vec::new(),
            placeholder_prefix: None,
            self_references: SelfReferencePolicy::default(),
            send_original_id: false,
        }
    }

    pub fn with_reference(mut self, field: ReferenceField) -> Self {
        self.references.push(field);
        self
    }

    pub fn with_omitted(mut self, field: impl Into<String>) -> Self {
        self.omit_fields.push(field.into());
        self
    }

    pub fn with_placeholder_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.placeholder_prefix = Some(prefix.into());
        self
    }

    pub fn with_self_references(mut self, policy: SelfReferencePolicy) -> Self {
        self.self_references = policy;
        self
    }

    pub fn sending_original_id(mut self) -> Self {
        self.send_original_id = true;
        self
    }

    /// Names of all declared reference fields.
    pub fn reference_names(&self) -> Vec<&str> {
        self.references.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn reference(&self, name: &str) -> Option<&ReferenceField> {
        self.references.iter().find(|r| r.name == name)
    }

    pub fn is_self_reference(&self, field: &ReferenceField) -> bool {
        field.target == self.name
    }

    /// Distinct collections this one depends on, excluding itself, in
    /// declaration order.
    pub fn dependencies(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = Vec::new();
        for field in &self.references {
            if field.target != self.name && !deps.contains(&field.target.as_str()) {
                deps.push(field.target.as_str());
            }
        }
        deps
    }
}

/// The full set of collections to seed, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPlan {
    pub collections: Vec<CollectionSpec>,
}

impl SeedPlan {
    pub fn new(collections: Vec<CollectionSpec>) -> Self {
        Self { collections }
    }

    /// The plan for the research platform's four collections.
    ///
    /// Users have no outgoing references and their uploaded profile picture
    /// is not seeded. Profiles point at users; research projects and models
    /// cross-reference each other and themselves.
    pub fn research_platform() -> Self {
        Self::new(vec![
            CollectionSpec::new("users")
                .with_placeholder_prefix("user")
                .with_omitted("profile_picture"),
            CollectionSpec::new("profiles").with_reference(ReferenceField::direct("user", "users")),
            CollectionSpec::new("research_projects")
                .with_placeholder_prefix("project")
                .with_reference(ReferenceField::direct("collaborators", "users"))
                .with_reference(ReferenceField::direct(
                    "related_projects",
                    "research_projects",
                ))
                .with_reference(ReferenceField::direct("related_models", "models")),
            CollectionSpec::new("models")
                .with_placeholder_prefix("model")
                .with_reference(ReferenceField::direct(
                    "related_projects",
                    "research_projects",
                ))
                .with_reference(ReferenceField::direct("related_models", "models")),
        ])
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionSpec> {
        self.collections.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.collections.iter().map(|c| c.name.as_str()).collect()
    }
}
