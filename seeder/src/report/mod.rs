//! Run-level report of everything that did not abort the run.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Stage at which a record failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Insert,
    Update,
}

/// A record the store did not accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub collection: String,
    /// Original id for insert failures, canonical id for update failures.
    pub record_id: String,
    pub stage: FailureStage,
    pub detail: String,
}

/// A reference dropped because its target was never inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferentialGap {
    pub collection: String,
    pub record_id: String,
    pub field: String,
    pub reference: String,
}

/// A synthetic field that got fewer ids than drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplingShortfall {
    pub collection: String,
    pub record_id: String,
    pub field: String,
    pub target: String,
    pub requested: usize,
    pub available: usize,
}

/// Per-collection counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionSummary {
    pub name: String,
    pub total: usize,
    pub inserted: usize,
    pub updated: usize,
}

/// Outcome of a seeding run.
#[derive(Debug, Clone)]
pub struct SeedReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub collections: Vec<CollectionSummary>,
    pub failures: Vec<RecordFailure>,
    pub gaps: Vec<ReferentialGap>,
    pub shortfalls: Vec<SamplingShortfall>,
}

impl Default for SeedReport {
    fn default() -> Self {
        Self::new()
    }
}

impl SeedReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            collections: Vec::new(),
            failures: Vec::new(),
            gaps: Vec::new(),
            shortfalls: Vec::new(),
        }
    }

    /// Counters for `name`, created on first use.
    pub fn collection_mut(&mut self, name: &str) -> &mut CollectionSummary {
        let index = match self.collections.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                self.collections.push(CollectionSummary {
                    name: name.to_string(),
                    ..CollectionSummary::default()
                });
                self.collections.len() - 1
            }
        };
        &mut self.collections[index]
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionSummary> {
        self.collections.iter().find(|c| c.name == name)
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn insert_failures(&self) -> impl Iterator<Item = &RecordFailure> {
        self.failures
            .iter()
            .filter(|f| f.stage == FailureStage::Insert)
    }

    pub fn update_failures(&self) -> impl Iterator<Item = &RecordFailure> {
        self.failures
            .iter()
            .filter(|f| f.stage == FailureStage::Update)
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Wall time of the run, once finished.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }

    /// Log one line per collection and one per failure.
    pub fn log_summary(&self) {
        for summary in &self.collections {
            info!(
                collection = %summary.name,
                total = summary.total,
                inserted = summary.inserted,
                updated = summary.updated,
                "Collection seeded"
            );
        }

        for failure in &self.failures {
            warn!(
                collection = %failure.collection,
                record_id = %failure.record_id,
                stage = ?failure.stage,
                detail = %failure.detail,
                "Record failed"
            );
        }

        info!(
            started_at = %self.started_at.to_rfc3339(),
            duration_ms = self.duration().map(|d| d.num_milliseconds()).unwrap_or_default(),
            insert_failures = self.insert_failures().count(),
            update_failures = self.update_failures().count(),
            referential_gaps = self.gaps.len(),
            sampling_shortfalls = self.shortfalls.len(),
            "Seeding report"
        );
    }
}
