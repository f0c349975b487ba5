//! Orchestrator module for the seeder.
//!
//! Coordinates the loader, inserter, and reconciler for a seeding run, and
//! drives the offline remap of a fixture directory.

use rand::rngs::StdRng;
use rand::SeedableRng;
use seeder_repository::{Credentials, RecordStore};
use seeder_shared::{CollectionSpec, EntityCollection, SeedPlan};
use tracing::{info, instrument};

use crate::inserter::{insert_collection, PendingLinks};
use crate::loader::{assign_placeholder_ids, prepare_collection, CollectionSource, JsonDirectorySource};
use crate::planner;
use crate::reconciler::{build_patches, reconcile};
use crate::remapper::{CanonicalIdGenerator, IdRemapper, RewriteMode};
use crate::report::SeedReport;
use crate::SeedError;

/// Seeder that runs one plan against one record store.
///
/// A run:
/// - Validates the plan and resolves the insertion order
/// - Authenticates once against the store
/// - Loads every collection before inserting anything
/// - Inserts collections in dependency order with references stripped
/// - Relinks references and pushes one update per record
pub struct Seeder {
    store: Box<dyn RecordStore>,
    source: Box<dyn CollectionSource>,
    plan: SeedPlan,
    credentials: Credentials,
    rng: StdRng,
}

impl Seeder {
    /// Create a seeder with an entropy-seeded RNG.
    pub fn new(
        store: Box<dyn RecordStore>,
        source: Box<dyn CollectionSource>,
        plan: SeedPlan,
        credentials: Credentials,
    ) -> Self {
        Self {
            store,
            source,
            plan,
            credentials,
            rng: StdRng::from_entropy(),
        }
    }

    /// Use a fixed seed for synthetic relationships.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn plan(&self) -> &SeedPlan {
        &self.plan
    }

    /// Run the seeding pipeline.
    ///
    /// # Returns
    ///
    /// * `Ok(SeedReport)` - The run completed; per-record problems are in the report
    /// * `Err(SeedError)` - The plan is invalid, authentication failed, or a
    ///   collection could not be loaded. Nothing was inserted.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<SeedReport, SeedError> {
        let order: Vec<CollectionSpec> = planner::load_order(&self.plan)?
            .into_iter()
            .cloned()
            .collect();
        info!(
            collections = order.len(),
            "Starting seeding run"
        );

        self.store.authenticate(&self.credentials).await?;
        info!(identity = %self.credentials.identity, "Authenticated against record store");

        let mut collections = Vec::with_capacity(order.len());
        for spec in &order {
            let raw = self.source.load(&spec.name).await?;
            let prepared = prepare_collection(raw, spec)?;
            info!(collection = %spec.name, records = prepared.len(), "Loaded collection");
            collections.push(prepared);
        }

        let mut report = SeedReport::new();
        let mut remapper = IdRemapper::new(CanonicalIdGenerator::random());
        let mut pending: Vec<Vec<PendingLinks>> = Vec::with_capacity(order.len());

        for (spec, collection) in order.iter().zip(&collections) {
            let outcome =
                insert_collection(self.store.as_ref(), &mut remapper, spec, collection).await;

            let summary = report.collection_mut(&spec.name);
            summary.total = outcome.attempted;
            summary.inserted = outcome.assigned.len();
            report.failures.extend(outcome.failures);
            pending.push(outcome.pending);
        }

        for (spec, links) in order.iter().zip(&pending) {
            let set = build_patches(spec, links, &mut remapper, &mut self.rng);
            let outcome = reconcile(self.store.as_ref(), &spec.name, &set).await;

            report.collection_mut(&spec.name).updated = outcome.updated;
            report.failures.extend(outcome.failures);
            report.gaps.extend(set.gaps);
            report.shortfalls.extend(set.shortfalls);
        }

        report.finish();
        report.log_summary();
        Ok(report)
    }
}

/// Counters from an offline remap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapSummary {
    pub collections: usize,
    pub records: usize,
    pub references: usize,
}

/// Give every record in the directory a fresh canonical id and rewrite all
/// references through the same mapping, then write the files back.
///
/// Ids are mapped per collection, and each reference is resolved in its
/// field's target collection. References to ids that belong to no record are
/// allocated ids too, so the rewritten data never mixes old and new ids. Records without an id get a
/// placeholder first when their collection declares a prefix.
#[instrument(skip_all, fields(root = %source.root().display()))]
pub async fn remap_directory(
    source: &JsonDirectorySource,
    plan: &SeedPlan,
    generator: CanonicalIdGenerator,
) -> Result<RemapSummary, SeedError> {
    planner::validate(plan)?;

    let mut collections: Vec<EntityCollection> = Vec::with_capacity(plan.collections.len());
    for spec in &plan.collections {
        let mut collection = source.load(&spec.name).await?;
        assign_placeholder_ids(&mut collection, spec)?;
        collections.push(collection);
    }

    let mut remapper = IdRemapper::new(generator);
    let mut summary = RemapSummary::default();

    for (spec, collection) in plan.collections.iter().zip(collections.iter_mut()) {
        for record in collection.records_mut() {
            let original = record.id().unwrap_or_default().to_string();
            let canonical = remapper.resolve(&spec.name, &original);
            remapper.bind(&spec.name, &original, &canonical)?;
            record.set_id(canonical);
            summary.records += 1;
        }
    }

    for (spec, collection) in plan.collections.iter().zip(collections.iter_mut()) {
        for record in collection.records_mut() {
            let outcome =
                remapper.rewrite_references(record, &spec.references, RewriteMode::Allocate);
            summary.references += outcome.kept;
        }
    }

    for collection in &collections {
        source.store(collection).await?;
        summary.collections += 1;
    }

    info!(
        collections = summary.collections,
        records = summary.records,
        references = summary.references,
        "Remapped collections"
    );
    Ok(summary)
}
