//! Cross-application dependency aggregation.
//!
//! # Flow
//! For each application root, in order:
//! 1. Read `<root>/package.json` and keep the third-party identifiers.
//! 2. Drop identifiers an earlier application already contributed.
//! 3. Resolve the rest against this root, at most `concurrency` at a time,
//!    and wait for all of them.
//! 4. Commit the resolved metadata to the [`AggregateReport`].
//!
//! Nothing from an application is committed until step 3 has finished, so a
//! failing application never leaves partial state behind.

use std::path::{Path, PathBuf};

use futures::future::join_all;
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use crate::error::{InventoryError, Result};
use crate::installer::Installer;
use crate::manifest::{read_manifest, Manifest, NamespacePolicy, MANIFEST_FILE};
use crate::models::{
    AggregateReport, Aggregation, Declaration, DependencyMetadata, SkippedApplication,
};
use crate::resolver::MetadataResolver;

pub const DEFAULT_CONCURRENCY: usize = 8;

pub struct Aggregator<I> {
    resolver: MetadataResolver<I>,
    policy: NamespacePolicy,
    concurrency: usize,
    keep_going: bool,
    progress: ProgressBar,
}

type Resolved = (String, Result<DependencyMetadata>);

impl<I: Installer> Aggregator<I> {
    pub fn new(resolver: MetadataResolver<I>, policy: NamespacePolicy) -> Self {
        Self {
            resolver,
            policy,
            concurrency: DEFAULT_CONCURRENCY,
            keep_going: false,
            progress: ProgressBar::hidden(),
        }
    }

    /// Bound on concurrent resolutions within one application. Clamped to 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Record failing applications instead of aborting the run.
    pub fn keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Aggregate the third-party dependencies of `applications`, in order.
    pub async fn aggregate(&self, applications: &[PathBuf]) -> Result<Aggregation> {
        if applications.is_empty() {
            return Err(InventoryError::Configuration(
                "no applications to inventory".to_string(),
            ));
        }

        let mut aggregation = Aggregation::default();

        for root in applications {
            info!(application = %root.display(), "start");
            if let Err(error) = self.aggregate_application(root, &mut aggregation).await {
                if !self.keep_going {
                    self.progress.abandon();
                    return Err(error);
                }
                warn!(application = %root.display(), "skipping: {}", error);
                aggregation.skipped.push(SkippedApplication {
                    application: root.clone(),
                    error,
                    unresolved: Vec::new(),
                });
            }
            info!(application = %root.display(), "done");
        }

        self.progress.finish_and_clear();

        for conflict in aggregation.report.conflicts() {
            let declared: Vec<String> = conflict
                .declarations
                .iter()
                .map(|d| format!("{} in {}", d.spec, d.application.display()))
                .collect();
            warn!(
                dependency = conflict.identifier,
                reported = conflict.reported_version,
                "declared with different versions: {}",
                declared.join(", ")
            );
        }

        debug!(order = ?aggregation.report.identifiers(), "report order");
        info!(
            dependencies = aggregation.report.len(),
            skipped = aggregation.skipped.len(),
            "aggregation finished"
        );
        Ok(aggregation)
    }

    /// Process one application. Errors returned from here leave
    /// `aggregation` untouched; per-dependency failures in keep-going mode are
    /// recorded directly.
    async fn aggregate_application(
        &self,
        root: &Path,
        aggregation: &mut Aggregation,
    ) -> Result<()> {
        let manifest = read_manifest(&root.join(MANIFEST_FILE), &self.policy)?;
        debug!(
            internal = manifest.internal_dependencies.len(),
            other = manifest.other_dependencies.len(),
            "manifest read"
        );

        let fresh: Vec<String> = manifest
            .other_dependencies
            .iter()
            .filter(|id| !aggregation.report.contains(id))
            .cloned()
            .collect();

        if fresh.is_empty() {
            debug!(application = %root.display(), "no new dependencies");
            record_declarations(&mut aggregation.report, &manifest, root);
            return Ok(());
        }

        let results = self.resolve_all(&fresh, root).await;

        let mut resolved = Vec::with_capacity(results.len());
        let mut unresolved = Vec::new();
        let mut first_error = None;
        for (identifier, result) in results {
            match result {
                Ok(metadata) => resolved.push((identifier, metadata)),
                Err(e) => {
                    debug!(dependency = %identifier, "{}", e);
                    unresolved.push(identifier);
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(error) = first_error {
            if !self.keep_going {
                return Err(error);
            }
            warn!(
                application = %root.display(),
                unresolved = unresolved.len(),
                "continuing without unresolved dependencies: {}",
                error
            );
            aggregation.skipped.push(SkippedApplication {
                application: root.to_path_buf(),
                error,
                unresolved,
            });
        }

        for (identifier, metadata) in resolved {
            aggregation.report.record(identifier, metadata);
        }
        record_declarations(&mut aggregation.report, &manifest, root);
        Ok(())
    }

    /// Resolve `identifiers` under `root` in batches of `concurrency`,
    /// returning results in input order. In fail-fast mode, stops after the
    /// first batch that contains a failure.
    async fn resolve_all(&self, identifiers: &[String], root: &Path) -> Vec<Resolved> {
        self.progress.inc_length(identifiers.len() as u64);
        self.progress.set_message(root.display().to_string());

        let mut results = Vec::with_capacity(identifiers.len());
        for batch in identifiers.chunks(self.concurrency) {
            let futures = batch.iter().map(|identifier| async move {
                let result = self.resolver.resolve_metadata(identifier, root).await;
                (identifier.clone(), result)
            });
            let batch_results = join_all(futures).await;
            self.progress.inc(batch.len() as u64);

            let failed = batch_results.iter().any(|(_, r)| r.is_err());
            results.extend(batch_results);
            if failed && !self.keep_going {
                break;
            }
        }
        results
    }
}

fn record_declarations(report: &mut AggregateReport, manifest: &Manifest, root: &Path) {
    for dep in &manifest.all_dependencies {
        report.declare(
            &dep.identifier,
            Declaration {
                application: root.to_path_buf(),
                spec: dep.spec.clone(),
            },
        );
    }
}
