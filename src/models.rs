use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::InventoryError;

/// Metadata read from an installed dependency's own `package.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyMetadata {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One application's declaration of a dependency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Declaration {
    pub application: PathBuf,
    pub spec: String,
}

/// A reported dependency whose declaring applications disagree on the
/// version specifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict<'a> {
    pub identifier: &'a str,
    pub reported_version: &'a str,
    pub declarations: &'a [Declaration],
}

/// One report row, borrowed from an [`AggregateReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry<'a> {
    pub identifier: &'a str,
    pub name: &'a str,
    pub version: &'a str,
    pub description: Option<&'a str>,
}

/// The aggregated report: identifiers in first-seen order plus the metadata
/// resolved for each of them.
///
/// Identifiers and metadata are only ever added together through
/// [`AggregateReport::record`], so every identifier in the sequence has a
/// name, a version and an optional description, and none appears twice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateReport {
    order: Vec<String>,
    metadata: HashMap<String, DependencyMetadata>,
    declarations: HashMap<String, Vec<Declaration>>,
}

impl AggregateReport {
    pub fn contains(&self, identifier: &str) -> bool {
        self.metadata.contains_key(identifier)
    }

    /// Record resolved metadata for `identifier`.
    ///
    /// First seen wins: returns `false` and leaves the report untouched when
    /// the identifier is already present.
    pub fn record(&mut self, identifier: String, metadata: DependencyMetadata) -> bool {
        if self.contains(&identifier) {
            return false;
        }
        self.metadata.insert(identifier.clone(), metadata);
        self.order.push(identifier);
        true
    }

    /// Note that an application declares an already-reported identifier.
    /// Declarations of identifiers not in the report are ignored.
    pub fn declare(&mut self, identifier: &str, declaration: Declaration) {
        if !self.contains(identifier) {
            return;
        }
        self.declarations
            .entry(identifier.to_string())
            .or_default()
            .push(declaration);
    }

    pub fn identifiers(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn metadata(&self, identifier: &str) -> Option<&DependencyMetadata> {
        self.metadata.get(identifier)
    }

    pub fn version(&self, identifier: &str) -> Option<&str> {
        self.metadata(identifier).map(|m| m.version.as_str())
    }

    /// Rows in report order.
    pub fn entries(&self) -> impl Iterator<Item = ReportEntry<'_>> {
        self.order.iter().filter_map(move |id| {
            self.metadata.get(id).map(|m| ReportEntry {
                identifier: id,
                name: &m.name,
                version: &m.version,
                description: m.description.as_deref(),
            })
        })
    }

    /// Reported identifiers declared with more than one distinct specifier,
    /// in report order.
    pub fn conflicts(&self) -> Vec<Conflict<'_>> {
        self.order
            .iter()
            .filter_map(|id| {
                let declarations = self.declarations.get(id)?;
                let specs: HashSet<&str> =
                    declarations.iter().map(|d| d.spec.as_str()).collect();
                if specs.len() < 2 {
                    return None;
                }
                Some(Conflict {
                    identifier: id,
                    reported_version: self.version(id).unwrap_or_default(),
                    declarations,
                })
            })
            .collect()
    }
}

/// An application whose work was abandoned in keep-going mode.
#[derive(Debug)]
pub struct SkippedApplication {
    pub application: PathBuf,
    pub error: InventoryError,
    /// Identifiers left out of the report because of this failure.
    pub unresolved: Vec<String>,
}

/// Result of a full aggregation run.
#[derive(Debug, Default)]
pub struct Aggregation {
    pub report: AggregateReport,
    pub skipped: Vec<SkippedApplication>,
}

impl Aggregation {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}
