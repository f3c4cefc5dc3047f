//! Query facade owning the current relationship snapshot.
//!
//! A new snapshot is always built in full before it replaces the current one,
//! so readers holding an `Arc<Snapshot>` never observe a partial index.

use std::{collections::HashSet, sync::Arc};

use log::{info, warn};
use parking_lot::RwLock;
use serde::Serialize;

use crate::{
    config::Config,
    error::{Error, Result},
    index::{BuildReport, RelationshipIndex},
    relationship::{parse_asn, Relationship},
    source::SnapshotSource,
    validator::{parse_path, ValidationPolicy, ValidationResult, ValleyFreeValidator},
};

/// One immutable, fully built dataset version.
#[derive(Debug)]
pub struct Snapshot {
    tag: String,
    index: RelationshipIndex,
    report: BuildReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotStats {
    pub tag: String,
    pub asns: usize,
    pub provider_customer: usize,
    pub peer_peer: usize,
    pub report: BuildReport,
}

impl Snapshot {
    pub fn build<I, S>(tag: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (index, report) = RelationshipIndex::build(lines);
        Snapshot {
            tag: tag.into(),
            index,
            report,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn index(&self) -> &RelationshipIndex {
        &self.index
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            tag: self.tag.clone(),
            asns: self.index.asn_count(),
            provider_customer: self.index.provider_customer_count(),
            peer_peer: self.index.peer_count(),
            report: self.report.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct AsRelService {
    current: RwLock<Option<Arc<Snapshot>>>,
    validator: ValleyFreeValidator,
}

impl AsRelService {
    pub fn new(policy: ValidationPolicy) -> Self {
        AsRelService {
            current: RwLock::new(None),
            validator: ValleyFreeValidator::new(policy),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.validation)
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.validator.policy()
    }

    /// Fetch snapshot `tag` from `source`, build it and make it current.
    ///
    /// On failure the previously loaded snapshot stays in place.
    pub fn load<S>(&self, source: &S, tag: &str) -> Result<Arc<Snapshot>>
    where
        S: SnapshotSource + ?Sized,
    {
        let lines = source.lines(tag)?;
        Ok(self.install(Snapshot::build(tag, lines)))
    }

    pub fn load_lines<I, S>(&self, tag: &str, lines: I) -> Arc<Snapshot>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.install(Snapshot::build(tag, lines))
    }

    /// Swap `snapshot` in as the current one.
    pub fn install(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        if snapshot.index.is_empty() {
            warn!("snapshot {} holds no relationships", snapshot.tag);
        }
        let snapshot = Arc::new(snapshot);
        let previous = self.current.write().replace(snapshot.clone());

        match previous {
            Some(previous) => info!(
                "replaced snapshot {} with {} ({} ASes)",
                previous.tag,
                snapshot.tag,
                snapshot.index.asn_count()
            ),
            None => info!(
                "loaded snapshot {} ({} ASes)",
                snapshot.tag,
                snapshot.index.asn_count()
            ),
        }
        snapshot
    }

    /// Current snapshot; fails until a non-empty snapshot is loaded.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>> {
        match self.current.read().as_ref() {
            Some(snapshot) if !snapshot.index.is_empty() => Ok(snapshot.clone()),
            _ => Err(Error::NotInitialized),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.snapshot().is_ok()
    }

    pub fn relationship(&self, a: u32, b: u32) -> Result<Relationship> {
        Ok(self.snapshot()?.index.relationship(a, b))
    }

    pub fn relationship_str(&self, a: &str, b: &str) -> Result<Relationship> {
        let (a, b) = (parse_asn(a)?, parse_asn(b)?);
        self.relationship(a, b)
    }

    pub fn is_valley_free(&self, path: &[u32]) -> Result<ValidationResult> {
        let snapshot = self.snapshot()?;
        Ok(self.validator.check(&snapshot.index, path))
    }

    pub fn check_path_str(&self, path: &str) -> Result<ValidationResult> {
        let path = parse_path(path)?;
        self.is_valley_free(&path)
    }

    pub fn providers_of(&self, asn: u32) -> Result<HashSet<u32>> {
        Ok(self
            .snapshot()?
            .index
            .providers_of(asn)
            .cloned()
            .unwrap_or_default())
    }

    pub fn customers_of(&self, asn: u32) -> Result<HashSet<u32>> {
        Ok(self
            .snapshot()?
            .index
            .customers_of(asn)
            .cloned()
            .unwrap_or_default())
    }

    pub fn peers_of(&self, asn: u32) -> Result<HashSet<u32>> {
        Ok(self
            .snapshot()?
            .index
            .peers_of(asn)
            .cloned()
            .unwrap_or_default())
    }
}
