//! Batch derivation engine
//!
//! Runs the two-phase pipeline over every discovered document:
//! - **Derive**: documents are read and derived concurrently, bounded by a
//!   semaphore, with CPU-bound parsing on the blocking pool and a per-document timeout
//! - **Persist**: every derived graph is stored before any linking starts, so
//!   cross-document references can see the whole batch
//! - **Link**: each graph is linked against the repository and its updated
//!   relationships are persisted again
//!
//! A failing document never stops the others; it is reported with its error.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::artifact::{Artifact, DocumentType};
use crate::deriver::{DerivedGraph, Deriver};
use crate::error::{DeriveError, Result};
use crate::file_discovery::{DiscoveredDocument, FileDiscovery};
use crate::registry::DeriverRegistry;
use crate::repository::InMemoryRepository;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub max_concurrent_derivations: usize,
    /// Applies to each document's derive step and to its link step separately
    pub derivation_timeout: Duration,
    /// Skip persistence and linking for the whole batch once any document fails
    pub fail_fast: bool,
    pub link: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_derivations: num_cpus::get(),
            derivation_timeout: Duration::from_secs(30),
            fail_fast: false,
            link: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStatus {
    /// Derived, persisted and linked
    Linked,
    /// Derived and persisted; linking was disabled
    Derived,
    Failed { message: String },
    Skipped { reason: String },
}

impl DocumentStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, DocumentStatus::Linked | DocumentStatus::Derived)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DocumentStatus::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, DocumentStatus::Skipped { .. })
    }
}

/// Outcome for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    pub path: PathBuf,
    pub document_type: DocumentType,
    pub status: DocumentStatus,
    pub primary_uuid: Option<Uuid>,
    pub target_namespace: Option<String>,
    /// Derived artifacts, not counting the primary document
    pub artifacts: usize,
    pub unresolved_after_derive: usize,
    pub resolved_at_link: usize,
    pub dropped_at_link: usize,
    pub duration: Duration,
}

impl DocumentResult {
    pub fn failed(document: DiscoveredDocument, error: &DeriveError, duration: Duration) -> Self {
        Self {
            path: document.path,
            document_type: document.document_type,
            status: DocumentStatus::Failed {
                message: error.to_string(),
            },
            primary_uuid: None,
            target_namespace: None,
            artifacts: 0,
            unresolved_after_derive: 0,
            resolved_at_link: 0,
            dropped_at_link: 0,
            duration,
        }
    }

    /// Mark an already persisted document as failed, keeping its counts.
    pub fn into_failed(self, error: &DeriveError, duration: Duration) -> Self {
        Self {
            status: DocumentStatus::Failed {
                message: error.to_string(),
            },
            duration,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationPhase {
    Discovery,
    Derivation,
    Persistence,
    Linking,
    Complete,
}

#[derive(Debug, Clone)]
pub struct DerivationProgress {
    pub current_file: Option<PathBuf>,
    pub completed: usize,
    pub total: usize,
    pub phase: DerivationPhase,
}

pub type ProgressCallback = Arc<dyn Fn(DerivationProgress) + Send + Sync>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_duration: Duration,
    pub discovery_duration: Duration,
    pub derivation_duration: Duration,
    pub persistence_duration: Duration,
    pub link_duration: Duration,
    pub average_time_per_document: Duration,
    pub throughput_documents_per_second: f64,
    pub concurrent_derivations: usize,
}

/// Aggregated results of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivationResults {
    pub total_documents: usize,
    pub linked_documents: usize,
    pub derived_documents: usize,
    pub failed_documents: usize,
    pub skipped_documents: usize,
    pub total_artifacts: usize,
    pub total_unresolved: usize,
    pub total_resolved: usize,
    pub total_dropped: usize,
    pub file_results: Vec<DocumentResult>,
    pub performance_metrics: PerformanceMetrics,
}

impl DerivationResults {
    pub fn aggregate(file_results: Vec<DocumentResult>) -> Self {
        let mut results = Self {
            total_documents: file_results.len(),
            linked_documents: 0,
            derived_documents: 0,
            failed_documents: 0,
            skipped_documents: 0,
            total_artifacts: 0,
            total_unresolved: 0,
            total_resolved: 0,
            total_dropped: 0,
            file_results: Vec::new(),
            performance_metrics: PerformanceMetrics::default(),
        };

        for result in &file_results {
            match result.status {
                DocumentStatus::Linked => results.linked_documents += 1,
                DocumentStatus::Derived => results.derived_documents += 1,
                DocumentStatus::Failed { .. } => results.failed_documents += 1,
                DocumentStatus::Skipped { .. } => results.skipped_documents += 1,
            }
            results.total_artifacts += result.artifacts;
            results.total_unresolved += result.unresolved_after_derive;
            results.total_resolved += result.resolved_at_link;
            results.total_dropped += result.dropped_at_link;
        }

        let total: Duration = file_results.iter().map(|r| r.duration).sum();
        results.performance_metrics.derivation_duration = total;
        results.performance_metrics.total_duration = total;
        results.performance_metrics.average_time_per_document = average(total, file_results.len());
        results.file_results = file_results;
        results
    }

    pub fn with_metrics(
        file_results: Vec<DocumentResult>,
        performance_metrics: PerformanceMetrics,
    ) -> Self {
        let mut results = Self::aggregate(file_results);
        results.performance_metrics = performance_metrics;
        results
    }

    pub fn has_failures(&self) -> bool {
        self.failed_documents > 0
    }

    pub fn all_succeeded(&self) -> bool {
        self.total_documents > 0
            && self.linked_documents + self.derived_documents == self.total_documents
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_documents == 0 {
            0.0
        } else {
            (self.linked_documents + self.derived_documents) as f64 / self.total_documents as f64
                * 100.0
        }
    }
}

fn average(total: Duration, count: usize) -> Duration {
    u32::try_from(count)
        .ok()
        .filter(|&n| n > 0)
        .map_or(Duration::ZERO, |n| total / n)
}

/// A document that made it through derivation, waiting to be persisted and linked.
struct Derived {
    document: DiscoveredDocument,
    primary: Artifact,
    graph: DerivedGraph,
    unresolved_after_derive: usize,
    derive_duration: Duration,
}

impl Derived {
    fn relationship_count(&self) -> usize {
        self.primary.relationships().len() + self.graph.relationship_count()
    }

    fn unresolved_count(&self) -> usize {
        self.primary.unresolved_count() + self.graph.unresolved_count()
    }

    fn finish(
        self,
        status: DocumentStatus,
        resolved_at_link: usize,
        dropped_at_link: usize,
        duration: Duration,
    ) -> DocumentResult {
        self.summary(status, resolved_at_link, dropped_at_link, duration)
    }

    fn summary(
        &self,
        status: DocumentStatus,
        resolved_at_link: usize,
        dropped_at_link: usize,
        duration: Duration,
    ) -> DocumentResult {
        DocumentResult {
            path: self.document.path.clone(),
            document_type: self.document.document_type.clone(),
            status,
            primary_uuid: self.primary.uuid,
            target_namespace: self.primary.target_namespace().map(str::to_string),
            artifacts: self.graph.len(),
            unresolved_after_derive: self.unresolved_after_derive,
            resolved_at_link,
            dropped_at_link,
            duration,
        }
    }
}

type Outcome = std::result::Result<Derived, DocumentResult>;

pub struct DerivationEngine {
    registry: Arc<DeriverRegistry>,
    repository: Arc<InMemoryRepository>,
    config: EngineConfig,
}

impl DerivationEngine {
    pub fn new(
        registry: Arc<DeriverRegistry>,
        repository: Arc<InMemoryRepository>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            repository,
            config,
        }
    }

    pub async fn run(&self, path: &Path, discovery: &FileDiscovery) -> Result<DerivationResults> {
        self.run_with_progress(path, discovery, None).await
    }

    pub async fn run_with_progress(
        &self,
        path: &Path,
        discovery: &FileDiscovery,
        progress: Option<ProgressCallback>,
    ) -> Result<DerivationResults> {
        let run_start = Instant::now();
        let mut metrics = PerformanceMetrics {
            concurrent_derivations: self.config.max_concurrent_derivations,
            ..PerformanceMetrics::default()
        };

        report(&progress, None, 0, 0, DerivationPhase::Discovery);
        let discovery_start = Instant::now();
        let documents = discovery.discover(path).await?;
        metrics.discovery_duration = discovery_start.elapsed();
        info!(root = %path.display(), documents = documents.len(), "documents discovered");

        if documents.is_empty() {
            metrics.total_duration = run_start.elapsed();
            return Ok(DerivationResults::with_metrics(Vec::new(), metrics));
        }

        let results = self
            .process_documents(documents, progress.clone(), &mut metrics)
            .await;

        metrics.total_duration = run_start.elapsed();
        metrics.average_time_per_document = average(metrics.derivation_duration, results.len());
        metrics.throughput_documents_per_second = if metrics.total_duration.as_secs_f64() > 0.0 {
            results.len() as f64 / metrics.total_duration.as_secs_f64()
        } else {
            0.0
        };

        let results = DerivationResults::with_metrics(results, metrics);
        report(
            &progress,
            None,
            results.total_documents,
            results.total_documents,
            DerivationPhase::Complete,
        );
        Ok(results)
    }

    /// Derive, persist and link an already discovered batch. Results keep the
    /// order of `documents`.
    pub async fn process_documents(
        &self,
        documents: Vec<DiscoveredDocument>,
        progress: Option<ProgressCallback>,
        metrics: &mut PerformanceMetrics,
    ) -> Vec<DocumentResult> {
        let derive_start = Instant::now();
        let outcomes = self.derive_all(documents, progress.clone()).await;
        metrics.derivation_duration = derive_start.elapsed();

        let mut results: Vec<Option<DocumentResult>> = Vec::with_capacity(outcomes.len());
        let mut derived = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(d) => {
                    derived.push((results.len(), d));
                    results.push(None);
                }
                Err(failed) => results.push(Some(failed)),
            }
        }

        let any_failed = derived.len() < results.len();
        if self.config.fail_fast && any_failed {
            warn!("derivation failed with fail-fast enabled, skipping persistence and linking");
            for (index, d) in derived {
                let duration = d.derive_duration;
                results[index] = Some(d.finish(
                    DocumentStatus::Skipped {
                        reason: "Skipped after another document failed (fail-fast)".to_string(),
                    },
                    0,
                    0,
                    duration,
                ));
            }
            return results.into_iter().flatten().collect();
        }

        report(&progress, None, 0, derived.len(), DerivationPhase::Persistence);
        let persist_start = Instant::now();
        for (_, d) in &mut derived {
            self.repository.persist_graph(&mut d.primary, &mut d.graph);
        }
        metrics.persistence_duration = persist_start.elapsed();
        debug!(stored = self.repository.len(), "batch persisted");

        if self.config.link {
            let link_start = Instant::now();
            for (index, result) in self.link_all(derived, progress).await {
                results[index] = Some(result);
            }
            metrics.link_duration = link_start.elapsed();
        } else {
            for (index, d) in derived {
                let duration = d.derive_duration;
                results[index] = Some(d.finish(DocumentStatus::Derived, 0, 0, duration));
            }
        }

        results.into_iter().flatten().collect()
    }

    async fn derive_all(
        &self,
        documents: Vec<DiscoveredDocument>,
        progress: Option<ProgressCallback>,
    ) -> Vec<Outcome> {
        let total = documents.len();
        let completed = Arc::new(AtomicUsize::new(0));
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_derivations));
        let timeout = self.config.derivation_timeout;

        let (documents, tasks): (Vec<_>, Vec<_>) = documents
            .into_iter()
            .map(|document| {
                let deriver = self.registry.shared(&document.document_type);
                let semaphore = Arc::clone(&semaphore);
                let completed = Arc::clone(&completed);
                let progress = progress.clone();
                let task_document = document.clone();

                let task = tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire().await else {
                        let err = DeriveError::Concurrency {
                            details: "Derivation semaphore closed".to_string(),
                        };
                        return Err(DocumentResult::failed(task_document, &err, Duration::ZERO));
                    };

                    let path = task_document.path.clone();
                    let outcome = derive_one(deriver, task_document, timeout).await;

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    report(&progress, Some(path), done, total, DerivationPhase::Derivation);
                    outcome
                });
                (document, task)
            })
            .unzip();

        join_all(tasks)
            .await
            .into_iter()
            .zip(documents)
            .map(|(joined, document)| {
                joined.unwrap_or_else(|err| {
                    let err = DeriveError::Concurrency {
                        details: format!("Derivation task failed: {}", err),
                    };
                    Err(DocumentResult::failed(document, &err, Duration::ZERO))
                })
            })
            .collect()
    }

    async fn link_all(
        &self,
        derived: Vec<(usize, Derived)>,
        progress: Option<ProgressCallback>,
    ) -> Vec<(usize, DocumentResult)> {
        let total = derived.len();
        let completed = Arc::new(AtomicUsize::new(0));
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_derivations));
        let timeout = self.config.derivation_timeout;

        let (placeholders, tasks): (Vec<_>, Vec<_>) = derived
            .into_iter()
            .map(|(index, d)| {
                let deriver = self.registry.shared(&d.document.document_type);
                let repository = Arc::clone(&self.repository);
                let semaphore = Arc::clone(&semaphore);
                let completed = Arc::clone(&completed);
                let progress = progress.clone();
                let document = d.document.clone();

                let task = tokio::spawn(async move {
                    let _permit = semaphore.acquire().await;
                    let path = d.document.path.clone();
                    let result = link_one(deriver, repository, d, timeout).await;

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    report(&progress, Some(path), done, total, DerivationPhase::Linking);
                    result
                });
                ((index, document), task)
            })
            .unzip();

        join_all(tasks)
            .await
            .into_iter()
            .zip(placeholders)
            .map(|(joined, (index, document))| {
                let result = joined.unwrap_or_else(|err| {
                    let err = DeriveError::Concurrency {
                        details: format!("Link task failed: {}", err),
                    };
                    DocumentResult::failed(document, &err, Duration::ZERO)
                });
                (index, result)
            })
            .collect()
    }

    pub fn registry(&self) -> &Arc<DeriverRegistry> {
        &self.registry
    }

    pub fn repository(&self) -> &Arc<InMemoryRepository> {
        &self.repository
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

fn report(
    progress: &Option<ProgressCallback>,
    current_file: Option<PathBuf>,
    completed: usize,
    total: usize,
    phase: DerivationPhase,
) {
    if let Some(callback) = progress {
        callback(DerivationProgress {
            current_file,
            completed,
            total,
            phase,
        });
    }
}

fn artifact_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn read_and_derive(
    deriver: Arc<dyn Deriver>,
    document: &DiscoveredDocument,
) -> Result<(Artifact, DerivedGraph)> {
    let content = tokio::fs::read(&document.path).await?;
    let document_type = document.document_type.clone();
    let name = artifact_name(&document.path);

    tokio::task::spawn_blocking(move || {
        let mut primary = Artifact::document(&document_type, name);
        let graph = deriver.derive(&mut primary, &content)?;
        Ok::<_, DeriveError>((primary, graph))
    })
    .await
    .map_err(|err| DeriveError::Concurrency {
        details: format!("Derivation task failed: {}", err),
    })?
}

async fn derive_one(
    deriver: Arc<dyn Deriver>,
    document: DiscoveredDocument,
    timeout: Duration,
) -> Outcome {
    let start = Instant::now();
    let outcome = tokio::time::timeout(timeout, read_and_derive(deriver, &document)).await;
    match outcome {
        Ok(Ok((primary, graph))) => {
            let unresolved_after_derive = primary.unresolved_count() + graph.unresolved_count();
            info!(
                path = %document.path.display(),
                document_type = %document.document_type,
                artifacts = graph.len(),
                unresolved = unresolved_after_derive,
                "document derived"
            );
            Ok(Derived {
                document,
                primary,
                graph,
                unresolved_after_derive,
                derive_duration: start.elapsed(),
            })
        }
        Ok(Err(err)) => {
            warn!(path = %document.path.display(), error = %err, "derivation failed");
            Err(DocumentResult::failed(document, &err, start.elapsed()))
        }
        Err(_) => {
            let err = DeriveError::Concurrency {
                details: format!("Derivation timeout after {:?}", timeout),
            };
            warn!(path = %document.path.display(), "derivation timed out");
            Err(DocumentResult::failed(document, &err, timeout))
        }
    }
}

async fn link_one(
    deriver: Arc<dyn Deriver>,
    repository: Arc<InMemoryRepository>,
    derived: Derived,
    timeout: Duration,
) -> DocumentResult {
    let start = Instant::now();
    // Counts of what derivation already persisted, reported if linking fails
    let persisted = derived.summary(DocumentStatus::Derived, 0, 0, derived.derive_duration);
    let context = Arc::clone(&repository);

    // The blocking task links a private copy; only this task writes it back,
    // and only once linking finished within the timeout.
    let work = tokio::task::spawn_blocking(move || {
        let mut derived = derived;
        let targets_before = derived.relationship_count();
        deriver.link(&*context, &mut derived.primary, &mut derived.graph)?;
        Ok::<_, DeriveError>((derived, targets_before))
    });

    let (derived, targets_before) = match tokio::time::timeout(timeout, work).await {
        Ok(Ok(Ok(linked))) => linked,
        Ok(Ok(Err(err))) => {
            warn!(path = %persisted.path.display(), error = %err, "linking failed");
            return persisted.into_failed(&err, start.elapsed());
        }
        Ok(Err(join_err)) => {
            let err = DeriveError::Concurrency {
                details: format!("Link task failed: {}", join_err),
            };
            return persisted.into_failed(&err, start.elapsed());
        }
        Err(_) => {
            let err = DeriveError::Concurrency {
                details: format!("Link timeout after {:?}", timeout),
            };
            warn!(path = %persisted.path.display(), "linking timed out");
            return persisted.into_failed(&err, timeout);
        }
    };

    if let Err(err) = repository.update_graph(&derived.primary, &derived.graph) {
        let err = DeriveError::from(err);
        warn!(path = %persisted.path.display(), error = %err, "storing links failed");
        return persisted.into_failed(&err, start.elapsed());
    }

    let dropped = targets_before.saturating_sub(derived.relationship_count());
    let remaining = derived.unresolved_count();
    let resolved = derived
        .unresolved_after_derive
        .saturating_sub(dropped + remaining);
    debug!(
        path = %derived.document.path.display(),
        resolved,
        dropped,
        "document linked"
    );
    let duration = derived.derive_duration + start.elapsed();
    derived.finish(DocumentStatus::Linked, resolved, dropped, duration)
}
