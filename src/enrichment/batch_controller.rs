//! Background enrichment batches over a playlist.
//!
//! Exactly one batch is authoritative at a time. Each `start` advances a shared
//! epoch; workers compare their own generation against it before every record,
//! before every blocking call and right before committing a patch, and stop as
//! soon as a newer batch exists.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, error, info, warn};
use tokio::sync::broadcast::Sender;

use crate::catalog::{ArtworkFetcher, CatalogSearch};
use crate::config::EnrichmentConfig;
use crate::metadata::{FileRecord, SharedFileRecord, TagPatch, TagPersistence};
use crate::protocol::{BatchSummary, EnrichedFields, EnrichmentMessage, Message};

use super::candidate_selector::select_best_track;
use super::error::EnrichmentError;
use super::field_mapper::{log_enriched_fields, map_fields};

/// Lifecycle of the controller's current batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Running { generation: u64 },
    /// Held while a superseded run is being signalled to stop.
    Cancelling { generation: u64 },
}

struct BatchShared {
    epoch: AtomicU64,
    state: Mutex<BatchState>,
}

impl BatchShared {
    fn lock_state(&self) -> MutexGuard<'_, BatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == generation
    }

    /// Returns to Idle unless a newer batch has taken over.
    fn release_if_current(&self, generation: u64) {
        let mut state = self.lock_state();
        if self.is_current(generation) {
            *state = BatchState::Idle;
        }
    }
}

/// Collaborators and switches shared by every worker.
struct WorkerServices {
    catalog: Arc<dyn CatalogSearch>,
    artwork: Arc<dyn ArtworkFetcher>,
    tag_store: Arc<dyn TagPersistence>,
    options: EnrichmentConfig,
    bus_producer: Sender<Message>,
}

impl WorkerServices {
    fn emit(&self, message: EnrichmentMessage) {
        let _ = self.bus_producer.send(Message::Enrichment(message));
    }
}

/// Handle to one started batch. Dropping it detaches the worker.
pub struct BatchHandle {
    generation: u64,
    join_handle: Option<JoinHandle<Option<BatchSummary>>>,
}

impl BatchHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Blocks until the worker exits. `None` when the worker never started
    /// or panicked.
    pub fn join(self) -> Option<BatchSummary> {
        self.join_handle?.join().ok().flatten()
    }
}

/// Owns the enrichment batch lifecycle for one playlist owner.
pub struct BatchController {
    shared: Arc<BatchShared>,
    services: Arc<WorkerServices>,
}

fn panic_payload_to_string(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "non-string panic payload".to_string()
}

fn lock_record(record: &SharedFileRecord) -> MutexGuard<'_, FileRecord> {
    record.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BatchController {
    pub fn new(
        catalog: Arc<dyn CatalogSearch>,
        artwork: Arc<dyn ArtworkFetcher>,
        tag_store: Arc<dyn TagPersistence>,
        options: EnrichmentConfig,
        bus_producer: Sender<Message>,
    ) -> Self {
        Self {
            shared: Arc::new(BatchShared {
                epoch: AtomicU64::new(0),
                state: Mutex::new(BatchState::Idle),
            }),
            services: Arc::new(WorkerServices {
                catalog,
                artwork,
                tag_store,
                options,
                bus_producer,
            }),
        }
    }

    pub fn state(&self) -> BatchState {
        *self.shared.lock_state()
    }

    pub fn current_generation(&self) -> u64 {
        self.shared.epoch.load(Ordering::SeqCst)
    }

    /// Supersedes any running batch and starts a new one over `records`.
    /// Returns without waiting for either worker.
    pub fn start(&self, records: Vec<SharedFileRecord>) -> BatchHandle {
        let generation = {
            let mut state = self.shared.lock_state();
            if let BatchState::Running { generation } | BatchState::Cancelling { generation } =
                *state
            {
                info!("Enrichment[{generation}]: cancelling superseded batch");
                *state = BatchState::Cancelling { generation };
                self.services
                    .emit(EnrichmentMessage::BatchCancelled { generation });
            }
            let generation = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            *state = BatchState::Running { generation };
            generation
        };

        info!(
            "Enrichment[{generation}]: starting batch over {} record(s)",
            records.len()
        );
        let worker = BatchWorker {
            generation,
            shared: Arc::clone(&self.shared),
            services: Arc::clone(&self.services),
            records,
        };
        let shared = Arc::clone(&self.shared);
        let spawn_result = thread::Builder::new()
            .name(format!("enrichment-{generation}"))
            .spawn(move || match catch_unwind(AssertUnwindSafe(|| worker.run())) {
                Ok(summary) => Some(summary),
                Err(payload) => {
                    error!(
                        "Enrichment[{generation}]: worker terminated due to panic: {}",
                        panic_payload_to_string(payload.as_ref())
                    );
                    shared.release_if_current(generation);
                    None
                }
            });

        let join_handle = match spawn_result {
            Ok(join_handle) => Some(join_handle),
            Err(spawn_error) => {
                error!("Enrichment[{generation}]: failed to spawn worker: {spawn_error}");
                self.shared.release_if_current(generation);
                None
            }
        };
        BatchHandle {
            generation,
            join_handle,
        }
    }

    /// Stops the running batch, if any, without starting another.
    pub fn cancel(&self) {
        let mut state = self.shared.lock_state();
        if let BatchState::Running { generation } | BatchState::Cancelling { generation } = *state
        {
            info!("Enrichment[{generation}]: cancelling batch");
            self.shared.epoch.fetch_add(1, Ordering::SeqCst);
            *state = BatchState::Idle;
            self.services
                .emit(EnrichmentMessage::BatchCancelled { generation });
        }
    }
}

struct RecordOutcome {
    patch: TagPatch,
    persist_error: Option<String>,
}

struct BatchWorker {
    generation: u64,
    shared: Arc<BatchShared>,
    services: Arc<WorkerServices>,
    records: Vec<SharedFileRecord>,
}

impl BatchWorker {
    fn prefix(&self) -> String {
        format!("Enrichment[{}]:", self.generation)
    }

    fn ensure_current(&self) -> Result<(), EnrichmentError> {
        if self.shared.is_current(self.generation) {
            Ok(())
        } else {
            Err(EnrichmentError::Cancelled)
        }
    }

    fn run(self) -> BatchSummary {
        let mut summary = BatchSummary {
            total: self.records.len(),
            ..BatchSummary::default()
        };
        self.services.emit(EnrichmentMessage::BatchStarted {
            generation: self.generation,
            total: summary.total,
        });

        for (index, record) in self.records.iter().enumerate() {
            if self.ensure_current().is_err() {
                summary.cancelled = true;
                break;
            }

            let snapshot = {
                let guard = lock_record(record);
                if !guard.needs_metadata_lookup() && !self.services.options.force_lookup {
                    continue;
                }
                guard.clone()
            };
            summary.eligible += 1;
            info!("{} Search for: {}", self.prefix(), snapshot.label());

            match self.process_record(record, &snapshot) {
                Ok(outcome) => {
                    match &outcome.persist_error {
                        Some(persist_error) => {
                            summary.failed += 1;
                            warn!(
                                "{} tags updated but not saved for {}: {}",
                                self.prefix(),
                                snapshot.path().display(),
                                persist_error
                            );
                        }
                        None => summary.enriched += 1,
                    }
                    self.services.emit(EnrichmentMessage::RecordEnriched {
                        generation: self.generation,
                        index,
                        path: snapshot.path.clone(),
                        fields: EnrichedFields::from(&outcome.patch),
                        persist_error: outcome.persist_error,
                    });
                }
                Err(EnrichmentError::Cancelled) => {
                    summary.cancelled = true;
                    break;
                }
                Err(record_error) => {
                    if record_error.is_skip() {
                        summary.skipped += 1;
                        info!("{} {}: {}", self.prefix(), snapshot.label(), record_error);
                    } else {
                        summary.failed += 1;
                        warn!("{} {}: {}", self.prefix(), snapshot.label(), record_error);
                    }
                    self.services.emit(EnrichmentMessage::RecordSkipped {
                        generation: self.generation,
                        index,
                        path: snapshot.path.clone(),
                        reason: record_error.to_string(),
                    });
                }
            }
        }

        self.finish(summary)
    }

    fn process_record(
        &self,
        record: &SharedFileRecord,
        snapshot: &FileRecord,
    ) -> Result<RecordOutcome, EnrichmentError> {
        self.ensure_current()?;
        let keep_going = || self.shared.is_current(self.generation);
        let search_result = self.services.catalog.search_while(snapshot, &keep_going);
        self.ensure_current()?;
        let entry = search_result
            .map_err(EnrichmentError::FetchFailure)?
            .ok_or_else(|| EnrichmentError::NoMatch("search returned no release".to_string()))?;
        let best = select_best_track(&snapshot.title, &entry)
            .ok_or_else(|| EnrichmentError::NoMatch("release has no tracks".to_string()))?;
        debug!(
            "{} best candidate #{} \"{}\" at distance {}",
            self.prefix(),
            best.index,
            best.track.title,
            best.distance
        );

        let fetcher = if self.services.options.fetch_album_art {
            self.ensure_current()?;
            Some(self.services.artwork.as_ref())
        } else {
            None
        };
        let patch = map_fields(snapshot, best.track, &entry, fetcher, &self.prefix());
        let committed = {
            let mut guard = lock_record(record);
            self.ensure_current()?;
            patch.apply_to(&mut guard);
            guard.clone()
        };
        log_enriched_fields(&self.prefix(), &patch);

        let persist_error = if self.services.options.persist_tags {
            self.services
                .tag_store
                .persist_tags_with_image(&committed, patch.embedded_image.as_deref())
                .map_err(|persist_error| EnrichmentError::Persist(persist_error).to_string())
                .err()
        } else {
            None
        };

        Ok(RecordOutcome {
            patch,
            persist_error,
        })
    }

    fn finish(&self, summary: BatchSummary) -> BatchSummary {
        self.shared.release_if_current(self.generation);
        info!(
            "{} batch finished total={} eligible={} enriched={} skipped={} failed={} cancelled={}",
            self.prefix(),
            summary.total,
            summary.eligible,
            summary.enriched,
            summary.skipped,
            summary.failed,
            summary.cancelled
        );
        self.services.emit(EnrichmentMessage::BatchFinished {
            generation: self.generation,
            summary,
        });
        summary
    }
}
