//! List-view state and CRUD dispatch.
//!
//! Every mutation is followed by a full re-fetch; there is no incremental or
//! optimistic update of the local copy.

use std::{collections::BTreeMap, future::Future, sync::Arc};

use shared::{
    domain::{Customer, Training},
    error::ApiError,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    draft::{CustomerDraft, TrainingDraft},
    error::ClientError,
    view::{filter_and_sort, Listable, SortOrder, SortState},
    Gateway, CUSTOMERS_RESOURCE, TRAININGS_RESOURCE,
};

pub trait Record: Listable + Clone + Send + Sync + 'static {
    type Draft: Send + Sync;

    const RESOURCE: &'static str;

    /// Short human label, used in the delete confirmation prompt.
    fn describe(&self) -> String;
}

impl Record for Customer {
    type Draft = CustomerDraft;

    const RESOURCE: &'static str = CUSTOMERS_RESOURCE;

    fn describe(&self) -> String {
        let name = self.full_name();
        if name.is_empty() {
            self.email.clone()
        } else {
            name
        }
    }
}

impl Record for Training {
    type Draft = TrainingDraft;

    const RESOURCE: &'static str = TRAININGS_RESOURCE;

    fn describe(&self) -> String {
        format!("{} on {}", self.activity, self.date_display())
    }
}

/// Affirmative step required before a delete is sent.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Refresh,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
}

#[derive(Debug, Clone)]
pub enum ListEvent {
    Started {
        resource: &'static str,
        op: OperationId,
        kind: OperationKind,
    },
    Loaded {
        resource: &'static str,
        count: usize,
    },
    Completed {
        resource: &'static str,
        op: OperationId,
        kind: OperationKind,
    },
    Failed {
        resource: &'static str,
        op: OperationId,
        kind: OperationKind,
        error: ApiError,
    },
    DeleteDeclined {
        resource: &'static str,
    },
}

struct ListState<R: Record> {
    records: Vec<R>,
    search: String,
    sort: SortState<R::Column>,
    pending: BTreeMap<OperationId, OperationKind>,
    next_op: u64,
    fetches_issued: u64,
    fetch_applied: u64,
}

pub struct ListController<R: Record> {
    gateway: Arc<dyn Gateway<R>>,
    inner: Mutex<ListState<R>>,
    events: broadcast::Sender<ListEvent>,
}

impl<R: Record> ListController<R> {
    pub fn new(gateway: Arc<dyn Gateway<R>>) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            gateway,
            inner: Mutex::new(ListState {
                records: Vec::new(),
                search: String::new(),
                sort: SortState::default(),
                pending: BTreeMap::new(),
                next_op: 0,
                fetches_issued: 0,
                fetch_applied: 0,
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ListEvent> {
        self.events.subscribe()
    }

    /// Replaces the local copy with a fresh fetch.
    ///
    /// A failed fetch leaves the list empty. A fetch that completes after a
    /// newer one has already been applied is discarded.
    pub async fn refresh(&self) -> Result<usize, ClientError> {
        let (op, generation) = {
            let mut guard = self.inner.lock().await;
            guard.fetches_issued += 1;
            let generation = guard.fetches_issued;
            (begin_operation(&mut guard, OperationKind::Refresh), generation)
        };
        self.emit_started(op, OperationKind::Refresh);

        let result = self.gateway.list().await;

        let mut guard = self.inner.lock().await;
        guard.pending.remove(&op);
        let stale = generation < guard.fetch_applied;
        if !stale {
            guard.fetch_applied = generation;
        }

        match result {
            Ok(records) => {
                let count = records.len();
                if stale {
                    debug!(resource = R::RESOURCE, generation, "discarding stale fetch");
                } else {
                    guard.records = records;
                }
                drop(guard);
                if !stale {
                    let _ = self.events.send(ListEvent::Loaded {
                        resource: R::RESOURCE,
                        count,
                    });
                }
                self.emit_completed(op, OperationKind::Refresh);
                Ok(count)
            }
            Err(err) => {
                if !stale {
                    guard.records.clear();
                }
                drop(guard);
                warn!(resource = R::RESOURCE, error = %err, "fetch failed");
                self.emit_failed(op, OperationKind::Refresh, &err);
                Err(err)
            }
        }
    }

    pub async fn create(&self, draft: &R::Draft) -> Result<(), ClientError> {
        self.run_mutation(OperationKind::Create, self.gateway.create(draft))
            .await
    }

    pub async fn update(&self, record: &R, draft: &R::Draft) -> Result<(), ClientError> {
        self.run_mutation(OperationKind::Update, self.gateway.update(record, draft))
            .await
    }

    /// Deletes `record` once `confirm` agrees. A declined prompt sends
    /// nothing.
    pub async fn delete(
        &self,
        record: &R,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome, ClientError> {
        let prompt = format!("Delete {}?", record.describe());
        if !confirm.confirm(&prompt) {
            debug!(resource = R::RESOURCE, "delete declined");
            let _ = self.events.send(ListEvent::DeleteDeclined {
                resource: R::RESOURCE,
            });
            return Ok(DeleteOutcome::Declined);
        }

        self.run_mutation(OperationKind::Delete, self.gateway.delete(record))
            .await?;
        Ok(DeleteOutcome::Deleted)
    }

    pub async fn set_search(&self, search: impl Into<String>) {
        self.inner.lock().await.search = search.into();
    }

    pub async fn search(&self) -> String {
        self.inner.lock().await.search.clone()
    }

    pub async fn toggle_sort(&self, column: R::Column) {
        self.inner.lock().await.sort.toggle(column);
    }

    pub async fn set_sort(&self, order: Option<SortOrder<R::Column>>) {
        let mut guard = self.inner.lock().await;
        guard.sort = match order {
            Some(order) => SortState::with_order(order),
            None => SortState::default(),
        };
    }

    pub async fn sort_order(&self) -> Option<SortOrder<R::Column>> {
        self.inner.lock().await.sort.order()
    }

    /// Rows as currently displayed: filtered by the search term and sorted.
    pub async fn visible(&self) -> Vec<R> {
        let guard = self.inner.lock().await;
        filter_and_sort(&guard.records, &guard.search, guard.sort.order())
            .into_iter()
            .cloned()
            .collect()
    }

    /// The last fetched records, unfiltered.
    pub async fn records(&self) -> Vec<R> {
        self.inner.lock().await.records.clone()
    }

    pub async fn is_loading(&self) -> bool {
        !self.inner.lock().await.pending.is_empty()
    }

    pub async fn pending_operations(&self) -> Vec<(OperationId, OperationKind)> {
        self.inner
            .lock()
            .await
            .pending
            .iter()
            .map(|(op, kind)| (*op, *kind))
            .collect()
    }

    async fn run_mutation<F>(&self, kind: OperationKind, request: F) -> Result<(), ClientError>
    where
        F: Future<Output = Result<(), ClientError>>,
    {
        let op = {
            let mut guard = self.inner.lock().await;
            begin_operation(&mut guard, kind)
        };
        self.emit_started(op, kind);

        match request.await {
            Ok(()) => {
                info!(resource = R::RESOURCE, ?kind, "mutation succeeded, refreshing");
                // The refresh reports its own failure.
                let _ = self.refresh().await;
                self.inner.lock().await.pending.remove(&op);
                self.emit_completed(op, kind);
                Ok(())
            }
            Err(err) => {
                self.inner.lock().await.pending.remove(&op);
                warn!(resource = R::RESOURCE, ?kind, error = %err, "mutation failed");
                self.emit_failed(op, kind, &err);
                Err(err)
            }
        }
    }

    fn emit_started(&self, op: OperationId, kind: OperationKind) {
        let _ = self.events.send(ListEvent::Started {
            resource: R::RESOURCE,
            op,
            kind,
        });
    }

    fn emit_completed(&self, op: OperationId, kind: OperationKind) {
        let _ = self.events.send(ListEvent::Completed {
            resource: R::RESOURCE,
            op,
            kind,
        });
    }

    fn emit_failed(&self, op: OperationId, kind: OperationKind, err: &ClientError) {
        let _ = self.events.send(ListEvent::Failed {
            resource: R::RESOURCE,
            op,
            kind,
            error: ApiError::from(err),
        });
    }
}

fn begin_operation<R: Record>(state: &mut ListState<R>, kind: OperationKind) -> OperationId {
    state.next_op += 1;
    let op = OperationId(state.next_op);
    state.pending.insert(op, kind);
    op
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
