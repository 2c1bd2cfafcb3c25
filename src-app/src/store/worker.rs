// FICHIER : src-app/src/store/worker.rs

//! Tâche de fond unique propriétaire du magasin.
//!
//! Chaque appel part sur un canal `mpsc` et attend sa réponse sur un
//! `oneshot`. Le worker traite les tâches strictement l'une après l'autre.

use crate::store::{Document, DocumentStore, Filter};
use crate::utils::json::Value;
use crate::utils::{async_trait, mpsc, oneshot, AppError, Arc, Result};
use std::collections::BTreeSet;

const QUEUE_DEPTH: usize = 64;

type Reply<T> = oneshot::Sender<Result<T>>;

enum StoreTask {
    ListCollections(Reply<BTreeSet<String>>),
    Find {
        collection: String,
        filter: Filter,
        limit: Option<usize>,
        reply: Reply<Vec<Document>>,
    },
    FindOne {
        collection: String,
        id: String,
        reply: Reply<Option<Document>>,
    },
    Insert {
        collection: String,
        doc: Document,
        reply: Reply<String>,
    },
    Update {
        collection: String,
        id: String,
        changes: Document,
        reply: Reply<u64>,
    },
    Delete {
        collection: String,
        id: String,
        reply: Reply<u64>,
    },
    Count {
        collection: String,
        filter: Filter,
        reply: Reply<u64>,
    },
    EnsureCollection {
        collection: String,
        reply: Reply<()>,
    },
    CreateUniqueIndex {
        collection: String,
        field: String,
        reply: Reply<()>,
    },
    Aggregate {
        collection: String,
        pipeline: Vec<Value>,
        reply: Reply<Vec<Document>>,
    },
}

pub struct StoreWorker;

impl StoreWorker {
    /// Démarre le worker sur le runtime tokio courant.
    pub fn spawn(store: Arc<dyn DocumentStore>) -> StoreHandle {
        let (tx, mut rx) = mpsc::channel::<StoreTask>(QUEUE_DEPTH);

        tokio::spawn(async move {
            tracing::debug!("🧵 StoreWorker démarré");
            while let Some(task) = rx.recv().await {
                run_task(store.as_ref(), task).await;
            }
            tracing::debug!("🧵 StoreWorker arrêté (plus aucun handle)");
        });

        StoreHandle { tx }
    }
}

// Un appelant qui a abandonné sa réponse n'est pas une erreur du worker.
async fn run_task(store: &dyn DocumentStore, task: StoreTask) {
    match task {
        StoreTask::ListCollections(reply) => {
            let _ = reply.send(store.list_collections().await);
        }
        StoreTask::Find {
            collection,
            filter,
            limit,
            reply,
        } => {
            let _ = reply.send(store.find(&collection, &filter, limit).await);
        }
        StoreTask::FindOne {
            collection,
            id,
            reply,
        } => {
            let _ = reply.send(store.find_one(&collection, &id).await);
        }
        StoreTask::Insert {
            collection,
            doc,
            reply,
        } => {
            let _ = reply.send(store.insert(&collection, doc).await);
        }
        StoreTask::Update {
            collection,
            id,
            changes,
            reply,
        } => {
            let _ = reply.send(store.update(&collection, &id, changes).await);
        }
        StoreTask::Delete {
            collection,
            id,
            reply,
        } => {
            let _ = reply.send(store.delete(&collection, &id).await);
        }
        StoreTask::Count {
            collection,
            filter,
            reply,
        } => {
            let _ = reply.send(store.count(&collection, &filter).await);
        }
        StoreTask::EnsureCollection { collection, reply } => {
            let _ = reply.send(store.ensure_collection(&collection).await);
        }
        StoreTask::CreateUniqueIndex {
            collection,
            field,
            reply,
        } => {
            let _ = reply.send(store.create_unique_index(&collection, &field).await);
        }
        StoreTask::Aggregate {
            collection,
            pipeline,
            reply,
        } => {
            let _ = reply.send(store.aggregate(&collection, &pipeline).await);
        }
    }
}

/// Handle clonable vers le worker. Implémente lui-même [`DocumentStore`].
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreTask>,
}

impl StoreHandle {
    async fn call<T>(&self, build: impl FnOnce(Reply<T>) -> StoreTask) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| AppError::connection("worker du magasin arrêté"))?;
        reply_rx
            .await
            .map_err(|_| AppError::connection("worker du magasin interrompu"))?
    }
}

#[async_trait]
impl DocumentStore for StoreHandle {
    async fn list_collections(&self) -> Result<BTreeSet<String>> {
        self.call(StoreTask::ListCollections).await
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        self.call(|reply| StoreTask::Find {
            collection: collection.to_string(),
            filter: filter.clone(),
            limit,
            reply,
        })
        .await
    }

    async fn find_one(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.call(|reply| StoreTask::FindOne {
            collection: collection.to_string(),
            id: id.to_string(),
            reply,
        })
        .await
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<String> {
        self.call(|reply| StoreTask::Insert {
            collection: collection.to_string(),
            doc,
            reply,
        })
        .await
    }

    async fn update(&self, collection: &str, id: &str, changes: Document) -> Result<u64> {
        self.call(|reply| StoreTask::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            changes,
            reply,
        })
        .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<u64> {
        self.call(|reply| StoreTask::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
            reply,
        })
        .await
    }

    async fn ensure_collection(&self, collection: &str) -> Result<()> {
        self.call(|reply| StoreTask::EnsureCollection {
            collection: collection.to_string(),
            reply,
        })
        .await
    }

    async fn create_unique_index(&self, collection: &str, field: &str) -> Result<()> {
        self.call(|reply| StoreTask::CreateUniqueIndex {
            collection: collection.to_string(),
            field: field.to_string(),
            reply,
        })
        .await
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64> {
        self.call(|reply| StoreTask::Count {
            collection: collection.to_string(),
            filter: filter.clone(),
            reply,
        })
        .await
    }

    async fn aggregate(&self, collection: &str, pipeline: &[Value]) -> Result<Vec<Document>> {
        self.call(|reply| StoreTask::Aggregate {
            collection: collection.to_string(),
            pipeline: pipeline.to_vec(),
            reply,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::into_document;
    use crate::utils::json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Magasin instrumenté : mesure le nombre d'appels simultanés.
    #[derive(Default)]
    struct Probe {
        inner: MemoryStore,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl Probe {
        async fn track<T>(&self, fut: impl std::future::Future<Output = T>) -> T {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            let out = fut.await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            out
        }
    }

    #[async_trait]
    impl DocumentStore for Probe {
        async fn list_collections(&self) -> Result<BTreeSet<String>> {
            self.track(self.inner.list_collections()).await
        }
        async fn find(&self, c: &str, f: &Filter, l: Option<usize>) -> Result<Vec<Document>> {
            self.track(self.inner.find(c, f, l)).await
        }
        async fn find_one(&self, c: &str, id: &str) -> Result<Option<Document>> {
            self.track(self.inner.find_one(c, id)).await
        }
        async fn insert(&self, c: &str, d: Document) -> Result<String> {
            self.track(self.inner.insert(c, d)).await
        }
        async fn update(&self, c: &str, id: &str, d: Document) -> Result<u64> {
            self.track(self.inner.update(c, id, d)).await
        }
        async fn delete(&self, c: &str, id: &str) -> Result<u64> {
            self.track(self.inner.delete(c, id)).await
        }
        async fn ensure_collection(&self, c: &str) -> Result<()> {
            self.track(self.inner.ensure_collection(c)).await
        }
        async fn create_unique_index(&self, c: &str, f: &str) -> Result<()> {
            self.track(self.inner.create_unique_index(c, f)).await
        }
    }

    #[tokio::test]
    async fn test_worker_runs_one_task_at_a_time() {
        let probe = Arc::new(Probe::default());
        let handle = StoreWorker::spawn(probe.clone());

        let mut joins = Vec::new();
        for i in 0..8 {
            let h = handle.clone();
            joins.push(tokio::spawn(async move {
                h.insert("bookings", into_document(json!({"n": i})).unwrap())
                    .await
            }));
        }
        for j in joins {
            j.await.unwrap().unwrap();
        }

        assert_eq!(handle.count("bookings", &Filter::all()).await.unwrap(), 8);
        assert_eq!(probe.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_worker_forwards_errors() {
        let mem = Arc::new(MemoryStore::new());
        let handle = StoreWorker::spawn(mem.clone());
        mem.set_offline(true);

        let res = handle.find("members", &Filter::all(), None).await;
        assert!(matches!(res, Err(AppError::Connection(_))));

        mem.set_offline(false);
        let out = handle
            .aggregate("members", &[json!({"$group": {"_id": null, "n": {"$sum": 1}}})])
            .await
            .unwrap();
        assert!(out.is_empty());
    }
}
