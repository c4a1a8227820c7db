//! In-memory delivery queue: single channel + one worker, job state in a map.

use activity_types::{
    ActivityDispatcher, ActivityRecord, DeliveryJob, DeliveryOptions, DispatchError,
    DocumentStore, JobStatus,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use uuid::Uuid;

struct QueuedDelivery {
    job_id: String,
    queue: String,
    record: ActivityRecord,
}

/// Job states by id, plus settled job ids oldest first.
#[derive(Default)]
struct JobTable {
    jobs: HashMap<String, DeliveryJob>,
    settled: VecDeque<String>,
}

impl JobTable {
    fn get_mut(&mut self, job_id: &str) -> Option<&mut DeliveryJob> {
        self.jobs.get_mut(job_id)
    }

    /// Record that `job_id` reached a terminal state; forget the oldest settled jobs past `retain`.
    fn settle(&mut self, job_id: &str, retain: usize) {
        self.settled.push_back(job_id.to_string());
        while self.settled.len() > retain {
            if let Some(old) = self.settled.pop_front() {
                self.jobs.remove(&old);
            }
        }
    }
}

type JobMap = Arc<Mutex<JobTable>>;

// Held only for table updates, never across an await.
fn lock(jobs: &JobMap) -> MutexGuard<'_, JobTable> {
    jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

/// Queues activity records; one worker indexes them into the document store with retries.
///
/// Records are delivered in enqueue order. Delivery is at-least-once: the store keys documents
/// by record id, so a retried write overwrites rather than duplicates.
pub struct InMemoryActivityQueue {
    jobs: JobMap,
    tx: mpsc::UnboundedSender<QueuedDelivery>,
}

impl InMemoryActivityQueue {
    /// Create the queue and spawn its worker on the current Tokio runtime.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index: impl Into<String>,
        options: DeliveryOptions,
    ) -> Self {
        let jobs: JobMap = Arc::new(Mutex::new(JobTable::default()));
        let (tx, mut rx) = mpsc::unbounded_channel::<QueuedDelivery>();
        let index = index.into();

        let jobs_clone = Arc::clone(&jobs);
        tokio::spawn(async move {
            while let Some(delivery) = rx.recv().await {
                deliver(store.as_ref(), &index, &options, &jobs_clone, delivery).await;
            }
        });

        Self { jobs, tx }
    }
}

async fn deliver(
    store: &dyn DocumentStore,
    index: &str,
    options: &DeliveryOptions,
    jobs: &JobMap,
    delivery: QueuedDelivery,
) {
    let QueuedDelivery {
        job_id,
        queue,
        record,
    } = delivery;
    let max_attempts = options.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        if let Some(job) = lock(jobs).get_mut(&job_id) {
            job.status = JobStatus::Running;
            job.attempts = attempt;
            job.updated_at = now_iso();
        }

        let error = match store.populate_index(index, &record).await {
            Ok(()) => {
                {
                    let mut table = lock(jobs);
                    if let Some(job) = table.get_mut(&job_id) {
                        job.status = JobStatus::Done;
                        job.updated_at = now_iso();
                        job.last_error = None;
                    }
                    table.settle(&job_id, options.retain_jobs);
                }
                tracing::info!(
                    job_id = %job_id,
                    record_id = %record.id(),
                    queue = %queue,
                    attempt,
                    "activity delivered"
                );
                return;
            }
            Err(e) => e,
        };

        let exhausted = attempt == max_attempts;
        {
            let mut table = lock(jobs);
            if let Some(job) = table.get_mut(&job_id) {
                job.last_error = Some(error.to_string());
                job.updated_at = now_iso();
                if exhausted {
                    job.status = JobStatus::Failed;
                }
            }
            if exhausted {
                table.settle(&job_id, options.retain_jobs);
            }
        }

        if exhausted {
            tracing::error!(
                job_id = %job_id,
                record_id = %record.id(),
                queue = %queue,
                attempts = attempt,
                error = %error,
                "activity delivery failed"
            );
        } else {
            let delay = options.backoff_for(attempt);
            tracing::warn!(
                job_id = %job_id,
                record_id = %record.id(),
                attempt,
                retry_in_ms = delay.as_millis() as u64,
                error = %error,
                "activity delivery failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ActivityDispatcher for InMemoryActivityQueue {
    fn enqueue(&self, queue: &str, record: ActivityRecord) -> Result<String, DispatchError> {
        let job_id = Uuid::new_v4().to_string();
        let now = now_iso();
        let job = DeliveryJob {
            job_id: job_id.clone(),
            record_id: record.id().to_string(),
            queue: queue.to_string(),
            status: JobStatus::Pending,
            attempts: 0,
            created_at: now.clone(),
            updated_at: now,
            last_error: None,
        };
        lock(&self.jobs).jobs.insert(job_id.clone(), job);
        let sent = self.tx.send(QueuedDelivery {
            job_id: job_id.clone(),
            queue: queue.to_string(),
            record,
        });
        if sent.is_err() {
            lock(&self.jobs).jobs.remove(&job_id);
            return Err(DispatchError::QueueClosed);
        }
        Ok(job_id)
    }

    async fn job(&self, job_id: &str) -> Result<Option<DeliveryJob>, DispatchError> {
        Ok(lock(&self.jobs).jobs.get(job_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use activity_core::{
        ActivityContext, Attributes, ConsoleContext, DocumentStoreError, EventKind, IndexSettings,
        RecordAssembler, RecordParts,
    };
    use activity_store::InMemoryDocumentStore;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    const INDEX: &str = "activity-logs";

    fn record(model_id: &str) -> ActivityRecord {
        let assembler = RecordAssembler::new("testing", "1.0.0");
        assembler.assemble(
            RecordParts {
                model: "Post".to_string(),
                model_id: model_id.to_string(),
                event: EventKind::Updated,
                user: None,
                attributes: Attributes::new(),
                changes: Vec::new(),
                context: ActivityContext::Console(ConsoleContext::new("seed")),
                metadata: assembler.environment_info(None),
                tags: BTreeSet::new(),
            },
            Utc::now(),
        )
    }

    fn fast() -> DeliveryOptions {
        DeliveryOptions {
            max_attempts: 3,
            backoff_ms: 1,
            ..Default::default()
        }
    }

    /// Fails the first `failures` writes, then delegates.
    struct FlakyStore {
        inner: InMemoryDocumentStore,
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn index_exists(&self, index: &str) -> Result<bool, DocumentStoreError> {
            self.inner.index_exists(index).await
        }

        async fn create_index(
            &self,
            index: &str,
            settings: &IndexSettings,
            mapping: &serde_json::Value,
        ) -> Result<(), DocumentStoreError> {
            self.inner.create_index(index, settings, mapping).await
        }

        async fn populate_index(
            &self,
            index: &str,
            record: &ActivityRecord,
        ) -> Result<(), DocumentStoreError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(DocumentStoreError::Unavailable("connection refused".to_string()));
            }
            self.inner.populate_index(index, record).await
        }
    }

    async fn wait_settled(queue: &InMemoryActivityQueue, job_id: &str) -> DeliveryJob {
        for _ in 0..200 {
            let job = queue.job(job_id).await.unwrap().unwrap();
            if matches!(job.status, JobStatus::Done | JobStatus::Failed) {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {} did not settle", job_id);
    }

    #[tokio::test]
    async fn enqueued_record_is_indexed() {
        let store = InMemoryDocumentStore::with_index(INDEX).await;
        let queue = InMemoryActivityQueue::new(Arc::new(store.clone()), INDEX, fast());
        let rec = record("1");
        let record_id = rec.id().to_string();

        let job_id = queue.enqueue("audit", rec).unwrap();
        let job = wait_settled(&queue, &job_id).await;

        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.queue, "audit");
        assert_eq!(job.record_id, record_id);
        assert_eq!(job.attempts, 1);
        assert!(store.document(INDEX, &record_id).await.is_some());
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let inner = InMemoryDocumentStore::with_index(INDEX).await;
        let store = Arc::new(FlakyStore {
            inner: inner.clone(),
            failures: 2,
            calls: AtomicU32::new(0),
        });
        let queue = InMemoryActivityQueue::new(store, INDEX, fast());

        let job_id = queue.enqueue("default", record("2")).unwrap();
        let job = wait_settled(&queue, &job_id).await;

        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.attempts, 3);
        assert_eq!(job.last_error, None);
        assert_eq!(inner.document_count(INDEX).await, 1);
    }

    #[tokio::test]
    async fn exhausted_retries_mark_job_failed() {
        // Index never created: every attempt fails.
        let store = InMemoryDocumentStore::new();
        let queue = InMemoryActivityQueue::new(Arc::new(store), INDEX, fast());

        let job_id = queue.enqueue("default", record("3")).unwrap();
        let job = wait_settled(&queue, &job_id).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.attempts, 3);
        assert!(job.last_error.unwrap().contains("index not found"));
    }

    #[tokio::test]
    async fn unknown_job_is_none() {
        let queue = InMemoryActivityQueue::new(
            Arc::new(InMemoryDocumentStore::new()),
            INDEX,
            fast(),
        );
        assert!(queue.job("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deliveries_preserve_enqueue_order() {
        let store = InMemoryDocumentStore::with_index(INDEX).await;
        let queue = InMemoryActivityQueue::new(Arc::new(store.clone()), INDEX, fast());
        let ids: Vec<String> = (0..5)
            .map(|i| queue.enqueue("default", record(&i.to_string())).unwrap())
            .collect();

        let last = wait_settled(&queue, &ids[4]).await;
        assert_eq!(last.status, JobStatus::Done);
        // Single worker: earlier jobs settled first.
        for id in &ids[..4] {
            let job = queue.job(id).await.unwrap().unwrap();
            assert_eq!(job.status, JobStatus::Done);
        }
        assert_eq!(store.document_count(INDEX).await, 5);
    }

    #[tokio::test]
    async fn settled_jobs_beyond_retention_are_forgotten() {
        let store = InMemoryDocumentStore::with_index(INDEX).await;
        let options = DeliveryOptions {
            retain_jobs: 2,
            ..fast()
        };
        let queue = InMemoryActivityQueue::new(Arc::new(store.clone()), INDEX, options);
        let ids: Vec<String> = (0..5)
            .map(|i| queue.enqueue("default", record(&i.to_string())).unwrap())
            .collect();

        wait_settled(&queue, &ids[4]).await;
        for id in &ids[..3] {
            assert!(queue.job(id).await.unwrap().is_none());
        }
        for id in &ids[3..] {
            assert_eq!(queue.job(id).await.unwrap().unwrap().status, JobStatus::Done);
        }
        // Forgetting a job never touches its delivered document.
        assert_eq!(store.document_count(INDEX).await, 5);
    }
}
