use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::connection::{Connection, ConnectionFactory, ConnectionParams, SharedConnection};
use crate::{JobId, JobRecord, QueueResult};

struct StoredJob {
    record: JobRecord,
    expires_at: Option<Instant>,
}

/// One in-process broker database
#[derive(Default)]
struct MemoryStore {
    /// Job records indexed by job_id
    jobs: HashMap<JobId, StoredJob>,

    /// queue_name -> job_ids, head first
    queues: HashMap<String, VecDeque<JobId>>,
}

/// In-process broker for tests and development.
///
/// The factory plays the role of a server: handles for the same
/// `host:port/db` share storage, yet every `connect` call returns a new
/// handle, just as separate Redis clients would be.
pub struct MemoryConnectionFactory {
    databases: Mutex<HashMap<String, Arc<RwLock<MemoryStore>>>>,
}

impl MemoryConnectionFactory {
    pub fn new() -> Self {
        Self {
            databases: Mutex::new(HashMap::new()),
        }
    }

    fn database(&self, params: &ConnectionParams) -> Arc<RwLock<MemoryStore>> {
        self.databases
            .lock()
            .entry(params.address())
            .or_default()
            .clone()
    }
}

impl Default for MemoryConnectionFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionFactory for MemoryConnectionFactory {
    fn name(&self) -> &str {
        "memory"
    }

    fn connect(&self, params: &ConnectionParams) -> QueueResult<SharedConnection> {
        Ok(Arc::new(MemoryConnection {
            params: params.clone(),
            store: self.database(params),
        }))
    }

    fn from_url(&self, url: &str) -> QueueResult<SharedConnection> {
        self.connect(&ConnectionParams::from_url(url)?)
    }
}

/// Handle to one in-process broker database
pub struct MemoryConnection {
    params: ConnectionParams,
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryConnection {
    /// A standalone handle with private storage.
    pub fn new() -> Self {
        Self {
            params: ConnectionParams::default(),
            store: Arc::default(),
        }
    }

    /// True when both handles address the same database.
    pub fn shares_storage_with(&self, other: &MemoryConnection) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }
}

impl Default for MemoryConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryConnection")
            .field("address", &self.params.address())
            .finish()
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    fn params(&self) -> &ConnectionParams {
        &self.params
    }

    async fn push_job(&self, queue: &str, job_id: &JobId) -> QueueResult<()> {
        self.store
            .write()
            .queues
            .entry(queue.to_string())
            .or_default()
            .push_back(job_id.clone());
        Ok(())
    }

    async fn pop_job(&self, queues: &[&str]) -> QueueResult<Option<(String, JobId)>> {
        let mut store = self.store.write();
        for name in queues {
            if let Some(job_id) = store.queues.get_mut(*name).and_then(VecDeque::pop_front) {
                return Ok(Some((name.to_string(), job_id)));
            }
        }
        Ok(None)
    }

    async fn save_job(&self, record: &JobRecord, ttl: Option<Duration>) -> QueueResult<()> {
        let stored = StoredJob {
            record: record.clone(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.store.write().jobs.insert(record.job_id.clone(), stored);
        Ok(())
    }

    async fn fetch_job(&self, job_id: &JobId) -> QueueResult<Option<JobRecord>> {
        let mut store = self.store.write();
        let expired = match store.jobs.get(job_id) {
            None => return Ok(None),
            Some(stored) => stored.expires_at.is_some_and(|at| at <= Instant::now()),
        };

        if expired {
            store.jobs.remove(job_id);
            return Ok(None);
        }
        Ok(store.jobs.get(job_id).map(|stored| stored.record.clone()))
    }

    async fn queue_len(&self, queue: &str) -> QueueResult<usize> {
        Ok(self.store.read().queues.get(queue).map_or(0, VecDeque::len))
    }

    async fn ping(&self) -> QueueResult<()> {
        Ok(())
    }
}
