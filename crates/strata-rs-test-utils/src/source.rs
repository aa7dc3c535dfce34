use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use strata_rs_protocol::{KeyValue, Source, SourceError, Watcher};
use tokio::sync::{mpsc, watch};

type Batch = Result<Vec<KeyValue>, SourceError>;

/// Build a `json` fragment from a JSON value.
pub fn json_kv(key: &str, value: serde_json::Value) -> KeyValue {
    KeyValue::new(key, value.to_string(), "json")
}

/// In-memory source whose watchers receive batches pushed by the test.
///
/// Clones share state, so a test can keep one handle while the config owns
/// another.
#[derive(Clone)]
pub struct MemorySource {
    inner: Arc<MemoryState>,
}

struct MemoryState {
    name: String,
    current: Mutex<Vec<KeyValue>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Batch>>>,
    watchers: Mutex<Vec<Arc<MemoryWatcher>>>,
}

impl MemorySource {
    pub fn new(name: &str, initial: Vec<KeyValue>) -> Self {
        Self {
            inner: Arc::new(MemoryState {
                name: name.to_string(),
                current: Mutex::new(initial),
                subscribers: Mutex::new(Vec::new()),
                watchers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Replace what `load` returns without notifying watchers.
    pub fn set_current(&self, kvs: Vec<KeyValue>) {
        *self.inner.current.lock() = kvs;
    }

    /// Deliver a batch to every watcher.
    pub fn push(&self, kvs: Vec<KeyValue>) {
        self.broadcast(|| Ok(kvs.clone()));
    }

    /// Deliver a transient error to every watcher.
    pub fn push_error(&self, message: &str) {
        self.broadcast(|| Err(SourceError::Unavailable(message.to_string())));
    }

    /// Number of watchers handed out so far.
    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.lock().len()
    }

    /// Total `stop` calls across all watchers.
    pub fn stop_count(&self) -> usize {
        self.inner
            .watchers
            .lock()
            .iter()
            .map(|watcher| watcher.stop_count())
            .sum()
    }

    fn broadcast(&self, batch: impl Fn() -> Batch) {
        let subscribers = self.inner.subscribers.lock();
        for subscriber in subscribers.iter() {
            let _ = subscriber.send(batch());
        }
    }
}

#[async_trait]
impl Source for MemorySource {
    fn name(&self) -> &str {
        &self.inner.name
    }

    async fn load(&self) -> Result<Vec<KeyValue>, SourceError> {
        Ok(self.inner.current.lock().clone())
    }

    async fn watch(&self) -> Result<Arc<dyn Watcher>, SourceError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.inner.subscribers.lock().push(sender);
        let watcher = Arc::new(MemoryWatcher::new(receiver));
        self.inner.watchers.lock().push(watcher.clone());
        Ok(watcher)
    }
}

/// Watcher fed by a [`MemorySource`].
pub struct MemoryWatcher {
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<Batch>>,
    stopped: watch::Sender<bool>,
    stops: AtomicUsize,
}

impl MemoryWatcher {
    fn new(receiver: mpsc::UnboundedReceiver<Batch>) -> Self {
        let (stopped, _) = watch::channel(false);
        Self {
            receiver: tokio::sync::Mutex::new(receiver),
            stopped,
            stops: AtomicUsize::new(0),
        }
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Watcher for MemoryWatcher {
    async fn next(&self) -> Result<Vec<KeyValue>, SourceError> {
        let mut stop = self.stopped.subscribe();
        if *stop.borrow_and_update() {
            return Err(SourceError::Canceled);
        }
        let mut receiver = self.receiver.lock().await;
        tokio::select! {
            biased;
            _ = stop.changed() => Err(SourceError::Canceled),
            batch = receiver.recv() => batch.unwrap_or(Err(SourceError::Canceled)),
        }
    }

    fn stop(&self) -> Result<(), SourceError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.stopped.send_replace(true);
        Ok(())
    }
}

/// Source that fails at a chosen step.
pub struct FailingSource {
    name: String,
    load: Result<Vec<KeyValue>, String>,
    watch_error: Option<String>,
}

impl FailingSource {
    /// Fails in `load`.
    pub fn on_load(message: &str) -> Self {
        Self {
            name: "failing-load".to_string(),
            load: Err(message.to_string()),
            watch_error: None,
        }
    }

    /// Loads `kvs`, then fails in `watch`.
    pub fn on_watch(kvs: Vec<KeyValue>, message: &str) -> Self {
        Self {
            name: "failing-watch".to_string(),
            load: Ok(kvs),
            watch_error: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl Source for FailingSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<Vec<KeyValue>, SourceError> {
        self.load.clone().map_err(SourceError::Unavailable)
    }

    async fn watch(&self) -> Result<Arc<dyn Watcher>, SourceError> {
        match &self.watch_error {
            Some(message) => Err(SourceError::Unavailable(message.clone())),
            None => Err(SourceError::Other("watch not supported".to_string())),
        }
    }
}
