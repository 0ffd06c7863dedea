//! Task executors
//!
//! Procedures run as futures on sequencing contexts. A `FifoTaskQueue` is a
//! single worker task fed by an mpsc channel: tasks run to completion one after
//! the other, in submission order. The F1AP engines own one queue for
//! interface-wide procedures (F1 Setup, Reset, ...) and a `UeTaskScheduler`
//! with one queue per UE, so procedures of the same UE never overlap while
//! different UEs progress independently.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{trace, warn};

use crate::ue_context::UeIndex;

/// Default capacity of a task queue
pub const DEFAULT_TASK_QUEUE_CAPACITY: usize = 256;

/// Unit of work run by an executor
pub type Task = BoxFuture<'static, ()>;

/// Task envelope, mirrors the task framework's message/shutdown pair
enum TaskMessage {
    Task(Task),
    Shutdown,
}

/// Something that can run tasks.
///
/// `execute` may run the task inline when called from the executor itself;
/// `defer` always queues it behind the work already pending.
pub trait TaskExecutor: Send + Sync {
    /// Queues a task. Returns false if the executor is gone or full.
    fn execute(&self, task: Task) -> bool;

    /// Queues a task behind all work already pending.
    fn defer(&self, task: Task) -> bool {
        self.execute(task)
    }
}

/// Sequential task queue backed by a spawned tokio worker.
///
/// Cloning the queue yields another handle to the same worker. The worker
/// exits once every handle is dropped and the pending tasks have run, or when
/// `shutdown` is called.
#[derive(Clone)]
pub struct FifoTaskQueue {
    name: Arc<str>,
    tx: mpsc::Sender<TaskMessage>,
}

impl FifoTaskQueue {
    /// Spawns the worker on the current tokio runtime.
    pub fn spawn(name: impl Into<String>) -> Self {
        Self::with_capacity(name, DEFAULT_TASK_QUEUE_CAPACITY)
    }

    /// Spawns the worker with a specific queue capacity.
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        let name: Arc<str> = Arc::from(name.into());
        let (tx, mut rx) = mpsc::channel::<TaskMessage>(capacity.max(1));

        let worker_name = name.clone();
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                match msg {
                    TaskMessage::Task(task) => task.await,
                    TaskMessage::Shutdown => break,
                }
            }
            trace!("Task queue stopped: name={}", worker_name);
        });

        Self { name, tx }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queues a future.
    pub fn schedule<F>(&self, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.push(TaskMessage::Task(fut.boxed()))
    }

    /// Runs a future on the queue and waits for its result.
    ///
    /// Returns `None` if the queue refused the task or stopped before running it.
    pub async fn run<F, T>(&self, fut: F) -> Option<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        if !self.schedule(async move {
            let _ = result_tx.send(fut.await);
        }) {
            return None;
        }
        result_rx.await.ok()
    }

    /// Waits until every task queued before this call has completed.
    ///
    /// Returns false if the queue stopped before reaching the barrier.
    pub async fn flush(&self) -> bool {
        let (done_tx, done_rx) = oneshot::channel();
        if !self.schedule(async move {
            let _ = done_tx.send(());
        }) {
            return false;
        }
        done_rx.await.is_ok()
    }

    /// Stops the worker after the tasks already queued.
    pub fn shutdown(&self) {
        let _ = self.tx.try_send(TaskMessage::Shutdown);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn push(&self, msg: TaskMessage) -> bool {
        match self.tx.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Discarding task, queue full: name={}", self.name);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Discarding task, queue closed: name={}", self.name);
                false
            }
        }
    }
}

impl TaskExecutor for FifoTaskQueue {
    fn execute(&self, task: Task) -> bool {
        self.push(TaskMessage::Task(task))
    }
}

impl std::fmt::Debug for FifoTaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FifoTaskQueue")
            .field("name", &self.name)
            .finish()
    }
}

/// One FIFO task queue per UE.
///
/// Queues are created on first use. `remove_ue` drops the scheduler's handle;
/// the worker finishes what is already queued and then exits, which is how a
/// UE removal scheduled as the last task of a UE is made safe.
pub struct UeTaskScheduler {
    prefix: String,
    capacity: usize,
    queues: Mutex<HashMap<UeIndex, FifoTaskQueue>>,
}

impl UeTaskScheduler {
    pub fn new(prefix: impl Into<String>, capacity: usize) -> Self {
        Self {
            prefix: prefix.into(),
            capacity,
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Queues a task on the UE's queue, creating the queue if needed.
    pub fn schedule<F>(&self, ue_index: UeIndex, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.executor(ue_index).schedule(fut)
    }

    /// Handle to the UE's queue, creating it if needed.
    pub fn executor(&self, ue_index: UeIndex) -> FifoTaskQueue {
        let mut queues = self.queues.lock();
        queues
            .entry(ue_index)
            .or_insert_with(|| {
                FifoTaskQueue::with_capacity(format!("{}-ue{}", self.prefix, ue_index), self.capacity)
            })
            .clone()
    }

    /// Waits until the tasks currently queued for the UE have completed.
    pub async fn flush(&self, ue_index: UeIndex) -> bool {
        let queue = self.queues.lock().get(&ue_index).cloned();
        match queue {
            Some(queue) => queue.flush().await,
            None => true,
        }
    }

    /// Drops the UE's queue handle.
    pub fn remove_ue(&self, ue_index: UeIndex) {
        self.queues.lock().remove(&ue_index);
    }

    pub fn has_ue(&self, ue_index: UeIndex) -> bool {
        self.queues.lock().contains_key(&ue_index)
    }

    pub fn nb_ues(&self) -> usize {
        self.queues.lock().len()
    }
}
