//! Shared tasks and single-flight tables.
//!
//! A [`SharedTask`] is a cloneable handle to a value produced once. Every
//! clone can await it. Completion is signalled by closing an `async-channel`,
//! which wakes all waiters at once. A producer dropped without finishing
//! leaves the task abandoned instead of hanging its waiters.
//!
//! [`InFlight`] maps keys to running tasks with atomic create-or-join. The
//! [`Producer`] handed to the creator removes the entry when it finishes or
//! is dropped. Cancellation is not supported: a task runs until its
//! producer finishes or is dropped.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use async_channel::{Receiver, Sender};
use bevy::tasks::{AsyncComputeTaskPool, IoTaskPool, Task, TaskPoolBuilder};

/// Thread name prefix of the compute pool created by [`init_task_pools`].
pub const COMPUTE_THREAD_NAME: &str = "Async Compute Task Pool";
/// Thread name prefix of the I/O pool created by [`init_task_pools`].
pub const IO_THREAD_NAME: &str = "IO Task Pool";

/// Initializes the compute and I/O task pools if the host has not.
///
/// Rendering runs on the compute pool; every tile store call runs on the I/O
/// pool.
pub fn init_task_pools() {
  AsyncComputeTaskPool::get_or_init(|| {
    TaskPoolBuilder::new()
      .thread_name(COMPUTE_THREAD_NAME.to_string())
      .build()
  });
  IoTaskPool::get_or_init(|| {
    TaskPoolBuilder::new()
      .thread_name(IO_THREAD_NAME.to_string())
      .build()
  });
}

/// Awaits every task, preserving order.
pub async fn join_all<T>(tasks: Vec<Task<T>>) -> Vec<T> {
  let mut out = Vec::with_capacity(tasks.len());
  for task in tasks {
    out.push(task.await);
  }
  out
}

/// The producer of a shared task went away without a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Abandoned;

impl fmt::Display for Abandoned {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "task abandoned before completion")
  }
}

impl std::error::Error for Abandoned {}

struct Shared<T> {
  value: OnceLock<T>,
  done: Receiver<()>,
}

/// Cloneable handle to a value produced once.
pub struct SharedTask<T> {
  inner: Arc<Shared<T>>,
}

impl<T> Clone for SharedTask<T> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

/// Write side of a [`SharedTask`].
pub struct Completer<T> {
  inner: Arc<Shared<T>>,
  _done: Sender<()>,
}

impl<T> Completer<T> {
  /// Publishes the value and wakes every waiter.
  pub fn complete(self, value: T) {
    let _ = self.inner.value.set(value);
    // Dropping `self` drops the sender, closing the channel.
  }
}

impl<T: Clone> SharedTask<T> {
  /// Creates a pending task and its completer.
  pub fn pending() -> (Self, Completer<T>) {
    let (tx, rx) = async_channel::bounded(1);
    let inner = Arc::new(Shared {
      value: OnceLock::new(),
      done: rx,
    });
    (
      Self {
        inner: Arc::clone(&inner),
      },
      Completer { inner, _done: tx },
    )
  }

  /// A task that is already complete.
  pub fn ready(value: T) -> Self {
    let (task, completer) = Self::pending();
    completer.complete(value);
    task
  }

  /// Waits for the value.
  pub async fn wait(&self) -> Result<T, Abandoned> {
    if let Some(value) = self.inner.value.get() {
      return Ok(value.clone());
    }
    // Nothing is ever sent; this returns once the channel closes.
    let _ = self.inner.done.recv().await;
    self.inner.value.get().cloned().ok_or(Abandoned)
  }

  /// True once the task has completed or been abandoned.
  pub fn is_finished(&self) -> bool {
    self.inner.done.is_closed()
  }

  /// True if both handles refer to the same task.
  pub fn ptr_eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }
}

/// Outcome of [`InFlight::join_or_create`].
pub enum Entry<K: Eq + Hash + Clone, T: Clone> {
  /// A task was already running for the key.
  Joined(SharedTask<T>),
  /// The caller now owns the task and must produce its value.
  Created(Producer<K, T>),
}

/// Table of running tasks keyed by `K`.
pub struct InFlight<K, T> {
  tasks: Arc<Mutex<TaskMap<K, T>>>,
}

impl<K, T> Clone for InFlight<K, T> {
  fn clone(&self) -> Self {
    Self {
      tasks: Arc::clone(&self.tasks),
    }
  }
}

impl<K, T> Default for InFlight<K, T> {
  fn default() -> Self {
    Self {
      tasks: Arc::new(Mutex::new(HashMap::new())),
    }
  }
}

type TaskMap<K, T> = HashMap<K, SharedTask<T>>;

fn lock<K, T>(tasks: &Mutex<TaskMap<K, T>>) -> MutexGuard<'_, TaskMap<K, T>> {
  tasks.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K: Eq + Hash + Clone, T: Clone> InFlight<K, T> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns the running task for `key`, or registers a new one.
  pub fn join_or_create(&self, key: K) -> Entry<K, T> {
    let mut tasks = lock(&self.tasks);
    if let Some(task) = tasks.get(&key) {
      return Entry::Joined(task.clone());
    }
    let (task, completer) = SharedTask::pending();
    tasks.insert(key.clone(), task.clone());
    Entry::Created(Producer {
      table: self.clone(),
      key,
      task,
      completer: Some(completer),
    })
  }

  /// The running task for `key`, if any.
  pub fn get(&self, key: &K) -> Option<SharedTask<T>> {
    lock(&self.tasks).get(key).cloned()
  }

  /// Handles to every running task.
  pub fn snapshot(&self) -> Vec<SharedTask<T>> {
    lock(&self.tasks).values().cloned().collect()
  }

  pub fn len(&self) -> usize {
    lock(&self.tasks).len()
  }

  pub fn is_empty(&self) -> bool {
    lock(&self.tasks).is_empty()
  }

  /// Removes `key` only if it still maps to `task`.
  fn remove_if_same(&self, key: &K, task: &SharedTask<T>) -> bool {
    let mut tasks = lock(&self.tasks);
    if tasks.get(key).is_some_and(|t| t.ptr_eq(task)) {
      tasks.remove(key);
      true
    } else {
      false
    }
  }
}

/// Sole producer of an [`InFlight`] entry.
///
/// Finishing deregisters the entry, then publishes the value, so waiters
/// never observe a finished task still registered. Dropping without
/// finishing deregisters and abandons the task.
pub struct Producer<K: Eq + Hash + Clone, T: Clone> {
  table: InFlight<K, T>,
  key: K,
  task: SharedTask<T>,
  completer: Option<Completer<T>>,
}

impl<K: Eq + Hash + Clone, T: Clone> Producer<K, T> {
  pub fn task(&self) -> SharedTask<T> {
    self.task.clone()
  }

  pub fn key(&self) -> &K {
    &self.key
  }

  pub fn finish(mut self, value: T) {
    self.table.remove_if_same(&self.key, &self.task);
    if let Some(completer) = self.completer.take() {
      completer.complete(value);
    }
  }
}

impl<K: Eq + Hash + Clone, T: Clone> Drop for Producer<K, T> {
  fn drop(&mut self) {
    self.table.remove_if_same(&self.key, &self.task);
    // An unfinished completer drops here, closing the channel.
  }
}
