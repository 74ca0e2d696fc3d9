//! Push-based task list feed.
//!
//! Wraps any [`TaskRepository`] and re-emits the full ordered task list to
//! every subscriber after each successful mutation, which is what the list
//! screen renders from.
//!
//! # Invariants
//! - A new subscriber receives the current list immediately.
//! - Failed mutations emit nothing.
//! - Subscribers whose receiver was dropped are pruned on the next emit.

use crate::model::task::{Task, TaskDraft, TaskId};
use crate::repo::task_repo::{RepoResult, TaskRepository};
use log::{debug, warn};
use std::cell::RefCell;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Task repository decorator that publishes list snapshots.
pub struct ObservedTaskRepository<R: TaskRepository> {
    inner: R,
    subscribers: RefCell<Vec<Sender<Vec<Task>>>>,
}

impl<R: TaskRepository> ObservedTaskRepository<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            subscribers: RefCell::new(Vec::new()),
        }
    }

    /// Subscribes to list snapshots, starting with the current one.
    pub fn subscribe(&self) -> RepoResult<Receiver<Vec<Task>>> {
        let snapshot = self.inner.list_tasks()?;
        let (sender, receiver) = channel();
        // Receiver is alive in this scope, so the first send cannot fail.
        let _ = sender.send(snapshot);
        self.subscribers.borrow_mut().push(sender);
        Ok(receiver)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn publish(&self) {
        if self.subscribers.borrow().is_empty() {
            return;
        }

        let snapshot = match self.inner.list_tasks() {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!("event=task_feed_emit module=repo status=error error={err}");
                return;
            }
        };

        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|sender| sender.send(snapshot.clone()).is_ok());
        debug!(
            "event=task_feed_emit module=repo status=ok tasks={} subscribers={}",
            snapshot.len(),
            subscribers.len()
        );
    }
}

impl<R: TaskRepository> TaskRepository for ObservedTaskRepository<R> {
    fn insert_task(&self, draft: &TaskDraft) -> RepoResult<TaskId> {
        let id = self.inner.insert_task(draft)?;
        self.publish();
        Ok(id)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        self.inner.update_task(task)?;
        self.publish();
        Ok(())
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        self.inner.delete_task(id)?;
        self.publish();
        Ok(())
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        self.inner.get_task(id)
    }

    fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        self.inner.list_tasks()
    }
}
