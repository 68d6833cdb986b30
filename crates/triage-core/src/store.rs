use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::{Backend, SaveError};
use crate::task::{Priority, Task};

/// Rejection of a mutation that would violate a collection invariant. The
/// in-memory collection and the edit cursor are untouched when one of these
/// comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("task text must not be empty")]
    EmptyText,
}

/// Result of the durability write that follows an accepted mutation.
///
/// A failed write never rolls the mutation back: the in-memory collection
/// stays the source of truth for the session, and the caller may retry or
/// warn the user.
#[derive(Debug)]
#[must_use]
pub enum SaveOutcome {
    Saved,
    Failed(SaveError),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved)
    }
}

/// Sole owner of the task collection and the edit cursor.
///
/// Every mutation runs as an explicit two-step sequence: mutate the
/// in-memory collection, then write the whole collection through the
/// injected [`Backend`]. Reads are therefore always consistent with the
/// latest accepted mutation, whatever the durability layer does.
pub struct TaskStore {
    tasks: Vec<Task>,
    editing_id: Option<Uuid>,
    backend: Box<dyn Backend>,
}

impl TaskStore {
    /// Loads the stored collection once. Unreadable or malformed data is
    /// recovered by starting from an empty collection; initialization never
    /// fails.
    #[tracing::instrument(skip(backend))]
    pub fn open(backend: Box<dyn Backend>) -> Self {
        let tasks = match backend.load() {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!(error = %err, "failed to load stored tasks; starting empty");
                vec![]
            }
        };

        debug!(count = tasks.len(), "task store ready");
        Self {
            tasks,
            editing_id: None,
            backend,
        }
    }

    /// Appends a freshly minted task. Empty or whitespace-only text is
    /// rejected without touching the collection or the backend.
    #[tracing::instrument(skip(self, text, now))]
    pub fn add(
        &mut self,
        text: &str,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> Result<SaveOutcome, ValidationError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!("rejected add with empty text");
            return Err(ValidationError::EmptyText);
        }

        let task = Task::new(trimmed.to_string(), priority, now);
        debug!(id = %task.id, priority = %task.priority, "task added");
        self.tasks.push(task);
        Ok(self.persist())
    }

    /// Removes the matching task if present; an unknown id is a no-op on the
    /// collection but still rewrites the backend. Removing the task under
    /// edit force-cancels the edit session.
    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn remove(&mut self, id: Uuid) -> SaveOutcome {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        debug!(removed = before - self.tasks.len(), "task removed");

        if self.editing_id == Some(id) {
            self.editing_id = None;
        }
        self.persist()
    }

    #[tracing::instrument(skip(self))]
    pub fn clear_all(&mut self) -> SaveOutcome {
        debug!(count = self.tasks.len(), "clearing all tasks");
        self.tasks.clear();
        self.editing_id = None;
        self.persist()
    }

    /// Opens an edit session for `id`, replacing any prior session. Last
    /// write wins; the id is not checked for existence.
    pub fn start_editing(&mut self, id: Uuid) {
        self.editing_id = Some(id);
    }

    /// Replaces text and priority of the matching task in place. Empty text
    /// is rejected with the edit cursor untouched. A validated call always
    /// persists and always ends the edit session, even when the target id no
    /// longer exists.
    #[tracing::instrument(skip(self, text), fields(id = %id))]
    pub fn update(
        &mut self,
        id: Uuid,
        text: &str,
        priority: Priority,
    ) -> Result<SaveOutcome, ValidationError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!("rejected update with empty text");
            return Err(ValidationError::EmptyText);
        }

        if let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) {
            task.text = trimmed.to_string();
            task.priority = priority;
            debug!("task updated");
        } else {
            debug!("update target not found; collection unchanged");
        }

        self.editing_id = None;
        Ok(self.persist())
    }

    /// Ends the edit session, if any. Idempotent.
    pub fn cancel_editing(&mut self) {
        self.editing_id = None;
    }

    pub fn get_by_id(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Display projection: priority rank ascending, then creation time
    /// descending within equal priority. Recomputed on every call; the sort
    /// is stable, so full ties keep their prior relative order.
    pub fn view(&self) -> Vec<Task> {
        let mut view = self.tasks.clone();
        view.sort_by_key(|task| (task.priority.rank(), Reverse(task.created_at)));
        view
    }

    pub fn editing_id(&self) -> Option<Uuid> {
        self.editing_id
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn persist(&self) -> SaveOutcome {
        match self.backend.save(&self.tasks) {
            Ok(()) => SaveOutcome::Saved,
            Err(err) => {
                warn!(error = %err, "failed to persist tasks; keeping in-memory state");
                SaveOutcome::Failed(err)
            }
        }
    }
}
