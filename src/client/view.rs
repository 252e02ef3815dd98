//! Task list view state.
//!
//! Holds the cached task list and a single error slot. The list is fetched in
//! full on load and reconciled in place after each mutation: created tasks go
//! to the front, toggled tasks are replaced, deleted tasks are removed.
//!
//! Load state machine: `Idle -> Loading -> Ready | Error`. Leaving `Error`
//! requires an explicit [`TaskListView::retry`].

use super::{ClientError, TaskApi};
use crate::types::{Task, TaskTitle, TitleError};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::warn;

pub const LOAD_FAILED: &str = "Failed to load tasks. Please try again.";
pub const ADD_FAILED: &str = "Failed to add task. Please try again.";
pub const UPDATE_FAILED: &str = "Failed to update task. Please try again.";
pub const DELETE_FAILED: &str = "Failed to delete task. Please try again.";

/// Progress of the full-list fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

/// Why a view action did not complete.
#[derive(Debug, Error)]
pub enum ViewError {
    /// The same action is already waiting on the server.
    #[error("a request for this item is already in flight")]
    Busy,

    #[error("task title is required")]
    Blank,

    #[error("{}", TitleError::TooLong)]
    TooLong,

    /// The user declined the confirmation prompt.
    #[error("cancelled")]
    Cancelled,

    #[error("task {0} is not in the list")]
    UnknownTask(i64),

    /// The last load failed; only `retry` may reload.
    #[error("the task list failed to load; retry to reload")]
    RetryRequired,

    /// The round trip failed; `message` is what the user sees.
    #[error("{message}")]
    Request {
        message: &'static str,
        #[source]
        source: ClientError,
    },
}

/// Asks the user before a destructive action.
pub trait Confirm {
    fn confirm(&self, task: &Task) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&Task) -> bool,
{
    fn confirm(&self, task: &Task) -> bool {
        self(task)
    }
}

/// Confirms everything (e.g. `--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _task: &Task) -> bool {
        true
    }
}

#[derive(Debug, Default)]
struct ViewState {
    load: LoadState,
    tasks: Vec<Task>,
    error: Option<&'static str>,
    draft: String,
    creating: bool,
    pending: HashSet<i64>,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    /// What to restore if the fetch never completes.
    Load {
        load: LoadState,
        error: Option<&'static str>,
    },
    Create,
    Task(i64),
}

/// Marks an action as in flight; clears the mark when dropped, including
/// when the owning future is cancelled.
struct InFlight<'a> {
    state: &'a Mutex<ViewState>,
    slot: Slot,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match self.slot {
            Slot::Load { load, error } => {
                if state.load == LoadState::Loading {
                    state.load = load;
                    state.error = error;
                }
            }
            Slot::Create => state.creating = false,
            Slot::Task(id) => {
                state.pending.remove(&id);
            }
        }
    }
}

/// Client-side view of the task list.
pub struct TaskListView<A> {
    api: A,
    state: Mutex<ViewState>,
}

impl<A: TaskApi> TaskListView<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: Mutex::new(ViewState::default()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn load_state(&self) -> LoadState {
        self.state().load
    }

    /// Snapshot of the cached list, newest first.
    pub fn tasks(&self) -> Vec<Task> {
        self.state().tasks.clone()
    }

    /// The user-visible error message, if the last request failed.
    pub fn error(&self) -> Option<&'static str> {
        self.state().error
    }

    pub fn draft(&self) -> String {
        self.state().draft.clone()
    }

    /// Replace the new-task input.
    pub fn set_draft(&self, text: impl Into<String>) {
        self.state().draft = text.into();
    }

    /// Whether the add button is enabled: nothing in flight and the draft
    /// is a valid title.
    pub fn can_submit(&self) -> bool {
        let state = self.state();
        !state.creating && TaskTitle::parse(&state.draft).is_ok()
    }

    /// Whether a toggle or delete for this task is waiting on the server.
    pub fn is_pending(&self, id: i64) -> bool {
        self.state().pending.contains(&id)
    }

    /// "3 tasks • 1 completed"
    pub fn summary(&self) -> String {
        let state = self.state();
        let total = state.tasks.len();
        let completed = state.tasks.iter().filter(|t| t.completed).count();
        format!(
            "{} task{} • {} completed",
            total,
            if total == 1 { "" } else { "s" },
            completed
        )
    }

    /// Fetch the full list. Refused while a load is running and after a
    /// failed load (use [`TaskListView::retry`]).
    pub async fn load(&self) -> Result<(), ViewError> {
        if self.load_state() == LoadState::Error {
            return Err(ViewError::RetryRequired);
        }
        self.fetch().await
    }

    /// Reload the list after an error.
    pub async fn retry(&self) -> Result<(), ViewError> {
        self.fetch().await
    }

    async fn fetch(&self) -> Result<(), ViewError> {
        let _in_flight = {
            let mut state = self.state();
            if state.load == LoadState::Loading {
                return Err(ViewError::Busy);
            }
            let slot = Slot::Load {
                load: state.load,
                error: state.error.take(),
            };
            state.load = LoadState::Loading;
            InFlight {
                state: &self.state,
                slot,
            }
        };

        let result = self.api.list().await;

        let mut state = self.state();
        match result {
            Ok(tasks) => {
                state.tasks = tasks;
                state.load = LoadState::Ready;
                Ok(())
            }
            Err(source) => {
                warn!("Error fetching tasks: {}", source);
                state.error = Some(LOAD_FAILED);
                state.load = LoadState::Error;
                Err(ViewError::Request {
                    message: LOAD_FAILED,
                    source,
                })
            }
        }
    }

    /// Create a task from the draft and put it at the front of the list.
    pub async fn submit(&self) -> Result<Task, ViewError> {
        let (title, _in_flight) = {
            let mut state = self.state();
            if state.creating {
                return Err(ViewError::Busy);
            }
            let title = TaskTitle::parse(&state.draft).map_err(|e| match e {
                TitleError::Blank => ViewError::Blank,
                TitleError::TooLong => ViewError::TooLong,
            })?;
            state.creating = true;
            (
                title,
                InFlight {
                    state: &self.state,
                    slot: Slot::Create,
                },
            )
        };

        let result = self.api.create(title.as_str()).await;

        let mut state = self.state();
        match result {
            Ok(task) => {
                state.tasks.insert(0, task.clone());
                state.draft.clear();
                state.error = None;
                Ok(task)
            }
            Err(source) => {
                warn!("Error adding task: {}", source);
                state.error = Some(ADD_FAILED);
                Err(ViewError::Request {
                    message: ADD_FAILED,
                    source,
                })
            }
        }
    }

    /// Flip `completed` on a cached task and replace it with the server's copy.
    pub async fn toggle(&self, id: i64) -> Result<Task, ViewError> {
        let (completed, _in_flight) = {
            let mut state = self.state();
            if state.pending.contains(&id) {
                return Err(ViewError::Busy);
            }
            let task = state
                .tasks
                .iter()
                .find(|t| t.id == id)
                .ok_or(ViewError::UnknownTask(id))?;
            let completed = !task.completed;
            state.pending.insert(id);
            (completed, self.in_flight(id))
        };

        let result = self.api.set_completed(id, completed).await;

        let mut state = self.state();
        match result {
            Ok(updated) => {
                if let Some(slot) = state.tasks.iter_mut().find(|t| t.id == id) {
                    *slot = updated.clone();
                }
                state.error = None;
                Ok(updated)
            }
            Err(source) => {
                warn!("Error updating task: {}", source);
                state.error = Some(UPDATE_FAILED);
                Err(ViewError::Request {
                    message: UPDATE_FAILED,
                    source,
                })
            }
        }
    }

    /// Delete a cached task after the user confirms.
    pub async fn delete(&self, id: i64, confirm: &dyn Confirm) -> Result<(), ViewError> {
        let task = {
            let state = self.state();
            if state.pending.contains(&id) {
                return Err(ViewError::Busy);
            }
            state
                .tasks
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or(ViewError::UnknownTask(id))?
        };

        if !confirm.confirm(&task) {
            return Err(ViewError::Cancelled);
        }

        let _in_flight = {
            let mut state = self.state();
            // Another action may have started while the prompt was open
            if !state.pending.insert(id) {
                return Err(ViewError::Busy);
            }
            self.in_flight(id)
        };

        let result = self.api.delete(id).await;

        let mut state = self.state();
        match result {
            Ok(()) => {
                state.tasks.retain(|t| t.id != id);
                state.error = None;
                Ok(())
            }
            Err(source) => {
                warn!("Error deleting task: {}", source);
                state.error = Some(DELETE_FAILED);
                Err(ViewError::Request {
                    message: DELETE_FAILED,
                    source,
                })
            }
        }
    }

    fn in_flight(&self, id: i64) -> InFlight<'_> {
        InFlight {
            state: &self.state,
            slot: Slot::Task(id),
        }
    }
}
