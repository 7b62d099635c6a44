use std::collections::HashMap;
use tokio::task::JoinHandle;

/// Background work a channel client owns. At most one task of each kind is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Reader,
    Heartbeat,
    Reconnect,
    TypingStop,
}

/// Manages background tasks with proper lifecycle handling
pub struct TaskManager {
    handles: HashMap<TaskKind, JoinHandle<()>>,
}

impl TaskManager {
    /// Create a new empty task manager
    pub fn new() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }

    /// Spawn a task and track it, aborting any previous task of the same kind
    pub fn spawn<F>(&mut self, kind: TaskKind, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        if let Some(previous) = self.handles.insert(kind, handle) {
            previous.abort();
        }
    }

    /// Abort one task if it is tracked
    pub fn abort(&mut self, kind: TaskKind) {
        if let Some(handle) = self.handles.remove(&kind) {
            handle.abort();
        }
    }

    /// Stop tracking a task without aborting it.
    ///
    /// Used by a task that is about to tear down its own session: aborting itself
    /// would cancel the teardown at its next await point.
    pub fn detach(&mut self, kind: TaskKind) {
        self.handles.remove(&kind);
    }

    /// Whether a task of this kind is tracked and still running
    pub fn is_active(&self, kind: TaskKind) -> bool {
        self.handles
            .get(&kind)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Abort every tracked task
    pub fn abort_all(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}
