//! Creation-in-progress tracking for prototype beans.
//!
//! Each thread keeps its own set of names under construction, per tracker.
//! Nothing here is shared between threads, so no locking is involved: a
//! prototype being built on one thread is invisible to every other thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

static NEXT_TRACKER_ID: AtomicU64 = AtomicU64::new(1);

type InProgress = SmallVec<[String; 4]>;

// Thread-local marks, keyed by tracker id so two factories never see each other's marks
thread_local! {
    static IN_CREATION: RefCell<HashMap<u64, InProgress>> = RefCell::new(HashMap::new());
}

/// Per-thread set of bean names currently being built.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::CreationTracker;
///
/// let tracker = CreationTracker::new();
/// {
///     let _guard = tracker.guard("requestCtx");
///     assert!(tracker.contains("requestCtx"));
/// }
/// assert!(!tracker.contains("requestCtx"));
/// assert!(tracker.is_idle());
/// ```
#[derive(Debug)]
pub struct CreationTracker {
    id: u64,
}

impl CreationTracker {
    pub fn new() -> Self {
        Self {
            id: NEXT_TRACKER_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Marks `name` as in creation on the current thread.
    pub fn enter(&self, name: &str) {
        IN_CREATION.with(|marks| {
            let mut marks = marks.borrow_mut();
            let names = marks.entry(self.id).or_default();
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        });
    }

    /// Clears the mark for `name`. Drops the thread's set once it is empty.
    pub fn exit(&self, name: &str) {
        IN_CREATION.with(|marks| {
            let mut marks = marks.borrow_mut();
            if let Some(names) = marks.get_mut(&self.id) {
                names.retain(|n| n != name);
                if names.is_empty() {
                    marks.remove(&self.id);
                }
            }
        });
    }

    /// Whether `name` is in creation on the current thread.
    pub fn contains(&self, name: &str) -> bool {
        IN_CREATION.with(|marks| {
            marks
                .borrow()
                .get(&self.id)
                .is_some_and(|names| names.iter().any(|n| n == name))
        })
    }

    /// Names in creation on the current thread, oldest first.
    pub fn in_progress(&self) -> Vec<String> {
        IN_CREATION.with(|marks| {
            marks
                .borrow()
                .get(&self.id)
                .map(|names| names.to_vec())
                .unwrap_or_default()
        })
    }

    /// True when the current thread holds no marks for this tracker.
    pub fn is_idle(&self) -> bool {
        IN_CREATION.with(|marks| !marks.borrow().contains_key(&self.id))
    }

    /// Enters `name` and returns a guard that exits it on drop, including
    /// during unwinding.
    pub fn guard<'a>(&'a self, name: &'a str) -> CreationGuard<'a> {
        self.enter(name);
        CreationGuard { tracker: self, name }
    }
}

impl Default for CreationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CreationTracker {
    fn drop(&mut self) {
        // Marks on other threads die with those threads
        let _ = IN_CREATION.try_with(|marks| {
            if let Ok(mut marks) = marks.try_borrow_mut() {
                marks.remove(&self.id);
            }
        });
    }
}

/// Guard for a prototype creation mark
pub struct CreationGuard<'a> {
    tracker: &'a CreationTracker,
    name: &'a str,
}

impl Drop for CreationGuard<'_> {
    fn drop(&mut self) {
        self.tracker.exit(self.name);
    }
}
