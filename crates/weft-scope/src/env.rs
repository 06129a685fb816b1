#![forbid(unsafe_code)]

//! Digest cycle and deferred task scheduling.
//!
//! # Design
//!
//! [`ScopeEnv`] owns the root scope, the capability injector, and a FIFO
//! queue of deferred tasks. [`ScopeEnv::tick`] drains the queue, then runs
//! a digest if any task ran or one was explicitly requested - the host
//! drives ticks; nothing here spawns threads.
//!
//! The digest is a synchronous pass over every watcher in the scope tree,
//! repeated until no watched value changes. A bounded iteration TTL guards
//! against watchers that never stabilize.
//!
//! # Invariants
//!
//! 1. While a digest pass is running, `in_digest()` is true - including
//!    inside watch listeners. Teardown that must not mutate the tree
//!    mid-traversal checks this flag and defers itself via `schedule`.
//! 2. Tasks scheduled during a digest run on the NEXT tick, never inside
//!    the current digest.
//! 3. A digest requested while one is already in progress is an error
//!    (the caller is re-entering the scheduler).
//!
//! # Failure Modes
//!
//! - **Unstable watchers**: a watcher whose listener keeps dirtying other
//!   watched values exhausts the TTL and the digest returns
//!   [`DigestError::Unstable`]. The phase flag is reset regardless.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, info_span};
use web_time::Instant;

use crate::injector::Injector;
use crate::scope::Scope;

/// Maximum number of dirty passes a single digest may take.
const DIGEST_TTL: u32 = 10;

/// Errors surfaced by the digest scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// `digest()` was called while a digest was already running.
    AlreadyInProgress,
    /// The watcher set did not stabilize within the iteration TTL.
    Unstable { passes: u32 },
}

impl fmt::Display for DigestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInProgress => write!(f, "digest already in progress"),
            Self::Unstable { passes } => {
                write!(f, "digest did not settle after {passes} passes")
            }
        }
    }
}

impl std::error::Error for DigestError {}

type Task = Box<dyn FnOnce()>;

struct EnvInner {
    root: Scope,
    injector: Injector,
    tasks: RefCell<VecDeque<Task>>,
    digest_requested: Cell<bool>,
    in_digest: Cell<bool>,
}

/// Shared handle to a scope-framework environment.
#[derive(Clone)]
pub struct ScopeEnv {
    inner: Rc<EnvInner>,
}

/// Resets the digest phase flag even if a listener panics or the digest
/// errors out.
struct PhaseGuard<'a>(&'a Cell<bool>);

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl ScopeEnv {
    #[must_use]
    pub fn new(injector: Injector) -> Self {
        Self {
            inner: Rc::new(EnvInner {
                root: Scope::new_root(),
                injector,
                tasks: RefCell::new(VecDeque::new()),
                digest_requested: Cell::new(false),
                in_digest: Cell::new(false),
            }),
        }
    }

    #[must_use]
    pub fn root(&self) -> Scope {
        self.inner.root.clone()
    }

    #[must_use]
    pub fn injector(&self) -> Injector {
        self.inner.injector.clone()
    }

    /// Convenience: a fresh child of the root scope.
    #[must_use]
    pub fn new_child_scope(&self) -> Scope {
        self.inner.root.new_child()
    }

    /// True while a digest pass is traversing the scope tree.
    #[must_use]
    pub fn in_digest(&self) -> bool {
        self.inner.in_digest.get()
    }

    /// Defer a task to the next tick. A digest follows the drained queue.
    pub fn schedule(&self, task: impl FnOnce() + 'static) {
        self.inner.tasks.borrow_mut().push_back(Box::new(task));
        self.inner.digest_requested.set(true);
    }

    /// Request a digest on the next tick without queueing a task.
    pub fn schedule_digest(&self) {
        self.inner.digest_requested.set(true);
    }

    /// Number of tasks currently queued.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.inner.tasks.borrow().len()
    }

    /// Drain the deferred queue in FIFO order, then digest if any task ran
    /// or a digest was requested. Returns whether any work happened.
    pub fn tick(&self) -> Result<bool, DigestError> {
        let mut ran_any = false;
        loop {
            let task = self.inner.tasks.borrow_mut().pop_front();
            match task {
                Some(task) => {
                    ran_any = true;
                    task();
                }
                None => break,
            }
        }

        let wants_digest = self.inner.digest_requested.replace(false);
        if ran_any || wants_digest {
            self.digest()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Run a digest: evaluate every watcher in the tree, fire listeners for
    /// changed values, and repeat until a full pass stays clean.
    pub fn digest(&self) -> Result<(), DigestError> {
        if self.inner.in_digest.get() {
            return Err(DigestError::AlreadyInProgress);
        }
        self.inner.in_digest.set(true);
        let _phase = PhaseGuard(&self.inner.in_digest);

        let start = Instant::now();
        let span = info_span!(
            "scope.digest",
            passes = tracing::field::Empty,
            duration_us = tracing::field::Empty,
        );
        let _entered = span.enter();

        let mut passes: u32 = 0;
        let mut fired: u64 = 0;
        loop {
            passes += 1;
            if passes > DIGEST_TTL {
                return Err(DigestError::Unstable { passes: DIGEST_TTL });
            }

            let mut dirty = false;
            let mut scopes = Vec::new();
            self.inner.root.collect_tree(&mut scopes);
            for scope in &scopes {
                if scope.is_destroyed() {
                    continue;
                }
                for entry in scope.watchers_snapshot() {
                    if !entry.alive.get() || scope.is_destroyed() {
                        continue;
                    }
                    let new = (entry.watch)(scope);
                    let changed = match &*entry.last.borrow() {
                        None => true,
                        Some(old) => *old != new,
                    };
                    if changed {
                        let old = entry
                            .last
                            .borrow()
                            .clone()
                            .unwrap_or_else(|| new.clone());
                        *entry.last.borrow_mut() = Some(new.clone());
                        (entry.listener)(&new, &old);
                        fired += 1;
                        dirty = true;
                    }
                }
            }
            if !dirty {
                break;
            }
        }

        let duration_us = start.elapsed().as_micros() as u64;
        span.record("passes", passes);
        span.record("duration_us", duration_us);
        debug!(
            target: "weft.scope",
            passes,
            listeners_fired = fired,
            duration_us,
            "digest settled"
        );
        Ok(())
    }
}

impl fmt::Debug for ScopeEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeEnv")
            .field("pending_tasks", &self.pending_tasks())
            .field("in_digest", &self.in_digest())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
