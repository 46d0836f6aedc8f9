//! Ownership of the one playback session's resources.
//!
//! Everything a load attaches (engine, surface, listener teardowns, timers)
//! is recorded here so that [`ResourceLedger::reset`] can release it before
//! the next load and on shutdown. Every release step is isolated: an error or
//! panic in one is logged and the remaining steps still run.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::{EngineError, EngineHandle, EngineKind, MediaSurface};

type Teardown = Box<dyn FnOnce() + Send>;

#[derive(Default)]
pub struct ResourceLedger {
    engine: Option<EngineHandle>,
    surface: Option<Arc<dyn MediaSurface>>,
    teardowns: Vec<Teardown>,
    timers: Vec<JoinHandle<()>>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the session's engine. A handle still present is released first.
    pub fn set_engine(&mut self, engine: EngineHandle) {
        if let Some(previous) = self.engine.replace(engine) {
            warn!(engine = %previous.kind(), "Replacing an engine that was never reset");
            release_engine(previous);
        }
    }

    pub fn set_surface(&mut self, surface: Arc<dyn MediaSurface>) {
        if let Some(previous) = self.surface.replace(surface) {
            warn!("Replacing a surface that was never reset");
            release_surface(previous);
        }
    }

    /// Runs on the next reset, after every earlier registration.
    pub fn register_teardown(&mut self, action: impl FnOnce() + Send + 'static) {
        self.teardowns.push(Box::new(action));
    }

    /// Aborted on the next reset.
    pub fn register_timer(&mut self, timer: JoinHandle<()>) {
        self.timers.retain(|t| !t.is_finished());
        self.timers.push(timer);
    }

    pub fn engine(&self) -> Option<&EngineHandle> {
        self.engine.as_ref()
    }

    pub fn engine_kind(&self) -> EngineKind {
        self.engine.as_ref().map_or(EngineKind::None, EngineHandle::kind)
    }

    pub fn surface(&self) -> Option<&Arc<dyn MediaSurface>> {
        self.surface.as_ref()
    }

    pub fn teardown_count(&self) -> usize {
        self.teardowns.len()
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engine.is_none()
            && self.surface.is_none()
            && self.teardowns.is_empty()
            && self.timers.is_empty()
    }

    /// Releases everything and leaves the ledger empty. Never fails.
    pub fn reset(&mut self) {
        if self.is_empty() {
            return;
        }
        let engine = self.engine.take();
        let kind = engine.as_ref().map_or(EngineKind::None, EngineHandle::kind);
        debug!(engine = %kind, teardowns = self.teardowns.len(), timers = self.timers.len(), "Resetting session");

        let (encrypted, adaptive, embed) = match engine {
            Some(EngineHandle::Encrypted(e)) => (Some(e), None, None),
            Some(EngineHandle::Adaptive(e)) => (None, Some(e), None),
            Some(EngineHandle::Embed(e)) => (None, None, Some(e)),
            None => (None, None, None),
        };

        if let Some(engine) = encrypted {
            isolated("destroy encrypted engine", || engine.destroy());
        }
        if let Some(engine) = adaptive {
            isolated("stop adaptive engine", || engine.stop_load());
            isolated("destroy adaptive engine", || engine.destroy());
        }
        if let Some(surface) = self.surface.take() {
            release_surface(surface);
        }
        if let Some(frame) = embed {
            isolated("remove embed frame", || frame.remove());
        }
        for action in self.teardowns.drain(..) {
            isolated("listener teardown", || {
                action();
                Ok(())
            });
        }
        for timer in self.timers.drain(..) {
            timer.abort();
        }
    }
}

impl Drop for ResourceLedger {
    fn drop(&mut self) {
        self.reset();
    }
}

impl fmt::Debug for ResourceLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLedger")
            .field("engine", &self.engine)
            .field("surface", &self.surface.is_some())
            .field("teardowns", &self.teardowns.len())
            .field("timers", &self.timers.len())
            .finish()
    }
}

fn release_engine(engine: EngineHandle) {
    match engine {
        EngineHandle::Encrypted(e) => isolated("destroy encrypted engine", || e.destroy()),
        EngineHandle::Adaptive(e) => {
            isolated("stop adaptive engine", || e.stop_load());
            isolated("destroy adaptive engine", || e.destroy());
        }
        EngineHandle::Embed(e) => isolated("remove embed frame", || e.remove()),
    }
}

fn release_surface(surface: Arc<dyn MediaSurface>) {
    isolated("pause surface", || surface.pause());
    isolated("detach surface source", || surface.detach_source());
    isolated("remove surface", || surface.remove());
}

fn isolated(step: &str, release: impl FnOnce() -> Result<(), EngineError>) {
    match catch_unwind(AssertUnwindSafe(release)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(step, code = e.code, error = %e, "Teardown step failed"),
        Err(panic) => warn!(step, panic = panic_message(&panic), "Teardown step panicked"),
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
