/*!
 * Boundary Environment Manager
 * Loads the foreign runtime bindings once and hands out per-thread contexts
 *
 * Bindings are swapped atomically on load/unload and read lock-free by every
 * boundary call. Contexts are cached per thread and keyed by the load
 * generation, so nothing attached under a previous load is ever reused.
 */

use super::traits::{ExecutionContext, ForeignRuntime, LogSink, ProcessOwner};
use crate::core::config::BridgeConfig;
use crate::core::errors::{BridgeError, BridgeResult};
use arc_swap::ArcSwapOption;
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info, warn};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

static GLOBAL_BOUNDARY: OnceLock<Arc<BoundaryManager>> = OnceLock::new();

thread_local! {
    static ATTACHED: Cell<Option<(u64, ExecutionContext)>> = const { Cell::new(None) };
}

/// Process-wide boundary used by the C surface and the JNI entry points
pub fn global() -> &'static Arc<BoundaryManager> {
    GLOBAL_BOUNDARY.get_or_init(|| Arc::new(BoundaryManager::new()))
}

/// Where log records go besides the local log; fixed at load time.
pub enum LogRoute {
    LocalOnly,
    Remote(Arc<dyn LogSink>),
}

/// Everything resolved during a successful load
pub struct Bindings {
    generation: u64,
    runtime: Arc<dyn ForeignRuntime>,
    owner: Arc<dyn ProcessOwner>,
    log_route: LogRoute,
}

impl Bindings {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn owner(&self) -> &dyn ProcessOwner {
        self.owner.as_ref()
    }

    pub fn log_sink(&self) -> Option<&dyn LogSink> {
        match &self.log_route {
            LogRoute::Remote(sink) => Some(sink.as_ref()),
            LogRoute::LocalOnly => None,
        }
    }
}

/// A thread's context plus the bindings it was acquired under.
///
/// Holding the bindings keeps them alive for the duration of a call even if
/// the boundary is unloaded concurrently.
pub struct BoundContext {
    cx: ExecutionContext,
    bindings: Arc<Bindings>,
}

impl BoundContext {
    pub fn context(&self) -> &ExecutionContext {
        &self.cx
    }

    pub fn owner(&self) -> &dyn ProcessOwner {
        self.bindings.owner()
    }

    pub fn log_sink(&self) -> Option<&dyn LogSink> {
        self.bindings.log_sink()
    }

    pub fn generation(&self) -> u64 {
        self.bindings.generation
    }
}

/// Owns the lifecycle of the foreign runtime bindings.
///
/// `load` and `unload` are not meant to race each other; call them from one
/// controlling thread (the runtime's load/unload hooks do exactly that).
pub struct BoundaryManager {
    bindings: ArcSwapOption<Bindings>,
}

impl BoundaryManager {
    pub fn new() -> Self {
        Self {
            bindings: ArcSwapOption::empty(),
        }
    }

    /// Resolve and cache the remote entry points.
    ///
    /// Fails if any process-owner entry point is missing. A missing log sink
    /// only downgrades logging to local-only.
    pub fn load(&self, runtime: Arc<dyn ForeignRuntime>, config: &BridgeConfig) -> BridgeResult<()> {
        if self.bindings.load().is_some() {
            return Err(BridgeError::AlreadyLoaded);
        }

        let cx = attach_thread(runtime.as_ref())?;

        let owner = runtime
            .bind_process_owner(&cx, &config.owner_class)
            .map_err(|e| {
                error!(class = %config.owner_class, error = %e, "Failed to bind process owner");
                e
            })?;

        let log_route = match runtime.bind_log_sink(&cx, &config.log_sink_class) {
            Ok(sink) => {
                debug!(class = %config.log_sink_class, "Remote log sink bound");
                LogRoute::Remote(sink)
            }
            Err(e) => {
                warn!(
                    class = %config.log_sink_class,
                    error = %e,
                    "Remote log sink unavailable, logging locally only"
                );
                LogRoute::LocalOnly
            }
        };

        let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
        ATTACHED.with(|slot| slot.set(Some((generation, cx))));

        self.bindings.store(Some(Arc::new(Bindings {
            generation,
            runtime,
            owner,
            log_route,
        })));

        info!(generation, owner = %config.owner_class, "Boundary loaded");
        Ok(())
    }

    /// Drop the cached bindings; every later `acquire_context` fails.
    pub fn unload(&self) {
        if let Some(old) = self.bindings.swap(None) {
            ATTACHED.with(|slot| slot.set(None));
            info!(generation = old.generation, "Boundary unloaded");
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.bindings.load().is_some()
    }

    /// Snapshot of the current bindings without attaching anything
    pub fn bindings(&self) -> Option<Arc<Bindings>> {
        self.bindings.load_full()
    }

    /// Context for the calling thread, attaching it on first use.
    ///
    /// The context is cached per thread for the life of a load and the
    /// runtime is not asked again. If another component detaches this thread
    /// and re-attaches it under the same load, the cached context is stale;
    /// threads shared with such components must not be detached while loaded.
    pub fn acquire_context(&self) -> BridgeResult<BoundContext> {
        let bindings = self
            .bindings
            .load_full()
            .ok_or_else(|| BridgeError::unavailable("runtime not loaded"))?;

        let cached = ATTACHED.with(|slot| slot.get());
        let cx = match cached {
            Some((generation, cx)) if generation == bindings.generation => cx,
            _ => {
                let cx = attach_thread(bindings.runtime.as_ref())?;
                ATTACHED.with(|slot| slot.set(Some((bindings.generation, cx))));
                cx
            }
        };

        Ok(BoundContext { cx, bindings })
    }
}

impl Default for BoundaryManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Attach-if-absent for the calling thread
fn attach_thread(runtime: &dyn ForeignRuntime) -> BridgeResult<ExecutionContext> {
    if let Some(cx) = runtime.current_thread_context() {
        return Ok(cx);
    }

    match runtime.attach_current_thread() {
        Ok(cx) => {
            debug!(thread = ?std::thread::current().id(), "Attached thread to runtime");
            Ok(cx)
        }
        Err(e) => {
            error!(error = %e, "Failed to attach thread to runtime");
            Err(BridgeError::unavailable(format!("attach failed: {}", e)))
        }
    }
}
