//! Runtime instance lifecycle
//!
//! A [`Runtime`] ties the native boundary to one managed runtime instance.
//! Its [`RuntimeContext`] is shared by every reference and binding that
//! talks to that instance and carries the list of default-loader class
//! bindings to invalidate when the instance goes away.

use crate::binding::ClassBinding;
use crate::env::{NativeEnv, NativeVm};
use crate::error::{RuntimeError, RuntimeResult};
use crate::options::RuntimeOptions;
use crate::thread::ThreadGuard;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Unique identifier for a runtime instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuntimeId(u64);

impl RuntimeId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        RuntimeId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Shared state of one runtime instance
pub struct RuntimeContext {
    id: RuntimeId,
    vm: Arc<dyn NativeVm>,
    env: Arc<dyn NativeEnv>,
    options: RuntimeOptions,
    default_caches: Mutex<Vec<Weak<ClassBinding>>>,
    torn_down: AtomicBool,
}

impl RuntimeContext {
    /// Instance id
    pub fn id(&self) -> RuntimeId {
        self.id
    }

    /// Invoke layer
    pub fn env(&self) -> &dyn NativeEnv {
        &*self.env
    }

    pub(crate) fn shared_env(&self) -> Arc<dyn NativeEnv> {
        self.env.clone()
    }

    /// Process-level runtime operations
    pub fn vm(&self) -> &Arc<dyn NativeVm> {
        &self.vm
    }

    /// Configuration
    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Whether teardown already ran
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Fail with [`RuntimeError::TornDown`] once teardown has run
    pub fn ensure_live(&self) -> RuntimeResult<()> {
        if self.is_torn_down() {
            return Err(RuntimeError::TornDown {
                runtime: self.id.as_u64(),
            });
        }
        Ok(())
    }

    /// Record a default-loader binding for invalidation at teardown
    ///
    /// Refused once teardown has run; the flag is read under the list lock
    /// that teardown holds while setting it.
    pub(crate) fn register_default(&self, binding: Weak<ClassBinding>) -> RuntimeResult<()> {
        let mut caches = self.default_caches.lock();
        self.ensure_live()?;
        caches.retain(|b| b.strong_count() > 0);
        caches.push(binding);
        tracing::debug!(runtime = self.id.as_u64(), registered = caches.len(), "registered default cache");
        Ok(())
    }

    /// Number of live bindings waiting for invalidation
    pub fn registered_bindings(&self) -> usize {
        self.default_caches
            .lock()
            .iter()
            .filter(|b| b.strong_count() > 0)
            .count()
    }

    /// Invalidate every registered binding; returns how many were cleared
    ///
    /// Runs at most once per instance.
    pub fn teardown(&self) -> usize {
        let bindings = {
            let mut caches = self.default_caches.lock();
            if self.torn_down.swap(true, Ordering::AcqRel) {
                return 0;
            }
            std::mem::take(&mut *caches)
        };
        let mut cleared = 0;
        for binding in bindings.iter().filter_map(Weak::upgrade) {
            if binding.invalidate(self) {
                cleared += 1;
            }
        }
        tracing::info!(runtime = self.id.as_u64(), invalidated = cleared, "runtime torn down");
        cleared
    }
}

impl fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("torn_down", &self.is_torn_down())
            .finish_non_exhaustive()
    }
}

/// Owner of one runtime instance
///
/// Dropping it tears the instance down: every default-loader class binding
/// forgets its class handle and identifiers, so a later instance looks them
/// up afresh.
///
/// Not `Send`: it may hold the creating thread's [`ThreadGuard`]. Share the
/// [`RuntimeContext`] with other threads instead.
pub struct Runtime {
    ctx: Arc<RuntimeContext>,
    _guard: Option<ThreadGuard>,
}

impl Runtime {
    /// Create a runtime instance over the given native boundary
    pub fn new(
        vm: Arc<dyn NativeVm>,
        env: Arc<dyn NativeEnv>,
        options: RuntimeOptions,
    ) -> RuntimeResult<Self> {
        let ctx = Arc::new(RuntimeContext {
            id: RuntimeId::next(),
            vm,
            env,
            options,
            default_caches: Mutex::new(Vec::new()),
            torn_down: AtomicBool::new(false),
        });
        let guard = if ctx.options.attach_creating_thread {
            Some(ThreadGuard::new(&ctx)?)
        } else {
            None
        };
        tracing::info!(runtime = ctx.id.as_u64(), "runtime created");
        Ok(Self { ctx, _guard: guard })
    }

    /// Create a runtime instance with default options
    pub fn with_defaults(vm: Arc<dyn NativeVm>, env: Arc<dyn NativeEnv>) -> RuntimeResult<Self> {
        Self::new(vm, env, RuntimeOptions::default())
    }

    /// Shared context
    pub fn context(&self) -> &Arc<RuntimeContext> {
        &self.ctx
    }

    /// Instance id
    pub fn id(&self) -> RuntimeId {
        self.ctx.id
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if self.ctx.options.invalidate_on_teardown {
            self.ctx.teardown();
        }
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime").field("ctx", &self.ctx).finish()
    }
}
