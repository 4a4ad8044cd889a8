//! Thread attachment
//!
//! A native thread must be attached before it calls into the managed
//! runtime. [`ThreadGuard`] attaches on first use and records the obligation
//! in thread-local state, one record per runtime instance. The detach is
//! deferred past the guard, because code still running on the thread (a
//! closure holding references, say) may outlive any one guard. It happens
//! at thread teardown, or earlier when a later guard finds the record's
//! runtime torn down with no guards left on it.
//!
//! A thread that was already attached when the first guard ran belongs to
//! someone else and is never detached here.

use crate::env::{NativeEnv, NativeVm};
use crate::error::RuntimeResult;
use crate::runtime::{RuntimeContext, RuntimeId};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

struct ThreadAttachment {
    runtime: RuntimeId,
    ctx: Weak<RuntimeContext>,
    vm: Arc<dyn NativeVm>,
    env: Arc<dyn NativeEnv>,
    owns: bool,
    depth: usize,
}

impl ThreadAttachment {
    /// No guard holds it and its runtime is gone or torn down
    fn is_settled(&self) -> bool {
        self.depth == 0 && self.ctx.upgrade().map_or(true, |ctx| ctx.is_torn_down())
    }
}

impl Drop for ThreadAttachment {
    fn drop(&mut self) {
        if !self.owns {
            return;
        }
        match self.vm.detach_current_thread() {
            Ok(()) => tracing::debug!(runtime = self.runtime.as_u64(), "detached thread"),
            Err(e) => tracing::warn!(
                runtime = self.runtime.as_u64(),
                error = %e,
                "failed to detach thread"
            ),
        }
    }
}

thread_local! {
    /// Most recently guarded runtime last
    static ATTACHMENTS: RefCell<Vec<ThreadAttachment>> = const { RefCell::new(Vec::new()) };
}

/// Proof that the calling thread is attached
///
/// Guards nest freely; only the first one for a runtime on a thread may
/// attach it. Not `Send`: a guard speaks for the thread that built it.
#[derive(Debug)]
pub struct ThreadGuard {
    runtime: RuntimeId,
    _not_send: PhantomData<*const ()>,
}

impl ThreadGuard {
    /// Make sure the calling thread is attached to `ctx`'s runtime
    pub fn new(ctx: &Arc<RuntimeContext>) -> RuntimeResult<Self> {
        ctx.ensure_live()?;

        let settled: Vec<ThreadAttachment> = ATTACHMENTS.with(|records| {
            let mut records = records.borrow_mut();
            let (settled, kept): (Vec<_>, Vec<_>) =
                records.drain(..).partition(ThreadAttachment::is_settled);
            *records = kept;
            settled
        });
        // Owed detaches run here, outside the borrow.
        drop(settled);

        ATTACHMENTS.with(|records| -> RuntimeResult<()> {
            let mut records = records.borrow_mut();
            if let Some(pos) = records.iter().position(|a| a.runtime == ctx.id()) {
                let mut attachment = records.remove(pos);
                attachment.depth += 1;
                records.push(attachment);
                return Ok(());
            }

            let vm = ctx.vm().clone();
            let owns = if vm.current_thread_attached() {
                false
            } else {
                let name = ctx.options().thread_name_prefix.as_deref();
                vm.attach_current_thread(name)?;
                tracing::debug!(runtime = ctx.id().as_u64(), name = ?name, "attached thread");
                true
            };
            records.push(ThreadAttachment {
                runtime: ctx.id(),
                ctx: Arc::downgrade(ctx),
                vm,
                env: ctx.shared_env(),
                owns,
                depth: 1,
            });
            Ok(())
        })?;
        Ok(Self {
            runtime: ctx.id(),
            _not_send: PhantomData,
        })
    }

    /// Environment of the runtime most recently guarded on the calling thread
    pub fn current_env() -> Option<Arc<dyn NativeEnv>> {
        ATTACHMENTS.with(|records| records.borrow().last().map(|a| a.env.clone()))
    }

    /// Live guards on the calling thread, across runtimes
    pub fn depth() -> usize {
        ATTACHMENTS.with(|records| records.borrow().iter().map(|a| a.depth).sum())
    }

    /// Whether the most recently guarded runtime will detach the calling thread
    pub fn owns_attachment() -> bool {
        ATTACHMENTS.with(|records| records.borrow().last().is_some_and(|a| a.owns))
    }

    /// Runtime this guard attached for
    pub fn runtime(&self) -> RuntimeId {
        self.runtime
    }
}

impl Drop for ThreadGuard {
    fn drop(&mut self) {
        let _ = ATTACHMENTS.try_with(|records| {
            let mut records = records.borrow_mut();
            if let Some(attachment) = records.iter_mut().find(|a| a.runtime == self.runtime) {
                attachment.depth = attachment.depth.saturating_sub(1);
            }
        });
    }
}
