//! Reference lifecycle
//!
//! A [`Ref`] owns exactly one managed reference, local or global. Every
//! transition that gives up the reference takes `self`, so a released or
//! promoted-away reference can never be touched again. Dropping a live
//! `Ref` issues the one tier-appropriate delete call.
//!
//! ```text
//! wrap ──► Local ──promote──► Global
//!            │                  │
//!            └──drop / release──┴──► Released
//! ```

use crate::env::RawHandle;
use crate::error::RuntimeResult;
use crate::runtime::RuntimeContext;
use std::fmt;
use std::sync::Arc;

/// Lifetime class of a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Valid for the current native frame
    Local,
    /// Valid across frames and threads until deleted
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefState {
    Live,
    Released,
}

/// An owned managed reference
pub struct Ref {
    ctx: Arc<RuntimeContext>,
    tier: Tier,
    raw: RawHandle,
    state: RefState,
}

impl Ref {
    fn live(ctx: &Arc<RuntimeContext>, tier: Tier, raw: RawHandle) -> Self {
        Self {
            ctx: ctx.clone(),
            tier,
            raw,
            state: RefState::Live,
        }
    }

    /// Take ownership of a local reference the invoke layer just produced
    pub(crate) fn wrap(ctx: &Arc<RuntimeContext>, raw: RawHandle) -> Self {
        Self::live(ctx, Tier::Local, raw)
    }

    /// Take ownership of a local reference obtained outside this crate
    ///
    /// # Safety
    ///
    /// `raw` must be a live local reference of `ctx`'s runtime that nothing
    /// else will delete.
    pub unsafe fn adopt_local(ctx: &Arc<RuntimeContext>, raw: RawHandle) -> Self {
        Self::wrap(ctx, raw)
    }

    /// Take ownership of a global reference without any runtime call
    ///
    /// # Safety
    ///
    /// `raw` must already be a valid global reference of `ctx`'s runtime that
    /// nothing else will delete. Nothing here can check that.
    pub unsafe fn adopt_global(ctx: &Arc<RuntimeContext>, raw: RawHandle) -> Self {
        Self::live(ctx, Tier::Global, raw)
    }

    /// Runtime this reference belongs to
    pub fn context(&self) -> &Arc<RuntimeContext> {
        &self.ctx
    }

    /// Lifetime class
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Whether this is a local reference
    pub fn is_local(&self) -> bool {
        self.tier == Tier::Local
    }

    /// Whether this is a global reference
    pub fn is_global(&self) -> bool {
        self.tier == Tier::Global
    }

    /// Borrowed address, valid while `self` lives
    pub fn raw(&self) -> RawHandle {
        self.raw
    }

    /// Mint a second, independently owned reference of the same tier
    pub fn create_copy(&self) -> RuntimeResult<Ref> {
        let env = self.ctx.env();
        let raw = match self.tier {
            Tier::Local => env.new_local_ref(self.raw)?,
            Tier::Global => env.new_global_ref(self.raw)?,
        };
        Ok(Self::live(&self.ctx, self.tier, raw))
    }

    /// Turn this reference into a global one
    ///
    /// A local costs exactly one promote call and is gone afterwards. A
    /// global is handed back unchanged. If promotion fails the local is
    /// deleted as this value drops.
    pub fn promote(mut self) -> RuntimeResult<Ref> {
        if self.tier == Tier::Global {
            return Ok(self);
        }
        let global = self.ctx.env().promote(self.raw)?;
        self.state = RefState::Released;
        Ok(Self::live(&self.ctx, Tier::Global, global))
    }

    /// Give up ownership without a delete call
    pub fn into_raw(mut self) -> (Tier, RawHandle) {
        self.state = RefState::Released;
        (self.tier, self.raw)
    }

    /// Delete the reference now
    pub fn release(self) {
        drop(self)
    }
}

impl Drop for Ref {
    fn drop(&mut self) {
        if self.state == RefState::Released {
            return;
        }
        let env = self.ctx.env();
        match self.tier {
            Tier::Local => env.delete_local_ref(self.raw),
            Tier::Global => env.delete_global_ref(self.raw),
        }
        self.state = RefState::Released;
    }
}

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Ref {}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("tier", &self.tier)
            .field("raw", &self.raw)
            .finish()
    }
}
