//! Class bindings
//!
//! A [`ClassBinding`] pairs a class schema with everything looked up about
//! it at runtime: the class handle and one identifier slot per constructor
//! overload, method overload and field. Each slot is filled at most once per
//! runtime instance.
//!
//! Bindings on the default loading path register with the runtime the first
//! time their class handle is resolved, and are cleared in one pass when
//! that runtime is torn down. Bindings that load through a custom loader are
//! cleared by whoever owns the loader.
//!
//! Cached state belongs to one runtime instance at a time. The first touch
//! through a different instance clears everything before filling anything,
//! and a fill still in flight for the previous instance is refused.

use crate::cache::DoubleLocked;
use crate::env::{FieldId, MethodId, RawHandle};
use crate::error::{RuntimeError, RuntimeResult};
use crate::reference::Ref;
use crate::runtime::RuntimeContext;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use vmbind_schema::{
    render, CallSite, ClassSchema, Member, OverloadResolver, SchemaError, TypeDescriptor,
};

/// How a binding finds its class
#[derive(Debug)]
pub enum LoaderKind {
    /// The runtime's default class lookup
    Default,
    /// A loader object, held as a reference
    Custom(Ref),
}

/// Runtime-side state for one declared class
#[derive(Debug)]
pub struct ClassBinding {
    schema: Arc<ClassSchema>,
    resolver: OverloadResolver,
    loader: LoaderKind,
    class: DoubleLocked<RawHandle>,
    constructors: Vec<DoubleLocked<MethodId>>,
    methods: Vec<Vec<DoubleLocked<MethodId>>>,
    fields: Vec<DoubleLocked<FieldId>>,
    /// Id of the runtime the cached state belongs to; 0 before first use
    owner_id: AtomicU64,
    owner: Mutex<Weak<RuntimeContext>>,
    this: Weak<ClassBinding>,
}

impl ClassBinding {
    /// Bind a schema on the default loading path
    pub fn new(schema: ClassSchema) -> Arc<Self> {
        Self::build(schema, LoaderKind::Default)
    }

    /// Bind a schema loaded through `loader`
    pub fn with_loader(schema: ClassSchema, loader: Ref) -> Arc<Self> {
        Self::build(schema, LoaderKind::Custom(loader))
    }

    fn build(schema: ClassSchema, loader: LoaderKind) -> Arc<Self> {
        let schema = Arc::new(schema);
        let constructors = schema
            .constructors()
            .iter()
            .map(|_| DoubleLocked::new())
            .collect();
        let methods = schema
            .methods()
            .iter()
            .map(|m| m.overloads().iter().map(|_| DoubleLocked::new()).collect())
            .collect();
        let fields = schema.fields().iter().map(|_| DoubleLocked::new()).collect();
        Arc::new_cyclic(|this| ClassBinding {
            resolver: OverloadResolver::new(schema.clone()),
            schema,
            loader,
            class: DoubleLocked::new(),
            constructors,
            methods,
            fields,
            owner_id: AtomicU64::new(0),
            owner: Mutex::new(Weak::new()),
            this: this.clone(),
        })
    }

    /// Declared schema
    pub fn schema(&self) -> &Arc<ClassSchema> {
        &self.schema
    }

    /// Binary class name
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// Loading path
    pub fn loader(&self) -> &LoaderKind {
        &self.loader
    }

    /// Whether this binding is cleared by runtime teardown
    pub fn is_default_loader(&self) -> bool {
        matches!(self.loader, LoaderKind::Default)
    }

    /// Whether the class handle is currently cached
    pub fn is_resolved(&self) -> bool {
        self.class.get().is_some()
    }

    /// Id of the runtime instance the cached state belongs to
    pub fn owner(&self) -> Option<u64> {
        match self.owner_id.load(Ordering::Acquire) {
            0 => None,
            id => Some(id),
        }
    }

    /// Make `ctx` the owner of the cached state, clearing a previous owner's
    fn claim(&self, ctx: &Arc<RuntimeContext>) -> RuntimeResult<()> {
        ctx.ensure_live()?;
        if self.owner_id.load(Ordering::Acquire) == ctx.id().as_u64() {
            return Ok(());
        }
        self.claim_slow(ctx)
    }

    #[cold]
    fn claim_slow(&self, ctx: &Arc<RuntimeContext>) -> RuntimeResult<()> {
        let mut owner = self.owner.lock();
        let previous = self.owner_id.load(Ordering::Acquire);
        if previous == ctx.id().as_u64() {
            return Ok(());
        }
        if previous != 0 {
            // Fills racing with the clear see no owner and are refused.
            self.owner_id.store(0, Ordering::Release);
            let previous_ctx = owner.upgrade();
            self.clear_slots(previous_ctx.as_deref());
            tracing::debug!(
                class = self.name(),
                from = previous,
                to = ctx.id().as_u64(),
                "moved class binding to a new runtime"
            );
        }
        *owner = Arc::downgrade(ctx);
        self.owner_id.store(ctx.id().as_u64(), Ordering::Release);
        Ok(())
    }

    /// Checked inside slot initializers, under the slot lock
    fn check_owner(&self, ctx: &RuntimeContext) -> RuntimeResult<()> {
        ctx.ensure_live()?;
        if self.owner_id.load(Ordering::Acquire) != ctx.id().as_u64() {
            return Err(RuntimeError::Rebound {
                class: self.name().to_string(),
                runtime: ctx.id().as_u64(),
            });
        }
        Ok(())
    }

    /// Resolve a method call site by argument descriptors
    pub fn resolve_method(&self, name: &str, args: &[TypeDescriptor]) -> RuntimeResult<Arc<CallSite>> {
        Ok(self.resolver.method(name, args)?)
    }

    /// Resolve a constructor call site by argument descriptors
    pub fn resolve_constructor(&self, args: &[TypeDescriptor]) -> RuntimeResult<Arc<CallSite>> {
        Ok(self.resolver.constructor(args)?)
    }

    pub(crate) fn check_site(&self, site: &CallSite) -> RuntimeResult<()> {
        if site.schema() != self.schema.id() {
            return Err(RuntimeError::ForeignCallSite {
                class: self.name().to_string(),
                site_class: site.class_name().to_string(),
            });
        }
        Ok(())
    }

    /// Global class handle, looked up on first use
    pub fn class_handle(&self, ctx: &Arc<RuntimeContext>) -> RuntimeResult<RawHandle> {
        self.claim(ctx)?;
        self.cached_class(ctx)
    }

    /// Class handle for an already claimed `ctx`; never takes the owner lock
    fn cached_class(&self, ctx: &Arc<RuntimeContext>) -> RuntimeResult<RawHandle> {
        self.class
            .load_and_maybe_init(|| -> RuntimeResult<RawHandle> {
                self.check_owner(ctx)?;
                let env = ctx.env();
                let found = match &self.loader {
                    LoaderKind::Default => env.find_class(self.name()),
                    LoaderKind::Custom(loader) => env.load_class(loader.raw(), self.name()),
                };
                let local = found.map_err(|e| {
                    tracing::warn!(class = self.name(), error = %e, "class lookup failed");
                    e
                })?;
                let (_, global) = Ref::wrap(ctx, local).promote()?.into_raw();
                if self.is_default_loader() {
                    if let Err(e) = ctx.register_default(self.this.clone()) {
                        env.delete_global_ref(global);
                        return Err(e);
                    }
                }
                tracing::debug!(class = self.name(), runtime = ctx.id().as_u64(), "resolved class handle");
                Ok(global)
            })
    }

    /// Method identifier for a constructor or method call site
    pub fn method_id(&self, ctx: &Arc<RuntimeContext>, site: &CallSite) -> RuntimeResult<MethodId> {
        self.check_site(site)?;
        self.claim(ctx)?;
        let slot = match site.coord().member() {
            Member::Constructor { overload } => self.constructors.get(overload),
            Member::Method { method, overload } => {
                self.methods.get(method).and_then(|m| m.get(overload))
            }
            _ => None,
        }
        .ok_or_else(|| SchemaError::CoordinateOutOfRange {
            class: self.name().to_string(),
        })?;

        slot.load_and_maybe_init(|| -> RuntimeResult<MethodId> {
            self.check_owner(ctx)?;
            let class = self.cached_class(ctx)?;
            let id = ctx
                .env()
                .get_method_id(class, site.name(), site.signature())
                .map_err(|e| {
                    tracing::warn!(
                        class = self.name(),
                        name = site.name(),
                        signature = site.signature(),
                        error = %e,
                        "method lookup failed"
                    );
                    e
                })?;
            tracing::trace!(
                class = self.name(),
                name = site.name(),
                signature = site.signature(),
                "initialized method id"
            );
            Ok(id)
        })
    }

    /// Field identifier and declared type
    pub fn field_id(
        &self,
        ctx: &Arc<RuntimeContext>,
        name: &str,
    ) -> RuntimeResult<(FieldId, &TypeDescriptor)> {
        self.claim(ctx)?;
        let (index, field) = self
            .schema
            .field(name)
            .ok_or_else(|| RuntimeError::UnknownField {
                class: self.name().to_string(),
                name: name.to_string(),
            })?;
        let slot = self
            .fields
            .get(index)
            .ok_or_else(|| SchemaError::CoordinateOutOfRange {
                class: self.name().to_string(),
            })?;

        let id = slot.load_and_maybe_init(|| -> RuntimeResult<FieldId> {
            self.check_owner(ctx)?;
            let class = self.cached_class(ctx)?;
            let signature = render(field.ty());
            let id = ctx
                .env()
                .get_field_id(class, name, &signature)
                .map_err(|e| {
                    tracing::warn!(class = self.name(), name, error = %e, "field lookup failed");
                    e
                })?;
            tracing::trace!(class = self.name(), name, signature = %signature, "initialized field id");
            Ok(id)
        })?;
        Ok((id, field.ty()))
    }

    /// Forget every cached identifier and release the class handle
    ///
    /// Only state belonging to `ctx` is touched. Returns whether anything
    /// was cached.
    pub fn invalidate(&self, ctx: &RuntimeContext) -> bool {
        let _owner = self.owner.lock();
        if self.owner_id.load(Ordering::Acquire) != ctx.id().as_u64() {
            return false;
        }
        let cleared = self.clear_slots(Some(ctx));
        if cleared {
            tracing::debug!(class = self.name(), runtime = ctx.id().as_u64(), "invalidated class binding");
        }
        cleared
    }

    /// Empty every slot; the class handle is deleted through `ctx` while it lives
    fn clear_slots(&self, ctx: Option<&RuntimeContext>) -> bool {
        let mut cleared = false;
        for slot in self.constructors.iter().chain(self.methods.iter().flatten()) {
            cleared |= slot.invalidate().is_some();
        }
        for slot in &self.fields {
            cleared |= slot.invalidate().is_some();
        }
        if let Some(global) = self.class.invalidate() {
            if let Some(ctx) = ctx {
                ctx.env().delete_global_ref(global);
            }
            cleared = true;
        }
        cleared
    }
}

impl Drop for ClassBinding {
    fn drop(&mut self) {
        let owner = self.owner.get_mut().upgrade();
        if let (Some(ctx), Some(global)) = (owner, self.class.invalidate()) {
            ctx.env().delete_global_ref(global);
        }
    }
}
