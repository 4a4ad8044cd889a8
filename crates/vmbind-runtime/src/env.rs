//! Native boundary
//!
//! The traits here are the only way this crate reaches the managed runtime.
//! An embedder implements them over the real invoke layer; tests implement
//! them with counting fakes.

use crate::error::NativeResult;
use crate::value::Value;
use std::fmt;
use std::num::NonZeroUsize;
use vmbind_schema::{PrimitiveKind, TypeDescriptor};

/// Address of a managed object reference
///
/// Never null. Two handles are the same reference exactly when their
/// addresses are equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(NonZeroUsize);

impl RawHandle {
    /// Create a handle from an address, `None` for null
    pub fn new(addr: usize) -> Option<Self> {
        NonZeroUsize::new(addr).map(RawHandle)
    }

    /// Get the address
    pub fn addr(self) -> usize {
        self.0.get()
    }

    pub(crate) fn as_nonzero(self) -> NonZeroUsize {
        self.0
    }

    pub(crate) fn from_nonzero(word: NonZeroUsize) -> Self {
        RawHandle(word)
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawHandle({:#x})", self.0)
    }
}

/// Opaque method identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(NonZeroUsize);

impl MethodId {
    /// Wrap a runtime-issued identifier
    pub fn from_raw(raw: NonZeroUsize) -> Self {
        MethodId(raw)
    }

    /// Get the raw identifier
    pub fn as_raw(self) -> NonZeroUsize {
        self.0
    }
}

/// Opaque field identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId(NonZeroUsize);

impl FieldId {
    /// Wrap a runtime-issued identifier
    pub fn from_raw(raw: NonZeroUsize) -> Self {
        FieldId(raw)
    }

    /// Get the raw identifier
    pub fn as_raw(self) -> NonZeroUsize {
        self.0
    }
}

/// Invoke-layer operations on the managed runtime
///
/// Handles returned by lookups and allocations are new local references
/// owned by the caller. `promote` consumes the local it is given.
pub trait NativeEnv: Send + Sync {
    /// Resolve a class through the default loading path
    fn find_class(&self, name: &str) -> NativeResult<RawHandle>;

    /// Resolve a class through a loader object
    fn load_class(&self, loader: RawHandle, name: &str) -> NativeResult<RawHandle>;

    /// Look up a method or constructor
    fn get_method_id(&self, class: RawHandle, name: &str, signature: &str)
        -> NativeResult<MethodId>;

    /// Look up an instance field
    fn get_field_id(&self, class: RawHandle, name: &str, signature: &str) -> NativeResult<FieldId>;

    /// Allocate and construct an object; `None` if the runtime produced null
    fn new_object(
        &self,
        class: RawHandle,
        constructor: MethodId,
        args: &[Value],
    ) -> NativeResult<Option<RawHandle>>;

    /// Invoke an instance method; object results come back as new locals
    fn call_method(
        &self,
        object: RawHandle,
        method: MethodId,
        ret: &TypeDescriptor,
        args: &[Value],
    ) -> NativeResult<Value>;

    /// Read an instance field
    fn get_field(&self, object: RawHandle, field: FieldId, ty: &TypeDescriptor)
        -> NativeResult<Value>;

    /// Write an instance field
    fn set_field(&self, object: RawHandle, field: FieldId, value: &Value) -> NativeResult<()>;

    /// Allocate a rank-1 primitive array
    fn new_primitive_array(&self, kind: PrimitiveKind, len: usize) -> NativeResult<RawHandle>;

    /// Allocate an object array over `element_class`, every slot set to `init`
    fn new_object_array(
        &self,
        element_class: RawHandle,
        len: usize,
        init: Option<RawHandle>,
    ) -> NativeResult<RawHandle>;

    /// Length of an array
    fn array_length(&self, array: RawHandle) -> NativeResult<usize>;

    /// Mint a new local reference to the same object
    fn new_local_ref(&self, handle: RawHandle) -> NativeResult<RawHandle>;

    /// Mint a new global reference to the same object
    fn new_global_ref(&self, handle: RawHandle) -> NativeResult<RawHandle>;

    /// Delete a local reference
    fn delete_local_ref(&self, handle: RawHandle);

    /// Delete a global reference
    fn delete_global_ref(&self, handle: RawHandle);

    /// Turn a local reference into a global one; the local is gone afterwards
    fn promote(&self, local: RawHandle) -> NativeResult<RawHandle>;
}

/// Process-level operations on the managed runtime
pub trait NativeVm: Send + Sync {
    /// Whether the calling thread already has an execution context
    fn current_thread_attached(&self) -> bool;

    /// Attach the calling thread, optionally naming it
    fn attach_current_thread(&self, name: Option<&str>) -> NativeResult<()>;

    /// Detach the calling thread
    fn detach_current_thread(&self) -> NativeResult<()>;
}
