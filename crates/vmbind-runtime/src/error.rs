//! Runtime error types

use thiserror::Error;
use vmbind_schema::{ResolveError, SchemaError};

/// Result type for native boundary operations
pub type NativeResult<T> = Result<T, NativeError>;

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Failures reported by the native invoke layer
///
/// Each one ends the operation that raised it. Nothing in this crate retries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NativeError {
    /// Class lookup failed
    #[error("Class not found: {name}")]
    ClassNotFound {
        /// Binary name or array descriptor looked up
        name: String,
    },

    /// Method lookup failed
    #[error("No such method: {class}.{name}{signature}")]
    NoSuchMethod {
        /// Declaring class
        class: String,
        /// Method name
        name: String,
        /// Method descriptor
        signature: String,
    },

    /// Field lookup failed
    #[error("No such field: {class}.{name} ({signature})")]
    NoSuchField {
        /// Declaring class
        class: String,
        /// Field name
        name: String,
        /// Field descriptor
        signature: String,
    },

    /// Attaching the calling thread failed
    #[error("Failed to attach thread: {reason}")]
    AttachFailed {
        /// Reason reported by the runtime
        reason: String,
    },

    /// Detaching the calling thread failed
    #[error("Failed to detach thread: {reason}")]
    DetachFailed {
        /// Reason reported by the runtime
        reason: String,
    },

    /// The managed side raised an exception during the call
    #[error("Pending exception: {message}")]
    PendingException {
        /// Exception description
        message: String,
    },

    /// The managed side could not allocate
    #[error("Out of memory allocating {what}")]
    OutOfMemory {
        /// What was being allocated
        what: String,
    },
}

/// Errors surfaced by the runtime layer
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuntimeError {
    /// Native invoke layer failure
    #[error(transparent)]
    Native(#[from] NativeError),

    /// Call site could not be resolved
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Schema declaration or coordinate error
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Wrong number of arguments for the resolved overload
    #[error("{member} expects {expected} arguments, got {found}")]
    ArgumentCount {
        /// Member being called
        member: String,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        found: usize,
    },

    /// Argument value does not fit the declared parameter
    #[error("{member} argument {index}: expected {expected}, got {found}")]
    ArgumentKind {
        /// Member being called
        member: String,
        /// Argument position
        index: usize,
        /// Declared parameter descriptor
        expected: String,
        /// Kind of the supplied value
        found: String,
    },

    /// The invoke layer returned a value of the wrong kind
    #[error("{member} returned {found}, declared {expected}")]
    ReturnKind {
        /// Member called or field read
        member: String,
        /// Declared return or field descriptor
        expected: String,
        /// Kind of the value received
        found: String,
    },

    /// The runtime instance was already torn down
    #[error("Runtime {runtime} is torn down")]
    TornDown {
        /// Instance id
        runtime: u64,
    },

    /// The binding moved to another runtime while an identifier was being looked up
    #[error("Class binding {class} no longer belongs to runtime {runtime}")]
    Rebound {
        /// Class the binding declares
        class: String,
        /// Instance the lookup was made for
        runtime: u64,
    },

    /// Call site was resolved against another class
    #[error("Call site for {site_class} used on {class}")]
    ForeignCallSite {
        /// Class the binding declares
        class: String,
        /// Class the call site belongs to
        site_class: String,
    },

    /// Constructor call site used as a method, or the reverse
    #[error("{member} cannot be called this way on {class}")]
    WrongCallKind {
        /// Class the binding declares
        class: String,
        /// Member name
        member: String,
    },

    /// Field name not declared on the class
    #[error("Unknown field: {class}.{name}")]
    UnknownField {
        /// Class the binding declares
        class: String,
        /// Field name
        name: String,
    },

    /// Object construction returned no object
    #[error("Construction of {class} returned null")]
    NullConstructed {
        /// Class being constructed
        class: String,
    },

    /// Descriptor cannot be used as an array element here
    #[error("Invalid array element type: {element}")]
    InvalidArrayElement {
        /// Rendered element descriptor
        element: String,
    },
}
