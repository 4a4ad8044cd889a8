//! Schema-time error types
//!
//! Everything in this crate fails before a native call is attempted, so these
//! errors describe declarations and call sites that are invalid, never
//! conditions of a running managed runtime.

use thiserror::Error;

/// Result type for descriptor operations
pub type DescriptorResult<T> = Result<T, DescriptorError>;

/// Result type for schema declaration and coordinate lookups
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for overload resolution
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Errors produced by descriptor utilities
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DescriptorError {
    /// Attempted to strip more array levels than the descriptor has
    #[error("Cannot strip {requested} array levels from a descriptor of rank {rank}")]
    StripTooDeep {
        /// Rank of the descriptor
        rank: u32,
        /// Levels requested
        requested: u32,
    },
}

/// Errors produced while declaring a class schema
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// Class binary names must be non-empty and free of descriptor punctuation
    #[error("Invalid binary class name: {name:?}")]
    InvalidClassName {
        /// The offending name
        name: String,
    },

    /// Two methods declared with the same name
    #[error("Duplicate method '{name}' in class {class}")]
    DuplicateMethod {
        /// Declaring class
        class: String,
        /// Method name
        name: String,
    },

    /// Two fields declared with the same name
    #[error("Duplicate field '{name}' in class {class}")]
    DuplicateField {
        /// Declaring class
        class: String,
        /// Field name
        name: String,
    },

    /// Two overloads in one set share a parameter list
    #[error("Duplicate overload {signature} for '{member}' in class {class}")]
    DuplicateOverload {
        /// Declaring class
        class: String,
        /// Method name, or `<init>` for constructors
        member: String,
        /// Descriptor of the second declaration
        signature: String,
    },

    /// Void used as a parameter type
    #[error("Parameter {index} of '{member}' in class {class} is void")]
    VoidParameter {
        /// Declaring class
        class: String,
        /// Method name, or `<init>` for constructors
        member: String,
        /// Parameter position
        index: usize,
    },

    /// Void used as a field type
    #[error("Field '{name}' in class {class} is void")]
    VoidField {
        /// Declaring class
        class: String,
        /// Field name
        name: String,
    },

    /// An array whose element is void
    #[error("Array of void in class {class}")]
    VoidArray {
        /// Declaring class
        class: String,
    },

    /// Array nesting beyond what the descriptor grammar allows
    #[error("Array rank {rank} exceeds the maximum of 255 in class {class}")]
    RankTooDeep {
        /// Declaring class
        class: String,
        /// Offending rank
        rank: u32,
    },

    /// A coordinate minted by a different schema
    #[error("Coordinate does not belong to class {class}")]
    ForeignCoordinate {
        /// Class the coordinate was presented to
        class: String,
    },

    /// A coordinate whose indices fall outside the catalogue
    #[error("Coordinate out of range for class {class}")]
    CoordinateOutOfRange {
        /// Class the coordinate was presented to
        class: String,
    },

    /// Two schemas with the same binary name in one registry
    #[error("Class {name} is already registered")]
    DuplicateClass {
        /// Binary name
        name: String,
    },
}

/// Errors produced by overload resolution
///
/// A call site that fails here is invalid: no native lookup or invocation is
/// ever attempted for it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The class declares no method with this name
    #[error("Class {class} has no method named '{name}'")]
    UnknownMethod {
        /// Class searched
        class: String,
        /// Requested method name
        name: String,
    },

    /// No overload accepts the argument shape
    #[error("No overload of '{member}' in class {class} accepts ({arguments})")]
    NoMatchingOverload {
        /// Class searched
        class: String,
        /// Method name, or `<init>` for constructors
        member: String,
        /// Rendered argument descriptors
        arguments: String,
    },

    /// Several overloads accept the argument shape equally well
    #[error("Call to '{member}' in class {class} with ({arguments}) is ambiguous between {candidates:?}")]
    AmbiguousOverload {
        /// Class searched
        class: String,
        /// Method name, or `<init>` for constructors
        member: String,
        /// Rendered argument descriptors
        arguments: String,
        /// Signatures of every matching overload
        candidates: Vec<String>,
    },
}
