//! vmbind schema layer
//!
//! Declares the classes native code binds against and derives everything a
//! call site needs before touching the managed runtime:
//! - Type descriptors with rank/strip utilities
//! - Wire descriptor and method signature rendering
//! - Ordered class catalogues with stable member coordinates
//! - Overload resolution, rejected at declaration time rather than at call time

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod descriptor;
pub mod error;
pub mod registry;
pub mod resolve;
pub mod schema;
pub mod signature;

pub use descriptor::{BaseType, PrimitiveKind, TypeDescriptor, MAX_RANK, OBJECT_CLASS};
pub use error::{DescriptorError, ResolveError, SchemaError};
pub use registry::{ClassId, SchemaRegistry};
pub use resolve::{resolve_constructor, resolve_method, CallSite, OverloadResolver};
pub use schema::{
    ClassSchema, ClassSchemaBuilder, Coord, Field, Member, Method, Overload, Owner, SchemaId, Slot,
    CONSTRUCTOR_NAME,
};
pub use signature::{method_signature, render};
