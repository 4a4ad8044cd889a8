//! vmbind runtime layer
//!
//! Manages what native code holds on the managed side of the boundary:
//! - [`Ref`]: owned local and global references with promotion and copy
//! - [`ClassBinding`]: class handles and method/field identifiers, looked
//!   up once per runtime instance behind a double-checked lock
//! - [`ThreadGuard`]: attaches native threads and detaches them at thread
//!   teardown
//! - [`Runtime`]: one managed runtime instance, whose teardown invalidates
//!   every default-loader binding
//!
//! The managed runtime itself is reached only through [`NativeEnv`] and
//! [`NativeVm`].

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod binding;
pub mod cache;
pub mod env;
pub mod error;
pub mod object;
pub mod options;
pub mod reference;
pub mod runtime;
pub mod thread;
pub mod value;

pub use binding::{ClassBinding, LoaderKind};
pub use cache::{CachedWord, DoubleLocked};
pub use env::{FieldId, MethodId, NativeEnv, NativeVm, RawHandle};
pub use error::{NativeError, NativeResult, RuntimeError, RuntimeResult};
pub use object::{Array, Object};
pub use options::RuntimeOptions;
pub use reference::{Ref, Tier};
pub use runtime::{Runtime, RuntimeContext, RuntimeId};
pub use thread::ThreadGuard;
pub use value::{Returned, Value, ValueKind};

pub use vmbind_schema;
