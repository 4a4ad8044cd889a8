//! Descriptor and method signature rendering
//!
//! Output is the managed runtime's wire grammar:
//!
//! ```text
//! primitive  Z B C S I J F D, V for void
//! class      L<binary-name>;
//! array      one '[' per rank level, then the element
//! method     (<param descriptors>)<return descriptor>
//! ```
//!
//! Rendering is pure and deterministic, so the strings double as cache keys.

use crate::descriptor::{BaseType, TypeDescriptor, OBJECT_CLASS};
use std::fmt;

/// Append the descriptor of `ty` to `out`
pub fn render_into(ty: &TypeDescriptor, out: &mut String) {
    for _ in 0..ty.rank() {
        out.push('[');
    }
    match ty.base() {
        BaseType::Void => out.push('V'),
        BaseType::Primitive(kind) => out.push(kind.code()),
        BaseType::Class(name) => {
            out.push('L');
            out.push_str(name);
            out.push(';');
        }
        BaseType::AnyObject => {
            out.push('L');
            out.push_str(OBJECT_CLASS);
            out.push(';');
        }
    }
}

/// Render the descriptor of `ty`
pub fn render(ty: &TypeDescriptor) -> String {
    let mut out = String::new();
    render_into(ty, &mut out);
    out
}

/// Render a method descriptor from parameter and return types
pub fn method_signature(params: &[TypeDescriptor], ret: &TypeDescriptor) -> String {
    let mut out = String::from("(");
    for param in params {
        render_into(param, &mut out);
    }
    out.push(')');
    render_into(ret, &mut out);
    out
}

/// Render a comma-separated argument list, for diagnostics
pub(crate) fn render_list(types: &[TypeDescriptor]) -> String {
    types.iter().map(render).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}
