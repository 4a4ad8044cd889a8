//! Typed call values

use crate::env::RawHandle;
use crate::error::{RuntimeError, RuntimeResult};
use crate::reference::Ref;
use std::fmt;
use vmbind_schema::{BaseType, CallSite, PrimitiveKind, TypeDescriptor};

/// A value crossing the native boundary
///
/// Object values borrow a handle; they never own it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// No value
    Void,
    /// `Z`
    Boolean(bool),
    /// `B`
    Byte(i8),
    /// `C`, a UTF-16 code unit
    Char(u16),
    /// `S`
    Short(i16),
    /// `I`
    Int(i32),
    /// `J`
    Long(i64),
    /// `F`
    Float(f32),
    /// `D`
    Double(f64),
    /// An object handle or null
    Object(Option<RawHandle>),
}

/// Shape of a [`Value`], used to check arguments against declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// No value
    Void,
    /// A primitive of the given kind
    Primitive(PrimitiveKind),
    /// Any object handle, including null
    Object,
}

impl ValueKind {
    /// Kind a declared type travels as
    pub fn of(ty: &TypeDescriptor) -> Self {
        match (ty.base(), ty.rank()) {
            (BaseType::Void, 0) => ValueKind::Void,
            (BaseType::Primitive(kind), 0) => ValueKind::Primitive(*kind),
            _ => ValueKind::Object,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Void => write!(f, "void"),
            ValueKind::Primitive(kind) => write!(f, "{}", kind.name()),
            ValueKind::Object => write!(f, "object"),
        }
    }
}

impl Value {
    /// The null object
    pub const NULL: Value = Value::Object(None);

    /// Shape of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Void => ValueKind::Void,
            Value::Boolean(_) => ValueKind::Primitive(PrimitiveKind::Boolean),
            Value::Byte(_) => ValueKind::Primitive(PrimitiveKind::Byte),
            Value::Char(_) => ValueKind::Primitive(PrimitiveKind::Char),
            Value::Short(_) => ValueKind::Primitive(PrimitiveKind::Short),
            Value::Int(_) => ValueKind::Primitive(PrimitiveKind::Int),
            Value::Long(_) => ValueKind::Primitive(PrimitiveKind::Long),
            Value::Float(_) => ValueKind::Primitive(PrimitiveKind::Float),
            Value::Double(_) => ValueKind::Primitive(PrimitiveKind::Double),
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Whether this value may be passed where `ty` is declared
    pub fn fits(&self, ty: &TypeDescriptor) -> bool {
        self.kind() == ValueKind::of(ty)
    }

    /// Zero value of a declared type
    pub fn zero(ty: &TypeDescriptor) -> Value {
        match ValueKind::of(ty) {
            ValueKind::Void => Value::Void,
            ValueKind::Object => Value::NULL,
            ValueKind::Primitive(kind) => match kind {
                PrimitiveKind::Boolean => Value::Boolean(false),
                PrimitiveKind::Byte => Value::Byte(0),
                PrimitiveKind::Char => Value::Char(0),
                PrimitiveKind::Short => Value::Short(0),
                PrimitiveKind::Int => Value::Int(0),
                PrimitiveKind::Long => Value::Long(0),
                PrimitiveKind::Float => Value::Float(0.0),
                PrimitiveKind::Double => Value::Double(0.0),
            },
        }
    }

    /// Try to get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as int
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as long
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as double
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Try to get as an object handle; `Some(None)` is null
    pub fn as_object(&self) -> Option<Option<RawHandle>> {
        match self {
            Value::Object(h) => Some(*h),
            _ => None,
        }
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_primitive! {
    bool => Boolean,
    i8 => Byte,
    u16 => Char,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
}

impl From<&Ref> for Value {
    fn from(r: &Ref) -> Self {
        Value::Object(Some(r.raw()))
    }
}

impl From<Option<&Ref>> for Value {
    fn from(r: Option<&Ref>) -> Self {
        Value::Object(r.map(Ref::raw))
    }
}

/// What a call or field read produced
#[derive(Debug)]
pub enum Returned {
    /// The member returns void
    Void,
    /// A primitive result
    Primitive(Value),
    /// An owned local reference, or null
    Object(Option<Ref>),
}

impl Returned {
    /// Primitive payload, if any
    pub fn primitive(&self) -> Option<Value> {
        match self {
            Returned::Primitive(v) => Some(*v),
            _ => None,
        }
    }

    /// Take the object result
    pub fn into_object(self) -> Option<Ref> {
        match self {
            Returned::Object(r) => r,
            _ => None,
        }
    }
}

/// Check `args` against the overload a call site selected
pub(crate) fn check_args(site: &CallSite, args: &[Value]) -> RuntimeResult<()> {
    if site.params().len() != args.len() {
        return Err(RuntimeError::ArgumentCount {
            member: site.name().to_string(),
            expected: site.params().len(),
            found: args.len(),
        });
    }
    for (index, (param, arg)) in site.params().iter().zip(args).enumerate() {
        if !arg.fits(param) {
            return Err(RuntimeError::ArgumentKind {
                member: site.name().to_string(),
                index,
                expected: param.to_string(),
                found: arg.kind().to_string(),
            });
        }
    }
    Ok(())
}
