//! Type descriptors
//!
//! A [`TypeDescriptor`] is a base type (void, one of the eight primitive
//! kinds, a named class, or the unconstrained object type) plus an array
//! rank. Rank 0 means "not an array", so stripping every array level always
//! lands on a plain base descriptor and a descriptor can never be an array of
//! arrays in any other shape than a higher rank.

use crate::error::{DescriptorError, DescriptorResult};
use std::sync::Arc;

/// Binary name of the root class, used for the unconstrained object type
pub const OBJECT_CLASS: &str = "java/lang/Object";

/// Deepest array nesting the descriptor grammar permits
pub const MAX_RANK: u32 = 255;

/// Primitive value kinds of the managed runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `Z`
    Boolean,
    /// `B`
    Byte,
    /// `C`
    Char,
    /// `S`
    Short,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `F`
    Float,
    /// `D`
    Double,
}

impl PrimitiveKind {
    /// Every primitive kind, in descriptor-table order
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Char,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    /// Single-character descriptor code
    pub fn code(self) -> char {
        match self {
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Double => 'D',
        }
    }

    /// Source-level name, for diagnostics
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }
}

/// The non-array part of a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BaseType {
    /// Return-only `V`
    Void,
    /// One of the eight primitive kinds
    Primitive(PrimitiveKind),
    /// A class by binary name (`com/example/Widget`)
    Class(Arc<str>),
    /// Any object; renders as the root class
    AnyObject,
}

/// A primitive, class, or array-of-rank-N descriptor
///
/// Cloning is cheap: class names are shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    base: BaseType,
    rank: u32,
}

impl TypeDescriptor {
    const fn of(base: BaseType) -> Self {
        Self { base, rank: 0 }
    }

    /// `V`
    pub const fn void() -> Self {
        Self::of(BaseType::Void)
    }

    /// A primitive of the given kind
    pub const fn primitive(kind: PrimitiveKind) -> Self {
        Self::of(BaseType::Primitive(kind))
    }

    /// `Z`
    pub const fn boolean() -> Self {
        Self::primitive(PrimitiveKind::Boolean)
    }

    /// `B`
    pub const fn byte() -> Self {
        Self::primitive(PrimitiveKind::Byte)
    }

    /// `C`
    pub const fn char() -> Self {
        Self::primitive(PrimitiveKind::Char)
    }

    /// `S`
    pub const fn short() -> Self {
        Self::primitive(PrimitiveKind::Short)
    }

    /// `I`
    pub const fn int() -> Self {
        Self::primitive(PrimitiveKind::Int)
    }

    /// `J`
    pub const fn long() -> Self {
        Self::primitive(PrimitiveKind::Long)
    }

    /// `F`
    pub const fn float() -> Self {
        Self::primitive(PrimitiveKind::Float)
    }

    /// `D`
    pub const fn double() -> Self {
        Self::primitive(PrimitiveKind::Double)
    }

    /// A class by binary name
    ///
    /// The root class is the unconstrained object type, so naming it yields
    /// [`any_object`](Self::any_object).
    pub fn class(name: impl Into<Arc<str>>) -> Self {
        let name = name.into();
        if &*name == OBJECT_CLASS {
            return Self::any_object();
        }
        Self::of(BaseType::Class(name))
    }

    /// The unconstrained object type
    pub const fn any_object() -> Self {
        Self::of(BaseType::AnyObject)
    }

    /// Wrap `element` in `rank` more array levels
    ///
    /// Rank 0 returns the element unchanged. Wrapping an array adds to its
    /// rank rather than nesting descriptors.
    pub fn array(element: TypeDescriptor, rank: u32) -> Self {
        Self {
            rank: element.rank.saturating_add(rank),
            base: element.base,
        }
    }

    /// The base type, ignoring array levels
    pub fn base(&self) -> &BaseType {
        &self.base
    }

    /// Array nesting depth; 0 for non-arrays
    pub fn rank(&self) -> u32 {
        self.rank
    }

    /// Whether this is an array of any rank
    pub fn is_array(&self) -> bool {
        self.rank > 0
    }

    /// Whether this is exactly `V`
    pub fn is_void(&self) -> bool {
        self.rank == 0 && self.base == BaseType::Void
    }

    /// The primitive kind, when this is a non-array primitive
    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match (&self.base, self.rank) {
            (BaseType::Primitive(kind), 0) => Some(*kind),
            _ => None,
        }
    }

    /// Whether values of this type travel as object handles
    pub fn is_reference(&self) -> bool {
        self.rank > 0 || matches!(self.base, BaseType::Class(_) | BaseType::AnyObject)
    }

    /// Binary name of the base class, if the base is an object type
    pub fn class_name(&self) -> Option<&str> {
        match &self.base {
            BaseType::Class(name) => Some(name),
            BaseType::AnyObject => Some(OBJECT_CLASS),
            _ => None,
        }
    }

    /// Remove `levels` array levels
    pub fn strip(&self, levels: u32) -> DescriptorResult<TypeDescriptor> {
        if levels > self.rank {
            return Err(DescriptorError::StripTooDeep {
                rank: self.rank,
                requested: levels,
            });
        }
        Ok(Self {
            base: self.base.clone(),
            rank: self.rank - levels,
        })
    }

    /// Remove every array level, yielding the rank-0 element
    pub fn full_strip(&self) -> TypeDescriptor {
        Self::of(self.base.clone())
    }
}

impl From<PrimitiveKind> for TypeDescriptor {
    fn from(kind: PrimitiveKind) -> Self {
        TypeDescriptor::primitive(kind)
    }
}

/// Check that `name` is usable as a binary class name
pub(crate) fn is_valid_binary_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('/')
        && !name.ends_with('/')
        && !name.contains("//")
        && !name
            .chars()
            .any(|c| matches!(c, ';' | '[' | '.' | '(' | ')') || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_of_constructed_arrays() {
        assert_eq!(TypeDescriptor::int().rank(), 0);
        assert_eq!(TypeDescriptor::array(TypeDescriptor::int(), 1).rank(), 1);
        assert_eq!(TypeDescriptor::array(TypeDescriptor::int(), 4).rank(), 4);
    }

    #[test]
    fn test_array_of_array_adds_rank() {
        let inner = TypeDescriptor::array(TypeDescriptor::int(), 1);
        let outer = TypeDescriptor::array(inner.clone(), 1);
        assert_eq!(outer.rank(), 2);
        assert_eq!(outer, TypeDescriptor::array(TypeDescriptor::int(), 2));
        // Rank 0 collapses to the element.
        assert_eq!(TypeDescriptor::array(inner.clone(), 0), inner);
    }

    #[test]
    fn test_strip_reduces_rank() {
        let d = TypeDescriptor::array(TypeDescriptor::class("kClass"), 3);
        for k in 0..=d.rank() {
            assert_eq!(d.strip(k).unwrap().rank(), d.rank() - k);
        }
        let base = d.strip(d.rank()).unwrap();
        assert!(!base.is_array());
        assert_eq!(base, TypeDescriptor::class("kClass"));
        assert_eq!(d.full_strip(), base);
    }

    #[test]
    fn test_strip_too_deep() {
        let d = TypeDescriptor::array(TypeDescriptor::float(), 2);
        assert_eq!(
            d.strip(3),
            Err(DescriptorError::StripTooDeep {
                rank: 2,
                requested: 3
            })
        );
        assert!(TypeDescriptor::int().strip(1).is_err());
    }

    #[test]
    fn test_class_equality_is_by_name() {
        assert_eq!(TypeDescriptor::class("kClass"), TypeDescriptor::class("kClass"));
        assert_ne!(TypeDescriptor::class("kClass"), TypeDescriptor::class("kClass2"));
        assert_ne!(
            TypeDescriptor::array(TypeDescriptor::int(), 1),
            TypeDescriptor::array(TypeDescriptor::float(), 1)
        );
    }

    #[test]
    fn test_root_class_is_any_object() {
        let root = TypeDescriptor::class(OBJECT_CLASS);
        assert_eq!(root, TypeDescriptor::any_object());
        assert_eq!(root.base(), &BaseType::AnyObject);
        assert_eq!(
            TypeDescriptor::array(TypeDescriptor::class(OBJECT_CLASS), 2),
            TypeDescriptor::array(TypeDescriptor::any_object(), 2)
        );
    }

    #[test]
    fn test_reference_classification() {
        assert!(!TypeDescriptor::int().is_reference());
        assert!(TypeDescriptor::array(TypeDescriptor::int(), 1).is_reference());
        assert!(TypeDescriptor::class("a/B").is_reference());
        assert!(TypeDescriptor::any_object().is_reference());
        assert_eq!(TypeDescriptor::any_object().class_name(), Some(OBJECT_CLASS));
        assert_eq!(TypeDescriptor::short().as_primitive(), Some(PrimitiveKind::Short));
    }

    #[test]
    fn test_binary_names() {
        assert!(is_valid_binary_name("com/google/Class1"));
        assert!(is_valid_binary_name("kClass"));
        assert!(!is_valid_binary_name(""));
        assert!(!is_valid_binary_name("com.google.Class1"));
        assert!(!is_valid_binary_name("LFoo;"));
        assert!(!is_valid_binary_name("/leading"));
        assert!(!is_valid_binary_name("a//b"));
    }
}
