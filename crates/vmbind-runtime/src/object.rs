//! Typed object and array wrappers

use crate::binding::ClassBinding;
use crate::error::{RuntimeError, RuntimeResult};
use crate::reference::Ref;
use crate::runtime::RuntimeContext;
use crate::value::{check_args, Returned, Value};
use std::sync::Arc;
use vmbind_schema::{render, BaseType, CallSite, PrimitiveKind, TypeDescriptor, MAX_RANK, OBJECT_CLASS};

/// Take ownership of what the invoke layer handed back for `member`
fn returned(
    ctx: &Arc<RuntimeContext>,
    member: &str,
    ret: &TypeDescriptor,
    value: Value,
) -> RuntimeResult<Returned> {
    if !value.fits(ret) {
        // A stray object handle is still a local we own.
        if let Value::Object(Some(raw)) = value {
            Ref::wrap(ctx, raw).release();
        }
        return Err(RuntimeError::ReturnKind {
            member: member.to_string(),
            expected: ret.to_string(),
            found: value.kind().to_string(),
        });
    }
    Ok(match value {
        Value::Void => Returned::Void,
        Value::Object(raw) => Returned::Object(raw.map(|raw| Ref::wrap(ctx, raw))),
        primitive => Returned::Primitive(primitive),
    })
}

/// A reference to an instance of a bound class
#[derive(Debug)]
pub struct Object {
    binding: Arc<ClassBinding>,
    reference: Ref,
}

impl Object {
    /// Treat `reference` as an instance of `binding`'s class
    pub fn new(binding: Arc<ClassBinding>, reference: Ref) -> Self {
        Self { binding, reference }
    }

    /// Construct a new instance through a resolved constructor
    pub fn construct(
        binding: &Arc<ClassBinding>,
        ctx: &Arc<RuntimeContext>,
        site: &CallSite,
        args: &[Value],
    ) -> RuntimeResult<Object> {
        binding.check_site(site)?;
        if !site.is_constructor() {
            return Err(RuntimeError::WrongCallKind {
                class: binding.name().to_string(),
                member: site.name().to_string(),
            });
        }
        check_args(site, args)?;

        let class = binding.class_handle(ctx)?;
        let constructor = binding.method_id(ctx, site)?;
        let raw = ctx
            .env()
            .new_object(class, constructor, args)?
            .ok_or_else(|| RuntimeError::NullConstructed {
                class: binding.name().to_string(),
            })?;
        Ok(Object {
            binding: binding.clone(),
            reference: Ref::wrap(ctx, raw),
        })
    }

    /// Class binding
    pub fn binding(&self) -> &Arc<ClassBinding> {
        &self.binding
    }

    /// Underlying reference
    pub fn reference(&self) -> &Ref {
        &self.reference
    }

    /// Give up the wrapper, keeping the reference
    pub fn into_ref(self) -> Ref {
        self.reference
    }

    /// Same instance through a global reference
    pub fn promote(self) -> RuntimeResult<Object> {
        Ok(Object {
            binding: self.binding,
            reference: self.reference.promote()?,
        })
    }

    /// Independently owned second reference to the same instance
    pub fn create_copy(&self) -> RuntimeResult<Object> {
        Ok(Object {
            binding: self.binding.clone(),
            reference: self.reference.create_copy()?,
        })
    }

    /// Call a resolved method
    ///
    /// Arguments are checked against the overload before anything is looked
    /// up, so a mismatched call makes no native call at all.
    pub fn invoke(&self, site: &CallSite, args: &[Value]) -> RuntimeResult<Returned> {
        self.binding.check_site(site)?;
        if site.is_constructor() {
            return Err(RuntimeError::WrongCallKind {
                class: self.binding.name().to_string(),
                member: site.name().to_string(),
            });
        }
        check_args(site, args)?;

        let ctx = self.reference.context();
        let method = self.binding.method_id(ctx, site)?;
        let value = ctx
            .env()
            .call_method(self.reference.raw(), method, site.ret(), args)?;
        returned(ctx, site.name(), site.ret(), value)
    }

    /// Read a declared field
    pub fn get_field(&self, name: &str) -> RuntimeResult<Returned> {
        let ctx = self.reference.context();
        let (field, ty) = self.binding.field_id(ctx, name)?;
        let value = ctx.env().get_field(self.reference.raw(), field, ty)?;
        returned(ctx, name, ty, value)
    }

    /// Write a declared field
    pub fn set_field(&self, name: &str, value: Value) -> RuntimeResult<()> {
        let ctx = self.reference.context();
        let Some((_, decl)) = self.binding.schema().field(name) else {
            return Err(RuntimeError::UnknownField {
                class: self.binding.name().to_string(),
                name: name.to_string(),
            });
        };
        if !value.fits(decl.ty()) {
            return Err(RuntimeError::ArgumentKind {
                member: name.to_string(),
                index: 0,
                expected: decl.ty().to_string(),
                found: value.kind().to_string(),
            });
        }
        let (field, _) = self.binding.field_id(ctx, name)?;
        ctx.env().set_field(self.reference.raw(), field, &value)?;
        Ok(())
    }
}

/// Name to look up when allocating an array of `element`
fn element_class_name(element: &TypeDescriptor) -> RuntimeResult<String> {
    if element.is_array() {
        return Ok(render(element));
    }
    match element.base() {
        BaseType::Class(name) => Ok(name.to_string()),
        BaseType::AnyObject => Ok(OBJECT_CLASS.to_string()),
        BaseType::Void | BaseType::Primitive(_) => Err(RuntimeError::InvalidArrayElement {
            element: element.to_string(),
        }),
    }
}

/// A reference to an array with a known descriptor
#[derive(Debug)]
pub struct Array {
    ty: TypeDescriptor,
    reference: Ref,
}

impl Array {
    /// Allocate a rank-1 primitive array
    pub fn new_primitive(
        ctx: &Arc<RuntimeContext>,
        kind: PrimitiveKind,
        len: usize,
    ) -> RuntimeResult<Array> {
        ctx.ensure_live()?;
        let raw = ctx.env().new_primitive_array(kind, len)?;
        Ok(Array {
            ty: TypeDescriptor::array(kind.into(), 1),
            reference: Ref::wrap(ctx, raw),
        })
    }

    /// Allocate an array of objects, every slot set to `init`
    ///
    /// `element` may itself be an array type, giving a higher-rank array
    /// whose slots start out as `init` (usually null).
    pub fn new_object(
        ctx: &Arc<RuntimeContext>,
        element: &TypeDescriptor,
        len: usize,
        init: Option<&Ref>,
    ) -> RuntimeResult<Array> {
        if element.rank() >= MAX_RANK {
            return Err(RuntimeError::InvalidArrayElement {
                element: element.to_string(),
            });
        }
        let name = element_class_name(element)?;
        ctx.ensure_live()?;
        let env = ctx.env();
        let class = Ref::wrap(ctx, env.find_class(&name)?);
        let raw = env.new_object_array(class.raw(), len, init.map(Ref::raw))?;
        Ok(Array {
            ty: TypeDescriptor::array(element.clone(), 1),
            reference: Ref::wrap(ctx, raw),
        })
    }

    /// View a reference as an array of type `ty`
    pub fn from_ref(ty: TypeDescriptor, reference: Ref) -> RuntimeResult<Array> {
        if !ty.is_array() {
            return Err(RuntimeError::InvalidArrayElement {
                element: ty.to_string(),
            });
        }
        Ok(Array { ty, reference })
    }

    /// Array descriptor
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.ty
    }

    /// Array rank
    pub fn rank(&self) -> u32 {
        self.ty.rank()
    }

    /// Element descriptor, one rank lower
    pub fn element(&self) -> TypeDescriptor {
        TypeDescriptor::array(self.ty.full_strip(), self.ty.rank() - 1)
    }

    /// Number of elements
    pub fn len(&self) -> RuntimeResult<usize> {
        Ok(self.reference.context().env().array_length(self.reference.raw())?)
    }

    /// Underlying reference
    pub fn reference(&self) -> &Ref {
        &self.reference
    }

    /// Give up the wrapper, keeping the reference
    pub fn into_ref(self) -> Ref {
        self.reference
    }

    /// Same array through a global reference
    pub fn promote(self) -> RuntimeResult<Array> {
        Ok(Array {
            ty: self.ty,
            reference: self.reference.promote()?,
        })
    }

    /// Independently owned second reference to the same array
    pub fn create_copy(&self) -> RuntimeResult<Array> {
        Ok(Array {
            ty: self.ty.clone(),
            reference: self.reference.create_copy()?,
        })
    }
}
