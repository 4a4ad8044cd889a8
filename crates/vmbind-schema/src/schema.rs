//! Class schemas and member coordinates
//!
//! A [`ClassSchema`] is the full, ordered catalogue of a class: constructor
//! overloads, named method overload-sets and named fields. It is fixed once
//! [`ClassSchemaBuilder::build`] returns. Declaration order assigns every
//! member a [`Coord`], a pure reference into the schema that carries no
//! runtime storage.

use crate::descriptor::{is_valid_binary_name, BaseType, TypeDescriptor, MAX_RANK};
use crate::error::{SchemaError, SchemaResult};
use crate::signature::{method_signature, render};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Member name the runtime uses for constructors
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Identity of one built schema
///
/// Every call to [`ClassSchemaBuilder::build`] mints a fresh id, so two
/// schemas never share coordinates even when their content is identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaId(u64);

impl SchemaId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        SchemaId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// One call shape: ordered parameters and a return type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Overload {
    params: Vec<TypeDescriptor>,
    ret: TypeDescriptor,
    signature: Arc<str>,
}

impl Overload {
    /// Create an overload; its method descriptor is rendered immediately
    pub fn new(ret: TypeDescriptor, params: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        let params: Vec<TypeDescriptor> = params.into_iter().collect();
        let signature = method_signature(&params, &ret).into();
        Self {
            params,
            ret,
            signature,
        }
    }

    /// Parameter descriptors in declaration order
    pub fn params(&self) -> &[TypeDescriptor] {
        &self.params
    }

    /// Return descriptor
    pub fn ret(&self) -> &TypeDescriptor {
        &self.ret
    }

    /// Method descriptor, e.g. `(SD)F`
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub(crate) fn shared_signature(&self) -> Arc<str> {
        self.signature.clone()
    }
}

/// A named overload-set
#[derive(Debug, Clone)]
pub struct Method {
    name: Arc<str>,
    overloads: Vec<Overload>,
}

impl Method {
    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Overloads in declaration order
    pub fn overloads(&self) -> &[Overload] {
        &self.overloads
    }
}

/// A named field
#[derive(Debug, Clone)]
pub struct Field {
    name: Arc<str>,
    ty: TypeDescriptor,
}

impl Field {
    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field type
    pub fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }
}

/// Which overload-set a parameter coordinate refers into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    /// The constructor set
    Constructor,
    /// The method at this index
    Method(usize),
}

/// A position within one overload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The return type
    Return,
    /// The parameter at this index
    Param(usize),
}

/// The kind-specific part of a coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Member {
    /// The class itself
    Class,
    /// A constructor overload
    Constructor {
        /// Overload index
        overload: usize,
    },
    /// A method overload
    Method {
        /// Method index
        method: usize,
        /// Overload index
        overload: usize,
    },
    /// A parameter or return slot of an overload
    Param {
        /// Overload-set
        owner: Owner,
        /// Overload index
        overload: usize,
        /// Position
        slot: Slot,
    },
    /// A field
    Field {
        /// Field index
        field: usize,
    },
}

/// A stable coordinate into one [`ClassSchema`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    schema: SchemaId,
    member: Member,
}

impl Coord {
    /// Schema this coordinate was minted by
    pub fn schema(&self) -> SchemaId {
        self.schema
    }

    /// Kind and indices
    pub fn member(&self) -> Member {
        self.member
    }

    /// Same overload-set position, re-targeted at one parameter or the return
    pub fn slot(&self, slot: Slot) -> Option<Coord> {
        let (owner, overload) = match self.member {
            Member::Constructor { overload } => (Owner::Constructor, overload),
            Member::Method { method, overload } => (Owner::Method(method), overload),
            _ => return None,
        };
        Some(Coord {
            schema: self.schema,
            member: Member::Param {
                owner,
                overload,
                slot,
            },
        })
    }
}

/// The immutable catalogue of one class
#[derive(Debug)]
pub struct ClassSchema {
    id: SchemaId,
    name: Arc<str>,
    constructors: Vec<Overload>,
    methods: Vec<Method>,
    fields: Vec<Field>,
    method_index: FxHashMap<Arc<str>, usize>,
    field_index: FxHashMap<Arc<str>, usize>,
}

impl ClassSchema {
    /// Start declaring a class by binary name
    pub fn builder(name: impl Into<Arc<str>>) -> ClassSchemaBuilder {
        ClassSchemaBuilder {
            name: name.into(),
            constructors: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Unique schema id
    pub fn id(&self) -> SchemaId {
        self.id
    }

    /// Binary class name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        self.name.clone()
    }

    /// Descriptor of the class itself
    pub fn descriptor(&self) -> TypeDescriptor {
        TypeDescriptor::class(self.name.clone())
    }

    /// Constructor overloads in declaration order
    ///
    /// A class declared without constructors still has the implicit `()V`.
    pub fn constructors(&self) -> &[Overload] {
        &self.constructors
    }

    /// Methods in declaration order
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a method by name
    pub fn method(&self, name: &str) -> Option<(usize, &Method)> {
        let idx = *self.method_index.get(name)?;
        Some((idx, &self.methods[idx]))
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<(usize, &Field)> {
        let idx = *self.field_index.get(name)?;
        Some((idx, &self.fields[idx]))
    }

    fn coord(&self, member: Member) -> Coord {
        Coord {
            schema: self.id,
            member,
        }
    }

    /// Coordinate of the class itself
    pub fn class_coord(&self) -> Coord {
        self.coord(Member::Class)
    }

    /// Coordinate of a constructor overload
    pub fn constructor_coord(&self, overload: usize) -> Option<Coord> {
        (overload < self.constructors.len()).then(|| self.coord(Member::Constructor { overload }))
    }

    /// Coordinate of a method overload by name and overload index
    pub fn method_coord(&self, name: &str, overload: usize) -> Option<Coord> {
        let (method, decl) = self.method(name)?;
        (overload < decl.overloads.len()).then(|| self.coord(Member::Method { method, overload }))
    }

    /// Coordinate of a field by name
    pub fn field_coord(&self, name: &str) -> Option<Coord> {
        let (field, _) = self.field(name)?;
        Some(self.coord(Member::Field { field }))
    }

    fn check_owner(&self, coord: &Coord) -> SchemaResult<()> {
        if coord.schema != self.id {
            return Err(SchemaError::ForeignCoordinate {
                class: self.name.to_string(),
            });
        }
        Ok(())
    }

    fn out_of_range(&self) -> SchemaError {
        SchemaError::CoordinateOutOfRange {
            class: self.name.to_string(),
        }
    }

    fn overload_in(&self, owner: Owner, overload: usize) -> SchemaResult<&Overload> {
        let set = match owner {
            Owner::Constructor => &self.constructors,
            Owner::Method(method) => {
                &self
                    .methods
                    .get(method)
                    .ok_or_else(|| self.out_of_range())?
                    .overloads
            }
        };
        set.get(overload).ok_or_else(|| self.out_of_range())
    }

    /// The overload a constructor or method coordinate points at
    pub fn overload_at(&self, coord: &Coord) -> SchemaResult<&Overload> {
        self.check_owner(coord)?;
        match coord.member {
            Member::Constructor { overload } => self.overload_in(Owner::Constructor, overload),
            Member::Method { method, overload } => self.overload_in(Owner::Method(method), overload),
            _ => Err(self.out_of_range()),
        }
    }

    /// Member name a coordinate is looked up under at runtime
    pub fn member_name(&self, coord: &Coord) -> SchemaResult<&str> {
        self.check_owner(coord)?;
        match coord.member {
            Member::Class => Ok(&self.name),
            Member::Constructor { .. } | Member::Param { owner: Owner::Constructor, .. } => {
                Ok(CONSTRUCTOR_NAME)
            }
            Member::Method { method, .. }
            | Member::Param {
                owner: Owner::Method(method),
                ..
            } => self
                .methods
                .get(method)
                .map(|m| m.name())
                .ok_or_else(|| self.out_of_range()),
            Member::Field { field } => self
                .fields
                .get(field)
                .map(|f| f.name())
                .ok_or_else(|| self.out_of_range()),
        }
    }

    /// Type at a self, parameter, or field coordinate
    ///
    /// Overload coordinates describe a call shape rather than a type and
    /// are rejected; use [`overload_at`](Self::overload_at) for those.
    pub fn descriptor_of(&self, coord: &Coord) -> SchemaResult<TypeDescriptor> {
        self.check_owner(coord)?;
        match coord.member {
            Member::Class => Ok(self.descriptor()),
            Member::Param {
                owner,
                overload,
                slot,
            } => {
                let decl = self.overload_in(owner, overload)?;
                match slot {
                    Slot::Return => Ok(decl.ret().clone()),
                    Slot::Param(idx) => decl
                        .params()
                        .get(idx)
                        .cloned()
                        .ok_or_else(|| self.out_of_range()),
                }
            }
            Member::Field { field } => self
                .fields
                .get(field)
                .map(|f| f.ty().clone())
                .ok_or_else(|| self.out_of_range()),
            Member::Constructor { .. } | Member::Method { .. } => Err(self.out_of_range()),
        }
    }

    /// Wire descriptor for any coordinate
    ///
    /// Self and field coordinates render their type, overload coordinates
    /// their method descriptor, and parameter coordinates the descriptor of
    /// that parameter or of the return.
    pub fn signature_of(&self, coord: &Coord) -> SchemaResult<String> {
        self.check_owner(coord)?;
        match coord.member {
            Member::Class => Ok(render(&self.descriptor())),
            Member::Constructor { .. } | Member::Method { .. } => {
                Ok(self.overload_at(coord)?.signature().to_string())
            }
            Member::Param {
                owner,
                overload,
                slot,
            } => {
                let decl = self.overload_in(owner, overload)?;
                match slot {
                    Slot::Return => Ok(render(decl.ret())),
                    Slot::Param(idx) => decl
                        .params()
                        .get(idx)
                        .map(render)
                        .ok_or_else(|| self.out_of_range()),
                }
            }
            Member::Field { field } => self
                .fields
                .get(field)
                .map(|f| render(f.ty()))
                .ok_or_else(|| self.out_of_range()),
        }
    }
}

/// Collects a class declaration; validated as a whole by [`build`](Self::build)
#[derive(Debug, Clone)]
pub struct ClassSchemaBuilder {
    name: Arc<str>,
    constructors: Vec<Overload>,
    methods: Vec<(Arc<str>, Vec<Overload>)>,
    fields: Vec<(Arc<str>, TypeDescriptor)>,
}

impl ClassSchemaBuilder {
    /// Declare a constructor overload
    pub fn constructor(mut self, params: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        self.constructors
            .push(Overload::new(TypeDescriptor::void(), params));
        self
    }

    /// Declare a method with a single overload
    pub fn method(
        self,
        name: impl Into<Arc<str>>,
        ret: TypeDescriptor,
        params: impl IntoIterator<Item = TypeDescriptor>,
    ) -> Self {
        self.overloaded(name, [Overload::new(ret, params)])
    }

    /// Declare a method with an ordered overload-set
    pub fn overloaded(
        mut self,
        name: impl Into<Arc<str>>,
        overloads: impl IntoIterator<Item = Overload>,
    ) -> Self {
        self.methods
            .push((name.into(), overloads.into_iter().collect()));
        self
    }

    /// Declare a field
    pub fn field(mut self, name: impl Into<Arc<str>>, ty: TypeDescriptor) -> Self {
        self.fields.push((name.into(), ty));
        self
    }

    /// Validate and freeze the declaration
    pub fn build(self) -> SchemaResult<ClassSchema> {
        let class = self.name.to_string();
        if !is_valid_binary_name(&self.name) {
            return Err(SchemaError::InvalidClassName { name: class });
        }

        let constructors = if self.constructors.is_empty() {
            vec![Overload::new(TypeDescriptor::void(), [])]
        } else {
            self.constructors
        };
        validate_set(&class, CONSTRUCTOR_NAME, &constructors)?;

        let mut method_index = FxHashMap::default();
        let mut methods = Vec::with_capacity(self.methods.len());
        for (name, overloads) in self.methods {
            if method_index.insert(name.clone(), methods.len()).is_some() {
                return Err(SchemaError::DuplicateMethod {
                    class,
                    name: name.to_string(),
                });
            }
            validate_set(&class, &name, &overloads)?;
            methods.push(Method { name, overloads });
        }

        let mut field_index = FxHashMap::default();
        let mut fields = Vec::with_capacity(self.fields.len());
        for (name, ty) in self.fields {
            if field_index.insert(name.clone(), fields.len()).is_some() {
                return Err(SchemaError::DuplicateField {
                    class,
                    name: name.to_string(),
                });
            }
            if ty.is_void() {
                return Err(SchemaError::VoidField {
                    class,
                    name: name.to_string(),
                });
            }
            validate_type(&class, &ty)?;
            fields.push(Field { name, ty });
        }

        let schema = ClassSchema {
            id: SchemaId::next(),
            name: self.name,
            constructors,
            methods,
            fields,
            method_index,
            field_index,
        };
        tracing::debug!(
            class = %schema.name,
            id = schema.id.as_u64(),
            constructors = schema.constructors.len(),
            methods = schema.methods.len(),
            fields = schema.fields.len(),
            "declared class schema"
        );
        Ok(schema)
    }
}

fn validate_type(class: &str, ty: &TypeDescriptor) -> SchemaResult<()> {
    if ty.rank() > MAX_RANK {
        return Err(SchemaError::RankTooDeep {
            class: class.to_string(),
            rank: ty.rank(),
        });
    }
    match ty.base() {
        BaseType::Void if ty.is_array() => Err(SchemaError::VoidArray {
            class: class.to_string(),
        }),
        BaseType::Class(name) if !is_valid_binary_name(name) => {
            Err(SchemaError::InvalidClassName {
                name: name.to_string(),
            })
        }
        _ => Ok(()),
    }
}

fn validate_set(class: &str, member: &str, overloads: &[Overload]) -> SchemaResult<()> {
    for (i, overload) in overloads.iter().enumerate() {
        for (index, param) in overload.params().iter().enumerate() {
            if param.is_void() {
                return Err(SchemaError::VoidParameter {
                    class: class.to_string(),
                    member: member.to_string(),
                    index,
                });
            }
            validate_type(class, param)?;
        }
        validate_type(class, overload.ret())?;

        if overloads[..i].iter().any(|prior| prior.params() == overload.params()) {
            return Err(SchemaError::DuplicateOverload {
                class: class.to_string(),
                member: member.to_string(),
                signature: overload.signature().to_string(),
            });
        }
    }
    Ok(())
}
