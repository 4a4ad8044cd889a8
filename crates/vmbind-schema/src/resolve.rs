//! Overload resolution
//!
//! Picks the overload a call site means from the descriptors of its
//! arguments. Primitives and class types must match exactly. An array
//! parameter declared over the unconstrained object type also accepts an
//! array of any named class, provided the ranks agree. When several overloads
//! match, the one needing the fewest such widenings wins; a tie is rejected.

use crate::descriptor::{BaseType, TypeDescriptor};
use crate::error::{ResolveError, ResolveResult};
use crate::schema::{ClassSchema, Coord, Member, Overload, SchemaId, CONSTRUCTOR_NAME};
use crate::signature::render_list;
use dashmap::DashMap;
use std::sync::Arc;

/// How one argument fits one parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fit {
    Exact,
    Widened,
    Rejected,
}

fn fit(param: &TypeDescriptor, arg: &TypeDescriptor) -> Fit {
    if param == arg {
        return Fit::Exact;
    }
    let widens = param.is_array()
        && param.rank() == arg.rank()
        && *param.base() == BaseType::AnyObject
        && matches!(arg.base(), BaseType::Class(_));
    if widens {
        Fit::Widened
    } else {
        Fit::Rejected
    }
}

/// Number of widenings `overload` needs for `args`, or `None` if it rejects
fn cost(overload: &Overload, args: &[TypeDescriptor]) -> Option<usize> {
    if overload.params().len() != args.len() {
        return None;
    }
    let mut widened = 0;
    for (param, arg) in overload.params().iter().zip(args) {
        match fit(param, arg) {
            Fit::Exact => {}
            Fit::Widened => widened += 1,
            Fit::Rejected => return None,
        }
    }
    Some(widened)
}

/// A resolved call site
///
/// Everything the runtime needs to look up and invoke the member: the
/// coordinate (for id caching), the wire name and descriptor, and the
/// declared parameter and return types (for argument checking).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    coord: Coord,
    class: Arc<str>,
    name: Arc<str>,
    overload: Overload,
    signature: Arc<str>,
}

impl CallSite {
    /// Coordinate of the selected overload
    pub fn coord(&self) -> Coord {
        self.coord
    }

    /// Schema the call site was resolved against
    pub fn schema(&self) -> SchemaId {
        self.coord.schema()
    }

    /// Declaring class binary name
    pub fn class_name(&self) -> &str {
        &self.class
    }

    /// Member name, `<init>` for constructors
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this call site constructs an object
    pub fn is_constructor(&self) -> bool {
        matches!(self.coord.member(), Member::Constructor { .. })
    }

    /// Declared parameter types
    pub fn params(&self) -> &[TypeDescriptor] {
        self.overload.params()
    }

    /// Declared return type
    pub fn ret(&self) -> &TypeDescriptor {
        self.overload.ret()
    }

    /// Method descriptor handed to the runtime lookup
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

fn select(
    schema: &ClassSchema,
    member: &str,
    overloads: &[Overload],
    args: &[TypeDescriptor],
) -> ResolveResult<usize> {
    let scored: Vec<(usize, usize)> = overloads
        .iter()
        .enumerate()
        .filter_map(|(i, overload)| cost(overload, args).map(|c| (i, c)))
        .collect();

    let Some(best) = scored.iter().map(|(_, c)| *c).min() else {
        return Err(ResolveError::NoMatchingOverload {
            class: schema.name().to_string(),
            member: member.to_string(),
            arguments: render_list(args),
        });
    };

    let winners: Vec<usize> = scored
        .iter()
        .filter(|(_, c)| *c == best)
        .map(|(i, _)| *i)
        .collect();
    match winners.as_slice() {
        [only] => Ok(*only),
        _ => Err(ResolveError::AmbiguousOverload {
            class: schema.name().to_string(),
            member: member.to_string(),
            arguments: render_list(args),
            candidates: winners
                .iter()
                .map(|i| overloads[*i].signature().to_string())
                .collect(),
        }),
    }
}

/// Resolve a method call by name and argument descriptors
pub fn resolve_method(
    schema: &ClassSchema,
    name: &str,
    args: &[TypeDescriptor],
) -> ResolveResult<CallSite> {
    let Some((method_idx, method)) = schema.method(name) else {
        return Err(ResolveError::UnknownMethod {
            class: schema.name().to_string(),
            name: name.to_string(),
        });
    };
    let overload = select(schema, name, method.overloads(), args)?;
    let decl = &method.overloads()[overload];
    let coord = schema
        .method_coord(name, overload)
        .ok_or_else(|| ResolveError::UnknownMethod {
            class: schema.name().to_string(),
            name: name.to_string(),
        })?;
    debug_assert_eq!(
        coord.member(),
        Member::Method {
            method: method_idx,
            overload
        }
    );
    tracing::trace!(class = schema.name(), name, signature = decl.signature(), "resolved method");
    Ok(CallSite {
        coord,
        class: schema.shared_name(),
        name: method.name().into(),
        signature: decl.shared_signature(),
        overload: decl.clone(),
    })
}

/// Resolve a constructor call by argument descriptors
pub fn resolve_constructor(schema: &ClassSchema, args: &[TypeDescriptor]) -> ResolveResult<CallSite> {
    let overload = select(schema, CONSTRUCTOR_NAME, schema.constructors(), args)?;
    let decl = &schema.constructors()[overload];
    let coord = schema
        .constructor_coord(overload)
        .ok_or_else(|| ResolveError::NoMatchingOverload {
            class: schema.name().to_string(),
            member: CONSTRUCTOR_NAME.to_string(),
            arguments: render_list(args),
        })?;
    tracing::trace!(class = schema.name(), signature = decl.signature(), "resolved constructor");
    Ok(CallSite {
        coord,
        class: schema.shared_name(),
        name: CONSTRUCTOR_NAME.into(),
        signature: decl.shared_signature(),
        overload: decl.clone(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResolutionKey {
    member: Option<Arc<str>>,
    args: Vec<TypeDescriptor>,
}

/// Memoizing resolver for one schema
///
/// Each distinct `(member, argument descriptors)` shape is resolved once;
/// later requests, including rejected ones, are answered from the table.
#[derive(Debug)]
pub struct OverloadResolver {
    schema: Arc<ClassSchema>,
    decisions: DashMap<ResolutionKey, ResolveResult<Arc<CallSite>>>,
}

impl OverloadResolver {
    /// Create a resolver over `schema`
    pub fn new(schema: Arc<ClassSchema>) -> Self {
        Self {
            schema,
            decisions: DashMap::new(),
        }
    }

    /// Schema being resolved against
    pub fn schema(&self) -> &Arc<ClassSchema> {
        &self.schema
    }

    fn decide(
        &self,
        key: ResolutionKey,
        resolve: impl FnOnce(&ClassSchema, &[TypeDescriptor]) -> ResolveResult<CallSite>,
    ) -> ResolveResult<Arc<CallSite>> {
        if let Some(decision) = self.decisions.get(&key) {
            return decision.clone();
        }
        let decision = resolve(&self.schema, &key.args).map(Arc::new);
        self.decisions
            .entry(key)
            .or_insert(decision)
            .value()
            .clone()
    }

    /// Resolve a method call
    pub fn method(&self, name: &str, args: &[TypeDescriptor]) -> ResolveResult<Arc<CallSite>> {
        let key = ResolutionKey {
            member: Some(name.into()),
            args: args.to_vec(),
        };
        self.decide(key, |schema, args| resolve_method(schema, name, args))
    }

    /// Resolve a constructor call
    pub fn constructor(&self, args: &[TypeDescriptor]) -> ResolveResult<Arc<CallSite>> {
        let key = ResolutionKey {
            member: None,
            args: args.to_vec(),
        };
        self.decide(key, resolve_constructor)
    }

    /// Number of distinct call shapes decided so far
    pub fn decided(&self) -> usize {
        self.decisions.len()
    }
}
