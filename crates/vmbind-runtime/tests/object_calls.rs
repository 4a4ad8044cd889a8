//! Constructing objects, calling methods and allocating arrays

mod common;

use common::{fixture, EnvCounts};
use vmbind_runtime::vmbind_schema::{
    ClassSchema, Overload, PrimitiveKind, ResolveError, TypeDescriptor as T,
};
use vmbind_runtime::{Array, ClassBinding, Object, Returned, RuntimeError, Value};

fn k_class1() -> ClassSchema {
    ClassSchema::builder("com/google/Class1")
        .constructor([])
        .constructor([T::float(), T::boolean()])
        .method("m0", T::void(), [])
        .method("m2", T::class("com/google/Class2"), [T::float(), T::boolean()])
        .overloaded(
            "m3",
            [
                Overload::new(T::void(), []),
                Overload::new(T::int(), [T::boolean()]),
                Overload::new(T::float(), [T::short(), T::double()]),
            ],
        )
        .method(
            "sum",
            T::long(),
            [T::array(T::any_object(), 1)],
        )
        .build()
        .unwrap()
}

#[test]
fn test_structural_rejection_makes_no_native_call() {
    let (_vm, env, runtime) = fixture();
    let binding = ClassBinding::new(k_class1());
    let ctor = binding.resolve_constructor(&[]).unwrap();
    let obj = Object::construct(&binding, runtime.context(), &ctor, &[]).unwrap();
    let before = env.counts.native_calls();

    let err = binding.resolve_method("m3", &[T::int()]).unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Resolve(ResolveError::NoMatchingOverload { .. })
    ));

    let site = binding.resolve_method("m3", &[T::short(), T::double()]).unwrap();
    let err = obj.invoke(&site, &[Value::Short(1)]).unwrap_err();
    assert!(matches!(err, RuntimeError::ArgumentCount { expected: 2, found: 1, .. }));
    let err = obj
        .invoke(&site, &[Value::Int(1), Value::Double(2.0)])
        .unwrap_err();
    assert!(matches!(err, RuntimeError::ArgumentKind { index: 0, .. }));

    assert_eq!(env.counts.native_calls(), before);
    assert_eq!(EnvCounts::get(&env.counts.call_method), 0);
}

#[test]
fn test_invoke_returns_typed_results() {
    let (_vm, env, runtime) = fixture();
    let binding = ClassBinding::new(k_class1());
    let ctor = binding
        .resolve_constructor(&[T::float(), T::boolean()])
        .unwrap();
    let obj = Object::construct(
        &binding,
        runtime.context(),
        &ctor,
        &[Value::Float(1.5), Value::Boolean(true)],
    )
    .unwrap();
    assert!(obj.reference().is_local());

    let m0 = binding.resolve_method("m0", &[]).unwrap();
    assert!(matches!(obj.invoke(&m0, &[]).unwrap(), Returned::Void));

    let m3 = binding.resolve_method("m3", &[T::boolean()]).unwrap();
    let result = obj.invoke(&m3, &[Value::Boolean(true)]).unwrap();
    assert_eq!(result.primitive(), Some(Value::Int(0)));

    let m2 = binding
        .resolve_method("m2", &[T::float(), T::boolean()])
        .unwrap();
    let returned = obj
        .invoke(&m2, &[Value::Float(2.0), Value::Boolean(false)])
        .unwrap()
        .into_object()
        .unwrap();
    assert!(returned.is_local());
    let returned_raw = returned.raw();
    drop(returned);
    assert!(!env.is_live_local(returned_raw));

    let calls = env.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1].1, vec![Value::Boolean(true)]);
}

#[test]
fn test_widened_array_argument() {
    let (_vm, env, runtime) = fixture();
    let binding = ClassBinding::new(k_class1());
    let ctor = binding.resolve_constructor(&[]).unwrap();
    let obj = Object::construct(&binding, runtime.context(), &ctor, &[]).unwrap();

    let element = T::class("com/google/Item");
    let items = Array::new_object(runtime.context(), &element, 3, None).unwrap();
    assert_eq!(items.descriptor(), &T::array(element.clone(), 1));
    assert_eq!(items.len().unwrap(), 3);

    let site = binding
        .resolve_method("sum", &[items.descriptor().clone()])
        .unwrap();
    assert_eq!(site.signature(), "([Ljava/lang/Object;)J");
    let result = obj.invoke(&site, &[items.reference().into()]).unwrap();
    assert_eq!(result.primitive(), Some(Value::Long(0)));
    assert!(env.class_lookups().contains(&"com/google/Item".to_string()));
}

#[test]
fn test_foreign_call_site_rejected() {
    let (_vm, _env, runtime) = fixture();
    let a = ClassBinding::new(k_class1());
    let b = ClassBinding::new(k_class1());
    let ctor = a.resolve_constructor(&[]).unwrap();
    let obj = Object::construct(&a, runtime.context(), &ctor, &[]).unwrap();

    let foreign = b.resolve_method("m0", &[]).unwrap();
    assert!(matches!(
        obj.invoke(&foreign, &[]),
        Err(RuntimeError::ForeignCallSite { .. })
    ));
    assert!(matches!(
        obj.invoke(&ctor, &[]),
        Err(RuntimeError::WrongCallKind { .. })
    ));
}

#[test]
fn test_object_promote_and_copy() {
    let (_vm, env, runtime) = fixture();
    let binding = ClassBinding::new(k_class1());
    let ctor = binding.resolve_constructor(&[]).unwrap();
    let obj = Object::construct(&binding, runtime.context(), &ctor, &[]).unwrap();

    let global = obj.promote().unwrap();
    assert!(global.reference().is_global());
    let copy = global.create_copy().unwrap();
    assert!(copy.reference().is_global());
    assert_ne!(copy.reference(), global.reference());

    let m0 = binding.resolve_method("m0", &[]).unwrap();
    copy.invoke(&m0, &[]).unwrap();
    drop(global);
    copy.invoke(&m0, &[]).unwrap();
    drop(copy);

    // Only the class handle remains.
    assert_eq!(env.live_globals(), 1);
    assert_eq!(env.live_locals(), 0);
    assert_eq!(EnvCounts::get(&env.counts.bogus_delete), 0);
}

#[test]
fn test_primitive_arrays() {
    let (_vm, env, runtime) = fixture();
    let ints = Array::new_primitive(runtime.context(), PrimitiveKind::Int, 8).unwrap();
    assert_eq!(ints.descriptor().to_string(), "[I");
    assert_eq!(ints.rank(), 1);
    assert_eq!(ints.element(), T::int());
    assert_eq!(ints.len().unwrap(), 8);
    drop(ints);
    assert_eq!(env.live_locals(), 0);
}

#[test]
fn test_higher_rank_arrays_look_up_array_class() {
    let (_vm, env, runtime) = fixture();
    let element = T::array(T::float(), 2);
    let grid = Array::new_object(runtime.context(), &element, 4, None).unwrap();
    assert_eq!(grid.descriptor().to_string(), "[[[F");
    assert_eq!(grid.element(), element);
    assert_eq!(env.class_lookups(), ["[[F"]);

    // The element class handle is released right after allocation.
    let grid = grid.promote().unwrap();
    assert_eq!(env.live_locals(), 0);
    assert!(grid.reference().is_global());

    assert!(matches!(
        Array::new_object(runtime.context(), &T::int(), 1, None),
        Err(RuntimeError::InvalidArrayElement { .. })
    ));
}

#[test]
fn test_mismatched_return_kind_rejected() {
    let (_vm, env, runtime) = fixture();
    let binding = ClassBinding::new(k_class1());
    let ctor = binding.resolve_constructor(&[]).unwrap();
    let obj = Object::construct(&binding, runtime.context(), &ctor, &[]).unwrap();

    let m2 = binding
        .resolve_method("m2", &[T::float(), T::boolean()])
        .unwrap();
    env.set_call_result(Value::Int(3));
    let err = obj
        .invoke(&m2, &[Value::Float(1.0), Value::Boolean(true)])
        .unwrap_err();
    assert_eq!(
        err,
        RuntimeError::ReturnKind {
            member: "m2".into(),
            expected: "Lcom/google/Class2;".into(),
            found: "int".into(),
        }
    );

    // An object where a primitive was declared is released, not leaked.
    let stray = env.mint_local();
    env.set_call_result(Value::Object(Some(stray)));
    let m3 = binding.resolve_method("m3", &[T::boolean()]).unwrap();
    assert!(matches!(
        obj.invoke(&m3, &[Value::Boolean(false)]),
        Err(RuntimeError::ReturnKind { .. })
    ));
    assert!(!env.is_live_local(stray));
    assert_eq!(env.live_locals(), 1);
}

#[test]
fn test_array_copy_is_independent() {
    let (_vm, env, runtime) = fixture();
    let floats = Array::new_primitive(runtime.context(), PrimitiveKind::Float, 5).unwrap();
    let copy = floats.create_copy().unwrap();
    assert_eq!(copy.descriptor(), floats.descriptor());
    assert!(copy.reference().is_local());
    assert_ne!(copy.reference(), floats.reference());

    let global = floats.promote().unwrap();
    let global_copy = global.create_copy().unwrap();
    assert!(global_copy.reference().is_global());
    drop(global);

    assert_eq!(copy.len().unwrap(), 5);
    assert_eq!(global_copy.len().unwrap(), 5);
    drop((copy, global_copy));
    assert_eq!(env.live_locals(), 0);
    assert_eq!(env.live_globals(), 0);
    assert_eq!(EnvCounts::get(&env.counts.bogus_delete), 0);
}
