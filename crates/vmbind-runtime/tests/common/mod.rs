//! Counting fakes of the native boundary

#![allow(dead_code)]

use parking_lot::Mutex;
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use vmbind_runtime::vmbind_schema::{PrimitiveKind, TypeDescriptor};
use vmbind_runtime::{
    FieldId, MethodId, NativeEnv, NativeError, NativeResult, NativeVm, RawHandle, Runtime,
    RuntimeOptions, Value, ValueKind,
};

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

/// Calls made against a [`FakeEnv`]
#[derive(Debug, Default)]
pub struct EnvCounts {
    pub find_class: AtomicUsize,
    pub load_class: AtomicUsize,
    pub get_method_id: AtomicUsize,
    pub get_field_id: AtomicUsize,
    pub new_object: AtomicUsize,
    pub call_method: AtomicUsize,
    pub get_field: AtomicUsize,
    pub set_field: AtomicUsize,
    pub new_array: AtomicUsize,
    pub new_local_ref: AtomicUsize,
    pub new_global_ref: AtomicUsize,
    pub delete_local_ref: AtomicUsize,
    pub delete_global_ref: AtomicUsize,
    pub promote: AtomicUsize,
    /// Deletes of handles that were not live
    pub bogus_delete: AtomicUsize,
}

impl EnvCounts {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Every call that reaches the managed runtime
    pub fn native_calls(&self) -> usize {
        [
            &self.find_class,
            &self.load_class,
            &self.get_method_id,
            &self.get_field_id,
            &self.new_object,
            &self.call_method,
            &self.get_field,
            &self.set_field,
            &self.new_array,
            &self.new_local_ref,
            &self.new_global_ref,
            &self.delete_local_ref,
            &self.delete_global_ref,
            &self.promote,
        ]
        .iter()
        .map(|c| Self::get(c))
        .sum()
    }
}

/// In-memory invoke layer tracking live references
#[derive(Debug)]
pub struct FakeEnv {
    pub counts: EnvCounts,
    next_handle: AtomicUsize,
    next_id: AtomicUsize,
    locals: Mutex<HashSet<RawHandle>>,
    globals: Mutex<HashSet<RawHandle>>,
    missing: Mutex<HashSet<String>>,
    lookup_delay: Mutex<Option<Duration>>,
    class_lookups: Mutex<Vec<String>>,
    fields: Mutex<HashMap<(RawHandle, FieldId), Value>>,
    calls: Mutex<Vec<(MethodId, Vec<Value>)>>,
    array_lengths: Mutex<HashMap<RawHandle, usize>>,
    call_result: Mutex<Option<Value>>,
}

impl Default for FakeEnv {
    fn default() -> Self {
        Self {
            counts: EnvCounts::default(),
            next_handle: AtomicUsize::new(0x1000),
            next_id: AtomicUsize::new(1),
            locals: Mutex::new(HashSet::new()),
            globals: Mutex::new(HashSet::new()),
            missing: Mutex::new(HashSet::new()),
            lookup_delay: Mutex::new(None),
            class_lookups: Mutex::new(Vec::new()),
            fields: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            array_lengths: Mutex::new(HashMap::new()),
            call_result: Mutex::new(None),
        }
    }
}

impl FakeEnv {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A fake whose method and field ids start at `base`
    pub fn with_id_base(base: usize) -> Arc<Self> {
        let env = Self::default();
        env.next_id.store(base, Ordering::SeqCst);
        Arc::new(env)
    }

    fn next_handle(&self) -> RawHandle {
        let addr = self.next_handle.fetch_add(8, Ordering::SeqCst);
        RawHandle::new(addr).unwrap()
    }

    /// A fresh live local, as if returned by some call
    pub fn mint_local(&self) -> RawHandle {
        let h = self.next_handle();
        self.locals.lock().insert(h);
        h
    }

    /// A fresh live global
    pub fn mint_global(&self) -> RawHandle {
        let h = self.next_handle();
        self.globals.lock().insert(h);
        h
    }

    fn mint_id(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.next_id.fetch_add(1, Ordering::SeqCst)).unwrap()
    }

    fn is_live(&self, h: RawHandle) -> bool {
        self.locals.lock().contains(&h) || self.globals.lock().contains(&h)
    }

    pub fn is_live_local(&self, h: RawHandle) -> bool {
        self.locals.lock().contains(&h)
    }

    pub fn is_live_global(&self, h: RawHandle) -> bool {
        self.globals.lock().contains(&h)
    }

    pub fn live_locals(&self) -> usize {
        self.locals.lock().len()
    }

    pub fn live_globals(&self) -> usize {
        self.globals.lock().len()
    }

    /// Make lookups of `name` (class, method or field) fail
    pub fn fail_lookup(&self, name: &str) {
        self.missing.lock().insert(name.to_string());
    }

    /// Slow down method lookups to widen first-touch races
    pub fn set_lookup_delay(&self, delay: Duration) {
        *self.lookup_delay.lock() = Some(delay);
    }

    /// Names passed to `find_class` and `load_class`, in order
    pub fn class_lookups(&self) -> Vec<String> {
        self.class_lookups.lock().clone()
    }

    /// Make every method call return `value`, whatever its declared type
    pub fn set_call_result(&self, value: Value) {
        *self.call_result.lock() = Some(value);
    }

    /// Methods called, with their arguments
    pub fn calls(&self) -> Vec<(MethodId, Vec<Value>)> {
        self.calls.lock().clone()
    }

    fn lookup_class(&self, name: &str) -> NativeResult<RawHandle> {
        self.class_lookups.lock().push(name.to_string());
        if self.missing.lock().contains(name) {
            return Err(NativeError::ClassNotFound {
                name: name.to_string(),
            });
        }
        Ok(self.mint_local())
    }

    /// Carry an array's length over to another handle for it
    fn share_length(&self, from: RawHandle, to: RawHandle) {
        let mut lengths = self.array_lengths.lock();
        if let Some(len) = lengths.get(&from).copied() {
            lengths.insert(to, len);
        }
    }

    fn result_for(&self, ty: &TypeDescriptor) -> Value {
        match ValueKind::of(ty) {
            ValueKind::Object => Value::Object(Some(self.mint_local())),
            _ => Value::zero(ty),
        }
    }
}

impl NativeEnv for FakeEnv {
    fn find_class(&self, name: &str) -> NativeResult<RawHandle> {
        bump(&self.counts.find_class);
        self.lookup_class(name)
    }

    fn load_class(&self, loader: RawHandle, name: &str) -> NativeResult<RawHandle> {
        bump(&self.counts.load_class);
        assert!(self.is_live(loader), "loader reference is not live");
        self.lookup_class(name)
    }

    fn get_method_id(&self, class: RawHandle, name: &str, signature: &str) -> NativeResult<MethodId> {
        bump(&self.counts.get_method_id);
        assert!(self.is_live(class), "class reference is not live");
        if let Some(delay) = *self.lookup_delay.lock() {
            std::thread::sleep(delay);
        }
        if self.missing.lock().contains(name) {
            return Err(NativeError::NoSuchMethod {
                class: format!("{class:?}"),
                name: name.to_string(),
                signature: signature.to_string(),
            });
        }
        Ok(MethodId::from_raw(self.mint_id()))
    }

    fn get_field_id(&self, class: RawHandle, name: &str, signature: &str) -> NativeResult<FieldId> {
        bump(&self.counts.get_field_id);
        assert!(self.is_live(class), "class reference is not live");
        if self.missing.lock().contains(name) {
            return Err(NativeError::NoSuchField {
                class: format!("{class:?}"),
                name: name.to_string(),
                signature: signature.to_string(),
            });
        }
        Ok(FieldId::from_raw(self.mint_id()))
    }

    fn new_object(
        &self,
        class: RawHandle,
        _constructor: MethodId,
        _args: &[Value],
    ) -> NativeResult<Option<RawHandle>> {
        bump(&self.counts.new_object);
        assert!(self.is_live(class), "class reference is not live");
        Ok(Some(self.mint_local()))
    }

    fn call_method(
        &self,
        object: RawHandle,
        method: MethodId,
        ret: &TypeDescriptor,
        args: &[Value],
    ) -> NativeResult<Value> {
        bump(&self.counts.call_method);
        assert!(self.is_live(object), "receiver is not live");
        self.calls.lock().push((method, args.to_vec()));
        if let Some(forced) = *self.call_result.lock() {
            return Ok(forced);
        }
        Ok(self.result_for(ret))
    }

    fn get_field(&self, object: RawHandle, field: FieldId, ty: &TypeDescriptor) -> NativeResult<Value> {
        bump(&self.counts.get_field);
        if let Some(v) = self.fields.lock().get(&(object, field)) {
            return Ok(*v);
        }
        Ok(self.result_for(ty))
    }

    fn set_field(&self, object: RawHandle, field: FieldId, value: &Value) -> NativeResult<()> {
        bump(&self.counts.set_field);
        self.fields.lock().insert((object, field), *value);
        Ok(())
    }

    fn new_primitive_array(&self, _kind: PrimitiveKind, len: usize) -> NativeResult<RawHandle> {
        bump(&self.counts.new_array);
        let h = self.mint_local();
        self.array_lengths.lock().insert(h, len);
        Ok(h)
    }

    fn new_object_array(
        &self,
        element_class: RawHandle,
        len: usize,
        _init: Option<RawHandle>,
    ) -> NativeResult<RawHandle> {
        bump(&self.counts.new_array);
        assert!(self.is_live(element_class), "element class is not live");
        let h = self.mint_local();
        self.array_lengths.lock().insert(h, len);
        Ok(h)
    }

    fn array_length(&self, array: RawHandle) -> NativeResult<usize> {
        Ok(self.array_lengths.lock().get(&array).copied().unwrap_or(0))
    }

    fn new_local_ref(&self, handle: RawHandle) -> NativeResult<RawHandle> {
        bump(&self.counts.new_local_ref);
        assert!(self.is_live(handle), "copied reference is not live");
        let h = self.mint_local();
        self.share_length(handle, h);
        Ok(h)
    }

    fn new_global_ref(&self, handle: RawHandle) -> NativeResult<RawHandle> {
        bump(&self.counts.new_global_ref);
        assert!(self.is_live(handle), "copied reference is not live");
        let h = self.mint_global();
        self.share_length(handle, h);
        Ok(h)
    }

    fn delete_local_ref(&self, handle: RawHandle) {
        bump(&self.counts.delete_local_ref);
        if !self.locals.lock().remove(&handle) {
            bump(&self.counts.bogus_delete);
        }
    }

    fn delete_global_ref(&self, handle: RawHandle) {
        bump(&self.counts.delete_global_ref);
        if !self.globals.lock().remove(&handle) {
            bump(&self.counts.bogus_delete);
        }
    }

    fn promote(&self, local: RawHandle) -> NativeResult<RawHandle> {
        bump(&self.counts.promote);
        assert!(self.locals.lock().remove(&local), "promoted reference is not a live local");
        let h = self.mint_global();
        self.share_length(local, h);
        Ok(h)
    }
}

thread_local! {
    static ATTACHED: Cell<bool> = const { Cell::new(false) };
}

/// Fake process-level runtime with per-thread attachment
#[derive(Debug, Default)]
pub struct FakeVm {
    pub attach_calls: AtomicUsize,
    pub detach_calls: AtomicUsize,
    pub fail_attach: AtomicBool,
    names: Mutex<Vec<Option<String>>>,
}

impl FakeVm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attach the calling thread behind the library's back
    pub fn attach_externally(&self) {
        ATTACHED.with(|a| a.set(true));
    }

    pub fn attaches(&self) -> usize {
        self.attach_calls.load(Ordering::SeqCst)
    }

    pub fn detaches(&self) -> usize {
        self.detach_calls.load(Ordering::SeqCst)
    }

    /// Thread names given to attach requests
    pub fn names(&self) -> Vec<Option<String>> {
        self.names.lock().clone()
    }
}

impl NativeVm for FakeVm {
    fn current_thread_attached(&self) -> bool {
        ATTACHED.with(|a| a.get())
    }

    fn attach_current_thread(&self, name: Option<&str>) -> NativeResult<()> {
        if self.fail_attach.load(Ordering::SeqCst) {
            return Err(NativeError::AttachFailed {
                reason: "refused".into(),
            });
        }
        bump(&self.attach_calls);
        self.names.lock().push(name.map(str::to_string));
        ATTACHED.with(|a| a.set(true));
        Ok(())
    }

    fn detach_current_thread(&self) -> NativeResult<()> {
        bump(&self.detach_calls);
        ATTACHED.with(|a| a.set(false));
        Ok(())
    }
}

/// Options for tests that manage attachment themselves
pub fn detached_options() -> RuntimeOptions {
    RuntimeOptions {
        attach_creating_thread: false,
        ..RuntimeOptions::default()
    }
}

/// Fresh fakes and a runtime over them that leaves the test thread alone
pub fn fixture() -> (Arc<FakeVm>, Arc<FakeEnv>, Runtime) {
    let vm = FakeVm::new();
    let env = FakeEnv::new();
    let runtime = Runtime::new(vm.clone(), env.clone(), detached_options()).unwrap();
    (vm, env, runtime)
}

/// Route library logs to the test writer
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
