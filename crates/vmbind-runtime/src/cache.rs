//! Double-checked identifier cache
//!
//! Reads are a single atomic load. The first writer takes the lock, checks
//! again, and runs the initializer, so concurrent first touches produce one
//! underlying lookup and every caller sees the same value.

use crate::env::{FieldId, MethodId, RawHandle};
use parking_lot::Mutex;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Identifiers that fit in one non-zero machine word
pub trait CachedWord: Copy {
    /// Encode as a word
    fn to_word(self) -> NonZeroUsize;
    /// Decode from a word produced by [`to_word`](Self::to_word)
    fn from_word(word: NonZeroUsize) -> Self;
}

impl CachedWord for MethodId {
    fn to_word(self) -> NonZeroUsize {
        self.as_raw()
    }

    fn from_word(word: NonZeroUsize) -> Self {
        MethodId::from_raw(word)
    }
}

impl CachedWord for FieldId {
    fn to_word(self) -> NonZeroUsize {
        self.as_raw()
    }

    fn from_word(word: NonZeroUsize) -> Self {
        FieldId::from_raw(word)
    }
}

impl CachedWord for RawHandle {
    fn to_word(self) -> NonZeroUsize {
        self.as_nonzero()
    }

    fn from_word(word: NonZeroUsize) -> Self {
        RawHandle::from_nonzero(word)
    }
}

/// A lazily filled, invalidatable slot
pub struct DoubleLocked<T> {
    word: AtomicUsize,
    lock: Mutex<()>,
    _marker: PhantomData<T>,
}

impl<T: CachedWord> DoubleLocked<T> {
    /// Create an empty slot
    pub fn new() -> Self {
        Self {
            word: AtomicUsize::new(0),
            lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    /// Current value without locking
    #[inline]
    pub fn get(&self) -> Option<T> {
        NonZeroUsize::new(self.word.load(Ordering::Acquire)).map(T::from_word)
    }

    /// Return the cached value, running `init` under the lock if empty
    ///
    /// A failed `init` leaves the slot empty and hands the error back.
    #[inline]
    pub fn load_and_maybe_init<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        if let Some(value) = self.get() {
            return Ok(value);
        }
        self.init_slow(init)
    }

    #[cold]
    fn init_slow<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        let _guard = self.lock.lock();
        if let Some(value) = self.get() {
            return Ok(value);
        }
        let value = init()?;
        self.word.store(value.to_word().get(), Ordering::Release);
        Ok(value)
    }

    /// Empty the slot, returning what it held
    pub fn invalidate(&self) -> Option<T> {
        let _guard = self.lock.lock();
        NonZeroUsize::new(self.word.swap(0, Ordering::AcqRel)).map(T::from_word)
    }
}

impl<T: CachedWord> Default for DoubleLocked<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CachedWord + fmt::Debug> fmt::Debug for DoubleLocked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DoubleLocked").field(&self.get()).finish()
    }
}
