//! # Foreign Handles
//!
//! Objects created by a foreign runtime (for example the Objective-C runtime
//! backing `Virtualization.framework`) are reference counted on the foreign
//! side. Rust code only ever sees an opaque address for them.
//!
//! This crate provides the two building blocks every configuration object of
//! the binding is made of:
//!
//! * [`ForeignHandle`]: a single-owner wrapper around such an address that
//!   delivers **at most one** release to the runtime, either explicitly via
//!   [`ForeignHandle::release`] or implicitly on drop.
//! * [`marshal`]: scoped conversion of Rust strings and paths into the
//!   NUL-terminated representation the foreign call boundary expects.
//!
//! ```text
//!  acquire(ctor) ──► Live ──release()──► Released
//!                     │                     ▲
//!                     └──────── drop ───────┘   (no-op if already released)
//! ```

mod handle;
pub mod marshal;

pub use handle::{ForeignHandle, HandleError};
pub use marshal::{MarshalError, with_c_str, with_path_c_str};

use core::ffi::c_void;
use core::fmt;
use core::ptr::NonNull;

/// An opaque, non-null reference to an object owned by a foreign runtime.
///
/// The value is only an address (or token); it carries no ownership. Owning
/// code wraps it in a [`ForeignHandle`].
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct RawObject(NonNull<c_void>);

// Safety: a `RawObject` is only an address. Rust code never dereferences it;
// every call that uses it goes through an `unsafe` runtime method whose
// contract covers cross-thread use of the object.
unsafe impl Send for RawObject {}
unsafe impl Sync for RawObject {}

impl RawObject {
    /// Wraps a pointer returned by a foreign constructor call.
    ///
    /// Returns `None` for a null pointer, which foreign runtimes use to
    /// signal a failed allocation.
    #[must_use]
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    /// Creates a token-style object reference that is never dereferenced.
    ///
    /// Used by runtimes that identify objects by number rather than address.
    #[must_use]
    pub fn from_token(token: usize) -> Option<Self> {
        Self::from_ptr(core::ptr::without_provenance_mut(token))
    }

    #[must_use]
    pub const fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }

    /// The numeric address (or token) of the object.
    #[must_use]
    pub fn addr(self) -> usize {
        self.0.as_ptr().addr()
    }
}

impl fmt::Debug for RawObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawObject({:#018x})", self.addr())
    }
}

/// The capability a [`ForeignHandle`] needs from the runtime that owns its
/// object: the ability to drop one reference to it.
pub trait ForeignRuntime {
    /// Drops the reference owned by the caller.
    ///
    /// # Safety
    /// `object` must be a reference created by this runtime that the caller
    /// owns and has not released yet. [`ForeignHandle`] upholds this by
    /// calling it at most once per acquired object.
    unsafe fn release(&self, object: RawObject);
}

impl<R: ForeignRuntime + ?Sized> ForeignRuntime for &R {
    unsafe fn release(&self, object: RawObject) {
        unsafe { (**self).release(object) }
    }
}

impl<R: ForeignRuntime + ?Sized> ForeignRuntime for std::sync::Arc<R> {
    unsafe fn release(&self, object: RawObject) {
        unsafe { (**self).release(object) }
    }
}
