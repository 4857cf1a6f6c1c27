use crate::{ForeignRuntime, RawObject};
use core::fmt;
use log::trace;

/// Single owner of one reference to a foreign object.
///
/// The handle is neither `Clone` nor `Copy`: exactly one Rust value owns the
/// foreign reference at any time. The reference is given back to the runtime
/// by [`ForeignHandle::release`] or, as a safety net, when the handle is
/// dropped. Whichever happens first wins; the runtime never sees a second
/// release for the same object.
///
/// The handle makes no foreign call through `&self`, so it is `Send`/`Sync`
/// exactly when its runtime is.
pub struct ForeignHandle<R: ForeignRuntime> {
    /// `Some` while live, `None` once released.
    object: Option<RawObject>,
    runtime: R,
}

impl<R: ForeignRuntime> ForeignHandle<R> {
    /// Takes ownership of a freshly created foreign object.
    ///
    /// `ctor` performs the native constructor call. If it fails, its error is
    /// returned unchanged and no handle exists.
    ///
    /// # Errors
    /// Propagates the error returned by `ctor`.
    pub fn acquire<E>(runtime: R, ctor: impl FnOnce(&R) -> Result<RawObject, E>) -> Result<Self, E> {
        let object = ctor(&runtime)?;
        trace!("Acquired foreign object {object:?}");
        Ok(Self {
            object: Some(object),
            runtime,
        })
    }

    /// Returns the live reference for passing into further foreign calls.
    ///
    /// # Errors
    /// Returns [`HandleError::Released`] once the handle was released.
    #[inline]
    pub fn access(&self) -> Result<RawObject, HandleError> {
        self.object.ok_or(HandleError::Released)
    }

    /// Whether the foreign object is still owned by this handle.
    #[inline]
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.object.is_some()
    }

    /// The runtime the object belongs to.
    #[inline]
    #[must_use]
    pub const fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Gives the reference back to the foreign runtime.
    ///
    /// Idempotent: only the first call reaches the runtime.
    pub fn release(&mut self) {
        if let Some(object) = self.object.take() {
            trace!("Releasing foreign object {object:?}");
            // SAFETY: `object` came from `acquire` on this runtime and was just
            // taken out of the handle, so it is released exactly once.
            unsafe { self.runtime.release(object) }
        }
    }
}

impl<R: ForeignRuntime> Drop for ForeignHandle<R> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<R: ForeignRuntime> fmt::Debug for ForeignHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object {
            Some(object) => f.debug_tuple("ForeignHandle").field(&object).finish(),
            None => f.write_str("ForeignHandle(<released>)"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandleError {
    #[error("the foreign object was already released")]
    Released,
}
