//! # Recording runtime
//!
//! An in-process stand-in for the virtualization framework. Objects are kept
//! in a table keyed by token, and every call against them is recorded so that
//! callers can check what would have crossed the foreign boundary.

use crate::{FrameworkError, LINUX_BOOT_LOADER_CLASS, OsVersion, Virtualization};
use log::{trace, warn};
use std::collections::BTreeMap;
use std::ffi::CStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use vz_handle::{ForeignRuntime, RawObject};

/// State of one object created through a [`RecordingRuntime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedObject {
    pub class: &'static str,
    pub kernel_path: String,
    pub command_line: Option<String>,
    pub initial_ramdisk_path: Option<String>,
    /// Number of releases delivered. Anything above one is a double release.
    pub releases: usize,
    /// Number of setter calls made after the object was released.
    pub calls_after_release: usize,
}

impl RecordedObject {
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.releases == 0
    }
}

/// Cloneable handle to a shared table of recorded objects.
///
/// Clones observe the same objects, so a test can keep one clone while the
/// code under test owns another.
#[derive(Debug, Clone)]
pub struct RecordingRuntime {
    inner: Arc<Mutex<State>>,
}

#[derive(Debug)]
struct State {
    host_version: Option<OsVersion>,
    refuse_allocations: bool,
    next_token: usize,
    objects: BTreeMap<usize, RecordedObject>,
}

impl Default for RecordingRuntime {
    fn default() -> Self {
        Self::new(OsVersion::major(14))
    }
}

impl RecordingRuntime {
    /// Token of the first object; tokens are spaced like word-aligned addresses.
    const FIRST_TOKEN: usize = 0x1000;
    const TOKEN_STRIDE: usize = 0x10;

    #[must_use]
    pub fn new(host_version: OsVersion) -> Self {
        Self {
            inner: Arc::new(Mutex::new(State {
                host_version: Some(host_version),
                refuse_allocations: false,
                next_token: Self::FIRST_TOKEN,
                objects: BTreeMap::new(),
            })),
        }
    }

    /// A runtime whose host version query fails.
    #[must_use]
    pub fn without_host_version() -> Self {
        let rt = Self::default();
        rt.state().host_version = None;
        rt
    }

    /// Makes every following allocation fail.
    #[must_use]
    pub fn refusing_allocations(self) -> Self {
        self.state().refuse_allocations = true;
        self
    }

    /// Number of objects ever created.
    #[must_use]
    pub fn allocations(&self) -> usize {
        self.state().objects.len()
    }

    /// Number of objects not yet released.
    #[must_use]
    pub fn live_objects(&self) -> usize {
        self.state().objects.values().filter(|o| o.is_live()).count()
    }

    /// Total number of releases delivered across all objects.
    #[must_use]
    pub fn releases(&self) -> usize {
        self.state().objects.values().map(|o| o.releases).sum()
    }

    /// Snapshot of the object behind `object`, if this runtime created it.
    #[must_use]
    pub fn object(&self, object: RawObject) -> Option<RecordedObject> {
        self.state().objects.get(&object.addr()).cloned()
    }

    /// Snapshot of all objects in creation order.
    #[must_use]
    pub fn objects(&self) -> Vec<RecordedObject> {
        self.state().objects.values().cloned().collect()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_object(&self, object: RawObject, call: &str, f: impl FnOnce(&mut RecordedObject)) {
        let mut state = self.state();
        let Some(recorded) = state.objects.get_mut(&object.addr()) else {
            warn!("{call} on unknown object {object:?}");
            return;
        };
        if recorded.is_live() {
            trace!("{call} on {object:?}");
            f(recorded);
        } else {
            warn!("{call} on released object {object:?}");
            recorded.calls_after_release += 1;
        }
    }
}

fn lossy(s: &CStr) -> String {
    s.to_string_lossy().into_owned()
}

impl ForeignRuntime for RecordingRuntime {
    unsafe fn release(&self, object: RawObject) {
        let mut state = self.state();
        match state.objects.get_mut(&object.addr()) {
            Some(recorded) => {
                recorded.releases += 1;
                if recorded.releases > 1 {
                    warn!("double release of {object:?}");
                }
            }
            None => warn!("release of unknown object {object:?}"),
        }
    }
}

impl Virtualization for RecordingRuntime {
    fn host_version(&self) -> Result<OsVersion, FrameworkError> {
        self.state().host_version.ok_or_else(|| {
            FrameworkError::HostVersionUnavailable("no host version recorded".into())
        })
    }

    fn new_linux_boot_loader(&self, kernel_path: &CStr) -> Result<RawObject, FrameworkError> {
        let allocation_failed = FrameworkError::AllocationFailed {
            class: LINUX_BOOT_LOADER_CLASS,
        };

        let mut state = self.state();
        if state.refuse_allocations {
            return Err(allocation_failed);
        }

        let token = state.next_token;
        let object = RawObject::from_token(token).ok_or(allocation_failed)?;
        state.next_token += Self::TOKEN_STRIDE;
        state.objects.insert(
            token,
            RecordedObject {
                class: LINUX_BOOT_LOADER_CLASS,
                kernel_path: lossy(kernel_path),
                command_line: None,
                initial_ramdisk_path: None,
                releases: 0,
                calls_after_release: 0,
            },
        );

        trace!("Created {LINUX_BOOT_LOADER_CLASS} {object:?}");
        Ok(object)
    }

    unsafe fn set_command_line(&self, boot_loader: RawObject, command_line: &CStr) {
        self.with_object(boot_loader, "setCommandLine", |o| {
            o.command_line = Some(lossy(command_line));
        });
    }

    unsafe fn set_initial_ramdisk(&self, boot_loader: RawObject, initrd_path: &CStr) {
        self.with_object(boot_loader, "setInitialRamdiskURL", |o| {
            o.initial_ramdisk_path = Some(lossy(initrd_path));
        });
    }
}
