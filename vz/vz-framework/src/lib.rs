//! # Virtualization Framework Calls
//!
//! The boot loader and every other configuration object of the binding talk
//! to the host virtualization framework through the [`Virtualization`] trait.
//! It is the only place where foreign calls are made.
//!
//! Two runtimes implement it:
//!
//! * [`ObjcRuntime`] (macOS only): sends Objective-C messages to
//!   `Virtualization.framework` classes such as `VZLinuxBootLoader`.
//! * [`RecordingRuntime`]: keeps the "foreign" objects in process and records
//!   every allocation, mutation and release. Used by tests and dry runs on any
//!   host.
//!
//! ```text
//!  vz-boot ──► Virtualization ──┬─► ObjcRuntime ──► Virtualization.framework
//!                               └─► RecordingRuntime (in-process)
//! ```

#[cfg(target_os = "macos")]
mod apple;
mod recording;
mod version;

#[cfg(target_os = "macos")]
pub use apple::ObjcRuntime;
pub use recording::{RecordedObject, RecordingRuntime};
pub use version::{OsVersion, ParseOsVersionError};

use std::ffi::CStr;
use vz_handle::{ForeignRuntime, RawObject};

/// The runtime used when the caller does not pick one.
#[cfg(target_os = "macos")]
pub type DefaultRuntime = ObjcRuntime;

/// Objective-C class name of the Linux boot loader.
pub const LINUX_BOOT_LOADER_CLASS: &str = "VZLinuxBootLoader";

/// Foreign calls needed to configure a virtual machine's boot loader.
///
/// Strings cross the boundary as NUL-terminated UTF-8 that is only valid for
/// the duration of the call; implementations copy what they keep.
pub trait Virtualization: ForeignRuntime {
    /// The operating system version of the host.
    ///
    /// # Errors
    /// Returns [`FrameworkError::HostVersionUnavailable`] if the version
    /// cannot be determined.
    fn host_version(&self) -> Result<OsVersion, FrameworkError>;

    /// Creates a Linux boot loader for the kernel image at `kernel_path`.
    ///
    /// The returned object carries one reference owned by the caller.
    ///
    /// # Errors
    /// Returns [`FrameworkError::AllocationFailed`] if the framework refuses
    /// to create the object.
    fn new_linux_boot_loader(&self, kernel_path: &CStr) -> Result<RawObject, FrameworkError>;

    /// Sets the kernel command line of a Linux boot loader.
    ///
    /// # Safety
    /// `boot_loader` must be a live object created by
    /// [`Virtualization::new_linux_boot_loader`] on this runtime, and no other
    /// thread may mutate it concurrently.
    unsafe fn set_command_line(&self, boot_loader: RawObject, command_line: &CStr);

    /// Sets the initial RAM disk of a Linux boot loader.
    ///
    /// # Safety
    /// Same requirements as [`Virtualization::set_command_line`].
    unsafe fn set_initial_ramdisk(&self, boot_loader: RawObject, initrd_path: &CStr);
}

impl<V: Virtualization + ?Sized> Virtualization for &V {
    fn host_version(&self) -> Result<OsVersion, FrameworkError> {
        (**self).host_version()
    }

    fn new_linux_boot_loader(&self, kernel_path: &CStr) -> Result<RawObject, FrameworkError> {
        (**self).new_linux_boot_loader(kernel_path)
    }

    unsafe fn set_command_line(&self, boot_loader: RawObject, command_line: &CStr) {
        unsafe { (**self).set_command_line(boot_loader, command_line) }
    }

    unsafe fn set_initial_ramdisk(&self, boot_loader: RawObject, initrd_path: &CStr) {
        unsafe { (**self).set_initial_ramdisk(boot_loader, initrd_path) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameworkError {
    #[error("the virtualization framework refused to create a {class}")]
    AllocationFailed { class: &'static str },
    #[error("unable to determine the host OS version: {0}")]
    HostVersionUnavailable(String),
}
