//! # Virtual Machine Boot Loaders
//!
//! A boot loader tells a virtual machine how to locate and start its guest
//! kernel. Each boot loader owns one object of the host virtualization
//! framework through a [`ForeignHandle`]; the virtual machine configuration
//! that consumes the boot loader only borrows it.
//!
//! ## Construction
//!
//! Boot loaders are built in two phases:
//!
//! ```text
//! Unvalidated ── OS version check ──► Validated ── allocate ──► Allocated
//!                                                                  │
//!                  Ready ◄── last option applied ── Configuring ◄──┘
//!
//! any failure after Unvalidated ──► Failed (error returned, handle released)
//! ```
//!
//! 1. The constructor checks that the host supports the boot loader kind,
//!    then that the mandatory kernel image exists, and only then allocates
//!    the foreign object.
//! 2. Options ([`with_command_line`], [`with_initrd`]) are applied in the
//!    order given. The first failing option aborts construction; the
//!    partially configured object is dropped, which releases its handle.
//!
//! ```rust,no_run
//! # #[cfg(target_os = "macos")]
//! # fn main() -> Result<(), vz_boot::BootLoaderError> {
//! use vz_boot::{LinuxBootLoader, with_command_line, with_initrd};
//!
//! let boot_loader = LinuxBootLoader::new(
//!     "/boot/vmlinuz",
//!     [with_initrd("/boot/initrd.img"), with_command_line("console=hvc0")],
//! )?;
//! println!("{boot_loader}");
//! # Ok(())
//! # }
//! # #[cfg(not(target_os = "macos"))]
//! # fn main() {}
//! ```

mod boot_loader;
mod error;
mod linux;

pub use boot_loader::{BootLoader, BootLoaderKind};
pub use error::BootLoaderError;
pub use linux::{
    LINUX_BOOT_LOADER_MIN_VERSION, LinuxBootLoader, LinuxBootLoaderOption, with_command_line,
    with_initrd,
};

#[cfg(target_os = "macos")]
pub use vz_framework::DefaultRuntime;
pub use vz_framework::{OsVersion, RecordingRuntime, Virtualization};
pub use vz_handle::{ForeignHandle, RawObject};
