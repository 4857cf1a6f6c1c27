use crate::BootLoaderError;
use crate::linux::LINUX_BOOT_LOADER_MIN_VERSION;
use core::fmt;
use log::debug;
use vz_framework::{LINUX_BOOT_LOADER_CLASS, OsVersion, Virtualization};
use vz_handle::{ForeignHandle, HandleError, RawObject};

/// The boot loader kinds known to the binding.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum BootLoaderKind {
    Linux,
}

impl BootLoaderKind {
    /// Oldest host version whose framework provides this kind.
    #[must_use]
    pub const fn min_os_version(self) -> OsVersion {
        match self {
            Self::Linux => LINUX_BOOT_LOADER_MIN_VERSION,
        }
    }

    /// Name of the framework class backing this kind.
    #[must_use]
    pub const fn class_name(self) -> &'static str {
        match self {
            Self::Linux => LINUX_BOOT_LOADER_CLASS,
        }
    }

    /// Fails with [`BootLoaderError::UnsupportedOsVersion`] when the host
    /// reported by `runtime` is older than [`Self::min_os_version`].
    pub(crate) fn ensure_supported<R: Virtualization>(
        self,
        runtime: &R,
    ) -> Result<(), BootLoaderError> {
        let required = self.min_os_version();
        let found = runtime.host_version()?;
        if found < required {
            debug!("{self} needs {required}, host is {found}");
            return Err(BootLoaderError::UnsupportedOsVersion {
                kind: self,
                required,
                found,
            });
        }
        Ok(())
    }
}

impl fmt::Display for BootLoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => f.write_str("Linux boot loader"),
        }
    }
}

/// Shared contract of all boot loaders.
///
/// The trait is sealed; boot loaders are only created by this crate.
pub trait BootLoader: fmt::Display + sealed::Sealed {
    type Runtime: Virtualization;

    fn kind(&self) -> BootLoaderKind;

    /// The foreign object a virtual machine configuration attaches.
    fn handle(&self) -> &ForeignHandle<Self::Runtime>;

    /// Shorthand for `self.handle().access()`.
    ///
    /// # Errors
    /// Returns [`HandleError::Released`] after the boot loader was released.
    fn raw(&self) -> Result<RawObject, HandleError> {
        self.handle().access()
    }
}

mod sealed {
    pub trait Sealed {}
}

impl<R: Virtualization> sealed::Sealed for crate::LinuxBootLoader<R> {}
