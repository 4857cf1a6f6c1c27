use crate::{BootLoader, BootLoaderError, BootLoaderKind};
use core::fmt;
use log::{debug, trace, warn};
use std::fs;
use std::path::{Path, PathBuf};
use vz_framework::{OsVersion, Virtualization};
use vz_handle::{ForeignHandle, with_c_str, with_path_c_str};

#[cfg(target_os = "macos")]
use vz_framework::DefaultRuntime;

/// `VZLinuxBootLoader` first shipped with macOS 11.
pub const LINUX_BOOT_LOADER_MIN_VERSION: OsVersion = OsVersion::major(11);

/// Boot loader configuration for a Linux kernel.
///
/// Created by [`LinuxBootLoader::new`] or [`LinuxBootLoader::with_runtime`].
/// The kernel image is fixed at construction; the initial RAM disk and
/// command line are set through [`LinuxBootLoaderOption`]s during the same
/// call, and every option updates this value and the foreign object together.
pub struct LinuxBootLoader<R: Virtualization> {
    vmlinuz_path: PathBuf,
    initrd_path: Option<PathBuf>,
    command_line: Option<String>,
    handle: ForeignHandle<R>,
}

type ApplyFn<R> = dyn FnOnce(LinuxBootLoader<R>) -> Result<LinuxBootLoader<R>, BootLoaderError>;

/// One configuration step of a [`LinuxBootLoader`].
///
/// Steps are produced by [`with_command_line`] and [`with_initrd`] and are
/// consumed by the constructor. A step takes the partially configured boot
/// loader and hands it back configured, or fails and drops it.
pub struct LinuxBootLoaderOption<R: Virtualization> {
    name: &'static str,
    apply: Box<ApplyFn<R>>,
}

impl<R: Virtualization> LinuxBootLoaderOption<R> {
    fn new(
        name: &'static str,
        apply: impl FnOnce(LinuxBootLoader<R>) -> Result<LinuxBootLoader<R>, BootLoaderError>
        + 'static,
    ) -> Self {
        Self {
            name,
            apply: Box::new(apply),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    fn apply(self, loader: LinuxBootLoader<R>) -> Result<LinuxBootLoader<R>, BootLoaderError> {
        trace!("Applying {} option", self.name);
        (self.apply)(loader)
    }
}

impl<R: Virtualization> fmt::Debug for LinuxBootLoaderOption<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinuxBootLoaderOption")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Sets the kernel command line.
///
/// The parameters are passed to the kernel as-is; see
/// <https://www.kernel.org/doc/html/latest/admin-guide/kernel-parameters.html>.
/// Applying this option twice keeps the last value.
pub fn with_command_line<R: Virtualization>(
    command_line: impl Into<String>,
) -> LinuxBootLoaderOption<R> {
    let command_line = command_line.into();
    LinuxBootLoaderOption::new("command-line", move |mut loader| {
        loader.set_command_line(command_line)?;
        Ok(loader)
    })
}

/// Sets the optional initial RAM disk.
///
/// Fails with [`BootLoaderError::InvalidInitrdPath`] if `initrd_path` does
/// not exist.
pub fn with_initrd<R: Virtualization>(initrd_path: impl Into<PathBuf>) -> LinuxBootLoaderOption<R> {
    let initrd_path = initrd_path.into();
    LinuxBootLoaderOption::new("initrd", move |mut loader| {
        loader.set_initrd(initrd_path)?;
        Ok(loader)
    })
}

#[cfg(target_os = "macos")]
impl LinuxBootLoader<DefaultRuntime> {
    /// Creates a boot loader for the Linux kernel at `vmlinuz` using the
    /// host's virtualization framework.
    ///
    /// Requires macOS 11 or newer; see [`LinuxBootLoader::with_runtime`].
    ///
    /// # Errors
    /// See [`LinuxBootLoader::with_runtime`].
    pub fn new(
        vmlinuz: impl AsRef<Path>,
        options: impl IntoIterator<Item = LinuxBootLoaderOption<DefaultRuntime>>,
    ) -> Result<Self, BootLoaderError> {
        Self::with_runtime(DefaultRuntime::new(), vmlinuz, options)
    }
}

impl<R: Virtualization> LinuxBootLoader<R> {
    /// Creates a boot loader for the Linux kernel at `vmlinuz` in `runtime`
    /// and applies `options` in order.
    ///
    /// # Errors
    /// * [`BootLoaderError::UnsupportedOsVersion`] if the host is older than
    ///   [`LINUX_BOOT_LOADER_MIN_VERSION`]. Checked before anything else.
    /// * [`BootLoaderError::InvalidKernelPath`] if `vmlinuz` does not exist.
    ///   Nothing is allocated in that case.
    /// * [`BootLoaderError::Framework`] if the runtime refuses the allocation.
    /// * The error of the first failing option. The foreign object allocated
    ///   so far is released before returning.
    pub fn with_runtime(
        runtime: R,
        vmlinuz: impl AsRef<Path>,
        options: impl IntoIterator<Item = LinuxBootLoaderOption<R>>,
    ) -> Result<Self, BootLoaderError> {
        let vmlinuz = vmlinuz.as_ref();

        BootLoaderKind::Linux.ensure_supported(&runtime)?;
        ensure_exists(vmlinuz).map_err(|source| BootLoaderError::InvalidKernelPath {
            path: vmlinuz.to_path_buf(),
            source,
        })?;

        let handle = ForeignHandle::acquire(runtime, |rt| {
            with_path_c_str(vmlinuz, |path| {
                Ok::<_, BootLoaderError>(rt.new_linux_boot_loader(path)?)
            })
        })?;
        debug!("Allocated Linux boot loader {handle:?} for {}", vmlinuz.display());

        let loader = Self {
            vmlinuz_path: vmlinuz.to_path_buf(),
            initrd_path: None,
            command_line: None,
            handle,
        };

        options
            .into_iter()
            .try_fold(loader, |loader, option| {
                let name = option.name();
                option.apply(loader).inspect_err(|e| {
                    warn!("Discarding Linux boot loader, {name} option failed: {e}");
                })
            })
            .inspect(|loader| debug!("Linux boot loader ready: {loader}"))
    }

    /// Path of the kernel image.
    #[must_use]
    pub fn vmlinuz_path(&self) -> &Path {
        &self.vmlinuz_path
    }

    /// Path of the initial RAM disk, if one was configured.
    #[must_use]
    pub fn initrd_path(&self) -> Option<&Path> {
        self.initrd_path.as_deref()
    }

    /// The kernel command line, if one was configured.
    #[must_use]
    pub fn command_line(&self) -> Option<&str> {
        self.command_line.as_deref()
    }

    /// Releases the foreign object ahead of drop. Idempotent.
    pub fn release(&mut self) {
        self.handle.release();
    }

    fn set_command_line(&mut self, command_line: String) -> Result<(), BootLoaderError> {
        let object = self.handle.access()?;
        with_c_str(&command_line, |cs| {
            // SAFETY: `object` is the live boot loader owned by `self.handle`,
            // and `&mut self` rules out concurrent mutation.
            unsafe { self.handle.runtime().set_command_line(object, cs) };
            Ok::<_, BootLoaderError>(())
        })?;
        self.command_line = Some(command_line);
        Ok(())
    }

    fn set_initrd(&mut self, initrd_path: PathBuf) -> Result<(), BootLoaderError> {
        ensure_exists(&initrd_path).map_err(|source| BootLoaderError::InvalidInitrdPath {
            path: initrd_path.clone(),
            source,
        })?;

        let object = self.handle.access()?;
        with_path_c_str(&initrd_path, |cs| {
            // SAFETY: see `set_command_line`.
            unsafe { self.handle.runtime().set_initial_ramdisk(object, cs) };
            Ok::<_, BootLoaderError>(())
        })?;
        self.initrd_path = Some(initrd_path);
        Ok(())
    }
}

/// Succeeds if `path` names an existing filesystem entry.
fn ensure_exists(path: &Path) -> std::io::Result<()> {
    fs::metadata(path).map(|_| ())
}

impl<R: Virtualization> BootLoader for LinuxBootLoader<R> {
    type Runtime = R;

    fn kind(&self) -> BootLoaderKind {
        BootLoaderKind::Linux
    }

    fn handle(&self) -> &ForeignHandle<R> {
        &self.handle
    }
}

impl<R: Virtualization> fmt::Display for LinuxBootLoader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vmlinuz: {:?}, initrd: {:?}, command-line: {:?}",
            self.vmlinuz_path.to_string_lossy(),
            self.initrd_path
                .as_deref()
                .map(Path::to_string_lossy)
                .unwrap_or_default(),
            self.command_line.as_deref().unwrap_or_default(),
        )
    }
}

impl<R: Virtualization> fmt::Debug for LinuxBootLoader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinuxBootLoader")
            .field("vmlinuz_path", &self.vmlinuz_path)
            .field("initrd_path", &self.initrd_path)
            .field("command_line", &self.command_line)
            .field("handle", &self.handle)
            .finish()
    }
}
