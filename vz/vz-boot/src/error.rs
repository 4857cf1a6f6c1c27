use crate::BootLoaderKind;
use std::io;
use std::path::{Path, PathBuf};
use vz_framework::{FrameworkError, OsVersion};
use vz_handle::{HandleError, MarshalError};

#[derive(Debug, thiserror::Error)]
pub enum BootLoaderError {
    /// The host is older than the boot loader kind requires.
    #[error("{kind} requires OS version {required} or newer, host is {found}")]
    UnsupportedOsVersion {
        kind: BootLoaderKind,
        required: OsVersion,
        found: OsVersion,
    },
    #[error("invalid linux kernel path {path:?}: {source}")]
    InvalidKernelPath { path: PathBuf, source: io::Error },
    #[error("invalid initial RAM disk path {path:?}: {source}")]
    InvalidInitrdPath { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Framework(#[from] FrameworkError),
    #[error(transparent)]
    Handle(#[from] HandleError),
    #[error(transparent)]
    Marshal(#[from] MarshalError),
}

impl BootLoaderError {
    #[must_use]
    pub const fn is_unsupported_os_version(&self) -> bool {
        matches!(self, Self::UnsupportedOsVersion { .. })
    }

    /// The offending file for path validation errors.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::InvalidKernelPath { path, .. } | Self::InvalidInitrdPath { path, .. } => {
                Some(path)
            }
            Self::Marshal(MarshalError::NonUtf8Path { path }) => Some(path),
            _ => None,
        }
    }
}
