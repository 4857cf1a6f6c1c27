//! # String marshaling
//!
//! Foreign calls take NUL-terminated UTF-8 strings. The helpers here create
//! that representation for the duration of a single closure and free it on
//! every exit path, including early returns and unwinding.

use std::ffi::{CStr, CString};
use std::path::{Path, PathBuf};

/// Runs `f` with a NUL-terminated copy of `value`.
///
/// The copy lives exactly as long as the call to `f`.
///
/// # Errors
/// Returns [`MarshalError::InteriorNul`] if `value` contains a NUL byte;
/// errors from `f` are passed through.
pub fn with_c_str<T, E>(value: &str, f: impl FnOnce(&CStr) -> Result<T, E>) -> Result<T, E>
where
    E: From<MarshalError>,
{
    let scoped = CString::new(value).map_err(|e| MarshalError::InteriorNul {
        position: e.nul_position(),
    })?;
    f(&scoped)
}

/// Like [`with_c_str`], for filesystem paths.
///
/// # Errors
/// Returns [`MarshalError::NonUtf8Path`] if the path is not valid UTF-8,
/// otherwise the same errors as [`with_c_str`].
pub fn with_path_c_str<T, E>(path: &Path, f: impl FnOnce(&CStr) -> Result<T, E>) -> Result<T, E>
where
    E: From<MarshalError>,
{
    let Some(value) = path.to_str() else {
        return Err(MarshalError::NonUtf8Path {
            path: path.to_path_buf(),
        }
        .into());
    };
    with_c_str(value, f)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarshalError {
    #[error("string contains a NUL byte at position {position}")]
    InteriorNul { position: usize },
    #[error("path {path:?} is not valid UTF-8")]
    NonUtf8Path { path: PathBuf },
}
