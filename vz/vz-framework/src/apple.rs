//! # Objective-C runtime
//!
//! Sends messages to `Virtualization.framework`. Each call runs inside its own
//! autorelease pool, so the `NSString`/`NSURL` temporaries built from the
//! caller's C strings are freed before the call returns.

use crate::{FrameworkError, LINUX_BOOT_LOADER_CLASS, OsVersion, Virtualization};
use log::debug;
use objc::rc::autoreleasepool;
use objc::runtime::{Class, Object};
use objc::{class, msg_send, sel, sel_impl};
use std::ffi::CStr;
use std::sync::OnceLock;
use vz_handle::{ForeignRuntime, RawObject};

#[link(name = "Foundation", kind = "framework")]
unsafe extern "C" {}

#[link(name = "Virtualization", kind = "framework")]
unsafe extern "C" {}

type Id = *mut Object;

/// `NSOperatingSystemVersion`
#[repr(C)]
#[derive(Copy, Clone)]
struct NsOperatingSystemVersion {
    major: isize,
    minor: isize,
    patch: isize,
}

/// Runtime backed by the Objective-C classes of `Virtualization.framework`.
#[derive(Debug, Default, Copy, Clone)]
pub struct ObjcRuntime;

impl ObjcRuntime {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Autoreleased `NSString` copy of `s`.
unsafe fn ns_string(s: &CStr) -> Id {
    unsafe { msg_send![class!(NSString), stringWithUTF8String: s.as_ptr()] }
}

/// Autoreleased file `NSURL` for `path`.
unsafe fn file_url(path: &CStr) -> Id {
    unsafe {
        let path = ns_string(path);
        msg_send![class!(NSURL), fileURLWithPath: path]
    }
}

const fn as_id(object: RawObject) -> Id {
    object.as_ptr().cast()
}

fn query_host_version() -> Result<OsVersion, FrameworkError> {
    let v: NsOperatingSystemVersion = autoreleasepool(|| unsafe {
        let info: Id = msg_send![class!(NSProcessInfo), processInfo];
        msg_send![info, operatingSystemVersion]
    });

    let component = |c: isize| {
        u32::try_from(c).map_err(|_| {
            FrameworkError::HostVersionUnavailable(format!("invalid version component {c}"))
        })
    };
    Ok(OsVersion::new(
        component(v.major)?,
        component(v.minor)?,
        component(v.patch)?,
    ))
}

impl ForeignRuntime for ObjcRuntime {
    unsafe fn release(&self, object: RawObject) {
        unsafe {
            let _: () = msg_send![as_id(object), release];
        }
    }
}

impl Virtualization for ObjcRuntime {
    fn host_version(&self) -> Result<OsVersion, FrameworkError> {
        static HOST_VERSION: OnceLock<Result<OsVersion, FrameworkError>> = OnceLock::new();
        HOST_VERSION
            .get_or_init(|| {
                let version = query_host_version();
                debug!("Host OS version: {version:?}");
                version
            })
            .clone()
    }

    fn new_linux_boot_loader(&self, kernel_path: &CStr) -> Result<RawObject, FrameworkError> {
        let allocation_failed = FrameworkError::AllocationFailed {
            class: LINUX_BOOT_LOADER_CLASS,
        };
        let Some(cls) = Class::get(LINUX_BOOT_LOADER_CLASS) else {
            return Err(allocation_failed);
        };

        let ptr: Id = autoreleasepool(|| unsafe {
            let url = file_url(kernel_path);
            let obj: Id = msg_send![cls, alloc];
            msg_send![obj, initWithKernelURL: url]
        });

        RawObject::from_ptr(ptr.cast()).ok_or(allocation_failed)
    }

    unsafe fn set_command_line(&self, boot_loader: RawObject, command_line: &CStr) {
        autoreleasepool(|| unsafe {
            let s = ns_string(command_line);
            let _: () = msg_send![as_id(boot_loader), setCommandLine: s];
        });
    }

    unsafe fn set_initial_ramdisk(&self, boot_loader: RawObject, initrd_path: &CStr) {
        autoreleasepool(|| unsafe {
            let url = file_url(initrd_path);
            let _: () = msg_send![as_id(boot_loader), setInitialRamdiskURL: url];
        });
    }
}
