use proptest::prelude::*;
use std::path::Path;
use vz_boot::{
    BootLoader, BootLoaderError, BootLoaderKind, LINUX_BOOT_LOADER_MIN_VERSION, LinuxBootLoader,
    OsVersion, RecordingRuntime, with_command_line, with_initrd,
};

/// Files that are guaranteed to exist while the tests run.
const KERNEL: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml");
const INITRD: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src/lib.rs");

#[test]
fn kernel_only_boot_loader() {
    let rt = RecordingRuntime::default();
    let loader = LinuxBootLoader::with_runtime(&rt, KERNEL, []).unwrap();

    assert_eq!(loader.vmlinuz_path(), Path::new(KERNEL));
    assert_eq!(loader.initrd_path(), None);
    assert_eq!(loader.command_line(), None);
    assert_eq!(loader.kind(), BootLoaderKind::Linux);

    let recorded = rt.object(loader.raw().unwrap()).unwrap();
    assert_eq!(recorded.kernel_path, KERNEL);
    assert!(recorded.is_live());
}

#[test]
fn kernel_initrd_and_console_command_line() {
    let rt = RecordingRuntime::default();
    let loader = LinuxBootLoader::with_runtime(
        &rt,
        KERNEL,
        [with_initrd(INITRD), with_command_line("console=ttyS0")],
    )
    .unwrap();

    assert_eq!(loader.initrd_path(), Some(Path::new(INITRD)));
    assert_eq!(loader.command_line(), Some("console=ttyS0"));
    assert!(loader.handle().is_live());

    // The foreign object mirrors the managed fields.
    let recorded = rt.object(loader.raw().unwrap()).unwrap();
    assert_eq!(recorded.initial_ramdisk_path.as_deref(), Some(INITRD));
    assert_eq!(recorded.command_line.as_deref(), Some("console=ttyS0"));

    assert_eq!(
        loader.to_string(),
        format!(r#"vmlinuz: "{KERNEL}", initrd: "{INITRD}", command-line: "console=ttyS0""#)
    );
}

#[test]
fn missing_kernel_is_reported_without_allocating() {
    let rt = RecordingRuntime::default();
    let err = LinuxBootLoader::with_runtime(&rt, "/does/not/exist", [with_command_line("quiet")])
        .unwrap_err();

    assert!(
        matches!(&err, BootLoaderError::InvalidKernelPath { path, .. } if path == Path::new("/does/not/exist")),
        "unexpected error: {err}"
    );
    assert_eq!(err.path(), Some(Path::new("/does/not/exist")));
    assert!(err.to_string().starts_with("invalid linux kernel path"));
    assert_eq!(rt.allocations(), 0);
}

#[test]
fn missing_initrd_fails_construction_and_releases() {
    let rt = RecordingRuntime::default();
    let err = LinuxBootLoader::with_runtime(
        &rt,
        KERNEL,
        [with_initrd("/does/not/exist"), with_command_line("console=hvc0")],
    )
    .unwrap_err();

    assert!(
        matches!(&err, BootLoaderError::InvalidInitrdPath { path, .. } if path == Path::new("/does/not/exist")),
        "unexpected error: {err}"
    );

    // Allocated once, released once, and the later option never ran.
    assert_eq!(rt.allocations(), 1);
    assert_eq!(rt.releases(), 1);
    assert_eq!(rt.live_objects(), 0);
    let recorded = &rt.objects()[0];
    assert_eq!(recorded.command_line, None);
    assert_eq!(recorded.initial_ramdisk_path, None);
}

#[test]
fn options_before_a_failure_were_applied_then_discarded() {
    let rt = RecordingRuntime::default();
    let res = LinuxBootLoader::with_runtime(
        &rt,
        KERNEL,
        [with_command_line("console=hvc0"), with_initrd("/does/not/exist")],
    );
    assert!(res.is_err());

    let recorded = &rt.objects()[0];
    assert_eq!(recorded.command_line.as_deref(), Some("console=hvc0"));
    assert_eq!(recorded.releases, 1);
}

#[test]
fn last_command_line_wins() {
    let rt = RecordingRuntime::default();
    let loader = LinuxBootLoader::with_runtime(
        &rt,
        KERNEL,
        [with_command_line("console=ttyS0"), with_command_line("console=hvc0")],
    )
    .unwrap();

    assert_eq!(loader.command_line(), Some("console=hvc0"));
    let recorded = rt.object(loader.raw().unwrap()).unwrap();
    assert_eq!(recorded.command_line.as_deref(), Some("console=hvc0"));
}

#[test]
fn old_host_is_rejected_before_the_path_check() {
    let rt = RecordingRuntime::new(OsVersion::new(10, 15, 7));
    let err = LinuxBootLoader::with_runtime(&rt, "/does/not/exist", []).unwrap_err();

    assert!(err.is_unsupported_os_version(), "unexpected error: {err}");
    assert!(matches!(
        err,
        BootLoaderError::UnsupportedOsVersion {
            kind: BootLoaderKind::Linux,
            required,
            found,
        } if required == LINUX_BOOT_LOADER_MIN_VERSION && found == OsVersion::new(10, 15, 7)
    ));
    assert_eq!(rt.allocations(), 0);
}

#[test]
fn minimum_version_is_supported() {
    let rt = RecordingRuntime::new(LINUX_BOOT_LOADER_MIN_VERSION);
    assert!(LinuxBootLoader::with_runtime(&rt, KERNEL, []).is_ok());
}

#[test]
fn explicit_release_then_drop_releases_once() {
    let rt = RecordingRuntime::default();
    let mut loader = LinuxBootLoader::with_runtime(&rt, KERNEL, []).unwrap();
    let raw = loader.raw().unwrap();

    loader.release();
    loader.release();
    assert!(loader.raw().is_err());
    assert_eq!(rt.object(raw).unwrap().releases, 1);

    drop(loader);
    assert_eq!(rt.object(raw).unwrap().releases, 1);
}

#[test]
fn drop_releases_the_foreign_object() {
    let rt = RecordingRuntime::default();
    {
        let _loader =
            LinuxBootLoader::with_runtime(rt.clone(), KERNEL, [with_command_line("quiet")])
                .unwrap();
        assert_eq!(rt.live_objects(), 1);
    }
    assert_eq!(rt.live_objects(), 0);
    assert_eq!(rt.releases(), 1);
}

#[test]
fn ready_boot_loader_can_be_shared_across_threads() {
    let rt = RecordingRuntime::default();
    let loader = LinuxBootLoader::with_runtime(rt.clone(), KERNEL, []).unwrap();
    let raw = loader.raw().unwrap();

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                assert_eq!(loader.raw().unwrap(), raw);
                assert_eq!(loader.vmlinuz_path(), Path::new(KERNEL));
            });
        }
    });
}

proptest! {
    #[test]
    fn every_version_below_the_minimum_is_rejected(
        major in 0u32..11,
        minor in any::<u32>(),
        patch in any::<u32>(),
        kernel in prop_oneof![Just(KERNEL), Just("/does/not/exist")],
    ) {
        let rt = RecordingRuntime::new(OsVersion::new(major, minor, patch));
        let err = LinuxBootLoader::with_runtime(&rt, kernel, []).unwrap_err();
        prop_assert!(err.is_unsupported_os_version());
        prop_assert_eq!(rt.allocations(), 0);
    }

    #[test]
    fn every_supported_version_accepts_a_valid_kernel(
        major in 11u32..100,
        minor in any::<u32>(),
        patch in any::<u32>(),
    ) {
        let rt = RecordingRuntime::new(OsVersion::new(major, minor, patch));
        let loader = LinuxBootLoader::with_runtime(&rt, KERNEL, []).unwrap();
        prop_assert_eq!(loader.vmlinuz_path(), Path::new(KERNEL));
    }

    #[test]
    fn nonexistent_kernels_never_allocate(name in "[a-z0-9]{1,16}") {
        let rt = RecordingRuntime::default();
        let path = format!("/does/not/exist/{name}");
        let err = LinuxBootLoader::with_runtime(&rt, &path, []).unwrap_err();
        prop_assert!(
            matches!(err, BootLoaderError::InvalidKernelPath { .. }),
            "unexpected error: {}",
            err
        );
        prop_assert_eq!(rt.allocations(), 0);
    }
}
