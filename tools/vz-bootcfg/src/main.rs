use log::{error, info};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use vz_boot::{
    BootLoader, BootLoaderError, LinuxBootLoader, LinuxBootLoaderOption, RecordingRuntime,
    Virtualization, with_command_line, with_initrd,
};
use vz_logger::StderrLogger;

const USAGE: &str =
    "usage: vz-bootcfg <vmlinuz> [--initrd <path>] [--cmdline <text>]... [--dry-run]";

/// One `--initrd`/`--cmdline` flag, kept in command-line order.
enum Step {
    Initrd(PathBuf),
    CommandLine(String),
}

struct Args {
    vmlinuz: PathBuf,
    steps: Vec<Step>,
    dry_run: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut vmlinuz = None;
    let mut steps = Vec::new();
    let mut dry_run = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--initrd" => {
                let path = args.next().ok_or("--initrd needs a path")?;
                steps.push(Step::Initrd(path.into()));
            }
            "--cmdline" => {
                let text = args.next().ok_or("--cmdline needs a value")?;
                steps.push(Step::CommandLine(text));
            }
            "--dry-run" => dry_run = true,
            "-h" | "--help" => return Err(USAGE.to_owned()),
            flag if flag.starts_with("--") => return Err(format!("unknown flag {flag}")),
            _ if vmlinuz.is_none() => vmlinuz = Some(PathBuf::from(arg)),
            _ => return Err(format!("unexpected argument {arg}")),
        }
    }

    let vmlinuz = vmlinuz.ok_or_else(|| USAGE.to_owned())?;
    Ok(Args {
        vmlinuz,
        steps,
        dry_run,
    })
}

fn build<R: Virtualization>(runtime: R, args: Args) -> Result<(), BootLoaderError> {
    let options = args.steps.into_iter().map(|step| -> LinuxBootLoaderOption<R> {
        match step {
            Step::Initrd(path) => with_initrd(path),
            Step::CommandLine(text) => with_command_line(text),
        }
    });

    let boot_loader = LinuxBootLoader::with_runtime(runtime, &args.vmlinuz, options)?;
    info!("{} configured as {:?}", boot_loader.kind(), boot_loader.raw()?);
    println!("{boot_loader}");
    Ok(())
}

#[cfg(target_os = "macos")]
fn run(args: Args) -> Result<(), BootLoaderError> {
    if args.dry_run {
        build(RecordingRuntime::default(), args)
    } else {
        build(vz_boot::DefaultRuntime::new(), args)
    }
}

#[cfg(not(target_os = "macos"))]
fn run(args: Args) -> Result<(), BootLoaderError> {
    if !args.dry_run {
        info!("No virtualization framework on this host, doing a dry run");
    }
    build(RecordingRuntime::default(), args)
}

fn main() -> ExitCode {
    if let Err(e) = StderrLogger::from_env().init() {
        eprintln!("failed to install logger: {e}");
    }

    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, String> {
        parse_args(args.iter().map(ToString::to_string))
    }

    #[test]
    fn keeps_step_order() {
        let args = parse(&[
            "/boot/vmlinuz",
            "--cmdline",
            "quiet",
            "--initrd",
            "/boot/initrd.img",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(args.vmlinuz, PathBuf::from("/boot/vmlinuz"));
        assert!(args.dry_run);
        assert!(matches!(&args.steps[..], [
            Step::CommandLine(c),
            Step::Initrd(p),
        ] if c == "quiet" && p == &PathBuf::from("/boot/initrd.img")));
    }

    #[test]
    fn rejects_bad_invocations() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["/k", "--initrd"]).is_err());
        assert!(parse(&["/k", "--bogus"]).is_err());
        assert!(parse(&["/k", "/extra"]).is_err());
    }

    #[test]
    fn dry_run_builds_against_the_recording_runtime() {
        let rt = RecordingRuntime::default();
        let args = parse(&[
            concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"),
            "--cmdline",
            "console=hvc0",
        ])
        .unwrap();
        build(&rt, args).unwrap();
        assert_eq!(rt.allocations(), 1);
        assert_eq!(rt.objects()[0].command_line.as_deref(), Some("console=hvc0"));
        assert_eq!(rt.live_objects(), 0);
    }
}
