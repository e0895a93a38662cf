use crate::cfg::Linker;
use crate::cmd::{self, CommandRunner};
use crate::vendor_tool::VendorTool;
use libcnb::Env;
use std::fmt;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
#[error("Unable to compile application: {0}")]
pub(crate) struct CompileError(cmd::Error);

/// `go install` flags: the `cloudfoundry` build tag, position independent
/// executables, and an optional `-X` link time variable.
pub(crate) fn build_flags(linker: Option<&Linker>) -> Vec<String> {
    let mut flags = ["-tags", "cloudfoundry", "-buildmode", "pie"]
        .map(String::from)
        .to_vec();
    if let Some(Linker { symbol, value }) = linker {
        flags.push(String::from("-ldflags"));
        flags.push(format!("-X {symbol}={value}"));
    }
    flags
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CompileCommand {
    pub(crate) program: String,
    pub(crate) args: Vec<String>,
}

impl fmt::Display for CompileCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&cmd::command_line(&self.program, &self.args))
    }
}

/// `go install <flags> <packages>`, run through `godep go` for godep apps
/// that still depend on `Godeps/_workspace` or have the vendor experiment
/// turned off.
pub(crate) fn compile_command(
    tool: &VendorTool,
    vendor_experiment: bool,
    build_flags: &[String],
    packages: &[String],
) -> CompileCommand {
    let args = std::iter::once(String::from("install"))
        .chain(build_flags.iter().cloned())
        .chain(packages.iter().cloned());

    match tool {
        VendorTool::Godep(godep) if godep.workspace_exists || !vendor_experiment => CompileCommand {
            program: String::from("godep"),
            args: std::iter::once(String::from("go")).chain(args).collect(),
        },
        _ => CompileCommand {
            program: String::from("go"),
            args: args.collect(),
        },
    }
}

/// Run `command` from the main package directory.
///
/// # Errors
///
/// Returns an error when the compiler can't be started or exits non-zero.
pub(crate) fn compile(
    command: &CompileCommand,
    main_package_path: &Path,
    runner: &impl CommandRunner,
    env: &Env,
) -> Result<(), CompileError> {
    runner
        .run(main_package_path, &command.program, &command.args, env)
        .map_err(CompileError)
}
