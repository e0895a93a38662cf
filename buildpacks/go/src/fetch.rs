use crate::cmd::{self, CommandRunner};
use crate::vendor_tool::VendorTool;
use bullet_stream::global::print;
use bullet_stream::style;
use fs_err as fs;
use libcnb::Env;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub(crate) enum FetchError {
    #[error("Error running '{0}': {1}")]
    Command(String, cmd::Error),
    #[error("Unable to inspect vendor directory: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FetchOutcome {
    /// The tool has no fetch step.
    NotApplicable,
    /// The app ships its dependencies already.
    Skipped,
    Fetched,
    /// A go modules app with a `vendor/` directory; builds must use `-mod=vendor`.
    VendoredModules,
}

/// Fetch dependencies the app didn't vendor, for the tools that can.
///
/// `glide install` and `dep ensure` only run when `vendor/` is missing or has
/// no subdirectories, so apps that vendor everything build without network
/// access.
///
/// # Errors
///
/// Fails when the vendor directory can't be read or the fetch command fails.
pub(crate) fn fetch_dependencies(
    tool: &VendorTool,
    main_package_path: &Path,
    runner: &impl CommandRunner,
    env: &Env,
) -> Result<FetchOutcome, FetchError> {
    let args = match tool {
        VendorTool::Glide => ["glide", "install"],
        VendorTool::Dep => ["dep", "ensure"],
        VendorTool::GoMod(_) => {
            return Ok(if main_package_path.join("vendor").is_dir() {
                print::sub_bullet("Using vendored Go modules");
                FetchOutcome::VendoredModules
            } else {
                FetchOutcome::NotApplicable
            });
        }
        VendorTool::Godep(_) | VendorTool::Native => return Ok(FetchOutcome::NotApplicable),
    };
    let [program, subcommand] = args;
    let command_line = args.join(" ");

    if has_vendored_packages(main_package_path)? {
        print::sub_bullet(format!(
            "Note: skipping ({command_line}) due to non-empty vendor directory."
        ));
        return Ok(FetchOutcome::Skipped);
    }

    print::bullet(format!(
        "Fetching any unsaved dependencies ({})",
        style::command(&command_line)
    ));
    runner
        .run(main_package_path, program, &[subcommand.to_string()], env)
        .map_err(|error| FetchError::Command(command_line, error))?;

    Ok(FetchOutcome::Fetched)
}

/// `vendor/` exists and contains at least one subdirectory.
fn has_vendored_packages(main_package_path: &Path) -> Result<bool, std::io::Error> {
    let vendor = main_package_path.join("vendor");
    if !vendor.is_dir() {
        return Ok(false);
    }

    for entry in fs::read_dir(&vendor)? {
        if entry?.file_type()?.is_dir() {
            return Ok(true);
        }
    }
    Ok(false)
}
