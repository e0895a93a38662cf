use libcnb::Env;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("Command IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Command did not exit successfully: {0}")]
    Exit(ExitStatus),
}

/// Executes the external tools a build needs (`go`, `godep`, `glide`, `dep`).
///
/// Commands run with exactly the given `env` and nothing inherited from the
/// buildpack process, so removing a variable from `env` removes it from the
/// child.
pub(crate) trait CommandRunner {
    /// Run a command, streaming its output to the build log.
    ///
    /// # Errors
    ///
    /// Returns an error if the command exit code is not 0 or if there is an IO
    /// issue with the command.
    fn run(&self, cwd: &Path, program: &str, args: &[String], env: &Env) -> Result<(), Error>;

    /// Run a command and collect its standard output. Standard error is
    /// streamed to the build log.
    ///
    /// # Errors
    ///
    /// Returns an error if the command exit code is not 0 or if there is an IO
    /// issue with the command.
    fn capture_stdout(
        &self,
        cwd: &Path,
        program: &str,
        args: &[String],
        env: &Env,
    ) -> Result<String, Error>;
}

pub(crate) struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, cwd: &Path, program: &str, args: &[String], env: &Env) -> Result<(), Error> {
        let status = command(cwd, program, args, env).status()?;
        status.success().then_some(()).ok_or(Error::Exit(status))
    }

    fn capture_stdout(
        &self,
        cwd: &Path,
        program: &str,
        args: &[String],
        env: &Env,
    ) -> Result<String, Error> {
        let result = command(cwd, program, args, env)
            .stderr(Stdio::inherit())
            .stdout(Stdio::piped())
            .output()?;

        result
            .status
            .success()
            .then_some(())
            .ok_or(Error::Exit(result.status))?;

        Ok(String::from_utf8_lossy(&result.stdout).to_string())
    }
}

fn command(cwd: &Path, program: &str, args: &[String], env: &Env) -> Command {
    let mut command = Command::new(program);
    command.args(args).current_dir(cwd).env_clear().envs(env);
    command
}

/// Human readable command line, as it's announced in the build log.
pub(crate) fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Copies `env` without the variables named in `keys`.
pub(crate) fn without_vars(env: &Env, keys: &[&str]) -> Env {
    let mut filtered = Env::new();
    for (key, value) in env
        .iter()
        .filter(|(key, _)| !keys.iter().any(|k| key.as_os_str() == *k))
    {
        filtered.insert(key, value);
    }
    filtered
}
