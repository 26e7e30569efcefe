//! Wrapper around the `skopeo` command line tool.
//!
//! Copies between registries are delegated to skopeo rather than done over
//! the registry API. Process execution goes through [`CommandRunner`] so the
//! command line can be checked without skopeo installed.

use crate::auth::Credentials;
use crate::error::{Error, Result};
use std::process::Command;
use tracing::{debug, error, info};


/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a program to completion, capturing its output.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// Runs commands as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let output = Command::new(program).args(args).output().map_err(|e| {
            Error::command(
                format!("Failed to execute {}", program),
                None,
                e.to_string(),
            )
        })?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Options for [`Skopeo::copy`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyOptions {
    /// Source registry credentials as `username:password`.
    pub src_creds: Option<String>,
    /// Destination registry credentials as `username:password`.
    pub dest_creds: Option<String>,
    /// Copy every architecture of a multi-arch image, not just the host's.
    pub all: bool,
}

/// Formats credentials the way skopeo's `--creds` flags expect them.
pub fn creds_arg(credentials: &Credentials) -> Option<String> {
    match credentials {
        Credentials::Basic { username, password } => Some(format!("{}:{}", username, password)),
        Credentials::Anonymous | Credentials::Bearer { .. } => None,
    }
}

#[derive(Debug, Default)]
struct Flags<'a> {
    src_creds: Option<&'a str>,
    dest_creds: Option<&'a str>,
    creds: Option<&'a str>,
    all: bool,
}

/// Skopeo invocations.
#[derive(Debug, Clone)]
pub struct Skopeo<R = ProcessRunner> {
    binary: String,
    dry_run: bool,
    runner: R,
}

impl Skopeo<ProcessRunner> {
    pub fn new(binary: impl Into<String>, dry_run: bool) -> Self {
        Self::with_runner(binary, dry_run, ProcessRunner)
    }
}

impl<R: CommandRunner> Skopeo<R> {
    pub fn with_runner(binary: impl Into<String>, dry_run: bool, runner: R) -> Self {
        Self {
            binary: binary.into(),
            dry_run,
            runner,
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Copies `src` to `dst` with `skopeo copy`.
    ///
    /// In dry-run mode the copy is only logged. Returns skopeo's stdout.
    pub fn copy(&self, src: &str, dst: &str, options: &CopyOptions) -> Result<String> {
        let flags = Flags {
            src_creds: options.src_creds.as_deref(),
            dest_creds: options.dest_creds.as_deref(),
            creds: None,
            all: options.all,
        };
        self.run("copy", &[src, dst], flags)
    }

    /// Runs `skopeo inspect` on `image`, returning its JSON output.
    ///
    /// A successful run also proves the image exists.
    pub fn inspect(&self, image: &str, creds: Option<&str>) -> Result<String> {
        let flags = Flags {
            creds,
            ..Flags::default()
        };
        self.run("inspect", &[image], flags)
    }

    fn command_line(&self, subcommand: &str, args: &[&str], flags: &Flags<'_>) -> Vec<String> {
        let mut cmd = vec![subcommand.to_string()];

        if let Some(creds) = flags.src_creds {
            cmd.push(format!("--src-creds={}", creds));
        }
        if let Some(creds) = flags.dest_creds {
            cmd.push(format!("--dest-creds={}", creds));
        }
        if let Some(creds) = flags.creds {
            cmd.push(format!("--creds={}", creds));
        }
        if flags.all {
            cmd.push("--all".to_string());
        }
        cmd.extend(args.iter().map(|a| a.to_string()));

        cmd
    }

    fn run(&self, subcommand: &str, args: &[&str], flags: Flags<'_>) -> Result<String> {
        let cmd = self.command_line(subcommand, args, &flags);

        // Arguments only; the credential flags stay out of the logs.
        if subcommand == "copy" {
            info!(subcommand, ?args, all = flags.all, "skopeo");
            if self.dry_run {
                info!("dry run, skipping skopeo {}", subcommand);
                return Ok(String::new());
            }
        }

        let output = self.runner.run(&self.binary, &cmd)?;

        for line in output.stdout.lines() {
            debug!(" {}", line);
        }

        if !output.success() {
            for line in output.stderr.lines() {
                error!(" {}", line);
            }
            let code = output
                .exit_code
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            return Err(Error::command(
                format!("skopeo {} failed, exit code: {}", subcommand, code),
                output.exit_code,
                output.stderr,
            ));
        }

        Ok(output.stdout)
    }
}
