//! Delegated build tool invocation.
//!
//! The command is built as an argument array plus an environment map and spawned
//! directly, so run ids never pass through a shell. `display` renders an equivalent
//! shell line for the console only.

use crate::model::{RunConfig, TestType, FIXED_RUN_IDS_ENV, ONLY_STEPS_ENV};
use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Mutex;

/// Resolved parameters for one build tool run.
#[derive(Debug, Clone)]
pub struct Invocation {
    program: String,
    make_path: PathBuf,
    test_type: TestType,
    step_ids: Vec<String>,
    run_ids: Vec<String>,
    tee: Option<PathBuf>,
}

/// A finished child process.
#[derive(Debug, Clone, Copy)]
pub struct Execution {
    pub pid: u32,
    pub status: ExitStatus,
}

impl Invocation {
    pub fn new(cfg: &RunConfig, run_ids: Vec<String>) -> Self {
        let tee = match cfg.out_file.as_ref() {
            Some(path) if cfg.test_type.supports_tee() => Some(path.clone()),
            Some(path) => {
                tracing::warn!(
                    out_file = %path.display(),
                    test_type = %cfg.test_type,
                    "out file is only written for run-local; ignoring"
                );
                None
            }
            None => None,
        };
        Self {
            program: cfg.make_program.clone(),
            make_path: cfg.make_path.clone(),
            test_type: cfg.test_type,
            step_ids: cfg.step_ids.clone(),
            run_ids,
            tee,
        }
    }

    pub fn run_ids(&self) -> &[String] {
        &self.run_ids
    }

    pub fn tee_path(&self) -> Option<&Path> {
        self.tee.as_deref()
    }

    /// Environment injected into the child, in display order.
    pub fn env(&self) -> [(&'static str, String); 2] {
        [
            (FIXED_RUN_IDS_ENV, self.run_ids.join(",")),
            (ONLY_STEPS_ENV, self.step_ids.join(",")),
        ]
    }

    fn args(&self) -> [&std::ffi::OsStr; 3] {
        [
            "-C".as_ref(),
            self.make_path.as_os_str(),
            self.test_type.as_target().as_ref(),
        ]
    }

    /// Build the process command: `<program> -C <make_path> <test_type>`.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args());
        for (key, value) in self.env() {
            cmd.env(key, value);
        }
        cmd
    }

    /// Shell-equivalent one-liner for the console.
    pub fn display(&self) -> String {
        let mut parts: Vec<String> = self
            .env()
            .iter()
            .map(|(key, value)| format!("{key}={}", shell_quote(value)))
            .collect();
        parts.push(shell_quote(&self.program));
        parts.extend(
            self.args()
                .iter()
                .map(|arg| shell_quote(&arg.to_string_lossy())),
        );
        let mut line = parts.join(" ");
        if let Some(tee) = self.tee.as_deref() {
            line.push_str(" 2>&1 | tee ");
            line.push_str(&shell_quote(&tee.to_string_lossy()));
        }
        line
    }

    /// Spawn the child, hand its PID to `on_spawn`, and block until it exits.
    pub fn spawn_and_wait(&self, on_spawn: impl FnOnce(u32)) -> Result<Execution> {
        let cmd = self.command();
        match self.tee.as_deref() {
            Some(path) => run_with_tee(cmd, path, on_spawn),
            None => run_inherited(cmd, on_spawn),
        }
    }
}

fn spawn(cmd: &mut Command) -> Result<Child> {
    cmd.spawn()
        .with_context(|| format!("failed to start {:?}", cmd.get_program()))
}

/// Run with stdio inherited from this process.
pub fn run_inherited(mut cmd: Command, on_spawn: impl FnOnce(u32)) -> Result<Execution> {
    let mut child = spawn(&mut cmd)?;
    let pid = child.id();
    on_spawn(pid);
    let status = child
        .wait()
        .with_context(|| format!("failed to wait for process {pid}"))?;
    Ok(Execution { pid, status })
}

/// Run with stdout and stderr copied to the console and, combined, to `path`.
///
/// The file is truncated first. Both pipes are drained concurrently so neither can
/// fill up and stall the child.
pub fn run_with_tee(mut cmd: Command, path: &Path, on_spawn: impl FnOnce(u32)) -> Result<Execution> {
    let file = File::create(path)
        .with_context(|| format!("failed to create out file {}", path.display()))?;
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = spawn(&mut cmd)?;
    let pid = child.id();
    on_spawn(pid);

    let stdout = child.stdout.take().context("child stdout was not captured")?;
    let stderr = child.stderr.take().context("child stderr was not captured")?;
    let sink = Mutex::new(file);

    let (out_res, err_res) = std::thread::scope(|s| {
        let out = s.spawn(|| copy_tee(stdout, std::io::stdout(), &sink));
        let err = s.spawn(|| copy_tee(stderr, std::io::stderr(), &sink));
        (out.join(), err.join())
    });

    let status = child
        .wait()
        .with_context(|| format!("failed to wait for process {pid}"))?;

    for res in [out_res, err_res] {
        match res {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!(pid, error = %e, "tee to out file failed"),
            Err(_) => return Err(anyhow!("tee thread for process {pid} panicked")),
        }
    }
    Ok(Execution { pid, status })
}

/// Copy `src` to `console` and to the shared `sink` until EOF.
///
/// Console write errors are ignored so a closed terminal does not truncate the file.
fn copy_tee<R: Read, W: Write, F: Write>(mut src: R, mut console: W, sink: &Mutex<F>) -> std::io::Result<u64> {
    let mut buf = [0u8; 8192];
    let mut total = 0u64;
    loop {
        let n = match src.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let _ = console.write_all(&buf[..n]);
        let _ = console.flush();
        let mut file = sink
            .lock()
            .map_err(|_| std::io::Error::other("out file lock poisoned"))?;
        file.write_all(&buf[..n])?;
        total += n as u64;
    }
    Ok(total)
}

/// Quote a token for display in a POSIX shell line.
fn shell_quote(token: &str) -> String {
    let safe = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));
    if safe {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', r"'\''"))
    }
}
