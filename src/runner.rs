use crate::error::{Error, Result};
use tokio::process::Command;

/// Runs an external program and hands back everything it printed.
///
/// `argv[0]` is the program; the rest are passed as discrete arguments, never through a shell.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    async fn run(&self, argv: &[String]) -> Result<String>;
}

#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    async fn run(&self, argv: &[String]) -> Result<String> {
        let (program, args) = argv
            .split_first()
            .ok_or(Error::MissingRequiredArgument("program"))?;

        tracing::debug!(%program, ?args, "running");
        let out = Command::new(program)
            .args(args)
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|source| Error::Spawn {
                program: program.clone(),
                source,
            })?;

        if !out.status.success() {
            tracing::debug!(%program, status = ?out.status.code(), "command exited unsuccessfully");
        }

        let mut text = String::from_utf8_lossy(&out.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&out.stderr));
        Ok(text)
    }
}

/// Quote one token for a POSIX shell: wrap in single quotes, `'` becomes `'\''`.
pub fn shell_escape(token: &str) -> String {
    let mut out = String::with_capacity(token.len() + 2);
    out.push('\'');
    for c in token.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

/// Join tokens into a script where every token stays a single word.
pub fn shell_join<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|t| shell_escape(t.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}
