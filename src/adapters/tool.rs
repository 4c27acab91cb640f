//! External analysis tool invocation
//!
//! The tool is an opaque file-in/file-out command. It always runs with an
//! explicit working directory; the process-wide current directory is never
//! changed.

use crate::config::ToolConfig;
use crate::domain::{PipelineError, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Values substituted into tool argument templates
///
/// | Placeholder    | Value                                        |
/// |----------------|----------------------------------------------|
/// | `{sample}`     | sample name                                  |
/// | `{input}`      | input link name inside the workspace         |
/// | `{input_path}` | original input file                          |
/// | `{workspace}`  | item workspace directory                     |
#[derive(Debug, Clone)]
pub struct TemplateVars<'a> {
    /// Sample name
    pub sample: &'a str,
    /// Relative name the tool reads its input from
    pub input: &'a str,
    /// Original input path
    pub input_path: &'a Path,
    /// Item workspace
    pub workspace: &'a Path,
}

impl TemplateVars<'_> {
    /// Substitute every known placeholder in `template`
    ///
    /// # Examples
    ///
    /// ```
    /// use provflow::adapters::tool::TemplateVars;
    /// use std::path::Path;
    ///
    /// let vars = TemplateVars {
    ///     sample: "s1",
    ///     input: "s1__input.fasta",
    ///     input_path: Path::new("/in/s1.fasta"),
    ///     workspace: Path::new("/work/s1"),
    /// };
    /// assert_eq!(vars.expand("{sample}*stats.tsv"), "s1*stats.tsv");
    /// assert_eq!(vars.expand("-f {input}"), "-f s1__input.fasta");
    /// ```
    pub fn expand(&self, template: &str) -> String {
        // `{input_path}` before `{input}` so the shorter key cannot clobber it
        template
            .replace("{input_path}", &self.input_path.to_string_lossy())
            .replace("{input}", self.input)
            .replace("{workspace}", &self.workspace.to_string_lossy())
            .replace("{sample}", self.sample)
    }

    /// Like [`expand`](Self::expand), with substituted values escaped so they
    /// match literally inside a glob pattern
    ///
    /// # Examples
    ///
    /// ```
    /// use provflow::adapters::tool::TemplateVars;
    /// use std::path::Path;
    ///
    /// let vars = TemplateVars {
    ///     sample: "s[1]",
    ///     input: "s[1]__input.fasta",
    ///     input_path: Path::new("/in/s[1].fasta"),
    ///     workspace: Path::new("/work/s[1]"),
    /// };
    /// assert_eq!(vars.expand_glob("{sample}*.tsv"), "s[[]1[]]*.tsv");
    /// ```
    pub fn expand_glob(&self, template: &str) -> String {
        let escaped = |value: &str| glob::Pattern::escape(value);
        template
            .replace("{input_path}", &escaped(&self.input_path.to_string_lossy()))
            .replace("{input}", &escaped(self.input))
            .replace("{workspace}", &escaped(&self.workspace.to_string_lossy()))
            .replace("{sample}", &escaped(self.sample))
    }
}

/// Captured output of a successful run
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
    /// Wall time of the run
    pub elapsed: Duration,
}

/// A fully expanded tool command line
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    /// Create a command from a program and literal arguments
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: None,
        }
    }

    /// Expand the configured tool for one item
    pub fn from_config(tool: &ToolConfig, vars: &TemplateVars<'_>) -> Self {
        Self {
            program: vars.expand(&tool.command),
            args: tool.args.iter().map(|a| vars.expand(a)).collect(),
            timeout: tool.timeout_seconds.map(Duration::from_secs),
        }
    }

    /// Kill the tool if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Command line for logs and error messages
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the command inside `cwd` and wait for it
    ///
    /// # Errors
    ///
    /// - `ToolExecution` when the program cannot be started or exits non-zero
    ///   (carrying the exit code and captured stderr)
    /// - `Timeout` when the configured timeout elapses; the child is killed
    pub async fn run(&self, cwd: &Path) -> Result<ToolOutput> {
        let command_line = self.command_line();
        tracing::info!(command = %command_line, cwd = %cwd.display(), "Running tool");

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, command.output()).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(PipelineError::Timeout(format!(
                        "`{command_line}` exceeded {}s",
                        limit.as_secs()
                    )))
                }
            },
            None => command.output().await,
        }
        .map_err(|e| PipelineError::ToolExecution {
            command: command_line.clone(),
            exit_code: None,
            stderr: format!("failed to start: {e}"),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(PipelineError::ToolExecution {
                command: command_line,
                exit_code: output.status.code(),
                stderr,
            });
        }

        Ok(ToolOutput {
            stdout,
            stderr,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn vars<'a>(input_path: &'a Path, workspace: &'a Path) -> TemplateVars<'a> {
        TemplateVars {
            sample: "s1",
            input: "s1__input.fasta",
            input_path,
            workspace,
        }
    }

    #[test]
    fn test_expand_all_placeholders() {
        let input = PathBuf::from("/in/s1.fasta");
        let ws = PathBuf::from("/work/s1");
        let v = vars(&input, &ws);

        assert_eq!(
            v.expand("{workspace}/{sample}:{input}:{input_path}"),
            "/work/s1/s1:s1__input.fasta:/in/s1.fasta"
        );
        assert_eq!(v.expand("no placeholders"), "no placeholders");
    }

    #[test]
    fn test_from_config_expands_args() {
        let tool: ToolConfig = serde_json::from_value(serde_json::json!({
            "name": "genoflu",
            "command": "genoflu.py",
            "args": ["-f", "{input}", "-n", "{sample}"],
            "output_pattern": "{sample}*stats.tsv",
            "timeout_seconds": 5
        }))
        .unwrap();
        let input = PathBuf::from("/in/s1.fasta");
        let ws = PathBuf::from("/work/s1");

        let cmd = ToolCommand::from_config(&tool, &vars(&input, &ws));
        assert_eq!(cmd.command_line(), "genoflu.py -f s1__input.fasta -n s1");
        assert_eq!(cmd.timeout, Some(Duration::from_secs(5)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_uses_explicit_cwd() {
        let tmp = TempDir::new().unwrap();
        let before = std::env::current_dir().unwrap();

        let cmd = ToolCommand::new("sh", vec!["-c".into(), "echo hi > marker.txt".into()]);
        cmd.run(tmp.path()).await.unwrap();

        assert!(tmp.path().join("marker.txt").exists());
        assert_eq!(std::env::current_dir().unwrap(), before);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_nonzero_exit_captures_stderr() {
        let tmp = TempDir::new().unwrap();
        let cmd = ToolCommand::new("sh", vec!["-c".into(), "echo boom >&2; exit 3".into()]);

        let err = cmd.run(tmp.path()).await.unwrap_err();
        match err {
            PipelineError::ToolExecution {
                exit_code, stderr, ..
            } => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr.trim(), "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_timeout() {
        let tmp = TempDir::new().unwrap();
        let cmd = ToolCommand::new("sh", vec!["-c".into(), "sleep 5".into()])
            .with_timeout(Duration::from_millis(100));

        let err = cmd.run(tmp.path()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let tmp = TempDir::new().unwrap();
        let cmd = ToolCommand::new("provflow-no-such-tool", vec![]);

        let err = cmd.run(tmp.path()).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ToolExecution { exit_code: None, .. }
        ));
    }
}
