//! Slurm array job scheduler
//!
//! Submission writes a [`TaskManifest`] to the log directory and runs
//! `sbatch --parsable --array=0-(N-1)%width`, each task running this binary's
//! `worker` command. Task states come from `sacct`.

use super::manifest::TaskManifest;
use super::traits::{ArrayJob, Scheduler, TaskLogs, TaskState};
use crate::config::SlurmParams;
use crate::domain::{PipelineError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Slurm scheduler driven through its command-line tools
#[derive(Debug, Clone)]
pub struct SlurmScheduler {
    params: SlurmParams,
    config_path: PathBuf,
    program: PathBuf,
    sbatch: String,
    sacct: String,
    scancel: String,
}

impl SlurmScheduler {
    /// Create a scheduler whose tasks re-run the current executable
    ///
    /// # Errors
    ///
    /// Returns a `Scheduler` error if the current executable cannot be
    /// determined.
    pub fn new(params: SlurmParams, config_path: impl Into<PathBuf>) -> Result<Self> {
        let program = std::env::current_exe().map_err(|e| {
            PipelineError::Scheduler(format!("Cannot determine current executable: {e}"))
        })?;
        let config_path = config_path.into();
        // Workers start in another directory on another node
        let config_path = std::fs::canonicalize(&config_path).unwrap_or(config_path);

        Ok(Self {
            params,
            config_path,
            program,
            sbatch: "sbatch".to_string(),
            sacct: "sacct".to_string(),
            scancel: "scancel".to_string(),
        })
    }

    /// Use other executables for the scheduler tools
    pub fn with_commands(
        mut self,
        sbatch: impl Into<String>,
        sacct: impl Into<String>,
        scancel: impl Into<String>,
    ) -> Self {
        self.sbatch = sbatch.into();
        self.sacct = sacct.into();
        self.scancel = scancel.into();
        self
    }

    /// Use another worker executable
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Arguments passed to `sbatch` for an array of `count` tasks
    pub fn sbatch_args(&self, count: usize, manifest: &Path) -> Vec<String> {
        let log_pattern = |ext: &str| {
            self.params
                .log_dir
                .join(format!("{}_%A_%a.{ext}", self.params.job_name))
                .display()
                .to_string()
        };

        let worker = [
            self.program.display().to_string(),
            "--config".to_string(),
            self.config_path.display().to_string(),
            "worker".to_string(),
            "--manifest".to_string(),
            manifest.display().to_string(),
        ]
        .iter()
        .map(|a| shell_quote(a))
        .collect::<Vec<_>>()
        .join(" ");

        vec![
            "--parsable".to_string(),
            format!("--job-name={}", self.params.job_name),
            format!("--partition={}", self.params.partition),
            format!("--time={}", self.params.time),
            format!("--mem={}", self.params.mem),
            format!("--cpus-per-task={}", self.params.cpus_per_task),
            format!(
                "--array=0-{}%{}",
                count.saturating_sub(1),
                self.params.array_parallelism
            ),
            format!("--output={}", log_pattern("out")),
            format!("--error={}", log_pattern("err")),
            format!("--wrap={worker}"),
        ]
    }

    async fn run_tool(&self, program: &str, args: &[String]) -> Result<String> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| PipelineError::Scheduler(format!("Failed to run {program}: {e}")))?;

        if !output.status.success() {
            return Err(PipelineError::Scheduler(format!(
                "{program} exited with {}: {}",
                output
                    .status
                    .code()
                    .map_or_else(|| "signal".to_string(), |c| c.to_string()),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Scheduler for SlurmScheduler {
    async fn submit(&self, items: &[PathBuf]) -> Result<ArrayJob> {
        if items.is_empty() {
            return Err(PipelineError::Scheduler(
                "Refusing to submit an empty array job".to_string(),
            ));
        }

        tokio::fs::create_dir_all(&self.params.log_dir).await?;
        let manifest_path = self.params.log_dir.join(format!(
            "{}_{}.manifest.json",
            self.params.job_name,
            uuid::Uuid::new_v4()
        ));
        TaskManifest {
            items: items.to_vec(),
        }
        .save(&manifest_path)
        .await?;

        let args = self.sbatch_args(items.len(), &manifest_path);
        let stdout = match self.run_tool(&self.sbatch, &args).await {
            Ok(stdout) => stdout,
            Err(e) => {
                let _ = tokio::fs::remove_file(&manifest_path).await;
                return Err(e);
            }
        };

        let job_id = parse_job_id(&stdout).ok_or_else(|| {
            PipelineError::Scheduler(format!("Unexpected sbatch output: {}", stdout.trim()))
        })?;

        tracing::info!(
            job_id = %job_id,
            task_count = items.len(),
            partition = %self.params.partition,
            manifest = %manifest_path.display(),
            "Array job submitted"
        );

        Ok(ArrayJob {
            job_id,
            items: items.to_vec(),
            manifest: Some(manifest_path),
        })
    }

    async fn poll(&self, job: &ArrayJob) -> Result<HashMap<usize, TaskState>> {
        let args = vec![
            "-j".to_string(),
            job.job_id.clone(),
            "--format=JobID,State,ExitCode".to_string(),
            "--noheader".to_string(),
            "--parsable2".to_string(),
        ];
        let stdout = self.run_tool(&self.sacct, &args).await?;
        Ok(parse_sacct(&job.job_id, &stdout))
    }

    async fn cancel(&self, job: &ArrayJob, indices: &[usize]) -> Result<()> {
        if indices.is_empty() {
            return Ok(());
        }
        let args: Vec<String> = indices.iter().map(|i| job.task_id(*i)).collect();
        self.run_tool(&self.scancel, &args).await?;
        Ok(())
    }

    fn task_logs(&self, job: &ArrayJob, index: usize) -> TaskLogs {
        let base = format!("{}_{}_{}", self.params.job_name, job.job_id, index);
        TaskLogs {
            stdout: self.params.log_dir.join(format!("{base}.out")),
            stderr: self.params.log_dir.join(format!("{base}.err")),
        }
    }
}

/// Job id from `sbatch --parsable` output (`<id>` or `<id>;<cluster>`)
fn parse_job_id(stdout: &str) -> Option<String> {
    let id = stdout.trim().split(';').next()?.trim();
    (!id.is_empty() && id.chars().all(|c| c.is_ascii_digit())).then(|| id.to_string())
}

/// Task states from `sacct --parsable2` lines `JobID|State|ExitCode`
///
/// Job steps (`<id>_<n>.batch`) and still-pending index ranges
/// (`<id>_[3-9%4]`) are skipped.
fn parse_sacct(job_id: &str, stdout: &str) -> HashMap<usize, TaskState> {
    let prefix = format!("{job_id}_");
    let mut states = HashMap::new();

    for line in stdout.lines() {
        let mut fields = line.trim().split('|');
        let (Some(id), Some(state), exit_code) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let Some(index) = id.strip_prefix(&prefix).and_then(|i| i.parse::<usize>().ok()) else {
            continue;
        };
        states.insert(index, map_state(state, exit_code.unwrap_or("")));
    }
    states
}

fn map_state(state: &str, exit_code: &str) -> TaskState {
    let state = state.split_whitespace().next().unwrap_or("");
    match state {
        "PENDING" | "REQUEUED" | "RESIZING" | "SUSPENDED" | "CONFIGURING" => TaskState::Pending,
        "RUNNING" | "COMPLETING" | "STAGE_OUT" => TaskState::Running,
        "COMPLETED" => TaskState::Completed,
        other => TaskState::Failed {
            reason: format!("{other} exit={exit_code}"),
        },
    }
}

fn shell_quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-=:,+@".contains(c))
    {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}
