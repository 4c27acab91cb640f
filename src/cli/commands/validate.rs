//! Validate config command implementation
//!
//! This module implements the `validate-config` command. Loading already
//! validates; on success the effective settings are printed.

use crate::adapters::storage::RemoteCredentials;
use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug, Default)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2);
            }
        };

        if config.use_nextcloud {
            if let Err(e) = RemoteCredentials::from_env() {
                println!("❌ Remote storage selected but credentials are incomplete");
                println!("   Error: {e}");
                println!();
                return Ok(2);
            }
        }

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Tool: {} ({})", config.tool.name, config.tool.command);
        println!("  Input Dir: {}", config.input_dir.display());
        println!("  Input Globs: {:?}", config.input_globs);
        println!("  Output Dir: {}", config.output_dir.display());
        println!("  Provenance Dir: {}", config.provenance_dir.display());
        println!("  Work Dir: {}", config.work_dir.display());
        match &config.summary_dir {
            Some(dir) if config.summary.enabled => println!("  Summary Dir: {}", dir.display()),
            _ => println!("  Summary: disabled"),
        }
        println!("  Scan Interval: {}s", config.scan_interval_seconds);
        println!(
            "  Storage: {}",
            if config.use_nextcloud { "remote" } else { "local" }
        );
        if config.use_slurm {
            println!(
                "  Executor: array (partition {}, width {})",
                config.slurm_params.partition, config.slurm_params.array_parallelism
            );
        } else {
            println!("  Executor: sequential");
        }
        println!("  Log Level: {}", config.log_level);
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_validate_reports_invalid_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("provflow.json");
        std::fs::write(&path, r#"{ "input_dir": "/in" }"#).unwrap();

        let code = ValidateArgs::default()
            .execute(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_validate_accepts_minimal_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("provflow.json");
        std::fs::write(
            &path,
            r#"{
                "input_dir": "/in",
                "output_dir": "/out",
                "provenance_dir": "/prov",
                "work_dir": "/work",
                "tool": { "name": "genoflu", "command": "genoflu.py", "output_pattern": "{sample}*.tsv" }
            }"#,
        )
        .unwrap();

        let code = ValidateArgs::default()
            .execute(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 0);
    }
}
