//! Implementation of the `maestro init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::adapters::sqlite::{database_url, initialize_database, PoolConfig, SqliteAgentRepository};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::PROJECT_DIR;
use crate::services::seed_builtin_agents;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub config_written: bool,
    pub database_path: PathBuf,
    pub agents_seeded: usize,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if self.config_written {
            lines.push(format!("\nWrote {PROJECT_DIR}/config.yaml"));
        }
        lines.push(format!("Database ready at {}", self.database_path.display()));
        if self.agents_seeded > 0 {
            lines.push(format!("Seeded {} built-in agent(s)", self.agents_seeded));
        }
        lines.join("\n")
    }
}

fn resolve_database_path(root: &Path, configured: &str) -> PathBuf {
    let path = Path::new(configured);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

pub async fn execute(args: InitArgs, config: &Config, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };

    let project_dir = target_path.join(PROJECT_DIR);
    fs::create_dir_all(&project_dir)
        .await
        .with_context(|| format!("Failed to create {}", project_dir.display()))?;

    let config_path = project_dir.join("config.yaml");
    let config_written = args.force || !config_path.exists();
    if config_written {
        let yaml = serde_yaml::to_string(&Config::default()).context("Failed to serialize default configuration")?;
        fs::write(&config_path, yaml)
            .await
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
    }

    let database_path = resolve_database_path(&target_path, &config.database.path);
    let pool = initialize_database(
        &database_url(&database_path.to_string_lossy()),
        Some(PoolConfig::from(&config.database)),
    )
    .await
    .context("Failed to initialize database")?;

    let agents_seeded = seed_builtin_agents(&SqliteAgentRepository::new(pool))
        .await
        .context("Failed to seed built-in agents")?;

    let output_data = InitOutput {
        success: true,
        message: format!("Maestro project initialized in {}", target_path.display()),
        initialized_path: target_path,
        config_written,
        database_path,
        agents_seeded,
    };
    output(&output_data, json_mode);
    Ok(())
}
