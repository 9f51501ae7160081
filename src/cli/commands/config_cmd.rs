//! config command - Write a starter config or show the effective one

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};

use crate::cli::Context;
use crate::core::config::{
    Config, ConfigFile, EngineTuning, LocalConfig, Mode, RemoteConfig, WorkingCopyConfig,
    DEFAULT_PUBLISH_RETRIES,
};
use crate::ui::output;

/// Write a starter config file atomically.
pub fn init(
    ctx: &Context,
    path: Option<PathBuf>,
    url: Option<String>,
    clone_dir: Option<PathBuf>,
    local_only: bool,
    force: bool,
) -> Result<()> {
    let path = match path {
        Some(p) => p,
        None => Config::default_path()?,
    };
    if path.exists() && !force {
        bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    let file = if local_only {
        ConfigFile {
            mode: Some(Mode::LocalOnly),
            local: Some(LocalConfig {
                output_dir: Some(PathBuf::from("output")),
            }),
            ..Default::default()
        }
    } else {
        let Some(url) = url else {
            bail!("--url is required unless --local-only is given");
        };
        ConfigFile {
            mode: Some(Mode::Versioned),
            remote: Some(RemoteConfig {
                url: Some(url),
                branch: Some("main".to_string()),
                ..Default::default()
            }),
            working_copy: Some(WorkingCopyConfig {
                clone_dir: Some(clone_dir.unwrap_or_else(|| PathBuf::from("content-repo"))),
                ..Default::default()
            }),
            engine: Some(EngineTuning {
                lock_timeout_ms: Some(15_000),
                publish_retries: Some(DEFAULT_PUBLISH_RETRIES),
            }),
            ..Default::default()
        }
    };

    file.validate().context("Generated config is invalid")?;
    Config::write_atomic(&path, &file)?;
    output::success(format!("Wrote {}", path.display()), ctx.verbosity);
    Ok(())
}

/// Print the effective configuration as TOML.
pub fn show(ctx: &Context) -> Result<()> {
    match ctx.config.path() {
        Some(path) => output::print(format!("# {}", path.display()), ctx.verbosity),
        None => output::print("# no config file found; defaults", ctx.verbosity),
    }
    let text = toml::to_string_pretty(&ctx.config.file).context("Failed to encode config")?;
    print!("{}", text);
    Ok(())
}
