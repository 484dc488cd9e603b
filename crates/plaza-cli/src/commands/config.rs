use std::path::Path;

use plaza_core::config::ClientConfig;
use plaza_core::util::normalize_text_option;

use crate::cli::{ConfigCommands, OverlapArg};
use crate::commands::common::{load_config, print_json, resolve_config_path};
use crate::error::CliError;

pub fn run_config(
    command: ConfigCommands,
    config_path: Option<&Path>,
    data_dir: Option<&Path>,
) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            latency_ms,
            overlap,
            default_email,
        } => run_config_init(config_path, data_dir, latency_ms, overlap, default_email),
        ConfigCommands::Show => {
            let config = load_config(config_path, data_dir)?;
            print_json(&config)
        }
    }
}

#[allow(clippy::needless_pass_by_value)]
pub fn run_config_init(
    config_path: Option<&Path>,
    data_dir: Option<&Path>,
    latency_ms: Option<u64>,
    overlap: Option<OverlapArg>,
    default_email: Option<String>,
) -> Result<(), CliError> {
    let path = resolve_config_path(config_path)?;
    let mut config = ClientConfig::load_from_path(&path)?;

    if let Some(latency_ms) = latency_ms {
        config.latency_ms = latency_ms;
    }
    if let Some(dir) = data_dir {
        config.data_dir = Some(dir.to_path_buf());
    }
    if let Some(overlap) = overlap {
        config.overlap = overlap.into();
    }
    if let Some(email) = normalize_text_option(default_email) {
        if !email.contains('@') {
            return Err(CliError::Config(format!(
                "default email '{email}' is not an email address"
            )));
        }
        config.default_email = Some(email);
    }

    config.save_to_path(&path)?;
    println!("Saved config to {}", path.display());
    Ok(())
}
