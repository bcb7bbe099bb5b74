use smartnotes_core::config::ClientConfig;

use crate::cli::ConfigCommands;
use crate::commands::common::{load_config, resolve_config_path, resolve_db_path, GlobalOptions};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, options: &GlobalOptions) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            api_url,
            timeout_secs,
            probe_interval_secs,
        } => run_config_init(api_url, timeout_secs, probe_interval_secs, options),
        ConfigCommands::Show => run_config_show(options),
    }
}

pub fn run_config_init(
    api_url: Option<String>,
    timeout_secs: Option<u64>,
    probe_interval_secs: Option<u64>,
    options: &GlobalOptions,
) -> Result<(), CliError> {
    let path = resolve_config_path(options.config_path.clone())?;
    let existing = ClientConfig::load_from_path(&path)?;
    let config = merge_config(
        existing,
        api_url,
        timeout_secs,
        probe_interval_secs,
        options,
    );
    config.save_to_path(&path)?;

    println!("Saved config to {}", path.display());
    println!("API base URL: {}", config.api_base_url);
    Ok(())
}

/// Overlay explicit flags on the stored config.
pub fn merge_config(
    mut config: ClientConfig,
    api_url: Option<String>,
    timeout_secs: Option<u64>,
    probe_interval_secs: Option<u64>,
    options: &GlobalOptions,
) -> ClientConfig {
    if let Some(url) = api_url {
        config.api_base_url = url;
    }
    if let Some(secs) = timeout_secs {
        config.request_timeout_secs = secs;
    }
    if let Some(secs) = probe_interval_secs {
        config.probe_interval_secs = secs;
    }
    if let Some(db_path) = options.db_path.clone() {
        config.database_path = Some(db_path);
    }
    config
}

pub fn run_config_show(options: &GlobalOptions) -> Result<(), CliError> {
    let config = load_config(options)?;
    let db_path = resolve_db_path(options.db_path.clone(), &config)?;

    println!("{}", serde_json::to_string_pretty(&config)?);
    println!("database: {}", db_path.display());
    Ok(())
}
