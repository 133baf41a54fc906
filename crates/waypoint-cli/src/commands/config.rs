//! Config command handlers

use anyhow::Result;

use waypoint_core::Config;

use crate::output::{Output, OutputFormat};

/// Show the effective configuration (file, environment and flags applied)
pub fn show(config: &Config, output: &Output) -> Result<()> {
    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "api_port": config.api_port,
                    "offline": config.is_offline(),
                    "base_url": config.base_url(),
                    "request_timeout_ms": config.request_timeout_ms,
                    "import_timeout_ms": config.import_timeout_ms,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.base_url().as_deref().unwrap_or("offline"));
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!(
                "  api_port:           {}{}",
                config.api_port,
                if config.is_offline() { " (offline)" } else { "" }
            );
            println!("  request_timeout_ms: {}", config.request_timeout_ms);
            println!("  import_timeout_ms:  {}", config.import_timeout_ms);
            println!(
                "  log_file:           {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}
