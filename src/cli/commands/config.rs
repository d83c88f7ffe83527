//! Configuration command implementations

use crate::cli::Output;
use crate::config::UtilpConfig;
use anyhow::Result;

/// Print the merged configuration
pub fn show(config: &UtilpConfig, json: bool, output: &Output) -> Result<()> {
    if json {
        let value = config.get_full_config()?;
        output.result(&serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let settings = config.settings()?;
    output.header("Current Configuration");
    if let Some(user_config) = UtilpConfig::user_config_path() {
        output.key_value(
            "User config:",
            &user_config.display().to_string(),
            user_config.exists(),
        );
    }
    output.key_value(
        "Log file:",
        &settings.logging.to_logger_config().log_file().display().to_string(),
        false,
    );
    output.blank_line();
    output.result(toml::to_string_pretty(&settings)?.trim_end());
    Ok(())
}
