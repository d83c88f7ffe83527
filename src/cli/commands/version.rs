//! Version command implementation

use crate::cli::Output;
use anyhow::Result;

/// Execute the version command
pub fn execute(output: &Output) -> Result<()> {
    if output.is_quiet() {
        output.result(crate::VERSION);
        return Ok(());
    }

    output.header("utilp Version Information");
    output.key_value("Version:", &format!("{} v{}", crate::PKG_NAME, crate::VERSION), true);
    output.key_value("Description:", crate::PKG_DESCRIPTION, false);
    output.key_value("Repository:", env!("CARGO_PKG_REPOSITORY"), false);

    output.category("Build Information");
    output.key_value("Rust edition:", "2024", false);
    output.key_value("Target:", std::env::consts::ARCH, false);
    output.key_value(
        "Profile:",
        if cfg!(debug_assertions) { "debug" } else { "release" },
        false,
    );
    output.blank_line();
    Ok(())
}
