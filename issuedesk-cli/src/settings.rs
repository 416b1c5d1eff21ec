use crate::context::CommandContext;
use crate::display;
use crate::error::CliResult;
use std::collections::BTreeMap;

/// Print the effective configuration
pub fn show_settings(context: &CommandContext) -> CliResult<()> {
    let entries = context.config.entries();
    let data: BTreeMap<&str, String> = entries.iter().cloned().collect();
    let message = format!("{} settings", entries.len());
    context.emit(data, message, |_| display::settings_table(entries));
    Ok(())
}
