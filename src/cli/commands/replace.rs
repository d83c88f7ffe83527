use crate::cli::Output;
use crate::utils::text::MultiReplacer;
use anyhow::Result;

/// Execute the replace command
pub fn execute(text: &str, pairs: &[(String, String)], output: &Output) -> Result<()> {
    let replacer = MultiReplacer::new(pairs.iter().map(|(from, to)| (from, to)))?;
    output.verbose(&format!("Applying {} replacement pair(s)", pairs.len()));
    output.result(&replacer.replace(text));
    Ok(())
}
