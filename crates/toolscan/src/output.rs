//! Printing fetched tools.

use anyhow::{Context, Result};

use toolscan_mcp::parse_tools_response;

use crate::OutputFormat;

/// Print the raw tools/list response in the requested format.
pub fn print_tools(raw: &str, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Raw => println!("{}", raw),
        OutputFormat::Json => {
            let tools = parse_tools_response(raw).context("Failed to parse tools response")?;
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }
        OutputFormat::Table => {
            let tools = parse_tools_response(raw).context("Failed to parse tools response")?;
            if tools.is_empty() {
                println!("No tools exposed.");
                return Ok(());
            }

            println!("{:<30} {:<60}", "NAME", "DESCRIPTION");
            println!("{}", "-".repeat(90));
            for tool in &tools {
                let description = tool.description.lines().next().unwrap_or_default();
                println!(
                    "{:<30} {:<60}",
                    truncate(&tool.name, 30),
                    truncate(description, 60)
                );
            }
        }
    }

    Ok(())
}

/// Truncate a string to `max` characters, marking the cut with `...`.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
