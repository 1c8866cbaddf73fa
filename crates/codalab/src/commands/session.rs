//! Session command - shows which session this shell belongs to.

use anyhow::Result;
use clap::Args;
use console::Style;
use serde::Serialize;

use super::Context;

/// Arguments for the session command.
#[derive(Args, Debug)]
pub struct SessionArgs {}

#[derive(Debug, Serialize)]
struct SessionOutput<'a> {
    name: &'a str,
    address: String,
    worksheet_uuid: Option<String>,
}

/// Run the session command.
pub fn run(_args: SessionArgs, ctx: &Context) -> Result<()> {
    let name = ctx.manager.session_name();

    if ctx.json_output {
        let entry = ctx.manager.session();
        let output = SessionOutput {
            name,
            address: entry.address,
            worksheet_uuid: entry.worksheet_uuid,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if ctx.verbose {
        let entry = ctx.manager.session();
        let dim = Style::new().dim();
        println!("{}", name);
        println!("  {} {}", dim.apply_to("Address:"), entry.address);
        println!(
            "  {} {}",
            dim.apply_to("Worksheet:"),
            entry.worksheet_uuid.as_deref().unwrap_or("(home)")
        );
    } else {
        println!("{}", name);
    }

    Ok(())
}
