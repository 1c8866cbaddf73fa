//! Work command - shows or switches the current worksheet.

use anyhow::Result;
use clap::Args;
use console::Style;

use super::Context;

/// Arguments for the work command.
#[derive(Args, Debug)]
pub struct WorkArgs {
    /// Worksheet to switch to: a name or uuid, optionally prefixed with
    /// `address::` (an alias works as the address)
    pub spec: Option<String>,

    /// Go back to the home worksheet on the current address
    #[arg(long, conflicts_with = "spec")]
    pub reset: bool,
}

/// Run the work command.
pub fn run(args: WorkArgs, ctx: &Context) -> Result<()> {
    let manager = &ctx.manager;
    let green = Style::new().green();

    if args.reset {
        let client = manager.current_client()?;
        manager.set_current_worksheet_uuid(client.as_ref(), "")?;
        let (_, uuid) = manager.get_current_worksheet_uuid()?;
        return report(ctx, "home", client.address(), &uuid);
    }

    match args.spec {
        None => {
            let (client, uuid) = manager.get_current_worksheet_uuid()?;
            report(ctx, "current", client.address(), &uuid)
        }
        Some(spec) => {
            let (client, uuid) = manager.resolve_worksheet_spec(&spec)?;
            manager.set_current_worksheet_uuid(client.as_ref(), &uuid)?;
            tracing::info!(address = %client.address(), %uuid, "switched worksheet");
            if !ctx.json_output {
                print!("{} ", green.apply_to("✓"));
            }
            report(ctx, "switched", client.address(), &uuid)
        }
    }
}

fn report(ctx: &Context, event: &str, address: &str, uuid: &str) -> Result<()> {
    if ctx.json_output {
        println!(
            "{}",
            serde_json::json!({ "event": event, "address": address, "worksheet_uuid": uuid })
        );
    } else {
        match event {
            "switched" => println!("Switched to worksheet {}::{}", address, uuid),
            _ => println!("Currently on worksheet {}::{}", address, uuid),
        }
    }
    Ok(())
}
