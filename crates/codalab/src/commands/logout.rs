//! Logout command - clears stored credentials.

use anyhow::Result;
use clap::Args;
use console::Style;

use super::Context;

/// Arguments for the logout command.
#[derive(Args, Debug)]
pub struct LogoutArgs {
    /// Address or alias to log out of (default: the current session's address)
    pub address: Option<String>,
}

/// Run the logout command.
pub fn run(args: LogoutArgs, ctx: &Context) -> Result<()> {
    let address = match args.address {
        Some(address) => ctx.manager.apply_alias(&address),
        None => ctx.manager.session().address,
    };

    let had_credentials = ctx.manager.token_status(&address).is_some();
    ctx.manager.logout_address(&address)?;

    if ctx.json_output {
        println!(
            "{}",
            serde_json::json!({ "address": address, "logged_out": had_credentials })
        );
    } else if had_credentials {
        let green = Style::new().green();
        println!("{} Logged out of {}", green.apply_to("✓"), address);
    } else {
        println!("Not logged in to {}", address);
    }

    Ok(())
}
