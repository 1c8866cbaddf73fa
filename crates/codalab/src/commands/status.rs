//! Status command - shows the current session, worksheet and credentials.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde::Serialize;

use super::Context;

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Also list credentials for every address
    #[arg(short, long)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
struct StatusOutput {
    home: String,
    session: String,
    address: String,
    worksheet_uuid: Option<String>,
    credentials: Vec<CredentialOutput>,
}

#[derive(Debug, Serialize)]
struct CredentialOutput {
    address: String,
    username: Option<String>,
    expires_in_secs: u64,
    expired: bool,
}

/// Run the status command.
pub fn run(args: StatusArgs, ctx: &Context) -> Result<()> {
    let manager = &ctx.manager;
    let session = manager.session();

    let addresses: Vec<String> = if args.all {
        manager.state().auth.keys().cloned().collect()
    } else {
        vec![session.address.clone()]
    };
    let credentials: Vec<CredentialOutput> = addresses
        .into_iter()
        .filter_map(|address| {
            manager.token_status(&address).map(|status| CredentialOutput {
                address,
                username: status.username,
                expires_in_secs: status.expires_in_secs,
                expired: status.is_expired,
            })
        })
        .collect();

    if ctx.json_output {
        let output = StatusOutput {
            home: manager.home().display().to_string(),
            session: manager.session_name().to_string(),
            address: session.address,
            worksheet_uuid: session.worksheet_uuid,
            credentials,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let green = Style::new().green();
    let yellow = Style::new().yellow();
    let dim = Style::new().dim();

    println!();
    println!("{}", style("CodaLab Status").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    println!("  {} {}", dim.apply_to("Home:"), manager.home().display());
    println!("  {} {}", dim.apply_to("Session:"), manager.session_name());
    println!("  {} {}", dim.apply_to("Address:"), session.address);
    println!(
        "  {} {}",
        dim.apply_to("Worksheet:"),
        session.worksheet_uuid.as_deref().unwrap_or("(home)")
    );
    println!();

    if credentials.is_empty() {
        println!(
            "  {} {}",
            dim.apply_to("Credentials:"),
            yellow.apply_to("○ not logged in")
        );
    }
    for cred in &credentials {
        let state = if cred.expired {
            yellow.apply_to("○ expired".to_string())
        } else {
            let hours = cred.expires_in_secs / 3600;
            let minutes = (cred.expires_in_secs % 3600) / 60;
            green.apply_to(format!("● valid for {}h {}m", hours, minutes))
        };
        println!(
            "  {} {} {}",
            dim.apply_to("Credentials:"),
            state,
            dim.apply_to(format!(
                "({} at {})",
                cred.username.as_deref().unwrap_or("unknown user"),
                cred.address
            ))
        );
    }

    println!();
    Ok(())
}
