//! Alias command - manages short names for service addresses.

use anyhow::{Result, bail};
use clap::Args;
use console::Style;

use super::Context;

/// Arguments for the alias command.
#[derive(Args, Debug)]
pub struct AliasArgs {
    /// Alias name (omit to list all aliases)
    pub name: Option<String>,

    /// Address the alias should point to
    pub address: Option<String>,

    /// Remove the alias
    #[arg(short, long, requires = "name", conflicts_with = "address")]
    pub remove: bool,
}

/// Run the alias command.
pub fn run(args: AliasArgs, ctx: &Context) -> Result<()> {
    let manager = &ctx.manager;
    let green = Style::new().green();

    match (args.name, args.address) {
        (None, _) => {
            let aliases = manager.config().aliases.clone();
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&aliases)?);
                return Ok(());
            }
            let dim = Style::new().dim();
            let width = aliases.keys().map(String::len).max().unwrap_or(0);
            for (name, address) in &aliases {
                println!("{:width$}  {}", name, dim.apply_to(address), width = width);
            }
        }
        (Some(name), _) if args.remove => {
            manager.remove_alias(&name)?;
            println!("{} Removed alias {}", green.apply_to("✓"), name);
        }
        (Some(name), Some(address)) => {
            manager.set_alias(&name, &address)?;
            println!("{} {} -> {}", green.apply_to("✓"), name, address);
        }
        (Some(name), None) => {
            let address = manager.config().aliases.get(&name).cloned();
            match address {
                Some(address) => println!("{}", address),
                None => bail!("Alias not found: {}", name),
            }
        }
    }

    Ok(())
}
