//! CLI command handlers.

pub mod alias;
pub mod logout;
pub mod session;
pub mod status;
pub mod work;

use codalab_session::CodaLabManager;

/// Shared context for all commands.
#[derive(Debug)]
pub struct Context {
    /// Manager for this invocation.
    pub manager: CodaLabManager,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}
