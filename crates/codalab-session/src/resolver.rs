//! Session naming.
//!
//! Every CLI invocation belongs to a session. Unless overridden, the session
//! is named after the outermost interactive shell among the invocation's
//! ancestors, so commands typed into the same terminal share a current
//! worksheet while separate terminals stay independent.

use std::sync::OnceLock;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Environment variable that names the session explicitly.
pub const SESSION_ENV: &str = "CODALAB_SESSION";

/// Session used when no shell ancestor is found.
pub const TOP_SESSION: &str = "top";

/// Session used by temporary managers.
pub const TEMPORARY_SESSION: &str = "temporary";

/// Program names treated as interactive shells.
pub const SHELL_NAMES: &[&str] = &["bash", "csh", "zsh"];

/// Maximum number of ancestors inspected.
pub const MAX_DEPTH: usize = 10;

/// Read access to the process table.
pub trait ProcessTable: Send + Sync {
    /// Pid of the running process.
    fn current_pid(&self) -> Option<u32>;

    /// Parent of `pid`, or `None` when it has none or is gone.
    fn parent(&self, pid: u32) -> Option<u32>;

    /// Program name of `pid`, or `None` when it is gone.
    fn name(&self, pid: u32) -> Option<String>;
}

/// Process table backed by the operating system.
pub struct SysinfoProcessTable {
    system: System,
}

impl SysinfoProcessTable {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing(),
        );
        Self { system }
    }
}

impl Default for SysinfoProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SysinfoProcessTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoProcessTable")
            .field("processes", &self.system.processes().len())
            .finish()
    }
}

impl ProcessTable for SysinfoProcessTable {
    fn current_pid(&self) -> Option<u32> {
        sysinfo::get_current_pid().ok().map(|pid| pid.as_u32())
    }

    fn parent(&self, pid: u32) -> Option<u32> {
        self.system
            .process(Pid::from_u32(pid))?
            .parent()
            .map(|p| p.as_u32())
    }

    fn name(&self, pid: u32) -> Option<String> {
        self.system
            .process(Pid::from_u32(pid))
            .map(|p| p.name().to_string_lossy().into_owned())
    }
}

/// Decides the session name for this process. The result is memoized.
pub struct SessionResolver {
    table: Box<dyn ProcessTable>,
    temporary: bool,
    override_name: Option<String>,
    resolved: OnceLock<String>,
}

impl std::fmt::Debug for SessionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionResolver")
            .field("temporary", &self.temporary)
            .field("override_name", &self.override_name)
            .field("resolved", &self.resolved.get())
            .finish()
    }
}

impl SessionResolver {
    /// Create a resolver reading `CODALAB_SESSION` from the environment.
    pub fn new(table: Box<dyn ProcessTable>, temporary: bool) -> Self {
        let override_name = std::env::var(SESSION_ENV).ok();
        Self::with_override(table, temporary, override_name)
    }

    /// Create a resolver with an explicit override instead of the environment.
    pub fn with_override(
        table: Box<dyn ProcessTable>,
        temporary: bool,
        override_name: Option<String>,
    ) -> Self {
        Self {
            table,
            temporary,
            override_name: override_name.filter(|name| !name.is_empty()),
            resolved: OnceLock::new(),
        }
    }

    /// The session name for this process.
    pub fn resolve_session_name(&self) -> &str {
        self.resolved.get_or_init(|| {
            if self.temporary {
                return TEMPORARY_SESSION.to_string();
            }
            if let Some(name) = &self.override_name {
                return name.clone();
            }
            let name = outermost_shell(self.table.as_ref())
                .map(|pid| pid.to_string())
                .unwrap_or_else(|| TOP_SESSION.to_string());
            tracing::debug!(session = %name, "resolved session from process ancestry");
            name
        })
    }
}

/// Walk up from the parent of the current process and return the pid of the
/// last shell seen.
fn outermost_shell(table: &dyn ProcessTable) -> Option<u32> {
    let mut pid = table.parent(table.current_pid()?);
    let mut shell = None;

    for _ in 0..MAX_DEPTH {
        let Some(current) = pid else { break };
        let Some(name) = table.name(current) else { break };
        if SHELL_NAMES.contains(&name.as_str()) {
            shell = Some(current);
        }
        pid = table.parent(current);
    }

    shell
}
