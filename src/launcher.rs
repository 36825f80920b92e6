//! Tool registry and child-process launching.

use std::env;
use std::fmt;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::str::FromStr;

use crate::error::LaunchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Restock,
    Enchant,
    Kurast,
}

impl ToolKind {
    /// Launcher order; the first entry is the default selection
    pub const ALL: [ToolKind; 3] = [ToolKind::Kurast, ToolKind::Restock, ToolKind::Enchant];

    pub fn slug(self) -> &'static str {
        match self {
            ToolKind::Restock => "restock",
            ToolKind::Enchant => "enchant",
            ToolKind::Kurast => "kurast",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ToolKind::Restock => "Barter Assistant",
            ToolKind::Enchant => "Enchant Helper",
            ToolKind::Kurast => "Kurast Helper",
        }
    }

    pub fn config_file_name(self) -> &'static str {
        match self {
            ToolKind::Restock => "restock_config.json",
            ToolKind::Enchant => "enchant_config.json",
            ToolKind::Kurast => "kurast_config.json",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ToolKind {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        if wanted == "barter" {
            return Ok(ToolKind::Restock);
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug() == wanted || kind.display_name().to_lowercase() == wanted)
            .ok_or_else(|| LaunchError::UnknownTool(s.trim().to_string()))
    }
}

/// `<exe> run <slug>`, detached from the launcher's stdin
pub fn launch_command(kind: ToolKind, exe: &Path) -> Command {
    let mut command = Command::new(exe);
    command.arg("run").arg(kind.slug()).stdin(Stdio::null());
    command
}

/// Start `kind` in its own process and return without waiting for it
pub fn launch_tool(kind: ToolKind) -> Result<Child, LaunchError> {
    let exe = env::current_exe().map_err(LaunchError::ExecutableNotFound)?;
    let child = launch_command(kind, &exe)
        .spawn()
        .map_err(|source| LaunchError::SpawnFailed {
            tool: kind.display_name(),
            source,
        })?;

    tracing::info!("Launched {} (pid {})", kind, child.id());
    Ok(child)
}
