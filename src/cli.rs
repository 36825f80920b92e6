//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::launcher::ToolKind;

/// Diablo IV helper tools. Without a command, opens the launcher menu.
#[derive(Parser, Debug)]
#[command(name = "d4-assistant", version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Launch a tool in its own process
    Launch {
        /// restock (barter), enchant or kurast
        #[arg(value_parser = parse_tool)]
        tool: ToolKind,
    },
    /// Run a tool here (press P to stop)
    Run {
        #[arg(value_parser = parse_tool)]
        tool: ToolKind,
    },
    /// Show a tool's config file
    Config {
        #[arg(value_parser = parse_tool)]
        tool: ToolKind,
    },
    /// Show or set the theme
    Theme {
        /// Theme name; several words are joined with spaces
        name: Vec<String>,
    },
    /// Scan once and print what is seen, without clicking
    Check {
        #[arg(value_parser = parse_tool)]
        tool: ToolKind,
        /// Screenshot to scan instead of the live screen
        image: Option<PathBuf>,
    },
    /// Click on screen to set a position or region in a tool's config
    Pick {
        #[arg(value_parser = parse_tool)]
        tool: ToolKind,
        /// Config key, e.g. restock_button or scan_regions
        field: String,
        /// 1-based entry for list fields such as scan_regions
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        index: Option<u32>,
    },
}

impl Command {
    /// Log file name for this invocation
    pub fn log_name(&self) -> &'static str {
        match self {
            Command::Run { tool } => tool.slug(),
            _ => "d4-assistant",
        }
    }
}

/// Joined theme name, `None` when no words were given
pub fn theme_name(words: &[String]) -> Option<String> {
    (!words.is_empty()).then(|| words.join(" "))
}

pub fn parse_tool(name: &str) -> Result<ToolKind, String> {
    name.parse::<ToolKind>().map_err(|e| e.to_string())
}
