use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Static reachability analysis for Python codebases.
///
/// code-reach parses a project into a whole-codebase symbol graph, marks
/// everything reachable from the configured entrypoints, and reports the
/// rest as dead-code candidates. Analyzed code is never executed or
/// imported.
#[derive(Parser, Debug)]
#[command(
    name = "code-reach",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the symbol graph, verify it, and mark reachability.
    ///
    /// By default prints a human-readable run summary. With --json, emits
    /// the full serialized graph (deterministic ordering) to stdout.
    Analyze {
        /// Path to the project root to analyze.
        path: PathBuf,

        /// Emit the serialized graph as JSON instead of a summary.
        #[arg(long)]
        json: bool,

        /// Write the serialized graph to a file (summary still printed).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Collapse methods into their owning classes before serializing.
        #[arg(long)]
        simplified: bool,
    },

    /// Explain why a node is reachable: bounded reverse paths to entrypoints.
    Trace {
        /// Fully-qualified node id (e.g. "pkg.mod.Class.method").
        target: String,

        /// Path to the project root to analyze.
        path: PathBuf,

        /// Maximum nodes per path.
        #[arg(long, default_value_t = 25)]
        max_depth: usize,

        /// Maximum number of paths to enumerate.
        #[arg(long, default_value_t = 10)]
        max_paths: usize,

        /// Output paths as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Classify unreachable nodes into likely-dead / uncertain / in-use.
    Dead {
        /// Path to the project root to analyze.
        path: PathBuf,

        /// Output verdicts as JSON.
        #[arg(long)]
        json: bool,

        /// Only print nodes with this verdict (likely-dead, uncertain, in-use).
        #[arg(long)]
        verdict: Option<String>,
    },
}
