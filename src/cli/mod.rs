//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod exam;
mod render;
mod run;
mod state;

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::app::{Machine, MachineOptions};
use crate::config::{load_config, merge_cli_overrides, CliOverrides, ClawConfig};
use crate::console::{Level, LogEntry};
use crate::driver::Clock;
use crate::store::{DirStore, StateStore};

pub use exam::ExamAction;
pub use state::{AgentAction, AutomationAction};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Clawdbot - a headless mood machine dashboard
#[derive(Parser)]
#[command(name = "claw")]
#[command(about = "Clawdbot - drive the mood machine dashboard from the terminal")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags accepted by every command
#[derive(Args, Debug, Default, Clone)]
pub struct GlobalArgs {
    /// Configuration file (default: nearest claw.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Store directory (overrides [storage].dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub store: Option<PathBuf>,

    /// Use the reduced-motion frame driver
    #[arg(long, global = true)]
    pub reduced_motion: bool,

    /// Random seed for a reproducible run
    #[arg(long, global = true, value_name = "N")]
    pub seed: Option<u64>,

    /// More diagnostics on stderr (repeatable)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the dashboard indicators
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drop a beacon at a surface position
    Beacon {
        /// Horizontal position in surface units
        #[arg(allow_negative_numbers = true)]
        x: f64,
        /// Vertical position in surface units
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },
    /// Lift the mood and burst particles
    Bloom,
    /// Lower the mood
    Calm,
    /// Clear beacons and particles
    Reset,
    /// Manage agents
    Agent {
        #[command(subcommand)]
        action: AgentAction,
    },
    /// Manage automations
    Automation {
        #[command(subcommand)]
        action: AutomationAction,
    },
    /// Write the state as JSON
    Export {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace the state with a JSON document
    Import {
        /// Input file, or `-` for stdin
        input: Option<PathBuf>,
    },
    /// Run the machine headless, printing console rows
    Run {
        /// How long to run
        #[arg(long, default_value = "10")]
        seconds: u64,

        /// Use a simulated clock and finish immediately
        #[arg(long)]
        simulated: bool,
    },
    /// Render one frame to PNG
    Snapshot {
        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,

        /// Frame timestamp in milliseconds since start
        #[arg(long, default_value = "0")]
        at: f64,

        /// Simulation ticks to run before rendering
        #[arg(long, default_value = "0")]
        ticks: u32,

        /// Drop a bloom in the middle first
        #[arg(long)]
        bloom: bool,
    },
    /// Render an animation to GIF
    Record {
        /// Output GIF file
        #[arg(short, long)]
        output: PathBuf,

        /// Number of frames
        #[arg(long, default_value = "60", value_parser = clap::value_parser!(u32).range(1..=3600))]
        frames: u32,

        /// Frames per second
        #[arg(long, default_value = "30", value_parser = clap::value_parser!(u32).range(1..=60))]
        fps: u32,

        /// Drop a bloom in the middle first
        #[arg(long)]
        bloom: bool,
    },
    /// Browse an exam and keep answers
    Exam {
        #[command(subcommand)]
        action: ExamAction,
    },
}

/// Resolved configuration for one invocation
pub(crate) struct Session {
    pub config: ClawConfig,
    pub store_dir: PathBuf,
}

impl Session {
    /// Load claw.toml (or defaults) and apply the global flags.
    pub fn open(global: &GlobalArgs) -> Result<Self, ExitCode> {
        let mut loaded = match load_config(global.config.as_deref()) {
            Ok(loaded) => loaded,
            Err(e) => {
                eprintln!("Error: {}", e);
                return Err(ExitCode::from(EXIT_INVALID_ARGS));
            }
        };

        let overrides = CliOverrides {
            store: global.store.clone(),
            reduced_motion: global.reduced_motion.then_some(true),
            seed: global.seed,
        };
        merge_cli_overrides(&mut loaded.config, &overrides);

        // --store is relative to the working directory, not to claw.toml
        let store_dir = match &global.store {
            Some(dir) => dir.clone(),
            None => loaded.store_dir(),
        };
        Ok(Self { config: loaded.config, store_dir })
    }

    pub fn open_kv(&self) -> Result<DirStore, ExitCode> {
        DirStore::open(&self.store_dir).map_err(|e| {
            eprintln!("Error: Cannot open store '{}': {}", self.store_dir.display(), e);
            ExitCode::from(EXIT_ERROR)
        })
    }

    pub fn options(&self) -> Result<MachineOptions, ExitCode> {
        self.config.machine_options().map_err(|e| {
            eprintln!("Error: Invalid theme colour: {}", e);
            ExitCode::from(EXIT_INVALID_ARGS)
        })
    }

    /// Build a machine over the on-disk store.
    pub fn machine<C: Clock>(&self, clock: C) -> Result<Machine<DirStore, C>, ExitCode> {
        let store = StateStore::with_key(self.open_kv()?, self.config.storage.key.clone());
        Ok(Machine::new(store, clock, self.options()?))
    }
}

/// One console row for the terminal, coloured by level when `color` is set.
pub(crate) fn format_row(row: &LogEntry, color: bool) -> String {
    let tag = format!("{:<4}", row.level.as_str());
    let tag = if color {
        let code = match row.level {
            Level::Ok => "32",
            Level::Info => "36",
            Level::Warn => "33",
        };
        format!("\x1b[{}m{}\x1b[0m", code, tag)
    } else {
        tag
    };
    format!("{} {} {}", row.time_label(), tag, row.message)
}

pub(crate) fn print_rows<'a>(rows: impl Iterator<Item = &'a LogEntry>) {
    let color = atty::is(atty::Stream::Stdout);
    for row in rows {
        println!("{}", format_row(row, color));
    }
}

/// Print what a command logged and turn save failures into an error exit.
pub(crate) fn finish<C: Clock>(machine: &Machine<DirStore, C>, cursor: u64) -> ExitCode {
    print_rows(machine.console().since(cursor));
    if machine.save_failures() > 0 {
        eprintln!("Error: State could not be saved");
        return ExitCode::from(EXIT_ERROR);
    }
    ExitCode::from(EXIT_SUCCESS)
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    crate::logging::init(cli.global.verbose);

    let session = match Session::open(&cli.global) {
        Ok(session) => session,
        Err(code) => return code,
    };

    match cli.command {
        Commands::Status { json } => state::run_status(&session, json),
        Commands::Beacon { x, y } => state::run_beacon(&session, x, y),
        Commands::Bloom => state::run_bloom(&session),
        Commands::Calm => state::run_calm(&session),
        Commands::Reset => state::run_reset(&session),
        Commands::Agent { action } => state::run_agent(&session, action),
        Commands::Automation { action } => state::run_automation(&session, action),
        Commands::Export { output } => state::run_export(&session, output.as_deref()),
        Commands::Import { input } => state::run_import(&session, input.as_deref()),
        Commands::Run { seconds, simulated } => run::run_headless(&session, seconds, simulated),
        Commands::Snapshot { output, at, ticks, bloom } => {
            render::run_snapshot(&session, &output, at, ticks, bloom)
        }
        Commands::Record { output, frames, fps, bloom } => {
            render::run_record(&session, &output, frames, fps, bloom)
        }
        Commands::Exam { action } => exam::run_exam(&session, action),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["claw", "status", "--seed", "7", "-vv", "--reduced-motion"])
            .unwrap();
        assert_eq!(cli.global.seed, Some(7));
        assert_eq!(cli.global.verbose, 2);
        assert!(cli.global.reduced_motion);
    }

    #[test]
    fn test_beacon_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from(["claw", "beacon", "-5", "12.5"]).unwrap();
        match cli.command {
            Commands::Beacon { x, y } => {
                assert_eq!(x, -5.0);
                assert_eq!(y, 12.5);
            }
            _ => panic!("expected beacon command"),
        }
    }

    #[test]
    fn test_record_rejects_zero_fps() {
        assert!(Cli::try_parse_from(["claw", "record", "-o", "a.gif", "--fps", "0"]).is_err());
    }

    #[test]
    fn test_format_row_plain_and_coloured() {
        let row = LogEntry { at_ms: 0, message: "Calm mode engaged.".into(), level: Level::Info };
        let plain = format_row(&row, false);
        assert!(plain.ends_with(" info Calm mode engaged."));
        let coloured = format_row(&row, true);
        assert!(coloured.contains("\x1b[36minfo\x1b[0m"));
    }
}
