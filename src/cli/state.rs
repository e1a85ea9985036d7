//! Dashboard state commands (status, actions, agents, automations, transfer)

use clap::Subcommand;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;

use crate::app::{Machine, PointerTarget};
use crate::driver::SystemClock;
use crate::models::AutomationKind;
use crate::output::write_text;
use crate::store::DirStore;

use super::{finish, print_rows, Session, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

#[derive(Subcommand)]
pub enum AgentAction {
    /// Add an agent
    Add {
        /// Agent name
        name: String,

        /// Agent role
        #[arg(long, default_value = "operator")]
        role: String,
    },
    /// Remove the agent at a list position (0-based)
    Remove { index: usize },
    /// List agents
    List,
}

#[derive(Subcommand)]
pub enum AutomationAction {
    /// Add an automation
    Add {
        /// Automation name
        name: String,

        /// What makes it fire
        #[arg(long, value_enum, default_value = "timer")]
        kind: AutomationKind,

        /// Free-text data; the interval for timers (e.g. 10s, 2m)
        #[arg(long, default_value = "")]
        data: String,
    },
    /// Remove the automation at a list position (0-based)
    Remove { index: usize },
    /// List automations
    List,
}

type DiskMachine = Machine<DirStore, SystemClock>;

/// Open the machine and run `action` against it, printing what it logged.
fn with_machine(session: &Session, action: impl FnOnce(&mut DiskMachine)) -> ExitCode {
    let mut machine = match session.machine(SystemClock) {
        Ok(m) => m,
        Err(code) => return code,
    };
    let cursor = machine.console().pushed();
    action(&mut machine);
    finish(&machine, cursor)
}

/// Execute the status command
pub fn run_status(session: &Session, json: bool) -> ExitCode {
    let machine = match session.machine(SystemClock) {
        Ok(m) => m,
        Err(code) => return code,
    };
    let kpis = machine.kpis();
    let record = machine.record();

    if json {
        let value = serde_json::json!({
            "beacons": kpis.beacons,
            "drift": kpis.drift.as_str(),
            "mood": kpis.mood.as_str(),
            "moodValue": record.mood,
            "driftValue": record.drift,
            "agents": record.agents.len(),
            "automations": record.automations.len(),
            "clock": machine.clock_label(),
        });
        match serde_json::to_string_pretty(&value) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
        return ExitCode::from(EXIT_SUCCESS);
    }

    println!("Beacons      {}", kpis.beacons);
    println!("Drift        {} ({:.2})", kpis.drift, record.drift);
    println!("Mood         {} ({:.2})", kpis.mood, record.mood);
    println!("Agents       {}", record.agents.len());
    println!("Automations  {}", record.automations.len());
    println!("Clock        {}", machine.clock_label());
    ExitCode::from(EXIT_SUCCESS)
}

/// Execute the beacon command
pub fn run_beacon(session: &Session, x: f64, y: f64) -> ExitCode {
    if !x.is_finite() || !y.is_finite() {
        eprintln!("Error: Beacon position must be finite");
        return ExitCode::from(EXIT_INVALID_ARGS);
    }
    with_machine(session, |m| {
        m.pointer_down(x, y, PointerTarget::Surface);
    })
}

pub fn run_bloom(session: &Session) -> ExitCode {
    with_machine(session, |m| m.bloom())
}

pub fn run_calm(session: &Session) -> ExitCode {
    with_machine(session, |m| m.calm())
}

pub fn run_reset(session: &Session) -> ExitCode {
    with_machine(session, |m| m.reset())
}

/// Execute an agent subcommand
pub fn run_agent(session: &Session, action: AgentAction) -> ExitCode {
    match action {
        AgentAction::Add { name, role } => {
            if name.trim().is_empty() {
                eprintln!("Error: Agent name must not be blank");
                return ExitCode::from(EXIT_INVALID_ARGS);
            }
            with_machine(session, |m| {
                m.add_agent(&name, &role);
            })
        }
        AgentAction::Remove { index } => {
            let mut removed = None;
            let code = with_machine(session, |m| removed = m.remove_agent(index));
            if removed.is_none() {
                eprintln!("Error: No agent at index {}", index);
                return ExitCode::from(EXIT_ERROR);
            }
            code
        }
        AgentAction::List => {
            let machine = match session.machine(SystemClock) {
                Ok(m) => m,
                Err(code) => return code,
            };
            if machine.record().agents.is_empty() {
                println!("No agents.");
            }
            for (i, agent) in machine.record().agents.iter().enumerate() {
                println!("{:>3}  {}  {}", i, agent.name, agent.role);
            }
            ExitCode::from(EXIT_SUCCESS)
        }
    }
}

/// Execute an automation subcommand
pub fn run_automation(session: &Session, action: AutomationAction) -> ExitCode {
    match action {
        AutomationAction::Add { name, kind, data } => {
            if name.trim().is_empty() {
                eprintln!("Error: Automation name must not be blank");
                return ExitCode::from(EXIT_INVALID_ARGS);
            }
            if kind == AutomationKind::Timer {
                if let Err(e) = data.trim().parse::<crate::automation::Interval>() {
                    // Stored anyway; it simply never fires
                    eprintln!("Warning: Timer data '{}' will never fire: {}", data, e);
                }
            }
            with_machine(session, |m| {
                m.add_automation(&name, kind, &data);
            })
        }
        AutomationAction::Remove { index } => {
            let mut removed = None;
            let code = with_machine(session, |m| removed = m.remove_automation(index));
            if removed.is_none() {
                eprintln!("Error: No automation at index {}", index);
                return ExitCode::from(EXIT_ERROR);
            }
            code
        }
        AutomationAction::List => {
            let machine = match session.machine(SystemClock) {
                Ok(m) => m,
                Err(code) => return code,
            };
            if machine.record().automations.is_empty() {
                println!("No automations.");
            }
            for (i, a) in machine.record().automations.iter().enumerate() {
                println!("{:>3}  {}  {}  {}", i, a.name, a.kind, a.data);
            }
            ExitCode::from(EXIT_SUCCESS)
        }
    }
}

/// Execute the export command
pub fn run_export(session: &Session, output: Option<&Path>) -> ExitCode {
    let mut machine = match session.machine(SystemClock) {
        Ok(m) => m,
        Err(code) => return code,
    };
    let text = match machine.export() {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: Cannot serialize state: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = write_text(&text, path) {
                eprintln!("Error: Cannot write '{}': {}", path.display(), e);
                return ExitCode::from(EXIT_ERROR);
            }
            eprintln!("Exported to {}", path.display());
        }
        None => println!("{}", text),
    }
    ExitCode::from(EXIT_SUCCESS)
}

/// Execute the import command
pub fn run_import(session: &Session, input: Option<&Path>) -> ExitCode {
    let text = match input {
        Some(path) if path != Path::new("-") => match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("Error: Cannot open input file '{}': {}", path.display(), e);
                return ExitCode::from(EXIT_INVALID_ARGS);
            }
        },
        _ => {
            if input.is_none() && atty::is(atty::Stream::Stdin) {
                eprintln!("Error: No input. Pass a file or pipe JSON on stdin");
                return ExitCode::from(EXIT_INVALID_ARGS);
            }
            let mut buf = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut buf) {
                eprintln!("Error: Cannot read stdin: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
            buf
        }
    };

    let mut machine = match session.machine(SystemClock) {
        Ok(m) => m,
        Err(code) => return code,
    };
    let cursor = machine.console().pushed();
    match machine.import(&text) {
        Ok(()) => finish(&machine, cursor),
        Err(e) => {
            print_rows(machine.console().since(cursor));
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
