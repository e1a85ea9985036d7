//! Exam viewer commands

use clap::Subcommand;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::exam::{render_item, resolve_deep_link, AnswerSheet, ExamDocument, InputKind, Navigator};
use crate::store::DirStore;

use super::{Session, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

#[derive(Subcommand)]
pub enum ExamAction {
    /// Show one item with its saved answer
    Show {
        /// Exam document (JSON)
        file: PathBuf,

        /// Item id
        #[arg(long, conflicts_with_all = ["n", "link"])]
        item: Option<String>,

        /// One-based item number
        #[arg(long, conflicts_with = "link")]
        n: Option<usize>,

        /// Deep-link fragment, e.g. "#item=q1a" or "#n=3"
        #[arg(long)]
        link: Option<String>,
    },
    /// Save an answer
    Answer {
        /// Exam document (JSON)
        file: PathBuf,
        /// Item id
        id: String,
        /// Answer text, or the option key for multiple choice
        value: String,
    },
    /// Forget every saved answer
    Clear,
}

fn load(file: &Path) -> Result<ExamDocument, ExitCode> {
    ExamDocument::load(file).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::from(EXIT_INVALID_ARGS)
    })
}

fn sheet(session: &Session) -> Result<AnswerSheet<DirStore>, ExitCode> {
    Ok(AnswerSheet::open(session.open_kv()?, session.config.storage.answers_key.clone()))
}

/// Execute an exam subcommand
pub fn run_exam(session: &Session, action: ExamAction) -> ExitCode {
    match action {
        ExamAction::Show { file, item, n, link } => {
            run_show(session, &file, item.as_deref(), n, link.as_deref())
        }
        ExamAction::Answer { file, id, value } => run_answer(session, &file, &id, &value),
        ExamAction::Clear => {
            let mut sheet = match sheet(session) {
                Ok(s) => s,
                Err(code) => return code,
            };
            if let Err(e) = sheet.clear() {
                eprintln!("Error: Cannot clear answers: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
            println!("Answers cleared.");
            ExitCode::from(EXIT_SUCCESS)
        }
    }
}

fn run_show(
    session: &Session,
    file: &Path,
    item: Option<&str>,
    n: Option<usize>,
    link: Option<&str>,
) -> ExitCode {
    let doc = match load(file) {
        Ok(doc) => doc,
        Err(code) => return code,
    };

    let fragment = match (item, n, link) {
        (Some(id), _, _) => Some(format!("item={}", urlencoding::encode(id))),
        (_, Some(k), _) => Some(format!("n={}", k)),
        (_, _, Some(link)) => Some(link.to_string()),
        _ => None,
    };

    let mut nav = Navigator::new(doc.items.len());
    if let Some(fragment) = &fragment {
        match resolve_deep_link(fragment, &doc) {
            Some(index) => {
                nav.select(index);
            }
            None => {
                eprintln!("Error: No item matches '{}'", fragment);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    }

    let sheet = match sheet(session) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let current = &doc.items[nav.index()];
    let asset_dir = file.parent().unwrap_or(Path::new(""));

    if let Some(title) = &doc.title {
        println!("{}", title);
    }
    println!("{}", nav.label());
    println!();
    print!("{}", render_item(current, sheet.get(&current.id).as_deref(), asset_dir));

    let prev = nav.has_prev().then(|| doc.items[nav.index() - 1].id.as_str());
    let next = nav.has_next().then(|| doc.items[nav.index() + 1].id.as_str());
    if prev.is_some() || next.is_some() {
        println!();
    }
    if let Some(id) = prev {
        println!("Previous: {}", id);
    }
    if let Some(id) = next {
        println!("Next: {}", id);
    }
    ExitCode::from(EXIT_SUCCESS)
}

fn run_answer(session: &Session, file: &Path, id: &str, value: &str) -> ExitCode {
    let doc = match load(file) {
        Ok(doc) => doc,
        Err(code) => return code,
    };
    let item = match doc.item(id) {
        Ok(item) => item,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if item.input_type == InputKind::Mcq && !item.options.iter().any(|o| o.key == value) {
        let keys: Vec<&str> = item.options.iter().map(|o| o.key.as_str()).collect();
        let expected = keys.join(", ");
        eprintln!("Error: '{}' is not an option of {} (expected one of: {})", value, id, expected);
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let mut sheet = match sheet(session) {
        Ok(s) => s,
        Err(code) => return code,
    };
    if let Err(e) = sheet.set(id, value) {
        eprintln!("Error: Cannot save answer: {}", e);
        return ExitCode::from(EXIT_ERROR);
    }
    println!("Saved answer for {}.", id);
    ExitCode::from(EXIT_SUCCESS)
}
