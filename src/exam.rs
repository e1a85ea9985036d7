//! Exam viewer: document model, answer sheet, navigation and deep links
//!
//! An exam is a static JSON document of items. Answers are kept in one JSON
//! object under their own storage slot, one `ans_<id>` entry per item, and
//! written through on every change.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::store::{KvStore, StoreError};

/// Slot holding the answers of the bundled paper
pub const ANSWERS_KEY: &str = "jan2021_4BI1_1B_answers_v1";

/// Errors from loading an exam or saving its answers
#[derive(Debug, Error)]
pub enum ExamError {
    #[error("failed to read exam '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid exam document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("exam has no items")]
    Empty,
    #[error("no item with id '{0}'")]
    UnknownItem(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How an item takes its answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// Single choice between lettered options
    Mcq,
    /// One-line answer
    Text,
    /// Free-form answer; also used for any unrecognised input type
    #[default]
    #[serde(other)]
    Long,
}

/// One lettered choice of a multiple-choice item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamOption {
    pub key: String,
    pub text: String,
}

/// One question or question part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamItem {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub prompt: Vec<String>,
    #[serde(default)]
    pub input_type: InputKind,
    #[serde(default)]
    pub options: Vec<ExamOption>,
    #[serde(default)]
    pub marks: Option<u32>,
    #[serde(default)]
    pub source_pages: Vec<u32>,
}

impl ExamItem {
    /// `(m)` when the item carries marks, empty otherwise
    pub fn marks_label(&self) -> String {
        self.marks.map(|m| format!("({})", m)).unwrap_or_default()
    }

    /// Short heading: the label, else the title, else nothing
    pub fn heading(&self) -> &str {
        self.label.as_deref().or(self.title.as_deref()).unwrap_or("")
    }
}

/// A whole paper
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExamDocument {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub items: Vec<ExamItem>,
}

impl ExamDocument {
    pub fn from_json(text: &str) -> Result<Self, ExamError> {
        let doc: ExamDocument = serde_json::from_str(text)?;
        if doc.items.is_empty() {
            return Err(ExamError::Empty);
        }
        Ok(doc)
    }

    pub fn load(path: &Path) -> Result<Self, ExamError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ExamError::Io { path: path.to_path_buf(), source })?;
        Self::from_json(&text)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn item(&self, id: &str) -> Result<&ExamItem, ExamError> {
        self.position(id)
            .map(|i| &self.items[i])
            .ok_or_else(|| ExamError::UnknownItem(id.to_string()))
    }
}

/// Saved answers for one paper
#[derive(Debug)]
pub struct AnswerSheet<S: KvStore> {
    kv: S,
    key: String,
    answers: Map<String, Value>,
}

fn answer_slot(id: &str) -> String {
    format!("ans_{}", id)
}

impl<S: KvStore> AnswerSheet<S> {
    /// Read the sheet stored under `key`. Unreadable content starts empty.
    pub fn open(kv: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let answers = match kv.get(&key) {
            Ok(Some(text)) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    warn!(%key, "answer sheet unreadable, starting empty");
                    Map::new()
                }
            },
            Ok(None) => Map::new(),
            Err(e) => {
                warn!(%key, error = %e, "answer sheet could not be read, starting empty");
                Map::new()
            }
        };
        Self { kv, key, answers }
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Answer recorded for item `id`
    pub fn get(&self, id: &str) -> Option<String> {
        match self.answers.get(&answer_slot(id))? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Record an answer and write the sheet through.
    pub fn set(&mut self, id: &str, value: &str) -> Result<(), StoreError> {
        self.answers.insert(answer_slot(id), Value::String(value.to_string()));
        self.save()
    }

    /// Forget every answer.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.answers.clear();
        self.save()
    }

    fn save(&mut self) -> Result<(), StoreError> {
        let blob = serde_json::to_string(&self.answers)?;
        self.kv.set(&self.key, &blob)
    }
}

/// Position within an item list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigator {
    index: usize,
    len: usize,
}

impl Navigator {
    pub fn new(len: usize) -> Self {
        Self { index: 0, len }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn has_prev(&self) -> bool {
        self.index > 0
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.len
    }

    pub fn prev(&mut self) -> bool {
        if self.has_prev() {
            self.index -= 1;
            true
        } else {
            false
        }
    }

    pub fn next(&mut self) -> bool {
        if self.has_next() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index < self.len {
            self.index = index;
            true
        } else {
            false
        }
    }

    /// `Item i / n`, one-based
    pub fn label(&self) -> String {
        format!("Item {} / {}", self.index + 1, self.len)
    }
}

fn item_param() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?:^|&)item=([^&]+)").expect("item pattern is valid"))
}

fn number_param() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?:^|&)n=(\d+)").expect("number pattern is valid"))
}

/// Item index selected by a `#item=<id>` or `#n=<k>` fragment.
///
/// When `item=` is present it decides alone: an unknown id selects nothing.
/// Otherwise `n=` selects the one-based item `k` when it is in range.
pub fn resolve_deep_link(fragment: &str, doc: &ExamDocument) -> Option<usize> {
    let fragment = fragment.trim_start_matches('#');
    if fragment.is_empty() {
        return None;
    }

    if let Some(caps) = item_param().captures(fragment) {
        let id = urlencoding::decode(&caps[1]).ok()?;
        return doc.position(&id);
    }

    let caps = number_param().captures(fragment)?;
    let n: usize = caps[1].parse().ok()?;
    (1..=doc.items.len()).contains(&n).then(|| n - 1)
}

/// Image of a scanned source page, e.g. `pages/page-03.png`
pub fn source_page_path(asset_dir: &Path, page: u32) -> PathBuf {
    asset_dir.join("pages").join(format!("page-{:02}.png", page))
}

/// Plain-text rendition of one item with its current answer.
pub fn render_item(item: &ExamItem, answer: Option<&str>, asset_dir: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", item.title.as_deref().unwrap_or("Question"));

    let heading = item.heading();
    let marks = item.marks_label();
    match (heading.is_empty(), marks.is_empty()) {
        (true, true) => {}
        (false, true) => {
            let _ = writeln!(out, "{}", heading);
        }
        (true, false) => {
            let _ = writeln!(out, "{}", marks);
        }
        (false, false) => {
            let _ = writeln!(out, "{}  {}", heading, marks);
        }
    }
    out.push('\n');

    for line in &item.prompt {
        let _ = writeln!(out, "{}", line);
    }
    if !item.prompt.is_empty() {
        out.push('\n');
    }

    match item.input_type {
        InputKind::Mcq => {
            for option in &item.options {
                let mark = if answer == Some(option.key.as_str()) { "(*)" } else { "( )" };
                let _ = writeln!(out, "{} {}  {}", mark, option.key, option.text);
            }
        }
        InputKind::Text | InputKind::Long => {
            let _ = writeln!(out, "Answer: {}", answer.unwrap_or(""));
        }
    }

    if !item.source_pages.is_empty() {
        out.push('\n');
        for page in &item.source_pages {
            let _ = writeln!(
                out,
                "Page {}: {}",
                page,
                source_page_path(asset_dir, *page).display()
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const DOC: &str = r#"{
        "title": "Paper 1B",
        "items": [
            {"id": "q1a", "label": "1(a)", "prompt": ["Which organ pumps blood?"],
             "inputType": "mcq", "marks": 1, "sourcePages": [2, 3],
             "options": [{"key": "A", "text": "Lung"}, {"key": "B", "text": "Heart"}]},
            {"id": "q1 b", "title": "Question 1", "inputType": "text"},
            {"id": "q2", "inputType": "essay", "prompt": ["Explain."], "marks": 6}
        ]
    }"#;

    fn doc() -> ExamDocument {
        ExamDocument::from_json(DOC).unwrap()
    }

    #[test]
    fn test_parse_document() {
        let d = doc();
        assert_eq!(d.title.as_deref(), Some("Paper 1B"));
        assert_eq!(d.items.len(), 3);
        assert_eq!(d.items[0].input_type, InputKind::Mcq);
        assert_eq!(d.items[0].source_pages, vec![2, 3]);
        assert_eq!(d.items[1].input_type, InputKind::Text);
        // Unknown input types become long answers
        assert_eq!(d.items[2].input_type, InputKind::Long);
    }

    #[test]
    fn test_empty_or_invalid_document() {
        assert!(matches!(ExamDocument::from_json(r#"{"items": []}"#), Err(ExamError::Empty)));
        assert!(matches!(ExamDocument::from_json("nope"), Err(ExamError::Parse(_))));
        assert!(matches!(doc().item("zz"), Err(ExamError::UnknownItem(_))));
    }

    #[test]
    fn test_marks_and_heading() {
        let d = doc();
        assert_eq!(d.items[0].marks_label(), "(1)");
        assert_eq!(d.items[1].marks_label(), "");
        assert_eq!(d.items[0].heading(), "1(a)");
        assert_eq!(d.items[1].heading(), "Question 1");
        assert_eq!(d.items[2].heading(), "");
    }

    #[test]
    fn test_navigation_bounds() {
        let mut nav = Navigator::new(3);
        assert_eq!(nav.label(), "Item 1 / 3");
        assert!(!nav.prev());
        assert!(nav.next());
        assert!(nav.next());
        assert!(!nav.next());
        assert_eq!(nav.label(), "Item 3 / 3");
        assert!(!nav.has_next());
        assert!(!nav.select(3));
        assert!(nav.select(0));
        assert!(!nav.has_prev());
    }

    #[test]
    fn test_deep_link_item() {
        let d = doc();
        assert_eq!(resolve_deep_link("#item=q2", &d), Some(2));
        assert_eq!(resolve_deep_link("item=q1%20b", &d), Some(1));
        assert_eq!(resolve_deep_link("#item=q2&n=1", &d), Some(2));
        // An unknown item does not fall back to n=
        assert_eq!(resolve_deep_link("#item=nope&n=2", &d), None);
    }

    #[test]
    fn test_deep_link_number() {
        let d = doc();
        assert_eq!(resolve_deep_link("#n=1", &d), Some(0));
        assert_eq!(resolve_deep_link("#n=3", &d), Some(2));
        assert_eq!(resolve_deep_link("#n=0", &d), None);
        assert_eq!(resolve_deep_link("#n=4", &d), None);
        assert_eq!(resolve_deep_link("#x=1&n=2", &d), Some(1));
        assert_eq!(resolve_deep_link("#", &d), None);
        assert_eq!(resolve_deep_link("#fin=2", &d), None);
    }

    #[test]
    fn test_answer_sheet_persists() {
        let mut sheet = AnswerSheet::open(MemoryStore::new(), ANSWERS_KEY);
        assert!(sheet.is_empty());
        sheet.set("q1a", "B").unwrap();
        sheet.set("q2", "Because.").unwrap();
        assert_eq!(sheet.get("q1a").as_deref(), Some("B"));

        let stored = sheet.kv().get(ANSWERS_KEY).unwrap().unwrap();
        let value: Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(value["ans_q1a"], "B");

        let reopened = AnswerSheet::open(sheet.kv().clone(), ANSWERS_KEY);
        assert_eq!(reopened.get("q2").as_deref(), Some("Because."));
        assert_eq!(reopened.len(), 2);
    }

    #[test]
    fn test_answer_sheet_clear_and_corrupt() {
        let mut kv = MemoryStore::new();
        kv.set(ANSWERS_KEY, "[1, 2]").unwrap();
        let mut sheet = AnswerSheet::open(kv, ANSWERS_KEY);
        assert!(sheet.is_empty());

        sheet.set("q1a", "A").unwrap();
        sheet.clear().unwrap();
        assert!(sheet.get("q1a").is_none());
        assert_eq!(sheet.kv().get(ANSWERS_KEY).unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_source_page_path_padding() {
        let base = Path::new("assets/exam");
        assert_eq!(source_page_path(base, 3), Path::new("assets/exam/pages/page-03.png"));
        assert_eq!(source_page_path(base, 12), Path::new("assets/exam/pages/page-12.png"));
    }

    #[test]
    fn test_render_mcq_marks_selection() {
        let d = doc();
        let text = render_item(&d.items[0], Some("B"), Path::new("exam"));
        assert!(text.starts_with("Question\n1(a)  (1)\n"));
        assert!(text.contains("( ) A  Lung"));
        assert!(text.contains("(*) B  Heart"));
        assert!(text.contains("Page 2: exam/pages/page-02.png"));
    }

    #[test]
    fn test_render_long_answer() {
        let d = doc();
        let text = render_item(&d.items[2], None, Path::new("exam"));
        assert!(text.contains("Explain.\n"));
        assert!(text.contains("Answer: \n"));
        assert!(!text.contains("Page "));
    }
}
