//! Exam viewer: document loading, navigation, deep links and answers.

use std::path::Path;

use clawdbot::exam::{
    render_item, resolve_deep_link, source_page_path, AnswerSheet, ExamDocument, ExamError,
    InputKind, Navigator, ANSWERS_KEY,
};
use clawdbot::store::{DirStore, KvStore};
use tempfile::TempDir;

const PAPER: &str = "tests/fixtures/paper.json";

fn paper() -> ExamDocument {
    ExamDocument::load(Path::new(PAPER)).expect("fixture should load")
}

#[test]
fn fixture_loads_with_input_kinds() {
    let doc = paper();
    assert_eq!(doc.title.as_deref(), Some("Biology Paper 1B"));
    let kinds: Vec<InputKind> = doc.items.iter().map(|i| i.input_type).collect();
    assert_eq!(kinds, vec![InputKind::Mcq, InputKind::Text, InputKind::Long]);
    assert_eq!(doc.items[2].marks_label(), "(4)");
}

#[test]
fn missing_document_is_an_io_error() {
    let err = ExamDocument::load(Path::new("tests/fixtures/nope.json")).unwrap_err();
    assert!(matches!(err, ExamError::Io { .. }));
    assert!(err.to_string().contains("nope.json"));
}

#[test]
fn deep_links_select_items() {
    let doc = paper();
    assert_eq!(resolve_deep_link("#item=q1b", &doc), Some(1));
    assert_eq!(resolve_deep_link("#item=q2%20long", &doc), Some(2));
    assert_eq!(resolve_deep_link("#n=3", &doc), Some(2));
    assert_eq!(resolve_deep_link("#view=exam&n=2", &doc), Some(1));
    assert_eq!(resolve_deep_link("#n=0", &doc), None);
    assert_eq!(resolve_deep_link("#n=4", &doc), None);
    assert_eq!(resolve_deep_link("#item=zzz&n=2", &doc), None);
    assert_eq!(resolve_deep_link("", &doc), None);
}

#[test]
fn navigation_walks_the_paper() {
    let doc = paper();
    let mut nav = Navigator::new(doc.items.len());
    assert_eq!(nav.label(), "Item 1 / 3");
    assert!(!nav.prev());
    assert!(nav.next());
    assert!(nav.next());
    assert!(!nav.next());
    assert_eq!(nav.label(), "Item 3 / 3");
}

#[test]
fn answers_persist_across_sheets() {
    let dir = TempDir::new().expect("should create temp dir");

    let mut sheet = AnswerSheet::open(DirStore::open(dir.path()).unwrap(), ANSWERS_KEY);
    sheet.set("q1a", "B").unwrap();
    sheet.set("q1b", "aorta").unwrap();

    let reopened = AnswerSheet::open(DirStore::open(dir.path()).unwrap(), ANSWERS_KEY);
    assert_eq!(reopened.get("q1a").as_deref(), Some("B"));
    assert_eq!(reopened.get("q1b").as_deref(), Some("aorta"));

    let raw = reopened.kv().get(ANSWERS_KEY).unwrap().unwrap();
    assert!(raw.contains("\"ans_q1a\":\"B\""));
}

#[test]
fn corrupt_sheet_starts_empty_and_clears() {
    let dir = TempDir::new().expect("should create temp dir");
    let mut kv = DirStore::open(dir.path()).unwrap();
    kv.set(ANSWERS_KEY, "not json at all").unwrap();

    let mut sheet = AnswerSheet::open(kv, ANSWERS_KEY);
    assert!(sheet.is_empty());
    sheet.set("q1a", "A").unwrap();
    sheet.clear().unwrap();

    let reopened = AnswerSheet::open(DirStore::open(dir.path()).unwrap(), ANSWERS_KEY);
    assert!(reopened.is_empty());
}

#[test]
fn rendered_item_marks_the_chosen_option() {
    let doc = paper();
    let text = render_item(&doc.items[0], Some("B"), Path::new("paper"));
    assert!(text.contains("1(a)  (1)"));
    assert!(text.contains("(*) B  Heart"));
    assert!(text.contains("( ) A  Lung"));
    assert!(text.contains("paper/pages/page-02.png"));
}

#[test]
fn source_pages_are_zero_padded() {
    assert_eq!(
        source_page_path(Path::new("assets"), 7),
        Path::new("assets").join("pages").join("page-07.png")
    );
    assert_eq!(
        source_page_path(Path::new("assets"), 12),
        Path::new("assets").join("pages").join("page-12.png")
    );
}
