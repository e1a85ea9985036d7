//! WASM tests using wasm_bindgen_test
//!
//! Run with: wasm-pack test --headless --chrome --features wasm

#![cfg(all(target_arch = "wasm32", feature = "wasm"))]

use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

use clawdbot::wasm::WasmMachine;

const STATE: &str = r#"{"beacons":[{"x":10,"y":10,"t":0,"phase":0},{"x":40,"y":30,"t":0,"phase":1}],"mood":0.8,"drift":0.2,"agents":[],"automations":[]}"#;

fn machine(state: Option<&str>) -> WasmMachine {
    WasmMachine::new(80.0, 60.0, 1.0, false, state.map(String::from), 0.0)
}

#[wasm_bindgen_test]
fn test_frame_has_rgba_pixels() {
    let mut m = machine(None);
    let frame = m.frame(0.0).expect("first frame is always due");
    assert_eq!(frame.width(), 80);
    assert_eq!(frame.height(), 60);
    assert_eq!(frame.pixels().len(), 80 * 60 * 4);
}

#[wasm_bindgen_test]
fn test_hidden_page_gets_no_frames() {
    let mut m = machine(None);
    m.set_visible(false);
    assert!(m.frame(16.0).is_none());
    m.set_visible(true);
    assert!(m.frame(5_000.0).is_some());
}

#[wasm_bindgen_test]
fn test_restored_state_drives_kpis() {
    let m = machine(Some(STATE));
    assert_eq!(m.beacons(), "2");
    assert!(!m.mood_label().is_empty());
}

#[wasm_bindgen_test]
fn test_pointer_and_export() {
    let mut m = machine(None);
    assert!(m.pointer_down(20.0, 20.0, false));
    let exported = m.export_state().unwrap();
    assert!(exported.contains("\"x\": 20.0"));

    let mut other = machine(None);
    other.import_state(&exported).unwrap();
    assert_eq!(other.beacons(), "1");
}

#[wasm_bindgen_test]
fn test_bad_import_is_an_error() {
    let mut m = machine(Some(STATE));
    assert!(m.import_state("[]").is_err());
    assert_eq!(m.beacons(), "2");
}

#[wasm_bindgen_test]
fn test_unknown_automation_type_is_an_error() {
    let mut m = machine(None);
    assert!(m.add_automation("pulse", "cron", "").is_err());
    assert!(m.add_automation("pulse", "timer", "10s").unwrap());
    assert_eq!(m.pump(3_000.0), 3);
}
