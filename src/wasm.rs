//! WASM API module for browser/JS interop
//!
//! Provides a [`WasmMachine`] the page drives from its own animation and
//! timer callbacks. The page owns persistence: it passes the stored record in
//! and saves what `export_state` returns.

use clap::ValueEnum;
use wasm_bindgen::prelude::*;

use crate::app::{Machine, MachineOptions, PointerTarget};
use crate::driver::{Clock, ManualClock};
use crate::models::AutomationKind;
use crate::raster::rasterize;
use crate::scene::{Motion, Viewport};
use crate::store::{KvStore, MemoryStore, StateStore, STATE_KEY};

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    #[cfg(feature = "wasm")]
    console_error_panic_hook::set_once();
}

/// One rendered frame as RGBA pixels.
#[wasm_bindgen]
pub struct FrameResult {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

#[wasm_bindgen]
impl FrameResult {
    /// Width of the backing buffer in pixels
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the backing buffer in pixels
    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA pixel data (4 bytes per pixel)
    #[wasm_bindgen(getter)]
    pub fn pixels(&self) -> Vec<u8> {
        self.pixels.clone()
    }
}

fn parse_kind(kind: &str) -> Result<AutomationKind, String> {
    AutomationKind::from_str(kind, true).map_err(|_| format!("unknown automation type '{}'", kind))
}

/// The dashboard, hosted by a page
#[wasm_bindgen]
pub struct WasmMachine {
    machine: Machine<MemoryStore, ManualClock>,
    clock: ManualClock,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Start a machine. `state` is the previously exported record, if any.
    #[wasm_bindgen(constructor)]
    pub fn new(
        width: f64,
        height: f64,
        dpr: f64,
        reduced_motion: bool,
        state: Option<String>,
        now_ms: f64,
    ) -> WasmMachine {
        let mut kv = MemoryStore::new();
        if let Some(text) = state {
            // An in-memory store without quota accepts every write
            let _ = kv.set(STATE_KEY, &text);
        }
        let clock = ManualClock::new(now_ms as i64);
        let options = MachineOptions {
            viewport: Viewport::new(width, height, dpr),
            motion: Motion::from_reduced(reduced_motion),
            ..MachineOptions::default()
        };
        let machine = Machine::new(StateStore::new(kv), clock.clone(), options);
        WasmMachine { machine, clock }
    }

    /// Pointer press at surface coordinates. Presses on interface elements
    /// are ignored. Returns whether a beacon was dropped.
    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, x: f64, y: f64, on_interface: bool) -> bool {
        let target = if on_interface { PointerTarget::Interface } else { PointerTarget::Surface };
        self.machine.pointer_down(x, y, target)
    }

    pub fn bloom(&mut self) {
        self.machine.bloom();
    }

    pub fn calm(&mut self) {
        self.machine.calm();
    }

    pub fn reset(&mut self) {
        self.machine.reset();
    }

    #[wasm_bindgen(js_name = addAgent)]
    pub fn add_agent(&mut self, name: &str, role: &str) -> bool {
        self.machine.add_agent(name, role)
    }

    #[wasm_bindgen(js_name = removeAgent)]
    pub fn remove_agent(&mut self, index: usize) -> bool {
        self.machine.remove_agent(index).is_some()
    }

    /// Add an automation of type `timer`, `beacon` or `manual`.
    #[wasm_bindgen(js_name = addAutomation)]
    pub fn add_automation(&mut self, name: &str, kind: &str, data: &str) -> Result<bool, JsValue> {
        let kind = parse_kind(kind).map_err(|e| JsValue::from_str(&e))?;
        Ok(self.machine.add_automation(name, kind, data))
    }

    #[wasm_bindgen(js_name = removeAutomation)]
    pub fn remove_automation(&mut self, index: usize) -> bool {
        self.machine.remove_automation(index).is_some()
    }

    /// Replace the state with an exported document.
    #[wasm_bindgen(js_name = importState)]
    pub fn import_state(&mut self, text: &str) -> Result<(), JsValue> {
        self.machine.import(text).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// The state as pretty-printed JSON
    #[wasm_bindgen(js_name = exportState)]
    pub fn export_state(&mut self) -> Result<String, JsValue> {
        self.machine.export().map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// The state as stored (compact JSON), for the page to persist
    #[wasm_bindgen(js_name = storedState)]
    pub fn stored_state(&self) -> Option<String> {
        let store = self.machine.store();
        store.kv().get(store.key()).ok().flatten()
    }

    pub fn resize(&mut self, width: f64, height: f64, dpr: f64) {
        self.machine.resize(Viewport::new(width, height, dpr));
    }

    #[wasm_bindgen(js_name = setVisible)]
    pub fn set_visible(&mut self, visible: bool) {
        self.machine.set_visible(visible);
    }

    /// Advance to `now_ms` and render, or `undefined` when no frame is due.
    pub fn frame(&mut self, now_ms: f64) -> Option<FrameResult> {
        self.clock.set(now_ms as i64);
        let frame = self.machine.frame()?;
        let image = rasterize(&frame, None);
        Some(FrameResult { width: image.width(), height: image.height(), pixels: image.into_raw() })
    }

    /// Run the periodic tasks due at `now_ms`; returns how many ran.
    pub fn pump(&mut self, now_ms: f64) -> u32 {
        self.clock.set(now_ms as i64);
        self.machine.pump().len() as u32
    }

    /// Total console rows ever written; pass it back to `consoleSince`.
    #[wasm_bindgen(js_name = consoleCursor)]
    pub fn console_cursor(&self) -> f64 {
        self.machine.console().pushed() as f64
    }

    /// Rows written after `cursor`, as `HH:MM:SS level message`
    #[wasm_bindgen(js_name = consoleSince)]
    pub fn console_since(&self, cursor: f64) -> Vec<String> {
        self.machine
            .console()
            .since(cursor.max(0.0) as u64)
            .map(|row| format!("{} {} {}", row.time_label(), row.level, row.message))
            .collect()
    }

    #[wasm_bindgen(getter)]
    pub fn beacons(&self) -> String {
        self.machine.kpis().beacons
    }

    #[wasm_bindgen(getter, js_name = driftLabel)]
    pub fn drift_label(&self) -> String {
        self.machine.kpis().drift.to_string()
    }

    #[wasm_bindgen(getter, js_name = moodLabel)]
    pub fn mood_label(&self) -> String {
        self.machine.kpis().mood.to_string()
    }

    #[wasm_bindgen(getter, js_name = clockLabel)]
    pub fn clock_label(&self) -> String {
        self.machine.clock_label().to_string()
    }

    /// Milliseconds on the machine's clock
    #[wasm_bindgen(getter)]
    pub fn now(&self) -> f64 {
        self.clock.now_ms() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(state: Option<String>) -> WasmMachine {
        WasmMachine::new(64.0, 32.0, 2.0, false, state, 1_000.0)
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("timer"), Ok(AutomationKind::Timer));
        assert_eq!(parse_kind("Beacon"), Ok(AutomationKind::Beacon));
        assert!(parse_kind("cron").is_err());
    }

    #[test]
    fn test_frame_pixels_match_backing_size() {
        let mut m = machine(None);
        let frame = m.frame(1_000.0).unwrap();
        assert_eq!((frame.width(), frame.height()), (128, 64));
        assert_eq!(frame.pixels().len(), 128 * 64 * 4);
    }

    #[test]
    fn test_pointer_down_updates_kpis_and_storage() {
        let mut m = machine(None);
        assert!(m.pointer_down(10.0, 10.0, false));
        assert!(!m.pointer_down(10.0, 10.0, true));
        assert!(!m.pointer_down(f64::NAN, 10.0, false));
        assert_eq!(m.beacons(), "1");
        assert!(m.stored_state().unwrap().contains("\"beacons\""));
    }

    #[test]
    fn test_state_passed_in_is_loaded() {
        let state = r#"{"beacons":[{"x":1,"y":2,"t":0,"phase":0}],"mood":0.9}"#;
        let m = machine(Some(state.to_string()));
        assert_eq!(m.beacons(), "1");
    }

    #[test]
    fn test_console_cursor() {
        let mut m = machine(None);
        let cursor = m.console_cursor();
        m.calm();
        let rows = m.console_since(cursor);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].ends_with("info Calm mode engaged. Panic postponed."));
    }
}
