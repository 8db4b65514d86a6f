//! WASM bindings for the layout engine.
//!
//! The Pixi and Phaser renderers hold one `AgentLayout` each and call
//! `tick` from their per-frame callback. Everything crosses the boundary
//! as JSON; failures are logged to the console and reported in the
//! returned document instead of throwing.

use wasm_bindgen::prelude::*;

use crate::error::LayoutError;
use crate::layout::{LayoutConfig, LayoutEngine, Vec2};
use crate::model::{AgentId, Scene};
use crate::output::FrameOutput;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = error)]
    pub fn console_error(s: &str);
}

pub(crate) fn decode_config(json: &str) -> Result<LayoutConfig, LayoutError> {
    if json.trim().is_empty() {
        return Ok(LayoutConfig::default());
    }
    LayoutConfig::from_json(json)
}

pub(crate) fn decode_scene(json: &str) -> Result<Scene, LayoutError> {
    serde_json::from_str(json).map_err(LayoutError::InvalidScene)
}

fn encode<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("{{\"error\":{{\"message\":\"{e}\"}}}}"))
}

#[wasm_bindgen]
pub struct AgentLayout {
    engine: LayoutEngine,
}

#[wasm_bindgen]
impl AgentLayout {
    /// Build an engine from a JSON config. Empty string means defaults; an
    /// invalid config is logged and replaced by defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> AgentLayout {
        let engine = match decode_config(config_json).and_then(LayoutEngine::new) {
            Ok(engine) => engine,
            Err(e) => {
                console_error(&format!("Invalid layout config, using defaults: {e}"));
                LayoutEngine::default()
            }
        };
        AgentLayout { engine }
    }

    /// Advance one frame and return the position snapshot as JSON.
    pub fn tick(&mut self, scene_json: &str) -> String {
        let scene = match decode_scene(scene_json) {
            Ok(scene) => scene,
            Err(e) => {
                console_error(&format!("Error decoding scene: {e}"));
                return encode(&FrameOutput::from_error(e.to_string()));
            }
        };
        self.engine.tick(&scene);
        encode(&self.engine.snapshot())
    }

    /// Current position of one agent as `{"x":..,"y":..}`, with the engine's
    /// fallback for unknown ids.
    pub fn position(&self, id: &str) -> String {
        let p: Vec2 = self.engine.position_of(&AgentId::from(id));
        encode(&p)
    }

    pub fn snapshot(&self) -> String {
        encode(&self.engine.snapshot())
    }

    pub fn settle(&mut self) {
        self.engine.settle();
    }

    pub fn is_settled(&self) -> bool {
        self.engine.is_settled()
    }
}
