//! Output types for the renderer.
//!
//! These structs are serialized to JSON and handed to the Pixi / Phaser
//! adapters, which only read them to place sprites.

use serde::Serialize;

use crate::layout::PositionState;
use crate::model::AgentId;

/// One agent's position for this frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionOutput {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub target_x: f64,
    pub target_y: f64,
    /// False once the agent sits on its target with zero velocity.
    pub moving: bool,
}

impl PositionOutput {
    pub fn new(id: &AgentId, state: &PositionState) -> Self {
        Self {
            id: id.0.clone(),
            x: state.x,
            y: state.y,
            vx: state.vx,
            vy: state.vy,
            target_x: state.target_x,
            target_y: state.target_y,
            moving: !state.is_at_rest(),
        }
    }
}

/// Error information for the host console
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorInfo {
    pub message: String,
}

/// The combined output sent to the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameOutput {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub positions: Vec<PositionOutput>,
    pub settled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl FrameOutput {
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            positions: Vec::new(),
            settled: false,
            error: Some(ErrorInfo { message: message.into() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Vec2;

    #[test]
    fn test_position_output_json_shape() {
        let state = PositionState::at(Vec2::new(1.0, 2.0));
        let out = PositionOutput::new(&AgentId::from("a"), &state);
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["id"], "a");
        assert_eq!(json["targetX"], 1.0);
        assert_eq!(json["moving"], false);
    }

    #[test]
    fn test_error_frame_omits_positions() {
        let json = serde_json::to_string(&FrameOutput::from_error("bad scene")).unwrap();
        assert_eq!(json, r#"{"settled":false,"error":{"message":"bad scene"}}"#);
    }
}
