//! Layout and motion solver for the agent pipeline dashboard.
//!
//! Given the live set of agents, the fixed service nodes and the user node,
//! [`LayoutEngine`] decides where every agent should sit and springs it there
//! frame by frame. Rendering lives in the host; it reads
//! [`LayoutEngine::positions`] or the JSON snapshot from [`wasm::AgentLayout`].

mod error;
pub mod layout;
pub mod model;
pub mod output;
pub mod wasm;

pub use error::LayoutError;
pub use layout::{
    AvoidanceSteering, LayoutConfig, LayoutEngine, PositionState, QueueGeometry, SpringIntegrator,
    StepOutcome, TargetCache, TargetResolver, TickReport, TreeLayoutEngine, Vec2,
};
pub use model::{Agent, AgentId, AgentStatus, Dimensions, Scene, Service, ServiceId, UserNode};
pub use output::{FrameOutput, PositionOutput};
