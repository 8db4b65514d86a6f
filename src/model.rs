//! Input data model.
//!
//! These types are supplied by the dashboard's state stores once per frame.
//! The solver only reads them; it never creates or removes agents.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(pub String);

impl ServiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl From<&str> for ServiceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle status reported by the pipeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Pending,
    Running,
    WaitingApproval,
    Completed,
    Failed,
    Blocked,
    Cancelled,
    Interrupted,
    Paused,
    #[serde(alias = "waiting_provider")]
    WaitingResponse,
    /// Anything the pipeline sends that this build does not know about.
    #[serde(other)]
    Unknown,
}

impl AgentStatus {
    /// Queued agents sit in the approval arc and are left out of the tree.
    pub fn is_queued(self) -> bool {
        matches!(self, AgentStatus::WaitingApproval)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: AgentId,
    pub status: AgentStatus,
    /// Weak back-reference used only for grouping; may dangle.
    #[serde(default)]
    pub parent_id: Option<AgentId>,
    /// Service the agent is working against. Only meaningful while running.
    #[serde(default)]
    pub service_target: Option<ServiceId>,
}

impl Agent {
    pub fn new(id: impl Into<String>, status: AgentStatus) -> Self {
        Self {
            id: AgentId::new(id),
            status,
            parent_id: None,
            service_target: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_id = Some(AgentId::new(parent));
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service_target = Some(ServiceId::new(service));
        self
    }

    /// The service this agent orbits, if it is running against one.
    pub fn orbit_target(&self) -> Option<&ServiceId> {
        match self.status {
            AgentStatus::Running => self.service_target.as_ref(),
            _ => None,
        }
    }
}

/// Fixed node for an external AI capability (LLM, image, audio, music).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub x: f64,
    pub y: f64,
}

/// The human operator / approver.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserNode {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self { width: 1280.0, height: 720.0 }
    }
}

/// Everything one tick observes. Must not change while a tick runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    #[serde(default)]
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub services: Vec<Service>,
    pub user: UserNode,
    #[serde(default)]
    pub dimensions: Dimensions,
}

impl Scene {
    pub fn new(dimensions: Dimensions, user: UserNode) -> Self {
        Self {
            agents: Vec::new(),
            services: Vec::new(),
            user,
            dimensions,
        }
    }

    pub fn service(&self, id: &ServiceId) -> Option<&Service> {
        self.services.iter().find(|s| &s.id == id)
    }
}
