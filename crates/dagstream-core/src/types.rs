use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one subscriber mailbox (UUIDv7, time-sortable in logs).
///
/// Minted when the mailbox is created and never reused, so it stands in for
/// the mailbox instance itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberId(pub String);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame type consumed by the graph UI; anything else is ignored client-side.
pub const STATE_FRAME_TYPE: &str = "state";

/// Top-level JSON object pushed to SSE clients.
///
/// Wire shape: `{"type":"state","state_data":{"resdata":{"dag":{...}}}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    pub state_data: StateData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateData {
    pub resdata: ResData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResData {
    pub dag: Dag,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dag {
    pub nodes: Vec<DagNode>,
    pub edges: Vec<DagEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagNode {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

impl StateFrame {
    pub fn new(dag: Dag) -> Self {
        Self {
            frame_type: STATE_FRAME_TYPE.to_string(),
            state_data: StateData {
                resdata: ResData { dag },
            },
        }
    }

    pub fn dag(&self) -> &Dag {
        &self.state_data.resdata.dag
    }

    /// Serialize to the compact JSON string that goes on the wire.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl DagNode {
    /// Node whose label is its id.
    pub fn named(id: &str) -> Self {
        Self {
            id: id.to_string(),
            label: id.to_string(),
        }
    }
}

impl DagEdge {
    /// Edge with a derived `source-target` id.
    pub fn between(source: &str, target: &str) -> Self {
        Self {
            id: format!("{source}-{target}"),
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}

impl Dag {
    /// Resource release pipeline: a reservation moves from `active` through
    /// `releasing`, which fans out to network release and power-off steps.
    pub fn release_pipeline() -> Self {
        let nodes = [
            "active",
            "releasing",
            "released",
            "REL_NETWORK",
            "POWER_OFF",
            "POWER_OFF_VM",
        ]
        .into_iter()
        .map(DagNode::named)
        .collect();

        let edges = [
            ("active", "releasing"),
            ("releasing", "released"),
            ("releasing", "REL_NETWORK"),
            ("releasing", "POWER_OFF"),
            ("releasing", "POWER_OFF_VM"),
            ("REL_NETWORK", "POWER_OFF"),
            ("POWER_OFF", "POWER_OFF_VM"),
        ]
        .into_iter()
        .map(|(s, t)| DagEdge::between(s, t))
        .collect();

        Self { nodes, edges }
    }

    /// True when every edge endpoint names a known node.
    pub fn is_closed(&self) -> bool {
        self.edges.iter().all(|e| {
            self.nodes.iter().any(|n| n.id == e.source)
                && self.nodes.iter().any(|n| n.id == e.target)
        })
    }
}
