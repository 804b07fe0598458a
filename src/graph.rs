//! Graph builder
//!
//! Pure derivation of the node/edge view handed to the layout renderer.
//! Coordinates are a deterministic seed for a downstream force-directed
//! pass, not a final layout; the same ordered input always produces the
//! same seed. Node ids reuse DAO names and device addresses, so duplicate
//! names collide silently. Known limitation of the id scheme.

use serde::{Deserialize, Serialize};

use crate::model::{Dao, Device};

const DAO_X_STEP: f64 = 15.0;
const DAO_Y_START: f64 = 10.0;
const DAO_Y_STEP: f64 = 5.0;
const DAO_NODE_SIZE: f64 = 6.0;

const DEVICE_SPAN: f64 = 50.0;
const DEVICE_NODE_SIZE: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Dao,
    Device,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub display_name: String,
    pub kind: NodeKind,
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
    /// Device node id (its stripped endpoint address).
    pub source: String,
    /// DAO node id (its name).
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

/// Build the graph: one node per DAO and per device, one link per device
/// bound to a DAO. No I/O, no randomness.
pub fn build(daos: &[Dao], devices: &[Device]) -> Graph {
    let mut nodes = Vec::with_capacity(daos.len() + devices.len());
    let mut links = Vec::new();

    // DAOs step along a diagonal.
    let mut dao_x = 0.0;
    let mut dao_y = DAO_Y_START;
    for dao in daos {
        nodes.push(GraphNode {
            id: dao.dao_name.clone(),
            display_name: dao.dao_name.clone(),
            kind: NodeKind::Dao,
            x: dao_x,
            y: dao_y,
            size: DAO_NODE_SIZE,
        });
        dao_x += DAO_X_STEP;
        dao_y += DAO_Y_STEP;
    }

    // Devices spread along the horizontal axis; spacing tightens as links
    // accumulate so linked clusters seed closer together.
    let mut device_x = 0.0;
    for device in devices {
        nodes.push(GraphNode {
            id: device.ip_address.clone(),
            display_name: device.name.clone(),
            kind: NodeKind::Device,
            x: device_x,
            y: 0.0,
            size: DEVICE_NODE_SIZE,
        });

        if let Some(dao_name) = &device.dao {
            links.push(GraphLink {
                source: device.ip_address.clone(),
                target: dao_name.clone(),
            });
        }

        device_x += if links.is_empty() {
            DEVICE_SPAN
        } else {
            DEVICE_SPAN / links.len() as f64
        };
    }

    Graph { nodes, links }
}
