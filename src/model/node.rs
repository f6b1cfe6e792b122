use serde::{Deserialize, Serialize};

use crate::model::reservoir::Reservoir;
use crate::model::tank::Tank;
use crate::model::junction::Junction;
use crate::model::units::{FlowUnits, UnitSystem, UnitConversion};

/// Node struct
#[derive(Debug, Deserialize, Serialize)]
pub struct Node {
  pub id: Box<str>,
  pub node_type: NodeType,
  /// Elevation (ft), total head for reservoirs
  pub elevation: f64,
  /// Map coordinates from the [COORDINATES] section
  pub coordinates: Option<(f64, f64)>,
  /// Initial water quality from the [QUALITY] section
  pub initial_quality: f64,
}

/// Node types
#[derive(Debug, Deserialize, Serialize)]
pub enum NodeType {
  Reservoir(Reservoir),
  Tank(Tank),
  Junction(Junction),
}

// helper methods for nodes to check if they are fixed head
impl Node {
  pub fn new(id: Box<str>, elevation: f64, node_type: NodeType) -> Self {
    Self { id, node_type, elevation, coordinates: None, initial_quality: 0.0 }
  }

  pub fn is_fixed(&self) -> bool {
    matches!(self.node_type, NodeType::Reservoir(_) | NodeType::Tank(_))
  }

  pub fn is_junction(&self) -> bool {
    matches!(self.node_type, NodeType::Junction(_))
  }

  pub fn type_name(&self) -> &'static str {
    match self.node_type {
      NodeType::Junction(_) => "junction",
      NodeType::Reservoir(_) => "reservoir",
      NodeType::Tank(_) => "tank",
    }
  }

  /// Total base demand of a junction (zero for fixed head nodes)
  pub fn base_demand(&self) -> f64 {
    match &self.node_type {
      NodeType::Junction(junction) => junction.demands.iter().map(|d| d.base_demand).sum(),
      _ => 0.0,
    }
  }
}

impl UnitConversion for Node {
  fn convert_units(&mut self, flow: &FlowUnits, system: &UnitSystem) {
    self.elevation /= system.length_per_ft();
    match &mut self.node_type {
      NodeType::Junction(junction) => junction.convert_units(flow, system),
      NodeType::Tank(tank) => tank.convert_units(flow, system),
      NodeType::Reservoir(_) => (),
    }
  }
}
