use std::str::FromStr;

use crate::model::pipe::Pipe;
use crate::model::pump::Pump;
use crate::model::valve::Valve;
use crate::model::units::{FlowUnits, UnitSystem, UnitConversion};

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
/// Link struct
pub struct Link {
  /// Link ID
  pub id: Box<str>,
  /// Link type (pipe, pump, valve)
  pub link_type: LinkType,
  /// Start node ID
  pub start_node_id: Box<str>,
  /// End node ID
  pub end_node_id: Box<str>,
  /// Initial status (open, closed, active)
  pub initial_status: LinkStatus,

  /// Cached start and end node indices to avoid looking up the node map every time
  #[serde(skip)]
  pub start_node: usize,
  #[serde(skip)]
  pub end_node: usize,
}

#[derive(Debug, Deserialize, Serialize)]
pub enum LinkType {
  Pipe(Pipe),
  Pump(Pump),
  Valve(Valve)
}

// Source: EPANET 2.3 types.h (subset)
#[derive(PartialEq, Eq, Debug, Clone, Copy, Deserialize, Serialize)]
pub enum LinkStatus {
  Xhead,         // pump cannot deliver head (closed)
  TempClosed,    // temporarily closed (check valve with reverse flow)
  Closed,        // closed
  Open,          // open
  Active,        // valve active (partially open)
}

impl FromStr for LinkStatus {
  type Err = String;
  fn from_str(status: &str) -> Result<Self, Self::Err> {
    match status.to_uppercase().as_str() {
      "CLOSED" => Ok(LinkStatus::Closed),
      "OPEN" => Ok(LinkStatus::Open),
      "ACTIVE" => Ok(LinkStatus::Active),
      _ => Err(format!("Invalid link status {}", status))
    }
  }
}

impl LinkStatus {
  pub fn is_closed(&self) -> bool {
    matches!(self, LinkStatus::Closed | LinkStatus::TempClosed | LinkStatus::Xhead)
  }

  /// Numeric status code used in the result tables (0 = closed, 1 = open, 2 = active)
  pub fn code(&self) -> u8 {
    match self {
      LinkStatus::Xhead | LinkStatus::TempClosed | LinkStatus::Closed => 0,
      LinkStatus::Open => 1,
      LinkStatus::Active => 2,
    }
  }
}

/// Linearised head loss of a link around its current flow: q_new = q - y + dh / g
#[derive(Debug, Clone, Copy)]
pub struct LinkCoefficients {
  /// Inverse of the head loss gradient (1/G_ij)
  pub g_inv: f64,
  /// Flow correction (head loss / gradient)
  pub y: f64,
}

impl LinkCoefficients {
  pub fn simple(g_inv: f64, y: f64) -> Self {
    Self { g_inv, y }
  }

  /// Coefficients from a head loss and its gradient
  pub fn from_headloss(hloss: f64, hgrad: f64) -> Self {
    Self { g_inv: 1.0 / hgrad, y: hloss / hgrad }
  }
}

pub trait LinkTrait {
  /// Calculate the 1/G_ij and Y_ij coefficients for the link
  fn coefficients(&self, q: f64, resistance: f64, status: LinkStatus, setting: f64) -> LinkCoefficients;
  /// Calculate the resistance of the link
  fn resistance(&self) -> f64;
  /// Update the status of the link
  fn update_status(&self, status: LinkStatus, setting: f64, flow: f64, head_upstream: f64, head_downstream: f64) -> Option<LinkStatus>;
}

impl LinkTrait for Link {
  fn coefficients(&self, q: f64, resistance: f64, status: LinkStatus, setting: f64) -> LinkCoefficients {
    match &self.link_type {
      LinkType::Pipe(pipe) => pipe.coefficients(q, resistance, status, setting),
      LinkType::Pump(pump) => pump.coefficients(q, resistance, status, setting),
      LinkType::Valve(valve) => valve.coefficients(q, resistance, status, setting),
    }
  }
  fn resistance(&self) -> f64 {
    match &self.link_type {
      LinkType::Pipe(pipe) => pipe.resistance(),
      LinkType::Pump(pump) => pump.resistance(),
      LinkType::Valve(valve) => valve.resistance(),
    }
  }
  fn update_status(&self, status: LinkStatus, setting: f64, flow: f64, head_upstream: f64, head_downstream: f64) -> Option<LinkStatus> {
    match &self.link_type {
      LinkType::Pipe(pipe) => pipe.update_status(status, setting, flow, head_upstream, head_downstream),
      LinkType::Pump(pump) => pump.update_status(status, setting, flow, head_upstream, head_downstream),
      LinkType::Valve(valve) => valve.update_status(status, setting, flow, head_upstream, head_downstream),
    }
  }
}

impl Link {
  pub fn type_name(&self) -> &'static str {
    match self.link_type {
      LinkType::Pipe(_) => "pipe",
      LinkType::Pump(_) => "pump",
      LinkType::Valve(_) => "valve",
    }
  }

  /// Initial setting: pump speed, valve setting, unused for pipes
  pub fn initial_setting(&self) -> f64 {
    match &self.link_type {
      LinkType::Pipe(_) => 0.0,
      LinkType::Pump(pump) => pump.speed,
      LinkType::Valve(valve) => valve.setting,
    }
  }

  /// Diameter in ft, pumps have none
  pub fn diameter(&self) -> Option<f64> {
    match &self.link_type {
      LinkType::Pipe(pipe) => Some(pipe.diameter),
      LinkType::Valve(valve) => Some(valve.diameter),
      LinkType::Pump(_) => None,
    }
  }

  /// Length in ft, only pipes have a length
  pub fn length(&self) -> f64 {
    match &self.link_type {
      LinkType::Pipe(pipe) => pipe.length,
      _ => 0.0,
    }
  }

  /// Velocity (ft/s) for a flow (cfs)
  pub fn velocity(&self, flow: f64) -> f64 {
    match self.diameter() {
      Some(d) if d > 0.0 => flow.abs() / (std::f64::consts::PI * d * d / 4.0),
      _ => 0.0,
    }
  }
}

impl UnitConversion for Link {
  fn convert_units(&mut self, flow: &FlowUnits, system: &UnitSystem) {
    match &mut self.link_type {
      LinkType::Pipe(pipe) => pipe.convert_units(flow, system),
      LinkType::Pump(pump) => pump.convert_units(flow, system),
      LinkType::Valve(valve) => valve.convert_units(flow, system),
    }
  }
}
