use serde::{Deserialize, Serialize};
use crate::model::link::LinkStatus;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub enum ControlCondition {
  /// Junction pressure or tank level (ft) above (true) or below (false) a threshold
  Level { node_id: Box<str>, above: bool, value: f64 },
  /// Elapsed simulation time in seconds
  Time { seconds: usize },
  /// Time of day in seconds
  ClockTime { seconds: usize },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Control {
  pub condition: ControlCondition,
  pub link_id: Box<str>,
  pub setting: Option<f64>,
  pub status: Option<LinkStatus>,

  #[serde(skip)]
  pub link: usize,
  #[serde(skip)]
  pub node: Option<usize>,
}
