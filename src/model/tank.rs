use serde::{Deserialize, Serialize};

use crate::model::units::UnitConversion;
use crate::model::units::{FlowUnits, UnitSystem};
use crate::constants::*;

#[derive(Debug, Deserialize, Serialize)]
pub struct Tank {
  pub initial_level: f64,    // initial level of the tank (ft)
  pub min_level: f64,        // minimum level of the tank (ft)
  pub max_level: f64,        // maximum level of the tank (ft)
  pub diameter: f64,         // nominal diameter of the tank (ft)
  pub volume_curve_id: Option<Box<str>>, // id of the volume curve
}

impl Tank {
  /// Cross sectional area of a cylindrical tank (ft^2)
  pub fn area(&self) -> f64 {
    PI * self.diameter * self.diameter / 4.0
  }

  /// Head after adding delta_volume (ft^3) to a tank at current_head
  pub fn new_head(&self, elevation: f64, delta_volume: f64, current_head: f64) -> f64 {
    let level = current_head - elevation;
    let area = self.area();
    if area <= 0.0 {
      return current_head;
    }
    let new_level = level + delta_volume / area;
    elevation + new_level.clamp(self.min_level, self.max_level)
  }

  pub fn is_full(&self, elevation: f64, head: f64) -> bool {
    head - elevation >= self.max_level - SMALL_VALUE
  }

  pub fn is_empty(&self, elevation: f64, head: f64) -> bool {
    head - elevation <= self.min_level + SMALL_VALUE
  }
}

impl UnitConversion for Tank {
  fn convert_units(&mut self, _flow: &FlowUnits, system: &UnitSystem) {
    let l = system.length_per_ft();
    self.initial_level /= l;
    self.min_level /= l;
    self.max_level /= l;
    self.diameter /= l;
  }
}
