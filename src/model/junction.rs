use serde::{Deserialize, Serialize};

use crate::model::units::{FlowUnits, UnitSystem, UnitConversion};

/// A demand category of a junction
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Demand {
  pub base_demand: f64,
  pub pattern: Option<Box<str>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Junction {
  pub demands: Vec<Demand>,
}

impl UnitConversion for Junction {
  fn convert_units(&mut self, flow: &FlowUnits, _system: &UnitSystem) {
    for demand in self.demands.iter_mut() {
      demand.base_demand /= flow.per_cfs();
    }
  }
}
