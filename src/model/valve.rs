use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::link::{LinkTrait, LinkStatus, LinkCoefficients};
use crate::model::units::{FlowUnits, UnitSystem, UnitConversion};
use crate::constants::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ValveType {
  PRV, // Pressure Reducing Valve
  PSV, // Pressure Sustaining Valve
  PBV, // Pressure Breaking Valve
  FCV, // Flow Control Valve
  TCV, // Throttle Control Valve
  PCV, // Positional Control Valve
  GPV, // General Purpose Valve
}

impl FromStr for ValveType {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_uppercase().as_str() {
      "PRV" => Ok(ValveType::PRV),
      "PSV" => Ok(ValveType::PSV),
      "PBV" => Ok(ValveType::PBV),
      "FCV" => Ok(ValveType::FCV),
      "TCV" => Ok(ValveType::TCV),
      "PCV" => Ok(ValveType::PCV),
      "GPV" => Ok(ValveType::GPV),
      _ => Err(format!("Invalid valve type: {}", s)),
    }
  }
}

impl ValveType {
  /// Setting units per internal unit: flow units per cfs for FCVs, pressure units per ft
  /// for PRVs, PSVs and PBVs. Other settings have no units.
  pub fn setting_per_internal(&self, flow: &FlowUnits, pressure_per_ft: f64) -> f64 {
    match self {
      ValveType::FCV => flow.per_cfs(),
      ValveType::PRV | ValveType::PSV | ValveType::PBV => pressure_per_ft,
      ValveType::TCV | ValveType::PCV | ValveType::GPV => 1.0,
    }
  }

  /// Valves whose pressure regulation is approximated by an open valve with its minor loss
  pub fn is_approximated(&self) -> bool {
    matches!(self, ValveType::PRV | ValveType::PSV | ValveType::GPV)
  }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Valve {
  pub diameter: f64,
  pub setting: f64,
  pub curve: Option<Box<str>>,
  pub valve_type: ValveType,
  pub minor_loss: f64,
}

impl LinkTrait for Valve {
  fn coefficients(&self, q: f64, _resistance: f64, status: LinkStatus, setting: f64) -> LinkCoefficients {
    if status.is_closed() {
      return LinkCoefficients::simple(1.0/BIG_VALUE, q);
    }
    match self.valve_type {
      ValveType::TCV => {
        // Minor loss coefficient is the setting of the valve
        let km = MINOR_LOSS_FACTOR * setting / self.diameter.powi(4);
        self.valve_coefficients(q, km)
      }
      // Positional Control Valve (PCV)
      ValveType::PCV => {
        let km = self.pcv_minor_loss(setting);
        self.valve_coefficients(q, km)
      }
      // Flow Control Valve (FCV)
      ValveType::FCV => {
        let coefficients = self.valve_coefficients(q, self.open_minor_loss());
        // if flow is less than the setting, treat as a regular valve (no flow control/restrictions)
        if q < setting {
          coefficients
        }
        else {
          let hloss = coefficients.y / coefficients.g_inv + BIG_VALUE * (q - setting);
          LinkCoefficients::from_headloss(hloss, BIG_VALUE)
        }
      }
      // Pressure Breaking Valve (PBV): fixed head drop equal to the setting
      ValveType::PBV => {
        if setting <= 0.0 {
          return self.valve_coefficients(q, self.open_minor_loss());
        }
        let hloss = if q >= 0.0 { setting } else { -setting };
        LinkCoefficients::from_headloss(hloss, SMALL_VALUE)
      }
      ValveType::PRV | ValveType::PSV | ValveType::GPV => {
        self.valve_coefficients(q, self.open_minor_loss())
      }
    }
  }

  /// Return the resistance of the valve
  fn resistance(&self) -> f64 {
    SMALL_VALUE
  }

  fn update_status(&self, _status: LinkStatus, _setting: f64, _flow: f64, _head_upstream: f64, _head_downstream: f64) -> Option<LinkStatus> {
    None
  }
}

impl Valve {
  fn open_minor_loss(&self) -> f64 {
    MINOR_LOSS_FACTOR * self.minor_loss / self.diameter.powi(4)
  }

  fn pcv_minor_loss(&self, setting: f64) -> f64 {
    // Minor loss coefficient for a completely open valve
    let k_open = self.open_minor_loss();

    // Valve is completely closed
    if setting <= 0.0 {
      return BIG_VALUE;
    }
    // Valve is completely open
    if setting >= 100.0 {
      return k_open;
    }
    // Valve is partially open, clamp the ratio to avoid division by zero
    let ratio = (setting / 100.0).clamp(SMALL_VALUE, 1.0);

    // convert the ratio to a minor loss coefficient
    let km = k_open / ratio.powi(2);
    km.min(BIG_VALUE)
  }

  /// Compute the coefficients for a valve with a minor loss coefficient km and flow q
  fn valve_coefficients(&self, q: f64, km: f64) -> LinkCoefficients {

    if km > 0.0 {
      let hgrad = 2.0 * km * q.abs();

      // guard against too small a head loss gradient
      if hgrad < RQ_TOL {
        LinkCoefficients::from_headloss(q * RQ_TOL, RQ_TOL)
      }
      else {
        LinkCoefficients::from_headloss(q * hgrad / 2.0, hgrad)
      }
    }
    // if no minor loss coefficient, use a low resistance linear head loss relation
    else {
      LinkCoefficients::simple(1.0/SMALL_VALUE, q)
    }
  }
}

impl UnitConversion for Valve {
  fn convert_units(&mut self, _flow: &FlowUnits, system: &UnitSystem) {
    // settings depend on the pressure units, see ValveType::setting_per_internal
    self.diameter *= system.diameter_to_ft();
  }
}
