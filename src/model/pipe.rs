use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::link::{LinkTrait, LinkStatus, LinkCoefficients};
use crate::model::options::HeadlossFormula;
use crate::model::units::{FlowUnits, UnitSystem, UnitConversion};
use crate::constants::*;

// Constants used for computing Darcy-Weisbach friction factor (src: hydcoefs.c from EPANET 2.3)
const A1 : f64 =  3.14159265358979323850e+03;   // 1000*PI
const A2 : f64 =  1.57079632679489661930e+03;   // 500*PI
const A8 : f64 =  4.61841319859066668690e+00;   // 5.74*(PI/4)^.9
const A9 : f64 = -8.68588963806503655300e-01;  // -2/ln(10)
const AB : f64 =  3.28895476345399058690e-03;   // 5.74/(4000^.9)
const AC : f64 = -5.14214965799093883760e-03;  // AA*AB

const H_EXPONENT: f64 = 1.852; // Hazen-Williams exponent

// check valve switching tolerances (ft, cfs)
const H_TOL: f64 = 0.0005;
const Q_TOL: f64 = 0.0001;

#[derive(Debug, Eq, PartialEq, Clone, Copy, Deserialize, Serialize)]
pub enum PipeStatus {
  Open,
  Closed,
  CheckValve
}

impl FromStr for PipeStatus {
  type Err = String;
  fn from_str(status: &str) -> Result<Self, Self::Err> {
    match status.to_uppercase().as_str() {
      "OPEN" => Ok(PipeStatus::Open),
      "CLOSED" => Ok(PipeStatus::Closed),
      "CV" => Ok(PipeStatus::CheckValve),
      _ => Err(format!("Invalid pipe status {}", status))
    }
  }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Pipe {
  pub diameter: f64,
  pub length: f64,
  pub roughness: f64,
  /// Minor loss coefficient, converted to a head loss factor once units are converted
  pub minor_loss: f64,
  pub status: PipeStatus,
  /// Headloss formula to use for the pipe
  pub headloss_formula: HeadlossFormula
}

impl LinkTrait for Pipe {
  fn coefficients(&self, q: f64, r: f64, status: LinkStatus, _setting: f64) -> LinkCoefficients {

    // for closed pipes use headloss formula hloss = BIG_VALUE * q
    if status.is_closed() {
      return LinkCoefficients::simple(1.0 / BIG_VALUE, q);
    }

    if self.headloss_formula == HeadlossFormula::DarcyWeisbach {
      return self.dw_coefficients(q, r);
    }

    // take the absolute value of the flow
    let q_abs = q.abs();
    // minor loss coefficient
    let ml = self.minor_loss;
    // hydraulic exponent factor
    let n = H_EXPONENT;

    // Friction head loss gradient
    let mut hgrad = n * r * q_abs.powf(n-1.0);
    // Headloss
    let mut hloss = hgrad * q_abs / n;

    // contribution of minor losses
    if ml > 0.0 {
      hloss += ml * q_abs.powi(2);
      hgrad += 2.0 * ml * q_abs;
    }

    // guard against too small a head loss gradient (near zero flow)
    if hgrad < RQ_TOL {
      return LinkCoefficients::from_headloss(RQ_TOL * q, RQ_TOL);
    }

    // adjust the headloss to the sign of the flow
    hloss *= q.signum();

    LinkCoefficients::from_headloss(hloss, hgrad)
  }

  fn resistance(&self) -> f64 {
    match self.headloss_formula {
      HeadlossFormula::HazenWilliams => {
        4.727 * self.roughness.powf(-H_EXPONENT) * self.diameter.powf(-4.871) * self.length
      }
      // D-W friction factor is applied on top of this resistance in dw_coefficients
      HeadlossFormula::DarcyWeisbach | HeadlossFormula::ChezyManning => {
        self.length / 2.0 / 32.2 / self.diameter / (PI * self.diameter.powi(2) / 4.0).powi(2)
      }
    }
  }

  fn update_status(&self, status: LinkStatus, _setting: f64, flow: f64, head_upstream: f64, head_downstream: f64) -> Option<LinkStatus> {
    if self.status != PipeStatus::CheckValve || status == LinkStatus::Closed {
      return None;
    }
    let dh = head_upstream - head_downstream;
    let new_status = if dh < -H_TOL || flow < -Q_TOL {
      LinkStatus::TempClosed
    } else if status == LinkStatus::TempClosed && dh > H_TOL {
      LinkStatus::Open
    } else {
      status
    };
    if new_status != status { Some(new_status) } else { None }
  }
}

impl Pipe {
  /// Calculate the coefficients for the Darcy Weisbach headloss formula
  fn dw_coefficients(&self, q: f64, r: f64) -> LinkCoefficients {

    let q_abs = q.abs();
    let ml = self.minor_loss;
    let e = (self.roughness / 1000.0) / self.diameter; // relative roughness (millifeet to ft)
    let s = VISCOSITY * self.diameter;      // kinematic viscosity * diameter

    // Laminar flow (Re <= 2000), use Hagen-Poiseuille formula
    if q_abs <= A2 * s {
      let r = 16.0 * PI * s * r;
      let hloss = q * (r + ml * q_abs);
      let hgrad = r + 2.0 * ml * q_abs;

      LinkCoefficients::from_headloss(hloss, hgrad)

    } else {
      // Turbulent flow (Re > 2000)
      let (f, dfdq) = self.dw_friction_factor(q_abs, e, s);

      let r1 = f * r + ml;
      let hloss = r1 * q_abs * q;
      let hgrad = (2.0 * r1 * q_abs) + (dfdq * r * q_abs.powi(2));

      LinkCoefficients::from_headloss(hloss, hgrad)
    }
  }

  #[inline(always)]
  // Calculate the Darcy Weisbach friction factor and its derivative
  fn dw_friction_factor(&self, q: f64, e: f64, s: f64) -> (f64, f64) {

    let w = q / s;

    // Re >= 4000, use Swamee & Jain approximation
    if w >= A1 {
      let y1 = A8 / w.powf(0.9);
      let y2 = e / 3.7 + y1;
      let y3 = A9 * y2.ln();
      let f = 1.0 / y3.powi(2);
      let dfdq = 1.8 * f * y1 * A9 / y2 / y3 / q;

      (f, dfdq)

    // Use interpolating polynomials by E. Dunlop for transition flow (2000 < Re < 4000)
    } else {
      let y2 = e / 3.7 + AB;
      let y3 = A9 * y2.ln();
      let fa = 1.0 / (y3*y3);
      let fb = (2.0 + AC / (y2*y3)) * fa;
      let r = w / A2;
      let x1 = 7.0 * fa - fb;
      let x2 = 0.128 - 17.0 * fa + 2.5 * fb;
      let x3 = -0.128 + 13.0 * fa - (fb + fb);
      let x4 = 0.032 - 3.0 * fa + 0.5 *fb;
      let f = x1 + r * (x2 + r * (x3 + r * x4));
      let dfdq = (x2 + r * (2.0 * x3 + r * 3.0 * x4)) / s / A2;

      (f, dfdq)
    }
  }
}

impl UnitConversion for Pipe {
  fn convert_units(&mut self, _flow: &FlowUnits, system: &UnitSystem) {
    self.diameter *= system.diameter_to_ft();
    self.length /= system.length_per_ft();
    // D-W roughness is kept in millifeet
    if self.headloss_formula == HeadlossFormula::DarcyWeisbach && system == &UnitSystem::SI {
      self.roughness /= M_PER_FT;
    }
    self.minor_loss = MINOR_LOSS_FACTOR * self.minor_loss / self.diameter.powi(4);
  }
}
