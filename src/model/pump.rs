use serde::{Deserialize, Serialize};

use crate::model::link::{LinkTrait, LinkStatus, LinkCoefficients};
use crate::model::curve::HeadCurveStatistics;
use crate::model::units::{FlowUnits, UnitSystem, UnitConversion};
use crate::constants::*;

/// Horsepower to ft^4/s of head times flow for water (550 ft.lbf/s / 62.4 lbf/ft3)
const HP_TO_FT4S: f64 = 550.0 / 62.4;
const KW_PER_HP: f64 = 0.7457;

#[derive(Debug, Deserialize, Serialize)]
pub struct Pump {
  pub speed: f64,
  /// Head curve id, empty for constant power pumps
  pub head_curve: Box<str>,
  /// Constant power (hp once converted)
  pub power: f64,
  pub pattern: Option<Box<str>>,
  #[serde(skip)]
  pub head_curve_statistics: Option<HeadCurveStatistics>,
}

impl LinkTrait for Pump {
  fn coefficients(&self, q: f64, _resistance: f64, status: LinkStatus, speed: f64) -> LinkCoefficients {

    // for closed pumps, stalled pumps, or pumps with zero speed, act as closed pipe
    if status.is_closed() || speed == 0.0 {
      return LinkCoefficients::simple(1.0 / BIG_VALUE, q);
    }

    let curve = match &self.head_curve_statistics {
      Some(curve) => curve,
      // constant power pump: head gain = w / q
      None => {
        let w = self.power * HP_TO_FT4S * speed;
        let q = q.max(TINY);
        let hloss = -w / q;
        let hgrad = (w / (q * q)).max(RQ_TOL);
        return LinkCoefficients::from_headloss(hloss, hgrad);
      }
    };

    // Prevent negative flow
    if q < 0.0 {
      let hloss = -(speed.powi(2) * curve.h_max) + BIG_VALUE * q;
      let hgrad = BIG_VALUE;
      return LinkCoefficients::from_headloss(hloss, hgrad);
    }

    // shutoff head is negative to represent head gain
    let h0 = speed.powi(2) * -curve.h_shutoff;
    let mut n = curve.n;
    if (curve.n - 1.0).abs() < TINY { n = 1.0; }
    let r = curve.r * speed.powf(2.0 - n);

    // curve is nonlinear
    let (hgrad, hloss) = if n != 1.0 {
      let hgrad = (n * r * q.powf(n - 1.0)).max(RQ_TOL);
      let hloss = h0 + r * q.powf(n);
      (hgrad, hloss)
    }
    // curve is linear
    else {
      let hgrad = r.max(RQ_TOL);
      let hloss = h0 + hgrad * q;
      (hgrad, hloss)
    };

    LinkCoefficients::from_headloss(hloss, hgrad)
  }

  fn resistance(&self) -> f64 {
    BIG_VALUE
  }

  fn update_status(&self, status: LinkStatus, speed: f64, _flow: f64, head_upstream: f64, head_downstream: f64) -> Option<LinkStatus> {
    let curve = self.head_curve_statistics.as_ref()?;
    let lift = head_downstream - head_upstream;
    let max_lift = speed.powi(2) * curve.h_shutoff;
    match status {
      LinkStatus::Open if lift > max_lift => Some(LinkStatus::Xhead),
      LinkStatus::Xhead if lift < max_lift => Some(LinkStatus::Open),
      _ => None,
    }
  }
}

impl UnitConversion for Pump {
  fn convert_units(&mut self, flow: &FlowUnits, system: &UnitSystem) {
    if let Some(curve) = self.head_curve_statistics.as_mut() {
      curve.convert_units(flow, system);
    }
    if system == &UnitSystem::SI {
      self.power /= KW_PER_HP;
    }
  }
}
