use serde::{Deserialize, Serialize};

use crate::model::units::{FlowUnits, UnitSystem, UnitConversion};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Curve {
  pub id: Box<str>,
  pub x: Vec<f64>,
  pub y: Vec<f64>,
}

/// Power function fit h = h_shutoff - r * q^n of a pump head curve
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeadCurveStatistics {
  pub h_max: f64,           // maximum head
  pub h_shutoff: f64,       // shutoff head
  pub q_max: f64,           // maximum flow
  pub q_initial: f64,       // design flow (= initial flow)
  pub r: f64,               // flow coefficient
  pub n: f64,               // pump exponent
}

impl Curve {
  /// Fit a pump head curve from a single design point or three points starting at zero flow
  pub fn head_curve_statistics(&self) -> Result<HeadCurveStatistics, String> {

    if self.x.len() == 1 {

      let q = self.x[0];
      let h = self.y[0];
      if q <= 0.0 || h <= 0.0 {
        return Err(format!("Invalid design point for pump curve {}", self.id));
      }

      // compute the coefficients for the head curve
      let a = h * 4.0 / 3.0; // maximum head / shutoff head
      let b = (a-h)/(q*q);  // flow coefficient

      Ok(HeadCurveStatistics {
        h_max: a,
        h_shutoff: a,
        q_max: q * 2.0,
        q_initial: q,
        r: b,
        n: 2.0,
      })
    }

    else if self.x.len() == 3 && self.x[0] == 0.0 {
      let (h0, h1, h2) = (self.y[0], self.y[1], self.y[2]);
      let (q1, q2) = (self.x[1], self.x[2]);

      // heads must drop and flows must rise along the curve
      if !(h0 > h1 && h1 > h2 && q2 > q1 && q1 > 0.0) {
        return Err(format!("Pump curve {} is not monotonic", self.id));
      }
      let h4 = h0 - h1;
      let h5 = h0 - h2;
      let n = (h5 / h4).ln() / (q2 / q1).ln();
      if n <= 0.0 || n > 20.0 {
        return Err(format!("Pump curve {} cannot be fitted with a power function", self.id));
      }
      let r = h4 / q1.powf(n);

      Ok(HeadCurveStatistics {
        h_max: h0,
        h_shutoff: h0,
        q_max: (h0 / r).powf(1.0 / n),
        q_initial: q1,
        r,
        n,
      })
    }

    else {
      Err(format!("Pump curve {} has {} points, only 1 or 3 point curves are supported", self.id, self.x.len()))
    }
  }
}

impl UnitConversion for HeadCurveStatistics {
  fn convert_units(&mut self, flow: &FlowUnits, system: &UnitSystem) {
    let qf = flow.per_cfs();
    let hf = system.length_per_ft();
    self.h_max /= hf;
    self.h_shutoff /= hf;
    self.q_max /= qf;
    self.q_initial /= qf;
    // h = r q^n, so r scales with hf / qf^n
    self.r *= qf.powf(self.n) / hf;
  }
}
