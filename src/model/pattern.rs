use serde::{Deserialize, Serialize};

/// Time pattern of multipliers, one per pattern step, repeating
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Pattern {
  pub id: Box<str>,
  pub multipliers: Vec<f64>,
}

impl Pattern {
  /// Multiplier for the given pattern period, wrapping around the end of the pattern
  pub fn multiplier(&self, period: usize) -> f64 {
    if self.multipliers.is_empty() {
      return 1.0;
    }
    self.multipliers[period % self.multipliers.len()]
  }
}
