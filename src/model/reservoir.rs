use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Reservoir {
  /// Pattern applied to the reservoir's total head
  pub head_pattern: Option<Box<str>>,
}
