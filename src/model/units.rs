use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum FlowUnits {
  // Imperial units
  CFS,  // Cubic feet per second
  GPM,  // Gallons per minute
  MGD,  // Million gallons per day
  IMGD, // Imperial million gallons per day
  AFD,  // Acre-feet per day
  // Metric units
  LPS,  // Liters per second
  LPM,  // Liters per minute
  MLD,  // Million liters per day
  CMS,  // Cubic meters per second
  CMH,  // Cubic meters per hour
  CMD   // Cubic meters per day
}

/// FromStr implementation for FlowUnits
impl FromStr for FlowUnits {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_uppercase().as_str() {
      "CFS" => Ok(FlowUnits::CFS),
      "GPM" => Ok(FlowUnits::GPM),
      "MGD" => Ok(FlowUnits::MGD),
      "IMGD" => Ok(FlowUnits::IMGD),
      "AFD" => Ok(FlowUnits::AFD),
      "LPS" => Ok(FlowUnits::LPS),
      "LPM" => Ok(FlowUnits::LPM),
      "MLD" => Ok(FlowUnits::MLD),
      "CMS" => Ok(FlowUnits::CMS),
      "CMH" => Ok(FlowUnits::CMH),
      "CMD" => Ok(FlowUnits::CMD),
      _ => Err(format!("Invalid flow unit: {}", s)),
    }
  }
}

impl FlowUnits {
  /// Number of flow units in one cubic foot per second
  pub fn per_cfs(&self) -> f64 {
    match self {
      FlowUnits::CFS => 1.0,
      FlowUnits::GPM => GPM_PER_CFS,
      FlowUnits::MGD => MGD_PER_CFS,
      FlowUnits::IMGD => IMGD_PER_CFS,
      FlowUnits::AFD => AFD_PER_CFS,
      FlowUnits::LPS => LPS_PER_CFS,
      FlowUnits::LPM => LPM_PER_CFS,
      FlowUnits::MLD => MLD_PER_CFS,
      FlowUnits::CMS => CMS_PER_CFS,
      FlowUnits::CMH => CMH_PER_CFS,
      FlowUnits::CMD => CMD_PER_CFS,
    }
  }

  /// The unit system implied by the flow units
  pub fn unit_system(&self) -> UnitSystem {
    match self {
      FlowUnits::CFS | FlowUnits::GPM | FlowUnits::MGD | FlowUnits::IMGD | FlowUnits::AFD => UnitSystem::US,
      _ => UnitSystem::SI,
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      FlowUnits::CFS => "cfs",
      FlowUnits::GPM => "gpm",
      FlowUnits::MGD => "mgd",
      FlowUnits::IMGD => "Imgd",
      FlowUnits::AFD => "afd",
      FlowUnits::LPS => "L/s",
      FlowUnits::LPM => "L/min",
      FlowUnits::MLD => "ML/d",
      FlowUnits::CMS => "m3/s",
      FlowUnits::CMH => "m3/h",
      FlowUnits::CMD => "m3/d",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum PressureUnits {
  PSI,    // Pounds per square inch
  KPA,    // Kilopascals
  METERS, // Meters
  FEET,   // Feet
  BAR,    // Bar
}

impl FromStr for PressureUnits {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_uppercase().as_str() {
      "PSI" => Ok(PressureUnits::PSI),
      "KPA" => Ok(PressureUnits::KPA),
      "METERS" | "M" => Ok(PressureUnits::METERS),
      "FEET" | "FT" => Ok(PressureUnits::FEET),
      "BAR" => Ok(PressureUnits::BAR),
      _ => Err(format!("Invalid pressure unit: {}", s)),
    }
  }
}

impl PressureUnits {
  /// Number of pressure units in one foot of water head
  pub fn per_ft(&self) -> f64 {
    match self {
      PressureUnits::PSI => PSI_PER_FT,
      PressureUnits::KPA => PSI_PER_FT * KPA_PER_PSI,
      PressureUnits::BAR => PSI_PER_FT * BAR_PER_PSI,
      PressureUnits::METERS => M_PER_FT,
      PressureUnits::FEET => 1.0,
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      PressureUnits::PSI => "psi",
      PressureUnits::KPA => "kPa",
      PressureUnits::METERS => "m",
      PressureUnits::FEET => "ft",
      PressureUnits::BAR => "bar",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum UnitSystem {
  US, // US Customary units
  SI, // International System of Units (metric)
}

impl UnitSystem {
  /// Number of length units (ft or m) in one foot
  pub fn length_per_ft(&self) -> f64 {
    match self {
      UnitSystem::US => 1.0,
      UnitSystem::SI => M_PER_FT,
    }
  }

  /// Feet per diameter unit (in or mm)
  pub fn diameter_to_ft(&self) -> f64 {
    match self {
      UnitSystem::US => 1.0 / 12.0,
      UnitSystem::SI => 1.0 / (1e3 * M_PER_FT),
    }
  }

  pub fn length_label(&self) -> &'static str {
    match self {
      UnitSystem::US => "ft",
      UnitSystem::SI => "m",
    }
  }

  pub fn velocity_label(&self) -> &'static str {
    match self {
      UnitSystem::US => "ft/s",
      UnitSystem::SI => "m/s",
    }
  }
}

/// Conversion of input data from the file's units to internal US units (ft, cfs)
pub trait UnitConversion {
  fn convert_units(&mut self, flow: &FlowUnits, system: &UnitSystem);
}
