use serde::{Deserialize, Serialize};

use crate::model::units::{FlowUnits, PressureUnits, UnitSystem};

#[derive(Debug, Eq, PartialEq, Clone, Copy, Deserialize, Serialize)]
pub enum HeadlossFormula {
  HazenWilliams, // H-W
  DarcyWeisbach, // D-W
  ChezyManning,  // C-M
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum QualityMode {
  None,
  /// Reactive or conservative constituent, with its name and concentration units
  Chemical { name: Box<str>, units: Box<str> },
  /// Water age in hours
  Age,
  /// Percent of flow originating at the given node
  Trace { node_id: Box<str> },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QualityOptions {
  pub mode: QualityMode,
  /// Global first order bulk reaction coefficient (1/day)
  pub bulk_coeff: f64,
}

impl Default for QualityOptions {
  fn default() -> Self {
    Self { mode: QualityMode::None, bulk_coeff: 0.0 }
  }
}

impl QualityOptions {
  pub fn units_label(&self) -> &str {
    match &self.mode {
      QualityMode::None => "",
      QualityMode::Chemical { units, .. } => units,
      QualityMode::Age => "hrs",
      QualityMode::Trace { .. } => "%",
    }
  }
}

/// Simulation clock settings, all in seconds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeOptions {
  pub duration: usize,
  pub hydraulic_step: usize,
  pub pattern_step: usize,
  pub pattern_start: usize,
  pub report_step: usize,
  pub report_start: usize,
  pub start_clocktime: usize,
}

impl Default for TimeOptions {
  fn default() -> Self {
    Self {
      duration: 0,
      hydraulic_step: 3600,
      pattern_step: 3600,
      pattern_start: 0,
      report_step: 3600,
      report_start: 0,
      start_clocktime: 0,
    }
  }
}

impl TimeOptions {
  /// Number of reporting periods between report start and the end of the simulation
  pub fn report_periods(&self) -> usize {
    if self.report_start > self.duration {
      return 0;
    }
    (self.duration - self.report_start) / self.report_step.max(1) + 1
  }

  /// Time in seconds of each reporting period
  pub fn report_times(&self) -> Vec<usize> {
    (0..self.report_periods()).map(|i| self.report_start + i * self.report_step.max(1)).collect()
  }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationOptions {
  pub flow_units: FlowUnits,
  /// Explicit pressure units, defaults follow the unit system when absent
  pub pressure_units: Option<PressureUnits>,
  pub headloss_formula: HeadlossFormula,

  pub max_trials: usize,
  pub accuracy: f64,
  pub check_frequency: usize,
  pub max_check: usize,
  pub demand_multiplier: f64,

  pub pattern: Option<Box<str>>,

  pub times: TimeOptions,
  pub quality: QualityOptions,
}

/// Default implementation for SimulationOptions
impl Default for SimulationOptions {
  fn default() -> Self {
    Self {
      flow_units: FlowUnits::GPM,
      pressure_units: None,
      headloss_formula: HeadlossFormula::HazenWilliams,
      max_trials: 200,
      accuracy: 0.001,
      check_frequency: 2,
      max_check: 10,
      demand_multiplier: 1.0,
      pattern: None,
      times: TimeOptions::default(),
      quality: QualityOptions::default(),
    }
  }
}

impl SimulationOptions {
  pub fn unit_system(&self) -> UnitSystem {
    self.flow_units.unit_system()
  }

  pub fn pressure_units(&self) -> PressureUnits {
    match self.pressure_units {
      Some(units) => units,
      None => match self.unit_system() {
        UnitSystem::US => PressureUnits::PSI,
        UnitSystem::SI => PressureUnits::METERS,
      },
    }
  }
}
