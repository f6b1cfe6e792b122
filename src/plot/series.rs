use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::plot::{Color, PlotSurface};

/// Quantity shown by a time series plot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SeriesKind {
  Pressure,
  Head,
  Demand,
  Quality,
  Flow,
  Velocity,
}

impl FromStr for SeriesKind {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "pressure" => Ok(SeriesKind::Pressure),
      "head" => Ok(SeriesKind::Head),
      "demand" => Ok(SeriesKind::Demand),
      "quality" => Ok(SeriesKind::Quality),
      "flow" => Ok(SeriesKind::Flow),
      "velocity" => Ok(SeriesKind::Velocity),
      _ => Err(format!("Unknown plot type: {}. Use 'pressure', 'head', 'demand', 'quality', 'velocity', or 'flow'", s)),
    }
  }
}

impl SeriesKind {
  /// Node quantities, the others belong to links
  pub fn is_node_kind(&self) -> bool {
    matches!(self, SeriesKind::Pressure | SeriesKind::Head | SeriesKind::Demand | SeriesKind::Quality)
  }

  pub fn title(&self) -> &'static str {
    match self {
      SeriesKind::Pressure => "Node Pressures Over Time",
      SeriesKind::Head => "Node Heads Over Time",
      SeriesKind::Demand => "Node Demands Over Time",
      SeriesKind::Quality => "Node Quality Over Time",
      SeriesKind::Flow => "Link Flows Over Time",
      SeriesKind::Velocity => "Link Velocities Over Time",
    }
  }

  pub fn quantity(&self) -> &'static str {
    match self {
      SeriesKind::Pressure => "Pressure",
      SeriesKind::Head => "Head",
      SeriesKind::Demand => "Demand",
      SeriesKind::Quality => "Quality",
      SeriesKind::Flow => "Flow",
      SeriesKind::Velocity => "Velocity",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum TimeUnit {
  #[default]
  Hours,
  Seconds,
}

impl FromStr for TimeUnit {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "hours" | "hrs" | "h" => Ok(TimeUnit::Hours),
      "seconds" | "sec" | "s" => Ok(TimeUnit::Seconds),
      _ => Err(format!("Unknown time unit: {}", s)),
    }
  }
}

impl TimeUnit {
  pub fn convert(&self, seconds: usize) -> f64 {
    match self {
      TimeUnit::Hours => seconds as f64 / 3600.0,
      TimeUnit::Seconds => seconds as f64,
    }
  }

  pub fn axis_label(&self) -> &'static str {
    match self {
      TimeUnit::Hours => "Time (hrs)",
      TimeUnit::Seconds => "Time (sec)",
    }
  }
}

/// One plotted element
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Series {
  /// Node or link id
  pub id: String,
  pub values: Vec<f64>,
}

/// Data drawn by a time series plot: a shared time axis and one series per element
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TimeSeries {
  pub kind: SeriesKind,
  pub time_unit: TimeUnit,
  pub times: Vec<f64>,
  /// Units of the values, e.g. `psi`
  pub units: String,
  pub series: Vec<Series>,
}

impl TimeSeries {
  pub fn get(&self, id: &str) -> Option<&Series> {
    self.series.iter().find(|s| s.id == id)
  }

  pub fn y_label(&self) -> String {
    if self.units.is_empty() {
      self.kind.quantity().to_string()
    } else {
      format!("{} ({})", self.kind.quantity(), self.units)
    }
  }

  /// Draw one line per element with a legend and grid
  pub fn draw(&self, surface: &mut dyn PlotSurface) {
    surface.clear();
    let prefix = if self.kind.is_node_kind() { "Node" } else { "Link" };
    for (i, series) in self.series.iter().enumerate() {
      surface.line(&self.times, &series.values, Color::cycle(i), &format!("{} {}", prefix, series.id));
    }
    surface.set_title(self.kind.title());
    surface.set_axis_labels(self.time_unit.axis_label(), &self.y_label());
    surface.set_legend(true);
    surface.set_grid(true);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_time_unit() {
    assert_eq!(TimeUnit::Hours.convert(5400), 1.5);
    assert_eq!(TimeUnit::Seconds.convert(5400), 5400.0);
    assert_eq!("sec".parse::<TimeUnit>(), Ok(TimeUnit::Seconds));
  }

  #[test]
  fn test_series_kind() {
    assert_eq!("Velocity".parse::<SeriesKind>(), Ok(SeriesKind::Velocity));
    assert!(!SeriesKind::Flow.is_node_kind());
    assert!(SeriesKind::Quality.is_node_kind());
    assert!("temperature".parse::<SeriesKind>().is_err());
  }
}
