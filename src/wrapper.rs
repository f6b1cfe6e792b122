//! Session facade over one loaded EPANET network.
//!
//! The lifecycle is load, optionally simulate, then query and plot, then close. Queries and
//! plots that need results fail with [`WrapperError::NoSimulation`] until
//! [`EpanetWrapper::run_simulation`] has succeeded.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use hashbrown::HashMap;
use simplelog::{debug, info, warn};

use crate::error::WrapperError;
use crate::model::network::Network;
use crate::model::options::QualityMode;
use crate::plot::network::{draw_network, ColorLayer};
use crate::plot::params::{ATTRIBUTE_PARAMS, TOPOLOGY_PARAMS};
use crate::plot::series::Series;
use crate::plot::{Colormap, PlotParams, PlotSurface, SeriesKind, TimeSeries, TimeUnit};
use crate::solver::{HydraulicSolver, SolverResult};
use crate::statistics::NetworkStatistics;

/// A node or link given by its id or by its 1-based index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementRef {
  Id(String),
  Index(usize),
}

impl From<&str> for ElementRef {
  fn from(id: &str) -> Self {
    ElementRef::Id(id.to_string())
  }
}

impl From<String> for ElementRef {
  fn from(id: String) -> Self {
    ElementRef::Id(id)
  }
}

impl From<usize> for ElementRef {
  fn from(index: usize) -> Self {
    ElementRef::Index(index)
  }
}

/// `#3` is the third element, anything else is an id
impl FromStr for ElementRef {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.strip_prefix('#') {
      Some(index) => index.parse::<usize>()
        .map(ElementRef::Index)
        .map_err(|_| format!("Invalid element index '{}'", s)),
      None => Ok(ElementRef::Id(s.to_string())),
    }
  }
}

impl fmt::Display for ElementRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ElementRef::Id(id) => write!(f, "{}", id),
      ElementRef::Index(index) => write!(f, "#{}", index),
    }
  }
}

/// Node attributes available through [`EpanetWrapper::get_node_attribute`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAttribute {
  Elevation,
  BaseDemand,
  X,
  Y,
  InitialQuality,
  Head,
  Pressure,
  Demand,
  Quality,
}

impl FromStr for NodeAttribute {
  type Err = WrapperError;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().replace([' ', '-'], "_").as_str() {
      "elevation" => Ok(NodeAttribute::Elevation),
      "base_demand" | "basedemand" | "basedemands" => Ok(NodeAttribute::BaseDemand),
      "x" => Ok(NodeAttribute::X),
      "y" => Ok(NodeAttribute::Y),
      "initial_quality" | "initqual" => Ok(NodeAttribute::InitialQuality),
      "head" => Ok(NodeAttribute::Head),
      "pressure" => Ok(NodeAttribute::Pressure),
      "demand" | "actual_demand" => Ok(NodeAttribute::Demand),
      "quality" => Ok(NodeAttribute::Quality),
      _ => Err(WrapperError::UnknownAttribute(s.to_string())),
    }
  }
}

impl NodeAttribute {
  /// Attributes computed by the simulation
  pub fn requires_simulation(&self) -> bool {
    matches!(self, NodeAttribute::Head | NodeAttribute::Pressure | NodeAttribute::Demand | NodeAttribute::Quality)
  }
}

/// Attributes a network plot can be coloured by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotAttribute {
  Elevation,
  Pressure,
  Flow,
  Quality,
}

impl FromStr for PlotAttribute {
  type Err = WrapperError;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "elevation" => Ok(PlotAttribute::Elevation),
      "pressure" => Ok(PlotAttribute::Pressure),
      "flow" => Ok(PlotAttribute::Flow),
      "quality" => Ok(PlotAttribute::Quality),
      _ => Err(WrapperError::UnknownAttribute(format!(
        "{}. Use 'elevation', 'pressure', 'flow', or 'quality'", s
      ))),
    }
  }
}

#[derive(Debug, Default)]
pub struct EpanetWrapper {
  network: Option<Network>,
  inp_file: Option<PathBuf>,
  statistics: Option<NetworkStatistics>,
  results: Option<SolverResult>,
}

impl EpanetWrapper {
  pub fn new() -> Self {
    Self::default()
  }

  /// Create a session with a file already loaded
  pub fn with_file(inp_file: impl AsRef<Path>) -> Result<Self, WrapperError> {
    let mut wrapper = Self::new();
    wrapper.load_file(inp_file)?;
    Ok(wrapper)
  }

  /// Load an `.inp` file, replacing any network loaded before
  pub fn load_file(&mut self, inp_file: impl AsRef<Path>) -> Result<(), WrapperError> {
    let path = inp_file.as_ref();
    if !path.exists() {
      return Err(WrapperError::FileNotFound(path.to_path_buf()));
    }
    let is_inp = path.extension()
      .and_then(|e| e.to_str())
      .is_some_and(|e| e.eq_ignore_ascii_case("inp"));
    if !is_inp {
      return Err(WrapperError::InvalidExtension(path.display().to_string()));
    }
    if self.is_loaded() {
      debug!("Closing {} before loading {}", self.get_file_name().unwrap_or_default(), path.display());
      self.close();
    }

    let start_time = Instant::now();
    let network = Network::from_inp(path)?;
    info!("Loaded network with {} nodes and {} links", network.nodes.len(), network.links.len());
    debug!("Network loaded in {:?}", start_time.elapsed());

    self.statistics = Some(NetworkStatistics::from_network(&network));
    self.network = Some(network);
    self.inp_file = Some(path.to_path_buf());
    Ok(())
  }

  /// Release the loaded network and its results
  pub fn close(&mut self) {
    self.network = None;
    self.inp_file = None;
    self.statistics = None;
    self.results = None;
  }

  pub fn is_loaded(&self) -> bool {
    self.network.is_some()
  }

  pub fn get_file_name(&self) -> Option<String> {
    self.inp_file.as_ref()
      .and_then(|p| p.file_name())
      .map(|n| n.to_string_lossy().into_owned())
  }

  pub fn get_file_path(&self) -> Option<&Path> {
    self.inp_file.as_deref()
  }

  pub fn network(&self) -> Result<&Network, WrapperError> {
    self.network.as_ref().ok_or(WrapperError::NotLoaded)
  }

  /// Run the hydraulic and water quality simulation of the loaded network
  pub fn run_simulation(&mut self) -> Result<(), WrapperError> {
    let network = self.network.as_ref().ok_or(WrapperError::NotLoaded)?;

    let start_time = Instant::now();
    let solver = HydraulicSolver::new(network).map_err(WrapperError::Simulation)?;
    let result = solver.run().map_err(WrapperError::Simulation)?;
    info!("Simulated {} reporting periods in {:?}", result.periods(), start_time.elapsed());
    if result.unbalanced_steps > 0 {
      warn!("{} hydraulic steps did not converge", result.unbalanced_steps);
    }
    self.results = Some(result);
    Ok(())
  }

  pub fn has_results(&self) -> bool {
    self.results.is_some()
  }

  pub fn results(&self) -> Result<&SolverResult, WrapperError> {
    self.network()?;
    self.results.as_ref().ok_or(WrapperError::NoSimulation)
  }

  /// Write the simulation results to a `.json` or `.mpk` file
  pub fn export_results(&self, file: impl AsRef<Path>) -> Result<(), WrapperError> {
    let results = self.results()?;
    self.network()?.write_results(results, file)
  }

  pub fn get_statistics(&self) -> Result<NetworkStatistics, WrapperError> {
    self.statistics.clone().ok_or(WrapperError::NotLoaded)
  }

  /// Resolve a node reference to its 0-based index
  pub fn node_index(&self, node: &ElementRef) -> Result<usize, WrapperError> {
    let network = self.network()?;
    match node {
      ElementRef::Id(id) => network.node_index(id).ok_or_else(|| WrapperError::UnknownNode(id.clone())),
      ElementRef::Index(i) if *i >= 1 && *i <= network.nodes.len() => Ok(i - 1),
      ElementRef::Index(_) => Err(WrapperError::UnknownNode(node.to_string())),
    }
  }

  /// Resolve a link reference to its 0-based index
  pub fn link_index(&self, link: &ElementRef) -> Result<usize, WrapperError> {
    let network = self.network()?;
    match link {
      ElementRef::Id(id) => network.link_index(id).ok_or_else(|| WrapperError::UnknownLink(id.clone())),
      ElementRef::Index(i) if *i >= 1 && *i <= network.links.len() => Ok(i - 1),
      ElementRef::Index(_) => Err(WrapperError::UnknownLink(link.to_string())),
    }
  }

  /// Value of an attribute for one node. Simulated attributes are averaged over the
  /// reporting periods.
  pub fn get_node_attribute(&self, node: impl Into<ElementRef>, attribute: &str) -> Result<f64, WrapperError> {
    self.network()?;
    let attribute: NodeAttribute = attribute.parse()?;
    let index = self.node_index(&node.into())?;
    Ok(self.node_attribute_values(attribute)?[index])
  }

  /// Value of an attribute for every node, in network order
  pub fn get_node_attributes(&self, attribute: &str) -> Result<Vec<(String, f64)>, WrapperError> {
    let network = self.network()?;
    let attribute: NodeAttribute = attribute.parse()?;
    let values = self.node_attribute_values(attribute)?;
    Ok(network.nodes.iter().map(|n| n.id.to_string()).zip(values).collect())
  }

  pub fn get_node_elevations(&self) -> Result<HashMap<String, f64>, WrapperError> {
    Ok(self.get_node_attributes("elevation")?.into_iter().collect())
  }

  /// Time averaged node pressures
  pub fn get_node_pressures(&self) -> Result<HashMap<String, f64>, WrapperError> {
    Ok(self.get_node_attributes("pressure")?.into_iter().collect())
  }

  /// Time averaged link flows
  pub fn get_link_flows(&self) -> Result<HashMap<String, f64>, WrapperError> {
    let network = self.network()?;
    let flows = time_average(&self.results()?.flows, network.links.len());
    Ok(network.links.iter().map(|l| l.id.to_string()).zip(flows).collect())
  }

  fn node_attribute_values(&self, attribute: NodeAttribute) -> Result<Vec<f64>, WrapperError> {
    let network = self.network()?;
    let n = network.nodes.len();
    let system = network.options.unit_system();
    let flow = network.options.flow_units.per_cfs();

    if attribute.requires_simulation() {
      let results = self.results()?;
      let rows = match attribute {
        NodeAttribute::Head => &results.heads,
        NodeAttribute::Pressure => &results.pressures,
        NodeAttribute::Demand => &results.demands,
        _ => &results.quality,
      };
      return Ok(time_average(rows, n));
    }

    let values = network.nodes.iter().map(|node| match attribute {
      NodeAttribute::Elevation => node.elevation * system.length_per_ft(),
      NodeAttribute::BaseDemand => node.base_demand() * flow,
      NodeAttribute::X => node.coordinates.map(|c| c.0).unwrap_or(f64::NAN),
      NodeAttribute::Y => node.coordinates.map(|c| c.1).unwrap_or(f64::NAN),
      _ => node.initial_quality,
    }).collect();
    Ok(values)
  }

  /// Plot the network layout
  pub fn plot_network_topology(&self, surface: &mut dyn PlotSurface, params: &PlotParams) -> Result<(), WrapperError> {
    let network = self.network()?;
    let options = params.options(&TOPOLOGY_PARAMS);
    draw_network(surface, network, "EPANET Network", None, None, &options);
    Ok(())
  }

  /// Plot the network coloured by an attribute: `elevation`, `pressure`, `flow` or `quality`.
  /// Without a period simulated values are averaged over time, a period past the end of the
  /// simulation shows the first period.
  pub fn plot_network_attributes(
    &self,
    surface: &mut dyn PlotSurface,
    attribute: &str,
    period: Option<usize>,
    params: &PlotParams,
  ) -> Result<(), WrapperError> {
    let network = self.network()?;
    let attribute: PlotAttribute = attribute.parse()?;
    let options = params.options(&ATTRIBUTE_PARAMS);

    if attribute == PlotAttribute::Elevation {
      let elevations = self.node_attribute_values(NodeAttribute::Elevation)?;
      let label = "Elevation";
      let layer = ColorLayer::new(&elevations, options.colormap.unwrap_or(Colormap::Oranges), label);
      draw_network(surface, network, "EPANET Network - Elevations", Some(layer), None, &options);
      return Ok(());
    }

    let results = self.results()?;
    let rows = match attribute {
      PlotAttribute::Pressure => &results.pressures,
      PlotAttribute::Flow => &results.flows,
      _ => &results.quality,
    };
    let width = if attribute == PlotAttribute::Flow { network.links.len() } else { network.nodes.len() };
    let values = match period {
      None => time_average(rows, width),
      Some(p) => {
        let p = if p < rows.len() { p } else {
          warn!("Period {} is past the end of the simulation, showing period 0", p);
          0
        };
        rows.get(p).cloned().unwrap_or_else(|| vec![0.0; width])
      }
    };

    match attribute {
      PlotAttribute::Pressure => {
        let layer = ColorLayer::new(&values, options.colormap.unwrap_or(Colormap::Viridis), "Pressure");
        draw_network(surface, network, "EPANET Network (Pressures)", Some(layer), None, &options);
      }
      PlotAttribute::Flow => {
        let layer = ColorLayer::new(&values, options.colormap.unwrap_or(Colormap::Plasma), "Flow");
        draw_network(surface, network, "EPANET Network (Flows)", None, Some(layer), &options);
      }
      _ => {
        if network.options.quality.mode == QualityMode::None {
          warn!("No water quality analysis in the network options, quality is zero everywhere");
        }
        let layer = ColorLayer::new(&values, options.colormap.unwrap_or(Colormap::Blues), "Quality");
        draw_network(surface, network, "EPANET Network (Quality)", Some(layer), None, &options);
      }
    }
    Ok(())
  }

  /// Plot time series of nodes or links. Without elements every node (or link) is plotted.
  pub fn plot_time_series(
    &self,
    surface: &mut dyn PlotSurface,
    kind: SeriesKind,
    elements: Option<&[ElementRef]>,
    time_unit: TimeUnit,
  ) -> Result<TimeSeries, WrapperError> {
    let series = self.time_series(kind, elements, time_unit)?;
    series.draw(surface);
    Ok(series)
  }

  /// Time series data without plotting
  pub fn time_series(&self, kind: SeriesKind, elements: Option<&[ElementRef]>, time_unit: TimeUnit) -> Result<TimeSeries, WrapperError> {
    let network = self.network()?;
    let results = self.results()?;
    let options = &network.options;
    let system = options.unit_system();

    let count = if kind.is_node_kind() { network.nodes.len() } else { network.links.len() };
    let indices: Vec<usize> = match elements {
      None => (0..count).collect(),
      Some(elements) => elements.iter()
        .map(|e| if kind.is_node_kind() { self.node_index(e) } else { self.link_index(e) })
        .collect::<Result<_, _>>()?,
    };

    let (rows, units) = match kind {
      SeriesKind::Pressure => (&results.pressures, options.pressure_units().label()),
      SeriesKind::Head => (&results.heads, system.length_label()),
      SeriesKind::Demand => (&results.demands, options.flow_units.label()),
      SeriesKind::Quality => (&results.quality, options.quality.units_label()),
      SeriesKind::Flow => (&results.flows, options.flow_units.label()),
      SeriesKind::Velocity => (&results.velocities, system.velocity_label()),
    };

    let series = indices.iter().map(|&i| {
      let id = if kind.is_node_kind() { network.nodes[i].id.to_string() } else { network.links[i].id.to_string() };
      Series { id, values: rows.iter().map(|row| row[i]).collect() }
    }).collect();

    Ok(TimeSeries {
      kind,
      time_unit,
      times: results.times.iter().map(|t| time_unit.convert(*t)).collect(),
      units: units.to_string(),
      series,
    })
  }
}

/// Average of each column over the rows
fn time_average(rows: &[Vec<f64>], width: usize) -> Vec<f64> {
  if rows.is_empty() {
    return vec![0.0; width];
  }
  let mut sum = vec![0.0; width];
  for row in rows.iter() {
    for (s, v) in sum.iter_mut().zip(row.iter()) {
      *s += v;
    }
  }
  sum.into_iter().map(|s| s / rows.len() as f64).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_element_ref_from_str() {
    assert_eq!("#2".parse::<ElementRef>(), Ok(ElementRef::Index(2)));
    assert_eq!("J-2".parse::<ElementRef>(), Ok(ElementRef::Id("J-2".into())));
    assert!("#x".parse::<ElementRef>().is_err());
    assert_eq!(ElementRef::Index(4).to_string(), "#4");
  }

  #[test]
  fn test_node_attribute_names() {
    assert_eq!("Base Demand".parse::<NodeAttribute>().unwrap(), NodeAttribute::BaseDemand);
    assert!("pressure".parse::<NodeAttribute>().unwrap().requires_simulation());
    assert!(!"elevation".parse::<NodeAttribute>().unwrap().requires_simulation());
    assert!(matches!("colour".parse::<NodeAttribute>(), Err(WrapperError::UnknownAttribute(_))));
  }

  #[test]
  fn test_time_average() {
    let rows = vec![vec![1.0, 2.0], vec![3.0, 6.0]];
    assert_eq!(time_average(&rows, 2), vec![2.0, 4.0]);
    assert_eq!(time_average(&[], 3), vec![0.0; 3]);
  }

  #[test]
  fn test_queries_need_a_loaded_file() {
    let wrapper = EpanetWrapper::new();
    assert!(matches!(wrapper.get_statistics(), Err(WrapperError::NotLoaded)));
    assert!(matches!(wrapper.get_node_attribute("1", "elevation"), Err(WrapperError::NotLoaded)));
    assert!(matches!(wrapper.results(), Err(WrapperError::NotLoaded)));
    assert!(wrapper.get_file_name().is_none());
  }
}
