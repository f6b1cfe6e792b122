use serde::{Deserialize, Serialize};

use crate::model::link::LinkType;
use crate::model::network::Network;
use crate::model::node::NodeType;

/// Summary of a loaded network, lengths and elevations in the network's units
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct NetworkStatistics {
  pub title: Option<String>,
  pub node_count: usize,
  pub link_count: usize,
  pub junction_count: usize,
  pub reservoir_count: usize,
  pub tank_count: usize,
  pub pipe_count: usize,
  pub pump_count: usize,
  pub valve_count: usize,
  pub node_names: Vec<String>,
  pub link_names: Vec<String>,
  pub node_elevations: Vec<f64>,
  pub node_coordinates: Vec<Option<(f64, f64)>>,
  pub total_pipe_length: f64,
  pub flow_units: String,
  /// Simulation duration (seconds)
  pub duration: usize,
  /// Reporting time step (seconds)
  pub report_step: usize,
  pub report_periods: usize,
}

impl NetworkStatistics {
  pub fn from_network(network: &Network) -> Self {
    let length = network.options.unit_system().length_per_ft();
    let times = &network.options.times;

    let mut stats = NetworkStatistics {
      title: network.title.first().cloned(),
      node_count: network.nodes.len(),
      link_count: network.links.len(),
      flow_units: network.options.flow_units.label().to_string(),
      duration: times.duration,
      report_step: times.report_step,
      report_periods: times.report_periods(),
      ..Default::default()
    };

    for node in network.nodes.iter() {
      match node.node_type {
        NodeType::Junction(_) => stats.junction_count += 1,
        NodeType::Reservoir(_) => stats.reservoir_count += 1,
        NodeType::Tank(_) => stats.tank_count += 1,
      }
      stats.node_names.push(node.id.to_string());
      stats.node_elevations.push(node.elevation * length);
      stats.node_coordinates.push(node.coordinates);
    }

    for link in network.links.iter() {
      match &link.link_type {
        LinkType::Pipe(pipe) => {
          stats.pipe_count += 1;
          stats.total_pipe_length += pipe.length * length;
        }
        LinkType::Pump(_) => stats.pump_count += 1,
        LinkType::Valve(_) => stats.valve_count += 1,
      }
      stats.link_names.push(link.id.to_string());
    }
    stats
  }
}
