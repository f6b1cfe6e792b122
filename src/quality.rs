//! Water quality routing on the hydraulic solution of each reporting period.
//!
//! Every period is treated as a steady state: node concentrations are the flow weighted
//! mix of the water arriving through their inflow links, with bulk reaction or aging
//! applied over each pipe's travel time.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use simplelog::debug;

use crate::model::link::LinkType;
use crate::model::network::Network;
use crate::model::options::QualityMode;
use crate::solver::HydraulicState;

/// Flows below this (cfs) do not carry water between nodes
const Q_ZERO: f64 = 1e-6;
/// Sweeps over the nodes of a flow cycle
const MAX_CYCLE_SWEEPS: usize = 100;
const CYCLE_TOL: f64 = 1e-6;

pub struct QualitySolver<'a> {
  network: &'a Network,
  trace_node: Option<usize>,
}

/// Water carried by a link in its flow direction
struct Transit {
  flow: f64,
  /// Travel time through the link in seconds
  travel_time: f64,
}

/// Nodes connected by the links that carry flow, edges point downstream
type FlowGraph = DiGraph<(), Transit>;

impl<'a> QualitySolver<'a> {
  pub fn new(network: &'a Network) -> Self {
    let trace_node = match &network.options.quality.mode {
      QualityMode::Trace { node_id } => network.node_index(node_id),
      _ => None,
    };
    Self { network, trace_node }
  }

  /// Node quality for each recorded period
  pub fn run(&self, periods: &[(usize, HydraulicState)]) -> Vec<Vec<f64>> {
    let n = self.network.nodes.len();
    if self.network.options.quality.mode == QualityMode::None {
      return vec![vec![0.0; n]; periods.len()];
    }
    periods.iter().map(|(_, state)| self.solve_period(state)).collect()
  }

  /// Quality of a source node, or None if the node takes the quality of its inflows
  fn source_quality(&self, node: usize) -> Option<f64> {
    let n = &self.network.nodes[node];
    match &self.network.options.quality.mode {
      QualityMode::None => Some(0.0),
      QualityMode::Chemical { .. } => n.is_fixed().then_some(n.initial_quality),
      QualityMode::Age => n.is_fixed().then_some(0.0),
      QualityMode::Trace { .. } => {
        if Some(node) == self.trace_node {
          Some(100.0)
        } else {
          n.is_fixed().then_some(0.0)
        }
      }
    }
  }

  /// Quality of water leaving a link given the quality entering it
  fn transport(&self, quality: f64, travel_time: f64) -> f64 {
    match &self.network.options.quality.mode {
      QualityMode::Chemical { .. } => {
        let kb = self.network.options.quality.bulk_coeff;
        quality * (kb * travel_time / 86400.0).exp()
      }
      QualityMode::Age => quality + travel_time / 3600.0,
      QualityMode::None | QualityMode::Trace { .. } => quality,
    }
  }

  /// Flow directed graph of one hydraulic state, node indices match the network's
  fn flow_graph(&self, state: &HydraulicState) -> FlowGraph {
    let network = self.network;
    let topology = network.graph();
    let mut graph = FlowGraph::with_capacity(network.nodes.len(), network.links.len());
    for _ in network.nodes.iter() {
      graph.add_node(());
    }

    for edge in topology.edge_references() {
      let k = *edge.weight();
      let q = state.flows[k];
      if state.statuses[k].is_closed() || q.abs() < Q_ZERO {
        continue;
      }
      let (from, to) = if q > 0.0 { (edge.source(), edge.target()) } else { (edge.target(), edge.source()) };
      let link = &network.links[k];
      let travel_time = match &link.link_type {
        LinkType::Pipe(pipe) => {
          let velocity = link.velocity(q);
          if velocity > 0.0 { pipe.length / velocity } else { 0.0 }
        }
        _ => 0.0,
      };
      graph.add_edge(from, to, Transit { flow: q.abs(), travel_time });
    }
    graph
  }

  fn solve_period(&self, state: &HydraulicState) -> Vec<f64> {
    let graph = self.flow_graph(state);
    let mut quality = vec![0.0; graph.node_count()];

    // strongly connected components come in reverse topological order
    for component in tarjan_scc(&graph).into_iter().rev() {
      match component.as_slice() {
        [node] => quality[node.index()] = self.node_quality(&graph, *node, &quality),
        nodes => self.relax_cycle(&graph, nodes, &mut quality),
      }
    }
    quality
  }

  fn node_quality(&self, graph: &FlowGraph, node: NodeIndex, quality: &[f64]) -> f64 {
    let i = node.index();
    if let Some(q) = self.source_quality(i) {
      return q;
    }
    if graph.edges_directed(node, Direction::Incoming).next().is_none() {
      return self.stagnant_quality(i);
    }
    self.mix(graph, node, quality)
  }

  /// Sweep over the nodes of a flow cycle until their quality settles
  fn relax_cycle(&self, graph: &FlowGraph, nodes: &[NodeIndex], quality: &mut [f64]) {
    debug!("{} nodes lie on a flow cycle, relaxing their quality", nodes.len());
    for _ in 0..MAX_CYCLE_SWEEPS {
      let mut change: f64 = 0.0;
      for &node in nodes {
        let q = self.node_quality(graph, node, quality);
        change = change.max((q - quality[node.index()]).abs());
        quality[node.index()] = q;
      }
      if change < CYCLE_TOL {
        break;
      }
    }
  }

  /// Stagnant junctions keep their initial quality
  fn stagnant_quality(&self, node: usize) -> f64 {
    match &self.network.options.quality.mode {
      QualityMode::Chemical { .. } => self.network.nodes[node].initial_quality,
      _ => 0.0,
    }
  }

  /// Flow weighted mix of the water arriving at a node
  fn mix(&self, graph: &FlowGraph, node: NodeIndex, quality: &[f64]) -> f64 {
    let mut total = 0.0;
    let mut mass = 0.0;
    for edge in graph.edges_directed(node, Direction::Incoming) {
      let transit = edge.weight();
      total += transit.flow;
      mass += transit.flow * self.transport(quality[edge.source().index()], transit.travel_time);
    }
    if total > 0.0 { mass / total } else { 0.0 }
  }
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use super::*;
  use crate::model::link::LinkStatus;

  // R1 -> J1 -> J2 through two 1000 ft, 12 in pipes
  fn chain(quality: &str) -> Network {
    let text = format!(
      "[RESERVOIRS]\nR1 100\n[JUNCTIONS]\nJ1 0 1\nJ2 0 1\n[PIPES]\nP1 R1 J1 1000 12 100\nP2 J1 J2 1000 12 100\n[QUALITY]\nR1 2.0\n[OPTIONS]\nUnits CFS\nQuality {}\n",
      quality
    );
    let mut network = Network::default();
    network.read_from(Cursor::new(text)).unwrap();
    network
  }

  fn state(flows: Vec<f64>, statuses: Vec<LinkStatus>) -> HydraulicState {
    HydraulicState { heads: vec![0.0; 3], demands: vec![0.0; 3], flows, settings: vec![0.0; 2], statuses }
  }

  fn open_state() -> HydraulicState {
    state(vec![2.0, 1.0], vec![LinkStatus::Open; 2])
  }

  #[test]
  fn test_age_accumulates_along_the_chain() {
    let network = chain("Age");
    let quality = QualitySolver::new(&network).run(&[(0, open_state())]);
    let area = std::f64::consts::PI / 4.0;
    let p1_hours = 1000.0 / (2.0 / area) / 3600.0;
    let p2_hours = 1000.0 / (1.0 / area) / 3600.0;
    assert_eq!(quality[0][0], 0.0);
    assert!((quality[0][1] - p1_hours).abs() < 1e-9);
    assert!((quality[0][2] - (p1_hours + p2_hours)).abs() < 1e-9);
  }

  #[test]
  fn test_chemical_decay() {
    let mut network = chain("Chlorine mg/L");
    network.options.quality.bulk_coeff = -1.0;
    let quality = QualitySolver::new(&network).run(&[(0, open_state())]);
    assert_eq!(quality[0][0], 2.0);
    assert!(quality[0][1] < 2.0 && quality[0][1] > 1.9);
    assert!(quality[0][2] < quality[0][1]);
  }

  #[test]
  fn test_trace_and_closed_links() {
    let network = chain("Trace J1");
    let closed = state(vec![2.0, 0.0], vec![LinkStatus::Open, LinkStatus::Closed]);
    let quality = QualitySolver::new(&network).run(&[(0, open_state()), (3600, closed)]);
    assert_eq!(quality[0], vec![0.0, 100.0, 100.0]);
    // J2 is cut off and stagnant
    assert_eq!(quality[1], vec![0.0, 100.0, 0.0]);
  }

  #[test]
  fn test_no_quality_analysis() {
    let network = chain("None");
    let quality = QualitySolver::new(&network).run(&[(0, open_state()), (3600, open_state())]);
    assert_eq!(quality, vec![vec![0.0; 3]; 2]);
  }

  #[test]
  fn test_flow_cycle_settles() {
    let text = "[RESERVOIRS]\nR1 100\n[JUNCTIONS]\nJ1 0 1\nJ2 0\n[PIPES]\nP1 R1 J1 1000 12 100\nP2 J1 J2 1000 12 100\nP3 J2 J1 1000 12 100\n[QUALITY]\nR1 2.0\n[OPTIONS]\nUnits CFS\nQuality Chlorine\n";
    let mut network = Network::default();
    network.read_from(Cursor::new(text)).unwrap();

    // J1 and J2 circulate water through P2 and P3
    let circulating = HydraulicState {
      heads: vec![0.0; 3],
      demands: vec![0.0; 3],
      flows: vec![1.0, 2.0, 2.0],
      settings: vec![0.0; 3],
      statuses: vec![LinkStatus::Open; 3],
    };
    let quality = QualitySolver::new(&network).run(&[(0, circulating)]);
    assert!((quality[0][1] - 2.0).abs() < 1e-4, "J1 quality {}", quality[0][1]);
    assert!((quality[0][2] - 2.0).abs() < 1e-4, "J2 quality {}", quality[0][2]);
  }
}
