use hashbrown::HashMap;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::InputError;
use crate::model::link::Link;
use crate::model::node::Node;
use crate::model::curve::Curve;
use crate::model::control::Control;
use crate::model::pattern::Pattern;
use crate::model::options::SimulationOptions;

#[derive(Debug, Default)]
pub struct Network {
  pub title: Vec<String>,
  pub options: SimulationOptions,
  pub nodes: Vec<Node>,
  pub links: Vec<Link>,

  pub curves: HashMap<Box<str>, Curve>,
  pub patterns: HashMap<Box<str>, Pattern>,
  pub controls: Vec<Control>,

  pub node_map: HashMap<Box<str>, usize>,
  pub link_map: HashMap<Box<str>, usize>,
}

/// Network methods to add and look up nodes and links
impl Network {
  pub fn add_node(&mut self, node: Node) -> Result<(), InputError> {
    if self.node_map.contains_key(&node.id) {
      return Err(InputError::new(format!("Node {} already exists", node.id)));
    }
    self.node_map.insert(node.id.clone(), self.nodes.len());
    self.nodes.push(node);
    Ok(())
  }
  pub fn add_link(&mut self, link: Link) -> Result<(), InputError> {
    if self.link_map.contains_key(&link.id) {
      return Err(InputError::new(format!("Link {} already exists", link.id)));
    }
    self.link_map.insert(link.id.clone(), self.links.len());
    self.links.push(link);
    Ok(())
  }

  pub fn node_index(&self, id: &str) -> Option<usize> {
    self.node_map.get(id).copied()
  }

  pub fn link_index(&self, id: &str) -> Option<usize> {
    self.link_map.get(id).copied()
  }

  /// Pattern multiplier at a time (seconds), 1.0 for no or unknown patterns
  pub fn pattern_multiplier(&self, pattern: Option<&str>, time: usize) -> f64 {
    let times = &self.options.times;
    let period = (time + times.pattern_start) / times.pattern_step.max(1);
    pattern
      .and_then(|id| self.patterns.get(id))
      .map(|p| p.multiplier(period))
      .unwrap_or(1.0)
  }

  /// Graph of the network: node weights are node indices, edge weights link indices,
  /// edges run from the start to the end node of each link
  pub fn graph(&self) -> DiGraph<usize, usize> {
    let mut graph = DiGraph::with_capacity(self.nodes.len(), self.links.len());
    for i in 0..self.nodes.len() {
      graph.add_node(i);
    }
    for (k, link) in self.links.iter().enumerate() {
      graph.add_edge(NodeIndex::new(link.start_node), NodeIndex::new(link.end_node), k);
    }
    graph
  }
}
