use petgraph::visit::EdgeRef;

use crate::model::network::Network;
use crate::model::node::NodeType;
use crate::plot::{normalize, value_range, Color, Colormap, PlotOptions, PlotSurface};

const NODE_RADIUS: f64 = 8.0;
const LINK_WIDTH: f64 = 2.0;
const RESERVOIR_COLOR: Color = Color::rgb(31, 119, 180);
const TANK_COLOR: Color = Color::rgb(44, 160, 44);

/// Values colouring the nodes or links of a network plot
#[derive(Debug, Clone, Copy)]
pub struct ColorLayer<'a> {
  pub values: &'a [f64],
  pub colormap: Colormap,
  /// Colorbar label
  pub label: &'a str,
}

impl<'a> ColorLayer<'a> {
  pub fn new(values: &'a [f64], colormap: Colormap, label: &'a str) -> Self {
    Self { values, colormap, label }
  }

  /// Colors per element, or None when there is nothing to show (all values zero)
  fn colors(&self) -> Option<(Vec<Color>, f64, f64)> {
    if self.values.iter().all(|v| *v == 0.0) {
      return None;
    }
    let (min, max) = value_range(self.values)?;
    let colors = self.values.iter().map(|v| self.colormap.color(normalize(*v, min, max))).collect();
    Some((colors, min, max))
  }
}

/// Plot positions of the nodes. Nodes without coordinates are placed on the diagonal
/// by their 1-based index.
pub fn node_positions(network: &Network) -> Vec<(f64, f64)> {
  network.nodes.iter().enumerate().map(|(i, node)| {
    node.coordinates.unwrap_or(((i + 1) as f64 * 10.0, (i + 1) as f64 * 10.0))
  }).collect()
}

/// Draw the network: links as segments, nodes as circles, optionally coloured by values
pub fn draw_network(
  surface: &mut dyn PlotSurface,
  network: &Network,
  title: &str,
  node_layer: Option<ColorLayer>,
  link_layer: Option<ColorLayer>,
  options: &PlotOptions,
) {
  surface.clear();
  let positions = node_positions(network);

  let link_colors = link_layer.as_ref().and_then(|l| l.colors());
  let node_colors = node_layer.as_ref().and_then(|l| l.colors());

  if options.lines {
    for edge in network.graph().edge_references() {
      let k = *edge.weight();
      let link = &network.links[k];
      let highlighted = options.highlight_links.iter().any(|id| id.as_str() == &*link.id);
      let (color, width) = match (&link_colors, highlighted) {
        (_, true) => (Color::RED, 2.0 * LINK_WIDTH),
        (Some((colors, _, _)), false) => (colors[k], LINK_WIDTH),
        (None, false) => (Color::GRAY, LINK_WIDTH),
      };
      surface.segment(positions[edge.source().index()], positions[edge.target().index()], color, width);
    }
  }

  if options.points {
    for (i, node) in network.nodes.iter().enumerate() {
      let highlighted = options.highlight_nodes.iter().any(|id| id.as_str() == &*node.id);
      if highlighted {
        surface.circle(positions[i], 1.5 * NODE_RADIUS, Color::RED);
      }
      let color = match &node_colors {
        Some((colors, _, _)) => colors[i],
        None if options.legend => type_color(&node.node_type),
        None => Color::LIGHT_BLUE,
      };
      surface.circle(positions[i], NODE_RADIUS, color);
    }
  }

  for (i, node) in network.nodes.iter().enumerate() {
    let label = match (options.node_ids, options.node_indices) {
      (true, _) => node.id.to_string(),
      (false, true) => (i + 1).to_string(),
      (false, false) => continue,
    };
    surface.text(positions[i], &label);
  }
  for (k, link) in network.links.iter().enumerate() {
    let label = match (options.link_ids, options.link_indices) {
      (true, _) => link.id.to_string(),
      (false, true) => (k + 1).to_string(),
      (false, false) => continue,
    };
    let (a, b) = (positions[link.start_node], positions[link.end_node]);
    surface.text(((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0), &label);
  }

  // legend keys for the node types
  if options.legend && node_colors.is_none() {
    surface.line(&[], &[], Color::LIGHT_BLUE, "Junction");
    surface.line(&[], &[], RESERVOIR_COLOR, "Reservoir");
    surface.line(&[], &[], TANK_COLOR, "Tank");
  }
  surface.set_legend(options.legend);

  if let (Some(layer), Some((_, min, max))) = (&node_layer, &node_colors) {
    surface.colorbar(layer.colormap, *min, *max, layer.label);
  } else if let (Some(layer), Some((_, min, max))) = (&link_layer, &link_colors) {
    surface.colorbar(layer.colormap, *min, *max, layer.label);
  }

  surface.set_equal_aspect(true);
  surface.set_axes_visible(false);
  surface.set_title(options.title.as_deref().unwrap_or(title));
}

fn type_color(node_type: &NodeType) -> Color {
  match node_type {
    NodeType::Junction(_) => Color::LIGHT_BLUE,
    NodeType::Reservoir(_) => RESERVOIR_COLOR,
    NodeType::Tank(_) => TANK_COLOR,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_all_zero_layer_has_no_colors() {
    let values = [0.0, 0.0];
    assert!(ColorLayer::new(&values, Colormap::Viridis, "Pressure").colors().is_none());
  }

  #[test]
  fn test_layer_colors_span_colormap() {
    let values = [1.0, 3.0];
    let (colors, min, max) = ColorLayer::new(&values, Colormap::Oranges, "Elevation").colors().unwrap();
    assert_eq!((min, max), (1.0, 3.0));
    assert_eq!(colors[0], Colormap::Oranges.color(0.0));
    assert_eq!(colors[1], Colormap::Oranges.color(1.0));
  }
}
