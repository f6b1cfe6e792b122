//! Loosely typed plot parameters as frontends pass them (`nodesID=true`, `title=...`),
//! filtered against the parameters a plot accepts.

use std::fmt;

use simplelog::{debug, warn};

use crate::plot::Colormap;

/// Parameters accepted by the topology plot
pub const TOPOLOGY_PARAMS: [&str; 10] = [
  "nodesID", "linksID", "nodesindex", "linksindex", "highlightlink", "highlightnode", "point", "line",
  "legend", "title",
];

/// Parameters accepted by the attribute plot
pub const ATTRIBUTE_PARAMS: [&str; 11] = [
  "nodesID", "linksID", "nodesindex", "linksindex", "highlightlink", "highlightnode", "point", "line",
  "legend", "title", "colorbar",
];

#[derive(Debug, Clone, PartialEq)]
pub enum PlotValue {
  Bool(bool),
  Number(f64),
  Text(String),
  List(Vec<String>),
}

impl fmt::Display for PlotValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PlotValue::Bool(b) => write!(f, "{}", b),
      PlotValue::Number(n) => write!(f, "{}", n),
      PlotValue::Text(s) => write!(f, "{}", s),
      PlotValue::List(items) => write!(f, "{}", items.join(",")),
    }
  }
}

impl From<bool> for PlotValue {
  fn from(value: bool) -> Self {
    PlotValue::Bool(value)
  }
}

impl From<f64> for PlotValue {
  fn from(value: f64) -> Self {
    PlotValue::Number(value)
  }
}

impl From<&str> for PlotValue {
  fn from(value: &str) -> Self {
    PlotValue::Text(value.to_string())
  }
}

impl From<Vec<String>> for PlotValue {
  fn from(value: Vec<String>) -> Self {
    PlotValue::List(value)
  }
}

impl PlotValue {
  /// Interpret a textual value: booleans, numbers, comma separated lists, otherwise text
  pub fn parse(value: &str) -> Self {
    match value.to_lowercase().as_str() {
      "true" | "yes" | "on" => return PlotValue::Bool(true),
      "false" | "no" | "off" => return PlotValue::Bool(false),
      _ => (),
    }
    if let Ok(n) = value.parse::<f64>() {
      return PlotValue::Number(n);
    }
    if value.contains(',') {
      return PlotValue::List(value.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect());
    }
    PlotValue::Text(value.to_string())
  }

  fn as_bool(&self) -> Option<bool> {
    match self {
      PlotValue::Bool(b) => Some(*b),
      PlotValue::Number(n) => Some(*n != 0.0),
      _ => None,
    }
  }

  fn as_list(&self) -> Vec<String> {
    match self {
      PlotValue::List(items) => items.clone(),
      other => vec![other.to_string()],
    }
  }
}

/// Unvalidated plot parameters in the order they were given
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotParams {
  entries: Vec<(String, PlotValue)>,
}

impl PlotParams {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, key: &str, value: impl Into<PlotValue>) -> Self {
    self.set(key, value);
    self
  }

  pub fn set(&mut self, key: &str, value: impl Into<PlotValue>) {
    let value = value.into();
    match self.entries.iter_mut().find(|(k, _)| k == key) {
      Some(entry) => entry.1 = value,
      None => self.entries.push((key.to_string(), value)),
    }
  }

  pub fn get(&self, key: &str) -> Option<&PlotValue> {
    self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Parse `key=value` pairs, a bare key is a true flag
  pub fn from_pairs<I, S>(pairs: I) -> Result<Self, String>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut params = Self::new();
    for pair in pairs {
      let pair = pair.as_ref().trim();
      if pair.is_empty() {
        continue;
      }
      match pair.split_once('=') {
        Some((key, _)) if key.trim().is_empty() => return Err(format!("Invalid plot parameter '{}'", pair)),
        Some((key, value)) => params.set(key.trim(), PlotValue::parse(value.trim())),
        None => params.set(pair, true),
      }
    }
    Ok(params)
  }

  /// Keep the parameters a plot accepts. Unknown flags and unknown parameters are dropped
  /// with a warning rather than failing the plot.
  pub fn filter(&self, accepted: &[&str]) -> PlotParams {
    let mut kept = PlotParams::new();
    for (key, value) in self.entries.iter() {
      if accepted.contains(&key.as_str()) {
        kept.set(key, value.clone());
      } else if let PlotValue::Bool(_) = value {
        debug!("Dropping unsupported plot flag {}", key);
      } else {
        warn!("Ignoring unsupported plot parameter {}={}", key, value);
      }
    }
    kept
  }

  /// Filter against the accepted parameters and interpret them
  pub fn options(&self, accepted: &[&str]) -> PlotOptions {
    let filtered = self.filter(accepted);
    let mut options = PlotOptions::default();

    for (key, value) in filtered.entries.iter() {
      let flag = || {
        let b = value.as_bool();
        if b.is_none() {
          warn!("Plot parameter {} expects a boolean, got {}", key, value);
        }
        b
      };
      match key.as_str() {
        "nodesID" => options.node_ids = flag().unwrap_or(options.node_ids),
        "linksID" => options.link_ids = flag().unwrap_or(options.link_ids),
        "nodesindex" => options.node_indices = flag().unwrap_or(options.node_indices),
        "linksindex" => options.link_indices = flag().unwrap_or(options.link_indices),
        "point" => options.points = flag().unwrap_or(options.points),
        "line" => options.lines = flag().unwrap_or(options.lines),
        "legend" => options.legend = flag().unwrap_or(options.legend),
        "highlightnode" => options.highlight_nodes = value.as_list(),
        "highlightlink" => options.highlight_links = value.as_list(),
        "title" => options.title = Some(value.to_string()),
        "colorbar" => match value {
          PlotValue::Text(name) => match name.parse() {
            Ok(colormap) => options.colormap = Some(colormap),
            Err(e) => warn!("{}, using the default colormap", e),
          },
          _ => warn!("Plot parameter colorbar expects a colormap name, got {}", value),
        },
        _ => (),
      }
    }
    options
  }
}

/// Validated options for the network plots
#[derive(Debug, Clone, PartialEq)]
pub struct PlotOptions {
  /// Label nodes with their id
  pub node_ids: bool,
  pub link_ids: bool,
  /// Label nodes with their 1-based index
  pub node_indices: bool,
  pub link_indices: bool,
  pub highlight_nodes: Vec<String>,
  pub highlight_links: Vec<String>,
  /// Draw node markers
  pub points: bool,
  /// Draw links
  pub lines: bool,
  pub legend: bool,
  pub title: Option<String>,
  pub colormap: Option<Colormap>,
}

impl Default for PlotOptions {
  fn default() -> Self {
    Self {
      node_ids: true,
      link_ids: false,
      node_indices: false,
      link_indices: false,
      highlight_nodes: Vec::new(),
      highlight_links: Vec::new(),
      points: true,
      lines: true,
      legend: false,
      title: None,
      colormap: None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_filter_drops_unknown_parameters() {
    let params = PlotParams::new()
      .with("nodesID", false)
      .with("pressure_text", true)
      .with("figsize", "10x8")
      .with("title", "Zone A");
    let filtered = params.filter(&TOPOLOGY_PARAMS);
    assert_eq!(filtered.len(), 2);
    assert_eq!(filtered.get("nodesID"), Some(&PlotValue::Bool(false)));
    assert!(filtered.get("pressure_text").is_none());
    assert!(filtered.get("figsize").is_none());
  }

  #[test]
  fn test_options_from_pairs() {
    let params = PlotParams::from_pairs(["linksID", "highlightnode=2,3", "colorbar=blues", "title=My net"]).unwrap();
    let options = params.options(&ATTRIBUTE_PARAMS);
    assert!(options.link_ids);
    assert_eq!(options.highlight_nodes, vec!["2".to_string(), "3".to_string()]);
    assert_eq!(options.colormap, Some(Colormap::Blues));
    assert_eq!(options.title.as_deref(), Some("My net"));

    // colorbar is not a topology parameter
    let options = params.options(&TOPOLOGY_PARAMS);
    assert_eq!(options.colormap, None);
  }

  #[test]
  fn test_bad_flag_keeps_default() {
    let params = PlotParams::new().with("point", "maybe");
    assert!(params.options(&TOPOLOGY_PARAMS).points);
  }

  #[test]
  fn test_invalid_pair() {
    assert!(PlotParams::from_pairs(["=true"]).is_err());
  }
}
