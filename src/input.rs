use std::fs::File;
use std::io::{BufReader, BufRead};
use std::path::Path;

use hashbrown::HashSet;
use simplelog::{debug, warn};

use crate::error::{InputError, OptionExt, ParseExt};
use crate::model::network::Network;
use crate::model::node::{Node, NodeType};
use crate::model::link::{Link, LinkType, LinkStatus};
use crate::model::curve::Curve;
use crate::model::control::{Control, ControlCondition};
use crate::model::pattern::Pattern;
use crate::model::junction::{Junction, Demand};
use crate::model::reservoir::Reservoir;
use crate::model::tank::Tank;
use crate::model::pipe::{Pipe, PipeStatus};
use crate::model::valve::{Valve, ValveType};
use crate::model::pump::Pump;
use crate::model::options::{HeadlossFormula, QualityMode};
use crate::model::units::{FlowUnits, PressureUnits, UnitConversion};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
  Title,
  Junctions,
  Reservoirs,
  Tanks,
  Pipes,
  Pumps,
  Valves,
  Demands,
  Status,
  Patterns,
  Curves,
  Controls,
  Quality,
  Reactions,
  Options,
  Times,
  Coordinates,
  None,
}

/// Order in which the collected sections are processed, so that options are known
/// before elements are built and elements exist before they are referenced
const SECTION_ORDER: [ReadState; 17] = [
  ReadState::Options,
  ReadState::Times,
  ReadState::Reactions,
  ReadState::Title,
  ReadState::Junctions,
  ReadState::Reservoirs,
  ReadState::Tanks,
  ReadState::Patterns,
  ReadState::Curves,
  ReadState::Pipes,
  ReadState::Pumps,
  ReadState::Valves,
  ReadState::Demands,
  ReadState::Status,
  ReadState::Quality,
  ReadState::Coordinates,
  ReadState::Controls,
];

impl ReadState {
  fn from_header(header: &str) -> ReadState {
    match header.to_uppercase().as_str() {
      "[TITLE]" => ReadState::Title,
      "[JUNCTIONS]" => ReadState::Junctions,
      "[RESERVOIRS]" => ReadState::Reservoirs,
      "[TANKS]" => ReadState::Tanks,
      "[PIPES]" => ReadState::Pipes,
      "[PUMPS]" => ReadState::Pumps,
      "[VALVES]" => ReadState::Valves,
      "[DEMANDS]" => ReadState::Demands,
      "[STATUS]" => ReadState::Status,
      "[PATTERNS]" => ReadState::Patterns,
      "[CURVES]" => ReadState::Curves,
      "[CONTROLS]" => ReadState::Controls,
      "[QUALITY]" => ReadState::Quality,
      "[REACTIONS]" => ReadState::Reactions,
      "[OPTIONS]" => ReadState::Options,
      "[TIMES]" => ReadState::Times,
      "[COORDINATES]" => ReadState::Coordinates,
      _ => ReadState::None,
    }
  }
}

/// A data line of the input file with its 1-based line number
struct InputLine {
  state: ReadState,
  number: usize,
  text: String,
}

impl Network {
  /// Read a network from an INP file.
  pub fn read_inp(&mut self, inp: impl AsRef<Path>) -> Result<(), InputError> {
    let inp = inp.as_ref();
    let file = File::open(inp)
      .map_err(|e| InputError::new(format!("Failed to open file: {}: {}", inp.display(), e)))?;
    self.read_from(BufReader::new(file))
  }

  /// Build a network from an INP file
  pub fn from_inp(inp: impl AsRef<Path>) -> Result<Network, InputError> {
    let mut network = Network::default();
    network.read_inp(inp)?;
    Ok(network)
  }

  /// Read a network from INP formatted text
  pub fn read_from(&mut self, mut reader: impl BufRead) -> Result<(), InputError> {

    // set the initial state to none
    let mut state = ReadState::None;
    let mut lines = Vec::new();
    let mut line_buffer = String::with_capacity(512);
    let mut number = 0;

    // collect the data lines of each section
    while reader.read_line(&mut line_buffer)? > 0 {
      number += 1;
      // the title keeps its comment characters, everything else drops them
      let line = if state == ReadState::Title {
        line_buffer.trim()
      } else {
        line_buffer.split(';').next().unwrap_or("").trim()
      };

      if line.is_empty() {
        // skip comment and empty lines
      }
      // if the line starts with [, it is a new section
      else if line.starts_with('[') {
        let header = line.split_whitespace().next().unwrap_or(line);
        state = ReadState::from_header(header);
        if state == ReadState::None {
          if header.eq_ignore_ascii_case("[END]") {
            break;
          }
          debug!("Skipping unsupported section {} (line {})", header, number);
        }
      }
      else if state != ReadState::None {
        lines.push(InputLine { state, number, text: line.to_string() });
      }
      line_buffer.clear();
    }

    let mut demand_overrides = HashSet::new();
    for section in SECTION_ORDER {
      for line in lines.iter().filter(|l| l.state == section) {
        self.read_line(section, &line.text, &mut demand_overrides)
          .map_err(|e| e.with_line(line.number).with_context(line.text.clone()))?;
      }
    }

    self.finish()
  }

  fn read_line(&mut self, state: ReadState, line: &str, demand_overrides: &mut HashSet<Box<str>>) -> Result<(), InputError> {
    match state {
      ReadState::Title => self.title.push(line.to_string()),
      ReadState::Junctions => {
        let junction = self.read_junction(line)?;
        self.add_node(junction)?;
      }
      ReadState::Reservoirs => {
        let reservoir = self.read_reservoir(line)?;
        self.add_node(reservoir)?;
      }
      ReadState::Tanks => {
        let tank = self.read_tank(line)?;
        self.add_node(tank)?;
      }
      ReadState::Pipes => {
        let pipe = self.read_pipe(line)?;
        self.add_link(pipe)?;
      }
      ReadState::Pumps => {
        let pump = self.read_pump(line)?;
        self.add_link(pump)?;
      }
      ReadState::Valves => {
        let valve = self.read_valve(line)?;
        self.add_link(valve)?;
      }
      ReadState::Demands => self.read_demand(line, demand_overrides)?,
      ReadState::Status => self.read_status(line)?,
      ReadState::Patterns => self.read_pattern(line)?,
      ReadState::Curves => self.read_curve(line)?,
      ReadState::Controls => self.read_control(line)?,
      ReadState::Quality => self.read_quality(line)?,
      ReadState::Reactions => self.read_reaction(line)?,
      ReadState::Options => self.read_option(line)?,
      ReadState::Times => self.read_time(line)?,
      ReadState::Coordinates => self.read_coordinates(line)?,
      ReadState::None => (),
    }
    Ok(())
  }

  /// Read a junction: id elevation [demand] [pattern]
  fn read_junction(&mut self, line: &str) -> Result<Node, InputError> {
    let mut parts = line.split_whitespace();
    let id = parts.next().ok_or_missing("junction id")?.into();
    let elevation = parts.next().ok_or_missing("junction elevation")?.parse_field("elevation")?;
    // read the demand (optional, default 0.0)
    let base_demand = match parts.next() {
      Some(s) => s.parse_field("demand")?,
      None => 0.0,
    };
    let pattern = parts.next().map(|s| s.into());

    let junction = Junction { demands: vec![Demand { base_demand, pattern }] };
    Ok(Node::new(id, elevation, NodeType::Junction(junction)))
  }

  /// Read a reservoir: id head [pattern]
  fn read_reservoir(&mut self, line: &str) -> Result<Node, InputError> {
    let mut parts = line.split_whitespace();
    let id = parts.next().ok_or_missing("reservoir id")?.into();
    let head = parts.next().ok_or_missing("reservoir head")?.parse_field("head")?;
    let head_pattern = parts.next().map(|s| s.into());
    Ok(Node::new(id, head, NodeType::Reservoir(Reservoir { head_pattern })))
  }

  /// Read a tank: id elevation initial_level min_level max_level diameter [min_volume volume_curve [overflow]]
  fn read_tank(&mut self, line: &str) -> Result<Node, InputError> {
    let mut parts = line.split_whitespace();
    let id = parts.next().ok_or_missing("tank id")?.into();
    let elevation = parts.next().ok_or_missing("tank elevation")?.parse_field("elevation")?;
    let initial_level: f64 = parts.next().ok_or_missing("initial level")?.parse_field("initial level")?;
    let min_level: f64 = parts.next().ok_or_missing("minimum level")?.parse_field("minimum level")?;
    let max_level: f64 = parts.next().ok_or_missing("maximum level")?.parse_field("maximum level")?;
    let diameter = parts.next().ok_or_missing("tank diameter")?.parse_field("diameter")?;
    // the minimum volume and overflow flag only matter for tanks with volume curves
    let volume_curve_id = parts.nth(1).filter(|s| *s != "*").map(|s| s.into());

    if min_level > max_level || initial_level < min_level || initial_level > max_level {
      return Err(InputError::new("Tank levels must satisfy minimum <= initial <= maximum"));
    }

    let tank = Tank { initial_level, min_level, max_level, diameter, volume_curve_id };
    Ok(Node::new(id, elevation, NodeType::Tank(tank)))
  }

  /// Read a pipe: id start end length diameter roughness [minor_loss] [status]
  fn read_pipe(&self, line: &str) -> Result<Link, InputError> {
    let mut parts = line.split_whitespace();
    let id = parts.next().ok_or_missing("pipe id")?.into();
    let start_node_id: Box<str> = parts.next().ok_or_missing("start node")?.into();
    let end_node_id: Box<str> = parts.next().ok_or_missing("end node")?.into();
    let length: f64 = parts.next().ok_or_missing("pipe length")?.parse_field("length")?;
    let diameter: f64 = parts.next().ok_or_missing("pipe diameter")?.parse_field("diameter")?;
    let roughness: f64 = parts.next().ok_or_missing("pipe roughness")?.parse_field("roughness")?;
    let minor_loss = match parts.next() {
      Some(s) => s.parse_field("minor loss")?,
      None => 0.0,
    };
    let status = match parts.next() {
      Some(s) => s.parse::<PipeStatus>().map_err(InputError::new)?,
      None => PipeStatus::Open,
    };

    if length <= 0.0 || diameter <= 0.0 || roughness <= 0.0 {
      return Err(InputError::new(format!("Pipe {} must have positive length, diameter and roughness", id)));
    }

    let initial_status = if status == PipeStatus::Closed { LinkStatus::Closed } else { LinkStatus::Open };
    let headloss_formula = self.options.headloss_formula;

    Ok(Link {
      id,
      start_node_id,
      end_node_id,
      initial_status,
      link_type: LinkType::Pipe(Pipe { diameter, length, roughness, minor_loss, status, headloss_formula }),
      start_node: 0,
      end_node: 0,
    })
  }

  /// Read a pump: id start end followed by keyword/value pairs (HEAD, POWER, SPEED, PATTERN)
  fn read_pump(&self, line: &str) -> Result<Link, InputError> {
    let mut parts = line.split_whitespace();
    let id: Box<str> = parts.next().ok_or_missing("pump id")?.into();
    let start_node_id: Box<str> = parts.next().ok_or_missing("start node")?.into();
    let end_node_id: Box<str> = parts.next().ok_or_missing("end node")?.into();

    let mut speed = 1.0;
    let mut head_curve = "";
    let mut power = 0.0;
    let mut pattern = None;

    while let Some(parameter) = parts.next() {
      let value = parts.next().ok_or_missing(parameter)?;
      match parameter.to_uppercase().as_str() {
        "SPEED" => speed = value.parse_field("speed")?,
        "HEAD" => head_curve = value,
        "POWER" => power = value.parse_field("power")?,
        "PATTERN" => pattern = Some(value.into()),
        _ => return Err(InputError::new(format!("Unknown pump keyword {}", parameter))),
      }
    }

    if head_curve.is_empty() && power <= 0.0 {
      return Err(InputError::new(format!("Pump {} needs a HEAD curve or a POWER value", id)));
    }

    Ok(Link {
      id,
      start_node_id,
      end_node_id,
      initial_status: LinkStatus::Open,
      link_type: LinkType::Pump(Pump { speed, head_curve: head_curve.into(), power, pattern, head_curve_statistics: None }),
      start_node: 0,
      end_node: 0,
    })
  }

  /// Read a valve: id start end diameter type setting [minor_loss]
  fn read_valve(&self, line: &str) -> Result<Link, InputError> {
    let mut parts = line.split_whitespace();
    let id: Box<str> = parts.next().ok_or_missing("valve id")?.into();
    let start_node_id: Box<str> = parts.next().ok_or_missing("start node")?.into();
    let end_node_id: Box<str> = parts.next().ok_or_missing("end node")?.into();
    let diameter = parts.next().ok_or_missing("valve diameter")?.parse_field("diameter")?;
    let valve_type: ValveType = parts.next().ok_or_missing("valve type")?.parse().map_err(InputError::new)?;

    // GPV settings are head loss curve ids
    let setting_field = parts.next().ok_or_missing("valve setting")?;
    let (setting, curve) = if valve_type == ValveType::GPV {
      (0.0, Some(setting_field.into()))
    } else {
      (setting_field.parse_field("setting")?, None)
    };
    let minor_loss = match parts.next() {
      Some(s) => s.parse_field("minor loss")?,
      None => 0.0,
    };

    if valve_type.is_approximated() {
      warn!("Valve {} ({:?}) is modelled as an open valve with its minor loss", id, valve_type);
    }

    Ok(Link {
      id,
      start_node_id,
      end_node_id,
      initial_status: LinkStatus::Active,
      link_type: LinkType::Valve(Valve { diameter, setting, curve, valve_type, minor_loss }),
      start_node: 0,
      end_node: 0,
    })
  }

  /// Read a curve point: id x y
  /// Appends a point to the curve if it already exists, otherwise creates a new curve
  fn read_curve(&mut self, line: &str) -> Result<(), InputError> {
    let mut parts = line.split_whitespace();
    let id: Box<str> = parts.next().ok_or_missing("curve id")?.into();
    let x: f64 = parts.next().ok_or_missing("curve x value")?.parse_field("x value")?;
    let y: f64 = parts.next().ok_or_missing("curve y value")?.parse_field("y value")?;

    match self.curves.get_mut(&id) {
      Some(curve) => {
        // x values must be in ascending order
        if curve.x.last().is_some_and(|last| x <= *last) {
          return Err(InputError::new(format!("X values must be in ascending order for curve {}", id)));
        }
        curve.x.push(x);
        curve.y.push(y);
      }
      None => {
        self.curves.insert(id.clone(), Curve { id, x: vec![x], y: vec![y] });
      }
    }
    Ok(())
  }

  /// Read a pattern: id multiplier...
  fn read_pattern(&mut self, line: &str) -> Result<(), InputError> {
    let mut parts = line.split_whitespace();
    let id: Box<str> = parts.next().ok_or_missing("pattern id")?.into();
    let multipliers = parts.map(|s| s.parse_field("multiplier")).collect::<Result<Vec<f64>, _>>()?;
    self.patterns.entry(id.clone())
      .or_insert_with(|| Pattern { id, multipliers: Vec::new() })
      .multipliers.extend(multipliers);
    Ok(())
  }

  /// Read a demand: junction demand [pattern]
  /// The first demand listed for a junction replaces the demand from [JUNCTIONS]
  fn read_demand(&mut self, line: &str, overrides: &mut HashSet<Box<str>>) -> Result<(), InputError> {
    let mut parts = line.split_whitespace();
    let id: Box<str> = parts.next().ok_or_missing("junction id")?.into();
    let base_demand = parts.next().ok_or_missing("demand")?.parse_field("demand")?;
    let pattern = parts.next().map(|s| s.into());

    let index = self.node_index(&id).ok_or_else(|| InputError::new(format!("Unknown junction {}", id)))?;
    match &mut self.nodes[index].node_type {
      NodeType::Junction(junction) => {
        if overrides.insert(id) {
          junction.demands.clear();
        }
        junction.demands.push(Demand { base_demand, pattern });
        Ok(())
      }
      _ => Err(InputError::new("Demand can only be set for junctions")),
    }
  }

  /// Read an initial status or setting: link OPEN|CLOSED|value
  fn read_status(&mut self, line: &str) -> Result<(), InputError> {
    let mut parts = line.split_whitespace();
    let id = parts.next().ok_or_missing("link id")?;
    let value = parts.next().ok_or_missing("status")?;
    let index = self.link_index(id).ok_or_else(|| InputError::new(format!("Unknown link {}", id)))?;
    let link = &mut self.links[index];

    if let Ok(status) = value.parse::<LinkStatus>() {
      if let LinkType::Pipe(pipe) = &link.link_type {
        if pipe.status == PipeStatus::CheckValve {
          return Err(InputError::new(format!("Cannot set the status of check valve {}", id)));
        }
      }
      link.initial_status = status;
      return Ok(());
    }

    let setting: f64 = value.parse_field("setting")?;
    match &mut link.link_type {
      LinkType::Pump(pump) => {
        pump.speed = setting;
        link.initial_status = if setting == 0.0 { LinkStatus::Closed } else { LinkStatus::Open };
      }
      LinkType::Valve(valve) => valve.setting = setting,
      LinkType::Pipe(_) => return Err(InputError::new(format!("Cannot assign a setting to pipe {}", id))),
    }
    Ok(())
  }

  /// Read a simple control:
  /// LINK id status|setting IF NODE id ABOVE|BELOW value
  /// LINK id status|setting AT TIME t
  /// LINK id status|setting AT CLOCKTIME t [AM|PM]
  fn read_control(&mut self, line: &str) -> Result<(), InputError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 6 || !parts[0].eq_ignore_ascii_case("LINK") {
      return Err(InputError::new("Invalid control"));
    }
    let link_id: Box<str> = parts[1].into();
    let link = self.link_index(&link_id).ok_or_else(|| InputError::new(format!("Unknown link {}", link_id)))?;

    let (status, setting) = match parts[2].parse::<LinkStatus>() {
      Ok(status) => (Some(status), None),
      Err(_) => (None, Some(parts[2].parse_field::<f64>("setting")?)),
    };

    let keyword = parts[3].to_uppercase();
    let (condition, node) = match (keyword.as_str(), parts[4].to_uppercase().as_str()) {
      ("IF", "NODE") => {
        let node_id: Box<str> = parts[5].into();
        let node = self.node_index(&node_id).ok_or_else(|| InputError::new(format!("Unknown node {}", node_id)))?;
        let above = match parts.get(6).map(|s| s.to_uppercase()) {
          Some(s) if s == "ABOVE" => true,
          Some(s) if s == "BELOW" => false,
          _ => return Err(InputError::new("Expected ABOVE or BELOW")),
        };
        let value = parts.get(7).ok_or_missing("control level")?.parse_field("control level")?;
        (ControlCondition::Level { node_id, above, value }, Some(node))
      }
      ("AT", "TIME") => {
        let seconds = parse_time(parts[5], parts.get(6).copied())?;
        (ControlCondition::Time { seconds }, None)
      }
      ("AT", "CLOCKTIME") => {
        let seconds = parse_clocktime(parts[5], parts.get(6).copied())?;
        (ControlCondition::ClockTime { seconds }, None)
      }
      _ => return Err(InputError::new("Invalid control condition")),
    };

    self.controls.push(Control { condition, link_id, setting, status, link, node });
    Ok(())
  }

  /// Read an initial quality: node value
  fn read_quality(&mut self, line: &str) -> Result<(), InputError> {
    let mut parts = line.split_whitespace();
    let id = parts.next().ok_or_missing("node id")?;
    let value = parts.next().ok_or_missing("initial quality")?.parse_field("initial quality")?;
    let index = self.node_index(id).ok_or_else(|| InputError::new(format!("Unknown node {}", id)))?;
    self.nodes[index].initial_quality = value;
    Ok(())
  }

  /// Read a reaction option, only the global bulk coefficient is used
  fn read_reaction(&mut self, line: &str) -> Result<(), InputError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() >= 3 && parts[0].eq_ignore_ascii_case("GLOBAL") && parts[1].eq_ignore_ascii_case("BULK") {
      self.options.quality.bulk_coeff = parts[2].parse_field("bulk coefficient")?;
    } else {
      debug!("Ignoring reaction option: {}", line);
    }
    Ok(())
  }

  fn read_option(&mut self, line: &str) -> Result<(), InputError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let keyword = parts[0].to_uppercase();
    let value = |i: usize| parts.get(i).copied().ok_or_missing(&keyword);

    match keyword.as_str() {
      "UNITS" => self.options.flow_units = value(1)?.parse::<FlowUnits>().map_err(InputError::new)?,
      // EPANET 2.2 also writes "Pressure Exponent", which is not a unit
      "PRESSURE" => match value(1)?.parse::<PressureUnits>() {
        Ok(units) => self.options.pressure_units = Some(units),
        Err(_) if parts.len() > 2 => debug!("Ignoring option: {}", line),
        Err(e) => return Err(InputError::new(e)),
      },
      "HEADLOSS" => {
        self.options.headloss_formula = match value(1)?.to_uppercase().as_str() {
          "H-W" => HeadlossFormula::HazenWilliams,
          "D-W" => HeadlossFormula::DarcyWeisbach,
          "C-M" => HeadlossFormula::ChezyManning,
          other => return Err(InputError::new(format!("Invalid headloss formula {}", other))),
        }
      }
      "TRIALS" => self.options.max_trials = value(1)?.parse_field("trials")?,
      "ACCURACY" => self.options.accuracy = value(1)?.parse_field("accuracy")?,
      "CHECKFREQ" => self.options.check_frequency = value(1)?.parse_field("checkfreq")?,
      "MAXCHECK" => self.options.max_check = value(1)?.parse_field("maxcheck")?,
      "PATTERN" => self.options.pattern = Some(value(1)?.into()),
      "DEMAND" if parts.get(1).is_some_and(|s| s.eq_ignore_ascii_case("MULTIPLIER")) => {
        self.options.demand_multiplier = value(2)?.parse_field("demand multiplier")?;
      }
      "QUALITY" => {
        let mode = value(1)?;
        self.options.quality.mode = match mode.to_uppercase().as_str() {
          "NONE" => QualityMode::None,
          "AGE" => QualityMode::Age,
          "TRACE" => QualityMode::Trace { node_id: value(2)?.into() },
          _ => QualityMode::Chemical {
            name: mode.into(),
            units: parts.get(2).copied().unwrap_or("mg/L").into(),
          },
        };
      }
      _ => debug!("Ignoring option: {}", line),
    }
    Ok(())
  }

  fn read_time(&mut self, line: &str) -> Result<(), InputError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let keyword = parts.iter().take_while(|p| p.parse::<f64>().is_err() && !p.contains(':'))
      .map(|p| p.to_uppercase()).collect::<Vec<_>>().join(" ");
    let offset = keyword.split(' ').count();
    let value = parts.get(offset).copied();
    let unit = parts.get(offset + 1).copied();
    let times = &mut self.options.times;

    match keyword.as_str() {
      "DURATION" => times.duration = parse_time(value.ok_or_missing("duration")?, unit)?,
      "HYDRAULIC TIMESTEP" => times.hydraulic_step = parse_time(value.ok_or_missing("hydraulic timestep")?, unit)?,
      "PATTERN TIMESTEP" => times.pattern_step = parse_time(value.ok_or_missing("pattern timestep")?, unit)?,
      "PATTERN START" => times.pattern_start = parse_time(value.ok_or_missing("pattern start")?, unit)?,
      "REPORT TIMESTEP" => times.report_step = parse_time(value.ok_or_missing("report timestep")?, unit)?,
      "REPORT START" => times.report_start = parse_time(value.ok_or_missing("report start")?, unit)?,
      "START CLOCKTIME" => times.start_clocktime = parse_clocktime(value.ok_or_missing("start clocktime")?, unit)?,
      _ => debug!("Ignoring time option: {}", line),
    }
    Ok(())
  }

  /// Read node coordinates: node x y
  fn read_coordinates(&mut self, line: &str) -> Result<(), InputError> {
    let mut parts = line.split_whitespace();
    let id = parts.next().ok_or_missing("node id")?;
    let x = parts.next().ok_or_missing("x coordinate")?.parse_field("x coordinate")?;
    let y = parts.next().ok_or_missing("y coordinate")?.parse_field("y coordinate")?;
    let index = self.node_index(id).ok_or_else(|| InputError::new(format!("Unknown node {}", id)))?;
    self.nodes[index].coordinates = Some((x, y));
    Ok(())
  }

  /// Resolve references, fit pump curves, validate the model and convert to internal units
  fn finish(&mut self) -> Result<(), InputError> {
    if self.options.headloss_formula == HeadlossFormula::ChezyManning {
      return Err(InputError::new("The Chezy-Manning headloss formula is not supported"));
    }
    let times = &self.options.times;
    if times.hydraulic_step == 0 || times.report_step == 0 || times.pattern_step == 0 {
      return Err(InputError::new("Time steps must be greater than zero"));
    }
    if let QualityMode::Trace { node_id } = &self.options.quality.mode {
      if self.node_index(node_id).is_none() {
        return Err(InputError::new(format!("Unknown trace node {}", node_id)));
      }
    }

    // resolve start and end node indices
    for link in self.links.iter_mut() {
      link.start_node = *self.node_map.get(&link.start_node_id)
        .ok_or_else(|| InputError::new(format!("Link {} refers to unknown node {}", link.id, link.start_node_id)))?;
      link.end_node = *self.node_map.get(&link.end_node_id)
        .ok_or_else(|| InputError::new(format!("Link {} refers to unknown node {}", link.id, link.end_node_id)))?;
      if link.start_node == link.end_node {
        return Err(InputError::new(format!("Link {} connects node {} to itself", link.id, link.start_node_id)));
      }
    }

    // fit pump head curves
    for link in self.links.iter_mut() {
      if let LinkType::Pump(pump) = &mut link.link_type {
        if !pump.head_curve.is_empty() {
          let curve = self.curves.get(&pump.head_curve)
            .ok_or_else(|| InputError::new(format!("Pump {} refers to unknown curve {}", link.id, pump.head_curve)))?;
          pump.head_curve_statistics = Some(curve.head_curve_statistics().map_err(InputError::new)?);
        }
      }
    }

    for node in self.nodes.iter() {
      if let NodeType::Tank(tank) = &node.node_type {
        if tank.volume_curve_id.is_some() {
          warn!("Tank {} volume curve is ignored, a cylindrical tank is assumed", node.id);
        }
      }
    }

    if self.nodes.iter().all(|n| !n.is_fixed()) && !self.nodes.is_empty() {
      return Err(InputError::new("Network has no reservoirs or tanks"));
    }

    self.convert_to_internal_units();
    Ok(())
  }

  fn convert_to_internal_units(&mut self) {
    let flow = self.options.flow_units;
    let system = self.options.unit_system();
    let pressure_per_ft = self.options.pressure_units().per_ft();

    for node in self.nodes.iter_mut() {
      node.convert_units(&flow, &system);
    }
    for link in self.links.iter_mut() {
      link.convert_units(&flow, &system);
      if let LinkType::Valve(valve) = &mut link.link_type {
        valve.setting /= valve.valve_type.setting_per_internal(&flow, pressure_per_ft);
      }
    }
    for control in self.controls.iter_mut() {
      if let (ControlCondition::Level { value, .. }, Some(node)) = (&mut control.condition, control.node) {
        // junction thresholds are pressures, tank thresholds are levels
        if self.nodes[node].is_junction() {
          *value /= pressure_per_ft;
        } else {
          *value /= system.length_per_ft();
        }
      }
      if let (Some(setting), LinkType::Valve(valve)) = (control.setting.as_mut(), &self.links[control.link].link_type) {
        *setting /= valve.valve_type.setting_per_internal(&flow, pressure_per_ft);
      }
    }
  }
}

/// Parse a duration given as decimal hours, h:mm[:ss], or a value with a unit keyword
pub fn parse_time(value: &str, unit: Option<&str>) -> Result<usize, InputError> {
  if value.contains(':') {
    let mut seconds = 0.0;
    for (i, part) in value.split(':').enumerate() {
      if i > 2 {
        return Err(InputError::new(format!("Invalid time: {}", value)));
      }
      let part: f64 = part.parse_field("time")?;
      seconds += part * 3600.0 / 60f64.powi(i as i32);
    }
    return Ok(seconds.round() as usize);
  }
  let number: f64 = value.parse_field("time")?;
  if number < 0.0 {
    return Err(InputError::new(format!("Invalid time: {}", value)));
  }
  let factor = match unit.map(|u| u.to_uppercase()) {
    None => 3600.0,
    Some(u) if u.starts_with("SEC") => 1.0,
    Some(u) if u.starts_with("MIN") => 60.0,
    Some(u) if u.starts_with("HOUR") => 3600.0,
    Some(u) if u.starts_with("DAY") => 86400.0,
    Some(u) => return Err(InputError::new(format!("Invalid time unit: {}", u))),
  };
  Ok((number * factor).round() as usize)
}

/// Parse a time of day with an optional AM/PM suffix
pub fn parse_clocktime(value: &str, suffix: Option<&str>) -> Result<usize, InputError> {
  let seconds = parse_time(value, None)?;
  match suffix.map(|s| s.to_uppercase()) {
    None => Ok(seconds % 86400),
    Some(s) if s == "AM" || s == "PM" => {
      if seconds >= 13 * 3600 {
        return Err(InputError::new(format!("Invalid clock time: {} {}", value, s)));
      }
      // 12 AM is midnight and 12 PM is noon
      let seconds = if seconds >= 12 * 3600 { seconds - 12 * 3600 } else { seconds };
      Ok(if s == "PM" { seconds + 12 * 3600 } else { seconds })
    }
    Some(s) => Err(InputError::new(format!("Invalid clock time suffix: {}", s))),
  }
}
