use faer::sparse::{SparseColMat, SymbolicSparseColMat, SymbolicSparseColMatRef, Triplet};
use faer::{Mat, Side};
use faer::prelude::*;
use serde::{Deserialize, Serialize};
use simplelog::{debug, warn};

use crate::constants::*;
use crate::model::control::ControlCondition;
use crate::model::link::{LinkCoefficients, LinkStatus, LinkTrait, LinkType};
use crate::model::network::Network;
use crate::model::node::NodeType;
use crate::quality::QualitySolver;

const SECONDS_PER_DAY: usize = 86400;

/// Results of an extended period simulation, one row per reporting period, in the network's units
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SolverResult {
  /// Time of each reporting period (seconds)
  pub times: Vec<usize>,
  pub heads: Vec<Vec<f64>>,
  pub pressures: Vec<Vec<f64>>,
  pub demands: Vec<Vec<f64>>,
  pub quality: Vec<Vec<f64>>,
  pub flows: Vec<Vec<f64>>,
  pub velocities: Vec<Vec<f64>>,
  pub statuses: Vec<Vec<LinkStatus>>,
  /// Number of hydraulic steps that did not converge
  pub unbalanced_steps: usize,
}

impl SolverResult {
  pub fn periods(&self) -> usize {
    self.times.len()
  }
}

/// Hydraulic state at one point in time, in internal units (ft, cfs)
#[derive(Debug, Clone)]
pub struct HydraulicState {
  pub heads: Vec<f64>,
  pub demands: Vec<f64>,
  pub flows: Vec<f64>,
  pub statuses: Vec<LinkStatus>,
  pub settings: Vec<f64>,
}

/// CSC (Compressed Sparse Column) indices for the Jacobian matrix used in the Global Gradient Algorithm
#[derive(Debug, Default, Clone)]
struct CSCIndex {
  diag_u: Option<usize>,      // CSC index for J[u,u]
  diag_v: Option<usize>,      // CSC index for J[v,v]
  off_diag_uv: Option<usize>, // CSC index for J[u,v]
  off_diag_vu: Option<usize>, // CSC index for J[v,u]
}

/// Extended period hydraulic solver using the Global Gradient Algorithm (Todini & Pilati, 1987)
pub struct HydraulicSolver<'a> {
  network: &'a Network,
  node_to_unknown: Vec<Option<usize>>,
  sparsity_pattern: Option<SymbolicSparseColMat<usize>>,
  csc_indices: Vec<CSCIndex>,
  resistances: Vec<f64>,
}

impl<'a> HydraulicSolver<'a> {
  /// Set up the solver for a network
  ///
  /// The following steps are performed:
  /// 1. Build global unknown-numbering map
  /// 2. Build sparsity pattern (symbolic phase)
  /// 3. Map each link to its CSC indices
  /// 4. Compute the resistance of all links
  pub fn new(network: &'a Network) -> Result<Self, String> {
    let node_to_unknown = build_unknown_numbering_map(network);
    let n_unknowns = node_to_unknown.iter().filter(|x| x.is_some()).count();

    let sparsity_pattern = if n_unknowns > 0 {
      Some(build_sparsity_pattern(network, &node_to_unknown, n_unknowns)?)
    } else {
      None
    };

    let csc_indices = match &sparsity_pattern {
      Some(pattern) => map_links_to_csc_indices(network, pattern.as_ref(), &node_to_unknown),
      None => vec![CSCIndex::default(); network.links.len()],
    };

    let resistances = network.links.iter().map(|l| l.resistance()).collect();

    Ok(Self { network, node_to_unknown, sparsity_pattern, csc_indices, resistances })
  }

  /// Run the extended period simulation, hydraulics followed by water quality
  pub fn run(&self) -> Result<SolverResult, String> {
    let network = self.network;
    let times = &network.options.times;
    let report_times = times.report_times();

    let mut state = self.initial_state();
    let mut recorded: Vec<(usize, HydraulicState)> = Vec::with_capacity(report_times.len());
    let mut unbalanced_steps = 0;
    let mut previous_time = None;
    let mut t = 0;

    loop {
      self.apply_demands_and_fixed_heads(&mut state, t);
      self.apply_controls(&mut state, previous_time, t);

      let converged = self.solve_step(&mut state)?;
      self.update_fixed_node_demands(&mut state);
      if !converged {
        warn!("System unbalanced at {} hrs, results may be inaccurate", t as f64 / 3600.0);
        unbalanced_steps += 1;
      }

      if report_times.binary_search(&t).is_ok() {
        recorded.push((t, state.clone()));
      }
      if t >= times.duration {
        break;
      }

      let next = self.next_time(t, &state);
      self.update_tanks(&mut state, (next - t) as f64);
      previous_time = Some(t);
      t = next;
    }

    debug!("Simulated {} reporting periods", recorded.len());
    let quality = QualitySolver::new(network).run(&recorded);
    Ok(self.report(&recorded, quality, unbalanced_steps))
  }

  fn initial_state(&self) -> HydraulicState {
    let network = self.network;
    let heads = network.nodes.iter().map(|n| match &n.node_type {
      NodeType::Tank(tank) => n.elevation + tank.initial_level,
      _ => n.elevation,
    }).collect();

    let statuses: Vec<LinkStatus> = network.links.iter().map(|l| l.initial_status).collect();

    // initial flows correspond to a velocity of 1 ft/s, pumps start at their design flow
    let flows = network.links.iter().zip(statuses.iter()).map(|(link, status)| {
      if status.is_closed() {
        return SMALL_VALUE;
      }
      match &link.link_type {
        LinkType::Pump(pump) => pump.head_curve_statistics.as_ref().map(|c| c.q_initial).unwrap_or(1.0),
        _ => link.diameter().map(|d| PI * d * d / 4.0).unwrap_or(1.0),
      }
    }).collect();

    let settings = network.links.iter().map(|l| l.initial_setting()).collect();

    HydraulicState { heads, demands: vec![0.0; network.nodes.len()], flows, statuses, settings }
  }

  /// Set junction demands and reservoir heads from their patterns
  fn apply_demands_and_fixed_heads(&self, state: &mut HydraulicState, t: usize) {
    let network = self.network;
    let options = &network.options;
    let default_pattern = options.pattern.as_deref()
      .or_else(|| network.patterns.contains_key("1").then_some("1"));

    for (i, node) in network.nodes.iter().enumerate() {
      match &node.node_type {
        NodeType::Junction(junction) => {
          state.demands[i] = junction.demands.iter().map(|d| {
            let pattern = d.pattern.as_deref().or(default_pattern);
            d.base_demand * network.pattern_multiplier(pattern, t)
          }).sum::<f64>() * options.demand_multiplier;
        }
        NodeType::Reservoir(reservoir) => {
          state.heads[i] = node.elevation * network.pattern_multiplier(reservoir.head_pattern.as_deref(), t);
        }
        NodeType::Tank(_) => (),
      }
    }

    // pump speed patterns
    for (k, link) in network.links.iter().enumerate() {
      if let LinkType::Pump(pump) = &link.link_type {
        if pump.pattern.is_some() {
          let speed = pump.speed * network.pattern_multiplier(pump.pattern.as_deref(), t);
          state.settings[k] = speed;
          state.statuses[k] = if speed == 0.0 { LinkStatus::Closed } else if state.statuses[k] == LinkStatus::Closed { LinkStatus::Open } else { state.statuses[k] };
        }
      }
    }
  }

  /// Apply simple controls whose condition holds at time t
  fn apply_controls(&self, state: &mut HydraulicState, previous_time: Option<usize>, t: usize) {
    let network = self.network;
    let clock = network.options.times.start_clocktime;

    for control in network.controls.iter() {
      let active = match &control.condition {
        ControlCondition::Time { seconds } => match previous_time {
          Some(prev) => prev < *seconds && *seconds <= t,
          None => *seconds == 0,
        },
        ControlCondition::ClockTime { seconds } => match previous_time {
          Some(prev) => crosses_clocktime(clock + prev, clock + t, *seconds),
          None => (clock + t) % SECONDS_PER_DAY == *seconds,
        },
        ControlCondition::Level { above, value, .. } => match control.node {
          Some(node) => {
            let level = state.heads[node] - network.nodes[node].elevation;
            if *above { level > *value } else { level < *value }
          }
          None => false,
        },
      };
      if !active {
        continue;
      }

      let k = control.link;
      if let Some(status) = control.status {
        if state.statuses[k] != status {
          debug!("Control sets link {} to {:?} at {} s", control.link_id, status, t);
        }
        state.statuses[k] = status;
      }
      if let Some(setting) = control.setting {
        state.settings[k] = setting;
        // a pump setting is its speed, zero speed closes the pump
        if let LinkType::Pump(_) = network.links[k].link_type {
          state.statuses[k] = if setting == 0.0 { LinkStatus::Closed } else { LinkStatus::Open };
        } else if let LinkType::Valve(_) = network.links[k].link_type {
          state.statuses[k] = LinkStatus::Active;
        }
      }
    }
  }

  /// Solve heads and flows at the current time. Returns false if the solution did not converge.
  fn solve_step(&self, state: &mut HydraulicState) -> Result<bool, String> {
    let network = self.network;
    let options = &network.options;
    let n_unknowns = self.sparsity_pattern.as_ref().map(|p| p.as_ref().ncols()).unwrap_or(0);

    let n_values = self.sparsity_pattern.as_ref().map(|p| p.as_ref().row_idx().len()).unwrap_or(0);
    let mut values = vec![0.0; n_values]; // Jacobian matrix values
    let mut rhs = vec![0.0; n_unknowns]; // RHS = -demand (unknown nodes only)
    let mut coefficients = vec![LinkCoefficients::simple(0.0, 0.0); network.links.len()];

    for trial in 1..=options.max_trials.max(1) {
      values.fill(0.0);
      rhs.fill(0.0);

      // set RHS to -demand (unknown nodes only)
      for (global, &head_id) in self.node_to_unknown.iter().enumerate() {
        if let Some(i) = head_id {
          rhs[i] = -state.demands[global];
        }
      }

      // assemble Jacobian and RHS contributions from links
      for (k, link) in network.links.iter().enumerate() {
        let c = link.coefficients(state.flows[k], self.resistances[k], state.statuses[k], state.settings[k]);
        coefficients[k] = c;
        let g = c.g_inv;
        let y = state.flows[k] - c.y;

        let u = self.node_to_unknown[link.start_node];
        let v = self.node_to_unknown[link.end_node];
        let csc = &self.csc_indices[k];

        if let (Some(i), Some(diag)) = (u, csc.diag_u) {
          values[diag] += g;
          rhs[i] -= y;
          // if the end node is a reservoir or tank, its known head moves to the RHS
          if v.is_none() {
            rhs[i] += g * state.heads[link.end_node];
          }
        }
        if let (Some(j), Some(diag)) = (v, csc.diag_v) {
          values[diag] += g;
          rhs[j] += y;
          if u.is_none() {
            rhs[j] += g * state.heads[link.start_node];
          }
        }
        if let (Some(uv), Some(vu)) = (csc.off_diag_uv, csc.off_diag_vu) {
          values[uv] -= g;
          values[vu] -= g;
        }
      }

      // solve the system of equations: J * h = rhs
      if let Some(pattern) = &self.sparsity_pattern {
        let jac = SparseColMat::new(pattern.clone(), values.clone());
        let solver = jac.sp_cholesky(Side::Lower)
          .map_err(|_| "Singular matrix, check network connectivity".to_string())?;
        let h = solver.solve(&Mat::from_fn(n_unknowns, 1, |r, _| rhs[r]));

        for (global, &head_id) in self.node_to_unknown.iter().enumerate() {
          if let Some(i) = head_id {
            state.heads[global] = h[(i, 0)];
          }
        }
      }

      // update the flows of the links
      let mut sum_dq = 0.0;
      let mut sum_q = 0.0;
      for (k, link) in network.links.iter().enumerate() {
        let c = coefficients[k];
        let dh = state.heads[link.start_node] - state.heads[link.end_node];
        let dq = c.y - c.g_inv * dh;
        state.flows[k] -= dq;
        sum_dq += dq.abs();
        sum_q += state.flows[k].abs();
      }
      let rel_change = if sum_q > 0.0 { sum_dq / sum_q } else { sum_dq };

      // check statuses periodically, and always once the solution has converged
      let converged = rel_change <= options.accuracy;
      let periodic = options.check_frequency > 0 && trial % options.check_frequency == 0 && trial <= options.max_check;
      if converged || periodic {
        let changed = self.update_statuses(state);
        if converged && !changed {
          debug!("Converged in {} trials", trial);
          return Ok(true);
        }
      }
    }
    Ok(false)
  }

  /// Update check valve and pump statuses, returns true if any status changed
  fn update_statuses(&self, state: &mut HydraulicState) -> bool {
    let mut changed = false;
    for (k, link) in self.network.links.iter().enumerate() {
      let h_up = state.heads[link.start_node];
      let h_down = state.heads[link.end_node];
      if let Some(status) = link.update_status(state.statuses[k], state.settings[k], state.flows[k], h_up, h_down) {
        debug!("Link {} changed status from {:?} to {:?}", link.id, state.statuses[k], status);
        state.statuses[k] = status;
        changed = true;
      }
    }
    changed
  }

  /// Demand of reservoirs and tanks is their net inflow (negative when supplying the network)
  fn update_fixed_node_demands(&self, state: &mut HydraulicState) {
    let network = self.network;
    for (i, node) in network.nodes.iter().enumerate() {
      if node.is_fixed() {
        state.demands[i] = 0.0;
      }
    }
    for (k, link) in network.links.iter().enumerate() {
      if state.statuses[k].is_closed() {
        continue;
      }
      if network.nodes[link.start_node].is_fixed() {
        state.demands[link.start_node] -= state.flows[k];
      }
      if network.nodes[link.end_node].is_fixed() {
        state.demands[link.end_node] += state.flows[k];
      }
    }
  }

  /// Integrate tank levels over a time step of dt seconds
  fn update_tanks(&self, state: &mut HydraulicState, dt: f64) {
    let network = self.network;
    for (i, node) in network.nodes.iter().enumerate() {
      if let NodeType::Tank(tank) = &node.node_type {
        let inflow = state.demands[i];
        let head = tank.new_head(node.elevation, inflow * dt, state.heads[i]);
        if tank.is_full(node.elevation, head) && inflow > 0.0 {
          debug!("Tank {} is full", node.id);
        } else if tank.is_empty(node.elevation, head) && inflow < 0.0 {
          debug!("Tank {} is empty", node.id);
        }
        state.heads[i] = head;
      }
    }
  }

  /// Next hydraulic time: the earliest of the next hydraulic step, reporting period,
  /// pattern period, timed control, tank level crossing or the end of the simulation
  fn next_time(&self, t: usize, state: &HydraulicState) -> usize {
    let network = self.network;
    let times = &network.options.times;
    let mut next = (t + times.hydraulic_step).min(times.duration);

    let next_multiple = |start: usize, step: usize| -> usize {
      if t < start { start } else { start + ((t - start) / step + 1) * step }
    };
    next = next.min(next_multiple(times.report_start, times.report_step));
    // pattern periods are counted from pattern start
    let pattern_offset = times.pattern_start % times.pattern_step;
    let pattern_next = (t + pattern_offset) / times.pattern_step * times.pattern_step + times.pattern_step - pattern_offset;
    next = next.min(pattern_next);

    for control in network.controls.iter() {
      match control.condition {
        ControlCondition::Time { seconds } if seconds > t => next = next.min(seconds),
        ControlCondition::ClockTime { seconds } => {
          let clock = (times.start_clocktime + t) % SECONDS_PER_DAY;
          let wait = if seconds > clock { seconds - clock } else { SECONDS_PER_DAY - clock + seconds };
          next = next.min(t + wait);
        }
        _ => (),
      }
    }
    if let Some(wait) = self.time_to_tank_level(state) {
      next = next.min(t + wait);
    }
    next.max(t + 1)
  }

  /// Seconds until a tank fills, empties, or crosses the level of a control on it
  fn time_to_tank_level(&self, state: &HydraulicState) -> Option<usize> {
    let network = self.network;
    let mut wait: Option<usize> = None;

    for (i, node) in network.nodes.iter().enumerate() {
      let NodeType::Tank(tank) = &node.node_type else { continue };
      let inflow = state.demands[i];
      let area = tank.area();
      if inflow.abs() < SMALL_VALUE || area <= 0.0 {
        continue;
      }
      let rate = inflow / area; // ft/s
      let level = state.heads[i] - node.elevation;

      let control_levels = network.controls.iter().filter_map(|c| match c.condition {
        ControlCondition::Level { value, .. } if c.node == Some(i) => Some(value),
        _ => None,
      });
      for target in control_levels.chain([tank.min_level, tank.max_level]) {
        let distance = target - level;
        // only levels ahead in the direction the tank is moving
        if distance * rate <= 0.0 || distance.abs() < SMALL_VALUE {
          continue;
        }
        // one second past the crossing so the level is strictly beyond the target
        let seconds = (distance / rate).floor() as usize + 1;
        wait = Some(wait.map_or(seconds, |w| w.min(seconds)));
      }
    }
    wait
  }

  /// Convert the recorded states to reporting units
  fn report(&self, recorded: &[(usize, HydraulicState)], quality: Vec<Vec<f64>>, unbalanced_steps: usize) -> SolverResult {
    let network = self.network;
    let options = &network.options;
    let system = options.unit_system();
    let length = system.length_per_ft();
    let pressure = options.pressure_units().per_ft();
    let flow = options.flow_units.per_cfs();

    let mut result = SolverResult { unbalanced_steps, quality, ..Default::default() };
    for (t, state) in recorded {
      result.times.push(*t);
      result.heads.push(state.heads.iter().map(|h| h * length).collect());
      result.pressures.push(network.nodes.iter().zip(state.heads.iter())
        .map(|(n, h)| (h - n.elevation) * pressure).collect());
      result.demands.push(state.demands.iter().map(|d| d * flow).collect());
      result.flows.push(state.flows.iter().zip(state.statuses.iter())
        .map(|(q, s)| if s.is_closed() { 0.0 } else { q * flow }).collect());
      result.velocities.push(network.links.iter().zip(state.flows.iter()).zip(state.statuses.iter())
        .map(|((l, q), s)| if s.is_closed() { 0.0 } else { l.velocity(*q) * length }).collect());
      result.statuses.push(state.statuses.clone());
    }
    result
  }
}

/// True if the time of day `seconds` is passed when moving from clock time `from` to `to`
fn crosses_clocktime(from: usize, to: usize, seconds: usize) -> bool {
  let day = from / SECONDS_PER_DAY;
  // first occurrence after from
  let mut occurrence = day * SECONDS_PER_DAY + seconds;
  if occurrence <= from {
    occurrence += SECONDS_PER_DAY;
  }
  occurrence <= to
}

/// Build global unknown-numbering map, junction heads are the unknowns
fn build_unknown_numbering_map(network: &Network) -> Vec<Option<usize>> {
  let mut unknown_id = 0;
  network.nodes
    .iter()
    .map(|n| if n.is_junction() { let id = unknown_id; unknown_id += 1; Some(id) } else { None })
    .collect()
}

/// Build sparsity pattern of the Jacobian
fn build_sparsity_pattern(network: &Network, node_to_unknown: &[Option<usize>], n_unknowns: usize) -> Result<SymbolicSparseColMat<usize>, String> {
  let mut triplets = Vec::new();
  // every unknown has a diagonal entry, even if it is isolated
  for i in 0..n_unknowns {
    triplets.push(Triplet::new(i, i, 0.0));
  }
  for link in network.links.iter() {
    let u = node_to_unknown[link.start_node];
    let v = node_to_unknown[link.end_node];
    // off diagonal elements (connectivity)
    if let (Some(i), Some(j)) = (u, v) {
      triplets.push(Triplet::new(i, j, 0.0));
      triplets.push(Triplet::new(j, i, 0.0));
    }
  }
  // convert triplets to sparse matrix
  let sparsity_matrix = SparseColMat::<usize, f64>::try_new_from_triplets(n_unknowns, n_unknowns, &triplets)
    .map_err(|_| "Failed to build the Jacobian sparsity pattern".to_string())?;
  sparsity_matrix.symbolic().to_owned()
    .map_err(|_| "Failed to build the Jacobian sparsity pattern".to_string())
}

/// Map each link to its CSC (Compressed Sparse Column) indices
fn map_links_to_csc_indices(network: &Network, sym: SymbolicSparseColMatRef<'_, usize>, node_to_unknown: &[Option<usize>]) -> Vec<CSCIndex> {
  network.links.iter().map(|link| {
    let mut csc_index = CSCIndex::default();
    let u = node_to_unknown[link.start_node];
    let v = node_to_unknown[link.end_node];

    if let Some(i) = u { csc_index.diag_u = find_csc_index(sym, i, i); }
    if let Some(j) = v { csc_index.diag_v = find_csc_index(sym, j, j); }
    if let (Some(i), Some(j)) = (u, v) {
      csc_index.off_diag_uv = find_csc_index(sym, i, j);
      csc_index.off_diag_vu = find_csc_index(sym, j, i);
    }
    csc_index
  }).collect()
}

/// Helper function to find the CSC index for a given row and column
fn find_csc_index(sym: SymbolicSparseColMatRef<'_, usize>, row: usize, col: usize) -> Option<usize> {
  let col_start = sym.col_ptr()[col];
  let col_end = sym.col_ptr()[col + 1];
  sym.row_idx()[col_start..col_end]
    .iter()
    .position(|&r| r == row)
    .map(|pos| col_start + pos)
}
