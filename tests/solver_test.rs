//! Integration tests for the hydraulic and quality solvers

use epanet_view::constants::{GPM_PER_CFS, PSI_PER_FT};
use epanet_view::model::link::LinkStatus;
use epanet_view::model::network::Network;
use epanet_view::solver::{HydraulicSolver, SolverResult};

fn solve(path: &str) -> (Network, SolverResult) {
  let network = Network::from_inp(path).expect(&format!("Failed to load {}", path));
  let solver = HydraulicSolver::new(&network).expect("Failed to set up solver");
  let result = solver.run().expect("Simulation failed");
  (network, result)
}

fn node_column(network: &Network, table: &[Vec<f64>], id: &str) -> Vec<f64> {
  let idx = network.node_index(id).expect(&format!("Node {} not found", id));
  table.iter().map(|row| row[idx]).collect()
}

fn link_column(network: &Network, table: &[Vec<f64>], id: &str) -> Vec<f64> {
  let idx = network.link_index(id).expect(&format!("Link {} not found", id));
  table.iter().map(|row| row[idx]).collect()
}

/// Junction head is the reservoir head minus the Hazen-Williams head loss of the demand
#[test]
fn test_single_pipe_hazen_williams() {
  let (network, result) = solve("networks/single_pipe.inp");
  assert_eq!(result.periods(), 1);
  assert_eq!(result.unbalanced_steps, 0);

  let q = 100.0 / GPM_PER_CFS;
  let (c, d, l) = (100.0_f64, 1.0_f64, 1000.0);
  let headloss = 4.727 * c.powf(-1.852) * d.powf(-4.871) * l * q.powf(1.852);
  let expected_head = 100.0 - headloss;

  let head = node_column(&network, &result.heads, "J1")[0];
  assert!((head - expected_head).abs() < 1e-3, "Head mismatch: expected {:.4}, got {:.4}", expected_head, head);

  let pressure = node_column(&network, &result.pressures, "J1")[0];
  assert!((pressure - expected_head * PSI_PER_FT).abs() < 1e-3);

  let flow = link_column(&network, &result.flows, "P1")[0];
  assert!((flow - 100.0).abs() < 1e-3, "Flow mismatch: expected 100 gpm, got {:.4}", flow);

  // the reservoir supplies the demand
  let supply = node_column(&network, &result.demands, "R1")[0];
  assert!((supply + 100.0).abs() < 1e-3);
}

#[test]
fn test_tank_fills_within_bounds() {
  let (network, result) = solve("networks/tank.inp");
  assert_eq!(result.periods(), 7);
  assert_eq!(result.times, vec![0, 3600, 7200, 10800, 14400, 18000, 21600]);

  let levels: Vec<f64> = node_column(&network, &result.heads, "T1").iter().map(|h| h - 100.0).collect();
  assert!((levels[0] - 10.0).abs() < 1e-9);
  for pair in levels.windows(2) {
    assert!(pair[1] >= pair[0] - 1e-9, "Tank level dropped while filling: {:?}", levels);
  }
  for level in levels.iter() {
    assert!(*level >= -1e-9 && *level <= 30.0 + 1e-9, "Tank level out of bounds: {}", level);
  }
  assert!((levels[6] - 30.0).abs() < 1e-6, "Tank should be full, level {}", levels[6]);

  // tank inflow is positive while the reservoir is higher
  let inflow = node_column(&network, &result.demands, "T1");
  assert!(inflow[0] > 0.0);
}

#[test]
fn test_demand_pattern() {
  let (network, result) = solve("networks/tank.inp");
  let demand = node_column(&network, &result.demands, "J1");
  let expected = [25.0, 50.0, 75.0, 50.0, 40.0, 30.0, 25.0];
  for (actual, expected) in demand.iter().zip(expected.iter()) {
    assert!((actual - expected).abs() < 1e-9, "Demand mismatch: {:?}", demand);
  }
}

#[test]
fn test_chlorine_decays_along_pipes() {
  let (network, result) = solve("networks/tank.inp");
  assert_eq!(result.quality.len(), result.periods());
  let source = node_column(&network, &result.quality, "R1");
  let junction = node_column(&network, &result.quality, "J1");
  for (s, j) in source.iter().zip(junction.iter()) {
    assert_eq!(*s, 1.0);
    assert!(*j > 0.9 && *j < 1.0, "Chlorine at J1 should decay slightly, got {}", j);
  }
}

#[test]
fn test_pump_network_with_control() {
  let (network, result) = solve("networks/pump.inp");
  assert_eq!(result.periods(), 3);

  // the pump delivers the total demand
  for flow in link_column(&network, &result.flows, "PU1") {
    assert!((flow - 500.0).abs() < 0.01, "Pump flow mismatch: {}", flow);
  }

  // the pump lifts water above the reservoir
  let head = node_column(&network, &result.heads, "2");
  assert!(head[0] > 150.0);

  // pipe 13 is closed by the control at 2 hours
  let statuses: Vec<LinkStatus> = result.statuses.iter().map(|row| row[network.link_index("13").unwrap()]).collect();
  assert_eq!(statuses[0], LinkStatus::Open);
  assert_eq!(statuses[1], LinkStatus::Closed);
  assert_eq!(link_column(&network, &result.flows, "13")[1], 0.0);
  assert!((link_column(&network, &result.flows, "12")[1] - 200.0).abs() < 0.01);

  // water age grows downstream of the reservoir
  let age_2 = node_column(&network, &result.quality, "2");
  let age_4 = node_column(&network, &result.quality, "4");
  assert_eq!(node_column(&network, &result.quality, "1")[0], 0.0);
  assert!(age_4[1] > age_2[1]);
}

#[test]
fn test_level_control_closes_tank_inlet() {
  let (network, result) = solve("networks/tank_control.inp");
  assert_eq!(result.periods(), 7);

  // the step is cut short when the tank crosses the control level
  let levels: Vec<f64> = node_column(&network, &result.heads, "T1").iter().map(|h| h - 100.0).collect();
  assert!((levels[0] - 10.0).abs() < 1e-9);
  for level in levels[1..].iter() {
    assert!(*level > 11.0 && *level < 11.01, "Tank level should stop just above 11 ft: {:?}", levels);
  }

  let p2 = network.link_index("P2").unwrap();
  let statuses: Vec<LinkStatus> = result.statuses.iter().map(|row| row[p2]).collect();
  assert_eq!(statuses[0], LinkStatus::Open);
  assert!(statuses[1..].iter().all(|s| *s == LinkStatus::Closed), "P2 statuses: {:?}", statuses);
  assert_eq!(link_column(&network, &result.flows, "P2")[3], 0.0);
}
