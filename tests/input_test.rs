//! Tests for reading .inp files

use std::io::Cursor;

use epanet_view::constants::{GPM_PER_CFS, KPA_PER_PSI, LPS_PER_CFS, M_PER_FT, PSI_PER_FT};
use epanet_view::input::{parse_clocktime, parse_time};
use epanet_view::model::link::LinkType;
use epanet_view::model::network::Network;
use epanet_view::model::node::NodeType;
use epanet_view::model::options::QualityMode;
use epanet_view::model::units::{FlowUnits, PressureUnits};

fn read(text: &str) -> Result<Network, epanet_view::InputError> {
  let mut network = Network::default();
  network.read_from(Cursor::new(text))?;
  Ok(network)
}

#[test]
fn test_read_tank_network() {
  let network = Network::from_inp("networks/tank.inp").expect("Failed to load tank.inp");
  assert_eq!(network.nodes.len(), 3);
  assert_eq!(network.links.len(), 2);
  assert_eq!(network.title, vec!["Reservoir filling a tank through a demand junction".to_string()]);

  // patterns continue over several lines
  assert_eq!(network.patterns["DAY"].multipliers, vec![0.5, 1.0, 1.5, 1.0, 0.8, 0.6]);

  let times = &network.options.times;
  assert_eq!(times.duration, 6 * 3600);
  assert_eq!(times.report_periods(), 7);

  assert_eq!(network.options.quality.bulk_coeff, -0.5);
  assert_eq!(network.options.quality.mode, QualityMode::Chemical { name: "Chlorine".into(), units: "mg/L".into() });

  let j1 = &network.nodes[network.node_index("J1").unwrap()];
  assert_eq!(j1.coordinates, Some((1000.0, 0.0)));
  assert!((j1.base_demand() - 50.0 / GPM_PER_CFS).abs() < 1e-12);

  let p1 = &network.links[network.link_index("P1").unwrap()];
  match &p1.link_type {
    LinkType::Pipe(pipe) => assert!((pipe.diameter - 1.0).abs() < 1e-12),
    _ => panic!("P1 should be a pipe"),
  }
  assert_eq!(network.nodes[p1.start_node].id.as_ref(), "R1");
}

#[test]
fn test_parse_error_carries_line_number() {
  let err = Network::from_inp("networks/malformed.inp").unwrap_err();
  assert_eq!(err.line, Some(8));
  assert!(err.message.contains("diameter"), "Unexpected message: {}", err.message);
  assert!(err.context.as_deref().unwrap_or("").contains("twelve"));
}

#[test]
fn test_unknown_node_is_rejected() {
  let err = Network::from_inp("networks/missing_node.inp").unwrap_err();
  assert!(err.message.contains("J9"), "Unexpected message: {}", err.message);
}

#[test]
fn test_missing_file() {
  assert!(Network::from_inp("networks/does_not_exist.inp").is_err());
}

#[test]
fn test_duplicate_node() {
  let err = read("[JUNCTIONS]\nJ1 10\nJ1 20\n[RESERVOIRS]\nR1 50\n").unwrap_err();
  assert_eq!(err.line, Some(3));
}

#[test]
fn test_network_without_fixed_nodes() {
  assert!(read("[JUNCTIONS]\nJ1 10\nJ2 20\n[PIPES]\nP1 J1 J2 100 6 100\n").is_err());
}

#[test]
fn test_chezy_manning_rejected() {
  let err = read("[RESERVOIRS]\nR1 50\n[OPTIONS]\nHeadloss C-M\n").unwrap_err();
  assert!(err.message.contains("Chezy-Manning"));
}

#[test]
fn test_si_units_are_converted() {
  let text = "\
[JUNCTIONS]
J1 10 5
[RESERVOIRS]
R1 50
[PIPES]
P1 R1 J1 100 300 100
[OPTIONS]
Units LPS
";
  let network = read(text).unwrap();
  assert_eq!(network.options.flow_units, FlowUnits::LPS);
  let j1 = &network.nodes[0];
  assert!((j1.elevation - 10.0 / M_PER_FT).abs() < 1e-9);
  assert!((j1.base_demand() - 5.0 / LPS_PER_CFS).abs() < 1e-12);
  match &network.links[0].link_type {
    LinkType::Pipe(pipe) => {
      assert!((pipe.diameter - 0.3 / M_PER_FT).abs() < 1e-9);
      assert!((pipe.length - 100.0 / M_PER_FT).abs() < 1e-9);
    }
    _ => panic!("P1 should be a pipe"),
  }
}

#[test]
fn test_demands_section_replaces_junction_demand() {
  let text = "\
[JUNCTIONS]
J1 10 5
[RESERVOIRS]
R1 50
[PIPES]
P1 R1 J1 100 12 100
[DEMANDS]
J1 2
J1 3 PAT
[PATTERNS]
PAT 1 2
[OPTIONS]
Units CFS
";
  let network = read(text).unwrap();
  match &network.nodes[0].node_type {
    NodeType::Junction(junction) => {
      assert_eq!(junction.demands.len(), 2);
      assert_eq!(network.nodes[0].base_demand(), 5.0);
      assert_eq!(junction.demands[1].pattern.as_deref(), Some("PAT"));
    }
    _ => panic!("J1 should be a junction"),
  }
}

#[test]
fn test_comments_and_unknown_sections() {
  let text = "\
; leading comment
[JUNCTIONS]
J1 10 ; elevation only
[RESERVOIRS]
R1 50
[PIPES]
P1 R1 J1 100 12 100
[LABELS]
1 2 some label
[END]
[JUNCTIONS]
J2 10
";
  let network = read(text).unwrap();
  assert_eq!(network.nodes.len(), 2);
  assert!(network.node_index("J2").is_none());
}

#[test]
fn test_parse_time() {
  assert_eq!(parse_time("6", None).unwrap(), 6 * 3600);
  assert_eq!(parse_time("1:30", None).unwrap(), 5400);
  assert_eq!(parse_time("0:00:45", None).unwrap(), 45);
  assert_eq!(parse_time("90", Some("MIN")).unwrap(), 5400);
  assert_eq!(parse_time("2", Some("days")).unwrap(), 2 * 86400);
  assert_eq!(parse_time("15", Some("SECONDS")).unwrap(), 15);
  assert!(parse_time("abc", None).is_err());
  assert!(parse_time("1", Some("weeks")).is_err());
}

#[test]
fn test_parse_clocktime() {
  assert_eq!(parse_clocktime("6", Some("PM")).unwrap(), 18 * 3600);
  assert_eq!(parse_clocktime("12", Some("AM")).unwrap(), 0);
  assert_eq!(parse_clocktime("12", Some("PM")).unwrap(), 12 * 3600);
  assert_eq!(parse_clocktime("14:30", None).unwrap(), 14 * 3600 + 1800);
  assert!(parse_clocktime("14", Some("PM")).is_err());
}

#[test]
fn test_epanet_22_options() {
  let text = "\
[JUNCTIONS]
J1 10 5
[RESERVOIRS]
R1 50
[PIPES]
P1 R1 J1 100 12 100
[OPTIONS]
 Units              GPM
 Headloss           H-W
 Specific Gravity   1.0
 Viscosity          1.0
 Trials             40
 Accuracy           0.001
 CHECKFREQ          2
 MAXCHECK           10
 DAMPLIMIT          0
 Unbalanced         Continue 10
 Demand Multiplier  1.5
 Emitter Exponent   0.5
 Quality            None mg/L
 Diffusivity        1.0
 Tolerance          0.01
 Demand Model       DDA
 Minimum Pressure   0
 Required Pressure  0.1
 Pressure Exponent  0.5
";
  let network = read(text).unwrap();
  assert_eq!(network.options.max_trials, 40);
  assert_eq!(network.options.demand_multiplier, 1.5);
  assert_eq!(network.options.quality.mode, QualityMode::None);
  assert_eq!(network.options.pressure_units(), PressureUnits::PSI);

  // a unit on its own still sets the pressure units
  let network = read("[RESERVOIRS]\nR1 50\n[OPTIONS]\nPressure KPA\n").unwrap();
  assert_eq!(network.options.pressure_units(), PressureUnits::KPA);
  assert!(read("[RESERVOIRS]\nR1 50\n[OPTIONS]\nPressure Exponent\n").is_err());
}

#[test]
fn test_valve_settings_follow_pressure_units() {
  let text = "\
[RESERVOIRS]
R1 100
[JUNCTIONS]
J1 0 10
[VALVES]
V1 R1 J1 12 PBV 50
[CONTROLS]
LINK V1 30 AT TIME 1
[OPTIONS]
Units GPM
Pressure KPA
";
  let network = read(text).unwrap();
  let kpa_per_ft = PSI_PER_FT * KPA_PER_PSI;
  match &network.links[0].link_type {
    LinkType::Valve(valve) => assert!((valve.setting - 50.0 / kpa_per_ft).abs() < 1e-9),
    _ => panic!("V1 should be a valve"),
  }
  let setting = network.controls[0].setting.unwrap();
  assert!((setting - 30.0 / kpa_per_ft).abs() < 1e-9);
}

#[test]
fn test_tank_optional_fields() {
  let text = "\
[RESERVOIRS]
R1 150
[TANKS]
T1 100 10 0 30 50 0 VC YES
T2 100 10 0 30 50 0 *
T3 100 10 0 30 50
[CURVES]
VC 0 0
VC 30 60000
";
  let network = read(text).unwrap();
  let curve_ids: Vec<Option<&str>> = network.nodes[1..].iter().map(|n| match &n.node_type {
    NodeType::Tank(tank) => tank.volume_curve_id.as_deref(),
    _ => panic!("{} should be a tank", n.id),
  }).collect();
  assert_eq!(curve_ids, vec![Some("VC"), None, None]);
}
