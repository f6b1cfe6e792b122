//! Tests for the network session facade

use std::fs;

use epanet_view::constants::PSI_PER_FT;
use epanet_view::plot::{PlotParams, SeriesKind, SvgSurface, TimeUnit};
use epanet_view::wrapper::{ElementRef, EpanetWrapper};
use epanet_view::WrapperError;

fn loaded(path: &str) -> EpanetWrapper {
  EpanetWrapper::with_file(path).unwrap_or_else(|e| panic!("Failed to load {}: {}", path, e))
}

fn simulated(path: &str) -> EpanetWrapper {
  let mut wrapper = loaded(path);
  wrapper.run_simulation().expect("Simulation failed");
  wrapper
}

#[test]
fn test_lifecycle() {
  let mut wrapper = EpanetWrapper::new();
  assert!(!wrapper.is_loaded());

  wrapper.load_file("networks/tank.inp").unwrap();
  assert!(wrapper.is_loaded());
  assert_eq!(wrapper.get_file_name().as_deref(), Some("tank.inp"));
  assert!(wrapper.get_file_path().unwrap().ends_with("networks/tank.inp"));
  assert!(!wrapper.has_results());

  wrapper.run_simulation().unwrap();
  assert!(wrapper.has_results());

  // loading another file replaces the session and its results
  wrapper.load_file("networks/single_pipe.inp").unwrap();
  assert_eq!(wrapper.get_file_name().as_deref(), Some("single_pipe.inp"));
  assert!(!wrapper.has_results());

  wrapper.close();
  assert!(!wrapper.is_loaded());
  assert!(wrapper.get_file_name().is_none());
  assert!(wrapper.get_file_path().is_none());
  assert!(matches!(wrapper.get_statistics(), Err(WrapperError::NotLoaded)));

  // closing twice is harmless
  wrapper.close();
  assert!(!wrapper.is_loaded());
}

#[test]
fn test_calls_before_load_fail() {
  let mut wrapper = EpanetWrapper::new();
  let mut surface = SvgSurface::default();
  assert!(matches!(wrapper.run_simulation(), Err(WrapperError::NotLoaded)));
  assert!(matches!(wrapper.get_statistics(), Err(WrapperError::NotLoaded)));
  assert!(matches!(wrapper.get_node_attribute("J1", "elevation"), Err(WrapperError::NotLoaded)));
  assert!(matches!(wrapper.get_node_attribute("J1", "colour"), Err(WrapperError::NotLoaded)));
  assert!(matches!(wrapper.get_node_attributes("colour"), Err(WrapperError::NotLoaded)));
  assert!(matches!(wrapper.get_node_pressures(), Err(WrapperError::NotLoaded)));
  assert!(matches!(wrapper.plot_network_topology(&mut surface, &PlotParams::new()), Err(WrapperError::NotLoaded)));
  assert!(matches!(
    wrapper.plot_network_attributes(&mut surface, "elevation", None, &PlotParams::new()),
    Err(WrapperError::NotLoaded)
  ));
  assert!(matches!(
    wrapper.plot_time_series(&mut surface, SeriesKind::Pressure, None, TimeUnit::Hours),
    Err(WrapperError::NotLoaded)
  ));
}

#[test]
fn test_load_errors() {
  let mut wrapper = EpanetWrapper::new();
  assert!(matches!(wrapper.load_file("networks/nope.inp"), Err(WrapperError::FileNotFound(_))));

  let text_file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
  assert!(matches!(wrapper.load_file(text_file.path()), Err(WrapperError::InvalidExtension(_))));

  match wrapper.load_file("networks/malformed.inp") {
    Err(WrapperError::Load(e)) => assert_eq!(e.line, Some(8)),
    other => panic!("Expected a load error, got {:?}", other),
  }
  assert!(!wrapper.is_loaded());
}

#[test]
fn test_extension_is_case_insensitive() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("NET.INP");
  fs::copy("networks/single_pipe.inp", &path).unwrap();
  let wrapper = loaded(path.to_str().unwrap());
  assert_eq!(wrapper.get_file_name().as_deref(), Some("NET.INP"));
}

#[test]
fn test_statistics() {
  let wrapper = loaded("networks/tank.inp");
  let stats = wrapper.get_statistics().unwrap();
  assert_eq!(stats.node_count, 3);
  assert_eq!(stats.link_count, 2);
  assert_eq!((stats.junction_count, stats.reservoir_count, stats.tank_count), (1, 1, 1));
  assert_eq!((stats.pipe_count, stats.pump_count, stats.valve_count), (2, 0, 0));
  assert_eq!(stats.node_names, vec!["J1", "R1", "T1"]);
  assert_eq!(stats.link_names, vec!["P1", "P2"]);
  assert_eq!(stats.node_elevations, vec![50.0, 150.0, 100.0]);
  assert_eq!(stats.node_coordinates[2], Some((2000.0, 0.0)));
  assert!((stats.total_pipe_length - 2000.0).abs() < 1e-9);
  assert_eq!(stats.flow_units, "gpm");
  assert_eq!(stats.report_periods, 7);

  let pump = loaded("networks/pump.inp").get_statistics().unwrap();
  assert_eq!((pump.pipe_count, pump.pump_count), (3, 1));
}

#[test]
fn test_node_attributes() {
  let mut wrapper = loaded("networks/single_pipe.inp");
  assert_eq!(wrapper.get_node_attribute("J1", "elevation").unwrap(), 0.0);
  assert!((wrapper.get_node_attribute("J1", "base_demand").unwrap() - 100.0).abs() < 1e-9);
  assert_eq!(wrapper.get_node_attribute("J1", "x").unwrap(), 100.0);
  assert!(matches!(wrapper.get_node_attribute("J1", "pressure"), Err(WrapperError::NoSimulation)));
  assert!(matches!(wrapper.get_node_attribute("J7", "elevation"), Err(WrapperError::UnknownNode(_))));
  assert!(matches!(wrapper.get_node_attribute("J1", "colour"), Err(WrapperError::UnknownAttribute(_))));

  wrapper.run_simulation().unwrap();
  let head = wrapper.get_node_attribute("J1", "head").unwrap();
  let pressure = wrapper.get_node_attribute(ElementRef::Index(1), "pressure").unwrap();
  assert!(head > 99.0 && head < 100.0);
  assert!((pressure - head * PSI_PER_FT).abs() < 1e-6);

  let elevations = wrapper.get_node_elevations().unwrap();
  assert_eq!(elevations["R1"], 100.0);
  let flows = wrapper.get_link_flows().unwrap();
  assert!((flows["P1"] - 100.0).abs() < 1e-3);
}

#[test]
fn test_time_series_length_matches_reporting_periods() {
  let wrapper = simulated("networks/tank.inp");
  let periods = wrapper.get_statistics().unwrap().report_periods;

  let mut surface = SvgSurface::default();
  let elements = [ElementRef::from("J1")];
  let series = wrapper.plot_time_series(&mut surface, SeriesKind::Pressure, Some(&elements[..]), TimeUnit::Hours).unwrap();
  assert_eq!(series.times.len(), periods);
  assert_eq!(series.times[1], 1.0);
  assert_eq!(series.series.len(), 1);
  assert_eq!(series.series[0].values.len(), periods);
  assert_eq!(series.units, "psi");
  assert_eq!(surface.title(), "Node Pressures Over Time");
  assert_eq!(surface.series_labels(), vec!["Node J1"]);

  // all links when no elements are given
  let flows = wrapper.plot_time_series(&mut surface, SeriesKind::Flow, None, TimeUnit::Seconds).unwrap();
  assert_eq!(flows.series.len(), 2);
  assert_eq!(flows.times[1], 3600.0);
  assert_eq!(surface.title(), "Link Flows Over Time");
}

#[test]
fn test_id_and_index_give_the_same_series() {
  let wrapper = simulated("networks/tank.inp");
  let by_id = wrapper.time_series(SeriesKind::Head, Some(&[ElementRef::from("T1")][..]), TimeUnit::Hours).unwrap();
  let by_index = wrapper.time_series(SeriesKind::Head, Some(&[ElementRef::from(3)][..]), TimeUnit::Hours).unwrap();
  assert_eq!(by_id, by_index);

  let link_by_id = wrapper.time_series(SeriesKind::Velocity, Some(&[ElementRef::from("P2")][..]), TimeUnit::Hours).unwrap();
  let link_by_index = wrapper.time_series(SeriesKind::Velocity, Some(&["#2".parse::<ElementRef>().unwrap()][..]), TimeUnit::Hours).unwrap();
  assert_eq!(link_by_id, link_by_index);
}

#[test]
fn test_unknown_elements() {
  let wrapper = simulated("networks/tank.inp");
  assert!(matches!(
    wrapper.time_series(SeriesKind::Pressure, Some(&[ElementRef::from("X")][..]), TimeUnit::Hours),
    Err(WrapperError::UnknownNode(_))
  ));
  assert!(matches!(
    wrapper.time_series(SeriesKind::Flow, Some(&[ElementRef::Index(0)][..]), TimeUnit::Hours),
    Err(WrapperError::UnknownLink(_))
  ));
  assert!(matches!(
    wrapper.time_series(SeriesKind::Pressure, Some(&[ElementRef::Index(4)][..]), TimeUnit::Hours),
    Err(WrapperError::UnknownNode(_))
  ));
}

#[test]
fn test_time_series_needs_simulation() {
  let wrapper = loaded("networks/tank.inp");
  let mut surface = SvgSurface::default();
  assert!(matches!(
    wrapper.plot_time_series(&mut surface, SeriesKind::Pressure, None, TimeUnit::Hours),
    Err(WrapperError::NoSimulation)
  ));
}

#[test]
fn test_topology_plot() {
  let wrapper = loaded("networks/tank.inp");
  let mut surface = SvgSurface::new(600, 400);
  let params = PlotParams::new().with("linksID", true).with("pressure_text", true).with("highlightnode", "T1");
  wrapper.plot_network_topology(&mut surface, &params).unwrap();
  assert_eq!(surface.title(), "EPANET Network");

  let svg = surface.to_svg();
  assert_eq!(svg.matches("<circle").count(), 4); // three nodes and the highlight
  assert!(svg.contains(">P2</text>"));
  assert!(svg.contains(">T1</text>"));
}

#[test]
fn test_attribute_plots() {
  let mut wrapper = loaded("networks/tank.inp");
  let mut surface = SvgSurface::default();

  wrapper.plot_network_attributes(&mut surface, "elevation", None, &PlotParams::new()).unwrap();
  assert_eq!(surface.title(), "EPANET Network - Elevations");
  assert!(surface.to_svg().contains("Elevation"));

  assert!(matches!(
    wrapper.plot_network_attributes(&mut surface, "pressure", None, &PlotParams::new()),
    Err(WrapperError::NoSimulation)
  ));
  assert!(matches!(
    wrapper.plot_network_attributes(&mut surface, "roughness", None, &PlotParams::new()),
    Err(WrapperError::UnknownAttribute(_))
  ));

  wrapper.run_simulation().unwrap();
  wrapper.plot_network_attributes(&mut surface, "pressure", Some(2), &PlotParams::new()).unwrap();
  assert_eq!(surface.title(), "EPANET Network (Pressures)");
  // a period past the end falls back to the first one
  wrapper.plot_network_attributes(&mut surface, "flow", Some(100), &PlotParams::new()).unwrap();
  assert_eq!(surface.title(), "EPANET Network (Flows)");
  let params = PlotParams::new().with("title", "Chlorine");
  wrapper.plot_network_attributes(&mut surface, "quality", None, &params).unwrap();
  assert_eq!(surface.title(), "Chlorine");
}

#[test]
fn test_plots_written_to_disk() {
  let wrapper = simulated("networks/pump.inp");
  let dir = tempfile::tempdir().unwrap();
  let mut surface = SvgSurface::new(400, 300);

  wrapper.plot_network_topology(&mut surface, &PlotParams::new()).unwrap();
  let svg_path = dir.path().join("topology.svg");
  surface.save(&svg_path).unwrap();
  assert!(fs::read_to_string(&svg_path).unwrap().starts_with("<svg"));

  wrapper.plot_time_series(&mut surface, SeriesKind::Velocity, None, TimeUnit::Hours).unwrap();
  let png_path = dir.path().join("velocity.png");
  surface.save(&png_path).unwrap();
  let png = fs::read(&png_path).unwrap();
  assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
}

#[test]
fn test_export_results() {
  let wrapper = simulated("networks/pump.inp");
  let dir = tempfile::tempdir().unwrap();

  let json_path = dir.path().join("results.json");
  wrapper.export_results(&json_path).unwrap();
  let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
  assert_eq!(json["nodes"].as_array().unwrap().len(), 4);
  assert_eq!(json["times"].as_array().unwrap().len(), 3);
  assert_eq!(json["flow_units"], "gpm");

  let mpk_path = dir.path().join("results.mpk");
  wrapper.export_results(&mpk_path).unwrap();
  assert!(fs::metadata(&mpk_path).unwrap().len() > 0);

  assert!(matches!(wrapper.export_results(dir.path().join("results.csv")), Err(WrapperError::Export(_))));
}
