use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rmp_serde::Serializer;
use serde::Serialize;

use crate::error::WrapperError;
use crate::model::network::Network;
use crate::solver::SolverResult;

#[derive(Serialize)]
struct ResultsOutput {
  flow_units: String,
  pressure_units: String,
  times: Vec<usize>,
  nodes: Vec<String>,
  links: Vec<String>,
  heads: Vec<Vec<f64>>,
  pressures: Vec<Vec<f64>>,
  demands: Vec<Vec<f64>>,
  quality: Vec<Vec<f64>>,
  flows: Vec<Vec<f64>>,
  velocities: Vec<Vec<f64>>,
  statuses: Vec<Vec<u8>>,
}

const DIGITS: usize = 3;

// helper function to round to a given number of digits (prevent JSON file bloat due to floating point precision)
fn round_to_digits(value: f64, digits: usize) -> f64 {
  let factor = 10.0_f64.powi(digits as i32);
  (value * factor).round() / factor
}

fn round_table(table: &[Vec<f64>]) -> Vec<Vec<f64>> {
  table.iter().map(|row| row.iter().map(|v| round_to_digits(*v, DIGITS)).collect()).collect()
}

impl Network {
  /// Write simulation results to a `.json` or `.mpk`/`.msgpack` file
  pub fn write_results(&self, results: &SolverResult, file: impl AsRef<Path>) -> Result<(), WrapperError> {
    let file = file.as_ref();
    let extension = file.extension()
      .and_then(|e| e.to_str())
      .map(|e| e.to_lowercase())
      .unwrap_or_default();
    if !matches!(extension.as_str(), "json" | "mpk" | "msgpack") {
      return Err(WrapperError::Export(format!("Unsupported file extension: {}", extension)));
    }

    let output = ResultsOutput {
      flow_units: self.options.flow_units.label().to_string(),
      pressure_units: self.options.pressure_units().label().to_string(),
      times: results.times.clone(),
      nodes: self.nodes.iter().map(|n| n.id.to_string()).collect(),
      links: self.links.iter().map(|l| l.id.to_string()).collect(),
      heads: round_table(&results.heads),
      pressures: round_table(&results.pressures),
      demands: round_table(&results.demands),
      quality: round_table(&results.quality),
      flows: round_table(&results.flows),
      velocities: round_table(&results.velocities),
      statuses: results.statuses.iter().map(|row| row.iter().map(|s| s.code()).collect()).collect(),
    };

    let mut writer = BufWriter::new(File::create(file)?);
    if extension == "json" {
      serde_json::to_writer(&mut writer, &output).map_err(|e| WrapperError::Export(e.to_string()))?;
    } else {
      let mut serializer = Serializer::new(&mut writer).with_struct_map();
      output.serialize(&mut serializer).map_err(|e| WrapperError::Export(e.to_string()))?;
    }
    writer.flush()?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_written_results_are_complete() {
    let network = Network::from_inp("networks/single_pipe.inp").unwrap();
    let results = crate::solver::HydraulicSolver::new(&network).unwrap().run().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let path = dir.path().join("results.msgpack");
    network.write_results(&results, &path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    let decoded: serde_json::Value = rmp_serde::from_slice(&bytes).unwrap();
    assert_eq!(decoded["links"][0], "P1");
    assert_eq!(decoded["flows"][0][0], 100.0);
  }

  #[test]
  fn test_round_to_digits() {
    assert_eq!(round_to_digits(1.23456, 3), 1.235);
    assert_eq!(round_to_digits(-0.0004, 3), -0.0);
  }
}
