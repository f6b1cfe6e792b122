use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};

use simplelog::{info, debug, LevelFilter, TerminalMode, ColorChoice, Config, TermLogger};

use epanet_view::plot::{PlotParams, SeriesKind, SvgSurface, TimeUnit};
use epanet_view::wrapper::{ElementRef, EpanetWrapper};
use epanet_view::WrapperError;

const BANNER: [&str; 6] = [
  r"  _____ ____   _    _   _ _____ _____  __     _____ _______        __",
  r" | ____|  _ \ / \  | \ | | ____|_   _| \ \   / /_ _| ____\ \      / /",
  r" |  _| | |_) / _ \ |  \| |  _|   | |____\ \ / / | ||  _|  \ \ /\ / / ",
  r" | |___|  __/ ___ \| |\  | |___  | |_____\ V /  | || |___  \ V  V /  ",
  r" |_____|_| /_/   \_\_| \_|_____| |_|      \_/  |___|_____|  \_/\_/   ",
  r"                                                                     "
];

#[derive(Parser, Debug)]
#[command(
  version = "0.1.0",
  about = "Load, simulate, inspect and plot EPANET water distribution networks"
)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
  /// Print verbose output
  #[arg(short, long, global = true)]
  verbose: bool,
  /// Suppress all output except for errors
  #[arg(long, global = true)]
  quiet: bool,
}

#[derive(Args, Debug)]
struct ImageArgs {
  /// Image width in pixels
  #[arg(long, default_value = "1000")]
  width: u32,
  /// Image height in pixels
  #[arg(long, default_value = "800")]
  height: u32,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Print network statistics
  Stats {
    /// Input file (EPANET .inp format)
    input_file: PathBuf,
    /// Print the statistics as JSON
    #[arg(long)]
    json: bool,
  },
  /// Run the simulation and optionally write the results
  Run {
    /// Input file (EPANET .inp format)
    input_file: PathBuf,
    /// Output file for results (.json or .msgpack/.mpk)
    output_file: Option<PathBuf>,
    /// Print time averaged pressures and flows to stdout
    #[arg(long)]
    print_results: bool,
  },
  /// Plot the network topology to an .svg or .png file
  Topology {
    input_file: PathBuf,
    image_file: PathBuf,
    /// Plot parameter as key=value, e.g. nodesID=false or highlightnode=2,3
    #[arg(short, long = "param")]
    params: Vec<String>,
    #[command(flatten)]
    image: ImageArgs,
  },
  /// Plot the network coloured by elevation, pressure, flow or quality
  Attribute {
    input_file: PathBuf,
    attribute: String,
    image_file: PathBuf,
    /// Reporting period to show, values are averaged over time when omitted
    #[arg(long)]
    period: Option<usize>,
    #[arg(short, long = "param")]
    params: Vec<String>,
    #[command(flatten)]
    image: ImageArgs,
  },
  /// Plot time series of node or link results
  Series {
    input_file: PathBuf,
    /// pressure, head, demand, quality, flow or velocity
    kind: String,
    image_file: PathBuf,
    /// Node or link id, or #N for the N-th element. All elements when omitted
    #[arg(short, long = "element")]
    elements: Vec<String>,
    /// Time axis unit (hours or seconds)
    #[arg(long, default_value = "hours")]
    time_unit: String,
    #[command(flatten)]
    image: ImageArgs,
  },
  /// Print an attribute of a single node
  Node {
    input_file: PathBuf,
    /// Node id, or #N for the N-th node
    node: String,
    attribute: String,
  },
}

fn main() -> Result<(), String> {
  let cli = Cli::parse();

  let log_level = if cli.quiet { LevelFilter::Error }
    else if cli.verbose { LevelFilter::Debug }
    else { LevelFilter::Info };

  // Initialize the logger with colors
  TermLogger::init(
    log_level,
    Config::default(),
    TerminalMode::Mixed,
    ColorChoice::Auto,
  ).map_err(|e| format!("Failed to initialize logger: {}", e))?;

  let quiet = cli.quiet;
  run_command(cli.command, quiet).map_err(|e| e.to_string())
}

fn run_command(command: Commands, quiet: bool) -> Result<(), WrapperError> {
  match command {
    Commands::Stats { input_file, json } => print_statistics(&input_file, json),
    Commands::Run { input_file, output_file, print_results } => {
      if !quiet {
        println!("{}", BANNER.join("\n"));
      }
      run_simulation(&input_file, output_file.as_deref(), print_results)
    }
    Commands::Topology { input_file, image_file, params, image } => {
      let wrapper = EpanetWrapper::with_file(&input_file)?;
      let mut surface = SvgSurface::new(image.width, image.height);
      wrapper.plot_network_topology(&mut surface, &parse_params(&params)?)?;
      save_plot(&surface, &image_file)
    }
    Commands::Attribute { input_file, attribute, image_file, period, params, image } => {
      let mut wrapper = EpanetWrapper::with_file(&input_file)?;
      if attribute.to_lowercase() != "elevation" {
        wrapper.run_simulation()?;
      }
      let mut surface = SvgSurface::new(image.width, image.height);
      wrapper.plot_network_attributes(&mut surface, &attribute, period, &parse_params(&params)?)?;
      save_plot(&surface, &image_file)
    }
    Commands::Series { input_file, kind, image_file, elements, time_unit, image } => {
      let kind: SeriesKind = kind.parse().map_err(WrapperError::Plot)?;
      let time_unit: TimeUnit = time_unit.parse().map_err(WrapperError::Plot)?;
      let elements = elements.iter()
        .map(|e| e.parse::<ElementRef>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(WrapperError::Plot)?;

      let mut wrapper = EpanetWrapper::with_file(&input_file)?;
      wrapper.run_simulation()?;
      let mut surface = SvgSurface::new(image.width, image.height);
      let selection = if elements.is_empty() { None } else { Some(elements.as_slice()) };
      let series = wrapper.plot_time_series(&mut surface, kind, selection, time_unit)?;
      debug!("Plotted {} series of {} periods", series.series.len(), series.times.len());
      save_plot(&surface, &image_file)
    }
    Commands::Node { input_file, node, attribute } => {
      let node: ElementRef = node.parse().map_err(WrapperError::UnknownNode)?;
      let mut wrapper = EpanetWrapper::with_file(&input_file)?;
      if attribute.parse::<epanet_view::wrapper::NodeAttribute>()?.requires_simulation() {
        wrapper.run_simulation()?;
      }
      let value = wrapper.get_node_attribute(node.clone(), &attribute)?;
      println!("{} {}: {}", node, attribute, value);
      Ok(())
    }
  }
}

fn parse_params(params: &[String]) -> Result<PlotParams, WrapperError> {
  PlotParams::from_pairs(params).map_err(WrapperError::Plot)
}

fn save_plot(surface: &SvgSurface, image_file: &std::path::Path) -> Result<(), WrapperError> {
  surface.save(image_file)?;
  info!("Plot written to {}", image_file.display());
  Ok(())
}

/// Print the statistics of a network
fn print_statistics(input_file: &std::path::Path, json: bool) -> Result<(), WrapperError> {
  let wrapper = EpanetWrapper::with_file(input_file)?;
  let stats = wrapper.get_statistics()?;

  if json {
    let text = serde_json::to_string_pretty(&stats).map_err(|e| WrapperError::Export(e.to_string()))?;
    println!("{}", text);
    return Ok(());
  }

  println!("File:        {}", wrapper.get_file_name().unwrap_or_default());
  if let Some(title) = &stats.title {
    println!("Title:       {}", title);
  }
  println!("Nodes:       {} ({} junctions, {} reservoirs, {} tanks)", stats.node_count, stats.junction_count, stats.reservoir_count, stats.tank_count);
  println!("Links:       {} ({} pipes, {} pumps, {} valves)", stats.link_count, stats.pipe_count, stats.pump_count, stats.valve_count);
  println!("Pipe length: {:.2}", stats.total_pipe_length);
  println!("Flow units:  {}", stats.flow_units);
  println!("Duration:    {} s, {} reporting periods", stats.duration, stats.report_periods);
  Ok(())
}

/// Run the simulation of a network
fn run_simulation(input_file: &std::path::Path, output_file: Option<&std::path::Path>, print_results: bool) -> Result<(), WrapperError> {
  info!("Loading network from file: {}", input_file.display());
  let mut wrapper = EpanetWrapper::with_file(input_file)?;
  wrapper.run_simulation()?;

  if let Some(output_file) = output_file {
    let start_time = Instant::now();
    wrapper.export_results(output_file)?;
    info!("Results written to {} in {:?}", output_file.display(), start_time.elapsed());
  }

  if print_results {
    println!("Results (time averaged):");
    println!("=== Pressures:");
    for (id, pressure) in wrapper.get_node_attributes("pressure")? {
      println!("Node {}: {:.2}", id, pressure);
    }
    println!("=== Flows:");
    let network = wrapper.network()?;
    let flows = wrapper.get_link_flows()?;
    for link in network.links.iter() {
      println!("Link {}: {:.2}", link.id, flows.get(&*link.id).copied().unwrap_or(0.0));
    }
  }
  Ok(())
}
