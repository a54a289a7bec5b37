// SPDX-License-Identifier: Apache-2.0

//! Maps a combinational AIGER file onto K-input LUTs and reports the result.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

use xlsynth_lutmap::aiger::{AigerOptions, load_aiger_file};
use xlsynth_lutmap::library::LutLibrary;
use xlsynth_lutmap::mapped::{MappedNetwork, MappedStats};
use xlsynth_lutmap::mapper::{MapStats, Mapper};
use xlsynth_lutmap::params::{FunctionMode, MapParams};

#[derive(Debug, Parser)]
#[command(name = "lutmap")]
#[command(about = "Delay-oriented K-LUT mapping with area recovery")]
struct Args {
    /// The path to the AIGER file (`.aag` or `.aig`).
    input: PathBuf,

    /// LUT library file; defaults to unit area and delay for every size.
    #[arg(long)]
    lut_lib: Option<PathBuf>,

    /// LUT size K.
    #[arg(short = 'k', long, default_value_t = 6)]
    lut_size: usize,

    /// Cuts kept per node, the trivial cut included.
    #[arg(long, default_value_t = 8)]
    cuts: usize,

    /// How cut functions are tracked.
    #[arg(long, value_enum, default_value_t = FunctionMode::Structural)]
    functions: FunctionMode,

    /// Drop cut leaves the function does not depend on.
    #[arg(long, default_value_t = false)]
    cut_min: bool,

    /// Stop after the delay-oriented rounds.
    #[arg(long, default_value_t = false)]
    delay_only: bool,

    /// Lower bound on the global required time, in library delay units.
    #[arg(long)]
    delay_target: Option<f64>,

    /// Stop enumerating a node once no candidate can beat the worst kept cut.
    #[arg(long, default_value_t = false)]
    early_stop: bool,

    /// Rebuild AND-inverter MUX and XOR patterns as single nodes.
    #[arg(long, default_value_t = false)]
    recognize_xor_mux: bool,

    /// Print the statistics as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    input: String,
    mapping: MapStats,
    network: MappedStats,
}

fn main() -> anyhow::Result<()> {
    let _ = env_logger::builder().try_init();
    let args = Args::parse();

    let library = match &args.lut_lib {
        Some(path) => LutLibrary::from_file(path)
            .with_context(|| format!("loading LUT library {}", path.display()))?,
        None => LutLibrary::unit(args.lut_size),
    };
    let loaded = load_aiger_file(
        &args.input,
        AigerOptions {
            recognize_xor_mux: args.recognize_xor_mux,
        },
    )
    .map_err(anyhow::Error::msg)
    .with_context(|| format!("loading {}", args.input.display()))?;
    log::info!(
        "{}: {} nodes, {} MUX and {} XOR recognized",
        args.input.display(),
        loaded.graph.len(),
        loaded.recognized_muxes,
        loaded.recognized_xors
    );

    let params = MapParams {
        lut_size: args.lut_size,
        num_cuts: args.cuts,
        functions: args.functions,
        cut_min: args.cut_min,
        delay_only: args.delay_only,
        delay_target: args.delay_target,
        early_stop: args.early_stop,
        keep_cuts: false,
    };
    let mut mapper = Mapper::new(loaded.graph, &library, params)?;
    let mapping = mapper.perform();
    let network = MappedNetwork::from_mapper(&mapper)
        .map_err(anyhow::Error::msg)
        .context("reading back the LUT network")?
        .stats();

    if args.json {
        let report = Report {
            input: args.input.display().to_string(),
            mapping,
            network,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for round in &mapping.rounds {
        println!(
            "{:<8} delay {:>8.2}  area {:>10.2}  luts {:>7}  edges {:>8}",
            round.name, round.delay, round.area, round.luts, round.edges
        );
    }
    println!(
        "K={} luts={} edges={} area={:.2} delay={:.2} depth={:.2}",
        mapping.lut_size, network.luts, network.edges, network.area, mapping.delay, network.depth
    );
    if mapping.required_violations > 0 {
        println!("required-time violations: {}", mapping.required_violations);
    }
    Ok(())
}
