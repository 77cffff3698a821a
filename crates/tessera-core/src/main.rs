use anyhow::{anyhow, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tessera_core::{CoreConfig, SpatialCore};
use tessera_filter::{FilterPredicateSet, GateRange, NameFilter};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize)]
struct InspectReport {
    name: String,
    fingerprint: String,
    layer_width: u32,
    layer_height: u32,
    layers: u32,
    tile_size: u32,
    tiles_per_level: BTreeMap<u32, usize>,
    points: usize,
    genes: usize,
    colormap_entries: usize,
}

#[derive(Debug, Serialize)]
struct FilterReport {
    cells: usize,
    visible: usize,
    outliers: usize,
}

fn cli() -> Command {
    Command::new("tessera")
        .version(tessera_core::VERSION)
        .about("Inspect and filter tile-indexed spatial-omics datasets")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML file with core settings"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("inspect")
                .about("Extract an archive, decode every tile and print statistics")
                .arg(
                    Arg::new("archive")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help(".tar or .zip transcript archive"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("filter")
                .about("Decode a cell-mask file and print partition counts")
                .arg(
                    Arg::new("cells")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Flat cell-mask payload"),
                )
                .arg(
                    Arg::new("clusters")
                        .long("clusters")
                        .value_delimiter(',')
                        .num_args(1..)
                        .help("Keep only these cluster ids"),
                )
                .arg(
                    Arg::new("umap")
                        .long("umap")
                        .value_parser(parse_gate)
                        .help("UMAP gate as xStart,xEnd,yStart,yEnd"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("colormap")
                .about("Re-export a colormap file")
                .arg(
                    Arg::new("input")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("output")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
}

fn parse_gate(text: &str) -> Result<GateRange, String> {
    let values = text
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|err| format!("'{v}': {err}")))
        .collect::<Result<Vec<_>, _>>()?;
    match values.as_slice() {
        [x_start, x_end, y_start, y_end] => Ok(GateRange::new(*x_start, *x_end, *y_start, *y_end)),
        _ => Err(format!("expected 4 values, got {}", values.len())),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn path_arg<'a>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a PathBuf> {
    args.get_one::<PathBuf>(name)
        .ok_or_else(|| anyhow!("missing <{name}>"))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn inspect(core: &SpatialCore, args: &ArgMatches) -> anyhow::Result<()> {
    let path = path_arg(args, "archive")?;
    let dataset = core.ingest_archive(path).await?;

    let mut tiles_per_level = BTreeMap::new();
    let mut points = 0;
    for key in dataset.tile_keys() {
        let tile = core.tile(key).await?;
        *tiles_per_level.entry(key.z).or_insert(0) += 1;
        points += tile.point_count();
    }

    let layer = dataset.layer();
    let report = InspectReport {
        name: dataset.name().to_string(),
        fingerprint: dataset.fingerprint().to_string(),
        layer_width: layer.layer_width,
        layer_height: layer.layer_height,
        layers: layer.layers,
        tile_size: layer.tile_size,
        tiles_per_level,
        points,
        genes: dataset.genes().len(),
        colormap_entries: dataset.colormap().map_or(0, <[_]>::len),
    };

    if args.get_flag("json") {
        return print_json(&report);
    }

    println!("Dataset: {}", report.name);
    println!("  Fingerprint: {}", report.fingerprint);
    println!(
        "  Layer: {}x{}, {} levels, tile size {}",
        report.layer_width, report.layer_height, report.layers, report.tile_size
    );
    for (z, count) in &report.tiles_per_level {
        println!("  Level {z}: {count} tiles");
    }
    println!("  Points: {}", report.points);
    println!("  Genes: {}", report.genes);
    println!("  Colormap entries: {}", report.colormap_entries);
    Ok(())
}

async fn filter(core: &SpatialCore, args: &ArgMatches) -> anyhow::Result<()> {
    let path = path_arg(args, "cells")?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let dataset = core.ingest_cell_masks(bytes).await?;
    let cells = dataset.cells().map_or(0, |c| c.cells.len());

    let mut predicates = FilterPredicateSet::new();
    if let Some(ids) = args.get_many::<String>("clusters") {
        predicates = predicates.with_name_filter(NameFilter::clusters(ids));
    }
    if let Some(gate) = args.get_one::<GateRange>("umap") {
        predicates = predicates.with_umap_gate(*gate);
    }

    let outcome = core.filter_cells(predicates).await?;
    let report = FilterReport {
        cells,
        visible: outcome.visible_count(),
        outliers: outcome.outliers.len(),
    };

    if args.get_flag("json") {
        return print_json(&report);
    }
    println!("Cells: {}", report.cells);
    println!("  Visible: {}", report.visible);
    println!("  Outliers: {}", report.outliers);
    Ok(())
}

async fn colormap(core: &SpatialCore, args: &ArgMatches) -> anyhow::Result<()> {
    let input = path_arg(args, "input")?;
    let output = path_arg(args, "output")?;
    let entries = core.import_colormap(input).await?;
    core.export_colormap(output).await?;
    println!("Exported {} entries to {}", entries.len(), output.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    let core = SpatialCore::new(config)?;

    let result = match matches.subcommand() {
        Some(("inspect", args)) => inspect(&core, args).await,
        Some(("filter", args)) => filter(&core, args).await,
        Some(("colormap", args)) => colormap(&core, args).await,
        _ => Err(anyhow!("unknown command")),
    };

    core.shutdown();
    result
}
