use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use log::info;

use track2route::ConvertOptions;

/// Convert GPX tracks to routeable GPX routes.
#[derive(Parser, Debug)]
#[command(name = "track2route", version)]
struct Args {
    /// Input GPX file
    infile: PathBuf,
    /// Number of points per route in the output
    #[arg(short = 'n', long, default_value_t = 50)]
    routepoints: usize,
    /// Name of the output file
    #[arg(short, long, default_value = "output.gpx")]
    outfile: PathBuf,
    /// Simplify each track beforehand with a Ramer-Douglas-Peucker pass
    #[arg(long)]
    simplify: bool,
    /// Maximum distance in metres for the simplification pass. Only used
    /// together with --simplify
    #[arg(long, default_value_t = 10.0)]
    max_distance: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();
    let args = Args::parse();

    let options = ConvertOptions {
        route_points: args.routepoints,
        max_distance: args.simplify.then_some(args.max_distance),
    };

    let reader = BufReader::new(File::open(&args.infile)?);
    let mut writer = BufWriter::new(File::create(&args.outfile)?);
    track2route::convert(reader, &mut writer, &options)?;
    writer.flush()?;
    info!("wrote {}", args.outfile.display());
    Ok(())
}
