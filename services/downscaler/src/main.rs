//! Climate downscaling command-line tool.
//!
//! Cuts a coarse daily dataset to an area and year range, regrids it onto
//! a fine topography with elevation correction, and writes a CF NetCDF file.

mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use downscaling::{run, DataType, DownscaleError, DownscaleRequest, FillScope, RegridMethod};
use settings::{load_config, region_names, resolve_bbox, Overrides};

#[derive(Parser, Debug)]
#[command(name = "downscaler")]
#[command(about = "Elevation-aware downscaling of coarse climate data")]
struct Args {
    /// Variable to downscale (pr, tasmax, tasmin, rsds, sfcWind, hurs; observations also rr, tmax, tmin)
    #[arg(short, long, required_unless_present = "list_regions")]
    variable: Option<String>,

    /// Source data type: model or obs
    #[arg(short = 't', long, default_value = "obs", env = "DOWNSCALE_DATA_TYPE")]
    data_type: DataType,

    /// Coarse source dataset
    #[arg(short, long, env = "DOWNSCALE_SOURCE", required_unless_present = "list_regions")]
    source: Option<PathBuf>,

    /// Fine-resolution topography
    #[arg(long, env = "DOWNSCALE_FINE_TOPO", required_unless_present = "list_regions")]
    fine_topo: Option<PathBuf>,

    /// Coarse-resolution topography matching the source grid
    #[arg(long, env = "DOWNSCALE_COARSE_TOPO", required_unless_present = "list_regions")]
    coarse_topo: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = ".", env = "DOWNSCALE_OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Area as lat_min,lat_max,lon_min,lon_max
    #[arg(long, allow_hyphen_values = true)]
    bbox: Option<String>,

    /// Named area (see --list-regions)
    #[arg(long)]
    region: Option<String>,

    /// First year to keep (0 keeps all time steps)
    #[arg(long, default_value_t = 0)]
    start_year: i32,

    /// Last year to keep (0 keeps all time steps)
    #[arg(long, default_value_t = 0)]
    end_year: i32,

    /// Regrid method: patch or bilinear
    #[arg(short, long)]
    method: Option<RegridMethod>,

    /// Coastal fill search: whole_array or per_time_slice
    #[arg(long)]
    fill_scope: Option<FillScope>,

    /// Directory for cached regrid weights
    #[arg(long)]
    weight_cache_dir: Option<PathBuf>,

    /// YAML settings file (defaults to DOWNSCALE_* environment variables)
    #[arg(short, long, env = "DOWNSCALE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print the named regions and exit
    #[arg(long)]
    list_regions: bool,
}

fn main() -> ExitCode {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    if let Err(e) = init_tracing(&args.log_level, args.json_logs) {
        eprintln!("Failed to initialise logging: {}", e);
    }

    if args.list_regions {
        for name in region_names() {
            println!("{}", name);
        }
        return ExitCode::SUCCESS;
    }

    match execute(args) {
        Ok(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            match e.downcast_ref::<DownscaleError>() {
                Some(err) => eprintln!("{}", err.user_message()),
                None => eprintln!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn execute(args: Args) -> Result<PathBuf> {
    netcdf_io::silence_hdf5_errors();

    let config = Overrides {
        fill_scope: args.fill_scope,
        weight_cache_dir: args.weight_cache_dir,
    }
    .apply(load_config(args.config.as_deref())?)?;

    let bbox = resolve_bbox(args.bbox.as_deref(), args.region.as_deref())?;

    let request = DownscaleRequest {
        variable: args.variable.context("--variable is required")?,
        data_type: args.data_type,
        source_data_path: args.source.context("--source is required")?,
        fine_topo_path: args.fine_topo.context("--fine-topo is required")?,
        coarse_topo_path: args.coarse_topo.context("--coarse-topo is required")?,
        output_dir: args.output_dir,
        bbox,
        start_year: args.start_year,
        end_year: args.end_year,
        regrid_method: args.method,
    };

    info!(
        variable = %request.variable,
        data_type = %request.data_type,
        fill_scope = %config.fill_scope,
        "Starting climate downscaler"
    );

    std::fs::create_dir_all(&request.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            request.output_dir.display()
        )
    })?;

    let output = run(&request, &config)?;
    info!(
        path = %output.path.display(),
        coarse_shape = ?output.coarse_subset.shape(),
        "Done"
    );
    Ok(output.path)
}
