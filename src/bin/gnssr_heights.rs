use clap::Parser;
use gnssr::config::Config;
use gnssr::error::GnssrError;
use gnssr::process_log_file;
use gnssr::report::{by_sector, daily_means, to_csv};
use gnssr::retrieval::structs::HeightRetrieval;
use log::LevelFilter;
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

pub type BinResult<T, E = Box<dyn std::error::Error + Send + Sync>> = Result<T, E>;

fn main() {
    if let Err(e) = bin_main() {
        eprintln!("error: {e}");
        if let Some(e) = e.source() {
            eprintln!("error: {e}");
        }
        std::process::exit(1);
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Receiver logs (NMEA) to process
    #[arg(required_unless_present = "print_config")]
    infiles: Vec<PathBuf>,

    /// INI file overriding the preset
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Embedded configuration preset to start from
    #[arg(long, default_value = "default")]
    preset: String,

    /// Print the embedded preset and exit
    #[arg(long, action = clap::ArgAction::SetTrue)]
    print_config: bool,

    /// Re-interpolate elevation through glitch anchors
    #[arg(long, visible_alias = "interp", action = clap::ArgAction::SetTrue)]
    interpolate: bool,

    /// Detrending polynomial order
    #[arg(long)]
    pvf: Option<usize>,

    /// Minimum reflector height, meters
    #[arg(long)]
    min_rh: Option<f64>,

    /// Minimum periodogram peak amplitude
    #[arg(long)]
    min_amp: Option<f64>,

    /// An arc needs more points than this
    #[arg(long)]
    min_points: Option<usize>,

    /// Maximum azimuth spread of an arc, degrees
    #[arg(long)]
    max_az_diff: Option<f64>,

    /// Highest reflector height searched, meters
    #[arg(long)]
    max_height: Option<f64>,

    /// Reflector height resolution, meters
    #[arg(long)]
    desired_precision: Option<f64>,

    /// Minimum peak-to-noise ratio
    #[arg(long)]
    pcrit: Option<f64>,

    /// Lowest elevation used, degrees
    #[arg(long)]
    emin: Option<f64>,

    /// Highest elevation used, degrees
    #[arg(long)]
    emax: Option<f64>,

    /// Minimum elevation span of an arc, degrees
    #[arg(long)]
    ediff: Option<f64>,

    /// Carrier wavelength, meters
    #[arg(long)]
    cf: Option<f64>,

    /// SNR lock threshold, dB-Hz
    #[arg(long)]
    snr_thresh: Option<f64>,

    /// Receiver output interval, seconds
    #[arg(long)]
    sampling_interval: Option<f64>,

    /// Lock filter window, seconds
    #[arg(long)]
    av_time: Option<f64>,

    /// Azimuth bins, e.g. "0-90, 180-270"
    #[arg(long)]
    azimuth_bins: Option<String>,

    /// Write the retrievals to this CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn apply(&self, config: &mut Config) -> Result<(), GnssrError> {
        macro_rules! set {
            ($($field:ident),*) => {
                $(if let Some(v) = self.$field { config.$field = v; })*
            };
        }
        set!(
            pvf, min_rh, min_amp, min_points, max_az_diff, max_height, desired_precision, pcrit,
            emin, emax, ediff, cf, snr_thresh, sampling_interval, av_time
        );
        if let Some(bins) = &self.azimuth_bins {
            config.set("azimuth_bins", bins)?;
        }
        if self.interpolate {
            config.interpolate = true;
        }
        Ok(())
    }
}

fn print_summary(retrievals: &[HeightRetrieval]) {
    println!("{} reflector heights", retrievals.len());
    for (sector, rs) in by_sector(retrievals, None) {
        let mean = rs.iter().map(|r| r.reflector_height).sum::<f64>() / rs.len() as f64;
        println!("  azimuth {sector:>7}: {:4} retrievals, mean {mean:.3} m", rs.len());
    }
    for day in daily_means(retrievals) {
        println!(
            "  {}: {:4} retrievals, mean {:.3} m",
            day.day, day.count, day.mean_height
        );
    }
}

fn bin_main() -> BinResult<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if args.print_config {
        print!("{}", Config::preset_text(&args.preset)?);
        return Ok(());
    }

    let mut config = Config::from_preset(&args.preset)?;
    if let Some(path) = &args.config {
        config = config.with_ini(&fs::read_to_string(path)?)?;
    }
    args.apply(&mut config)?;
    config.validate()?;

    // Process the logs!
    let results: Vec<Result<Vec<HeightRetrieval>, GnssrError>> = args
        .infiles
        .par_iter()
        .map(|path| process_log_file(path, &config))
        .collect();

    let mut retrievals = vec![];
    for (path, res) in args.infiles.iter().zip(results) {
        match res {
            Ok(x) => retrievals.extend(x),
            Err(e) => Err(format!("{}: {e}", path.display()))?,
        }
    }

    print_summary(&retrievals);
    if let Some(path) = &args.output {
        to_csv(BufWriter::new(File::create(path)?), &retrievals)?;
        log::info!("wrote {} rows to {}", retrievals.len(), path.display());
    }
    Ok(())
}
