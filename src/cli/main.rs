use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use geostamp::config::SaveOptions;
use geostamp::jpeg::extract_metadata;
use geostamp::library::FolderLibrary;
use geostamp::metadata::{HeadingReading, LocationFix, MetaValue, NS_GPS};
use geostamp::pipeline::{produce_final_image_bytes, save_image, CapturedImage, SaveRequest};

#[derive(Parser, Debug)]
#[command(
    name = "geostamp",
    version,
    about = "Stamp a captured JPEG with EXIF/GPS metadata and save it"
)]
struct Cli {
    /// Input JPEG file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output file (default: <input>-geotagged.jpg; ignored with --library)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Save into a folder-backed photo library instead of a single file
    #[arg(long, value_name = "DIR")]
    library: Option<PathBuf>,

    /// Latitude in signed decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude in signed decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Altitude in meters (negative below sea level)
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    alt: f64,

    /// True-north heading in degrees
    #[arg(long, allow_hyphen_values = true)]
    heading: Option<f64>,

    /// Fix timestamp, RFC 3339 (default: now)
    #[arg(long, value_name = "TIME")]
    time: Option<String>,

    /// Path to config file (default: geostamp.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default geostamp.json and exit
    #[arg(long)]
    init: bool,

    /// Display the GPS metadata of the input and exit
    #[arg(long = "show-gps")]
    show_gps: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let options = SaveOptions::default();
        let path = cli.config.as_deref();
        options.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => SaveOptions::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    let raw = std::fs::read(&cli.input)?;

    // Handle --show-gps
    if cli.show_gps {
        let dict = extract_metadata(&raw)?;
        match dict.get(NS_GPS).and_then(MetaValue::as_dict) {
            Some(gps) => {
                println!("GPS metadata in {}:", cli.input.display());
                for (name, value) in gps {
                    match value {
                        MetaValue::Text(s) => println!("  {name:<16} : {s}"),
                        MetaValue::Int(i) => println!("  {name:<16} : {i}"),
                        MetaValue::Float(f) => println!("  {name:<16} : {f:.6}"),
                        MetaValue::Dict(_) => {}
                    }
                }
            }
            None => println!("No GPS metadata in {}", cli.input.display()),
        }
        return Ok(());
    }

    // Latitude and longitude only make sense together
    let location = match (cli.lat, cli.lon) {
        (Some(latitude), Some(longitude)) => {
            let timestamp = match &cli.time {
                Some(t) => chrono::DateTime::parse_from_rfc3339(t)?.with_timezone(&chrono::Utc),
                None => chrono::Utc::now(),
            };
            Some(LocationFix {
                latitude,
                longitude,
                altitude: cli.alt,
                timestamp,
            })
        }
        (None, None) => None,
        _ => anyhow::bail!("--lat and --lon must be provided together"),
    };

    if location.is_none() && cli.heading.is_some() {
        log::warn!("heading without a location fix is not embedded");
    }

    let options = SaveOptions::load(cli.config.as_deref())?;

    let request = SaveRequest {
        image: CapturedImage::from_jpeg_bytes(&raw)?,
        image_data: raw,
        location,
        heading: cli.heading.map(|degrees| HeadingReading { degrees }),
    };

    if let Some(dir) = &cli.library {
        let library = FolderLibrary::new(dir);
        let asset = save_image(request, &options, &library).await?;
        log::info!("Saved to library as {}", asset.local_identifier);
        return Ok(());
    }

    let output = cli.output.unwrap_or_else(|| {
        let stem = cli.input.file_stem().unwrap_or_default().to_string_lossy();
        cli.input.with_file_name(format!("{stem}-geotagged.jpg"))
    });

    let bytes = produce_final_image_bytes(&request, &options)?;
    std::fs::write(&output, &bytes)?;
    log::info!("Wrote {} ({} bytes)", output.display(), bytes.len());

    Ok(())
}
