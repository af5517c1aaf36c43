use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use console_link::{Axis, Direction, MotorCommand, SensorReading, Speed};
use protractor::{DetectionReport, Detector, load_frame};
use protractor_cli::{OutputConfig, ProtractorConfig, is_image_file};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Drill-tip angle measurement", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure the angle in a single image
    Detect {
        /// Path to the input image
        #[arg(short, long)]
        input: PathBuf,
        /// Where to save the annotated frame
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Where to save a JSON report of the detection
        #[arg(short, long)]
        report: Option<PathBuf>,
        /// Configuration file (.toml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Measure every image in a directory
    Batch {
        /// Directory with input images
        #[arg(short, long)]
        input_dir: PathBuf,
        /// Directory for annotated frames and reports
        #[arg(short, long)]
        output_dir: PathBuf,
        /// Configuration file (.toml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Write the default configuration
    InitConfig {
        /// Output path, format chosen by extension
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the configuration JSON schema
    Schema,
    /// Print the motor controller line for one jog
    Motor {
        /// Axis to move (X, Y for rotation, Z)
        #[arg(short, long)]
        axis: Axis,
        /// negative or positive
        #[arg(short, long)]
        direction: Direction,
        /// Jog speed, 1 to 100
        #[arg(short, long, default_value_t = 50)]
        speed: u32,
    },
    /// Parse and format a sensor line
    Sensor {
        /// Raw line as received, e.g. "12.5 90 3"
        line: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Detect {
            input,
            output,
            report,
            config,
        } => {
            detect_frame(input, output.as_deref(), report.as_deref(), config.as_deref())?;
        }
        Commands::Batch {
            input_dir,
            output_dir,
            config,
        } => {
            run_batch(input_dir, output_dir, config.as_deref()).await?;
        }
        Commands::InitConfig { output } => {
            ProtractorConfig::default().to_file(output)?;
            info!("Default configuration written to {:?}", output);
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&ProtractorConfig::schema())?);
        }
        Commands::Motor {
            axis,
            direction,
            speed,
        } => {
            let command = MotorCommand::jog(*axis, *direction, Speed::new(*speed)?);
            println!("{command}");
        }
        Commands::Sensor { line } => {
            println!("{}", SensorReading::parse_or_zero(line));
        }
    }

    Ok(())
}

fn load_detector(config_path: Option<&Path>) -> Result<(Detector, OutputConfig)> {
    let config = ProtractorConfig::load_or_default(config_path)?;
    let detector = Detector::new(config.detector)?;
    info!("{}", detector.info());
    Ok((detector, config.output))
}

fn detect_frame(
    input: &Path,
    output: Option<&Path>,
    report_path: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<()> {
    let (detector, _) = load_detector(config_path)?;

    let frame = load_frame(input)?;
    let detection = detector.detect(&frame.as_frame());

    match detection.angle() {
        Some(angle) => println!("Angle: {angle:.1}"),
        None => println!("No angle found"),
    }

    if let Some(output) = output {
        detection.frame.save(output)?;
        info!("Annotated frame saved to {:?}", output);
    }

    if let Some(report_path) = report_path {
        let report = DetectionReport::new(Some(input.display().to_string()), &detection);
        report.save_json(report_path)?;
        info!("Report saved to {:?}", report_path);
    }

    Ok(())
}

async fn run_batch(input_dir: &Path, output_dir: &Path, config_path: Option<&Path>) -> Result<()> {
    let (detector, output) = load_detector(config_path)?;
    let detector = Arc::new(detector);
    let output = Arc::new(output);

    fs::create_dir_all(output_dir)?;

    let mut inputs: Vec<PathBuf> = fs::read_dir(input_dir)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file() && is_image_file(path))
        .collect();
    inputs.sort();

    info!("Processing {} frames from {:?}", inputs.len(), input_dir);

    let handles: Vec<_> = inputs
        .into_iter()
        .map(|input| {
            let detector = Arc::clone(&detector);
            let output = Arc::clone(&output);
            let output_dir = output_dir.to_path_buf();
            tokio::task::spawn_blocking(move || {
                let result = process_frame(&detector, &input, &output_dir, &output);
                (input, result)
            })
        })
        .collect();

    let mut reports = Vec::new();
    let mut failures = 0usize;
    for handle in handles {
        let (input, result) = handle.await?;
        match result {
            Ok(report) => reports.push(report),
            Err(err) => {
                failures += 1;
                error!("Skipping {:?}: {}", input, err);
            }
        }
    }

    let found = reports.iter().filter(|report| report.found).count();
    let summary_path = output_dir.join("batch_report.json");
    fs::write(&summary_path, serde_json::to_string_pretty(&reports)?)?;

    info!(
        processed = reports.len(),
        found,
        failures,
        "Batch finished, summary saved to {:?}",
        summary_path
    );
    Ok(())
}

fn process_frame(
    detector: &Detector,
    input: &Path,
    output_dir: &Path,
    output: &OutputConfig,
) -> protractor::Result<DetectionReport> {
    let frame = load_frame(input)?;
    let detection = detector.detect(&frame.as_frame());

    detection.frame.save(output.annotated_path(input, output_dir))?;

    let report = DetectionReport::new(Some(input.display().to_string()), &detection);
    if output.write_reports {
        report.save_json(output.report_path(input, output_dir))?;
    }
    Ok(report)
}
