use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{LevelFilter, error};

use medvol_screenshot::{Colormap, ScreenshotConfig, ScreenshotMaker, SortBy};

#[derive(Parser)]
#[command(name = "medvol-screenshot")]
#[command(version, about = "Screenshots of medical volumes with mask overlays", long_about = None)]
struct Cli {
    /// Comma-separated image files or DICOM directories; the first one is the reference
    #[arg(short, long, value_name = "PATHS")]
    images: Option<String>,

    /// Comma-separated mask files, one for all images or one per image
    #[arg(short, long, value_name = "PATHS")]
    masks: Option<String>,

    /// Output raster file, the format follows the extension
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// JSON file with a screenshot configuration, flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Border around the mask extent as a fraction of each axis
    #[arg(short, long, value_name = "FLOAT")]
    border_pc: Option<f64>,

    /// Mask opacity in percent
    #[arg(long, value_name = "0-100")]
    mask_opacity: Option<f64>,

    /// Label colormap (fixed, jet, hot, gray)
    #[arg(short, long, value_name = "NAME")]
    colormap: Option<Colormap>,

    /// One row per anatomical axis instead of one row per image
    #[arg(long)]
    axis_row: bool,

    /// Crop to the masks plus border instead of showing the full volume
    #[arg(long)]
    bounded: bool,

    /// Slice order for DICOM series
    #[arg(long, value_name = "ORDER")]
    sort_by: Option<SortBy>,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Result<ScreenshotConfig, medvol_screenshot::ScreenshotError> {
        let mut config = match &self.config {
            Some(path) => ScreenshotConfig::from_json_file(path)?,
            None => ScreenshotConfig::default(),
        };
        if let Some(images) = &self.images {
            config.images = ScreenshotConfig::parse_path_list(images);
        }
        if let Some(masks) = &self.masks {
            config.masks = ScreenshotConfig::parse_path_list(masks);
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(border_pc) = self.border_pc {
            config.border_pc = border_pc;
        }
        if let Some(mask_opacity) = self.mask_opacity {
            config.mask_opacity = mask_opacity;
        }
        if let Some(colormap) = self.colormap {
            config.colormap = colormap;
        }
        if let Some(sort_by) = self.sort_by {
            config.sort_by = sort_by;
        }
        config.axis_row |= self.axis_row;
        config.bounded |= self.bounded;
        Ok(config)
    }
}

fn setup_logger(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logger(cli.verbose);

    let result = cli
        .into_config()
        .and_then(ScreenshotMaker::new)
        .and_then(|maker| maker.run());

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
