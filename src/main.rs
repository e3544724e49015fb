use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use qoi_rgb::{bmp, percent_of_raw, Colorspace, PixelGrid, QoiImage};

/// Convert 24-bit BMP images to and from QOI
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a BMP file as QOI
    Encode {
        input: PathBuf,
        output: PathBuf,

        /// Colorspace tag written into the QOI header
        #[arg(long, value_enum, default_value = "srgb")]
        colorspace: ColorspaceArg,
    },
    /// Decode a QOI file to BMP
    Decode { input: PathBuf, output: PathBuf },
    /// Encode a BMP, decode it again and check nothing was lost
    Roundtrip {
        input: PathBuf,

        /// Also write the decoded image as BMP
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ColorspaceArg {
    Srgb,
    Linear,
}

impl From<ColorspaceArg> for Colorspace {
    fn from(arg: ColorspaceArg) -> Self {
        match arg {
            ColorspaceArg::Srgb => Colorspace::Srgb,
            ColorspaceArg::Linear => Colorspace::Linear,
        }
    }
}

fn read_bmp(path: &Path) -> Result<PixelGrid> {
    let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    bmp::decode_bmp(&data).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_bmp(path: &Path, grid: &PixelGrid) -> Result<()> {
    let bytes = bmp::encode_bmp(grid)
        .with_context(|| format!("Failed to encode {}", path.display()))?;
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

fn read_qoi(path: &Path) -> Result<QoiImage> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    qoi_rgb::read_image(BufReader::new(file))
        .with_context(|| format!("Failed to decode {}", path.display()))
}

fn write_qoi(path: &Path, grid: &PixelGrid, colorspace: Colorspace) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    qoi_rgb::write_image(BufWriter::new(file), grid, colorspace)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn report_sizes(grid: &PixelGrid, encoded: usize) {
    let raw = grid.pixels().len() * 3;
    info!("Original size:    {raw} bytes");
    info!("Compressed size:  {encoded} bytes");
    info!(
        "Compression rate: {:.2}%",
        100.0 - percent_of_raw(encoded, grid.pixels().len())
    );
}

fn encode(input: &Path, output: &Path, colorspace: Colorspace) -> Result<()> {
    let grid = read_bmp(input)?;
    info!("Read {}x{} bitmap {}", grid.width(), grid.height(), input.display());

    let start = Instant::now();
    write_qoi(output, &grid, colorspace)?;
    info!("Time taken (encoding): {:?}", start.elapsed());

    let encoded = fs::metadata(output)
        .with_context(|| format!("Failed to stat {}", output.display()))?
        .len();
    report_sizes(&grid, encoded as usize);
    Ok(())
}

fn decode(input: &Path, output: &Path) -> Result<()> {
    let start = Instant::now();
    let image = read_qoi(input)?;
    info!("Time taken (decoding): {:?}", start.elapsed());
    info!(
        "Decoded {}x{} image ({:?})",
        image.grid.width(),
        image.grid.height(),
        image.colorspace
    );
    write_bmp(output, &image.grid)
}

fn roundtrip(input: &Path, output: Option<&Path>) -> Result<()> {
    let grid = read_bmp(input)?;

    let start = Instant::now();
    let encoded = qoi_rgb::encode_image(&grid, Colorspace::Srgb);
    info!("Time taken (encoding): {:?}", start.elapsed());
    report_sizes(&grid, encoded.len());

    let start = Instant::now();
    let image = qoi_rgb::decode_image(&encoded).context("Failed to decode encoded image")?;
    info!("Time taken (decoding): {:?}", start.elapsed());

    if image.grid != grid {
        anyhow::bail!("Decoded image differs from {}", input.display());
    }
    info!("Round trip is lossless");

    if let Some(output) = output {
        write_bmp(output, &image.grid)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::Encode {
            input,
            output,
            colorspace,
        } => encode(&input, &output, colorspace.into()),
        Command::Decode { input, output } => decode(&input, &output),
        Command::Roundtrip { input, output } => roundtrip(&input, output.as_deref()),
    }
}
