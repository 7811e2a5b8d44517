use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use eps_core::{
    Color, EpsRenderer, ExportFormat, PrescanOptions, PrescanResult, RenderOptions, prescan,
};

#[derive(Parser, Debug)]
#[command(name = "eps-inspect")]
#[command(about = "Inspect and rasterize Encapsulated PostScript files")]
#[command(version)]
struct Cli {
    /// EPS files to inspect
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Rasterize a single document to this file (format from the extension)
    #[arg(short, long, value_name = "OUTPUT")]
    render: Option<PathBuf>,

    /// Export every input into this directory
    #[arg(short, long, value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// Output format: png, jpg or pdf
    #[arg(short, long)]
    format: Option<ExportFormat>,

    /// Convert the document to PDF via the native engine
    #[arg(long, value_name = "PDF")]
    convert: Option<PathBuf>,

    /// Pixels per point
    #[arg(short, long, default_value_t = 1.0)]
    scale: f64,

    /// Resolution in dots per inch (overrides --scale)
    #[arg(long)]
    dpi: Option<u32>,

    /// Background color as #rrggbb
    #[arg(long, default_value = "#ffffff", value_parser = parse_color)]
    background: Color,

    /// Lines searched for the bounding box
    #[arg(long, default_value_t = 100)]
    bbox_lines: usize,

    /// Resolve `(atend)` bounding boxes from this many trailing lines
    #[arg(long, value_name = "LINES")]
    atend: Option<usize>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_color(s: &str) -> Result<Color, String> {
    s.parse()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if cli.render.is_some() && cli.files.len() > 1 {
        bail!("--render takes a single input; use --export-dir for several");
    }

    let mut prescan_options = PrescanOptions::default().with_bounding_box_lines(cli.bbox_lines);
    if let Some(lines) = cli.atend {
        prescan_options = prescan_options.with_trailer_lines(lines);
    }
    let mut options = RenderOptions::default()
        .with_scale(cli.scale)
        .with_background(cli.background)
        .with_prescan(prescan_options.clone());
    if let Some(dpi) = cli.dpi {
        options = options.with_dpi(dpi);
    }
    let renderer = EpsRenderer::with_ghostscript();

    println!("╔═══════════════════════════════════════════════════════════╗");
    println!("║           EPS Inspector                                   ║");
    println!("╚═══════════════════════════════════════════════════════════╝");

    for file in &cli.files {
        let data =
            fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
        let scan = prescan(&data, &prescan_options);

        println!("\nFile: {}\n", file.display());
        print_basic_info(&data, &scan);
        print_metadata(&scan);
        print_native_engine(&renderer, &data);

        if let Some(output) = &cli.render {
            let format = cli
                .format
                .or_else(|| ExportFormat::from_path(output))
                .unwrap_or_default();
            render_one(&renderer, &data, output, format, &options)?;
        }

        if let Some(output) = &cli.convert {
            println!("═══════════════ CONVERT ═══════════════");
            if renderer.convert_to_document(&data, output) {
                println!("Output: {}", output.display());
            } else {
                println!("Conversion failed (is Ghostscript installed?)");
            }
            println!();
        }
    }

    if let Some(dir) = &cli.export_dir {
        let format = cli.format.unwrap_or_default();
        let report = renderer
            .batch_export(cli.files.as_slice(), dir, format, &options)
            .with_context(|| format!("failed to export into {}", dir.display()))?;

        println!("═══════════════ EXPORT ═══════════════");
        println!("Format: {}", format);
        for path in &report.exported {
            println!("Wrote: {}", path.display());
        }
        for (path, error) in &report.failed {
            println!("Failed: {} ({})", path.display(), error);
        }
        println!("Exported {} of {}", report.success_count(), cli.files.len());
        println!();
    }

    Ok(())
}

fn render_one(
    renderer: &EpsRenderer,
    data: &[u8],
    output: &Path,
    format: ExportFormat,
    options: &RenderOptions,
) -> Result<()> {
    let rendered = renderer
        .export(data, output, format, options)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("═══════════════ RENDER ═══════════════");
    println!("Output: {}", output.display());
    println!("Format: {}", format);
    if let Some(rendered) = rendered {
        println!("Size: {}x{}", rendered.image.width(), rendered.image.height());
        println!("Tier: {}", rendered.tier);
    }
    println!();
    Ok(())
}

fn print_basic_info(data: &[u8], scan: &PrescanResult) {
    println!("═══════════════ BASIC INFORMATION ═══════════════");
    println!("File Size: {}", format_size(data.len() as u64));
    println!("Valid EPS: {}", if scan.is_valid { "Yes" } else { "No" });

    let bbox = &scan.bounding_box;
    if scan.bounding_box_found {
        println!("Bounding Box: {}", bbox);
    } else {
        println!("Bounding Box: {} (default)", bbox);
    }
    println!("Size: {} x {} pt", bbox.width(), bbox.height());
    println!();
}

fn print_metadata(scan: &PrescanResult) {
    println!("═══════════════ METADATA ═══════════════");
    if scan.metadata.is_empty() {
        println!("No DSC metadata found");
    }
    for (key, value) in scan.metadata.iter() {
        println!("{:<16}{}", format!("{}:", key.as_str()), value);
    }
    println!();
}

fn print_native_engine(renderer: &EpsRenderer, data: &[u8]) {
    println!("═══════════════ NATIVE ENGINE ═══════════════");
    let engine = renderer.native_engine();
    if !engine.is_available() {
        println!("Ghostscript: not available");
        println!();
        return;
    }
    println!("Ghostscript: available");
    match renderer.native_bounding_box(data) {
        Some(bbox) => println!("Measured Bounding Box: {}", bbox),
        None => println!("Measured Bounding Box: unavailable"),
    }
    println!();
}

fn format_size(size: u64) -> String {
    if size < 1024 {
        format!("{} B", size)
    } else if size < 1024 * 1024 {
        format!("{:.2} KB", size as f64 / 1024.0)
    } else {
        format!("{:.2} MB", size as f64 / (1024.0 * 1024.0))
    }
}
