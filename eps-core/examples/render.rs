//! EPS Rendering Example
//!
//! Renders an EPS file to a PNG image.
//!
//! Usage:
//!     cargo run --example render -- input.eps output.png [scale]
//!
//! Example:
//!     cargo run --example render -- figure.eps figure.png 2

use eps_core::{EpsRenderer, RenderOptions};
use std::env;
use std::fs::File;
use std::io::BufReader;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <input.eps> <output.png> [scale]", args[0]);
        eprintln!("Example: {} figure.eps figure.png 2", args[0]);
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  input.eps    - Path to input EPS file");
        eprintln!("  output.png   - Path to output PNG file");
        eprintln!("  scale        - Pixels per point (default: 1)");
        std::process::exit(1);
    }

    let scale = match args.get(3) {
        Some(s) => s.parse::<f64>()?,
        None => 1.0,
    };

    let renderer = EpsRenderer::with_ghostscript();
    let options = RenderOptions::default().with_scale(scale);
    let reader = BufReader::new(File::open(&args[1])?);

    let rendered = renderer.render(reader, &options);
    rendered.image.save_png(&args[2])?;

    println!(
        "Rendered {} ({}x{}) via {} to {}",
        args[1],
        rendered.image.width(),
        rendered.image.height(),
        rendered.tier,
        args[2]
    );
    Ok(())
}
