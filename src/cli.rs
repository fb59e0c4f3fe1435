// Command line interface module
// Handles parsing of command line arguments for the headless overlay host

use clap::Parser;
use overpin::WindowOp;
use std::path::PathBuf;

/// overpin - pin a reference image above every other window
#[derive(Parser, Debug)]
#[command(name = "overpin")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path or URI of the image to pin
    #[arg(value_name = "IMAGE")]
    pub image: String,

    /// Initial opacity of the image (0.1 - 1.0)
    #[arg(short, long, default_value = "0.7", value_parser = parse_opacity)]
    pub opacity: f32,

    /// Width of the simulated screen in pixels
    #[arg(long, default_value = "1920")]
    pub screen_width: u32,

    /// Height of the simulated screen in pixels
    #[arg(long, default_value = "1080")]
    pub screen_height: u32,

    /// Read view events from this file instead of stdin
    #[arg(short, long, value_name = "FILE")]
    pub script: Option<PathBuf>,

    /// Make a windowing operation fail (repeatable): create, resize, center,
    /// click-through, close, close-current, size
    #[arg(long = "fail", value_name = "OP", value_parser = parse_window_op)]
    pub failures: Vec<WindowOp>,
}

/// Parse opacity value and ensure it's within valid range
fn parse_opacity(s: &str) -> Result<f32, String> {
    let opacity: f32 = s.parse().map_err(|_| "Invalid opacity value")?;
    if !(0.1..=1.0).contains(&opacity) {
        return Err("Opacity must be between 0.1 and 1.0".to_string());
    }
    Ok(opacity)
}

fn parse_window_op(s: &str) -> Result<WindowOp, String> {
    match s {
        "create" => Ok(WindowOp::Create),
        "resize" => Ok(WindowOp::Resize),
        "center" => Ok(WindowOp::Center),
        "click-through" => Ok(WindowOp::SetClickThrough),
        "close" => Ok(WindowOp::Close),
        "close-current" => Ok(WindowOp::CloseCurrent),
        "size" => Ok(WindowOp::CurrentSize),
        other => Err(format!("Unknown windowing operation: {}", other)),
    }
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["overpin", "ref.png"]).unwrap();
        assert_eq!(args.image, "ref.png");
        assert_eq!(args.opacity, 0.7);
        assert_eq!((args.screen_width, args.screen_height), (1920, 1080));
        assert!(args.script.is_none());
        assert!(args.failures.is_empty());
    }

    #[test]
    fn opacity_out_of_range_is_rejected() {
        assert!(Args::try_parse_from(["overpin", "ref.png", "--opacity", "0.05"]).is_err());
        assert!(Args::try_parse_from(["overpin", "ref.png", "-o", "abc"]).is_err());
    }

    #[test]
    fn failures_are_repeatable() {
        let args = Args::try_parse_from([
            "overpin",
            "ref.png",
            "--fail",
            "close",
            "--fail",
            "click-through",
        ])
        .unwrap();
        assert_eq!(args.failures, vec![WindowOp::Close, WindowOp::SetClickThrough]);
        assert!(Args::try_parse_from(["overpin", "ref.png", "--fail", "explode"]).is_err());
    }
}
