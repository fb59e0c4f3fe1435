// overpin - pin a reference image above every other window
// Headless host: drives the overlay controller from a script of view events

mod cli;

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use log::{error, info, warn};
use overpin::headless::HeadlessWindowing;
use overpin::image_loader::{self, ImageSource};
use overpin::intent::HELP;
use overpin::{HostCommand, OverlayConfig, OverlayController, OverlayEvent, Phase, Size, ViewEvent};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = cli::parse_args();
    let image = ImageSource::resolve(&args.image)?;
    info!("Starting overpin with image: {}, opacity: {}", image, args.opacity);

    let screen = Size::new(args.screen_width, args.screen_height);
    let host = HeadlessWindowing::new(screen).with_failures(args.failures.iter().copied());
    let config = OverlayConfig::default().with_initial_opacity(args.opacity);
    let controller = OverlayController::new(host, config);

    pollster::block_on(run(&controller, image, args.script))
}

async fn run(
    controller: &OverlayController<HeadlessWindowing>,
    image: ImageSource,
    script: Option<PathBuf>,
) -> Result<()> {
    controller
        .open(image.clone())
        .await
        .context("Failed to open overlay")?;

    let mut view = StatusView::default();
    let mut events = Some(controller.view_ready()?);

    // A real view reports the decoded size itself; local files can be measured up front
    match image_loader::read_dimensions(&image) {
        Ok((width, height)) => {
            let event = ViewEvent::ImageLoaded {
                natural: Size::new(width, height),
                screen: controller.service().screen(),
            };
            if let Err(e) = controller.handle_view_event(event).await {
                warn!("{}", e);
            }
        }
        Err(e) => warn!("{:#}; waiting for a `loaded` command", e),
    }
    if let Some(rx) = &events {
        view.drain(rx);
    }

    let reader: Box<dyn BufRead> = match script {
        Some(path) => Box::new(BufReader::new(
            File::open(&path)
                .with_context(|| format!("Failed to open script: {}", path.display()))?,
        )),
        None => {
            if atty::is(atty::Stream::Stdin) {
                eprintln!("{}", HELP);
            }
            Box::new(io::stdin().lock())
        }
    };

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let command = match line.parse::<HostCommand>() {
            Ok(command) => command,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        let result = match command {
            HostCommand::Ready => controller.view_ready().map(|rx| events = Some(rx)),
            HostCommand::View(event) => controller.handle_view_event(event).await,
            HostCommand::Shortcut => controller.shortcut_toggle().await.map(|_| ()),
            HostCommand::Close => controller.close().await,
            HostCommand::Help => {
                println!("{}", HELP);
                Ok(())
            }
        };
        if let Err(e) = result {
            error!("{}", e);
        }

        if let Some(rx) = &events {
            view.drain(rx);
        }
        if controller.phase() == Phase::Closed {
            break;
        }
    }

    if controller.phase() == Phase::Open {
        info!("End of input, closing overlay");
        if let Err(e) = controller.close().await {
            error!("{}", e);
        }
        if let Some(rx) = &events {
            view.drain(rx);
        }
    }
    Ok(())
}

/// What the in-window view would show, printed whenever it changes
struct StatusView {
    opacity: f32,
    penetrable: bool,
    size: Option<Size>,
}

impl Default for StatusView {
    fn default() -> Self {
        Self {
            opacity: OverlayConfig::default().initial_opacity,
            penetrable: false,
            size: None,
        }
    }
}

impl StatusView {
    fn drain(&mut self, events: &Receiver<OverlayEvent>) {
        let mut changed = false;
        for event in events.try_iter() {
            changed = true;
            match event {
                OverlayEvent::Snapshot(state) => {
                    self.opacity = state.opacity;
                    self.penetrable = state.penetrable;
                    self.size = state.window_size;
                }
                OverlayEvent::OpacityChanged(opacity) => self.opacity = opacity,
                OverlayEvent::PenetrableChanged(penetrable) => self.penetrable = penetrable,
                OverlayEvent::WindowResized(size) => self.size = Some(size),
                OverlayEvent::Closed => {
                    println!("[view] closed");
                    return;
                }
            }
        }
        if changed {
            println!("[view] {}", self.status_text());
        }
    }

    fn status_text(&self) -> String {
        let shortcut = if cfg!(target_os = "macos") { "Cmd+1" } else { "Ctrl+1" };
        let size = self.size.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
        if self.penetrable {
            format!("Click-through on | {} to restore | {}", shortcut, size)
        } else {
            format!(
                "Click to enable click-through | {} toggle | Esc close | Up/Down opacity | \
                 Wheel zoom | Opacity: {}% | {}",
                shortcut,
                (self.opacity * 100.0).round(),
                size
            )
        }
    }
}
