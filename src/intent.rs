// Intent module
// Raw view events, the intents they turn into, and the host's line-oriented command format

use crate::state::{OverlayState, PointerRegion, Size};
use std::str::FromStr;
use thiserror::Error;

/// Which way an opacity adjustment goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpacityDirection {
    MoreTransparent,
    MoreOpaque,
}

impl OpacityDirection {
    /// Signed opacity change for one step
    pub fn delta(self, step: f32) -> f32 {
        match self {
            OpacityDirection::MoreTransparent => -step,
            OpacityDirection::MoreOpaque => step,
        }
    }
}

/// What the view asks the controller to do
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// The view decoded the image; sizes in physical pixels
    ImageLoaded { natural: Size, screen: Size },
    TogglePenetrable,
    Zoom { wheel_delta_y: f64 },
    AdjustOpacity(OpacityDirection),
    CloseRequested,
}

/// Keys the overlay reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Escape,
    ArrowUp,
    ArrowDown,
    Other(String),
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => Key::Escape,
            "ArrowUp" | "Up" => Key::ArrowUp,
            "ArrowDown" | "Down" => Key::ArrowDown,
            other => Key::Other(other.to_string()),
        }
    }
}

/// Input as the view observes it
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    ImageLoaded { natural: Size, screen: Size },
    KeyDown(Key),
    /// Wheel over the image surface
    Wheel { delta_y: f64 },
    Click(PointerRegion),
    DoubleClick(PointerRegion),
}

/// Translate a view event into an intent, honouring pointer routing.
///
/// Pointer events over the image are dropped while the overlay is penetrable;
/// the control region stays live.
pub fn route(event: &ViewEvent, state: &OverlayState) -> Option<Intent> {
    match event {
        ViewEvent::ImageLoaded { natural, screen } => Some(Intent::ImageLoaded {
            natural: *natural,
            screen: *screen,
        }),
        ViewEvent::KeyDown(Key::Escape) => Some(Intent::CloseRequested),
        // Up fades the image, Down brings it back
        ViewEvent::KeyDown(Key::ArrowUp) => {
            Some(Intent::AdjustOpacity(OpacityDirection::MoreTransparent))
        }
        ViewEvent::KeyDown(Key::ArrowDown) => {
            Some(Intent::AdjustOpacity(OpacityDirection::MoreOpaque))
        }
        ViewEvent::KeyDown(Key::Other(_)) => None,
        ViewEvent::Wheel { delta_y } => state
            .accepts_pointer(PointerRegion::Image)
            .then_some(Intent::Zoom {
                wheel_delta_y: *delta_y,
            }),
        ViewEvent::Click(PointerRegion::ControlRegion) => Some(Intent::TogglePenetrable),
        ViewEvent::Click(PointerRegion::Image) => None,
        ViewEvent::DoubleClick(PointerRegion::Image) => state
            .accepts_pointer(PointerRegion::Image)
            .then_some(Intent::CloseRequested),
        ViewEvent::DoubleClick(PointerRegion::ControlRegion) => None,
    }
}

/// One line of a host script
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    /// The view finished rendering and wants notifications
    Ready,
    View(ViewEvent),
    /// Global toggle shortcut (Ctrl+1 / Cmd+1)
    Shortcut,
    /// Close requested from outside the window
    Close,
    Help,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("{command}: expected {expected}")]
    BadArguments {
        command: String,
        expected: &'static str,
    },
}

pub const HELP: &str = "\
commands:
  ready                     view attached, start receiving notifications
  loaded W H SW SH          image decoded at WxH on a SWxSH screen
  key Escape|ArrowUp|ArrowDown
  wheel DY                  positive DY zooms out
  click status|image
  dblclick status|image
  shortcut                  global click-through toggle
  close                     external close request
  help                      show this list";

impl FromStr for HostCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let command = parts.next().ok_or(ParseCommandError::Empty)?;
        let args: Vec<&str> = parts.collect();
        let bad = |expected: &'static str| ParseCommandError::BadArguments {
            command: command.to_string(),
            expected,
        };

        let parsed = match (command, args.as_slice()) {
            ("ready", []) => HostCommand::Ready,
            ("shortcut", []) => HostCommand::Shortcut,
            ("close", []) => HostCommand::Close,
            ("help", []) => HostCommand::Help,
            ("loaded", [w, h, sw, sh]) => {
                let num = |s: &str| {
                    s.parse::<u32>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| bad("four positive integers"))
                };
                HostCommand::View(ViewEvent::ImageLoaded {
                    natural: Size::new(num(*w)?, num(*h)?),
                    screen: Size::new(num(*sw)?, num(*sh)?),
                })
            }
            ("key", [name]) => HostCommand::View(ViewEvent::KeyDown(Key::from(*name))),
            ("wheel", [dy]) => {
                let delta_y = dy
                    .parse::<f64>()
                    .ok()
                    .filter(|d| d.is_finite())
                    .ok_or_else(|| bad("a number"))?;
                HostCommand::View(ViewEvent::Wheel { delta_y })
            }
            ("click", [region]) => HostCommand::View(ViewEvent::Click(
                parse_region(region).ok_or_else(|| bad("status or image"))?,
            )),
            ("dblclick", [region]) => HostCommand::View(ViewEvent::DoubleClick(
                parse_region(region).ok_or_else(|| bad("status or image"))?,
            )),
            ("loaded", _) => return Err(bad("W H SW SH")),
            ("key" | "wheel" | "click" | "dblclick", _) => return Err(bad("one argument")),
            ("ready" | "shortcut" | "close" | "help", _) => return Err(bad("no arguments")),
            (other, _) => return Err(ParseCommandError::Unknown(other.to_string())),
        };
        Ok(parsed)
    }
}

fn parse_region(name: &str) -> Option<PointerRegion> {
    match name {
        "status" | "control" => Some(PointerRegion::ControlRegion),
        "image" => Some(PointerRegion::Image),
        _ => None,
    }
}
