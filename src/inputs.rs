//! Host input vocabulary
//!
//! The host feeds the viewer one line per intent: `next`, `prev`, `goto N`,
//! `zoom-in`, `zoom-out`, `zoom D`, `fit`, `resize WxH`, `fullscreen WxH`,
//! `swipe DX`, `status`, `quit`.

use crate::pdf::{Command, ContainerSize};

/// Horizontal travel below which a swipe is ignored, in CSS pixels
pub const SWIPE_THRESHOLD: f32 = 40.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HostInput {
    Intent(Command),
    ZoomIn,
    ZoomOut,
    /// A swipe too short to count
    Ignored,
    Status,
    Quit,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{command}` expects {expected}")]
    BadArgument {
        command: &'static str,
        expected: &'static str,
    },
}

/// Parse one input line
pub fn parse_input(line: &str) -> Result<HostInput, InputError> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(HostInput::Status);
    };
    let argument = words.next();

    let input = match command.to_ascii_lowercase().as_str() {
        "next" | "n" | "right" => HostInput::Intent(Command::NextPage),
        "prev" | "p" | "left" => HostInput::Intent(Command::PrevPage),
        "goto" | "g" => {
            let page = argument
                .and_then(|a| a.parse::<usize>().ok())
                .ok_or(InputError::BadArgument {
                    command: "goto",
                    expected: "a page number",
                })?;
            HostInput::Intent(Command::GoToPage(page))
        }
        "zoom-in" | "+" | "=" => HostInput::ZoomIn,
        "zoom-out" | "-" | "_" => HostInput::ZoomOut,
        "zoom" => {
            let delta = parse_float(argument).ok_or(InputError::BadArgument {
                command: "zoom",
                expected: "a zoom delta",
            })?;
            HostInput::Intent(Command::Zoom(delta))
        }
        "fit" => HostInput::Intent(Command::Fit),
        "resize" => HostInput::Intent(Command::Resize(parse_size(argument, "resize")?)),
        "fullscreen" | "f" => {
            HostInput::Intent(Command::FullscreenChanged(parse_size(argument, "fullscreen")?))
        }
        "swipe" => {
            let dx = parse_float(argument).ok_or(InputError::BadArgument {
                command: "swipe",
                expected: "a horizontal distance",
            })?;
            swipe_input(dx)
        }
        "status" => HostInput::Status,
        "quit" | "q" | "exit" => HostInput::Quit,
        _ => return Err(InputError::Unknown(command.to_string())),
    };

    Ok(input)
}

/// Swiping left moves forward, swiping right moves back
#[must_use]
pub fn swipe_input(dx: f32) -> HostInput {
    if dx.abs() < SWIPE_THRESHOLD {
        HostInput::Ignored
    } else if dx < 0.0 {
        HostInput::Intent(Command::NextPage)
    } else {
        HostInput::Intent(Command::PrevPage)
    }
}

fn parse_float(argument: Option<&str>) -> Option<f32> {
    argument
        .and_then(|a| a.parse::<f32>().ok())
        .filter(|v| v.is_finite())
}

fn parse_size(argument: Option<&str>, command: &'static str) -> Result<ContainerSize, InputError> {
    let bad = InputError::BadArgument {
        command,
        expected: "a size like 1280x800",
    };
    let (width, height) = argument
        .and_then(|a| a.split_once(['x', 'X']))
        .ok_or_else(|| bad.clone())?;

    match (width.parse::<f32>(), height.parse::<f32>()) {
        (Ok(w), Ok(h)) if w.is_finite() && h.is_finite() => Ok(ContainerSize::new(w, h)),
        _ => Err(bad),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_words() {
        assert_eq!(parse_input("next"), Ok(HostInput::Intent(Command::NextPage)));
        assert_eq!(parse_input(" PREV "), Ok(HostInput::Intent(Command::PrevPage)));
        assert_eq!(
            parse_input("goto 12"),
            Ok(HostInput::Intent(Command::GoToPage(12)))
        );
    }

    #[test]
    fn keyboard_aliases_match_zoom_keys() {
        assert_eq!(parse_input("+"), Ok(HostInput::ZoomIn));
        assert_eq!(parse_input("="), Ok(HostInput::ZoomIn));
        assert_eq!(parse_input("-"), Ok(HostInput::ZoomOut));
        assert_eq!(parse_input("_"), Ok(HostInput::ZoomOut));
    }

    #[test]
    fn sizes_parse() {
        assert_eq!(
            parse_input("resize 1920x1080"),
            Ok(HostInput::Intent(Command::Resize(ContainerSize::new(
                1920.0, 1080.0
            ))))
        );
        assert!(parse_input("resize 1920").is_err());
        assert!(parse_input("fullscreen axb").is_err());
    }

    #[test]
    fn short_swipes_are_ignored() {
        assert_eq!(swipe_input(39.0), HostInput::Ignored);
        assert_eq!(swipe_input(-39.9), HostInput::Ignored);
        assert_eq!(swipe_input(-40.0), HostInput::Intent(Command::NextPage));
        assert_eq!(swipe_input(120.0), HostInput::Intent(Command::PrevPage));
    }

    #[test]
    fn blank_line_is_status() {
        assert_eq!(parse_input("   "), Ok(HostInput::Status));
    }

    #[test]
    fn unknown_and_malformed_commands() {
        assert_eq!(
            parse_input("print"),
            Err(InputError::Unknown("print".to_string()))
        );
        assert!(matches!(
            parse_input("goto x"),
            Err(InputError::BadArgument { command: "goto", .. })
        ));
        assert!(parse_input("zoom NaN").is_err());
    }
}
