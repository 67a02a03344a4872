//! Text commands for the headless player
//!
//! One command per line. Queue positions are 1-based for the listener and
//! converted to 0-based indices here.

use std::str::FromStr;

use crate::controller::PlayerCommand;
use crate::error::Error;
use crate::session::SkipDirection;

/// A parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    Player(PlayerCommand),
    /// Print the now-playing line
    Status,
    /// Print the queue
    Queue,
    Help,
    Quit,
}

pub const HELP_TEXT: &str = "\
commands:
  search <query>   replace the queue with search results
  play <n>         play queue entry n (1-based)
  pause            toggle play/pause
  next | prev      skip within the queue
  seek <t>         seek to t seconds or M:SS
  vol <v>          volume 0.0-1.0 (or 0-100)
  mute             toggle mute
  stop             stop and go idle
  queue            list the queue
  status           show what is playing
  quit             exit";

impl FromStr for CliCommand {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "search" | "s" => {
                if rest.is_empty() {
                    return Err(Error::InvalidInput("search needs a query".to_string()));
                }
                CliCommand::Player(PlayerCommand::Search(rest.to_string()))
            }
            "play" => CliCommand::Player(PlayerCommand::Play(parse_queue_position(rest)?)),
            "pause" | "p" | "toggle" => CliCommand::Player(PlayerCommand::TogglePlayPause),
            "next" | "n" => CliCommand::Player(PlayerCommand::Skip(SkipDirection::Next)),
            "prev" | "b" => CliCommand::Player(PlayerCommand::Skip(SkipDirection::Prev)),
            "seek" => CliCommand::Player(PlayerCommand::Seek(parse_time(rest)?)),
            "vol" | "volume" => CliCommand::Player(PlayerCommand::SetVolume(parse_volume(rest)?)),
            "mute" | "m" => CliCommand::Player(PlayerCommand::ToggleMute),
            "stop" => CliCommand::Player(PlayerCommand::Stop),
            "queue" | "ls" => CliCommand::Queue,
            "status" | "st" => CliCommand::Status,
            "help" | "?" => CliCommand::Help,
            "quit" | "q" | "exit" => CliCommand::Quit,
            "" => return Err(Error::InvalidInput("empty command".to_string())),
            other => return Err(Error::InvalidInput(format!("unknown command '{}'", other))),
        };
        Ok(command)
    }
}

fn parse_queue_position(raw: &str) -> Result<usize, Error> {
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(Error::InvalidInput(format!(
            "queue position must be 1 or more, got '{}'",
            raw
        ))),
    }
}

/// Seconds, or `M:SS`
fn parse_time(raw: &str) -> Result<f64, Error> {
    let invalid = || Error::InvalidInput(format!("expected seconds or M:SS, got '{}'", raw));

    let seconds = match raw.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes: u64 = minutes.parse().map_err(|_| invalid())?;
            let seconds: f64 = seconds.parse().map_err(|_| invalid())?;
            if !(0.0..60.0).contains(&seconds) {
                return Err(invalid());
            }
            minutes as f64 * 60.0 + seconds
        }
        None => raw.parse::<f64>().map_err(|_| invalid())?,
    };

    if seconds.is_finite() {
        Ok(seconds)
    } else {
        Err(invalid())
    }
}

/// `0.0-1.0`, or a percentage above 1
fn parse_volume(raw: &str) -> Result<f32, Error> {
    let value: f32 = raw
        .parse()
        .map_err(|_| Error::InvalidInput(format!("volume must be a number, got '{}'", raw)))?;
    if value.is_nan() {
        return Err(Error::InvalidInput("volume must be a number".to_string()));
    }
    Ok(if value > 1.0 { value / 100.0 } else { value })
}
