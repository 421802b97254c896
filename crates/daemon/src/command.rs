//! Interactive command parsing for the live streamer
//!
//! One command per input line. Unrecognized input is a typed error the
//! command loop reports and survives.

use std::str::FromStr;
use thiserror::Error;

/// Error type for command parsing
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unrecognized(String),
}

/// Operator commands accepted on the interactive input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Skip back to the previous source
    Prev,
    /// Skip forward to the next source
    Next,
    /// Stop streaming and exit
    Quit,
    /// Print all source paths in loop order
    List,
    /// Print the current source path
    Current,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "prev" => Ok(Command::Prev),
            "next" => Ok(Command::Next),
            "quit" => Ok(Command::Quit),
            "list" => Ok(Command::List),
            "current" => Ok(Command::Current),
            other => Err(CommandError::Unrecognized(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_commands() {
        assert_eq!("prev".parse(), Ok(Command::Prev));
        assert_eq!("next".parse(), Ok(Command::Next));
        assert_eq!("quit".parse(), Ok(Command::Quit));
        assert_eq!("list".parse(), Ok(Command::List));
        assert_eq!("current".parse(), Ok(Command::Current));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!("  next  ".parse(), Ok(Command::Next));
        assert_eq!("\tquit\n".parse(), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(
            "NEXT".parse::<Command>(),
            Err(CommandError::Unrecognized("NEXT".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_unknown_input() {
        assert_eq!(
            "skip".parse::<Command>(),
            Err(CommandError::Unrecognized("skip".to_string()))
        );
        assert_eq!(
            "".parse::<Command>(),
            Err(CommandError::Unrecognized(String::new()))
        );
    }

    #[test]
    fn test_error_message_names_the_input() {
        let err = "halt".parse::<Command>().unwrap_err();
        assert_eq!(err.to_string(), "unknown command: halt");
    }
}
