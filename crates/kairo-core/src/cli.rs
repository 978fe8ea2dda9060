use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::calendar::NavDirection;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "kairo",
    version,
    about = "Kairo: calendar views and time-block layout from the terminal",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Config file (default: $KAIRO_CONFIG, then ~/.config/kairo/kairo.toml).
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding days.json, todos.json, events.json and templates.json.
    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[arg(
        long = "set",
        value_name = "KEY=VALUE",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub overrides: Vec<KeyVal>,

    /// Print JSON instead of tables.
    #[arg(long = "json", global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Render a month grid, week agenda or day detail.
    Show {
        #[arg(long)]
        view: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Print the date reached by moving one view step.
    Nav {
        #[arg(value_enum)]
        direction: NavTarget,
        #[arg(long)]
        view: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Print the dates a view covers.
    Range {
        #[arg(long)]
        view: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Place a block inside the day window.
    Position {
        start: String,
        end: String,
        #[arg(long = "day-start")]
        day_start: Option<String>,
        #[arg(long = "day-end")]
        day_end: Option<String>,
    },
    /// Completion statistics for a day, its Monday-start week, and overall.
    Stats {
        #[arg(long)]
        date: Option<String>,
    },
    /// Today's progress, streaks and the events of the coming week.
    Dashboard,
    /// Drag one time block onto another and print the new order.
    Reorder {
        #[arg(long)]
        date: String,
        active: String,
        over: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavTarget {
    #[value(alias = "prev")]
    Previous,
    Next,
    Today,
}

impl NavTarget {
    /// `None` means jump to today.
    pub fn direction(self) -> Option<NavDirection> {
        match self {
            Self::Previous => Some(NavDirection::Previous),
            Self::Next => Some(NavDirection::Next),
            Self::Today => None,
        }
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> GlobalCli {
        GlobalCli::try_parse_from(args).expect("cli parse")
    }

    #[test]
    fn keyval_requires_equals() {
        let kv: KeyVal = " color = off ".parse().expect("keyval");
        assert_eq!((kv.key.as_str(), kv.value.as_str()), ("color", "off"));
        assert!("color".parse::<KeyVal>().is_err());
    }

    #[test]
    fn globals_work_after_subcommand() {
        let cli = parse(&[
            "kairo", "show", "--view", "week", "--date", "2024-01-15", "-vv", "--set",
            "timezone=UTC",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.overrides.len(), 1);
        assert_eq!(
            cli.command,
            Some(Command::Show {
                view: Some("week".to_string()),
                date: Some("2024-01-15".to_string()),
            })
        );
    }

    #[test]
    fn nav_accepts_prev_alias() {
        let cli = parse(&["kairo", "nav", "prev", "--view", "day"]);
        let Some(Command::Nav { direction, .. }) = cli.command else {
            panic!("expected nav");
        };
        assert_eq!(direction.direction(), Some(NavDirection::Previous));
        assert!(GlobalCli::try_parse_from(["kairo", "nav", "sideways"]).is_err());
    }

    #[test]
    fn dashboard_takes_no_arguments() {
        assert_eq!(parse(&["kairo", "dashboard", "--json"]).command, Some(Command::Dashboard));
        assert!(GlobalCli::try_parse_from(["kairo", "dashboard", "today"]).is_err());
    }

    #[test]
    fn position_takes_window_flags() {
        let cli = parse(&["kairo", "position", "09:00", "10:00", "--day-end", "24:00"]);
        assert_eq!(
            cli.command,
            Some(Command::Position {
                start: "09:00".to_string(),
                end: "10:00".to_string(),
                day_start: None,
                day_end: Some("24:00".to_string()),
            })
        );
    }
}
