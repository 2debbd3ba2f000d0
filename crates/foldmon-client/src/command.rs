//! Commands understood by a client's command port.

use std::fmt;
use std::time::Duration;

/// Heartbeat period of the standard update set.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Which way to drive the log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogUpdates {
    /// Resend the whole log, then stream new lines.
    Restart,
    Start,
    Stop,
}

impl fmt::Display for LogUpdates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restart => write!(f, "restart"),
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
        }
    }
}

/// One command line.
///
/// `Display` renders the line without its trailing newline; the connection
/// adds that when sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Auth { password: String },
    Info,
    Options,
    SlotInfo,
    QueueInfo,
    SimulationInfo { slot: u32 },
    SlotOptions { slot: u32 },
    LogUpdates(LogUpdates),
    /// Ask the client to rerun `command` every `interval_secs`.
    UpdatesAdd {
        id: u32,
        interval_secs: u64,
        command: Box<Command>,
    },
    UpdatesClear,
    /// Pause one slot, or every slot when `slot` is `None`.
    Pause { slot: Option<u32> },
    Unpause { slot: Option<u32> },
    Finish { slot: Option<u32> },
    Heartbeat,
    Exit,
}

impl Command {
    /// Schedule `command` as a periodic update.
    pub fn every(id: u32, interval: Duration, command: Command) -> Self {
        Self::UpdatesAdd {
            id,
            interval_secs: interval.as_secs().max(1),
            command: Box::new(command),
        }
    }

    /// Commands that subscribe to the usual status feeds.
    ///
    /// Clears existing subscriptions, restarts the log and schedules
    /// heartbeat, info, options, slot and queue updates.
    pub fn standard_updates(interval: Duration) -> Vec<Command> {
        vec![
            Command::UpdatesClear,
            Command::LogUpdates(LogUpdates::Restart),
            Command::every(0, HEARTBEAT_INTERVAL, Command::Heartbeat),
            Command::every(1, interval, Command::Info),
            Command::every(2, interval, Command::Options),
            Command::every(3, interval, Command::SlotInfo),
            Command::every(4, interval, Command::QueueInfo),
        ]
    }
}

fn slot_suffix(f: &mut fmt::Formatter<'_>, verb: &str, slot: Option<u32>) -> fmt::Result {
    match slot {
        Some(slot) => write!(f, "{} {:02}", verb, slot),
        None => write!(f, "{}", verb),
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth { password } => write!(f, "auth {}", password),
            Self::Info => write!(f, "info"),
            Self::Options => write!(f, "options -a"),
            Self::SlotInfo => write!(f, "slot-info"),
            Self::QueueInfo => write!(f, "queue-info"),
            Self::SimulationInfo { slot } => write!(f, "simulation-info {:02}", slot),
            Self::SlotOptions { slot } => write!(f, "slot-options {:02} -a", slot),
            Self::LogUpdates(mode) => write!(f, "log-updates {}", mode),
            Self::UpdatesAdd {
                id,
                interval_secs,
                command,
            } => write!(f, "updates add {} {} ${}", id, interval_secs, command),
            Self::UpdatesClear => write!(f, "updates clear"),
            Self::Pause { slot } => slot_suffix(f, "pause", *slot),
            Self::Unpause { slot } => slot_suffix(f, "unpause", *slot),
            Self::Finish { slot } => slot_suffix(f, "finish", *slot),
            Self::Heartbeat => write!(f, "heartbeat"),
            Self::Exit => write!(f, "exit"),
        }
    }
}
