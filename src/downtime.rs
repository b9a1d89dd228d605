// Downtime tracking: UP/DOWN state machine over connectivity results.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeDelta};

use crate::event_log::EventLog;

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    WentDown {
        at: DateTime<Local>,
    },
    Restored {
        at: DateTime<Local>,
        downtime: TimeDelta,
    },
}

pub struct DowntimeTracker {
    /// Onset of the current outage; `None` while up.
    onset: Option<DateTime<Local>>,
    event_log: Arc<EventLog>,
}

impl DowntimeTracker {
    pub fn new(event_log: Arc<EventLog>) -> Self {
        Self {
            onset: None,
            event_log,
        }
    }

    /// Feeds one connectivity result observed at `now`. Repeated identical results do nothing.
    pub fn observe(&mut self, available: bool, now: DateTime<Local>) -> Option<Transition> {
        match (self.onset, available) {
            (None, false) => {
                self.onset = Some(now);
                self.event_log.critical("INTERNET DOWN - Initial detection");
                Some(Transition::WentDown { at: now })
            }
            (Some(onset), true) => {
                let downtime = (now - onset).max(TimeDelta::zero());
                self.onset = None;
                self.event_log.info(format!(
                    "INTERNET RESTORED after {}",
                    format_downtime(downtime)
                ));
                Some(Transition::Restored { at: now, downtime })
            }
            _ => None,
        }
    }

    pub fn last_down(&self) -> Option<DateTime<Local>> {
        self.onset
    }

    pub fn is_down(&self) -> bool {
        self.onset.is_some()
    }
}

/// `H:MM:SS`, hours unbounded.
pub fn format_downtime(downtime: TimeDelta) -> String {
    let secs = downtime.num_seconds().max(0);
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
