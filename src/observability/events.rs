//! Observable mirror events
//!
//! Events are explicit and typed; each carries its own severity.

use std::fmt;

use super::logger::Severity;

/// Observable events in a mirror's life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// `initialize` started
    InitStart,
    /// `initialize` called on a live mirror
    InitReentry,
    /// Initial fetch applied, pump running
    Live,
    /// Teardown raced an in-flight initialize
    InitCancelled,
    /// Mirror torn down
    Teardown,

    // Change feed
    /// Change feed opened
    FeedOpened,
    /// Change feed could not be opened
    FeedOpenFailed,
    /// Change feed closed by the publisher
    FeedClosed,
    /// Unsubscribe failed
    FeedCloseFailed,

    // Initial fetch
    /// Full fetch failed
    FetchFailed,

    // Change application
    /// Change applied to the mirror
    ChangeApplied,
    /// Change already reflected by the initial fetch
    ChangeStale,
    /// Change ignored (mirror not live)
    ChangeIgnored,
    /// Row or change failed to decode
    DecodeFailed,

    // Mutations
    /// Mutation sent to the remote
    MutationSubmitted,
    /// Remote accepted the mutation
    MutationAccepted,
    /// Mutation failed
    MutationRejected,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::InitStart => "MIRROR_INIT_BEGIN",
            Event::InitReentry => "MIRROR_INIT_REENTRY",
            Event::Live => "MIRROR_LIVE",
            Event::InitCancelled => "MIRROR_INIT_CANCELLED",
            Event::Teardown => "MIRROR_TEARDOWN",

            Event::FeedOpened => "FEED_OPENED",
            Event::FeedOpenFailed => "FEED_OPEN_FAILED",
            Event::FeedClosed => "FEED_CLOSED",
            Event::FeedCloseFailed => "FEED_CLOSE_FAILED",

            Event::FetchFailed => "FETCH_FAILED",

            Event::ChangeApplied => "CHANGE_APPLIED",
            Event::ChangeStale => "CHANGE_STALE",
            Event::ChangeIgnored => "CHANGE_IGNORED",
            Event::DecodeFailed => "DECODE_FAILED",

            Event::MutationSubmitted => "MUTATION_BEGIN",
            Event::MutationAccepted => "MUTATION_COMPLETE",
            Event::MutationRejected => "MUTATION_REJECTED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::ChangeApplied | Event::ChangeStale | Event::ChangeIgnored => Severity::Trace,
            Event::MutationSubmitted | Event::MutationAccepted => Severity::Trace,
            Event::FeedClosed | Event::FeedCloseFailed | Event::DecodeFailed | Event::InitCancelled => {
                Severity::Warn
            }
            Event::FetchFailed | Event::FeedOpenFailed | Event::MutationRejected => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
