//! # Mirror State

use std::fmt;

use serde::Serialize;

/// Lifecycle of a mirror.
///
/// `Uninitialized -> Initializing -> Live -> TornDown`. A failed
/// initialization falls back to `Uninitialized`; `TornDown` can be
/// initialized again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorState {
    /// Created, never populated (or last initialization failed)
    Uninitialized,
    /// Subscription opened, initial fetch in flight
    Initializing,
    /// Populated and following the change feed
    Live,
    /// Explicitly torn down
    TornDown,
}

impl MirrorState {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MirrorState::Uninitialized => "uninitialized",
            MirrorState::Initializing => "initializing",
            MirrorState::Live => "live",
            MirrorState::TornDown => "torn_down",
        }
    }
}

impl fmt::Display for MirrorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_names_match_display() {
        for state in [
            MirrorState::Uninitialized,
            MirrorState::Initializing,
            MirrorState::Live,
            MirrorState::TornDown,
        ] {
            assert_eq!(serde_json::to_value(state).unwrap(), state.to_string());
        }
    }
}
