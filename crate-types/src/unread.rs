use core::fmt;

use serde::{Deserialize, Serialize};

/// a server-reported count of unread items for a branch
///
/// created fresh on every poll, projected onto the display, then dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCount {
    pub count: u64,
}

impl UnreadCount {
    /// whether a counter showing this value should be shown at all
    pub fn visible(&self) -> bool {
        self.count > 0
    }
}

impl fmt::Display for UnreadCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.count)
    }
}
