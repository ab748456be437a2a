//! Broadcast tally and the operator-facing progress text.

use serde::Serialize;

use crate::messaging::DeliveryOutcome;

/// Sent to the operator when a broadcast starts; becomes the progress message.
pub const START_MARKER: &str = "**🔎**";

/// Final revision of the progress message after a systemic fault.
pub const FAILURE_TEXT: &str = "FAILED TO BROADCAST";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastStats {
    pub total: usize,
    pub success: usize,
    pub blocked: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl BroadcastStats {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Success => self.success += 1,
            DeliveryOutcome::Blocked => self.blocked += 1,
            DeliveryOutcome::Deleted => self.deleted += 1,
            DeliveryOutcome::Failed => self.failed += 1,
        }
    }

    pub fn processed(&self) -> usize {
        self.success + self.blocked + self.deleted + self.failed
    }

    pub fn is_complete(&self) -> bool {
        self.processed() == self.total
    }
}

pub fn format_progress(stats: &BroadcastStats) -> String {
    format!(
        "📊 **User Stats Summary**\n\
         \n\
         👥 **Total Users:** {}\n\
         \n\
         🟢 **Success:** {}\n\
         🚫 **Blocked:** {}\n\
         ❌ **Deleted:** {}\n\
         ⚠️ **Failed:** {}\n\
         \n\
         Keep up the great work! 💪",
        stats.total, stats.success, stats.blocked, stats.deleted, stats.failed
    )
}
