//! Badge mapping for ticket status and priority.
//!
//! Pure presentation metadata: every status and priority value maps to a
//! stable label and tone so each client renders the same tag. No transition
//! logic lives here.

use serde::{Deserialize, Serialize};

use crate::domain::ticket::{TicketPriority, TicketStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTone {
    Neutral,
    Info,
    Success,
    Warning,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub label: &'static str,
    pub tone: BadgeTone,
}

pub fn status_badge(status: TicketStatus) -> Badge {
    match status {
        TicketStatus::Draft => Badge { label: "Draft", tone: BadgeTone::Neutral },
        TicketStatus::Submitted => Badge { label: "Submitted", tone: BadgeTone::Info },
        TicketStatus::Approved => Badge { label: "Approved", tone: BadgeTone::Success },
        TicketStatus::Rejected => Badge { label: "Rejected", tone: BadgeTone::Danger },
        TicketStatus::InProgress => Badge { label: "In Progress", tone: BadgeTone::Info },
        TicketStatus::Completed => Badge { label: "Completed", tone: BadgeTone::Success },
        TicketStatus::Cancelled => Badge { label: "Cancelled", tone: BadgeTone::Neutral },
    }
}

pub fn priority_badge(priority: TicketPriority) -> Badge {
    match priority {
        TicketPriority::Critical => Badge { label: "Critical", tone: BadgeTone::Danger },
        TicketPriority::High => Badge { label: "High", tone: BadgeTone::Warning },
        TicketPriority::Medium => Badge { label: "Medium", tone: BadgeTone::Info },
        TicketPriority::Low => Badge { label: "Low", tone: BadgeTone::Neutral },
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::ticket::{TicketPriority, TicketStatus};

    use super::{priority_badge, status_badge, BadgeTone};

    #[test]
    fn every_status_has_a_distinct_label() {
        let statuses = [
            TicketStatus::Draft,
            TicketStatus::Submitted,
            TicketStatus::Approved,
            TicketStatus::Rejected,
            TicketStatus::InProgress,
            TicketStatus::Completed,
            TicketStatus::Cancelled,
        ];

        let labels: Vec<&str> = statuses.iter().map(|s| status_badge(*s).label).collect();
        let mut deduped = labels.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), labels.len());
    }

    #[test]
    fn critical_priority_renders_as_danger() {
        assert_eq!(priority_badge(TicketPriority::Critical).tone, BadgeTone::Danger);
        assert_eq!(priority_badge(TicketPriority::Low).tone, BadgeTone::Neutral);
    }

    #[test]
    fn queue_relevant_status_is_informational() {
        assert_eq!(status_badge(TicketStatus::Submitted).tone, BadgeTone::Info);
        assert_eq!(status_badge(TicketStatus::Submitted).label, "Submitted");
    }
}
