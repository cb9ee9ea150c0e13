//! Severity labels and their priority ranks.

/// Trigger severity as reported in the alert body. Priority ranks follow the
/// tracker convention where a lower id means a higher priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    NotClassified,
    Information,
    Warning,
    Average,
    High,
    Disaster,
}

impl Severity {
    /// Maps the severity label embedded in the alert body. Unrecognized labels
    /// return `None`; callers fall back to [`Severity::NotClassified`].
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Not classified" => Some(Self::NotClassified),
            "Information" => Some(Self::Information),
            "Warning" => Some(Self::Warning),
            "Average" => Some(Self::Average),
            "High" => Some(Self::High),
            "Disaster" => Some(Self::Disaster),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NotClassified => "Not classified",
            Self::Information => "Information",
            Self::Warning => "Warning",
            Self::Average => "Average",
            Self::High => "High",
            Self::Disaster => "Disaster",
        }
    }

    /// Tracker priority id for this severity. `Disaster` maps to the highest
    /// rank ("1"); unclassified and informational alerts share the lowest.
    pub fn priority_id(self) -> &'static str {
        match self {
            Self::NotClassified | Self::Information => "5",
            Self::Warning => "4",
            Self::Average => "3",
            Self::High => "2",
            Self::Disaster => "1",
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::NotClassified
    }
}
