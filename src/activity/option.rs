//! The four fixed compromise options a student can choose from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LimitlabError;

/// A student's answer to the stated experimental limitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CompromiseOption {
    /// Abandon the experiment. Never shown to peers.
    #[serde(rename = "Set this experiment aside.")]
    SetAside,
    /// Run a pilot study first
    #[serde(rename = "Compromise option 1.")]
    PilotStudy,
    /// Estimate regions computationally
    #[serde(rename = "Compromise option 2.")]
    EstimateRegions,
    /// Free-text option; requires a custom description
    #[serde(rename = "Other.")]
    Other,
}

impl CompromiseOption {
    /// All options in dashboard tab order
    pub const ALL: [CompromiseOption; 4] = [
        CompromiseOption::SetAside,
        CompromiseOption::PilotStudy,
        CompromiseOption::EstimateRegions,
        CompromiseOption::Other,
    ];

    /// The exact string stored and accepted on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            CompromiseOption::SetAside => "Set this experiment aside.",
            CompromiseOption::PilotStudy => "Compromise option 1.",
            CompromiseOption::EstimateRegions => "Compromise option 2.",
            CompromiseOption::Other => "Other.",
        }
    }

    /// Short label used for the results chart bars
    pub fn chart_label(&self) -> &'static str {
        match self {
            CompromiseOption::SetAside => "Set aside",
            CompromiseOption::PilotStudy => "Pilot study",
            CompromiseOption::EstimateRegions => "Estimate Regions",
            CompromiseOption::Other => "Other",
        }
    }

    /// Text shown to a reviewer. "Other." loses its trailing period.
    pub fn display_text(&self) -> &'static str {
        match self {
            CompromiseOption::Other => "Other",
            other => other.as_str(),
        }
    }

    /// Whether a choice of this option can be shown to a peer
    pub fn is_reviewable(&self) -> bool {
        !matches!(self, CompromiseOption::SetAside)
    }

    fn valid_list() -> String {
        Self::ALL
            .iter()
            .map(|o| o.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for CompromiseOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompromiseOption {
    type Err = LimitlabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| {
                LimitlabError::Validation(format!(
                    "Invalid option. Must be one of: {}",
                    Self::valid_list()
                ))
            })
    }
}
