//! Choosing which anonymized answer a student reviews.
//!
//! The reviewer sees a random peer whose choice is reviewable: a real
//! compromise option submitted within the countdown. With no such peer the
//! reviewer's own answer is shown instead, and failing that the selection
//! reports that nothing is available. Choices are not persisted, so asking
//! twice may yield different peers.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;

use super::option::CompromiseOption;
use super::student::Student;

pub const NO_VALID_OPTIONS: &str = "No valid options available.";
pub const NO_VALID_OPTIONS_EXPLANATION: &str =
    "No valid options were selected within the time limit.";
pub const PEER_EXPLANATION_PLACEHOLDER: &str = "No explanation provided by this student.";
pub const OWN_EXPLANATION_PLACEHOLDER: &str = "Your explanation for this choice.";

/// What the reviewing student already knows about their own answer
#[derive(Debug, Clone, Default)]
pub struct ReviewRequest {
    pub student_id: String,
    pub option: Option<CompromiseOption>,
    pub custom_option: Option<String>,
    pub explanation: Option<String>,
}

/// Where the displayed answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionSource {
    Peer,
    Own,
    None,
}

/// The answer shown on the review screen
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerSelection {
    pub source: SelectionSource,
    /// Student whose answer is shown; critiques are filed against this id
    pub student_id: Option<String>,
    pub option: Option<CompromiseOption>,
    pub display_option: String,
    pub explanation: String,
    pub custom_option: String,
    pub no_valid_options: bool,
}

impl PeerSelection {
    fn from_peer(peer: &Student) -> Self {
        Self {
            source: SelectionSource::Peer,
            student_id: Some(peer.student_id.clone()),
            option: peer.option,
            display_option: peer.option.map(|o| o.display_text()).unwrap_or_default().to_string(),
            explanation: peer
                .response
                .clone()
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| PEER_EXPLANATION_PLACEHOLDER.to_string()),
            custom_option: peer.custom_option.clone().unwrap_or_default(),
            no_valid_options: false,
        }
    }

    fn own(request: &ReviewRequest, option: CompromiseOption) -> Self {
        Self {
            source: SelectionSource::Own,
            student_id: Some(request.student_id.clone()),
            option: Some(option),
            display_option: option.display_text().to_string(),
            explanation: request
                .explanation
                .clone()
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| OWN_EXPLANATION_PLACEHOLDER.to_string()),
            custom_option: request.custom_option.clone().unwrap_or_default(),
            no_valid_options: false,
        }
    }

    fn none() -> Self {
        Self {
            source: SelectionSource::None,
            student_id: None,
            option: None,
            display_option: NO_VALID_OPTIONS.to_string(),
            explanation: NO_VALID_OPTIONS_EXPLANATION.to_string(),
            custom_option: String::new(),
            no_valid_options: true,
        }
    }
}

/// Pick the answer a reviewer should critique.
///
/// Fields missing from `request` are filled from the reviewer's stored
/// record. A reviewer with no stored record counts as within the timer.
pub fn select_peer<R: Rng + ?Sized>(
    students: &[Student],
    request: &ReviewRequest,
    rng: &mut R,
) -> PeerSelection {
    let me = students.iter().find(|s| s.student_id == request.student_id);

    let candidates: Vec<&Student> = students
        .iter()
        .filter(|s| s.student_id != request.student_id)
        .filter(|s| s.is_reviewable())
        .collect();

    if let Some(peer) = candidates.choose(rng) {
        tracing::debug!(
            reviewer = %request.student_id,
            peer = %peer.student_id,
            pool = candidates.len(),
            "selected peer answer"
        );
        return PeerSelection::from_peer(peer);
    }

    let mut resolved = request.clone();
    if let Some(me) = me {
        resolved.option = resolved.option.or(me.option);
        resolved.custom_option = resolved.custom_option.or_else(|| me.custom_option.clone());
        resolved.explanation = resolved.explanation.or_else(|| me.response.clone());
    }
    let within_timer = me.map_or(true, |m| m.within_timer);

    match resolved.option {
        Some(option) if option.is_reviewable() && within_timer => {
            PeerSelection::own(&resolved, option)
        }
        _ => PeerSelection::none(),
    }
}
