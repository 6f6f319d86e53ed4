//! Student records and the mutations a submit step applies to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::option::CompromiseOption;
use crate::error::{LimitlabError, Result};

/// Prefix shared by the main critique field and its numbered overflow slots
pub const LIMIT_EXPLANATION_FIELD: &str = "limitExplanation";

fn default_within_timer() -> bool {
    true
}

/// One participant's record within a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub student_id: String,
    #[serde(default)]
    pub option: Option<CompromiseOption>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default = "default_within_timer")]
    pub within_timer: bool,
    /// First critique written against this student's choice
    #[serde(default)]
    pub limit_explanation: Option<String>,
    /// Further critiques keyed `limitExplanation1`, `limitExplanation2`, ...
    #[serde(default)]
    pub limit_explanations: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub custom_option: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Which critique slot a [`Student::record_limit_explanation`] call wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitSlot {
    /// Field name, e.g. `limitExplanation` or `limitExplanation2`
    pub field: String,
    /// Slot number, `None` for the main field
    pub number: Option<u32>,
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn trimmed_or_none(value: &str) -> Option<String> {
    let t = value.trim();
    (!t.is_empty()).then(|| t.to_string())
}

/// Leading digits of a numbered slot key; keys without a number sort first.
fn slot_number(key: &str) -> u64 {
    let digits: String = key[LIMIT_EXPLANATION_FIELD.len()..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

impl Student {
    /// Record a critique in the first free slot.
    ///
    /// The main field is used while it is blank; afterwards the lowest
    /// numbered slot whose value is missing or blank is filled. The text is
    /// stored trimmed, and blank text is stored as null.
    pub fn record_limit_explanation(&mut self, text: &str, now: DateTime<Utc>) -> LimitSlot {
        let value = trimmed_or_none(text);
        self.timestamp = now;

        if is_blank(self.limit_explanation.as_deref()) {
            self.limit_explanation = value;
            return LimitSlot {
                field: LIMIT_EXPLANATION_FIELD.to_string(),
                number: None,
            };
        }

        let mut counter = 1u32;
        loop {
            let key = format!("{LIMIT_EXPLANATION_FIELD}{counter}");
            let occupied = self
                .limit_explanations
                .get(&key)
                .is_some_and(|v| !is_blank(v.as_deref()));
            if !occupied {
                self.limit_explanations.insert(key.clone(), value);
                return LimitSlot {
                    field: key,
                    number: Some(counter),
                };
            }
            counter += 1;
        }
    }

    /// All non-blank critiques: the main field first, then numbered slots
    /// in numeric order.
    pub fn limit_explanation_list(&self) -> Vec<String> {
        let mut out = Vec::new();

        if let Some(main) = self.limit_explanation.as_deref() {
            if !main.trim().is_empty() {
                out.push(main.to_string());
            }
        }

        let mut keys: Vec<&String> = self
            .limit_explanations
            .keys()
            .filter(|k| k.starts_with(LIMIT_EXPLANATION_FIELD))
            .collect();
        keys.sort_by_key(|k| slot_number(k));

        for key in keys {
            if let Some(Some(value)) = self.limit_explanations.get(key) {
                if !value.trim().is_empty() {
                    out.push(value.clone());
                }
            }
        }

        out
    }

    /// Whether the student wrote a non-blank response
    pub fn has_response(&self) -> bool {
        !is_blank(self.response.as_deref())
    }

    /// Whether peers may be shown this student's choice
    pub fn is_reviewable(&self) -> bool {
        self.within_timer && self.option.is_some_and(|o| o.is_reviewable())
    }
}

/// Body of a submit step, before validation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSubmission {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub option: Option<String>,
    #[serde(default)]
    pub custom_option: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub within_timer: Option<bool>,
    #[serde(default)]
    pub limit_explanation: Option<String>,
}

/// A submission that passed validation
#[derive(Debug, Clone)]
pub struct ValidSubmission {
    pub session_id: String,
    pub student_id: String,
    pub option: Option<CompromiseOption>,
    pub custom_option: Option<String>,
    pub response: Option<String>,
    pub within_timer: Option<bool>,
    pub limit_explanation: Option<String>,
}

impl StudentSubmission {
    /// Check required ids, the option enum, and the Other/customOption pairing.
    ///
    /// A blank `option` is treated as absent.
    pub fn validate(self) -> Result<ValidSubmission> {
        let session_id = self.session_id.filter(|s| !s.trim().is_empty());
        let student_id = self.student_id.filter(|s| !s.trim().is_empty());
        let (Some(session_id), Some(student_id)) = (session_id, student_id) else {
            return Err(LimitlabError::Validation(
                "Missing required fields: sessionId and studentId are required".to_string(),
            )
            .into());
        };

        let option = match self.option.as_deref() {
            None => None,
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(raw.parse::<CompromiseOption>()?),
        };

        if option == Some(CompromiseOption::Other) && is_blank(self.custom_option.as_deref()) {
            return Err(LimitlabError::Validation(
                "customOption is required when option is \"Other.\"".to_string(),
            )
            .into());
        }

        Ok(ValidSubmission {
            session_id,
            student_id,
            option,
            custom_option: self.custom_option,
            response: self.response,
            within_timer: self.within_timer,
            limit_explanation: self.limit_explanation,
        })
    }
}

impl ValidSubmission {
    /// True when the request carries a critique but no choice or reasoning.
    /// Such requests may only target an existing student.
    pub fn is_explanation_only(&self) -> bool {
        self.option.is_none()
            && self.response.as_deref().map_or(true, str::is_empty)
            && self
                .limit_explanation
                .as_deref()
                .is_some_and(|s| !s.is_empty())
    }

    /// Names of the fields this request sets, in response order
    pub fn updated_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.option.is_some() {
            fields.push("option");
        }
        if self.response.is_some() {
            fields.push("response");
        }
        if self.limit_explanation.is_some() {
            fields.push("limitExplanation");
        }
        if self.custom_option.is_some() {
            fields.push("customOption");
        }
        if self.within_timer.is_some() {
            fields.push("withinTimer");
        }
        fields
    }

    fn custom_option_for(&self, option: CompromiseOption) -> Option<String> {
        if option != CompromiseOption::Other {
            return None;
        }
        self.custom_option.as_deref().and_then(trimmed_or_none)
    }

    /// Build a fresh student record from this submission
    pub fn new_student(&self, now: DateTime<Utc>) -> Student {
        Student {
            student_id: self.student_id.clone(),
            option: self.option,
            response: self.response.clone().filter(|r| !r.is_empty()),
            within_timer: self.within_timer.unwrap_or(true),
            limit_explanation: self.limit_explanation.clone().filter(|s| !s.is_empty()),
            limit_explanations: BTreeMap::new(),
            custom_option: self.option.and_then(|o| self.custom_option_for(o)),
            timestamp: now,
        }
    }

    /// Overwrite only the fields present in this submission
    pub fn apply_to(&self, student: &mut Student, now: DateTime<Utc>) {
        if let Some(option) = self.option {
            student.option = Some(option);
            student.custom_option = match option {
                CompromiseOption::Other => self
                    .custom_option_for(option)
                    .or(student.custom_option.take()),
                _ => None,
            };
        }
        if let Some(response) = &self.response {
            student.response = Some(response.clone());
        }
        if let Some(within) = self.within_timer {
            student.within_timer = within;
        }
        if let Some(explanation) = &self.limit_explanation {
            student.limit_explanation = trimmed_or_none(explanation);
        }
        student.timestamp = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn bare_student(id: &str) -> Student {
        Student {
            student_id: id.to_string(),
            option: Some(CompromiseOption::PilotStudy),
            response: Some("run a pilot".to_string()),
            within_timer: true,
            limit_explanation: None,
            limit_explanations: BTreeMap::new(),
            custom_option: None,
            timestamp: t0(),
        }
    }

    fn submission(option: Option<&str>, custom: Option<&str>) -> StudentSubmission {
        StudentSubmission {
            session_id: Some("s1".to_string()),
            student_id: Some("alice".to_string()),
            option: option.map(String::from),
            custom_option: custom.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_explanation_goes_to_main_field() {
        let mut s = bare_student("a");
        let slot = s.record_limit_explanation("  too few samples  ", t0());
        assert_eq!(slot.field, "limitExplanation");
        assert_eq!(slot.number, None);
        assert_eq!(s.limit_explanation.as_deref(), Some("too few samples"));
    }

    #[test]
    fn test_explanations_fill_numbered_slots_in_order() {
        let mut s = bare_student("a");
        s.record_limit_explanation("one", t0());
        let second = s.record_limit_explanation("two", t0());
        let third = s.record_limit_explanation("three", t0());
        assert_eq!(second.field, "limitExplanation1");
        assert_eq!(second.number, Some(1));
        assert_eq!(third.field, "limitExplanation2");
        assert_eq!(
            s.limit_explanation_list(),
            vec!["one".to_string(), "two".to_string(), "three".to_string()]
        );
    }

    #[test]
    fn test_blank_slot_is_reused() {
        let mut s = bare_student("a");
        s.limit_explanation = Some("main".to_string());
        s.limit_explanations
            .insert("limitExplanation1".to_string(), Some("x".to_string()));
        s.limit_explanations
            .insert("limitExplanation2".to_string(), Some("   ".to_string()));
        s.limit_explanations
            .insert("limitExplanation3".to_string(), Some("y".to_string()));

        let slot = s.record_limit_explanation("filled gap", t0());
        assert_eq!(slot.number, Some(2));
        assert_eq!(
            s.limit_explanations.get("limitExplanation2"),
            Some(&Some("filled gap".to_string()))
        );
    }

    #[test]
    fn test_blank_main_field_is_overwritten_first() {
        let mut s = bare_student("a");
        s.limit_explanation = Some(" ".to_string());
        s.limit_explanations
            .insert("limitExplanation1".to_string(), Some("kept".to_string()));
        let slot = s.record_limit_explanation("new", t0());
        assert_eq!(slot.number, None);
        assert_eq!(s.limit_explanation.as_deref(), Some("new"));
    }

    #[test]
    fn test_blank_critique_stores_null() {
        let mut s = bare_student("a");
        s.record_limit_explanation("   ", t0());
        assert_eq!(s.limit_explanation, None);
        assert!(s.limit_explanation_list().is_empty());
    }

    #[test]
    fn test_list_sorts_numerically_not_lexically() {
        let mut s = bare_student("a");
        for n in [10, 2, 1] {
            s.limit_explanations.insert(
                format!("limitExplanation{n}"),
                Some(format!("critique {n}")),
            );
        }
        s.limit_explanations
            .insert("unrelated".to_string(), Some("ignored".to_string()));
        assert_eq!(
            s.limit_explanation_list(),
            vec![
                "critique 1".to_string(),
                "critique 2".to_string(),
                "critique 10".to_string()
            ]
        );
    }

    #[test]
    fn test_deserialize_defaults_within_timer_true() {
        let json = r#"{"studentId":"bob","timestamp":"2025-03-01T09:00:00Z"}"#;
        let s: Student = serde_json::from_str(json).unwrap();
        assert!(s.within_timer);
        assert!(s.option.is_none());
        assert!(s.limit_explanations.is_empty());
    }

    #[test]
    fn test_serialize_uses_camel_case() {
        let json = serde_json::to_value(bare_student("a")).unwrap();
        assert_eq!(json["studentId"], "a");
        assert_eq!(json["withinTimer"], true);
        assert_eq!(json["option"], "Compromise option 1.");
        assert!(json["customOption"].is_null());
    }

    #[test]
    fn test_validate_requires_ids() {
        let sub = StudentSubmission {
            session_id: Some("s1".to_string()),
            student_id: Some("  ".to_string()),
            ..Default::default()
        };
        let err = sub.validate().unwrap_err();
        assert!(err.to_string().contains("sessionId and studentId are required"));
    }

    #[test]
    fn test_validate_rejects_unknown_option() {
        let err = submission(Some("Maybe."), None).validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LimitlabError>(),
            Some(LimitlabError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_padded_option() {
        assert!(submission(Some(" Other."), Some("idea")).validate().is_err());
        assert!(submission(Some("Compromise option 1. "), None)
            .validate()
            .is_err());
        assert!(submission(Some("Compromise option 1."), None)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_validate_other_requires_custom_option() {
        assert!(submission(Some("Other."), None).validate().is_err());
        assert!(submission(Some("Other."), Some("   ")).validate().is_err());
        assert!(submission(Some("Other."), Some("my idea")).validate().is_ok());
    }

    #[test]
    fn test_validate_treats_blank_option_as_absent() {
        let valid = submission(Some(""), None).validate().unwrap();
        assert!(valid.option.is_none());
        let valid = submission(Some("   "), None).validate().unwrap();
        assert!(valid.option.is_none());
    }

    #[test]
    fn test_explanation_only_detection() {
        let mut sub = submission(None, None);
        sub.limit_explanation = Some("critique".to_string());
        assert!(sub.clone().validate().unwrap().is_explanation_only());

        sub.response = Some("reasoning".to_string());
        assert!(!sub.validate().unwrap().is_explanation_only());
    }

    #[test]
    fn test_new_student_defaults() {
        let mut sub = submission(Some("Other."), Some("  hybrid  "));
        sub.response = Some(String::new());
        let student = sub.validate().unwrap().new_student(t0());
        assert!(student.within_timer);
        assert_eq!(student.response, None);
        assert_eq!(student.custom_option.as_deref(), Some("hybrid"));
    }

    #[test]
    fn test_new_student_drops_custom_option_for_non_other() {
        let sub = submission(Some("Compromise option 2."), Some("ignored"));
        let student = sub.validate().unwrap().new_student(t0());
        assert_eq!(student.custom_option, None);
    }

    #[test]
    fn test_apply_switching_away_from_other_clears_custom_option() {
        let mut student = bare_student("alice");
        student.option = Some(CompromiseOption::Other);
        student.custom_option = Some("hybrid".to_string());

        let valid = submission(Some("Compromise option 1."), None)
            .validate()
            .unwrap();
        valid.apply_to(&mut student, t0());
        assert_eq!(student.option, Some(CompromiseOption::PilotStudy));
        assert_eq!(student.custom_option, None);
    }

    #[test]
    fn test_apply_only_touches_present_fields() {
        let mut student = bare_student("alice");
        let mut sub = submission(None, None);
        sub.within_timer = Some(false);
        let later = t0() + chrono::Duration::seconds(30);
        sub.validate().unwrap().apply_to(&mut student, later);

        assert!(!student.within_timer);
        assert_eq!(student.option, Some(CompromiseOption::PilotStudy));
        assert_eq!(student.response.as_deref(), Some("run a pilot"));
        assert_eq!(student.timestamp, later);
    }

    #[test]
    fn test_updated_fields_order() {
        let mut sub = submission(Some("Other."), Some("x"));
        sub.response = Some("r".to_string());
        sub.within_timer = Some(true);
        assert_eq!(
            sub.validate().unwrap().updated_fields(),
            vec!["option", "response", "customOption", "withinTimer"]
        );
    }

    #[test]
    fn test_reviewable_requires_option_and_timer() {
        let mut s = bare_student("a");
        assert!(s.is_reviewable());
        s.within_timer = false;
        assert!(!s.is_reviewable());
        s.within_timer = true;
        s.option = Some(CompromiseOption::SetAside);
        assert!(!s.is_reviewable());
        s.option = None;
        assert!(!s.is_reviewable());
    }
}
