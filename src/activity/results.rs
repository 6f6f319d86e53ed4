//! Results dashboard: option chart plus per-critique table rows.

use serde::Serialize;

use super::option::CompromiseOption;
use super::student::Student;

/// One bar of the option chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartEntry {
    pub name: &'static str,
    pub option: CompromiseOption,
    pub value: usize,
}

/// One table row; a student yields one row per critique received
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    pub explanation: String,
    pub limit_explanation: String,
    pub custom_option: String,
    pub student_id: String,
}

/// Counts for all four options, in tab order, zeros included
pub fn option_chart(students: &[Student]) -> Vec<ChartEntry> {
    CompromiseOption::ALL
        .iter()
        .map(|&option| ChartEntry {
            name: option.chart_label(),
            option,
            value: students
                .iter()
                .filter(|s| s.option == Some(option))
                .count(),
        })
        .collect()
}

/// Rows for the students matching `filter`, or every student when `None`
pub fn result_rows(students: &[Student], filter: Option<CompromiseOption>) -> Vec<ResultRow> {
    let mut rows = Vec::new();

    for student in students
        .iter()
        .filter(|s| filter.map_or(true, |f| s.option == Some(f)))
    {
        let explanation = student.response.clone().unwrap_or_default();
        let custom_option = student.custom_option.clone().unwrap_or_default();
        let critiques = student.limit_explanation_list();

        if critiques.is_empty() {
            rows.push(ResultRow {
                explanation,
                limit_explanation: String::new(),
                custom_option,
                student_id: student.student_id.clone(),
            });
            continue;
        }

        for critique in critiques {
            rows.push(ResultRow {
                explanation: explanation.clone(),
                limit_explanation: critique,
                custom_option: custom_option.clone(),
                student_id: student.student_id.clone(),
            });
        }
    }

    rows
}
