use crate::activity::timer::format_countdown;
use crate::activity::CompromiseOption;
use crate::cli::SessionCommand;
use crate::error::{LimitlabError, Result};
use crate::service::ActivityService;
use colored::Colorize;
use prettytable::{format, Table};

fn short(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

/// Handle session admin commands
pub fn handle_sessions(service: &ActivityService, command: SessionCommand) -> Result<()> {
    match command {
        SessionCommand::List => list_sessions(service),
        SessionCommand::Show { id } => show_session(service, &id),
        SessionCommand::New { session_type } => {
            let session = service.create_session(session_type)?;
            println!(
                "{} {} ({})",
                "Created session".green(),
                session.session_id.cyan(),
                session.session_type
            );
            Ok(())
        }
        SessionCommand::Delete { id, confirm } => delete_sessions(service, id.as_deref(), confirm),
    }
}

fn list_sessions(service: &ActivityService) -> Result<()> {
    let sessions = service.storage().list_sessions()?;

    if sessions.is_empty() {
        println!("{}", "No sessions found.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Type".bold(),
        "Students".bold(),
        "Created".bold(),
        "Last Updated".bold()
    ]);

    for session in sessions {
        table.add_row(prettytable::row![
            session.session_id.cyan(),
            session.session_type,
            session.student_count,
            session.created_at.format("%Y-%m-%d %H:%M"),
            session.updated_at.format("%Y-%m-%d %H:%M")
        ]);
    }

    println!("\nSessions:");
    table.printstd();
    println!();
    println!("Use {} to inspect one.", "limitlab sessions show <ID>".cyan());
    println!();

    Ok(())
}

fn show_session(service: &ActivityService, id: &str) -> Result<()> {
    let session = service.get_session(id)?;
    let analytics = session.analytics();
    let timer = service.timer_status(id)?;

    println!();
    println!("{} {}", "Session".bold(), session.session_id.cyan());
    println!("  Type:     {}", session.session_type);
    println!("  Created:  {}", session.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Updated:  {}", session.updated_at.format("%Y-%m-%d %H:%M:%S"));
    if timer.is_active {
        println!(
            "  Timer:    {} remaining",
            format_countdown(timer.remaining_seconds).green()
        );
    } else if timer.start_time.is_some() {
        println!("  Timer:    {}", "expired".red());
    } else {
        println!("  Timer:    not started ({}s)", timer.duration_seconds);
    }
    println!();

    if session.students.is_empty() {
        println!("{}", "No students in this session.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "Student".bold(),
        "Option".bold(),
        "In time".bold(),
        "Response".bold(),
        "Critiques".bold()
    ]);

    for student in &session.students {
        let option = match (student.option, student.custom_option.as_deref()) {
            (Some(CompromiseOption::Other), Some(custom)) => format!("Other: {}", short(custom, 20)),
            (Some(option), _) => option.chart_label().to_string(),
            (None, _) => "-".to_string(),
        };
        let within = if student.within_timer {
            "yes".green()
        } else {
            "no".red()
        };
        table.add_row(prettytable::row![
            student.student_id.cyan(),
            option,
            within,
            short(student.response.as_deref().unwrap_or("-"), 40),
            student.limit_explanation_list().len()
        ]);
    }
    table.printstd();
    println!();

    println!("{}", "Options".bold());
    for (option, count) in &analytics.option_breakdown {
        println!("  {:<18} {}", option.chart_label(), count);
    }
    println!(
        "{} {}/{} within timer ({}%)",
        "Timer".bold(),
        analytics.timer_stats.within_timer,
        analytics.timer_stats.total,
        analytics.timer_stats.percentage_within_timer
    );
    println!(
        "{} {} with response, average length {}",
        "Responses".bold(),
        analytics.response_stats.with_response,
        analytics.response_stats.average_response_length
    );
    println!();

    Ok(())
}

fn delete_sessions(service: &ActivityService, id: Option<&str>, confirm: bool) -> Result<()> {
    match service.delete(id, confirm) {
        Ok(outcome) => {
            println!("{}", outcome.message.green());
            println!(
                "  Sessions deleted: {}, students deleted: {}",
                outcome.summary.deleted_count, outcome.summary.total_students_deleted
            );
            Ok(())
        }
        Err(err) => match err.downcast_ref::<LimitlabError>() {
            Some(LimitlabError::ConfirmationRequired { warning, .. }) => {
                println!("{}", warning.yellow());
                println!("Re-run with {} to proceed.", "--confirm".cyan());
                Ok(())
            }
            _ => Err(err),
        },
    }
}
