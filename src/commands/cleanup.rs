use crate::error::Result;
use crate::service::ActivityService;
use colored::Colorize;

/// Run the keysmash cleanup and print a summary
pub fn handle_cleanup(service: &ActivityService, dry_run: bool) -> Result<()> {
    if dry_run {
        println!("{}", "Dry run: nothing will be written.".yellow());
    }

    let report = service.cleanup_keysmash(dry_run)?;

    println!("Sessions processed: {}", report.sessions_processed);
    println!("Students processed: {}", report.students_processed);
    let removed = format!(
        "{} keysmash response(s) in {} session(s)",
        report.students_removed, report.sessions_modified
    );
    if report.students_removed == 0 {
        println!("{}", "No keysmash responses found.".green());
    } else if dry_run {
        println!("Would remove {}", removed.yellow());
    } else {
        println!("Removed {}", removed.green());
    }

    Ok(())
}
