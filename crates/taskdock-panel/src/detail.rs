use chrono::NaiveDate;

use taskdock_domain::calendar;
use taskdock_domain::{Assignees, Task};

/// Plain-text detail view of a task, one field per line. Absent fields do not
/// produce lines, so the shortest output is the bare title.
pub fn detail_text(task: &Task, today: NaiveDate) -> String {
    let mut lines = vec![task.title.clone()];

    let details = task.details.as_ref();
    let start = details.and_then(|details| details.start_date);
    let end = details
        .and_then(|details| details.end_date)
        .or(task.due_date);
    match (start, end) {
        (Some(start), Some(end)) => lines.push(format!(
            "{} - {}",
            detail_date(start, today),
            detail_date(end, today)
        )),
        (None, Some(end)) => lines.push(format!("Due: {}", detail_date(end, today))),
        _ => {}
    }

    if let Some(progress) = details.and_then(|details| details.progress) {
        if progress > 0 {
            lines.push(format!("Progress: {progress}%"));
        }
    }
    if let Some(minutes) = details.and_then(|details| details.estimated_minutes) {
        if minutes > 0 {
            lines.push(format!("Estimate: {}", humanize_minutes(minutes)));
        }
    }
    // Unassigned tasks skip the line entirely, so the label never renders.
    if task.assignees != Assignees::Unassigned {
        lines.push(format!("People: {}", task.assignees.display("")));
    }

    if let Some(description) = details.and_then(|details| details.description.as_deref()) {
        if !description.trim().is_empty() {
            lines.push(String::new());
            lines.push(description.to_owned());
        }
    }

    lines.join("\n")
}

/// The detail view keeps the calendar words but drops the urgency marker.
fn detail_date(date: NaiveDate, today: NaiveDate) -> String {
    calendar::calendar_label(date, today)
        .trim_start_matches("❗️")
        .to_owned()
}

/// Rounds a minute count to the nearest conversational unit.
pub fn humanize_minutes(minutes: u32) -> String {
    if minutes <= 1 {
        return "a minute".to_owned();
    }
    if minutes < 45 {
        return format!("{minutes} minutes");
    }
    if minutes < 90 {
        return "an hour".to_owned();
    }
    let hours = (minutes + 30) / 60;
    if hours < 22 {
        return format!("{hours} hours");
    }
    if hours < 36 {
        return "a day".to_owned();
    }
    let days = (hours + 12) / 24;
    format!("{days} days")
}
