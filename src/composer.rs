//! Reminder subject/body templates.
//!
//! Composition is deterministic: the same task always yields the same
//! subject and body.

use std::fmt::Write as _;

use crate::models::reminder::ReminderMessage;
use crate::models::task::{Priority, Task};

/// Marker prefixed to the subject line.
#[must_use]
pub fn priority_marker(priority: &Priority) -> &'static str {
    match priority {
        Priority::High => "\u{1f534}",
        Priority::Medium => "\u{1f7e1}",
        Priority::Low => "\u{1f7e2}",
        Priority::Unrecognized(_) => "\u{1f4cc}",
    }
}

/// Human-readable priority label used in the body.
#[must_use]
pub fn priority_label(priority: &Priority) -> &'static str {
    match priority {
        Priority::High => "HIGH PRIORITY",
        Priority::Medium => "Medium priority",
        Priority::Low => "Low priority",
        Priority::Unrecognized(_) => "Undefined",
    }
}

/// Subject line for a task reminder.
#[must_use]
pub fn subject(task: &Task) -> String {
    format!(
        "{} Reminder: \"{}\" is due today!",
        priority_marker(&task.priority),
        task.title
    )
}

/// Plain-text body for a task reminder.
#[must_use]
pub fn body(task: &Task) -> String {
    let mut body = String::from("Hello!\n\n");
    // Writing into a String cannot fail.
    let _ = write!(
        body,
        "This is a reminder that your task \"{}\" is due today ({}).\n\n",
        task.title,
        task.due_date.format("%Y-%m-%d")
    );

    if let Some(description) = task
        .description
        .as_deref()
        .filter(|text| !text.trim().is_empty())
    {
        let _ = write!(body, "Description: {description}\n\n");
    }

    let _ = write!(body, "Priority: {}\n\n", priority_label(&task.priority));
    body.push_str("\u{1f4a1} Tip: work in focused blocks to keep momentum.\n\n");
    body.push_str("Good luck! \u{1f393}\n");
    body.push_str("Task Reminders");
    body
}

/// Build the reminder message for one task.
#[must_use]
pub fn compose(task: &Task) -> ReminderMessage {
    ReminderMessage {
        recipient: task.recipient.clone(),
        subject: subject(task),
        body: body(task),
        task_id: task.id.clone(),
        task_title: task.title.clone(),
    }
}

/// Wrap a composed reminder in a standalone HTML document for mail clients
/// that prefer rich content.
#[must_use]
pub fn render_html(subject: &str, body: &str) -> String {
    let subject = escape_html(subject);
    let body = escape_html(body).replace('\n', "<br>\n");
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>{subject}</title>\n\
         <style>\n\
         body {{ font-family: 'Segoe UI', Tahoma, Verdana, sans-serif; margin: 0; padding: 20px; background-color: #f5f5f5; }}\n\
         .container {{ max-width: 600px; margin: 0 auto; background: #ffffff; border-radius: 15px; overflow: hidden; }}\n\
         .header {{ background: #667eea; padding: 30px; text-align: center; color: #ffffff; }}\n\
         .content {{ padding: 30px; }}\n\
         .task-reminder {{ background: #f8f9fa; padding: 20px; border-radius: 10px; border-left: 4px solid #ff6b6b; }}\n\
         .footer {{ background: #f8f9fa; padding: 20px; text-align: center; color: #666666; font-size: 14px; }}\n\
         </style>\n\
         </head>\n\
         <body>\n\
         <div class=\"container\">\n\
         <div class=\"header\"><h1>Task Reminder</h1></div>\n\
         <div class=\"content\">\n\
         <div class=\"task-reminder\">\n\
         <h2>{subject}</h2>\n\
         <p>{body}</p>\n\
         </div>\n\
         </div>\n\
         <div class=\"footer\"><p>This is an automatic reminder.</p></div>\n\
         </div>\n\
         </body>\n\
         </html>\n"
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
