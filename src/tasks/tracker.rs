//! Task Tracker
//!
//! Fetches the client's task rows from the platform and renders them
//! as a terminal table. When the platform is unreachable a fixed set
//! of sample rows is shown instead, flagged as such. Watch mode
//! refreshes on a fixed interval until interrupted.

use std::time::Duration;

use colored::Colorize;
use tracing::warn;

use crate::types::{PlatformClient, TaskRecord};

/// Sample rows shown when the platform cannot be reached.
pub fn sample_tasks() -> Vec<TaskRecord> {
    vec![
        TaskRecord {
            contract_id: "0x1234567890abcdef".to_string(),
            task_id: "task_001".to_string(),
            verifier_notes: "Task completed successfully with all requirements met".to_string(),
            proof_cid: "QmYjtig7VJQ6XsnUjqqJvj7QaMcCAwtrgNdahSiFofrE7o".to_string(),
        },
        TaskRecord {
            contract_id: "0xfedcba0987654321".to_string(),
            task_id: "task_002".to_string(),
            verifier_notes: "Minor revisions required, resubmission needed".to_string(),
            proof_cid: "QmR7GSQM93Cx5eAg6a6yRzNde1FQv7uL6X4o7SrWn27jCf".to_string(),
        },
        TaskRecord {
            contract_id: "0x9876543210fedcba".to_string(),
            task_id: "task_003".to_string(),
            verifier_notes: "Excellent work, bonus payment approved".to_string(),
            proof_cid: "QmT8UfowDG7WpyT4nUeFmhq7JWvH3s21KMuQQdJrHx3PN2".to_string(),
        },
    ]
}

/// Task rows plus whether they are the sample fallback.
pub struct TaskFetch {
    pub tasks: Vec<TaskRecord>,
    pub used_fallback: bool,
}

/// Fetch the client's tasks, substituting the sample rows on failure.
pub async fn fetch_tasks(platform: &dyn PlatformClient, email: &str) -> TaskFetch {
    match platform.tasks_by_email(email).await {
        Ok(tasks) => TaskFetch {
            tasks,
            used_fallback: false,
        },
        Err(e) => {
            warn!("Task fetch failed, showing sample data: {e:#}");
            TaskFetch {
                tasks: sample_tasks(),
                used_fallback: true,
            }
        }
    }
}

/// Width a column is truncated to before padding.
const COL_WIDTH: usize = 24;

fn cell(s: &str) -> String {
    if s.chars().count() > COL_WIDTH {
        let truncated: String = s.chars().take(COL_WIDTH - 1).collect();
        format!("{truncated}…")
    } else {
        format!("{:width$}", s, width = COL_WIDTH)
    }
}

/// Render task rows as a plain aligned table.
pub fn render_table(tasks: &[TaskRecord]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} {} {} {}\n",
        cell("CONTRACT ID"),
        cell("TASK ID"),
        cell("VERIFIER NOTES"),
        cell("PROOF CID"),
    ));
    if tasks.is_empty() {
        out.push_str("No tasks found\n");
        return out;
    }
    for task in tasks {
        out.push_str(&format!(
            "{} {} {} {}\n",
            cell(&task.contract_id),
            cell(&task.task_id),
            cell(&task.verifier_notes),
            cell(&task.proof_cid),
        ));
    }
    out
}

fn print_dashboard(email: &str, fetched: &TaskFetch) {
    println!();
    println!("{}", "Track Tasks".bold().white());
    println!("{}", format!("Client: {email}").dimmed());
    if fetched.used_fallback {
        println!(
            "{}",
            "Platform unavailable, displaying sample data".yellow()
        );
    }
    println!();
    print!("{}", render_table(&fetched.tasks));
}

/// One-shot dashboard print.
pub async fn show_tasks(platform: &dyn PlatformClient, email: &str) {
    let fetched = fetch_tasks(platform, email).await;
    print_dashboard(email, &fetched);
}

/// Refresh the dashboard every `interval` until the caller's select
/// arm (ctrl-c) tears the future down.
pub async fn watch_tasks(platform: &dyn PlatformClient, email: &str, interval: Duration) {
    loop {
        let fetched = fetch_tasks(platform, email).await;
        print_dashboard(email, &fetched);
        println!();
        println!(
            "{}",
            format!("Refreshing every {}s. Ctrl+C to stop.", interval.as_secs()).dimmed()
        );
        tokio::time::sleep(interval).await;
    }
}
