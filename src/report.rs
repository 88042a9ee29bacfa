use crate::render::{ListEntry, list_entry_for};
use crate::workout::Workout;
use maud::{DOCTYPE, Markup, html};
use std::path::Path;

/// Write the workout list as a standalone HTML page.
pub fn export_html_log<P: AsRef<Path>>(path: P, workouts: &[Workout]) -> std::io::Result<()> {
    let entries: Vec<ListEntry> = workouts.iter().map(list_entry_for).collect();
    let markup = build_html(&entries);
    std::fs::write(path, markup.into_string())
}

fn entry_html(entry: &ListEntry) -> Markup {
    html! {
        li class=(format!("workout workout--{}", entry.kind.as_str())) data-id=(entry.workout_id) {
            h2 class="workout__title" { (entry.title) }
            span class="workout__views" { (entry.interactions) " views" }
            @for row in &entry.rows {
                div class="workout__details" {
                    span class="workout__icon" { (row.icon) }
                    span class="workout__value" { (row.value) }
                    span class="workout__unit" { (row.unit) }
                }
            }
        }
    }
}

/// Newest workouts first, as in the on-screen list.
fn build_html(entries: &[ListEntry]) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head { meta charset="utf-8"; title { "Workout Log" } }
            body {
                h1 { "Workouts" }
                @if entries.is_empty() {
                    p { "No workouts logged yet" }
                } @else {
                    ul class="workouts" {
                        @for entry in entries.iter().rev() {
                            (entry_html(entry))
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workout::Coordinates;
    use chrono::{TimeZone, Utc};

    #[test]
    fn build_html_lists_newest_first() {
        let t = Utc.with_ymd_and_hms(2024, 8, 20, 12, 0, 0).unwrap();
        let workouts = vec![
            Workout::running("111", t, Coordinates::new(0.0, 0.0), 5.0, 30.0, 150.0),
            Workout::cycling("222", t, Coordinates::new(0.0, 0.0), 20.0, 60.0, 100.0),
        ];
        let entries: Vec<ListEntry> = workouts.iter().map(list_entry_for).collect();
        let output = build_html(&entries).into_string();

        assert!(output.contains(r#"class="workout workout--running" data-id="111""#));
        assert!(output.contains(r#"class="workout workout--cycling" data-id="222""#));
        assert!(output.find("222").unwrap() < output.find("111").unwrap());
        assert!(output.contains("6.0"));
        assert!(output.contains("km/h"));
        assert!(output.contains("0 views"));
        assert!(!output.contains("No workouts logged yet"));
    }

    #[test]
    fn build_html_handles_empty_log() {
        let output = build_html(&[]).into_string();
        assert!(output.contains("No workouts logged yet"));
        assert!(!output.contains("<ul"));
    }

    #[test]
    fn export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.html");
        export_html_log(&path, &[]).unwrap();
        let data = std::fs::read_to_string(&path).unwrap();
        assert!(data.starts_with("<!DOCTYPE html>"));
    }
}
