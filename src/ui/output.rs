use crate::log::LogEntry;
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

/// Print one execution log entry, highlighting failures
pub fn log_entry(entry: &LogEntry) {
    let line = entry.to_string();
    if entry.is_error() {
        println!("{} {}", Icons::CROSS, line.style(theme().error.clone()));
    } else {
        println!("{} {}", Icons::CLOCK.style(theme().dim.clone()), dim(&line));
    }
}
