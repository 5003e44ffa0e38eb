use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn phase(name: &str) {
    println!();
    println!("{} {}", Icons::GEAR.style(theme().info.clone()), name.style(theme().header.clone()));
}

pub fn timing(elapsed: &str) {
    println!("{} {}", Icons::CLOCK.style(theme().dim.clone()), elapsed);
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}

/// A relationship line: `source ─TYPE→ target`
pub fn relationship(source: &str, edge_type: &str, target: &str, confidence: f64) {
    println!(
        "  {} ─{}→ {} {}",
        source.style(theme().accent.clone()),
        edge_type.style(theme().info.clone()),
        target.style(theme().accent.clone()),
        format!("({:.2})", confidence).style(theme().dim.clone())
    );
}
