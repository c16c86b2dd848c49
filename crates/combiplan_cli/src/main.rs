//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `combiplan_core` linkage.
//! - Print the currently resolved week window for quick local checks.

fn main() {
    println!("combiplan_core ping={}", combiplan_core::ping());
    println!("combiplan_core version={}", combiplan_core::core_version());

    for day in combiplan_core::resolve_week_window(combiplan_core::service_now()) {
        println!("{} ({})", day.weekday.label(), day.formatted_date());
    }
}
