//! Terminal output for the fastcili CLI.
//!
//! Uses `console` for colored styling. Every command ends with either the
//! success banner ("Berhasil!") or the failure banner ("Terjadi kesalahan!").

use console::Style;
use serde::Serialize;

use crate::error::FastciliError;
use crate::service::dashboard::{Dashboard, StatusOverview, TechnicianStats};
use crate::store::catalog::{Building, Condition, Facility, Room};
use crate::store::reports::TaskRow;
use crate::store::users::User;
use crate::ticket::{Report, Status};

const DESCRIPTION_WIDTH: usize = 40;

/// Fit `text` in `width` characters, marking cut text with an ellipsis.
fn cell(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Form field named by the first field-level error in the chain.
fn failed_field(err: &anyhow::Error) -> Option<&str> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<FastciliError>())
        .and_then(FastciliError::field)
}

pub struct Terminal {
    green: Style,
    red: Style,
    yellow: Style,
    cyan: Style,
    dim: Style,
}

impl Default for Terminal {
    fn default() -> Self {
        Self {
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            cyan: Style::new().cyan(),
            dim: Style::new().dim(),
        }
    }
}

impl Terminal {
    pub fn success(&self, message: &str) {
        println!("{} {message}", self.green.apply_to("✓ Berhasil!"));
    }

    /// Failure banner plus the error chain, on stderr. Form-level failures
    /// also name the offending field.
    pub fn failure(&self, err: &anyhow::Error) {
        eprintln!("{} {err}", self.red.apply_to("✗ Terjadi kesalahan!"));
        if let Some(field) = failed_field(err) {
            eprintln!("  {} {field}", self.yellow.apply_to("field:"));
        }
        for cause in err.chain().skip(1) {
            eprintln!("  {} {cause}", self.dim.apply_to("caused by:"));
        }
    }

    fn status(&self, status: Status) -> String {
        let style = match status {
            Status::Submitted => &self.yellow,
            Status::Assigned | Status::InProgress => &self.cyan,
            Status::Completed | Status::Rated => &self.green,
        };
        style.apply_to(format!("{:<10}", status.label())).to_string()
    }

    fn condition(&self, condition: Condition) -> String {
        let style = match condition {
            Condition::Baik => &self.green,
            Condition::Rusak => &self.red,
        };
        style.apply_to(format!("{condition:<5}")).to_string()
    }

    fn empty(&self, what: &str) {
        println!("{}", self.dim.apply_to(format!("(no {what})")));
    }

    pub fn print_json<T: Serialize>(&self, value: &T) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }

    pub fn print_reports(&self, reports: &[Report]) {
        if reports.is_empty() {
            return self.empty("reports");
        }
        println!(
            "{}",
            self.dim.apply_to(format!(
                "{:>5}  {:<10}  {:>8}  {:>6}  {:<16}  description",
                "id", "status", "facility", "qty", "created"
            ))
        );
        for r in reports {
            println!(
                "{:>5}  {}  {:>8}  {:>6}  {:<16}  {}",
                r.id,
                self.status(r.status),
                r.facility_id,
                r.damage_quantity,
                r.created_at.format("%Y-%m-%d %H:%M"),
                cell(&r.description, DESCRIPTION_WIDTH)
            );
        }
    }

    pub fn print_tasks(&self, tasks: &[TaskRow]) {
        if tasks.is_empty() {
            return self.empty("assigned repairs");
        }
        for task in tasks {
            println!(
                "{:>5}  {}  {} / {} / {}",
                task.report.id,
                self.status(task.report.status),
                task.building_name,
                task.room_name,
                task.facility_name
            );
            println!(
                "       {}",
                self.dim.apply_to(cell(&task.report.description, DESCRIPTION_WIDTH))
            );
            if let Some(notes) = &task.assignment.notes {
                println!("       catatan: {}", cell(notes, DESCRIPTION_WIDTH));
            }
        }
    }

    pub fn print_users(&self, users: &[User]) {
        if users.is_empty() {
            return self.empty("users");
        }
        for u in users {
            println!(
                "{:>5}  {:<24}  {}  {}",
                u.id,
                u.name,
                u.email,
                self.dim.apply_to(u.role.code())
            );
        }
    }

    pub fn print_buildings(&self, buildings: &[Building]) {
        if buildings.is_empty() {
            return self.empty("buildings");
        }
        for b in buildings {
            println!(
                "{:>5}  {:<10}  {}  {}",
                b.id,
                b.code,
                b.name,
                self.dim.apply_to(b.description.as_deref().unwrap_or(""))
            );
        }
    }

    pub fn print_rooms(&self, rooms: &[Room]) {
        if rooms.is_empty() {
            return self.empty("rooms");
        }
        for r in rooms {
            println!(
                "{:>5}  {:<10}  {}  {}",
                r.id,
                r.code,
                r.name,
                self.dim.apply_to(&r.building_name)
            );
        }
    }

    pub fn print_facilities(&self, facilities: &[Facility]) {
        if facilities.is_empty() {
            return self.empty("facilities");
        }
        for f in facilities {
            println!(
                "{:>5}  {:<20}  {:>4}  {}  {}",
                f.id,
                cell(&f.name, 20),
                f.quantity,
                self.condition(f.condition),
                self.dim
                    .apply_to(format!("{} / {}", f.building_name, f.room_name))
            );
        }
    }

    fn print_overview(&self, title: &str, overview: &StatusOverview) {
        println!("{}", self.cyan.apply_to(format!("─── {title} ───")));
        for &(status, n) in &overview.by_status {
            println!("  {}  {n:>4}", self.status(status));
        }
        println!("  {:<10}  {:>4}", "Total", overview.total);
    }

    fn print_technician(&self, stats: &TechnicianStats) {
        println!("{}", self.cyan.apply_to("─── Perbaikan ───"));
        println!("  {:<18} {:>4}", "Total penugasan", stats.total);
        println!("  {:<18} {:>4}", "Menunggu", stats.assigned);
        println!("  {:<18} {:>4}", "Sedang dikerjakan", stats.in_progress);
        println!("  {:<18} {:>4}", "Selesai", stats.completed);

        if !stats.per_month.is_empty() {
            println!("{}", self.dim.apply_to("  per bulan"));
            for (month, n) in &stats.per_month {
                println!("    {month}  {n:>4}");
            }
        }
        if !stats.per_building.is_empty() {
            println!("{}", self.dim.apply_to("  per gedung"));
            for (building, n) in &stats.per_building {
                println!("    {building}  {n:>4}");
            }
        }
    }

    pub fn print_dashboard(&self, dashboard: &Dashboard) {
        match dashboard {
            Dashboard::Technician(stats) => self.print_technician(stats),
            Dashboard::Staff(overview) => self.print_overview("Semua laporan", overview),
            Dashboard::Reporter(overview) => self.print_overview("Laporan saya", overview),
        }
    }
}
