use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rollcall_core::{AttendanceRecord, Gallery};
use rollcall_ledger::CsvLedger;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rollcall", about = "Rollcall attendance CLI")]
struct Cli {
    /// Attendance ledger CSV (default: $XDG_DATA_HOME/rollcall/attendance.csv)
    #[arg(long)]
    ledger: Option<PathBuf>,
    /// Enrollment gallery JSON (default: $XDG_DATA_HOME/rollcall/gallery.json)
    #[arg(long)]
    gallery: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show attendance for one day (default: today)
    Report {
        /// Day to report, YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List enrolled people
    People,
    /// Dump the full attendance ledger
    Log,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let data_dir = rollcall_core::default_data_dir();
    let ledger_path = cli
        .ledger
        .unwrap_or_else(|| data_dir.join("attendance.csv"));
    let gallery_path = cli.gallery.unwrap_or_else(|| data_dir.join("gallery.json"));

    match cli.command {
        Commands::Report { date } => {
            let day = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let ledger = CsvLedger::new(&ledger_path);
            let records = ledger.records_for_date(day)?;
            if records.is_empty() {
                println!("No attendance recorded for {day}");
            } else {
                print_records(&records);
            }
        }
        Commands::People => {
            let gallery = Gallery::load(&gallery_path)?;
            for person in gallery.people() {
                println!("{person}");
            }
        }
        Commands::Log => {
            let ledger = CsvLedger::new(&ledger_path);
            let records = ledger.records()?;
            if records.is_empty() {
                println!("Ledger is empty");
            } else {
                print_records(&records);
            }
        }
    }

    Ok(())
}

fn print_records(records: &[AttendanceRecord]) {
    println!("{:<20} {:<12} {:<10} {:<10}", "Name", "Date", "In", "Out");
    for record in records {
        println!(
            "{:<20} {:<12} {:<10} {:<10}",
            record.person,
            record.date.to_string(),
            record.punch_in,
            record.punch_out.as_deref().unwrap_or("-")
        );
    }
}
