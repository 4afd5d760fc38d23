pub mod correct_manager;
pub mod demo;
pub mod employees;
pub mod factors;
pub mod import;
pub mod init;
pub mod projects;
pub mod status;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "margen",
    about = "Project profitability tracker for fabrication shops: ingest weekly hours and SAE materials reports, reconcile them against the catalog, post cost transactions."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up margen: choose a data directory and initialize the database.
    Init {
        /// Path for margen data (default: ~/Documents/margen)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage the project catalog.
    Projects {
        #[command(subcommand)]
        command: ProjectsCommands,
    },
    /// Manage the employee catalog.
    Employees {
        #[command(subcommand)]
        command: EmployeesCommands,
    },
    /// Import a report workbook and reconcile it against the catalog.
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Manage the manufacturing/operating factor history.
    Factors {
        #[command(subcommand)]
        command: FactorsCommands,
    },
    /// Show current database and summary statistics.
    Status,
    /// Load sample catalog data to explore margen.
    Demo,
}

#[derive(Subcommand)]
pub enum ProjectsCommands {
    /// Add a project.
    Add {
        /// SAE (ERP) project code, e.g. 25-046-00
        sae_code: String,
        /// Internal project code, e.g. PR100
        #[arg(long = "internal")]
        internal_code: String,
        /// Project name
        #[arg(long)]
        name: String,
    },
    /// List catalog projects.
    List,
    /// Mark a project finished (blocks new cost postings).
    Finish {
        /// SAE or internal code
        code: String,
    },
}

#[derive(Subcommand)]
pub enum EmployeesCommands {
    /// Add an employee.
    Add {
        /// Payroll employee id, e.g. E1
        emp_code: String,
        /// Employee name
        #[arg(long)]
        name: String,
        /// Hourly rate
        #[arg(long)]
        rate: f64,
        /// Overtime rate (default: 1.5x the hourly rate)
        #[arg(long = "overtime-rate")]
        overtime_rate: Option<f64>,
    },
    /// List catalog employees.
    List,
}

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Import a weekly labor-hours workbook (payroll export).
    Hours {
        /// Path to the XLSX file
        file: String,
        /// Week start (YYYY-MM-DD), used when the file has no
        /// "PERIODO DEL ..." banner
        #[arg(long = "week-start")]
        week_start: Option<String>,
        /// Pre-supplied correction, e.g. project:ZZ-9=PR100 or
        /// employee:E9=E1 (repeatable)
        #[arg(long = "map")]
        map: Vec<String>,
        /// Drop a mismatch group, e.g. project:ZZ-9 (repeatable)
        #[arg(long = "ignore")]
        ignore: Vec<String>,
        /// Parse and reconcile without committing
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// Import an SAE materials workbook (purchases/consumption export).
    Materials {
        /// Path to the XLSX file
        file: String,
        #[arg(long = "map")]
        map: Vec<String>,
        #[arg(long = "ignore")]
        ignore: Vec<String>,
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum FactorsCommands {
    /// Append a factor value to the history.
    Set {
        /// Factor name: manufacturing or operating
        name: String,
        /// Factor value, e.g. 1.35
        value: f64,
        /// Effective date (YYYY-MM-DD, default: today)
        #[arg(long)]
        effective: Option<String>,
    },
    /// Show the full factor history.
    List,
}
