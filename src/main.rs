mod catalog;
mod cli;
mod db;
mod error;
mod factors;
mod fmt;
mod grid;
mod hours;
mod layout;
mod materials;
mod models;
mod normalize;
mod recon;
mod settings;
mod tui;

use clap::Parser;

use cli::{
    Cli, Commands, EmployeesCommands, FactorsCommands, ImportCommands, ProjectsCommands,
};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Projects { command } => match command {
            ProjectsCommands::Add {
                sae_code,
                internal_code,
                name,
            } => cli::projects::add(&sae_code, &internal_code, &name),
            ProjectsCommands::List => cli::projects::list(),
            ProjectsCommands::Finish { code } => cli::projects::finish(&code),
        },
        Commands::Employees { command } => match command {
            EmployeesCommands::Add {
                emp_code,
                name,
                rate,
                overtime_rate,
            } => cli::employees::add(&emp_code, &name, rate, overtime_rate),
            EmployeesCommands::List => cli::employees::list(),
        },
        Commands::Import { command } => match command {
            ImportCommands::Hours {
                file,
                week_start,
                map,
                ignore,
                dry_run,
            } => cli::import::hours(&file, week_start.as_deref(), &map, &ignore, dry_run),
            ImportCommands::Materials {
                file,
                map,
                ignore,
                dry_run,
            } => cli::import::materials(&file, &map, &ignore, dry_run),
        },
        Commands::Factors { command } => match command {
            FactorsCommands::Set {
                name,
                value,
                effective,
            } => cli::factors::set(&name, value, effective.as_deref()),
            FactorsCommands::List => cli::factors::list(),
        },
        Commands::Status => cli::status::run(),
        Commands::Demo => cli::demo::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
