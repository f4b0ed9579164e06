//! `wf`: inspect, check, and edit worldfiles from the command line.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "wf",
    about = "Inspect, check, and edit worldfiles",
    version,
    propagate_version = true
)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a worldfile and report diagnostics
    Check {
        /// Worldfile to load (searched on WORLDFILE_PATH if relative)
        file: PathBuf,

        /// Also list every property (nothing is read, so all are reported)
        #[arg(short, long)]
        unused: bool,
    },

    /// Show the entity hierarchy
    Tree {
        /// Worldfile to load
        file: PathBuf,
    },

    /// Show the properties and children of one entity
    Show {
        /// Worldfile to load
        file: PathBuf,

        /// Entity id (0 is the global entity)
        entity: usize,
    },

    /// Dump the parsed contents
    Dump {
        /// Worldfile to load
        file: PathBuf,

        /// Print a JSON snapshot instead of text listings
        #[arg(long)]
        json: bool,

        /// Only print one listing
        #[arg(short, long, value_enum)]
        section: Option<commands::dump::Section>,
    },

    /// Load and save, reporting whether the output matches the input
    Roundtrip {
        /// Worldfile to load
        file: PathBuf,

        /// Where to write the output (default: only compare)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write one property value and save
    Set {
        /// Worldfile to edit
        file: PathBuf,

        /// Entity id (0 is the global entity)
        entity: usize,

        /// Property name
        name: String,

        /// New value; integers and numbers are written unquoted
        value: String,

        /// Tuple slot to write
        #[arg(short, long, default_value = "0")]
        index: usize,

        /// Save here instead of overwriting the file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Check { file, unused } => commands::check::run(&file, unused),
        Commands::Tree { file } => commands::tree::run(&file),
        Commands::Show { file, entity } => commands::show::run(&file, entity),
        Commands::Dump {
            file,
            json,
            section,
        } => commands::dump::run(&file, json, section),
        Commands::Roundtrip { file, output } => commands::roundtrip::run(&file, output.as_deref()),
        Commands::Set {
            file,
            entity,
            name,
            value,
            index,
            output,
        } => commands::set::run(&file, entity, &name, &value, index, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
