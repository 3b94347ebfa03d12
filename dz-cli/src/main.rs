use clap::{Parser, Subcommand};
use tracing::Level;

use dz_cli::{ListArgs, PackArgs, UnpackArgs, commands};

#[derive(Parser)]
#[command(
    name = "dz",
    about = "Unpack, pack and list legacy DZ resource archives",
    version,
    long_about = "A command-line tool for working with the DZ resource archive \
                  format used by a legacy mobile SDK: whole-archive unpack into a \
                  file tree plus manifest, whole-archive pack from a manifest, and \
                  content listing. Split volumes (.d01, .d02, ...) are handled \
                  transparently."
)]
struct Cli {
    /// Set the logging level
    #[arg(short, long, value_enum, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Suppress the progress bar
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract an archive into a directory and emit its manifest
    Unpack(UnpackArgs),

    /// Build an archive from a manifest and its file tree
    Pack(PackArgs),

    /// List the contents of an archive
    List(ListArgs),
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Unpack(args) => commands::unpack::handle(&args, cli.quiet),
        Commands::Pack(args) => commands::pack::handle(&args, cli.quiet),
        Commands::List(args) => commands::list::handle(&args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
