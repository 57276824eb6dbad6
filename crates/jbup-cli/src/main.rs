use clap::{Parser, Subcommand};
use jbup::{
    commands::{
        config::{self, ConfigAction},
        update::{self, UpdateArgs},
    },
    common, GlobalOpts,
};

/// Exit status for configuration errors
const EXIT_CONFIG: i32 = 2;

#[derive(Parser)]
#[command(name = "jbup")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Update installed JetBrains IDE plugins",
    long_about = "jbup scans an IDE plugins directory, asks the JetBrains Marketplace for builds \
                  compatible with the installed IDE and installs them in place, keeping a \
                  backup of each replaced plugin."
)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(flatten)]
    update: UpdateArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or edit the jbup configuration file
    #[command(subcommand_required = false, arg_required_else_help = false)]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

fn main() {
    let cli = Cli::parse();
    let verbosity = cli.global.verbosity_level();

    common::init_tracing(verbosity);
    if let Err(e) = jbup_logger::init_with_verbosity(verbosity) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }

    match cli.command {
        Some(Commands::Config { action }) => {
            if let Err(e) = config::handle_config(action, &cli.global) {
                jbup_logger::error(&e.to_string());
                std::process::exit(EXIT_CONFIG);
            }
        }
        None => match update::handle_update(&cli.update, &cli.global) {
            Ok(status) => std::process::exit(status.exit_code()),
            Err(e) => {
                jbup_logger::spinner_stop();
                jbup_logger::error(&e.to_string());
                std::process::exit(EXIT_CONFIG);
            }
        },
    }
}
