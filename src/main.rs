use clap::{Parser, Subcommand};
use clap_verbosity_flag::{LogLevel, Verbosity};
use macros_rs::{crashln, string};
use std::path::PathBuf;

use psup::{
    config, globals, helpers, log,
    process::SystemProcess,
    setup::{self, ScaffoldOptions},
    supervisor::{Action, Supervisor},
};

#[derive(Copy, Clone, Debug, Default)]
struct NoneLevel;
impl LogLevel for NoneLevel {
    fn default() -> Option<::log::Level> {
        None
    }
}

#[derive(Parser)]
#[command(version, about = "Lightweight process supervisor for clustered network services")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[clap(flatten)]
    verbose: Verbosity<NoneLevel>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start every matching application
    Start {
        /// Application name pattern
        #[arg(default_value = "*")]
        pattern: String,
    },
    /// Stop every matching application
    #[command(visible_alias = "kill")]
    Stop {
        /// Application name pattern
        #[arg(default_value = "*")]
        pattern: String,
    },
    /// Stop then start every matching application
    Restart {
        /// Application name pattern
        #[arg(default_value = "*")]
        pattern: String,
    },
    /// Report liveness of every matching application
    #[command(visible_alias = "info")]
    Status {
        /// Application name pattern
        #[arg(default_value = "*")]
        pattern: String,
    },
    /// Write a new application declaration to the configuration directory
    Setup {
        /// Application name (defaults to the current directory's name)
        #[arg(long)]
        app: Option<String>,
        /// Working directory (defaults to the current directory)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Base port the application listens on
        #[arg(long, default_value_t = 4000)]
        port: u16,
        /// Number of sibling instances on sequential ports
        #[arg(long, default_value_t = 1)]
        cluster_size: u32,
        /// OS user the application runs as
        #[arg(long, default_value_t = string!(config::DEFAULT_USER))]
        user: String,
        /// Launch command
        #[arg(long, default_value_t = string!(config::DEFAULT_COMMAND))]
        command: String,
    },
    /// Install a systemd unit that starts the supervised fleet at boot
    Install,
}

fn main() {
    let cli = Cli::parse();

    let mut env = env_logger::Builder::new();
    env.filter_level(cli.verbose.log_level_filter()).init();

    globals::init();
    if let Err(err) = log::ensure() {
        crashln!("{} {}", *helpers::FAIL, err);
    }

    let control = SystemProcess;
    let supervisor = Supervisor::new(&control);

    let result = match cli.command {
        Commands::Start { ref pattern } => supervisor.perform(Action::Start, pattern),
        Commands::Stop { ref pattern } => supervisor.perform(Action::Stop, pattern),
        Commands::Restart { ref pattern } => supervisor.perform(Action::Restart, pattern),
        Commands::Status { ref pattern } => supervisor.perform(Action::Status, pattern),
        Commands::Setup {
            app,
            dir,
            port,
            cluster_size,
            user,
            command,
        } => setup::scaffold(ScaffoldOptions {
            app,
            dir,
            port,
            cluster_size,
            user,
            command,
        }),
        Commands::Install => setup::install(),
    };

    if let Err(err) = result {
        crashln!("{} {}", *helpers::FAIL, err);
    }
}
