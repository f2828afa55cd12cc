mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_FAILURE, EXIT_MANIFEST_ERROR, EXIT_RUNTIME_ERROR};
use berth_core::install_signal_handler;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "berth",
    version,
    about = "Compile a declarative manifest into running development environments"
)]
struct Cli {
    /// Project directory containing berth.yaml.
    #[arg(short = 'C', long = "dir", default_value = ".", global = true)]
    dir: PathBuf,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a starter berth.yaml in the project directory.
    Init {
        /// Overwrite an existing manifest.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Bring a profile up: render, start, wait for health, run hooks.
    Up {
        /// Profile name (defaults to project.defaultProfile).
        #[arg(long, short)]
        profile: Option<String>,
        /// Build images for services with a build section before starting.
        #[arg(long, default_value_t = false)]
        build: bool,
        /// Pull newer images before starting.
        #[arg(long, default_value_t = false)]
        pull: bool,
        /// Skip the built-in observability services.
        #[arg(long, default_value_t = false)]
        no_telemetry: bool,
        /// Kubernetes namespace (k8s profiles only).
        #[arg(long, default_value = "")]
        namespace: String,
    },
    /// Tear a profile down, running beforeDown hooks first.
    Down {
        /// Profile name (defaults to project.defaultProfile).
        #[arg(long, short)]
        profile: Option<String>,
        /// Also remove named volumes.
        #[arg(long, default_value_t = false)]
        volumes: bool,
        /// Kubernetes namespace (k8s profiles only).
        #[arg(long, default_value = "")]
        namespace: String,
    },
    /// Render deployment documents without touching any runtime.
    Render {
        #[command(subcommand)]
        target: RenderTarget,
    },
    /// Manage the image digest lockfile.
    Lock {
        #[command(subcommand)]
        action: LockAction,
    },
    /// Execute a command inside a running service.
    Exec {
        /// Profile name (defaults to project.defaultProfile).
        #[arg(long, short)]
        profile: Option<String>,
        /// Service to run the command in.
        service: String,
        /// Command and arguments (after --).
        #[arg(required = true, last = true)]
        command: Vec<String>,
    },
    /// Stream logs from the environment.
    Logs {
        /// Profile name (defaults to project.defaultProfile).
        #[arg(long, short)]
        profile: Option<String>,
        /// Restrict to one service.
        service: Option<String>,
        /// Keep following the stream.
        #[arg(long, short, default_value_t = false)]
        follow: bool,
        /// Only logs newer than this (e.g. "10m", "1h").
        #[arg(long, default_value = "")]
        since: String,
    },
    /// Show per-service state, health, and published ports.
    Status {
        /// Profile name (defaults to project.defaultProfile).
        #[arg(long, short)]
        profile: Option<String>,
    },
    /// Run diagnostic checks on runtimes and the manifest.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Debug, Subcommand)]
enum RenderTarget {
    /// Render the compose document.
    Compose {
        /// Profile name (defaults to project.defaultProfile).
        #[arg(long, short)]
        profile: Option<String>,
        /// Skip the built-in observability services.
        #[arg(long, default_value_t = false)]
        no_telemetry: bool,
        /// Write under .berth/ instead of printing.
        #[arg(long, default_value_t = false)]
        write: bool,
    },
    /// Render the Kubernetes objects.
    K8s {
        /// Profile name (defaults to project.defaultProfile).
        #[arg(long, short)]
        profile: Option<String>,
        /// Namespace stamped onto every object.
        #[arg(long, default_value = "")]
        namespace: String,
        /// Write under .berth/ instead of printing.
        #[arg(long, default_value_t = false)]
        write: bool,
    },
}

#[derive(Debug, Subcommand)]
enum LockAction {
    /// Resolve digests for every deployable image and rewrite berth.lock.
    Update {
        /// Profile name (defaults to project.defaultProfile).
        #[arg(long, short)]
        profile: Option<String>,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("BERTH_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    install_signal_handler();

    let dir = cli.dir;
    let json = cli.json;

    let result = match cli.command {
        Commands::Init { force } => commands::init::run(&dir, force, json),
        Commands::Up {
            profile,
            build,
            pull,
            no_telemetry,
            namespace,
        } => commands::up::run(
            &dir,
            profile.as_deref(),
            build,
            pull,
            no_telemetry,
            &namespace,
            json,
        ),
        Commands::Down {
            profile,
            volumes,
            namespace,
        } => commands::down::run(&dir, profile.as_deref(), volumes, &namespace, json),
        Commands::Render { target } => match target {
            RenderTarget::Compose {
                profile,
                no_telemetry,
                write,
            } => commands::render::compose(&dir, profile.as_deref(), no_telemetry, write),
            RenderTarget::K8s {
                profile,
                namespace,
                write,
            } => commands::render::k8s(&dir, profile.as_deref(), &namespace, write),
        },
        Commands::Lock { action } => match action {
            LockAction::Update { profile } => {
                commands::lock::update(&dir, profile.as_deref(), json)
            }
        },
        Commands::Exec {
            profile,
            service,
            command,
        } => commands::exec::run(&dir, profile.as_deref(), &service, &command),
        Commands::Logs {
            profile,
            service,
            follow,
            since,
        } => commands::logs::run(
            &dir,
            profile.as_deref(),
            service.as_deref(),
            follow,
            &since,
            json,
        ),
        Commands::Status { profile } => commands::status::run(&dir, profile.as_deref(), json),
        Commands::Doctor => commands::doctor::run(&dir, json),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("manifest error:") {
                EXIT_MANIFEST_ERROR
            } else if msg.starts_with("runtime error:") {
                EXIT_RUNTIME_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
