use clap::Parser;
use config::{AppConfig, Transport};
use crossbeam_channel::bounded;
use directives::{RenderDirective, project};
use log::{LevelFilter, error, info, warn};
#[cfg(debug_assertions)]
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::{
    append::rolling_file::{
        RollingFileAppender,
        policy::compound::{
            CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
        },
    },
    config::{Appender, Config as LogConfig, Logger, Root},
    encode::pattern::PatternEncoder,
};
use network::CycleOutcome;
use reconcile::Reconciler;
use std::{
    error::Error,
    io::{self, Write},
    net::IpAddr,
    path::PathBuf,
};

mod config;
mod directives;
mod network;
mod reconcile;

const APP_NAME: &str = "overlay";

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(long, value_enum)]
    /// How to pull snapshots from the tracker, overrides the config file
    transport: Option<Transport>,

    #[clap(long)]
    /// Address of the tracker, overrides the config file
    host: Option<IpAddr>,

    #[clap(long)]
    /// Port of the tracker, overrides the config file
    port: Option<u16>,

    #[clap(long, short, action(clap::ArgAction::Count))]
    /// Increase the log verbosity
    verbose: u8,

    #[clap(long)]
    /// Directory within which log files will be placed, default is platform dependent
    log_location: Option<PathBuf>,

    #[clap(long, default_value = "5000000")]
    /// Max size in bytes that a log file is allowed to reach before being rolled over
    log_max_file_size: u64,

    #[clap(long, default_value = "3")]
    /// Number of archived logs to keep
    num_old_logs: u32,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();
    init_logging(&args)?;

    let mut config: AppConfig = match confy::load(APP_NAME, None) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to read config file, overwriting with default. Error: {e}");
            let config = AppConfig::default();
            if let Err(e) = confy::store(APP_NAME, None, &config) {
                warn!("Failed to store default config file: {e}");
            }
            config
        }
    };
    apply_overrides(&mut config, &args);

    let (tx, rx) = bounded::<CycleOutcome>(3);

    let net_config = config.clone();
    let net_worker = std::thread::spawn(move || {
        network::networking_thread(tx, net_config);
    });

    let mut reconciler = Reconciler::new(config.diagnostics.event_history_limit);
    let mut out = io::stdout().lock();

    // Ends when the networking thread stops
    while let Ok(outcome) = rx.recv() {
        let written = reconciler.accept(&outcome, |transitions| {
            write_directives(&mut out, &project(transitions))
        });
        if let Some(Err(e)) = written {
            error!("Couldn't write render directives, stopping: {e}");
            return Err(e.into());
        }
    }

    if net_worker.join().is_err() {
        error!("Networking thread panicked");
    }
    info!("Networking stopped, exiting");
    Ok(())
}

fn apply_overrides(config: &mut AppConfig, args: &Cli) {
    if let Some(transport) = args.transport {
        config.connection.transport = transport;
    }
    if let Some(host) = args.host {
        config.connection.host = host;
    }
    if let Some(port) = args.port {
        config.connection.port = port;
    }
}

/// Writes one cycle's directives as a single JSON line
fn write_directives(out: &mut impl Write, directives: &[RenderDirective]) -> io::Result<()> {
    serde_json::to_writer(&mut *out, directives)?;
    writeln!(out)?;
    out.flush()
}

fn init_logging(args: &Cli) -> Result<(), Box<dyn Error>> {
    let log_level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let log_base_path = match &args.log_location {
        Some(path) => path.clone(),
        None => {
            let mut path = directories::BaseDirs::new()
                .ok_or("Could not find a directory to store logs")?
                .data_local_dir()
                .to_path_buf();
            path.push("unite-overlay-logs");
            path
        }
    };
    let mut log_path = log_base_path.clone();
    let mut archived_log_path = log_base_path.clone();
    log_path.push(format!("{APP_NAME}-log.txt"));
    archived_log_path.push(format!("{APP_NAME}-log-{{}}.txt.gz"));

    #[cfg(debug_assertions)]
    eprintln!("Log path: {}", log_path.display());

    // Only log to the console in debug mode. Stdout carries the directives.
    #[cfg(debug_assertions)]
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("[{d} {h({l:5})} {M}] {m}{n}")))
        .build();

    // Setup the file log roller
    let roller = FixedWindowRoller::builder().build(
        archived_log_path
            .to_str()
            .ok_or("Log path is not valid unicode")?,
        args.num_old_logs,
    )?;
    let file_policy = CompoundPolicy::new(
        Box::new(SizeTrigger::new(args.log_max_file_size)),
        Box::new(roller),
    );
    let file_appender = RollingFileAppender::builder()
        .append(true)
        .encoder(Box::new(PatternEncoder::new("[{d} {l:5} {M}] {m}{n}")))
        .build(log_path, Box::new(file_policy))?;

    // Setup the logging from all locations to use `LevelFilter::Error`
    let root = Root::builder().appender("file_appender");
    #[cfg(debug_assertions)]
    let root = root.appender("console");
    let root = root.build(LevelFilter::Error);

    // Setup the top level logging config
    let log_config = LogConfig::builder()
        .appender(Appender::builder().build("file_appender", Box::new(file_appender)));

    #[cfg(debug_assertions)]
    let log_config = log_config.appender(Appender::builder().build("console", Box::new(console)));

    let log_config = log_config
        .logger(Logger::builder().build("overlay", log_level))
        .logger(Logger::builder().build("hud_common", log_level))
        .build(root)?;

    log4rs::init_config(log_config)?;
    log_panics::init();
    Ok(())
}
