use jarsmith::build_root::BuildRootDetector;
use jarsmith::cli::{BuildArgs, CliArgs, Commands};
use jarsmith::command::CommandRunner;
use jarsmith::dataset::DatasetIo;
use jarsmith::gradle::GradleFatJarBuilder;
use jarsmith::jars::JarPicker;
use jarsmith::maven::MavenFatJarBuilder;
use jarsmith::orchestrator::BuildOrchestrator;
use jarsmith::scan::RepoScanner;
use jarsmith::wrapper::WrapperSelector;
use jarsmith::VERSION;

use clap::Parser;
use std::env;
use std::sync::Arc;
use tracing::{debug, error, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("jarsmith v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Build(build_args) => handle_build(build_args),
    };

    std::process::exit(exit_code);
}

fn handle_build(args: &BuildArgs) -> i32 {
    let cfg = args.to_config();

    let scanner = RepoScanner::new();
    let detector = BuildRootDetector::new(scanner);
    let runner = Arc::new(CommandRunner::new(cfg.resolved_log_dir()));
    let wrappers = WrapperSelector::new();
    let jar_picker = JarPicker::new();

    let maven = MavenFatJarBuilder::new(
        Arc::clone(&runner),
        wrappers.clone(),
        detector.clone(),
        jar_picker.clone(),
        cfg.jdk_home.clone(),
        cfg.alt_jdk_home.clone(),
    );
    let gradle = GradleFatJarBuilder::new(
        Arc::clone(&runner),
        wrappers,
        detector.clone(),
        jar_picker,
        cfg.jdk_home.clone(),
        cfg.cache_dir(),
    );

    let orchestrator = BuildOrchestrator::new(
        cfg,
        DatasetIo::new(),
        detector,
        Box::new(maven),
        Box::new(gradle),
        runner,
    );

    match orchestrator.run() {
        Ok(summary) => {
            println!(
                "done: {} records, {} modules ({} built, {} skipped, {} failed)",
                summary.records, summary.modules, summary.built, summary.skipped, summary.failed
            );
            0
        }
        Err(e) => {
            error!("build run failed: {:#}", e);
            1
        }
    }
}

fn init_logging_from_args(args: &CliArgs) {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let level = if let Some(level_str) = &args.log_level {
            parse_level(level_str)
        } else if args.verbose {
            Level::DEBUG
        } else if args.quiet {
            Level::ERROR
        } else {
            let level_str = env::var("JARSMITH_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
            parse_level(&level_str)
        };

        let mut filter = EnvFilter::from_default_env();
        if env::var("RUST_LOG").is_err() {
            if let Ok(directive) = format!("jarsmith={}", level).parse() {
                filter = filter.add_directive(directive);
            }
        }

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    });
}

fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}
