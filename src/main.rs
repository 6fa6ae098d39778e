use std::fs::File;
use std::sync::Arc;
use std::time::Instant;

use log::{error, info, LevelFilter};

use clap::{arg, command, value_parser, ArgAction, ArgMatches};
use clap::parser::ValueSource;
use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode, WriteLogger};

use quadtree_server_lib::http::{http_server_service, DEFAULT_PORT};
use quadtree_server_lib::quadtree::config::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_LEAFS_PER_NODE, DEFAULT_SIZE};
use quadtree_server_lib::{QuadTreeConfig, SceneModel};


fn run_service(matches: &ArgMatches) -> Result<(), String> {
    let config = QuadTreeConfig {
        size: *matches.get_one::<u64>("size").unwrap_or(&DEFAULT_SIZE),
        max_leafs_per_node: *matches.get_one::<usize>("max-leafs").unwrap_or(&DEFAULT_MAX_LEAFS_PER_NODE),
        max_depth: *matches.get_one::<usize>("max-depth").unwrap_or(&DEFAULT_MAX_DEPTH),
        origin_x: matches.get_one::<f64>("origin-x").copied(),
        origin_y: matches.get_one::<f64>("origin-y").copied(),
    };
    let port = *matches.get_one::<u16>("port").unwrap_or(&DEFAULT_PORT);

    let scene = SceneModel::new(config.clone()).map_err(|err| err.to_string())?;
    info!("created tree {config:?}");

    if let Some(state) = matches.get_one::<String>("state") {
        let start = Instant::now();
        let count = scene.load_state(state).map_err(|err| err.to_string())?;
        info!("loaded {count} items from {state} in {:?}", start.elapsed());
    }

    let (_http_stop_tx, http_stop_rx) = tokio::sync::oneshot::channel::<()>();

    // serves until the process is stopped
    http_server_service(Arc::new(scene), port, http_stop_rx);

    info!("service stopped");
    Ok(())
}


fn command_line() -> ArgMatches {
    command!()
        .next_line_help(true)
        .arg(
            arg!(--loglevel <LEVEL>)
                .required(false)
                .default_value("info")
                .value_parser(["trace", "debug", "info", "warn", "error", "off" ])
                .action(ArgAction::Set)
        )
        .arg(
            arg!(--logfile [FILE_NAME])
                .required(false)
                .default_value("quadtree_server.log")
                .action(ArgAction::Set)
                .help("Enables logging to a file. Disabled by default")
        )
        .arg(
            arg!(-q --quiet)
                .required(false)
                .action(ArgAction::SetTrue)
                .help("Disables output to the terminal")
        )
        .arg(
            arg!(--size <SIZE>)
                .required(false)
                .value_parser(value_parser!(u64))
                .help("Side length of the initial tree extent, a power of two")
        )
        .arg(
            arg!(--"max-leafs" <COUNT>)
                .required(false)
                .value_parser(value_parser!(usize))
                .help("Items per node before it is split")
        )
        .arg(
            arg!(--"max-depth" <DEPTH>)
                .required(false)
                .value_parser(value_parser!(usize))
        )
        .arg(
            arg!(--"origin-x" <X>)
                .required(false)
                .allow_negative_numbers(true)
                .value_parser(value_parser!(f64))
                .help("Left edge of the initial extent, -size/2 by default")
        )
        .arg(
            arg!(--"origin-y" <Y>)
                .required(false)
                .allow_negative_numbers(true)
                .value_parser(value_parser!(f64))
                .help("Top edge of the initial extent, -size/2 by default")
        )
        .arg(
            arg!(--port <PORT>)
                .required(false)
                .value_parser(value_parser!(u16))
        )
        .arg(
            arg!(--state <FILE_NAME>)
                .required(false)
                .help("Loads items from a saved state file on startup")
        )
        .get_matches()
}


fn initialize_logging(matches: &ArgMatches) -> Result<(), String> {
    let loglevel = match matches.get_one::<String>("loglevel").map(String::as_str) {
        Some("trace") => LevelFilter::Trace,
        Some("debug") => LevelFilter::Debug,
        Some("info") => LevelFilter::Info,
        Some("warn") => LevelFilter::Warn,
        Some("error") => LevelFilter::Error,
        _ => LevelFilter::Off,
    };
    let quiet = matches.get_flag("quiet");
    let term_loglevel = if quiet { LevelFilter::Off } else { loglevel };

    let logfile = match (matches.value_source("logfile"), matches.get_one::<String>("logfile")) {
        (Some(ValueSource::CommandLine), Some(file_name)) => {
            Some(file_name)
        },
        _ => None,
    };

    let result = if let Some(logfile) = logfile {
        let file = File::create(logfile).map_err(|err| format!("cannot create {logfile}: {err}"))?;
        CombinedLogger::init(
            vec![
                TermLogger::new(term_loglevel, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
                WriteLogger::new(loglevel, Config::default(), file)
            ]
        )
    } else {
        TermLogger::init(term_loglevel, Config::default(), TerminalMode::Mixed, ColorChoice::Auto)
    };

    result.map_err(|err| err.to_string())
}

fn main() {
    let matches = command_line();
    if let Err(err) = initialize_logging(&matches) {
        eprintln!("{err}");
        std::process::exit(1);
    }

    if let Err(err) = run_service(&matches) {
        error!("{err}");
        std::process::exit(1);
    }
}
