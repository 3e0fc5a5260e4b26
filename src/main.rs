use std::io;

use interval_registry::{script, IntervalRegistry, RegistryConfig};

/// Print a usage message
fn print_usage() {
    println!("interval-registry - ordered registry of disjoint integer intervals");
    println!("Usage:");
    println!("  interval-registry [OPTIONS] [SCRIPT]");
    println!();
    println!("Runs the commands in SCRIPT, or standard input when no file is given.");
    println!();
    println!("Options:");
    println!("  --capacity N      Nodes to reserve up front (default: 1024)");
    println!("  --verify          Check all invariants after every mutation");
    println!("  --no-verify       Skip invariant checks (default in release builds)");
    println!("  -v                Increase log verbosity (repeatable)");
    println!("  --help            Show this help message");
    println!();
    println!("Commands:");
    println!("  insert PREV NEXT BEGIN END  Insert [BEGIN,END) between hinted nodes (0 = boundary)");
    println!("  add BEGIN END               Insert [BEGIN,END) at its sorted position");
    println!("  remove ID BEGIN END         Remove [BEGIN,END) from node ID");
    println!("  get ID | next ID | prev ID  Inspect a node");
    println!("  first | max | last          Show first index, max index, last inserted");
    println!("  list | stats | check        Show all intervals, totals, or validate");
}

/// Parsed command line
struct Options {
    config: RegistryConfig,
    verbosity: usize,
    script: Option<String>,
}

/// Parse command line arguments
fn parse_args() -> Result<Options, String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    if args.iter().any(|arg| arg == "--help") {
        print_usage();
        std::process::exit(0);
    }

    let mut options = Options {
        config: RegistryConfig::default(),
        verbosity: 0,
        script: None,
    };

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--capacity" => {
                let value = args.next().ok_or("Missing value for --capacity")?;
                options.config.initial_capacity = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid capacity '{}'", value))?;
            }
            "--verify" => options.config.verify_invariants = true,
            "--no-verify" => options.config.verify_invariants = false,
            "-v" => options.verbosity += 1,
            "-vv" => options.verbosity += 2,
            other if other.starts_with('-') => {
                return Err(format!("Unknown option {}", other));
            }
            path => {
                if options.script.replace(path.to_string()).is_some() {
                    return Err("Only one script may be given".to_string());
                }
            }
        }
    }

    Ok(options)
}

fn init_logger(verbosity: usize) {
    let filter = match verbosity {
        0 => "interval_registry=info",
        1 => "interval_registry=debug",
        _ => "interval_registry=trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .init();
}

fn main() {
    let options = match parse_args() {
        Ok(options) => options,
        Err(err) => {
            eprintln!("Error: {}", err);
            print_usage();
            std::process::exit(1);
        }
    };

    init_logger(options.verbosity);

    let mut registry = IntervalRegistry::with_config(options.config);
    let mut stdout = io::stdout().lock();
    let result = match &options.script {
        Some(path) => script::run_file(&mut registry, path, &mut stdout),
        None => script::run(&mut registry, io::stdin().lock(), &mut stdout),
    };

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
