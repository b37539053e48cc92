//! Solar quote entry point: CLI wiring and config-driven engine construction.

use std::path::Path;
use std::process;

use solar_quote::QuoteEngine;
use solar_quote::config::QuoteConfig;
use solar_quote::io::export::{BillSweep, export_quote_sheet};
use tracing::{error, info};

/// Parsed CLI arguments.
struct CliArgs {
    config_path: Option<String>,
    preset: Option<String>,
    bill: Option<f64>,
    sweep: Option<BillSweep>,
    sweep_out: Option<String>,
    #[cfg(feature = "api")]
    serve: bool,
    #[cfg(feature = "api")]
    port: u16,
}

fn print_help() {
    eprintln!("solar-quote - residential solar quotes for block tariffs");
    eprintln!();
    eprintln!("Usage: solar-quote [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>          Load configuration from a TOML file");
    eprintln!("  --preset <name>          Use a built-in preset (illustrative, bts1)");
    eprintln!("  --bill <amount>          Print the quote for one monthly bill");
    eprintln!("  --sweep <from:to:step>   Bill range for the quote sheet");
    eprintln!("  --sweep-out <path>       Write the quote sheet as CSV");
    #[cfg(feature = "api")]
    {
        eprintln!("  --serve                  Start the REST API server");
        eprintln!("  --port <u16>             API server port (default: 3001)");
    }
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --config or --preset is given, the illustrative preset is used.");
}

/// Returns the value following flag `args[*i]`, or exits with an error.
fn flag_value<'a>(args: &'a [String], i: &mut usize, what: &str) -> &'a str {
    let flag = &args[*i];
    *i += 1;
    match args.get(*i) {
        Some(value) => value,
        None => {
            eprintln!("error: {flag} requires {what}");
            process::exit(1);
        }
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        config_path: None,
        preset: None,
        bill: None,
        sweep: None,
        sweep_out: None,
        #[cfg(feature = "api")]
        serve: false,
        #[cfg(feature = "api")]
        port: 3001,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--config" => {
                cli.config_path = Some(flag_value(&args, &mut i, "a path argument").to_string());
            }
            "--preset" => {
                cli.preset = Some(flag_value(&args, &mut i, "a name argument").to_string());
            }
            "--bill" => {
                let value = flag_value(&args, &mut i, "an amount argument");
                if let Ok(b) = value.parse::<f64>() {
                    cli.bill = Some(b);
                } else {
                    eprintln!("error: --bill value \"{value}\" is not a number");
                    process::exit(1);
                }
            }
            "--sweep" => {
                let value = flag_value(&args, &mut i, "a <from:to:step> argument");
                match value.parse::<BillSweep>() {
                    Ok(sweep) => cli.sweep = Some(sweep),
                    Err(e) => {
                        eprintln!("error: --sweep: {e}");
                        process::exit(1);
                    }
                }
            }
            "--sweep-out" => {
                cli.sweep_out = Some(flag_value(&args, &mut i, "a path argument").to_string());
            }
            #[cfg(feature = "api")]
            "--serve" => {
                cli.serve = true;
            }
            #[cfg(feature = "api")]
            "--port" => {
                let value = flag_value(&args, &mut i, "a u16 argument");
                if let Ok(p) = value.parse::<u16>() {
                    cli.port = p;
                } else {
                    eprintln!("error: --port value \"{value}\" is not a valid u16");
                    process::exit(1);
                }
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    if cli.config_path.is_some() && cli.preset.is_some() {
        eprintln!("error: --config and --preset are mutually exclusive");
        process::exit(1);
    }

    cli
}

fn load_config(cli: &CliArgs) -> QuoteConfig {
    let loaded = if let Some(ref path) = cli.config_path {
        QuoteConfig::from_toml_file(Path::new(path))
    } else if let Some(ref name) = cli.preset {
        QuoteConfig::from_preset(name)
    } else {
        Ok(QuoteConfig::illustrative())
    };

    loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    })
}

fn print_quote(engine: &QuoteEngine, bill: f64) {
    match engine.quote(bill) {
        Ok(result) => println!("{result}"),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

fn main() {
    // Logs go to stderr so quotes on stdout stay parseable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = parse_args();
    let config = load_config(&cli);

    // Tariff and constant problems are fatal before any quote is made
    let engine = match config.build_engine() {
        Ok(engine) => engine,
        Err(errors) => {
            for e in &errors {
                eprintln!("{e}");
            }
            process::exit(1);
        }
    };
    info!(blocks = engine.tariff().blocks().len(), "engine ready");

    if let Some(bill) = cli.bill {
        print_quote(&engine, bill);
    }

    match (cli.sweep, cli.sweep_out.as_deref()) {
        (Some(sweep), Some(path)) => {
            if let Err(e) = export_quote_sheet(&engine, &sweep.bills(), Path::new(path)) {
                error!(%e, path, "failed to write quote sheet");
                process::exit(1);
            }
            info!(path, "quote sheet written");
        }
        (Some(_), None) | (None, Some(_)) => {
            eprintln!("error: --sweep and --sweep-out must be given together");
            process::exit(1);
        }
        (None, None) => {}
    }

    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(solar_quote::api::AppState { engine });
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        if let Err(e) = rt.block_on(solar_quote::api::serve(state, addr)) {
            error!(%e, %addr, "server stopped");
            process::exit(1);
        }
    }
}
