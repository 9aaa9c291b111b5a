//! `mergeguard-lab`: drive the landing-page experiment from a terminal

mod commands;

use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use commands::{parse_field, render_summary, render_visit, Lab};
use mg_experiment::{logging, run_simulation, SimulationConfig, ThreadRandom};
use std::path::PathBuf;
use std::sync::Arc;

fn cli() -> Command {
    let query = Arg::new("query")
        .long("query")
        .default_value("")
        .help("Location search string, e.g. ?variant=b&message=speed");

    Command::new("mergeguard-lab")
        .version(mg_experiment::VERSION)
        .about("MergeGuard landing-page experiment lab")
        .subcommand_required(true)
        .arg(
            Arg::new("store")
                .long("store")
                .global(true)
                .default_value("mergeguard-profile.json")
                .value_parser(value_parser!(PathBuf))
                .help("Visitor profile file"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML experiment configuration"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .default_value("warn")
                .help("Log filter directive (MERGEGUARD_LOG overrides)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("visit")
                .about("Load the page once")
                .arg(query.clone()),
        )
        .subcommand(
            Command::new("click")
                .about("Load the page (counts a view) and click a CTA")
                .arg(Arg::new("cta").required(true).help("CTA identifier"))
                .arg(query.clone()),
        )
        .subcommand(
            Command::new("submit")
                .about("Load the page (counts a view) and submit the waitlist form")
                .arg(
                    Arg::new("field")
                        .long("field")
                        .action(ArgAction::Append)
                        .help("Form field as NAME=VALUE"),
                )
                .arg(query),
        )
        .subcommand(
            Command::new("stats")
                .about("Show metrics and the per-variant funnel")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("Write the export artifact")
                .arg(
                    Arg::new("out-dir")
                        .long("out-dir")
                        .default_value(".")
                        .value_parser(value_parser!(PathBuf))
                        .help("Destination directory"),
                ),
        )
        .subcommand(Command::new("reset").about("Clear metrics, events, and submissions"))
        .subcommand(
            Command::new("simulate")
                .about("Run the traffic simulator")
                .arg(
                    Arg::new("visitors")
                        .long("visitors")
                        .default_value("1000")
                        .value_parser(value_parser!(u64))
                        .help("Number of visitor profiles"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("cta-rate")
                        .long("cta-rate")
                        .default_value("0.3")
                        .value_parser(value_parser!(f64))
                        .help("CTA click probability per page load"),
                )
                .arg(
                    Arg::new("submit-rate")
                        .long("submit-rate")
                        .default_value("0.1")
                        .value_parser(value_parser!(f64))
                        .help("Submit probability per page load"),
                ),
        )
}

fn open_lab(matches: &ArgMatches) -> Result<Lab> {
    let store = matches
        .get_one::<PathBuf>("store")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("mergeguard-profile.json"));
    let config = matches.get_one::<PathBuf>("config");
    Lab::open(&store, config.map(PathBuf::as_path), Arc::new(ThreadRandom))
}

fn query(args: &ArgMatches) -> &str {
    args.get_one::<String>("query").map_or("", String::as_str)
}

fn run(matches: &ArgMatches) -> Result<bool> {
    match matches.subcommand() {
        Some(("visit", args)) => {
            let visit = open_lab(matches)?.visit(query(args))?;
            print!("{}", render_visit(&visit));
        }
        Some(("click", args)) => {
            let cta = args.get_one::<String>("cta").map_or("", String::as_str);
            let metrics = open_lab(matches)?.click(cta, query(args))?;
            println!("CTA '{cta}' clicked; total clicks: {}", metrics.cta_clicks);
        }
        Some(("submit", args)) => {
            let fields = args
                .get_many::<String>("field")
                .into_iter()
                .flatten()
                .map(|raw| parse_field(raw))
                .collect::<Result<Vec<_>>>()?;
            let (record, status) = open_lab(matches)?.submit(&fields, query(args))?;
            println!("{status}");
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Some(("stats", args)) => {
            let summary = open_lab(matches)?.stats()?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", render_summary(&summary));
            }
        }
        Some(("export", args)) => {
            let out_dir = args
                .get_one::<PathBuf>("out-dir")
                .cloned()
                .unwrap_or_else(|| PathBuf::from("."));
            let path = open_lab(matches)?.export(&out_dir)?;
            println!("Exported to {}", path.display());
        }
        Some(("reset", _)) => {
            open_lab(matches)?.reset()?;
            println!("Experiment data cleared; assignments kept.");
        }
        Some(("simulate", args)) => {
            let mut config = SimulationConfig {
                visitors: args.get_one::<u64>("visitors").copied().unwrap_or(1_000),
                seed: args.get_one::<u64>("seed").copied().unwrap_or(42),
                cta_rate: args.get_one::<f64>("cta-rate").copied().unwrap_or(0.3),
                submit_rate: args.get_one::<f64>("submit-rate").copied().unwrap_or(0.1),
                ..SimulationConfig::default()
            };
            if let Some(path) = matches.get_one::<PathBuf>("config") {
                config.experiment = mg_experiment::ExperimentConfig::load(path)?;
            }

            println!("Running traffic simulator...");
            println!("Visitors: {}", config.visitors);
            println!("Seed: {}", config.seed);
            println!();

            let report = run_simulation(&config)?;
            println!("{}", report.generate_text());
            return Ok(report.passed());
        }
        _ => {}
    }
    Ok(true)
}

fn main() {
    let matches = cli().get_matches();
    let level = matches
        .get_one::<String>("log-level")
        .map_or("warn", String::as_str);
    logging::init(level, matches.get_flag("json-logs"));

    match run(&matches) {
        Ok(passed) => std::process::exit(if passed { 0 } else { 1 }),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e:#}");
            std::process::exit(2);
        }
    }
}
