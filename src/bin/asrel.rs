use std::{collections::HashSet, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use asrel_valley::{
    parse_asn, AsRelService, Config, PathState, Relationship, UnknownHops, ValidationResult,
};
use clap::{Parser, Subcommand};
use serde::Serialize;

/// Query CAIDA AS relationships and check AS paths for valleys.
#[derive(Debug, Parser)]
#[command(name = "asrel", version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "ASREL_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding <tag>.as-rel2.txt[.bz2] snapshots
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Snapshot tag, e.g. 20250801
    #[arg(short, long, global = true)]
    snapshot: Option<String>,

    /// Treat hops without relationship data as violations
    #[arg(long, global = true)]
    strict: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Relationship between two ASes
    Rel { a: String, b: String },

    /// Check whether an AS path is valley-free
    Check {
        /// ASNs from the first hop to the last, e.g. `3356 174 13335`
        #[arg(required = true, num_args = 1..)]
        path: Vec<String>,
    },

    /// Providers of an AS
    Providers { asn: String },

    /// Customers of an AS
    Customers { asn: String },

    /// Peers of an AS
    Peers { asn: String },

    /// Snapshot size and load diagnostics
    Stats,
}

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(dir) = &cli.dir {
        config.dataset.dir = dir.clone();
    }
    if let Some(snapshot) = &cli.snapshot {
        config.dataset.snapshot = Some(snapshot.clone());
    }
    if cli.strict {
        config.validation.unknown_hops = UnknownHops::Reject;
    }

    let tag = config
        .dataset
        .snapshot
        .clone()
        .context("no snapshot given, pass --snapshot or set dataset.snapshot")?;

    let service = AsRelService::from_config(&config);
    let snapshot = service
        .load(&config.source(), &tag)
        .with_context(|| format!("failed to load snapshot {}", tag))?;

    match cli.command {
        Command::Rel { a, b } => {
            let rel = service.relationship_str(&a, &b)?;
            if cli.json {
                print_json(&rel)?;
            } else {
                println!("{} {}: {}", a, b, describe(rel));
            }
        }
        Command::Check { path } => {
            let result = service.check_path_str(&path.join(" "))?;
            if cli.json {
                print_json(&result)?;
            } else {
                print_validation(&result);
            }
            if !result.valid {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Providers { asn } => {
            let asns = service.providers_of(parse_asn(&asn)?)?;
            print_asns(&asns, cli.json)?;
        }
        Command::Customers { asn } => {
            let asns = service.customers_of(parse_asn(&asn)?)?;
            print_asns(&asns, cli.json)?;
        }
        Command::Peers { asn } => {
            let asns = service.peers_of(parse_asn(&asn)?)?;
            print_asns(&asns, cli.json)?;
        }
        Command::Stats => {
            let stats = snapshot.stats();
            if cli.json {
                print_json(&stats)?;
            } else {
                println!("snapshot:          {}", stats.tag);
                println!("ASes:              {}", stats.asns);
                println!("p2c links:         {}", stats.provider_customer);
                println!("p2p links:         {}", stats.peer_peer);
                println!("lines:             {}", stats.report.total_lines);
                println!("skipped lines:     {}", stats.report.skipped);
                println!("malformed lines:   {}", stats.report.malformed);
                println!("ambiguous pairs:   {}", stats.report.ambiguities.len());
                for ambiguity in &stats.report.ambiguities {
                    println!(
                        "  line {}: {} {} -> {}",
                        ambiguity.line,
                        ambiguity.pair,
                        describe(ambiguity.previous),
                        describe(ambiguity.current)
                    );
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn describe(rel: Relationship) -> String {
    match rel {
        Relationship::ProviderCustomer { provider, customer } => {
            format!("AS{} is a provider of AS{}", provider, customer)
        }
        Relationship::PeerPeer => "peer to peer".to_string(),
        Relationship::Unknown => "no known relationship".to_string(),
        Relationship::Same => "same AS".to_string(),
    }
}

fn state_name(state: PathState) -> &'static str {
    match state {
        PathState::Uphill => "uphill",
        PathState::Flat => "flat",
        PathState::Downhill => "downhill",
    }
}

fn print_validation(result: &ValidationResult) {
    let path = result
        .path
        .iter()
        .map(|asn| asn.to_string())
        .collect::<Vec<_>>()
        .join(" ");

    match &result.violation {
        None => println!("{}: valley-free", path),
        Some(violation) => {
            let attempted = violation
                .attempted
                .map_or("unknown relationship", state_name);
            println!(
                "{}: not valley-free at hop {} (AS{} -> AS{}, {} after {})",
                path,
                violation.hop,
                violation.from,
                violation.to,
                attempted,
                state_name(violation.state)
            );
        }
    }
    if !result.unknown_hops.is_empty() {
        println!("hops without relationship data: {:?}", result.unknown_hops);
    }
}

fn print_asns(asns: &HashSet<u32>, json: bool) -> Result<()> {
    let mut asns = asns.iter().copied().collect::<Vec<u32>>();
    asns.sort_unstable();

    if json {
        print_json(&asns)?;
    } else {
        for asn in asns {
            println!("{}", asn);
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
