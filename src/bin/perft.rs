//! Perft driver
//!
//! Usage: cargo run --release --bin perft -- --depth 6
//!        cargo run --release --bin perft -- --fen "8/8/1k6/2b5/2pP4/8/5K2/8 b - d3 0 1" --depth 6 --divide
//!        cargo run --release --bin perft -- --suite --parallel

use std::process::ExitCode;
use std::time::Instant;

use chess_movegen::perft::{divide, perft, perft_parallel, run_suite, REFERENCE_SUITE};
use chess_movegen::position::Position;
use chess_movegen::types::STARTING_POSITION_FEN;
use clap::Parser;
use color_eyre::eyre::WrapErr;
use log::info;

#[derive(Parser, Debug)]
#[command(name = "perft")]
#[command(about = "Count legal move tree leaves to validate move generation")]
struct Args {
    /// Position to search
    #[arg(long, default_value = STARTING_POSITION_FEN)]
    fen: String,

    /// Search depth in plies
    #[arg(short, long, default_value_t = 5)]
    depth: u32,

    /// Print the node count below each root move
    #[arg(long)]
    divide: bool,

    /// Split root moves across all cores
    #[arg(short, long)]
    parallel: bool,

    /// Run the built-in reference suite instead of a single position
    #[arg(long, conflicts_with_all = ["fen", "divide"])]
    suite: bool,
}

fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.suite {
        let results = run_suite(REFERENCE_SUITE, args.parallel)?;
        let failed = results.iter().filter(|r| !r.passed()).count();
        let nodes: u64 = results.iter().map(|r| r.nodes).sum();
        let elapsed: f64 = results.iter().map(|r| r.elapsed.as_secs_f64()).sum();
        info!(
            "{}/{} passed, {} nodes in {:.2}s",
            results.len() - failed,
            results.len(),
            nodes,
            elapsed
        );
        return Ok(if failed == 0 {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let mut pos = Position::from_fen(&args.fen).wrap_err_with(|| format!("bad FEN: {}", args.fen))?;
    println!("{pos}");

    let start = Instant::now();
    let nodes = if args.divide {
        let split = divide(&mut pos, args.depth);
        for (mv, count) in &split {
            println!("{mv}: {count}");
        }
        split.iter().map(|(_, count)| count).sum()
    } else if args.parallel {
        perft_parallel(&pos, args.depth)
    } else {
        perft(&mut pos, args.depth)
    };
    let elapsed = start.elapsed();

    println!();
    println!("Nodes searched: {nodes}");
    info!(
        "depth {} in {:.2?} ({:.0} nps)",
        args.depth,
        elapsed,
        nodes as f64 / elapsed.as_secs_f64().max(1e-9)
    );
    Ok(ExitCode::SUCCESS)
}
