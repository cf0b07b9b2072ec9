//! Plan paths across a random obstacle grid and print them as ASCII.
//!
//! Usage:
//!   cargo run --example grid_demo -- --size 40 --obstacles 0.25
//!   RUST_LOG=debug cargo run --example grid_demo -- --threads 4 --paths 16

use std::collections::HashSet;
use std::path::PathBuf;

use clap::Parser;
use marga::{GridCoord, GridGraph, Int3, MargaConfig, Path, PathRequest, Pathfinder, Result};
use rand::prelude::*;

/// Grid pathfinding demo
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Grid width and depth in cells
    #[arg(short, long, default_value_t = 32)]
    size: i32,

    /// Fraction of blocked cells
    #[arg(short, long, default_value_t = 0.2)]
    obstacles: f64,

    /// Number of random paths to plan
    #[arg(short, long, default_value_t = 4)]
    paths: usize,

    /// Worker threads (0 = cooperative)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Random seed
    #[arg(long, default_value_t = 7)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => MargaConfig::load(path)?,
        None => MargaConfig::load_default()?,
    };
    if let Some(threads) = args.threads {
        config = config.with_worker_threads(threads);
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    let size = args.size.max(2);
    let blocked: HashSet<(i32, i32)> = (0..size)
        .flat_map(|y| (0..size).map(move |x| (x, y)))
        .filter(|_| rng.random_bool(args.obstacles.clamp(0.0, 0.9)))
        .collect();

    let mut finder = Pathfinder::new(&config);
    finder.update_graphs(|data| {
        let index = data.add_graph(|ctx| GridGraph::new(ctx, size, size, 1000, Int3::ZERO))?;
        data.update_graph::<GridGraph, _>(index, |grid, ctx| {
            for &(x, y) in &blocked {
                grid.set_walkable(ctx, GridCoord::new(x, y), false);
            }
        })
    })?;

    let cell = |rng: &mut StdRng| {
        Int3::new(
            rng.random_range(0..size) * 1000,
            rng.random_range(0..size) * 1000,
            0,
        )
    };
    let paths: Vec<Path> = (0..args.paths)
        .map(|i| {
            let (start, end) = (cell(&mut rng), cell(&mut rng));
            finder.new_path(PathRequest::new(start, end).callback(move |path: &Path| {
                match path.error() {
                    Ok(None) => log::info!("path {} returned", i),
                    Ok(Some(err)) => log::info!("path {} failed: {}", i, err),
                    Err(err) => log::warn!("path {} handle: {}", i, err),
                }
            }))
        })
        .collect();

    for path in &paths {
        finder.submit(path)?;
    }
    for path in &paths {
        finder.block_until_calculated(path)?;
    }

    for (i, path) in paths.iter().enumerate() {
        let result = path.result()?;
        println!(
            "\npath {}: {} nodes, cost {}, {} expanded, {:?}",
            i,
            result.nodes.len(),
            result.cost,
            result.searched_nodes,
            result.duration
        );
        if let Some(err) = path.error()? {
            println!("  {}", err);
            continue;
        }
        let route: HashSet<(i32, i32)> = result
            .vector_path
            .iter()
            .map(|p| (p.x.div_euclid(1000), p.y.div_euclid(1000)))
            .collect();
        print_grid(size, &blocked, &route);
    }

    let stats = finder.stats();
    println!(
        "\n{} paths returned, {} workers",
        stats.completed, stats.live_workers
    );
    finder.shutdown();
    Ok(())
}

fn print_grid(size: i32, blocked: &HashSet<(i32, i32)>, route: &HashSet<(i32, i32)>) {
    for y in (0..size).rev() {
        let row: String = (0..size)
            .map(|x| {
                if route.contains(&(x, y)) {
                    '*'
                } else if blocked.contains(&(x, y)) {
                    '#'
                } else {
                    '.'
                }
            })
            .collect();
        println!("  {}", row);
    }
}
