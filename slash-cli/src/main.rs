//! CLI entrypoint (E5): a single positional config-file-path argument, in
//! the style of the teacher's `floky-bin/src/main.rs` (`usage()` +
//! `std::env::args()`, no argument-parsing crate).
mod config;
mod error;
mod eval;
mod logging;
mod svm;

use config::{Config, SlashConfig};
use error::Result;
use slash::{shard_partition, LocalProcessGroup, SlashIndex};
use svm::LabelSpec;

fn usage() {
    println!(
        "
slash-cli <config-file>
    "
    );
}

fn read_ground_truth(path: &str) -> Result<Vec<Vec<u32>>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(|line| {
            line.split_whitespace()
                .filter_map(|tok| tok.parse::<u32>().ok())
                .collect()
        })
        .collect())
}

fn run_rank(cfg: &SlashConfig, rank: usize, group: LocalProcessGroup) -> Result<slash::QueryResult> {
    logging::init(rank);

    let (local_n, local_offset) = shard_partition(cfg.n, cfg.world_size, rank);
    let index = SlashIndex::new(cfg.k, cfg.l, cfg.range_pow, cfg.reservoir_size, cfg.topk)?;

    if local_n > 0 {
        let shard = svm::read_svm_dataset(
            &cfg.data_file,
            LabelSpec::Sequential { start: local_offset as u32 },
            local_n,
            cfg.avg_dim,
            local_offset,
        )?;
        index.insert_shard(&shard, cfg.batch_size);
    }

    let queries = svm::read_svm_dataset(
        &cfg.query_file,
        LabelSpec::Sequential { start: 0 },
        cfg.q,
        cfg.avg_dim,
        0,
    )?;

    Ok(index.distributed_query(&queries, &group)?)
}

fn run(config_path: &str) -> Result<()> {
    let cfg = SlashConfig::from_config(&Config::from_file(config_path)?)?;

    let groups = LocalProcessGroup::new_group(cfg.world_size);
    let handles: Vec<_> = groups
        .into_iter()
        .enumerate()
        .map(|(rank, group)| {
            let cfg = cfg.clone();
            std::thread::spawn(move || run_rank(&cfg, rank, group))
        })
        .collect();

    let mut rank0_result = None;
    for (rank, handle) in handles.into_iter().enumerate() {
        let result = handle
            .join()
            .map_err(|_| error::CliError::Config(format!("rank {} panicked", rank)))??;
        if rank == 0 {
            rank0_result = Some(result);
        }
    }

    if let (Some(result), Some(ground_truth_file)) = (rank0_result, &cfg.ground_truth_file) {
        let ground_truth = read_ground_truth(ground_truth_file)?;
        let recall = eval::recall_at_k(&result, &ground_truth);
        log::info!("recall@{} = {:.4}", cfg.topk, recall);
    }

    Ok(())
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    match args.len() {
        2 => {
            if let Err(e) = run(&args[1]) {
                eprintln!("slash-cli: {}", e);
                std::process::exit(1);
            }
        }
        _ => {
            usage();
            std::process::exit(1);
        }
    }
}
