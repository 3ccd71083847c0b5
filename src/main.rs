// Draftboard entry point.
//
// Pipeline:
// 1. Initialize tracing (stderr)
// 2. Load config (copying defaults on first run)
// 3. Load alias table and ranking sources
// 4. Aggregate into a consensus board
// 5. Assign projections, optionally reorder by VBD value
// 6. Export the board as CSV

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use draftboard::aggregator::RankingAggregator;
use draftboard::alias::AliasTable;
use draftboard::cache::{CacheStats, FileCache};
use draftboard::config;
use draftboard::export;
use draftboard::matcher::PlayerMatcher;
use draftboard::models::MAX_RANK;
use draftboard::projections::ProjectionAssigner;
use draftboard::sources;
use draftboard::vbd::{VbdBaseline, VbdEngine};

#[derive(Debug, Parser)]
#[command(
    name = "draftboard",
    about = "Build a consensus fantasy football draft board from ranking CSVs"
)]
struct Cli {
    /// Reorder the board by value over replacement instead of consensus rank
    #[arg(long)]
    use_vbd: bool,

    /// VBD baseline policy: vols, vorp, or beer
    #[arg(long, default_value = "vorp")]
    baseline: String,

    /// Maximum players to export
    #[arg(long, default_value_t = 300)]
    max_players: usize,

    /// Output CSV path (defaults to <output.dir>/draft_board.csv)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose logging
    #[arg(long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug)?;

    let baseline: VbdBaseline = cli
        .baseline
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))
        .context("invalid --baseline")?;
    if cli.max_players == 0 || cli.max_players > MAX_RANK as usize {
        anyhow::bail!("--max-players must be between 1 and {MAX_RANK}");
    }

    // 2. Config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, {} teams, {} scoring",
        config.league.name,
        config.league.num_teams,
        config.scoring_system()
    );

    // 3. Aliases and ranking sources (cache keeps the last good copy of each)
    let aliases = AliasTable::load(std::path::Path::new(&config.aliases_path));
    let cache_stats = std::sync::Arc::new(CacheStats::new());
    let cache = FileCache::new(
        std::path::Path::new(&config.cache.dir),
        "rankings",
        config.cache.ttl_hours,
    )
    .context("failed to initialize cache directory")?
    .with_stats(std::sync::Arc::clone(&cache_stats));
    let rankings_by_source = sources::load_all_sources_cached(&config.sources, &cache);
    info!("Loaded {} ranking sources", rankings_by_source.len());

    // 4. Consensus aggregation
    let matcher = PlayerMatcher::new(aliases);
    let mut aggregator = RankingAggregator::new(matcher)
        .with_source_weights(config.source_weights())
        .with_tier_sizes(config.league.tier_sizes_by_position());
    let mut board = aggregator.aggregate(&rankings_by_source);
    if board.is_empty() {
        anyhow::bail!("no usable rankings found in any configured source");
    }

    // 5. Projections and optional value ordering
    ProjectionAssigner::new(config.scoring_system()).assign(&mut board);
    if cli.use_vbd {
        let engine = VbdEngine::new(config.league.num_teams, config.league.roster_slots());
        engine.create_draft_board(&mut board, baseline);
    }

    board.truncate(cli.max_players);

    // 6. Export
    let output_path = cli
        .output
        .unwrap_or_else(|| PathBuf::from(&config.output.dir).join("draft_board.csv"));
    export::export_draft_board(&output_path, &board).context("failed to export draft board")?;

    let stats = cache_stats.snapshot();
    info!(
        "Cache: {} hits, {} misses, {} writes",
        stats.hits, stats.misses, stats.writes
    );
    println!(
        "Wrote {} players to {}",
        board.len(),
        output_path.display()
    );
    Ok(())
}

fn init_tracing(debug: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let default_filter = if debug {
        "draftboard=debug,info"
    } else {
        "draftboard=info,warn"
    };
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;
    Ok(())
}
