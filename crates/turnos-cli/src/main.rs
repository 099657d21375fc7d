mod config;
mod logging;
mod pipeline;
mod summary;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use turnos_core::{current_month, geocoding_address};
use turnos_geo::{ChromeNavigator, CoordinateResolver};
use turnos_store::{CoordinateCache, LocalitiesIndex, SnapshotWriter, read_json};
use turnos_sync::{GitPublisher, HttpFetcher, Notifier};

use config::{GeoArgs, NotifyArgs, Paths, ProvinceArg, PublishArgs};
use pipeline::{Pipeline, standard_scrapers};
use summary::{RunStatus, RunSummary};

#[derive(Parser)]
#[command(name = "turnos", version, about = "On-duty pharmacy schedules: scrape, geocode, merge, publish")]
struct Cli {
    #[command(flatten)]
    paths: Paths,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape every source, update the dataset and localities index, publish.
    Run {
        #[command(flatten)]
        geo: GeoArgs,
        #[command(flatten)]
        province: ProvinceArg,
        #[command(flatten)]
        publish: PublishArgs,
        #[command(flatten)]
        notify: NotifyArgs,
    },
    /// Resolve one address through the coordinate cache.
    Resolve {
        address: String,
        /// Append this locality the way scraped records do.
        #[arg(long)]
        locality: Option<String>,
        /// Map link to try before the browser.
        #[arg(long)]
        map_url: Option<String>,
        #[command(flatten)]
        geo: GeoArgs,
    },
    /// Merge a dataset-shaped JSON file into the dataset.
    Merge { incoming: PathBuf },
    /// Rebuild the localities index from the dataset.
    Localities {
        #[command(flatten)]
        province: ProvinceArg,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let paths = &cli.paths;

    if !matches!(cli.command, Command::Run { .. }) {
        if let Err(e) = logging::init_stdout() {
            eprintln!("warning: {e:#}");
        }
    }

    let result = match cli.command {
        Command::Run {
            geo,
            province,
            publish,
            notify,
        } => run(paths, &geo, &province.province, &publish, &notify).await,
        Command::Resolve {
            address,
            locality,
            map_url,
            geo,
        } => resolve_address(paths, &geo, address, locality.as_deref(), map_url.as_deref())
            .await
            .map(|()| ExitCode::SUCCESS),
        Command::Merge { incoming } => merge_file(paths, &incoming).map(|()| ExitCode::SUCCESS),
        Command::Localities { province } => {
            rebuild_localities(paths, &province.province).map(|()| ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "turnos failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn resolver(paths: &Paths, geo: &GeoArgs) -> anyhow::Result<CoordinateResolver> {
    let cache = CoordinateCache::open_or_quarantine(&paths.cache_path)
        .with_context(|| format!("opening coordinate cache {}", paths.cache_path.display()))?;
    Ok(CoordinateResolver::new(cache, ChromeNavigator::new(&geo.chrome_bin))
        .with_settle_delay(geo.settle())
        .with_retry_unresolved(geo.retry_unresolved))
}

fn build_pipeline(paths: &Paths, geo: &GeoArgs, province: &str, publish: &PublishArgs) -> anyhow::Result<Pipeline> {
    let publisher = (!publish.no_publish).then(|| {
        let publisher = GitPublisher::new(&paths.repo_path).with_branch(&publish.git_branch);
        match &publish.git_remote {
            Some(remote) => publisher.with_remote(remote),
            None => publisher,
        }
    });
    Ok(Pipeline {
        registry: standard_scrapers(paths.sources_dir.clone(), HttpFetcher::new()?),
        resolver: resolver(paths, geo)?,
        snapshot: SnapshotWriter::new(paths.dataset()),
        localities_path: paths.localities(),
        province: province.to_string(),
        month: current_month().to_string(),
        publisher,
    })
}

async fn run(
    paths: &Paths,
    geo: &GeoArgs,
    province: &str,
    publish: &PublishArgs,
    notify: &NotifyArgs,
) -> anyhow::Result<ExitCode> {
    let started = Local::now();
    let log = logging::init_run(&paths.log_dir, started)?;
    info!(version = env!("CARGO_PKG_VERSION"), log = %log.path.display(), "turnos run starting");

    let notifier = Notifier::from_config(
        notify.telegram_bot_token.as_deref(),
        notify.telegram_chat_id.as_deref(),
    );
    let mut summary = RunSummary::new(started, Some(log.path.clone()));

    let result = match build_pipeline(paths, geo, province, publish) {
        Ok(mut pipeline) => pipeline.run(&mut summary).await,
        Err(e) => Err(e),
    };

    summary.finish(Local::now(), result.as_ref().err());
    let report = summary.render();
    match summary.status {
        RunStatus::Success => info!("run finished\n{report}"),
        RunStatus::Failed => error!("run failed\n{report}"),
    }
    notifier.notify(&report).await;

    Ok(match summary.status {
        RunStatus::Success => ExitCode::SUCCESS,
        RunStatus::Failed => ExitCode::FAILURE,
    })
}

async fn resolve_address(
    paths: &Paths,
    geo: &GeoArgs,
    address: String,
    locality: Option<&str>,
    map_url: Option<&str>,
) -> anyhow::Result<()> {
    let key = match locality {
        Some(locality) => geocoding_address(&address, locality),
        None => address,
    };
    let mut resolver = resolver(paths, geo)?;
    let coords = resolver.resolve(&key, map_url).await;
    println!("{}", serde_json::to_string_pretty(&serde_json::json!({ key: coords }))?);
    Ok(())
}

fn merge_file(paths: &Paths, incoming: &Path) -> anyhow::Result<()> {
    let Some(dataset) = read_json(incoming).with_context(|| format!("reading {}", incoming.display()))? else {
        bail!("{} does not exist", incoming.display());
    };
    let snapshot = SnapshotWriter::new(paths.dataset());
    let stats = snapshot.write(dataset)?;
    println!(
        "merged into {}: +{} months, +{} localities, +{} days, {} replaced, {} appended",
        snapshot.path().display(),
        stats.months_added,
        stats.localities_added,
        stats.days_added,
        stats.replaced,
        stats.appended
    );
    Ok(())
}

fn rebuild_localities(paths: &Paths, province: &str) -> anyhow::Result<()> {
    let dataset = SnapshotWriter::new(paths.dataset()).load()?;
    let added = LocalitiesIndex::update(&paths.localities(), province, &dataset)?;
    println!("{added} localities added to {}", paths.localities().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_paths_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["turnos", "localities", "--repo-path", "/srv/repo", "--province", "Córdoba"])
            .unwrap();
        assert_eq!(cli.paths.repo_path, PathBuf::from("/srv/repo"));
        let Command::Localities { province } = cli.command else {
            panic!("expected localities");
        };
        assert_eq!(province.province, "Córdoba");
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from(["turnos", "run", "--no-publish", "--retry-unresolved", "--settle-secs", "8"])
            .unwrap();
        let Command::Run { geo, publish, .. } = cli.command else {
            panic!("expected run");
        };
        assert!(publish.no_publish);
        assert!(geo.retry_unresolved);
        assert_eq!(geo.settle_secs, 8);
    }
}
