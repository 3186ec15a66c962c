use anyhow::Context;
use clap::Parser;
use ecomap::compute::geojson::entries_to_geojson;
use ecomap::feed::{FeedSubscriber, FeedUpdate, HttpFeatureSource, PointFeed};
use ecomap::marker::MarkerKind;
use ecomap::{BoundingBox, Config, MapSession};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Poll a recycling-point feed and print the clusters visible in a viewport.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file (.json or .toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Feed endpoint, overrides the configuration.
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Poll interval in milliseconds, overrides the configuration.
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Viewport as west,south,east,north.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    bbox: Option<Vec<f64>>,

    #[arg(short, long, default_value_t = 12.0)]
    zoom: f64,

    /// Print each marker set as a GeoJSON FeatureCollection.
    #[arg(long)]
    geojson: bool,
}

struct Printer {
    session: Arc<MapSession>,
    geojson: bool,
}

impl FeedSubscriber for Printer {
    fn on_update(&self, update: &FeedUpdate) {
        if self.geojson {
            let viewport = self.session.viewport();
            let entries = self.session.index().query(&viewport.bbox, viewport.zoom);
            match serde_json::to_string(&entries_to_geojson(&entries)) {
                Ok(json) => println!("{}", json),
                Err(e) => log::error!("Failed to serialize markers: {}", e),
            }
            return;
        }

        let markers = self.session.markers();
        let clusters = markers
            .iter()
            .filter(|m| matches!(m.kind, MarkerKind::Cluster { .. }))
            .count();
        println!(
            "tick {}: {} features, {} markers ({} clusters, {} points); +{} -{} ~{}",
            update.tick,
            update.snapshot.len(),
            markers.len(),
            clusters,
            markers.len() - clusters,
            update.diff.added.len(),
            update.diff.removed.len(),
            update.diff.moved.len(),
        );
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("ecomap=info"))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_path(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(endpoint) = args.endpoint {
        config.feed = config.feed.with_endpoint(endpoint);
    }
    if let Some(interval) = args.interval_ms {
        config.feed = config.feed.with_poll_interval(Duration::from_millis(interval));
    }
    config.validate()?;

    let session = Arc::new(MapSession::new(&config)?);
    let bbox = match args.bbox.as_deref() {
        Some(values) => {
            let edges: [f64; 4] = values.try_into().map_err(|_| {
                anyhow::anyhow!(
                    "--bbox expects west,south,east,north, got {} values",
                    values.len()
                )
            })?;
            BoundingBox::from_array(edges)
        }
        None => BoundingBox::world(),
    };
    session.set_viewport(bbox, args.zoom);

    let source = HttpFeatureSource::from_config(&config.feed)?;
    log::info!(
        "Polling {} every {:?}",
        source.endpoint(),
        config.feed.poll_interval()
    );

    let feed = Arc::new(PointFeed::new(source, config.feed.clone()));
    feed.subscribe(session.clone());
    feed.subscribe(Arc::new(Printer {
        session,
        geojson: args.geojson,
    }));

    let handle = Arc::clone(&feed).spawn();
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    log::info!("Shutting down");
    handle.stop();
    handle.join().await;

    Ok(())
}
