use clap::Parser;
use std::{path::PathBuf, process::ExitCode};

use nowplaying_card::{
    api::{InvidiousResolver, MetadataResolver, OfflineResolver, DEFAULT_INVIDIOUS},
    CardComposer, CardConfig,
};

/// Render a "now playing" card for a video.
#[derive(Debug, Parser)]
struct Args {
    /// The id of the video.
    /// Can be found in the URL: https://www.youtube.com/watch?v=<id>
    video_id: String,

    /// JSON file with asset paths and layout constants.
    #[clap(long)]
    config: Option<PathBuf>,

    /// Where downloads and finished cards are written.
    #[clap(long)]
    cache_dir: Option<PathBuf>,

    /// Overlay image whose opaque region holds the card content.
    #[clap(long)]
    overlay: Option<PathBuf>,

    /// Preview image used when the real one is unavailable.
    #[clap(long)]
    default_image: Option<PathBuf>,

    /// Font for the title and brand label.
    #[clap(long)]
    font_main: Option<PathBuf>,

    /// Font for the remaining text.
    #[clap(long)]
    font_small: Option<PathBuf>,

    /// Invidious instance used to look up video metadata.
    #[clap(long, default_value = DEFAULT_INVIDIOUS)]
    invidious: String,

    /// Skip the metadata lookup and render with placeholder values.
    #[clap(long)]
    offline: bool,

    /// Log every step, including computed geometry.
    #[clap(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose {
        log::Level::Debug
    } else {
        log::Level::Info
    };
    if let Err(e) = simple_logger::init_with_level(level) {
        eprintln!("Unable to set up logging: {e}");
    }

    let mut config = match &args.config {
        Some(path) => match CardConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => CardConfig::default(),
    };
    apply_overrides(&mut config, &args);

    if args.offline {
        run(OfflineResolver, config, &args.video_id).await
    } else {
        let resolver = InvidiousResolver::new(&args.invidious, config.http_timeout());
        run(resolver, config, &args.video_id).await
    }
}

fn apply_overrides(config: &mut CardConfig, args: &Args) {
    let assets = &mut config.assets;
    let overrides = [
        (&mut config.cache_dir, &args.cache_dir),
        (&mut assets.overlay, &args.overlay),
        (&mut assets.default_image, &args.default_image),
        (&mut assets.font_main, &args.font_main),
        (&mut assets.font_small, &args.font_small),
    ];
    for (target, value) in overrides {
        if let Some(value) = value {
            *target = value.clone();
        }
    }
}

async fn run(resolver: impl MetadataResolver, config: CardConfig, video_id: &str) -> ExitCode {
    let composer = CardComposer::new(resolver, config);

    match composer.render(video_id).await {
        Some(card) => {
            println!("{}", card.path.display());
            ExitCode::SUCCESS
        }
        None => ExitCode::FAILURE,
    }
}
