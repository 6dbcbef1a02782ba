use anyhow::Result;
use butterfly_classifier::{
    classify::ClassificationPipeline,
    config::{parse_resize_filter, Config},
    image::ImageLoader,
    models::ModelManager,
    web::serve,
};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "butterfly-classifier")]
#[command(about = "ONNX-powered butterfly species classification service")]
struct Args {
    /// Server bind address
    #[arg(long, default_value = "0.0.0.0:5005")]
    bind: String,

    /// Number of worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Model directory path
    #[arg(long, default_value = "models")]
    models_dir: String,

    /// Label file overriding the built-in label table
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Maximum retained history entries (0 = unbounded)
    #[arg(long, default_value_t = 50)]
    history_limit: usize,

    /// Search host used for "more info" links
    #[arg(long, default_value = "www.google.com")]
    search_engine: String,

    /// Resize filter: nearest, triangle, catmullrom, gaussian or lanczos3
    #[arg(long, default_value = "triangle")]
    resize_filter: String,

    /// Classify a single image and exit
    #[arg(long, value_name = "PATH")]
    classify: Option<PathBuf>,

    /// Enable development mode
    #[arg(long)]
    dev: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_target(false)
        .init();

    let config = Config::new(args.bind, args.models_dir, args.workers, args.dev)?
        .with_history_limit(args.history_limit)
        .with_labels_file(args.labels)
        .with_search_engine(args.search_engine)
        .with_resize_filter(parse_resize_filter(&args.resize_filter)?);

    if let Some(path) = args.classify {
        if !classify_once(&config, path) {
            std::process::exit(1);
        }
        return Ok(());
    }

    tracing::info!("Starting butterfly classifier service...");
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Models directory: {}", config.models_dir.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers.max(1))
        .enable_all()
        .build()?;

    runtime.block_on(serve(config))?;

    Ok(())
}

/// 单次分类，打印展示文本；失败时返回 false
fn classify_once(config: &Config, path: PathBuf) -> bool {
    let outcome = ModelManager::init(config).and_then(|models| {
        let pipeline = ClassificationPipeline::from_manager(&models, &config.classifier_config);
        let image = ImageLoader::from_path(&path)?;
        pipeline.classify(&image)
    });

    match outcome {
        Ok(prediction) => {
            println!("{} ({:.1}%)", prediction.label, prediction.confidence * 100.0);
            true
        }
        Err(e) => {
            tracing::error!("Classification of {} failed: {}", path.display(), e);
            println!("{}", e.display_message());
            false
        }
    }
}
