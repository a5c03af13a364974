use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use common::event::SubmissionEvent;
use common::storage::SourceLayout;
use common::{LanguageTable, SubmissionState};
use mq::{BrokerQueue, JudgeQueue, MqConfig, init_mq};
use tracing::{error, info};
use worker::notify::snapshot;
use worker::{
    Admission, BroadcastNotifier, Catalog, Judge, Lifecycle, MemoryStore, Notifier, Notifiers,
    ProcessHarness, QueueNotifier, Scoring, SubmissionRequest, SubmissionStore, WorkerAppConfig,
    WorkerPool,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Users, contests and problems to judge against
    #[arg(
        long,
        env = "ARBITER_CATALOG",
        global = true,
        default_value = "config/catalog.toml"
    )]
    catalog: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit one source file, judge it and print the final result as JSON
    Judge {
        #[arg(long)]
        user: i32,
        #[arg(long)]
        problem: i32,
        /// Language tag from the configured language table
        #[arg(long)]
        language: String,
        source: PathBuf,
    },
    /// Consume judge jobs from the broker until stopped
    Serve,
}

/// Components shared by both commands.
struct Services {
    store: Arc<MemoryStore>,
    layout: SourceLayout,
    languages: Arc<LanguageTable>,
    broadcast: BroadcastNotifier,
    notifier: Arc<dyn Notifier>,
    broker: Option<Arc<BrokerQueue>>,
    pool: WorkerPool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();
    let config = WorkerAppConfig::load().context("Failed to load config")?;
    info!("Worker starting: {}", config.worker.id);

    let services = build(&config, &cli.catalog).await?;

    match cli.command {
        Commands::Judge {
            user,
            problem,
            language,
            source,
        } => judge_one(&config, services, user, problem, language, &source).await,
        Commands::Serve => serve(&config, services).await,
    }
}

async fn build(config: &WorkerAppConfig, catalog: &Path) -> anyhow::Result<Services> {
    let store = Arc::new(MemoryStore::new());
    Catalog::load(catalog)
        .with_context(|| format!("Failed to load catalog {}", catalog.display()))?
        .seed(&store)
        .await;

    let languages = Arc::new(config.languages.clone());
    if languages.is_empty() {
        bail!("No languages configured");
    }
    let layout = SourceLayout::new(&config.judge.submissions_dir);

    let broadcast = BroadcastNotifier::new(64);
    let mut notifiers = Notifiers::new().with(Arc::new(broadcast.clone()));

    let broker = if config.mq.enabled {
        let mq = Arc::new(
            init_mq(MqConfig::from(&config.mq))
                .await
                .context("Failed to initialize MQ")?,
        );
        info!(
            queue_name = %config.mq.queue_name,
            event_queue_name = %config.mq.event_queue_name,
            "MQ connected"
        );
        let broker = Arc::new(BrokerQueue::new(mq, &config.mq.queue_name));
        notifiers = notifiers.with(Arc::new(QueueNotifier::new(
            broker.clone(),
            &config.mq.event_queue_name,
        )));
        Some(broker)
    } else {
        None
    };
    let notifier: Arc<dyn Notifier> = Arc::new(notifiers);

    let judge = Judge::new(
        store.clone(),
        Arc::new(ProcessHarness::new(&config.judge.harness_bin)),
        layout.clone(),
        languages.clone(),
        Scoring::new(store.clone(), config.judge.decay_point_per_step),
    );
    let lifecycle = Arc::new(Lifecycle::new(
        store.clone(),
        Arc::new(judge),
        notifier.clone(),
        languages.clone(),
    ));
    let pool = WorkerPool::new(lifecycle, config.worker.concurrency);

    Ok(Services {
        store,
        layout,
        languages,
        broadcast,
        notifier,
        broker,
        pool,
    })
}

async fn judge_one(
    config: &WorkerAppConfig,
    services: Services,
    user: i32,
    problem: i32,
    language: String,
    source: &Path,
) -> anyhow::Result<()> {
    let content = tokio::fs::read(source)
        .await
        .with_context(|| format!("Failed to read {}", source.display()))?;
    let request = SubmissionRequest {
        user_id: Some(user),
        problem_id: Some(problem),
        language: Some(language),
        source: Some(content),
    };

    let finished = match services.broker.clone() {
        Some(broker) => judge_via_broker(config, services, broker, request).await?,
        None => judge_in_process(services, request).await?,
    };
    println!("{}", serde_json::to_string_pretty(&finished)?);
    Ok(())
}

async fn judge_in_process(
    services: Services,
    request: SubmissionRequest,
) -> anyhow::Result<SubmissionEvent> {
    let (queue, receiver) = mq::channel();
    let admission = admission(&services, Arc::new(queue));
    let submission = admission.submit(request).await?;
    // Dropping the last sender lets the pool drain and stop.
    drop(admission);
    services.pool.run(receiver).await;

    let submission = services.store.submission(submission.id).await?;
    Ok(snapshot(services.store.as_ref(), &services.languages, &submission).await?)
}

async fn judge_via_broker(
    config: &WorkerAppConfig,
    services: Services,
    broker: Arc<BrokerQueue>,
    request: SubmissionRequest,
) -> anyhow::Result<SubmissionEvent> {
    let mut events = services.broadcast.subscribe();
    let submission = admission(&services, broker.clone()).submit(request).await?;

    let queue_name = config.mq.queue_name.clone();
    let pool = services.pool;
    let consumer =
        tokio::spawn(async move { pool.run_broker(broker.broker(), &queue_name).await });

    let finished = loop {
        let event = events.recv().await.context("Event channel closed")?;
        if event.id == submission.id && event.state == SubmissionState::Finished {
            break event;
        }
    };
    consumer.abort();
    Ok(finished)
}

async fn serve(config: &WorkerAppConfig, services: Services) -> anyhow::Result<()> {
    let Some(broker) = services.broker.clone() else {
        bail!("`serve` needs the broker queue; set mq.enabled = true");
    };
    if let Err(e) = services
        .pool
        .run_broker(broker.broker(), &config.mq.queue_name)
        .await
    {
        error!(error = %e, "Worker stopped unexpectedly");
    }
    Ok(())
}

fn admission(services: &Services, queue: Arc<dyn JudgeQueue>) -> Admission {
    Admission::new(
        services.store.clone(),
        services.layout.clone(),
        services.languages.clone(),
        queue,
        services.notifier.clone(),
    )
}
