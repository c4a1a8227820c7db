//! Activity audit service: REST API, index provisioning and console seeding.

use activity_api::posts::{NewPost, PostStore};
use activity_api::server::{self, AppState};
use activity_core::ActivityLogger;
use activity_queue::InMemoryActivityQueue;
use activity_store::{provision_index, ElasticsearchStore, InMemoryDocumentStore};
use activity_types::{
    ActivityDispatcher, ActivityLoggingConfig, Auditable, ConsoleInvocation, DeliveryOptions,
    DocumentStore, EventKind, Invocation, JobStatus, LifecycleEvent,
};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the REST API
    Serve {
        /// Listen address (overrides ACTIVITY_API_LISTEN)
        #[arg(long)]
        listen: Option<String>,

        /// Keep activity documents in memory instead of Elasticsearch
        #[arg(long)]
        in_memory: bool,
    },
    /// Create the activity index with its mapping (no-op if it exists)
    CreateIndex,
    /// Create sample posts from the console and wait for their activity to be delivered
    Seed {
        #[arg(long, default_value_t = 3)]
        count: u32,

        #[arg(long)]
        in_memory: bool,
    },
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn document_store(in_memory: bool) -> Arc<dyn DocumentStore> {
    if in_memory {
        Arc::new(InMemoryDocumentStore::new())
    } else {
        Arc::new(ElasticsearchStore::from_env())
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = ActivityLoggingConfig::from_env();

    match cli.command {
        Command::Serve { listen, in_memory } => serve(config, listen, in_memory).await,
        Command::CreateIndex => {
            let store = ElasticsearchStore::from_env();
            let outcome = provision_index(&store, &config.index).await?;
            tracing::info!(index = %config.index.name, outcome = ?outcome, "create-index finished");
            Ok(())
        }
        Command::Seed { count, in_memory } => seed(config, count, in_memory).await,
    }
}

async fn serve(
    config: ActivityLoggingConfig,
    listen: Option<String>,
    in_memory: bool,
) -> Result<(), BoxError> {
    let store = document_store(in_memory);
    if let Err(e) = provision_index(store.as_ref(), &config.index).await {
        tracing::warn!(
            index = %config.index.name,
            error = %e,
            "activity index not provisioned; deliveries will fail until it exists"
        );
    }

    let dispatcher: Arc<dyn ActivityDispatcher> = Arc::new(InMemoryActivityQueue::new(
        store,
        config.index.name.clone(),
        DeliveryOptions::from_env(),
    ));
    let state = Arc::new(AppState {
        logger: ActivityLogger::new(config, Arc::clone(&dispatcher)),
        dispatcher,
        posts: PostStore::new(),
    });

    let app = server::router(state);
    let addr: SocketAddr = listen
        .or_else(|| std::env::var("ACTIVITY_API_LISTEN").ok())
        .unwrap_or_else(|| "0.0.0.0:8002".to_string())
        .parse()?;
    tracing::info!("activity API listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

async fn seed(config: ActivityLoggingConfig, count: u32, in_memory: bool) -> Result<(), BoxError> {
    let store = document_store(in_memory);
    provision_index(store.as_ref(), &config.index).await?;
    let queue = Arc::new(InMemoryActivityQueue::new(
        store,
        config.index.name.clone(),
        DeliveryOptions::from_env(),
    ));
    let logger = ActivityLogger::new(config, queue.clone());
    let invocation = Invocation::Console(ConsoleInvocation::from_args());
    let posts = PostStore::new();

    let mut jobs = Vec::new();
    for n in 1..=count {
        let committed = posts
            .create(NewPost {
                title: format!("Seeded post {}", n),
                content: "Generated by the seed command.".to_string(),
                author_id: None,
                status: None,
            })
            .await;
        let event = LifecycleEvent::of(EventKind::Created, &committed.value)
            .with_transaction_id(committed.transaction_id);
        match logger.log(&event, &invocation) {
            activity_core::LogOutcome::Enqueued { job_id, .. } => jobs.push(job_id),
            other => tracing::warn!(
                post_id = %committed.value.model_id(),
                outcome = ?other,
                "seeded post produced no delivery"
            ),
        }
    }

    for job_id in jobs {
        loop {
            match queue.job(&job_id).await? {
                Some(job) if matches!(job.status, JobStatus::Done | JobStatus::Failed) => {
                    tracing::info!(job_id = %job_id, status = ?job.status, attempts = job.attempts, "seed delivery settled");
                    break;
                }
                Some(_) => tokio::time::sleep(Duration::from_millis(50)).await,
                None => break,
            }
        }
    }
    Ok(())
}
