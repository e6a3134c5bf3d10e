use std::sync::Arc;

use anyhow::Context;
use aws_sdk_sqs::Client as SqsClient;
use ssqs::{Consumer, SqsQueueClient};
use ssqs_worker::{types::Environment, worker::QueueWorker};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = Environment::from_env();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(env.default_log_filter())),
        )
        .init();

    info!("Starting SSQS worker in {:?} environment", env);

    let queue = env.queue();
    let sqs_client = Arc::new(SqsClient::new(
        &env.aws_config(queue.region.as_deref()).await,
    ));
    let consumer = Consumer::new(Arc::new(SqsQueueClient::new(sqs_client)), queue)
        .context("Failed to create consumer")?;

    info!("✅ Initialized consumer for queue {}", consumer.queue().name);

    // Single shutdown token for everything
    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, initiating graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
        }
        signal_token.cancel();
    });

    let stats = QueueWorker::new(consumer, shutdown_token).run().await?;

    info!(
        "✅ SSQS worker stopped after processing {} messages",
        stats.processed
    );
    Ok(())
}
