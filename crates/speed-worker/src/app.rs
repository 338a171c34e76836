use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use speed_core::ActionExecutor;
use speed_report::{HttpReportSource, register_reports};
use speed_rpc::{ConsumerMetrics, LoggingMetricsBackend, RpcConsumer};
use speed_storage::{DiskStore, YaDiskBackend};
use tokio_util::sync::CancellationToken;

use crate::config::SpeedConfig;
use crate::signal::spawn_shutdown_listener;

pub fn build_store(config: &SpeedConfig) -> Result<DiskStore> {
    let token = config.disk.token()?;
    let backend = YaDiskBackend::new(config.disk.api_url.clone(), token, config.disk.timeout())?;
    Ok(DiskStore::new(Arc::new(backend), config.disk.base_dir.clone())
        .with_policy(config.disk.policy())
        .with_span(tracing::info_span!("storage")))
}

/// Wire the worker together and consume until shutdown or a broker failure.
pub async fn serve(config: SpeedConfig) -> Result<()> {
    let store = Arc::new(build_store(&config)?);
    store
        .connect()
        .await
        .context("storage is not reachable with the configured token")?;

    let source = HttpReportSource::new(
        config.report.base_url.clone(),
        config.report.report_path.clone(),
        config.report.timeout(),
    )?
    .with_span(tracing::info_span!("report_source"));

    let executor = register_reports(
        ActionExecutor::new().with_span(tracing::info_span!("action")),
        Arc::new(source),
        store,
    );

    tracing::info!(
        dsn = %config.rabbit.redacted_dsn(),
        queue = %config.rabbit.queue,
        "Connecting to broker"
    );
    let metrics = Arc::new(ConsumerMetrics::with_backend(Arc::new(LoggingMetricsBackend)));
    let mut consumer = RpcConsumer::new(Arc::new(executor))
        .with_metrics(Arc::clone(&metrics))
        .with_span(tracing::info_span!("consumer", queue = %config.rabbit.queue));
    consumer
        .connect(&config.rabbit.dsn(), &config.rabbit.queue)
        .await
        .context("could not connect to the message broker")?;

    let shutdown = CancellationToken::new();
    let listener = spawn_shutdown_listener(shutdown.clone());

    let result = consumer.run(shutdown.clone()).await;
    shutdown.cancel();
    let _ = listener.await;

    tracing::info!(metrics = ?metrics.snapshot(), "Worker stopped");
    result.context("consumer stopped on a broker error")
}

pub async fn list_files(config: &SpeedConfig) -> Result<()> {
    let store = build_store(config)?;
    for name in store.list().await? {
        println!("{name}");
    }
    Ok(())
}

pub async fn download_file(config: &SpeedConfig, name: &str, output: Option<&Path>) -> Result<()> {
    let store = build_store(config)?;
    let bytes = store.download(name).await?;
    let target = output.unwrap_or_else(|| Path::new(name));
    tokio::fs::write(target, &bytes)
        .await
        .with_context(|| format!("failed to write {}", target.display()))?;
    tracing::info!(file = name, size = bytes.len(), to = %target.display(), "Downloaded");
    Ok(())
}

pub async fn remove_file(config: &SpeedConfig, name: &str) -> Result<()> {
    build_store(config)?.remove(name).await?;
    Ok(())
}
