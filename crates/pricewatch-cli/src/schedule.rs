//! Background price checks for `pricewatch watch`.
//!
//! Registers one cron job (`PRICEWATCH_CHECK_CRON`) that checks every item.
//! A run also happens once at start-up so a fresh `watch` does not wait for
//! the first cron tick.

use std::sync::Arc;

use pricewatch_core::AppConfig;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::check::run_checks;
use crate::notify::Notifier;

/// Builds and starts the scheduler. The returned handle must be kept alive;
/// dropping it stops the jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the cron expression is invalid, or the scheduler fails to start.
pub(crate) async fn build_scheduler(
    pool: PgPool,
    config: Arc<AppConfig>,
    notifier: Arc<dyn Notifier>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_check_job(&scheduler, pool, config, notifier).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_check_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<AppConfig>,
    notifier: Arc<dyn Notifier>,
) -> Result<(), JobSchedulerError> {
    let cron = config.check_cron.clone();
    let pool = Arc::new(pool);

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);
        let notifier = Arc::clone(&notifier);

        Box::pin(async move {
            run_scheduled_checks(&pool, &config, notifier.as_ref()).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered price check job");
    Ok(())
}

/// One scheduled pass over all items; errors are logged, never propagated.
pub(crate) async fn run_scheduled_checks(pool: &PgPool, config: &AppConfig, notifier: &dyn Notifier) {
    tracing::info!("scheduler: starting price check run");
    match run_checks(pool, config, None, notifier).await {
        Ok(totals) => tracing::info!(
            checked = totals.checked,
            changes = totals.changes.len(),
            "scheduler: price check run complete"
        ),
        Err(e) => tracing::error!(error = %e, "scheduler: price check run failed"),
    }
}

/// Runs checks now, then on the cron schedule until Ctrl-C or SIGTERM.
pub(crate) async fn run_watch(
    pool: PgPool,
    config: Arc<AppConfig>,
    notifier: Arc<dyn Notifier>,
) -> anyhow::Result<()> {
    run_scheduled_checks(&pool, &config, notifier.as_ref()).await;

    let mut scheduler = build_scheduler(pool, config, notifier).await?;
    shutdown_signal().await;
    scheduler.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping scheduler");
}
