use crate::runtime::stage::{StageError, SyncStage};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Runs one stage and turns Ctrl-C into a cooperative shutdown request.
pub struct Runner<S: SyncStage> {
    stage: S,
    shutdown: CancellationToken,
}

impl<S: SyncStage> Runner<S> {
    pub fn new(stage: S) -> Self {
        Self {
            stage,
            shutdown: CancellationToken::new(),
        }
    }

    /// Returns a clone of the root shutdown token so callers can cancel the
    /// run from their own signal handlers.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }

    /// Runs the stage without installing a signal handler.
    pub async fn run(&self) -> Result<S::Report, StageError> {
        let kind = self.stage.kind();
        tracing::info!(stage = %kind, "stage started");

        match self.stage.run(self.shutdown.clone()).await {
            Ok(report) => {
                tracing::info!(stage = %kind, "stage finished");
                Ok(report)
            }
            Err(err) => {
                let err = StageError::new(kind, err);
                if err.is_interrupted() {
                    tracing::warn!(stage = %kind, "stage interrupted");
                } else {
                    tracing::error!(stage = %kind, error = %err, "stage failed");
                }
                Err(err)
            }
        }
    }

    /// Runs the stage; a Ctrl-C (SIGINT) received meanwhile cancels the
    /// shutdown token.
    pub async fn run_until_ctrl_c(&self) -> Result<S::Report, StageError> {
        let token = self.shutdown.clone();
        let watcher = tokio::spawn(async move {
            tokio::select! {
                result = signal::ctrl_c() => {
                    match result {
                        Ok(()) => tracing::info!("Ctrl-C received; requesting shutdown"),
                        Err(err) => tracing::warn!(error = %err, "failed to listen for Ctrl-C"),
                    }
                    token.cancel();
                }
                _ = token.cancelled() => {}
            }
        });

        let outcome = self.run().await;
        watcher.abort();
        outcome
    }
}
