use anyhow::Error as AnyError;
use core::fmt;
use core::future::Future;
use core::pin::Pin;
use tokio_util::sync::CancellationToken;

pub type StageFuture<'a, R> = Pin<Box<dyn Future<Output = anyhow::Result<R>> + Send + 'a>>;

/// The three steps of a sync run, in the order they are normally executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    FetchProposals,
    UpdateNameCache,
    ApplyNameCache,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::FetchProposals => "fetch-proposals",
            StageKind::UpdateNameCache => "update-ens-cache",
            StageKind::ApplyNameCache => "apply-ens-cache",
        };
        f.write_str(name)
    }
}

/// Error surfaced by a stage run. Every instance is fatal for the process.
#[derive(Debug)]
pub struct StageError {
    stage: StageKind,
    source: AnyError,
}

impl StageError {
    pub fn new(stage: StageKind, source: AnyError) -> Self {
        Self { stage, source }
    }

    pub fn stage(&self) -> StageKind {
        self.stage
    }

    /// True when the stage stopped because shutdown was requested.
    pub fn is_interrupted(&self) -> bool {
        self.source.downcast_ref::<Interrupted>().is_some()
    }

    pub fn into_source(self) -> AnyError {
        self.source
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {:#}", self.stage, self.source)
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Returned by a stage that observed a cancelled shutdown token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("interrupted by shutdown request")
    }
}

impl std::error::Error for Interrupted {}

/// One runnable sync step.
pub trait SyncStage: Send + Sync + 'static {
    type Report: fmt::Display + Send + 'static;

    fn kind(&self) -> StageKind;

    /// Runs the stage to completion. Implementations poll `shutdown` at their
    /// own safe points; a stage with no such point may ignore it.
    fn run<'a>(&'a self, shutdown: CancellationToken) -> StageFuture<'a, Self::Report>;
}
