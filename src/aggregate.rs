//! Runs every enabled source adapter and collects their output.
//!
//! Adapters run one after another. A source that returns an error, or
//! panics, contributes no records and is recorded as a [`SourceError`];
//! later sources still run.

use crate::models::{Notice, Source, SourceError};
use crate::utils::panic_message;
use futures::FutureExt;
use std::error::Error;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{error, info, instrument};

/// Combined adapter output before deduplication.
#[derive(Debug, Default)]
pub struct Aggregated {
    pub notices: Vec<Notice>,
    pub errors: Vec<SourceError>,
}

/// Run `run` for each source in order, isolating failures per source.
#[instrument(level = "info", skip_all, fields(sources = sources.len()))]
pub async fn aggregate<F, Fut>(sources: &[Source], mut run: F) -> Aggregated
where
    F: FnMut(Source) -> Fut,
    Fut: Future<Output = Result<Vec<Notice>, Box<dyn Error>>>,
{
    let mut out = Aggregated::default();

    for &source in sources {
        let t0 = Instant::now();
        let outcome = AssertUnwindSafe(run(source)).catch_unwind().await;
        let elapsed_ms = t0.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(batch)) => {
                info!(%source, count = batch.len(), elapsed_ms, "Source collected");
                out.notices.extend(batch);
            }
            Ok(Err(e)) => {
                error!(%source, error = %e, elapsed_ms, "Source failed; continuing without it");
                out.errors.push(SourceError::new(source, e.to_string()));
            }
            Err(payload) => {
                let message = format!("panicked: {}", panic_message(payload.as_ref()));
                error!(%source, error = %message, elapsed_ms, "Source panicked; continuing without it");
                out.errors.push(SourceError::new(source, message));
            }
        }
    }

    info!(
        notices = out.notices.len(),
        errors = out.errors.len(),
        "Aggregation complete"
    );
    out
}
