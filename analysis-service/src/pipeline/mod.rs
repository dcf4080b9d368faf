use std::{pin::Pin, sync::Arc};

use futures::{Stream, StreamExt};

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("source error: {0}")]
    Source(String),
    #[error("transform error: {0}")]
    Transform(String),
    #[error("sink error: {0}")]
    Sink(String),
}

pub type RecordStream<T> = Pin<Box<dyn Stream<Item = Result<T, PipelineError>> + Send>>;

#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn stream(&self) -> RecordStream<T>;
}

/// Per-record stage between source and sink.
///
/// `Ok(Some(_))` passes the record on, `Ok(None)` filters it out silently
/// (deduplication), `Err(_)` rejects it as invalid; downstream consumers
/// count and skip rejected records.
#[async_trait::async_trait]
pub trait Transform<T>: Send + Sync {
    async fn apply(&self, input: T) -> Result<Option<T>, PipelineError>;
}

#[async_trait::async_trait]
pub trait Sink<T>: Send + Sync {
    async fn run<S>(&self, input: S) -> Result<(), PipelineError>
    where
        S: Stream<Item = Result<T, PipelineError>> + Send + Unpin + 'static;
}

pub struct Pipeline<S, T, K> {
    pub source: S,
    pub transforms: Vec<Arc<dyn Transform<T> + Send + Sync>>,
    pub sink: K,
}

fn apply_transforms<T>(
    mut stream: RecordStream<T>,
    transforms: Vec<Arc<dyn Transform<T> + Send + Sync>>,
) -> RecordStream<T>
where
    T: Send + 'static,
{
    for t in transforms {
        let t_arc = t.clone();
        stream = Box::pin(stream.filter_map(move |item| {
            let t_inner = t_arc.clone();
            async move {
                match item {
                    Ok(record) => t_inner.apply(record).await.transpose(),
                    Err(e) => Some(Err(e)),
                }
            }
        }));
    }
    stream
}

impl<T, S, K> Pipeline<S, T, K>
where
    T: Send + 'static,
    S: Source<T> + Send + Sync + 'static,
    K: Sink<T> + Send + Sync + 'static,
{
    pub async fn run(self) -> Result<(), PipelineError> {
        let stream = self.source.stream().await;
        let stream = apply_transforms(stream, self.transforms);
        self.sink.run(stream).await
    }
}

/// Run a source through its transforms and gather the surviving records into
/// memory, optionally capped at `limit` rows.
///
/// Rejected records (`PipelineError::Transform`) are counted and skipped;
/// source errors abort, since analysis inputs are expected to be cleaned
/// data.
pub async fn collect_records<T, S>(
    source: S,
    transforms: Vec<Arc<dyn Transform<T> + Send + Sync>>,
    limit: Option<usize>,
) -> Result<Vec<T>, PipelineError>
where
    T: Send + 'static,
    S: Source<T> + Send + Sync + 'static,
{
    let stream = source.stream().await;
    let mut stream = apply_transforms(stream, transforms);

    let mut records = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(record) => records.push(record),
            Err(PipelineError::Transform(e)) => {
                metrics::counter!("analysis_rejected_records_total").increment(1);
                tracing::warn!(error = %e, "rejected record during analysis load");
            }
            Err(e) => return Err(e),
        }
        if let Some(cap) = limit {
            if records.len() >= cap {
                tracing::info!(cap, "record cap reached, truncating analysis input");
                break;
            }
        }
    }

    Ok(records)
}
