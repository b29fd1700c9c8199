use crate::core::pipeline::{AsyncTask, Pipeline};
use anyhow::Error;
use async_trait::async_trait;
use tracing::{Instrument, Span};

/// A task which wraps a pipeline so the whole run executes under
/// one span, either a plain span or a sampled root from
/// [`sample_or_attach_root_span!`](crate::sample_or_attach_root_span)
pub struct WrappedPipelineTask<T: Send + Sync> {
    pipeline: Pipeline<T, Error>,
    span_provider: Box<dyn Fn() -> Span + Send + Sync>,
}

impl<T: Send + Sync> WrappedPipelineTask<T> {
    /// Create a wrapped pipeline that will execute
    /// under the resulting span from the span provider
    pub fn new<F>(pipeline: Pipeline<T, Error>, span_provider: F) -> Self
    where
        F: Fn() -> Span + Sync + Send + 'static,
    {
        WrappedPipelineTask {
            pipeline,
            span_provider: Box::new(span_provider),
        }
    }
}

#[async_trait]
impl<T: Send + Sync> AsyncTask<T, Error> for WrappedPipelineTask<T> {
    async fn run(&self, context: &T) -> Result<(), Error> {
        let span = (self.span_provider)();

        self.pipeline.run(context).instrument(span).await
    }
}
