use async_trait::async_trait;

/// A synchronous unit of work executed against a shared context.
/// Returning an error stops the owning pipeline.
pub trait BlockingTask<C, E>: Send + Sync {
    fn run(&self, context: &C) -> Result<(), E>;
}

/// An asynchronous unit of work executed against a shared context.
/// Returning an error stops the owning pipeline.
#[async_trait]
pub trait AsyncTask<C, E>: Send + Sync {
    async fn run(&self, context: &C) -> Result<(), E>;
}

enum Stage<C, E> {
    Blocking(Box<dyn BlockingTask<C, E>>),
    Async(Box<dyn AsyncTask<C, E>>),
}

/// An ordered chain of tasks sharing one context. Tasks communicate
/// only through the context, and the first failing task aborts
/// the remainder of the chain.
pub struct Pipeline<C, E> {
    stages: Vec<Stage<C, E>>,
}

impl<C: Send + Sync, E> Pipeline<C, E> {
    pub async fn run(&self, context: &C) -> Result<(), E> {
        for stage in &self.stages {
            match stage {
                Stage::Blocking(task) => task.run(context)?,
                Stage::Async(task) => task.run(context).await?,
            }
        }

        Ok(())
    }
}

pub struct PipelineBuilder<C, E> {
    stages: Vec<Stage<C, E>>,
}

impl<C: Send + Sync, E> PipelineBuilder<C, E> {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn with_blocking(mut self, task: Box<dyn BlockingTask<C, E>>) -> Self {
        self.add_blocking(task);
        self
    }

    pub fn with_async(mut self, task: Box<dyn AsyncTask<C, E>>) -> Self {
        self.add_async(task);
        self
    }

    pub fn add_blocking(&mut self, task: Box<dyn BlockingTask<C, E>>) {
        self.stages.push(Stage::Blocking(task));
    }

    pub fn add_async(&mut self, task: Box<dyn AsyncTask<C, E>>) {
        self.stages.push(Stage::Async(task));
    }

    /// Returns `None` when no tasks were added
    pub fn build(self) -> Option<Pipeline<C, E>> {
        if self.stages.is_empty() {
            return None;
        }

        Some(Pipeline {
            stages: self.stages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Error, bail};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Trace {
        steps: Mutex<Vec<&'static str>>,
    }

    struct Step(&'static str);

    impl BlockingTask<Trace, Error> for Step {
        fn run(&self, context: &Trace) -> Result<(), Error> {
            context.steps.lock().push(self.0);
            Ok(())
        }
    }

    struct AsyncStep(&'static str);

    #[async_trait]
    impl AsyncTask<Trace, Error> for AsyncStep {
        async fn run(&self, context: &Trace) -> Result<(), Error> {
            tokio::task::yield_now().await;
            context.steps.lock().push(self.0);
            Ok(())
        }
    }

    struct Abort;

    impl BlockingTask<Trace, Error> for Abort {
        fn run(&self, _context: &Trace) -> Result<(), Error> {
            bail!("stop here")
        }
    }

    #[test]
    fn test_empty_builder_yields_none() {
        assert!(PipelineBuilder::<Trace, Error>::new().build().is_none());
    }

    #[tokio::test]
    async fn test_tasks_run_in_order() {
        let pipeline = PipelineBuilder::new()
            .with_blocking(Box::new(Step("a")))
            .with_async(Box::new(AsyncStep("b")))
            .with_blocking(Box::new(Step("c")))
            .build()
            .unwrap();

        let trace = Trace::default();
        pipeline.run(&trace).await.unwrap();

        assert_eq!(*trace.steps.lock(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_error_aborts_remaining_tasks() {
        let pipeline = PipelineBuilder::new()
            .with_blocking(Box::new(Step("a")))
            .with_blocking(Box::new(Abort))
            .with_blocking(Box::new(Step("c")))
            .build()
            .unwrap();

        let trace = Trace::default();
        let err = pipeline.run(&trace).await.unwrap_err();

        assert_eq!(err.to_string(), "stop here");
        assert_eq!(*trace.steps.lock(), vec!["a"]);
    }
}
