//! Processing seams: the traits the runner dispatches work through.
//!
//! A [`FileProcessor`] consumes one file and returns its artifacts; the
//! runner invokes it once per input, up to `max_concurrency` invocations
//! in flight at a time. A [`BatchProcessor`] consumes the whole file set
//! in one call, for algorithms that naturally span all inputs at once
//! (merging many documents into one, building a contact sheet).
//!
//! Both receive owned, cheaply-cloneable arguments (`Arc`'d files and a
//! context value) so implementations never fight the borrow checker to
//! move work onto blocking threads or spawned tasks.
//!
//! The closure adapters ([`processor_fn`], [`batch_processor_fn`]) wrap a
//! plain async closure for tests and one-off tools that don't warrant a
//! named type.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::{BatchContext, TaskContext};
use crate::error::TaskError;
use crate::input::InputFile;
use crate::output::OutputFile;

/// Per-file processing seam: `(file, ctx) -> outputs`.
///
/// Implementations must honour `ctx.check_cancelled()` cooperatively at
/// stage boundaries and may report status via `ctx.set_message` /
/// `ctx.set_progress`. A returned `Err` fails only this file's task;
/// sibling tasks continue.
#[async_trait]
pub trait FileProcessor: Send + Sync {
    async fn process(
        &self,
        file: Arc<InputFile>,
        ctx: TaskContext,
    ) -> Result<Vec<OutputFile>, TaskError>;
}

/// Whole-set processing seam: `(files, ctx) -> outputs`.
///
/// Progress is reported as a single 0–100 scalar via
/// [`BatchContext::set_progress`]; cancellation is polled the same way as
/// in per-file mode.
#[async_trait]
pub trait BatchProcessor: Send + Sync {
    async fn process(
        &self,
        files: Vec<Arc<InputFile>>,
        ctx: BatchContext,
    ) -> Result<Vec<OutputFile>, TaskError>;
}

/// Adapter turning an async closure into a [`FileProcessor`].
pub struct ProcessorFn<F> {
    f: F,
}

/// Wrap `(Arc<InputFile>, TaskContext) -> impl Future<Output = Result<…>>`
/// as a [`FileProcessor`].
pub fn processor_fn<F, Fut>(f: F) -> ProcessorFn<F>
where
    F: Fn(Arc<InputFile>, TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<OutputFile>, TaskError>> + Send + 'static,
{
    ProcessorFn { f }
}

#[async_trait]
impl<F, Fut> FileProcessor for ProcessorFn<F>
where
    F: Fn(Arc<InputFile>, TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<OutputFile>, TaskError>> + Send + 'static,
{
    async fn process(
        &self,
        file: Arc<InputFile>,
        ctx: TaskContext,
    ) -> Result<Vec<OutputFile>, TaskError> {
        (self.f)(file, ctx).await
    }
}

/// Adapter turning an async closure into a [`BatchProcessor`].
pub struct BatchProcessorFn<F> {
    f: F,
}

/// Wrap `(Vec<Arc<InputFile>>, BatchContext) -> impl Future<Output = …>`
/// as a [`BatchProcessor`].
pub fn batch_processor_fn<F, Fut>(f: F) -> BatchProcessorFn<F>
where
    F: Fn(Vec<Arc<InputFile>>, BatchContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<OutputFile>, TaskError>> + Send + 'static,
{
    BatchProcessorFn { f }
}

#[async_trait]
impl<F, Fut> BatchProcessor for BatchProcessorFn<F>
where
    F: Fn(Vec<Arc<InputFile>>, BatchContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<OutputFile>, TaskError>> + Send + 'static,
{
    async fn process(
        &self,
        files: Vec<Arc<InputFile>>,
        ctx: BatchContext,
    ) -> Result<Vec<OutputFile>, TaskError> {
        (self.f)(files, ctx).await
    }
}
