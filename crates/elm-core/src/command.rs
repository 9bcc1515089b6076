//! Command Streams
//!
//! A command is interpreted by [`Component::call`](crate::Component::call) as a
//! stream of follow-up messages. The stream may yield any number of messages and
//! may never end (a long poll); it is cancelled when the runtime is torn down.
//!
//! Failures should be turned into messages so the transition function decides
//! how to react; [`perform`] does exactly that. A [`CommandError`] yielded by the
//! stream is treated as an unhandled failure and stops the runtime.

use crate::errors::CommandError;
use futures::future::{self, Future};
use futures::stream::{self, BoxStream, Stream, StreamExt};

/// Stream of messages produced by one command execution
pub type CmdStream<M> = BoxStream<'static, Result<M, CommandError>>;

/// A command that produces no message
pub fn none<M: Send + 'static>() -> CmdStream<M> {
    stream::empty().boxed()
}

/// A command that immediately produces one message
pub fn message<M: Send + 'static>(msg: M) -> CmdStream<M> {
    stream::once(future::ready(Ok(msg))).boxed()
}

/// A command that produces the output of an infallible future
pub fn future<F, M>(fut: F) -> CmdStream<M>
where
    F: Future<Output = M> + Send + 'static,
    M: Send + 'static,
{
    stream::once(async move { Ok(fut.await) }).boxed()
}

/// A command whose failure is turned into a message
///
/// This is the recommended way to run fallible effects: both outcomes reach the
/// transition function and the runtime is never put at risk.
pub fn perform<F, T, E, M>(
    fut: F,
    on_success: impl FnOnce(T) -> M + Send + 'static,
    on_failure: impl FnOnce(E) -> M + Send + 'static,
) -> CmdStream<M>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
    M: Send + 'static,
{
    stream::once(async move {
        match fut.await {
            Ok(value) => Ok(on_success(value)),
            Err(error) => Ok(on_failure(error)),
        }
    })
    .boxed()
}

/// A command whose failure escapes to the runtime
pub fn try_future<F, M>(fut: F) -> CmdStream<M>
where
    F: Future<Output = Result<M, CommandError>> + Send + 'static,
    M: Send + 'static,
{
    stream::once(fut).boxed()
}

/// A command producing every message of an infallible stream
pub fn stream<S, M>(messages: S) -> CmdStream<M>
where
    S: Stream<Item = M> + Send + 'static,
    M: Send + 'static,
{
    messages.map(Ok).boxed()
}
