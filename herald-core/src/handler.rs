//! # Handlers
//!
//! The terminal endpoint of every pipeline: listener callbacks, command
//! callbacks, checks, and pre/post-run hooks are all handlers.
//!
//! # Usage Patterns
//!
//! 1. **Direct closure**: `|event: Event| async move { Ok(()) }`
//! 2. **Struct implementation**: `impl Handler<Event> for MyHandler`
//!
//! Handlers are stored type-erased as [`Callback`]s; the blanket [`DynHandler`]
//! implementation does the boxing.

use crate::error::{BoxError, Outcome};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An async endpoint that consumes an owned input.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot handle input of type `{In}`",
    label = "missing `Handler<{In}>` implementation",
    note = "Handlers must implement the `call` method for the input type `{In}`."
)]
pub trait Handler<In: Send + 'static>: Send + Sync + 'static {
    /// The output type of the handler, usually [`Outcome`].
    type Output: Send + 'static;

    /// Executes the handler logic.
    fn call(&self, input: In) -> impl Future<Output = Self::Output> + Send;
}

// Blanket impl for closures
impl<F, In, Out, Fut> Handler<In> for F
where
    In: Send + 'static,
    Out: Send + 'static,
    F: Fn(In) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Out> + Send,
{
    type Output = Out;

    fn call(&self, input: In) -> impl Future<Output = Self::Output> + Send {
        (self)(input)
    }
}

/// Dynamic object-safe version of [`Handler`].
pub trait DynHandler<In>: Send + Sync + 'static {
    type Output;

    /// Executes the handler logic (dynamic dispatch version).
    fn call_dyn(&self, input: In) -> BoxFuture<'_, Self::Output>;
}

// Blanket implementation: Any type implementing Handler implements DynHandler automatically.
impl<In: Send + 'static, H: Handler<In>> DynHandler<In> for H {
    type Output = H::Output;

    fn call_dyn(&self, input: In) -> BoxFuture<'_, Self::Output> {
        Box::pin(self.call(input))
    }
}

/// A type-erased handler returning [`Outcome`].
pub type Callback<In> = Arc<dyn DynHandler<In, Output = Outcome>>;

/// A type-erased check. `Ok(false)` rejects the invocation.
pub type Check<In> = Arc<dyn DynHandler<In, Output = Result<bool, BoxError>>>;

/// Erases a handler into a [`Callback`].
pub fn callback<In, H>(handler: H) -> Callback<In>
where
    In: Send + 'static,
    H: Handler<In, Output = Outcome>,
{
    Arc::new(handler)
}

/// Erases a handler into a [`Check`].
pub fn check<In, H>(handler: H) -> Check<In>
where
    In: Send + 'static,
    H: Handler<In, Output = Result<bool, BoxError>>,
{
    Arc::new(handler)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubler;

    impl Handler<u32> for Doubler {
        type Output = u32;

        async fn call(&self, input: u32) -> u32 {
            input * 2
        }
    }

    #[tokio::test]
    async fn test_struct_and_closure_handlers() {
        assert_eq!(Doubler.call_dyn(21).await, 42);

        let cb: Callback<u32> = callback(|n: u32| async move {
            if n == 0 { Err("zero".into()) } else { Ok(()) }
        });
        assert!(cb.call_dyn(1).await.is_ok());
        assert!(cb.call_dyn(0).await.is_err());
    }
}
