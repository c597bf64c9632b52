//! The caller-supplied transform applied to every item.
//!
//! A reducer maps one item to an optional result. It is invoked concurrently
//! from every worker, so implementations must be `Send + Sync`; the engine
//! cannot check that a reducer is actually free of races on its own state.

use std::marker::PhantomData;

use thiserror::Error;

/// Error returned by a fallible reducer. Delivered downstream as a fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ReduceError {
    pub message: String,
}

impl ReduceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Item → optional result.
pub trait Reducer<I>: Send + Sync + 'static {
    type Output: Send + 'static;

    /// `Ok(None)` means "no output for this item" and is never placed on the
    /// output queue.
    fn reduce(&self, item: I) -> Result<Option<Self::Output>, ReduceError>;
}

/// Reducer backed by an infallible closure. See [`from_fn`].
pub struct FnReducer<F, R> {
    f: F,
    _output: PhantomData<fn() -> R>,
}

impl<I, R, F> Reducer<I> for FnReducer<F, R>
where
    F: Fn(I) -> Option<R> + Send + Sync + 'static,
    R: Send + 'static,
{
    type Output = R;

    fn reduce(&self, item: I) -> Result<Option<R>, ReduceError> {
        Ok((self.f)(item))
    }
}

/// Reducer backed by a fallible closure. See [`try_from_fn`].
pub struct TryFnReducer<F, R, E> {
    f: F,
    _output: PhantomData<fn() -> (R, E)>,
}

impl<I, R, E, F> Reducer<I> for TryFnReducer<F, R, E>
where
    F: Fn(I) -> Result<Option<R>, E> + Send + Sync + 'static,
    R: Send + 'static,
    E: std::fmt::Display + 'static,
{
    type Output = R;

    fn reduce(&self, item: I) -> Result<Option<R>, ReduceError> {
        (self.f)(item).map_err(|e| ReduceError::new(e.to_string()))
    }
}

/// Wrap a closure returning `Option<R>`.
pub fn from_fn<I, R, F>(f: F) -> FnReducer<F, R>
where
    F: Fn(I) -> Option<R> + Send + Sync + 'static,
    R: Send + 'static,
{
    FnReducer {
        f,
        _output: PhantomData,
    }
}

/// Wrap a closure returning `Result<Option<R>, E>`. An `Err` becomes a fault
/// outcome carrying the error's `Display` text.
pub fn try_from_fn<I, R, E, F>(f: F) -> TryFnReducer<F, R, E>
where
    F: Fn(I) -> Result<Option<R>, E> + Send + Sync + 'static,
    R: Send + 'static,
    E: std::fmt::Display + 'static,
{
    TryFnReducer {
        f,
        _output: PhantomData,
    }
}
