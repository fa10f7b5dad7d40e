// SPDX-License-Identifier: MIT

//! Step contract for graph nodes
//!
//! A step reads the accumulated state and answers with a partial update
//! holding only the fields it produced. It never mutates the state it is
//! given; the executor merges the update.

use crate::adk::error::BoxError;
use crate::arcflow::workflow::state::State;
use async_trait::async_trait;
use std::marker::PhantomData;

/// A unit of work attached to a graph node
#[async_trait]
pub trait Step<S: State>: Send + Sync {
    /// Run the step against the accumulated state
    async fn run(&self, state: &S) -> Result<S::Update, BoxError>;
}

/// Adapter turning a synchronous closure into a [`Step`]
pub struct FnStep<S, F> {
    f: F,
    _state: PhantomData<fn(&S)>,
}

/// Wrap a closure `Fn(&S) -> Result<S::Update, BoxError>` as a step
pub fn step_fn<S, F>(f: F) -> FnStep<S, F>
where
    S: State,
    F: Fn(&S) -> Result<S::Update, BoxError> + Send + Sync,
{
    FnStep {
        f,
        _state: PhantomData,
    }
}

#[async_trait]
impl<S, F> Step<S> for FnStep<S, F>
where
    S: State,
    F: Fn(&S) -> Result<S::Update, BoxError> + Send + Sync,
{
    async fn run(&self, state: &S) -> Result<S::Update, BoxError> {
        (self.f)(state)
    }
}
