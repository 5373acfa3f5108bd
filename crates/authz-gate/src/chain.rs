use std::future::Future;

use crate::context::GateContext;
use crate::errors::GateRejection;
use crate::guards::Guard;

/// Ordered guards evaluated before a handler. The first denial wins.
#[derive(Default)]
pub struct GuardChain {
    guards: Vec<Box<dyn Guard>>,
}

impl GuardChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, guard: impl Guard + 'static) -> Self {
        self.guards.push(Box::new(guard));
        self
    }

    pub fn push(&mut self, guard: Box<dyn Guard>) {
        self.guards.push(guard);
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    pub fn check(&self, cx: &GateContext) -> Result<(), GateRejection> {
        for guard in &self.guards {
            guard.check(cx)?;
        }
        Ok(())
    }

    /// Runs `handler` only once every guard has passed.
    pub async fn run<F, Fut, T>(&self, cx: GateContext, handler: F) -> Result<T, GateRejection>
    where
        F: FnOnce(GateContext) -> Fut,
        Fut: Future<Output = T>,
    {
        self.check(&cx)?;
        Ok(handler(cx).await)
    }
}
