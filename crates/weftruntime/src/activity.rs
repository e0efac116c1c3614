//! Activity invocation with declarative retry.
//!
//! Retry behavior lives here, in the substrate's invocation layer. The
//! orchestrator delegates one invocation per action and surfaces
//! whatever outcome remains after the policy is exhausted.

use std::sync::Arc;
use std::time::Duration;
use weftcore::{Component, ExecutionContext, ExecutionError, RetryPolicy};

#[derive(Default)]
pub struct ActivityInvoker;

impl ActivityInvoker {
    pub fn new() -> Self {
        Self
    }

    /// Invoke a component, retrying per the action's declared policy.
    /// Without a policy the component runs exactly once.
    pub async fn invoke(
        &self,
        component: Arc<dyn Component>,
        ctx: ExecutionContext,
        policy: Option<&RetryPolicy>,
    ) -> Result<serde_json::Value, ExecutionError> {
        let mut attempt: u32 = 1;
        loop {
            match component.execute(ctx.clone()).await {
                Ok(output) => return Ok(output),
                Err(err) => {
                    let error_type = err.error_type().to_string();
                    let budget = policy.map(|p| p.attempts_for(&error_type)).unwrap_or(1);
                    if attempt >= budget || matches!(err, ExecutionError::Cancelled) {
                        return Err(err);
                    }

                    let delay = policy
                        .map(|p| p.delay_for(&error_type, attempt))
                        .unwrap_or(0);
                    tracing::warn!(
                        node = %ctx.node_ref,
                        attempt,
                        budget,
                        delay_ms = delay,
                        error = %err,
                        "action attempt failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
            }
        }
    }
}
