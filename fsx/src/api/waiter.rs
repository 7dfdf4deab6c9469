//! Polling waiters for volume state transitions

use std::future::Future;
use std::time::{Duration, Instant};
use tfplug::Context;

use crate::api::common::{lifecycle, Volume};
use crate::api::{error::ApiError, Client};

#[derive(Clone, Debug)]
pub struct WaitConfig {
    pub poll_interval: Duration,
    pub create_timeout: Duration,
    pub update_timeout: Duration,
    pub delete_timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            create_timeout: Duration::from_secs(30 * 60),
            update_timeout: Duration::from_secs(30 * 60),
            delete_timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl WaitConfig {
    /// Short intervals for tests against a local fake
    pub fn fast() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            create_timeout: Duration::from_secs(5),
            update_timeout: Duration::from_secs(5),
            delete_timeout: Duration::from_secs(5),
        }
    }
}

/// Outcome of one poll
enum Poll<T> {
    Done(T),
    Pending(String),
}

async fn poll_until<T, F, Fut>(
    ctx: &Context,
    what: &str,
    target: &str,
    timeout: Duration,
    interval: Duration,
    poll: F,
) -> Result<T, ApiError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Poll<T>, ApiError>>,
{
    let started = Instant::now();
    loop {
        let last_state = match poll().await? {
            Poll::Done(value) => return Ok(value),
            Poll::Pending(state) => state,
        };
        if started.elapsed() >= timeout {
            return Err(ApiError::WaitTimeout {
                what: what.to_string(),
                target: target.to_string(),
                last_state,
            });
        }
        tracing::debug!("{} is {}, waiting for {}", what, last_state, target);
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = ctx.cancelled() => return Err(ApiError::Cancelled(what.to_string())),
        }
    }
}

/// Wait for a new volume to become AVAILABLE
pub async fn wait_volume_created(
    client: &Client,
    ctx: &Context,
    config: &WaitConfig,
    volume_id: &str,
) -> Result<Volume, ApiError> {
    let what = format!("FSx OpenZFS Volume ({})", volume_id);
    poll_until(
        ctx,
        &what,
        lifecycle::AVAILABLE,
        config.create_timeout,
        config.poll_interval,
        || async {
            let volume = client.volumes().find_by_id(volume_id).await?;
            let current = volume.lifecycle().to_string();
            match current.as_str() {
                lifecycle::AVAILABLE => Ok(Poll::Done(volume)),
                lifecycle::CREATING | lifecycle::PENDING => Ok(Poll::Pending(current.clone())),
                state => Err(ApiError::UnexpectedState {
                    what: what.clone(),
                    state: state.to_string(),
                    reason: volume.transition_reason(),
                }),
            }
        },
    )
    .await
}

/// Wait for an update to settle: AVAILABLE with no unfinished VOLUME_UPDATE
pub async fn wait_volume_updated(
    client: &Client,
    ctx: &Context,
    config: &WaitConfig,
    volume_id: &str,
) -> Result<Volume, ApiError> {
    let what = format!("FSx OpenZFS Volume ({})", volume_id);
    poll_until(
        ctx,
        &what,
        lifecycle::AVAILABLE,
        config.update_timeout,
        config.poll_interval,
        || async {
            let volume = client.volumes().find_by_id(volume_id).await?;
            if let Some(action) = volume.failed_update() {
                return Err(ApiError::UnexpectedState {
                    what: what.clone(),
                    state: format!("{} FAILED", action.administrative_action_type),
                    reason: volume.transition_reason(),
                });
            }
            let current = volume.lifecycle().to_string();
            match current.as_str() {
                lifecycle::AVAILABLE if !volume.has_pending_update() => Ok(Poll::Done(volume)),
                lifecycle::AVAILABLE => Ok(Poll::Pending("UPDATING".to_string())),
                lifecycle::PENDING => Ok(Poll::Pending(lifecycle::PENDING.to_string())),
                state => Err(ApiError::UnexpectedState {
                    what: what.clone(),
                    state: state.to_string(),
                    reason: volume.transition_reason(),
                }),
            }
        },
    )
    .await
}

/// Wait until the volume can no longer be found
pub async fn wait_volume_deleted(
    client: &Client,
    ctx: &Context,
    config: &WaitConfig,
    volume_id: &str,
) -> Result<(), ApiError> {
    let what = format!("FSx OpenZFS Volume ({})", volume_id);
    poll_until(
        ctx,
        &what,
        "deleted",
        config.delete_timeout,
        config.poll_interval,
        || async {
            match client.volumes().find_by_id(volume_id).await {
                Err(e) if e.is_not_found() => Ok(Poll::Done(())),
                Err(e) => Err(e),
                Ok(volume) => match volume.lifecycle() {
                    lifecycle::DELETING | lifecycle::AVAILABLE | lifecycle::PENDING => {
                        Ok(Poll::Pending(volume.lifecycle().to_string()))
                    }
                    state => Err(ApiError::UnexpectedState {
                        what: what.clone(),
                        state: state.to_string(),
                        reason: volume.transition_reason(),
                    }),
                },
            }
        },
    )
    .await
}
