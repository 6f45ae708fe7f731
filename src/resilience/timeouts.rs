//! Timeout enforcement.
//!
//! Every network attempt gets a deadline of connect + read timeout. Expiry
//! surfaces as [`ClientError::Timeout`], which the retry policy treats as
//! retryable.

use std::future::Future;
use std::time::Duration;

use crate::config::{PoolConfig, ServiceDescriptor};
use crate::error::{ClientError, ClientResult};

/// Connect and read deadlines for one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub read: Duration,
}

impl Timeouts {
    pub fn new(connect: Duration, read: Duration) -> Self {
        Self { connect, read }
    }

    /// Descriptor overrides on top of the pool defaults.
    pub fn for_service(pool: &PoolConfig, descriptor: &ServiceDescriptor) -> Self {
        Self {
            connect: Duration::from_secs(
                descriptor
                    .connect_timeout_secs
                    .unwrap_or(pool.connect_timeout_secs),
            ),
            read: Duration::from_secs(
                descriptor.read_timeout_secs.unwrap_or(pool.read_timeout_secs),
            ),
        }
    }

    /// Upper bound for a single attempt.
    pub fn total(&self) -> Duration {
        self.connect.saturating_add(self.read)
    }
}

/// Run `fut` under the attempt deadline.
pub async fn with_deadline<T, F>(service: &str, timeouts: Timeouts, fut: F) -> ClientResult<T>
where
    F: Future<Output = ClientResult<T>>,
{
    let after = timeouts.total();
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Timeout {
            service: service.to_string(),
            after,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_overrides() {
        let pool = PoolConfig::default();
        let plain = ServiceDescriptor::new("sms");
        assert_eq!(
            Timeouts::for_service(&pool, &plain).total(),
            Duration::from_secs(40)
        );

        let tuned = ServiceDescriptor::new("ml-inference").timeouts(5, 120);
        let t = Timeouts::for_service(&pool, &tuned);
        assert_eq!(t.connect, Duration::from_secs(5));
        assert_eq!(t.read, Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expiry_is_retryable() {
        let t = Timeouts::new(Duration::from_secs(1), Duration::from_secs(2));
        let result: ClientResult<()> = with_deadline("inference", t, async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(
            err,
            ClientError::Timeout {
                service: "inference".into(),
                after: Duration::from_secs(3),
            }
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let t = Timeouts::new(Duration::from_secs(1), Duration::from_secs(1));
        let result: ClientResult<()> =
            with_deadline("kms", t, async { Err(ClientError::Permanent("denied".into())) }).await;
        assert_eq!(result, Err(ClientError::Permanent("denied".into())));
    }
}
