use std::sync::Arc;

use serde::Serialize;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::warn;

use crate::mailer::Mailer;

/// At most this many sends are in flight at once, so a large subscriber list
/// cannot stampede the email provider.
const MAX_IN_FLIGHT: usize = 8;

/// Per-recipient accounting for one campaign dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
}

/// Fan a campaign out to every recipient through a bounded worker pool.
/// Individual failures are logged and counted; they never abort the rest of
/// the batch.
pub async fn dispatch_campaign(
    mailer: Arc<dyn Mailer>,
    subject: &str,
    html: &str,
    recipients: Vec<String>,
) -> DispatchReport {
    let semaphore = Arc::new(Semaphore::new(MAX_IN_FLIGHT));
    let mut tasks = JoinSet::new();

    for email in recipients {
        let mailer = mailer.clone();
        let semaphore = semaphore.clone();
        let subject = subject.to_string();
        let html = html.to_string();
        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return false,
            };
            match mailer.send(&email, &subject, &html).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, recipient = %email, "newsletter send failed");
                    false
                }
            }
        });
    }

    let mut sent = 0;
    let mut failed = 0;
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(true) => sent += 1,
            Ok(false) => failed += 1,
            Err(e) => {
                warn!(error = %e, "newsletter send task aborted");
                failed += 1;
            }
        }
    }

    DispatchReport { sent, failed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ObservingMailer {
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
        delivered: AtomicUsize,
    }

    impl ObservingMailer {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
                delivered: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Mailer for ObservingMailer {
        async fn send(&self, to: &str, _subject: &str, _html: &str) -> anyhow::Result<()> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if to.ends_with("@bounce.test") {
                anyhow::bail!("mailbox unavailable");
            }
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn recipients(n: usize, domain: &str) -> Vec<String> {
        (0..n).map(|i| format!("user{}@{}", i, domain)).collect()
    }

    #[tokio::test]
    async fn every_recipient_is_attempted() {
        let mailer = Arc::new(ObservingMailer::new());
        let report = dispatch_campaign(
            mailer.clone(),
            "Hello",
            "<p>hi</p>",
            recipients(25, "example.com"),
        )
        .await;
        assert_eq!(report.sent, 25);
        assert_eq!(report.failed, 0);
        assert_eq!(mailer.delivered.load(Ordering::SeqCst), 25);
    }

    #[tokio::test]
    async fn failures_are_counted_not_fatal() {
        let mailer = Arc::new(ObservingMailer::new());
        let mut all = recipients(10, "example.com");
        all.extend(recipients(4, "bounce.test"));
        let report = dispatch_campaign(mailer, "Hello", "<p>hi</p>", all).await;
        assert_eq!(report.sent, 10);
        assert_eq!(report.failed, 4);
    }

    #[tokio::test]
    async fn concurrency_stays_bounded() {
        let mailer = Arc::new(ObservingMailer::new());
        dispatch_campaign(
            mailer.clone(),
            "Hello",
            "<p>hi</p>",
            recipients(50, "example.com"),
        )
        .await;
        assert!(mailer.peak_in_flight.load(Ordering::SeqCst) <= MAX_IN_FLIGHT);
    }

    #[tokio::test]
    async fn empty_recipient_list_reports_zero() {
        let mailer = Arc::new(ObservingMailer::new());
        let report = dispatch_campaign(mailer, "Hello", "<p>hi</p>", Vec::new()).await;
        assert_eq!(report.sent, 0);
        assert_eq!(report.failed, 0);
    }
}
