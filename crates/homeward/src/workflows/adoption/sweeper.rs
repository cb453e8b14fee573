use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate};
use tracing::{info, warn};

use super::messaging::{EmailSender, PushChannel};
use super::repository::AdoptionStore;
use super::service::{AdoptionService, AdoptionServiceError};

/// Periodic batch process that force-expires applications whose home-visit
/// deadline has arrived unbooked. Feeds the same state-machine contract as
/// every other caller, just under the system actor.
pub struct ExpirationSweeper<S, E, P> {
    service: Arc<AdoptionService<S, E, P>>,
}

impl<S, E, P> ExpirationSweeper<S, E, P>
where
    S: AdoptionStore + 'static,
    E: EmailSender + 'static,
    P: PushChannel + 'static,
{
    pub fn new(service: Arc<AdoptionService<S, E, P>>) -> Self {
        Self { service }
    }

    /// One pass for the given day. Returns how many applications expired.
    pub fn run_once(&self, today: NaiveDate) -> Result<usize, AdoptionServiceError> {
        self.service.expire_due(today)
    }

    /// Daily loop: sleep until the next local midnight, then sweep.
    pub async fn run(self) {
        loop {
            let now = Local::now();
            let next_midnight = (now.date_naive() + Duration::days(1))
                .and_hms_opt(0, 0, 0)
                .expect("midnight is a valid time");
            let wait = (next_midnight - now.naive_local())
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(60));
            tokio::time::sleep(wait).await;

            let today = Local::now().date_naive();
            match self.run_once(today) {
                Ok(0) => {}
                Ok(count) => info!(%today, count, "expired overdue applications"),
                Err(err) => warn!(%today, error = %err, "expiration sweep failed"),
            }
        }
    }
}
