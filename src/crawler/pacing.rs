//! Rate limiting between origin round-trips
//!
//! Politeness is enforced by strictly sequential fetches separated by a
//! randomized delay. The delay is drawn uniformly from a band (a long one
//! for page fetches, a shorter one for binary downloads) and never drops
//! below the robots-declared crawl delay.

use crate::config::DelayBand;
use rand::Rng;
use std::time::Duration;

pub struct Pacer {
    floor: Duration,
}

impl Pacer {
    /// `floor` is the robots crawl-delay, or zero when none is declared.
    pub fn new(floor: Duration) -> Self {
        Self { floor }
    }

    /// Sleeps for a jittered delay from the band, floored at the crawl
    /// delay. Call this after every round-trip that touched the origin,
    /// never after a cache hit.
    pub async fn wait(&self, band: DelayBand) {
        let delay = self.pick_delay(band);
        if !delay.is_zero() {
            tracing::trace!("Pacing: sleeping {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }

    fn pick_delay(&self, band: DelayBand) -> Duration {
        let jitter = rand::thread_rng().gen_range(band.low..=band.high);
        Duration::from_secs_f64(jitter.max(0.0)).max(self.floor)
    }
}
