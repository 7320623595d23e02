//! Delivery capability for assembled batches, with the default HTTP implementation.
use reqwest::Url;

use crate::batch::EventBatch;
use crate::{Error, Result};

/// Default collection endpoint for [`HttpEventDispatcher`].
pub const DEFAULT_EVENTS_ENDPOINT: &str = "https://logx.expsdk.io/v1/events";

/// The capability, supplied by the embedder, that attempts to deliver one assembled batch.
///
/// Returning `Err` means the batch was not delivered; the processor keeps the batch's events
/// queued and retries them on the next flush trigger. The processor never issues concurrent
/// `dispatch_event` calls for one instance, so implementations are invoked sequentially from a
/// single worker thread.
pub trait EventDispatcher: Send + Sync {
    /// Attempt to deliver `batch` to the collection endpoint.
    fn dispatch_event(&self, batch: &EventBatch) -> Result<()>;
}

/// Default [`EventDispatcher`]: one HTTP POST per batch, JSON body, any 2xx response counts as
/// delivered.
pub struct HttpEventDispatcher {
    // Client holds a connection pool internally, so we're reusing the client between batches.
    client: reqwest::blocking::Client,
    endpoint: Url,
}

impl HttpEventDispatcher {
    /// Create a dispatcher posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if `endpoint` is not a valid URL. This is the only
    /// point where endpoint misconfiguration surfaces; dispatch failures during steady-state
    /// operation are handled by the processor's retry behavior instead.
    pub fn new(endpoint: &str) -> Result<HttpEventDispatcher> {
        let endpoint = Url::parse(endpoint).map_err(Error::InvalidEndpoint)?;
        Ok(HttpEventDispatcher {
            client: reqwest::blocking::Client::new(),
            endpoint,
        })
    }
}

impl EventDispatcher for HttpEventDispatcher {
    fn dispatch_event(&self, batch: &EventBatch) -> Result<()> {
        log::debug!(target: "exp_events", visitors = batch.visitors.len(); "posting event batch");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(batch)
            .send()?;

        response.error_for_status().map_err(|err| {
            log::warn!(target: "exp_events", "received non-2xx response while posting event batch: {:?}", err);
            Error::from(err)
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_endpoint_is_rejected_at_construction() {
        let result = HttpEventDispatcher::new("not an endpoint");
        assert!(matches!(result, Err(Error::InvalidEndpoint(_))));
    }

    #[test]
    fn default_endpoint_is_valid() {
        assert!(HttpEventDispatcher::new(DEFAULT_EVENTS_ENDPOINT).is_ok());
    }
}
