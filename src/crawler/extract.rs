//! Link discovery and record extraction against the current document
//!
//! Both operations are retry-wrapped; `NotFound` and `InvalidSelector` end the retries
//! early. Each attempt first waits for the document-ready
//! signal, tolerating a readiness timeout, then pauses for the settle delay before
//! reading, so content injected after load has a chance to appear.

use crate::crawler::port::{FetchPort, PortError};
use crate::crawler::retry::retry_if;
use crate::crawler::CrawlSettings;
use crate::state::{Address, Record};

/// Waits for the document to be ready, then for the settle delay
///
/// A readiness timeout is logged and ignored; any other error fails the attempt.
pub async fn wait_for_document<P: FetchPort>(
    port: &P,
    document: &P::Document,
    settings: &CrawlSettings,
) -> Result<(), PortError> {
    match port.wait_ready(document, settings.page_load_timeout).await {
        Ok(()) => {}
        Err(e) if e.is_timeout() => {
            tracing::warn!(
                address = %port.current_address(document),
                "Page load timeout, continuing with current content"
            );
        }
        Err(e) => return Err(e),
    }

    if !settings.settle_delay.is_zero() {
        tokio::time::sleep(settings.settle_delay).await;
    }

    Ok(())
}

/// Extracts the record of the current document
///
/// The title is the text of the first element matching the title selector; the address
/// is the document's current (canonical) address. Returns the last error once all
/// attempts are spent.
pub async fn extract_record<P: FetchPort>(
    port: &P,
    document: &P::Document,
    settings: &CrawlSettings,
) -> Result<Record, PortError> {
    retry_if(&settings.retry, "extract_record", PortError::is_retryable, move || async move {
        wait_for_document(port, document, settings).await?;
        let title = port
            .read_text(document, &settings.title_selector, settings.page_load_timeout)
            .await?;
        Ok(Record::new(title, port.current_address(document)))
    })
    .await
}

/// Collects outbound candidate addresses from the current document, in document order
pub async fn discover_links<P: FetchPort>(
    port: &P,
    document: &P::Document,
    settings: &CrawlSettings,
) -> Result<Vec<Address>, PortError> {
    retry_if(&settings.retry, "discover_links", PortError::is_retryable, move || async move {
        wait_for_document(port, document, settings).await?;
        port.find_all(document, &settings.link_selector).await
    })
    .await
}
