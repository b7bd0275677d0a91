//! Remote browser backend
//!
//! Fulfils the session capability over the Chrome DevTools Protocol against a
//! remote browser endpoint. Every session gets its own isolated browser
//! context (incognito-equivalent: no shared cookies or cache) with a single
//! page in it, and disposes exactly that context on close. The remote
//! browser itself is shared with other sessions and is never shut down here.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{Element, Session, SessionError, SessionFactory};

/// How often the bounded element wait re-probes the DOM
const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Locators are element ids, per the page contract
fn id_selector(element_id: &str) -> String {
    format!("#{}", element_id)
}

/// Opens isolated sessions against a remote DevTools websocket endpoint
pub struct RemoteSessionFactory {
    endpoint: String,
}

impl RemoteSessionFactory {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into() }
    }
}

#[async_trait]
impl SessionFactory for RemoteSessionFactory {
    async fn open(&self) -> Result<Box<dyn Session>, SessionError> {
        let (browser, mut handler) = Browser::connect(self.endpoint.clone())
            .await
            .map_err(|e| SessionError::OpenFailed(e.to_string()))?;

        // Drain browser events for the life of the connection. The stream
        // ending means the remote side disconnected.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
            debug!("Browser event handler ended (remote disconnected)");
        });

        let context = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| SessionError::OpenFailed(e.to_string()))?;
        let context_id = context.result.browser_context_id.clone();

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(SessionError::OpenFailed)?;

        let page = browser
            .new_page(target)
            .await
            .map_err(|e| SessionError::OpenFailed(e.to_string()))?;

        Ok(Box::new(RemoteSession {
            browser,
            context_id,
            page: Mutex::new(Some(page)),
        }))
    }
}

/// One remote session: a dedicated connection, context and page
struct RemoteSession {
    browser: Browser,
    context_id: BrowserContextId,
    /// Taken on close so the page is torn down exactly once
    page: Mutex<Option<Page>>,
}

impl RemoteSession {
    async fn page(&self) -> Result<Page, SessionError> {
        self.page
            .lock()
            .await
            .clone()
            .ok_or_else(|| SessionError::ConnectionLost("Session already closed".into()))
    }
}

#[async_trait]
impl Session for RemoteSession {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        let page = self.page().await?;
        debug!("Navigating to: {}", url);
        page.goto(url)
            .await
            .map_err(|e| SessionError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    async fn wait_for_element(
        &self,
        element_id: &str,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        let page = self.page().await?;
        let selector = id_selector(element_id);

        let probe = async {
            loop {
                if page.find_element(selector.as_str()).await.is_ok() {
                    return;
                }
                sleep(ELEMENT_POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, probe)
            .await
            .map_err(|_| SessionError::WaitTimeout {
                element_id: element_id.to_string(),
                timeout_secs: timeout.as_secs(),
            })
    }

    async fn find_element(
        &self,
        element_id: &str,
    ) -> Result<Option<Box<dyn Element>>, SessionError> {
        let page = self.page().await?;
        let selector = id_selector(element_id);

        match page.find_element(selector.as_str()).await {
            Ok(element) => Ok(Some(Box::new(RemoteElement { inner: element }))),
            Err(CdpError::NotFound) => Ok(None),
            // Chrome answers a selector with no match as a protocol error
            // rather than an empty result; that is absence, not failure.
            Err(CdpError::Chrome(err)) => {
                debug!("Element '{}' not present: {:?}", element_id, err);
                Ok(None)
            }
            Err(e) => Err(SessionError::ConnectionLost(e.to_string())),
        }
    }

    async fn close(&self) -> Result<(), SessionError> {
        let page = self.page.lock().await.take();
        if let Some(page) = page {
            if let Err(e) = page.close().await {
                warn!("Page close failed: {}", e);
            }
        }

        // Dispose only this session's context; other sessions keep using the
        // shared remote browser.
        self.browser
            .execute(DisposeBrowserContextParams::new(self.context_id.clone()))
            .await
            .map_err(|e| SessionError::CloseFailed(e.to_string()))?;

        Ok(())
    }
}

/// Element handle bound to its remote session
struct RemoteElement {
    inner: chromiumoxide::Element,
}

#[async_trait]
impl Element for RemoteElement {
    async fn activate(&self) -> Result<(), SessionError> {
        self.inner
            .click()
            .await
            .map_err(|e| SessionError::InteractionFailed(e.to_string()))?;
        Ok(())
    }
}
