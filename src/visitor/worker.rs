//! Visitor worker
//!
//! One simulated visitor: opens a browser session, rendezvouses with the
//! other visitors of its iteration, waits a random start delay, then follows
//! the site's page chain with a random linger per page until no "next" link
//! remains. The session is released on every exit path.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Barrier;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::browser::{Session, SessionError, SessionFactory};
use crate::scheduler::DelayWindow;
use crate::stats::RunStats;

/// Upper bound on waiting for a page's ready marker
const PAGE_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Identity of one visitor within the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorIdentity {
    pub iteration: u32,
    pub index: u64,
}

impl VisitorIdentity {
    /// Token appended to the visit URL as a fragment, so concurrent visits
    /// to the same base URL stay distinguishable server-side.
    pub fn token(&self) -> String {
        format!("{}.{}", self.iteration, self.index)
    }
}

/// Element ids the visited pages expose
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMarkers {
    /// Present once a page has fully loaded
    pub ready_marker: String,
    /// Links to the following page; absent on the last page of a chain
    pub next_link: String,
}

impl Default for PageMarkers {
    fn default() -> Self {
        Self {
            ready_marker: "page-complete".to_string(),
            next_link: "next".to_string(),
        }
    }
}

/// One simulated visitor
pub struct Visitor {
    identity: VisitorIdentity,
    visit_url: String,
    start_window: DelayWindow,
    linger: DelayWindow,
    markers: PageMarkers,
    barrier: Arc<Barrier>,
    factory: Arc<dyn SessionFactory>,
    stats: Arc<RunStats>,
}

impl Visitor {
    pub fn new(
        identity: VisitorIdentity,
        visit_url: String,
        start_window: DelayWindow,
        linger: DelayWindow,
        markers: PageMarkers,
        barrier: Arc<Barrier>,
        factory: Arc<dyn SessionFactory>,
        stats: Arc<RunStats>,
    ) -> Self {
        Self { identity, visit_url, start_window, linger, markers, barrier, factory, stats }
    }

    /// Drive this visitor to completion. Failures are reported here and never
    /// propagate to sibling visitors.
    pub async fn run(self) {
        let token = self.identity.token();
        let target = format!("{}#{}", self.visit_url, token);

        let session = match self.factory.open().await {
            Ok(session) => session,
            Err(e) => {
                // Still rendezvous, so siblings waiting on the barrier are
                // not wedged by this visitor's failure.
                self.barrier.wait().await;
                error!("Visitor {} failed to open a session: {}", token, e);
                self.stats.record_failed();
                return;
            }
        };

        // Every session of the iteration finishes opening before anyone
        // starts its start-delay clock, so creation latency cannot skew the
        // start window.
        self.barrier.wait().await;

        let mut rng = StdRng::from_entropy();
        sleep(self.start_window.sample(&mut rng)).await;

        let outcome = self.browse(session.as_ref(), &target, &mut rng).await;

        if let Err(e) = session.close().await {
            warn!("Visitor {} session close failed: {}", token, e);
        }

        match outcome {
            Ok(pages) => {
                self.stats.record_completed(pages);
                info!("Visitor {} COMPLETE ({} pages)", token, pages);
            }
            Err(e) => {
                self.stats.record_failed();
                error!("Visitor {} failed: {}", token, e);
            }
        }
    }

    /// Walk the page chain: initial page, then linger and follow "next"
    /// until it is absent. Returns how many pages were visited.
    async fn browse(
        &self,
        session: &dyn Session,
        target: &str,
        rng: &mut StdRng,
    ) -> Result<u64, SessionError> {
        session.navigate(target).await?;
        session
            .wait_for_element(&self.markers.ready_marker, PAGE_READY_TIMEOUT)
            .await?;

        let mut pages = 1u64;
        loop {
            sleep(self.linger.sample(rng)).await;

            match session.find_element(&self.markers.next_link).await? {
                Some(next) => {
                    next.activate().await?;
                    session
                        .wait_for_element(&self.markers.ready_marker, PAGE_READY_TIMEOUT)
                        .await?;
                    pages += 1;
                }
                // No "next" link: the chain is exhausted, the visit is done.
                None => break,
            }
        }

        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::browser::Element;

    /// Scripted behavior for a fake backend
    #[derive(Default)]
    struct Script {
        /// Whether each page, in visit order, exposes a "next" link
        chain: Vec<bool>,
        fail_open: bool,
        /// 0-based page whose ready wait times out
        timeout_on_page: Option<usize>,
    }

    #[derive(Default)]
    struct FakeBackend {
        script: Script,
        opens: AtomicU64,
        closes: AtomicU64,
        activations: AtomicU64,
        navigated: Mutex<Vec<String>>,
    }

    struct FakeFactory(Arc<FakeBackend>);

    #[async_trait]
    impl SessionFactory for FakeFactory {
        async fn open(&self) -> Result<Box<dyn Session>, SessionError> {
            self.0.opens.fetch_add(1, Ordering::Relaxed);
            if self.0.script.fail_open {
                return Err(SessionError::OpenFailed("scripted open failure".into()));
            }
            Ok(Box::new(FakeSession {
                backend: self.0.clone(),
                page: Arc::new(AtomicUsize::new(0)),
            }))
        }
    }

    struct FakeSession {
        backend: Arc<FakeBackend>,
        page: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Session for FakeSession {
        async fn navigate(&self, url: &str) -> Result<(), SessionError> {
            self.backend.navigated.lock().unwrap().push(url.to_string());
            Ok(())
        }

        async fn wait_for_element(
            &self,
            element_id: &str,
            timeout: Duration,
        ) -> Result<(), SessionError> {
            let page = self.page.load(Ordering::Relaxed);
            if self.backend.script.timeout_on_page == Some(page) {
                return Err(SessionError::WaitTimeout {
                    element_id: element_id.to_string(),
                    timeout_secs: timeout.as_secs(),
                });
            }
            Ok(())
        }

        async fn find_element(
            &self,
            _element_id: &str,
        ) -> Result<Option<Box<dyn Element>>, SessionError> {
            let page = self.page.load(Ordering::Relaxed);
            let has_next = self.backend.script.chain.get(page).copied().unwrap_or(false);
            if has_next {
                Ok(Some(Box::new(FakeNext {
                    backend: self.backend.clone(),
                    page: self.page.clone(),
                })))
            } else {
                Ok(None)
            }
        }

        async fn close(&self) -> Result<(), SessionError> {
            self.backend.closes.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    struct FakeNext {
        backend: Arc<FakeBackend>,
        page: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Element for FakeNext {
        async fn activate(&self) -> Result<(), SessionError> {
            self.backend.activations.fetch_add(1, Ordering::Relaxed);
            self.page.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn backend(script: Script) -> Arc<FakeBackend> {
        Arc::new(FakeBackend { script, ..Default::default() })
    }

    fn visitor(
        identity: VisitorIdentity,
        backend: Arc<FakeBackend>,
        barrier: Arc<Barrier>,
        stats: Arc<RunStats>,
    ) -> Visitor {
        Visitor::new(
            identity,
            "http://site.test/start".to_string(),
            DelayWindow { min_secs: 0, max_secs: 0 },
            DelayWindow { min_secs: 0, max_secs: 0 },
            PageMarkers::default(),
            barrier,
            Arc::new(FakeFactory(backend)),
            stats,
        )
    }

    #[tokio::test]
    async fn follows_chain_until_next_is_absent() {
        let backend = backend(Script { chain: vec![true, true, false], ..Default::default() });
        let stats = Arc::new(RunStats::new());
        let barrier = Arc::new(Barrier::new(1));

        visitor(VisitorIdentity { iteration: 0, index: 0 }, backend.clone(), barrier, stats.clone())
            .run()
            .await;

        assert_eq!(backend.activations.load(Ordering::Relaxed), 2);
        assert_eq!(backend.closes.load(Ordering::Relaxed), 1);
        assert_eq!(stats.completed(), 1);
        assert_eq!(stats.failed(), 0);
        assert_eq!(stats.pages(), 3);
    }

    #[tokio::test]
    async fn appends_identity_token_as_fragment() {
        let backend = backend(Script { chain: vec![false], ..Default::default() });
        let stats = Arc::new(RunStats::new());
        let barrier = Arc::new(Barrier::new(1));

        visitor(VisitorIdentity { iteration: 2, index: 5 }, backend.clone(), barrier, stats)
            .run()
            .await;

        let navigated = backend.navigated.lock().unwrap();
        assert_eq!(navigated.as_slice(), ["http://site.test/start#2.5"]);
    }

    #[tokio::test]
    async fn closes_session_exactly_once_when_a_page_wait_times_out() {
        let backend = backend(Script {
            chain: vec![true, true, false],
            timeout_on_page: Some(1),
            ..Default::default()
        });
        let stats = Arc::new(RunStats::new());
        let barrier = Arc::new(Barrier::new(1));

        visitor(VisitorIdentity { iteration: 0, index: 0 }, backend.clone(), barrier, stats.clone())
            .run()
            .await;

        // One activation got us to page 1, whose ready wait timed out; the
        // session must still have been released exactly once.
        assert_eq!(backend.activations.load(Ordering::Relaxed), 1);
        assert_eq!(backend.closes.load(Ordering::Relaxed), 1);
        assert_eq!(stats.completed(), 0);
        assert_eq!(stats.failed(), 1);
    }

    #[tokio::test]
    async fn open_failure_still_releases_siblings_at_the_barrier() {
        let failing = backend(Script { fail_open: true, ..Default::default() });
        let healthy = backend(Script { chain: vec![false], ..Default::default() });
        let stats = Arc::new(RunStats::new());
        let barrier = Arc::new(Barrier::new(2));

        let a = tokio::spawn(
            visitor(
                VisitorIdentity { iteration: 0, index: 0 },
                failing.clone(),
                barrier.clone(),
                stats.clone(),
            )
            .run(),
        );
        let b = tokio::spawn(
            visitor(
                VisitorIdentity { iteration: 0, index: 1 },
                healthy.clone(),
                barrier,
                stats.clone(),
            )
            .run(),
        );

        tokio::time::timeout(Duration::from_secs(5), async {
            a.await.unwrap();
            b.await.unwrap();
        })
        .await
        .expect("visitors deadlocked on the barrier");

        assert_eq!(stats.failed(), 1);
        assert_eq!(stats.completed(), 1);
        assert_eq!(failing.closes.load(Ordering::Relaxed), 0);
        assert_eq!(healthy.closes.load(Ordering::Relaxed), 1);
    }
}
