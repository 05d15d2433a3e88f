//! Crawl orchestration
//!
//! The [`Orchestrator`] drives one crawl from a seed URL:
//!
//! 1. Normalize the seed and fetch the site's robots.txt
//! 2. Pull URLs from the [`CrawlState`] frontier, breadth-first
//! 3. Fetch, extract, verify links and score each page in a small worker pool
//! 4. Enqueue the page's internal links at `depth + 1`
//! 5. Emit a progress event after every finished page
//! 6. Fold everything into a [`MultiPageAuditResult`]
//!
//! Interior page failures are recorded and the crawl carries on. Only a seed
//! that cannot be audited ends the crawl with a [`CrawlFatalError`].

use super::events::{CrawlEvent, CrawlProgress};
use super::frontier::{CrawlState, EnqueueOutcome, QueuedUrl};
use super::results::{AuditHeader, MultiPageAuditResult, PageAuditResult};
use crate::browser::{BrowserSession, SessionSettings};
use crate::config::{Config, MAX_DEPTH_LIMIT, MAX_PAGES_LIMIT};
use crate::extract::{LinkVerifier, SignalExtractor};
use crate::fetcher::{build_http_client, BrowserFetcher, HttpFetcher, PageFetcher};
use crate::robots::{fetch_robots, SiteRobots, ROBOTS_AGENT};
use crate::score::Scorer;
use crate::state::AuditStatus;
use crate::url::{is_non_html_target, normalize_url, SiteScope};
use crate::{CrawlFatalError, UrlError};
use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Longest robots.txt crawl-delay honored
const MAX_CRAWL_DELAY: Duration = Duration::from_secs(10);

/// Per-crawl context shared by every page task
struct CrawlContext {
    extractor: SignalExtractor,
    verifier: Option<LinkVerifier>,
    robots: SiteRobots,
    delay: Duration,
}

/// Runs crawls and single-page audits
///
/// Cheap to clone; clones share the fetcher, the HTTP client and the parent
/// cancellation token.
#[derive(Clone)]
pub struct Orchestrator {
    config: Arc<Config>,
    fetcher: Arc<dyn PageFetcher>,
    client: Client,
    browser: Option<Arc<BrowserSession>>,
    scorer: Scorer,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Creates an orchestrator around an existing fetcher
    ///
    /// # Arguments
    ///
    /// * `config` - Crawl bounds, timeouts and link-check settings
    /// * `fetcher` - How pages are retrieved
    /// * `client` - HTTP client for robots.txt and link checks
    pub fn new(config: Config, fetcher: Arc<dyn PageFetcher>, client: Client) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            client,
            browser: None,
            scorer: Scorer::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Builds the fetcher the config asks for
    ///
    /// With `browser.enabled` pages are rendered in headless Chromium;
    /// otherwise they are fetched over plain HTTP. The browser itself is only
    /// launched when the first page is fetched.
    pub fn from_config(config: Config) -> crate::Result<Self> {
        let timeout = Duration::from_millis(config.timeouts.navigation_ms);
        let client = build_http_client(&config.browser.user_agent, timeout)?;

        if config.browser.enabled {
            let session = Arc::new(BrowserSession::new(SessionSettings::from_config(&config)));
            let fetcher = BrowserFetcher::new(session.clone(), client.clone(), &config);
            let mut orchestrator = Self::new(config, Arc::new(fetcher), client);
            orchestrator.browser = Some(session);
            Ok(orchestrator)
        } else {
            let fetcher = HttpFetcher::with_client(client.clone(), timeout);
            Ok(Self::new(config, Arc::new(fetcher), client))
        }
    }

    /// Replaces the parent cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// A clone with per-crawl page and depth bounds
    ///
    /// Overrides are clamped to the ranges the config loader accepts.
    pub fn with_bounds(&self, max_pages: Option<usize>, max_depth: Option<u32>) -> Self {
        let mut config = (*self.config).clone();
        if let Some(pages) = max_pages {
            config.crawler.max_pages = pages.clamp(1, MAX_PAGES_LIMIT);
        }
        if let Some(depth) = max_depth {
            config.crawler.max_depth = depth.min(MAX_DEPTH_LIMIT);
        }
        Self {
            config: Arc::new(config),
            ..self.clone()
        }
    }

    /// Token whose cancellation stops every crawl started from this orchestrator
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Closes the browser, if one was started
    pub async fn shutdown(&self) {
        if let Some(browser) = &self.browser {
            browser.close().await;
        }
    }

    /// Audits a single URL without following links
    ///
    /// A page that cannot be fetched still yields a result, flagged as failed.
    pub async fn audit_page(&self, url: &str) -> Result<PageAuditResult, UrlError> {
        let url = normalize_url(url)?;
        let scope = SiteScope::from_seed(&url, self.config.crawler.include_subdomains)
            .ok_or(UrlError::MissingDomain)?;
        let context = self.context(scope, &url).await;
        let queued = QueuedUrl::seed(url);
        Ok(self.audit(&context, queued, Instant::now()).await)
    }

    /// Crawls from `seed` without progress reporting
    pub async fn run(&self, seed: &str) -> Result<MultiPageAuditResult, CrawlFatalError> {
        self.crawl(seed, None).await
    }

    /// Crawls from `seed`, streaming [`CrawlEvent`]s into `events`
    ///
    /// One `Progress` event follows every finished page and a single
    /// `Complete` event ends the stream, for failed crawls too. If the
    /// receiver goes away the crawl is cancelled and whatever finished so far
    /// is returned.
    pub async fn run_with_progress(
        &self,
        seed: &str,
        events: mpsc::Sender<CrawlEvent>,
    ) -> Result<MultiPageAuditResult, CrawlFatalError> {
        let outcome = self.crawl(seed, Some(&events)).await;
        let result = match &outcome {
            Ok(result) => result.clone(),
            Err(fatal) => (*fatal.result).clone(),
        };
        let _ = events
            .send(CrawlEvent::Complete {
                result: Box::new(result),
            })
            .await;
        outcome
    }

    async fn crawl(
        &self,
        seed: &str,
        events: Option<&mpsc::Sender<CrawlEvent>>,
    ) -> Result<MultiPageAuditResult, CrawlFatalError> {
        let crawler = &self.config.crawler;

        let (seed_url, scope) = match seed_scope(seed, crawler.include_subdomains) {
            Ok(parsed) => parsed,
            Err(e) => {
                let header = AuditHeader::new(seed, String::new());
                return Err(fatal(header, e.to_string()));
            }
        };
        let header = AuditHeader::new(seed_url.as_str(), scope.host());
        let mut status = AuditStatus::Pending;
        status = advance(status, AuditStatus::Crawling);

        info!(
            "Starting audit {} of {} (max {} pages, depth {})",
            header.audit_id, seed_url, crawler.max_pages, crawler.max_depth
        );

        let cancel = self.cancel.child_token();
        let context = self.context(scope, &seed_url).await;
        let mut state = CrawlState::new(seed_url.clone(), crawler.max_pages, crawler.max_depth);
        let mut in_flight = FuturesUnordered::new();
        let mut next_slot = Instant::now();
        let concurrency = crawler.concurrency.max(1);

        loop {
            while in_flight.len() < concurrency && !cancel.is_cancelled() {
                let Some(queued) = state.pop() else {
                    break;
                };
                let start_at = next_slot.max(Instant::now());
                next_slot = start_at + context.delay;
                in_flight.push(self.audit(&context, queued, start_at));
            }

            if in_flight.is_empty() {
                break;
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Audit {} cancelled after {} pages", header.audit_id, state.completed());
                    break;
                }
                Some(result) = in_flight.next() => result,
            };

            if result.depth == 0 && !result.is_success() {
                let message = result
                    .error
                    .clone()
                    .unwrap_or_else(|| "seed page could not be audited".to_string());
                warn!("Seed {} failed: {}", seed_url, message);
                return Err(fatal(header, message));
            }

            self.enqueue_links(&mut state, &context, &result);
            let current_url = result.url.clone();
            state.record(result);

            let progress = CrawlProgress::new(state.completed(), state.max_pages(), current_url);
            debug!(
                "Progress {}/{} ({}%): {}",
                progress.current, progress.total, progress.percentage, progress.current_url
            );
            if let Some(events) = events {
                if events.send(CrawlEvent::Progress { progress }).await.is_err() {
                    debug!("Progress receiver dropped, cancelling audit {}", header.audit_id);
                    cancel.cancel();
                }
            }
        }

        let cancelled = cancel.is_cancelled();
        let pages = state.into_results();
        let any_audited = pages.iter().any(PageAuditResult::is_success);
        status = advance(
            status,
            if any_audited {
                AuditStatus::Completed
            } else {
                AuditStatus::Failed
            },
        );

        let mut result = MultiPageAuditResult::aggregate(header, status, pages, cancelled);
        if status == AuditStatus::Failed {
            result.error = Some("crawl cancelled before any page was audited".to_string());
        }
        info!(
            "Audit {} {}: {} pages ({} failed), score {}",
            result.audit_id, result.status, result.pages_crawled, result.pages_failed, result.score
        );
        Ok(result)
    }

    /// Fetches robots.txt and prepares the per-crawl helpers
    async fn context(&self, scope: SiteScope, seed: &Url) -> CrawlContext {
        let robots = fetch_robots(&self.client, seed).await;

        let crawler = &self.config.crawler;
        let verifier = crawler.verify_links.then(|| {
            LinkVerifier::new(
                self.client.clone(),
                Duration::from_millis(self.config.timeouts.link_check_ms),
                crawler.max_link_checks,
            )
        });

        let robots_delay = robots
            .policy
            .crawl_delay(ROBOTS_AGENT)
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| Duration::from_secs_f64(d).min(MAX_CRAWL_DELAY))
            .unwrap_or(Duration::ZERO);
        let delay = Duration::from_millis(crawler.request_delay_ms).max(robots_delay);

        CrawlContext {
            extractor: SignalExtractor::new(scope).with_robots(&robots),
            verifier,
            robots,
            delay,
        }
    }

    /// Fetch, extract, verify and score one page
    async fn audit(
        &self,
        context: &CrawlContext,
        queued: QueuedUrl,
        start_at: Instant,
    ) -> PageAuditResult {
        tokio::time::sleep_until(start_at).await;
        debug!("Auditing {} (depth {})", queued.url, queued.depth);

        let snapshot = match self.fetcher.fetch(&queued.url).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Page failed: {}", e);
                return PageAuditResult::failed(queued.url.as_str(), queued.depth, &e);
            }
        };

        let mut signals = context.extractor.extract(&snapshot);
        if let Some(verifier) = &context.verifier {
            let candidates: Vec<String> = signals
                .links
                .internal
                .iter()
                .chain(signals.links.external.iter())
                .cloned()
                .collect();
            signals.links.broken = verifier.broken_links(&candidates).await;
            signals.links.verified = true;
        }

        let scored = self.scorer.score(&signals);
        PageAuditResult::audited(queued.depth, signals, scored)
    }

    /// Queues a finished page's internal links one level deeper
    fn enqueue_links(
        &self,
        state: &mut CrawlState,
        context: &CrawlContext,
        page: &PageAuditResult,
    ) {
        let Some(signals) = &page.signals else {
            return;
        };
        let depth = page.depth + 1;

        for link in &signals.links.internal {
            let url = match normalize_url(link) {
                Ok(url) => url,
                Err(e) => {
                    debug!("Skipping link {}: {}", link, e);
                    continue;
                }
            };
            if is_non_html_target(&url) {
                continue;
            }
            if self.config.crawler.respect_robots_txt && !context.robots.is_allowed(&url) {
                debug!("Disallowed by robots.txt: {}", url);
                continue;
            }
            if state.enqueue(url, depth) == EnqueueOutcome::PageLimitReached {
                break;
            }
        }
    }
}

fn seed_scope(seed: &str, include_subdomains: bool) -> Result<(Url, SiteScope), UrlError> {
    let url = normalize_url(seed)?;
    let scope = SiteScope::from_seed(&url, include_subdomains).ok_or(UrlError::MissingDomain)?;
    Ok((url, scope))
}

fn fatal(header: AuditHeader, message: String) -> CrawlFatalError {
    let seed = header.seed_url.clone();
    let result = MultiPageAuditResult::failed(header, message.clone());
    CrawlFatalError {
        seed,
        message,
        result: Box::new(result),
    }
}

/// Applies a transition the crawl loop knows to be legal
fn advance(from: AuditStatus, to: AuditStatus) -> AuditStatus {
    from.transition(to).unwrap_or_else(|e| {
        warn!("{}", e);
        to
    })
}
