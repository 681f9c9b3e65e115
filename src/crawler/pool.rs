//! Pool of headless render sessions
//!
//! One browser backend is shared by every session of a run. Sessions are the
//! unit of concurrency: `acquire` hands out an idle session or opens a new one,
//! and sessions returned beyond the pool's capacity are closed instead of kept.

use crate::crawler::fetcher::{FetchError, Renderer};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// One headless page that can be navigated repeatedly
#[async_trait]
pub trait RenderSession: Send + 'static {
    /// Navigates to `url` and returns the rendered DOM
    async fn render(&mut self, url: &str, timeout: Duration) -> Result<String, FetchError>;

    async fn close(self);
}

/// The shared browser process that sessions are opened in
#[async_trait]
pub trait BrowserBackend: Send + Sync + 'static {
    type Session: RenderSession;

    /// Opens a session, starting the browser on first use
    async fn new_session(&self) -> Result<Self::Session, FetchError>;

    /// Stops the browser; later sessions start a fresh one
    async fn shutdown(&self);
}

/// Bounded pool of render sessions over a single backend
pub struct SessionPool<B: BrowserBackend> {
    backend: B,
    idle: Mutex<Vec<B::Session>>,
    capacity: usize,
    render_timeout: Duration,
    warmed: AtomicBool,
    closed: AtomicBool,
    created: AtomicUsize,
}

impl<B: BrowserBackend> SessionPool<B> {
    pub fn new(backend: B, capacity: usize, render_timeout: Duration) -> Self {
        Self {
            backend,
            idle: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
            render_timeout,
            warmed: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            created: AtomicUsize::new(0),
        }
    }

    fn idle(&self) -> MutexGuard<'_, Vec<B::Session>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of sessions waiting in the pool
    pub fn idle_count(&self) -> usize {
        self.idle().len()
    }

    /// Number of sessions opened over the pool's lifetime
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn open_session(&self) -> Result<B::Session, FetchError> {
        let session = self.backend.new_session().await?;
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(session)
    }

    /// Opens sessions until the pool holds `capacity` idle ones
    ///
    /// Runs once per pool, on the first `acquire`.
    async fn warm(&self) -> Result<(), FetchError> {
        if self.warmed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        while self.idle_count() < self.capacity {
            let session = self.open_session().await?;
            self.idle().push(session);
        }
        tracing::debug!("Pre-warmed {} render sessions", self.idle_count());
        Ok(())
    }

    /// Takes an idle session or opens a new one
    ///
    /// The returned guard goes back to the pool when dropped.
    pub async fn acquire(&self) -> Result<PooledSession<'_, B>, FetchError> {
        if self.is_closed() {
            return Err(FetchError::Render("session pool is closed".to_string()));
        }

        self.warm().await?;

        let pooled = self.idle().pop();
        let session = match pooled {
            Some(session) => session,
            None => self.open_session().await?,
        };

        Ok(PooledSession {
            pool: self,
            session: Some(session),
            broken: false,
        })
    }

    /// Returns a session to the pool, closing it if the pool is full or closed
    pub async fn release(&self, session: B::Session) {
        if let Some(extra) = self.keep_or_return(session) {
            extra.close().await;
        }
    }

    /// Pushes the session back if there is room; otherwise hands it back
    fn keep_or_return(&self, session: B::Session) -> Option<B::Session> {
        if self.is_closed() {
            return Some(session);
        }
        let mut idle = self.idle();
        if idle.len() >= self.capacity {
            return Some(session);
        }
        idle.push(session);
        None
    }

    /// Closes every idle session and stops the backend
    ///
    /// Sessions still checked out are closed when they come back.
    pub async fn close_all(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let sessions: Vec<B::Session> = self.idle().drain(..).collect();
        let count = sessions.len();
        for session in sessions {
            session.close().await;
        }
        self.backend.shutdown().await;

        tracing::debug!(
            "Closed {} idle render sessions ({} opened in total)",
            count,
            self.created_count()
        );
    }
}

/// A checked-out session; returns to its pool when dropped
pub struct PooledSession<'a, B: BrowserBackend> {
    pool: &'a SessionPool<B>,
    session: Option<B::Session>,
    broken: bool,
}

impl<B: BrowserBackend> PooledSession<'_, B> {
    /// Renders a URL with the pool's navigation timeout
    ///
    /// A session that fails to render is discarded instead of being reused.
    pub async fn render(&mut self, url: &str) -> Result<String, FetchError> {
        let timeout = self.pool.render_timeout;
        let Some(session) = self.session.as_mut() else {
            return Err(FetchError::Render("session already released".to_string()));
        };

        let result = session.render(url, timeout).await;
        if result.is_err() {
            self.broken = true;
        }
        result
    }

    /// Returns the session to the pool, awaiting any close
    pub async fn release(mut self) {
        if let Some(session) = self.session.take() {
            if self.broken {
                session.close().await;
            } else {
                self.pool.release(session).await;
            }
        }
    }
}

impl<B: BrowserBackend> Drop for PooledSession<'_, B> {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        let to_close = if self.broken {
            Some(session)
        } else {
            self.pool.keep_or_return(session)
        };

        if let Some(session) = to_close {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(session.close());
                }
                Err(_) => tracing::warn!("Dropping render session outside a runtime"),
            }
        }
    }
}

#[async_trait]
impl<B: BrowserBackend> Renderer for SessionPool<B> {
    async fn render(&self, url: &str) -> Result<String, FetchError> {
        let mut session = self.acquire().await?;
        let result = session.render(url).await;
        session.release().await;
        result
    }

    async fn close(&self) {
        self.close_all().await;
    }
}
