//! # Avatar Pipeline
//!
//! Background loading of card avatars, bound to the lifetime of the card.
//!
//! ## Responsibilities
//! - **Loading**: fetch bytes through the host `AvatarLoader` and decode them,
//!   on the rayon pool or inline.
//! - **Delivery**: results come back over a channel and are only handed out by
//!   `poll`, so attachment always happens on the canvas thread, on a later frame.
//! - **Cancellation**: every load has a ticket; cancelled or expired tickets
//!   drop late results instead of delivering them.

use crate::config::LoadMode;
use crate::errors::AvatarError;
use crate::node::image::AvatarImage;
use crate::types::NodeId;
use crate::AvatarLoader;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Identifies one avatar load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(pub u64);

#[derive(Debug)]
struct PendingLoad {
    node: NodeId,
    url: String,
    cancelled: Arc<AtomicBool>,
    /// Scheduler time after which the load is abandoned.
    deadline: Option<f64>,
}

/// A load that resolved, failed or expired.
#[derive(Debug)]
pub struct AvatarCompletion {
    pub ticket: LoadTicket,
    pub node: NodeId,
    pub url: String,
    pub result: Result<AvatarImage, AvatarError>,
}

type WorkerMessage = (LoadTicket, Result<AvatarImage, AvatarError>);

pub struct AvatarPipeline {
    loader: Arc<dyn AvatarLoader>,
    mode: LoadMode,
    timeout_ms: Option<f64>,
    tx: Sender<WorkerMessage>,
    rx: Receiver<WorkerMessage>,
    pending: HashMap<LoadTicket, PendingLoad>,
    next_ticket: u64,
}

impl std::fmt::Debug for AvatarPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarPipeline")
            .field("mode", &self.mode)
            .field("timeout_ms", &self.timeout_ms)
            .field("pending", &self.pending.len())
            .finish()
    }
}

fn load_and_decode(loader: &dyn AvatarLoader, url: &str) -> Result<AvatarImage, AvatarError> {
    let bytes = loader.load_bytes(url).map_err(AvatarError::Load)?;
    AvatarImage::decode(bytes)
}

impl AvatarPipeline {
    pub fn new(loader: Arc<dyn AvatarLoader>, mode: LoadMode, timeout_ms: Option<f64>) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            loader,
            mode,
            timeout_ms,
            tx,
            rx,
            pending: HashMap::new(),
            next_ticket: 0,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, ticket: LoadTicket) -> bool {
        self.pending.contains_key(&ticket)
    }

    /// Starts loading `url` for `node`. `now` is the scheduler time used for
    /// the timeout.
    pub fn request(&mut self, node: NodeId, url: &str, now: f64) -> LoadTicket {
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;

        let cancelled = Arc::new(AtomicBool::new(false));
        self.pending.insert(
            ticket,
            PendingLoad {
                node,
                url: url.to_string(),
                cancelled: cancelled.clone(),
                deadline: self.timeout_ms.map(|t| now + t),
            },
        );

        let loader = self.loader.clone();
        let tx = self.tx.clone();
        let url = url.to_string();
        let job = move || {
            if cancelled.load(Ordering::Acquire) {
                return;
            }
            let result = load_and_decode(loader.as_ref(), &url);
            if cancelled.load(Ordering::Acquire) {
                return;
            }
            // The receiver lives as long as the pipeline; a send error only
            // means the canvas is gone.
            let _ = tx.send((ticket, result));
        };

        trace!(?ticket, node, mode = ?self.mode, "avatar load requested");
        match self.mode {
            LoadMode::Background => rayon::spawn(job),
            LoadMode::Inline => job(),
        }
        ticket
    }

    /// Cancels a pending load. Returns false if it already completed or was
    /// cancelled.
    pub fn cancel(&mut self, ticket: LoadTicket) -> bool {
        match self.pending.remove(&ticket) {
            Some(load) => {
                load.cancelled.store(true, Ordering::Release);
                trace!(?ticket, node = load.node, "avatar load cancelled");
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, load) in self.pending.drain() {
            load.cancelled.store(true, Ordering::Release);
        }
    }

    fn accept(&mut self, (ticket, result): WorkerMessage) -> Option<AvatarCompletion> {
        let Some(load) = self.pending.remove(&ticket) else {
            trace!(?ticket, "dropping result of cancelled avatar load");
            return None;
        };
        Some(AvatarCompletion {
            ticket,
            node: load.node,
            url: load.url,
            result,
        })
    }

    /// Completed loads since the last poll. Never blocks.
    pub fn poll(&mut self) -> Vec<AvatarCompletion> {
        let messages: Vec<_> = self.rx.try_iter().collect();
        messages
            .into_iter()
            .filter_map(|message| self.accept(message))
            .collect()
    }

    /// Blocks up to `timeout` for at least one result, then drains the rest.
    /// Hosts without a frame loop use this to settle background loads.
    pub fn wait(&mut self, timeout: Duration) -> Vec<AvatarCompletion> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        let mut completions = Vec::new();
        match self.rx.recv_timeout(timeout) {
            Ok(message) => completions.extend(self.accept(message)),
            Err(RecvTimeoutError::Timeout) => return completions,
            Err(RecvTimeoutError::Disconnected) => return completions,
        }
        completions.extend(self.poll());
        completions
    }

    /// Abandons loads whose deadline passed. They complete with
    /// `AvatarError::TimedOut`.
    pub fn expire(&mut self, now: f64) -> Vec<AvatarCompletion> {
        let Some(timeout) = self.timeout_ms else {
            return Vec::new();
        };
        let mut expired: Vec<LoadTicket> = self
            .pending
            .iter()
            .filter(|(_, load)| load.deadline.is_some_and(|d| now >= d))
            .map(|(ticket, _)| *ticket)
            .collect();
        expired.sort();

        expired
            .into_iter()
            .filter_map(|ticket| {
                let load = self.pending.remove(&ticket)?;
                load.cancelled.store(true, Ordering::Release);
                debug!(?ticket, url = %load.url, "avatar load timed out");
                Some(AvatarCompletion {
                    ticket,
                    node: load.node,
                    url: load.url,
                    result: Err(AvatarError::TimedOut(timeout)),
                })
            })
            .collect()
    }
}

impl Drop for AvatarPipeline {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use std::io::Cursor;
    use std::sync::atomic::AtomicUsize;

    fn png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 10, 10, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    struct StaticLoader {
        calls: AtomicUsize,
    }

    impl AvatarLoader for StaticLoader {
        fn load_bytes(&self, url: &str) -> anyhow::Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.is_empty() {
                anyhow::bail!("empty avatar url");
            }
            Ok(png())
        }
    }

    fn inline_pipeline(timeout: Option<f64>) -> AvatarPipeline {
        AvatarPipeline::new(
            Arc::new(StaticLoader {
                calls: AtomicUsize::new(0),
            }),
            LoadMode::Inline,
            timeout,
        )
    }

    #[test]
    fn inline_results_arrive_on_poll() {
        let mut pipeline = inline_pipeline(None);
        let ticket = pipeline.request(3, "avatar.png", 0.0);
        assert!(pipeline.is_pending(ticket));

        let done = pipeline.poll();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].node, 3);
        assert!(done[0].result.is_ok());
        assert_eq!(pipeline.pending_count(), 0);
    }

    #[test]
    fn failures_are_reported() {
        let mut pipeline = inline_pipeline(None);
        pipeline.request(1, "", 0.0);
        let done = pipeline.poll();
        assert!(matches!(done[0].result, Err(AvatarError::Load(_))));
    }

    #[test]
    fn cancelled_results_are_dropped() {
        let mut pipeline = inline_pipeline(None);
        let ticket = pipeline.request(1, "avatar.png", 0.0);
        assert!(pipeline.cancel(ticket));
        assert!(!pipeline.cancel(ticket));
        assert!(pipeline.poll().is_empty());
    }

    #[test]
    fn background_loads_can_be_awaited() {
        let mut pipeline = AvatarPipeline::new(
            Arc::new(StaticLoader {
                calls: AtomicUsize::new(0),
            }),
            LoadMode::Background,
            None,
        );
        pipeline.request(7, "avatar.png", 0.0);
        let mut done = Vec::new();
        for _ in 0..50 {
            done.extend(pipeline.wait(Duration::from_millis(100)));
            if !done.is_empty() {
                break;
            }
        }
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].node, 7);
    }

    #[test]
    fn pending_loads_expire() {
        struct NeverLoader;
        impl AvatarLoader for NeverLoader {
            fn load_bytes(&self, _url: &str) -> anyhow::Result<Vec<u8>> {
                anyhow::bail!("unreachable host")
            }
        }
        let mut pipeline = AvatarPipeline::new(Arc::new(NeverLoader), LoadMode::Inline, Some(100.0));
        // Inline failure is already queued; expire wins because it runs first.
        pipeline.request(2, "https://example.invalid/a.png", 0.0);
        assert!(pipeline.expire(50.0).is_empty());
        let expired = pipeline.expire(100.0);
        assert_eq!(expired.len(), 1);
        assert!(matches!(expired[0].result, Err(AvatarError::TimedOut(t)) if t == 100.0));
        assert!(pipeline.poll().is_empty());
    }
}
