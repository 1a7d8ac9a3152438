//! Viewport-driven gallery: requests playback for artifacts scrolled into
//! view and releases it for those scrolled out.

use parking_lot::Mutex;
use reel_pool::headless::HeadlessContainer;
use reel_pool::{Callbacks, PoolManager, PoolStats};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// A video artifact in the presentation.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub id: String,
    pub source_url: String,
}

impl Artifact {
    pub fn generate(position: usize) -> Self {
        let id = Uuid::new_v4().to_string();
        Self {
            source_url: format!("https://media.example/artifacts/{id}/clip-{position}.mp4"),
            id,
        }
    }
}

/// Playback event observed through pool callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GalleryEvent {
    Playing { artifact: String, slot: usize },
    Stopped { artifact: String },
    Failed { artifact: String, reason: String },
}

/// Per-step report of the simulation.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub visible: Vec<usize>,
    pub stats: PoolStats,
    pub events: Vec<GalleryEvent>,
}

pub struct Gallery {
    pool: PoolManager,
    artifacts: Vec<Artifact>,
    containers: Vec<Arc<HeadlessContainer>>,
    visible: BTreeSet<usize>,
    events: Arc<Mutex<Vec<GalleryEvent>>>,
}

impl Gallery {
    pub fn new(pool: PoolManager, artifact_count: usize) -> Self {
        let artifacts: Vec<Artifact> = (0..artifact_count).map(Artifact::generate).collect();
        let containers = (0..artifact_count)
            .map(|i| HeadlessContainer::new(format!("card-{i}")))
            .collect();
        pool.init();
        Self {
            pool,
            artifacts,
            containers,
            visible: BTreeSet::new(),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn pool(&self) -> &PoolManager {
        &self.pool
    }

    /// Scroll so that cards `[first, first + viewport)` are visible.
    pub fn scroll_to(&mut self, first: usize, viewport: usize) -> Vec<GalleryEvent> {
        let end = (first + viewport).min(self.artifacts.len());
        let now_visible: BTreeSet<usize> = (first.min(end)..end).collect();

        let left: Vec<usize> = self.visible.difference(&now_visible).copied().collect();
        let entered: Vec<usize> = now_visible.difference(&self.visible).copied().collect();

        for position in left {
            debug!(position, "Card left viewport");
            self.pool.release(&self.artifacts[position].id);
        }
        for &position in now_visible.intersection(&self.visible) {
            self.pool.touch(&self.artifacts[position].id);
        }
        for position in entered {
            debug!(position, "Card entered viewport");
            self.request_playback(position);
        }

        self.visible = now_visible;
        std::mem::take(&mut *self.events.lock())
    }

    fn request_playback(&self, position: usize) {
        let artifact = &self.artifacts[position];
        let on_assigned = {
            let events = Arc::clone(&self.events);
            let name = artifact.id.clone();
            move |outcome: reel_pool::Outcome| {
                let event = match outcome {
                    Ok(handle) => GalleryEvent::Playing {
                        artifact: name,
                        slot: handle.index().0,
                    },
                    Err(e) => GalleryEvent::Failed {
                        artifact: name,
                        reason: e.to_string(),
                    },
                };
                events.lock().push(event);
            }
        };
        let on_released = {
            let events = Arc::clone(&self.events);
            let name = artifact.id.clone();
            move || events.lock().push(GalleryEvent::Stopped { artifact: name })
        };

        self.pool.request(
            artifact.id.as_str(),
            artifact.source_url.as_str(),
            self.containers[position].clone(),
            Callbacks::new()
                .on_assigned(on_assigned)
                .on_released(on_released),
        );
    }

    /// Scroll through the whole gallery one card at a time.
    pub fn run(&mut self, viewport: usize) -> Vec<StepReport> {
        let steps = self.artifacts.len().saturating_sub(viewport) + 1;
        let mut reports = Vec::with_capacity(steps);
        for step in 0..steps {
            let events = self.scroll_to(step, viewport);
            let stats = self.pool.stats();
            info!(
                step,
                total = stats.total,
                in_use = stats.in_use,
                pending = stats.pending,
                events = events.len(),
                "Scrolled"
            );
            reports.push(StepReport {
                step,
                visible: self.visible.iter().copied().collect(),
                stats,
                events,
            });
        }
        reports
    }
}
