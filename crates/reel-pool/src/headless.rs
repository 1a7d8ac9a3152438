//! In-memory host implementation.
//!
//! Stands in for a real rendering surface: elements remember their source,
//! containers remember which elements are mounted in them. Used by the
//! gallery simulation and by tests.

use crate::slot::{Container, ElementFactory, MediaElement};
use parking_lot::Mutex;
use reel_core::SlotIndex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// A decoding resource that only records what it was asked to load.
#[derive(Debug)]
pub struct HeadlessElement {
    id: u64,
    source: Mutex<Option<String>>,
    loads: AtomicU64,
}

impl HeadlessElement {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            source: Mutex::new(None),
            loads: AtomicU64::new(0),
        }
    }

    pub fn shared(id: u64) -> Arc<dyn MediaElement> {
        Arc::new(Self::new(id))
    }

    /// Number of times a source was loaded into this element.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }
}

impl MediaElement for HeadlessElement {
    fn element_id(&self) -> u64 {
        self.id
    }

    fn set_source(&self, source: Option<&str>) {
        if source.is_some() {
            self.loads.fetch_add(1, Ordering::Relaxed);
        }
        *self.source.lock() = source.map(str::to_owned);
    }

    fn current_source(&self) -> Option<String> {
        self.source.lock().clone()
    }
}

/// Creates one [`HeadlessElement`] per slot, identified by slot index.
#[derive(Debug, Default)]
pub struct HeadlessFactory {
    created: AtomicUsize,
}

impl HeadlessFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elements created so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

impl ElementFactory for HeadlessFactory {
    fn create(&self, index: SlotIndex) -> Arc<dyn MediaElement> {
        self.created.fetch_add(1, Ordering::Relaxed);
        HeadlessElement::shared(index.0 as u64)
    }
}

/// A mount point that records attached element ids.
#[derive(Debug)]
pub struct HeadlessContainer {
    name: String,
    live: AtomicBool,
    refuse: AtomicBool,
    attached: Mutex<Vec<u64>>,
}

impl HeadlessContainer {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            live: AtomicBool::new(true),
            refuse: AtomicBool::new(false),
            attached: Mutex::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Simulate the target being torn down by the host.
    pub fn unmount(&self) {
        self.live.store(false, Ordering::Relaxed);
    }

    /// Make subsequent `attach` calls fail.
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::Relaxed);
    }

    /// Element ids currently mounted here.
    pub fn attached(&self) -> Vec<u64> {
        self.attached.lock().clone()
    }
}

impl Container for HeadlessContainer {
    fn is_live(&self) -> bool {
        self.live.load(Ordering::Relaxed)
    }

    fn attach(&self, element: &Arc<dyn MediaElement>) -> Result<(), String> {
        if self.refuse.load(Ordering::Relaxed) {
            return Err(format!("container {} refused element", self.name));
        }
        let mut attached = self.attached.lock();
        let id = element.element_id();
        if !attached.contains(&id) {
            attached.push(id);
        }
        Ok(())
    }

    fn detach(&self, element: &Arc<dyn MediaElement>) {
        let id = element.element_id();
        self.attached.lock().retain(|&e| e != id);
    }
}
