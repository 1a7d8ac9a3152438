//! Playback slots and the host capabilities they are built on.
//!
//! A slot wraps exactly one real decoding resource (a [`MediaElement`]) for
//! the whole life of the pool. While assigned it is attached to one
//! caller-owned [`Container`]; it is always detached from the previous
//! container before being attached to a new one.

use reel_core::{RequestId, SlotIndex, Tick};
use std::fmt;
use std::sync::Arc;

/// One real decoding resource owned by the host (e.g. a `<video>` element).
pub trait MediaElement: Send + Sync {
    /// Stable identity of the element, unique within one pool.
    fn element_id(&self) -> u64;

    /// Load `source`, or drop the current source when `None`.
    fn set_source(&self, source: Option<&str>);

    /// Source currently loaded, if the host can report it.
    fn current_source(&self) -> Option<String>;
}

/// Creates the decoding resource backing a new slot.
pub trait ElementFactory: Send + Sync {
    fn create(&self, index: SlotIndex) -> Arc<dyn MediaElement>;
}

impl<F> ElementFactory for F
where
    F: Fn(SlotIndex) -> Arc<dyn MediaElement> + Send + Sync,
{
    fn create(&self, index: SlotIndex) -> Arc<dyn MediaElement> {
        self(index)
    }
}

/// Caller-owned rendering target a slot's element is mounted into.
///
/// The pool only ever attaches and detaches its own element. These methods
/// run while the pool's state lock is held and must not call back into it.
pub trait Container: Send + Sync {
    /// Whether the handle still refers to a mounted target.
    fn is_live(&self) -> bool {
        true
    }

    /// Mount `element`. An `Err` leaves the slot free.
    fn attach(&self, element: &Arc<dyn MediaElement>) -> Result<(), String>;

    /// Unmount `element`. Must tolerate elements it does not hold.
    fn detach(&self, element: &Arc<dyn MediaElement>);
}

/// Shared reference to a caller's container.
pub type ContainerRef = Arc<dyn Container>;

/// Ownership state of a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    Free,
    Assigned(RequestId),
}

/// What a request receives when it is granted a slot.
#[derive(Clone)]
pub struct SlotHandle {
    index: SlotIndex,
    generation: u64,
    request_id: RequestId,
    source: Arc<str>,
    element: Arc<dyn MediaElement>,
}

impl SlotHandle {
    pub fn index(&self) -> SlotIndex {
        self.index
    }

    /// Assignment counter of the slot; differs for every grant of that slot.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The decoding resource, for play/pause control by the caller.
    pub fn element(&self) -> &Arc<dyn MediaElement> {
        &self.element
    }
}

impl fmt::Debug for SlotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotHandle")
            .field("index", &self.index)
            .field("generation", &self.generation)
            .field("request_id", &self.request_id)
            .field("source", &self.source)
            .field("element", &self.element.element_id())
            .finish()
    }
}

/// A reusable playback unit.
pub struct Slot {
    index: SlotIndex,
    element: Arc<dyn MediaElement>,
    state: SlotState,
    container: Option<ContainerRef>,
    last_used: Tick,
    assigned_at: Tick,
    generation: u64,
}

impl Slot {
    pub(crate) fn new(index: SlotIndex, element: Arc<dyn MediaElement>) -> Self {
        Self {
            index,
            element,
            state: SlotState::Free,
            container: None,
            last_used: Tick::ZERO,
            assigned_at: Tick::ZERO,
            generation: 0,
        }
    }

    pub fn index(&self) -> SlotIndex {
        self.index
    }

    pub fn state(&self) -> &SlotState {
        &self.state
    }

    pub fn is_free(&self) -> bool {
        self.state == SlotState::Free
    }

    /// Request currently holding the slot.
    pub fn owner(&self) -> Option<&RequestId> {
        match &self.state {
            SlotState::Assigned(id) => Some(id),
            SlotState::Free => None,
        }
    }

    pub fn last_used(&self) -> Tick {
        self.last_used
    }

    pub fn assigned_at(&self) -> Tick {
        self.assigned_at
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn element(&self) -> &Arc<dyn MediaElement> {
        &self.element
    }

    /// Whether the element is currently mounted somewhere.
    pub fn is_attached(&self) -> bool {
        self.container.is_some()
    }

    /// Mount the element into `container`, load `source` and take ownership
    /// for `id`. On failure the slot stays free and unattached.
    pub(crate) fn assign(
        &mut self,
        id: &RequestId,
        source: &str,
        container: &ContainerRef,
        now: Tick,
    ) -> Result<SlotHandle, String> {
        debug_assert!(self.is_free(), "assigning a slot that is still owned");

        if let Some(previous) = self.container.take() {
            previous.detach(&self.element);
        }

        container.attach(&self.element)?;
        self.element.set_source(Some(source));

        self.container = Some(Arc::clone(container));
        self.state = SlotState::Assigned(id.clone());
        self.last_used = now;
        self.assigned_at = now;
        self.generation += 1;

        Ok(SlotHandle {
            index: self.index,
            generation: self.generation,
            request_id: id.clone(),
            source: Arc::from(source),
            element: Arc::clone(&self.element),
        })
    }

    /// Unload and unmount the element. Returns the previous owner.
    pub(crate) fn vacate(&mut self) -> Option<RequestId> {
        let owner = match std::mem::replace(&mut self.state, SlotState::Free) {
            SlotState::Assigned(id) => id,
            SlotState::Free => return None,
        };

        self.element.set_source(None);
        if let Some(container) = self.container.take() {
            container.detach(&self.element);
        }
        Some(owner)
    }

    /// Refresh recency while assigned.
    pub(crate) fn touch(&mut self, now: Tick) -> bool {
        if self.is_free() {
            return false;
        }
        self.last_used = now;
        true
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("index", &self.index)
            .field("state", &self.state)
            .field("attached", &self.is_attached())
            .field("last_used", &self.last_used)
            .field("generation", &self.generation)
            .finish()
    }
}
