//! Synchronous change notifications.
//!
//! Every mutable component ([`ResourcePool`](crate::pool::ResourcePool),
//! [`Producer`](crate::producer::Producer),
//! [`Consumer`](crate::consumer::Consumer), [`Market`](crate::market::Market))
//! owns an [`Observers`] set. Events are dispatched immediately, inside the
//! mutating call, to every subscriber registered for that [`EventKind`].
//!
//! # Ordering
//!
//! Subscribers run in `(priority, registration order)`. A subscriber may
//! carry a filter predicate; events it rejects are skipped for that
//! subscriber only.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`Observers::suppress`]. A suppressed
//! kind is dropped before any subscriber is consulted.

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// An economy notification.
#[derive(Debug, Clone, PartialEq)]
pub enum EconomyEvent {
    // -- Pools --
    ResourceChanged {
        resource: String,
        old: f64,
        new: f64,
    },
    ResourceDepleted {
        resource: String,
    },

    // -- Producers --
    ProductionStarted {
        recipe: String,
    },
    ProductionCompleted {
        recipe: String,
        /// Outputs that passed their chance roll, with the amount requested.
        produced: Vec<(String, f64)>,
    },
    ProductionCancelled {
        recipe: String,
        refunded: bool,
    },

    // -- Consumers --
    ResourceStarved {
        resource: String,
    },
    ConsumerSatisfied,

    // -- Markets --
    PriceChanged {
        resource: String,
        old: f64,
        new: f64,
    },
}

/// Discriminant tag for event types, used for subscription and suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ResourceChanged,
    ResourceDepleted,
    ProductionStarted,
    ProductionCompleted,
    ProductionCancelled,
    ResourceStarved,
    ConsumerSatisfied,
    PriceChanged,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 8;

impl EconomyEvent {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            EconomyEvent::ResourceChanged { .. } => EventKind::ResourceChanged,
            EconomyEvent::ResourceDepleted { .. } => EventKind::ResourceDepleted,
            EconomyEvent::ProductionStarted { .. } => EventKind::ProductionStarted,
            EconomyEvent::ProductionCompleted { .. } => EventKind::ProductionCompleted,
            EconomyEvent::ProductionCancelled { .. } => EventKind::ProductionCancelled,
            EconomyEvent::ResourceStarved { .. } => EventKind::ResourceStarved,
            EconomyEvent::ConsumerSatisfied => EventKind::ConsumerSatisfied,
            EconomyEvent::PriceChanged { .. } => EventKind::PriceChanged,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// Subscribers
// ---------------------------------------------------------------------------

/// A listener receives events read-only.
pub type Listener = Box<dyn FnMut(&EconomyEvent)>;

/// Optional predicate that filters events for a subscriber.
pub type EventFilter = Box<dyn Fn(&EconomyEvent) -> bool>;

/// Priority level for subscribers. Lower priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubscriberPriority {
    Pre = 0,
    Normal = 1,
    Post = 2,
}

struct SubscriberEntry {
    listener: Listener,
    priority: SubscriberPriority,
    filter: Option<EventFilter>,
    insertion_order: u64,
}

impl std::fmt::Debug for SubscriberEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberEntry")
            .field("priority", &self.priority)
            .field(
                "filter",
                &if self.filter.is_some() {
                    "Some(<fn>)"
                } else {
                    "None"
                },
            )
            .field("insertion_order", &self.insertion_order)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Observers
// ---------------------------------------------------------------------------

/// Per-component subscriber registry with immediate dispatch.
#[derive(Default)]
pub struct Observers {
    /// Subscribers indexed by event kind, kept sorted by
    /// `(priority, insertion_order)`.
    subscribers: [Vec<SubscriberEntry>; EVENT_KIND_COUNT],

    /// Suppressed event kinds.
    suppressed: [bool; EVENT_KIND_COUNT],

    /// Events dispatched per kind since creation (suppressed ones excluded).
    emitted: [u64; EVENT_KIND_COUNT],

    next_insertion_order: u64,
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("subscriber_count", &self.subscriber_count())
            .field("suppressed", &self.suppressed)
            .field("emitted", &self.emitted)
            .finish_non_exhaustive()
    }
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for an event kind with Normal priority and no filter.
    pub fn subscribe(&mut self, kind: EventKind, listener: Listener) {
        self.subscribe_filtered(kind, SubscriberPriority::Normal, None, listener);
    }

    /// Register a listener with explicit priority and optional filter.
    pub fn subscribe_filtered(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        listener: Listener,
    ) {
        let order = self.next_insertion_order;
        self.next_insertion_order += 1;
        let list = &mut self.subscribers[kind.index()];
        list.push(SubscriberEntry {
            listener,
            priority,
            filter,
            insertion_order: order,
        });
        list.sort_by_key(|entry| (entry.priority as u8, entry.insertion_order));
    }

    /// Suppress an event kind. Suppressed events never reach subscribers.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
    }

    /// Lift a suppression set by [`Observers::suppress`].
    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Dispatch an event to every matching subscriber, in order.
    pub fn emit(&mut self, event: EconomyEvent) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        self.emitted[idx] += 1;

        for entry in &mut self.subscribers[idx] {
            if let Some(ref filter) = entry.filter
                && !filter(&event)
            {
                continue;
            }
            (entry.listener)(&event);
        }
    }

    /// Number of events of a kind dispatched since creation.
    pub fn emitted_count(&self, kind: EventKind) -> u64 {
        self.emitted[kind.index()]
    }

    /// Total number of registered subscribers across all kinds.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.iter().map(Vec::len).sum()
    }

    /// Remove every subscriber. Suppression settings are kept.
    pub fn clear(&mut self) {
        for list in &mut self.subscribers {
            list.clear();
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
