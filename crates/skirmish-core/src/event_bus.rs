//! Event Bus (§4.C): registration, deferred/immediate dispatch, simstate
//! gating.
//!
//! Grounded on `skirmish-ecs::event` for the `EventKind`/`Simstate` type
//! vocabulary and on `original_source/src/event.h`'s range partitioning.
//! Native handlers are plain closures; the `Scripted` arm is an opaque
//! handle forwarded to `skirmish-script`'s WASM sandbox by the caller (the
//! bus itself does not depend on `skirmish-script`, keeping the dependency
//! direction `skirmish-core -> skirmish-script` one-way, see `DESIGN.md`).

use std::collections::{HashMap, VecDeque};

use skirmish_ecs::entity::EntityId;
use skirmish_ecs::event::{Event, EventKind, Simstate};

/// A registered handler: either a native Rust closure or an opaque token
/// identifying a scripted callback living in a WASM module.
pub enum Handler {
    Native(Box<dyn FnMut(&Event) + Send>),
    /// Opaque reference resolved by the caller (e.g. a WASM export name or
    /// table index) when `Scripted` handlers are invoked.
    Scripted(u64),
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Native(_) => write!(f, "Handler::Native(..)"),
            Handler::Scripted(id) => write!(f, "Handler::Scripted({id})"),
        }
    }
}

struct Registration {
    id: u64,
    handler: Handler,
    mask: u8,
    /// `None` for a global registration, `Some(uid)` for a per-entity one.
    entity: Option<EntityId>,
}

/// Outcome of invoking a single `Scripted` handler, reported back by the
/// caller (which owns the WASM sandbox) so the bus can log failures without
/// knowing anything about `wasmtime`.
pub struct ScriptInvocationResult {
    pub handler_id: u64,
    pub ok: bool,
    pub error: Option<String>,
}

/// Event Bus: per-kind handler lists plus a deferred-notification queue.
pub struct EventBus {
    handlers: HashMap<EventKind, Vec<Registration>>,
    /// Handlers added/removed *during* dispatch of a kind are staged here
    /// and swapped in only once dispatch of that kind finishes, per §4.C's
    /// "next dispatch of that kind" contract.
    pending_handler_edits: HashMap<EventKind, Vec<HandlerEdit>>,
    dispatching: std::collections::HashSet<EventKind>,
    deferred: VecDeque<Event>,
    next_handler_id: u64,
}

enum HandlerEdit {
    Register(Registration),
    Unregister(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            pending_handler_edits: HashMap::new(),
            dispatching: std::collections::HashSet::new(),
            deferred: VecDeque::new(),
            next_handler_id: 1,
        }
    }

    /// Register a global handler for `kind`, gated by `mask` (a
    /// [`SimstateMask`](skirmish_ecs::event::SimstateMask) bit union).
    /// Returns a handler ID usable with [`unregister`](Self::unregister).
    pub fn register(&mut self, kind: EventKind, handler: Handler, mask: u8) -> u64 {
        self.register_inner(kind, handler, mask, None)
    }

    /// Register a handler that only fires for events targeting `entity`.
    pub fn register_for_entity(
        &mut self,
        kind: EventKind,
        entity: EntityId,
        handler: Handler,
        mask: u8,
    ) -> u64 {
        self.register_inner(kind, handler, mask, Some(entity))
    }

    fn register_inner(
        &mut self,
        kind: EventKind,
        handler: Handler,
        mask: u8,
        entity: Option<EntityId>,
    ) -> u64 {
        let id = self.next_handler_id;
        self.next_handler_id += 1;
        let reg = Registration {
            id,
            handler,
            mask,
            entity,
        };
        if self.dispatching.contains(&kind) {
            self.pending_handler_edits
                .entry(kind)
                .or_default()
                .push(HandlerEdit::Register(reg));
        } else {
            self.handlers.entry(kind).or_default().push(reg);
        }
        id
    }

    /// Unregister a handler by ID, searching every kind it might belong to.
    pub fn unregister(&mut self, kind: EventKind, handler_id: u64) {
        if self.dispatching.contains(&kind) {
            self.pending_handler_edits
                .entry(kind)
                .or_default()
                .push(HandlerEdit::Unregister(handler_id));
        } else if let Some(list) = self.handlers.get_mut(&kind) {
            list.retain(|r| r.id != handler_id);
        }
    }

    /// Enqueue `event` for dispatch at the next [`service_queue`](Self::service_queue).
    pub fn notify_deferred(&mut self, event: Event) {
        self.deferred.push_back(event);
    }

    /// Dispatch `event` synchronously right now.
    ///
    /// Native handlers are invoked directly. `Scripted` handlers are not
    /// invoked here -- the bus has no sandbox to call into -- instead they
    /// are returned so the caller can run them and report results back via
    /// [`apply_script_results`](Self::apply_script_results). This keeps
    /// `EventBus` free of a `skirmish-script` dependency.
    pub fn notify_immediate(&mut self, event: Event, simstate: Simstate) -> Vec<u64> {
        self.dispatch(&event, simstate)
    }

    /// Drain and dispatch every deferred event in FIFO enqueue order,
    /// across kinds. Returns the scripted handler IDs that should be
    /// invoked by the caller, in dispatch order.
    pub fn service_queue(&mut self, simstate: Simstate) -> Vec<u64> {
        let mut scripted = Vec::new();
        while let Some(event) = self.deferred.pop_front() {
            scripted.extend(self.dispatch(&event, simstate));
        }
        scripted
    }

    fn dispatch(&mut self, event: &Event, simstate: Simstate) -> Vec<u64> {
        let kind = event.kind;
        self.dispatching.insert(kind);
        let mut scripted_ids = Vec::new();

        if let Some(list) = self.handlers.get_mut(&kind) {
            let mask_bit = simstate.mask_bit().bits();
            for reg in list.iter_mut() {
                if reg.mask & mask_bit == 0 {
                    continue;
                }
                match &mut reg.handler {
                    Handler::Native(f) => f(event),
                    Handler::Scripted(id) => scripted_ids.push(*id),
                }
            }
        }

        self.dispatching.remove(&kind);
        self.apply_pending_edits(kind);
        scripted_ids
    }

    fn apply_pending_edits(&mut self, kind: EventKind) {
        let Some(edits) = self.pending_handler_edits.remove(&kind) else {
            return;
        };
        let list = self.handlers.entry(kind).or_default();
        for edit in edits {
            match edit {
                HandlerEdit::Register(reg) => list.push(reg),
                HandlerEdit::Unregister(id) => list.retain(|r| r.id != id),
            }
        }
    }

    /// Number of handlers currently registered to fire on any entity for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, |l| l.len())
    }

    /// Whether `kind` has an entity-scoped handler for `entity`.
    pub fn has_entity_handler(&self, kind: EventKind, entity: EntityId) -> bool {
        self.handlers
            .get(&kind)
            .is_some_and(|l| l.iter().any(|r| r.entity == Some(entity)))
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }
}
