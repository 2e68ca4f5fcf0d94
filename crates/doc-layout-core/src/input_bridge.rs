//! Input Bridge (§4.K): forwards host input events to the currently active document target,
//! filtering loops, out-of-surface events, registered UI surfaces, and viewing-mode input.

use crate::session::DocumentMode;

/// The kind of DOM event being considered for forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEventKind {
    /// A keydown/keyup event.
    Keyboard,
    /// A compositionstart/update/end event.
    Composition,
    /// A beforeinput event.
    BeforeInput,
    /// An input event.
    Input,
    /// A contextmenu event.
    ContextMenu,
}

impl InputEventKind {
    fn is_text_or_composition(self) -> bool {
        matches!(self, InputEventKind::Keyboard | InputEventKind::Composition | InputEventKind::Input)
    }
}

/// Where an observed event originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOrigin {
    /// Inside the currently active target.
    ActiveTarget,
    /// Inside the layout surface, but not the active target (e.g. a different page/region).
    LayoutSurface,
    /// Inside a registered UI surface (toolbar, dialog).
    RegisteredUiSurface,
    /// Outside the layout surface entirely.
    Outside,
}

/// Whether a plain, single printable character keydown (forwarded instead via
/// `beforeinput` to avoid double-handling, §4.K).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDescriptor {
    /// True if this is a plain character key with no modifiers beyond Shift.
    pub is_plain_character: bool,
}

/// Decide whether an event should be forwarded to the active target.
///
/// `mode` is the current document mode; keyboard/composition/input events are suppressed
/// entirely in [`DocumentMode::Viewing`].
pub fn should_forward(
    kind: InputEventKind,
    origin: EventOrigin,
    mode: DocumentMode,
    key: Option<KeyDescriptor>,
) -> bool {
    if origin == EventOrigin::ActiveTarget {
        return false;
    }
    if origin == EventOrigin::Outside {
        return false;
    }
    if origin == EventOrigin::RegisteredUiSurface {
        return false;
    }

    if mode == DocumentMode::Viewing && kind.is_text_or_composition() {
        return false;
    }

    if kind == InputEventKind::Keyboard {
        if let Some(key) = key {
            if key.is_plain_character {
                return false;
            }
        }
    }

    true
}

/// An active forwarding target: an opaque handle the host uses to route events (an
/// editor instance id, a DOM node reference, etc).
pub trait ForwardTarget {
    /// Dispatch a synthetic `compositionend` to flush any in-progress IME composition.
    fn flush_composition(&mut self);
}

/// Tracks the currently active forwarding target and retargets on session change.
pub struct InputBridge<T> {
    active: Option<T>,
}

impl<T: ForwardTarget> InputBridge<T> {
    /// Create a bridge with no active target.
    pub fn new() -> Self {
        Self { active: None }
    }

    /// Current active target, if any.
    pub fn active(&self) -> Option<&T> {
        self.active.as_ref()
    }

    /// Retarget to a new active target, flushing composition state on the previous one
    /// first (§4.K: "a synthetic compositionend is dispatched to the previous target").
    pub fn retarget(&mut self, new_target: T) {
        if let Some(mut prev) = self.active.take() {
            prev.flush_composition();
        }
        self.active = Some(new_target);
    }

    /// Clear the active target (e.g. on controller destroy), flushing composition first.
    pub fn clear(&mut self) {
        if let Some(mut prev) = self.active.take() {
            prev.flush_composition();
        }
    }
}

impl<T: ForwardTarget> Default for InputBridge<T> {
    fn default() -> Self {
        Self::new()
    }
}
