//! Presence Mirror (§4.I): normalizes raw collaboration awareness state into renderable
//! remote cursors, with throttling, a deterministic color fallback, and stale pruning.

use std::collections::HashMap;

use regex::Regex;
use std::sync::LazyLock;

use crate::model::{CollaborationTransport, Pos, RawAwarenessState, RemoteCursorState};

/// Deterministic fallback color palette, indexed by `client_id % palette.len()`.
pub const FALLBACK_PALETTE: &[&str] =
    &["#E57373", "#64B5F6", "#81C784", "#FFD54F", "#BA68C8", "#4DB6AC", "#F06292", "#A1887F"];

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("static hex color pattern is valid")
});

/// Whether `color` is a valid `#RRGGBB` string.
pub fn is_valid_color(color: &str) -> bool {
    HEX_COLOR.is_match(color)
}

/// Resolve a client's display color: their declared color if valid, else a deterministic
/// palette pick.
pub fn resolve_color(declared: Option<&str>, client_id: u64) -> String {
    if let Some(c) = declared {
        if is_valid_color(c) {
            return c.to_string();
        }
    }
    let idx = (client_id as usize) % FALLBACK_PALETTE.len();
    FALLBACK_PALETTE[idx].to_string()
}

/// Tracks the normalized state of every remote collaborator, plus throttling bookkeeping.
pub struct PresenceMirror {
    cursors: HashMap<u64, RemoteCursorState>,
    visibility_cap: usize,
    stale_timeout_ms: u64,
    last_render_at_ms: Option<u64>,
    pending_render_at_ms: Option<u64>,
}

/// Default visibility cap (§4.I: render top 20 by recency).
pub const DEFAULT_VISIBILITY_CAP: usize = 20;
/// Default stale-client prune timeout, 5 minutes in milliseconds.
pub const DEFAULT_STALE_TIMEOUT_MS: u64 = 5 * 60 * 1000;

impl PresenceMirror {
    /// Create a mirror with the default visibility cap and stale timeout.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_VISIBILITY_CAP, DEFAULT_STALE_TIMEOUT_MS)
    }

    /// Create a mirror with custom limits.
    pub fn with_limits(visibility_cap: usize, stale_timeout_ms: u64) -> Self {
        Self {
            cursors: HashMap::new(),
            visibility_cap,
            stale_timeout_ms,
            last_render_at_ms: None,
            pending_render_at_ms: None,
        }
    }

    /// Normalize a batch of raw awareness states against the current document, clamping
    /// positions to `[0, doc_size]` and preserving `updated_at` when a client's cursor is
    /// unchanged from the previous snapshot.
    ///
    /// This models the mandatory microtask defer of §4.I: callers must invoke this only
    /// after the document state the positions are resolved against has settled, never
    /// synchronously inside the same tick as a document update.
    pub fn normalize(
        &mut self,
        transport: &dyn CollaborationTransport,
        doc_size: Pos,
        now_ms: u64,
    ) {
        let states = transport.awareness_states();
        let mut next: HashMap<u64, RemoteCursorState> = HashMap::new();

        for raw in states {
            let Some((anchor_rel, head_rel)) = &raw.cursor else {
                continue;
            };
            let Some(anchor) = transport.relative_to_absolute(anchor_rel) else {
                continue;
            };
            let Some(head) = transport.relative_to_absolute(head_rel) else {
                continue;
            };

            let anchor = anchor.min(doc_size);
            let head = head.min(doc_size);

            let updated_at = match self.cursors.get(&raw.client_id) {
                Some(prev) if prev.anchor == anchor && prev.head == head => prev.updated_at,
                _ => now_ms,
            };

            let color = resolve_color(raw.user_color.as_deref(), raw.client_id);

            next.insert(
                raw.client_id,
                RemoteCursorState {
                    client_id: raw.client_id,
                    user_name: raw.user_name,
                    user_email: raw.user_email,
                    user_color: Some(color),
                    anchor,
                    head,
                    updated_at,
                },
            );
        }

        self.cursors = next;
    }

    /// Prune clients whose `updated_at` is older than the stale timeout.
    pub fn prune_stale(&mut self, now_ms: u64) {
        let timeout = self.stale_timeout_ms;
        self.cursors.retain(|_, cursor| now_ms.saturating_sub(cursor.updated_at) < timeout);
    }

    /// Clients to render this pass: top `visibility_cap` by `updated_at` descending.
    pub fn visible(&self) -> Vec<&RemoteCursorState> {
        let mut all: Vec<&RemoteCursorState> = self.cursors.values().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        all.truncate(self.visibility_cap);
        all
    }

    /// Decide whether a render should happen now, given a throttle at roughly 60fps
    /// (≈16ms): if elapsed since the last render is >= 16ms, render now; otherwise schedule
    /// a trailing-edge render at the remaining delta and absorb further requests within the
    /// window. Returns `true` if the caller should render immediately.
    pub fn should_render_now(&mut self, now_ms: u64) -> bool {
        const FRAME_MS: u64 = 16;
        match self.last_render_at_ms {
            None => {
                self.last_render_at_ms = Some(now_ms);
                self.pending_render_at_ms = None;
                true
            }
            Some(last) if now_ms.saturating_sub(last) >= FRAME_MS => {
                self.last_render_at_ms = Some(now_ms);
                self.pending_render_at_ms = None;
                true
            }
            Some(last) => {
                let trailing = last + FRAME_MS;
                self.pending_render_at_ms.get_or_insert(trailing);
                false
            }
        }
    }

    /// The trailing-edge render time scheduled by [`Self::should_render_now`], if any. The
    /// host calls this back once its own clock reaches the returned timestamp.
    pub fn pending_render_at(&self) -> Option<u64> {
        self.pending_render_at_ms
    }

    /// Acknowledge that the pending trailing-edge render fired.
    pub fn flush_pending_render(&mut self, now_ms: u64) {
        self.last_render_at_ms = Some(now_ms);
        self.pending_render_at_ms = None;
    }
}

impl Default for PresenceMirror {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelativePosition;

    struct FakeTransport {
        states: Vec<RawAwarenessState>,
    }

    impl CollaborationTransport for FakeTransport {
        fn awareness_states(&self) -> Vec<RawAwarenessState> {
            self.states.clone()
        }

        fn relative_to_absolute(&self, relative: &RelativePosition) -> Option<Pos> {
            relative.0.first().map(|&b| b as Pos)
        }
    }

    fn raw(client_id: u64, anchor: u8, head: u8, color: Option<&str>) -> RawAwarenessState {
        RawAwarenessState {
            client_id,
            cursor: Some((RelativePosition(vec![anchor]), RelativePosition(vec![head]))),
            user_name: Some("someone".to_string()),
            user_email: None,
            user_color: color.map(|c| c.to_string()),
        }
    }

    #[test]
    fn valid_color_is_kept_invalid_falls_back_to_palette() {
        assert_eq!(resolve_color(Some("#112233"), 0), "#112233");
        assert_eq!(resolve_color(Some("notacolor"), 0), FALLBACK_PALETTE[0]);
        assert_eq!(resolve_color(None, 1), FALLBACK_PALETTE[1]);
    }

    #[test]
    fn normalize_clamps_to_doc_size_and_skips_unresolvable() {
        let transport = FakeTransport {
            states: vec![raw(1, 5, 200, Some("#ABCDEF")), raw(2, 0, 0, None)],
        };
        let mut mirror = PresenceMirror::new();
        mirror.normalize(&transport, 10, 1000);

        let c1 = mirror.cursors.get(&1).unwrap();
        assert_eq!(c1.anchor, 5);
        assert_eq!(c1.head, 10);
        assert_eq!(c1.user_color.as_deref(), Some("#ABCDEF"));
    }

    #[test]
    fn unchanged_cursor_preserves_updated_at() {
        let transport = FakeTransport { states: vec![raw(1, 5, 5, None)] };
        let mut mirror = PresenceMirror::new();
        mirror.normalize(&transport, 100, 1000);
        mirror.normalize(&transport, 100, 5000);
        assert_eq!(mirror.cursors.get(&1).unwrap().updated_at, 1000);
    }

    #[test]
    fn visibility_cap_truncates_to_most_recent() {
        let mut mirror = PresenceMirror::with_limits(1, DEFAULT_STALE_TIMEOUT_MS);
        let transport = FakeTransport { states: vec![raw(1, 0, 0, None), raw(2, 0, 0, None)] };
        mirror.normalize(&transport, 10, 1000);
        // force different updated_at by re-normalizing client 2 later with a changed head
        let transport2 = FakeTransport { states: vec![raw(1, 0, 0, None), raw(2, 0, 1, None)] };
        mirror.normalize(&transport2, 10, 2000);

        let visible = mirror.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].client_id, 2);
    }

    #[test]
    fn stale_clients_are_pruned() {
        let mut mirror = PresenceMirror::new();
        let transport = FakeTransport { states: vec![raw(1, 0, 0, None)] };
        mirror.normalize(&transport, 10, 0);
        mirror.prune_stale(DEFAULT_STALE_TIMEOUT_MS + 1);
        assert!(mirror.visible().is_empty());
    }

    #[test]
    fn throttle_renders_immediately_then_absorbs_until_frame_elapses() {
        let mut mirror = PresenceMirror::new();
        assert!(mirror.should_render_now(0));
        assert!(!mirror.should_render_now(5));
        assert_eq!(mirror.pending_render_at(), Some(16));
        assert!(mirror.should_render_now(20));
    }
}
