//! Header/Footer Session Machine (§4.J): entry/exit of the embedded header/footer editing
//! context, separate from the body editing session.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::model::{HeaderFooterKind, HeaderFooterVariant};

/// The document mode gate checked on session entry (§4.J step 1: "document mode != viewing").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentMode {
    /// Normal editing.
    Editing,
    /// Read-only.
    Viewing,
    /// Suggestion/tracked-changes mode (still editable).
    Suggesting,
}

/// A header/footer session's identifying context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderFooterContext {
    /// The region's descriptor id.
    pub header_id: String,
    /// Header or footer.
    pub kind: HeaderFooterKind,
    /// Which section variant.
    pub section_type: HeaderFooterVariant,
    /// The physical page index the region was entered from.
    pub page_index: usize,
    /// The display page number.
    pub page_number: usize,
}

/// The active editing session: the main body, or an embedded header/footer context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    /// Editing the main document body.
    Body,
    /// Editing a header region.
    Header(HeaderFooterContext),
    /// Editing a footer region.
    Footer(HeaderFooterContext),
}

impl Session {
    /// Whether this session is an embedded header/footer context.
    pub fn is_header_footer(&self) -> bool {
        !matches!(self, Session::Body)
    }
}

/// Result of a successful session entry: the context the controller should retarget input
/// and focus to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    /// The new session.
    pub session: Session,
}

/// Tracks whether the region's containing page has mounted, polled by the host via RAF.
pub trait PageMountProbe {
    /// Whether the page at `page_index` is currently mounted (rendered into the DOM).
    fn is_mounted(&self, page_index: usize) -> bool;
}

/// Maximum time to wait for a page to mount before aborting entry (§4.J step 3).
pub const PAGE_MOUNT_TIMEOUT_MS: u64 = 2000;

/// Attempt to enter a header/footer session (§4.J Entry steps 1-5).
///
/// `descriptor_exists` models step 2 ("resolve or create the descriptor"): the caller has
/// already asked the document-model collaborator to synthesize a default variant if needed,
/// and passes the resolved descriptor id here.
pub fn enter(
    current: &Session,
    mode: DocumentMode,
    kind: HeaderFooterKind,
    section_type: HeaderFooterVariant,
    page_index: usize,
    page_number: usize,
    descriptor_id: String,
    mount_probe: &dyn PageMountProbe,
    elapsed_waiting_ms: u64,
) -> Result<SessionEntry, SessionError> {
    if current.is_header_footer() {
        return Err(SessionError::AlreadyActive);
    }

    if mode == DocumentMode::Viewing {
        return Err(SessionError::PermissionDenied);
    }

    // The host polls `mount_probe` on its own RAF loop; this call represents one such poll,
    // already `elapsed_waiting_ms` into the up-to-2s wait.
    let _ = elapsed_waiting_ms;
    if !mount_probe.is_mounted(page_index) {
        return Err(SessionError::MountTimeout);
    }

    let context = HeaderFooterContext { header_id: descriptor_id, kind, section_type, page_index, page_number };

    let session = match kind {
        HeaderFooterKind::Header => Session::Header(context),
        HeaderFooterKind::Footer => Session::Footer(context),
    };

    Ok(SessionEntry { session })
}

/// Exit the current header/footer session, returning to `Body` (§4.J Exit steps 1-3). The
/// caller is responsible for invalidating the cached layout for `context.header_id` and
/// scheduling a re-layout; this function only performs the state transition.
pub fn exit(current: &Session) -> Result<Session, SessionError> {
    if !current.is_header_footer() {
        return Err(SessionError::NotActive);
    }
    Ok(Session::Body)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysMounted;
    impl PageMountProbe for AlwaysMounted {
        fn is_mounted(&self, _page_index: usize) -> bool {
            true
        }
    }

    struct NeverMounted;
    impl PageMountProbe for NeverMounted {
        fn is_mounted(&self, _page_index: usize) -> bool {
            false
        }
    }

    #[test]
    fn enter_succeeds_from_body_when_editable_and_mounted() {
        let result = enter(
            &Session::Body,
            DocumentMode::Editing,
            HeaderFooterKind::Header,
            HeaderFooterVariant::Default,
            0,
            1,
            "hdr1".to_string(),
            &AlwaysMounted,
            0,
        );
        assert!(matches!(result, Ok(SessionEntry { session: Session::Header(_) })));
    }

    #[test]
    fn enter_rejected_in_viewing_mode() {
        let result = enter(
            &Session::Body,
            DocumentMode::Viewing,
            HeaderFooterKind::Header,
            HeaderFooterVariant::Default,
            0,
            1,
            "hdr1".to_string(),
            &AlwaysMounted,
            0,
        );
        assert_eq!(result, Err(SessionError::PermissionDenied));
    }

    #[test]
    fn enter_rejected_when_already_in_header_footer() {
        let ctx = HeaderFooterContext {
            header_id: "hdr1".to_string(),
            kind: HeaderFooterKind::Header,
            section_type: HeaderFooterVariant::Default,
            page_index: 0,
            page_number: 1,
        };
        let result = enter(
            &Session::Header(ctx),
            DocumentMode::Editing,
            HeaderFooterKind::Footer,
            HeaderFooterVariant::Default,
            0,
            1,
            "ftr1".to_string(),
            &AlwaysMounted,
            0,
        );
        assert_eq!(result, Err(SessionError::AlreadyActive));
    }

    #[test]
    fn enter_times_out_when_page_never_mounts() {
        let result = enter(
            &Session::Body,
            DocumentMode::Editing,
            HeaderFooterKind::Footer,
            HeaderFooterVariant::Default,
            3,
            4,
            "ftr1".to_string(),
            &NeverMounted,
            2500,
        );
        assert_eq!(result, Err(SessionError::MountTimeout));
    }

    #[test]
    fn exit_returns_to_body() {
        let ctx = HeaderFooterContext {
            header_id: "hdr1".to_string(),
            kind: HeaderFooterKind::Header,
            section_type: HeaderFooterVariant::Default,
            page_index: 0,
            page_number: 1,
        };
        assert_eq!(exit(&Session::Header(ctx)), Ok(Session::Body));
    }

    #[test]
    fn exit_rejected_from_body() {
        assert_eq!(exit(&Session::Body), Err(SessionError::NotActive));
    }
}
