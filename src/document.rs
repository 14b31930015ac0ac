//! Per-document metadata and the collaborator seams of the editor
//!
//! The persistence core does not know about any widget toolkit. The text
//! widget's buffer and the error display are modeled as traits, with a
//! plain in-memory buffer for tests and the CLI.

use std::path::{Path, PathBuf};

use crate::textnorm::LineEnding;

/// Metadata for one open document
///
/// Created when a document is opened or newly created; `charset` and
/// `line_ending` are updated by the load path (or explicitly by the
/// caller) and consumed by the save path.
#[derive(Debug, Clone, Default)]
pub struct DocumentFile {
    /// Backing file; `None` for an unsaved new document.
    pub path: Option<PathBuf>,
    /// Recorded on-disk charset; `None` while still auto-detecting.
    pub charset: Option<String>,
    /// True once the user (or an open override) has fixed the charset.
    /// Cleared when loading reconciles to a different, working charset.
    pub charset_locked: bool,
    /// Line-ending convention of the on-disk form.
    pub line_ending: LineEnding,
}

impl DocumentFile {
    /// A new, unsaved document.
    pub fn untitled() -> Self {
        Self::default()
    }

    /// A document backed by a file (which may not exist yet).
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Fixes the charset explicitly, as a user override would.
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self.charset_locked = true;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// The text widget's buffer, as consumed by the orchestrator
///
/// Bulk replacement during load must not fire "modified" change
/// notifications; the orchestrator brackets it with
/// `block_change_signals`/`unblock_change_signals` and the latter is
/// expected to force whatever refresh the frontend needs.
pub trait DocumentBuffer {
    /// Replace the entire buffer content.
    fn set_text(&mut self, text: &str);
    /// The entire buffer content.
    fn text(&self) -> String;
    /// Current selection bounds as character offsets; equal when there
    /// is no selection.
    fn selection(&self) -> (usize, usize);
    /// Number of characters in the buffer.
    fn char_count(&self) -> usize;
    /// Collapse the selection to the start of the buffer.
    fn place_cursor_at_start(&mut self);
    /// Set or clear the modified flag.
    fn set_modified(&mut self, modified: bool);
    fn block_change_signals(&mut self);
    fn unblock_change_signals(&mut self);
}

/// Fire-and-forget error display (a dialog in the real editor)
pub trait ErrorSink {
    fn report_error(&self, message: &str);
}

/// Error display that writes to stderr, for headless use.
pub struct StderrSink;

impl ErrorSink for StderrSink {
    fn report_error(&self, message: &str) {
        eprintln!("error: {}", message);
    }
}

/// Plain in-memory buffer implementation
///
/// Tracks the modified flag the way a toolkit buffer would: any
/// `set_text` while signals are unblocked marks the buffer modified.
#[derive(Debug, Default)]
pub struct MemoryBuffer {
    text: String,
    cursor: (usize, usize),
    modified: bool,
    signals_blocked: bool,
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn signals_blocked(&self) -> bool {
        self.signals_blocked
    }
}

impl DocumentBuffer for MemoryBuffer {
    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        let end = self.char_count();
        self.cursor = (end, end);
        if !self.signals_blocked {
            self.modified = true;
        }
    }

    fn text(&self) -> String {
        self.text.clone()
    }

    fn selection(&self) -> (usize, usize) {
        self.cursor
    }

    fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    fn place_cursor_at_start(&mut self) {
        self.cursor = (0, 0);
    }

    fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    fn block_change_signals(&mut self) {
        self.signals_blocked = true;
    }

    fn unblock_change_signals(&mut self) {
        self.signals_blocked = false;
    }
}
