//! Document open/save orchestration
//!
//! This module drives a whole open or save: raw file bytes through the
//! envelope codec and the charset/line-ending normalizer, into or out of
//! the document buffer. It is also the only layer that talks to the
//! error display; everything below returns typed errors.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::document::{DocumentBuffer, DocumentFile, ErrorSink};
use crate::envelope;
use crate::error::{ErrorCategory, ErrorKind, InkvaultError, Result};
use crate::password::PasswordSession;
use crate::textnorm::{
    self, DEFAULT_CHARSET, apply_line_ending, detect_line_ending, normalize_to_lf,
};

/// Open a document, returning its normalized UTF-8 text and metadata
///
/// A path that does not exist yields an empty new document, not an error.
/// The password session is consulted only when the file has content, so a
/// fresh file never triggers the prompt. `charset_override` fixes the
/// charset to try first, as an explicit user choice; the charset that
/// actually decoded the text is recorded on the returned metadata.
pub fn open_document(
    path: &Path,
    session: &mut PasswordSession,
    charset_override: Option<&str>,
) -> Result<(String, DocumentFile)> {
    let mut doc = DocumentFile::at(path);
    if let Some(charset) = charset_override {
        doc = doc.with_charset(charset);
    }

    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            // New document; nothing on disk until the first save.
            return Ok((String::new(), doc));
        }
        Err(e) => return Err(read_error(path, e)),
    };

    if raw.is_empty() {
        return Ok((String::new(), doc));
    }

    let password = session.obtain()?;
    let plain = envelope::decode(&raw, &password)?;

    doc.line_ending = detect_line_ending(&plain);
    let canonical = normalize_to_lf(&plain);

    let (text, used_charset) = textnorm::decode_text(&canonical, doc.charset.as_deref())?;
    if doc.charset.as_deref() != Some(used_charset.as_str()) {
        // Reconciled with a charset that empirically works, so any
        // explicit override no longer stands.
        doc.charset = Some(used_charset);
        doc.charset_locked = false;
    }

    Ok((text, doc))
}

/// Save a document's canonical UTF-8/LF text to its recorded path
///
/// Applies the recorded line ending, transcodes to the recorded charset
/// (recording the default first if none is set), wraps the result in the
/// envelope (or writes plaintext when the session password is empty), and
/// writes the file in one piece.
pub fn save_document(
    text: &str,
    doc: &mut DocumentFile,
    session: &mut PasswordSession,
) -> Result<()> {
    let path = doc.path.clone().ok_or_else(|| {
        InkvaultError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "document has no path to save to",
        )
    })?;

    let on_disk_text = apply_line_ending(text, doc.line_ending);

    if doc.charset.is_none() {
        doc.charset = Some(DEFAULT_CHARSET.to_string());
    }
    let charset = doc.charset.as_deref().unwrap_or(DEFAULT_CHARSET);
    let bytes = textnorm::encode_text(&on_disk_text, charset)?;

    let password = session.obtain()?;
    let output = envelope::encode(&bytes, &password)?;

    write_document(&path, &output)
}

/// Fill the buffer from loaded text without it looking like an edit
///
/// Change signals are blocked for the bulk replace, the cursor is reset,
/// the modified flag cleared, and signals unblocked afterwards so the
/// frontend refreshes once.
pub fn load_into_buffer(buffer: &mut dyn DocumentBuffer, text: &str) {
    buffer.block_change_signals();
    buffer.set_text(text);
    buffer.place_cursor_at_start();
    buffer.set_modified(false);
    buffer.unblock_change_signals();
}

/// Open a document into a buffer, reporting any failure to the sink.
///
/// Returns the document metadata on success. On failure the buffer is
/// left untouched.
pub fn open_into_buffer(
    path: &Path,
    session: &mut PasswordSession,
    buffer: &mut dyn DocumentBuffer,
    sink: &dyn ErrorSink,
) -> Option<DocumentFile> {
    match open_document(path, session, None) {
        Ok((text, doc)) => {
            load_into_buffer(buffer, &text);
            Some(doc)
        }
        Err(e) => {
            sink.report_error(e.message());
            None
        }
    }
}

/// Save a buffer's content, reporting any failure to the sink.
///
/// Clears the buffer's modified flag on success.
pub fn save_from_buffer(
    buffer: &mut dyn DocumentBuffer,
    doc: &mut DocumentFile,
    session: &mut PasswordSession,
    sink: &dyn ErrorSink,
) -> bool {
    let text = buffer.text();
    match save_document(&text, doc, session) {
        Ok(()) => {
            buffer.set_modified(false);
            true
        }
        Err(e) => {
            sink.report_error(e.message());
            false
        }
    }
}

/// Write the document file in one piece, with restrictive permissions
/// (0o600 on Unix). Failing to open and failing mid-write are distinct
/// errors.
fn write_document(path: &Path, contents: &[u8]) -> Result<()> {
    #[cfg(unix)]
    let open_result = {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;

        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
    };

    #[cfg(not(unix))]
    let open_result = {
        use std::fs::OpenOptions;

        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
    };

    let mut file = open_result.map_err(|e| {
        InkvaultError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("can't open {} for writing", path.display()),
            e,
        )
    })?;

    file.write_all(contents).map_err(|e| {
        InkvaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!(
                "can't write {}: write stopped short of {} bytes",
                path.display(),
                contents.len()
            ),
            e,
        )
    })?;

    Ok(())
}

fn read_error(path: &Path, err: io::Error) -> InkvaultError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    InkvaultError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}
