//! inkvault - password-protected text document persistence
//!
//! The load/save layer of a simple text editor: a versioned binary
//! envelope (scrypt key derivation + NaCl secretbox authenticated
//! encryption) around text whose charset and line endings are normalized
//! to UTF-8/LF in memory.
//!
//! With a password set, files on disk look like:
//!
//! ```text
//! version(1 = 0x01) | salt(16) | nonce(24) | sealed box (ciphertext + 16-byte MAC)
//! ```
//!
//! With an empty password, files are plain text with no envelope at all.
//! Which mode applies is decided by the session password, never by
//! probing the file.

pub mod document;
pub mod envelope;
pub mod error;
pub mod file_ops;
pub mod location;
pub mod password;
pub mod textnorm;

pub use document::{DocumentBuffer, DocumentFile, ErrorSink, MemoryBuffer, StderrSink};
pub use error::{ErrorCategory, ErrorKind, InkvaultError, Result};
pub use password::{ConstantPrompt, PasswordPrompt, PasswordSession, ReaderPrompt, TerminalPrompt};
pub use textnorm::LineEnding;
