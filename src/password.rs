//! Password prompting and per-session password state
//!
//! The editor shares one password across every document in a session: it is
//! asked for on the first open or save that needs it and reused afterwards.
//! An empty string is a real answer meaning "no encryption", distinct from
//! "not asked yet". [`PasswordSession`] makes that state explicit and
//! injectable so the core can be tested without a terminal.

use std::io::{self, IsTerminal, Read, Write};

use zeroize::Zeroizing;

use crate::error::{ErrorCategory, ErrorKind, InkvaultError, Result};

/// Trait for obtaining a password from the user or another source
pub trait PasswordPrompt {
    /// Ask for a password once.
    ///
    /// Returns the password wrapped in `Zeroizing` to ensure it is securely
    /// wiped from memory when dropped. An empty string means the user wants
    /// no encryption (or declined the prompt).
    fn read_password(&mut self) -> Result<Zeroizing<String>>;
}

/// Returns a fixed password (for testing)
pub struct ConstantPrompt {
    password: Zeroizing<String>,
}

impl ConstantPrompt {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: Zeroizing::new(password.into()),
        }
    }
}

impl PasswordPrompt for ConstantPrompt {
    fn read_password(&mut self) -> Result<Zeroizing<String>> {
        Ok(self.password.clone())
    }
}

/// Reads a password from any io::Read source (e.g. stdin in scripts)
///
/// Reads to end of stream; one trailing newline is stripped so that
/// `echo secret | inkvault ...` behaves as expected.
pub struct ReaderPrompt {
    reader: Box<dyn Read>,
}

impl ReaderPrompt {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl PasswordPrompt for ReaderPrompt {
    fn read_password(&mut self) -> Result<Zeroizing<String>> {
        let mut data = Zeroizing::new(String::new());
        self.reader.read_to_string(&mut data).map_err(|e| {
            InkvaultError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading password: {}", e),
                e,
            )
        })?;
        if data.ends_with('\n') {
            data.pop();
            if data.ends_with('\r') {
                data.pop();
            }
        }
        Ok(data)
    }
}

/// Reads a password from the terminal with no echo
pub struct TerminalPrompt;

impl TerminalPrompt {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordPrompt for TerminalPrompt {
    fn read_password(&mut self) -> Result<Zeroizing<String>> {
        if !io::stdin().is_terminal() {
            return Err(InkvaultError::with_kind(
                ErrorCategory::User,
                ErrorKind::PasswordUnavailable,
                "cannot read password from terminal - stdin is not a terminal",
            ));
        }

        io::stderr()
            .write_all(b"Password (empty for none): ")
            .map_err(|e| {
                InkvaultError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    format!("failed to write prompt: {}", e),
                    e,
                )
            })?;
        io::stderr().flush().map_err(|e| {
            InkvaultError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to flush prompt: {}", e),
                e,
            )
        })?;

        // Read password *without echo*
        let password = rpassword::read_password().map_err(|e| {
            InkvaultError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::PasswordUnavailable,
                format!("failure reading password: {}", e),
                e,
            )
        })?;

        Ok(Zeroizing::new(password))
    }
}

/// Session-wide password state with "ask at most once" semantics
///
/// The upstream prompt is invoked only on the first [`obtain`] call;
/// subsequent calls return the cached value. An empty answer is cached
/// like any other (it selects plaintext mode), but errors are not, so a
/// failed prompt can be retried. The cached password is wiped when the
/// session is dropped or [`clear`]ed.
///
/// [`obtain`]: PasswordSession::obtain
/// [`clear`]: PasswordSession::clear
pub struct PasswordSession {
    prompt: Box<dyn PasswordPrompt>,
    cached: Option<Zeroizing<String>>,
}

impl PasswordSession {
    pub fn new(prompt: Box<dyn PasswordPrompt>) -> Self {
        Self {
            prompt,
            cached: None,
        }
    }

    /// The currently cached password, if one has been set or asked for.
    pub fn get(&self) -> Option<&str> {
        self.cached.as_deref().map(String::as_str)
    }

    /// Fixes the session password without consulting the prompt.
    pub fn set(&mut self, password: impl Into<String>) {
        self.cached = Some(Zeroizing::new(password.into()));
    }

    /// Forgets the cached password; the next [`obtain`](Self::obtain)
    /// consults the prompt again.
    pub fn clear(&mut self) {
        self.cached = None;
    }

    /// Returns the session password, consulting the prompt if this is the
    /// first time one is needed.
    pub fn obtain(&mut self) -> Result<Zeroizing<String>> {
        if self.cached.is_none() {
            let password = self.prompt.read_password()?;
            self.cached = Some(password);
        }
        Ok(self.cached.as_ref().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCategory, ErrorKind, InkvaultError};

    #[test]
    fn test_constant_prompt() {
        let mut prompt = ConstantPrompt::new("test123");
        assert_eq!(&*prompt.read_password().unwrap(), "test123");
        assert_eq!(&*prompt.read_password().unwrap(), "test123");
    }

    /// Tests the terminal prompt. This is ignored by default and must be run
    /// explicitly and with human input:
    ///
    /// cargo test test_terminal_prompt_interactive -- --ignored --nocapture
    #[test]
    #[ignore]
    fn test_terminal_prompt_interactive() {
        let mut prompt = TerminalPrompt::new();
        println!("\nPlease enter a test password:");
        let password = prompt.read_password().unwrap();
        println!("You entered: {}", &*password);
        assert!(!password.is_empty(), "Expected non-empty password");
    }

    #[test]
    fn test_reader_prompt() {
        let data = b"mypassword\n";
        let mut prompt = ReaderPrompt::new(Box::new(&data[..]));
        assert_eq!(&*prompt.read_password().unwrap(), "mypassword");
    }

    #[test]
    fn test_reader_prompt_crlf() {
        let data = b"mypassword\r\n";
        let mut prompt = ReaderPrompt::new(Box::new(&data[..]));
        assert_eq!(&*prompt.read_password().unwrap(), "mypassword");
    }

    #[test]
    fn test_reader_prompt_empty() {
        let data = b"";
        let mut prompt = ReaderPrompt::new(Box::new(&data[..]));
        assert_eq!(&*prompt.read_password().unwrap(), "");
    }

    #[test]
    fn test_session_asks_at_most_once() {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct CountingPrompt {
            password: String,
            call_count: Rc<RefCell<usize>>,
        }

        impl PasswordPrompt for CountingPrompt {
            fn read_password(&mut self) -> Result<Zeroizing<String>> {
                *self.call_count.borrow_mut() += 1;
                Ok(Zeroizing::new(self.password.clone()))
            }
        }

        let call_count = Rc::new(RefCell::new(0));
        let prompt = CountingPrompt {
            password: "hunter2".to_string(),
            call_count: call_count.clone(),
        };

        let mut session = PasswordSession::new(Box::new(prompt));
        assert_eq!(session.get(), None);

        assert_eq!(&*session.obtain().unwrap(), "hunter2");
        assert_eq!(*call_count.borrow(), 1);

        assert_eq!(&*session.obtain().unwrap(), "hunter2");
        assert_eq!(*call_count.borrow(), 1);

        assert_eq!(session.get(), Some("hunter2"));

        // clear() forgets the answer and the prompt runs again
        session.clear();
        assert_eq!(&*session.obtain().unwrap(), "hunter2");
        assert_eq!(*call_count.borrow(), 2);
    }

    #[test]
    fn test_session_caches_empty_answer() {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct CountingDecline {
            call_count: Rc<RefCell<usize>>,
        }

        impl PasswordPrompt for CountingDecline {
            fn read_password(&mut self) -> Result<Zeroizing<String>> {
                *self.call_count.borrow_mut() += 1;
                Ok(Zeroizing::new(String::new()))
            }
        }

        let call_count = Rc::new(RefCell::new(0));
        let mut session = PasswordSession::new(Box::new(CountingDecline {
            call_count: call_count.clone(),
        }));

        // Declining is a real answer; it must not be re-asked.
        assert_eq!(&*session.obtain().unwrap(), "");
        assert_eq!(&*session.obtain().unwrap(), "");
        assert_eq!(*call_count.borrow(), 1);
        assert_eq!(session.get(), Some(""));
    }

    #[test]
    fn test_session_set_bypasses_prompt() {
        struct PanickingPrompt;

        impl PasswordPrompt for PanickingPrompt {
            fn read_password(&mut self) -> Result<Zeroizing<String>> {
                panic!("prompt must not run when a password was set");
            }
        }

        let mut session = PasswordSession::new(Box::new(PanickingPrompt));
        session.set("preset");
        assert_eq!(&*session.obtain().unwrap(), "preset");
    }

    #[test]
    fn test_session_does_not_cache_errors() {
        struct FailingPrompt;

        impl PasswordPrompt for FailingPrompt {
            fn read_password(&mut self) -> Result<Zeroizing<String>> {
                Err(InkvaultError::with_kind(
                    ErrorCategory::Internal,
                    ErrorKind::PasswordUnavailable,
                    "simulated error",
                ))
            }
        }

        let mut session = PasswordSession::new(Box::new(FailingPrompt));

        assert!(session.obtain().is_err());
        // Error is not cached - subsequent call tries again
        assert!(session.obtain().is_err());
        assert_eq!(session.get(), None);
    }
}
