//! Per-file processing state.
//!
//! A [`Session`] covers one processed file. It remembers which pattern
//! generation was used to mask the file and whether the user has already been
//! told that identifiers were masked. Starting a new file means constructing a
//! new session, which resets the notification.

/// State carried through one classification run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Session {
    pattern_generation: Option<u64>,
    has_notified: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation of the pattern set last used to mask texts in this session.
    pub fn pattern_generation(&self) -> Option<u64> {
        self.pattern_generation
    }

    pub(crate) fn record_pattern_generation(&mut self, generation: u64) {
        self.pattern_generation = Some(generation);
    }

    pub fn has_notified(&self) -> bool {
        self.has_notified
    }

    /// Marks the redaction notification as shown.
    ///
    /// Returns true only on the first call in this session.
    pub fn mark_redaction_notified(&mut self) -> bool {
        !std::mem::replace(&mut self.has_notified, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_fires_once_per_session() {
        let mut session = Session::new();

        assert!(!session.has_notified());
        assert!(session.mark_redaction_notified());
        assert!(!session.mark_redaction_notified());
        assert!(session.has_notified());
    }

    #[test]
    fn new_session_resets_notification() {
        let mut session = Session::new();
        session.mark_redaction_notified();

        let session = Session::new();
        assert!(!session.has_notified());
        assert_eq!(session.pattern_generation(), None);
    }
}
