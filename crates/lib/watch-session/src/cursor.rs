use imap_client_core::Uid;

/// The lowest UID not handled yet.
///
/// Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor(Uid);

impl Cursor {
    /// Start at a UID.
    pub fn new(start: Uid) -> Self {
        Self(start)
    }

    /// The current position.
    pub fn get(self) -> Uid {
        self.0
    }

    /// Drop UIDs below the cursor.
    ///
    /// `UID n:*` always matches the highest UID in the mailbox, even when it
    /// is below `n`.
    pub fn unhandled(self, uids: Vec<Uid>) -> Vec<Uid> {
        let mut uids: Vec<Uid> = uids.into_iter().filter(|uid| *uid >= self.0).collect();
        uids.sort_unstable();
        uids.dedup();
        uids
    }

    /// Move past a handled UID.
    pub fn pass(&mut self, uid: Uid) {
        self.0 = self.0.max(uid.saturating_add(1));
    }
}
