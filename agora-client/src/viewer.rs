use agora_common::model::{Id, user::UserMarker};

/// A resolved identity. Callers must wait for identity resolution before
/// composing feeds or voting; "still resolving" is deliberately not a
/// variant, so an unresolved session cannot reach those operations.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Viewer {
    Anonymous,
    SignedIn(Id<UserMarker>),
}

impl Viewer {
    #[must_use]
    pub fn user_id(self) -> Option<Id<UserMarker>> {
        match self {
            Viewer::Anonymous => None,
            Viewer::SignedIn(user_id) => Some(user_id),
        }
    }

    #[must_use]
    pub fn is_signed_in(self) -> bool {
        matches!(self, Viewer::SignedIn(_))
    }
}
