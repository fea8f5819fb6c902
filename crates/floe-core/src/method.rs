use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// Method
///
/// Protocol verb set. `Merge` is the partial-update verb; a transport that
/// cannot speak it natively is expected to tunnel it itself.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum Method {
    #[display("DELETE")]
    Delete,

    #[display("GET")]
    Get,

    #[display("MERGE")]
    Merge,

    #[display("POST")]
    Post,

    #[display("PUT")]
    Put,
}

impl Method {
    #[must_use]
    pub const fn has_body(self) -> bool {
        matches!(self, Self::Merge | Self::Post | Self::Put)
    }
}
