use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque caller identity yielded by the external identity provider.
///
/// Used only to stamp `created_by` and to gate mutation endpoints; no
/// authorization policy lives in this repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}
