//! Common document metadata
//!
//! Every collection carries creation/update timestamps and a soft-delete
//! flag; reads filter on `is_deleted` so deleted documents resolve to
//! "absent" rather than erroring.

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Common metadata embedded in every document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    #[serde(default)]
    pub is_deleted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }
}
