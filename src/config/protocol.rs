//! Protocol configuration types.

use super::defaults::default_max_display_name_length;
use serde::{Deserialize, Serialize};

/// Limits applied to client-supplied envelope fields.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProtocolConfig {
    /// Maximum display name length in characters, measured after trimming
    #[serde(default = "default_max_display_name_length")]
    pub max_display_name_length: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_display_name_length: default_max_display_name_length(),
        }
    }
}
