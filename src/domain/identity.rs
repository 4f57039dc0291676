//! Deployment identity stamped on every response, audit entry and state file.

use serde::{Deserialize, Serialize};

/// Static descriptive tag shown at the top of every response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canon {
    pub tag: String,
    pub scope: String,
    pub time: String,
    #[serde(default)]
    pub rules: Vec<String>,
}

/// Identification constant for a deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub canon: Canon,
    pub version: String,
    pub pack_id: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            canon: Canon {
                tag: "📐 Canon".to_string(),
                scope: "snapwatch · Evidence".to_string(),
                time: format!("v{}", env!("CARGO_PKG_VERSION")),
                rules: vec![
                    "🛡️ Governance: Evidence-only".to_string(),
                    "🧨 Boundary: No prediction".to_string(),
                ],
            },
            version: format!("v{}", env!("CARGO_PKG_VERSION")),
            pack_id: "snapwatch_pack".to_string(),
        }
    }
}
