//! Shared state for the HTTP handlers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::{EvidenceReporter, HealthProbe, ReporterSettings, Storage};
use crate::domain::Identity;

/// Everything a request needs, shared behind an `Arc`
pub struct AppState {
    pub reporter: EvidenceReporter,
    pub health: HealthProbe,
}

impl AppState {
    pub fn new(storage: Storage, settings: ReporterSettings, started_at: DateTime<Utc>) -> Self {
        Self {
            health: HealthProbe::new(storage.clone(), started_at),
            reporter: EvidenceReporter::new(storage, settings),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.reporter.settings().identity
    }

    /// Wrap a response body in the deployment header
    pub fn envelope<'a, T: Serialize>(&'a self, endpoint: &'a str, body: T) -> Envelope<'a, T> {
        Envelope {
            identity: self.identity(),
            endpoint,
            body,
        }
    }
}

/// Response body: `canon`, `version`, `pack_id`, `endpoint`, then the payload
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
    #[serde(flatten)]
    pub identity: &'a Identity,
    pub endpoint: &'a str,
    #[serde(flatten)]
    pub body: T,
}
