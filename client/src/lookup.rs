//! Autocomplete lookups over `GET {base}/{resource}/search?q=`.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

use rxtriage_core::RemoteError;
use rxtriage_engine::SearchSource;

use crate::HttpBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupResource {
    Patients,
    Pharmacies,
    Allergies,
    Diagnoses,
    Drugs,
}

impl LookupResource {
    pub const ALL: [Self; 5] = [
        Self::Patients,
        Self::Pharmacies,
        Self::Allergies,
        Self::Diagnoses,
        Self::Drugs,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Patients => "patients",
            Self::Pharmacies => "pharmacies",
            Self::Allergies => "allergies",
            Self::Diagnoses => "diagnoses",
            Self::Drugs => "drugs",
        }
    }
}

impl fmt::Display for LookupResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown lookup resource {0:?}; expected patients, pharmacies, allergies, diagnoses or drugs")]
pub struct UnknownResource(pub String);

impl FromStr for LookupResource {
    type Err = UnknownResource;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|resource| resource.as_str() == wanted)
            .ok_or_else(|| UnknownResource(raw.to_string()))
    }
}

/// [`SearchSource`] for one lookup resource. Items are passed through as
/// raw JSON; each resource has its own shape.
#[derive(Debug, Clone)]
pub struct LookupSource {
    backend: HttpBackend,
    resource: LookupResource,
}

impl LookupSource {
    #[must_use]
    pub fn new(backend: HttpBackend, resource: LookupResource) -> Self {
        Self { backend, resource }
    }

    #[must_use]
    pub const fn resource(&self) -> LookupResource {
        self.resource
    }
}

impl SearchSource for LookupSource {
    type Item = Value;

    async fn search(&self, query: String) -> Result<Vec<Value>, RemoteError> {
        self.backend.lookup(self.resource, &query).await
    }
}
