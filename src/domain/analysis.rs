use std::collections::BTreeMap;
use std::fmt;

use super::company::{CompanyIdentifier, SectionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisError {
    ServiceUnavailable,
    MalformedResponse,
    Timeout,
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::ServiceUnavailable => write!(f, "analysis service unavailable"),
            AnalysisError::MalformedResponse => write!(f, "malformed provider response"),
            AnalysisError::Timeout => write!(f, "analysis budget exceeded"),
        }
    }
}

/// One company's worth of work for a single orchestration call.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub identifier: CompanyIdentifier,
    pub sections: Vec<SectionKind>,
}

impl AnalysisRequest {
    pub fn new(
        identifier: CompanyIdentifier,
        sections: Vec<SectionKind>,
    ) -> Result<Self, anyhow::Error> {
        if sections.is_empty() {
            anyhow::bail!(
                "No analysis sections requested for company: {}",
                identifier.name
            );
        }

        Ok(AnalysisRequest {
            identifier,
            sections,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub identifier: CompanyIdentifier,
    pub sections: BTreeMap<SectionKind, String>,
    pub succeeded: bool,
    pub error: Option<AnalysisError>,
}

impl AnalysisResult {
    pub fn ok(identifier: CompanyIdentifier, sections: BTreeMap<SectionKind, String>) -> Self {
        AnalysisResult {
            identifier,
            sections,
            succeeded: true,
            error: None,
        }
    }

    pub fn failed(identifier: CompanyIdentifier, error: AnalysisError) -> Self {
        AnalysisResult {
            identifier,
            sections: BTreeMap::new(),
            succeeded: false,
            error: Some(error),
        }
    }
}

/// `total_calls_made` counts every underlying request dispatched,
/// failed grouped calls and fallback retries included.
#[derive(Debug)]
pub struct BatchOutcome {
    pub results: Vec<AnalysisResult>,
    pub total_calls_made: u32,
}

impl BatchOutcome {
    pub fn succeeded_count(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded).count()
    }
}
