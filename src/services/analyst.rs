use std::sync::Arc;

use crate::domain::{AnalysisError, AnalysisRequest, AnalysisResult};

use super::parser::{find_entry, parse_batch, sections_for, CompanyEntry, ParsedBatch};
use super::prompt::build_prompt;
use super::GenerationClient;

/// One `request` is one underlying generation call covering every
/// requested section for one company; sections are never split across calls.
pub struct Analyst {
    client: Arc<dyn GenerationClient>,
}

impl Analyst {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Analyst { client }
    }

    /// All failures are folded into the returned result value.
    pub async fn request(&self, request: &AnalysisRequest) -> AnalysisResult {
        let prompt = build_prompt(std::slice::from_ref(request));

        let response_text = match self.client.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                log::error!("Generation call failed for {}: {}", request.identifier.name, e);
                return AnalysisResult::failed(
                    request.identifier.clone(),
                    AnalysisError::ServiceUnavailable,
                );
            }
        };

        match parse_batch(&response_text) {
            ParsedBatch::Parsed(entries) => self.result_from_entries(&entries, request),
            ParsedBatch::Unparseable(raw) => {
                log::warn!(
                    "Unparseable response for {} ({} bytes)",
                    request.identifier.name,
                    raw.len()
                );
                AnalysisResult::failed(
                    request.identifier.clone(),
                    AnalysisError::MalformedResponse,
                )
            }
        }
    }

    /// One underlying call for several companies. Err means the whole call
    /// produced nothing usable and the caller should fall back to
    /// individual calls; Ok carries one result per request, in order.
    pub async fn request_group(
        &self,
        requests: &[AnalysisRequest],
    ) -> Result<Vec<AnalysisResult>, anyhow::Error> {
        let prompt = build_prompt(requests);
        let response_text = self.client.generate(&prompt).await?;

        match parse_batch(&response_text) {
            ParsedBatch::Parsed(entries) => Ok(requests
                .iter()
                .map(|r| self.result_from_entries(&entries, r))
                .collect()),
            ParsedBatch::Unparseable(raw) => {
                anyhow::bail!("Grouped response unparseable ({} bytes)", raw.len())
            }
        }
    }

    fn result_from_entries(
        &self,
        entries: &[CompanyEntry],
        request: &AnalysisRequest,
    ) -> AnalysisResult {
        let sections = find_entry(entries, &request.identifier)
            .and_then(|entry| sections_for(entry, &request.sections));

        match sections {
            Some(sections) => AnalysisResult::ok(request.identifier.clone(), sections),
            None => {
                log::warn!(
                    "Response carried no complete entry for {}",
                    request.identifier.name
                );
                AnalysisResult::failed(
                    request.identifier.clone(),
                    AnalysisError::MalformedResponse,
                )
            }
        }
    }
}
