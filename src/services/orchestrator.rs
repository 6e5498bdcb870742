use std::future::Future;
use std::time::{Duration, Instant};

use crate::configuration::AnalysisSettings;
use crate::domain::{
    AnalysisError, AnalysisRequest, AnalysisResult, BatchOutcome, CompanyIdentifier, SectionKind,
};

use super::analyst::Analyst;

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub max_batch_size: usize,
    pub timeout: Option<Duration>,
    pub sections: Vec<SectionKind>,
}

impl BatchConfig {
    pub fn from_settings(settings: &AnalysisSettings) -> Self {
        BatchConfig {
            max_batch_size: settings.max_batch_size,
            timeout: settings.timeout_seconds.map(Duration::from_secs),
            sections: SectionKind::all(),
        }
    }
}

/// Groups companies into shared generation calls of at most
/// `max_batch_size` and reassembles results in input order.
pub struct Orchestrator {
    analyst: Analyst,
    config: BatchConfig,
}

impl Orchestrator {
    pub fn new(analyst: Analyst, config: BatchConfig) -> Result<Self, anyhow::Error> {
        if config.max_batch_size == 0 {
            anyhow::bail!("Batch size must be at least 1");
        }
        if config.sections.is_empty() {
            anyhow::bail!("At least one analysis section must be configured");
        }

        Ok(Orchestrator { analyst, config })
    }

    /// Returns exactly one result per input identifier, in input order.
    pub async fn analyze_many(&self, identifiers: &[CompanyIdentifier]) -> BatchOutcome {
        let deadline = self.config.timeout.map(|t| Instant::now() + t);
        let mut calls: u32 = 0;
        let mut results: Vec<AnalysisResult> = Vec::with_capacity(identifiers.len());

        for group in identifiers.chunks(self.config.max_batch_size) {
            if expired(deadline) {
                results.extend(
                    group
                        .iter()
                        .map(|id| AnalysisResult::failed(id.clone(), AnalysisError::Timeout)),
                );
                continue;
            }

            let requests: Vec<AnalysisRequest> = group
                .iter()
                .map(|id| AnalysisRequest {
                    identifier: id.clone(),
                    sections: self.config.sections.clone(),
                })
                .collect();

            let group_results = self.dispatch_group(&requests, deadline, &mut calls).await;
            results.extend(group_results);
        }

        log::info!(
            "Batch of {} companies finished with {} underlying calls",
            identifiers.len(),
            calls
        );

        BatchOutcome {
            results,
            total_calls_made: calls,
        }
    }

    async fn dispatch_group(
        &self,
        requests: &[AnalysisRequest],
        deadline: Option<Instant>,
        calls: &mut u32,
    ) -> Vec<AnalysisResult> {
        if requests.len() == 1 {
            let request = &requests[0];
            return match bounded(deadline, self.analyst.request(request), calls).await {
                Some(result) => vec![result],
                None => vec![timed_out(request)],
            };
        }

        match bounded(deadline, self.analyst.request_group(requests), calls).await {
            Some(Ok(group_results)) => group_results,
            // Budget ran out mid-call; no fallback, the companies are done.
            None => requests.iter().map(timed_out).collect(),
            Some(Err(e)) => {
                log::warn!(
                    "Grouped call for {} companies failed, retrying individually: {}",
                    requests.len(),
                    e
                );
                self.fallback_individually(requests, deadline, calls).await
            }
        }
    }

    // The only retry the orchestrator ever makes, which bounds the call
    // count for N companies at ceil(N/B) + N.
    async fn fallback_individually(
        &self,
        requests: &[AnalysisRequest],
        deadline: Option<Instant>,
        calls: &mut u32,
    ) -> Vec<AnalysisResult> {
        let mut recovered = Vec::with_capacity(requests.len());

        for request in requests {
            if expired(deadline) {
                recovered.push(timed_out(request));
                continue;
            }

            match bounded(deadline, self.analyst.request(request), calls).await {
                Some(result) => recovered.push(result),
                None => recovered.push(timed_out(request)),
            }
        }

        recovered
    }
}

fn timed_out(request: &AnalysisRequest) -> AnalysisResult {
    AnalysisResult::failed(request.identifier.clone(), AnalysisError::Timeout)
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

// Counts the call only once the future is actually polled; None means the
// budget ran out before or during the call.
async fn bounded<F, T>(deadline: Option<Instant>, fut: F, calls: &mut u32) -> Option<T>
where
    F: Future<Output = T>,
{
    match deadline {
        None => {
            *calls += 1;
            Some(fut.await)
        }
        Some(d) => {
            let now = Instant::now();
            if now >= d {
                return None;
            }
            *calls += 1;
            tokio::time::timeout(d - now, fut).await.ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use itertools::Itertools;

    use super::{BatchConfig, Orchestrator};
    use crate::domain::{AnalysisError, CompanyIdentifier, SectionKind};
    use crate::services::{Analyst, GenerationClient};

    // Reads the company list back out of the prompt and synthesizes a
    // well-formed response, with configurable misbehavior.
    struct FakeProvider {
        calls: AtomicU32,
        reject_grouped: bool,
        omit: Option<String>,
        delay_after_first: Option<Duration>,
    }

    impl FakeProvider {
        fn well_behaved() -> Self {
            FakeProvider {
                calls: AtomicU32::new(0),
                reject_grouped: false,
                omit: None,
                delay_after_first: None,
            }
        }

        fn listed_companies(prompt: &str) -> Vec<String> {
            prompt
                .lines()
                .filter_map(|line| {
                    let line = line.trim();
                    let (number, rest) = line.split_once(". ")?;
                    number.parse::<u32>().ok()?;
                    let (name, _url) = rest.split_once(" - ")?;
                    Some(name.to_string())
                })
                .collect()
        }

        fn entry_for(name: &str) -> String {
            let sections = SectionKind::all()
                .iter()
                .map(|s| format!(r#""{}": "Synthesized {} text.""#, s.key(), s.key()))
                .join(", ");
            format!(
                r#"{{"company_name": "{}", "sections": {{{}}}}}"#,
                name, sections
            )
        }
    }

    #[async_trait]
    impl GenerationClient for FakeProvider {
        async fn generate(&self, prompt: &str) -> Result<String, anyhow::Error> {
            let call_number = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let companies = FakeProvider::listed_companies(prompt);

            if self.reject_grouped && companies.len() > 1 {
                anyhow::bail!("provider rejected multi-subject prompt");
            }

            if let Some(delay) = self.delay_after_first {
                if call_number > 1 {
                    tokio::time::sleep(delay).await;
                }
            }

            let entries = companies
                .iter()
                .filter(|name| Some(name.as_str()) != self.omit.as_deref())
                .map(|name| FakeProvider::entry_for(name))
                .join(", ");

            Ok(format!("[{}]", entries))
        }
    }

    fn companies(n: usize) -> Vec<CompanyIdentifier> {
        let names = ["Stripe", "Square", "PayPal", "Shopify", "Adyen"];
        names[..n]
            .iter()
            .map(|name| {
                CompanyIdentifier::new(name, &format!("https://{}.com", name.to_lowercase()))
                    .unwrap()
            })
            .collect()
    }

    fn orchestrator(provider: FakeProvider, max_batch_size: usize) -> Orchestrator {
        orchestrator_with_timeout(provider, max_batch_size, None)
    }

    fn orchestrator_with_timeout(
        provider: FakeProvider,
        max_batch_size: usize,
        timeout: Option<Duration>,
    ) -> Orchestrator {
        let analyst = Analyst::new(Arc::new(provider));
        Orchestrator::new(
            analyst,
            BatchConfig {
                max_batch_size,
                timeout,
                sections: vec![SectionKind::Overview, SectionKind::Pricing],
            },
        )
        .unwrap()
    }

    #[test]
    fn zero_batch_size_is_rejected_up_front() {
        let analyst = Analyst::new(Arc::new(FakeProvider::well_behaved()));
        let result = Orchestrator::new(
            analyst,
            BatchConfig {
                max_batch_size: 0,
                timeout: None,
                sections: vec![SectionKind::Overview],
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_section_set_is_rejected_up_front() {
        let analyst = Analyst::new(Arc::new(FakeProvider::well_behaved()));
        let result = Orchestrator::new(
            analyst,
            BatchConfig {
                max_batch_size: 2,
                timeout: None,
                sections: vec![],
            },
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn two_companies_share_a_single_call() {
        let orchestrator = orchestrator(FakeProvider::well_behaved(), 2);

        let outcome = orchestrator.analyze_many(&companies(2)).await;

        assert_eq!(outcome.total_calls_made, 1);
        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.results.iter().all(|r| r.succeeded));
        assert!(outcome.results.iter().all(|r| r.error.is_none()));
    }

    #[tokio::test]
    async fn results_keep_input_order_across_groups() {
        let orchestrator = orchestrator(FakeProvider::well_behaved(), 2);
        let input = companies(5);

        let outcome = orchestrator.analyze_many(&input).await;

        assert_eq!(outcome.total_calls_made, 3);
        assert_eq!(outcome.results.len(), 5);
        for (company, result) in input.iter().zip(outcome.results.iter()) {
            assert_eq!(&result.identifier, company);
        }
    }

    #[tokio::test]
    async fn rejected_grouped_call_falls_back_to_individual_calls() {
        let provider = FakeProvider {
            reject_grouped: true,
            ..FakeProvider::well_behaved()
        };
        let orchestrator = orchestrator(provider, 2);

        let outcome = orchestrator.analyze_many(&companies(2)).await;

        // The failed grouped call is dispatched and therefore counted,
        // then one individual call per company: 1 + 2.
        assert_eq!(outcome.total_calls_made, 3);
        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.results.iter().all(|r| r.succeeded));
    }

    #[tokio::test]
    async fn call_count_stays_within_fallback_upper_bound() {
        let provider = FakeProvider {
            reject_grouped: true,
            ..FakeProvider::well_behaved()
        };
        let orchestrator = orchestrator(provider, 2);
        let input = companies(5);

        let outcome = orchestrator.analyze_many(&input).await;

        // ceil(5/2) grouped + 5 individual retries.
        assert!(outcome.total_calls_made <= 3 + 5);
        assert!(outcome.results.iter().all(|r| r.succeeded));
    }

    #[tokio::test]
    async fn one_missing_company_leaves_siblings_untouched() {
        let provider = FakeProvider {
            omit: Some("Square".to_string()),
            ..FakeProvider::well_behaved()
        };
        let orchestrator = orchestrator(provider, 3);

        let outcome = orchestrator.analyze_many(&companies(3)).await;

        assert_eq!(outcome.total_calls_made, 1);
        assert_eq!(outcome.results.len(), 3);
        assert!(outcome.results[0].succeeded);
        assert!(!outcome.results[1].succeeded);
        assert_eq!(
            outcome.results[1].error,
            Some(AnalysisError::MalformedResponse)
        );
        assert!(outcome.results[2].succeeded);
    }

    #[tokio::test]
    async fn budget_expiry_marks_remaining_companies_timed_out() {
        let provider = FakeProvider {
            delay_after_first: Some(Duration::from_secs(5)),
            ..FakeProvider::well_behaved()
        };
        let orchestrator =
            orchestrator_with_timeout(provider, 1, Some(Duration::from_millis(200)));

        let outcome = orchestrator.analyze_many(&companies(3)).await;

        assert_eq!(outcome.results.len(), 3);
        assert!(outcome.results[0].succeeded);
        assert_eq!(outcome.results[1].error, Some(AnalysisError::Timeout));
        assert_eq!(outcome.results[2].error, Some(AnalysisError::Timeout));
        // The third company was never dispatched.
        assert_eq!(outcome.total_calls_made, 2);
    }

    #[tokio::test]
    async fn expired_budget_counts_no_calls() {
        let orchestrator =
            orchestrator_with_timeout(FakeProvider::well_behaved(), 2, Some(Duration::ZERO));

        let outcome = orchestrator.analyze_many(&companies(3)).await;

        assert_eq!(outcome.total_calls_made, 0);
        assert_eq!(outcome.results.len(), 3);
        assert!(outcome
            .results
            .iter()
            .all(|r| r.error == Some(AnalysisError::Timeout)));
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let orchestrator = orchestrator(FakeProvider::well_behaved(), 2);

        let outcome = orchestrator.analyze_many(&[]).await;

        assert_eq!(outcome.results.len(), 0);
        assert_eq!(outcome.total_calls_made, 0);
    }
}
