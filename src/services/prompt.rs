use itertools::Itertools;

use crate::domain::AnalysisRequest;

/// Builds the instruction block shared by single and grouped prompts.
/// The provider must answer with a JSON array so that single-company
/// responses parse through the same strict path as grouped ones.
fn output_contract(requests: &[AnalysisRequest]) -> String {
    let section_keys = requests
        .iter()
        .flat_map(|r| r.sections.iter())
        .unique()
        .map(|s| format!(r#"    "{}": "string""#, s.key()))
        .join(",\n");

    format!(
        r#"Return ONLY a JSON array, one element per company, in the order listed above.
Each element must have this exact shape:
{{
  "company_name": "string",
  "website": "string",
  "sections": {{
{}
  }}
}}

CRITICAL:
- Output ONLY the JSON array, no markdown, no explanations
- Every listed section must be present and non-empty for every company
- Focus only on the named companies, factual information only
- Do not fabricate; write "unknown" when information cannot be found"#,
        section_keys
    )
}

pub fn build_prompt(requests: &[AnalysisRequest]) -> String {
    let companies_list = requests
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {} - {}", i + 1, r.identifier.name, r.identifier.website))
        .join("\n");

    format!(
        "Analyze the following {} competitor(s) and return structured data for each.\n\n\
         Companies to analyze:\n{}\n\n{}\n\nCurrent date: {}",
        requests.len(),
        companies_list,
        output_contract(requests),
        chrono::Local::now().format("%Y-%m-%d"),
    )
}
