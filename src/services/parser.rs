use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::{CompanyIdentifier, SectionKind};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CompanyEntry {
    pub company_name: String,
    #[serde(default)]
    pub website: Option<String>,
    pub sections: BTreeMap<String, String>,
}

/// Either the whole response yielded structured entries or it did not;
/// there is no partial middle ground at this level.
#[derive(Debug, PartialEq)]
pub enum ParsedBatch {
    Parsed(Vec<CompanyEntry>),
    Unparseable(String),
}

fn strip_code_fence(text: &str) -> &str {
    if let Some(rest) = text.split("```json").nth(1) {
        return rest.split("```").next().unwrap_or(rest).trim();
    }
    if let Some(rest) = text.split("```").nth(1) {
        return rest.trim();
    }
    text.trim()
}

pub fn parse_batch(response_text: &str) -> ParsedBatch {
    let json_text = strip_code_fence(response_text);

    let value: serde_json::Value = match serde_json::from_str(json_text) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Provider response is not valid JSON: {}", e);
            return ParsedBatch::Unparseable(response_text.to_string());
        }
    };

    let elements = match value {
        serde_json::Value::Array(elements) => elements,
        // A lone object is treated as a single-entry batch.
        obj @ serde_json::Value::Object(_) => vec![obj],
        _ => return ParsedBatch::Unparseable(response_text.to_string()),
    };

    let entries: Vec<CompanyEntry> = elements
        .into_iter()
        .filter_map(|el| match serde_json::from_value::<CompanyEntry>(el) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping malformed company entry in response: {}", e);
                None
            }
        })
        .collect();

    match entries.is_empty() {
        true => ParsedBatch::Unparseable(response_text.to_string()),
        false => ParsedBatch::Parsed(entries),
    }
}

/// Matches on name first and website host second; providers echo names
/// back with varying case.
pub fn find_entry<'a>(
    entries: &'a [CompanyEntry],
    identifier: &CompanyIdentifier,
) -> Option<&'a CompanyEntry> {
    let wanted_name = identifier.name.to_lowercase();
    let wanted_host = identifier.website.host_str().map(|h| h.to_lowercase());

    entries
        .iter()
        .find(|e| e.company_name.trim().to_lowercase() == wanted_name)
        .or_else(|| {
            entries.iter().find(|e| {
                match (&e.website, &wanted_host) {
                    (Some(w), Some(host)) => w.to_lowercase().contains(host.as_str()),
                    _ => false,
                }
            })
        })
}

/// All requested sections must be present and non-empty or the mapping
/// fails whole; a partially filled entry is a malformed response.
pub fn sections_for(
    entry: &CompanyEntry,
    requested: &[SectionKind],
) -> Option<BTreeMap<SectionKind, String>> {
    let mut sections = BTreeMap::new();

    for kind in requested {
        let text = entry.sections.get(kind.key())?;
        if text.trim().is_empty() {
            return None;
        }
        sections.insert(*kind, text.clone());
    }

    Some(sections)
}
