use anyhow::Context;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyIdentifier {
    pub name: String,
    pub website: Url,
}

impl CompanyIdentifier {
    pub fn new(name: &str, website: &str) -> Result<Self, anyhow::Error> {
        let website = Url::parse(website)
            .with_context(|| format!("Invalid company website url: {}", website))?;
        if name.trim().is_empty() {
            anyhow::bail!("Company name is empty for website: {}", website);
        }

        Ok(CompanyIdentifier {
            name: name.trim().to_string(),
            website,
        })
    }

    /// Parses one `url,name` line; name falls back to the url host.
    pub fn from_line(line: &str) -> Result<Self, anyhow::Error> {
        let mut parts = line.splitn(2, ',');
        let website = parts.next().unwrap_or_default().trim();
        let name = parts.next().map(|n| n.trim()).unwrap_or_default();

        match name.is_empty() {
            false => CompanyIdentifier::new(name, website),
            true => {
                let parsed = Url::parse(website)
                    .with_context(|| format!("Invalid company website url: {}", website))?;
                let host = parsed
                    .host_str()
                    .ok_or_else(|| anyhow::anyhow!("Website has no host: {}", website))?;
                let name = host.strip_prefix("www.").unwrap_or(host).to_string();
                CompanyIdentifier::new(&name, website)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionKind {
    Overview,
    Products,
    MarketPosition,
    Strengths,
    Weaknesses,
    Pricing,
    RecentNews,
}

impl SectionKind {
    pub fn all() -> Vec<SectionKind> {
        vec![
            SectionKind::Overview,
            SectionKind::Products,
            SectionKind::MarketPosition,
            SectionKind::Strengths,
            SectionKind::Weaknesses,
            SectionKind::Pricing,
            SectionKind::RecentNews,
        ]
    }

    /// Stable key used in prompts and expected back in provider responses.
    pub fn key(&self) -> &'static str {
        match self {
            SectionKind::Overview => "overview",
            SectionKind::Products => "products",
            SectionKind::MarketPosition => "market_position",
            SectionKind::Strengths => "strengths",
            SectionKind::Weaknesses => "weaknesses",
            SectionKind::Pricing => "pricing",
            SectionKind::RecentNews => "recent_news",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::Overview => "Company Overview",
            SectionKind::Products => "Products & Services",
            SectionKind::MarketPosition => "Market Position",
            SectionKind::Strengths => "Strengths",
            SectionKind::Weaknesses => "Weaknesses",
            SectionKind::Pricing => "Pricing Model",
            SectionKind::RecentNews => "Recent News",
        }
    }

    pub fn from_key(key: &str) -> Option<SectionKind> {
        SectionKind::all().into_iter().find(|s| s.key() == key)
    }
}
