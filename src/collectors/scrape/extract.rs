// Selector-driven field extraction for scraped result pages.
// Each field is described by an ordered chain of strategies; the first one
// that yields a non-empty value wins. A card without a title or a company is
// dropped on its own, the rest of the page is still extracted.

use scraper::{ElementRef, Html, Selector};

use crate::collectors::CollectError;
use crate::collectors::scrape::SiteProfile;
use crate::normalize::clean_text;

/// One way of reading a field from a card.
#[derive(Debug, Clone, Copy)]
pub enum Strategy {
    /// Text content of the first element matching the selector.
    Text(&'static str),
    /// Named attribute of the first element matching the selector.
    Attr(&'static str, &'static str),
}

pub type FieldChain = &'static [Strategy];

/// Strategy chains for every extracted field of a site.
#[derive(Debug, Clone, Copy)]
pub struct FieldChains {
    pub title: FieldChain,
    pub company: FieldChain,
    pub location: FieldChain,
    pub salary: FieldChain,
    pub experience: FieldChain,
    pub description: FieldChain,
    pub link: FieldChain,
}

/// Raw values lifted from one job card.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedCard {
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub experience: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
}

enum Probe {
    Text(Selector),
    Attr(Selector, &'static str),
}

impl Probe {
    fn read(&self, card: &ElementRef<'_>) -> Option<String> {
        let value = match self {
            Probe::Text(selector) => card
                .select(selector)
                .next()
                .map(|el| clean_text(&el.text().collect::<String>())),
            Probe::Attr(selector, name) => card
                .select(selector)
                .next()
                .and_then(|el| el.value().attr(name))
                .map(clean_text),
        };
        value.filter(|v| !v.is_empty())
    }
}

struct CompiledChain(Vec<Probe>);

impl CompiledChain {
    fn compile(chain: FieldChain) -> Result<Self, CollectError> {
        chain
            .iter()
            .map(|strategy| match *strategy {
                Strategy::Text(selector) => Ok(Probe::Text(parse(selector)?)),
                Strategy::Attr(selector, name) => Ok(Probe::Attr(parse(selector)?, name)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    fn first(&self, card: &ElementRef<'_>) -> Option<String> {
        self.0.iter().find_map(|strategy| strategy.read(card))
    }
}

fn parse(selector: &'static str) -> Result<Selector, CollectError> {
    Selector::parse(selector).map_err(|e| CollectError::InvalidSelector {
        selector,
        message: e.to_string(),
    })
}

/// A site's selectors, parsed once per run.
pub struct CompiledSite {
    card: Selector,
    title: CompiledChain,
    company: CompiledChain,
    location: CompiledChain,
    salary: CompiledChain,
    experience: CompiledChain,
    description: CompiledChain,
    link: CompiledChain,
}

impl CompiledSite {
    pub fn compile(site: &SiteProfile) -> Result<Self, CollectError> {
        let fields = &site.fields;
        Ok(Self {
            card: parse(site.card_selector)?,
            title: CompiledChain::compile(fields.title)?,
            company: CompiledChain::compile(fields.company)?,
            location: CompiledChain::compile(fields.location)?,
            salary: CompiledChain::compile(fields.salary)?,
            experience: CompiledChain::compile(fields.experience)?,
            description: CompiledChain::compile(fields.description)?,
            link: CompiledChain::compile(fields.link)?,
        })
    }

    /// Extract every usable card from a result page, in document order.
    pub fn extract(&self, html: &str) -> Vec<ExtractedCard> {
        let document = Html::parse_document(html);
        document
            .select(&self.card)
            .filter_map(|card| {
                let title = self.title.first(&card)?;
                let company = self.company.first(&card)?;
                Some(ExtractedCard {
                    title,
                    company,
                    location: self.location.first(&card),
                    salary: self.salary.first(&card),
                    experience: self.experience.first(&card),
                    description: self.description.first(&card),
                    link: self.link.first(&card),
                })
            })
            .collect()
    }
}
