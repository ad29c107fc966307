//! Field extractor for listing pages and detail documents
//!
//! This module turns raw HTML into records:
//! - Listing cards (`div.base-card`) into [`ListingRecord`]s
//! - Detail documents into [`DetailRecord`]s
//!
//! Missing markup never fails extraction. A missing element leaves its field
//! `None`; only a card without a usable link is rejected outright, which is
//! how promotional cards are filtered out.

use crate::crawler::heuristics::{self, joined_text, normalize};
use crate::record::{clean_text, DetailRecord, ListingRecord};
use crate::url::{canonical_url, derive_identifier};
use scraper::{ElementRef, Html, Selector};

/// Listing cards found on one search page
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// Cards that yielded a record
    pub records: Vec<ListingRecord>,

    /// Number of card fragments on the page, accepted or not
    pub fragments: usize,

    /// Cards dropped for lack of a usable link
    pub rejected: usize,
}

/// Extracts every listing card from a search-results page
///
/// # Example
///
/// ```
/// use listing_harvest::crawler::extract_listings;
///
/// let html = r#"<div class="base-card">
///     <a class="base-card__full-link" href="https://example.com/jobs/view/dev-17?x=1"></a>
///     <h3 class="base-search-card__title"> Developer </h3>
/// </div>"#;
/// let page = extract_listings(html);
/// assert_eq!(page.fragments, 1);
/// assert_eq!(page.records[0].id, "17");
/// assert_eq!(page.records[0].title.as_deref(), Some("Developer"));
/// ```
pub fn extract_listings(html: &str) -> ListingPage {
    let document = Html::parse_document(html);
    let mut page = ListingPage::default();

    let Ok(card_selector) = Selector::parse("div.base-card") else {
        return page;
    };

    for card in document.select(&card_selector) {
        page.fragments += 1;
        match extract_listing(card) {
            Some(record) => page.records.push(record),
            None => {
                page.rejected += 1;
                tracing::debug!("Skipping card without a listing link");
            }
        }
    }

    page
}

/// Maps one listing card to a record
///
/// Returns `None` when the card has no `a.base-card__full-link` with a
/// non-empty `href`.
pub fn extract_listing(card: ElementRef<'_>) -> Option<ListingRecord> {
    let href = first_match(card, "a.base-card__full-link")?
        .value()
        .attr("href")?;

    let url = canonical_url(href);
    if url.is_empty() {
        return None;
    }
    let id = derive_identifier(url)?;

    Some(ListingRecord {
        id,
        title: text_of(card, "h3.base-search-card__title"),
        company: text_of(card, "h4.base-search-card__subtitle"),
        location: text_of(card, "span.job-search-card__location"),
        posted_at: first_match(card, "time")
            .and_then(|time| time.value().attr("datetime"))
            .and_then(clean_text),
        url: url.to_string(),
    })
}

/// Criteria rows of the detail document's summary list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Criterion {
    ExperienceLevel,
    EmploymentType,
    JobFunction,
    Industries,
}

impl Criterion {
    const ALL: [Criterion; 4] = [
        Self::ExperienceLevel,
        Self::EmploymentType,
        Self::JobFunction,
        Self::Industries,
    ];

    fn label(&self) -> &'static str {
        match self {
            Self::ExperienceLevel => "seniority level",
            Self::EmploymentType => "employment type",
            Self::JobFunction => "job function",
            Self::Industries => "industries",
        }
    }

    /// Matches a header by containment, ignoring case and spacing
    fn from_header(header: &str) -> Option<Self> {
        let header = normalize(header);
        Self::ALL.into_iter().find(|c| header.contains(c.label()))
    }

    fn slot<'a>(&self, detail: &'a mut DetailRecord) -> &'a mut Option<String> {
        match self {
            Self::ExperienceLevel => &mut detail.experience_level,
            Self::EmploymentType => &mut detail.employment_type,
            Self::JobFunction => &mut detail.job_function,
            Self::Industries => &mut detail.industries,
        }
    }
}

/// Parses a detail document
///
/// Never fails: fields whose markup is missing stay `None`. The salary,
/// skills, company and applicant fields come from the keyword matchers in
/// [`heuristics`] and are best-effort.
pub fn parse_detail(html: &str) -> DetailRecord {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let mut detail = DetailRecord {
        description: first_match(root, "div.show-more-less-html__markup").and_then(joined_text),
        ..Default::default()
    };

    apply_criteria(root, &mut detail);

    detail.salary = heuristics::salary(root);
    detail.skills = heuristics::skills(root);
    let (company_size, company_industry) = heuristics::company_facts(root);
    detail.company_size = company_size;
    detail.company_industry = company_industry;
    detail.applicant_count = heuristics::applicant_count(root);

    detail
}

/// Fills the four criteria fields from the criteria list
///
/// The structured header (`h3.description__job-criteria-subheader`) decides
/// which field an item feeds. An item without that header falls back to
/// containment matching on its whole text. The first item matching a field
/// wins.
fn apply_criteria(root: ElementRef<'_>, detail: &mut DetailRecord) {
    let Ok(item_selector) = Selector::parse("ul.description__job-criteria-list li") else {
        return;
    };

    for item in root.select(&item_selector) {
        let header = match first_match(item, "h3.description__job-criteria-subheader") {
            Some(header) => header.text().collect::<String>(),
            None => item.text().collect::<String>(),
        };

        let Some(criterion) = Criterion::from_header(&header) else {
            continue;
        };

        let slot = criterion.slot(detail);
        if slot.is_none() {
            *slot = text_of(item, "span.description__job-criteria-text");
        }
    }
}

fn first_match<'a>(element: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    element.select(&selector).next()
}

/// Trimmed text of the first match; `None` if absent or blank
fn text_of(element: ElementRef<'_>, css: &str) -> Option<String> {
    first_match(element, css).and_then(|found| clean_text(&found.text().collect::<String>()))
}
