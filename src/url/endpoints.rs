use crate::state::PageCursor;
use crate::{UrlError, UrlResult};
use url::Url;

/// Search terms shared by every page request of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Free-text keywords; omitted from the request when `None`
    pub keywords: Option<String>,

    pub location: String,

    /// Send the dimension's `sortBy` and `f_TPR` parameters
    ///
    /// Only dimension runs set this; simple and exhaustive runs search unfiltered.
    pub filtered: bool,
}

/// Fixed listing-search and detail endpoints
#[derive(Debug, Clone)]
pub struct Endpoints {
    listing: Url,
    detail: Url,
}

impl Endpoints {
    /// Parses both endpoint URLs
    ///
    /// # Returns
    ///
    /// * `Ok(Endpoints)` - Both URLs parsed and the detail URL accepts path segments
    /// * `Err(UrlError)` - Either URL is malformed
    pub fn new(listing: &str, detail: &str) -> UrlResult<Self> {
        let listing = Url::parse(listing).map_err(|e| UrlError::Parse(e.to_string()))?;
        let detail = Url::parse(detail).map_err(|e| UrlError::Parse(e.to_string()))?;

        if detail.cannot_be_a_base() {
            return Err(UrlError::NotABase(detail.to_string()));
        }

        Ok(Self { listing, detail })
    }

    /// Builds the listing-search URL for one page
    ///
    /// Query parameters, in order: `keywords` (if any), `location`, `sortBy`
    /// and `f_TPR` (filtered queries only; `f_TPR` is dropped for the
    /// unbounded filter), `start`.
    pub fn listing_url(&self, query: &SearchQuery, cursor: &PageCursor, page_size: u32) -> Url {
        let mut url = self.listing.clone();
        {
            let mut pairs = url.query_pairs_mut();

            if let Some(keywords) = query.keywords.as_deref().filter(|k| !k.is_empty()) {
                pairs.append_pair("keywords", keywords);
            }
            pairs.append_pair("location", &query.location);

            if query.filtered {
                let dimension = cursor.dimension;
                pairs.append_pair("sortBy", dimension.sort.wire_code());
                if let Some(code) = dimension.recency.wire_code() {
                    pairs.append_pair("f_TPR", code);
                }
            }

            pairs.append_pair("start", &cursor.start_offset(page_size).to_string());
        }
        url
    }

    /// Builds the detail-document URL for one identifier
    pub fn detail_url(&self, id: &str) -> UrlResult<Url> {
        let mut url = self.detail.clone();
        url.path_segments_mut()
            .map_err(|_| UrlError::NotABase(self.detail.to_string()))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }
}
