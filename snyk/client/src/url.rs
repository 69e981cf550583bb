use url::{ParseError, Url};

/// API version of the organization listing.
pub const ORGS_VERSION: &str = "2024-07-29";
/// API version of the export endpoints.
pub const EXPORT_VERSION: &str = "2024-10-15";

/// Maximum page size of the organization listing.
pub const PAGE_LIMIT: usize = 100;

#[derive(Clone, Debug)]
pub struct SnykUrl {
    base_url: Url,
}

impl SnykUrl {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    fn rest(&self, segments: &[&str], version: &str) -> Result<Url, ParseError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push("rest")
            .extend(segments);
        url.query_pairs_mut().append_pair("version", version);
        Ok(url)
    }

    pub fn group_orgs(&self, group_id: &str) -> Result<Url, ParseError> {
        let mut url = self.rest(&["groups", group_id, "orgs"], ORGS_VERSION)?;
        url.query_pairs_mut().append_pair("limit", &PAGE_LIMIT.to_string());
        Ok(url)
    }

    /// Resolve the `next` link of a paginated response.
    ///
    /// The link is usually a path (with query) relative to the base URL, but may be absolute.
    pub fn next_page(&self, next: &str) -> Result<Url, ParseError> {
        match Url::parse(next) {
            Ok(url) => Ok(url),
            Err(ParseError::RelativeUrlWithoutBase) => {
                let base = self.base_url.as_str().trim_end_matches('/');
                Url::parse(&format!("{base}/{}", next.trim_start_matches('/')))
            }
            Err(err) => Err(err),
        }
    }

    pub fn org_export(&self, org_id: &str) -> Result<Url, ParseError> {
        self.rest(&["orgs", org_id, "export"], EXPORT_VERSION)
    }

    pub fn org_export_status(&self, org_id: &str, export_id: &str) -> Result<Url, ParseError> {
        self.rest(&["orgs", org_id, "jobs", "export", export_id], EXPORT_VERSION)
    }

    pub fn org_export_results(&self, org_id: &str, export_id: &str) -> Result<Url, ParseError> {
        self.rest(&["orgs", org_id, "export", export_id], EXPORT_VERSION)
    }

    pub fn group_export(&self, group_id: &str) -> Result<Url, ParseError> {
        self.rest(&["groups", group_id, "exports"], EXPORT_VERSION)
    }

    pub fn group_export_status(&self, group_id: &str, export_id: &str) -> Result<Url, ParseError> {
        self.rest(&["groups", group_id, "exports", export_id], EXPORT_VERSION)
    }
}
