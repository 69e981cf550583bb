use chrono::{DateTime, Utc};
use dashboard_model::prelude::{DateRange, ExportFilters};
use nis2dash_common::config::CommaSeparatedVec;
use std::collections::HashSet;
use url::form_urlencoded;
use utoipa::IntoParams;

/// Query parameters of the dashboard data.
///
/// Dates are either an integer, a number of days relative to today, or a timestamp which is
/// passed on as is.
///
/// Parsing never fails. Unknown parameters are ignored, and only the first value of a repeated
/// parameter is used.
#[derive(Clone, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DataQuery {
    /// Comma separated organization IDs, all organizations of the group if empty
    #[param(value_type = Option<String>)]
    pub orgs: CommaSeparatedVec,
    /// Issues introduced at or after
    pub introduced_from: Option<String>,
    /// Issues introduced before
    pub introduced_to: Option<String>,
    /// Issues updated at or after
    pub updated_from: Option<String>,
    /// Issues updated before
    pub updated_to: Option<String>,
    /// Comma separated project environments
    #[param(value_type = Option<String>)]
    pub env: CommaSeparatedVec,
    /// Comma separated project lifecycles
    #[param(value_type = Option<String>)]
    pub lifecycle: CommaSeparatedVec,
    /// Comma separated severities
    #[param(value_type = Option<String>)]
    pub severities: CommaSeparatedVec,
}

impl DataQuery {
    pub fn parse(query: &str) -> Self {
        let mut result = Self::default();
        let mut seen = HashSet::new();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if !seen.insert(key.clone()) {
                continue;
            }
            let value = value.into_owned();
            match &*key {
                "orgs" => result.orgs = value.into(),
                "introduced_from" => result.introduced_from = Some(value),
                "introduced_to" => result.introduced_to = Some(value),
                "updated_from" => result.updated_from = Some(value),
                "updated_to" => result.updated_to = Some(value),
                "env" => result.env = value.into(),
                "lifecycle" => result.lifecycle = value.into(),
                "severities" => result.severities = value.into(),
                _ => {}
            }
        }

        result
    }

    pub fn into_filters(self, now: DateTime<Utc>) -> ExportFilters {
        ExportFilters {
            orgs: self.orgs.into_inner(),
            introduced: DateRange::resolve(self.introduced_from.as_deref(), self.introduced_to.as_deref(), now),
            updated: DateRange::resolve(self.updated_from.as_deref(), self.updated_to.as_deref(), now),
            environments: self.env.into_inner(),
            lifecycles: self.lifecycle.into_inner(),
            severities: self.severities.into_inner(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    fn filters(query: &str) -> ExportFilters {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        DataQuery::parse(query).into_filters(now)
    }

    #[test]
    fn empty() {
        assert_eq!(filters(""), ExportFilters::default());
    }

    #[test]
    fn lists() {
        let filters = filters("orgs=o1,%20,o2&env=frontend&lifecycle=production,development&severities=critical");
        assert_eq!(filters.orgs, vec!["o1", "o2"]);
        assert_eq!(filters.environments, vec!["frontend"]);
        assert_eq!(filters.lifecycles, vec!["production", "development"]);
        assert_eq!(filters.severities, vec!["critical"]);
    }

    #[test]
    fn dates() {
        let filters = filters("introduced_from=-30&introduced_to=2024-03-01T00:00:00Z&updated_from=");
        assert_eq!(filters.introduced.from.as_deref(), Some("2024-02-14T00:00:00Z"));
        assert_eq!(filters.introduced.to.as_deref(), Some("2024-03-01T00:00:00Z"));
        assert!(filters.updated.is_empty());
    }

    #[test]
    fn unknown_parameters_are_ignored() {
        assert_eq!(filters("foo=bar&orgs="), ExportFilters::default());
    }

    #[test]
    fn first_value_wins() {
        let filters = filters("orgs=o1&severities=high&orgs=o2,o3&introduced_to=-1&introduced_to=x");
        assert_eq!(filters.orgs, vec!["o1"]);
        assert_eq!(filters.severities, vec!["high"]);
        assert_eq!(filters.introduced.to.as_deref(), Some("2024-03-14T00:00:00Z"));
    }

    #[test]
    fn malformed_encoding_is_kept() {
        let filters = filters("orgs=o%2&&=x&env");
        assert_eq!(filters.orgs, vec!["o%2"]);
        assert!(filters.environments.is_empty());
    }
}
