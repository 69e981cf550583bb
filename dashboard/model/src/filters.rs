use chrono::{DateTime, Days, Utc};

/// A bound of a date range, as given by the caller.
///
/// An integer is a number of days relative to today, anything else is passed on to the provider
/// unchanged.
pub fn resolve_date(value: &str, now: DateTime<Utc>) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    match value.parse::<i64>() {
        Ok(days) => {
            let date = now.date_naive();
            let date = match days >= 0 {
                true => date.checked_add_days(Days::new(days.unsigned_abs())),
                false => date.checked_sub_days(Days::new(days.unsigned_abs())),
            };
            // out of range days fall back to passing the raw value
            Some(match date {
                Some(date) => date.format("%Y-%m-%dT00:00:00Z").to_string(),
                None => value.to_string(),
            })
        }
        Err(_) => Some(value.to_string()),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl DateRange {
    /// Resolve both bounds, see [`resolve_date`].
    pub fn resolve(from: Option<&str>, to: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            from: from.and_then(|from| resolve_date(from, now)),
            to: to.and_then(|to| resolve_date(to, now)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// Filters of a single export.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportFilters {
    pub orgs: Vec<String>,
    pub introduced: DateRange,
    pub updated: DateRange,
    pub environments: Vec<String>,
    pub lifecycles: Vec<String>,
    pub severities: Vec<String>,
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 17, 42, 7).unwrap()
    }

    #[test]
    fn relative_days() {
        assert_eq!(resolve_date("-30", now()).as_deref(), Some("2024-02-14T00:00:00Z"));
        assert_eq!(resolve_date("0", now()).as_deref(), Some("2024-03-15T00:00:00Z"));
        assert_eq!(resolve_date("1", now()).as_deref(), Some("2024-03-16T00:00:00Z"));
    }

    #[test]
    fn literal_date_passes_through() {
        assert_eq!(
            resolve_date("2023-01-01T00:00:00Z", now()).as_deref(),
            Some("2023-01-01T00:00:00Z")
        );
        assert_eq!(resolve_date("yesterday", now()).as_deref(), Some("yesterday"));
    }

    #[test]
    fn empty_is_unbounded() {
        assert_eq!(resolve_date("", now()), None);
        assert!(DateRange::resolve(None, Some(" "), now()).is_empty());
    }
}
