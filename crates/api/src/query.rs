//! Query parameters shared by the report endpoints.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use chrono::FixedOffset;
use zreport_core::error::CoreError;
use zreport_core::filter::FilterSet;
use zreport_core::types::Timestamp;
use zreport_core::week::{IsoWeek, WeekRange};

use crate::error::AppError;

/// `?week=&severities=&tags=&include_current=`
///
/// `severities` may repeat and each value may hold a comma-separated list.
/// `tags` repeats once per selected tag and each value is taken whole, so
/// `?tags=service:a,b&tags=env:prod` selects two tags. An absent or empty
/// list means no filter.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReportQuery {
    pub week: Option<String>,
    pub severities: Vec<String>,
    pub tags: Vec<String>,
    /// Trend only: end the trend at the selected week instead of the one
    /// before it.
    pub include_current: Option<bool>,
}

/// A [`ReportQuery`] after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedQuery {
    pub week: IsoWeek,
    pub range: WeekRange,
    pub filters: FilterSet,
}

impl ReportQuery {
    /// Collect the parameters from decoded query pairs. Unknown keys are
    /// ignored; for `week` and `include_current` the last value wins.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "week" => query.week = Some(value),
                "severities" => query
                    .severities
                    .extend(value.split(',').map(str::to_string)),
                "tags" => query.tags.push(value),
                "include_current" => query.include_current = parse_flag(&value)?,
                _ => {}
            }
        }
        Ok(query)
    }

    /// Validate the parameters. Without `week`, the week containing `now`
    /// (in `offset`) is used.
    pub fn resolve(&self, now: Timestamp, offset: FixedOffset) -> Result<ResolvedQuery, CoreError> {
        let week = match self.week.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => token.parse::<IsoWeek>()?,
            _ => IsoWeek::current(now, offset),
        };

        let filters = FilterSet::parse(
            self.severities.iter().map(String::as_str),
            self.tags.iter().map(String::as_str),
        )?;

        Ok(ResolvedQuery {
            week,
            range: week.range(offset),
            filters,
        })
    }
}

fn parse_flag(raw: &str) -> Result<Option<bool>, CoreError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "true" | "1" => Ok(Some(true)),
        "false" | "0" => Ok(Some(false)),
        other => Err(CoreError::Validation(format!(
            "include_current must be true or false, got '{other}'"
        ))),
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ReportQuery {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        Ok(Self::from_pairs(pairs)?)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Offset, TimeZone, Utc};
    use zreport_core::severity::Severity;

    use super::*;

    fn now() -> Timestamp {
        // Wednesday 2024-03-06 12:00 UTC, in 2024-W10.
        Utc.with_ymd_and_hms(2024, 3, 6, 12, 0, 0).unwrap()
    }

    #[test]
    fn defaults_to_current_week_without_filters() {
        let resolved = ReportQuery::default().resolve(now(), Utc.fix()).unwrap();
        assert_eq!(resolved.week.to_string(), "2024-W10");
        assert_eq!(resolved.range.start_time, 1_709_510_400);
        assert!(resolved.filters.is_empty());
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn parses_week_severity_list_and_repeated_tags() {
        let query = ReportQuery::from_pairs(pairs(&[
            ("week", "2024-W02"),
            ("severities", "High, Disaster,"),
            ("tags", "env:prod"),
            ("tags", "scope:cpu"),
            ("page", "3"),
        ]))
        .unwrap();
        let resolved = query.resolve(now(), Utc.fix()).unwrap();
        assert_eq!(resolved.week.to_string(), "2024-W02");
        assert_eq!(
            resolved.filters.severities.into_iter().collect::<Vec<_>>(),
            [Severity::High, Severity::Disaster]
        );
        assert_eq!(resolved.filters.tags.len(), 2);
    }

    #[test]
    fn tag_values_may_contain_commas() {
        let query = ReportQuery::from_pairs(pairs(&[("tags", "service:a,b")])).unwrap();
        assert_eq!(query.tags, ["service:a,b"]);

        let resolved = query.resolve(now(), Utc.fix()).unwrap();
        assert_eq!(
            resolved.filters.tags.iter().map(String::as_str).collect::<Vec<_>>(),
            ["service:a,b"]
        );
    }

    #[test]
    fn severities_may_also_repeat() {
        let query =
            ReportQuery::from_pairs(pairs(&[("severities", "High"), ("severities", "Warning")]))
                .unwrap();
        let resolved = query.resolve(now(), Utc.fix()).unwrap();
        assert_eq!(resolved.filters.severities.len(), 2);
    }

    #[test]
    fn include_current_accepts_booleans_only() {
        let parse = |v: &str| ReportQuery::from_pairs(pairs(&[("include_current", v)]));
        assert_eq!(parse("true").unwrap().include_current, Some(true));
        assert_eq!(parse("0").unwrap().include_current, Some(false));
        assert_eq!(parse("").unwrap().include_current, None);
        assert_matches!(parse("yes please"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn empty_strings_mean_no_filter() {
        let query = ReportQuery::from_pairs(pairs(&[
            ("week", ""),
            ("severities", ""),
            ("tags", " "),
        ]))
        .unwrap();
        let resolved = query.resolve(now(), Utc.fix()).unwrap();
        assert_eq!(resolved.week.to_string(), "2024-W10");
        assert!(resolved.filters.is_empty());
    }

    #[test]
    fn rejects_bad_week_and_unknown_severity() {
        let bad_week = ReportQuery {
            week: Some("2024-10".into()),
            ..Default::default()
        };
        assert_matches!(bad_week.resolve(now(), Utc.fix()), Err(CoreError::Validation(_)));

        let bad_severity = ReportQuery {
            severities: vec!["Critical".into()],
            ..Default::default()
        };
        assert_matches!(
            bad_severity.resolve(now(), Utc.fix()),
            Err(CoreError::Validation(_))
        );
    }
}
