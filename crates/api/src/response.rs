//! Shared response envelope types for API handlers.
//!
//! All API responses use a `{ "data": ... }` envelope. Report views nest a
//! [`ReportBody`] inside it so every view echoes what it was computed for.

use serde::Serialize;
use zreport_core::filter::FilterSet;
use zreport_core::week::{IsoWeek, WeekRange};

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// One report view: the resolved week, its range, the filters applied and
/// the resulting rows.
#[derive(Debug, Serialize)]
pub struct ReportBody<T: Serialize> {
    pub week: IsoWeek,
    pub range: WeekRange,
    pub filters: FilterSet,
    pub rows: T,
}
