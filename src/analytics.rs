use chrono::{Duration, NaiveDateTime};

use crate::clock::format_timestamp;
use crate::errors::{ApiError, ApiResult};
use crate::models::{AppTotal, CategoryStat, CategoryTotal, DailyStat, HourlyStat, TotalsReport, WindowedReport};
use crate::store::ActivityStore;

/// Relative time window anchored to "now"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Last7Days,
    Last30Days,
    AllTime,
}

impl Window {
    /// Earliest timestamp inside the window, in stored format.
    pub fn cutoff(self, now: NaiveDateTime) -> Option<String> {
        let days = match self {
            Window::Last7Days => 7,
            Window::Last30Days => 30,
            Window::AllTime => return None,
        };
        Some(format_timestamp(now - Duration::days(days)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Category,
    /// Hour of day, "00".."23"
    Hour,
    /// Calendar date, "YYYY-MM-DD"
    Date,
    App,
}

impl GroupBy {
    fn key_sql(self) -> &'static str {
        match self {
            GroupBy::Category => "category",
            GroupBy::Hour => "strftime('%H', timestamp)",
            GroupBy::Date => "date(timestamp)",
            GroupBy::App => "app",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    KeyAscending,
    /// Largest summed duration first, ties by key
    TotalDescending,
}

/// One grouped aggregation over the activity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportQuery {
    pub window: Window,
    pub group_by: GroupBy,
    pub order: Order,
}

/// One group: its key, number of records and summed duration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub key: String,
    pub count: i64,
    pub total_duration: i64,
}

impl ReportQuery {
    pub const fn new(window: Window, group_by: GroupBy, order: Order) -> Self {
        Self { window, group_by, order }
    }

    /// SQL for this query. Takes the window cutoff as `?1` when windowed.
    pub(crate) fn sql(&self) -> String {
        let filter = match self.window {
            Window::AllTime => "",
            Window::Last7Days | Window::Last30Days => "WHERE timestamp >= ?1",
        };
        let order = match self.order {
            Order::KeyAscending => "bucket ASC",
            Order::TotalDescending => "total_duration DESC, bucket ASC",
        };
        format!(
            "SELECT {key} AS bucket, COUNT(*) AS count, COALESCE(SUM(duration), 0) AS total_duration
             FROM activity
             {filter}
             GROUP BY bucket
             ORDER BY {order}",
            key = self.group_by.key_sql(),
        )
    }
}

pub const CATEGORY_LAST_7_DAYS: ReportQuery = ReportQuery::new(Window::Last7Days, GroupBy::Category, Order::KeyAscending);
pub const HOURLY_LAST_7_DAYS: ReportQuery = ReportQuery::new(Window::Last7Days, GroupBy::Hour, Order::KeyAscending);
pub const DAILY_LAST_30_DAYS: ReportQuery = ReportQuery::new(Window::Last30Days, GroupBy::Date, Order::KeyAscending);
pub const APP_TOTALS: ReportQuery = ReportQuery::new(Window::AllTime, GroupBy::App, Order::TotalDescending);
pub const CATEGORY_TOTALS: ReportQuery = ReportQuery::new(Window::AllTime, GroupBy::Category, Order::TotalDescending);

/// Category breakdown and hourly histogram over the last 7 days, daily
/// counts over the last 30. Hours without activity are omitted.
pub fn windowed_report(store: &ActivityStore, now: NaiveDateTime) -> ApiResult<WindowedReport> {
    let category_stats = store
        .aggregate(&CATEGORY_LAST_7_DAYS, now)?
        .into_iter()
        .map(|bucket| CategoryStat {
            category: bucket.key,
            count: bucket.count,
            duration: bucket.total_duration,
        })
        .collect();

    let hourly_stats = store
        .aggregate(&HOURLY_LAST_7_DAYS, now)?
        .into_iter()
        .map(|bucket| {
            let hour = bucket
                .key
                .parse()
                .map_err(|_| ApiError::Store(format!("malformed hour bucket: {}", bucket.key)))?;
            Ok(HourlyStat { hour, count: bucket.count })
        })
        .collect::<ApiResult<Vec<_>>>()?;

    let daily_stats = store
        .aggregate(&DAILY_LAST_30_DAYS, now)?
        .into_iter()
        .map(|bucket| DailyStat {
            date: bucket.key,
            count: bucket.count,
        })
        .collect();

    Ok(WindowedReport {
        category_stats,
        hourly_stats,
        daily_stats,
    })
}

/// All-time summed duration per app and per category, largest first.
pub fn totals_report(store: &ActivityStore, now: NaiveDateTime) -> ApiResult<TotalsReport> {
    let apps = store
        .aggregate(&APP_TOTALS, now)?
        .into_iter()
        .map(|bucket| AppTotal {
            app: bucket.key,
            total_time: bucket.total_duration,
        })
        .collect();

    let categories = store
        .aggregate(&CATEGORY_TOTALS, now)?
        .into_iter()
        .map(|bucket| CategoryTotal {
            category: bucket.key,
            total_time: bucket.total_duration,
        })
        .collect();

    Ok(TotalsReport { apps, categories })
}
