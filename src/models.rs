use serde::{Deserialize, Serialize};

use crate::errors::ApiError;

pub const DEFAULT_USER_ID: &str = "default";

/// Upper bound on a single activity's duration, so grouped sums stay in i64.
pub const MAX_DURATION_SECS: i64 = i32::MAX as i64;

/// Activity input from API. Required fields are optional here so that a
/// missing field surfaces as a validation error naming it.
#[derive(Debug, Default, Deserialize)]
pub struct ActivityInput {
    pub app: Option<String>,
    pub title: Option<String>,
    pub category: Option<String>,
    pub duration: Option<i64>,
    #[serde(alias = "userId")]
    pub user_id: Option<String>,
}

/// Activity input after validation, with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub app: String,
    pub title: String,
    pub category: String,
    pub duration: i64,
    pub user_id: String,
}

/// Stored activity row
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    pub id: i64,
    pub timestamp: String,
    pub app: String,
    pub title: String,
    pub category: String,
    pub duration: i64,
    pub user_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClassifyInput {
    #[serde(default)]
    pub app: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub category: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CategoryStat {
    pub category: String,
    pub count: i64,
    pub duration: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HourlyStat {
    pub hour: u32,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DailyStat {
    pub date: String,
    pub count: i64,
}

/// Recent-window breakdown
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WindowedReport {
    pub category_stats: Vec<CategoryStat>,
    pub hourly_stats: Vec<HourlyStat>,
    pub daily_stats: Vec<DailyStat>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AppTotal {
    pub app: String,
    pub total_time: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category: String,
    pub total_time: i64,
}

/// All-time totals
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TotalsReport {
    pub apps: Vec<AppTotal>,
    pub categories: Vec<CategoryTotal>,
}

impl TryFrom<ActivityInput> for NewActivity {
    type Error = ApiError;

    fn try_from(input: ActivityInput) -> Result<Self, Self::Error> {
        fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
            value.ok_or_else(|| ApiError::missing_field(field))
        }

        let duration = input.duration.unwrap_or(0);
        if !(0..=MAX_DURATION_SECS).contains(&duration) {
            return Err(ApiError::Validation(format!(
                "duration must be between 0 and {MAX_DURATION_SECS} seconds, got {duration}"
            )));
        }

        Ok(NewActivity {
            app: required(input.app, "app")?,
            title: required(input.title, "title")?,
            category: required(input.category, "category")?,
            duration,
            user_id: input
                .user_id
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_USER_ID.to_string()),
        })
    }
}
