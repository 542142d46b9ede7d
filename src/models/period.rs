use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Course;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    Upcoming,
    Active,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPeriod {
    pub period_id: i32,
    pub period_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub status: Option<PeriodStatus>,
}

impl RegistrationPeriod {
    /// Same derivation the server applies whenever a period is saved.
    pub fn status_on(&self, today: NaiveDate) -> PeriodStatus {
        if today < self.start_date {
            PeriodStatus::Upcoming
        } else if today > self.end_date {
            PeriodStatus::Closed
        } else {
            PeriodStatus::Active
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPeriodRequest {
    pub period_name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodDetails {
    pub period: RegistrationPeriod,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub course_ids: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(default)]
    pub total_courses: i64,
    #[serde(default)]
    pub total_students: i64,
    #[serde(default)]
    pub total_assignments: i64,
    #[serde(default)]
    pub total_enrollments: i64,
}
