use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    #[default]
    Active,
    Inactive,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub course_id: i32,
    pub course_code: String,
    pub course_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instructor_id: Option<i32>,
    #[serde(default)]
    pub duration_weeks: Option<i32>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub max_students: Option<i32>,
    #[serde(default)]
    pub status: CourseStatus,
}

impl Course {
    pub fn price_or_zero(&self) -> f64 {
        self.price.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourseRequest {
    pub course_code: String,
    pub course_name: String,
    pub description: Option<String>,
    pub instructor_id: Option<i32>,
    pub duration_weeks: Option<i32>,
    pub price: Option<f64>,
    pub max_students: Option<i32>,
    pub status: CourseStatus,
}
