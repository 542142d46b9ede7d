use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    Submitted,
    Graded,
    Late,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub submission_id: i32,
    pub assignment_id: i32,
    pub student_id: i32,
    #[serde(default)]
    pub content: Option<String>,
    /// Filename or URL. No bytes are transferred by this client.
    #[serde(default)]
    pub attachment: Option<String>,
    #[serde(default)]
    pub submitted_date: Option<NaiveDate>,
    #[serde(default)]
    pub score: Option<i32>,
    #[serde(default)]
    pub status: SubmissionStatus,
}

/// Body for both creating and updating a submission. Updates leave
/// `submitted_date` unset so the server keeps the original one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub assignment_id: i32,
    pub student_id: i32,
    pub content: String,
    pub attachment: Option<String>,
    pub status: SubmissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_date: Option<NaiveDate>,
}
