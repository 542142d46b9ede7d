use std::collections::HashMap;

use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use crate::api::SubmissionApi;
use crate::error::AppError;
use crate::forms::{GradeDraft, SubmissionDraft};
use crate::models::*;

/// Where a student stands on one assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentProgress {
    NotSubmitted,
    Submitted,
    Graded,
}

/// A student's own submissions keyed by assignment. Decides whether handing
/// in an assignment creates a new record or updates the existing one.
#[derive(Debug, Clone, Default)]
pub struct SubmissionBook {
    student_id: i32,
    by_assignment: HashMap<i32, Submission>,
}

impl SubmissionBook {
    /// Later entries replace earlier ones for the same assignment.
    pub fn from_submissions(student_id: i32, submissions: Vec<Submission>) -> Self {
        let by_assignment = submissions
            .into_iter()
            .map(|s| (s.assignment_id, s))
            .collect();
        Self {
            student_id,
            by_assignment,
        }
    }

    pub async fn load<A: SubmissionApi + ?Sized>(api: &A, student_id: i32) -> Result<Self, AppError> {
        let submissions = api.submissions_by_student(student_id).await?;
        Ok(Self::from_submissions(student_id, submissions))
    }

    pub fn student_id(&self) -> i32 {
        self.student_id
    }

    pub fn len(&self) -> usize {
        self.by_assignment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_assignment.is_empty()
    }

    pub fn get(&self, assignment_id: i32) -> Option<&Submission> {
        self.by_assignment.get(&assignment_id)
    }

    pub fn progress(&self, assignment_id: i32) -> AssignmentProgress {
        match self.get(assignment_id) {
            None => AssignmentProgress::NotSubmitted,
            Some(s) if s.status == SubmissionStatus::Graded || s.score.is_some() => {
                AssignmentProgress::Graded
            }
            Some(_) => AssignmentProgress::Submitted,
        }
    }

    /// Pre-filled form for the assignment's detail dialog.
    pub fn draft_for(&self, assignment_id: i32) -> SubmissionDraft {
        self.get(assignment_id)
            .map(SubmissionDraft::from_submission)
            .unwrap_or_default()
    }

    /// Body to send for `draft`, and the id to update if one exists.
    pub fn request_for(
        &self,
        assignment_id: i32,
        draft: &SubmissionDraft,
        today: NaiveDate,
    ) -> (Option<i32>, SubmissionRequest) {
        let file_name = Some(draft.file_name.trim().to_string()).filter(|f| !f.is_empty());
        match self.get(assignment_id) {
            Some(existing) => (
                Some(existing.submission_id),
                SubmissionRequest {
                    assignment_id,
                    student_id: self.student_id,
                    content: draft.content.clone(),
                    attachment: file_name.or_else(|| existing.attachment.clone()),
                    status: SubmissionStatus::Submitted,
                    submitted_date: None,
                },
            ),
            None => (
                None,
                SubmissionRequest {
                    assignment_id,
                    student_id: self.student_id,
                    content: draft.content.clone(),
                    attachment: file_name,
                    status: SubmissionStatus::Submitted,
                    submitted_date: Some(today),
                },
            ),
        }
    }

    /// Hands in or re-submits, then refetches the book.
    pub async fn submit<A: SubmissionApi + ?Sized>(
        &mut self,
        api: &A,
        assignment_id: i32,
        draft: &SubmissionDraft,
    ) -> Result<Submission, AppError> {
        let (existing, req) = self.request_for(assignment_id, draft, Local::now().date_naive());
        let saved = match existing {
            Some(id) => {
                let saved = api.update_submission(id, &req).await?;
                info!("updated submission {} for assignment {}", id, assignment_id);
                saved
            }
            None => {
                let saved = api.create_submission(&req).await?;
                info!(
                    "created submission {} for assignment {}",
                    saved.submission_id, assignment_id
                );
                saved
            }
        };
        self.by_assignment.insert(assignment_id, saved.clone());

        // A failed refetch keeps the merged book so the next hand-in updates.
        match Self::load(api, self.student_id).await {
            Ok(fresh) => *self = fresh,
            Err(e) => warn!("could not refresh submissions of student {}: {}", self.student_id, e),
        }
        Ok(saved)
    }
}

/// Direct grade update on an existing submission record.
pub async fn grade_submission<A: SubmissionApi + ?Sized>(
    api: &A,
    submission: &Submission,
    draft: &GradeDraft,
) -> Result<Submission, AppError> {
    let graded = draft.apply(submission)?;
    let saved = api.save_submission(&graded).await?;
    info!(
        "graded submission {}: score {:?}, status {:?}",
        saved.submission_id, saved.score, saved.status
    );
    Ok(saved)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// Absolute http(s) link, opened as is.
    Remote { url: String, file_name: String },
    /// Bare filename or relative path recorded at submit time.
    Local { path: String, file_name: String },
}

/// Resolves a submission's attachment to something downloadable. `None`
/// when nothing was attached.
pub fn attachment_of(submission: &Submission, student_name: Option<&str>) -> Option<Attachment> {
    let raw = submission.attachment.as_deref().map(str::trim).filter(|a| !a.is_empty())?;
    let file_name = match raw.rsplit('/').next() {
        Some(last) if !last.is_empty() => last.to_string(),
        _ => format!(
            "submission_{}_{}.file",
            submission.submission_id,
            student_name
                .map(str::to_string)
                .unwrap_or_else(|| submission.student_id.to_string())
        ),
    };

    if raw.starts_with("http://") || raw.starts_with("https://") {
        Some(Attachment::Remote {
            url: raw.to_string(),
            file_name,
        })
    } else {
        Some(Attachment::Local {
            path: raw.to_string(),
            file_name,
        })
    }
}
