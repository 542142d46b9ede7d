use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{info, warn};

use crate::api::{
    AnnouncementApi, AssignmentApi, CourseApi, EnrollmentApi, InstructorApi, StudentApi,
    SubmissionApi,
};
use crate::error::AppError;
use crate::forms::{AnnouncementDraft, AssignmentDraft, EnrollmentUpdateDraft, GradeDraft, SubmissionDraft};
use crate::models::*;
use crate::submission::{AssignmentProgress, SubmissionBook, grade_submission};
use crate::viewer::Viewer;

/// Everything the course page reads.
pub trait CoursePageApi:
    CourseApi + AssignmentApi + AnnouncementApi + EnrollmentApi + InstructorApi + StudentApi + SubmissionApi
{
}

impl<T: ?Sized> CoursePageApi for T where
    T: CourseApi
        + AssignmentApi
        + AnnouncementApi
        + EnrollmentApi
        + InstructorApi
        + StudentApi
        + SubmissionApi
{
}

#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub enrollment: Enrollment,
    /// `None` when the student record could not be fetched.
    pub student: Option<Student>,
}

#[derive(Debug, Clone)]
pub struct SubmissionEntry {
    pub submission: Submission,
    pub student: Option<Student>,
}

#[derive(Debug, Clone)]
pub struct CourseDetail {
    pub course: Course,
    pub instructor: Option<Instructor>,
    pub assignments: Vec<Assignment>,
    pub announcements: Vec<Announcement>,
    pub roster: Vec<RosterEntry>,
    /// Only loaded for a student viewer.
    pub submissions: Option<SubmissionBook>,
}

async fn fetch_student<A: StudentApi + ?Sized>(api: &A, student_id: i32) -> Option<Student> {
    match api.get_student(student_id).await {
        Ok(student) => Some(student),
        Err(e) => {
            warn!("could not load student {}: {}", student_id, e);
            None
        }
    }
}

impl CourseDetail {
    pub async fn load<A: CoursePageApi + ?Sized>(
        api: &A,
        viewer: &Viewer,
        course_id: i32,
    ) -> Result<Self, AppError> {
        let (course, assignments, announcements, enrollments, instructors) = tokio::try_join!(
            api.get_course(course_id),
            api.assignments_by_course(course_id),
            api.announcements_by_course(course_id),
            api.enrollments_by_course(course_id),
            api.list_instructors(),
        )?;

        let instructor = course
            .instructor_id
            .and_then(|id| instructors.into_iter().find(|i| i.instructor_id == id));

        let submissions = match viewer {
            Viewer::Student {
                student_id: Some(student_id),
                ..
            } => match SubmissionBook::load(api, *student_id).await {
                Ok(book) => Some(book),
                Err(e) => {
                    warn!("could not load submissions of student {}: {}", student_id, e);
                    Some(SubmissionBook::from_submissions(*student_id, Vec::new()))
                }
            },
            _ => None,
        };

        let mut roster = Vec::with_capacity(enrollments.len());
        for enrollment in enrollments {
            let student = fetch_student(api, enrollment.student_id).await;
            roster.push(RosterEntry {
                enrollment,
                student,
            });
        }

        Ok(Self {
            course,
            instructor,
            assignments,
            announcements,
            roster,
            submissions,
        })
    }

    pub fn assignment(&self, assignment_id: i32) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.assignment_id == assignment_id)
    }
}

/// A course page bound to the viewer looking at it. Every mutation refetches
/// the page afterwards; a failure is kept as the banner text.
pub struct CourseDetailPage<A: CoursePageApi + ?Sized> {
    api: Arc<A>,
    viewer: Viewer,
    detail: CourseDetail,
    banner: Option<String>,
}

impl<A: CoursePageApi + ?Sized> CourseDetailPage<A> {
    pub async fn open(api: Arc<A>, viewer: Viewer, course_id: i32) -> Result<Self, AppError> {
        let detail = CourseDetail::load(api.as_ref(), &viewer, course_id).await?;
        Ok(Self {
            api,
            viewer,
            detail,
            banner: None,
        })
    }

    pub fn detail(&self) -> &CourseDetail {
        &self.detail
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub async fn reload(&mut self) -> Result<(), AppError> {
        let course_id = self.detail.course.course_id;
        match CourseDetail::load(self.api.as_ref(), &self.viewer, course_id).await {
            Ok(detail) => {
                self.detail = detail;
                Ok(())
            }
            Err(e) => {
                self.banner = Some(e.banner());
                Err(e)
            }
        }
    }

    fn record<T>(&mut self, result: Result<T, AppError>) -> Result<T, AppError> {
        if let Err(e) = &result {
            self.banner = Some(e.banner());
        }
        result
    }

    fn require_staff(&mut self, action: &str) -> Result<(), AppError> {
        let allowed = self.viewer.require(self.viewer.can_edit_course_content(), action);
        self.record(allowed)
    }

    pub async fn save_assignment(
        &mut self,
        editing: Option<i32>,
        draft: &AssignmentDraft,
    ) -> Result<Assignment, AppError> {
        self.require_staff("edit assignments")?;
        let req = draft.to_payload(self.detail.course.course_id);
        let req = self.record(req)?;
        let saved = match editing {
            Some(id) => self.api.update_assignment(id, &req).await,
            None => self.api.create_assignment(&req).await,
        };
        let saved = self.record(saved)?;
        info!("saved assignment {} in course {}", saved.assignment_id, saved.course_id);
        self.reload().await?;
        Ok(saved)
    }

    pub async fn delete_assignment(&mut self, assignment_id: i32) -> Result<(), AppError> {
        self.require_staff("delete assignments")?;
        let result = self.api.delete_assignment(assignment_id).await;
        self.record(result)?;
        info!("deleted assignment {}", assignment_id);
        self.reload().await
    }

    pub async fn save_announcement(
        &mut self,
        editing: Option<i32>,
        draft: &AnnouncementDraft,
    ) -> Result<Announcement, AppError> {
        self.require_staff("post announcements")?;
        let req = draft.to_payload(self.detail.course.course_id, self.detail.course.instructor_id);
        let req = self.record(req)?;
        let saved = match editing {
            Some(id) => self.api.update_announcement(id, &req).await,
            None => self.api.create_announcement(&req).await,
        };
        let saved = self.record(saved)?;
        info!("saved announcement {}", saved.announcement_id);
        self.reload().await?;
        Ok(saved)
    }

    pub async fn delete_announcement(&mut self, announcement_id: i32) -> Result<(), AppError> {
        self.require_staff("delete announcements")?;
        let result = self.api.delete_announcement(announcement_id).await;
        self.record(result)?;
        info!("deleted announcement {}", announcement_id);
        self.reload().await
    }

    /// Grade, completion and payment edits on one roster entry.
    pub async fn update_enrollment(
        &mut self,
        enrollment_id: i32,
        draft: &EnrollmentUpdateDraft,
    ) -> Result<Enrollment, AppError> {
        self.require_staff("update enrollments")?;
        let current = self
            .detail
            .roster
            .iter()
            .find(|r| r.enrollment.enrollment_id == enrollment_id)
            .map(|r| r.enrollment.clone())
            .ok_or(AppError::NotFound);
        let current = self.record(current)?;
        let updated = draft.apply(&current);
        let updated = self.record(updated)?;
        let saved = self.api.update_enrollment(enrollment_id, &updated).await;
        let saved = self.record(saved)?;
        info!("updated enrollment {}", enrollment_id);
        self.reload().await?;
        Ok(saved)
    }

    /// Drops a student from the course. Admin only.
    pub async fn remove_enrollment(&mut self, enrollment_id: i32) -> Result<(), AppError> {
        let allowed = self.viewer.require(self.viewer.can_manage_users(), "remove enrollments");
        self.record(allowed)?;
        let result = self.api.delete_enrollment(enrollment_id).await;
        self.record(result)?;
        info!("removed enrollment {} from course {}", enrollment_id, self.detail.course.course_id);
        self.reload().await
    }

    pub async fn delete_submission(&mut self, submission_id: i32) -> Result<(), AppError> {
        self.require_staff("delete submissions")?;
        let result = self.api.delete_submission(submission_id).await;
        self.record(result)?;
        info!("deleted submission {}", submission_id);
        Ok(())
    }

    /// All hand-ins for one assignment, with the submitting student.
    pub async fn assignment_submissions(
        &mut self,
        assignment_id: i32,
    ) -> Result<Vec<SubmissionEntry>, AppError> {
        self.require_staff("view submissions")?;
        let submissions = self.api.submissions_by_assignment(assignment_id).await;
        let submissions = self.record(submissions)?;
        let mut entries = Vec::with_capacity(submissions.len());
        for submission in submissions {
            let student = fetch_student(self.api.as_ref(), submission.student_id).await;
            entries.push(SubmissionEntry {
                submission,
                student,
            });
        }
        Ok(entries)
    }

    pub async fn grade(
        &mut self,
        submission: &Submission,
        draft: &GradeDraft,
    ) -> Result<Submission, AppError> {
        let allowed = self.viewer.require(self.viewer.can_grade(), "grade submissions");
        self.record(allowed)?;
        let saved = grade_submission(self.api.as_ref(), submission, draft).await;
        self.record(saved)
    }

    /// Student hand-in; creates or updates depending on the submission book.
    pub async fn submit_assignment(
        &mut self,
        assignment_id: i32,
        draft: &SubmissionDraft,
    ) -> Result<Submission, AppError> {
        let allowed = self.viewer.require(self.viewer.can_submit(), "submit assignments");
        self.record(allowed)?;
        let student_id = self.viewer.student_id();
        let student_id = self.record(student_id)?;
        if self.detail.assignment(assignment_id).is_none() {
            return self.record(Err(AppError::NotFound));
        }

        let mut book = match self.detail.submissions.take() {
            Some(book) => book,
            None => SubmissionBook::from_submissions(student_id, Vec::new()),
        };
        let result = book.submit(self.api.as_ref(), assignment_id, draft).await;
        self.detail.submissions = Some(book);
        let saved = self.record(result)?;
        self.reload().await?;
        Ok(saved)
    }

    pub fn render(&self) -> String {
        match &self.viewer {
            Viewer::Student { .. } => render_for_student(&self.detail),
            Viewer::Admin(_) | Viewer::Instructor { .. } => render_for_staff(&self.detail),
        }
    }
}

fn render_header(out: &mut String, detail: &CourseDetail) {
    let course = &detail.course;
    let _ = writeln!(out, "{} - {} ({:?})", course.course_code, course.course_name, course.status);
    if let Some(description) = &course.description {
        let _ = writeln!(out, "{}", description);
    }
    let instructor = detail
        .instructor
        .as_ref()
        .map(|i| i.full_name.as_str())
        .unwrap_or("unassigned");
    let _ = writeln!(out, "Instructor: {}", instructor);
    if let Some(price) = course.price {
        let _ = writeln!(out, "Price: {:.0}", price);
    }
    let _ = writeln!(out, "\nAnnouncements:");
    for a in &detail.announcements {
        let _ = writeln!(out, "  [{:?}] {}", a.priority, a.title);
    }
}

fn render_for_student(detail: &CourseDetail) -> String {
    let mut out = String::new();
    render_header(&mut out, detail);
    let _ = writeln!(out, "\nAssignments:");
    for a in &detail.assignments {
        let progress = detail
            .submissions
            .as_ref()
            .map(|b| b.progress(a.assignment_id))
            .unwrap_or(AssignmentProgress::NotSubmitted);
        let state = match progress {
            AssignmentProgress::NotSubmitted => "not submitted".to_string(),
            AssignmentProgress::Submitted => "submitted".to_string(),
            AssignmentProgress::Graded => {
                let score = detail
                    .submissions
                    .as_ref()
                    .and_then(|b| b.get(a.assignment_id))
                    .and_then(|s| s.score);
                match (score, a.max_score) {
                    (Some(s), Some(max)) => format!("graded {}/{}", s, max),
                    (Some(s), None) => format!("graded {}", s),
                    _ => "graded".to_string(),
                }
            }
        };
        let due = a.due_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "  [{}] {} (due {}) - {}", a.assignment_id, a.title, due, state);
    }
    out
}

fn render_for_staff(detail: &CourseDetail) -> String {
    let mut out = String::new();
    render_header(&mut out, detail);
    let _ = writeln!(out, "\nAssignments:");
    for a in &detail.assignments {
        let due = a.due_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "  [{}] {} (due {}, max {:?})", a.assignment_id, a.title, due, a.max_score);
    }
    let _ = writeln!(out, "\nStudents ({}):", detail.roster.len());
    for entry in &detail.roster {
        let name = entry
            .student
            .as_ref()
            .map(|s| s.full_name.clone())
            .unwrap_or_else(|| format!("student #{}", entry.enrollment.student_id));
        let grade = entry
            .enrollment
            .grade
            .map(|g| g.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "  [{}] {} - {:?}, payment {:?}, grade {}",
            entry.enrollment.enrollment_id,
            name,
            entry.enrollment.completion_status,
            entry.enrollment.payment_status,
            grade
        );
    }
    out
}
