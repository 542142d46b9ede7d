pub mod http;

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::*;

pub use http::LmsHttpClient;

/// Bearer token attached to every request once a session exists. Shared
/// between the HTTP client and the session context that owns its lifecycle.
#[derive(Clone, Debug, Default)]
pub struct AuthHeader {
    token: Arc<RwLock<Option<String>>>,
}

impl AuthHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: Option<String>) {
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    pub fn get(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn value(&self) -> Option<String> {
        self.get().map(|t| format!("Bearer {}", t))
    }
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, AppError>;
    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, AppError>;
}

#[async_trait]
pub trait CourseApi: Send + Sync {
    async fn list_courses(&self) -> Result<Vec<Course>, AppError>;
    async fn get_course(&self, id: i32) -> Result<Course, AppError>;
    async fn create_course(&self, req: &NewCourseRequest) -> Result<Course, AppError>;
    async fn update_course(&self, id: i32, req: &NewCourseRequest) -> Result<Course, AppError>;
    async fn delete_course(&self, id: i32) -> Result<(), AppError>;
    async fn courses_by_instructor(&self, instructor_id: i32) -> Result<Vec<Course>, AppError>;
}

#[async_trait]
pub trait InstructorApi: Send + Sync {
    async fn list_instructors(&self) -> Result<Vec<Instructor>, AppError>;
    async fn get_instructor(&self, id: i32) -> Result<Instructor, AppError>;
    async fn create_instructor(&self, req: &NewInstructorRequest) -> Result<Instructor, AppError>;
    async fn update_instructor(
        &self,
        id: i32,
        req: &NewInstructorRequest,
    ) -> Result<Instructor, AppError>;
    async fn delete_instructor(&self, id: i32) -> Result<(), AppError>;
}

#[async_trait]
pub trait StudentApi: Send + Sync {
    async fn get_student(&self, id: i32) -> Result<Student, AppError>;
}

#[async_trait]
pub trait EnrollmentApi: Send + Sync {
    async fn list_enrollments(&self) -> Result<Vec<Enrollment>, AppError>;
    async fn create_enrollment(&self, req: &NewEnrollmentRequest) -> Result<Enrollment, AppError>;
    async fn update_enrollment(&self, id: i32, enrollment: &Enrollment) -> Result<Enrollment, AppError>;
    async fn delete_enrollment(&self, id: i32) -> Result<(), AppError>;
    async fn enrollments_by_student(&self, student_id: i32) -> Result<Vec<Enrollment>, AppError>;
    async fn enrollments_by_course(&self, course_id: i32) -> Result<Vec<Enrollment>, AppError>;
}

#[async_trait]
pub trait AssignmentApi: Send + Sync {
    async fn list_assignments(&self) -> Result<Vec<Assignment>, AppError>;
    async fn create_assignment(&self, req: &NewAssignmentRequest) -> Result<Assignment, AppError>;
    async fn update_assignment(
        &self,
        id: i32,
        req: &NewAssignmentRequest,
    ) -> Result<Assignment, AppError>;
    async fn delete_assignment(&self, id: i32) -> Result<(), AppError>;
    async fn assignments_by_course(&self, course_id: i32) -> Result<Vec<Assignment>, AppError>;
}

#[async_trait]
pub trait SubmissionApi: Send + Sync {
    async fn create_submission(&self, req: &SubmissionRequest) -> Result<Submission, AppError>;
    async fn update_submission(&self, id: i32, req: &SubmissionRequest) -> Result<Submission, AppError>;
    /// Sends the whole record back, the way grading does.
    async fn save_submission(&self, submission: &Submission) -> Result<Submission, AppError>;
    async fn delete_submission(&self, id: i32) -> Result<(), AppError>;
    async fn submissions_by_assignment(&self, assignment_id: i32) -> Result<Vec<Submission>, AppError>;
    async fn submissions_by_student(&self, student_id: i32) -> Result<Vec<Submission>, AppError>;
}

#[async_trait]
pub trait AnnouncementApi: Send + Sync {
    async fn list_announcements(&self) -> Result<Vec<Announcement>, AppError>;
    async fn create_announcement(&self, req: &NewAnnouncementRequest) -> Result<Announcement, AppError>;
    async fn update_announcement(
        &self,
        id: i32,
        req: &NewAnnouncementRequest,
    ) -> Result<Announcement, AppError>;
    async fn delete_announcement(&self, id: i32) -> Result<(), AppError>;
    async fn announcements_by_course(&self, course_id: i32) -> Result<Vec<Announcement>, AppError>;
}

#[async_trait]
pub trait PeriodApi: Send + Sync {
    async fn list_periods(&self) -> Result<Vec<RegistrationPeriod>, AppError>;
    async fn get_period(&self, id: i32) -> Result<RegistrationPeriod, AppError>;
    async fn active_periods(&self) -> Result<Vec<RegistrationPeriod>, AppError>;
    async fn create_period(&self, req: &NewPeriodRequest) -> Result<RegistrationPeriod, AppError>;
    async fn update_period(&self, id: i32, req: &NewPeriodRequest) -> Result<RegistrationPeriod, AppError>;
    async fn delete_period(&self, id: i32) -> Result<(), AppError>;
    async fn period_courses(&self, period_id: i32) -> Result<Vec<Course>, AppError>;
    /// Replaces the period's course set with exactly `course_ids`.
    async fn replace_period_courses(&self, period_id: i32, course_ids: &[i32]) -> Result<(), AppError>;
    async fn period_details(&self, period_id: i32) -> Result<PeriodDetails, AppError>;
}

#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
    async fn get_user(&self, id: i32) -> Result<User, AppError>;
    async fn update_user_role(&self, id: i32, role: Role) -> Result<User, AppError>;
    async fn delete_user(&self, id: i32) -> Result<(), AppError>;
    async fn dashboard_stats(&self) -> Result<DashboardStats, AppError>;
}

/// Every resource the backend exposes.
pub trait LmsApi:
    AuthApi
    + CourseApi
    + InstructorApi
    + StudentApi
    + EnrollmentApi
    + AssignmentApi
    + SubmissionApi
    + AnnouncementApi
    + PeriodApi
    + AdminApi
{
}

impl<T> LmsApi for T where
    T: AuthApi
        + CourseApi
        + InstructorApi
        + StudentApi
        + EnrollmentApi
        + AssignmentApi
        + SubmissionApi
        + AnnouncementApi
        + PeriodApi
        + AdminApi
{
}
