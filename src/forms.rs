//! Input drafts and the payloads they map to.
//!
//! A draft holds exactly what the user typed. `to_payload` validates it and
//! produces the typed request body; nothing is coerced anywhere else.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{AppError, FieldErrors};
use crate::models::*;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10,11}$").expect("phone pattern compiles"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn optional_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn require(errors: &mut FieldErrors, field: &'static str, raw: &str, message: &str) {
    if raw.trim().is_empty() {
        errors.insert(field, message.to_string());
    }
}

/// Blank input is `None`; anything else must parse.
fn parse_optional<T: FromStr>(errors: &mut FieldErrors, field: &'static str, raw: &str) -> Option<T> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.insert(field, format!("'{}' is not a valid number", trimmed));
            None
        }
    }
}

fn parse_optional_date(errors: &mut FieldErrors, field: &'static str, raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Accept full timestamps too; only the date part is kept.
    let date_part = trimmed.split('T').next().unwrap_or(trimmed);
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.insert(field, format!("'{}' is not a date (YYYY-MM-DD)", trimmed));
            None
        }
    }
}

fn finish<T>(errors: FieldErrors, value: impl FnOnce() -> T) -> Result<T, AppError> {
    if errors.is_empty() {
        Ok(value())
    } else {
        Err(AppError::Validation(errors))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterDraft {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub date_of_birth: String,
    pub address: String,
}

impl RegisterDraft {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();

        if self.username.trim().is_empty() {
            errors.insert("username", "Username is required".to_string());
        } else if self.username.trim().chars().count() < 3 {
            errors.insert("username", "Username must be at least 3 characters".to_string());
        }

        if self.password.is_empty() {
            errors.insert("password", "Password is required".to_string());
        } else if self.password.chars().count() < 6 {
            errors.insert("password", "Password must be at least 6 characters".to_string());
        }

        if self.confirm_password.is_empty() {
            errors.insert("confirmPassword", "Please confirm the password".to_string());
        } else if self.password != self.confirm_password {
            errors.insert("confirmPassword", "Passwords do not match".to_string());
        }

        if self.email.trim().is_empty() {
            errors.insert("email", "Email is required".to_string());
        } else if !is_valid_email(self.email.trim()) {
            errors.insert("email", "Email is not valid".to_string());
        }

        require(&mut errors, "fullName", &self.full_name, "Full name is required");

        if !self.phone.trim().is_empty() && !PHONE_RE.is_match(&self.compact_phone()) {
            errors.insert("phone", "Phone number must be 10 or 11 digits".to_string());
        }

        errors
    }

    fn compact_phone(&self) -> String {
        self.phone.chars().filter(|c| !c.is_whitespace()).collect()
    }

    pub fn to_payload(&self) -> Result<RegisterRequest, AppError> {
        let mut errors = self.validate();
        let date_of_birth = parse_optional_date(&mut errors, "dateOfBirth", &self.date_of_birth);

        finish(errors, || RegisterRequest {
            username: self.username.trim().to_string(),
            password: self.password.clone(),
            email: self.email.trim().to_string(),
            full_name: self.full_name.trim().to_string(),
            phone: optional_text(&self.compact_phone()),
            date_of_birth,
            address: optional_text(&self.address),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct CourseDraft {
    pub course_code: String,
    pub course_name: String,
    pub description: String,
    pub instructor_id: String,
    pub duration_weeks: String,
    pub price: String,
    pub max_students: String,
    pub status: CourseStatus,
}

impl CourseDraft {
    pub fn from_course(course: &Course) -> Self {
        Self {
            course_code: course.course_code.clone(),
            course_name: course.course_name.clone(),
            description: course.description.clone().unwrap_or_default(),
            instructor_id: course.instructor_id.map(|v| v.to_string()).unwrap_or_default(),
            duration_weeks: course.duration_weeks.map(|v| v.to_string()).unwrap_or_default(),
            price: course.price.map(|v| v.to_string()).unwrap_or_default(),
            max_students: course.max_students.map(|v| v.to_string()).unwrap_or_default(),
            status: course.status,
        }
    }

    pub fn to_payload(&self) -> Result<NewCourseRequest, AppError> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "courseCode", &self.course_code, "Course code is required");
        require(&mut errors, "courseName", &self.course_name, "Course name is required");

        let instructor_id = parse_optional::<i32>(&mut errors, "instructorId", &self.instructor_id);
        let duration_weeks = parse_optional::<i32>(&mut errors, "durationWeeks", &self.duration_weeks);
        let max_students = parse_optional::<i32>(&mut errors, "maxStudents", &self.max_students);
        let price = parse_optional::<f64>(&mut errors, "price", &self.price);
        if price.is_some_and(|p| p < 0.0 || !p.is_finite()) {
            errors.insert("price", "Price cannot be negative".to_string());
        }

        finish(errors, || NewCourseRequest {
            course_code: self.course_code.trim().to_string(),
            course_name: self.course_name.trim().to_string(),
            description: optional_text(&self.description),
            instructor_id,
            duration_weeks,
            price,
            max_students,
            status: self.status,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstructorDraft {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub specialization: String,
    pub bio: String,
}

impl InstructorDraft {
    pub fn from_instructor(instructor: &Instructor) -> Self {
        Self {
            full_name: instructor.full_name.clone(),
            email: instructor.email.clone(),
            phone: instructor.phone.clone().unwrap_or_default(),
            specialization: instructor.specialization.clone().unwrap_or_default(),
            bio: instructor.bio.clone().unwrap_or_default(),
        }
    }

    pub fn to_payload(&self) -> Result<NewInstructorRequest, AppError> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "fullName", &self.full_name, "Full name is required");
        if self.email.trim().is_empty() {
            errors.insert("email", "Email is required".to_string());
        } else if !is_valid_email(self.email.trim()) {
            errors.insert("email", "Email is not valid".to_string());
        }

        finish(errors, || NewInstructorRequest {
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: optional_text(&self.phone),
            specialization: optional_text(&self.specialization),
            bio: optional_text(&self.bio),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssignmentDraft {
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub max_score: String,
    pub assignment_type: AssignmentType,
    pub status: AssignmentStatus,
}

impl AssignmentDraft {
    pub fn from_assignment(assignment: &Assignment) -> Self {
        Self {
            title: assignment.title.clone(),
            description: assignment.description.clone().unwrap_or_default(),
            due_date: assignment
                .due_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            max_score: assignment.max_score.map(|v| v.to_string()).unwrap_or_default(),
            assignment_type: assignment.assignment_type.unwrap_or_default(),
            status: assignment.status.unwrap_or_default(),
        }
    }

    pub fn to_payload(&self, course_id: i32) -> Result<NewAssignmentRequest, AppError> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "title", &self.title, "Assignment title is required");
        let due_date = parse_optional_date(&mut errors, "dueDate", &self.due_date);
        let max_score = parse_optional::<i32>(&mut errors, "maxScore", &self.max_score);

        finish(errors, || NewAssignmentRequest {
            course_id,
            title: self.title.trim().to_string(),
            description: optional_text(&self.description),
            due_date,
            max_score,
            assignment_type: self.assignment_type,
            status: self.status,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnnouncementDraft {
    pub title: String,
    pub content: String,
    pub priority: Priority,
}

impl AnnouncementDraft {
    pub fn from_announcement(announcement: &Announcement) -> Self {
        Self {
            title: announcement.title.clone(),
            content: announcement.content.clone().unwrap_or_default(),
            priority: announcement.priority,
        }
    }

    pub fn to_payload(
        &self,
        course_id: i32,
        instructor_id: Option<i32>,
    ) -> Result<NewAnnouncementRequest, AppError> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "title", &self.title, "Announcement title is required");

        finish(errors, || NewAnnouncementRequest {
            course_id,
            instructor_id,
            title: self.title.trim().to_string(),
            content: optional_text(&self.content),
            priority: self.priority,
        })
    }
}

/// Instructor-side edit of a student's enrollment.
#[derive(Debug, Clone, Default)]
pub struct EnrollmentUpdateDraft {
    pub grade: String,
    pub completion_status: CompletionStatus,
    pub payment_status: PaymentStatus,
}

impl EnrollmentUpdateDraft {
    pub fn from_enrollment(enrollment: &Enrollment) -> Self {
        Self {
            grade: enrollment.grade.map(|g| g.to_string()).unwrap_or_default(),
            completion_status: enrollment.completion_status,
            payment_status: enrollment.payment_status,
        }
    }

    /// The server expects the full record back with the edited fields.
    pub fn apply(&self, enrollment: &Enrollment) -> Result<Enrollment, AppError> {
        let mut errors = FieldErrors::new();
        let grade = parse_optional::<f64>(&mut errors, "grade", &self.grade);

        finish(errors, || Enrollment {
            grade,
            completion_status: self.completion_status,
            payment_status: self.payment_status,
            ..enrollment.clone()
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct GradeDraft {
    pub score: String,
    pub status: SubmissionStatus,
}

impl GradeDraft {
    pub fn from_submission(submission: &Submission) -> Self {
        Self {
            score: submission.score.map(|s| s.to_string()).unwrap_or_default(),
            status: submission.status,
        }
    }

    pub fn apply(&self, submission: &Submission) -> Result<Submission, AppError> {
        let mut errors = FieldErrors::new();
        let score = parse_optional::<i32>(&mut errors, "score", &self.score);
        if score.is_some_and(|s| s < 0) {
            errors.insert("score", "Score cannot be negative".to_string());
        }

        finish(errors, || Submission {
            score,
            status: self.status,
            ..submission.clone()
        })
    }
}

/// What a student fills in when handing in an assignment. Only the file's
/// name is kept.
#[derive(Debug, Clone, Default)]
pub struct SubmissionDraft {
    pub content: String,
    pub file_name: String,
}

impl SubmissionDraft {
    pub fn from_submission(submission: &Submission) -> Self {
        Self {
            content: submission.content.clone().unwrap_or_default(),
            file_name: submission.attachment.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PeriodDraft {
    pub period_name: String,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
}

impl PeriodDraft {
    pub fn from_period(period: &RegistrationPeriod) -> Self {
        Self {
            period_name: period.period_name.clone(),
            description: period.description.clone().unwrap_or_default(),
            start_date: period.start_date.format("%Y-%m-%d").to_string(),
            end_date: period.end_date.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn to_payload(&self) -> Result<NewPeriodRequest, AppError> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "periodName", &self.period_name, "Period name is required");
        require(&mut errors, "startDate", &self.start_date, "Start date is required");
        require(&mut errors, "endDate", &self.end_date, "End date is required");

        let start = parse_optional_date(&mut errors, "startDate", &self.start_date);
        let end = parse_optional_date(&mut errors, "endDate", &self.end_date);

        let (Some(start_date), Some(end_date)) = (start, end) else {
            return Err(AppError::Validation(errors));
        };
        if start_date > end_date {
            errors.insert("endDate", "End date must be after the start date".to_string());
        }

        finish(errors, || NewPeriodRequest {
            period_name: self.period_name.trim().to_string(),
            description: optional_text(&self.description),
            start_date,
            end_date,
        })
    }
}
