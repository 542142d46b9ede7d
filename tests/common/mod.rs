#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;

use lms_client::api::*;
use lms_client::error::AppError;
use lms_client::models::*;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn course(id: i32, code: &str, price: Option<f64>) -> Course {
    Course {
        course_id: id,
        course_code: code.to_string(),
        course_name: format!("{} course", code),
        description: None,
        instructor_id: None,
        duration_weeks: Some(12),
        price,
        max_students: Some(40),
        status: CourseStatus::Active,
    }
}

pub fn period(id: i32, name: &str) -> RegistrationPeriod {
    RegistrationPeriod {
        period_id: id,
        period_name: name.to_string(),
        description: None,
        start_date: date(2024, 8, 1),
        end_date: date(2024, 9, 30),
        status: Some(PeriodStatus::Active),
    }
}

pub fn enrollment(id: i32, student_id: i32, course_id: i32) -> Enrollment {
    Enrollment {
        enrollment_id: id,
        student_id,
        course_id,
        period_id: None,
        enrollment_date: Some(date(2024, 1, 15)),
        completion_status: CompletionStatus::Enrolled,
        payment_status: PaymentStatus::Pending,
        grade: None,
    }
}

pub fn submission(id: i32, assignment_id: i32, student_id: i32) -> Submission {
    Submission {
        submission_id: id,
        assignment_id,
        student_id,
        content: Some(format!("answer {}", id)),
        attachment: None,
        submitted_date: Some(date(2024, 10, 1)),
        score: None,
        status: SubmissionStatus::Submitted,
    }
}

pub fn assignment(id: i32, course_id: i32, title: &str) -> Assignment {
    Assignment {
        assignment_id: id,
        course_id,
        title: title.to_string(),
        description: None,
        due_date: Some(date(2024, 11, 1)),
        max_score: Some(100),
        assignment_type: Some(AssignmentType::Homework),
        status: Some(AssignmentStatus::Published),
    }
}

pub fn student(id: i32, name: &str) -> Student {
    Student {
        student_id: id,
        full_name: name.to_string(),
        email: Some(format!("s{}@example.edu", id)),
        phone: None,
        date_of_birth: None,
        address: None,
    }
}

pub fn user(id: i32, username: &str, role: Role, reference_id: Option<i32>) -> User {
    User {
        user_id: id,
        username: username.to_string(),
        role,
        full_name: Some(format!("{} full", username)),
        email: Some(format!("{}@example.edu", username)),
        reference_id,
        created_at: None,
        last_login: None,
    }
}

pub fn rejected(body: &str) -> AppError {
    AppError::Api {
        status: StatusCode::BAD_REQUEST,
        body: body.to_string(),
    }
}

/// In-memory backend. Every trait call is appended to `calls` as
/// `"<method> <arg>"`, and any method named in `failing` returns an error.
#[derive(Default)]
pub struct FakeState {
    pub courses: Vec<Course>,
    pub instructors: Vec<Instructor>,
    pub students: Vec<Student>,
    pub enrollments: Vec<Enrollment>,
    pub assignments: Vec<Assignment>,
    pub submissions: Vec<Submission>,
    pub announcements: Vec<Announcement>,
    pub periods: Vec<RegistrationPeriod>,
    pub period_courses: HashMap<i32, Vec<i32>>,
    pub users: Vec<User>,
    pub passwords: HashMap<String, String>,
    pub stats: DashboardStats,
    pub calls: Vec<String>,
    pub failing: HashSet<&'static str>,
    /// Course ids whose enrollment create is rejected.
    pub reject_enrollment_for: HashSet<i32>,
    pub next_id: i32,
}

impl FakeState {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        1000 + self.next_id
    }
}

#[derive(Default)]
pub struct FakeLms {
    pub state: Mutex<FakeState>,
}

impl FakeLms {
    pub fn new(state: FakeState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake state lock")
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.split(' ').next() == Some(method))
            .collect()
    }

    fn enter(&self, method: &'static str, arg: impl ToString) -> Result<MutexGuard<'_, FakeState>, AppError> {
        let mut state = self.lock();
        state.calls.push(format!("{} {}", method, arg.to_string()).trim_end().to_string());
        if state.failing.contains(method) {
            return Err(AppError::Api {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: format!("{} failed", method),
            });
        }
        Ok(state)
    }
}

#[async_trait]
impl AuthApi for FakeLms {
    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, AppError> {
        let state = self.enter("login", &req.username)?;
        match state.passwords.get(&req.username) {
            Some(pw) if *pw == req.password => {
                let user = state
                    .users
                    .iter()
                    .find(|u| u.username == req.username)
                    .cloned()
                    .ok_or(AppError::NotFound)?;
                Ok(AuthResponse {
                    token: format!("token-{}", user.user_id),
                    user,
                })
            }
            _ => Err(AppError::Api {
                status: StatusCode::UNAUTHORIZED,
                body: "Invalid username or password".to_string(),
            }),
        }
    }

    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, AppError> {
        let mut state = self.enter("register", &req.username)?;
        if state.users.iter().any(|u| u.username == req.username) {
            return Err(rejected("Username already exists"));
        }
        let id = state.next_id();
        let user = User {
            user_id: id,
            username: req.username.clone(),
            role: Role::Student,
            full_name: Some(req.full_name.clone()),
            email: Some(req.email.clone()),
            reference_id: Some(id + 1),
            created_at: None,
            last_login: None,
        };
        state.users.push(user.clone());
        state.passwords.insert(req.username.clone(), req.password.clone());
        Ok(AuthResponse {
            token: format!("token-{}", id),
            user,
        })
    }
}

#[async_trait]
impl CourseApi for FakeLms {
    async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        Ok(self.enter("list_courses", "")?.courses.clone())
    }

    async fn get_course(&self, id: i32) -> Result<Course, AppError> {
        let state = self.enter("get_course", id)?;
        state.courses.iter().find(|c| c.course_id == id).cloned().ok_or(AppError::NotFound)
    }

    async fn create_course(&self, req: &NewCourseRequest) -> Result<Course, AppError> {
        let mut state = self.enter("create_course", &req.course_code)?;
        let id = state.next_id();
        let course = Course {
            course_id: id,
            course_code: req.course_code.clone(),
            course_name: req.course_name.clone(),
            description: req.description.clone(),
            instructor_id: req.instructor_id,
            duration_weeks: req.duration_weeks,
            price: req.price,
            max_students: req.max_students,
            status: req.status,
        };
        state.courses.push(course.clone());
        Ok(course)
    }

    async fn update_course(&self, id: i32, req: &NewCourseRequest) -> Result<Course, AppError> {
        let mut state = self.enter("update_course", id)?;
        let course = state
            .courses
            .iter_mut()
            .find(|c| c.course_id == id)
            .ok_or(AppError::NotFound)?;
        course.course_code = req.course_code.clone();
        course.course_name = req.course_name.clone();
        course.price = req.price;
        course.status = req.status;
        Ok(course.clone())
    }

    async fn delete_course(&self, id: i32) -> Result<(), AppError> {
        self.enter("delete_course", id)?.courses.retain(|c| c.course_id != id);
        Ok(())
    }

    async fn courses_by_instructor(&self, instructor_id: i32) -> Result<Vec<Course>, AppError> {
        let state = self.enter("courses_by_instructor", instructor_id)?;
        Ok(state
            .courses
            .iter()
            .filter(|c| c.instructor_id == Some(instructor_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl InstructorApi for FakeLms {
    async fn list_instructors(&self) -> Result<Vec<Instructor>, AppError> {
        Ok(self.enter("list_instructors", "")?.instructors.clone())
    }

    async fn get_instructor(&self, id: i32) -> Result<Instructor, AppError> {
        let state = self.enter("get_instructor", id)?;
        state
            .instructors
            .iter()
            .find(|i| i.instructor_id == id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn create_instructor(&self, req: &NewInstructorRequest) -> Result<Instructor, AppError> {
        let mut state = self.enter("create_instructor", &req.full_name)?;
        let id = state.next_id();
        let instructor = Instructor {
            instructor_id: id,
            full_name: req.full_name.clone(),
            email: req.email.clone(),
            phone: req.phone.clone(),
            specialization: req.specialization.clone(),
            bio: req.bio.clone(),
        };
        state.instructors.push(instructor.clone());
        Ok(instructor)
    }

    async fn update_instructor(
        &self,
        id: i32,
        req: &NewInstructorRequest,
    ) -> Result<Instructor, AppError> {
        let mut state = self.enter("update_instructor", id)?;
        let instructor = state
            .instructors
            .iter_mut()
            .find(|i| i.instructor_id == id)
            .ok_or(AppError::NotFound)?;
        instructor.full_name = req.full_name.clone();
        instructor.email = req.email.clone();
        Ok(instructor.clone())
    }

    async fn delete_instructor(&self, id: i32) -> Result<(), AppError> {
        self.enter("delete_instructor", id)?
            .instructors
            .retain(|i| i.instructor_id != id);
        Ok(())
    }
}

#[async_trait]
impl StudentApi for FakeLms {
    async fn get_student(&self, id: i32) -> Result<Student, AppError> {
        let state = self.enter("get_student", id)?;
        state.students.iter().find(|s| s.student_id == id).cloned().ok_or(AppError::NotFound)
    }
}

#[async_trait]
impl EnrollmentApi for FakeLms {
    async fn list_enrollments(&self) -> Result<Vec<Enrollment>, AppError> {
        Ok(self.enter("list_enrollments", "")?.enrollments.clone())
    }

    async fn create_enrollment(&self, req: &NewEnrollmentRequest) -> Result<Enrollment, AppError> {
        let mut state = self.enter("create_enrollment", req.course_id)?;
        if state.reject_enrollment_for.contains(&req.course_id) {
            return Err(rejected("Course is full"));
        }
        if state
            .enrollments
            .iter()
            .any(|e| e.student_id == req.student_id && e.course_id == req.course_id)
        {
            return Err(rejected("Student is already enrolled in this course"));
        }
        let id = state.next_id();
        let enrollment = Enrollment {
            enrollment_id: id,
            student_id: req.student_id,
            course_id: req.course_id,
            period_id: req.period_id,
            enrollment_date: Some(req.enrollment_date),
            completion_status: req.completion_status,
            payment_status: req.payment_status,
            grade: None,
        };
        state.enrollments.push(enrollment.clone());
        Ok(enrollment)
    }

    async fn update_enrollment(&self, id: i32, enrollment: &Enrollment) -> Result<Enrollment, AppError> {
        let mut state = self.enter("update_enrollment", id)?;
        let slot = state
            .enrollments
            .iter_mut()
            .find(|e| e.enrollment_id == id)
            .ok_or(AppError::NotFound)?;
        *slot = enrollment.clone();
        Ok(slot.clone())
    }

    async fn delete_enrollment(&self, id: i32) -> Result<(), AppError> {
        self.enter("delete_enrollment", id)?
            .enrollments
            .retain(|e| e.enrollment_id != id);
        Ok(())
    }

    async fn enrollments_by_student(&self, student_id: i32) -> Result<Vec<Enrollment>, AppError> {
        let state = self.enter("enrollments_by_student", student_id)?;
        Ok(state
            .enrollments
            .iter()
            .filter(|e| e.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn enrollments_by_course(&self, course_id: i32) -> Result<Vec<Enrollment>, AppError> {
        let state = self.enter("enrollments_by_course", course_id)?;
        Ok(state
            .enrollments
            .iter()
            .filter(|e| e.course_id == course_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AssignmentApi for FakeLms {
    async fn list_assignments(&self) -> Result<Vec<Assignment>, AppError> {
        Ok(self.enter("list_assignments", "")?.assignments.clone())
    }

    async fn create_assignment(&self, req: &NewAssignmentRequest) -> Result<Assignment, AppError> {
        let mut state = self.enter("create_assignment", &req.title)?;
        let id = state.next_id();
        let assignment = Assignment {
            assignment_id: id,
            course_id: req.course_id,
            title: req.title.clone(),
            description: req.description.clone(),
            due_date: req.due_date,
            max_score: req.max_score,
            assignment_type: Some(req.assignment_type),
            status: Some(req.status),
        };
        state.assignments.push(assignment.clone());
        Ok(assignment)
    }

    async fn update_assignment(
        &self,
        id: i32,
        req: &NewAssignmentRequest,
    ) -> Result<Assignment, AppError> {
        let mut state = self.enter("update_assignment", id)?;
        let slot = state
            .assignments
            .iter_mut()
            .find(|a| a.assignment_id == id)
            .ok_or(AppError::NotFound)?;
        slot.title = req.title.clone();
        slot.due_date = req.due_date;
        slot.max_score = req.max_score;
        Ok(slot.clone())
    }

    async fn delete_assignment(&self, id: i32) -> Result<(), AppError> {
        self.enter("delete_assignment", id)?
            .assignments
            .retain(|a| a.assignment_id != id);
        Ok(())
    }

    async fn assignments_by_course(&self, course_id: i32) -> Result<Vec<Assignment>, AppError> {
        let state = self.enter("assignments_by_course", course_id)?;
        Ok(state
            .assignments
            .iter()
            .filter(|a| a.course_id == course_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SubmissionApi for FakeLms {
    async fn create_submission(&self, req: &SubmissionRequest) -> Result<Submission, AppError> {
        let mut state = self.enter("create_submission", req.assignment_id)?;
        let id = state.next_id();
        let submission = Submission {
            submission_id: id,
            assignment_id: req.assignment_id,
            student_id: req.student_id,
            content: Some(req.content.clone()),
            attachment: req.attachment.clone(),
            submitted_date: req.submitted_date,
            score: None,
            status: req.status,
        };
        state.submissions.push(submission.clone());
        Ok(submission)
    }

    async fn update_submission(&self, id: i32, req: &SubmissionRequest) -> Result<Submission, AppError> {
        let mut state = self.enter("update_submission", id)?;
        let slot = state
            .submissions
            .iter_mut()
            .find(|s| s.submission_id == id)
            .ok_or(AppError::NotFound)?;
        slot.content = Some(req.content.clone());
        slot.attachment = req.attachment.clone();
        slot.status = req.status;
        Ok(slot.clone())
    }

    async fn save_submission(&self, submission: &Submission) -> Result<Submission, AppError> {
        let mut state = self.enter("save_submission", submission.submission_id)?;
        let slot = state
            .submissions
            .iter_mut()
            .find(|s| s.submission_id == submission.submission_id)
            .ok_or(AppError::NotFound)?;
        *slot = submission.clone();
        Ok(slot.clone())
    }

    async fn delete_submission(&self, id: i32) -> Result<(), AppError> {
        self.enter("delete_submission", id)?
            .submissions
            .retain(|s| s.submission_id != id);
        Ok(())
    }

    async fn submissions_by_assignment(&self, assignment_id: i32) -> Result<Vec<Submission>, AppError> {
        let state = self.enter("submissions_by_assignment", assignment_id)?;
        Ok(state
            .submissions
            .iter()
            .filter(|s| s.assignment_id == assignment_id)
            .cloned()
            .collect())
    }

    async fn submissions_by_student(&self, student_id: i32) -> Result<Vec<Submission>, AppError> {
        let state = self.enter("submissions_by_student", student_id)?;
        Ok(state
            .submissions
            .iter()
            .filter(|s| s.student_id == student_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AnnouncementApi for FakeLms {
    async fn list_announcements(&self) -> Result<Vec<Announcement>, AppError> {
        Ok(self.enter("list_announcements", "")?.announcements.clone())
    }

    async fn create_announcement(&self, req: &NewAnnouncementRequest) -> Result<Announcement, AppError> {
        let mut state = self.enter("create_announcement", &req.title)?;
        let id = state.next_id();
        let announcement = Announcement {
            announcement_id: id,
            course_id: req.course_id,
            instructor_id: req.instructor_id,
            title: req.title.clone(),
            content: req.content.clone(),
            priority: req.priority,
            created_at: None,
        };
        state.announcements.push(announcement.clone());
        Ok(announcement)
    }

    async fn update_announcement(
        &self,
        id: i32,
        req: &NewAnnouncementRequest,
    ) -> Result<Announcement, AppError> {
        let mut state = self.enter("update_announcement", id)?;
        let slot = state
            .announcements
            .iter_mut()
            .find(|a| a.announcement_id == id)
            .ok_or(AppError::NotFound)?;
        slot.title = req.title.clone();
        slot.content = req.content.clone();
        slot.priority = req.priority;
        Ok(slot.clone())
    }

    async fn delete_announcement(&self, id: i32) -> Result<(), AppError> {
        self.enter("delete_announcement", id)?
            .announcements
            .retain(|a| a.announcement_id != id);
        Ok(())
    }

    async fn announcements_by_course(&self, course_id: i32) -> Result<Vec<Announcement>, AppError> {
        let state = self.enter("announcements_by_course", course_id)?;
        Ok(state
            .announcements
            .iter()
            .filter(|a| a.course_id == course_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PeriodApi for FakeLms {
    async fn list_periods(&self) -> Result<Vec<RegistrationPeriod>, AppError> {
        Ok(self.enter("list_periods", "")?.periods.clone())
    }

    async fn get_period(&self, id: i32) -> Result<RegistrationPeriod, AppError> {
        let state = self.enter("get_period", id)?;
        state.periods.iter().find(|p| p.period_id == id).cloned().ok_or(AppError::NotFound)
    }

    async fn active_periods(&self) -> Result<Vec<RegistrationPeriod>, AppError> {
        let state = self.enter("active_periods", "")?;
        Ok(state
            .periods
            .iter()
            .filter(|p| p.status == Some(PeriodStatus::Active))
            .cloned()
            .collect())
    }

    async fn create_period(&self, req: &NewPeriodRequest) -> Result<RegistrationPeriod, AppError> {
        let mut state = self.enter("create_period", &req.period_name)?;
        let id = state.next_id();
        let period = RegistrationPeriod {
            period_id: id,
            period_name: req.period_name.clone(),
            description: req.description.clone(),
            start_date: req.start_date,
            end_date: req.end_date,
            status: Some(PeriodStatus::Upcoming),
        };
        state.periods.push(period.clone());
        Ok(period)
    }

    async fn update_period(&self, id: i32, req: &NewPeriodRequest) -> Result<RegistrationPeriod, AppError> {
        let mut state = self.enter("update_period", id)?;
        let slot = state
            .periods
            .iter_mut()
            .find(|p| p.period_id == id)
            .ok_or(AppError::NotFound)?;
        slot.period_name = req.period_name.clone();
        slot.description = req.description.clone();
        slot.start_date = req.start_date;
        slot.end_date = req.end_date;
        Ok(slot.clone())
    }

    async fn delete_period(&self, id: i32) -> Result<(), AppError> {
        let mut state = self.enter("delete_period", id)?;
        state.periods.retain(|p| p.period_id != id);
        state.period_courses.remove(&id);
        Ok(())
    }

    async fn period_courses(&self, period_id: i32) -> Result<Vec<Course>, AppError> {
        let state = self.enter("period_courses", period_id)?;
        let ids = state.period_courses.get(&period_id).cloned().unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| state.courses.iter().find(|c| c.course_id == *id).cloned())
            .collect())
    }

    async fn replace_period_courses(&self, period_id: i32, course_ids: &[i32]) -> Result<(), AppError> {
        let mut state = self.enter("replace_period_courses", period_id)?;
        state.period_courses.insert(period_id, course_ids.to_vec());
        Ok(())
    }

    async fn period_details(&self, period_id: i32) -> Result<PeriodDetails, AppError> {
        let state = self.enter("period_details", period_id)?;
        let period = state
            .periods
            .iter()
            .find(|p| p.period_id == period_id)
            .cloned()
            .ok_or(AppError::NotFound)?;
        let course_ids = state.period_courses.get(&period_id).cloned().unwrap_or_default();
        let courses = course_ids
            .iter()
            .filter_map(|id| state.courses.iter().find(|c| c.course_id == *id).cloned())
            .collect();
        Ok(PeriodDetails {
            period,
            courses,
            course_ids,
        })
    }
}

#[async_trait]
impl AdminApi for FakeLms {
    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.enter("list_users", "")?.users.clone())
    }

    async fn get_user(&self, id: i32) -> Result<User, AppError> {
        let state = self.enter("get_user", id)?;
        state.users.iter().find(|u| u.user_id == id).cloned().ok_or(AppError::NotFound)
    }

    async fn update_user_role(&self, id: i32, role: Role) -> Result<User, AppError> {
        let mut state = self.enter("update_user_role", id)?;
        let slot = state
            .users
            .iter_mut()
            .find(|u| u.user_id == id)
            .ok_or(AppError::NotFound)?;
        slot.role = role;
        Ok(slot.clone())
    }

    async fn delete_user(&self, id: i32) -> Result<(), AppError> {
        self.enter("delete_user", id)?.users.retain(|u| u.user_id != id);
        Ok(())
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, AppError> {
        Ok(self.enter("dashboard_stats", "")?.stats.clone())
    }
}
