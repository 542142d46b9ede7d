use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::*;
use crate::config::ClientConfig;

/// REST client for the LMS backend. All paths are relative to
/// `ClientConfig::api_base_url`.
pub struct LmsHttpClient {
    client: Client,
    base_url: String,
    auth: AuthHeader,
}

impl LmsHttpClient {
    pub fn new(config: &ClientConfig, auth: AuthHeader) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            auth,
        })
    }

    pub fn auth_header(&self) -> AuthHeader {
        self.auth.clone()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match self.auth.value() {
            Some(value) => builder.header("Authorization", value),
            None => builder,
        }
    }

    /// Sends the request and returns the raw body of a 2xx response.
    async fn execute(&self, method: Method, path: &str, builder: RequestBuilder) -> Result<String, AppError> {
        tracing::debug!("{} {}", method, path);
        let response = builder.send().await.map_err(|e| {
            tracing::error!("request {} {} failed: {}", method, path, e);
            AppError::Http(e)
        })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            tracing::warn!("{} {} returned {}: {}", method, path, status, body);
            return Err(match status {
                StatusCode::NOT_FOUND if body.trim().is_empty() => AppError::NotFound,
                _ => AppError::Api { status, body },
            });
        }

        Ok(body)
    }

    fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, AppError> {
        serde_json::from_str::<T>(body).map_err(|e| {
            tracing::error!("Failed to parse response from {}: {}", path, e);
            AppError::Decode(e)
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let body = self
            .execute(Method::GET, path, self.request(Method::GET, path))
            .await?;
        Self::decode(path, &body)
    }

    async fn send<B, T>(&self, method: Method, path: &str, payload: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let builder = self.request(method.clone(), path).json(payload);
        let body = self.execute(method, path, builder).await?;
        Self::decode(path, &body)
    }

    async fn post<B, T>(&self, path: &str, payload: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, payload).await
    }

    async fn put<B, T>(&self, path: &str, payload: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send(Method::PUT, path, payload).await
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        self.execute(Method::DELETE, path, self.request(Method::DELETE, path))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AuthApi for LmsHttpClient {
    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, AppError> {
        self.post("/auth/login", req).await
    }

    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, AppError> {
        self.post("/auth/register", req).await
    }
}

#[async_trait]
impl CourseApi for LmsHttpClient {
    async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        self.get("/courses").await
    }

    async fn get_course(&self, id: i32) -> Result<Course, AppError> {
        self.get(&format!("/courses/{}", id)).await
    }

    async fn create_course(&self, req: &NewCourseRequest) -> Result<Course, AppError> {
        self.post("/courses", req).await
    }

    async fn update_course(&self, id: i32, req: &NewCourseRequest) -> Result<Course, AppError> {
        self.put(&format!("/courses/{}", id), req).await
    }

    async fn delete_course(&self, id: i32) -> Result<(), AppError> {
        self.delete(&format!("/courses/{}", id)).await
    }

    async fn courses_by_instructor(&self, instructor_id: i32) -> Result<Vec<Course>, AppError> {
        self.get(&format!("/courses/instructor/{}", instructor_id)).await
    }
}

#[async_trait]
impl InstructorApi for LmsHttpClient {
    async fn list_instructors(&self) -> Result<Vec<Instructor>, AppError> {
        self.get("/instructors").await
    }

    async fn get_instructor(&self, id: i32) -> Result<Instructor, AppError> {
        self.get(&format!("/instructors/{}", id)).await
    }

    async fn create_instructor(&self, req: &NewInstructorRequest) -> Result<Instructor, AppError> {
        self.post("/instructors", req).await
    }

    async fn update_instructor(
        &self,
        id: i32,
        req: &NewInstructorRequest,
    ) -> Result<Instructor, AppError> {
        self.put(&format!("/instructors/{}", id), req).await
    }

    async fn delete_instructor(&self, id: i32) -> Result<(), AppError> {
        self.delete(&format!("/instructors/{}", id)).await
    }
}

#[async_trait]
impl StudentApi for LmsHttpClient {
    async fn get_student(&self, id: i32) -> Result<Student, AppError> {
        self.get(&format!("/students/{}", id)).await
    }
}

#[async_trait]
impl EnrollmentApi for LmsHttpClient {
    async fn list_enrollments(&self) -> Result<Vec<Enrollment>, AppError> {
        self.get("/enrollments").await
    }

    async fn create_enrollment(&self, req: &NewEnrollmentRequest) -> Result<Enrollment, AppError> {
        self.post("/enrollments", req).await
    }

    async fn update_enrollment(&self, id: i32, enrollment: &Enrollment) -> Result<Enrollment, AppError> {
        self.put(&format!("/enrollments/{}", id), enrollment).await
    }

    async fn delete_enrollment(&self, id: i32) -> Result<(), AppError> {
        self.delete(&format!("/enrollments/{}", id)).await
    }

    async fn enrollments_by_student(&self, student_id: i32) -> Result<Vec<Enrollment>, AppError> {
        self.get(&format!("/enrollments/student/{}", student_id)).await
    }

    async fn enrollments_by_course(&self, course_id: i32) -> Result<Vec<Enrollment>, AppError> {
        self.get(&format!("/enrollments/course/{}", course_id)).await
    }
}

#[async_trait]
impl AssignmentApi for LmsHttpClient {
    async fn list_assignments(&self) -> Result<Vec<Assignment>, AppError> {
        self.get("/assignments").await
    }

    async fn create_assignment(&self, req: &NewAssignmentRequest) -> Result<Assignment, AppError> {
        self.post("/assignments", req).await
    }

    async fn update_assignment(
        &self,
        id: i32,
        req: &NewAssignmentRequest,
    ) -> Result<Assignment, AppError> {
        self.put(&format!("/assignments/{}", id), req).await
    }

    async fn delete_assignment(&self, id: i32) -> Result<(), AppError> {
        self.delete(&format!("/assignments/{}", id)).await
    }

    async fn assignments_by_course(&self, course_id: i32) -> Result<Vec<Assignment>, AppError> {
        self.get(&format!("/assignments/course/{}", course_id)).await
    }
}

#[async_trait]
impl SubmissionApi for LmsHttpClient {
    async fn create_submission(&self, req: &SubmissionRequest) -> Result<Submission, AppError> {
        self.post("/submissions", req).await
    }

    async fn update_submission(&self, id: i32, req: &SubmissionRequest) -> Result<Submission, AppError> {
        self.put(&format!("/submissions/{}", id), req).await
    }

    async fn save_submission(&self, submission: &Submission) -> Result<Submission, AppError> {
        self.put(&format!("/submissions/{}", submission.submission_id), submission)
            .await
    }

    async fn delete_submission(&self, id: i32) -> Result<(), AppError> {
        self.delete(&format!("/submissions/{}", id)).await
    }

    async fn submissions_by_assignment(&self, assignment_id: i32) -> Result<Vec<Submission>, AppError> {
        self.get(&format!("/submissions/assignment/{}", assignment_id)).await
    }

    async fn submissions_by_student(&self, student_id: i32) -> Result<Vec<Submission>, AppError> {
        self.get(&format!("/submissions/student/{}", student_id)).await
    }
}

#[async_trait]
impl AnnouncementApi for LmsHttpClient {
    async fn list_announcements(&self) -> Result<Vec<Announcement>, AppError> {
        self.get("/announcements").await
    }

    async fn create_announcement(&self, req: &NewAnnouncementRequest) -> Result<Announcement, AppError> {
        self.post("/announcements", req).await
    }

    async fn update_announcement(
        &self,
        id: i32,
        req: &NewAnnouncementRequest,
    ) -> Result<Announcement, AppError> {
        self.put(&format!("/announcements/{}", id), req).await
    }

    async fn delete_announcement(&self, id: i32) -> Result<(), AppError> {
        self.delete(&format!("/announcements/{}", id)).await
    }

    async fn announcements_by_course(&self, course_id: i32) -> Result<Vec<Announcement>, AppError> {
        self.get(&format!("/announcements/course/{}", course_id)).await
    }
}

#[async_trait]
impl PeriodApi for LmsHttpClient {
    async fn list_periods(&self) -> Result<Vec<RegistrationPeriod>, AppError> {
        self.get("/registration-periods").await
    }

    async fn get_period(&self, id: i32) -> Result<RegistrationPeriod, AppError> {
        self.get(&format!("/registration-periods/{}", id)).await
    }

    async fn active_periods(&self) -> Result<Vec<RegistrationPeriod>, AppError> {
        self.get("/registration-periods/active").await
    }

    async fn create_period(&self, req: &NewPeriodRequest) -> Result<RegistrationPeriod, AppError> {
        self.post("/registration-periods", req).await
    }

    async fn update_period(&self, id: i32, req: &NewPeriodRequest) -> Result<RegistrationPeriod, AppError> {
        self.put(&format!("/registration-periods/{}", id), req).await
    }

    async fn delete_period(&self, id: i32) -> Result<(), AppError> {
        self.delete(&format!("/registration-periods/{}", id)).await
    }

    async fn period_courses(&self, period_id: i32) -> Result<Vec<Course>, AppError> {
        self.get(&format!("/registration-periods/{}/courses", period_id))
            .await
    }

    async fn replace_period_courses(&self, period_id: i32, course_ids: &[i32]) -> Result<(), AppError> {
        // Server answers with a {"message": ...} acknowledgement.
        let _: serde_json::Value = self
            .put(&format!("/registration-periods/{}/courses", period_id), course_ids)
            .await?;
        Ok(())
    }

    async fn period_details(&self, period_id: i32) -> Result<PeriodDetails, AppError> {
        self.get(&format!("/registration-periods/{}/details", period_id))
            .await
    }
}

#[async_trait]
impl AdminApi for LmsHttpClient {
    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.get("/users").await
    }

    async fn get_user(&self, id: i32) -> Result<User, AppError> {
        self.get(&format!("/users/{}", id)).await
    }

    async fn update_user_role(&self, id: i32, role: Role) -> Result<User, AppError> {
        self.put(&format!("/users/{}/role", id), &UpdateRoleRequest { role })
            .await
    }

    async fn delete_user(&self, id: i32) -> Result<(), AppError> {
        self.delete(&format!("/users/{}", id)).await
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, AppError> {
        self.get("/dashboard/stats").await
    }
}
