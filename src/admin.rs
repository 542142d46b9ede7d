use std::sync::Arc;

use tracing::info;

use crate::api::{AdminApi, AnnouncementApi, AssignmentApi, CourseApi, EnrollmentApi, InstructorApi, PeriodApi};
use crate::error::AppError;
use crate::forms::{CourseDraft, InstructorDraft};
use crate::models::*;
use crate::viewer::Viewer;

/// Account administration. Admin only.
pub struct UserAdmin<A: AdminApi + ?Sized> {
    api: Arc<A>,
    current_user_id: i32,
    users: Vec<User>,
}

impl<A: AdminApi + ?Sized> UserAdmin<A> {
    pub async fn open(api: Arc<A>, viewer: &Viewer) -> Result<Self, AppError> {
        viewer.require(viewer.can_manage_users(), "manage users")?;
        let users = api.list_users().await?;
        Ok(Self {
            api,
            current_user_id: viewer.user().user_id,
            users,
        })
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Case-insensitive match on username, full name or email, optionally
    /// narrowed to one role.
    pub fn filter(&self, query: &str, role: Option<Role>) -> Vec<&User> {
        let query = query.trim().to_lowercase();
        self.users
            .iter()
            .filter(|u| role.is_none_or(|r| u.role == r))
            .filter(|u| {
                query.is_empty()
                    || u.username.to_lowercase().contains(&query)
                    || u.full_name.as_deref().is_some_and(|n| n.to_lowercase().contains(&query))
                    || u.email.as_deref().is_some_and(|e| e.to_lowercase().contains(&query))
            })
            .collect()
    }

    pub fn count_by_role(&self, role: Role) -> usize {
        self.users.iter().filter(|u| u.role == role).count()
    }

    pub async fn change_role(&mut self, user_id: i32, role: Role) -> Result<(), AppError> {
        self.api.update_user_role(user_id, role).await?;
        if let Some(user) = self.users.iter_mut().find(|u| u.user_id == user_id) {
            user.role = role;
        }
        info!("changed role of user {} to {}", user_id, role);
        Ok(())
    }

    /// Refetches one account and replaces its cached row.
    pub async fn refresh(&mut self, user_id: i32) -> Result<&User, AppError> {
        let fresh = self.api.get_user(user_id).await?;
        let pos = match self.users.iter().position(|u| u.user_id == user_id) {
            Some(pos) => {
                self.users[pos] = fresh;
                pos
            }
            None => {
                self.users.push(fresh);
                self.users.len() - 1
            }
        };
        Ok(&self.users[pos])
    }

    pub async fn delete(&mut self, user_id: i32) -> Result<(), AppError> {
        if user_id == self.current_user_id {
            return Err(AppError::Workflow("You cannot delete your own account".to_string()));
        }
        self.api.delete_user(user_id).await?;
        self.users.retain(|u| u.user_id != user_id);
        info!("deleted user {}", user_id);
        Ok(())
    }
}

pub async fn save_course<A: CourseApi + ?Sized>(
    api: &A,
    viewer: &Viewer,
    editing: Option<i32>,
    draft: &CourseDraft,
) -> Result<Course, AppError> {
    viewer.require(viewer.can_edit_course_content(), "edit courses")?;
    let req = draft.to_payload()?;
    let course = match editing {
        Some(id) => api.update_course(id, &req).await?,
        None => api.create_course(&req).await?,
    };
    info!("saved course {} ({})", course.course_code, course.course_id);
    Ok(course)
}

pub async fn delete_course<A: CourseApi + ?Sized>(
    api: &A,
    viewer: &Viewer,
    course_id: i32,
) -> Result<(), AppError> {
    viewer.require(viewer.can_manage_users(), "delete courses")?;
    api.delete_course(course_id).await?;
    info!("deleted course {}", course_id);
    Ok(())
}

pub async fn save_instructor<A: InstructorApi + ?Sized>(
    api: &A,
    viewer: &Viewer,
    editing: Option<i32>,
    draft: &InstructorDraft,
) -> Result<Instructor, AppError> {
    viewer.require(viewer.can_manage_users(), "edit instructors")?;
    let req = draft.to_payload()?;
    let instructor = match editing {
        Some(id) => api.update_instructor(id, &req).await?,
        None => api.create_instructor(&req).await?,
    };
    info!("saved instructor {} ({})", instructor.full_name, instructor.instructor_id);
    Ok(instructor)
}

/// One instructor with the courses they teach.
pub async fn instructor_profile<A: InstructorApi + CourseApi + ?Sized>(
    api: &A,
    instructor_id: i32,
) -> Result<(Instructor, Vec<Course>), AppError> {
    tokio::try_join!(
        api.get_instructor(instructor_id),
        api.courses_by_instructor(instructor_id),
    )
}

pub async fn delete_instructor<A: InstructorApi + ?Sized>(
    api: &A,
    viewer: &Viewer,
    instructor_id: i32,
) -> Result<(), AppError> {
    viewer.require(viewer.can_manage_users(), "delete instructors")?;
    api.delete_instructor(instructor_id).await?;
    info!("deleted instructor {}", instructor_id);
    Ok(())
}

/// Every registration period, whatever its status.
pub async fn all_periods<A: PeriodApi + ?Sized>(
    api: &A,
    viewer: &Viewer,
) -> Result<Vec<RegistrationPeriod>, AppError> {
    viewer.require(viewer.can_manage_periods(), "manage registration periods")?;
    api.list_periods().await
}

pub async fn delete_period<A: PeriodApi + ?Sized>(
    api: &A,
    viewer: &Viewer,
    period_id: i32,
) -> Result<(), AppError> {
    viewer.require(viewer.can_manage_periods(), "delete registration periods")?;
    api.delete_period(period_id).await?;
    info!("deleted registration period {}", period_id);
    Ok(())
}

/// Enrollments across all courses, optionally narrowed to one student.
pub async fn all_enrollments<A: EnrollmentApi + ?Sized>(
    api: &A,
    viewer: &Viewer,
    student_id: Option<i32>,
) -> Result<Vec<Enrollment>, AppError> {
    viewer.require(viewer.can_manage_users(), "view all enrollments")?;
    let enrollments = api.list_enrollments().await?;
    Ok(enrollments
        .into_iter()
        .filter(|e| student_id.is_none_or(|id| e.student_id == id))
        .collect())
}

/// Assignments across every course, soonest due first. Undated ones go last.
pub async fn all_assignments<A: AssignmentApi + ?Sized>(
    api: &A,
    viewer: &Viewer,
) -> Result<Vec<Assignment>, AppError> {
    viewer.require(viewer.can_edit_course_content(), "list all assignments")?;
    let mut assignments = api.list_assignments().await?;
    assignments.sort_by_key(|a| (a.due_date.is_none(), a.due_date));
    Ok(assignments)
}

/// Announcements across every course, newest first.
pub async fn all_announcements<A: AnnouncementApi + ?Sized>(
    api: &A,
) -> Result<Vec<Announcement>, AppError> {
    let mut announcements = api.list_announcements().await?;
    announcements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(announcements)
}
