use std::collections::HashMap;
use std::fmt;

use crate::api::{AdminApi, CourseApi, EnrollmentApi, PeriodApi};
use crate::error::AppError;
use crate::models::*;

/// The logged-in user, by role. Role-specific behavior dispatches on this
/// instead of comparing role strings at each call site.
#[derive(Debug, Clone, PartialEq)]
pub enum Viewer {
    Admin(User),
    Instructor { user: User, instructor_id: Option<i32> },
    Student { user: User, student_id: Option<i32> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Overview,
    Courses,
    Instructors,
    Enrollments,
    Administration,
}

impl Viewer {
    pub fn from_user(user: &User) -> Self {
        match user.role {
            Role::Admin => Viewer::Admin(user.clone()),
            Role::Instructor => Viewer::Instructor {
                user: user.clone(),
                instructor_id: user.reference_id,
            },
            Role::Student => Viewer::Student {
                user: user.clone(),
                student_id: user.reference_id,
            },
        }
    }

    pub fn user(&self) -> &User {
        match self {
            Viewer::Admin(user) => user,
            Viewer::Instructor { user, .. } => user,
            Viewer::Student { user, .. } => user,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Viewer::Admin(_) => Role::Admin,
            Viewer::Instructor { .. } => Role::Instructor,
            Viewer::Student { .. } => Role::Student,
        }
    }

    /// Assignments, announcements and enrollment records of a course.
    pub fn can_edit_course_content(&self) -> bool {
        matches!(self, Viewer::Admin(_) | Viewer::Instructor { .. })
    }

    pub fn can_grade(&self) -> bool {
        self.can_edit_course_content()
    }

    pub fn can_enroll(&self) -> bool {
        matches!(self, Viewer::Student { .. })
    }

    pub fn can_submit(&self) -> bool {
        matches!(self, Viewer::Student { .. })
    }

    pub fn can_manage_users(&self) -> bool {
        matches!(self, Viewer::Admin(_))
    }

    pub fn can_manage_periods(&self) -> bool {
        matches!(self, Viewer::Admin(_))
    }

    pub fn sections(&self) -> Vec<Section> {
        let mut sections = vec![
            Section::Overview,
            Section::Courses,
            Section::Instructors,
            Section::Enrollments,
        ];
        if self.can_manage_users() {
            sections.push(Section::Administration);
        }
        sections
    }

    /// The student record behind this account, required by enrollment and
    /// submission flows.
    pub fn student_id(&self) -> Result<i32, AppError> {
        match self {
            Viewer::Student {
                student_id: Some(id),
                ..
            } => Ok(*id),
            Viewer::Student { user, .. } => Err(AppError::Workflow(format!(
                "Account {} is not linked to a student record",
                user.username
            ))),
            _ => Err(AppError::Workflow("Only students can do this".to_string())),
        }
    }

    pub fn require(&self, allowed: bool, action: &str) -> Result<(), AppError> {
        if allowed {
            Ok(())
        } else {
            Err(AppError::Workflow(format!(
                "{} cannot {}",
                self.role().as_str().to_lowercase(),
                action
            )))
        }
    }

    pub async fn dashboard<A>(&self, api: &A) -> Result<Dashboard, AppError>
    where
        A: AdminApi + CourseApi + EnrollmentApi + PeriodApi + ?Sized,
    {
        match self {
            Viewer::Admin(_) => admin_dashboard(api).await,
            Viewer::Instructor { instructor_id, .. } => instructor_dashboard(api, *instructor_id).await,
            Viewer::Student { .. } => student_dashboard(api, self.student_id()?).await,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Dashboard {
    Admin {
        stats: DashboardStats,
        users_by_role: Vec<(Role, usize)>,
    },
    Instructor {
        courses: Vec<Course>,
    },
    Student {
        enrollments: Vec<(Enrollment, Option<Course>)>,
        open_periods: Vec<RegistrationPeriod>,
    },
}

async fn admin_dashboard<A: AdminApi + ?Sized>(api: &A) -> Result<Dashboard, AppError> {
    let (stats, users) = tokio::try_join!(api.dashboard_stats(), api.list_users())?;
    let users_by_role = [Role::Admin, Role::Instructor, Role::Student]
        .into_iter()
        .map(|role| (role, users.iter().filter(|u| u.role == role).count()))
        .collect();
    Ok(Dashboard::Admin {
        stats,
        users_by_role,
    })
}

async fn instructor_dashboard<A: CourseApi + ?Sized>(
    api: &A,
    instructor_id: Option<i32>,
) -> Result<Dashboard, AppError> {
    let courses = match instructor_id {
        Some(id) => api.courses_by_instructor(id).await?,
        None => Vec::new(),
    };
    Ok(Dashboard::Instructor { courses })
}

async fn student_dashboard<A>(api: &A, student_id: i32) -> Result<Dashboard, AppError>
where
    A: CourseApi + EnrollmentApi + PeriodApi + ?Sized,
{
    let (enrollments, courses, open_periods) = tokio::try_join!(
        api.enrollments_by_student(student_id),
        api.list_courses(),
        api.active_periods(),
    )?;
    let by_id: HashMap<i32, Course> = courses.into_iter().map(|c| (c.course_id, c)).collect();
    let enrollments = enrollments
        .into_iter()
        .map(|e| {
            let course = by_id.get(&e.course_id).cloned();
            (e, course)
        })
        .collect();
    Ok(Dashboard::Student {
        enrollments,
        open_periods,
    })
}

impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dashboard::Admin {
                stats,
                users_by_role,
            } => {
                writeln!(f, "Courses:      {}", stats.total_courses)?;
                writeln!(f, "Students:     {}", stats.total_students)?;
                writeln!(f, "Assignments:  {}", stats.total_assignments)?;
                writeln!(f, "Enrollments:  {}", stats.total_enrollments)?;
                for (role, count) in users_by_role {
                    writeln!(f, "{:<13} {}", format!("{} users:", role), count)?;
                }
                Ok(())
            }
            Dashboard::Instructor { courses } => {
                if courses.is_empty() {
                    return writeln!(f, "No courses assigned.");
                }
                for course in courses {
                    writeln!(
                        f,
                        "[{}] {} {} ({:?})",
                        course.course_id, course.course_code, course.course_name, course.status
                    )?;
                }
                Ok(())
            }
            Dashboard::Student {
                enrollments,
                open_periods,
            } => {
                writeln!(f, "Enrolled courses:")?;
                if enrollments.is_empty() {
                    writeln!(f, "  (none)")?;
                }
                for (enrollment, course) in enrollments {
                    let name = course
                        .as_ref()
                        .map(|c| format!("{} {}", c.course_code, c.course_name))
                        .unwrap_or_else(|| format!("course #{}", enrollment.course_id));
                    writeln!(
                        f,
                        "  {} - {:?}, payment {:?}",
                        name, enrollment.completion_status, enrollment.payment_status
                    )?;
                }
                writeln!(f, "Open registration periods: {}", open_periods.len())?;
                for period in open_periods {
                    writeln!(
                        f,
                        "  [{}] {} ({} .. {})",
                        period.period_id, period.period_name, period.start_date, period.end_date
                    )?;
                }
                Ok(())
            }
        }
    }
}
