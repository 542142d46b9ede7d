//! Student course registration: pick an open period, pick courses from it,
//! confirm, then enroll in each picked course one request at a time.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use crate::api::{EnrollmentApi, PeriodApi};
use crate::error::AppError;
use crate::models::*;
use crate::viewer::Viewer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStep {
    SelectingPeriod,
    SelectingCourses,
    Confirming,
    Submitting,
    Done,
}

/// Courses of the period the student does not already hold an enrollment
/// for, in the period's order.
pub fn available_courses(period_courses: Vec<Course>, enrollments: &[Enrollment]) -> Vec<Course> {
    let enrolled: HashSet<i32> = enrollments.iter().map(|e| e.course_id).collect();
    period_courses
        .into_iter()
        .filter(|c| !enrolled.contains(&c.course_id))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitFailure {
    pub course_id: i32,
    pub message: String,
}

/// Result of one confirm attempt.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubmitReport {
    /// Courses enrolled by this attempt, in the order they were created.
    pub committed: Vec<i32>,
    /// First course whose create call failed. Nothing after it was sent.
    pub failure: Option<SubmitFailure>,
}

impl SubmitReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

pub struct RegistrationWorkflow<A: PeriodApi + EnrollmentApi + ?Sized> {
    api: Arc<A>,
    student_id: i32,
    step: RegistrationStep,
    periods: Vec<RegistrationPeriod>,
    period: Option<RegistrationPeriod>,
    available: Vec<Course>,
    selected: Vec<i32>,
    /// Courses already enrolled by earlier attempts against this period.
    committed: Vec<i32>,
    banner: Option<String>,
    today: NaiveDate,
}

impl<A: PeriodApi + EnrollmentApi + ?Sized> RegistrationWorkflow<A> {
    pub fn new(api: Arc<A>, student_id: i32) -> Self {
        Self {
            api,
            student_id,
            step: RegistrationStep::SelectingPeriod,
            periods: Vec::new(),
            period: None,
            available: Vec::new(),
            selected: Vec::new(),
            committed: Vec::new(),
            banner: None,
            today: Local::now().date_naive(),
        }
    }

    pub fn for_viewer(api: Arc<A>, viewer: &Viewer) -> Result<Self, AppError> {
        viewer.require(viewer.can_enroll(), "register for courses")?;
        Ok(Self::new(api, viewer.student_id()?))
    }

    /// Date stamped on created enrollments.
    pub fn with_enrollment_date(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn step(&self) -> RegistrationStep {
        self.step
    }

    pub fn periods(&self) -> &[RegistrationPeriod] {
        &self.periods
    }

    pub fn period(&self) -> Option<&RegistrationPeriod> {
        self.period.as_ref()
    }

    pub fn available(&self) -> &[Course] {
        &self.available
    }

    pub fn selected_ids(&self) -> &[i32] {
        &self.selected
    }

    pub fn committed_ids(&self) -> &[i32] {
        &self.committed
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    /// Selected courses in the order they were picked.
    pub fn selected_courses(&self) -> Vec<&Course> {
        self.selected
            .iter()
            .filter_map(|id| self.available.iter().find(|c| c.course_id == *id))
            .collect()
    }

    /// Display total for the current selection; never checked by the server.
    pub fn total_price(&self) -> f64 {
        self.selected_courses().iter().map(|c| c.price_or_zero()).sum()
    }

    fn fail<T>(&mut self, err: AppError) -> Result<T, AppError> {
        self.banner = Some(err.banner());
        Err(err)
    }

    fn expect_step(&self, expected: RegistrationStep, action: &str) -> Result<(), AppError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(AppError::Workflow(format!(
                "Cannot {} while in step {:?}",
                action, self.step
            )))
        }
    }

    pub async fn load_periods(&mut self) -> Result<&[RegistrationPeriod], AppError> {
        self.expect_step(RegistrationStep::SelectingPeriod, "load periods")?;
        match self.api.active_periods().await {
            Ok(periods) => {
                self.periods = periods;
                self.banner = None;
                Ok(&self.periods)
            }
            Err(e) => {
                warn!("failed to load open periods: {}", e);
                self.fail(e)
            }
        }
    }

    pub async fn select_period(&mut self, period_id: i32) -> Result<(), AppError> {
        self.expect_step(RegistrationStep::SelectingPeriod, "pick a period")?;
        let Some(period) = self.periods.iter().find(|p| p.period_id == period_id).cloned() else {
            return self.fail(AppError::Workflow(format!(
                "Registration period {} is not open",
                period_id
            )));
        };

        let fetched = tokio::try_join!(
            self.api.period_courses(period_id),
            self.api.enrollments_by_student(self.student_id),
        );
        let (period_courses, enrollments) = match fetched {
            Ok(pair) => pair,
            Err(e) => {
                warn!("failed to load courses for period {}: {}", period_id, e);
                return self.fail(e);
            }
        };

        self.available = available_courses(period_courses, &enrollments);
        info!(
            "period {} selected: {} of its courses available to student {}",
            period.period_name,
            self.available.len(),
            self.student_id
        );
        self.period = Some(period);
        self.selected.clear();
        self.committed.clear();
        self.banner = None;
        self.step = RegistrationStep::SelectingCourses;
        Ok(())
    }

    /// Flips one course in or out of the selection. Returns whether it is
    /// selected afterwards; ids outside the available list are ignored.
    pub fn toggle(&mut self, course_id: i32) -> bool {
        if self.step != RegistrationStep::SelectingCourses
            || !self.available.iter().any(|c| c.course_id == course_id)
        {
            return false;
        }
        if let Some(pos) = self.selected.iter().position(|id| *id == course_id) {
            self.selected.remove(pos);
            false
        } else {
            self.selected.push(course_id);
            true
        }
    }

    /// Adds one course to the selection without ever removing it. Returns
    /// whether it is selected afterwards.
    pub fn select(&mut self, course_id: i32) -> bool {
        if self.selected.contains(&course_id) {
            return true;
        }
        self.toggle(course_id)
    }

    /// Selects everything available, or clears when everything already is.
    pub fn toggle_all(&mut self) {
        if self.step != RegistrationStep::SelectingCourses {
            return;
        }
        if self.selected.len() == self.available.len() {
            self.selected.clear();
        } else {
            self.selected = self.available.iter().map(|c| c.course_id).collect();
        }
    }

    pub fn next(&mut self) -> Result<(), AppError> {
        self.expect_step(RegistrationStep::SelectingCourses, "continue")?;
        if self.selected.is_empty() {
            return self.fail(AppError::Workflow(
                "Select at least one course to continue".to_string(),
            ));
        }
        self.banner = None;
        self.step = RegistrationStep::Confirming;
        Ok(())
    }

    pub fn back(&mut self) {
        match self.step {
            RegistrationStep::Confirming => {
                // Courses enrolled by an earlier attempt are no longer on offer.
                let committed = std::mem::take(&mut self.committed);
                self.available.retain(|c| !committed.contains(&c.course_id));
                self.selected.retain(|id| !committed.contains(id));
                self.step = RegistrationStep::SelectingCourses;
            }
            RegistrationStep::SelectingCourses => {
                self.period = None;
                self.available.clear();
                self.selected.clear();
                self.committed.clear();
                self.step = RegistrationStep::SelectingPeriod;
            }
            _ => {}
        }
        self.banner = None;
    }

    /// Enrolls in every selected course not yet committed, sequentially in
    /// selection order, stopping at the first failure. Enrollments created
    /// before a failure stay in place on the server.
    pub async fn confirm(&mut self) -> Result<SubmitReport, AppError> {
        self.expect_step(RegistrationStep::Confirming, "confirm")?;
        let period_id = self.period.as_ref().map(|p| p.period_id);
        self.step = RegistrationStep::Submitting;
        self.banner = None;

        let pending: Vec<i32> = self
            .selected
            .iter()
            .copied()
            .filter(|id| !self.committed.contains(id))
            .collect();

        let mut report = SubmitReport::default();
        for course_id in pending {
            let req = NewEnrollmentRequest {
                student_id: self.student_id,
                course_id,
                period_id,
                enrollment_date: self.today,
                completion_status: CompletionStatus::Enrolled,
                payment_status: PaymentStatus::Pending,
            };
            match self.api.create_enrollment(&req).await {
                Ok(enrollment) => {
                    info!(
                        "enrolled student {} in course {} (enrollment {})",
                        self.student_id, course_id, enrollment.enrollment_id
                    );
                    self.committed.push(course_id);
                    report.committed.push(course_id);
                }
                Err(e) => {
                    warn!("enrollment in course {} failed: {}", course_id, e);
                    report.failure = Some(SubmitFailure {
                        course_id,
                        message: e.banner(),
                    });
                    break;
                }
            }
        }

        match &report.failure {
            None => {
                self.step = RegistrationStep::Done;
            }
            Some(failure) => {
                self.banner = Some(self.failure_message(failure));
                self.step = RegistrationStep::Confirming;
            }
        }
        Ok(report)
    }

    fn failure_message(&self, failure: &SubmitFailure) -> String {
        let name = |id: i32| {
            self.available
                .iter()
                .find(|c| c.course_id == id)
                .map(|c| c.course_code.clone())
                .unwrap_or_else(|| format!("#{}", id))
        };
        let mut msg = format!("Enrollment in {} failed: {}", name(failure.course_id), failure.message);
        if !self.committed.is_empty() {
            let done: Vec<String> = self.committed.iter().map(|id| name(*id)).collect();
            msg.push_str(&format!(". Already enrolled: {}", done.join(", ")));
        }
        msg
    }
}
