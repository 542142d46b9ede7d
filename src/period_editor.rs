use std::sync::Arc;

use tracing::info;

use crate::api::{CourseApi, PeriodApi};
use crate::error::AppError;
use crate::forms::PeriodDraft;
use crate::models::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodEditorStep {
    Info,
    Courses,
}

/// Admin wizard for creating or editing a registration period and the set
/// of courses offered in it.
pub struct PeriodEditor<A: PeriodApi + CourseApi + ?Sized> {
    api: Arc<A>,
    editing: Option<i32>,
    step: PeriodEditorStep,
    pub draft: PeriodDraft,
    candidates: Vec<Course>,
    selected: Vec<i32>,
    banner: Option<String>,
}

impl<A: PeriodApi + CourseApi + ?Sized> PeriodEditor<A> {
    /// Empty wizard for a new period.
    pub async fn create(api: Arc<A>) -> Result<Self, AppError> {
        let candidates = active_courses(api.as_ref()).await?;
        Ok(Self {
            api,
            editing: None,
            step: PeriodEditorStep::Info,
            draft: PeriodDraft::default(),
            candidates,
            selected: Vec::new(),
            banner: None,
        })
    }

    /// Wizard pre-filled from an existing period and its current courses.
    pub async fn edit(api: Arc<A>, period: &RegistrationPeriod) -> Result<Self, AppError> {
        let candidates = active_courses(api.as_ref()).await?;
        // An unreadable course list starts the selection empty.
        let selected = match api.period_courses(period.period_id).await {
            Ok(courses) => courses.into_iter().map(|c| c.course_id).collect(),
            Err(e) => {
                tracing::warn!("could not load courses of period {}: {}", period.period_id, e);
                Vec::new()
            }
        };
        Ok(Self {
            api,
            editing: Some(period.period_id),
            step: PeriodEditorStep::Info,
            draft: PeriodDraft::from_period(period),
            candidates,
            selected,
            banner: None,
        })
    }

    /// Wizard for the period with `period_id`, read through the details
    /// endpoint. Falls back to the plain period record when that fails.
    pub async fn open(api: Arc<A>, period_id: i32) -> Result<Self, AppError> {
        let details = match api.period_details(period_id).await {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!("could not load details of period {}: {}", period_id, e);
                let period = api.get_period(period_id).await?;
                return Self::edit(api, &period).await;
            }
        };
        let candidates = active_courses(api.as_ref()).await?;
        let selected = if details.course_ids.is_empty() {
            details.courses.iter().map(|c| c.course_id).collect()
        } else {
            details.course_ids
        };
        Ok(Self {
            api,
            editing: Some(period_id),
            step: PeriodEditorStep::Info,
            draft: PeriodDraft::from_period(&details.period),
            candidates,
            selected,
            banner: None,
        })
    }

    pub fn step(&self) -> PeriodEditorStep {
        self.step
    }

    pub fn candidates(&self) -> &[Course] {
        &self.candidates
    }

    pub fn selected_ids(&self) -> &[i32] {
        &self.selected
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn next(&mut self) -> Result<(), AppError> {
        if self.step != PeriodEditorStep::Info {
            return Ok(());
        }
        if let Err(e) = self.draft.to_payload() {
            self.banner = Some(e.banner());
            return Err(e);
        }
        self.banner = None;
        self.step = PeriodEditorStep::Courses;
        Ok(())
    }

    pub fn back(&mut self) {
        self.step = PeriodEditorStep::Info;
    }

    fn is_candidate(&self, course_id: i32) -> bool {
        self.candidates.iter().any(|c| c.course_id == course_id)
    }

    /// Flips one course in or out of the selection. Only candidates can be
    /// added; a preloaded course that is no longer active can still be
    /// removed. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, course_id: i32) -> bool {
        if let Some(pos) = self.selected.iter().position(|id| *id == course_id) {
            self.selected.remove(pos);
            false
        } else if self.is_candidate(course_id) {
            self.selected.push(course_id);
            true
        } else {
            false
        }
    }

    /// Selects exactly the candidates, or clears the selection when every
    /// candidate is already selected.
    pub fn toggle_all(&mut self) {
        let all_selected = self
            .candidates
            .iter()
            .all(|c| self.selected.contains(&c.course_id));
        if all_selected {
            self.selected.clear();
        } else {
            self.selected = self.candidates.iter().map(|c| c.course_id).collect();
        }
    }

    /// Creates or updates the period, then replaces its course list with the
    /// full selection.
    pub async fn save(&mut self) -> Result<RegistrationPeriod, AppError> {
        let result = self.try_save().await;
        if let Err(e) = &result {
            self.banner = Some(e.banner());
        }
        result
    }

    async fn try_save(&self) -> Result<RegistrationPeriod, AppError> {
        let req = self.draft.to_payload()?;
        if self.selected.is_empty() {
            return Err(AppError::Workflow("Select at least one course".to_string()));
        }

        let period = match self.editing {
            Some(id) => self.api.update_period(id, &req).await?,
            None => self.api.create_period(&req).await?,
        };
        self.api
            .replace_period_courses(period.period_id, &self.selected)
            .await?;
        info!(
            "saved period {} with {} courses",
            period.period_name,
            self.selected.len()
        );
        Ok(period)
    }
}

async fn active_courses<A: CourseApi + ?Sized>(api: &A) -> Result<Vec<Course>, AppError> {
    let courses = api.list_courses().await?;
    Ok(courses
        .into_iter()
        .filter(|c| c.status == CourseStatus::Active)
        .collect())
}
