mod common;

use std::sync::Arc;

use common::*;
use lms_client::error::AppError;
use lms_client::models::*;
use lms_client::registration::{RegistrationStep, RegistrationWorkflow, available_courses};
use lms_client::viewer::Viewer;

const STUDENT: i32 = 7;

/// Period 1 offers courses 10..=13; the student already holds course 11.
fn seeded() -> Arc<FakeLms> {
    let mut state = FakeState::default();
    state.courses = vec![
        course(10, "CS101", Some(1_500_000.0)),
        course(11, "CS102", Some(1_200_000.0)),
        course(12, "MA201", None),
        course(13, "EN110", Some(800_000.0)),
    ];
    state.periods = vec![period(1, "Spring-2025"), period(2, "Summer-2025")];
    state.period_courses.insert(1, vec![10, 11, 12, 13]);
    state.enrollments = vec![enrollment(500, STUDENT, 11), enrollment(501, 99, 10)];
    Arc::new(FakeLms::new(state))
}

async fn at_course_selection(api: &Arc<FakeLms>) -> RegistrationWorkflow<FakeLms> {
    let mut flow = RegistrationWorkflow::new(api.clone(), STUDENT).with_enrollment_date(date(2025, 1, 6));
    flow.load_periods().await.expect("Failed to load periods");
    flow.select_period(1).await.expect("Failed to select period");
    flow
}

#[test]
fn available_excludes_enrolled_courses_and_keeps_order() {
    let period_courses = vec![
        course(3, "C", None),
        course(1, "A", None),
        course(2, "B", None),
    ];
    let enrollments = vec![enrollment(1, STUDENT, 1), enrollment(2, STUDENT, 42)];

    let ids: Vec<i32> = available_courses(period_courses, &enrollments)
        .iter()
        .map(|c| c.course_id)
        .collect();

    assert_eq!(ids, vec![3, 2]);
}

#[tokio::test]
async fn test_available_set_is_period_minus_own_enrollments() {
    let api = seeded();
    let flow = at_course_selection(&api).await;

    assert_eq!(flow.step(), RegistrationStep::SelectingCourses);
    let ids: Vec<i32> = flow.available().iter().map(|c| c.course_id).collect();
    // Another student's enrollment in 10 does not hide it.
    assert_eq!(ids, vec![10, 12, 13]);
    assert_eq!(flow.period().map(|p| p.period_name.as_str()), Some("Spring-2025"));
}

#[tokio::test]
async fn test_enrolled_course_cannot_be_toggled() {
    let api = seeded();
    let mut flow = at_course_selection(&api).await;

    assert!(!flow.toggle(11));
    assert!(!flow.toggle(404));
    assert!(flow.selected_ids().is_empty());
}

#[tokio::test]
async fn test_next_with_nothing_selected_stays_put() {
    let api = seeded();
    let mut flow = at_course_selection(&api).await;

    let err = flow.next().expect_err("empty selection must not advance");

    assert!(matches!(err, AppError::Workflow(_)));
    assert_eq!(flow.step(), RegistrationStep::SelectingCourses);
    let banner = flow.banner().expect("banner should be set");
    assert!(!banner.trim().is_empty());

    // Selecting and deselecting again is still zero.
    flow.toggle(10);
    flow.toggle(10);
    assert!(flow.next().is_err());
    assert_eq!(flow.step(), RegistrationStep::SelectingCourses);
}

#[tokio::test]
async fn test_total_price_tracks_toggles_and_treats_missing_as_zero() {
    let api = seeded();
    let mut flow = at_course_selection(&api).await;

    assert_eq!(flow.total_price(), 0.0);

    flow.toggle(10);
    assert_eq!(flow.total_price(), 1_500_000.0);

    flow.toggle(12);
    assert_eq!(flow.total_price(), 1_500_000.0);

    flow.toggle(13);
    assert_eq!(flow.total_price(), 2_300_000.0);

    flow.toggle(10);
    assert_eq!(flow.total_price(), 800_000.0);

    flow.toggle_all();
    assert_eq!(flow.selected_ids().len(), 3);
    assert_eq!(flow.total_price(), 2_300_000.0);

    flow.toggle_all();
    assert!(flow.selected_ids().is_empty());
    assert_eq!(flow.total_price(), 0.0);
}

#[tokio::test]
async fn test_fall_2024_end_to_end() {
    let mut state = FakeState::default();
    state.courses = vec![course(1, "A", Some(1_000_000.0)), course(2, "B", Some(0.0))];
    state.periods = vec![period(9, "Fall-2024")];
    state.period_courses.insert(9, vec![1, 2]);
    let api = Arc::new(FakeLms::new(state));

    let mut flow = RegistrationWorkflow::new(api.clone(), STUDENT);
    flow.load_periods().await.expect("Failed to load periods");
    flow.select_period(9).await.expect("Failed to select period");
    flow.toggle_all();
    flow.next().expect("selection is not empty");

    assert_eq!(flow.step(), RegistrationStep::Confirming);
    assert_eq!(flow.total_price(), 1_000_000.0);

    let report = flow.confirm().await.expect("confirm should run");

    assert!(report.is_success());
    assert_eq!(report.committed, vec![1, 2]);
    assert_eq!(flow.step(), RegistrationStep::Done);
    assert_eq!(
        api.calls_to("create_enrollment"),
        vec!["create_enrollment 1", "create_enrollment 2"]
    );
    assert_eq!(flow.total_price(), 1_000_000.0);

    let created = api.lock().enrollments.clone();
    assert_eq!(created.len(), 2);
    assert!(created.iter().all(|e| e.student_id == STUDENT && e.period_id == Some(9)));
    assert!(created.iter().all(|e| e.completion_status == CompletionStatus::Enrolled
        && e.payment_status == PaymentStatus::Pending));
}

#[tokio::test]
async fn test_failure_stops_at_ith_course() {
    for failing in 1..=3usize {
        let api = seeded();
        let mut flow = at_course_selection(&api).await;
        let order = [13, 10, 12];
        for id in order {
            flow.toggle(id);
        }
        flow.next().expect("selection is not empty");
        api.lock().reject_enrollment_for.insert(order[failing - 1]);

        let report = flow.confirm().await.expect("confirm should run");

        let calls = api.calls_to("create_enrollment");
        assert_eq!(calls.len(), failing, "call count for failure at {}", failing);
        assert_eq!(report.committed, order[..failing - 1].to_vec());
        let failure = report.failure.expect("failure recorded");
        assert_eq!(failure.course_id, order[failing - 1]);
        assert_eq!(failure.message, "Course is full");
        assert_eq!(flow.step(), RegistrationStep::Confirming);
        assert!(flow.banner().is_some_and(|b| b.contains("Course is full")));
    }
}

#[tokio::test]
async fn test_retry_only_sends_uncommitted_courses() {
    let api = seeded();
    let mut flow = at_course_selection(&api).await;
    flow.toggle(10);
    flow.toggle(12);
    flow.toggle(13);
    flow.next().expect("selection is not empty");
    api.lock().reject_enrollment_for.insert(12);

    let first = flow.confirm().await.expect("confirm should run");
    assert_eq!(first.committed, vec![10]);
    assert!(flow.banner().is_some_and(|b| b.contains("CS101")));

    api.lock().reject_enrollment_for.clear();
    let second = flow.confirm().await.expect("retry should run");

    assert!(second.is_success());
    assert_eq!(second.committed, vec![12, 13]);
    assert_eq!(flow.committed_ids(), &[10, 12, 13]);
    assert_eq!(flow.step(), RegistrationStep::Done);
    assert_eq!(
        api.calls_to("create_enrollment"),
        vec![
            "create_enrollment 10",
            "create_enrollment 12",
            "create_enrollment 12",
            "create_enrollment 13",
        ]
    );
}

#[tokio::test]
async fn test_back_after_partial_failure_drops_committed_courses() {
    let api = seeded();
    let mut flow = at_course_selection(&api).await;
    flow.toggle(10);
    flow.toggle(12);
    flow.next().expect("selection is not empty");
    api.lock().reject_enrollment_for.insert(12);
    let report = flow.confirm().await.expect("confirm should run");
    assert_eq!(report.committed, vec![10]);

    flow.back();

    assert_eq!(flow.step(), RegistrationStep::SelectingCourses);
    let ids: Vec<i32> = flow.available().iter().map(|c| c.course_id).collect();
    assert_eq!(ids, vec![12, 13]);
    assert_eq!(flow.selected_ids(), &[12]);
    assert_eq!(flow.total_price(), 0.0);
    assert!(flow.committed_ids().is_empty());
    assert!(!flow.toggle(10));

    api.lock().reject_enrollment_for.clear();
    flow.toggle(13);
    flow.next().expect("selection is not empty");
    let second = flow.confirm().await.expect("retry should run");
    assert_eq!(second.committed, vec![12, 13]);
    assert_eq!(
        api.calls_to("create_enrollment"),
        vec![
            "create_enrollment 10",
            "create_enrollment 12",
            "create_enrollment 12",
            "create_enrollment 13",
        ]
    );
}

#[tokio::test]
async fn test_select_never_deselects() {
    let api = seeded();
    let mut flow = at_course_selection(&api).await;

    assert!(flow.select(10));
    assert!(flow.select(10));
    assert!(flow.select(13));
    assert!(!flow.select(11));
    assert!(!flow.select(99));

    assert_eq!(flow.selected_ids(), &[10, 13]);
    assert_eq!(flow.total_price(), 2_300_000.0);
}

#[tokio::test]
async fn test_failed_course_fetch_keeps_period_step() {
    let api = seeded();
    let mut flow = RegistrationWorkflow::new(api.clone(), STUDENT);
    flow.load_periods().await.expect("Failed to load periods");
    api.lock().failing.insert("period_courses");

    let err = flow.select_period(1).await.expect_err("fetch failure should surface");

    assert!(matches!(err, AppError::Api { .. }));
    assert_eq!(flow.step(), RegistrationStep::SelectingPeriod);
    assert_eq!(flow.banner(), Some("period_courses failed"));
    assert!(flow.available().is_empty());
}

#[tokio::test]
async fn test_only_open_periods_can_be_picked() {
    let api = seeded();
    api.lock().periods[1].status = Some(PeriodStatus::Closed);
    let mut flow = RegistrationWorkflow::new(api.clone(), STUDENT);

    let periods = flow.load_periods().await.expect("Failed to load periods");
    assert_eq!(periods.len(), 1);

    assert!(flow.select_period(2).await.is_err());
    assert_eq!(flow.step(), RegistrationStep::SelectingPeriod);
    assert!(api.calls_to("period_courses").is_empty());
}

#[tokio::test]
async fn test_back_returns_through_steps() {
    let api = seeded();
    let mut flow = at_course_selection(&api).await;
    flow.toggle(10);
    flow.next().expect("selection is not empty");

    flow.back();
    assert_eq!(flow.step(), RegistrationStep::SelectingCourses);
    assert_eq!(flow.selected_ids(), &[10]);

    flow.back();
    assert_eq!(flow.step(), RegistrationStep::SelectingPeriod);
    assert!(flow.selected_ids().is_empty());
    assert!(flow.period().is_none());
}

#[tokio::test]
async fn test_only_students_with_a_record_can_register() {
    let api = seeded();

    let admin = Viewer::from_user(&user(1, "admin", Role::Admin, None));
    assert!(RegistrationWorkflow::for_viewer(api.clone(), &admin).is_err());

    let unlinked = Viewer::from_user(&user(2, "orphan", Role::Student, None));
    assert!(RegistrationWorkflow::for_viewer(api.clone(), &unlinked).is_err());

    let linked = Viewer::from_user(&user(3, "sv007", Role::Student, Some(STUDENT)));
    let flow = RegistrationWorkflow::for_viewer(api, &linked).expect("linked student");
    assert_eq!(flow.step(), RegistrationStep::SelectingPeriod);
}
