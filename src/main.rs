use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lms_client::admin::{self, UserAdmin};
use lms_client::api::{AuthHeader, CourseApi, LmsApi, LmsHttpClient, PeriodApi};
use lms_client::config::ClientConfig;
use lms_client::course_detail::CourseDetailPage;
use lms_client::error::AppError;
use lms_client::forms::{GradeDraft, PeriodDraft, RegisterDraft, SubmissionDraft};
use lms_client::models::{Role, SubmissionStatus};
use lms_client::period_editor::PeriodEditor;
use lms_client::registration::{RegistrationStep, RegistrationWorkflow};
use lms_client::session::{SessionContext, SqliteSessionStore};
use lms_client::viewer::Viewer;

#[derive(Parser)]
#[command(name = "lms")]
#[command(about = "Command-line client for the course management backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session
    Login {
        username: String,
        #[arg(long, env = "LMS_PASSWORD")]
        password: String,
    },
    /// Create a student account and log in
    Register {
        #[arg(long)]
        username: String,
        #[arg(long, env = "LMS_PASSWORD")]
        password: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: String,
        #[arg(long, default_value = "")]
        phone: String,
        /// YYYY-MM-DD
        #[arg(long, default_value = "")]
        date_of_birth: String,
        #[arg(long, default_value = "")]
        address: String,
    },
    Logout,
    /// Show the logged-in account
    Whoami,
    /// Role-specific overview
    Dashboard,
    /// List all courses
    Courses,
    /// Show one course as the logged-in user sees it
    Course { id: i32 },
    /// List open registration periods
    Periods {
        /// Every period regardless of status (admin)
        #[arg(long)]
        all: bool,
    },
    /// Delete a registration period (admin)
    DeletePeriod { id: i32 },
    /// List enrollments across all courses (admin)
    Enrollments {
        #[arg(long)]
        student: Option<i32>,
    },
    /// Drop one enrollment from a course (admin)
    RemoveEnrollment {
        #[arg(long)]
        course: i32,
        enrollment: i32,
    },
    /// List assignments across all courses
    Assignments,
    /// List announcements across all courses
    Announcements,
    /// Enroll in courses of an open registration period
    Enroll {
        #[arg(long)]
        period: i32,
        #[arg(long = "course", required = true)]
        courses: Vec<i32>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Hand in (or update) an assignment
    Submit {
        #[arg(long)]
        course: i32,
        assignment: i32,
        #[arg(long, default_value = "")]
        content: String,
        /// Name of the attached file; the file itself is not uploaded
        #[arg(long, default_value = "")]
        file: String,
    },
    /// List submissions for an assignment
    Submissions {
        #[arg(long)]
        course: i32,
        assignment: i32,
    },
    /// Delete a submission
    DeleteSubmission {
        #[arg(long)]
        course: i32,
        submission: i32,
    },
    /// Grade a submission
    Grade {
        #[arg(long)]
        course: i32,
        #[arg(long)]
        assignment: i32,
        submission: i32,
        #[arg(long, default_value = "")]
        score: String,
        #[arg(long, default_value = "graded", value_parser = parse_submission_status)]
        status: SubmissionStatus,
    },
    /// Create or edit a registration period and its courses
    SavePeriod {
        /// Existing period to edit
        #[arg(long)]
        id: Option<i32>,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long = "course", required = true)]
        courses: Vec<i32>,
    },
    /// List user accounts
    Users {
        #[arg(long, default_value = "")]
        query: String,
    },
    /// Show one user account
    User { user_id: i32 },
    /// Show an instructor and the courses they teach
    Instructor { id: i32 },
    SetRole { user_id: i32, role: Role },
    DeleteUser { user_id: i32 },
}

fn parse_submission_status(raw: &str) -> Result<SubmissionStatus, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_lowercase()))
        .map_err(|_| format!("unknown status: {}", raw))
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "lms_client=info,lms=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e.banner());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = ClientConfig::new_from_env()?;
    debug!("using backend {}", config.api_base_url);

    let header = AuthHeader::new();
    let api: Arc<dyn LmsApi> = Arc::new(LmsHttpClient::new(&config, header.clone())?);
    let store = Arc::new(SqliteSessionStore::connect(&config.session_db_url).await?);
    let mut session = SessionContext::new(api.clone(), store, header);
    session.restore().await?;

    match cli.command {
        Commands::Login { username, password } => {
            let user = session.login(&username, &password).await?;
            println!("Logged in as {} ({})", user.display_name(), user.role);
        }
        Commands::Register {
            username,
            password,
            email,
            full_name,
            phone,
            date_of_birth,
            address,
        } => {
            let draft = RegisterDraft {
                username,
                confirm_password: password.clone(),
                password,
                email,
                full_name,
                phone,
                date_of_birth,
                address,
            };
            let user = session.register(&draft).await?;
            println!("Registered and logged in as {}", user.display_name());
        }
        Commands::Logout => {
            session.logout().await?;
            println!("Logged out");
        }
        Commands::Whoami => {
            let viewer = session.viewer()?;
            let user = viewer.user();
            println!("{} ({}) - {}", user.display_name(), user.username, user.role);
        }
        Commands::Dashboard => {
            let viewer = session.viewer()?;
            print!("{}", viewer.dashboard(api.as_ref()).await?);
        }
        Commands::Courses => {
            session.viewer()?;
            for course in api.list_courses().await? {
                println!(
                    "[{}] {} {} - {:?}, price {}",
                    course.course_id,
                    course.course_code,
                    course.course_name,
                    course.status,
                    course.price_or_zero()
                );
            }
        }
        Commands::Course { id } => {
            let page = CourseDetailPage::open(api.clone(), session.viewer()?, id).await?;
            print!("{}", page.render());
        }
        Commands::Periods { all } => {
            let viewer = session.viewer()?;
            let periods = if all {
                admin::all_periods(api.as_ref(), &viewer).await?
            } else {
                api.active_periods().await?
            };
            for period in periods {
                let status = period.status.map(|s| format!(" {:?}", s)).unwrap_or_default();
                println!(
                    "[{}] {} ({} .. {}){}",
                    period.period_id, period.period_name, period.start_date, period.end_date, status
                );
            }
        }
        Commands::DeletePeriod { id } => {
            admin::delete_period(api.as_ref(), &session.viewer()?, id).await?;
            println!("Period {} deleted", id);
        }
        Commands::Enrollments { student } => {
            for e in admin::all_enrollments(api.as_ref(), &session.viewer()?, student).await? {
                println!(
                    "[{}] student {} in course {} - {:?}, payment {:?}",
                    e.enrollment_id, e.student_id, e.course_id, e.completion_status, e.payment_status
                );
            }
        }
        Commands::RemoveEnrollment { course, enrollment } => {
            let mut page = CourseDetailPage::open(api.clone(), session.viewer()?, course).await?;
            page.remove_enrollment(enrollment).await?;
            println!("Enrollment {} removed", enrollment);
        }
        Commands::Assignments => {
            for a in admin::all_assignments(api.as_ref(), &session.viewer()?).await? {
                let due = a.due_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
                println!("[{}] course {} - {} (due {})", a.assignment_id, a.course_id, a.title, due);
            }
        }
        Commands::Announcements => {
            session.viewer()?;
            for a in admin::all_announcements(api.as_ref()).await? {
                println!("[{}] course {} - [{:?}] {}", a.announcement_id, a.course_id, a.priority, a.title);
            }
        }
        Commands::Enroll {
            period,
            courses,
            yes,
        } => enroll(api, &session.viewer()?, period, &courses, yes).await?,
        Commands::Submit {
            course,
            assignment,
            content,
            file,
        } => {
            let mut page = CourseDetailPage::open(api.clone(), session.viewer()?, course).await?;
            let draft = SubmissionDraft {
                content,
                file_name: file,
            };
            let saved = page.submit_assignment(assignment, &draft).await?;
            println!("Submission {} saved", saved.submission_id);
        }
        Commands::Submissions { course, assignment } => {
            let mut page = CourseDetailPage::open(api.clone(), session.viewer()?, course).await?;
            for entry in page.assignment_submissions(assignment).await? {
                let who = entry
                    .student
                    .map(|s| s.full_name)
                    .unwrap_or_else(|| format!("student #{}", entry.submission.student_id));
                println!(
                    "[{}] {} - {:?}, score {:?}, attachment {}",
                    entry.submission.submission_id,
                    who,
                    entry.submission.status,
                    entry.submission.score,
                    entry.submission.attachment.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::DeleteSubmission { course, submission } => {
            let mut page = CourseDetailPage::open(api.clone(), session.viewer()?, course).await?;
            page.delete_submission(submission).await?;
            println!("Submission {} deleted", submission);
        }
        Commands::Grade {
            course,
            assignment,
            submission,
            score,
            status,
        } => {
            let mut page = CourseDetailPage::open(api.clone(), session.viewer()?, course).await?;
            let target = page
                .assignment_submissions(assignment)
                .await?
                .into_iter()
                .map(|e| e.submission)
                .find(|s| s.submission_id == submission)
                .ok_or(AppError::NotFound)?;
            let saved = page.grade(&target, &GradeDraft { score, status }).await?;
            println!("Submission {} is now {:?} ({:?})", saved.submission_id, saved.status, saved.score);
        }
        Commands::SavePeriod {
            id,
            name,
            description,
            start,
            end,
            courses,
        } => {
            let viewer = session.viewer()?;
            viewer.require(viewer.can_manage_periods(), "manage registration periods")?;
            let mut editor = match id {
                Some(id) => PeriodEditor::open(api.clone(), id).await?,
                None => PeriodEditor::create(api.clone()).await?,
            };
            editor.draft = PeriodDraft {
                period_name: name,
                description,
                start_date: start,
                end_date: end,
            };
            editor.next()?;
            let wanted: Vec<i32> = courses;
            for course_id in editor.selected_ids().to_vec() {
                if !wanted.contains(&course_id) {
                    editor.toggle(course_id);
                }
            }
            for course_id in wanted {
                if !editor.selected_ids().contains(&course_id) && !editor.toggle(course_id) {
                    println!("Course {} is not active, skipped", course_id);
                }
            }
            let period = editor.save().await?;
            println!("Saved period {} [{}]", period.period_name, period.period_id);
        }
        Commands::Users { query } => {
            let admin = UserAdmin::open(api.clone(), &session.viewer()?).await?;
            for user in admin.filter(&query, None) {
                println!(
                    "[{}] {} {} - {}",
                    user.user_id,
                    user.username,
                    user.email.as_deref().unwrap_or("-"),
                    user.role
                );
            }
        }
        Commands::User { user_id } => {
            let mut admin = UserAdmin::open(api.clone(), &session.viewer()?).await?;
            let user = admin.refresh(user_id).await?;
            println!(
                "[{}] {} ({}) {} - {}",
                user.user_id,
                user.username,
                user.display_name(),
                user.email.as_deref().unwrap_or("-"),
                user.role
            );
        }
        Commands::Instructor { id } => {
            session.viewer()?;
            let (instructor, courses) = admin::instructor_profile(api.as_ref(), id).await?;
            println!(
                "[{}] {} <{}> {}",
                instructor.instructor_id,
                instructor.full_name,
                instructor.email,
                instructor.specialization.as_deref().unwrap_or("")
            );
            for course in courses {
                println!("  [{}] {} {}", course.course_id, course.course_code, course.course_name);
            }
        }
        Commands::SetRole { user_id, role } => {
            let mut admin = UserAdmin::open(api.clone(), &session.viewer()?).await?;
            admin.change_role(user_id, role).await?;
            println!("User {} is now {}", user_id, role);
        }
        Commands::DeleteUser { user_id } => {
            let mut admin = UserAdmin::open(api.clone(), &session.viewer()?).await?;
            admin.delete(user_id).await?;
            println!("User {} deleted", user_id);
        }
    }

    Ok(())
}

async fn enroll(
    api: Arc<dyn LmsApi>,
    viewer: &Viewer,
    period_id: i32,
    courses: &[i32],
    yes: bool,
) -> Result<(), AppError> {
    let mut flow = RegistrationWorkflow::for_viewer(api, viewer)?;
    flow.load_periods().await?;
    flow.select_period(period_id).await?;

    for course_id in courses {
        if !flow.select(*course_id) {
            println!("Course {} is not available in this period, skipped", course_id);
        }
    }
    flow.next()?;

    println!("Enrolling in:");
    for course in flow.selected_courses() {
        println!("  {} {} - {}", course.course_code, course.course_name, course.price_or_zero());
    }
    println!("Total: {}", flow.total_price());

    if !yes && !prompt_yes("Confirm enrollment? [y/N] ")? {
        println!("Cancelled");
        return Ok(());
    }

    let report = flow.confirm().await?;
    if flow.step() == RegistrationStep::Done {
        println!("Enrolled in {} course(s)", report.committed.len());
        Ok(())
    } else {
        Err(AppError::Workflow(
            flow.banner().unwrap_or("Enrollment failed").to_string(),
        ))
    }
}

fn prompt_yes(question: &str) -> Result<bool, AppError> {
    print!("{}", question);
    io::stdout()
        .flush()
        .map_err(|e| AppError::Workflow(e.to_string()))?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| AppError::Workflow(e.to_string()))?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}
