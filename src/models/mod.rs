pub mod assignment;
pub mod course;
pub mod enrollment;
pub mod people;
pub mod period;
pub mod submission;
pub mod user;

pub use assignment::{
    Announcement, Assignment, AssignmentStatus, AssignmentType, NewAnnouncementRequest,
    NewAssignmentRequest, Priority,
};
pub use course::{Course, CourseStatus, NewCourseRequest};
pub use enrollment::{CompletionStatus, Enrollment, NewEnrollmentRequest, PaymentStatus};
pub use people::{Instructor, NewInstructorRequest, Student};
pub use period::{DashboardStats, NewPeriodRequest, PeriodDetails, PeriodStatus, RegistrationPeriod};
pub use submission::{Submission, SubmissionRequest, SubmissionStatus};
pub use user::{AuthResponse, LoginRequest, RegisterRequest, Role, UpdateRoleRequest, User};
