pub mod admins;
pub mod audit_logs;
pub mod bookings;
pub mod chat_rooms;
pub mod enums;
pub mod messages;
pub mod notifications;
pub mod reviews;
pub mod student_subjects;
pub mod students;
pub mod subjects;
pub mod tutor_expertise;
pub mod tutor_schedules;
pub mod tutor_subjects;
pub mod tutors;
pub mod users;

pub use admins::Entity as Admins;
pub use audit_logs::Entity as AuditLogs;
pub use bookings::Entity as Bookings;
pub use chat_rooms::Entity as ChatRooms;
pub use messages::Entity as Messages;
pub use notifications::Entity as Notifications;
pub use reviews::Entity as Reviews;
pub use student_subjects::Entity as StudentSubjects;
pub use students::Entity as Students;
pub use subjects::Entity as Subjects;
pub use tutor_expertise::Entity as TutorExpertise;
pub use tutor_schedules::Entity as TutorSchedules;
pub use tutor_subjects::Entity as TutorSubjects;
pub use tutors::Entity as Tutors;
pub use users::Entity as Users;
