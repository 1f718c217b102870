pub mod credentials;
pub mod exam;
pub mod gpa;
pub mod grade;
pub mod portal_json;
pub mod term;
pub mod timetable;

pub use credentials::{Credentials, KeyEncoding, RsaKey};
pub use exam::ExamEntry;
pub use gpa::{
    CourseFilter, DegreeCourseIndex, GpaCourse, GpaReport, GpaScale, GpaStats, SortOrder,
};
pub use grade::{GradeDetail, GradeRecord};
pub use term::{Semester, Term};
pub use timetable::TimetableEntry;
