mod report;
mod status;

pub use report::{
    Assignment, MAX_SCORE, NewReport, Rating, RepairDocumentation, Report,
    ReportDetail, StatusChange, validate_rating,
};
pub use status::{Action, Lifecycle, Status};
