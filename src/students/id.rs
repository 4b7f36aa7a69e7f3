use super::model::AcademicSemester;
use crate::error::{AppError, AppResult};

const SEQUENCE_WIDTH: usize = 4;
const SEQUENCE_MAX: u32 = 9999;

pub fn id_prefix(semester: &AcademicSemester) -> String {
    format!("{}{}", semester.year, semester.code)
}

/// Next student id for `semester`: `{year}{code}{NNNN}`.
///
/// `last` is the most recently issued id, if any. The sequence continues only when
/// that id was issued for the same year and code; otherwise it restarts at `0001`.
/// A semester that has issued `9999` is exhausted.
pub fn next_student_id(semester: &AcademicSemester, last: Option<&str>) -> AppResult<String> {
    let prefix = id_prefix(semester);
    let current = last
        .and_then(|id| id.strip_prefix(prefix.as_str()))
        .filter(|seq| seq.len() == SEQUENCE_WIDTH)
        .and_then(|seq| seq.parse::<u32>().ok())
        .unwrap_or(0);
    if current >= SEQUENCE_MAX {
        return Err(AppError::Conflict(format!(
            "Student id sequence exhausted for semester {prefix}"
        )));
    }
    Ok(format!("{prefix}{:0width$}", current + 1, width = SEQUENCE_WIDTH))
}
