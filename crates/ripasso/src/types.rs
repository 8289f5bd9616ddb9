use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a timetable entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Exam,
    Holiday,
    Assessment,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntryKind::Exam => "exam",
            EntryKind::Holiday => "holiday",
            EntryKind::Assessment => "assessment",
        };
        f.write_str(label)
    }
}

/// A single day of the exam timetable
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ExamEntry {
    pub date: NaiveDate,

    /// Short weekday label as printed on the circular (e.g. "Mon")
    pub day: String,

    pub subject: String,

    /// Free-text syllabus or note for the day
    pub syllabus: String,

    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl ExamEntry {
    pub fn new(date: NaiveDate, day: &str, subject: &str, syllabus: &str, kind: EntryKind) -> Self {
        Self {
            date,
            day: day.to_string(),
            subject: subject.to_string(),
            syllabus: syllabus.to_string(),
            kind,
        }
    }

    /// Whether this entry is a day off rather than a sitting.
    /// Holidays are recognised by kind and, as on the printed circular, by name.
    pub fn is_break(&self) -> bool {
        self.kind == EntryKind::Holiday
            || self.subject.contains("Holiday")
            || self.subject.eq_ignore_ascii_case("study leave")
    }

    /// Visual category of the card, with breaks always shown as holidays
    pub fn category(&self) -> SubjectCategory {
        if self.is_break() {
            SubjectCategory::Holiday
        } else {
            SubjectCategory::for_subject(&self.subject)
        }
    }
}

/// One topic to study on a given day
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct StudyTask {
    pub subject: String,
    pub topic: String,
    pub id: String,
}

impl StudyTask {
    pub fn new(date: NaiveDate, subject: &str, topic: &str) -> Self {
        Self {
            subject: subject.to_string(),
            topic: topic.to_string(),
            id: task_id(date, subject),
        }
    }
}

/// Build the persisted key of a task: plan date plus subject.
///
/// Stored progress is keyed by this string, so reordering subjects or topics
/// silently orphans previously completed ids.
pub fn task_id(date: NaiveDate, subject: &str) -> String {
    format!("{}-{}", date.format("%Y-%m-%d"), subject)
}

/// A calendar day of the study plan
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct StudyDay {
    pub date: NaiveDate,
    pub items: Vec<StudyTask>,
    pub is_today: bool,
    pub is_past: bool,
}

impl StudyDay {
    /// Status label shown next to the date
    pub fn status(&self) -> &'static str {
        if self.is_past {
            "Past"
        } else if self.is_today {
            "Today's Target"
        } else {
            "Upcoming"
        }
    }

    /// Date as shown on the day card, e.g. "Mon, Feb 9"
    pub fn date_label(&self) -> String {
        self.date.format("%a, %b %-d").to_string()
    }
}

/// Colour family of a subject on the page
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum SubjectCategory {
    English,
    Hindi,
    Math,
    Gujarati,
    Computer,
    Evs,
    Holiday,
}

impl SubjectCategory {
    /// Map a subject name to its category; anything unknown is shown as a holiday
    pub fn for_subject(subject: &str) -> Self {
        match subject {
            "English" => SubjectCategory::English,
            "Hindi" => SubjectCategory::Hindi,
            "Math" => SubjectCategory::Math,
            "Gujarati" => SubjectCategory::Gujarati,
            "Computer" => SubjectCategory::Computer,
            "EVS" => SubjectCategory::Evs,
            _ => SubjectCategory::Holiday,
        }
    }

    /// CSS class for the left border of an exam card
    pub fn border_class(self) -> &'static str {
        match self {
            SubjectCategory::English => "border-english",
            SubjectCategory::Hindi => "border-hindi",
            SubjectCategory::Math => "border-math",
            SubjectCategory::Gujarati => "border-gujarati",
            SubjectCategory::Computer => "border-comp",
            SubjectCategory::Evs => "border-evs",
            SubjectCategory::Holiday => "border-holiday",
        }
    }

    /// CSS custom property used to colour the subject name
    pub fn color_var(self) -> &'static str {
        match self {
            SubjectCategory::English => "primary",
            SubjectCategory::Math => "success",
            SubjectCategory::Hindi => "danger",
            SubjectCategory::Gujarati => "warning",
            SubjectCategory::Computer => "accent",
            SubjectCategory::Evs => "secondary",
            SubjectCategory::Holiday => "text-muted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_task_id_format() {
        assert_eq!(task_id(date(2026, 2, 9), "Math"), "2026-02-09-Math");
    }

    #[test]
    fn test_task_id_deterministic() {
        let a = StudyTask::new(date(2026, 2, 10), "English", "Ch-9");
        let b = StudyTask::new(date(2026, 2, 10), "English", "Ch-10");

        // Topic is not part of the id
        assert_eq!(a.id, b.id);
        assert_eq!(a.id, "2026-02-10-English");
    }

    #[test]
    fn test_entry_kind_serialization() {
        let json = serde_json::to_string(&EntryKind::Assessment).unwrap();
        assert_eq!(json, "\"assessment\"");

        let kind: EntryKind = serde_json::from_str("\"holiday\"").unwrap();
        assert_eq!(kind, EntryKind::Holiday);
    }

    #[test]
    fn test_exam_entry_deserialization() {
        let json = r#"{"date":"2026-03-05","day":"Thu","subject":"English","syllabus":"Ch-9 to 15","type":"exam"}"#;
        let entry: ExamEntry = serde_json::from_str(json).unwrap();

        assert_eq!(entry.date, date(2026, 3, 5));
        assert_eq!(entry.day, "Thu");
        assert_eq!(entry.kind, EntryKind::Exam);
    }

    #[test]
    fn test_exam_entry_unknown_kind_rejected() {
        let json = r#"{"date":"2026-03-05","day":"Thu","subject":"English","syllabus":"","type":"party"}"#;
        assert!(serde_json::from_str::<ExamEntry>(json).is_err());
    }

    #[test]
    fn test_category_lookup() {
        assert_eq!(SubjectCategory::for_subject("Math").border_class(), "border-math");
        assert_eq!(SubjectCategory::for_subject("Computer").border_class(), "border-comp");
        assert_eq!(SubjectCategory::for_subject("EVS").color_var(), "secondary");
        assert_eq!(
            SubjectCategory::for_subject("Drawing Assmt"),
            SubjectCategory::Holiday
        );
    }

    #[test]
    fn test_breaks_use_holiday_category() {
        let leave = ExamEntry::new(date(2026, 3, 3), "Tue", "Study Leave", "", EntryKind::Holiday);
        let festival = ExamEntry::new(
            date(2026, 3, 4),
            "Wed",
            "Holiday (Dhuleti)",
            "Festival Holiday",
            EntryKind::Holiday,
        );
        let exam = ExamEntry::new(date(2026, 3, 5), "Thu", "English", "", EntryKind::Exam);

        assert_eq!(leave.category(), SubjectCategory::Holiday);
        assert_eq!(festival.category(), SubjectCategory::Holiday);
        assert_eq!(exam.category(), SubjectCategory::English);
    }

    #[test]
    fn test_holiday_kind_overrides_subject() {
        let entry = ExamEntry::new(date(2026, 3, 8), "Sun", "Math", "", EntryKind::Holiday);
        assert_eq!(entry.category(), SubjectCategory::Holiday);
    }

    #[test]
    fn test_study_day_status_and_label() {
        let mut day = StudyDay {
            date: date(2026, 2, 9),
            items: vec![],
            is_today: false,
            is_past: true,
        };
        assert_eq!(day.status(), "Past");
        assert_eq!(day.date_label(), "Mon, Feb 9");

        day.is_past = false;
        day.is_today = true;
        assert_eq!(day.status(), "Today's Target");

        day.is_today = false;
        assert_eq!(day.status(), "Upcoming");
    }
}
