use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::types::{EntryKind, ExamEntry};

/// Errors raised while loading or checking a dataset
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to access dataset {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dataset: {0}")]
    Json(#[from] serde_json::Error),

    #[error("subject {0:?} appears more than once in the rotation")]
    DuplicateRotation(String),

    #[error("subject {0:?} has a syllabus but is not in the rotation")]
    NotInRotation(String),

    #[error("schedule is not ordered by date at {0}")]
    Unordered(NaiveDate),
}

/// Everything the page is built from: timetable, topics and rotation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    pub school: String,

    /// Exam session name, e.g. "SA-2"
    pub title: String,

    pub class_name: String,

    /// First day of the study plan
    pub plan_start: NaiveDate,

    pub schedule: Vec<ExamEntry>,

    /// Ordered topic list per subject
    pub syllabus: BTreeMap<String, Vec<String>>,

    /// Order in which subjects take turns in the plan
    pub rotation: Vec<String>,

    #[serde(default)]
    pub instructions: Vec<String>,
}

impl Dataset {
    /// The hardcoded SA-2 timetable and syllabus for Grade II
    pub fn builtin() -> Self {
        let schedule = [
            ((2026, 3, 2), "Mon", "Drawing Assmt", "During school hours. Bring colors.", EntryKind::Assessment),
            ((2026, 3, 3), "Tue", "Study Leave", "Preparation time at home.", EntryKind::Holiday),
            ((2026, 3, 4), "Wed", "Holiday (Dhuleti)", "Festival Holiday", EntryKind::Holiday),
            ((2026, 3, 5), "Thu", "English", "Ch-9 to 15, Writing Skills", EntryKind::Exam),
            (
                (2026, 3, 6),
                "Fri",
                "Hindi",
                "Ch-9 to 14, Grammar (Gender, Number, Opposites, Synonyms), Writing Skills",
                EntryKind::Exam,
            ),
            (
                (2026, 3, 7),
                "Sat",
                "Gujarati",
                "Vocab, Numbers 1-100, Categories (Colors, Animals, etc.)",
                EntryKind::Exam,
            ),
            ((2026, 3, 8), "Sun", "Holiday", "Sunday Break", EntryKind::Holiday),
            ((2026, 3, 9), "Mon", "Math", "Ch-7 to 10, 12 to 14", EntryKind::Exam),
            ((2026, 3, 10), "Tue", "Computer", "Ch-5 to 8", EntryKind::Exam),
            ((2026, 3, 11), "Wed", "EVS", "Ch-12, 14, 16, 17, 19, 20, 22", EntryKind::Exam),
        ]
        .into_iter()
        .filter_map(|((y, m, d), day, subject, syllabus, kind)| {
            NaiveDate::from_ymd_opt(y, m, d)
                .map(|date| ExamEntry::new(date, day, subject, syllabus, kind))
        })
        .collect();

        let syllabus: BTreeMap<String, Vec<String>> = [
            (
                "English",
                &["Ch-9", "Ch-10", "Ch-11", "Ch-12", "Ch-13", "Ch-14", "Ch-15", "Writing Skills"][..],
            ),
            ("Math", &["Ch-7", "Ch-8", "Ch-9", "Ch-10", "Ch-12", "Ch-13", "Ch-14"][..]),
            (
                "Hindi",
                &["Ch-9", "Ch-10", "Ch-11", "Ch-12", "Ch-13", "Ch-14", "Grammar & Writing"][..],
            ),
            ("EVS", &["Ch-12", "Ch-14", "Ch-16", "Ch-17", "Ch-19", "Ch-20", "Ch-22"][..]),
            ("Computer", &["Ch-5", "Ch-6", "Ch-7", "Ch-8"][..]),
            (
                "Gujarati",
                &[
                    "Vocab (Matravagar/Matravala)",
                    "Numbers 1-100",
                    "Words 1-20",
                    "Categories: Flowers/Veg",
                    "Categories: Animals/Birds",
                    "Colors & Directions",
                    "Jodakshar",
                ][..],
            ),
        ]
        .into_iter()
        .map(|(subject, topics)| {
            (
                subject.to_string(),
                topics.iter().map(|t| t.to_string()).collect(),
            )
        })
        .collect();

        let rotation = ["Math", "English", "EVS", "Hindi", "Computer", "Gujarati"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let instructions = [
            "Reporting time: Regular (8:25 am)",
            "Leaving time: 12:10 pm",
            "No books - Send only Compass box, Heavy Nashta, Water bottle and Almanac.",
            "Canteen facility available for Brunch (Heavy Nashta).",
            "No preponing or postponing of assessments.",
            "Drawing Assessment on 02/03/26 (Monday) during school hours. Bring colors.",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        Self {
            school: "H3 World School, Tragad".to_string(),
            title: "SA-2".to_string(),
            class_name: "Grade II".to_string(),
            // 2026-02-09 always exists; fall back to the epoch only to stay total
            plan_start: NaiveDate::from_ymd_opt(2026, 2, 9).unwrap_or_default(),
            schedule,
            syllabus,
            rotation,
            instructions,
        }
    }

    /// Check the invariants the plan generator relies on
    pub fn validate(&self) -> Result<(), DatasetError> {
        let mut seen = HashSet::new();
        for subject in &self.rotation {
            if !seen.insert(subject.as_str()) {
                return Err(DatasetError::DuplicateRotation(subject.clone()));
            }
        }

        for subject in self.syllabus.keys() {
            if !seen.contains(subject.as_str()) {
                return Err(DatasetError::NotInRotation(subject.clone()));
            }
        }

        for pair in self.schedule.windows(2) {
            if pair[1].date < pair[0].date {
                return Err(DatasetError::Unordered(pair[1].date));
            }
        }

        Ok(())
    }

    /// Date of the earliest sitting of kind `exam`
    pub fn first_exam_date(&self) -> Option<NaiveDate> {
        self.schedule
            .iter()
            .filter(|e| e.kind == EntryKind::Exam)
            .map(|e| e.date)
            .min()
    }

    /// The exam sitting of a subject, if it has one
    pub fn exam_for(&self, subject: &str) -> Option<&ExamEntry> {
        self.schedule
            .iter()
            .find(|e| e.kind == EntryKind::Exam && e.subject == subject)
    }

    /// Number of topics the plan will cover
    pub fn total_topics(&self) -> usize {
        self.rotation
            .iter()
            .filter_map(|s| self.syllabus.get(s))
            .map(Vec::len)
            .sum()
    }

    pub fn topics(&self, subject: &str) -> &[String] {
        self.syllabus.get(subject).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Load and validate a dataset from a JSON file
pub fn load_dataset(path: &Path) -> Result<Dataset, DatasetError> {
    let content = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset: Dataset = serde_json::from_str(&content)?;
    dataset.validate()?;

    debug!(
        path = %path.display(),
        entries = dataset.schedule.len(),
        subjects = dataset.syllabus.len(),
        "Loaded dataset"
    );
    Ok(dataset)
}

/// Use the dataset file when one is configured, the built-in data otherwise
pub fn resolve_dataset(path: Option<&Path>) -> Result<Dataset, DatasetError> {
    match path {
        Some(path) => load_dataset(path),
        None => Ok(Dataset::builtin()),
    }
}

/// Write a dataset as pretty JSON, e.g. to start editing from the built-in data
pub fn save_dataset(dataset: &Dataset, path: &Path) -> Result<(), DatasetError> {
    let json = serde_json::to_string_pretty(dataset)?;
    std::fs::write(path, json).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ========== builtin tests ==========

    #[test]
    fn test_builtin_is_valid() {
        Dataset::builtin().validate().unwrap();
    }

    #[test]
    fn test_builtin_schedule() {
        let data = Dataset::builtin();
        assert_eq!(data.schedule.len(), 10);
        assert_eq!(data.schedule[0].date, date(2026, 3, 2));
        assert_eq!(data.schedule[0].kind, EntryKind::Assessment);
        assert_eq!(data.schedule[9].subject, "EVS");
        assert_eq!(data.plan_start, date(2026, 2, 9));
    }

    #[test]
    fn test_builtin_topic_counts() {
        let data = Dataset::builtin();
        assert_eq!(data.topics("English").len(), 8);
        assert_eq!(data.topics("Computer").len(), 4);
        assert_eq!(data.total_topics(), 40);
        assert!(data.topics("Drawing").is_empty());
    }

    #[test]
    fn test_first_exam_date_skips_assessment() {
        let data = Dataset::builtin();
        assert_eq!(data.first_exam_date(), Some(date(2026, 3, 5)));
    }

    #[test]
    fn test_exam_for() {
        let data = Dataset::builtin();
        assert_eq!(data.exam_for("Math").map(|e| e.date), Some(date(2026, 3, 9)));
        assert!(data.exam_for("Holiday").is_none());
    }

    // ========== validate tests ==========

    #[test]
    fn test_validate_duplicate_rotation() {
        let mut data = Dataset::builtin();
        data.rotation.push("Math".to_string());
        assert!(matches!(
            data.validate(),
            Err(DatasetError::DuplicateRotation(s)) if s == "Math"
        ));
    }

    #[test]
    fn test_validate_subject_missing_from_rotation() {
        let mut data = Dataset::builtin();
        data.rotation.retain(|s| s != "Hindi");
        assert!(matches!(
            data.validate(),
            Err(DatasetError::NotInRotation(s)) if s == "Hindi"
        ));
    }

    #[test]
    fn test_validate_rotation_without_syllabus_is_fine() {
        let mut data = Dataset::builtin();
        data.rotation.push("Drawing".to_string());
        data.validate().unwrap();
        assert_eq!(data.total_topics(), 40);
    }

    #[test]
    fn test_validate_unordered_schedule() {
        let mut data = Dataset::builtin();
        data.schedule.swap(0, 1);
        assert!(matches!(data.validate(), Err(DatasetError::Unordered(_))));
    }

    // ========== file tests ==========

    #[test]
    fn test_save_and_load_dataset() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dataset.json");

        save_dataset(&Dataset::builtin(), &path).unwrap();
        let loaded = load_dataset(&path).unwrap();

        assert_eq!(loaded, Dataset::builtin());
    }

    #[test]
    fn test_load_dataset_missing_file() {
        let result = load_dataset(Path::new("/nonexistent/path/dataset.json"));
        assert!(matches!(result, Err(DatasetError::Io { .. })));
    }

    #[test]
    fn test_load_dataset_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dataset.json");
        std::fs::write(&path, "not valid json").unwrap();

        assert!(matches!(load_dataset(&path), Err(DatasetError::Json(_))));
    }

    #[test]
    fn test_load_dataset_runs_validation() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dataset.json");
        let mut data = Dataset::builtin();
        data.rotation.clear();
        save_dataset(&data, &path).unwrap();

        assert!(matches!(
            load_dataset(&path),
            Err(DatasetError::NotInRotation(_))
        ));
    }

    #[test]
    fn test_load_dataset_instructions_optional() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dataset.json");
        let json = r#"{
            "school": "Test School",
            "title": "Finals",
            "class_name": "Grade I",
            "plan_start": "2026-01-05",
            "schedule": [],
            "syllabus": {"Math": ["Ch-1"]},
            "rotation": ["Math"]
        }"#;
        std::fs::write(&path, json).unwrap();

        let data = load_dataset(&path).unwrap();
        assert!(data.instructions.is_empty());
        assert_eq!(data.total_topics(), 1);
    }

    #[test]
    fn test_resolve_dataset_defaults_to_builtin() {
        assert_eq!(resolve_dataset(None).unwrap(), Dataset::builtin());
    }
}
