//! Study plan generation.
//!
//! Subjects take turns in rotation order, one topic each, until every topic
//! list is consumed. Each emitted task gets its own calendar day starting
//! from the plan start; weekends and holidays are not skipped.

use chrono::{Duration, NaiveDate};
use std::collections::HashMap;

use crate::data::Dataset;
use crate::types::{StudyDay, StudyTask};

/// Where the plan stops emitting tasks
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum Cutoff {
    /// Cover every topic
    #[default]
    None,
    /// Stop before the first exam of the dataset
    FirstExam,
    /// Stop before a given date
    Date(NaiveDate),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct PlanOptions {
    pub start: NaiveDate,
    pub cutoff: Cutoff,
}

impl PlanOptions {
    /// Plan from the dataset's own start date, covering every topic
    #[cfg(test)]
    pub fn for_dataset(dataset: &Dataset) -> Self {
        Self {
            start: dataset.plan_start,
            cutoff: Cutoff::None,
        }
    }

    fn cutoff_date(&self, dataset: &Dataset) -> Option<NaiveDate> {
        match self.cutoff {
            Cutoff::None => None,
            Cutoff::FirstExam => dataset.first_exam_date(),
            Cutoff::Date(date) => Some(date),
        }
    }
}

/// Interleave topics across subjects in rotation order.
///
/// Each pass emits one `(subject, topic)` per subject that still has topics
/// left; exhausted subjects drop out. Topics keep their list order.
pub fn rotate_topics(dataset: &Dataset) -> Vec<(&str, &str)> {
    let mut cursors: HashMap<&str, usize> = HashMap::new();
    let mut rotated = Vec::with_capacity(dataset.total_topics());

    loop {
        let mut emitted = false;
        for subject in &dataset.rotation {
            let topics = dataset.topics(subject);
            let cursor = cursors.entry(subject.as_str()).or_insert(0);
            if let Some(topic) = topics.get(*cursor) {
                rotated.push((subject.as_str(), topic.as_str()));
                *cursor += 1;
                emitted = true;
            }
        }
        if !emitted {
            break;
        }
    }

    rotated
}

/// Generate the day-by-day study plan.
///
/// The Nth task lands on `start + N` days. With a cutoff, emission halts at
/// the first mapped date on or after it, and it also halts at the last date
/// the calendar can represent.
pub fn generate_plan(dataset: &Dataset, options: &PlanOptions, today: NaiveDate) -> Vec<StudyDay> {
    let cutoff = options.cutoff_date(dataset);

    rotate_topics(dataset)
        .into_iter()
        .enumerate()
        .map_while(|(offset, (subject, topic))| {
            // Running off the end of the calendar ends the plan
            let date = options
                .start
                .checked_add_signed(Duration::days(offset as i64))?;
            Some((date, subject, topic))
        })
        .take_while(|(date, _, _)| cutoff.map_or(true, |c| *date < c))
        .map(|(date, subject, topic)| StudyDay {
            date,
            items: vec![StudyTask::new(date, subject, topic)],
            is_today: date == today,
            is_past: date < today,
        })
        .collect()
}

/// All leaf tasks of a plan in order
pub fn plan_tasks(days: &[StudyDay]) -> impl Iterator<Item = &StudyTask> {
    days.iter().flat_map(|day| day.items.iter())
}

pub fn find_task<'a>(days: &'a [StudyDay], id: &str) -> Option<&'a StudyTask> {
    plan_tasks(days).find(|task| task.id == id)
}

/// Share of the planned days already behind us, as a whole percentage.
///
/// Counts started days, so the start day itself already counts as one.
pub fn schedule_elapsed_percent(start: NaiveDate, planned_days: usize, today: NaiveDate) -> u8 {
    if today < start || planned_days == 0 {
        return 0;
    }
    let elapsed = (today - start).num_days() + 1;
    let percent = (elapsed as f64 / planned_days as f64 * 100.0).round();
    percent.min(100.0) as u8
}
