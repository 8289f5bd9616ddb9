use anyhow::{Context, Result};
use chrono::NaiveDate;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::fs;
use std::path::Path;

use crate::data::Dataset;
use crate::plan::schedule_elapsed_percent;
use crate::progress::{compute_progress, ProgressRecord, PROGRESS_KEY};
use crate::types::{ExamEntry, StudyDay, StudyTask, SubjectCategory};

/// Generate the HTML page and write it to `path`
pub fn generate_html(
    dataset: &Dataset,
    days: &[StudyDay],
    record: &ProgressRecord,
    today: NaiveDate,
    path: &Path,
) -> Result<()> {
    let html = render_page(dataset, days, record, today);
    fs::write(path, html.into_string())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn render_page(
    dataset: &Dataset,
    days: &[StudyDay],
    record: &ProgressRecord,
    today: NaiveDate,
) -> Markup {
    let readiness = compute_progress(days, record);
    let elapsed = schedule_elapsed_percent(
        days.first().map(|d| d.date).unwrap_or(dataset.plan_start),
        days.len(),
        today,
    );

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (dataset.title) " Exam Planner - " (dataset.school) }
                style { (PreEscaped(CSS)) }
            }
            body {
                div.app-container {
                    header.main-header {
                        div.header-content {
                            h1 { (dataset.school) }
                            p { (dataset.title) " Exam Portal & Planner (" (dataset.class_name) ")" }
                        }
                        p.current-date #"current-date" { (today.format("%A, %B %-d, %Y").to_string()) }
                    }
                    main {
                        nav.tab-nav {
                            button.tab-btn data-tab="timetable" {
                                span.icon { "📅" } " Exam Schedule"
                            }
                            button.tab-btn.active data-tab="study-plan" {
                                span.icon { "📝" } " Daily Study Plan"
                            }
                        }
                        section.tab-content #"timetable" {
                            (render_instructions(&dataset.instructions))
                            div.schedule-card-container #"exam-schedule" {
                                @for entry in &dataset.schedule {
                                    (render_exam_card(entry, today))
                                }
                            }
                        }
                        section.tab-content.active #"study-plan" {
                            div.plan-header {
                                h2 { "Daily Goal: 1 Subject, 1 Chapter" }
                            }
                            div.progress-container {
                                div.progress-bar-bg {
                                    div.progress-fill #"study-progress" style={ "width: " (readiness) "%" } {}
                                }
                                p.progress-text {
                                    "Readiness: "
                                    span #"progress-percent" { (readiness) }
                                    "%"
                                }
                                p.elapsed-text { "Schedule elapsed: " (elapsed) "%" }
                            }
                            div.study-timeline #"study-timeline" {
                                @if days.is_empty() {
                                    div.empty-state {
                                        p { "No study days planned." }
                                    }
                                } @else {
                                    @for day in days {
                                        (render_study_day(day, record))
                                    }
                                }
                            }
                        }
                    }
                    footer {
                        p { "Good Luck for " (dataset.title) "!" }
                    }
                }
                script #"baked-progress" type="application/json" { (PreEscaped(baked_record(record))) }
                script { (PreEscaped(javascript())) }
            }
        }
    }
}

fn render_instructions(instructions: &[String]) -> Markup {
    html! {
        @if !instructions.is_empty() {
            div.notice-board {
                h3 { "📢 Instructions" }
                ul #"instructions-list" {
                    @for instruction in instructions {
                        li { (instruction) }
                    }
                }
            }
        }
    }
}

fn render_exam_card(entry: &ExamEntry, today: NaiveDate) -> Markup {
    html! {
        div.exam-card.(entry.category().border_class()).today[entry.date == today] data-kind=(entry.kind.to_string()) {
            div.exam-date-box {
                span.exam-day { (entry.day) }
                span.exam-date { (entry.date.format("%-d").to_string()) }
            }
            div.exam-details {
                div.exam-subject { (entry.subject) }
                div.exam-syllabus { (entry.syllabus) }
            }
        }
    }
}

fn render_study_day(day: &StudyDay, record: &ProgressRecord) -> Markup {
    html! {
        div.study-day-card.today[day.is_today].completed[day.is_past] data-date=(day.date.to_string()) {
            div.study-date-header {
                span.study-date { (day.date_label()) }
                span.study-status { (day.status()) }
            }
            div.study-tasks {
                @for task in &day.items {
                    (render_task(task, record.get(&task.id).copied().unwrap_or(false)))
                }
            }
        }
    }
}

fn render_task(task: &StudyTask, done: bool) -> Markup {
    let color = SubjectCategory::for_subject(&task.subject).color_var();
    html! {
        label.task-item.done[done] {
            input.task-checkbox type="checkbox" checked[done] data-task-id=(task.id);
            div.task-content {
                div.task-subject style={ "color: var(--" (color) ")" } { (task.subject) }
                div.task-desc { "Study " (task.topic) }
            }
        }
    }
}

/// Record embedded in the page as the fallback when browser storage is empty
fn baked_record(record: &ProgressRecord) -> String {
    serde_json::to_string(record)
        .unwrap_or_else(|_| "{}".to_string())
        .replace('<', "\\u003c")
}

fn javascript() -> String {
    JAVASCRIPT.replace("__PROGRESS_KEY__", PROGRESS_KEY)
}

const CSS: &str = r#"
:root {
    --primary: #4f46e5;
    --secondary: #0891b2;
    --success: #16a34a;
    --danger: #dc2626;
    --warning: #d97706;
    --accent: #9333ea;
    --text-main: #1f2937;
    --text-muted: #6b7280;
    --bg: #f3f4f6;
    --card: #ffffff;
}

* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
    background: var(--bg);
    color: var(--text-main);
    line-height: 1.5;
}

.app-container {
    max-width: 760px;
    margin: 0 auto;
    padding: 24px 16px 48px;
}

.main-header {
    display: flex;
    justify-content: space-between;
    align-items: flex-end;
    flex-wrap: wrap;
    gap: 8px;
    margin-bottom: 24px;
}

.main-header h1 {
    font-size: 1.6em;
    color: var(--primary);
}

.current-date {
    color: var(--text-muted);
    font-size: 0.9em;
}

.tab-nav {
    display: flex;
    gap: 8px;
    margin-bottom: 20px;
}

.tab-btn {
    flex: 1;
    padding: 12px;
    border: none;
    border-radius: 10px;
    background: var(--card);
    color: var(--text-muted);
    font-weight: 600;
    cursor: pointer;
}

.tab-btn.active {
    background: var(--primary);
    color: #fff;
}

.tab-content {
    display: none;
}

.tab-content.active {
    display: block;
}

.notice-board {
    background: #fffbeb;
    border: 1px solid #fde68a;
    border-radius: 10px;
    padding: 16px 20px;
    margin-bottom: 20px;
}

.notice-board ul {
    padding-left: 20px;
    margin-top: 8px;
}

.schedule-card-container,
.study-timeline {
    display: grid;
    gap: 12px;
}

.exam-card {
    display: flex;
    gap: 16px;
    background: var(--card);
    border-radius: 10px;
    border-left: 5px solid var(--text-muted);
    padding: 14px 16px;
}

.exam-card.today {
    border-left-width: 8px;
    box-shadow: 0 0 0 2px var(--primary);
}

.border-english { border-left-color: var(--primary); }
.border-math { border-left-color: var(--success); }
.border-hindi { border-left-color: var(--danger); }
.border-gujarati { border-left-color: var(--warning); }
.border-comp { border-left-color: var(--accent); }
.border-evs { border-left-color: var(--secondary); }
.border-holiday { border-left-color: var(--text-muted); opacity: 0.8; }

.exam-date-box {
    display: flex;
    flex-direction: column;
    align-items: center;
    min-width: 48px;
}

.exam-day {
    font-size: 0.75em;
    text-transform: uppercase;
    color: var(--text-muted);
}

.exam-date {
    font-size: 1.5em;
    font-weight: 700;
}

.exam-subject {
    font-weight: 700;
}

.exam-syllabus {
    color: var(--text-muted);
    font-size: 0.9em;
}

.progress-container {
    margin-bottom: 20px;
}

.progress-bar-bg {
    height: 12px;
    border-radius: 6px;
    background: #e5e7eb;
    overflow: hidden;
}

.progress-fill {
    height: 100%;
    background: var(--success);
    transition: width 0.3s;
}

.progress-text {
    margin-top: 6px;
    font-weight: 600;
}

.elapsed-text {
    color: var(--text-muted);
    font-size: 0.85em;
}

.study-day-card {
    background: var(--card);
    border-radius: 10px;
    padding: 14px 16px;
}

.study-day-card.today {
    box-shadow: 0 0 0 2px var(--primary);
}

.study-day-card.completed {
    opacity: 0.65;
}

.study-date-header {
    display: flex;
    justify-content: space-between;
    margin-bottom: 8px;
    font-weight: 600;
}

.study-status {
    color: var(--text-muted);
    font-size: 0.85em;
}

.task-item {
    display: flex;
    gap: 12px;
    align-items: flex-start;
    cursor: pointer;
}

.task-checkbox {
    width: 20px;
    height: 20px;
    margin-top: 3px;
    accent-color: var(--success);
}

.task-item.done .task-desc {
    text-decoration: line-through;
}

.task-subject {
    font-weight: 700;
}

.empty-state {
    padding: 40px 20px;
    text-align: center;
    color: var(--text-muted);
}

footer {
    text-align: center;
    margin-top: 32px;
    color: var(--text-muted);
}
"#;

const JAVASCRIPT: &str = r#"
const STORAGE_KEY = '__PROGRESS_KEY__';

// Browser storage wins; the record baked into the page is the fallback
function loadProgress() {
    try {
        const saved = JSON.parse(localStorage.getItem(STORAGE_KEY));
        if (saved && typeof saved === 'object' && !Array.isArray(saved)) return saved;
    } catch (e) {}
    const baked = document.getElementById('baked-progress');
    if (baked) {
        try {
            const record = JSON.parse(baked.textContent);
            if (record && typeof record === 'object') return record;
        } catch (e) {}
    }
    return {};
}

function saveProgress(record) {
    localStorage.setItem(STORAGE_KEY, JSON.stringify(record));
}

function updateReadiness(record) {
    const boxes = document.querySelectorAll('.task-checkbox');
    let completed = 0;
    boxes.forEach(box => {
        if (record[box.getAttribute('data-task-id')]) completed++;
    });
    const percent = boxes.length === 0 ? 0 : Math.round((completed / boxes.length) * 100);

    const fill = document.getElementById('study-progress');
    const text = document.getElementById('progress-percent');
    if (fill) fill.style.width = `${percent}%`;
    if (text) text.textContent = `${percent}`;
}

function applyProgress(record) {
    document.querySelectorAll('.task-checkbox').forEach(box => {
        const done = !!record[box.getAttribute('data-task-id')];
        box.checked = done;
        const item = box.closest('.task-item');
        if (item) item.classList.toggle('done', done);
    });
    updateReadiness(record);
}

function setupCheckboxes() {
    document.querySelectorAll('.task-checkbox').forEach(box => {
        box.addEventListener('change', function() {
            const record = loadProgress();
            const taskId = this.getAttribute('data-task-id');
            if (record[taskId]) {
                delete record[taskId];
            } else {
                record[taskId] = true;
            }
            saveProgress(record);
            applyProgress(record);
        });
    });
}

function scrollToToday() {
    const plan = document.getElementById('study-plan');
    const today = document.querySelector('.study-day-card.today');
    if (!plan || !today || !plan.classList.contains('active')) return;
    setTimeout(() => today.scrollIntoView({ behavior: 'smooth', block: 'center' }), 500);
}

function setupTabs() {
    const buttons = document.querySelectorAll('.tab-btn');
    const contents = document.querySelectorAll('.tab-content');

    buttons.forEach(btn => {
        btn.addEventListener('click', (e) => {
            const target = e.currentTarget;
            const panel = document.getElementById(target.getAttribute('data-tab'));
            if (!panel) return;

            buttons.forEach(b => b.classList.remove('active'));
            contents.forEach(c => c.classList.remove('active'));
            target.classList.add('active');
            panel.classList.add('active');
            scrollToToday();
        });
    });
}

setupTabs();
setupCheckboxes();
applyProgress(loadProgress());
scrollToToday();
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{generate_plan, PlanOptions};
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn render_builtin(today: NaiveDate, record: &ProgressRecord) -> String {
        let data = Dataset::builtin();
        let days = generate_plan(&data, &PlanOptions::for_dataset(&data), today);
        render_page(&data, &days, record, today).into_string()
    }

    #[test]
    fn test_render_header_and_tabs() {
        let html = render_builtin(date(2026, 2, 10), &ProgressRecord::new());

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("H3 World School, Tragad"));
        assert!(html.contains("SA-2 Exam Portal &amp; Planner (Grade II)"));
        assert!(html.contains("Tuesday, February 10, 2026"));
        assert!(html.contains(r#"data-tab="timetable""#));
        assert!(html.contains(r#"id="study-plan""#));
        assert!(html.contains(r#"class="tab-content active""#));
    }

    #[test]
    fn test_render_exam_cards() {
        let html = render_builtin(date(2026, 2, 10), &ProgressRecord::new());

        assert_eq!(html.matches(r#"<div class="exam-card "#).count(), 10);
        assert!(html.contains(r#"class="exam-card border-english""#));
        assert!(html.contains(r#"class="exam-card border-comp""#));
        // Drawing assessment is unmapped, study leave and festivals are breaks
        assert_eq!(html.matches("exam-card border-holiday").count(), 4);
        assert!(html.contains("Ch-9 to 15, Writing Skills"));
    }

    #[test]
    fn test_render_marks_today_exam() {
        let html = render_builtin(date(2026, 3, 9), &ProgressRecord::new());
        assert!(html.contains(r#"class="exam-card border-math today""#));
    }

    #[test]
    fn test_render_instructions() {
        let html = render_builtin(date(2026, 2, 10), &ProgressRecord::new());
        assert!(html.contains("Reporting time: Regular (8:25 am)"));
        assert_eq!(html.matches("<li>").count(), 6);
    }

    #[test]
    fn test_render_study_days() {
        let html = render_builtin(date(2026, 2, 10), &ProgressRecord::new());

        assert_eq!(html.matches(r#"class="task-checkbox""#).count(), 40);
        assert!(html.contains(r#"data-task-id="2026-02-09-Math""#));
        assert!(html.contains("Mon, Feb 9"));
        assert!(html.contains("Study Ch-7"));
        assert!(html.contains("color: var(--success)"));
        assert!(html.contains(r#"class="study-day-card completed""#));
        assert!(html.contains(r#"class="study-day-card today""#));
        assert!(html.contains("Today&#39;s Target") || html.contains("Today's Target"));
    }

    #[test]
    fn test_render_progress_from_record() {
        let mut record = ProgressRecord::new();
        for id in ["2026-02-09-Math", "2026-02-10-English", "2026-02-11-EVS", "2026-02-12-Hindi"] {
            record.insert(id.to_string(), true);
        }
        let html = render_builtin(date(2026, 2, 10), &record);

        // 4 of 40
        assert!(html.contains("width: 10%"));
        assert!(html.contains(r#"<span id="progress-percent">10</span>"#));
        assert_eq!(html.matches(r#"type="checkbox" checked"#).count(), 4);
        assert!(html.contains(r#"{"2026-02-09-Math":true"#));
    }

    #[test]
    fn test_render_empty_plan() {
        let data = Dataset::builtin();
        let html = render_page(&data, &[], &ProgressRecord::new(), date(2026, 2, 10)).into_string();

        assert!(html.contains("No study days planned."));
        assert!(html.contains(r#"<span id="progress-percent">0</span>"#));
    }

    #[test]
    fn test_render_escapes_text() {
        let mut data = Dataset::builtin();
        data.schedule[0].syllabus = "<script>alert(1)</script>".to_string();
        let html = render_page(&data, &[], &ProgressRecord::new(), date(2026, 2, 10)).into_string();

        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn test_baked_record_cannot_close_script() {
        let mut record = ProgressRecord::new();
        record.insert("</script>".to_string(), true);
        assert!(!baked_record(&record).contains("</script>"));
    }

    #[test]
    fn test_script_uses_progress_key() {
        let html = render_builtin(date(2026, 2, 10), &ProgressRecord::new());
        assert!(html.contains("const STORAGE_KEY = 'h3exam_progress';"));
        assert!(!html.contains("__PROGRESS_KEY__"));
    }

    #[test]
    fn test_generate_html_writes_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index.html");
        let data = Dataset::builtin();

        generate_html(&data, &[], &ProgressRecord::new(), date(2026, 2, 10), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("H3 World School"));
    }

    #[test]
    fn test_generate_html_missing_dir_fails() {
        let data = Dataset::builtin();
        let result = generate_html(
            &data,
            &[],
            &ProgressRecord::new(),
            date(2026, 2, 10),
            Path::new("/nonexistent/dir/index.html"),
        );
        assert!(result.is_err());
    }
}
