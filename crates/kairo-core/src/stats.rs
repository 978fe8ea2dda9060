//! Completion statistics over days, blocks and todos.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::warn;

use crate::calendar::{DateRange, week_start_monday};
use crate::datekey::{DateKeyed, date_key, parse_date_key};
use crate::model::{CalendarEvent, Day, EventOccurrence, Note, TimeBlock, Todo};
use crate::recurrence::expand_events;
use crate::reorder::sort_by_order;
use crate::timegrid::TimeOfDay;

/// Days covered by the dashboard's upcoming events, today included.
pub const UPCOMING_DAYS: i64 = 7;

/// Percentage in 0..=100, rounded; zero when there is nothing to complete.
pub fn completion_rate(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u32
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStats {
    pub date: String,
    pub day_exists: bool,
    pub is_completed: bool,
    pub completed_todos: usize,
    pub total_todos: usize,
    pub todo_completion_rate: u32,
    pub completed_time_blocks: usize,
    pub total_time_blocks: usize,
    pub time_block_completion_rate: u32,
}

impl DayStats {
    /// Todos embedded in `day` are used when present; otherwise `todos` is
    /// searched for entries pointing at the day.
    pub fn for_date(date: NaiveDate, day: Option<&Day>, todos: &[Todo]) -> Self {
        let Some(day) = day else {
            return Self {
                date: date_key(date),
                day_exists: false,
                is_completed: false,
                completed_todos: 0,
                total_todos: 0,
                todo_completion_rate: 0,
                completed_time_blocks: 0,
                total_time_blocks: 0,
                time_block_completion_rate: 0,
            };
        };

        let day_todos: Vec<&Todo> = match day.todos.as_deref() {
            Some(embedded) => embedded.iter().collect(),
            None => todos
                .iter()
                .filter(|todo| todo.day_id.as_deref() == Some(day.id.as_str()))
                .collect(),
        };
        let completed_todos = day_todos.iter().filter(|todo| todo.is_completed).count();
        let total_time_blocks = day.time_blocks.len();
        let completed_time_blocks = day
            .time_blocks
            .iter()
            .filter(|block| block.is_completed)
            .count();

        Self {
            date: date_key(date),
            day_exists: true,
            is_completed: day.is_completed,
            completed_todos,
            total_todos: day_todos.len(),
            todo_completion_rate: completion_rate(completed_todos, day_todos.len()),
            completed_time_blocks,
            total_time_blocks,
            time_block_completion_rate: completion_rate(completed_time_blocks, total_time_blocks),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekStats {
    pub week_start: String,
    pub week_end: String,
    pub completed_days: usize,
    pub total_days: usize,
    pub completed_todos: usize,
    pub total_todos: usize,
    pub todo_completion_rate: u32,
    pub completed_time_blocks: usize,
    pub total_time_blocks: usize,
    pub time_block_completion_rate: u32,
    pub daily_stats: Vec<DayStats>,
}

impl WeekStats {
    /// Monday-to-Sunday week containing `reference`. `total_days` counts the
    /// days that exist in `days`.
    pub fn for_week(reference: NaiveDate, days: &BTreeMap<String, Day>, todos: &[Todo]) -> Self {
        let start = week_start_monday(reference);
        let range = DateRange::new(start, start + Duration::days(6));

        let daily_stats: Vec<DayStats> = range
            .dates()
            .into_iter()
            .map(|date| DayStats::for_date(date, days.get(&date_key(date)), todos))
            .collect();

        let completed_days = daily_stats.iter().filter(|d| d.is_completed).count();
        let total_days = daily_stats.iter().filter(|d| d.day_exists).count();
        let completed_todos = daily_stats.iter().map(|d| d.completed_todos).sum();
        let total_todos = daily_stats.iter().map(|d| d.total_todos).sum();
        let completed_time_blocks = daily_stats.iter().map(|d| d.completed_time_blocks).sum();
        let total_time_blocks = daily_stats.iter().map(|d| d.total_time_blocks).sum();

        Self {
            week_start: date_key(range.start),
            week_end: date_key(range.end),
            completed_days,
            total_days,
            completed_todos,
            total_todos,
            todo_completion_rate: completion_rate(completed_todos, total_todos),
            completed_time_blocks,
            total_time_blocks,
            time_block_completion_rate: completion_rate(completed_time_blocks, total_time_blocks),
            daily_stats,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_completed_date: Option<String>,
    pub total_completed_days: usize,
    pub total_days: usize,
    pub overall_day_completion_rate: u32,
}

impl OverallStats {
    /// A streak is a run of consecutive completed days. The current streak
    /// stays alive through today while today is still open, so it may end
    /// yesterday.
    pub fn from_days(days: &[Day], today: NaiveDate) -> Self {
        let mut all = BTreeSet::new();
        let mut completed = BTreeSet::new();
        for day in days {
            let date = match parse_date_key(day.raw_date()) {
                Ok(date) => date,
                Err(err) => {
                    warn!(day = %day.id, error = %err, "skipping day with unreadable date");
                    continue;
                }
            };
            all.insert(date);
            if day.is_completed {
                completed.insert(date);
            }
        }

        let mut longest = 0;
        let mut run = 0;
        let mut prev: Option<NaiveDate> = None;
        for date in &completed {
            run = match prev {
                Some(p) if p.succ_opt() == Some(*date) => run + 1,
                _ => 1,
            };
            longest = longest.max(run);
            prev = Some(*date);
        }

        let mut cursor = if completed.contains(&today) {
            Some(today)
        } else {
            today.pred_opt()
        };
        let mut current = 0;
        while let Some(date) = cursor
            && completed.contains(&date)
        {
            current += 1;
            cursor = date.pred_opt();
        }

        Self {
            current_streak: current,
            longest_streak: longest,
            last_completed_date: completed.last().map(|date| date_key(*date)),
            total_completed_days: completed.len(),
            total_days: all.len(),
            overall_day_completion_rate: completion_rate(completed.len(), all.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardNote {
    pub id: String,
    pub content: String,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTodo {
    pub id: String,
    pub title: String,
    pub is_completed: bool,
    pub deadline: Option<String>,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTimeBlock {
    pub id: String,
    pub name: String,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub is_completed: bool,
    pub order: i64,
    pub color: Option<String>,
    pub notes: Vec<DashboardNote>,
    pub todos: Vec<DashboardTodo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTodayDetail {
    pub id: String,
    pub date: String,
    pub is_completed: bool,
    pub time_blocks: Vec<DashboardTimeBlock>,
    pub todos: Vec<DashboardTodo>,
}

/// Everything the home screen shows in one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub streaks: OverallStats,
    pub today: DayStats,
    pub today_detail: Option<DashboardTodayDetail>,
    pub upcoming_events: Vec<EventOccurrence>,
}

impl Dashboard {
    #[tracing::instrument(skip_all, fields(today = %today))]
    pub fn build(
        days: &[Day],
        todos: &[Todo],
        events: &[CalendarEvent],
        today: NaiveDate,
    ) -> anyhow::Result<Self> {
        let key = date_key(today);
        let day = days.iter().rev().find(|day| day.date_key() == key);
        let upcoming = DateRange::new(today, today + Duration::days(UPCOMING_DAYS - 1));

        Ok(Self {
            streaks: OverallStats::from_days(days, today),
            today: DayStats::for_date(today, day, todos),
            today_detail: day.map(|day| today_detail(day, todos)),
            upcoming_events: expand_events(events, upcoming)?,
        })
    }
}

fn today_detail(day: &Day, todos: &[Todo]) -> DashboardTodayDetail {
    let mut blocks = day.time_blocks.clone();
    sort_by_order(&mut blocks);

    let day_todos = match day.todos.as_deref() {
        Some(embedded) => embedded.to_vec(),
        None => todos
            .iter()
            .filter(|todo| todo.day_id.as_deref() == Some(day.id.as_str()))
            .cloned()
            .collect(),
    };

    DashboardTodayDetail {
        id: day.id.clone(),
        date: day.date_key().to_string(),
        is_completed: day.is_completed,
        time_blocks: blocks
            .iter()
            .map(|block| dashboard_block(block, todos))
            .collect(),
        todos: dashboard_todos(day_todos),
    }
}

fn dashboard_block(block: &TimeBlock, todos: &[Todo]) -> DashboardTimeBlock {
    let mut notes: Vec<Note> = block.notes.clone();
    sort_by_order(&mut notes);
    let block_todos = match block.todos.as_deref() {
        Some(embedded) => embedded.to_vec(),
        None => todos
            .iter()
            .filter(|todo| todo.time_block_id.as_deref() == Some(block.id.as_str()))
            .cloned()
            .collect(),
    };

    DashboardTimeBlock {
        id: block.id.clone(),
        name: block.name.clone(),
        start_time: block.start_time,
        end_time: block.end_time,
        is_completed: block.is_completed,
        order: block.order,
        color: block.color.clone(),
        notes: notes
            .into_iter()
            .map(|note| DashboardNote {
                id: note.id,
                content: note.content,
                order: note.order,
            })
            .collect(),
        todos: dashboard_todos(block_todos),
    }
}

fn dashboard_todos(mut todos: Vec<Todo>) -> Vec<DashboardTodo> {
    sort_by_order(&mut todos);
    todos
        .into_iter()
        .map(|todo| DashboardTodo {
            id: todo.id,
            title: todo.title,
            is_completed: todo.is_completed,
            deadline: todo.deadline,
            order: todo.order,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn day(date: &str, completed: bool) -> Day {
        serde_json::from_value(serde_json::json!({
            "id": format!("day-{date}"),
            "date": format!("{date}T00:00:00.000Z"),
            "isCompleted": completed,
        }))
        .expect("day")
    }

    #[test]
    fn rate_rounds_and_handles_empty() {
        assert_eq!(completion_rate(0, 0), 0);
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(2, 3), 67);
        assert_eq!(completion_rate(4, 4), 100);
    }

    #[test]
    fn day_stats_count_blocks_and_todos() {
        let mut d: Day = serde_json::from_value(serde_json::json!({
            "id": "d1",
            "date": "2024-01-15",
            "isCompleted": true,
            "timeBlocks": [
                {"id": "b1", "name": "a", "startTime": "09:00", "endTime": "10:00", "isCompleted": true},
                {"id": "b2", "name": "b", "startTime": "10:00", "endTime": "11:00"}
            ]
        }))
        .expect("day");
        let loose: Vec<Todo> = serde_json::from_value(serde_json::json!([
            {"id": "t1", "title": "x", "dayId": "d1", "isCompleted": true},
            {"id": "t2", "title": "y", "dayId": "d1"},
            {"id": "t3", "title": "z", "dayId": "other", "isCompleted": true}
        ]))
        .expect("todos");

        let stats = DayStats::for_date(ymd(2024, 1, 15), Some(&d), &loose);
        assert!(stats.day_exists);
        assert_eq!((stats.completed_todos, stats.total_todos), (1, 2));
        assert_eq!(stats.todo_completion_rate, 50);
        assert_eq!((stats.completed_time_blocks, stats.total_time_blocks), (1, 2));

        d.todos = Some(Vec::new());
        let embedded = DayStats::for_date(ymd(2024, 1, 15), Some(&d), &loose);
        assert_eq!(embedded.total_todos, 0);

        let missing = DayStats::for_date(ymd(2024, 1, 16), None, &loose);
        assert!(!missing.day_exists);
        assert_eq!(missing.date, "2024-01-16");
    }

    #[test]
    fn week_stats_use_monday_weeks() {
        let days = crate::datekey::index_by_date_key(vec![
            day("2024-01-14", true),
            day("2024-01-15", true),
            day("2024-01-16", false),
        ]);
        let stats = WeekStats::for_week(ymd(2024, 1, 17), &days, &[]);
        assert_eq!(stats.week_start, "2024-01-15");
        assert_eq!(stats.week_end, "2024-01-21");
        assert_eq!(stats.daily_stats.len(), 7);
        assert_eq!(stats.completed_days, 1);
        assert_eq!(stats.total_days, 2);
    }

    #[test]
    fn dashboard_collects_today_and_the_week_ahead() {
        let days: Vec<Day> = serde_json::from_value(serde_json::json!([
            {"id": "d-14", "date": "2024-01-14", "isCompleted": true},
            {
                "id": "d-15",
                "date": "2024-01-15T00:00:00.000Z",
                "timeBlocks": [
                    {"id": "b2", "name": "Lunch", "startTime": "12:00", "endTime": "13:00", "order": 1},
                    {"id": "b1", "name": "Focus", "startTime": "09:00", "endTime": "11:00", "order": 0,
                     "isCompleted": true,
                     "notes": [{"id": "n2", "content": "second", "order": 1},
                               {"id": "n1", "content": "first", "order": 0}]}
                ]
            }
        ]))
        .expect("days");
        let todos: Vec<Todo> = serde_json::from_value(serde_json::json!([
            {"id": "t2", "title": "later", "dayId": "d-15", "order": 1},
            {"id": "t1", "title": "sooner", "dayId": "d-15", "order": 0, "isCompleted": true},
            {"id": "t3", "title": "inside focus", "timeBlockId": "b1"}
        ]))
        .expect("todos");
        let events: Vec<CalendarEvent> = serde_json::from_value(serde_json::json!([
            {"id": "e1", "title": "Review", "date": "2024-01-01", "isRecurring": true,
             "recurrenceType": "WEEKLY"},
            {"id": "e2", "title": "Trip", "date": "2024-01-22"}
        ]))
        .expect("events");

        let board = Dashboard::build(&days, &todos, &events, ymd(2024, 1, 15)).expect("dashboard");
        assert_eq!(board.streaks.current_streak, 1);
        assert_eq!((board.today.completed_todos, board.today.total_todos), (1, 2));
        assert_eq!(board.today.time_block_completion_rate, 50);

        let detail = board.today_detail.expect("today detail");
        assert_eq!(detail.date, "2024-01-15");
        let names: Vec<&str> = detail.time_blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Focus", "Lunch"]);
        assert_eq!(detail.time_blocks[0].notes[0].content, "first");
        assert_eq!(detail.time_blocks[0].todos[0].title, "inside focus");
        assert_eq!(detail.todos[0].title, "sooner");

        let upcoming: Vec<&str> = board
            .upcoming_events
            .iter()
            .map(|o| o.occurrence_date.as_str())
            .collect();
        assert_eq!(upcoming, vec!["2024-01-15"]);

        let json = serde_json::to_value(Dashboard::build(&days, &[], &[], ymd(2024, 1, 16)).expect("dashboard"))
            .expect("json");
        assert!(json["todayDetail"].is_null());
        assert_eq!(json["today"]["dayExists"], false);
        assert_eq!(json["streaks"]["longestStreak"], 1);
    }

    #[test]
    fn streaks() {
        let days = vec![
            day("2024-01-01", true),
            day("2024-01-02", true),
            day("2024-01-03", true),
            day("2024-01-05", false),
            day("2024-01-08", true),
            day("2024-01-09", true),
        ];

        let open_today = OverallStats::from_days(&days, ymd(2024, 1, 10));
        assert_eq!(open_today.current_streak, 2);
        assert_eq!(open_today.longest_streak, 3);
        assert_eq!(open_today.last_completed_date.as_deref(), Some("2024-01-09"));
        assert_eq!(open_today.total_completed_days, 5);
        assert_eq!(open_today.total_days, 6);
        assert_eq!(open_today.overall_day_completion_rate, 83);

        let lapsed = OverallStats::from_days(&days, ymd(2024, 1, 11));
        assert_eq!(lapsed.current_streak, 0);

        let empty = OverallStats::from_days(&[], ymd(2024, 1, 11));
        assert_eq!(empty.longest_streak, 0);
        assert_eq!(empty.last_completed_date, None);
    }
}
