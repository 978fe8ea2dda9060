use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};

use chrono::{Datelike, NaiveDate};
use unicode_width::UnicodeWidthStr;

use crate::calendar::{CalendarView, is_same_month, month_view_dates, view_title, week_view_dates};
use crate::config::Config;
use crate::datekey::date_key;
use crate::model::{Day, EventOccurrence, TemplateOccurrence, TimeBlock, Todo};
use crate::reorder::sort_by_order;
use crate::stats::{Dashboard, DayStats, OverallStats, UPCOMING_DAYS, WeekStats};
use crate::timegrid::DayWindow;

const REPEATS_MARK: &str = "~";

const WEEKDAY_HEADERS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// What one view needs to draw: days, event occurrences and template blocks
/// not yet on their day, keyed by date.
#[derive(Debug, Clone, Copy)]
pub struct ViewData<'a> {
    pub days: &'a BTreeMap<String, Day>,
    pub events: &'a BTreeMap<String, Vec<EventOccurrence>>,
    pub templates: &'a BTreeMap<String, Vec<TemplateOccurrence>>,
    pub todos: &'a [Todo],
    pub today: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.color && io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, out, data, cfg))]
    pub fn write_view<W: Write>(
        &self,
        out: W,
        view: CalendarView,
        reference: NaiveDate,
        data: ViewData<'_>,
        cfg: &Config,
    ) -> anyhow::Result<()> {
        match view {
            CalendarView::Month => self.write_month(out, reference, data),
            CalendarView::Week => self.write_week(out, reference, data, cfg.week_window()),
            CalendarView::Day => self.write_day(out, reference, data, cfg.day_window()),
        }
    }

    /// Month grid. `*` marks a completed day, `+` a day with events.
    pub fn write_month<W: Write>(
        &self,
        mut out: W,
        reference: NaiveDate,
        data: ViewData<'_>,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", view_title(reference, CalendarView::Month))?;

        let rows: Vec<Vec<String>> = month_view_dates(reference)
            .chunks(7)
            .map(|week| {
                week.iter()
                    .map(|date| self.month_cell(*date, reference, data))
                    .collect()
            })
            .collect();
        write_table(&mut out, &WEEKDAY_HEADERS, rows)
    }

    fn month_cell(&self, date: NaiveDate, reference: NaiveDate, data: ViewData<'_>) -> String {
        let key = date_key(date);
        let done = data.days.get(&key).is_some_and(|day| day.is_completed);
        let has_events = data.events.get(&key).is_some_and(|list| !list.is_empty());

        let mut cell = format!("{:>2}", date.day());
        cell.push(if done { '*' } else { ' ' });
        cell.push(if has_events { '+' } else { ' ' });

        if date == data.today {
            self.paint(&cell, "7")
        } else if !is_same_month(date, reference) {
            self.paint(&cell, "2")
        } else {
            cell
        }
    }

    /// Week agenda with each block placed in `window`.
    pub fn write_week<W: Write>(
        &self,
        mut out: W,
        reference: NaiveDate,
        data: ViewData<'_>,
        window: DayWindow,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", view_title(reference, CalendarView::Week))?;
        writeln!(out, "window {}-{}", window.start, window.end)?;

        let mut rows = Vec::new();
        for date in week_view_dates(reference) {
            let key = date_key(date);
            let label = self.date_label(date, data.today);

            for occurrence in data.events.get(&key).map(Vec::as_slice).unwrap_or_default() {
                rows.push(vec![
                    label.clone(),
                    self.paint(&occurrence.title, "36"),
                    "all day".to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                ]);
            }

            for block in sorted_blocks(data.days.get(&key)) {
                let pos = block.position_in(window);
                rows.push(vec![
                    label.clone(),
                    block.name.clone(),
                    format!("{}-{}", block.start_time, block.end_time),
                    format!("{:.1}", pos.top),
                    format!("{:.1}", pos.height),
                    done_mark(block.is_completed),
                ]);
            }

            for pending in data.templates.get(&key).map(Vec::as_slice).unwrap_or_default() {
                let pos = pending.position_in(window);
                rows.push(vec![
                    label.clone(),
                    pending.name.clone(),
                    format!("{}-{}", pending.start_time, pending.end_time),
                    format!("{:.1}", pos.top),
                    format!("{:.1}", pos.height),
                    REPEATS_MARK.to_string(),
                ]);
            }
        }

        if rows.is_empty() {
            writeln!(out, "(nothing scheduled)")?;
            return Ok(());
        }
        write_table(&mut out, &["Date", "Item", "Time", "Top%", "Height%", "Done"], rows)
    }

    /// Blocks of one day with their notes and todos.
    pub fn write_day<W: Write>(
        &self,
        mut out: W,
        reference: NaiveDate,
        data: ViewData<'_>,
        window: DayWindow,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", view_title(reference, CalendarView::Day))?;

        let key = date_key(reference);
        let day = data.days.get(&key);
        if let Some(day) = day {
            let status = if day.is_completed { "completed" } else { "open" };
            writeln!(out, "status  {status}")?;
        } else {
            writeln!(out, "status  (no day record)")?;
        }

        for occurrence in data.events.get(&key).map(Vec::as_slice).unwrap_or_default() {
            let repeat = if occurrence.is_recurring {
                format!(" ({:?})", occurrence.recurrence_type).to_lowercase()
            } else {
                String::new()
            };
            writeln!(out, "event   {}{repeat}", self.paint(&occurrence.title, "36"))?;
        }

        for block in sorted_blocks(day) {
            let pos = block.position_in(window);
            writeln!(
                out,
                "{} {}-{} {} [top {:.1}% height {:.1}%] {}",
                done_mark(block.is_completed),
                block.start_time.format_12h(),
                block.end_time.format_12h(),
                block.name,
                pos.top,
                pos.height,
                block.color_or_default(),
            )?;
            for note in &block.notes {
                writeln!(out, "    - {}", note.content)?;
            }
            for todo in block.todos.as_deref().unwrap_or_default() {
                writeln!(out, "    [{}] {}", done_mark(todo.is_completed), todo.title)?;
            }
        }

        for pending in data.templates.get(&key).map(Vec::as_slice).unwrap_or_default() {
            let pos = pending.position_in(window);
            writeln!(
                out,
                "{REPEATS_MARK} {}-{} {} [top {:.1}% height {:.1}%] {} (repeats)",
                pending.start_time.format_12h(),
                pending.end_time.format_12h(),
                pending.name,
                pos.top,
                pos.height,
                pending.color_or_default(),
            )?;
        }

        if let Some(day) = day {
            let mut todos: Vec<Todo> = match day.todos.as_deref() {
                Some(embedded) => embedded.to_vec(),
                None => data
                    .todos
                    .iter()
                    .filter(|todo| todo.day_id.as_deref() == Some(day.id.as_str()))
                    .cloned()
                    .collect(),
            };
            sort_by_order(&mut todos);
            for todo in &todos {
                let deadline = todo
                    .deadline
                    .as_deref()
                    .map(|d| format!(" (due {})", crate::datekey::normalize_date_key(d)))
                    .unwrap_or_default();
                writeln!(out, "todo [{}] {}{deadline}", done_mark(todo.is_completed), todo.title)?;
            }
        }

        Ok(())
    }

    pub fn write_stats<W: Write>(
        &self,
        mut out: W,
        day: &DayStats,
        week: &WeekStats,
        overall: &OverallStats,
    ) -> anyhow::Result<()> {
        writeln!(out, "day       {}", day.date)?;
        writeln!(
            out,
            "  todos   {}/{} ({}%)",
            day.completed_todos, day.total_todos, day.todo_completion_rate
        )?;
        writeln!(
            out,
            "  blocks  {}/{} ({}%)",
            day.completed_time_blocks, day.total_time_blocks, day.time_block_completion_rate
        )?;

        writeln!(out, "week      {} .. {}", week.week_start, week.week_end)?;
        writeln!(out, "  days    {}/{}", week.completed_days, week.total_days)?;
        writeln!(
            out,
            "  todos   {}/{} ({}%)",
            week.completed_todos, week.total_todos, week.todo_completion_rate
        )?;
        writeln!(
            out,
            "  blocks  {}/{} ({}%)",
            week.completed_time_blocks, week.total_time_blocks, week.time_block_completion_rate
        )?;

        let streak = self.paint(&overall.current_streak.to_string(), "32");
        writeln!(out, "streak    {streak} (longest {})", overall.longest_streak)?;
        writeln!(
            out,
            "overall   {}/{} days ({}%)",
            overall.total_completed_days, overall.total_days, overall.overall_day_completion_rate
        )?;
        if let Some(last) = overall.last_completed_date.as_deref() {
            writeln!(out, "last done {last}")?;
        }
        Ok(())
    }

    pub fn write_dashboard<W: Write>(&self, mut out: W, board: &Dashboard) -> anyhow::Result<()> {
        let today = &board.today;
        let streak = self.paint(&board.streaks.current_streak.to_string(), "32");
        writeln!(out, "today     {}", today.date)?;
        writeln!(out, "streak    {streak} (longest {})", board.streaks.longest_streak)?;
        writeln!(
            out,
            "blocks    {}/{} ({}%)",
            today.completed_time_blocks, today.total_time_blocks, today.time_block_completion_rate
        )?;
        writeln!(
            out,
            "todos     {}/{} ({}%)",
            today.completed_todos, today.total_todos, today.todo_completion_rate
        )?;

        if let Some(detail) = board.today_detail.as_ref() {
            for block in &detail.time_blocks {
                writeln!(
                    out,
                    "[{}] {}-{} {}",
                    done_mark(block.is_completed),
                    block.start_time.format_12h(),
                    block.end_time.format_12h(),
                    block.name
                )?;
            }
        }

        if board.upcoming_events.is_empty() {
            writeln!(out, "(no events in the next {UPCOMING_DAYS} days)")?;
            return Ok(());
        }
        let rows: Vec<Vec<String>> = board
            .upcoming_events
            .iter()
            .map(|event| {
                let repeat = if event.is_recurring { "yes" } else { "" };
                vec![
                    event.occurrence_date.clone(),
                    self.paint(&event.title, "36"),
                    repeat.to_string(),
                ]
            })
            .collect();
        write_table(&mut out, &["Date", "Upcoming", "Repeats"], rows)
    }

    fn date_label(&self, date: NaiveDate, today: NaiveDate) -> String {
        let label = date.format("%a %m-%d").to_string();
        if date == today {
            self.paint(&label, "33")
        } else {
            label
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn sorted_blocks(day: Option<&Day>) -> Vec<&TimeBlock> {
    let mut blocks: Vec<&TimeBlock> = day.map(|d| d.time_blocks.iter().collect()).unwrap_or_default();
    blocks.sort_by_key(|block| (block.start_time, block.order));
    blocks
}

fn done_mark(done: bool) -> String {
    let mark = if done { "x" } else { " " };
    mark.to_string()
}

pub(crate) fn write_table<W: Write>(
    mut writer: W,
    headers: &[&str],
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|header| UnicodeWidthStr::width(*header))
        .collect();

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, width) in headers.iter().zip(&widths) {
        write!(writer, "{header:width$} ")?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "")?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

/// Removes CSI sequences (`ESC [` parameters, final byte `@`..=`~`).
fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\x1b' {
            out.push(ch);
            continue;
        }
        if chars.next_if_eq(&'[').is_none() {
            continue;
        }
        for code in chars.by_ref() {
            if ('@'..='~').contains(&code) {
                break;
            }
        }
    }

    out
}
