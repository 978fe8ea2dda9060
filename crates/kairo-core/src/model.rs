//! Records exchanged with the Kairo API.
//!
//! Entities mirror the JSON the backend returns (camelCase fields, opaque
//! string ids and timestamps). Request records are explicit per operation and
//! validated before they leave the client.

use anyhow::anyhow;
use serde::{Deserialize, Deserializer, Serialize};

use crate::datekey::{DateKeyed, parse_date_key};
use crate::timegrid::{DayWindow, Position, TimeOfDay, position};

pub const DEFAULT_BLOCK_COLOR: &str = "#A5D8FF";

pub const BLOCK_COLORS: [(&str, &str); 5] = [
    ("Blue", "#A5D8FF"),
    ("Green", "#B2F2BB"),
    ("Yellow", "#FFEC99"),
    ("Pink", "#FCC2D7"),
    ("Purple", "#D0BFFF"),
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Day {
    pub id: String,
    pub date: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub time_blocks: Vec<TimeBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todos: Option<Vec<Todo>>,
}

impl Day {
    pub fn todos(&self) -> &[Todo] {
        self.todos.as_deref().unwrap_or_default()
    }
}

impl DateKeyed for Day {
    fn raw_date(&self) -> &str {
        &self.date
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeBlock {
    pub id: String,
    pub name: String,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub day_id: String,
    /// Set when the block was materialized from a [`TimeBlockTemplate`].
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todos: Option<Vec<Todo>>,
}

impl TimeBlock {
    pub fn color_or_default(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_BLOCK_COLOR)
    }

    pub fn position_in(&self, window: DayWindow) -> Position {
        position(self.start_time, self.end_time, window)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub time_block_id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub day_id: Option<String>,
    #[serde(default)]
    pub time_block_id: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Todo {
    /// Not attached to a day or a block.
    pub fn is_inbox(&self) -> bool {
        self.day_id.is_none() && self.time_block_id.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrenceType {
    #[default]
    None,
    Daily,
    Weekdays,
    Weekends,
    Weekly,
    Monthly,
    Yearly,
}

/// A base event definition, recurring or not.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurrence_type: RecurrenceType,
}

/// One concrete date of an event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventOccurrence {
    pub id: String,
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurrence_type: RecurrenceType,
    #[serde(default)]
    pub is_occurrence: bool,
    pub occurrence_date: String,
}

impl DateKeyed for EventOccurrence {
    fn raw_date(&self) -> &str {
        &self.occurrence_date
    }
}

/// A time block that repeats on chosen weekdays.
///
/// `days_of_week` holds ISO weekday numbers (1 = Monday .. 7 = Sunday).
/// Blocks appear from `start_date` up to, not including, `deactivated_from`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeBlockTemplate {
    pub id: String,
    pub name: String,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    #[serde(default)]
    pub color: Option<String>,
    pub days_of_week: Vec<u8>,
    pub start_date: String,
    #[serde(default)]
    pub deactivated_from: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

fn active_by_default() -> bool {
    true
}

/// One date a template places its block on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateOccurrence {
    pub template_id: String,
    pub name: String,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    #[serde(default)]
    pub color: Option<String>,
    pub occurrence_date: String,
}

impl TemplateOccurrence {
    pub fn color_or_default(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_BLOCK_COLOR)
    }

    pub fn position_in(&self, window: DayWindow) -> Position {
        position(self.start_time, self.end_time, window)
    }
}

impl DateKeyed for TemplateOccurrence {
    fn raw_date(&self) -> &str {
        &self.occurrence_date
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateDayDto {
    pub date: String,
}

impl CreateDayDto {
    pub fn validate(&self) -> anyhow::Result<()> {
        parse_date_key(&self.date)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDayDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimeBlockDto {
    pub name: String,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub day_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl CreateTimeBlockDto {
    pub fn validate(&self) -> anyhow::Result<()> {
        require_text("name", &self.name)?;
        require_text("dayId", &self.day_id)?;
        require_ordered_times(self.start_time, self.end_time)?;
        if let Some(color) = self.color.as_deref() {
            require_color(color)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTimeBlockDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<TimeOfDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<TimeOfDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

impl UpdateTimeBlockDto {
    /// Checks the patch against the block it will be applied to, so a new
    /// start is compared with the existing end and vice versa.
    pub fn validate_against(&self, current: &TimeBlock) -> anyhow::Result<()> {
        if let Some(name) = self.name.as_deref() {
            require_text("name", name)?;
        }
        if let Some(color) = self.color.as_deref() {
            require_color(color)?;
        }
        require_ordered_times(
            self.start_time.unwrap_or(current.start_time),
            self.end_time.unwrap_or(current.end_time),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteDto {
    pub content: String,
    pub time_block_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl CreateNoteDto {
    pub fn validate(&self) -> anyhow::Result<()> {
        require_text("content", &self.content)?;
        require_text("timeBlockId", &self.time_block_id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoDto {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_block_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl CreateTodoDto {
    pub fn validate(&self) -> anyhow::Result<()> {
        require_text("title", &self.title)?;
        if let Some(deadline) = self.deadline.as_deref() {
            parse_date_key(deadline)?;
        }
        Ok(())
    }
}

/// `deadline: Some(None)` clears the deadline; `None` leaves it alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<Option<String>>,
}

impl UpdateTodoDto {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(title) = self.title.as_deref() {
            require_text("title", title)?;
        }
        if let Some(Some(deadline)) = self.deadline.as_ref() {
            parse_date_key(deadline)?;
        }
        Ok(())
    }
}

/// Neither target set moves the todo back to the inbox.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MoveTodoDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_day_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_time_block_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReorderDto {
    pub ordered_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TodoFilterQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_block_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inbox: Option<bool>,
}

impl TodoFilterQuery {
    pub fn matches(&self, todo: &Todo) -> bool {
        if let Some(day_id) = self.day_id.as_deref()
            && todo.day_id.as_deref() != Some(day_id)
        {
            return false;
        }
        if let Some(block_id) = self.time_block_id.as_deref()
            && todo.time_block_id.as_deref() != Some(block_id)
        {
            return false;
        }
        if let Some(done) = self.is_completed
            && todo.is_completed != done
        {
            return false;
        }
        if let Some(inbox) = self.inbox
            && todo.is_inbox() != inbox
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventDto {
    pub title: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub is_recurring: bool,
    pub recurrence_type: RecurrenceType,
}

impl CreateEventDto {
    pub fn validate(&self) -> anyhow::Result<()> {
        require_text("title", &self.title)?;
        parse_date_key(&self.date)?;
        if let Some(color) = self.color.as_deref() {
            require_color(color)?;
        }
        match (self.is_recurring, self.recurrence_type) {
            (true, RecurrenceType::None) => Err(anyhow!("recurring event needs a recurrence pattern")),
            (false, kind) if kind != RecurrenceType::None => {
                Err(anyhow!("one-off event cannot carry recurrence {kind:?}"))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimeBlockTemplateDto {
    pub name: String,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub days_of_week: Vec<u8>,
    pub start_date: String,
}

impl CreateTimeBlockTemplateDto {
    pub fn validate(&self) -> anyhow::Result<()> {
        require_text("name", &self.name)?;
        require_ordered_times(self.start_time, self.end_time)?;
        if let Some(color) = self.color.as_deref() {
            require_color(color)?;
        }
        require_days_of_week(&self.days_of_week)?;
        parse_date_key(&self.start_date)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTimeBlockTemplateDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<TimeOfDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<TimeOfDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<u8>>,
}

impl UpdateTimeBlockTemplateDto {
    pub fn validate_against(&self, current: &TimeBlockTemplate) -> anyhow::Result<()> {
        if let Some(name) = self.name.as_deref() {
            require_text("name", name)?;
        }
        if let Some(color) = self.color.as_deref() {
            require_color(color)?;
        }
        if let Some(days) = self.days_of_week.as_deref() {
            require_days_of_week(days)?;
        }
        require_ordered_times(
            self.start_time.unwrap_or(current.start_time),
            self.end_time.unwrap_or(current.end_time),
        )
    }
}

/// Stops a template: `from_date` is the first date without the block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeactivateTemplateDto {
    pub from_date: String,
}

impl DeactivateTemplateDto {
    pub fn validate_against(&self, template: &TimeBlockTemplate) -> anyhow::Result<()> {
        let from = parse_date_key(&self.from_date)?;
        let start = parse_date_key(&template.start_date)?;
        if from < start {
            return Err(anyhow!(
                "cannot stop {} on {from}, before it starts on {start}",
                template.name
            ));
        }
        Ok(())
    }
}

/// Copies a block onto another day. Copied todos start incomplete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateTimeBlockDto {
    pub target_day_id: String,
    pub include_notes: bool,
    pub include_todos: bool,
}

impl DuplicateTimeBlockDto {
    /// Notes come along, todos do not.
    pub fn to_day(target_day_id: impl Into<String>) -> Self {
        Self {
            target_day_id: target_day_id.into(),
            include_notes: true,
            include_todos: false,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        require_text("targetDayId", &self.target_day_id)
    }
}

/// Neither target set duplicates the todo into the inbox.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateTodoDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_day_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_time_block_id: Option<String>,
}

impl DuplicateTodoDto {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(day_id) = self.target_day_id.as_deref() {
            require_text("targetDayId", day_id)?;
        }
        if let Some(block_id) = self.target_time_block_id.as_deref() {
            require_text("targetTimeBlockId", block_id)?;
        }
        Ok(())
    }
}

/// A present field becomes `Some`, even when it is `null`.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn require_text(field: &str, value: &str) -> anyhow::Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("{field} cannot be empty"));
    }
    Ok(())
}

fn require_ordered_times(start: TimeOfDay, end: TimeOfDay) -> anyhow::Result<()> {
    if start >= end {
        return Err(anyhow!("start time {start} must be before end time {end}"));
    }
    Ok(())
}

fn require_days_of_week(days: &[u8]) -> anyhow::Result<()> {
    if days.is_empty() {
        return Err(anyhow!("pick at least one day of the week"));
    }
    let mut seen = [false; 8];
    for &day in days {
        if !(1..=7).contains(&day) {
            return Err(anyhow!("day of week must be 1 (Mon) to 7 (Sun), got: {day}"));
        }
        if std::mem::replace(&mut seen[usize::from(day)], true) {
            return Err(anyhow!("day of week {day} listed twice"));
        }
    }
    Ok(())
}

fn require_color(color: &str) -> anyhow::Result<()> {
    let hex = color
        .strip_prefix('#')
        .ok_or_else(|| anyhow!("color must look like #RRGGBB, got: {color}"))?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(anyhow!("color must look like #RRGGBB, got: {color}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(raw: &str) -> TimeOfDay {
        TimeOfDay::parse(raw).expect("time")
    }

    fn block_dto() -> CreateTimeBlockDto {
        CreateTimeBlockDto {
            name: "Deep work".to_string(),
            start_time: time("09:00"),
            end_time: time("11:00"),
            color: Some("#B2F2BB".to_string()),
            day_id: "day-1".to_string(),
            order: None,
        }
    }

    #[test]
    fn parses_day_payload_from_api() {
        let raw = r##"{
            "id": "d1",
            "date": "2024-01-15T00:00:00.000Z",
            "isCompleted": true,
            "userId": "u1",
            "createdAt": "2024-01-15T08:00:00.000Z",
            "updatedAt": "2024-01-15T20:00:00.000Z",
            "timeBlocks": [{
                "id": "b1",
                "name": "Focus",
                "startTime": "09:00",
                "endTime": "10:30",
                "isCompleted": false,
                "order": 0,
                "color": null,
                "dayId": "d1",
                "createdAt": "x",
                "updatedAt": "x",
                "notes": [{"id": "n1", "content": "bring coffee", "order": 0, "timeBlockId": "b1", "createdAt": "x", "updatedAt": "x"}]
            }]
        }"##;
        let day: Day = serde_json::from_str(raw).expect("day json");
        assert_eq!(day.date_key(), "2024-01-15");
        assert!(day.is_completed);
        assert!(day.todos().is_empty());
        let block = &day.time_blocks[0];
        assert_eq!(block.end_time.to_string(), "10:30");
        assert_eq!(block.color_or_default(), DEFAULT_BLOCK_COLOR);
        assert_eq!(block.notes[0].content, "bring coffee");
    }

    #[test]
    fn create_block_validation() {
        assert!(block_dto().validate().is_ok());

        let mut inverted = block_dto();
        inverted.end_time = time("08:00");
        assert!(inverted.validate().is_err());

        let mut blank = block_dto();
        blank.name = "  ".to_string();
        assert!(blank.validate().is_err());

        let mut bad_color = block_dto();
        bad_color.color = Some("blue".to_string());
        assert!(bad_color.validate().is_err());
    }

    #[test]
    fn update_block_checks_against_current_times() {
        let raw = r#"{"id":"b1","name":"Focus","startTime":"09:00","endTime":"10:00"}"#;
        let current: TimeBlock = serde_json::from_str(raw).expect("block");

        let later_start = UpdateTimeBlockDto {
            start_time: Some(time("10:30")),
            ..Default::default()
        };
        assert!(later_start.validate_against(&current).is_err());

        let both = UpdateTimeBlockDto {
            start_time: Some(time("10:30")),
            end_time: Some(time("11:30")),
            ..Default::default()
        };
        assert!(both.validate_against(&current).is_ok());
    }

    #[test]
    fn patch_serializes_only_set_fields() {
        let patch = UpdateTodoDto {
            deadline: Some(None),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&patch).expect("json"),
            r#"{"deadline":null}"#
        );
        assert_eq!(
            serde_json::to_string(&UpdateDayDto::default()).expect("json"),
            "{}"
        );
    }

    #[test]
    fn todo_patch_keeps_clear_apart_from_untouched() {
        for patch in [
            UpdateTodoDto {
                deadline: Some(None),
                ..Default::default()
            },
            UpdateTodoDto {
                deadline: Some(Some("2024-02-01".to_string())),
                ..Default::default()
            },
            UpdateTodoDto {
                title: Some("renamed".to_string()),
                ..Default::default()
            },
        ] {
            let json = serde_json::to_string(&patch).expect("json");
            let back: UpdateTodoDto = serde_json::from_str(&json).expect("patch");
            assert_eq!(back, patch, "{json}");
        }

        let cleared: UpdateTodoDto = serde_json::from_str(r#"{"deadline":null}"#).expect("patch");
        assert_eq!(cleared.deadline, Some(None));
        let untouched: UpdateTodoDto = serde_json::from_str("{}").expect("patch");
        assert_eq!(untouched.deadline, None);
    }

    #[test]
    fn event_recurrence_must_be_consistent() {
        let mut dto = CreateEventDto {
            title: "Standup".to_string(),
            date: "2024-01-15".to_string(),
            color: None,
            is_recurring: true,
            recurrence_type: RecurrenceType::None,
        };
        assert!(dto.validate().is_err());
        dto.recurrence_type = RecurrenceType::Weekdays;
        assert!(dto.validate().is_ok());
        dto.is_recurring = false;
        assert!(dto.validate().is_err());
        assert_eq!(
            serde_json::to_value(RecurrenceType::Weekdays).expect("json"),
            serde_json::json!("WEEKDAYS")
        );
    }

    fn template() -> TimeBlockTemplate {
        serde_json::from_value(serde_json::json!({
            "id": "tpl-1",
            "name": "Gym",
            "startTime": "07:00",
            "endTime": "08:00",
            "daysOfWeek": [1, 3, 5],
            "startDate": "2024-01-08"
        }))
        .expect("template")
    }

    #[test]
    fn template_payload_defaults_to_active() {
        let tpl = template();
        assert!(tpl.is_active);
        assert_eq!(tpl.deactivated_from, None);
        assert_eq!(tpl.days_of_week, vec![1, 3, 5]);

        let block: TimeBlock = serde_json::from_str(
            r#"{"id":"b1","name":"Gym","startTime":"07:00","endTime":"08:00","templateId":"tpl-1"}"#,
        )
        .expect("block");
        assert_eq!(block.template_id.as_deref(), Some("tpl-1"));
    }

    #[test]
    fn template_days_of_week_are_iso_numbers() {
        let mut dto = CreateTimeBlockTemplateDto {
            name: "Gym".to_string(),
            start_time: time("07:00"),
            end_time: time("08:00"),
            color: None,
            days_of_week: vec![1, 7],
            start_date: "2024-01-08".to_string(),
        };
        assert!(dto.validate().is_ok());

        for bad in [vec![], vec![0], vec![8], vec![2, 2]] {
            dto.days_of_week = bad.clone();
            assert!(dto.validate().is_err(), "{bad:?} accepted");
        }

        let shift = UpdateTimeBlockTemplateDto {
            start_time: Some(time("08:30")),
            ..Default::default()
        };
        assert!(shift.validate_against(&template()).is_err());
        let days = UpdateTimeBlockTemplateDto {
            days_of_week: Some(vec![6, 7]),
            ..Default::default()
        };
        assert!(days.validate_against(&template()).is_ok());
    }

    #[test]
    fn deactivation_cannot_predate_the_template() {
        let stop = |date: &str| DeactivateTemplateDto {
            from_date: date.to_string(),
        };
        assert!(stop("2024-02-01").validate_against(&template()).is_ok());
        assert!(stop("2024-01-08").validate_against(&template()).is_ok());
        assert!(stop("2024-01-07").validate_against(&template()).is_err());
        assert!(stop("later").validate_against(&template()).is_err());
    }

    #[test]
    fn duplicate_requests() {
        let dto = DuplicateTimeBlockDto::to_day("day-9");
        assert!(dto.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&dto).expect("json"),
            serde_json::json!({"targetDayId": "day-9", "includeNotes": true, "includeTodos": false})
        );
        assert!(DuplicateTimeBlockDto::to_day(" ").validate().is_err());

        assert!(DuplicateTodoDto::default().validate().is_ok());
        let blank = DuplicateTodoDto {
            target_time_block_id: Some(String::new()),
            ..Default::default()
        };
        assert!(blank.validate().is_err());
        assert_eq!(
            serde_json::to_string(&DuplicateTodoDto::default()).expect("json"),
            "{}"
        );
    }

    #[test]
    fn todo_filter_matches_inbox_and_day() {
        let raw = r#"[
            {"id":"t1","title":"inbox item"},
            {"id":"t2","title":"day item","dayId":"d1","isCompleted":true}
        ]"#;
        let todos: Vec<Todo> = serde_json::from_str(raw).expect("todos");

        let inbox = TodoFilterQuery {
            inbox: Some(true),
            ..Default::default()
        };
        let done_on_day = TodoFilterQuery {
            day_id: Some("d1".to_string()),
            is_completed: Some(true),
            ..Default::default()
        };
        assert!(inbox.matches(&todos[0]));
        assert!(!inbox.matches(&todos[1]));
        assert!(done_on_day.matches(&todos[1]));
        assert!(!done_on_day.matches(&todos[0]));
    }
}
