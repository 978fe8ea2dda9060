//! Expands event definitions and time-block templates into the dates they
//! occur on.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};
use tracing::{debug, instrument};

use crate::calendar::DateRange;
use crate::datekey::{date_key, parse_date_key};
use crate::model::{
    CalendarEvent, Day, EventOccurrence, RecurrenceType, TemplateOccurrence, TimeBlockTemplate,
};

/// Whether an event anchored on `base` falls on `day`.
///
/// Monthly and yearly events skip periods that lack their anchor day
/// (no Feb 30, no Feb 29 outside leap years).
pub fn occurs_on(base: NaiveDate, recurrence: RecurrenceType, day: NaiveDate) -> bool {
    if day < base {
        return false;
    }
    match recurrence {
        RecurrenceType::None => day == base,
        RecurrenceType::Daily => true,
        RecurrenceType::Weekdays => !is_weekend(day.weekday()),
        RecurrenceType::Weekends => is_weekend(day.weekday()),
        RecurrenceType::Weekly => day.weekday() == base.weekday(),
        RecurrenceType::Monthly => day.day() == base.day(),
        RecurrenceType::Yearly => day.month() == base.month() && day.day() == base.day(),
    }
}

/// Occurrences of a single event inside `range`, in date order.
pub fn occurrences_in_range(
    event: &CalendarEvent,
    range: DateRange,
) -> anyhow::Result<Vec<EventOccurrence>> {
    let base = parse_date_key(&event.date)?;
    let recurrence = if event.is_recurring {
        event.recurrence_type
    } else {
        RecurrenceType::None
    };

    let from = range.start.max(base);
    if from > range.end {
        return Ok(Vec::new());
    }

    let out = DateRange::new(from, range.end)
        .dates()
        .into_iter()
        .filter(|day| occurs_on(base, recurrence, *day))
        .map(|day| EventOccurrence {
            id: event.id.clone(),
            title: event.title.clone(),
            date: event.date.clone(),
            color: event.color.clone(),
            is_recurring: event.is_recurring,
            recurrence_type: event.recurrence_type,
            is_occurrence: day != base,
            occurrence_date: date_key(day),
        })
        .collect();
    Ok(out)
}

/// Occurrences of every event inside `range`, ordered by date then title.
#[instrument(skip(events), fields(count = events.len()))]
pub fn expand_events(
    events: &[CalendarEvent],
    range: DateRange,
) -> anyhow::Result<Vec<EventOccurrence>> {
    let mut out = Vec::new();
    for event in events {
        out.extend(occurrences_in_range(event, range)?);
    }
    out.sort_by(|a, b| {
        a.occurrence_date
            .cmp(&b.occurrence_date)
            .then_with(|| a.title.cmp(&b.title))
    });
    debug!(occurrences = out.len(), "expanded events");
    Ok(out)
}

/// 1 = Monday .. 7 = Sunday.
pub fn iso_weekday(date: NaiveDate) -> u8 {
    match date.weekday() {
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
        Weekday::Sun => 7,
    }
}

/// Dates a template places its block on inside `range`.
///
/// An inactive template without a `deactivated_from` date yields nothing.
pub fn template_occurrences(
    template: &TimeBlockTemplate,
    range: DateRange,
) -> anyhow::Result<Vec<TemplateOccurrence>> {
    if !template.is_active && template.deactivated_from.is_none() {
        return Ok(Vec::new());
    }
    let start = parse_date_key(&template.start_date)?;
    let until = template
        .deactivated_from
        .as_deref()
        .map(parse_date_key)
        .transpose()?;

    let from = range.start.max(start);
    let to = match until.and_then(|stop| stop.pred_opt()) {
        Some(last) => range.end.min(last),
        None if until.is_some() => return Ok(Vec::new()),
        None => range.end,
    };
    if from > to {
        return Ok(Vec::new());
    }

    let out = DateRange::new(from, to)
        .dates()
        .into_iter()
        .filter(|day| template.days_of_week.contains(&iso_weekday(*day)))
        .map(|day| TemplateOccurrence {
            template_id: template.id.clone(),
            name: template.name.clone(),
            start_time: template.start_time,
            end_time: template.end_time,
            color: template.color.clone(),
            occurrence_date: date_key(day),
        })
        .collect();
    Ok(out)
}

/// Occurrences of every template inside `range`, ordered by date then start
/// time.
#[instrument(skip(templates), fields(count = templates.len()))]
pub fn expand_templates(
    templates: &[TimeBlockTemplate],
    range: DateRange,
) -> anyhow::Result<Vec<TemplateOccurrence>> {
    let mut out = Vec::new();
    for template in templates {
        out.extend(template_occurrences(template, range)?);
    }
    out.sort_by(|a, b| {
        a.occurrence_date
            .cmp(&b.occurrence_date)
            .then_with(|| a.start_time.cmp(&b.start_time))
            .then_with(|| a.name.cmp(&b.name))
    });
    debug!(occurrences = out.len(), "expanded templates");
    Ok(out)
}

/// Drops occurrences whose day already holds a block made from the same
/// template.
pub fn pending_template_blocks(
    occurrences: Vec<TemplateOccurrence>,
    days: &BTreeMap<String, Day>,
) -> Vec<TemplateOccurrence> {
    occurrences
        .into_iter()
        .filter(|occurrence| {
            !days.get(&occurrence.occurrence_date).is_some_and(|day| {
                day.time_blocks
                    .iter()
                    .any(|block| block.template_id.as_deref() == Some(occurrence.template_id.as_str()))
            })
        })
        .collect()
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}
