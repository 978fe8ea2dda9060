use std::io::Write;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::calendar::{CalendarView, navigate, view_dates, view_range, view_title};
use crate::cli::{Command, NavTarget};
use crate::config::Config;
use crate::datekey::{
    date_key, group_by_date_key, index_by_date_key, parse_date_key, parse_date_param,
};
use crate::recurrence::{expand_events, expand_templates, pending_template_blocks};
use crate::render::{Renderer, ViewData};
use crate::reorder::{apply_reorder, move_by_id, sort_by_order};
use crate::snapshot::Snapshot;
use crate::stats::{Dashboard, DayStats, OverallStats, WeekStats};
use crate::timegrid::{DayWindow, TimeOfDay, position};

/// Options shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    pub cfg: &'a Config,
    pub snapshot: &'a Snapshot,
    pub renderer: &'a Renderer,
    pub today: NaiveDate,
    pub json: bool,
}

#[instrument(skip(ctx, out))]
pub fn dispatch<W: Write>(
    ctx: CommandContext<'_>,
    command: Option<Command>,
    out: &mut W,
) -> anyhow::Result<()> {
    let command = command.unwrap_or(Command::Show {
        view: None,
        date: None,
    });
    debug!(?command, json = ctx.json, "dispatching command");

    match command {
        Command::Show { view, date } => cmd_show(ctx, view.as_deref(), date.as_deref(), out),
        Command::Nav {
            direction,
            view,
            date,
        } => cmd_nav(ctx, direction, view.as_deref(), date.as_deref(), out),
        Command::Range { view, date } => cmd_range(ctx, view.as_deref(), date.as_deref(), out),
        Command::Position {
            start,
            end,
            day_start,
            day_end,
        } => cmd_position(
            ctx,
            &start,
            &end,
            day_start.as_deref(),
            day_end.as_deref(),
            out,
        ),
        Command::Stats { date } => cmd_stats(ctx, date.as_deref(), out),
        Command::Dashboard => cmd_dashboard(ctx, out),
        Command::Reorder { date, active, over } => cmd_reorder(ctx, &date, &active, &over, out),
    }
}

fn resolve_view(ctx: CommandContext<'_>, view: Option<&str>) -> CalendarView {
    view.map(CalendarView::from_param)
        .unwrap_or_else(|| ctx.cfg.default_view())
}

#[instrument(skip(ctx, out))]
fn cmd_show<W: Write>(
    ctx: CommandContext<'_>,
    view: Option<&str>,
    date: Option<&str>,
    out: &mut W,
) -> anyhow::Result<()> {
    let view = resolve_view(ctx, view);
    let reference = parse_date_param(date, ctx.today);
    let range = view_range(reference, view);

    let days = ctx.snapshot.days_in(range)?;
    let events = ctx.snapshot.load_events()?;
    let occurrences = expand_events(&events, range).context("failed to expand events")?;
    let todos = ctx.snapshot.load_todos()?;
    let templates = expand_templates(&ctx.snapshot.load_templates()?, range)
        .context("failed to expand templates")?;
    let templates = pending_template_blocks(templates, &days);
    info!(
        view = view.as_key(),
        reference = %reference,
        days = days.len(),
        occurrences = occurrences.len(),
        templates = templates.len(),
        "rendering view"
    );

    if ctx.json {
        let body = json!({
            "view": view,
            "date": date_key(reference),
            "title": view_title(reference, view),
            "range": range,
            "days": days,
            "events": occurrences,
            "templates": templates,
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
        return Ok(());
    }

    let events = group_by_date_key(occurrences);
    let templates = group_by_date_key(templates);
    let data = ViewData {
        days: &days,
        events: &events,
        templates: &templates,
        todos: &todos,
        today: ctx.today,
    };
    ctx.renderer.write_view(out, view, reference, data, ctx.cfg)
}

#[instrument(skip(ctx, out))]
fn cmd_nav<W: Write>(
    ctx: CommandContext<'_>,
    target: NavTarget,
    view: Option<&str>,
    date: Option<&str>,
    out: &mut W,
) -> anyhow::Result<()> {
    let view = resolve_view(ctx, view);
    let reference = parse_date_param(date, ctx.today);
    let landed = match target.direction() {
        Some(direction) => navigate(reference, view, direction),
        None => ctx.today,
    };
    let title = view_title(landed, view);

    if ctx.json {
        let body = json!({
            "view": view,
            "date": date_key(landed),
            "title": title,
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
    } else {
        writeln!(out, "{}  {title}", date_key(landed))?;
    }
    Ok(())
}

#[instrument(skip(ctx, out))]
fn cmd_range<W: Write>(
    ctx: CommandContext<'_>,
    view: Option<&str>,
    date: Option<&str>,
    out: &mut W,
) -> anyhow::Result<()> {
    let view = resolve_view(ctx, view);
    let reference = parse_date_param(date, ctx.today);
    let dates: Vec<String> = view_dates(reference, view).into_iter().map(date_key).collect();

    if ctx.json {
        let range = view_range(reference, view);
        let body = json!({
            "view": view,
            "start": date_key(range.start),
            "end": date_key(range.end),
            "dates": dates,
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
    } else {
        for key in dates {
            writeln!(out, "{key}")?;
        }
    }
    Ok(())
}

#[instrument(skip(ctx, out))]
fn cmd_position<W: Write>(
    ctx: CommandContext<'_>,
    start: &str,
    end: &str,
    day_start: Option<&str>,
    day_end: Option<&str>,
    out: &mut W,
) -> anyhow::Result<()> {
    let start = TimeOfDay::parse(start).context("invalid block start")?;
    let end = TimeOfDay::parse(end).context("invalid block end")?;

    let base = ctx.cfg.day_window();
    let window = DayWindow::new(
        match day_start {
            Some(raw) => TimeOfDay::parse(raw).context("invalid --day-start")?,
            None => base.start,
        },
        match day_end {
            Some(raw) => TimeOfDay::parse(raw).context("invalid --day-end")?,
            None => base.end,
        },
    );
    if end < start {
        warn!(%start, %end, "block ends before it starts");
    }

    let pos = position(start, end, window);
    if ctx.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&pos)?)?;
    } else {
        writeln!(out, "top {:.2}% height {:.2}%", pos.top, pos.height)?;
    }
    Ok(())
}

#[instrument(skip(ctx, out))]
fn cmd_stats<W: Write>(
    ctx: CommandContext<'_>,
    date: Option<&str>,
    out: &mut W,
) -> anyhow::Result<()> {
    let reference = parse_date_param(date, ctx.today);
    let days = ctx.snapshot.load_days()?;
    let todos = ctx.snapshot.load_todos()?;

    let overall = OverallStats::from_days(&days, ctx.today);
    let index = index_by_date_key(days);
    let day = DayStats::for_date(reference, index.get(&date_key(reference)), &todos);
    let week = WeekStats::for_week(reference, &index, &todos);

    if ctx.json {
        let body = json!({
            "day": day,
            "week": week,
            "overall": overall,
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
        return Ok(());
    }
    ctx.renderer.write_stats(out, &day, &week, &overall)
}

#[instrument(skip(ctx, out))]
fn cmd_dashboard<W: Write>(ctx: CommandContext<'_>, out: &mut W) -> anyhow::Result<()> {
    let days = ctx.snapshot.load_days()?;
    let todos = ctx.snapshot.load_todos()?;
    let events = ctx.snapshot.load_events()?;
    let board = Dashboard::build(&days, &todos, &events, ctx.today)
        .context("failed to build dashboard")?;
    info!(
        today = %ctx.today,
        upcoming = board.upcoming_events.len(),
        "built dashboard"
    );

    if ctx.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&board)?)?;
        return Ok(());
    }
    ctx.renderer.write_dashboard(out, &board)
}

#[instrument(skip(ctx, out))]
fn cmd_reorder<W: Write>(
    ctx: CommandContext<'_>,
    date: &str,
    active: &str,
    over: &str,
    out: &mut W,
) -> anyhow::Result<()> {
    let key = date_key(parse_date_key(date)?);
    let days = index_by_date_key(ctx.snapshot.load_days()?);
    let day = days
        .get(&key)
        .ok_or_else(|| anyhow!("no day recorded for {key}"))?;

    let mut blocks = day.time_blocks.clone();
    sort_by_order(&mut blocks);
    let dto = move_by_id(&mut blocks, active, over)
        .with_context(|| format!("failed to reorder blocks on {key}"))?;
    apply_reorder(&mut blocks, &dto)?;
    info!(day = %key, count = blocks.len(), "reordered time blocks");

    if ctx.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&dto)?)?;
    } else {
        for block in &blocks {
            writeln!(out, "{} {} {}", block.order, block.id, block.name)?;
        }
    }
    Ok(())
}
