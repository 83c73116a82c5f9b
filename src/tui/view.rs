//! Renders one frame from the engine's [`RenderSnapshot`]. Deliberately
//! thin: layout and styling are a UI backend's concern, not the
//! engine's.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph};

use crate::model::RenderSnapshot;
use crate::player::PlaybackMode;
use crate::tui::app::App;

pub fn draw(frame: &mut Frame, app: &App) {
    let snapshot = app.engine.render_snapshot();
    let area = frame.area();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(area);

    draw_header(frame, rows[0], &snapshot);
    draw_playlist(frame, rows[1], &snapshot);
    draw_footer(frame, rows[2], app, &snapshot);
}

fn draw_header(frame: &mut Frame, area: Rect, snapshot: &RenderSnapshot) {
    let title = snapshot.metadata.title.as_deref().unwrap_or("(no track)");
    let artist = snapshot.metadata.artist.as_deref().unwrap_or("");
    let album = snapshot.metadata.album.as_deref().unwrap_or("");

    let label = if artist.is_empty() && album.is_empty() {
        title.to_string()
    } else {
        format!("{title} — {artist} / {album}")
    };

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(label))
        .ratio(snapshot.progress as f64)
        .gauge_style(Style::default().fg(Color::Cyan));

    frame.render_widget(gauge, area);
}

fn draw_playlist(frame: &mut Frame, area: Rect, snapshot: &RenderSnapshot) {
    let items: Vec<ListItem> = snapshot
        .filter_names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let style = if Some(i) == Some(snapshot.focused_index) {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(name.clone(), style)))
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Playlist"));

    let mut state = ListState::default();
    if !snapshot.filter_names.is_empty() {
        state.select(Some(snapshot.focused_index.min(snapshot.filter_names.len() - 1)));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App, snapshot: &RenderSnapshot) {
    let status = match app.engine.control().get_playback_state() {
        PlaybackMode::Idle => "idle",
        PlaybackMode::Playing => "playing",
        PlaybackMode::Paused => "paused",
    };

    let line = if app.searching {
        format!("/{}", app.search_buf)
    } else if let Some(notice) = app.active_notice() {
        notice.to_string()
    } else {
        format!(
            "{status}  vol {:.0}%{}  repeat {}  [/] search  [q] quit",
            snapshot.volume * 100.0,
            if snapshot.muted { " (muted)" } else { "" },
            snapshot.repeat_mode.as_str(),
        )
    };

    frame.render_widget(Paragraph::new(line).block(Block::default().borders(Borders::ALL)), area);
}
