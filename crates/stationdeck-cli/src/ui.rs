//! Terminal rendering

use ratatui::prelude::*;
use ratatui::widgets::*;
use stationdeck::station::Station;
use stationdeck::track::format_clock;

use crate::app::App;
use crate::prompt::Prompt;

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let outer = Block::default()
        .title(format!(" Stationdeck v{} ", env!("CARGO_PKG_VERSION")))
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded);
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let chunks = Layout::vertical([
        Constraint::Length(5), // station + now playing
        Constraint::Length(3), // progress
        Constraint::Min(3),    // prompt or status
        Constraint::Length(2), // help bar
    ])
    .split(inner);

    draw_station(f, app, chunks[0]);
    draw_progress(f, app, chunks[1]);
    match app.prompt {
        Some(ref prompt) => draw_prompt(f, prompt, chunks[2]),
        None => draw_status(f, app, chunks[2]),
    }
    draw_help(f, chunks[3]);
}

fn label(text: &str) -> Span<'_> {
    Span::styled(text, Style::default().fg(Color::DarkGray))
}

fn draw_station(f: &mut Frame, app: &App, area: Rect) {
    let Some(station) = app.station() else {
        let text = Line::from(label("  No station. Press 's' to search."));
        f.render_widget(Paragraph::new(text), area);
        return;
    };

    let state = if station.is_playing() {
        Span::styled("Playing", Style::default().fg(Color::Green))
    } else if station.is_paused() {
        Span::styled("Paused", Style::default().fg(Color::Yellow))
    } else {
        Span::styled("Stopped", Style::default().fg(Color::DarkGray))
    };

    let mut flags = Vec::new();
    if station.as_queue().is_some_and(|q| q.is_repeat()) {
        flags.push("repeat");
    }
    if station.as_playlist().is_some_and(|p| p.is_shuffled()) {
        flags.push("shuffle");
    }
    let flags = if flags.is_empty() {
        String::new()
    } else {
        format!("  [{}]", flags.join(", "))
    };

    let now = match app.now_playing {
        Some(ref track) => track.to_string(),
        None => "---".to_string(),
    };

    let mut text = vec![
        Line::from(vec![
            label("  Station: "),
            Span::styled(station.name(), Style::default().fg(Color::White).bold()),
            Span::raw("  "),
            Span::styled(station.kind().to_string(), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(vec![
            label("  State: "),
            state,
            Span::styled(flags, Style::default().fg(Color::Magenta)),
        ]),
        Line::from(vec![
            label("  Now Playing: "),
            Span::styled(now, Style::default().fg(Color::Yellow)),
        ]),
    ];
    if let Some(next) = station.as_playlist().and_then(|p| p.upcoming().into_iter().next()) {
        text.push(Line::from(vec![
            label("  Up Next: "),
            Span::raw(next.to_string()),
        ]));
    }
    f.render_widget(Paragraph::new(text), area);
}

fn draw_progress(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::DarkGray));

    let progress = app.station().and_then(|s| s.progress());
    match progress {
        Some(p) if !p.total.is_zero() => {
            let ratio = (p.elapsed.as_secs_f64() / p.total.as_secs_f64()).clamp(0.0, 1.0);
            let text = format!(
                "{} / {}  (-{})",
                format_clock(p.elapsed.as_secs()),
                format_clock(p.total.as_secs()),
                format_clock(p.remaining().as_secs())
            );
            let gauge = Gauge::default()
                .block(block)
                .gauge_style(Style::default().fg(Color::Cyan))
                .ratio(ratio)
                .label(text);
            f.render_widget(gauge, area);
        }
        Some(p) => {
            let text = Line::from(format!("  {}", format_clock(p.elapsed.as_secs())));
            f.render_widget(Paragraph::new(text).block(block), area);
        }
        None => {
            let live = app.station().is_some_and(|s| !s.kind().is_queue());
            let text = if live { "  LIVE" } else { "" };
            f.render_widget(
                Paragraph::new(Line::from(label(text))).block(block),
                area,
            );
        }
    }
}

fn draw_prompt(f: &mut Frame, prompt: &Prompt, area: Rect) {
    let block = Block::default()
        .title(prompt.title())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Yellow));

    match prompt {
        Prompt::Input { buffer, .. } => {
            let text = Line::from(vec![
                Span::raw(" > "),
                Span::styled(buffer.as_str(), Style::default().fg(Color::White)),
                Span::styled("_", Style::default().fg(Color::Yellow)),
            ]);
            f.render_widget(Paragraph::new(text).block(block), area);
        }
        Prompt::Select {
            items, selected, ..
        } => {
            let items: Vec<ListItem> = items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    ListItem::new(Line::from(vec![
                        Span::styled(format!("{:>2}) ", i), Style::default().fg(Color::DarkGray)),
                        Span::raw(item.as_str()),
                    ]))
                })
                .collect();
            let list = List::new(items)
                .block(block)
                .highlight_style(
                    Style::default()
                        .bg(Color::DarkGray)
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_symbol("> ");
            let mut state = ListState::default();
            state.select(Some(*selected));
            f.render_stateful_widget(list, area, &mut state);
        }
    }
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let color = if app.status.starts_with("Error") {
        Color::Red
    } else {
        Color::White
    };
    let block = Block::default()
        .title(" Status ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::DarkGray));
    let text = Paragraph::new(Span::styled(app.status.as_str(), Style::default().fg(color)))
        .block(block)
        .wrap(Wrap { trim: true });
    f.render_widget(text, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let keys = [
        ("q", "quit"),
        ("p", "pause"),
        ("n/b", "fwd/back"),
        ("s", "search"),
        ("l", "last search"),
        ("i", "info"),
        ("r", "repeat"),
        ("z", "shuffle"),
        ("j", "jump"),
        ("a", "add"),
        ("d", "delete"),
    ];
    let mut spans = vec![Span::raw(" ")];
    for (key, action) in keys {
        spans.push(Span::styled(
            format!("'{}' ", key),
            Style::default().fg(Color::Yellow),
        ));
        spans.push(Span::raw(format!("{}  ", action)));
    }
    f.render_widget(
        Paragraph::new(Line::from(spans)).wrap(Wrap { trim: false }),
        area,
    );
}
