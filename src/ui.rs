use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::app::{App, InputMode};

const BG: Color = Color::Rgb(10, 16, 28);
const PANEL: Color = Color::Rgb(17, 26, 42);
const ACCENT: Color = Color::Rgb(56, 189, 248);
const MUTED: Color = Color::Rgb(140, 156, 178);
const ERROR: Color = Color::Rgb(248, 113, 113);
const OK: Color = Color::Rgb(52, 211, 153);

pub fn render(frame: &mut Frame, app: &mut App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(frame.area());

    app.set_page_size(root[2].height.saturating_sub(3) as usize);

    render_header(frame, root[0], app);
    render_filter_bar(frame, root[1], app);
    render_table(frame, root[2], app);
    render_footer(frame, root[3], app);

    render_suggestions(frame, root[1], root[2], app);
    if let Some(detail) = app.detail() {
        render_detail_modal(frame, &detail.title, &detail.body);
    }
    if app.show_help() {
        render_help_modal(frame);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled(
            " MANTA ",
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {} ", app.source_label()), Style::default().fg(MUTED)),
        Span::raw(" "),
    ];

    for (index, tab) in app.tabs().iter().enumerate() {
        let label = format!(" {}:{} ", index + 1, tab.title());
        let style = if *tab == app.active_tab() {
            Style::default()
                .fg(Color::Black)
                .bg(OK)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(MUTED)
        };
        spans.push(Span::styled(label, style));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn render_filter_bar(frame: &mut Frame, area: Rect, app: &App) {
    let tab = app.active_tab();
    let Some(bar) = app.filter_bar(tab) else {
        return;
    };
    let filtering = bar.is_attached();

    let mut spans = Vec::new();
    if bar.text().is_empty() && !filtering {
        spans.push(Span::styled(
            bar.placeholder(),
            Style::default().fg(MUTED).add_modifier(Modifier::ITALIC),
        ));
    } else {
        spans.push(Span::styled(
            bar.text().to_string(),
            Style::default().fg(Color::White),
        ));
        if filtering {
            spans.push(Span::styled("▏", Style::default().fg(ACCENT)));
        }
    }
    if let Some(error) = bar.error() {
        spans.push(Span::styled(
            format!("  ✗ {error}"),
            Style::default().fg(ERROR),
        ));
    }

    let block = Block::default()
        .title(format!(" Filter · {} ", tab.title()))
        .borders(Borders::ALL)
        .border_style(if filtering {
            Style::default().fg(ACCENT)
        } else {
            Style::default().fg(MUTED)
        })
        .style(Style::default().bg(PANEL));

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_suggestions(frame: &mut Frame, filter_area: Rect, body_area: Rect, app: &App) {
    let tab = app.active_tab();
    let Some(bar) = app.filter_bar(tab) else {
        return;
    };
    if !bar.is_open() {
        return;
    }
    let suggestions = bar.suggestions();
    if suggestions.is_empty() {
        return;
    }

    let height = (suggestions.len() as u16 + 2).min(body_area.height);
    let area = Rect {
        x: filter_area.x.saturating_add(1),
        y: body_area.y,
        width: filter_area.width.saturating_sub(2).min(60).max(20),
        height,
    };
    frame.render_widget(Clear, area);

    let name_width = suggestions
        .iter()
        .map(|field| field.name.chars().count())
        .max()
        .unwrap_or(0);
    let lines = suggestions
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let highlighted = bar.highlighted() == index as isize;
            let style = if highlighted {
                Style::default()
                    .fg(Color::Black)
                    .bg(ACCENT)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(vec![
                Span::styled(format!(" {:name_width$}:", field.name), style),
                Span::styled(
                    format!("  {} ", field.description),
                    if highlighted {
                        style
                    } else {
                        Style::default().fg(MUTED)
                    },
                ),
            ])
        })
        .collect::<Vec<_>>();

    let popup = Paragraph::new(lines).block(
        Block::default()
            .title("Fields")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(ACCENT))
            .style(Style::default().bg(PANEL)),
    );
    frame.render_widget(popup, area);
}

fn render_table(frame: &mut Frame, area: Rect, app: &App) {
    let tab = app.active_tab();
    let Some(table_data) = app.table(tab) else {
        return;
    };

    if let Some(error) = &table_data.error {
        let panel = Paragraph::new(error.clone())
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title(format!("{} (error)", tab.title()))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(ERROR))
                    .style(Style::default().bg(PANEL)),
            )
            .style(Style::default().fg(ERROR));
        frame.render_widget(panel, area);
        return;
    }

    let visible_rows = app.visible_rows(tab);
    let header_row = Row::new(table_data.headers.iter().map(|header| {
        Cell::from(header.clone()).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(ACCENT));

    let rows = visible_rows.iter().map(|row| {
        Row::new(row.columns.iter().map(|column| {
            let style = match column.as_str() {
                "Online" => Style::default().fg(OK),
                "Offline" => Style::default().fg(ERROR),
                "Degraded" => Style::default().fg(Color::Rgb(251, 191, 36)),
                _ => Style::default().fg(Color::White),
            };
            Cell::from(column.clone()).style(style)
        }))
    });

    let refreshed = table_data
        .last_refreshed
        .map(|at| at.format(" · %H:%M:%S").to_string())
        .unwrap_or_default();
    let block = Block::default()
        .title(format!(
            "{} ({}/{}){refreshed}",
            tab.title(),
            visible_rows.len(),
            table_data.rows.len()
        ))
        .borders(Borders::ALL)
        .border_style(if app.mode() == InputMode::Normal {
            Style::default().fg(ACCENT)
        } else {
            Style::default().fg(MUTED)
        })
        .style(Style::default().bg(PANEL));

    let table = Table::new(rows, column_constraints(table_data.headers.len().max(1)))
        .header(header_row)
        .block(block)
        .column_spacing(1)
        .row_highlight_style(
            Style::default()
                .bg(Color::Rgb(24, 36, 58))
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = TableState::default();
    if !visible_rows.is_empty() {
        state.select(Some(table_data.selected.min(visible_rows.len() - 1)));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let hints = match app.mode() {
        InputMode::Normal => "/ filter  c clear  d details  r reload  ? help  q quit",
        InputMode::Filter => "↑/↓ fields  Enter complete/apply  Ctrl+u clear  Esc close",
    };
    let mode_label = match app.mode() {
        InputMode::Normal => " NRM ",
        InputMode::Filter => " FLT ",
    };

    let spans = vec![
        Span::styled(
            mode_label,
            Style::default()
                .fg(Color::Black)
                .bg(if app.mode() == InputMode::Filter {
                    ACCENT
                } else {
                    OK
                })
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {} ", app.status()), Style::default().fg(Color::White)),
        Span::styled(format!("  {hints}"), Style::default().fg(MUTED)),
    ];

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn render_detail_modal(frame: &mut Frame, title: &str, body: &str) {
    let area = centered_rect(70, 70, frame.area());
    frame.render_widget(Clear, area);

    let modal = Paragraph::new(body.to_string())
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(format!(" {title} "))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn render_help_modal(frame: &mut Frame) {
    let area = centered_rect(68, 62, frame.area());
    frame.render_widget(Clear, area);

    let lines = [
        "Tabs: 1-5 or ←/→ switch resource lists",
        "",
        "Lists: j/k or ↑/↓ select  Ctrl+u/d page  Home/End jump",
        "Details: Enter or d open  Esc close",
        "Reload: r or F5 re-reads the snapshot file",
        "",
        "Filter: / focuses the filter bar",
        "  type field:value predicates, quote values with spaces",
        "  ↑/↓ pick a suggested field, Enter completes it",
        "  Enter applies, Ctrl+u clears, Esc closes then blurs",
        "",
        "Hotkeys: extra bindings load from manta.yaml",
    ]
    .into_iter()
    .map(Line::from)
    .collect::<Vec<_>>();

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn column_constraints(columns: usize) -> Vec<Constraint> {
    if columns == 0 {
        return vec![Constraint::Percentage(100)];
    }

    let width = (100 / columns as u16).max(1);
    (0..columns).map(|_| Constraint::Percentage(width)).collect()
}
