use anyhow::Result;
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::line::NORMAL as LINE;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};
use tui_input::Input;
use tui_widgets::popup::Popup;

use crate::config::RgbColor;

use super::app::{App, PaneFocus};
use super::edit::FormFocus;

const FILTER_HELP: &str = "Type to filter  Esc/Enter: focus list";
const CONFIRM_HELP: &str = "Y/Enter: confirm  N/Esc: cancel";
const FORM_HELP: &str =
    "Tab: next field  Ctrl+n: add line  Ctrl+d: clear line  Enter: save  Esc: cancel";
const PATH_MODAL_HELP: &str = "Type path  Enter: accept  Esc: cancel";
const KEY_EDIT_HELP: &str = "Type sort key (blank re-derives)  Enter: apply  Esc: cancel";
const HELP_MODAL_FOOTER: &str = "j/k: scroll  Esc/q: close";

pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    terminal.draw(|frame| draw_frame(frame, app))?;
    Ok(())
}

fn draw_frame(frame: &mut Frame<'_>, app: &mut App) {
    let size = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(frame, layout[0], app);
    draw_body(frame, layout[1], app);
    draw_footer(frame, layout[2], app);
    draw_form_modal(frame, size, app);
    draw_path_modal(frame, size, app);
    draw_confirm_modal(frame, size, app);
    draw_help_modal(frame, size, app);
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let header_style = header_text_style(app);
    let mut spans: Vec<Span> = Vec::new();

    let file = app
        .file_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(no file)".to_string());
    spans.push(Span::styled(format!("LABELDEX {file}"), header_style));
    if app.dirty {
        spans.push(Span::styled(" [+]", selection_style(app)));
    }

    let total = app.contacts.len();
    let visible = app.filtered_indices().len();
    let counts = if visible == total {
        format!("   {total} contact(s)")
    } else {
        format!("   {visible}/{total} contact(s)")
    };
    spans.push(Span::styled(counts, header_style));

    if !app.marked.is_empty() {
        spans.push(Span::styled(
            format!("   {} marked", app.marked.len()),
            marked_style(app),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_body(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(40), Constraint::Min(0)])
        .split(area);
    draw_list_pane(frame, chunks[0], app);
    draw_detail_pane(frame, chunks[1], app);
}

fn draw_list_pane(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let active = matches!(app.focused_pane, PaneFocus::Filter);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(inner);

    draw_filter_header(frame, layout[0], app, active, area.width);
    app.list_height = layout[1].height as usize;
    draw_contact_list(frame, layout[1], app);
}

fn draw_filter_header(frame: &mut Frame<'_>, area: Rect, app: &App, active: bool, outer_width: u16) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    let label = "FILTER: ";
    let label_style = header_text_style(app);
    let value_style = if active {
        selection_style(app)
    } else {
        Style::default()
    };
    let line = Line::from(vec![
        Span::styled(label, label_style),
        Span::styled(app.filter_input.value().to_string(), value_style),
    ]);

    let cursor_column = if active {
        Some(label.len() + app.filter_input.visual_cursor())
    } else {
        None
    };

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    frame.render_widget(Paragraph::new(line), parts[0]);
    if let Some(column) = cursor_column {
        let x = parts[0].x.saturating_add(column as u16);
        frame.set_cursor_position((x, parts[0].y));
    }

    if parts.len() > 1 && parts[1].height > 0 {
        let separator = LINE
            .horizontal
            .to_string()
            .repeat(outer_width.saturating_sub(2) as usize);
        frame.render_widget(
            Paragraph::new(Span::styled(separator, header_text_style(app))),
            parts[1],
        );
    }
}

fn draw_contact_list(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let visible = app.filtered_indices();
    let items: Vec<ListItem> = if visible.is_empty() {
        vec![ListItem::new(Line::from("No contacts"))]
    } else {
        visible
            .iter()
            .map(|&i| {
                let contact = &app.contacts[i];
                let mark = if app.marked.contains(&contact.id) {
                    "*"
                } else {
                    " "
                };
                let width = area.width.saturating_sub(2) as usize;
                let name = truncate(&contact.name, width.saturating_sub(14));
                let key = truncate(&contact.sort_key, 12);
                let mut spans = vec![Span::styled(
                    format!("{mark}{name}"),
                    if app.marked.contains(&contact.id) {
                        marked_style(app)
                    } else {
                        Style::default()
                    },
                )];
                let pad = width
                    .saturating_sub(1 + name.chars().count())
                    .saturating_sub(key.chars().count());
                spans.push(Span::raw(" ".repeat(pad)));
                spans.push(Span::styled(key, header_text_style(app)));
                ListItem::new(Line::from(spans))
            })
            .collect()
    };

    let mut state = ListState::default();
    if !visible.is_empty() {
        state.select(Some(app.selected.min(visible.len() - 1)));
    }

    let list = List::new(items)
        .highlight_style(selection_style(app))
        .highlight_symbol(" ")
        .repeat_highlight_symbol(false);

    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_detail_pane(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let Some(contact) = app.current_contact() else {
        render_centered_words(frame, inner, "No contact selected");
        return;
    };

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(
        contact.name.to_uppercase(),
        header_text_style(app).add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(""));
    for addr in &contact.address_lines {
        lines.push(Line::from(addr.clone()));
    }
    lines.push(Line::from(""));

    if app.editor.active && app.editor.target() == Some(contact.id) {
        let label = "SORTS AS: ";
        lines.push(Line::from(vec![
            Span::styled(label, header_text_style(app)),
            Span::styled(app.editor.value().to_string(), selection_style(app)),
        ]));
        let x = inner
            .x
            .saturating_add((label.len() + app.editor.visual_cursor()) as u16);
        let y = inner.y.saturating_add(lines.len() as u16 - 1);
        frame.set_cursor_position((x, y));
    } else {
        lines.push(Line::from(vec![
            Span::styled("SORTS AS: ", header_text_style(app)),
            Span::raw(contact.sort_key.clone()),
        ]));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let message: String = if app.help_modal.is_some() {
        HELP_MODAL_FOOTER.to_string()
    } else if app.form.is_some() {
        FORM_HELP.to_string()
    } else if app.confirm_modal.is_some() {
        CONFIRM_HELP.to_string()
    } else if app.path_modal.is_some() {
        PATH_MODAL_HELP.to_string()
    } else if app.editor.active {
        KEY_EDIT_HELP.to_string()
    } else if matches!(app.focused_pane, PaneFocus::Filter) {
        FILTER_HELP.to_string()
    } else {
        app.status.clone().unwrap_or_else(|| "READY".to_string())
    };

    let colors = app.ui_colors();
    let style = Style::default()
        .fg(color(colors.status_fg))
        .bg(color(colors.status_bg));

    let background = Block::default().style(Style::default().bg(color(colors.status_bg)));
    frame.render_widget(background, area);
    frame.render_widget(Paragraph::new(message).style(style), area);
}

// =============================================================================
// Modals
// =============================================================================

fn draw_form_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(form) = app.form.as_ref() else {
        return;
    };

    let width = area
        .width
        .saturating_mul(2)
        .saturating_div(3)
        .max(area.width.min(44))
        .min(area.width);
    // Name + addresses + key + blank + help, inside a border.
    let height = ((form.address.len() + 4) as u16 + 2).min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let modal_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, modal_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app))
        .title(Line::from(Span::styled(
            form.title(),
            header_text_style(app),
        )));
    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let mut lines: Vec<Line> = Vec::new();
    let mut cursor: Option<(u16, u16)> = None;

    let push_field = |lines: &mut Vec<Line>,
                          cursor: &mut Option<(u16, u16)>,
                          label: &str,
                          input: &Input,
                          focused: bool| {
        let value_style = if focused {
            selection_style(app)
        } else {
            Style::default()
        };
        if focused {
            let x = inner
                .x
                .saturating_add((label.len() + input.visual_cursor()) as u16);
            let y = inner.y.saturating_add(lines.len() as u16);
            *cursor = Some((x, y));
        }
        lines.push(Line::from(vec![
            Span::styled(label.to_string(), header_text_style(app)),
            Span::styled(input.value().to_string(), value_style),
        ]));
    };

    push_field(
        &mut lines,
        &mut cursor,
        "NAME:     ",
        &form.name,
        form.focus == FormFocus::Name,
    );
    for (i, addr) in form.address.iter().enumerate() {
        push_field(
            &mut lines,
            &mut cursor,
            &format!("ADDR {}:   ", i + 1),
            addr,
            form.focus == FormFocus::Address(i),
        );
    }
    push_field(
        &mut lines,
        &mut cursor,
        "SORT KEY: ",
        &form.key_override,
        form.focus == FormFocus::SortKey,
    );
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        FORM_HELP,
        header_text_style(app),
    )));

    frame.render_widget(Paragraph::new(lines), inner);
    if let Some((x, y)) = cursor {
        frame.set_cursor_position((x, y));
    }
}

fn draw_path_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(modal) = app.path_modal.as_ref() else {
        return;
    };

    let label = "PATH: ";
    let lines = vec![
        Line::from(vec![
            Span::raw(label),
            Span::raw(modal.input.value().to_string()),
        ]),
        Line::from("".to_string()),
        Line::from(PATH_MODAL_HELP.to_string()),
    ];
    let body_text = Text::from(lines);

    let title_line = Line::from(Span::styled(modal.title(), header_text_style(app)));
    let popup = Popup::new(body_text)
        .title(title_line)
        .border_style(border_style(app));

    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);

    if let Some(popup_area) = app.modal_popup.area() {
        let inner = Block::default().borders(Borders::ALL).inner(*popup_area);
        if let Some(m) = app.path_modal.as_ref() {
            let x = inner
                .x
                .saturating_add((label.len() + m.input.visual_cursor()) as u16);
            frame.set_cursor_position((x, inner.y));
        }
    }
}

fn draw_confirm_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(modal) = app.confirm_modal.as_ref() else {
        return;
    };

    let lines = vec![
        Line::from(modal.message.clone()),
        Line::from("".to_string()),
        Line::from(CONFIRM_HELP.to_string()),
    ];
    let body_text = Text::from(lines);

    let title_line = Line::from(Span::styled(modal.title.clone(), header_text_style(app)));
    let popup = Popup::new(body_text)
        .title(title_line)
        .border_style(border_style(app));

    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);
}

fn draw_help_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    if app.help_modal.is_none() {
        return;
    }

    let width = area
        .width
        .saturating_mul(2)
        .saturating_div(3)
        .max(44)
        .min(area.width);
    let height = area
        .height
        .saturating_mul(4)
        .saturating_div(5)
        .max(10)
        .min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let modal_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, modal_area);

    let header_style = header_text_style(app);
    let border_s = border_style(app);

    let lines: Vec<Line> = help_lines()
        .into_iter()
        .map(|(keys, action)| {
            if action.is_empty() {
                Line::from(Span::styled(keys.to_string(), header_style))
            } else {
                Line::from(vec![
                    Span::styled(format!("  {keys:<14}"), header_style),
                    Span::raw(action.to_string()),
                ])
            }
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_s)
        .title(Line::from(Span::styled("HELP", header_style)));
    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);

    if let Some(help) = app.help_modal.as_mut() {
        help.viewport_height = inner.height as usize;
        let start = help.scroll.min(lines.len());
        let end = (start + inner.height as usize).min(lines.len());
        frame.render_widget(Paragraph::new(lines[start..end].to_vec()), inner);
    }
}

/// Key/action pairs shown in the help modal. Entries with an empty action
/// render as section headers.
pub fn help_lines() -> Vec<(&'static str, &'static str)> {
    vec![
        ("GLOBAL", ""),
        ("q", "quit"),
        ("/", "focus the filter box"),
        ("F1 ?", "this help"),
        ("", ""),
        ("LIST", ""),
        ("j/k Up/Down", "move selection"),
        ("PgUp/PgDn", "move by a page"),
        ("Space", "mark or unmark the contact"),
        ("a", "add a contact"),
        ("e", "edit the contact"),
        ("K", "edit the sort key in place"),
        ("x", "delete marked contacts, or the current one"),
        ("o", "open an address file"),
        ("w", "save labels to the current file"),
        ("W", "save labels to a new file"),
        ("", ""),
        ("MODALS", ""),
        ("Enter", "confirm"),
        ("Esc", "cancel"),
        ("Tab/Backtab", "next or previous field"),
        ("Ctrl+n", "add an address line"),
        ("Ctrl+d", "clear the last address line"),
    ]
}

// =============================================================================
// Style helpers
// =============================================================================

fn render_centered_words(frame: &mut Frame<'_>, area: Rect, text: &str) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let lines: Vec<Line> = text
        .split_whitespace()
        .map(|word| Line::from(word.to_string()))
        .collect();
    if lines.is_empty() {
        return;
    }
    let height = (lines.len() as u16).min(area.height);
    let start_y = area.y + (area.height.saturating_sub(height)) / 2;
    let target = Rect {
        x: area.x,
        y: start_y,
        width: area.width,
        height,
    };
    frame.render_widget(
        Paragraph::new(lines).alignment(ratatui::layout::Alignment::Center),
        target,
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn selection_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default()
        .fg(color(colors.selection_fg))
        .bg(color(colors.selection_bg))
}

fn marked_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.marked_fg))
}

fn border_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.border))
}

fn header_text_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.border))
}

fn color(rgb: RgbColor) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}
