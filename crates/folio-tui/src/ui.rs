use folio_shared::Subject;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::{App, InputFocus, View};
use crate::thread_view::Row;

pub fn draw(f: &mut Frame, app: &App) {
    match app.view {
        View::SubjectSelect => draw_subject_select(f, app),
        View::Thread => draw_thread(f, app),
    }

    if let Some(ref error) = app.error_message {
        draw_error_popup(f, error);
    }

    if app.loading {
        draw_loading_overlay(f, &app.loading_message);
    }
}

fn draw_subject_select(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "FOLIO COMMENTS",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(app.api.actor_name(), Style::default().fg(Color::Yellow)),
    ]))
    .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, chunks[0]);

    let items: Vec<ListItem> = app
        .subjects
        .iter()
        .enumerate()
        .map(|(i, subject)| {
            let marker = if i == app.selected_subject_idx {
                "> "
            } else {
                "  "
            };
            let style = if i == app.selected_subject_idx {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else {
                Style::default()
            };
            let mut spans = vec![
                Span::raw(marker),
                Span::styled(subject.title.as_str(), style),
            ];
            if subject.owner_id == app.api.actor_id() {
                spans.push(Span::styled(
                    "  (yours)",
                    Style::default().fg(Color::DarkGray),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Select Subject ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(list, chunks[1]);

    draw_status_bar(f, chunks[2], "j/k: select | Enter: open | r: reload | q: quit");
}

fn draw_thread(f: &mut Frame, app: &App) {
    let Some(subject) = app.subject.as_ref() else {
        return;
    };

    let has_draft = app.interaction.editing().is_some() || app.interaction.composer().is_some();
    let mut constraints = vec![Constraint::Length(3), Constraint::Min(0)];
    if has_draft {
        constraints.push(Constraint::Length(3));
    }
    constraints.push(Constraint::Length(1));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(f.area());

    draw_thread_header(f, chunks[0], app, subject);
    draw_thread_rows(f, chunks[1], app, subject);
    if has_draft {
        draw_draft_box(f, chunks[2], app);
    }

    let hints = if app.input_focus.is_some() {
        "Enter: submit | Esc: pause draft"
    } else if app.interaction.delete_confirm().is_some() {
        "y: delete thread | n: keep it"
    } else if app.interaction.menu().is_some() {
        "j/k: select | Enter: run | Esc: close"
    } else {
        "j/k: move | Enter: expand/open | m: menu | c: comment | r: refresh | b: back | q: quit"
    };
    draw_status_bar(f, chunks[chunks.len() - 1], hints);

    if app.interaction.menu().is_some() {
        draw_menu_popup(f, app);
    }
}

fn draw_thread_header(f: &mut Frame, area: Rect, app: &App, subject: &Subject) {
    let mut lines = vec![Line::from(vec![
        Span::styled(
            subject.title.as_str(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            format!("{} comments", app.snapshot.len()),
            Style::default().fg(Color::DarkGray),
        ),
    ])];

    // Drilled in: show whose replies these are and how deep we sit
    if let Some(root) = app.thread.root().and_then(|id| app.snapshot.get(id)) {
        let mut spans = vec![
            Span::styled("replies to ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                root.author_display_name.as_str(),
                Style::default().fg(Color::Yellow),
            ),
            Span::styled(
                format!(": {}", flatten(&root.text)),
                Style::default().fg(Color::Gray),
            ),
        ];
        if app.thread.drill_depth() > 1 {
            spans.push(Span::styled(
                format!("  ({} levels in)", app.thread.drill_depth()),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(spans));
    }

    let header = Paragraph::new(lines).block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, area);
}

fn draw_thread_rows(f: &mut Frame, area: Rect, app: &App, subject: &Subject) {
    let rows = app.thread.visible_rows(&app.snapshot);

    if rows.is_empty() {
        let empty = Paragraph::new("No comments yet. Press c to start the thread.")
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(empty, area);
        return;
    }

    let height = area.height as usize;
    let offset = scroll_offset(app.thread.cursor, rows.len(), height);

    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(i, row)| render_row(app, subject, *row, i == app.thread.cursor))
        .collect();

    f.render_widget(List::new(items), area);
}

/// Keeps the cursor's row inside a window of `height` rows.
fn scroll_offset(cursor: usize, total: usize, height: usize) -> usize {
    if height == 0 || total <= height {
        return 0;
    }
    cursor.saturating_sub(height - 1).min(total - height)
}

fn render_row<'a>(app: &'a App, subject: &Subject, row: Row, selected: bool) -> ListItem<'a> {
    let row_style = if selected {
        Style::default().bg(Color::DarkGray)
    } else {
        Style::default()
    };

    match row {
        Row::Comment {
            id,
            depth,
            replies,
            expanded,
            collapsible,
        } => {
            let Some(comment) = app.snapshot.get(id) else {
                return ListItem::new(Line::raw(""));
            };

            let mut spans = vec![Span::raw(" ".repeat(2 * depth))];

            let marker = if replies == 0 {
                "  "
            } else if expanded {
                "v "
            } else {
                "> "
            };
            spans.push(Span::styled(marker, Style::default().fg(Color::DarkGray)));

            spans.push(Span::styled(
                comment.author_display_name.as_str(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ));
            if let Some(label) = subject.badge_for(comment.author_id).label() {
                spans.push(Span::styled(
                    format!(" [{label}]"),
                    Style::default().fg(Color::Yellow),
                ));
            }
            spans.push(Span::styled(
                format!("  {}", comment.created_at.format("%b %d %H:%M")),
                Style::default().fg(Color::DarkGray),
            ));
            if comment.edited_at.is_some() {
                spans.push(Span::styled(
                    " (edited)",
                    Style::default().fg(Color::DarkGray),
                ));
            }

            spans.push(Span::raw("  "));
            spans.push(Span::raw(flatten(&comment.text)));

            if replies > 0 && !expanded {
                spans.push(Span::styled(
                    format!("  [{}]", reply_phrase(replies)),
                    Style::default().fg(Color::LightBlue),
                ));
            } else if collapsible {
                spans.push(Span::styled(
                    "  [Enter: hide replies]",
                    Style::default().fg(Color::DarkGray),
                ));
            }

            if app.interaction.delete_confirm() == Some(id) {
                let descendants = app.snapshot.descendant_count(id);
                let prompt = if descendants == 0 {
                    "  delete? y/n".to_string()
                } else {
                    format!("  delete with {}? y/n", reply_phrase(descendants))
                };
                spans.push(Span::styled(
                    prompt,
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ));
            }

            ListItem::new(Line::from(spans)).style(row_style)
        }
        Row::MoreReplies { depth, replies, .. } => {
            let spans = vec![
                Span::raw(" ".repeat(2 * depth)),
                Span::styled(
                    format!("-> View {} more", reply_phrase(replies)),
                    Style::default()
                        .fg(Color::LightBlue)
                        .add_modifier(Modifier::BOLD),
                ),
            ];
            ListItem::new(Line::from(spans)).style(row_style)
        }
    }
}

fn reply_phrase(count: usize) -> String {
    if count == 1 {
        "1 reply".to_string()
    } else {
        format!("{} replies", count)
    }
}

fn flatten(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
}

fn draw_draft_box(f: &mut Frame, area: Rect, app: &App) {
    // An open edit takes the box over a parked reply draft
    let (title, draft, focused) = if let Some(edit) = app.interaction.editing() {
        (
            " Edit comment ".to_string(),
            edit.draft.as_str(),
            app.input_focus == Some(InputFocus::Editor),
        )
    } else if let Some(composer) = app.interaction.composer() {
        let title = match composer.parent.and_then(|id| app.snapshot.get(id)) {
            Some(parent) => format!(" Reply to {} ", parent.author_display_name),
            None => " New comment ".to_string(),
        };
        (
            title,
            composer.draft.as_str(),
            app.input_focus == Some(InputFocus::Composer),
        )
    } else {
        return;
    };

    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input = Paragraph::new(draft).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border_style),
    );
    f.render_widget(input, area);

    if focused {
        f.set_cursor_position((area.x + 1 + draft.len() as u16, area.y + 1));
    }
}

fn draw_menu_popup(f: &mut Frame, app: &App) {
    let Some(comment_id) = app.interaction.menu() else {
        return;
    };
    let items = app.menu_items_for(comment_id);
    if items.is_empty() {
        return;
    }

    let area = centered_fixed_rect(20, items.len() as u16 + 2, f.area());
    f.render_widget(Clear, area);

    let list_items: Vec<ListItem> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let style = if i == app.interaction.menu_cursor {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(
                format!(" {}", item.label()),
                style,
            )))
        })
        .collect();

    let list = List::new(list_items).block(
        Block::default()
            .title(" Actions ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(list, area);
}

fn draw_status_bar(f: &mut Frame, area: Rect, hints: &str) {
    let status = Paragraph::new(Line::from(vec![
        Span::styled(" folio ", Style::default().bg(Color::Blue).fg(Color::White)),
        Span::raw(" "),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ]));
    f.render_widget(status, area);
}

fn draw_error_popup(f: &mut Frame, error: &str) {
    let area = centered_rect(60, 20, f.area());
    f.render_widget(Clear, area);

    let popup = Paragraph::new(error)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::Red))
        .block(
            Block::default()
                .title(" Error (any key to dismiss) ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        );
    f.render_widget(popup, area);
}

fn draw_loading_overlay(f: &mut Frame, message: &str) {
    let area = centered_rect(40, 10, f.area());
    f.render_widget(Clear, area);

    let popup = Paragraph::new(message)
        .style(Style::default().fg(Color::Cyan))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );
    f.render_widget(popup, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn centered_fixed_rect(width: u16, height: u16, r: Rect) -> Rect {
    let width = width.min(r.width);
    let height = height.min(r.height);
    Rect {
        x: r.x + (r.width - width) / 2,
        y: r.y + (r.height - height) / 2,
        width,
        height,
    }
}
