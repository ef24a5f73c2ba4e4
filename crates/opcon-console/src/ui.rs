use crate::state::{
    App, ConfigFocus, ExperimentFocus, Panel, EXP_ACTION_AUTHORIZE, EXP_ACTION_FINALIZE,
    EXP_ACTION_SUBMIT, EXP_FIELD_AUTH_ID, EXP_FIELD_DESCRIPTION, EXP_FIELD_EXPERIMENTER,
    EXP_FIELD_ID, EXP_FIELD_PLANTS, EXP_FIELD_READY_AGENTS, EXP_FIELD_READY_ID, EXP_FIELD_START,
    EXP_FIELD_STOP, EXP_FIELD_SUPERVISOR, EXP_FIELD_TOPICS, INSTALL_ROWS,
};
use crate::theme;
use chrono::{Local, TimeZone};
use opcon_core::highlight;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

pub fn render(f: &mut Frame, app: &App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(f.size());

    f.render_widget(render_header(app), outer[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(outer[1]);

    render_left(f, app, columns[0]);
    render_log(f, app, columns[1]);
}

fn render_header(app: &App) -> Paragraph<'static> {
    let mut tabs: Vec<Span> = vec![Span::raw("  ")];
    for panel in [
        Panel::Agents,
        Panel::Install,
        Panel::Configs,
        Panel::Experiments,
        Panel::Log,
    ] {
        let label = format!(" {} ", panel.title());
        if panel == app.panel {
            tabs.push(Span::styled(label, theme::SELECTED_STYLE));
        } else {
            tabs.push(Span::styled(label, theme::MUTED));
        }
        tabs.push(Span::raw(" "));
    }

    let note_line = match app.status_note.as_deref() {
        Some(note) => Line::from(Span::styled(
            format!("Last action: {note}"),
            theme::status_note_style(note),
        )),
        None => Line::from(Span::styled("Last action: ready", theme::MUTED)),
    };

    Paragraph::new(Text::from(vec![Line::from(tabs), note_line])).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                format!("opcon :: {}", app.backend_label),
                theme::HEADER_STYLE,
            )),
    )
}

fn render_left(f: &mut Frame, app: &App, area: Rect) {
    let agent_rows = (app.agents.len() as u16 + 4).clamp(6, 12);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(agent_rows),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_agents_table(f, app, chunks[0]);
    match app.panel {
        Panel::Install => render_install(f, app, chunks[1]),
        Panel::Configs => render_configs(f, app, chunks[1]),
        Panel::Experiments => render_experiments(f, app, chunks[1]),
        _ => render_configs_or_blank(f, app, chunks[1]),
    }
    f.render_widget(render_hints(app), chunks[2]);
}

/// With the Agents or Log panel focused the middle area still shows the
/// config store when it is open, so an edit in progress stays visible.
fn render_configs_or_blank(f: &mut Frame, app: &App, area: Rect) {
    if app.config_editor_open {
        render_configs(f, app, area);
    } else {
        let hint = Paragraph::new(Line::from(Span::styled(
            "Tab cycles panels. Open the config store with e, install with Tab->Install.",
            theme::MUTED,
        )))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).border_style(theme::border_style(false)));
        f.render_widget(hint, area);
    }
}

fn format_last_checked(secs: i64) -> String {
    match Local.timestamp_opt(secs, 0) {
        chrono::LocalResult::Single(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        _ => secs.to_string(),
    }
}

fn render_agents_table(f: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(vec!["Identity", "UUID", "Status", "Last checked"])
        .style(theme::HEADER_STYLE);

    let rows: Vec<Row> = app
        .agents
        .iter()
        .map(|agent| {
            let (status_cell, checked_cell) = match app.statuses.get(&agent.identity) {
                Some(entry) => (
                    Cell::from(entry.status.clone()).style(
                        Style::default().fg(theme::agent_status_color(&entry.status)),
                    ),
                    Cell::from(format_last_checked(entry.last_checked)),
                ),
                None => (Cell::from("-").style(theme::MUTED), Cell::from("-").style(theme::MUTED)),
            };
            let row = Row::new(vec![
                Cell::from(agent.identity.clone()),
                Cell::from(agent.id.clone()),
                status_cell,
                checked_cell,
            ]);
            if app.selected_identity() == Some(agent.identity.as_str()) {
                row.style(theme::SELECTED_STYLE)
            } else {
                row
            }
        })
        .collect();

    let focused = app.panel == Panel::Agents;
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(30),
            Constraint::Percentage(30),
            Constraint::Percentage(15),
            Constraint::Percentage(25),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme::border_style(focused))
            .title(format!("Agents ({})", app.agents.len())),
    );
    f.render_widget(table, area);
}

fn field_line(label: &str, value: &str, active: bool) -> Line<'static> {
    let marker = if active { "> " } else { "  " };
    let value_style = if active {
        Style::default().add_modifier(Modifier::UNDERLINED)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::raw(marker.to_string()),
        Span::styled(format!("{label:<14}"), theme::FIELD_LABEL),
        Span::styled(value.to_string(), value_style),
    ])
}

fn action_line(label: &str, active: bool) -> Line<'static> {
    let text = format!("  [ {label} ]");
    if active {
        Line::from(Span::styled(text, theme::SELECTED_STYLE))
    } else {
        Line::from(Span::raw(text))
    }
}

fn render_install(f: &mut Frame, app: &App, area: Rect) {
    let cursor = app.install_cursor;
    let lines = vec![
        field_line("Base dir", &app.install_base_dir, cursor == 0),
        field_line("Config file", &app.install_config_file, cursor == 1),
        field_line("Tag", &app.install_tag, cursor == 2),
        Line::from(""),
        action_line("Install Agent", cursor == INSTALL_ROWS - 1),
    ];
    let form = Paragraph::new(Text::from(lines)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme::border_style(app.panel == Panel::Install))
            .title("Install new agent"),
    );
    f.render_widget(form, area);
}

fn render_configs(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.panel == Panel::Configs;
    if !app.config_editor_open {
        let hint = match app.selected_agent {
            Some(_) => "Config store closed. Press e to open it for the selected agent.",
            None => "Select an agent (Agents panel), then press e to open its config store.",
        };
        let p = Paragraph::new(Line::from(Span::styled(hint, theme::MUTED)))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(theme::border_style(focused))
                    .title("Config store"),
            );
        f.render_widget(p, area);
        return;
    }

    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(area);

    let mut list_lines: Vec<Line> = Vec::new();
    for name in &app.configs {
        let selected = app.selected_config.as_deref() == Some(name.as_str());
        if selected {
            list_lines.push(Line::from(Span::styled(
                format!(" {name} "),
                theme::SELECTED_STYLE,
            )));
        } else {
            list_lines.push(Line::from(format!(" {name}")));
        }
    }
    if app.configs.is_empty() {
        list_lines.push(Line::from(Span::styled(" (no configs)", theme::MUTED)));
    }
    let agent_title = app.selected_identity().unwrap_or("-").to_string();
    let list = Paragraph::new(Text::from(list_lines)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme::border_style(
                focused && app.config_focus == ConfigFocus::List,
            ))
            .title(format!("Configs: {agent_title}")),
    );
    f.render_widget(list, halves[0]);

    if app.add_config_open {
        let cursor = app.add_cursor;
        let lines = vec![
            field_line("Name", &app.new_config_name, cursor == 0),
            field_line("Path", &app.new_config_path, cursor == 1),
            Line::from(""),
            action_line("Store Config", cursor == 2),
        ];
        let form = Paragraph::new(Text::from(lines)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme::border_style(
                    focused && app.config_focus == ConfigFocus::AddForm,
                ))
                .title("Add new config"),
        );
        f.render_widget(form, halves[1]);
        return;
    }

    let dirty = if app.config_dirty { " *" } else { "" };
    let title = match app.selected_config.as_deref() {
        Some(name) => format!("{name}{dirty} (Ctrl+S save, d delete)"),
        None => "no config selected".to_string(),
    };
    let editor = Paragraph::new(app.config_content.clone())
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme::border_style(
                    focused && app.config_focus == ConfigFocus::Editor,
                ))
                .title(title),
        );
    f.render_widget(editor, halves[1]);
}

fn render_experiments(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.panel == Panel::Experiments;
    let halves = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(19), Constraint::Min(0)])
        .split(area);

    let c = app.experiment_cursor;
    let forms_focused = focused && app.experiment_focus == ExperimentFocus::Forms;
    let lines = vec![
        Line::from(Span::styled("Submit", theme::HEADER_STYLE)),
        field_line("Experiment id", &app.experiment_id, forms_focused && c == EXP_FIELD_ID),
        field_line("Experimenter", &app.experimenter, forms_focused && c == EXP_FIELD_EXPERIMENTER),
        field_line("Description", &app.description, forms_focused && c == EXP_FIELD_DESCRIPTION),
        field_line("Start (ISO)", &app.start_time, forms_focused && c == EXP_FIELD_START),
        field_line("Stop (ISO)", &app.stop_time, forms_focused && c == EXP_FIELD_STOP),
        field_line("Plants (a,b)", &app.plants, forms_focused && c == EXP_FIELD_PLANTS),
        action_line("Submit Experiment", forms_focused && c == EXP_ACTION_SUBMIT),
        Line::from(Span::styled("Authorize", theme::HEADER_STYLE)),
        field_line("Experiment id", &app.auth_experiment_id, forms_focused && c == EXP_FIELD_AUTH_ID),
        field_line("Supervisor", &app.supervisor_name, forms_focused && c == EXP_FIELD_SUPERVISOR),
        action_line("Authorize", forms_focused && c == EXP_ACTION_AUTHORIZE),
        Line::from(Span::styled("Finalize", theme::HEADER_STYLE)),
        field_line("Experiment id", &app.ready_experiment_id, forms_focused && c == EXP_FIELD_READY_ID),
        field_line("Agents (a,b)", &app.ready_agents, forms_focused && c == EXP_FIELD_READY_AGENTS),
        field_line("Topics (a,b)", &app.topics_to_log, forms_focused && c == EXP_FIELD_TOPICS),
        action_line("Finalize", forms_focused && c == EXP_ACTION_FINALIZE),
    ];
    let forms = Paragraph::new(Text::from(lines)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme::border_style(forms_focused))
            .title("Experiment manager (Ctrl+B browser)"),
    );
    f.render_widget(forms, halves[0]);

    render_experiment_browser(f, app, halves[1]);
}

fn render_experiment_browser(f: &mut Frame, app: &App, area: Rect) {
    let browser_focused =
        app.panel == Panel::Experiments && app.experiment_focus == ExperimentFocus::Browser;
    let mut lines: Vec<Line> = Vec::new();
    for (i, row) in app.experiments.iter().enumerate() {
        let compact = serde_json::to_string(row).unwrap_or_else(|_| "<unrenderable>".into());
        if browser_focused && i == app.experiment_browser_cursor {
            lines.push(Line::from(Span::styled(compact, theme::SELECTED_STYLE)));
        } else {
            lines.push(Line::from(compact));
        }
    }
    if app.experiments.is_empty() {
        lines.push(Line::from(Span::styled(
            " (no experiments fetched; g refreshes)",
            theme::MUTED,
        )));
    }
    if let Some(detail) = &app.experiment_detail {
        lines.push(Line::from(Span::styled("detail:", theme::HEADER_STYLE)));
        let pretty = serde_json::to_string_pretty(detail).unwrap_or_else(|_| "{}".into());
        for text in pretty.lines() {
            lines.push(Line::from(text.to_string()));
        }
    }
    if let Some(topics) = &app.topics {
        lines.push(Line::from(Span::styled("topics:", theme::HEADER_STYLE)));
        lines.push(Line::from(
            serde_json::to_string(topics).unwrap_or_else(|_| "{}".into()),
        ));
    }
    let browser = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme::border_style(browser_focused))
                .title("Experiments (g list, t topics, Enter detail)"),
        );
    f.render_widget(browser, area);
}

/// Map one raw log line to styled terminal spans via the tokenizer; the
/// same spans drive the markup renderer, so the two views always agree.
fn highlight_line(raw: &str) -> Line<'static> {
    let spans = highlight::tokenize_line(raw);
    if spans.is_empty() {
        return Line::from(raw.to_string());
    }
    let mut out: Vec<Span> = Vec::new();
    let mut cursor = 0;
    for token in &spans {
        if token.start > cursor {
            out.push(Span::raw(raw[cursor..token.start].to_string()));
        }
        out.push(Span::styled(
            token.text(raw).to_string(),
            theme::token_style(token.class),
        ));
        cursor = token.end;
    }
    if cursor < raw.len() {
        out.push(Span::raw(raw[cursor..].to_string()));
    }
    Line::from(out)
}

fn render_log(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.panel == Panel::Log;
    let lines: Vec<Line> = app.log_content.split('\n').map(highlight_line).collect();
    let total = lines.len();
    let log = Paragraph::new(Text::from(lines))
        .scroll((app.log_scroll, 0))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme::border_style(focused))
                .title(format!("Log ({total} lines, r refresh)")),
        );
    f.render_widget(log, area);
}

fn render_hints(app: &App) -> Paragraph<'static> {
    let hints = match app.panel {
        Panel::Agents => "j/k select  s start  x stop  d remove  e configs  r agents  u statuses  q quit",
        Panel::Install => "up/down field  type to edit  Enter on [Install Agent] submits",
        Panel::Configs => "j/k select  Enter edit  n add  d delete  Ctrl+S save  Esc back",
        Panel::Experiments => "up/down field  Enter submit/next  Ctrl+B browser",
        Panel::Log => "r refresh  j/k scroll  q quit",
    };
    Paragraph::new(Line::from(Span::styled(hints, theme::MUTED)))
}
