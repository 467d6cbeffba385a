//! Review command: interactive extraction for one stored document.
//!
//! The controller hands out background commands; each one is spawned and its
//! message comes back through an unbounded channel that the draw loop drains
//! between key polls.

use std::io::{stdout, Stdout};
use std::sync::Arc;
use std::time::Duration;

use console::style;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use tokio::sync::mpsc;

use docintake::config::{Config, Settings};
use docintake::ocr::{Capabilities, TesseractOcr};
use docintake::repository::DocumentStore;
use docintake::services::{Cmd, ExtractionController, ExtractionState, Msg, StepKind, StepStatus};
use docintake::utils::{format_size, truncate_chars};

use super::helpers;

/// Log lines shown per expanded step.
const MAX_LOG_LINES: usize = 8;

/// How the review loop ended.
enum Outcome {
    Accepted(ExtractionState),
    Discarded,
}

/// Open a document for review in the terminal UI.
pub async fn cmd_review(settings: &Settings, config: &Config, doc_id: i64) -> anyhow::Result<()> {
    let store: Arc<dyn DocumentStore> = Arc::new(helpers::open_store(settings)?);
    let extraction = &config.extraction;
    let caps = Capabilities::detect(&extraction.tools);
    let ocr = TesseractOcr::with_config(extraction.tools.clone(), extraction.ocr_config());

    let mut controller = ExtractionController::new(store, ocr, caps)
        .with_max_content_chars(extraction.max_content_chars);
    if let Some(llm) = helpers::llm_client(&config.llm) {
        controller = controller.with_llm(llm);
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<Msg>();
    // Open before entering TUI mode so a missing document prints normally
    if let Some(cmd) = controller.open(doc_id)? {
        spawn_cmd(&tx, cmd);
    }

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_review_loop(&mut terminal, &mut controller, &tx, &mut rx).await;

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    match result? {
        Outcome::Accepted(state) => {
            println!(
                "{} Saved extraction results for document {}",
                style("✓").green(),
                state.doc_id
            );
            if let Some(hints) = &state.hints {
                helpers::print_hints(hints);
            }
        }
        Outcome::Discarded => {
            controller.discard();
            println!("{} Discarded, nothing was saved", style("!").yellow());
        }
    }
    Ok(())
}

/// Run a command in the background and send its message back.
fn spawn_cmd(tx: &mpsc::UnboundedSender<Msg>, cmd: Cmd) {
    let tx = tx.clone();
    tokio::spawn(async move {
        // Receiver gone means the review loop already exited
        let _ = tx.send(cmd.await);
    });
}

/// Main TUI event loop.
async fn run_review_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    controller: &mut ExtractionController,
    tx: &mpsc::UnboundedSender<Msg>,
    rx: &mut mpsc::UnboundedReceiver<Msg>,
) -> anyhow::Result<Outcome> {
    let poll_duration = Duration::from_millis(50);
    let mut notice = String::new();

    loop {
        while let Ok(msg) = rx.try_recv() {
            if let Some(cmd) = controller.handle(msg) {
                spawn_cmd(tx, cmd);
            }
        }

        let Some(state) = controller.state() else {
            return Ok(Outcome::Discarded);
        };
        terminal.draw(|frame| draw_review(frame, state, &notice))?;

        if !event::poll(poll_duration)? {
            // Let spawned work make progress between polls
            tokio::task::yield_now().await;
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        notice.clear();

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc | KeyCode::Char('d') => {
                return Ok(Outcome::Discarded)
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(Outcome::Discarded)
            }
            KeyCode::Up | KeyCode::Char('k') => controller.cursor_up(),
            KeyCode::Down | KeyCode::Char('j') => controller.cursor_down(),
            KeyCode::Enter | KeyCode::Char(' ') => controller.toggle_expand(),
            KeyCode::Char('a') => match controller.accept() {
                Ok(Some(state)) => return Ok(Outcome::Accepted(state)),
                Ok(None) => notice = accept_blocked_reason(controller.state()),
                Err(e) => notice = format!("Save failed: {}", e),
            },
            KeyCode::Char('r') => match controller.rerun_llm() {
                Some(cmd) => spawn_cmd(tx, cmd),
                None => notice = "LLM can be re-run once all steps finish, with the cursor on it".into(),
            },
            _ => {}
        }
    }
}

fn accept_blocked_reason(state: Option<&ExtractionState>) -> String {
    match state {
        Some(s) if s.has_failure() => "Cannot accept: a step failed (d to discard)".into(),
        Some(s) if !s.is_complete() => "Still running".into(),
        _ => "Nothing to accept".into(),
    }
}

fn status_span(status: StepStatus) -> Span<'static> {
    match status {
        StepStatus::Pending => Span::styled("·", Style::default().fg(Color::DarkGray)),
        StepStatus::Running => Span::styled("●", Style::default().fg(Color::Yellow)),
        StepStatus::Done => Span::styled("✓", Style::default().fg(Color::Green)),
        StepStatus::Failed => Span::styled("✗", Style::default().fg(Color::Red)),
    }
}

/// Step list with expanded logs.
fn step_lines(state: &ExtractionState) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (i, kind) in StepKind::ALL.into_iter().enumerate() {
        let marker = if i == state.cursor { "> " } else { "  " };
        if !state.applies(kind) {
            lines.push(Line::from(vec![
                Span::raw(marker),
                Span::styled(
                    format!("- {:<5} not applicable", kind.label()),
                    Style::default().fg(Color::DarkGray),
                ),
            ]));
            continue;
        }

        let step = state.step(kind);
        let elapsed = step
            .elapsed()
            .map(|d| format!("{:.1}s", d.as_secs_f64()))
            .unwrap_or_default();
        let detail_style = if step.status == StepStatus::Failed {
            Style::default().fg(Color::Red)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::raw(marker),
            status_span(step.status),
            Span::raw(" "),
            Span::styled(format!("{:<5}", kind.label()), Style::default().bold()),
            Span::raw(format!(" {:<14}", step.metric)),
            Span::styled(truncate_chars(&step.detail, 60), detail_style),
            Span::styled(format!("  {}", elapsed), Style::default().fg(Color::DarkGray)),
        ]));

        if state.is_expanded(kind) {
            let skip = step.logs.len().saturating_sub(MAX_LOG_LINES);
            for log in step.logs.iter().skip(skip) {
                lines.push(Line::styled(
                    format!("      {}", truncate_chars(log, 100)),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }
    }
    lines
}

/// Draw the review TUI.
fn draw_review(frame: &mut Frame, state: &ExtractionState, notice: &str) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(8),    // Steps
            Constraint::Length(if state.hints.is_some() { 12 } else { 0 }),
            Constraint::Length(1), // Notice
            Constraint::Length(1), // Footer
        ])
        .split(area);

    // Header
    let header = Paragraph::new(format!(
        "docintake review   #{}  {}  ({}, {})",
        state.doc_id,
        state.filename,
        state.mime,
        format_size(state.size_bytes)
    ))
    .style(Style::default().bold())
    .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    // Steps
    let steps = Paragraph::new(step_lines(state)).block(
        Block::default()
            .title(" STEPS ")
            .title_style(Style::default().fg(Color::Cyan).bold())
            .borders(Borders::TOP),
    );
    frame.render_widget(steps, chunks[1]);

    // Hints
    if let Some(hints) = &state.hints {
        let lines: Vec<Line> = hints
            .display_lines()
            .into_iter()
            .map(|(label, value)| {
                Line::from(vec![
                    Span::styled(format!("  {:<12}", label), Style::default().fg(Color::Cyan)),
                    Span::raw(value),
                ])
            })
            .collect();
        let panel = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
            Block::default()
                .title(" HINTS ")
                .title_style(Style::default().fg(Color::Cyan).bold())
                .borders(Borders::TOP),
        );
        frame.render_widget(panel, chunks[2]);
    }

    let notice = Paragraph::new(notice.to_string()).style(Style::default().fg(Color::Yellow));
    frame.render_widget(notice, chunks[3]);

    // Footer
    let accept_style = if state.can_accept() {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let footer = Line::from(vec![
        Span::styled("a accept", accept_style),
        Span::styled(
            "  d discard  r re-run LLM  ↑/↓ move  enter expand  q quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(footer), chunks[4]);
}
