use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Print, Stylize};
use crossterm::{cursor, queue, terminal};
use log::LevelFilter;

use crate::action_executor::SystemLauncher;
use crate::backend::{BackendError, GeminiBackend, Generator};
use crate::config::{self, Config, ConfigError};
use crate::console::{ConsoleEvent, ASSISTANT_LABEL};
use crate::registry::Registry;
use crate::scheduler::Scheduler;
use crate::session::{InteractionMode, SearchSession};
use crate::shell::{Key, Shell};
use crate::transcript::TranscriptLog;

const MAX_IDLE_WAIT: Duration = Duration::from_millis(250);
const SEARCH_VISIBLE_ROWS: usize = 8;
const EYE_GLYPHS: [&str; 4] = ["○", "◎", "◉", "●"];

#[derive(Debug, Clone, Parser)]
#[command(name = "sundar", version, about = "Conversational shell with app search and guarded commands")]
pub struct CliOptions {
    /// Config file to use instead of the per-user default.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Start with command execution disabled.
    #[arg(long)]
    pub no_commands: bool,
    /// Override the transcript file location.
    #[arg(long, value_name = "PATH")]
    pub transcript: Option<PathBuf>,
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: LevelFilter,
    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    pub print_config: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),
}

/// Loads the config, writing the defaults on first start, then applies the
/// command-line overrides (which are never persisted).
pub fn load_config(options: &CliOptions) -> Result<Config, ConfigError> {
    let mut config = config::load(options.config.as_deref())?;
    if !config.config_path.exists() {
        config::save(&config)?;
        log::info!("wrote default config to {}", config.config_path.display());
    }

    if options.no_commands {
        config.commands_enabled = false;
    }
    if let Some(path) = &options.transcript {
        config.transcript_path = path.clone();
    }
    Ok(config)
}

pub fn run(config: Config, api_key: String) -> Result<(), RuntimeError> {
    log::info!(
        "startup config_path={} model={} descriptor_dirs={}",
        config.config_path.display(),
        config.model,
        config.descriptor_dirs.len()
    );

    let generator: Arc<dyn Generator> = Arc::new(GeminiBackend::new(&config, api_key)?);
    let registry = Registry::from_config(&config);
    let transcript = TranscriptLog::new(config.transcript_path.clone());
    let mut shell = Shell::new(config, registry, Box::new(SystemLauncher::default()), generator)
        .with_transcript(transcript);
    let mut sched = Scheduler::new(Instant::now());

    let _raw = RawModeGuard::enter()?;
    let mut ui = TerminalUi::new(io::stdout());
    shell.start(&mut sched);

    loop {
        sched.run_due(&mut shell, Instant::now());
        ui.render(&mut shell)?;
        if shell.should_quit() {
            break;
        }

        let timeout = poll_timeout(sched.next_due(), Instant::now());
        if event::poll(timeout)? {
            if let Some(key) = map_event(event::read()?) {
                sched.run_due(&mut shell, Instant::now());
                shell.handle_key(key, &mut sched);
            }
        }
    }

    ui.finish()?;
    log::info!("shutdown requested");
    Ok(())
}

/// How long the loop may wait for input before the next timer is due.
pub fn poll_timeout(next_due: Option<Instant>, now: Instant) -> Duration {
    match next_due {
        Some(due) => due.saturating_duration_since(now).min(MAX_IDLE_WAIT),
        None => MAX_IDLE_WAIT,
    }
}

pub fn map_event(event: Event) -> Option<Key> {
    let Event::Key(KeyEvent {
        code,
        modifiers,
        kind,
        ..
    }) = event
    else {
        return None;
    };
    if kind != KeyEventKind::Press {
        return None;
    }

    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Some(Key::Interrupt),
            KeyCode::Char('d') => Some(Key::EndOfInput),
            KeyCode::Char('t') => Some(Key::ToggleCommands),
            _ => None,
        };
    }

    match code {
        KeyCode::Char(ch) => Some(Key::Char(ch)),
        KeyCode::Backspace => Some(Key::Backspace),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Esc => Some(Key::Escape),
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        _ => None,
    }
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(error) = terminal::disable_raw_mode() {
            log::warn!("failed to restore terminal mode: {error}");
        }
    }
}

/// Finished lines go to scrollback; the footer below them is redrawn on
/// every pass.
struct TerminalUi {
    out: Stdout,
    footer_rows: u16,
    reply: Option<String>,
}

impl TerminalUi {
    fn new(out: Stdout) -> Self {
        Self {
            out,
            footer_rows: 0,
            reply: None,
        }
    }

    fn render(&mut self, shell: &mut Shell) -> Result<(), io::Error> {
        let width = terminal::size().map(|(cols, _)| cols.max(1)).unwrap_or(80);
        self.erase_footer()?;

        for event in shell.console_mut().drain() {
            match event {
                ConsoleEvent::Line { text, .. } => {
                    for line in text.lines() {
                        queue!(self.out, Print(line), Print("\r\n"))?;
                    }
                }
                ConsoleEvent::BeginReply => self.reply = Some(format!("{ASSISTANT_LABEL}:")),
                ConsoleEvent::Word(word) => {
                    let reply = self
                        .reply
                        .get_or_insert_with(|| format!("{ASSISTANT_LABEL}:"));
                    reply.push(' ');
                    reply.push_str(&word);
                }
                ConsoleEvent::EndReply => {
                    if let Some(reply) = self.reply.take() {
                        queue!(self.out, Print(reply), Print("\r\n"))?;
                    }
                }
                ConsoleEvent::Cleared => {
                    self.reply = None;
                    queue!(
                        self.out,
                        terminal::Clear(terminal::ClearType::All),
                        terminal::Clear(terminal::ClearType::Purge),
                        cursor::MoveTo(0, 0)
                    )?;
                }
            }
        }

        let lines = footer_lines(shell, self.reply.as_deref());
        let mut rows = 0u16;
        for (index, line) in lines.iter().enumerate() {
            if index > 0 {
                queue!(self.out, Print("\r\n"))?;
            }
            queue!(self.out, Print(line))?;
            rows = rows.saturating_add(wrapped_rows(line, width));
        }
        self.footer_rows = rows;
        self.out.flush()
    }

    fn erase_footer(&mut self) -> Result<(), io::Error> {
        queue!(self.out, cursor::MoveToColumn(0))?;
        if self.footer_rows > 1 {
            queue!(self.out, cursor::MoveUp(self.footer_rows - 1))?;
        }
        queue!(self.out, terminal::Clear(terminal::ClearType::FromCursorDown))?;
        self.footer_rows = 0;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), io::Error> {
        queue!(self.out, Print("\r\n"))?;
        self.out.flush()
    }
}

fn footer_lines(shell: &Shell, reply: Option<&str>) -> Vec<String> {
    let session = shell.session();
    let mut lines = Vec::new();
    if let Some(reply) = reply {
        lines.push(reply.to_string());
    }

    if session.mode() == InteractionMode::AppSearch {
        if let Some(search) = session.search() {
            lines.extend(search_rows(search));
        }
    }

    let eye = EYE_GLYPHS[usize::from(session.eye.intensity_level().min(3))];
    let commands = if session.commands_enabled() {
        "Commands: ON".green()
    } else {
        "Commands: OFF".red()
    };
    let activity = match (shell.pending_replies(), session.mode()) {
        (0, InteractionMode::Playback) => " speaking",
        (0, _) => "",
        _ => " thinking",
    };
    lines.push(format!("{} {ASSISTANT_LABEL}  {commands}{activity}", eye.red()));
    lines.push(format!("> {}", session.input()));
    lines
}

fn search_rows(search: &SearchSession) -> Vec<String> {
    if search.matches.is_empty() {
        return vec!["  (no matching applications)".to_string()];
    }
    let start = search
        .selected
        .saturating_sub(SEARCH_VISIBLE_ROWS - 1)
        .min(search.matches.len().saturating_sub(SEARCH_VISIBLE_ROWS));
    search
        .matches
        .iter()
        .enumerate()
        .skip(start)
        .take(SEARCH_VISIBLE_ROWS)
        .map(|(index, ranked)| {
            let marker = if index == search.selected { ">" } else { " " };
            format!("{marker} {}  [{}]", ranked.entry.name, ranked.score)
        })
        .collect()
}

fn wrapped_rows(line: &str, width: u16) -> u16 {
    let visible = strip_ansi_len(line);
    let width = usize::from(width.max(1));
    let rows = visible.max(1).div_ceil(width);
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn strip_ansi_len(line: &str) -> usize {
    let mut count = 0;
    let mut in_escape = false;
    for ch in line.chars() {
        if in_escape {
            if ch.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if ch == '\u{1b}' {
            in_escape = true;
        } else {
            count += 1;
        }
    }
    count
}
