use std::sync::Arc;
use std::time::Duration;

use crate::action_executor::{self, ProcessLauncher};
use crate::backend::{self, Generator, PendingReply};
use crate::config::Config;
use crate::console::Console;
use crate::instruction::{self, Instruction};
use crate::registry::Registry;
use crate::safety::{self, SafetyVerdict};
use crate::scheduler::{Scheduler, TaskId};
use crate::search;
use crate::session::{search_query, InteractionMode, PlaybackStep, SessionState, SEARCH_TRIGGER};
use crate::transcript::TranscriptLog;

pub const GREETING: &str = "I am a SUNDAR 2000 computer, fully operational and ready to assist.";
pub const GREETING_HINT: &str = "Type /help to see available commands.";
pub const CLEARED_MESSAGE: &str = "Console cleared. I am ready for your commands.";
pub const COMMANDS_DISABLED_MESSAGE: &str = "I'm sorry, but I'm afraid I can't execute system commands at the moment. They have been disabled for security reasons.";
pub const COMMAND_BLOCKED_MESSAGE: &str = "I'm sorry, Dave, but I'm afraid I can't do that. The command has been blocked for safety reasons.";
pub const HELP_TEXT: &str = "Available commands:
/d <query>  - Search applications as you type (Up/Down to select, Enter to launch, Esc to cancel)
/l <query>  - Launch the best matching application
!<command>  - Execute a shell command
/toggle     - Enable or disable command execution (Ctrl+T)
/clear      - Clear the console
/help       - Show this help message
/quit       - Exit (Ctrl+C)";

const REPLY_POLL_INTERVAL: Duration = Duration::from_millis(50);
const EYE_RESET_DELAY: Duration = Duration::from_millis(2000);

pub type ShellScheduler = Scheduler<Shell>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Enter,
    Escape,
    Up,
    Down,
    ToggleCommands,
    Interrupt,
    EndOfInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Empty,
    Help,
    Clear,
    Toggle,
    Quit,
    Search(String),
    Launch(String),
    Exec(String),
    Chat(String),
}

pub fn classify(line: &str) -> ShellCommand {
    let trimmed = line.trim();
    match trimmed {
        "" => return ShellCommand::Empty,
        "/help" => return ShellCommand::Help,
        "/clear" => return ShellCommand::Clear,
        "/toggle" => return ShellCommand::Toggle,
        "/quit" => return ShellCommand::Quit,
        _ => {}
    }

    if let Some(query) = search_query(trimmed) {
        return ShellCommand::Search(query.to_string());
    }
    if let Some(query) = trimmed.strip_prefix("/l ") {
        return ShellCommand::Launch(query.trim().to_string());
    }
    if let Some(command) = trimmed.strip_prefix('!') {
        return ShellCommand::Exec(command.trim().to_string());
    }
    ShellCommand::Chat(trimmed.to_string())
}

pub fn no_application_message(query: &str) -> String {
    format!("I'm sorry, but I'm afraid I couldn't find any applications matching '{query}'")
}

/// The interaction loop's state and every effect it can trigger. All methods
/// run on the control thread; timed follow-ups go through the scheduler.
pub struct Shell {
    config: Config,
    registry: Registry,
    session: SessionState,
    console: Console,
    launcher: Box<dyn ProcessLauncher>,
    generator: Arc<dyn Generator>,
    transcript: Option<TranscriptLog>,
    pending: Vec<PendingReply>,
    poll_armed: bool,
    restore_pulse: Option<f64>,
    trailer: Option<(u64, String)>,
    animation: Option<TaskId>,
    search_refreshes: u64,
    quit: bool,
}

impl Shell {
    pub fn new(
        config: Config,
        registry: Registry,
        launcher: Box<dyn ProcessLauncher>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let session = SessionState::new(config.commands_enabled);
        Self {
            config,
            registry,
            session,
            console: Console::default(),
            launcher,
            generator,
            transcript: None,
            pending: Vec::new(),
            poll_armed: false,
            restore_pulse: None,
            trailer: None,
            animation: None,
            search_refreshes: 0,
            quit: false,
        }
    }

    pub fn with_transcript(mut self, transcript: TranscriptLog) -> Self {
        self.transcript = Some(transcript);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut Console {
        &mut self.console
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn pending_replies(&self) -> usize {
        self.pending.len()
    }

    pub fn search_refresh_count(&self) -> u64 {
        self.search_refreshes
    }

    /// Greets the user and starts the recurring animation tick.
    pub fn start(&mut self, sched: &mut ShellScheduler) {
        self.console.assistant(GREETING);
        self.console.assistant(GREETING_HINT);

        if let Some(previous) = self.animation.take() {
            sched.cancel(previous);
        }
        let interval = Duration::from_millis(self.config.animation_interval_ms.max(1));
        self.animation = Some(sched.every(interval, |shell: &mut Shell, _| {
            shell.session.eye.tick();
        }));
        log::info!(
            "shell started commands_enabled={} transcript={}",
            self.session.commands_enabled(),
            self.transcript
                .as_ref()
                .map(|transcript| transcript.path().display().to_string())
                .unwrap_or_else(|| "off".to_string())
        );
    }

    pub fn handle_key(&mut self, key: Key, sched: &mut ShellScheduler) {
        match key {
            Key::Char(ch) => {
                self.session.input_mut().push(ch);
                self.on_input_changed(sched);
            }
            Key::Backspace => {
                self.session.input_mut().pop();
                self.on_input_changed(sched);
            }
            Key::Up => self.move_selection(-1),
            Key::Down => self.move_selection(1),
            Key::Escape => {
                if self.session.mode() == InteractionMode::AppSearch {
                    self.session.leave_search();
                }
                self.session.input_mut().clear();
            }
            Key::Enter => {
                if self.session.mode() == InteractionMode::AppSearch {
                    self.commit_search();
                } else {
                    let line = self.session.take_input();
                    self.submit(&line, sched);
                }
            }
            Key::ToggleCommands => self.toggle_commands(),
            Key::Interrupt => self.quit = true,
            Key::EndOfInput => {
                if self.session.input().is_empty() {
                    self.quit = true;
                }
            }
        }
    }

    pub fn submit(&mut self, line: &str, sched: &mut ShellScheduler) {
        let command = classify(line);
        if command != ShellCommand::Empty {
            self.console.user(line.trim());
        }

        match command {
            ShellCommand::Empty => {}
            ShellCommand::Help => self.console.output(HELP_TEXT),
            ShellCommand::Clear => {
                self.session.abort_playback();
                self.trailer = None;
                self.console.clear();
                self.console.assistant(CLEARED_MESSAGE);
            }
            ShellCommand::Toggle => self.toggle_commands(),
            ShellCommand::Quit => self.quit = true,
            ShellCommand::Search(query) => {
                *self.session.input_mut() = format!("{SEARCH_TRIGGER}{query}");
                if self.session.enter_search(&query) {
                    self.schedule_search_refresh(sched);
                }
            }
            ShellCommand::Launch(query) => {
                let message = self.launch_best_match(&query);
                self.console.assistant(&message);
                self.record_exchange(line.trim(), &message);
            }
            ShellCommand::Exec(command) => {
                let response = self.execute_guarded(&command).unwrap_or_else(|refusal| refusal);
                self.console.output(&response);
                self.record_exchange(line.trim(), &response);
            }
            ShellCommand::Chat(utterance) => self.ask(&utterance, sched),
        }
    }

    fn toggle_commands(&mut self) {
        let enabled = self.session.toggle_commands();
        log::info!("command execution toggled enabled={enabled}");
        let state = if enabled { "enabled" } else { "disabled" };
        self.console
            .assistant(&format!("System command execution is now {state}."));
    }

    fn on_input_changed(&mut self, sched: &mut ShellScheduler) {
        match self.session.mode() {
            InteractionMode::Normal => {
                if self.session.input() == SEARCH_TRIGGER && self.session.enter_search("") {
                    self.schedule_search_refresh(sched);
                }
            }
            InteractionMode::AppSearch => match self.session.search_query_from_input() {
                Some(query) => {
                    let query = query.to_string();
                    if let Some(search) = self.session.search_mut() {
                        search.query = query;
                    }
                    self.schedule_search_refresh(sched);
                }
                None => {
                    self.session.leave_search();
                }
            },
            InteractionMode::Playback => {}
        }
    }

    fn schedule_search_refresh(&mut self, sched: &mut ShellScheduler) {
        let generation = self.session.bump_search_generation();
        let debounce = Duration::from_millis(self.config.search_debounce_ms);
        sched.after(debounce, move |shell: &mut Shell, _| {
            shell.refresh_search(generation);
        });
    }

    fn refresh_search(&mut self, generation: u64) {
        if !self.session.is_current_search(generation) {
            return;
        }
        let query = match self.session.search() {
            Some(search) => search.query.clone(),
            None => return,
        };
        let matches = self.run_search(&query);
        self.search_refreshes += 1;
        if let Some(search) = self.session.search_mut() {
            search.set_matches(matches);
        }
    }

    fn run_search(&mut self, query: &str) -> Vec<crate::model::RankedMatch> {
        let snapshot = self.registry.get_snapshot();
        search::find_matches_with(
            &snapshot,
            query,
            usize::from(self.config.max_results),
            self.config.match_threshold,
        )
    }

    fn move_selection(&mut self, direction: i32) {
        if let Some(search) = self.session.search_mut() {
            search.move_selection(direction);
        }
    }

    fn commit_search(&mut self) {
        let Some(mut search) = self.session.leave_search() else {
            return;
        };
        self.session.input_mut().clear();
        if search.matches.is_empty() {
            let matches = self.run_search(&search.query);
            search.set_matches(matches);
        }

        match search.selected_match() {
            Some(ranked) => {
                let exec = ranked.entry.exec_command.clone();
                let outcome = action_executor::launch(self.launcher.as_mut(), &exec);
                self.console.assistant(&outcome.message);
            }
            None => self
                .console
                .assistant(&no_application_message(&search.query)),
        }
    }

    fn launch_best_match(&mut self, query: &str) -> String {
        let snapshot = self.registry.get_snapshot();
        match search::best_match(&snapshot, query, self.config.match_threshold) {
            Some(ranked) => {
                log::info!("launching '{}' score={}", ranked.entry.name, ranked.score);
                action_executor::launch(self.launcher.as_mut(), &ranked.entry.exec_command).message
            }
            None => no_application_message(query),
        }
    }

    /// Toggle first, then the denylist, then the blocking shell path.
    /// `Err` carries the refusal shown in place of output.
    fn execute_guarded(&mut self, command: &str) -> Result<String, String> {
        if !self.session.commands_enabled() {
            return Err(COMMANDS_DISABLED_MESSAGE.to_string());
        }
        if let SafetyVerdict::Blocked { pattern } = safety::evaluate(command) {
            log::warn!("blocked command pattern={pattern:?} command={command}");
            return Err(COMMAND_BLOCKED_MESSAGE.to_string());
        }
        Ok(action_executor::run_shell(self.launcher.as_mut(), command))
    }

    fn ask(&mut self, utterance: &str, sched: &mut ShellScheduler) {
        if self.restore_pulse.is_none() {
            self.restore_pulse = Some(self.session.eye.begin_thinking());
        } else {
            self.session.eye.begin_thinking();
        }
        self.pending
            .push(backend::dispatch(Arc::clone(&self.generator), utterance));
        self.arm_reply_poll(sched);
    }

    fn arm_reply_poll(&mut self, sched: &mut ShellScheduler) {
        if self.poll_armed || self.pending.is_empty() {
            return;
        }
        self.poll_armed = true;
        sched.after(REPLY_POLL_INTERVAL, |shell: &mut Shell, sched| {
            shell.poll_replies(sched);
        });
    }

    fn poll_replies(&mut self, sched: &mut ShellScheduler) {
        self.poll_armed = false;
        let mut ready = Vec::new();
        for reply in std::mem::take(&mut self.pending) {
            match reply.try_take() {
                Some(result) => ready.push((reply.utterance().to_string(), result)),
                None => self.pending.push(reply),
            }
        }

        for (utterance, result) in ready {
            let text = match result {
                Ok(text) => text,
                Err(error) => {
                    log::warn!("backend request failed: {error}");
                    backend::malfunction_message(&error)
                }
            };
            self.handle_reply(&utterance, &text, sched);
        }
        self.arm_reply_poll(sched);
    }

    /// Routes any embedded instruction, then plays the remaining prose.
    pub fn handle_reply(&mut self, utterance: &str, reply: &str, sched: &mut ShellScheduler) {
        let (display, trailer) = match instruction::extract(reply) {
            Some(found) => {
                let display = instruction::strip(reply, &found.span);
                let trailer = self.route_instruction(found.instruction);
                (display, trailer)
            }
            None => (reply.trim().to_string(), None),
        };

        let mut logged = display.clone();
        if let Some(extra) = &trailer {
            logged.push_str("\n\n");
            logged.push_str(extra);
        }
        self.record_exchange(utterance, &logged);

        self.begin_playback(&display, trailer, sched);
        sched.after(EYE_RESET_DELAY, |shell: &mut Shell, _| shell.reset_eye());
    }

    fn route_instruction(&mut self, instruction: Instruction) -> Option<String> {
        match instruction {
            Instruction::Terminal {
                command,
                description,
            } => {
                log::info!(
                    "reply requested command={command} description={}",
                    description.as_deref().unwrap_or("-")
                );
                let trailer = match self.execute_guarded(&command) {
                    Ok(output) => format!("Command output:\n{output}"),
                    Err(refusal) => refusal,
                };
                Some(trailer)
            }
            Instruction::System { action, .. } => match action.as_str() {
                "clear" => {
                    self.session.abort_playback();
                    self.trailer = None;
                    self.console.clear();
                    None
                }
                "help" => Some(HELP_TEXT.to_string()),
                "toggle_commands" => {
                    let enabled = self.session.toggle_commands();
                    let state = if enabled { "enabled" } else { "disabled" };
                    Some(format!("System command execution is now {state}."))
                }
                other => {
                    log::warn!("ignoring unknown system action '{other}'");
                    None
                }
            },
        }
    }

    fn record_exchange(&self, user_input: &str, response: &str) {
        if let Some(transcript) = &self.transcript {
            if let Err(error) = transcript.append(user_input, response) {
                log::warn!(
                    "failed to append transcript {}: {error}",
                    transcript.path().display()
                );
            }
        }
    }

    fn begin_playback(&mut self, text: &str, trailer: Option<String>, sched: &mut ShellScheduler) {
        if let Some((_, superseded)) = self.trailer.take() {
            self.console.end_reply();
            self.console.output(&superseded);
        }

        let generation = self.session.begin_playback(text);
        if let Some(trailer) = trailer {
            self.trailer = Some((generation, trailer));
        }
        self.console.begin_reply();
        sched.after(Duration::ZERO, move |shell: &mut Shell, sched| {
            shell.reveal_next_word(generation, sched);
        });
    }

    fn reveal_next_word(&mut self, generation: u64, sched: &mut ShellScheduler) {
        match self.session.next_playback_step(generation) {
            None => {}
            Some(PlaybackStep::Word { word, is_last }) => {
                self.console.word(&word);
                if is_last {
                    self.finish_playback(generation, sched);
                } else {
                    let delay = self.word_delay(&word);
                    sched.after(delay, move |shell: &mut Shell, sched| {
                        shell.reveal_next_word(generation, sched);
                    });
                }
            }
            Some(PlaybackStep::Finished) => self.finish_playback(generation, sched),
        }
    }

    fn finish_playback(&mut self, generation: u64, sched: &mut ShellScheduler) {
        if !self.session.finish_playback(generation) {
            return;
        }
        self.console.end_reply();
        if let Some((owner, trailer)) = self.trailer.take() {
            if owner == generation {
                self.console.output(&trailer);
            } else {
                self.trailer = Some((owner, trailer));
            }
        }

        if let Some(query) = self.session.search_query_from_input().map(str::to_string) {
            if self.session.enter_search(&query) {
                self.schedule_search_refresh(sched);
            }
        }
    }

    /// Pause after a revealed word: longest after sentence punctuation.
    pub fn word_delay(&self, word: &str) -> Duration {
        let millis = if word.contains(['.', '?', '!']) {
            self.config.playback_sentence_delay_ms
        } else if word.contains([',', ';', ':']) {
            self.config.playback_clause_delay_ms
        } else {
            self.config.playback_word_delay_ms
        };
        Duration::from_millis(millis)
    }

    fn reset_eye(&mut self) {
        if !self.pending.is_empty() {
            return;
        }
        if let Some(speed) = self.restore_pulse.take() {
            self.session.eye.reset(speed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, ShellCommand};

    #[test]
    fn classifies_interactive_commands() {
        assert_eq!(classify("  "), ShellCommand::Empty);
        assert_eq!(classify("/help"), ShellCommand::Help);
        assert_eq!(classify(" /clear "), ShellCommand::Clear);
        assert_eq!(classify("/toggle"), ShellCommand::Toggle);
        assert_eq!(classify("/quit"), ShellCommand::Quit);
        assert_eq!(classify("/d fire"), ShellCommand::Search("fire".to_string()));
        assert_eq!(classify("/d"), ShellCommand::Search(String::new()));
        assert_eq!(classify("/l  editor "), ShellCommand::Launch("editor".to_string()));
        assert_eq!(classify("!ls -la"), ShellCommand::Exec("ls -la".to_string()));
        assert_eq!(
            classify("open the pod bay doors"),
            ShellCommand::Chat("open the pod bay doors".to_string())
        );
    }

    #[test]
    fn near_miss_prefixes_go_to_chat() {
        assert_eq!(classify("/dance"), ShellCommand::Chat("/dance".to_string()));
        assert_eq!(classify("/launch x"), ShellCommand::Chat("/launch x".to_string()));
        assert_eq!(classify("/l"), ShellCommand::Chat("/l".to_string()));
    }
}
