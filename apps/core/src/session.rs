use crate::animation::EyeAnimation;
use crate::model::RankedMatch;

pub const SEARCH_TRIGGER: &str = "/d ";
const SEARCH_PREFIX: &str = "/d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionMode {
    Normal,
    AppSearch,
    Playback,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSession {
    pub query: String,
    pub matches: Vec<RankedMatch>,
    pub selected: usize,
}

impl SearchSession {
    pub fn selected_match(&self) -> Option<&RankedMatch> {
        self.matches.get(self.selected)
    }

    pub fn move_selection(&mut self, direction: i32) {
        self.selected = next_selection_index(self.selected, self.matches.len(), direction);
    }

    pub fn set_matches(&mut self, matches: Vec<RankedMatch>) {
        self.matches = matches;
        self.selected = 0;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSession {
    words: Vec<String>,
    next: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackStep {
    Word { word: String, is_last: bool },
    Finished,
}

/// Everything the interaction loop mutates. Owned by the shell and touched
/// only from the control thread.
#[derive(Debug)]
pub struct SessionState {
    commands_enabled: bool,
    mode: InteractionMode,
    input: String,
    search: Option<SearchSession>,
    search_generation: u64,
    playback: Option<PlaybackSession>,
    playback_generation: u64,
    pub eye: EyeAnimation,
}

impl SessionState {
    pub fn new(commands_enabled: bool) -> Self {
        Self {
            commands_enabled,
            mode: InteractionMode::Normal,
            input: String::new(),
            search: None,
            search_generation: 0,
            playback: None,
            playback_generation: 0,
            eye: EyeAnimation::default(),
        }
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn commands_enabled(&self) -> bool {
        self.commands_enabled
    }

    pub fn toggle_commands(&mut self) -> bool {
        self.commands_enabled = !self.commands_enabled;
        self.commands_enabled
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input)
    }

    pub fn search(&self) -> Option<&SearchSession> {
        self.search.as_ref()
    }

    pub fn search_mut(&mut self) -> Option<&mut SearchSession> {
        self.search.as_mut()
    }

    pub fn playback(&self) -> Option<&PlaybackSession> {
        self.playback.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.mode == InteractionMode::Playback
    }

    /// Normal -> AppSearch. Refused from any other mode.
    pub fn enter_search(&mut self, query: &str) -> bool {
        if self.mode != InteractionMode::Normal {
            return false;
        }
        self.mode = InteractionMode::AppSearch;
        self.search = Some(SearchSession {
            query: query.trim().to_string(),
            ..SearchSession::default()
        });
        true
    }

    /// AppSearch -> Normal, on commit or abort.
    pub fn leave_search(&mut self) -> Option<SearchSession> {
        if self.mode != InteractionMode::AppSearch {
            return None;
        }
        self.mode = InteractionMode::Normal;
        self.search_generation += 1;
        self.search.take()
    }

    /// Starts a new debounce window and returns its token.
    pub fn bump_search_generation(&mut self) -> u64 {
        self.search_generation += 1;
        self.search_generation
    }

    pub fn is_current_search(&self, generation: u64) -> bool {
        self.mode == InteractionMode::AppSearch && self.search_generation == generation
    }

    /// Any mode -> Playback. A playback already running is superseded: its
    /// generation is retired, so its pending reveals become no-ops.
    pub fn begin_playback(&mut self, text: &str) -> u64 {
        if self.mode == InteractionMode::AppSearch {
            self.leave_search();
        }
        self.playback_generation += 1;
        self.playback = Some(PlaybackSession {
            words: text.split_whitespace().map(str::to_string).collect(),
            next: 0,
        });
        self.mode = InteractionMode::Playback;
        self.eye.set_speaking(true);
        self.playback_generation
    }

    pub fn is_current_playback(&self, generation: u64) -> bool {
        self.mode == InteractionMode::Playback && self.playback_generation == generation
    }

    /// Next word for the given playback, or `None` when that playback has
    /// been superseded.
    pub fn next_playback_step(&mut self, generation: u64) -> Option<PlaybackStep> {
        if !self.is_current_playback(generation) {
            return None;
        }
        let playback = self.playback.as_mut()?;
        match playback.words.get(playback.next) {
            Some(word) => {
                let word = word.clone();
                playback.next += 1;
                Some(PlaybackStep::Word {
                    is_last: playback.next == playback.words.len(),
                    word,
                })
            }
            None => Some(PlaybackStep::Finished),
        }
    }

    /// Playback -> Normal once the last word is shown.
    pub fn finish_playback(&mut self, generation: u64) -> bool {
        if !self.is_current_playback(generation) {
            return false;
        }
        self.playback = None;
        self.mode = InteractionMode::Normal;
        self.eye.set_speaking(false);
        true
    }

    /// Retires the running playback without showing the rest of it.
    pub fn abort_playback(&mut self) -> bool {
        if self.mode != InteractionMode::Playback {
            return false;
        }
        self.playback_generation += 1;
        self.playback = None;
        self.mode = InteractionMode::Normal;
        self.eye.set_speaking(false);
        true
    }

    /// Query text when the input line is in `/d` form.
    pub fn search_query_from_input(&self) -> Option<&str> {
        search_query(&self.input)
    }
}

pub fn search_query(input: &str) -> Option<&str> {
    let rest = input.strip_prefix(SEARCH_PREFIX)?;
    if rest.is_empty() {
        return Some("");
    }
    rest.strip_prefix(' ').map(str::trim)
}

pub fn next_selection_index(current: usize, len: usize, direction: i32) -> usize {
    if len == 0 {
        return 0;
    }

    let max = len - 1;
    if direction < 0 {
        current.saturating_sub(1).min(max)
    } else if direction > 0 {
        (current + 1).min(max)
    } else {
        current.min(max)
    }
}

#[cfg(test)]
mod tests {
    use super::{next_selection_index, search_query, InteractionMode, PlaybackStep, SessionState};

    #[test]
    fn search_only_starts_from_normal() {
        let mut state = SessionState::new(true);
        assert!(state.enter_search("fire"));
        assert_eq!(state.mode(), InteractionMode::AppSearch);
        assert!(!state.enter_search("again"));

        let left = state.leave_search().expect("search session should be returned");
        assert_eq!(left.query, "fire");
        assert_eq!(state.mode(), InteractionMode::Normal);
        assert!(state.leave_search().is_none());
    }

    #[test]
    fn playback_aborts_search() {
        let mut state = SessionState::new(true);
        state.enter_search("");
        let generation = state.begin_playback("hello there");
        assert_eq!(state.mode(), InteractionMode::Playback);
        assert!(state.search().is_none());
        assert!(state.is_current_playback(generation));
        assert!(state.eye.is_speaking());
    }

    #[test]
    fn superseded_playback_yields_nothing() {
        let mut state = SessionState::new(true);
        let first = state.begin_playback("one two");
        let second = state.begin_playback("three");

        assert_eq!(state.next_playback_step(first), None);
        assert!(!state.finish_playback(first));
        assert_eq!(
            state.next_playback_step(second),
            Some(PlaybackStep::Word {
                word: "three".to_string(),
                is_last: true
            })
        );
        assert_eq!(state.next_playback_step(second), Some(PlaybackStep::Finished));
        assert!(state.finish_playback(second));
        assert_eq!(state.mode(), InteractionMode::Normal);
        assert!(!state.eye.is_speaking());
    }

    #[test]
    fn search_generation_tracks_latest_keystroke() {
        let mut state = SessionState::new(true);
        state.enter_search("");
        let stale = state.bump_search_generation();
        let fresh = state.bump_search_generation();
        assert!(!state.is_current_search(stale));
        assert!(state.is_current_search(fresh));
        state.leave_search();
        assert!(!state.is_current_search(fresh));
    }

    #[test]
    fn search_query_requires_prefix_and_space() {
        assert_eq!(search_query("/d "), Some(""));
        assert_eq!(search_query("/d  fire fox "), Some("fire fox"));
        assert_eq!(search_query("/d"), Some(""));
        assert_eq!(search_query("/dx"), None);
        assert_eq!(search_query("/l fire"), None);
    }

    #[test]
    fn toggle_flips_command_flag() {
        let mut state = SessionState::new(true);
        assert!(!state.toggle_commands());
        assert!(!state.commands_enabled());
        assert!(state.toggle_commands());
    }

    #[test]
    fn selection_index_bounds_are_stable() {
        assert_eq!(next_selection_index(0, 0, 1), 0);
        assert_eq!(next_selection_index(0, 3, -1), 0);
        assert_eq!(next_selection_index(1, 3, -1), 0);
        assert_eq!(next_selection_index(1, 3, 1), 2);
        assert_eq!(next_selection_index(2, 3, 1), 2);
        assert_eq!(next_selection_index(1, 3, 0), 1);
        assert_eq!(next_selection_index(5, 3, 0), 2);
    }
}
