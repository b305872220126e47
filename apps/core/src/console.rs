use std::collections::VecDeque;

pub const ASSISTANT_LABEL: &str = "SUNDAR 2000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    Line { speaker: Speaker, text: String },
    /// Opens the assistant line that playback words are appended to.
    BeginReply,
    Word(String),
    EndReply,
    Cleared,
}

/// Output produced on the control thread. The front end drains `events`; the
/// rendered view is kept alongside so the session can be inspected.
#[derive(Debug, Default)]
pub struct Console {
    events: VecDeque<ConsoleEvent>,
    rendered: Vec<String>,
    reply_open: bool,
}

impl Console {
    pub fn user(&mut self, text: &str) {
        self.push_line(Speaker::User, format!("> {text}"));
    }

    pub fn assistant(&mut self, text: &str) {
        self.push_line(Speaker::Assistant, format!("{ASSISTANT_LABEL}: {text}"));
    }

    /// Unlabelled assistant-side block, such as command output or help.
    pub fn output(&mut self, text: &str) {
        self.push_line(Speaker::Assistant, text.to_string());
    }

    pub fn begin_reply(&mut self) {
        if self.reply_open {
            self.end_reply();
        }
        self.reply_open = true;
        self.rendered.push(format!("{ASSISTANT_LABEL}:"));
        self.events.push_back(ConsoleEvent::BeginReply);
    }

    pub fn word(&mut self, word: &str) {
        if !self.reply_open {
            self.begin_reply();
        }
        if let Some(last) = self.rendered.last_mut() {
            last.push(' ');
            last.push_str(word);
        }
        self.events.push_back(ConsoleEvent::Word(word.to_string()));
    }

    pub fn end_reply(&mut self) {
        if !self.reply_open {
            return;
        }
        self.reply_open = false;
        self.events.push_back(ConsoleEvent::EndReply);
    }

    pub fn clear(&mut self) {
        self.rendered.clear();
        self.reply_open = false;
        self.events.clear();
        self.events.push_back(ConsoleEvent::Cleared);
    }

    pub fn drain(&mut self) -> Vec<ConsoleEvent> {
        self.events.drain(..).collect()
    }

    pub fn rendered(&self) -> &[String] {
        &self.rendered
    }

    pub fn rendered_text(&self) -> String {
        self.rendered.join("\n")
    }

    fn push_line(&mut self, speaker: Speaker, text: String) {
        if self.reply_open {
            self.end_reply();
        }
        for line in text.lines() {
            self.rendered.push(line.to_string());
        }
        if text.is_empty() {
            self.rendered.push(String::new());
        }
        self.events.push_back(ConsoleEvent::Line { speaker, text });
    }
}
