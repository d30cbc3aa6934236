use snafu::{OptionExt, Snafu};

use crate::chat::{ChatView, Completion, ConversationId, ShellRequest};
use crate::settings::{ClientSettings, LayoutMode, SettingsError, SettingsStore};

/// Default terminal width used to wrap the transcript.
pub const DEFAULT_RENDER_WIDTH: usize = 80;

pub const HELP_TEXT: &str = "\
commands:
  <text>             send a message (starts a conversation if none is open)
  /new               start an empty conversation
  /reload            reload the conversation list
  /open N            open conversation N
  /delete N          delete conversation N
  /rename N NAME     rename conversation N
  /search QUERY      search every conversation
  /hit N             open the conversation of search hit N
  /filter [TEXT]     filter the conversation list by title
  /sidebar           show or hide the conversation list
  /layout wide|narrow
  /help              show this help
  /quit              exit";

/// One parsed line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Send(String),
    New,
    Reload,
    Open(usize),
    Delete(usize),
    Rename { position: usize, name: String },
    Search(String),
    Hit(usize),
    Filter(String),
    ToggleSidebar,
    Layout(LayoutMode),
    Help,
    Quit,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CommandError {
    #[snafu(display("unknown command `/{name}`, try /help"))]
    UnknownCommand { stage: &'static str, name: String },
    #[snafu(display("`/{name}` expects {expected}"))]
    MissingArgument {
        stage: &'static str,
        name: &'static str,
        expected: &'static str,
    },
    #[snafu(display("`{raw}` is not a list position"))]
    InvalidPosition { stage: &'static str, raw: String },
    #[snafu(display("unknown layout `{raw}`, expected wide or narrow"))]
    UnknownLayout { stage: &'static str, raw: String },
}

impl ShellCommand {
    /// Parses one input line; blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let Some(command) = line.strip_prefix('/') else {
            return Ok(Some(Self::Send(line.to_string())));
        };

        let (name, rest) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };

        let parsed = match name {
            "new" => Self::New,
            "reload" => Self::Reload,
            "open" => Self::Open(parse_position(rest, "open")?),
            "delete" => Self::Delete(parse_position(rest, "delete")?),
            "rename" => {
                let (position, new_name) = rest.split_once(char::is_whitespace).context(
                    MissingArgumentSnafu {
                        stage: "parse-rename",
                        name: "rename",
                        expected: "a position and a name",
                    },
                )?;
                Self::Rename {
                    position: parse_position(position, "rename")?,
                    name: new_name.trim().to_string(),
                }
            }
            "search" => Self::Search(rest.to_string()),
            "hit" => Self::Hit(parse_position(rest, "hit")?),
            "filter" => Self::Filter(rest.to_string()),
            "sidebar" => Self::ToggleSidebar,
            "layout" => Self::Layout(LayoutMode::from_name(rest).context(UnknownLayoutSnafu {
                stage: "parse-layout",
                raw: rest.to_string(),
            })?),
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => {
                return UnknownCommandSnafu {
                    stage: "parse-command",
                    name: other.to_string(),
                }
                .fail();
            }
        };

        Ok(Some(parsed))
    }
}

fn parse_position(raw: &str, name: &'static str) -> Result<usize, CommandError> {
    if raw.is_empty() {
        return MissingArgumentSnafu {
            stage: "parse-position",
            name,
            expected: "a list position",
        }
        .fail();
    }

    raw.parse::<usize>()
        .ok()
        .filter(|position| *position > 0)
        .context(InvalidPositionSnafu {
            stage: "parse-position",
            raw: raw.to_string(),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFlow {
    Continue,
    Quit,
}

/// Terminal shell around the session controller.
///
/// Owns layout state only: whether the sidebar is shown and which layout mode is
/// in effect. Everything about conversations goes through [`ChatView`].
pub struct ChatAppShell {
    chat_view: ChatView,
    settings: SettingsStore,
    layout: LayoutMode,
    sidebar_visible: bool,
    render_width: usize,
    status: Vec<String>,
}

impl ChatAppShell {
    pub fn new(chat_view: ChatView, settings: SettingsStore) -> Self {
        let layout = settings.settings().layout;
        Self {
            chat_view,
            settings,
            layout,
            sidebar_visible: true,
            render_width: DEFAULT_RENDER_WIDTH,
            status: Vec::new(),
        }
    }

    pub fn chat_view(&self) -> &ChatView {
        &self.chat_view
    }

    pub fn chat_view_mut(&mut self) -> &mut ChatView {
        &mut self.chat_view
    }

    pub fn layout(&self) -> LayoutMode {
        self.layout
    }

    pub fn sidebar_visible(&self) -> bool {
        self.sidebar_visible
    }

    pub fn set_render_width(&mut self, width: usize) {
        self.render_width = width;
    }

    pub fn has_pending_requests(&self) -> bool {
        self.chat_view.has_pending_requests()
    }

    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.chat_view.next_completion().await
    }

    pub fn apply(&mut self, completion: Completion) {
        self.chat_view.apply(completion);
        self.handle_shell_requests();
    }

    pub async fn settle(&mut self) {
        while let Some(completion) = self.next_completion().await {
            self.apply(completion);
        }
    }

    /// Parses and runs one line of terminal input.
    pub fn handle_line(&mut self, line: &str) -> ShellFlow {
        match ShellCommand::parse(line) {
            Ok(Some(command)) => self.execute(command),
            Ok(None) => ShellFlow::Continue,
            Err(error) => {
                self.status.push(error.to_string());
                ShellFlow::Continue
            }
        }
    }

    pub fn execute(&mut self, command: ShellCommand) -> ShellFlow {
        match command {
            ShellCommand::Send(text) => {
                if self.chat_view.is_switching_conversation() {
                    self.status
                        .push("conversation is still loading, message not sent".to_string());
                }
                self.chat_view.send_message(text);
            }
            ShellCommand::New => self.chat_view.create_conversation(),
            ShellCommand::Reload => self.chat_view.load_conversations(),
            ShellCommand::Open(position) => {
                if let Some(conversation_id) = self.conversation_at(position) {
                    self.chat_view.activate_conversation(conversation_id);
                }
            }
            ShellCommand::Delete(position) => {
                if let Some(conversation_id) = self.conversation_at(position) {
                    self.chat_view.delete_conversation(conversation_id);
                }
            }
            ShellCommand::Rename { position, name } => {
                if let Some(conversation_id) = self.conversation_at(position) {
                    self.chat_view.rename_conversation(conversation_id, name);
                }
            }
            ShellCommand::Search(query) => self.chat_view.search_messages(query),
            ShellCommand::Hit(position) => {
                if !self.chat_view.open_search_hit(position) {
                    self.status.push(format!("no search hit at position {position}"));
                }
            }
            ShellCommand::Filter(query) => self.chat_view.set_sidebar_filter(query),
            ShellCommand::ToggleSidebar => self.sidebar_visible = !self.sidebar_visible,
            ShellCommand::Layout(layout) => self.change_layout(layout),
            ShellCommand::Help => self.status.push(HELP_TEXT.to_string()),
            ShellCommand::Quit => return ShellFlow::Quit,
        }

        ShellFlow::Continue
    }

    /// Renders one frame and drains the notices and status lines it shows.
    pub fn render(&mut self) -> String {
        let mut lines = Vec::new();

        if self.sidebar_visible {
            lines.push("== conversations ==".to_string());
            lines.extend(self.chat_view.sidebar().render_lines());
            lines.push(String::new());
        }

        lines.push("== transcript ==".to_string());
        lines.extend(self.chat_view.message_list().render_lines(self.render_width));

        let search_lines = self.chat_view.search_results().render_lines();
        if !search_lines.is_empty() {
            lines.push(String::new());
            lines.extend(search_lines);
        }

        for notice in self.chat_view.take_notices() {
            lines.push(format!("! {notice}"));
        }
        lines.append(&mut self.status);

        let pending = self.chat_view.pending_request_count();
        if pending > 0 {
            lines.push(format!("({pending} request(s) pending)"));
        }

        let mut frame = lines.join("\n");
        frame.push('\n');
        frame
    }

    fn conversation_at(&mut self, position: usize) -> Option<ConversationId> {
        let conversation_id = self
            .chat_view
            .sidebar()
            .conversation_at(position)
            .map(|conversation| conversation.id.clone());

        if conversation_id.is_none() {
            self.status.push(format!("no conversation at position {position}"));
        }
        conversation_id
    }

    fn handle_shell_requests(&mut self) {
        for request in self.chat_view.take_shell_requests() {
            match request {
                ShellRequest::HideSidebar => {
                    if self.layout.is_narrow() {
                        self.sidebar_visible = false;
                    }
                }
            }
        }
    }

    fn change_layout(&mut self, layout: LayoutMode) {
        self.layout = layout;
        if !layout.is_narrow() {
            self.sidebar_visible = true;
        }

        if let Err(error) = self.persist_layout(layout) {
            tracing::warn!(%error, "failed to persist layout");
            self.status.push(format!("layout not saved: {error}"));
        }
    }

    fn persist_layout(&self, layout: LayoutMode) -> Result<(), SettingsError> {
        let settings = ClientSettings {
            layout,
            ..ClientSettings::clone(&self.settings.settings())
        };
        self.settings.update(settings)
    }
}
