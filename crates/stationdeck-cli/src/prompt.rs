//! Modal prompts: text entry and list selection

use crossterm::event::KeyCode;
use stationdeck::catalog::SearchHit;

/// What the user can search for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Artist,
    Song,
    Station,
    Radio,
    Playlist,
    Relay,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Artist,
        Category::Song,
        Category::Station,
        Category::Radio,
        Category::Playlist,
        Category::Relay,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Artist => "Artist radio",
            Category::Song => "Song radio",
            Category::Station => "Live station",
            Category::Radio => "Internet radio directory",
            Category::Playlist => "Playlist",
            Category::Relay => "Relay",
        }
    }
}

/// Why a playlist is being chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistUse {
    Play,
    /// Add the current track; the last entry creates a new playlist
    Add,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputPurpose {
    Search(Category),
    NewPlaylist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectPurpose {
    Category,
    /// Search results; an index past the hits asks for the next page
    Hits {
        category: Category,
        term: String,
        offset: usize,
        hits: Vec<SearchHit>,
    },
    Playlist(PlaylistUse),
    Jump,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Input {
        purpose: InputPurpose,
        buffer: String,
    },
    Select {
        purpose: SelectPurpose,
        items: Vec<String>,
        selected: usize,
    },
}

/// Result of feeding a key to a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    Open(Prompt),
    Cancelled,
    Entered(InputPurpose, String),
    Chosen {
        purpose: SelectPurpose,
        items: Vec<String>,
        index: usize,
    },
}

impl Prompt {
    pub fn input(purpose: InputPurpose) -> Self {
        Prompt::Input {
            purpose,
            buffer: String::new(),
        }
    }

    pub fn select(purpose: SelectPurpose, items: Vec<String>) -> Self {
        Prompt::Select {
            purpose,
            items,
            selected: 0,
        }
    }

    pub fn title(&self) -> String {
        match self {
            Prompt::Input { purpose, .. } => match purpose {
                InputPurpose::Search(category) => format!(" Search {} ", category.label()),
                InputPurpose::NewPlaylist => " New playlist name ".to_string(),
            },
            Prompt::Select { purpose, .. } => match purpose {
                SelectPurpose::Category => " What to play ".to_string(),
                SelectPurpose::Hits { term, .. } => format!(" Results for \"{}\" ", term),
                SelectPurpose::Playlist(PlaylistUse::Play) => " Playlists ".to_string(),
                SelectPurpose::Playlist(PlaylistUse::Add) => " Add to playlist ".to_string(),
                SelectPurpose::Jump => " Jump to track ".to_string(),
            },
        }
    }

    pub fn handle_key(self, code: KeyCode) -> PromptOutcome {
        match self {
            Prompt::Input {
                purpose,
                mut buffer,
            } => match code {
                KeyCode::Esc => PromptOutcome::Cancelled,
                KeyCode::Enter => PromptOutcome::Entered(purpose, buffer.trim().to_string()),
                KeyCode::Backspace => {
                    buffer.pop();
                    PromptOutcome::Open(Prompt::Input { purpose, buffer })
                }
                KeyCode::Char(c) => {
                    buffer.push(c);
                    PromptOutcome::Open(Prompt::Input { purpose, buffer })
                }
                _ => PromptOutcome::Open(Prompt::Input { purpose, buffer }),
            },
            Prompt::Select {
                purpose,
                items,
                mut selected,
            } => {
                let last = items.len().saturating_sub(1);
                match code {
                    KeyCode::Esc | KeyCode::Char('q') => return PromptOutcome::Cancelled,
                    KeyCode::Enter if items.is_empty() => return PromptOutcome::Cancelled,
                    KeyCode::Enter => {
                        return PromptOutcome::Chosen {
                            purpose,
                            items,
                            index: selected,
                        }
                    }
                    KeyCode::Up | KeyCode::Char('k') => selected = selected.saturating_sub(1),
                    KeyCode::Down | KeyCode::Char('j') => selected = (selected + 1).min(last),
                    KeyCode::Home => selected = 0,
                    KeyCode::End => selected = last,
                    KeyCode::Char(c) => {
                        if let Some(digit) = c.to_digit(10) {
                            if (digit as usize) <= last {
                                selected = digit as usize;
                            }
                        }
                    }
                    _ => {}
                }
                PromptOutcome::Open(Prompt::Select {
                    purpose,
                    items,
                    selected,
                })
            }
        }
    }
}
