//! # Script module
//!
//! Flight scripts are plain text files written in the same command language the operator types at
//! the prompt. This module provides the token cursor used to read them (and the prompt) as well as
//! the loading of script files from the configured script directories.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of text lines, either a script held in memory or the operator's prompt.
pub trait LineSource {
    /// Get the next line without its line terminator, or `None` if the source is exhausted.
    fn next_line(&mut self) -> Option<String>;
}

/// Somewhere scripts can be loaded from by name.
pub trait ScriptStore {
    /// Load the full text of the named script.
    fn load(&self, kind: ScriptKind, name: &str) -> Result<String, ScriptError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A line source over a block of text.
#[derive(Debug, Clone, Default)]
pub struct TextSource {
    lines: VecDeque<String>,
}

/// A whitespace token cursor over a line source.
///
/// Tokens may be separated by any amount of whitespace including line breaks. Numeric arguments
/// are only taken from the line the cursor is currently on.
pub struct Cursor {
    source: Box<dyn LineSource>,

    /// The line currently being read
    line: String,

    /// Byte offset of the read position in `line`
    pos: usize,

    /// A line pulled from the source but not yet consumed
    lookahead: Option<String>,

    /// Number of lines consumed so far
    line_num: usize,
}

/// Script store backed by the two script directories on disk.
#[derive(Debug, Clone)]
pub struct DirScriptStore {
    basic_dir: PathBuf,
    layered_dir: PathBuf,
}

/// Script store held in memory, keyed by kind and name.
#[derive(Debug, Clone, Default)]
pub struct MemScriptStore {
    scripts: HashMap<(ScriptKind, String), String>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The two families of scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    /// Short fixed movement sequences, such as takeoff
    Basic,

    /// Scripts which may include other scripts and fail-safe blocks
    Layered,
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TextSource {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.lines().map(String::from).collect(),
        }
    }
}

impl LineSource for TextSource {
    fn next_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }
}

impl Cursor {
    pub fn new(source: Box<dyn LineSource>) -> Self {
        Self {
            source,
            line: String::new(),
            pos: 0,
            lookahead: None,
            line_num: 0,
        }
    }

    /// Cursor over a block of text.
    pub fn from_text(text: &str) -> Self {
        Self::new(Box::new(TextSource::new(text)))
    }

    /// Number of the line the cursor is on, starting at 1. Zero before anything has been read.
    pub fn line_num(&self) -> usize {
        self.line_num
    }

    /// Read the next token, moving onto following lines as needed.
    pub fn next_token(&mut self) -> Option<String> {
        let (start, end) = self.find_token()?;
        let token = self.line[start..end].to_string();
        self.pos = end;
        Some(token)
    }

    /// Get the next token without consuming it.
    pub fn peek_token(&mut self) -> Option<String> {
        let (start, end) = self.find_token()?;
        Some(self.line[start..end].to_string())
    }

    /// Read a number from the current line.
    ///
    /// Returns `None` if the line has no more tokens or if the next token is not a number. A
    /// token which isn't a number is left in place.
    pub fn next_f32(&mut self) -> Option<f32> {
        self.next_value()
    }

    /// Read a value of any parsable type from the current line, with the same rules as
    /// `next_f32`.
    pub fn next_value<T: FromStr>(&mut self) -> Option<T> {
        let (start, end) = self.token_bounds();

        if start == end {
            return None;
        }

        match self.line[start..end].parse::<T>() {
            Ok(v) => {
                self.pos = end;
                Some(v)
            }
            Err(_) => None,
        }
    }

    /// Take everything left on the current line.
    pub fn rest_of_line(&mut self) -> String {
        let rest = self.line[self.pos..].to_string();
        self.pos = self.line.len();
        rest
    }

    /// Take the next line if it is indented by a tab, returning it with that tab removed.
    pub fn next_line_if_indented(&mut self) -> Option<String> {
        if self.lookahead.is_none() {
            self.lookahead = self.source.next_line();
        }

        let indented = matches!(self.lookahead.as_deref(), Some(l) if l.starts_with('\t'));
        if !indented {
            return None;
        }

        let line = self.lookahead.take()?;
        self.line_num += 1;
        Some(line[1..].to_string())
    }

    /// Bounds of the next token on the current line, equal if there is none.
    fn token_bounds(&self) -> (usize, usize) {
        let rest = &self.line[self.pos..];
        let start = match rest.find(|c: char| !c.is_whitespace()) {
            Some(i) => self.pos + i,
            None => return (self.line.len(), self.line.len()),
        };
        let end = match self.line[start..].find(char::is_whitespace) {
            Some(i) => start + i,
            None => self.line.len(),
        };

        (start, end)
    }

    /// Bounds of the next token, pulling new lines until one is found.
    fn find_token(&mut self) -> Option<(usize, usize)> {
        loop {
            let (start, end) = self.token_bounds();
            if start < end {
                self.pos = start;
                return Some((start, end));
            }

            self.line = match self.lookahead.take() {
                Some(l) => l,
                None => self.source.next_line()?,
            };
            self.pos = 0;
            self.line_num += 1;
        }
    }
}

impl DirScriptStore {
    pub fn new(basic_dir: PathBuf, layered_dir: PathBuf) -> Self {
        Self {
            basic_dir,
            layered_dir,
        }
    }

    /// Full path to a script.
    pub fn path(&self, kind: ScriptKind, name: &str) -> PathBuf {
        match kind {
            ScriptKind::Basic => self.basic_dir.join(name),
            ScriptKind::Layered => self.layered_dir.join(name),
        }
    }
}

impl ScriptStore for DirScriptStore {
    fn load(&self, kind: ScriptKind, name: &str) -> Result<String, ScriptError> {
        let path = self.path(kind, name);

        // Check that the script file exists.
        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(format!("{}", path.display())));
        }

        fs::read_to_string(path).map_err(ScriptError::ScriptLoadError)
    }
}

impl MemScriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a script to the store, replacing any with the same kind and name.
    pub fn insert(&mut self, kind: ScriptKind, name: &str, text: &str) {
        self.scripts.insert((kind, name.to_string()), text.to_string());
    }

    /// Builder form of `insert`.
    pub fn with(mut self, kind: ScriptKind, name: &str, text: &str) -> Self {
        self.insert(kind, name, text);
        self
    }
}

impl ScriptStore for MemScriptStore {
    fn load(&self, kind: ScriptKind, name: &str) -> Result<String, ScriptError> {
        self.scripts
            .get(&(kind, name.to_string()))
            .cloned()
            .ok_or_else(|| ScriptError::ScriptNotFound(format!("{:?}:{}", kind, name)))
    }
}
