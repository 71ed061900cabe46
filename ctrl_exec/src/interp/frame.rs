//! Interpreter frames

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use util::script::Cursor;

use crate::console::EchoStyle;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Offset separating fail-safe layers from script layers.
pub const FAIL_SAFE_LAYER: u32 = 1000;

/// Layer scripts run by the state machine and by recoveries execute at.
pub const PROXY_LAYER: u32 = 2000;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One level of interpretation.
pub struct Frame {
    pub layer: u32,
    pub mode: FrameMode,
    pub style: EchoStyle,
    pub cursor: Cursor,

    /// What the frame does with the result of the child it is waiting on
    pub(super) pending: Option<Pending>,
}

/// How a frame ended, along with where.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub layer: u32,

    /// Line of the frame's source being read when it ended
    pub line: usize,

    pub exit: FrameExit,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMode {
    /// The operator's prompt
    Interactive,

    /// A script file
    Script,

    /// The body of a fail-safe block
    FailSafe,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameExit {
    /// The source was exhausted
    Finished,

    /// An interrupt was consumed
    Interrupted,

    /// A guarded block failed, the named recovery was run
    Chained(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Pending {
    /// Child is a guarded block with this recovery
    FailSafe(String),

    /// Child is an included script, its result is ignored
    Include,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Frame {
    pub fn new(layer: u32, mode: FrameMode, style: EchoStyle, cursor: Cursor) -> Self {
        Self {
            layer,
            mode,
            style,
            cursor,
            pending: None,
        }
    }

    /// Frame over a script's text.
    ///
    /// A script may start with `SILENT` or `VERBOSE` to select how its commands are echoed.
    pub fn script(layer: u32, text: &str) -> Self {
        let mut cursor = Cursor::from_text(text);

        let style = match cursor.peek_token().and_then(|t| EchoStyle::from_header(&t)) {
            Some(s) => {
                cursor.next_token();
                s
            }
            None => EchoStyle::Compact,
        };

        Self::new(layer, FrameMode::Script, style, cursor)
    }

    /// Frame over the body of a fail-safe block.
    pub fn fail_safe(layer: u32, body: &str) -> Self {
        Self::new(
            layer,
            FrameMode::FailSafe,
            EchoStyle::Compact,
            Cursor::from_text(body),
        )
    }
}

impl FrameExit {
    pub fn is_success(&self) -> bool {
        matches!(self, FrameExit::Finished)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Layer of a fail-safe block entered from the given layer.
///
/// The offset is only added once, nested blocks then count up from it.
pub fn fail_layer(layer: u32) -> u32 {
    if layer < FAIL_SAFE_LAYER {
        layer + FAIL_SAFE_LAYER + 1
    } else {
        layer + 1
    }
}
