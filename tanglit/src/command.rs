//! Command recognition: classifying lines of a literate document.

use std::path::PathBuf;

use crate::config::CommandMarker;
use crate::errors::{Result, TangleError};

/// A block reference carried by `codeinsert` and `codedefinition`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRef {
    /// Name of the referenced block.
    pub name: String,
    /// Explicit source file from a `src:` clause, if any.
    pub src: Option<PathBuf>,
}

impl BlockRef {
    /// Creates a reference without an explicit source file.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            src: None,
        }
    }

    /// Creates a reference with an explicit source file.
    pub fn with_src(name: impl Into<String>, src: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            src: Some(src.into()),
        }
    }
}

/// A command line split into its name and the remainder after the colon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommand {
    /// The command name, taken from the first token after the marker.
    pub name: String,
    /// Everything after the first `:`, trimmed. `None` when the line
    /// carries no colon clause.
    pub rest: Option<String>,
}

/// A fully parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `codefile: <path>` — truncate-open a destination, start writing.
    File(PathBuf),
    /// `codecontinue: <path>` — append-open a destination, start writing.
    Continue(PathBuf),
    /// `codeend` — close the destination, stop writing.
    End,
    /// `codepause` — close the destination, stop writing.
    Pause,
    /// `codeinsert: <block> [src: <path>]` — splice a block here.
    Insert(BlockRef),
    /// `codedefinition: <block> [src: <path>]` — splice a block, searched
    /// back where the enclosing block itself was included from.
    Definition(BlockRef),
    /// `codecomment` — annotation inside a block, dropped from output.
    Comment,
    /// `codeblock: <name>` — start of a named block.
    BlockStart(String),
    /// `codeblockend` — end of the current block.
    BlockEnd,
}

/// Extracts a raw command from a line, if the line opens with the marker.
///
/// Returns `None` for plain text and for marker lines with no command
/// name at all.
pub fn match_command(marker: &CommandMarker, line: &str) -> Option<RawCommand> {
    if !marker.is_command_line(line) {
        return None;
    }
    let caps = marker.pattern().captures(line)?;
    let name = caps.name("name")?.as_str().to_string();
    if name.is_empty() {
        return None;
    }
    // The argument is whatever follows the first `:` on the line; a space
    // between the command name and the colon is accepted.
    let rest = line[caps.get(0)?.end()..]
        .split_once(':')
        .map(|(_, rest)| rest.trim().to_string());
    Some(RawCommand { name, rest })
}

impl Command {
    /// Parses a raw command.
    ///
    /// Returns `Ok(None)` for names outside the command vocabulary, which
    /// callers ignore: prose may contain the marker incidentally. A known
    /// name missing its required argument is a [`TangleError::MalformedCommand`].
    pub fn from_raw(raw: &RawCommand) -> Result<Option<Command>> {
        let command = match raw.name.as_str() {
            "codefile" => Command::File(required_path(raw)?),
            "codecontinue" => Command::Continue(required_path(raw)?),
            "codeend" => Command::End,
            "codepause" => Command::Pause,
            "codeinsert" => Command::Insert(block_ref(raw)?),
            "codedefinition" => Command::Definition(block_ref(raw)?),
            "codecomment" => Command::Comment,
            "codeblock" => Command::BlockStart(required_arg(raw)?),
            "codeblockend" => Command::BlockEnd,
            _ => return Ok(None),
        };
        Ok(Some(command))
    }
}

/// Classifies a line. `Ok(None)` covers plain text and unrecognised
/// marker lines alike; callers that care about the difference check
/// [`CommandMarker::is_command_line`] first.
pub fn classify(marker: &CommandMarker, line: &str) -> Result<Option<Command>> {
    match match_command(marker, line) {
        Some(raw) => Command::from_raw(&raw),
        None => Ok(None),
    }
}

fn required_arg(raw: &RawCommand) -> Result<String> {
    raw.rest
        .as_deref()
        .and_then(|rest| rest.split_whitespace().next())
        .map(str::to_string)
        .ok_or_else(|| TangleError::MalformedCommand {
            name: raw.name.clone(),
            reason: "missing required argument after ':'".to_string(),
        })
}

fn required_path(raw: &RawCommand) -> Result<PathBuf> {
    required_arg(raw).map(PathBuf::from)
}

fn block_ref(raw: &RawCommand) -> Result<BlockRef> {
    let name = required_arg(raw)?;
    let rest = raw.rest.as_deref().unwrap_or_default();
    let mut tokens = rest.split_whitespace().skip(1);
    let src = match tokens.next() {
        Some("src:") => tokens.next().map(PathBuf::from),
        Some(token) => token
            .strip_prefix("src:")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from),
        None => None,
    };
    Ok(BlockRef { name, src })
}
