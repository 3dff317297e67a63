//! Document scanning and write-state management.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::command::{classify, BlockRef, Command};
use crate::config::{CommandMarker, Config};
use crate::errors::{Result, TangleError};
use crate::resolver::{RecursionContext, RefMode, Resolver};
use crate::writer::OutputWriter;

/// The currently open destination file.
///
/// At most one session is open at a time. The handle is released on every
/// exit path: explicitly through [`WriteSession::close`] on success, or by
/// drop when the scan aborts.
#[derive(Debug)]
struct WriteSession {
    path: PathBuf,
    dest: OutputWriter<BufWriter<File>>,
}

impl WriteSession {
    fn open(path: PathBuf, append: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .append(append)
            .truncate(!append)
            .open(&path)
            .map_err(|source| TangleError::FileOpen {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            path,
            dest: OutputWriter::new(BufWriter::new(file)),
        })
    }

    fn close(mut self) -> Result<()> {
        self.dest.flush()?;
        Ok(())
    }
}

/// Summary of one tangle run.
#[derive(Debug, Clone, Default)]
pub struct TangleSummary {
    /// Destination files opened, in order of first appearance.
    pub files: Vec<PathBuf>,
}

/// Walks a literate document line by line and writes out the code it
/// describes.
#[derive(Debug)]
pub struct Scanner {
    config: Config,
    base_dir: PathBuf,
}

impl Scanner {
    /// Creates a scanner. Destination paths from `codefile` and
    /// `codecontinue` resolve against `base_dir`.
    pub fn new(config: Config, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            base_dir: base_dir.into(),
        }
    }

    /// Tangles one document.
    ///
    /// The scanner starts in the Skipping state and switches to Printing
    /// when a destination is opened. Whatever path the scan takes, the
    /// destination handle is released before this returns.
    pub fn tangle_file(&self, document: &Path) -> Result<TangleSummary> {
        let marker = self.config.command_marker()?;
        let file = File::open(document).map_err(|source| TangleError::FileOpen {
            path: document.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);

        let resolver = Resolver::new(&self.config, &marker);
        let ctx = RecursionContext::top_level(document);

        let mut session: Option<WriteSession> = None;
        let mut summary = TangleSummary::default();

        let scanned = self.scan(&mut reader, &marker, &resolver, &ctx, &mut session, &mut summary);

        if let Some(open) = session.take() {
            if scanned.is_ok() {
                tracing::warn!(
                    "document ended while still writing to {}",
                    open.path.display()
                );
                open.close()?;
            }
            // On error the session drops here, closing the handle.
        }
        scanned.map(|()| summary)
    }

    fn scan(
        &self,
        reader: &mut impl BufRead,
        marker: &CommandMarker,
        resolver: &Resolver<'_>,
        ctx: &RecursionContext,
        session: &mut Option<WriteSession>,
        summary: &mut TangleSummary,
    ) -> Result<()> {
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Ok(());
            }

            if !marker.is_command_line(&line) {
                if let Some(open) = session.as_mut() {
                    open.dest.write_line(&line)?;
                }
                continue;
            }

            let command = match classify(marker, &line) {
                Ok(Some(command)) => command,
                // Marker lines with an unknown name are prose; drop them.
                Ok(None) => continue,
                Err(error) => {
                    tracing::warn!("skipping line: {}", error);
                    continue;
                }
            };

            match command {
                Command::File(path) => self.open_destination(session, summary, path, false)?,
                Command::Continue(path) => self.open_destination(session, summary, path, true)?,
                Command::End | Command::Pause => match session.take() {
                    Some(open) => open.close()?,
                    None => tracing::warn!("codeend/codepause with no open destination"),
                },
                Command::Insert(reference) => {
                    self.insert(resolver, RefMode::Insert, &reference, ctx, session)?;
                }
                Command::Definition(reference) => {
                    self.insert(resolver, RefMode::Definition, &reference, ctx, session)?;
                }
                // Block delimiters and comments carry no meaning at
                // document level; they matter only while a block is being
                // searched for.
                Command::Comment | Command::BlockStart(_) | Command::BlockEnd => {}
            }
        }
    }

    fn open_destination(
        &self,
        session: &mut Option<WriteSession>,
        summary: &mut TangleSummary,
        path: PathBuf,
        append: bool,
    ) -> Result<()> {
        if let Some(previous) = session.take() {
            // Opening a destination without closing the last one is a
            // document error; close the old handle instead of leaking it.
            tracing::warn!(
                "destination {} opened while {} is still open",
                path.display(),
                previous.path.display()
            );
            previous.close()?;
        }
        let open = WriteSession::open(self.base_dir.join(&path), append)?;
        summary.files.push(open.path.clone());
        *session = Some(open);
        Ok(())
    }

    fn insert(
        &self,
        resolver: &Resolver<'_>,
        mode: RefMode,
        reference: &BlockRef,
        ctx: &RecursionContext,
        session: &mut Option<WriteSession>,
    ) -> Result<()> {
        match session.as_mut() {
            Some(open) => resolver.resolve(reference, mode, ctx, &mut open.dest),
            None => {
                tracing::warn!(
                    "attempt to insert block {} without an open destination",
                    reference.name
                );
                Ok(())
            }
        }
    }
}
