//! Recursive resolution of block references.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::command::{classify, BlockRef, Command};
use crate::config::{CommandMarker, Config};
use crate::errors::{Result, TangleError};
use crate::writer::OutputWriter;

/// Which lookup rule a reference uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefMode {
    /// `codeinsert`: search the explicit `src:` file, else the file
    /// containing the reference line.
    Insert,
    /// `codedefinition`: search back where the enclosing block itself was
    /// included from.
    Definition,
}

/// Position in the include chain.
///
/// Carried explicitly through the recursion so relative paths resolve
/// against the right directory without mutating the process working
/// directory.
#[derive(Debug, Clone)]
pub struct RecursionContext {
    /// Current call depth.
    pub depth: usize,
    /// File containing the reference line being resolved.
    pub current_file: PathBuf,
    /// File that included `current_file`'s block — the caller's caller.
    /// At document level this is the document itself.
    pub parent_file: PathBuf,
}

impl RecursionContext {
    /// Context for references found directly in the document.
    pub fn top_level(document: &Path) -> Self {
        Self {
            depth: 0,
            current_file: document.to_path_buf(),
            parent_file: document.to_path_buf(),
        }
    }

    /// Context for references found inside a block of `opened`.
    fn descend(&self, opened: &Path) -> Self {
        Self {
            depth: self.depth + 1,
            current_file: opened.to_path_buf(),
            parent_file: self.current_file.clone(),
        }
    }
}

/// Locates named blocks and streams their bodies, recursing into nested
/// references.
#[derive(Debug)]
pub struct Resolver<'a> {
    config: &'a Config,
    marker: &'a CommandMarker,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver for one tangle run.
    pub fn new(config: &'a Config, marker: &'a CommandMarker) -> Self {
        Self { config, marker }
    }

    /// Splices the referenced block into `dest`.
    pub fn resolve<W: Write>(
        &self,
        reference: &BlockRef,
        mode: RefMode,
        ctx: &RecursionContext,
        dest: &mut OutputWriter<W>,
    ) -> Result<()> {
        if ctx.depth >= self.config.max_recursion {
            return Err(TangleError::RecursionLimitExceeded {
                name: reference.name.clone(),
                limit: self.config.max_recursion,
            });
        }

        let path = self.search_path(reference, mode, ctx);
        tracing::debug!(
            "resolving block {} from {} (depth {})",
            reference.name,
            path.display(),
            ctx.depth
        );
        let file = File::open(&path).map_err(|source| TangleError::FileOpen {
            path: path.clone(),
            source,
        })?;
        let mut reader = BufReader::new(file);

        self.seek_block(&mut reader, &reference.name, &path)?;
        self.stream_body(&mut reader, reference, &path, ctx, dest)
    }

    /// Determines which file to search, per the reference mode.
    ///
    /// Relative `src:` paths resolve against the directory of the file
    /// containing the reference line. A definition reference instead looks
    /// back in the caller's caller directory, joined with the referenced
    /// file's own name: the block is expected "where the enclosing block
    /// was included from".
    fn search_path(&self, reference: &BlockRef, mode: RefMode, ctx: &RecursionContext) -> PathBuf {
        match mode {
            RefMode::Insert => match &reference.src {
                Some(src) => parent_dir(&ctx.current_file).join(src),
                None => ctx.current_file.clone(),
            },
            RefMode::Definition => {
                let named = reference
                    .src
                    .as_deref()
                    .unwrap_or(ctx.current_file.as_path());
                let file_name = named.file_name().unwrap_or(named.as_os_str());
                parent_dir(&ctx.parent_file).join(file_name)
            }
        }
    }

    /// Scans forward from the top of the file for the opening
    /// `codeblock:` line.
    fn seek_block(&self, reader: &mut impl BufRead, name: &str, path: &Path) -> Result<()> {
        let mut line = String::new();
        while next_line(reader, &mut line)? {
            if let Ok(Some(Command::BlockStart(candidate))) = classify(self.marker, &line) {
                if self.config.block_match.matches(&candidate, name) {
                    return Ok(());
                }
            }
        }
        Err(TangleError::BlockNotFound {
            name: name.to_string(),
            path: path.to_path_buf(),
        })
    }

    /// Streams the block body to `dest` until `codeblockend`.
    fn stream_body<W: Write>(
        &self,
        reader: &mut impl BufRead,
        reference: &BlockRef,
        opened: &Path,
        ctx: &RecursionContext,
        dest: &mut OutputWriter<W>,
    ) -> Result<()> {
        let inner = ctx.descend(opened);
        let mut line = String::new();
        while next_line(reader, &mut line)? {
            match classify(self.marker, &line) {
                Ok(Some(Command::BlockEnd)) => return Ok(()),
                Ok(Some(Command::Insert(nested))) => {
                    self.resolve(&nested, RefMode::Insert, &inner, dest)?;
                }
                Ok(Some(Command::Definition(nested))) => {
                    self.resolve(&nested, RefMode::Definition, &inner, dest)?;
                }
                // Annotation for the literate prose, not part of the code.
                Ok(Some(Command::Comment)) => {}
                Ok(Some(Command::Pause)) => {
                    return Err(TangleError::PauseInsideBlock {
                        name: reference.name.clone(),
                        path: opened.to_path_buf(),
                    });
                }
                Err(error) => {
                    tracing::warn!("{}: skipping line: {}", opened.display(), error);
                }
                // Everything else, marker lines included, is block text.
                Ok(_) => dest.write_line(&line)?,
            }
        }
        tracing::warn!(
            "block {} in {} is not terminated by codeblockend",
            reference.name,
            opened.display()
        );
        Ok(())
    }
}

/// Reads one line including its terminator; `false` at end of input.
fn next_line(reader: &mut impl BufRead, line: &mut String) -> Result<bool> {
    line.clear();
    Ok(reader.read_line(line)? != 0)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchPolicy;
    use crate::test_utils::write_doc;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn resolve_from(config: &Config, document: &Path, name: &str) -> Result<String> {
        let marker = config.command_marker().unwrap();
        let resolver = Resolver::new(config, &marker);
        let ctx = RecursionContext::top_level(document);
        let mut dest = OutputWriter::new(Vec::new());
        resolver.resolve(&BlockRef::new(name), RefMode::Insert, &ctx, &mut dest)?;
        Ok(String::from_utf8(dest.into_inner()).unwrap())
    }

    #[test]
    fn test_resolve_simple_block() {
        let dir = tempdir().unwrap();
        let doc = write_doc(
            dir.path(),
            "doc.txt",
            "Some prose.\n%!codeblock: greet\nputs(\"hi\");\n%!codeblockend\nMore prose.\n",
        );

        let out = resolve_from(&Config::default(), &doc, "greet").unwrap();
        assert_eq!(out, "puts(\"hi\");\n");
    }

    #[test]
    fn test_resolve_nested_blocks_depth_first() {
        let dir = tempdir().unwrap();
        let doc = write_doc(
            dir.path(),
            "doc.txt",
            "%!codeblock: outer\nbefore\n%!codeinsert: inner\nafter\n%!codeblockend\n\
             %!codeblock: inner\nmiddle\n%!codeblockend\n",
        );

        let out = resolve_from(&Config::default(), &doc, "outer").unwrap();
        assert_eq!(out, "before\nmiddle\nafter\n");
    }

    #[test]
    fn test_resolve_block_from_src_file() {
        let dir = tempdir().unwrap();
        write_doc(
            dir.path(),
            "lib.txt",
            "%!codeblock: helper\nint helper;\n%!codeblockend\n",
        );
        let doc = write_doc(
            dir.path(),
            "doc.txt",
            "%!codeblock: main\n%!codeinsert: helper src: lib.txt\n%!codeblockend\n",
        );

        let out = resolve_from(&Config::default(), &doc, "main").unwrap();
        assert_eq!(out, "int helper;\n");
    }

    #[test]
    fn test_nested_src_resolved_against_containing_file() {
        // doc -> sub/a.txt -> b.txt must find sub/b.txt.
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        write_doc(
            &dir.path().join("sub"),
            "a.txt",
            "%!codeblock: a\n%!codeinsert: b src: b.txt\n%!codeblockend\n",
        );
        write_doc(
            &dir.path().join("sub"),
            "b.txt",
            "%!codeblock: b\nfrom b\n%!codeblockend\n",
        );
        let doc = write_doc(
            dir.path(),
            "doc.txt",
            "%!codeblock: main\n%!codeinsert: a src: sub/a.txt\n%!codeblockend\n",
        );

        let out = resolve_from(&Config::default(), &doc, "main").unwrap();
        assert_eq!(out, "from b\n");
    }

    #[test]
    fn test_definition_resolved_in_parent_directory() {
        // The block in lib/impl.txt asks for a definition; it must be looked
        // up back in the including document's directory, under the file's
        // own name.
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("lib")).unwrap();
        write_doc(
            &dir.path().join("lib"),
            "impl.txt",
            "%!codeblock: outer\ngeneric\n%!codedefinition: extra\n%!codeblockend\n",
        );
        write_doc(
            dir.path(),
            "impl.txt",
            "%!codeblock: extra\nspecialised\n%!codeblockend\n",
        );
        let doc = write_doc(
            dir.path(),
            "doc.txt",
            "%!codeblock: main\n%!codeinsert: outer src: lib/impl.txt\n%!codeblockend\n",
        );

        let out = resolve_from(&Config::default(), &doc, "main").unwrap();
        assert_eq!(out, "generic\nspecialised\n");
    }

    #[test]
    fn test_comment_lines_dropped() {
        let dir = tempdir().unwrap();
        let doc = write_doc(
            dir.path(),
            "doc.txt",
            "%!codeblock: greet\n%!codecomment annotation for readers\nputs(\"hi\");\n%!codeblockend\n",
        );

        let out = resolve_from(&Config::default(), &doc, "greet").unwrap();
        assert_eq!(out, "puts(\"hi\");\n");
    }

    #[test]
    fn test_pause_inside_block_is_fatal() {
        let dir = tempdir().unwrap();
        let doc = write_doc(
            dir.path(),
            "doc.txt",
            "%!codeblock: greet\n%!codepause\n%!codeblockend\n",
        );

        let result = resolve_from(&Config::default(), &doc, "greet");
        assert!(matches!(
            result,
            Err(TangleError::PauseInsideBlock { .. })
        ));
    }

    #[test]
    fn test_block_not_found() {
        let dir = tempdir().unwrap();
        let doc = write_doc(dir.path(), "doc.txt", "no blocks here\n");

        let result = resolve_from(&Config::default(), &doc, "missing");
        assert!(matches!(result, Err(TangleError::BlockNotFound { .. })));
    }

    #[test]
    fn test_missing_src_file() {
        let dir = tempdir().unwrap();
        let doc = write_doc(
            dir.path(),
            "doc.txt",
            "%!codeblock: main\n%!codeinsert: x src: nowhere.txt\n%!codeblockend\n",
        );

        let result = resolve_from(&Config::default(), &doc, "main");
        assert!(matches!(result, Err(TangleError::FileOpen { .. })));
    }

    /// Builds a document with a chain of `depth` blocks, each inserting
    /// the next, and resolves the first.
    fn resolve_chain(depth: usize) -> Result<String> {
        let dir = tempdir().unwrap();
        let mut text = String::new();
        for level in 0..depth {
            text.push_str(&format!("%!codeblock: b{}\n", level));
            if level + 1 < depth {
                text.push_str(&format!("%!codeinsert: b{}\n", level + 1));
            } else {
                text.push_str("bottom\n");
            }
            text.push_str("%!codeblockend\n");
        }
        let doc = write_doc(dir.path(), "doc.txt", &text);
        resolve_from(&Config::default(), &doc, "b0")
    }

    #[test]
    fn test_recursion_limit_boundary() {
        // A chain as deep as the limit succeeds; one deeper does not.
        assert_eq!(resolve_chain(10).unwrap(), "bottom\n");
        assert!(matches!(
            resolve_chain(11),
            Err(TangleError::RecursionLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_self_reference_hits_recursion_limit() {
        let dir = tempdir().unwrap();
        let doc = write_doc(
            dir.path(),
            "doc.txt",
            "%!codeblock: loop\n%!codeinsert: loop\n%!codeblockend\n",
        );

        let result = resolve_from(&Config::default(), &doc, "loop");
        assert!(matches!(
            result,
            Err(TangleError::RecursionLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_exact_matching_rejects_prefix() {
        let dir = tempdir().unwrap();
        let doc = write_doc(
            dir.path(),
            "doc.txt",
            "%!codeblock: greeting\nlong name\n%!codeblockend\n",
        );

        let result = resolve_from(&Config::default(), &doc, "greet");
        assert!(matches!(result, Err(TangleError::BlockNotFound { .. })));
    }

    #[test]
    fn test_prefix_matching_accepts_prefix() {
        let dir = tempdir().unwrap();
        let doc = write_doc(
            dir.path(),
            "doc.txt",
            "%!codeblock: greeting\nlong name\n%!codeblockend\n",
        );

        let config = Config {
            block_match: MatchPolicy::Prefix,
            ..Config::default()
        };
        let out = resolve_from(&config, &doc, "greet").unwrap();
        assert_eq!(out, "long name\n");
    }

    #[test]
    fn test_unterminated_block_streams_to_eof() {
        let dir = tempdir().unwrap();
        let doc = write_doc(
            dir.path(),
            "doc.txt",
            "%!codeblock: tail\nlast line\n",
        );

        let out = resolve_from(&Config::default(), &doc, "tail").unwrap();
        assert_eq!(out, "last line\n");
    }

    #[test]
    fn test_foreign_marker_lines_stream_as_text() {
        // Structural commands other than the handled set are block text.
        let dir = tempdir().unwrap();
        let doc = write_doc(
            dir.path(),
            "doc.txt",
            "%!codeblock: raw\n%!codefoo: something\n%!codeblockend\n",
        );

        let out = resolve_from(&Config::default(), &doc, "raw").unwrap();
        assert_eq!(out, "%!codefoo: something\n");
    }
}
