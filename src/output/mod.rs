//! Terminal output for the `hash-db` CLI.
//!
//! Change reports go to stdout so they can be piped; everything else
//! (progress, warnings, notes) goes to stderr. Informational output honours
//! a process-wide [`Verbosity`].

mod progress;

use colored::{ColoredString, Colorize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};

pub use progress::Progress;

/// Verbosity level for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Only change reports, warnings and errors
    Quiet = 0,
    Normal = 1,
    /// Also print per-step notes
    Verbose = 2,
}

static VERBOSITY: AtomicU8 = AtomicU8::new(1);

pub fn set_verbosity(level: Verbosity) {
    VERBOSITY.store(level as u8, Ordering::Relaxed);
}

#[must_use]
pub fn get_verbosity() -> Verbosity {
    match VERBOSITY.load(Ordering::Relaxed) {
        0 => Verbosity::Quiet,
        2 => Verbosity::Verbose,
        _ => Verbosity::Normal,
    }
}

/// Prints a success message in green (respects quiet mode).
pub fn success(message: &str) {
    if get_verbosity() == Verbosity::Quiet {
        return;
    }
    eprintln!("{}", message.green());
}

/// Prints an error message in bold red (always shown).
pub fn error(message: &str) {
    eprintln!("{}", message.red().bold());
}

/// Prints a warning message in bold yellow (always shown).
pub fn warning(message: &str) {
    eprintln!("{}", message.yellow().bold());
}

/// Prints a dimmed note (respects quiet mode).
pub fn info(message: &str) {
    if get_verbosity() == Verbosity::Quiet {
        return;
    }
    eprintln!("{}", message.dimmed());
}

/// Prints a dimmed note only in verbose mode.
pub fn verbose(message: &str) {
    if get_verbosity() != Verbosity::Verbose {
        return;
    }
    eprintln!("{}", message.dimmed());
}

/// Starts a progress bar. Hidden in quiet mode and when stderr is not a TTY.
#[must_use]
pub fn start_progress(title: &str, total: usize) -> Progress {
    if get_verbosity() == Verbosity::Quiet {
        Progress::hidden(title, total)
    } else {
        Progress::new(title, total)
    }
}

/// Which list a path set belongs to, and how it is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

impl ChangeKind {
    #[must_use]
    pub const fn heading(self) -> &'static str {
        match self {
            Self::Added => "Added files:",
            Self::Removed => "Removed files:",
            Self::Modified => "Modified files:",
        }
    }

    fn paint(self, text: &str) -> ColoredString {
        match self {
            Self::Added => text.green(),
            Self::Removed => text.blue(),
            Self::Modified => text.red(),
        }
    }
}

/// Renders one change list: a heading followed by one indented path per
/// line, in sorted order. Empty sets render as an empty string.
///
/// Paths are shown relative to `root` when they live under it.
#[must_use]
pub fn format_file_list(kind: ChangeKind, paths: &BTreeSet<PathBuf>, root: &Path) -> String {
    if paths.is_empty() {
        return String::new();
    }

    let mut out = format!("{}\n", kind.heading().bold());
    for path in paths {
        let shown = path.strip_prefix(root).unwrap_or(path);
        out.push_str(&format!("  {}\n", kind.paint(&shown.to_string_lossy())));
    }
    out
}

/// Prints the added, removed and modified lists to stdout, skipping empty
/// ones.
pub fn print_file_lists(
    root: &Path,
    added: &BTreeSet<PathBuf>,
    removed: &BTreeSet<PathBuf>,
    modified: &BTreeSet<PathBuf>,
) {
    for (kind, paths) in [
        (ChangeKind::Added, added),
        (ChangeKind::Removed, removed),
        (ChangeKind::Modified, modified),
    ] {
        print!("{}", format_file_list(kind, paths, root));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_verbosity_round_trip() {
        for level in [Verbosity::Quiet, Verbosity::Verbose, Verbosity::Normal] {
            set_verbosity(level);
            assert_eq!(get_verbosity(), level);
        }
    }

    #[test]
    fn test_file_list_sorted_and_relative() {
        colored::control::set_override(false);
        let root = Path::new("/data");
        let paths = BTreeSet::from([
            PathBuf::from("/data/z.txt"),
            PathBuf::from("/data/a/b.txt"),
            PathBuf::from("/elsewhere/c.txt"),
        ]);

        let rendered = format_file_list(ChangeKind::Modified, &paths, root);
        assert_eq!(
            rendered,
            "Modified files:\n  a/b.txt\n  z.txt\n  /elsewhere/c.txt\n"
        );
    }

    #[test]
    fn test_empty_list_renders_nothing() {
        let rendered = format_file_list(ChangeKind::Added, &BTreeSet::new(), Path::new("/"));
        assert!(rendered.is_empty());
    }
}
