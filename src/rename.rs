//! Interactive renaming of PDF files after their citation keys.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

/// A proposed rename of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
    pub from: PathBuf,
    pub to: PathBuf,
}

impl RenamePlan {
    /// Proposes `<key>.pdf` in the same directory as `pdf`.
    #[must_use]
    pub fn for_key(pdf: &Path, key: &str) -> Self {
        let file_name = format!("{key}.pdf");
        let to = match pdf.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(file_name),
            _ => PathBuf::from(file_name),
        };
        Self {
            from: pdf.to_path_buf(),
            to,
        }
    }

    /// Whether the file already has the proposed name.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// Counts from an interactive rename session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenameSummary {
    pub renamed: usize,
    pub declined: usize,
    /// Plans dropped because the target name is already taken.
    pub skipped: usize,
}

/// Asks `Rename A -> B? [y/n]` for each plan and renames on an exact `y`.
///
/// Any other answer, or end of input, leaves the file alone. A plan whose
/// target already exists is skipped with a warning and never prompted.
///
/// # Errors
///
/// Returns an I/O error if prompting, reading the answer, or renaming fails.
pub fn confirm_and_rename<R: BufRead, W: Write>(
    plans: &[RenamePlan],
    mut input: R,
    mut output: W,
) -> io::Result<RenameSummary> {
    let mut summary = RenameSummary::default();
    for plan in plans {
        if plan.is_noop() {
            debug!(file = %plan.from.display(), "File already has its citation key name");
            continue;
        }
        if plan.to.exists() {
            warn!(
                from = %plan.from.display(),
                to = %plan.to.display(),
                "Target file already exists, not renaming"
            );
            summary.skipped += 1;
            continue;
        }
        write!(
            output,
            "Rename {} -> {}? [y/n] ",
            plan.from.display(),
            plan.to.display()
        )?;
        output.flush()?;

        let mut answer = String::new();
        input.read_line(&mut answer)?;
        if answer.trim_end_matches(['\r', '\n']) == "y" {
            fs::rename(&plan.from, &plan.to)?;
            info!(from = %plan.from.display(), to = %plan.to.display(), "Renamed file");
            summary.renamed += 1;
        } else {
            summary.declined += 1;
        }
    }
    Ok(summary)
}
