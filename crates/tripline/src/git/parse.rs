//! Git output parsing helpers.

use std::process::Output;

use super::types::{ChangeRecord, RevisionId, TagRef};

/// Field separator used in `for-each-ref` formats.
pub const FIELD_SEP: char = '\0';

/// Formats a git error with both stdout and stderr for better debugging.
pub fn format_git_error(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

    match (stderr.is_empty(), stdout.is_empty()) {
        (true, true) => format!(
            "Command failed with exit code {}",
            output.status.code().unwrap_or(-1)
        ),
        (true, false) => stdout,
        (false, true) => stderr,
        (false, false) => format!("{}\n{}", stderr, stdout),
    }
}

/// Whether `git pull` output reports that nothing was fetched.
pub fn is_already_up_to_date(output: &str) -> bool {
    output.contains("Already up to date") || output.contains("Already up-to-date")
}

/// Parses `git diff-tree -r -z --name-status` output.
///
/// Records are NUL separated: a status letter followed by one path, or by two
/// paths for renames (`R`) and copies (`C`).
pub fn parse_diff_tree(output: &[u8]) -> Vec<ChangeRecord> {
    let text = String::from_utf8_lossy(output);
    let mut fields = text.split('\0').filter(|f| !f.is_empty());
    let mut records = Vec::new();

    while let Some(status) = fields.next() {
        let Some(kind) = status.chars().next() else {
            continue;
        };

        match kind {
            'R' | 'C' => {
                let (Some(from), Some(to)) = (fields.next(), fields.next()) else {
                    break;
                };
                records.push(ChangeRecord {
                    from: Some(from.to_string()),
                    to: Some(to.to_string()),
                });
            }
            'A' => {
                let Some(path) = fields.next() else { break };
                records.push(ChangeRecord {
                    from: None,
                    to: Some(path.to_string()),
                });
            }
            'D' => {
                let Some(path) = fields.next() else { break };
                records.push(ChangeRecord {
                    from: Some(path.to_string()),
                    to: None,
                });
            }
            _ => {
                // M, T, U, X: same path on both sides
                let Some(path) = fields.next() else { break };
                records.push(ChangeRecord {
                    from: Some(path.to_string()),
                    to: Some(path.to_string()),
                });
            }
        }
    }

    records
}

/// Parses `for-each-ref refs/tags` output written with
/// `%(refname:short)%00%(objectname)%00%(*objectname)%00%(creatordate:unix)`.
///
/// Annotated tags report the peeled commit in the third field; lightweight
/// tags leave it empty and point at the commit directly.
pub fn parse_tag_refs(output: &str) -> Vec<TagRef> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split(FIELD_SEP);
            let name = parts.next()?.trim();
            let object = parts.next()?;
            let peeled = parts.next().unwrap_or("");
            let created = parts
                .next()
                .and_then(|c| c.trim().parse().ok())
                .unwrap_or(0);

            let target = if peeled.is_empty() { object } else { peeled };
            let target: RevisionId = target.parse().ok()?;
            if name.is_empty() {
                return None;
            }

            Some(TagRef {
                name: name.to_string(),
                target,
                created,
            })
        })
        .collect()
}
