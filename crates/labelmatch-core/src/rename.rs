//! Turning a match outcome into a copy destination.
//!
//! [`RenameDecision::decide`] is pure; [`apply`] performs the copy. Two
//! images that match the same label resolve to the same destination and
//! the later copy overwrites the earlier one.

use crate::error::{PipelineError, PipelineResult};
use crate::matcher::MatchOutcome;
use std::path::{Path, PathBuf};

/// What to do with one source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CopyTo(PathBuf),
    Skip,
}

/// Maps outcomes to destinations under one output directory.
#[derive(Debug, Clone)]
pub struct RenameDecision {
    output_dir: PathBuf,
}

impl RenameDecision {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `Matched(label)` becomes `output_dir/<label><ext>`, with the source's
    /// extension kept as-is. `NoMatch`, or a label with nothing usable left
    /// after sanitizing, becomes `Skip`.
    pub fn decide(&self, image_path: &Path, outcome: &MatchOutcome) -> Action {
        let MatchOutcome::Matched(label) = outcome else {
            return Action::Skip;
        };

        let Some(stem) = sanitize_label(label) else {
            tracing::warn!(
                "Label {label:?} for {:?} is not usable as a file name",
                image_path
            );
            return Action::Skip;
        };

        let file_name = match image_path.extension() {
            Some(ext) => format!("{stem}.{}", ext.to_string_lossy()),
            None => stem,
        };
        Action::CopyTo(self.output_dir.join(file_name))
    }
}

/// Make a model-supplied label safe to use as a file stem.
///
/// Separators, characters reserved on Windows, and control characters are
/// replaced with `_`. Trailing dots and blanks are dropped. Returns `None`
/// when the result would be empty, `.` or `..`.
pub fn sanitize_label(label: &str) -> Option<String> {
    let replaced: String = label
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let cleaned = replaced.trim().trim_end_matches('.').trim_end();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return None;
    }
    Some(cleaned.to_string())
}

/// Perform an action for `source`. Returns the destination on copy.
///
/// The destination's parent directory is created if it is missing.
pub async fn apply(action: &Action, source: &Path) -> PipelineResult<Option<PathBuf>> {
    let Action::CopyTo(dest) = action else {
        return Ok(None);
    };

    let copy_error = |e| PipelineError::Copy {
        from: source.to_path_buf(),
        to: dest.clone(),
        source: e,
    };

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(copy_error)?;
    }
    tokio::fs::copy(source, dest).await.map_err(copy_error)?;

    tracing::debug!("Copied {:?} -> {:?}", source, dest);
    Ok(Some(dest.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision() -> RenameDecision {
        RenameDecision::new("dist")
    }

    #[test]
    fn test_no_match_is_skip() {
        assert_eq!(
            decision().decide(Path::new("images/a.jpg"), &MatchOutcome::NoMatch),
            Action::Skip
        );
    }

    #[test]
    fn test_match_uses_label_and_source_extension() {
        assert_eq!(
            decision().decide(
                Path::new("images/IMG_0001.JPG"),
                &MatchOutcome::Matched("x".into())
            ),
            Action::CopyTo(PathBuf::from("dist/x.JPG"))
        );
        assert_eq!(
            decision().decide(
                Path::new("images/photo.jpeg"),
                &MatchOutcome::Matched("Green Pepper".into())
            ),
            Action::CopyTo(PathBuf::from("dist/Green Pepper.jpeg"))
        );
        assert_eq!(
            decision().decide(Path::new("images/a.jpg"), &MatchOutcome::Matched("_".into())),
            Action::CopyTo(PathBuf::from("dist/_.jpg"))
        );
        assert_eq!(
            decision().decide(Path::new("images/a.jpg"), &MatchOutcome::Matched("__".into())),
            Action::CopyTo(PathBuf::from("dist/__.jpg"))
        );
    }

    #[test]
    fn test_match_without_extension() {
        assert_eq!(
            decision().decide(Path::new("images/scan"), &MatchOutcome::Matched("x".into())),
            Action::CopyTo(PathBuf::from("dist/x"))
        );
    }

    #[test]
    fn test_unsafe_label_is_sanitized() {
        assert_eq!(
            decision().decide(
                Path::new("a.png"),
                &MatchOutcome::Matched("../../etc/passwd".into())
            ),
            Action::CopyTo(PathBuf::from("dist/.._.._etc_passwd.png"))
        );
        assert_eq!(sanitize_label("a:b*c?"), Some("a_b_c_".to_string()));
        assert_eq!(sanitize_label("tab\there"), Some("tab_here".to_string()));
        assert_eq!(sanitize_label("trailing. "), Some("trailing".to_string()));
        assert_eq!(sanitize_label("///"), Some("___".to_string()));
    }

    #[test]
    fn test_unusable_label_is_skip() {
        for label in ["..", ".", "...", "  ", ""] {
            assert_eq!(
                decision().decide(Path::new("a.png"), &MatchOutcome::Matched(label.into())),
                Action::Skip,
                "label {label:?}"
            );
        }
    }

    #[test]
    fn test_same_label_same_destination() {
        let d = decision();
        let a = d.decide(Path::new("one.jpg"), &MatchOutcome::Matched("Tomato".into()));
        let b = d.decide(Path::new("two.jpg"), &MatchOutcome::Matched("Tomato".into()));
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_apply_copies_and_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.jpg");
        std::fs::write(&source, b"jpeg bytes").unwrap();

        let dest = dir.path().join("out/nested/Tomato.jpg");
        let copied = apply(&Action::CopyTo(dest.clone()), &source).await.unwrap();

        assert_eq!(copied, Some(dest.clone()));
        assert_eq!(std::fs::read(&dest).unwrap(), b"jpeg bytes");
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_apply_overwrites_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.jpg");
        let second = dir.path().join("second.jpg");
        std::fs::write(&first, b"first").unwrap();
        std::fs::write(&second, b"second").unwrap();

        let dest = dir.path().join("Tomato.jpg");
        let action = Action::CopyTo(dest.clone());
        apply(&action, &first).await.unwrap();
        apply(&action, &second).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_apply_skip_does_nothing() {
        assert_eq!(apply(&Action::Skip, Path::new("missing.jpg")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_apply_missing_source_is_copy_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = apply(
            &Action::CopyTo(dir.path().join("x.jpg")),
            Path::new("/nonexistent/source.jpg"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::Copy { .. }));
    }
}
