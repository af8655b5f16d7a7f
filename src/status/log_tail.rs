use super::artifacts::{file_name, list_matching, NamePattern};
use crate::model::LogTail;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// `deletion_<YYYYmmdd_HHMMSS>.log`, one per deletion run.
pub(crate) const DELETION_LOG: NamePattern = NamePattern::new("deletion_", ".log");

pub(crate) const DEFAULT_TAIL_LINES: usize = 50;

fn latest_log(dir: &Path, pattern: NamePattern) -> Option<PathBuf> {
    list_matching(dir, pattern)
        .into_iter()
        .map(|path| {
            let modified = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        // Names embed a sortable timestamp, so the name settles equal mtimes.
        .max_by(|(ma, pa), (mb, pb)| ma.cmp(mb).then_with(|| pa.cmp(pb)))
        .map(|(_, path)| path)
}

/// Last `lines` lines of the newest log in `dir` matching `pattern`.
pub(crate) fn tail_latest_log(dir: &Path, pattern: NamePattern, lines: usize) -> LogTail {
    let Some(path) = latest_log(dir, pattern) else {
        return LogTail::default();
    };
    let raw = match std::fs::read(&path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("cannot read log {}: {e}", path.display());
            return LogTail::default();
        }
    };

    let text = String::from_utf8_lossy(&raw);
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    LogTail {
        file_name: file_name(&path).map(str::to_string),
        lines: all[start..].iter().map(|l| l.trim().to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn write_log(dir: &Path, name: &str, body: &str, modified: SystemTime) {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(modified).unwrap();
    }

    #[test]
    fn returns_last_lines_of_newest_log() {
        let dir = tempdir().expect("tempdir");
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        write_log(dir.path(), "deletion_20240101_000000.log", "old\n", t0);
        let body: String = (1..=120).map(|i| format!("  line {i}  \n")).collect();
        write_log(
            dir.path(),
            "deletion_20240102_000000.log",
            &body,
            t0 + Duration::from_secs(60),
        );
        write_log(dir.path(), "other.log", "ignored\n", t0 + Duration::from_secs(120));

        let tail = tail_latest_log(dir.path(), DELETION_LOG, DEFAULT_TAIL_LINES);
        assert_eq!(tail.file_name.as_deref(), Some("deletion_20240102_000000.log"));
        assert_eq!(tail.lines.len(), 50);
        assert_eq!(tail.lines.first().map(String::as_str), Some("line 71"));
        assert_eq!(tail.lines.last().map(String::as_str), Some("line 120"));
    }

    #[test]
    fn equal_mtime_picks_latest_name() {
        let dir = tempdir().expect("tempdir");
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        write_log(dir.path(), "deletion_20240105_000000.log", "b\n", t);
        write_log(dir.path(), "deletion_20240103_000000.log", "a\n", t);

        let tail = tail_latest_log(dir.path(), DELETION_LOG, 10);
        assert_eq!(tail.file_name.as_deref(), Some("deletion_20240105_000000.log"));
        assert_eq!(tail.lines, vec!["b".to_string()]);
    }

    #[test]
    fn short_log_is_returned_whole() {
        let dir = tempdir().expect("tempdir");
        write_log(
            dir.path(),
            "deletion_1.log",
            "one\ntwo\nthree",
            SystemTime::now(),
        );
        let tail = tail_latest_log(dir.path(), DELETION_LOG, 50);
        assert_eq!(tail.lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn no_logs_gives_empty_tail() {
        let dir = tempdir().expect("tempdir");
        assert_eq!(
            tail_latest_log(dir.path(), DELETION_LOG, 50),
            LogTail::default()
        );
        assert_eq!(
            tail_latest_log(&dir.path().join("missing"), DELETION_LOG, 50),
            LogTail::default()
        );
    }
}
