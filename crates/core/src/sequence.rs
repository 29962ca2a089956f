use crate::error::RenameError;
use crate::metadata::MetadataRecord;
use crate::sanitize::sanitize_filename;
use crate::template::Template;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Thumbnail caches managed by the OS. Never renamed, never a destination.
pub const PROTECTED_FILE_NAMES: &[&str] = &["Thumbs.db", ".DS_Store"];

const MIN_SEQUENCE_WIDTH: usize = 3;

pub fn is_protected_name(name: &str) -> bool {
    PROTECTED_FILE_NAMES
        .iter()
        .any(|protected| protected.eq_ignore_ascii_case(name))
}

pub fn is_protected(path: &Path) -> bool {
    path.file_name()
        .map(|name| is_protected_name(&name.to_string_lossy()))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy)]
struct DirCounter {
    next: u64,
    width: usize,
}

/// Picks collision-free destinations and owns the per-directory sequence
/// counters for one run. Counters only move forward.
///
/// Sources that have been renamed away (or would be, in a dry run) are
/// tracked in `vacated` so that their old names count as free for later
/// files, whether or not the disk has caught up.
#[derive(Debug)]
pub struct Resolver {
    start: u64,
    counters: HashMap<PathBuf, DirCounter>,
    planned: HashSet<PathBuf>,
    vacated: HashSet<PathBuf>,
}

impl Resolver {
    pub fn new(start: u64) -> Self {
        Self {
            start,
            counters: HashMap::new(),
            planned: HashSet::new(),
            vacated: HashSet::new(),
        }
    }

    /// Sizes the `{Seq}` padding for `dir` from the number of files it holds.
    pub fn register_directory(&mut self, dir: &Path, file_count: usize) {
        let last = self
            .start
            .saturating_add((file_count as u64).saturating_sub(1));
        let width = last.to_string().len().max(MIN_SEQUENCE_WIDTH);
        let start = self.start;
        let counter = self
            .counters
            .entry(dir.to_path_buf())
            .or_insert(DirCounter { next: start, width });
        counter.width = counter.width.max(width);
    }

    pub fn next_sequence(&self, dir: &Path) -> u64 {
        self.counters
            .get(dir)
            .map(|c| c.next)
            .unwrap_or(self.start)
    }

    /// Marks `source` as moved away from its current name.
    pub fn vacate(&mut self, source: &Path) {
        self.vacated.insert(source.to_path_buf());
    }

    pub fn resolve(
        &mut self,
        source: &Path,
        template: &Template,
        record: &MetadataRecord,
        extension_with_dot: &str,
    ) -> Result<PathBuf, RenameError> {
        let dir = source.parent().ok_or_else(|| RenameError::PerFile {
            path: source.to_path_buf(),
            reason: "file has no parent directory".to_string(),
        })?;

        let target = if template.has_sequence() {
            self.resolve_with_sequence(source, dir, template, record, extension_with_dot)?
        } else {
            self.resolve_with_suffix(source, dir, template, record, extension_with_dot)
        };
        self.planned.insert(target.clone());
        Ok(target)
    }

    fn resolve_with_sequence(
        &mut self,
        source: &Path,
        dir: &Path,
        template: &Template,
        record: &MetadataRecord,
        extension: &str,
    ) -> Result<PathBuf, RenameError> {
        let start = self.start;
        loop {
            let counter = self
                .counters
                .entry(dir.to_path_buf())
                .or_insert(DirCounter {
                    next: start,
                    width: start.to_string().len().max(MIN_SEQUENCE_WIDTH),
                });
            let value = counter.next;
            let width = counter.width;
            counter.next = counter.next.saturating_add(1);

            let base = sanitize_filename(&template.render(&record.with_sequence(value, width)));
            let candidate = dir.join(format!("{}{}", base, extension));
            if self.is_available(&candidate, source) {
                return Ok(candidate);
            }
            if value == u64::MAX {
                return Err(RenameError::PerFile {
                    path: source.to_path_buf(),
                    reason: "no sequence numbers left".to_string(),
                });
            }
            log::debug!("{} is taken, trying the next sequence number", candidate.display());
        }
    }

    fn resolve_with_suffix(
        &self,
        source: &Path,
        dir: &Path,
        template: &Template,
        record: &MetadataRecord,
        extension: &str,
    ) -> PathBuf {
        let base = sanitize_filename(&template.render(record));
        let candidate = dir.join(format!("{}{}", base, extension));
        if self.is_available(&candidate, source) {
            return candidate;
        }

        let mut n = 1usize;
        loop {
            let candidate = dir.join(format!("{}_{}{}", base, n, extension));
            if self.is_available(&candidate, source) {
                return candidate;
            }
            n += 1;
        }
    }

    fn is_available(&self, candidate: &Path, source: &Path) -> bool {
        if self.planned.contains(candidate) {
            return false;
        }
        if candidate == source {
            return true;
        }
        if is_protected(candidate) {
            return false;
        }
        if self.vacated.contains(candidate) {
            return true;
        }
        // Protected names are excluded above, so anything on disk here is a real file.
        !candidate.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{MetadataSource, PartialMetadata};
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    fn record(folder: &str) -> MetadataRecord {
        let date = NaiveDate::from_ymd_opt(2014, 5, 9)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .expect("valid date");
        MetadataRecord::build(
            PartialMetadata {
                source: Some(MetadataSource::Exif),
                date: Some(date),
                ..PartialMetadata::default()
            },
            date,
            folder,
        )
    }

    fn seq_template() -> Template {
        Template::parse("{YYYY}-{MM}-{DD}-{Folder}-{Seq}").expect("template")
    }

    #[test]
    fn identical_metadata_gets_consecutive_sequence_numbers() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path().join("Wedding_Shoot");
        fs::create_dir_all(&dir).expect("mkdir");
        let mut resolver = Resolver::new(1);
        let template = seq_template();

        let first = resolver
            .resolve(&dir.join("IMG_0001.JPEG"), &template, &record("Wedding_Shoot"), ".JPEG")
            .expect("resolve");
        let second = resolver
            .resolve(&dir.join("IMG_0002.JPEG"), &template, &record("Wedding_Shoot"), ".JPEG")
            .expect("resolve");

        assert_eq!(first, dir.join("2014-05-09-Wedding_Shoot-001.JPEG"));
        assert_eq!(second, dir.join("2014-05-09-Wedding_Shoot-002.JPEG"));
        assert_eq!(resolver.next_sequence(&dir), 3);
    }

    #[test]
    fn existing_files_are_skipped_and_counter_keeps_moving() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        fs::write(dir.join("2014-05-09-x-001.jpg"), b"x").expect("occupy");
        let mut resolver = Resolver::new(1);

        let target = resolver
            .resolve(&dir.join("a.jpg"), &seq_template(), &record("x"), ".jpg")
            .expect("resolve");
        assert_eq!(target, dir.join("2014-05-09-x-002.jpg"));
        assert_eq!(resolver.next_sequence(dir), 3);
    }

    #[test]
    fn starting_value_is_honoured() {
        let temp = tempdir().expect("tempdir");
        let mut resolver = Resolver::new(42);
        let target = resolver
            .resolve(&temp.path().join("a.jpg"), &seq_template(), &record("x"), ".jpg")
            .expect("resolve");
        assert_eq!(target, temp.path().join("2014-05-09-x-042.jpg"));
    }

    #[test]
    fn width_grows_with_directory_size() {
        let temp = tempdir().expect("tempdir");
        let mut resolver = Resolver::new(1);
        resolver.register_directory(temp.path(), 1500);
        let target = resolver
            .resolve(&temp.path().join("a.jpg"), &seq_template(), &record("x"), ".jpg")
            .expect("resolve");
        assert_eq!(target, temp.path().join("2014-05-09-x-0001.jpg"));
    }

    #[test]
    fn counters_are_independent_per_directory() {
        let temp = tempdir().expect("tempdir");
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        let mut resolver = Resolver::new(1);
        let template = seq_template();

        resolver
            .resolve(&a.join("1.jpg"), &template, &record("a"), ".jpg")
            .expect("resolve");
        resolver
            .resolve(&a.join("2.jpg"), &template, &record("a"), ".jpg")
            .expect("resolve");
        let first_in_b = resolver
            .resolve(&b.join("1.jpg"), &template, &record("b"), ".jpg")
            .expect("resolve");

        assert_eq!(first_in_b, b.join("2014-05-09-b-001.jpg"));
        assert_eq!(resolver.next_sequence(&a), 3);
    }

    #[test]
    fn suffix_is_appended_without_sequence_slot() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        fs::write(dir.join("2014-05-09.jpg"), b"x").expect("occupy");
        let template = Template::parse("{YYYY}-{MM}-{DD}").expect("template");
        let mut resolver = Resolver::new(1);

        let first = resolver
            .resolve(&dir.join("a.jpg"), &template, &record("x"), ".jpg")
            .expect("resolve");
        let second = resolver
            .resolve(&dir.join("b.jpg"), &template, &record("x"), ".jpg")
            .expect("resolve");

        assert_eq!(first, dir.join("2014-05-09_1.jpg"));
        assert_eq!(second, dir.join("2014-05-09_2.jpg"));
    }

    #[test]
    fn source_keeps_its_own_name_when_already_correct() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("2014-05-09.jpg");
        fs::write(&source, b"x").expect("write");
        let template = Template::parse("{YYYY}-{MM}-{DD}").expect("template");
        let mut resolver = Resolver::new(1);

        let target = resolver
            .resolve(&source, &template, &record("x"), ".jpg")
            .expect("resolve");
        assert_eq!(target, source);
    }

    #[test]
    fn vacated_names_are_free_again() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        let occupied = dir.join("2014-05-09-x-002.jpg");
        fs::write(&occupied, b"x").expect("occupy");
        let mut resolver = Resolver::new(1);
        let template = seq_template();

        let first = resolver
            .resolve(&occupied, &template, &record("x"), ".jpg")
            .expect("resolve");
        assert_eq!(first, dir.join("2014-05-09-x-001.jpg"));
        resolver.vacate(&occupied);

        let second = resolver
            .resolve(&dir.join("a.jpg"), &template, &record("x"), ".jpg")
            .expect("resolve");
        assert_eq!(second, occupied);
    }

    #[test]
    fn planned_names_stay_taken_even_when_vacated() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        let template = Template::parse("{YYYY}-{MM}-{DD}").expect("template");
        let mut resolver = Resolver::new(1);

        let first = resolver
            .resolve(&dir.join("a.jpg"), &template, &record("x"), ".jpg")
            .expect("resolve");
        resolver.vacate(&first);
        let second = resolver
            .resolve(&dir.join("b.jpg"), &template, &record("x"), ".jpg")
            .expect("resolve");

        assert_eq!(first, dir.join("2014-05-09.jpg"));
        assert_eq!(second, dir.join("2014-05-09_1.jpg"));
    }

    #[test]
    fn exhausted_counter_fails_instead_of_spinning() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        let mut resolver = Resolver::new(u64::MAX);
        fs::write(dir.join(format!("2014-05-09-x-{}.jpg", u64::MAX)), b"x").expect("occupy");

        let err = resolver
            .resolve(&dir.join("a.jpg"), &seq_template(), &record("x"), ".jpg")
            .expect_err("must fail");
        assert!(matches!(err, RenameError::PerFile { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn protected_names_are_never_produced() {
        let temp = tempdir().expect("tempdir");
        let template = Template::parse("thumbs").expect("template");
        let mut resolver = Resolver::new(1);

        let target = resolver
            .resolve(&temp.path().join("cache.db"), &template, &record("x"), ".db")
            .expect("resolve");
        assert_eq!(target, temp.path().join("thumbs_1.db"));
        assert!(is_protected(Path::new("/photos/THUMBS.DB")));
        assert!(is_protected(Path::new(".ds_store")));
        assert!(!is_protected(Path::new("photo.jpg")));
    }
}
