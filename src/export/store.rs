use super::{Error, Result, Target};

use chrono::{DateTime, FixedOffset};
use csv::{ReaderBuilder, WriterBuilder};
use flate2::{Compression, GzBuilder};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// An export directory: one JSON file per entity plus a `contents.csv` index.
///
/// The index records the timestamp each entity had when it was written, which
/// lets a later run skip anything that hasn't changed.
pub struct Store {
    base_dir: PathBuf,
    compress: bool,
    contents: HashMap<(Target, String), DateTime<FixedOffset>>,
    file: File,
}

impl Store {
    const CONTENTS_FILE_NAME: &'static str = "contents.csv";

    pub fn open<P: AsRef<Path>>(base_dir: P, compress: bool) -> Result<Store> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;

        let contents_path = base_dir.join(Self::CONTENTS_FILE_NAME);
        let contents = if contents_path.is_file() {
            Self::read_contents(&contents_path)?
        } else {
            HashMap::new()
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&contents_path)?;

        log::info!(
            "Opened store at {:?} with {} indexed items",
            base_dir,
            contents.len()
        );

        Ok(Store {
            base_dir,
            compress,
            contents,
            file,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn contains(&self, target: Target, id: &str) -> bool {
        self.contents.contains_key(&(target, id.to_string()))
    }

    /// The timestamp recorded the last time this entity was written.
    pub fn timestamp(&self, target: Target, id: &str) -> Option<&DateTime<FixedOffset>> {
        self.contents.get(&(target, id.to_string()))
    }

    /// Write an entity and record it in the index, replacing any earlier version.
    pub fn add<S: Serialize>(
        &mut self,
        target: Target,
        id: &str,
        timestamp: &DateTime<FixedOffset>,
        value: &S,
    ) -> Result<PathBuf> {
        let dir = self.base_dir.join(target.name());
        fs::create_dir_all(&dir)?;

        let file_name = Self::file_name(id, self.compress);
        let path = dir.join(&file_name);
        let tmp_path = dir.join(format!("{}.tmp", file_name));

        self.write_value(&tmp_path, &file_name, value)?;
        fs::rename(&tmp_path, &path)?;

        let mut csv = WriterBuilder::new().from_writer(vec![]);
        csv.write_record(&[
            target.name().to_string(),
            id.to_string(),
            timestamp.to_rfc3339(),
            format!("{}/{}", target.name(), file_name),
        ])?;

        let record = csv.into_inner().map_err(|error| error.into_error())?;
        self.file.write_all(&record)?;
        self.file.flush()?;

        self.contents.insert((target, id.to_string()), *timestamp);

        Ok(path)
    }

    fn write_value<S: Serialize>(&self, path: &Path, file_name: &str, value: &S) -> Result<()> {
        let file = File::create(path)?;

        if self.compress {
            let original_name = file_name.trim_end_matches(".gz");
            let mut gz = GzBuilder::new()
                .filename(original_name)
                .write(file, Compression::default());
            serde_json::to_writer_pretty(&mut gz, value)?;
            gz.finish()?;
        } else {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
        }

        Ok(())
    }

    /// Entity IDs may contain characters that don't belong in file names.
    pub fn file_name(id: &str, compress: bool) -> String {
        let stem = id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect::<String>();

        if compress {
            format!("{}.json.gz", stem)
        } else {
            format!("{}.json", stem)
        }
    }

    fn read_contents(path: &Path) -> Result<HashMap<(Target, String), DateTime<FixedOffset>>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;
        let mut contents = HashMap::new();

        for result in reader.records() {
            let record = result?;
            let line = record.position().map_or(0, |position| position.line());
            let invalid_row = || Error::InvalidIndexRow {
                path: path.to_path_buf(),
                line,
            };

            if record.len() != 4 {
                return Err(invalid_row());
            }

            let target = Target::from_name(&record[0]).ok_or_else(invalid_row)?;
            let timestamp = DateTime::parse_from_rfc3339(&record[2])
                .map_err(|_| Error::InvalidTimestamp(record[2].to_string()))?;

            // Later rows record rewrites, so they win.
            contents.insert((target, record[1].to_string()), timestamp);
        }

        Ok(contents)
    }
}
