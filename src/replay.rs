// src/replay.rs
//
// =============================================================================
// DURALOG: REPLAY READER
// =============================================================================
//
// A lazy, finite iterator over every well-formed record in the log, bounded
// to a snapshot of the file size captured at construction time. Never shares
// the committer's descriptor; never observes writes that land after the
// snapshot was taken; never surfaces corruption to the caller.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::codec::{self, Record, HEADER_SIZE};
use crate::error::DuraLogError;

pub struct Replay {
    path: PathBuf,
    file: File,
    offset: u64,
    snapshot_size: u64,
}

impl Replay {
    /// Captures the current file size as the snapshot boundary and opens a
    /// fresh read-only handle. An empty (zero-byte) log yields no records.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DuraLogError> {
        let path = path.into();
        let snapshot_size = std::fs::metadata(&path)
            .map_err(|e| DuraLogError::io(&path, e))?
            .len();
        let file = File::open(&path).map_err(|e| DuraLogError::io(&path, e))?;
        Ok(Replay {
            path,
            file,
            offset: 0,
            snapshot_size,
        })
    }
}

impl Iterator for Replay {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        loop {
            if self.offset >= self.snapshot_size {
                return None;
            }
            if self.offset + HEADER_SIZE as u64 > self.snapshot_size {
                // No room for another header within the snapshot.
                return None;
            }

            let start_offset = self.offset;
            let remaining = self.snapshot_size - self.offset;
            let mut bounded = (&mut self.file).take(remaining);
            let outcome = codec::decode(&mut bounded);
            // Bytes actually consumed, successful or not: `Take` only shrinks
            // its quota by what was read, regardless of how the read turned
            // out, so this is exact even on a short/failed read.
            let consumed = remaining - bounded.limit();
            self.offset = start_offset + consumed;

            match outcome {
                Ok(record) => return Some(record),
                Err(e) => {
                    log_and_skip(&self.path, start_offset, &e);
                    // The spec deliberately does not resync on a bad header:
                    // the cursor only advances by whatever the failed read
                    // consumed, which may be less than a full frame. We loop
                    // and try again from wherever that left us.
                    continue;
                }
            }
        }
    }
}

fn log_and_skip(path: &Path, offset: u64, err: &dyn std::fmt::Display) {
    let corruption = DuraLogError::Corruption {
        path: path.to_path_buf(),
        offset,
        reason: err.to_string(),
    };
    log::warn!("{corruption}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use std::io::Write;

    fn write_frames(path: &Path, records: &[Record]) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        for record in records {
            file.write_all(&encode(record)).unwrap();
        }
    }

    #[test]
    fn empty_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.bin");
        std::fs::File::create(&path).unwrap();
        let replay = Replay::open(&path).unwrap();
        assert_eq!(replay.collect::<Vec<_>>(), vec![]);
    }

    #[test]
    fn yields_records_in_append_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.bin");
        let records = vec![
            Record::Text("a".into()),
            Record::Text("b".into()),
            Record::Text("c".into()),
        ];
        write_frames(&path, &records);
        let replay = Replay::open(&path).unwrap();
        assert_eq!(replay.collect::<Vec<_>>(), records);
    }

    #[test]
    fn skips_corrupt_region_between_valid_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.bin");

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .unwrap();

        let mut map_x = serde_json::Map::new();
        map_x.insert("x".into(), serde_json::json!(1));
        file.write_all(&encode(&Record::Json(map_x.clone())))
            .unwrap();

        // Invalid header: payload_size=0, type_flag=0xFF, checksum garbage.
        file.write_all(&[0x00, 0x00, 0x00, 0x00, 0xFF, 0x00, 0x00, 0x00, 0x00])
            .unwrap();

        let mut map_y = serde_json::Map::new();
        map_y.insert("y".into(), serde_json::json!(2));
        file.write_all(&encode(&Record::Json(map_y.clone())))
            .unwrap();

        let replay = Replay::open(&path).unwrap();
        assert_eq!(
            replay.collect::<Vec<_>>(),
            vec![Record::Json(map_x), Record::Json(map_y)]
        );
    }

    #[test]
    fn torn_tail_is_dropped_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.bin");
        let good = vec![Record::Text("one".into()), Record::Text("two".into())];
        write_frames(&path, &good);

        // Incomplete third frame: header plus half the payload.
        let torn = encode(&Record::Text("three-but-torn".into()));
        let half = HEADER_SIZE + (torn.len() - HEADER_SIZE) / 2;
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap();
        file.write_all(&torn[..half]).unwrap();

        let replay = Replay::open(&path).unwrap();
        assert_eq!(replay.collect::<Vec<_>>(), good);
    }

    #[test]
    fn snapshot_isolates_from_writes_after_replay_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.bin");
        write_frames(&path, &[Record::Text("one".into()), Record::Text("two".into())]);

        let replay = Replay::open(&path).unwrap();

        // A write landing after the snapshot was captured must not appear.
        write_frames(&path, &[Record::Text("three".into())]);

        assert_eq!(
            replay.collect::<Vec<_>>(),
            vec![Record::Text("one".into()), Record::Text("two".into())]
        );
    }
}
