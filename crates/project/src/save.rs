use crate::{MashupRecord, ProjectError};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub fn save_record(path: &Path, record: &MashupRecord) -> Result<(), ProjectError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, record)?;

    log::debug!("saved '{}' to {}", record.name, path.display());
    Ok(())
}

pub fn encode_msgpack(record: &MashupRecord) -> Result<Vec<u8>, ProjectError> {
    Ok(rmp_serde::encode::to_vec_named(record)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::sample_record;
    use tempfile::tempdir;

    #[test]
    fn test_save_record_creates_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("blend.json");

        save_record(&path, &sample_record()).expect("save");

        assert!(path.exists());
    }

    #[test]
    fn test_save_record_content_is_valid_json() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("blend.json");

        save_record(&path, &sample_record()).expect("save");

        let file = std::fs::File::open(&path).expect("open");
        let reader = std::io::BufReader::new(file);
        let loaded: MashupRecord = serde_json::from_reader(reader).expect("decode");

        assert_eq!(loaded, sample_record());
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nope").join("blend.json");

        let result = save_record(&path, &sample_record());
        assert!(matches!(result, Err(ProjectError::Io(_))));
    }
}
