use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

pub fn read_bin_file(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|source| {
        log::error!("Failed to open file {}", path.display());
        Error::File {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let mut buffer = vec![];
    file.read_to_end(&mut buffer).map_err(|source| {
        log::error!("Failed to read file data {}", path.display());
        Error::File {
            path: path.to_path_buf(),
            source,
        }
    })?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn reads_whole_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x03, 0x02, 0x23, 0x07, 0xff]).unwrap();

        let data = read_bin_file(file.path()).unwrap();
        assert_eq!(data, vec![0x03, 0x02, 0x23, 0x07, 0xff]);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.rgen.spv");

        match read_bin_file(&path) {
            Err(Error::File { path: err_path, .. }) => assert_eq!(err_path, path),
            other => panic!("unexpected {:?}", other),
        }
    }
}
