//! Self-check of archive containers.
//!
//! Some files can vouch for themselves: a zip archive stores a CRC per entry
//! and a gzip stream carries a CRC trailer. Decoding the whole container
//! exercises those checks without any catalog checksum.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use zip::ZipArchive;

use super::error::{IntegrityError, IntegrityResult};

/// Archive formats that can verify their own contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Zip,
    Gzip,
}

impl ContainerFormat {
    /// Pick a format from the file extension.
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "zip" => Some(Self::Zip),
            "gz" | "tgz" => Some(Self::Gzip),
            _ => None,
        }
    }
}

/// Decode the container at `path` and report whether it is intact.
///
/// Returns `Ok(false)` for a damaged container; errors only when the file
/// cannot be opened.
pub fn verify_container(path: &Path, format: ContainerFormat) -> IntegrityResult<bool> {
    let file = File::open(path).map_err(|e| IntegrityError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let result = match format {
        ContainerFormat::Zip => check_zip(file),
        ContainerFormat::Gzip => check_gzip(file),
    };

    match result {
        Ok(()) => Ok(true),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Container self-check failed");
            Ok(false)
        }
    }
}

fn check_zip(file: File) -> io::Result<()> {
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(io::Error::other)?;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(io::Error::other)?;
        // Reading to the end validates the entry CRC.
        io::copy(&mut entry, &mut io::sink())?;
    }
    Ok(())
}

fn check_gzip(file: File) -> io::Result<()> {
    let mut decoder = MultiGzDecoder::new(BufReader::new(file));
    io::copy(&mut decoder, &mut io::sink())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    const PAYLOAD: &[u8] = b"PAYLOAD-PAYLOAD-PAYLOAD-PAYLOAD-PAYLOAD-PAYLOAD";

    fn write_zip(dir: &Path) -> PathBuf {
        let path = dir.join("bonus.zip");
        let mut writer = ZipWriter::new(File::create(&path).unwrap());
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        writer.start_file("readme.txt", options).unwrap();
        writer.write_all(PAYLOAD).unwrap();
        writer.finish().unwrap();
        path
    }

    fn write_gzip(dir: &Path) -> PathBuf {
        let path = dir.join("soundtrack.tar.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(&PAYLOAD.repeat(100)).unwrap();
        encoder.finish().unwrap();
        path
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(
            ContainerFormat::detect(Path::new("a/b/Manual.ZIP")),
            Some(ContainerFormat::Zip)
        );
        assert_eq!(
            ContainerFormat::detect(Path::new("ost.tar.gz")),
            Some(ContainerFormat::Gzip)
        );
        assert_eq!(ContainerFormat::detect(Path::new("setup.exe")), None);
        assert_eq!(ContainerFormat::detect(Path::new("noext")), None);
    }

    #[test]
    fn test_intact_zip() {
        let temp = TempDir::new().unwrap();
        let path = write_zip(temp.path());
        assert!(verify_container(&path, ContainerFormat::Zip).unwrap());
    }

    #[test]
    fn test_corrupt_zip_entry() {
        let temp = TempDir::new().unwrap();
        let path = write_zip(temp.path());

        let mut bytes = std::fs::read(&path).unwrap();
        let pos = bytes
            .windows(PAYLOAD.len())
            .position(|w| w == PAYLOAD)
            .unwrap();
        bytes[pos + 3] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();

        assert!(!verify_container(&path, ContainerFormat::Zip).unwrap());
    }

    #[test]
    fn test_garbage_is_not_a_zip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("fake.zip");
        std::fs::write(&path, vec![0u8; 512]).unwrap();
        assert!(!verify_container(&path, ContainerFormat::Zip).unwrap());
    }

    #[test]
    fn test_intact_gzip() {
        let temp = TempDir::new().unwrap();
        let path = write_gzip(temp.path());
        assert!(verify_container(&path, ContainerFormat::Gzip).unwrap());
    }

    #[test]
    fn test_truncated_gzip() {
        let temp = TempDir::new().unwrap();
        let path = write_gzip(temp.path());

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 6]).unwrap();

        assert!(!verify_container(&path, ContainerFormat::Gzip).unwrap());
    }

    #[test]
    fn test_missing_container_is_an_error() {
        let result = verify_container(Path::new("/nonexistent/a.zip"), ContainerFormat::Zip);
        assert!(result.is_err());
    }
}
