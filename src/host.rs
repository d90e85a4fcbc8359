//! File-path helpers for hosts that hand the engine paths instead of bytes

use std::ffi::{OsStr, OsString};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{PdfGuardError, PdfGuardResult};
use crate::PdfGuard;

/// What [`is_file_protected`] answers when the file cannot be inspected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InspectionPolicy {
    /// Return the error
    #[default]
    Strict,
    /// Treat unreadable or unparsable files as protected
    AssumeProtected,
}

/// Protect `input` with `password` and write the result to `output`
///
/// Returns the output path. The rewritten document goes to a sibling temporary
/// file that is renamed over `output` once fully written, so a failure never
/// leaves a partial file at `output`.
pub fn protect_file(input: impl AsRef<Path>, output: impl AsRef<Path>, password: &str) -> PdfGuardResult<PathBuf> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(PdfGuardError::IoBoundary(io::Error::new(
            io::ErrorKind::NotFound,
            format!("input PDF file not found: {}", input.display()),
        )));
    }
    if same_file(input, output) {
        return Err(PdfGuardError::IoBoundary(io::Error::new(
            io::ErrorKind::InvalidInput,
            "input and output must be different files",
        )));
    }

    let data = fs::read(input)?;
    let protected = PdfGuard::new().protect(&data, password)?;
    write_atomically(output, &protected)?;
    debug!("Wrote protected copy of {} to {}", input.display(), output.display());
    Ok(output.to_path_buf())
}

/// Check whether the file at `path` carries an encryption dictionary
pub fn is_file_protected(path: impl AsRef<Path>, policy: InspectionPolicy) -> PdfGuardResult<bool> {
    let path = path.as_ref();
    let result = fs::read(path)
        .map_err(PdfGuardError::from)
        .and_then(|data| PdfGuard::new().is_protected(&data));

    match (result, policy) {
        (Ok(protected), _) => Ok(protected),
        (Err(err), InspectionPolicy::AssumeProtected) => {
            warn!("Could not inspect {}, assuming protected: {}", path.display(), err);
            Ok(true)
        }
        (Err(err), InspectionPolicy::Strict) => Err(err),
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let temp = temp_path(path);
    let result = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp)
        .and_then(|mut file| {
            file.write_all(contents)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&temp, path));

    if result.is_err() && temp.exists() {
        if let Err(err) = fs::remove_file(&temp) {
            warn!("Could not remove temporary file {}: {}", temp.display(), err);
        }
    }
    result
}

/// `.<name>.<pid>.tmp` next to `path`
fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_else(|| OsStr::new("output")));
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use test_log::test;

    const MINIMAL_PDF: &[u8] = b"%PDF-1.4\n\
1 0 obj\n<< /Type /Catalog >>\nendobj\n\
xref\n0 2\n0000000000 65535 f \n0000000009 00000 n \n\
trailer\n<< /Size 2 /Root 1 0 R >>\nstartxref\n45\n%%EOF\n";

    #[test]
    fn test_protect_file_round_trip() -> PdfGuardResult<()> {
        let dir = TempDir::new()?;
        let input = dir.path().join("plain.pdf");
        let output = dir.path().join("locked.pdf");
        fs::write(&input, MINIMAL_PDF)?;

        let written = protect_file(&input, &output, "secret")?;
        assert_eq!(written, output);
        assert!(is_file_protected(&output, InspectionPolicy::Strict)?);
        assert!(!is_file_protected(&input, InspectionPolicy::Strict)?);
        Ok(())
    }

    #[test]
    fn test_missing_input() -> PdfGuardResult<()> {
        let dir = TempDir::new()?;
        let err = protect_file(dir.path().join("absent.pdf"), dir.path().join("out.pdf"), "pw").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoBoundary);
        assert!(!dir.path().join("out.pdf").exists());
        Ok(())
    }

    #[test]
    fn test_refuses_in_place_rewrite() -> PdfGuardResult<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("doc.pdf");
        fs::write(&path, MINIMAL_PDF)?;
        assert!(matches!(
            protect_file(&path, &path, "pw"),
            Err(PdfGuardError::IoBoundary(e)) if e.kind() == io::ErrorKind::InvalidInput
        ));
        Ok(())
    }

    #[test]
    fn test_failed_write_leaves_no_output() -> PdfGuardResult<()> {
        let dir = TempDir::new()?;
        let input = dir.path().join("plain.pdf");
        fs::write(&input, MINIMAL_PDF)?;
        let output = dir.path().join("missing-dir").join("locked.pdf");

        let err = protect_file(&input, &output, "pw").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoBoundary);
        assert!(!output.exists());
        Ok(())
    }

    #[test]
    fn test_output_replaced_without_leftovers() -> PdfGuardResult<()> {
        let dir = TempDir::new()?;
        let input = dir.path().join("plain.pdf");
        let output = dir.path().join("locked.pdf");
        fs::write(&input, MINIMAL_PDF)?;
        fs::write(&output, b"stale")?;

        protect_file(&input, &output, "pw")?;
        assert!(is_file_protected(&output, InspectionPolicy::Strict)?);

        let mut names: Vec<_> = fs::read_dir(dir.path())?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<io::Result<_>>()?;
        names.sort();
        assert_eq!(names, vec![OsString::from("locked.pdf"), OsString::from("plain.pdf")]);
        Ok(())
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let temp = temp_path(Path::new("/data/out/locked.pdf"));
        assert_eq!(temp.parent(), Some(Path::new("/data/out")));
        assert!(temp.file_name().unwrap().to_string_lossy().starts_with(".locked.pdf."));
    }

    #[test]
    fn test_inspection_policy() -> PdfGuardResult<()> {
        let dir = TempDir::new()?;
        let garbage = dir.path().join("garbage.pdf");
        fs::write(&garbage, b"not a pdf at all")?;

        assert!(is_file_protected(&garbage, InspectionPolicy::AssumeProtected)?);
        let err = is_file_protected(&garbage, InspectionPolicy::Strict).unwrap_err();
        assert!(err.is_parse_error());

        let missing = dir.path().join("missing.pdf");
        assert!(is_file_protected(&missing, InspectionPolicy::AssumeProtected)?);
        assert_eq!(
            is_file_protected(&missing, InspectionPolicy::Strict).unwrap_err().kind(),
            ErrorKind::IoBoundary
        );
        Ok(())
    }
}
