//! The four upload checks.
//!
//! Each check stands alone: callers should run every check they care about
//! rather than gating one on another, since the extension and size checks
//! pass vacuously when no file arrived.

use tracing::debug;

use super::code::UploadErrorCode;
use super::descriptor::UploadDescriptor;
use super::extensions::{extension_of, AllowedExtensions};
use super::provenance::UploadProvenance;
use super::size::SizeLimit;

/// Baseline shape check; run it on every file field, required or not.
///
/// All five fields must be present and the error code must be either
/// "ok" or "no file".
pub fn is_well_formed(descriptor: &UploadDescriptor) -> bool {
    let complete = descriptor.error.is_some()
        && descriptor.name.is_some()
        && descriptor.mime_type.is_some()
        && descriptor.temp_path.is_some()
        && descriptor.size.is_some();

    let well_formed = complete
        && matches!(
            descriptor.error,
            Some(UploadErrorCode::Ok) | Some(UploadErrorCode::NoFile)
        );

    if !well_formed {
        debug!(complete, error = ?descriptor.error, "upload descriptor is not well formed");
    }
    well_formed
}

/// True only when a file genuinely arrived: the code is "ok" and the temp
/// path was issued by the upload mechanism.
///
/// `false` covers both "nothing chosen" and "upload failed"; inspect the
/// error code to tell them apart.
pub fn was_received<P>(descriptor: &UploadDescriptor, provenance: &P) -> bool
where
    P: UploadProvenance + ?Sized,
{
    let Some(error) = descriptor.error else {
        return false;
    };
    let Some(path) = descriptor.temp_path() else {
        return false;
    };

    if !error.is_ok() {
        return false;
    }

    let received = provenance.is_uploaded_file(path);
    if !received {
        debug!(path = %path.display(), "temp path failed the provenance check");
    }
    received
}

pub fn has_allowed_extension(descriptor: &UploadDescriptor, allowed: &AllowedExtensions) -> bool {
    if !descriptor.error_code().is_ok() {
        return true;
    }

    let extension = extension_of(descriptor.name.as_deref().unwrap_or_default());
    let allowed_type = !extension.is_empty() && allowed.contains(&extension);

    if !allowed_type {
        debug!(extension = %extension, "file extension not allowed");
    }
    allowed_type
}

/// Size check against an optional size spec such as `"5M"`.
///
/// Fails outright when the host already rejected the file for size. A
/// malformed size spec fails the check rather than erroring.
pub fn is_within_size_limit(descriptor: &UploadDescriptor, size_spec: Option<&str>) -> bool {
    let error = descriptor.error_code();

    if error.exceeded_size_limit() {
        debug!(error = %error, "host rejected upload for size");
        return false;
    }

    if !error.is_ok() {
        return true;
    }

    let Some(spec) = size_spec else {
        return true;
    };

    let limit = match spec.parse::<SizeLimit>() {
        Ok(limit) => limit,
        Err(e) => {
            debug!(error = %e, "size spec rejected");
            return false;
        }
    };

    let Some(size) = descriptor.size else {
        debug!("upload descriptor has no size");
        return false;
    };

    let within = limit.allows(size);
    if !within {
        debug!(size, limit = limit.bytes(), "file exceeds size limit");
    }
    within
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::provenance::UploadStaging;
    use std::path::{Path, PathBuf};

    fn uploaded(name: &str, size: u64) -> UploadDescriptor {
        UploadDescriptor::received(name, "application/octet-stream", "/tmp/upload-test", size)
    }

    fn with_error(error: UploadErrorCode) -> UploadDescriptor {
        UploadDescriptor {
            error: Some(error),
            ..uploaded("photo.jpg", 10)
        }
    }

    struct AcceptAll;

    impl UploadProvenance for AcceptAll {
        fn is_uploaded_file(&self, _path: &Path) -> bool {
            true
        }
    }

    #[test]
    fn test_well_formed_requires_every_field() {
        let complete = uploaded("photo.jpg", 10);
        assert!(is_well_formed(&complete));

        let missing: Vec<UploadDescriptor> = vec![
            UploadDescriptor { error: None, ..complete.clone() },
            UploadDescriptor { name: None, ..complete.clone() },
            UploadDescriptor { mime_type: None, ..complete.clone() },
            UploadDescriptor { temp_path: None, ..complete.clone() },
            UploadDescriptor { size: None, ..complete.clone() },
        ];

        for descriptor in missing {
            assert!(!is_well_formed(&descriptor), "{:?}", descriptor);
        }
    }

    #[test]
    fn test_well_formed_accepts_only_ok_or_no_file() {
        assert!(is_well_formed(&UploadDescriptor::not_submitted()));
        assert!(is_well_formed(&with_error(UploadErrorCode::Ok)));

        for error in [
            UploadErrorCode::IniSize,
            UploadErrorCode::FormSize,
            UploadErrorCode::Partial,
            UploadErrorCode::CantWrite,
            UploadErrorCode::Other(42),
        ] {
            assert!(!is_well_formed(&with_error(error)));
        }
    }

    #[test]
    fn test_was_received_requires_ok_code() {
        for error in [
            UploadErrorCode::NoFile,
            UploadErrorCode::IniSize,
            UploadErrorCode::Partial,
            UploadErrorCode::Other(9),
        ] {
            assert!(!was_received(&with_error(error), &AcceptAll));
        }

        assert!(was_received(&uploaded("a.txt", 1), &AcceptAll));
        assert!(!was_received(&UploadDescriptor { error: None, ..uploaded("a.txt", 1) }, &AcceptAll));
        assert!(!was_received(&UploadDescriptor { temp_path: Some(PathBuf::new()), ..uploaded("a.txt", 1) }, &AcceptAll));
    }

    #[test]
    fn test_was_received_checks_provenance() {
        let staging = UploadStaging::new().unwrap();
        let (_file, path) = staging.stage().unwrap();
        let genuine = UploadDescriptor::received("a.txt", "text/plain", &path, 0);
        let spoofed = UploadDescriptor::received("a.txt", "text/plain", "/etc/passwd", 0);

        assert!(was_received(&genuine, &staging));
        assert!(!was_received(&spoofed, &staging));
    }

    #[test]
    fn test_extension_check_is_case_insensitive() {
        let allowed = AllowedExtensions::new(["jpg", "png"]);

        assert!(has_allowed_extension(&uploaded("photo.JPG", 1), &allowed));
        assert!(has_allowed_extension(&uploaded("shot.final.png", 1), &allowed));
        assert!(!has_allowed_extension(&uploaded("photo", 1), &AllowedExtensions::new(["jpg"])));
        assert!(!has_allowed_extension(&uploaded("photo.", 1), &allowed));
        assert!(!has_allowed_extension(&uploaded("script.php", 1), &allowed));
        assert!(!has_allowed_extension(&uploaded("photo.jpg.php", 1), &allowed));
    }

    #[test]
    fn test_extension_check_passes_vacuously_without_file() {
        let nothing = AllowedExtensions::default();

        for error in [
            UploadErrorCode::NoFile,
            UploadErrorCode::IniSize,
            UploadErrorCode::Partial,
            UploadErrorCode::Other(13),
        ] {
            let descriptor = UploadDescriptor {
                name: Some("evil.exe".to_string()),
                ..with_error(error)
            };
            assert!(has_allowed_extension(&descriptor, &nothing));
        }
    }

    #[test]
    fn test_extension_check_without_name_fails() {
        let descriptor = UploadDescriptor { name: None, ..uploaded("", 1) };
        assert!(!has_allowed_extension(&descriptor, &AllowedExtensions::new(["jpg"])));
    }

    #[test]
    fn test_size_check_boundaries() {
        assert!(is_within_size_limit(&uploaded("a.bin", 1_048_576), Some("1M")));
        assert!(!is_within_size_limit(&uploaded("a.bin", 1_048_577), Some("1M")));
        assert!(is_within_size_limit(&uploaded("a.bin", 0), Some("0B")));
        assert!(is_within_size_limit(&uploaded("a.bin", 2048), Some("2k")));
    }

    #[test]
    fn test_size_check_hard_fails_on_host_size_errors() {
        for error in [UploadErrorCode::IniSize, UploadErrorCode::FormSize] {
            let descriptor = UploadDescriptor { size: Some(0), ..with_error(error) };
            assert!(!is_within_size_limit(&descriptor, None));
            assert!(!is_within_size_limit(&descriptor, Some("1G")));
            assert!(!is_within_size_limit(&descriptor, Some("abc")));
        }
    }

    #[test]
    fn test_size_check_passes_vacuously_on_other_errors() {
        for error in [UploadErrorCode::NoFile, UploadErrorCode::Partial, UploadErrorCode::Other(3)] {
            assert!(is_within_size_limit(&with_error(error), Some("abc")));
        }
    }

    #[test]
    fn test_size_check_without_size_spec() {
        assert!(is_within_size_limit(&uploaded("a.bin", u64::MAX), None));
    }

    #[test]
    fn test_size_check_fails_closed_on_bad_size_spec() {
        let descriptor = uploaded("a.bin", 1);
        assert!(!is_within_size_limit(&descriptor, Some("abc")));
        assert!(!is_within_size_limit(&descriptor, Some("")));
        assert!(!is_within_size_limit(&descriptor, Some("10MB")));
    }

    #[test]
    fn test_size_check_out_of_range_spec_allows_any_size() {
        let small = uploaded("a.bin", 5);
        assert!(is_within_size_limit(&small, Some("99999999999999999999B")));
        assert!(is_within_size_limit(&small, Some("18446744073709551615G")));
        assert!(is_within_size_limit(&uploaded("a.bin", u64::MAX), Some("99999999999999999999G")));
    }

    #[test]
    fn test_size_check_without_size_fails() {
        let descriptor = UploadDescriptor { size: None, ..uploaded("a.bin", 1) };
        assert!(!is_within_size_limit(&descriptor, Some("1M")));
    }

    #[test]
    fn test_checks_are_repeatable() {
        let descriptor = uploaded("photo.png", 500);
        let allowed = AllowedExtensions::new(["png"]);

        for _ in 0..3 {
            assert!(is_well_formed(&descriptor));
            assert!(has_allowed_extension(&descriptor, &allowed));
            assert!(is_within_size_limit(&descriptor, Some("1K")));
            assert!(!is_within_size_limit(&descriptor, Some("499B")));
        }
    }
}
