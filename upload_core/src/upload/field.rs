//! One form field's upload bound to the checks in [`super::validator`].

use serde::{Deserialize, Serialize};

use super::code::UploadErrorCode;
use super::descriptor::{FileTable, UploadDescriptor};
use super::extensions::AllowedExtensions;
use super::provenance::UploadProvenance;
use super::validator;

/// Per-field upload policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRule {
    pub required: bool,
    /// Empty means any extension is accepted.
    pub allowed_extensions: Vec<String>,
    pub max_size: Option<String>,
}

/// Outcome of running every check against one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReport {
    pub field: String,
    pub error_code: UploadErrorCode,
    pub well_formed: bool,
    pub received: bool,
    pub allowed_type: bool,
    pub within_size: bool,
    pub passed: bool,
}

pub struct UploadField<'a, P: UploadProvenance + ?Sized> {
    field_name: &'a str,
    descriptor: Option<&'a UploadDescriptor>,
    absent: UploadDescriptor,
    provenance: &'a P,
}

impl<'a, P: UploadProvenance + ?Sized> UploadField<'a, P> {
    pub fn new(field_name: &'a str, table: &'a FileTable, provenance: &'a P) -> Self {
        Self::from_descriptor(field_name, table.get(field_name), provenance)
    }

    pub fn from_descriptor(
        field_name: &'a str,
        descriptor: Option<&'a UploadDescriptor>,
        provenance: &'a P,
    ) -> Self {
        Self {
            field_name,
            descriptor,
            absent: UploadDescriptor::default(),
            provenance,
        }
    }

    pub fn field_name(&self) -> &str {
        self.field_name
    }

    /// The bound descriptor; a field missing from the table reads as an
    /// all-absent descriptor.
    pub fn descriptor(&self) -> &UploadDescriptor {
        self.descriptor.unwrap_or(&self.absent)
    }

    pub fn is_present(&self) -> bool {
        self.descriptor.is_some()
    }

    pub fn error_code(&self) -> UploadErrorCode {
        self.descriptor().error_code()
    }

    pub fn is_well_formed(&self) -> bool {
        validator::is_well_formed(self.descriptor())
    }

    pub fn was_received(&self) -> bool {
        validator::was_received(self.descriptor(), self.provenance)
    }

    pub fn has_allowed_extension(&self, allowed: &AllowedExtensions) -> bool {
        validator::has_allowed_extension(self.descriptor(), allowed)
    }

    pub fn is_within_size_limit(&self, size_spec: Option<&str>) -> bool {
        validator::is_within_size_limit(self.descriptor(), size_spec)
    }

    pub fn check(&self, rule: &FieldRule) -> FieldReport {
        let well_formed = self.is_well_formed();
        let received = self.was_received();
        let allowed_type = if rule.allowed_extensions.is_empty() {
            true
        } else {
            self.has_allowed_extension(&AllowedExtensions::new(&rule.allowed_extensions))
        };
        let within_size = self.is_within_size_limit(rule.max_size.as_deref());

        let passed = well_formed && allowed_type && within_size && (received || !rule.required);

        tracing::debug!(
            field = self.field_name,
            error_code = self.error_code().code(),
            well_formed,
            received,
            allowed_type,
            within_size,
            passed,
            "upload field checked"
        );

        FieldReport {
            field: self.field_name.to_string(),
            error_code: self.error_code(),
            well_formed,
            received,
            allowed_type,
            within_size,
            passed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::provenance::UploadStaging;
    use std::io::Write;

    fn image_rule(required: bool) -> FieldRule {
        FieldRule {
            required,
            allowed_extensions: vec!["png".to_string(), "jpg".to_string()],
            max_size: Some("1K".to_string()),
        }
    }

    #[test]
    fn test_bound_checks_use_table_entry() {
        let staging = UploadStaging::new().unwrap();
        let (mut file, path) = staging.stage().unwrap();
        file.write_all(&[0u8; 100]).unwrap();

        let mut table = FileTable::new();
        table.insert("avatar", UploadDescriptor::received("me.PNG", "image/png", &path, 100));

        let field = UploadField::new("avatar", &table, &staging);
        assert!(field.is_present());
        assert!(field.is_well_formed());
        assert!(field.was_received());
        assert!(field.has_allowed_extension(&AllowedExtensions::new(["png"])));
        assert!(field.is_within_size_limit(Some("100B")));
        assert!(!field.is_within_size_limit(Some("99B")));

        let report = field.check(&image_rule(true));
        assert!(report.passed);
        assert_eq!(report.field, "avatar");
        assert_eq!(report.error_code, UploadErrorCode::Ok);
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let staging = UploadStaging::new().unwrap();
        let table = FileTable::new();
        let field = UploadField::new("avatar", &table, &staging);

        assert!(!field.is_present());
        assert!(!field.is_well_formed());
        assert!(!field.was_received());
        assert!(!field.check(&image_rule(false)).passed);
    }

    #[test]
    fn test_optional_field_without_file_passes() {
        let staging = UploadStaging::new().unwrap();
        let mut table = FileTable::new();
        table.insert("avatar", UploadDescriptor::not_submitted());
        let field = UploadField::new("avatar", &table, &staging);

        let optional = field.check(&image_rule(false));
        assert!(optional.passed);
        assert!(!optional.received);
        assert!(optional.allowed_type);
        assert!(optional.within_size);

        let required = field.check(&image_rule(true));
        assert!(!required.passed);
        assert_eq!(required.error_code, UploadErrorCode::NoFile);
    }

    #[test]
    fn test_check_runs_every_check() {
        let staging = UploadStaging::new().unwrap();
        let mut table = FileTable::new();
        table.insert("doc", UploadDescriptor::received("notes.exe", "application/x-msdownload", "/etc/hosts", 5000));

        let report = UploadField::new("doc", &table, &staging).check(&image_rule(true));

        assert!(report.well_formed);
        assert!(!report.received);
        assert!(!report.allowed_type);
        assert!(!report.within_size);
        assert!(!report.passed);
    }

    #[test]
    fn test_host_size_rejection_reported() {
        let staging = UploadStaging::new().unwrap();
        let mut table = FileTable::new();
        table.insert("doc", UploadDescriptor::failed(UploadErrorCode::IniSize, "huge.png", "image/png"));

        let report = UploadField::new("doc", &table, &staging).check(&FieldRule::default());

        assert!(!report.well_formed);
        assert!(report.allowed_type);
        assert!(!report.within_size);
        assert!(!report.passed);
    }

    #[test]
    fn test_rule_deserializes_with_defaults() {
        let rule: FieldRule = serde_json::from_str(r#"{"allowed_extensions": ["pdf"]}"#).unwrap();
        assert!(!rule.required);
        assert_eq!(rule.max_size, None);
        assert_eq!(rule.allowed_extensions, vec!["pdf".to_string()]);
    }
}
