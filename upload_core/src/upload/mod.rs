pub mod code;
pub mod descriptor;
pub mod extensions;
pub mod field;
pub mod intake;
pub mod provenance;
pub mod size;
pub mod validator;

pub use code::UploadErrorCode;
pub use descriptor::{FileTable, UploadDescriptor};
pub use extensions::{extension_of, AllowedExtensions};
pub use field::{FieldReport, FieldRule, UploadField};
pub use intake::{collect_uploads, IntakeLimits, MAX_FILE_SIZE_FIELD};
pub use provenance::{DenyAllProvenance, TempDirProvenance, UploadProvenance, UploadStaging};
pub use size::{SizeLimit, SizeLimitError, SizeUnit};
pub use validator::{has_allowed_extension, is_well_formed, is_within_size_limit, was_received};
