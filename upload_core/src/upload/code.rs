use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Outcome of receiving one file part, as reported by the host parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadErrorCode {
    Ok,
    /// The file exceeded the server-wide per-file ceiling.
    IniSize,
    /// The file exceeded the `MAX_FILE_SIZE` value the form declared.
    FormSize,
    Partial,
    NoFile,
    NoTmpDir,
    CantWrite,
    Extension,
    Other(i64),
}

impl UploadErrorCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::IniSize,
            2 => Self::FormSize,
            3 => Self::Partial,
            4 => Self::NoFile,
            6 => Self::NoTmpDir,
            7 => Self::CantWrite,
            8 => Self::Extension,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::Ok => 0,
            Self::IniSize => 1,
            Self::FormSize => 2,
            Self::Partial => 3,
            Self::NoFile => 4,
            Self::NoTmpDir => 6,
            Self::CantWrite => 7,
            Self::Extension => 8,
            Self::Other(code) => *code,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn is_no_file(&self) -> bool {
        matches!(self, Self::NoFile)
    }

    pub fn exceeded_size_limit(&self) -> bool {
        matches!(self, Self::IniSize | Self::FormSize)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Ok => "file uploaded successfully",
            Self::IniSize => "file exceeds the server upload size limit",
            Self::FormSize => "file exceeds the size limit declared by the form",
            Self::Partial => "file was only partially uploaded",
            Self::NoFile => "no file was uploaded",
            Self::NoTmpDir => "no temporary directory is available",
            Self::CantWrite => "failed to write file to disk",
            Self::Extension => "upload was stopped by a server extension",
            Self::Other(_) => "unknown upload error",
        }
    }
}

impl fmt::Display for UploadErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

impl Serialize for UploadErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

impl<'de> Deserialize<'de> for UploadErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(Self::from_code)
    }
}
