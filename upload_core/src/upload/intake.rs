//! Turns a multipart request body into a [`FileTable`].
//!
//! File parts are streamed into the staging area as they arrive, so the
//! descriptors handed to the validator point at staged files and carry the
//! error codes a host parser would report.

use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::http::StatusCode;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::code::UploadErrorCode;
use super::descriptor::{FileTable, UploadDescriptor};
use super::provenance::UploadStaging;
use super::size::SizeLimit;
use crate::error::{AppError, Result};

/// Form field that declares a per-form file size ceiling in bytes. It only
/// applies to file parts that follow it.
pub const MAX_FILE_SIZE_FIELD: &str = "MAX_FILE_SIZE";

#[derive(Debug, Clone, Copy)]
pub struct IntakeLimits {
    pub max_file_size: SizeLimit,
    pub max_file_uploads: usize,
}

impl Default for IntakeLimits {
    fn default() -> Self {
        Self {
            max_file_size: SizeLimit::from_bytes(2 * 1024 * 1024),
            max_file_uploads: 20,
        }
    }
}

/// Reads every part of `multipart`, staging file parts.
///
/// A transport failure that ends a file early records that file as
/// `Partial` and stops reading; the fields gathered so far are returned. A
/// body over the request limit fails the whole intake and discards anything
/// already staged.
pub async fn collect_uploads(
    mut multipart: Multipart,
    staging: &UploadStaging,
    limits: &IntakeLimits,
) -> Result<FileTable> {
    let mut table = FileTable::new();
    let mut form_limit: Option<u64> = None;
    let mut file_parts = 0usize;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                staging.discard_table(&table);
                return Err(multipart_error(e));
            }
        };

        let field_name = field.name().unwrap_or_default().to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            if field_name == MAX_FILE_SIZE_FIELD {
                match field.text().await {
                    Ok(text) => form_limit = text.trim().parse().ok(),
                    Err(e) => {
                        staging.discard_table(&table);
                        return Err(multipart_error(e));
                    }
                }
            }
            continue;
        };

        if file_parts >= limits.max_file_uploads {
            warn!(field = %field_name, max = limits.max_file_uploads, "file upload limit reached, skipping part");
            continue;
        }
        file_parts += 1;

        let mime_type = field.content_type().unwrap_or_default().to_string();

        let descriptor = if file_name.is_empty() {
            UploadDescriptor::not_submitted()
        } else {
            match receive_file(field, &file_name, &mime_type, staging, limits, form_limit).await {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    staging.discard_table(&table);
                    return Err(e);
                }
            }
        };

        let broken = descriptor.error_code() == UploadErrorCode::Partial;

        debug!(
            field = %field_name,
            file_name = %file_name,
            error_code = descriptor.error_code().code(),
            size = descriptor.size.unwrap_or_default(),
            "file part received"
        );

        if let Some(replaced) = table.insert(field_name, descriptor) {
            if let Some(path) = replaced.temp_path() {
                staging.discard(path);
            }
        }

        if broken {
            break;
        }
    }

    Ok(table)
}

async fn receive_file(
    mut field: Field<'_>,
    file_name: &str,
    mime_type: &str,
    staging: &UploadStaging,
    limits: &IntakeLimits,
    form_limit: Option<u64>,
) -> Result<UploadDescriptor> {
    let (file, path) = match staging.stage() {
        Ok(staged) => staged,
        Err(e) => {
            warn!(error = %e, "failed to create staged upload file");
            return Ok(UploadDescriptor::failed(UploadErrorCode::NoTmpDir, file_name, mime_type));
        }
    };
    let mut file = tokio::fs::File::from_std(file);
    let mut size: u64 = 0;

    let failure = loop {
        match field.chunk().await {
            Ok(Some(chunk)) => {
                size += chunk.len() as u64;

                if !limits.max_file_size.allows(size) {
                    break Some(UploadErrorCode::IniSize);
                }
                if form_limit.is_some_and(|limit| size > limit) {
                    break Some(UploadErrorCode::FormSize);
                }
                if let Err(e) = file.write_all(&chunk).await {
                    warn!(path = %path.display(), error = %e, "failed to write upload chunk");
                    break Some(UploadErrorCode::CantWrite);
                }
            }
            Ok(None) => match file.flush().await {
                Ok(()) => break None,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to flush staged upload");
                    break Some(UploadErrorCode::CantWrite);
                }
            },
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                drop(file);
                staging.discard(&path);
                return Err(multipart_error(e));
            }
            Err(e) => {
                warn!(error = %e, "upload stream ended early");
                break Some(UploadErrorCode::Partial);
            }
        }
    };

    drop(file);

    match failure {
        None => Ok(UploadDescriptor::received(file_name, mime_type, path, size)),
        Some(code) => {
            staging.discard(&path);
            Ok(UploadDescriptor::failed(code, file_name, mime_type))
        }
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::BadRequest(format!("Failed to read multipart body: {}", e.body_text()))
    }
}
