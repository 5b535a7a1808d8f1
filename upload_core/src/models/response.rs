//! Response envelopes

use serde::Serialize;

use crate::upload::FieldReport;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn failure(data: T, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub fields: Vec<FieldReport>,
}

impl ValidationResponse {
    pub fn new(fields: Vec<FieldReport>) -> Self {
        Self {
            valid: fields.iter().all(|field| field.passed),
            fields,
        }
    }
}
