use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UploadedFileDto {
    /// Public path, `/uploads/<filename>`
    pub url: String,
    pub filename: String,
    pub size: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FailedUploadDto {
    /// Name the client sent
    pub filename: String,
    pub error: String,
    /// Position among the submitted files
    pub index: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MultiUploadDto {
    pub files: Vec<UploadedFileDto>,
    pub errors: Vec<FailedUploadDto>,
    pub total_attempted: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UploadLimitsDto {
    pub max_file_size_bytes: usize,
    pub max_file_size_mb: usize,
    pub allowed_types: Vec<String>,
}
