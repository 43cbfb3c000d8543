//! Envelope building — validates form input before any network activity.

use uuid::Uuid;

use platen_core::order::{Material, Process};
use platen_core::wire::{chunk_count, SubmissionMetadata};

/// A form field failed validation.
///
/// Raised strictly before a connection is opened — the submitter corrects
/// the input locally and retries. Distinct from transfer failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("required field `{0}` is missing or blank")]
    MissingField(&'static str),

    #[error("copies must be a positive integer, got `{0}`")]
    InvalidCopies(String),

    #[error("the selected file is empty")]
    EmptyFile,
}

/// Collects raw form input and produces a validated [`SubmissionMetadata`].
///
/// `copies` is accepted as the raw text a form delivers; it must parse as
/// an integer ≥ 1. The builder computes `total_chunk_count` from the file
/// length and stamps a fresh correlation id.
#[derive(Debug, Default)]
pub struct EnvelopeBuilder {
    name: String,
    email: String,
    copies: String,
    file_name: String,
    file_len: u64,
    material: Option<Material>,
    process: Option<Process>,
}

impl EnvelopeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitter(mut self, name: &str, email: &str) -> Self {
        self.name = name.to_string();
        self.email = email.to_string();
        self
    }

    pub fn copies(mut self, raw: &str) -> Self {
        self.copies = raw.to_string();
        self
    }

    pub fn file(mut self, name: &str, len: u64) -> Self {
        self.file_name = name.to_string();
        self.file_len = len;
        self
    }

    pub fn material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    pub fn process(mut self, process: Process) -> Self {
        self.process = Some(process);
        self
    }

    pub fn build(self) -> Result<SubmissionMetadata, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.email.trim().is_empty() {
            return Err(ValidationError::MissingField("email"));
        }
        let copies: u32 = self
            .copies
            .trim()
            .parse()
            .map_err(|_| ValidationError::InvalidCopies(self.copies.clone()))?;
        if copies == 0 {
            return Err(ValidationError::InvalidCopies(self.copies));
        }
        if self.file_name.trim().is_empty() {
            return Err(ValidationError::MissingField("file"));
        }
        if self.file_len == 0 {
            return Err(ValidationError::EmptyFile);
        }
        let material = self.material.ok_or(ValidationError::MissingField("material"))?;
        let process = self.process.ok_or(ValidationError::MissingField("process"))?;

        Ok(SubmissionMetadata {
            correlation_id: Uuid::new_v4(),
            submitter_name: self.name.trim().to_string(),
            submitter_email: self.email.trim().to_string(),
            copies_requested: copies,
            source_file_name: self.file_name,
            total_chunk_count: chunk_count(self.file_len),
            material_type: material,
            process_type: process,
        })
    }
}
