//! Order model — a priced, trackable print job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filament material for a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Material {
    PLA,
    PET,
    ASA,
}

impl Material {
    pub fn as_str(&self) -> &'static str {
        match self {
            Material::PLA => "PLA",
            Material::PET => "PET",
            Material::ASA => "ASA",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PLA" => Some(Material::PLA),
            "PET" => Some(Material::PET),
            "ASA" => Some(Material::ASA),
            _ => None,
        }
    }
}

/// Print process selected by the submitter. Governs the time estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Process {
    Standard,
    Precise,
    ThickLayer,
    FullFill,
}

impl Process {
    pub fn as_str(&self) -> &'static str {
        match self {
            Process::Standard => "Standard",
            Process::Precise => "Precise",
            Process::ThickLayer => "ThickLayer",
            Process::FullFill => "FullFill",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Standard" => Some(Process::Standard),
            "Precise" => Some(Process::Precise),
            "ThickLayer" => Some(Process::ThickLayer),
            "FullFill" => Some(Process::FullFill),
            _ => None,
        }
    }
}

/// Lifecycle status of a placed order. Orders are never deleted —
/// Canceled is a terminal status, not a removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    InProgress,
    Completed,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "New",
            OrderStatus::InProgress => "InProgress",
            OrderStatus::Completed => "Completed",
            OrderStatus::Canceled => "Canceled",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "New" => Some(OrderStatus::New),
            "InProgress" => Some(OrderStatus::InProgress),
            "Completed" => Some(OrderStatus::Completed),
            "Canceled" => Some(OrderStatus::Canceled),
            _ => None,
        }
    }
}

/// A persisted order. `created_at` doubles as the natural identifier —
/// the modify endpoint addresses orders by it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub created_at: DateTime<Utc>,
    pub submitter_name: String,
    pub submitter_email: String,
    pub copies_requested: u32,
    pub source_file_name: String,
    pub computed_price: f64,
    pub material_type: Material,
    pub process_type: Process,
    pub status: OrderStatus,
    /// BLAKE3 hash (hex) of the received artifact.
    pub content_hash: String,
}

/// Body of `PUT /api/orders/modify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifyOrderRequest {
    pub datetime: DateTime<Utc>,
    pub new_status: OrderStatus,
}
