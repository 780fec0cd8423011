// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row models for the Kontor schema.
//!
//! Lifecycle enums serialize as SCREAMING_SNAKE_CASE strings in both SQLite
//! and JSON. Row mappers fall back to each enum's initial state when a
//! stored value cannot be parsed.

use kontor_core::{new_id, now_iso};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A conversation between one user and the assistant, scoped to a tenant.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: String,
    pub company_id: String,
    pub user_id: String,
    pub title: String,
    pub learnings_extracted: bool,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Conversation {
    pub fn new(id: impl Into<String>, company_id: impl Into<String>, user_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = now_iso();
        Self {
            id: id.into(),
            company_id: company_id.into(),
            user_id: user_id.into(),
            title: title.into(),
            learnings_extracted: false,
            deleted_at: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// One persisted turn message. Immutable once written.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub id: String,
    pub conversation_id: String,
    /// `user` or `assistant`.
    pub role: String,
    pub content: String,
    /// JSON metadata, e.g. the parsed memory tag.
    pub metadata: Option<String>,
    pub model: Option<String>,
    pub created_at: String,
}

impl StoredMessage {
    pub fn new(conversation_id: impl Into<String>, role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            conversation_id: conversation_id.into(),
            role: role.into(),
            content: content.into(),
            metadata: None,
            model: None,
            created_at: now_iso(),
        }
    }
}

/// Lead lifecycle stage carried on a contact. A contact with any stage
/// other than `None` is a lead.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStage {
    #[default]
    None,
    New,
    Contacted,
    Qualified,
    Proposal,
    Negotiation,
    Won,
    Lost,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub id: String,
    pub company_id: String,
    pub created_by: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub organization: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub notes: Option<String>,
    pub lead_stage: LeadStage,
    pub lead_source: Option<String>,
    pub lead_value: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Contact {
    pub fn new(
        company_id: impl Into<String>,
        created_by: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        let now = now_iso();
        Self {
            id: new_id(),
            company_id: company_id.into(),
            created_by: created_by.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
            phone: None,
            organization: None,
            address: None,
            city: None,
            notes: None,
            lead_stage: LeadStage::None,
            lead_source: None,
            lead_value: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Open,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub company_id: String,
    pub created_by: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<String>,
    pub contact_id: Option<String>,
    pub project_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Task {
    pub fn new(company_id: impl Into<String>, created_by: impl Into<String>, title: impl Into<String>) -> Self {
        let now = now_iso();
        Self {
            id: new_id(),
            company_id: company_id.into(),
            created_by: created_by.into(),
            title: title.into(),
            description: None,
            status: TaskStatus::Open,
            priority: TaskPriority::Medium,
            due_date: None,
            contact_id: None,
            project_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Planned,
    Active,
    OnHold,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: String,
    pub company_id: String,
    pub created_by: String,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub contact_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub budget: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Project {
    pub fn new(company_id: impl Into<String>, created_by: impl Into<String>, name: impl Into<String>) -> Self {
        let now = now_iso();
        Self {
            id: new_id(),
            company_id: company_id.into(),
            created_by: created_by.into(),
            name: name.into(),
            description: None,
            status: ProjectStatus::Planned,
            contact_id: None,
            start_date: None,
            end_date: None,
            budget: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TalentStatus {
    #[default]
    Available,
    Engaged,
    Inactive,
}

/// Talent roster entry (talent-agency vertical).
#[derive(Debug, Clone, PartialEq)]
pub struct Talent {
    pub id: String,
    pub company_id: String,
    pub created_by: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub category: Option<String>,
    pub daily_rate: Option<f64>,
    pub city: Option<String>,
    pub status: TalentStatus,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Talent {
    pub fn new(company_id: impl Into<String>, created_by: impl Into<String>, name: impl Into<String>) -> Self {
        let now = now_iso();
        Self {
            id: new_id(),
            company_id: company_id.into(),
            created_by: created_by.into(),
            name: name.into(),
            email: None,
            phone: None,
            category: None,
            daily_rate: None,
            city: None,
            status: TalentStatus::Available,
            notes: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    #[default]
    Inquiry,
    Option,
    Confirmed,
    Completed,
    Cancelled,
}

/// Booking of one talent for a client/project (talent-agency vertical).
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub id: String,
    pub company_id: String,
    pub created_by: String,
    pub talent_id: String,
    pub contact_id: Option<String>,
    pub project_id: Option<String>,
    pub status: BookingStatus,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location: Option<String>,
    pub fee: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Booking {
    pub fn new(company_id: impl Into<String>, created_by: impl Into<String>, talent_id: impl Into<String>) -> Self {
        let now = now_iso();
        Self {
            id: new_id(),
            company_id: company_id.into(),
            created_by: created_by.into(),
            talent_id: talent_id.into(),
            contact_id: None,
            project_id: None,
            status: BookingStatus::Inquiry,
            start_date: None,
            end_date: None,
            location: None,
            fee: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub id: String,
    pub company_id: String,
    pub created_by: String,
    pub number: String,
    pub contact_id: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub status: InvoiceStatus,
    pub due_date: Option<String>,
    pub issued_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Invoice {
    pub fn new(
        company_id: impl Into<String>,
        created_by: impl Into<String>,
        number: impl Into<String>,
        amount: f64,
        currency: impl Into<String>,
    ) -> Self {
        let now = now_iso();
        Self {
            id: new_id(),
            company_id: company_id.into(),
            created_by: created_by.into(),
            number: number.into(),
            contact_id: None,
            amount,
            currency: currency.into(),
            status: InvoiceStatus::Draft,
            due_date: None,
            issued_at: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: String,
    pub company_id: String,
    pub created_by: String,
    pub description: String,
    pub amount: f64,
    pub currency: String,
    pub category: Option<String>,
    pub expense_date: Option<String>,
    pub project_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Expense {
    pub fn new(
        company_id: impl Into<String>,
        created_by: impl Into<String>,
        description: impl Into<String>,
        amount: f64,
        currency: impl Into<String>,
    ) -> Self {
        let now = now_iso();
        Self {
            id: new_id(),
            company_id: company_id.into(),
            created_by: created_by.into(),
            description: description.into(),
            amount,
            currency: currency.into(),
            category: None,
            expense_date: None,
            project_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// One knowledge-store entry. Owned by the offline extractor; the
/// orchestrator only reads entries and bumps `last_accessed_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeEntry {
    pub id: String,
    pub company_id: String,
    pub user_id: Option<String>,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub embedding: Vec<f32>,
    pub last_accessed_at: String,
    pub created_at: String,
}

impl KnowledgeEntry {
    pub fn new(
        company_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        let now = now_iso();
        Self {
            id: new_id(),
            company_id: company_id.into(),
            user_id: None,
            title: title.into(),
            content: content.into(),
            category: None,
            embedding,
            last_accessed_at: now.clone(),
            created_at: now,
        }
    }
}

/// Per-tenant LLM backend configuration. Absence of a row means the tenant
/// has not configured an LLM.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub company_id: String,
    pub provider: kontor_core::ProviderKind,
    pub model: String,
    pub base_url: Option<String>,
    pub credential_id: Option<String>,
    pub max_tokens: u32,
}

/// Encode an embedding vector as a little-endian f32 BLOB.
pub fn vec_to_blob(v: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(v.len() * 4);
    for f in v {
        blob.extend_from_slice(&f.to_le_bytes());
    }
    blob
}

/// Decode a little-endian f32 BLOB back into a vector. Trailing partial
/// chunks are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
