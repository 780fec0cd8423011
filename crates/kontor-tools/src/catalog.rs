// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The tool catalogue: one `ToolSpec` per callable tool.
//!
//! Argument schemas follow the JSON Schema subset every supported
//! provider accepts (`type`, `properties`, `required`, `enum`,
//! `description`). Lookup arguments are deliberately redundant: update
//! and delete tools accept an `id` when the model already knows it, or
//! human keys (names, email, invoice number) for fallback search.

use serde_json::{Value, json};

use crate::registry::ToolSpec;

fn params(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

pub(crate) fn all_specs() -> Vec<ToolSpec> {
    let mut specs = Vec::with_capacity(33);
    specs.extend(contact_specs());
    specs.extend(lead_specs());
    specs.extend(task_specs());
    specs.extend(project_specs());
    specs.extend(talent_specs());
    specs.extend(booking_specs());
    specs.extend(invoice_specs());
    specs.extend(expense_specs());
    specs
}

fn contact_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::mutating(
            "create_contact",
            "Create a new contact. Use only names the user literally wrote.",
            params(
                json!({
                    "first_name": {"type": "string"},
                    "last_name": {"type": "string"},
                    "email": {"type": "string"},
                    "phone": {"type": "string"},
                    "organization": {"type": "string"},
                    "address": {"type": "string", "description": "Street address"},
                    "city": {"type": "string"},
                    "notes": {"type": "string"},
                }),
                &["first_name", "last_name"],
            ),
        ),
        ToolSpec::mutating(
            "update_contact",
            "Update fields of an existing contact. Identify it by id, or by first/last name or email.",
            params(
                json!({
                    "id": {"type": "string"},
                    "first_name": {"type": "string"},
                    "last_name": {"type": "string"},
                    "email": {"type": "string"},
                    "updates": {
                        "type": "object",
                        "description": "Fields to change",
                        "properties": {
                            "first_name": {"type": "string"},
                            "last_name": {"type": "string"},
                            "email": {"type": "string"},
                            "phone": {"type": "string"},
                            "organization": {"type": "string"},
                            "address": {"type": "string"},
                            "city": {"type": "string"},
                            "notes": {"type": "string"},
                            "lead_value": {"type": "number"},
                        },
                    },
                }),
                &["updates"],
            ),
        )
        .grounded(),
        ToolSpec::mutating(
            "delete_contact",
            "Permanently delete a contact identified by id, name or email.",
            params(
                json!({
                    "id": {"type": "string"},
                    "first_name": {"type": "string"},
                    "last_name": {"type": "string"},
                    "email": {"type": "string"},
                }),
                &[],
            ),
        )
        .grounded(),
        ToolSpec::read(
            "search_contacts",
            "Search contacts by free text (name, email, organization) and optional filters.",
            params(
                json!({
                    "query": {"type": "string"},
                    "email": {"type": "string"},
                    "city": {"type": "string"},
                    "lead_stage": {"type": "string", "enum": ["NONE", "NEW", "CONTACTED", "QUALIFIED", "PROPOSAL", "NEGOTIATION", "WON", "LOST"]},
                    "lead_source": {"type": "string"},
                    "limit": {"type": "integer"},
                }),
                &[],
            ),
        ),
        ToolSpec::read(
            "count_contacts",
            "Count contacts matching optional filters.",
            params(
                json!({
                    "query": {"type": "string"},
                    "city": {"type": "string"},
                    "lead_source": {"type": "string"},
                }),
                &[],
            ),
        ),
    ]
}

fn lead_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::mutating(
            "create_lead",
            "Create a new lead (a contact with a pipeline stage).",
            params(
                json!({
                    "first_name": {"type": "string"},
                    "last_name": {"type": "string"},
                    "email": {"type": "string"},
                    "phone": {"type": "string"},
                    "organization": {"type": "string"},
                    "city": {"type": "string"},
                    "stage": {"type": "string", "enum": ["NEW", "CONTACTED", "QUALIFIED", "PROPOSAL", "NEGOTIATION", "WON", "LOST"], "description": "Defaults to NEW"},
                    "source": {"type": "string", "description": "Where the lead came from"},
                    "value": {"type": "number", "description": "Estimated deal value"},
                    "notes": {"type": "string"},
                }),
                &["first_name", "last_name"],
            ),
        ),
        ToolSpec::mutating(
            "update_lead_stage",
            "Move a lead to another pipeline stage. Identify it by id, name or email.",
            params(
                json!({
                    "id": {"type": "string"},
                    "first_name": {"type": "string"},
                    "last_name": {"type": "string"},
                    "email": {"type": "string"},
                    "stage": {"type": "string", "enum": ["NEW", "CONTACTED", "QUALIFIED", "PROPOSAL", "NEGOTIATION", "WON", "LOST"]},
                }),
                &["stage"],
            ),
        )
        .grounded(),
        ToolSpec::mutating(
            "delete_lead",
            "Remove a contact from the lead pipeline. The contact itself is kept.",
            params(
                json!({
                    "id": {"type": "string"},
                    "first_name": {"type": "string"},
                    "last_name": {"type": "string"},
                    "email": {"type": "string"},
                }),
                &[],
            ),
        )
        .grounded(),
        ToolSpec::read(
            "search_leads",
            "Search contacts that are in the lead pipeline.",
            params(
                json!({
                    "query": {"type": "string"},
                    "stage": {"type": "string", "enum": ["NEW", "CONTACTED", "QUALIFIED", "PROPOSAL", "NEGOTIATION", "WON", "LOST"]},
                    "source": {"type": "string"},
                    "city": {"type": "string"},
                    "limit": {"type": "integer"},
                }),
                &[],
            ),
        ),
        ToolSpec::read(
            "count_leads",
            "Count leads matching optional filters.",
            params(
                json!({
                    "stage": {"type": "string", "enum": ["NEW", "CONTACTED", "QUALIFIED", "PROPOSAL", "NEGOTIATION", "WON", "LOST"]},
                    "source": {"type": "string"},
                    "city": {"type": "string"},
                }),
                &[],
            ),
        ),
    ]
}

fn task_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::mutating(
            "create_task",
            "Create a task, optionally linked to a contact or project by name.",
            params(
                json!({
                    "title": {"type": "string"},
                    "description": {"type": "string"},
                    "priority": {"type": "string", "enum": ["LOW", "MEDIUM", "HIGH", "URGENT"]},
                    "due_date": {"type": "string", "description": "ISO date, e.g. 2026-09-01"},
                    "contact_name": {"type": "string", "description": "Link to a contact by name"},
                    "project_name": {"type": "string", "description": "Link to a project by name"},
                }),
                &["title"],
            ),
        ),
        ToolSpec::mutating(
            "update_task",
            "Update a task identified by id or title.",
            params(
                json!({
                    "id": {"type": "string"},
                    "title": {"type": "string"},
                    "updates": {
                        "type": "object",
                        "description": "Fields to change",
                        "properties": {
                            "title": {"type": "string"},
                            "description": {"type": "string"},
                            "status": {"type": "string", "enum": ["OPEN", "IN_PROGRESS", "COMPLETED", "CANCELLED"]},
                            "priority": {"type": "string", "enum": ["LOW", "MEDIUM", "HIGH", "URGENT"]},
                            "due_date": {"type": "string"},
                        },
                    },
                }),
                &["updates"],
            ),
        )
        .grounded(),
        ToolSpec::mutating(
            "complete_task",
            "Mark a task as completed, identified by id or title.",
            params(
                json!({
                    "id": {"type": "string"},
                    "title": {"type": "string"},
                }),
                &[],
            ),
        )
        .grounded(),
        ToolSpec::mutating(
            "delete_task",
            "Delete a task identified by id or title.",
            params(
                json!({
                    "id": {"type": "string"},
                    "title": {"type": "string"},
                }),
                &[],
            ),
        )
        .grounded(),
        ToolSpec::mutating(
            "bulk_delete_tasks",
            "Delete several tasks at once by their ids (from a previous search).",
            params(
                json!({
                    "ids": {"type": "array", "items": {"type": "string"}},
                }),
                &["ids"],
            ),
        ),
        ToolSpec::mutating(
            "bulk_update_tasks",
            "Apply the same field changes to several tasks by their ids.",
            params(
                json!({
                    "ids": {"type": "array", "items": {"type": "string"}},
                    "updates": {
                        "type": "object",
                        "properties": {
                            "status": {"type": "string", "enum": ["OPEN", "IN_PROGRESS", "COMPLETED", "CANCELLED"]},
                            "priority": {"type": "string", "enum": ["LOW", "MEDIUM", "HIGH", "URGENT"]},
                            "due_date": {"type": "string"},
                        },
                    },
                }),
                &["ids", "updates"],
            ),
        ),
        ToolSpec::read(
            "search_tasks",
            "Search tasks by text and optional filters.",
            params(
                json!({
                    "query": {"type": "string"},
                    "status": {"type": "string", "enum": ["OPEN", "IN_PROGRESS", "COMPLETED", "CANCELLED"]},
                    "priority": {"type": "string", "enum": ["LOW", "MEDIUM", "HIGH", "URGENT"]},
                    "due_before": {"type": "string", "description": "Only tasks due on or before this ISO date"},
                    "limit": {"type": "integer"},
                }),
                &[],
            ),
        ),
    ]
}

fn project_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::mutating(
            "create_project",
            "Create a project, optionally linked to a contact by name.",
            params(
                json!({
                    "name": {"type": "string"},
                    "description": {"type": "string"},
                    "status": {"type": "string", "enum": ["PLANNED", "ACTIVE", "ON_HOLD", "COMPLETED", "CANCELLED"]},
                    "start_date": {"type": "string"},
                    "end_date": {"type": "string"},
                    "budget": {"type": "number"},
                    "contact_name": {"type": "string"},
                }),
                &["name"],
            ),
        ),
        ToolSpec::mutating(
            "update_project",
            "Update a project identified by id or name.",
            params(
                json!({
                    "id": {"type": "string"},
                    "name": {"type": "string"},
                    "updates": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "description": {"type": "string"},
                            "status": {"type": "string", "enum": ["PLANNED", "ACTIVE", "ON_HOLD", "COMPLETED", "CANCELLED"]},
                            "start_date": {"type": "string"},
                            "end_date": {"type": "string"},
                            "budget": {"type": "number"},
                        },
                    },
                }),
                &["updates"],
            ),
        )
        .grounded(),
        ToolSpec::mutating(
            "delete_project",
            "Delete a project identified by id or name.",
            params(
                json!({
                    "id": {"type": "string"},
                    "name": {"type": "string"},
                }),
                &[],
            ),
        )
        .grounded(),
        ToolSpec::read(
            "search_projects",
            "Search projects by text and optional status.",
            params(
                json!({
                    "query": {"type": "string"},
                    "status": {"type": "string", "enum": ["PLANNED", "ACTIVE", "ON_HOLD", "COMPLETED", "CANCELLED"]},
                    "limit": {"type": "integer"},
                }),
                &[],
            ),
        ),
    ]
}

fn talent_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::mutating(
            "create_talent",
            "Add a talent to the roster.",
            params(
                json!({
                    "name": {"type": "string"},
                    "email": {"type": "string"},
                    "phone": {"type": "string"},
                    "category": {"type": "string", "description": "e.g. model, photographer, stylist"},
                    "city": {"type": "string"},
                    "daily_rate": {"type": "number"},
                    "notes": {"type": "string"},
                }),
                &["name"],
            ),
        )
        .talent_only(),
        ToolSpec::mutating(
            "update_talent",
            "Update a talent identified by id or name.",
            params(
                json!({
                    "id": {"type": "string"},
                    "name": {"type": "string"},
                    "updates": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "email": {"type": "string"},
                            "phone": {"type": "string"},
                            "category": {"type": "string"},
                            "city": {"type": "string"},
                            "daily_rate": {"type": "number"},
                            "status": {"type": "string", "enum": ["AVAILABLE", "ENGAGED", "INACTIVE"]},
                            "notes": {"type": "string"},
                        },
                    },
                }),
                &["updates"],
            ),
        )
        .grounded()
        .talent_only(),
        ToolSpec::read(
            "search_talent",
            "Search the talent roster.",
            params(
                json!({
                    "query": {"type": "string"},
                    "category": {"type": "string"},
                    "city": {"type": "string"},
                    "status": {"type": "string", "enum": ["AVAILABLE", "ENGAGED", "INACTIVE"]},
                    "limit": {"type": "integer"},
                }),
                &[],
            ),
        )
        .talent_only(),
    ]
}

fn booking_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::mutating(
            "create_booking",
            "Book a talent. Provide talent_id from a previous search, or talent_name.",
            params(
                json!({
                    "talent_id": {"type": "string"},
                    "talent_name": {"type": "string"},
                    "start_date": {"type": "string"},
                    "end_date": {"type": "string"},
                    "location": {"type": "string"},
                    "fee": {"type": "number"},
                    "contact_name": {"type": "string", "description": "Client contact by name"},
                    "project_name": {"type": "string"},
                }),
                &[],
            ),
        )
        .talent_only(),
        ToolSpec::mutating(
            "update_booking_status",
            "Change a booking's status. Identify it by id, or by talent_name (plus start_date if the talent has several bookings).",
            params(
                json!({
                    "id": {"type": "string"},
                    "talent_name": {"type": "string"},
                    "start_date": {"type": "string"},
                    "status": {"type": "string", "enum": ["INQUIRY", "OPTION", "CONFIRMED", "COMPLETED", "CANCELLED"]},
                }),
                &["status"],
            ),
        )
        .grounded()
        .talent_only(),
        ToolSpec::read(
            "search_bookings",
            "Search bookings, optionally by status or talent name.",
            params(
                json!({
                    "status": {"type": "string", "enum": ["INQUIRY", "OPTION", "CONFIRMED", "COMPLETED", "CANCELLED"]},
                    "talent_name": {"type": "string"},
                    "limit": {"type": "integer"},
                }),
                &[],
            ),
        )
        .talent_only(),
    ]
}

fn invoice_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::mutating(
            "create_invoice",
            "Create an invoice. The number is generated when not given.",
            params(
                json!({
                    "amount": {"type": "number"},
                    "currency": {"type": "string", "description": "Defaults to the tenant currency"},
                    "number": {"type": "string"},
                    "contact_id": {"type": "string"},
                    "contact_name": {"type": "string", "description": "Bill-to contact by name"},
                    "due_date": {"type": "string"},
                }),
                &["amount"],
            ),
        ),
        ToolSpec::mutating(
            "update_invoice_status",
            "Change an invoice's status, identified by id or invoice number.",
            params(
                json!({
                    "id": {"type": "string"},
                    "number": {"type": "string"},
                    "status": {"type": "string", "enum": ["DRAFT", "SENT", "PAID", "OVERDUE", "CANCELLED"]},
                }),
                &["status"],
            ),
        ),
        ToolSpec::read(
            "search_invoices",
            "Search invoices by number fragment or status.",
            params(
                json!({
                    "query": {"type": "string", "description": "Invoice number fragment"},
                    "status": {"type": "string", "enum": ["DRAFT", "SENT", "PAID", "OVERDUE", "CANCELLED"]},
                    "limit": {"type": "integer"},
                }),
                &[],
            ),
        ),
    ]
}

fn expense_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::mutating(
            "create_expense",
            "Record an expense, optionally assigned to a project by name.",
            params(
                json!({
                    "description": {"type": "string"},
                    "amount": {"type": "number"},
                    "currency": {"type": "string"},
                    "category": {"type": "string"},
                    "expense_date": {"type": "string"},
                    "project_name": {"type": "string"},
                }),
                &["description", "amount"],
            ),
        ),
        ToolSpec::mutating(
            "delete_expense",
            "Delete an expense identified by id or description.",
            params(
                json!({
                    "id": {"type": "string"},
                    "description": {"type": "string"},
                }),
                &[],
            ),
        ),
        ToolSpec::read(
            "search_expenses",
            "Search expenses by description text, category or project.",
            params(
                json!({
                    "query": {"type": "string"},
                    "category": {"type": "string"},
                    "limit": {"type": "integer"},
                }),
                &[],
            ),
        ),
    ]
}
