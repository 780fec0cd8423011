// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compact per-tenant business snapshot for the system prompt.
//!
//! One section per entity kind: the aggregate count plus the most
//! recently updated rows, one line each in a stable field order. The
//! row cap comes from `agent.snapshot_rows` and is clamped at 50.

use kontor_core::{Industry, KontorError, RequestContext};
use kontor_storage::queries::{
    bookings, contacts, expenses, invoices, projects, talent, tasks,
};
use kontor_storage::{Database, LeadStage};

const MAX_SNAPSHOT_ROWS: usize = 50;

fn push_opt(line: &mut String, value: &Option<String>) {
    if let Some(v) = value {
        if !v.is_empty() {
            line.push_str(", ");
            line.push_str(v);
        }
    }
}

fn section(out: &mut String, heading: &str, total: i64, lines: &[String]) {
    if total == 0 {
        return;
    }
    out.push_str(&format!("{heading} ({total} total, {} shown):\n", lines.len()));
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
}

/// Renders the tenant's business snapshot. Talent and booking sections
/// only appear for the talent-agency vertical, mirroring the tool filter.
pub async fn business_snapshot(
    db: &Database,
    ctx: &RequestContext,
    rows: usize,
) -> Result<String, KontorError> {
    let limit = rows.clamp(1, MAX_SNAPSHOT_ROWS);
    let company = &ctx.company_id;
    let mut out = String::new();

    let contact_filter = contacts::ContactFilter::default();
    let contact_total = contacts::count_contacts(db, company, &contact_filter).await?;
    let contact_rows = contacts::search_contacts(db, company, &contact_filter, limit).await?;
    let contact_lines: Vec<String> = contact_rows
        .iter()
        .map(|c| {
            let mut line = format!("- {}", c.full_name());
            push_opt(&mut line, &c.email);
            push_opt(&mut line, &c.organization);
            push_opt(&mut line, &c.city);
            if c.lead_stage != LeadStage::None {
                line.push_str(&format!(" [lead: {}]", c.lead_stage));
            }
            line
        })
        .collect();
    section(&mut out, "Contacts", contact_total, &contact_lines);

    let task_filter = tasks::TaskFilter::default();
    let task_total = tasks::count_tasks(db, company, &task_filter).await?;
    let task_rows = tasks::search_tasks(db, company, &task_filter, limit).await?;
    let task_lines: Vec<String> = task_rows
        .iter()
        .map(|t| {
            let mut line = format!("- [{}/{}] {}", t.status, t.priority, t.title);
            if let Some(due) = &t.due_date {
                line.push_str(&format!(" (due {due})"));
            }
            line
        })
        .collect();
    section(&mut out, "Tasks", task_total, &task_lines);

    let project_filter = projects::ProjectFilter::default();
    let project_total = projects::count_projects(db, company, &project_filter).await?;
    let project_rows = projects::search_projects(db, company, &project_filter, limit).await?;
    let project_lines: Vec<String> = project_rows
        .iter()
        .map(|p| {
            let mut line = format!("- {} [{}]", p.name, p.status);
            if let Some(start) = &p.start_date {
                line.push_str(&format!(" from {start}"));
            }
            line
        })
        .collect();
    section(&mut out, "Projects", project_total, &project_lines);

    if ctx.industry == Industry::TalentAgency || ctx.elevated {
        let talent_filter = talent::TalentFilter::default();
        let talent_total = talent::count_talent(db, company, &talent_filter).await?;
        let talent_rows = talent::search_talent(db, company, &talent_filter, limit).await?;
        let talent_lines: Vec<String> = talent_rows
            .iter()
            .map(|t| {
                let mut line = format!("- {} [{}]", t.name, t.status);
                push_opt(&mut line, &t.category);
                push_opt(&mut line, &t.city);
                line
            })
            .collect();
        section(&mut out, "Talent", talent_total, &talent_lines);

        let booking_filter = bookings::BookingFilter::default();
        let booking_total = bookings::count_bookings(db, company, &booking_filter).await?;
        let booking_rows = bookings::search_bookings(db, company, &booking_filter, limit).await?;
        let booking_lines: Vec<String> = booking_rows
            .iter()
            .map(|b| {
                let mut line = format!("- [{}]", b.status);
                if let Some(start) = &b.start_date {
                    line.push_str(&format!(" {start}"));
                }
                if let Some(end) = &b.end_date {
                    line.push_str(&format!(" to {end}"));
                }
                push_opt(&mut line, &b.location);
                if let Some(fee) = b.fee {
                    line.push_str(&format!(", {fee:.2}"));
                }
                line
            })
            .collect();
        section(&mut out, "Bookings", booking_total, &booking_lines);
    }

    let invoice_filter = invoices::InvoiceFilter::default();
    let invoice_total = invoices::count_invoices(db, company, &invoice_filter).await?;
    let invoice_rows = invoices::search_invoices(db, company, &invoice_filter, limit).await?;
    let invoice_lines: Vec<String> = invoice_rows
        .iter()
        .map(|i| {
            let mut line = format!("- {} {:.2} {} [{}]", i.number, i.amount, i.currency, i.status);
            if let Some(due) = &i.due_date {
                line.push_str(&format!(" due {due}"));
            }
            line
        })
        .collect();
    section(&mut out, "Invoices", invoice_total, &invoice_lines);

    let expense_filter = expenses::ExpenseFilter::default();
    let expense_total = expenses::count_expenses(db, company, &expense_filter).await?;
    let expense_rows = expenses::search_expenses(db, company, &expense_filter, limit).await?;
    let expense_lines: Vec<String> = expense_rows
        .iter()
        .map(|e| {
            let mut line = format!("- {} {:.2} {}", e.description, e.amount, e.currency);
            push_opt(&mut line, &e.category);
            if let Some(date) = &e.expense_date {
                line.push_str(&format!(", {date}"));
            }
            line
        })
        .collect();
    section(&mut out, "Expenses", expense_total, &expense_lines);

    if out.is_empty() {
        out.push_str("No business records yet.\n");
    }
    Ok(out)
}
