//! Query cache with optimistic updates.
//!
//! List results are cached per status filter and detail results per id,
//! each with a stale flag. Mutations are applied optimistically: the
//! cache is edited up front and a [`Snapshot`] of the prior state is
//! returned so a failed request can roll the edit back exactly.
//! Settlement marks everything stale, so the next read reconciles
//! against the server instead of trusting the optimistic value.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::types::{Invoice, InvoiceStatus};

/// Cache key for a list query: the normalized status filter.
///
/// Normalization fixes the order and drops duplicates, so
/// `?status=paid&status=draft` and `?status=draft&status=paid` share an
/// entry. The empty set is the unfiltered list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListKey(Vec<InvoiceStatus>);

impl ListKey {
    pub fn new(statuses: &[InvoiceStatus]) -> Self {
        let mut normalized = Vec::new();
        for status in [
            InvoiceStatus::Draft,
            InvoiceStatus::Pending,
            InvoiceStatus::Paid,
        ] {
            if statuses.contains(&status) {
                normalized.push(status);
            }
        }
        ListKey(normalized)
    }

    /// The unfiltered list.
    pub fn all() -> Self {
        ListKey(Vec::new())
    }

    pub fn statuses(&self) -> &[InvoiceStatus] {
        &self.0
    }

    /// Whether an invoice with `status` belongs in this list.
    pub fn matches(&self, status: InvoiceStatus) -> bool {
        self.0.is_empty() || self.0.contains(&status)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ListEntry {
    invoices: Vec<Invoice>,
    stale: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct DetailEntry {
    invoice: Invoice,
    stale: bool,
}

/// Saved cache state from just before an optimistic mutation, used to
/// roll the mutation back when the request fails.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    lists: HashMap<ListKey, ListEntry>,
    details: HashMap<String, DetailEntry>,
}

/// In-memory query cache for invoice list and detail reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryCache {
    lists: HashMap<ListKey, ListEntry>,
    details: HashMap<String, DetailEntry>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached list for `key` if present and not stale.
    pub fn fresh_list(&self, key: &ListKey) -> Option<&[Invoice]> {
        self.lists
            .get(key)
            .filter(|entry| !entry.stale)
            .map(|entry| entry.invoices.as_slice())
    }

    /// Returns the cached invoice for `id` if present and not stale.
    pub fn fresh_detail(&self, id: &str) -> Option<&Invoice> {
        self.details
            .get(id)
            .filter(|entry| !entry.stale)
            .map(|entry| &entry.invoice)
    }

    /// Stores a fetched list result, replacing any prior entry.
    pub fn put_list(&mut self, key: ListKey, invoices: Vec<Invoice>) {
        self.lists.insert(
            key,
            ListEntry {
                invoices,
                stale: false,
            },
        );
    }

    /// Stores a fetched invoice, replacing any prior entry.
    pub fn put_detail(&mut self, invoice: Invoice) {
        self.details.insert(
            invoice.id.clone(),
            DetailEntry {
                invoice,
                stale: false,
            },
        );
    }

    /// Stages a provisional invoice into every list entry whose filter it
    /// matches, keeping list order, and into the detail map.
    pub fn apply_create(&mut self, invoice: &Invoice) -> Snapshot {
        let snapshot = self.snapshot();
        for (key, entry) in &mut self.lists {
            if key.matches(invoice.status) {
                entry.invoices.push(invoice.clone());
                entry.invoices.sort_by(list_order);
            }
        }
        self.details.insert(
            invoice.id.clone(),
            DetailEntry {
                invoice: invoice.clone(),
                stale: false,
            },
        );
        snapshot
    }

    /// Removes an invoice from every cached entry.
    pub fn apply_delete(&mut self, id: &str) -> Snapshot {
        let snapshot = self.snapshot();
        for entry in self.lists.values_mut() {
            entry.invoices.retain(|invoice| invoice.id != id);
        }
        self.details.remove(id);
        snapshot
    }

    /// Flips an invoice to paid in every cached entry.
    ///
    /// Entries whose filter no longer matches drop the invoice; entries
    /// whose filter newly matches are reconciled by invalidation on
    /// settlement rather than by insertion here.
    pub fn apply_paid(&mut self, id: &str) -> Snapshot {
        let snapshot = self.snapshot();
        for (key, entry) in &mut self.lists {
            for invoice in &mut entry.invoices {
                if invoice.id == id {
                    invoice.status = InvoiceStatus::Paid;
                }
            }
            entry
                .invoices
                .retain(|invoice| invoice.id != id || key.matches(invoice.status));
        }
        if let Some(entry) = self.details.get_mut(id) {
            entry.invoice.status = InvoiceStatus::Paid;
        }
        snapshot
    }

    /// Rolls the cache back to a snapshot taken before an optimistic
    /// mutation.
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.lists = snapshot.lists;
        self.details = snapshot.details;
    }

    /// Marks every entry stale so the next read refetches.
    pub fn invalidate_all(&mut self) {
        for entry in self.lists.values_mut() {
            entry.stale = true;
        }
        for entry in self.details.values_mut() {
            entry.stale = true;
        }
    }

    /// Marks every list entry stale, leaving details untouched.
    pub fn invalidate_lists(&mut self) {
        for entry in self.lists.values_mut() {
            entry.stale = true;
        }
    }

    /// Marks one detail entry stale.
    pub fn invalidate_detail(&mut self, id: &str) {
        if let Some(entry) = self.details.get_mut(id) {
            entry.stale = true;
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            lists: self.lists.clone(),
            details: self.details.clone(),
        }
    }
}

/// Server list order: issue date descending, id ascending on ties.
fn list_order(a: &Invoice, b: &Invoice) -> Ordering {
    b.issued_at
        .cmp(&a.issued_at)
        .then_with(|| a.id.cmp(&b.id))
}
