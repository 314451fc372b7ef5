//! Postgres-backed invoice store.
//!
//! Invoices are spread across four relations (`invoices`,
//! `sender_addresses`, `clients`, `invoice_items`) with the child tables
//! keyed by invoice id and cascading on delete, plus the seeded
//! `payment_terms` reference table. Multi-table writes run in a
//! transaction; reads join the one-to-one children flat and fetch items
//! separately, ordered by `sort_order`.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;

use super::{InvoiceStore, StoreError};
use crate::models::{Address, Invoice, InvoiceId, InvoiceItem, InvoiceStatus, PaymentTerm};

const SELECT_INVOICE: &str = r#"
SELECT i.id, i.status, i.description, i.issued_at, i.payment_terms, i.payment_due, i.amount_due,
       s.street AS sender_street, s.city AS sender_city,
       s.post_code AS sender_post_code, s.country AS sender_country,
       c.name AS client_name, c.email AS client_email, c.street AS client_street,
       c.city AS client_city, c.post_code AS client_post_code, c.country AS client_country
FROM invoices i
JOIN sender_addresses s ON s.invoice_id = i.id
JOIN clients c ON c.invoice_id = i.id
"#;

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Flat row shape produced by [`SELECT_INVOICE`].
#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: String,
    status: InvoiceStatus,
    description: String,
    issued_at: NaiveDate,
    payment_terms: i64,
    payment_due: NaiveDate,
    amount_due: Decimal,
    sender_street: String,
    sender_city: String,
    sender_post_code: String,
    sender_country: String,
    client_name: String,
    client_email: String,
    client_street: String,
    client_city: String,
    client_post_code: String,
    client_country: String,
}

impl InvoiceRow {
    fn into_invoice(self, items: Vec<InvoiceItem>) -> Result<Invoice, StoreError> {
        let id = InvoiceId::parse(&self.id)
            .ok_or_else(|| StoreError::Integrity(format!("bad invoice id in row: '{}'", self.id)))?;
        Ok(Invoice {
            id,
            status: self.status,
            sender_address: Address {
                street: self.sender_street,
                city: self.sender_city,
                post_code: self.sender_post_code,
                country: self.sender_country,
            },
            client_name: self.client_name,
            client_email: self.client_email,
            client_address: Address {
                street: self.client_street,
                city: self.client_city,
                post_code: self.client_post_code,
                country: self.client_country,
            },
            issued_at: self.issued_at,
            payment_terms: self.payment_terms,
            description: self.description,
            items,
            payment_due: self.payment_due,
            amount_due: self.amount_due,
        })
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    invoice_id: String,
    name: String,
    quantity: i64,
    price: Decimal,
    total: Decimal,
}

impl From<ItemRow> for InvoiceItem {
    fn from(row: ItemRow) -> Self {
        InvoiceItem {
            name: row.name,
            quantity: row.quantity,
            price: row.price,
            total: row.total,
        }
    }
}

async fn insert_items(
    tx: &mut Transaction<'_, Postgres>,
    invoice: &Invoice,
) -> Result<(), StoreError> {
    for (position, item) in invoice.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO invoice_items (invoice_id, sort_order, name, quantity, price, total)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(invoice.id.as_str())
        .bind(position as i64)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.price)
        .bind(item.total)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl InvoiceStore for PostgresStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_invoices(&self, statuses: &[InvoiceStatus]) -> Result<Vec<Invoice>, StoreError> {
        let rows: Vec<InvoiceRow> = if statuses.is_empty() {
            sqlx::query_as::<_, InvoiceRow>(&format!(
                "{SELECT_INVOICE} ORDER BY i.issued_at DESC, i.id ASC"
            ))
            .fetch_all(&self.pool)
            .await?
        } else {
            let names: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
            sqlx::query_as::<_, InvoiceRow>(&format!(
                "{SELECT_INVOICE} WHERE i.status = ANY($1) ORDER BY i.issued_at DESC, i.id ASC"
            ))
            .bind(names)
            .fetch_all(&self.pool)
            .await?
        };

        // One items query for the whole page, grouped by invoice id.
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let item_rows: Vec<ItemRow> = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT invoice_id, name, quantity, price, total
            FROM invoice_items
            WHERE invoice_id = ANY($1)
            ORDER BY invoice_id, sort_order
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<String, Vec<InvoiceItem>> = HashMap::new();
        for row in item_rows {
            grouped
                .entry(row.invoice_id.clone())
                .or_default()
                .push(row.into());
        }

        rows.into_iter()
            .map(|row| {
                let items = grouped.remove(&row.id).unwrap_or_default();
                row.into_invoice(items)
            })
            .collect()
    }

    async fn get_invoice(&self, id: &InvoiceId) -> Result<Option<Invoice>, StoreError> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!("{SELECT_INVOICE} WHERE i.id = $1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let item_rows: Vec<ItemRow> = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT invoice_id, name, quantity, price, total
            FROM invoice_items
            WHERE invoice_id = $1
            ORDER BY sort_order
            "#,
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let items = item_rows.into_iter().map(InvoiceItem::from).collect();
        Ok(Some(row.into_invoice(items)?))
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO invoices (id, status, description, issued_at, payment_terms, payment_due, amount_due)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(invoice.id.as_str())
        .bind(invoice.status)
        .bind(&invoice.description)
        .bind(invoice.issued_at)
        .bind(invoice.payment_terms)
        .bind(invoice.payment_due)
        .bind(invoice.amount_due)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::Duplicate(invoice.id.clone())
            }
            other => StoreError::Database(other),
        })?;

        sqlx::query(
            r#"
            INSERT INTO sender_addresses (invoice_id, street, city, post_code, country)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(invoice.id.as_str())
        .bind(&invoice.sender_address.street)
        .bind(&invoice.sender_address.city)
        .bind(&invoice.sender_address.post_code)
        .bind(&invoice.sender_address.country)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO clients (invoice_id, name, email, street, city, post_code, country)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(invoice.id.as_str())
        .bind(&invoice.client_name)
        .bind(&invoice.client_email)
        .bind(&invoice.client_address.street)
        .bind(&invoice.client_address.city)
        .bind(&invoice.client_address.post_code)
        .bind(&invoice.client_address.country)
        .execute(&mut *tx)
        .await?;

        insert_items(&mut tx, invoice).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update_invoice(&self, invoice: &Invoice) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET status = $2, description = $3, issued_at = $4,
                payment_terms = $5, payment_due = $6, amount_due = $7
            WHERE id = $1
            "#,
        )
        .bind(invoice.id.as_str())
        .bind(invoice.status)
        .bind(&invoice.description)
        .bind(invoice.issued_at)
        .bind(invoice.payment_terms)
        .bind(invoice.payment_due)
        .bind(invoice.amount_due)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE sender_addresses
            SET street = $2, city = $3, post_code = $4, country = $5
            WHERE invoice_id = $1
            "#,
        )
        .bind(invoice.id.as_str())
        .bind(&invoice.sender_address.street)
        .bind(&invoice.sender_address.city)
        .bind(&invoice.sender_address.post_code)
        .bind(&invoice.sender_address.country)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE clients
            SET name = $2, email = $3, street = $4, city = $5, post_code = $6, country = $7
            WHERE invoice_id = $1
            "#,
        )
        .bind(invoice.id.as_str())
        .bind(&invoice.client_name)
        .bind(&invoice.client_email)
        .bind(&invoice.client_address.street)
        .bind(&invoice.client_address.city)
        .bind(&invoice.client_address.post_code)
        .bind(&invoice.client_address.country)
        .execute(&mut *tx)
        .await?;

        // Items are replaced wholesale; sort_order keeps submission order.
        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = $1")
            .bind(invoice.id.as_str())
            .execute(&mut *tx)
            .await?;
        insert_items(&mut tx, invoice).await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_invoice(&self, id: &InvoiceId) -> Result<bool, StoreError> {
        // Child rows cascade.
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_payment_terms(&self) -> Result<Vec<PaymentTerm>, StoreError> {
        let terms = sqlx::query_as::<_, PaymentTerm>(
            "SELECT id, name, days FROM payment_terms ORDER BY days",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(terms)
    }
}
