#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use chrono::Utc;
    use regex::Regex;
    use serde_json::{json, Value};
    use std::sync::Arc;

    use crate::store::MemoryStore;
    use crate::{create_router, AppState};

    /// Test helper to boot the full router against an in-memory store.
    fn test_server() -> TestServer {
        let state = AppState {
            store: Arc::new(MemoryStore::new()),
        };
        TestServer::new(create_router(state)).expect("Failed to start test server")
    }

    fn pending_payload() -> Value {
        json!({
            "status": "pending",
            "senderAddress": {
                "street": "19 Union Terrace",
                "city": "London",
                "postCode": "E1 3EZ",
                "country": "United Kingdom"
            },
            "clientName": "Alex Grim",
            "clientEmail": "alexgrim@mail.com",
            "clientAddress": {
                "street": "84 Church Way",
                "city": "Bradford",
                "postCode": "BD1 9PB",
                "country": "United Kingdom"
            },
            "issuedAt": "2021-08-21",
            "paymentTerms": 30,
            "description": "Graphic Design",
            "items": [
                { "name": "Banner Design", "quantity": 1, "price": 156 },
                { "name": "Email Design", "quantity": 2, "price": 200 }
            ]
        })
    }

    async fn create(server: &TestServer, payload: &Value) -> Value {
        let response = server.post("/api/invoices").json(payload).await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        response.json::<Value>()
    }

    fn id_of(body: &Value) -> String {
        body["id"].as_str().expect("invoice id should be a string").to_string()
    }

    /// Test that creating a pending invoice returns 201 with every
    /// derived field computed.
    #[tokio::test]
    async fn test_create_pending_invoice_computes_derived_fields() {
        let server = test_server();
        let body = create(&server, &pending_payload()).await;

        let id_format = Regex::new(r"^[A-Z]{2}\d{4}$").unwrap();
        assert!(id_format.is_match(&id_of(&body)));
        assert_eq!(body["status"], "pending");

        // 2021-08-21 plus 30 days
        assert_eq!(body["paymentDue"], "2021-09-20");
        assert_eq!(body["items"][0]["total"].as_f64(), Some(156.0));
        assert_eq!(body["items"][1]["total"].as_f64(), Some(400.0));
        assert_eq!(body["amountDue"].as_f64(), Some(556.0));
    }

    /// Test that a bare draft is accepted and filled with defaults.
    #[tokio::test]
    async fn test_create_empty_draft_uses_defaults() {
        let server = test_server();
        let body = create(&server, &json!({ "status": "draft" })).await;

        let today = Utc::now().date_naive().to_string();
        assert_eq!(body["status"], "draft");
        assert_eq!(body["clientName"], "");
        assert_eq!(body["paymentTerms"], 0);
        assert_eq!(body["issuedAt"].as_str(), Some(today.as_str()));
        assert_eq!(body["paymentDue"].as_str(), Some(today.as_str()));
        assert_eq!(body["items"].as_array().map(Vec::len), Some(0));
        assert_eq!(body["amountDue"].as_f64(), Some(0.0));
    }

    /// Test that line totals are rounded before they are summed.
    #[tokio::test]
    async fn test_amount_due_sums_rounded_line_totals() {
        let server = test_server();
        let mut payload = pending_payload();
        payload["items"] = json!([
            { "name": "Plotting", "quantity": 3, "price": 5.125 },
            { "name": "Plotting", "quantity": 3, "price": 5.125 }
        ]);
        let body = create(&server, &payload).await;

        // Each line is 15.375, rounded to 15.38 before summing; summing
        // first would give 30.75.
        assert_eq!(body["items"][0]["total"].as_f64(), Some(15.38));
        assert_eq!(body["amountDue"].as_f64(), Some(30.76));
    }

    /// Test that invoices cannot be created directly in the paid state.
    #[tokio::test]
    async fn test_create_paid_is_a_validation_failure() {
        let server = test_server();
        let response = server.post("/api/invoices").json(&json!({ "status": "paid" })).await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body = response.json::<Value>();
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert_eq!(body["message"], "invoice validation failed");
        assert_eq!(body["fields"]["status"][0], "must be either 'draft' or 'pending'");
    }

    /// Test that a pending submission reports every missing field by its
    /// dotted path in one response.
    #[tokio::test]
    async fn test_pending_validation_reports_all_paths() {
        let server = test_server();
        let response = server
            .post("/api/invoices")
            .json(&json!({
                "status": "pending",
                "clientAddress": { "street": "84 Church Way" },
                "items": [{ "name": "", "quantity": 0, "price": -1 }]
            }))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let fields = &response.json::<Value>()["fields"];
        assert_eq!(fields["clientName"][0], "can't be empty");
        assert_eq!(fields["clientAddress.city"][0], "can't be empty");
        assert_eq!(fields["items.0.name"][0], "can't be empty");
        assert_eq!(fields["items.0.quantity"][0], "must be at least 1");
        assert_eq!(fields["items.0.price"][0], "can't be negative");
    }

    #[tokio::test]
    async fn test_invalid_email_rejected_for_drafts_too() {
        let server = test_server();
        let response = server
            .post("/api/invoices")
            .json(&json!({ "status": "draft", "clientEmail": "not-an-email" }))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body = response.json::<Value>();
        assert_eq!(body["fields"]["clientEmail"][0], "must be a valid email");
    }

    /// Test that ids are matched case-insensitively and echoed uppercase.
    #[tokio::test]
    async fn test_get_invoice_accepts_lowercase_id() {
        let server = test_server();
        let created = create(&server, &pending_payload()).await;
        let id = id_of(&created);

        let response = server.get(&format!("/api/invoices/{}", id.to_lowercase())).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["id"], id.as_str());
    }

    #[tokio::test]
    async fn test_get_unknown_invoice_is_404() {
        let server = test_server();
        let response = server.get("/api/invoices/XX9999").await;

        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        let body = response.json::<Value>();
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["message"], "cannot find invoice with id 'XX9999'");
        assert!(body.get("fields").is_none());
    }

    /// Test that a malformed id is a validation failure, not a missing
    /// invoice.
    #[tokio::test]
    async fn test_get_malformed_id_is_400() {
        let server = test_server();
        let response = server.get("/api/invoices/banana").await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body = response.json::<Value>();
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert_eq!(body["fields"]["id"][0], "is not a valid invoice id");
    }

    /// Test that the list is ordered by issue date descending, with ids
    /// breaking ties ascending.
    #[tokio::test]
    async fn test_list_orders_by_issue_date_then_id() {
        let server = test_server();
        let older_a = create(&server, &json!({ "status": "draft", "issuedAt": "2021-10-05" })).await;
        let newest = create(&server, &json!({ "status": "draft", "issuedAt": "2021-12-01" })).await;
        let older_b = create(&server, &json!({ "status": "draft", "issuedAt": "2021-10-05" })).await;

        let mut tied = vec![id_of(&older_a), id_of(&older_b)];
        tied.sort();

        let response = server.get("/api/invoices").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let listed: Vec<String> = response.json::<Value>()
            .as_array()
            .expect("list response should be an array")
            .iter()
            .map(id_of)
            .collect();

        assert_eq!(listed, vec![id_of(&newest), tied[0].clone(), tied[1].clone()]);
    }

    /// Test that repeating the status parameter filters to the union of
    /// the named statuses.
    #[tokio::test]
    async fn test_list_filters_by_status_union() {
        let server = test_server();
        create(&server, &json!({ "status": "draft" })).await;
        create(&server, &pending_payload()).await;
        let paid = create(&server, &pending_payload()).await;
        let paid_id = id_of(&paid);
        server
            .put(&format!("/api/invoices/{paid_id}/status"))
            .json(&json!({ "status": "paid" }))
            .await;

        let drafts = server
            .get("/api/invoices")
            .add_query_param("status", "draft")
            .await
            .json::<Value>();
        assert_eq!(drafts.as_array().map(Vec::len), Some(1));

        let drafts_and_paid = server
            .get("/api/invoices")
            .add_query_param("status", "draft")
            .add_query_param("status", "paid")
            .await
            .json::<Value>();
        assert_eq!(drafts_and_paid.as_array().map(Vec::len), Some(2));

        let all = server.get("/api/invoices").await.json::<Value>();
        assert_eq!(all.as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_status_value() {
        let server = test_server();
        let response = server
            .get("/api/invoices")
            .add_query_param("status", "archived")
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body = response.json::<Value>();
        assert_eq!(body["fields"]["status"][0], "'archived' is not a valid status");
    }

    /// Test that an update replaces the invoice and recomputes the
    /// derived fields.
    #[tokio::test]
    async fn test_update_recomputes_derived_fields() {
        let server = test_server();
        let created = create(&server, &pending_payload()).await;
        let id = id_of(&created);

        let mut payload = pending_payload();
        payload["paymentTerms"] = json!(7);
        payload["items"] = json!([{ "name": "Banner Design", "quantity": 2, "price": 50 }]);

        let response = server.put(&format!("/api/invoices/{id}")).json(&payload).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body = response.json::<Value>();
        assert_eq!(body["paymentDue"], "2021-08-28");
        assert_eq!(body["amountDue"].as_f64(), Some(100.0));

        // The stored invoice reflects the update
        let fetched = server.get(&format!("/api/invoices/{id}")).await.json::<Value>();
        assert_eq!(fetched["amountDue"].as_f64(), Some(100.0));
    }

    /// Test that a pending invoice cannot be demoted back to draft.
    #[tokio::test]
    async fn test_update_cannot_demote_pending_to_draft() {
        let server = test_server();
        let created = create(&server, &pending_payload()).await;
        let id = id_of(&created);

        let mut payload = pending_payload();
        payload["status"] = json!("draft");

        let response = server.put(&format!("/api/invoices/{id}")).json(&payload).await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        let body = response.json::<Value>();
        assert_eq!(body["code"], "ACTION_NOT_PERMITTED");
        assert_eq!(
            body["message"],
            format!("cannot change pending invoice '{id}' back to draft")
        );
    }

    #[tokio::test]
    async fn test_update_unknown_invoice_is_404() {
        let server = test_server();
        let response = server
            .put("/api/invoices/XX9999")
            .json(&pending_payload())
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    /// Test the full lifecycle: pending, paid, then immutable.
    #[tokio::test]
    async fn test_mark_paid_then_invoice_is_immutable() {
        let server = test_server();
        let created = create(&server, &pending_payload()).await;
        let id = id_of(&created);

        let response = server
            .put(&format!("/api/invoices/{id}/status"))
            .json(&json!({ "status": "paid" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["status"], "paid");

        // A second transition is rejected
        let again = server
            .put(&format!("/api/invoices/{id}/status"))
            .json(&json!({ "status": "paid" }))
            .await;
        assert_eq!(again.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            again.json::<Value>()["message"],
            format!("cannot mark paid invoice '{id}' as paid")
        );

        // So is any further edit
        let edit = server
            .put(&format!("/api/invoices/{id}"))
            .json(&pending_payload())
            .await;
        assert_eq!(edit.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            edit.json::<Value>()["message"],
            format!("cannot edit paid invoice '{id}'")
        );
    }

    /// Test that drafts must be submitted before they can be paid.
    #[tokio::test]
    async fn test_draft_cannot_be_marked_paid() {
        let server = test_server();
        let created = create(&server, &json!({ "status": "draft" })).await;
        let id = id_of(&created);

        let response = server
            .put(&format!("/api/invoices/{id}/status"))
            .json(&json!({ "status": "paid" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.json::<Value>()["message"],
            format!("cannot mark draft invoice '{id}' as paid")
        );
    }

    #[tokio::test]
    async fn test_status_change_body_must_be_paid() {
        let server = test_server();
        let created = create(&server, &pending_payload()).await;
        let id = id_of(&created);

        let response = server
            .put(&format!("/api/invoices/{id}/status"))
            .json(&json!({ "status": "pending" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["fields"]["status"][0], "must be 'paid'");
    }

    /// Test that deletion returns 204 and the invoice is gone.
    #[tokio::test]
    async fn test_delete_removes_invoice() {
        let server = test_server();
        let created = create(&server, &json!({ "status": "draft" })).await;
        let id = id_of(&created);

        let response = server.delete(&format!("/api/invoices/{id}")).await;
        assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
        assert_eq!(response.text(), "");

        let fetched = server.get(&format!("/api/invoices/{id}")).await;
        assert_eq!(fetched.status_code(), StatusCode::NOT_FOUND);
    }

    /// Test that paid invoices are a permanent record.
    #[tokio::test]
    async fn test_delete_paid_invoice_is_forbidden() {
        let server = test_server();
        let created = create(&server, &pending_payload()).await;
        let id = id_of(&created);
        server
            .put(&format!("/api/invoices/{id}/status"))
            .json(&json!({ "status": "paid" }))
            .await;

        let response = server.delete(&format!("/api/invoices/{id}")).await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        let body = response.json::<Value>();
        assert_eq!(body["code"], "ACTION_NOT_PERMITTED");
        assert_eq!(body["message"], format!("cannot delete paid invoice '{id}'"));

        // Still present
        let fetched = server.get(&format!("/api/invoices/{id}")).await;
        assert_eq!(fetched.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_delete_unknown_invoice_is_404() {
        let server = test_server();
        let response = server.delete("/api/invoices/XX9999").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }
}
