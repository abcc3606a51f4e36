use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::{Value, json};

use server::entity::{client, contact_identifier};

use crate::common::{TestApp, routes};

fn phone(number: &str) -> Value {
    json!({"accountNumber": number, "accountType": "Phone"})
}

async fn identifier_count(app: &TestApp) -> u64 {
    contact_identifier::Entity::find()
        .count(&app.db)
        .await
        .expect("DB query failed")
}

mod create {
    use super::*;

    #[tokio::test]
    async fn positions_follow_submission_order() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;

        let res = app
            .create_client(
                &token,
                &json!({
                    "firstName": "Jean",
                    "surname": "Dupont",
                    "contactIdentifiers": [
                        phone("0611111111"),
                        {"accountNumber": "@jdupont", "accountType": "Telegram", "info": "soir"},
                        {"accountNumber": "06 22 22 22 22", "accountType": "Phone"},
                    ],
                }),
            )
            .await;

        assert_eq!(res.body["slug"], "jean-dupont");
        assert_eq!(res.body["priority"], "Medium");
        let identifiers = res.body["contactIdentifiers"].as_array().unwrap();
        assert_eq!(identifiers.len(), 3);
        for (i, ident) in identifiers.iter().enumerate() {
            assert_eq!(ident["position"], i as i64 + 1);
        }
        assert_eq!(identifiers[1]["accountNumber"], "@jdupont");
        // Whitespace is stripped from account numbers.
        assert_eq!(identifiers[2]["accountNumber"], "0622222222");
        assert!(res.body.get("warnings").is_none());
    }

    #[tokio::test]
    async fn composite_id_uses_year_client_and_position() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;

        let res = app
            .create_client(
                &token,
                &json!({"nickname": "JD", "contactIdentifiers": [phone("0611111111")]}),
            )
            .await;
        let id = res.id();
        let year = chrono::Utc::now().format("%y").to_string();

        assert_eq!(
            res.body["contactIdentifiers"][0]["compositeId"],
            format!("{year}-{id}-1")
        );
    }

    #[tokio::test]
    async fn duplicate_within_submission_is_rejected_without_writes() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;

        let res = app
            .post_with_token(
                routes::CLIENTS,
                &json!({
                    "firstName": "Jean",
                    "contactIdentifiers": [phone("0611111111"), phone("06 11 11 11 11")],
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert!(res.body["error"].as_str().unwrap().contains("apparaît plusieurs fois"));
        assert_eq!(client::Entity::find().count(&app.db).await.unwrap(), 0);
        assert_eq!(identifier_count(&app).await, 0);
    }

    #[tokio::test]
    async fn pair_held_by_another_client_is_a_conflict() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;
        let first = app
            .create_client(
                &token,
                &json!({"firstName": "Jean", "surname": "Dupont", "contactIdentifiers": [phone("0611111111")]}),
            )
            .await;

        let res = app
            .post_with_token(
                routes::CLIENTS,
                &json!({"firstName": "Marie", "contactIdentifiers": [phone("0611111111")]}),
                &token,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "DUPLICATE_IDENTIFIER");
        let duplicates = res.body["duplicates"].as_array().unwrap();
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0]["clientId"], first.id());
        assert_eq!(duplicates[0]["clientSlug"], "jean-dupont");
        assert_eq!(duplicates[0]["accountType"], "Phone");
        assert_eq!(client::Entity::find().count(&app.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn same_number_other_type_only_warns() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;
        let first = app
            .create_client(
                &token,
                &json!({"firstName": "Jean", "contactIdentifiers": [phone("0611111111")]}),
            )
            .await;

        let res = app
            .create_client(
                &token,
                &json!({
                    "firstName": "Marie",
                    "contactIdentifiers": [{"accountNumber": "0611111111", "accountType": "WhatsApp"}],
                }),
            )
            .await;

        let warnings = res.body["warnings"].as_array().unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0]["clientId"], first.id());
        assert_eq!(warnings[0]["existingAccountType"], "Phone");
        assert_eq!(identifier_count(&app).await, 2);
    }

    #[tokio::test]
    async fn slug_collisions_get_a_numeric_suffix() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;

        let a = app.create_client(&token, &json!({"firstName": "Éloïse"})).await;
        let b = app.create_client(&token, &json!({"firstName": "Eloise"})).await;
        let c = app.create_client(&token, &json!({})).await;

        assert_eq!(a.body["slug"], "eloise");
        assert_eq!(b.body["slug"], "eloise-2");
        assert_eq!(c.body["slug"], "client");
    }

    #[tokio::test]
    async fn slug_drops_punctuation_and_keeps_underscores() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;

        let a = app.create_client(&token, &json!({"surname": "O'Brien"})).await;
        let b = app.create_client(&token, &json!({"nickname": "jean_luc"})).await;

        assert_eq!(a.body["slug"], "obrien");
        assert_eq!(b.body["slug"], "jean_luc");
    }

    #[tokio::test]
    async fn numeric_name_stays_reachable_by_slug() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;

        let res = app.create_client(&token, &json!({"nickname": "123"})).await;
        assert_eq!(res.body["slug"], "client-123");

        let by_slug = app.get_with_token(&routes::client("client-123"), &token).await;
        assert_eq!(by_slug.status, 200);
        assert_eq!(by_slug.id(), res.id());
    }

    #[tokio::test]
    async fn start_after_end_is_rejected() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;

        let res = app
            .post_with_token(
                routes::CLIENTS,
                &json!({
                    "firstName": "Jean",
                    "search": {"generalReference": "ENQ-1", "startDate": "2026-05-02", "endDate": "2026-05-01"},
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(client::Entity::find().count(&app.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_content_type_is_a_validation_error() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;

        let res = app
            .client
            .post(app.url(routes::CLIENTS))
            .header("Authorization", format!("Bearer {token}"))
            .body("{}")
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 400);
    }
}

mod search {
    use super::*;

    fn with_search(first_name: &str, link_existing: bool) -> Value {
        json!({
            "firstName": first_name,
            "search": {"generalReference": "ENQ-7", "detailedReference": "Lyon"},
            "linkExistingSearch": link_existing,
        })
    }

    #[tokio::test]
    async fn existing_reference_requires_confirmation() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;
        let first = app.create_client(&token, &with_search("Jean", false)).await;
        let search_id = first.body["searches"][0]["id"].as_i64().unwrap();

        let res = app
            .post_with_token(routes::CLIENTS, &with_search("Marie", false), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["requiresValidation"], true);
        assert_eq!(res.body["existingSearch"]["id"], search_id);
        assert_eq!(res.body["formData"]["firstName"], "Marie");
        assert_eq!(client::Entity::find().count(&app.db).await.unwrap(), 1);

        let confirmed = app.create_client(&token, &with_search("Marie", true)).await;
        assert_eq!(confirmed.body["searches"][0]["id"], search_id);
    }

    #[tokio::test]
    async fn update_to_another_clients_search_requires_confirmation() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;
        let owner = app
            .create_client(
                &token,
                &json!({
                    "firstName": "Jean",
                    "search": {"generalReference": "ENQ-7", "detailedReference": "Lyon", "startDate": "2026-01-01"},
                }),
            )
            .await;
        let search_id = owner.body["searches"][0]["id"].as_i64().unwrap();
        let id = app
            .create_client(
                &token,
                &json!({
                    "firstName": "Marie",
                    "surname": "Curie",
                    "description": "suivie",
                    "requestor": "CCAS",
                }),
            )
            .await
            .id();

        let res = app
            .patch_with_token(
                &routes::client(id),
                &json!({
                    "priority": "High",
                    "search": {"generalReference": "ENQ-7", "detailedReference": "Lyon", "startDate": "2026-03-01"},
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["requiresValidation"], true);
        assert_eq!(res.body["existingSearch"]["id"], search_id);
        let form = res.body["formData"].as_object().unwrap();
        assert!(!form.contains_key("firstName"));
        assert!(!form.contains_key("surname"));

        let unchanged = app.get_with_token(&routes::client(id), &token).await;
        assert_eq!(unchanged.body["priority"], "Medium");
        assert_eq!(unchanged.body["searches"].as_array().unwrap().len(), 0);
        assert_eq!(app.history_count(id).await, 1);

        let mut resubmitted = res.body["formData"].clone();
        resubmitted["linkExistingSearch"] = json!(true);
        let res = app
            .patch_with_token(&routes::client(id), &resubmitted, &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["firstName"], "Marie");
        assert_eq!(res.body["surname"], "Curie");
        assert_eq!(res.body["description"], "suivie");
        assert_eq!(res.body["requestor"], "CCAS");
        assert_eq!(res.body["priority"], "High");
        assert_eq!(res.body["searches"][0]["id"], search_id);
        // Linking to a search owned by another client keeps its stored dates.
        assert_eq!(res.body["searches"][0]["startDate"], "2026-01-01");

        let history = app.history_rows(id).await;
        assert_eq!(history.len(), 2);
        let changes = history[1].changes.as_object().unwrap();
        assert!(changes.contains_key("priority"));
        assert_eq!(changes["generalReference"]["new"], "ENQ-7");
        assert!(!changes.contains_key("firstName"));
        assert!(!changes.contains_key("surname"));
    }

    #[tokio::test]
    async fn linked_search_takes_submitted_dates() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;
        let res = app
            .create_client(
                &token,
                &json!({
                    "firstName": "Jean",
                    "search": {"generalReference": "ENQ-8", "startDate": "2026-01-01"},
                }),
            )
            .await;
        let id = res.id();
        let search_id = res.body["searches"][0]["id"].as_i64().unwrap();

        let res = app
            .patch_with_token(
                &routes::client(id),
                &json!({
                    "search": {"generalReference": "ENQ-8", "startDate": "2026-01-01", "endDate": "2026-06-30"},
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body.get("requiresValidation").is_none());
        assert_eq!(res.body["searches"][0]["id"], search_id);
        assert_eq!(res.body["searches"][0]["endDate"], "2026-06-30");

        let history = app.history_rows(id).await;
        let changes = history.last().unwrap().changes.as_object().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["endDate"]["old"], Value::Null);
        assert_eq!(changes["endDate"]["new"], "2026-06-30");
    }

    #[tokio::test]
    async fn removing_search_with_null() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;
        let res = app.create_client(&token, &with_search("Jean", false)).await;
        let id = res.id();

        let res = app
            .patch_with_token(&routes::client(id), &json!({"search": null}), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["searches"].as_array().unwrap().len(), 0);
        let history = app.history_rows(id).await;
        let changes = &history.last().unwrap().changes;
        assert_eq!(changes["generalReference"]["old"], "ENQ-7");
        assert_eq!(changes["generalReference"]["new"], Value::Null);
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn replaying_identifiers_restarts_positions() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;
        let res = app
            .create_client(
                &token,
                &json!({"firstName": "Jean", "contactIdentifiers": [phone("0611111111"), phone("0622222222")]}),
            )
            .await;
        let id = res.id();

        let res = app
            .patch_with_token(
                &routes::client(id),
                &json!({"contactIdentifiers": [phone("0633333333"), phone("0611111111")]}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200);
        let identifiers = res.body["contactIdentifiers"].as_array().unwrap();
        assert_eq!(identifiers.len(), 2);
        assert_eq!(identifiers[0]["accountNumber"], "0633333333");
        assert_eq!(identifiers[0]["position"], 1);
        assert_eq!(identifiers[1]["accountNumber"], "0611111111");
        assert_eq!(identifiers[1]["position"], 2);
        assert_eq!(identifier_count(&app).await, 2);
    }

    #[tokio::test]
    async fn client_may_keep_its_own_identifiers() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;
        let id = app
            .create_client(
                &token,
                &json!({"firstName": "Jean", "contactIdentifiers": [phone("0611111111")]}),
            )
            .await
            .id();

        let res = app
            .patch_with_token(
                &routes::client(id),
                &json!({"description": "suivi", "contactIdentifiers": [phone("0611111111")]}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200);
        assert!(res.body.get("warnings").is_none());
    }

    #[tokio::test]
    async fn priority_change_records_only_priority() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;
        let id = app
            .create_client(
                &token,
                &json!({"firstName": "Jean", "contactIdentifiers": [phone("0611111111")]}),
            )
            .await
            .id();

        let res = app
            .patch_with_token(&routes::client(id), &json!({"priority": "High"}), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["priority"], "High");
        let history = app.history_rows(id).await;
        assert_eq!(history.len(), 2);
        let changes = history[1].changes.as_object().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["priority"]["old"], "Medium");
        assert_eq!(changes["priority"]["new"], "High");
    }

    #[tokio::test]
    async fn identical_resubmission_writes_no_history() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;
        let payload = json!({
            "firstName": "Jean",
            "surname": "Dupont",
            "priority": "Low",
            "contactIdentifiers": [phone("0611111111")],
            "search": {"generalReference": "ENQ-9", "startDate": "2026-01-01"},
        });
        let id = app.create_client(&token, &payload).await.id();

        let res = app
            .patch_with_token(&routes::client(id), &payload, &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(app.history_count(id).await, 1);
    }

    #[tokio::test]
    async fn blank_text_counts_as_unset() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;
        let id = app
            .create_client(&token, &json!({"firstName": "Jean"}))
            .await
            .id();

        let res = app
            .patch_with_token(&routes::client(id), &json!({"description": "   "}), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(app.history_count(id).await, 1);
    }

    #[tokio::test]
    async fn renaming_regenerates_the_slug() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;
        let id = app
            .create_client(&token, &json!({"firstName": "Jean"}))
            .await
            .id();

        let res = app
            .patch_with_token(&routes::client(id), &json!({"firstName": "Paul"}), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["slug"], "paul");
        let by_slug = app.get_with_token(&routes::client("paul"), &token).await;
        assert_eq!(by_slug.status, 200);
        assert_eq!(by_slug.id(), id);
    }

    #[tokio::test]
    async fn conflict_leaves_client_untouched() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;
        app.create_client(
            &token,
            &json!({"firstName": "Jean", "contactIdentifiers": [phone("0611111111")]}),
        )
        .await;
        let id = app
            .create_client(
                &token,
                &json!({"firstName": "Marie", "contactIdentifiers": [phone("0622222222")]}),
            )
            .await
            .id();

        let res = app
            .patch_with_token(
                &routes::client(id),
                &json!({"priority": "Immediate", "contactIdentifiers": [phone("0611111111")]}),
                &token,
            )
            .await;

        assert_eq!(res.status, 409);
        let current = app.get_with_token(&routes::client(id), &token).await;
        assert_eq!(current.body["priority"], "Medium");
        assert_eq!(
            current.body["contactIdentifiers"][0]["accountNumber"],
            "0622222222"
        );
        assert_eq!(app.history_count(id).await, 1);
    }

    #[tokio::test]
    async fn unknown_client_is_not_found() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;

        let res = app
            .patch_with_token(&routes::client(9999), &json!({"priority": "High"}), &token)
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn soft_delete_releases_the_slug() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;
        let id = app
            .create_client(&token, &json!({"nickname": "foo"}))
            .await
            .id();

        let res = app.delete_with_token(&routes::client(id), &token).await;
        assert_eq!(res.status, 204);

        let row = client::Entity::find_by_id(id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.slug, format!("foo_deleted_{id}"));
        assert!(row.deleted_at.is_some());

        let gone = app.get_with_token(&routes::client(id), &token).await;
        assert_eq!(gone.status, 404);

        let reused = app.create_client(&token, &json!({"nickname": "foo"})).await;
        assert_eq!(reused.body["slug"], "foo");

        let history = app.history_rows(id).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].action, ::common::HistoryAction::Delete);
        assert_eq!(history[1].changes["slug"], "foo");
    }

    #[tokio::test]
    async fn soft_deleted_identifiers_stay_reserved() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;
        let id = app
            .create_client(
                &token,
                &json!({"firstName": "Jean", "contactIdentifiers": [phone("0611111111")]}),
            )
            .await
            .id();
        app.delete_with_token(&routes::client(id), &token).await;

        let res = app
            .post_with_token(
                routes::CLIENTS,
                &json!({"firstName": "Marie", "contactIdentifiers": [phone("0611111111")]}),
                &token,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["duplicates"][0]["clientId"], id);
    }

    #[tokio::test]
    async fn permanent_delete_removes_identifiers_and_keeps_history() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let id = app
            .create_client(
                &admin,
                &json!({
                    "firstName": "Jean",
                    "contactIdentifiers": [phone("0611111111"), phone("0622222222")],
                }),
            )
            .await
            .id();

        let res = app
            .delete_with_token(&format!("{}?permanent=true", routes::client(id)), &admin)
            .await;
        assert_eq!(res.status, 204);

        assert!(client::Entity::find_by_id(id).one(&app.db).await.unwrap().is_none());
        let left = contact_identifier::Entity::find()
            .filter(contact_identifier::Column::ClientId.eq(id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(left, 0);

        let history = app.history_rows(id).await;
        let permanent: Vec<_> = history
            .iter()
            .filter(|h| h.action == ::common::HistoryAction::DeletePermanent)
            .collect();
        assert_eq!(permanent.len(), 1);
        assert_eq!(
            permanent[0].changes["contactIdentifiers"]
                .as_array()
                .unwrap()
                .len(),
            2
        );

        // The number is free again.
        app.create_client(
            &admin,
            &json!({"firstName": "Marie", "contactIdentifiers": [phone("0611111111")]}),
        )
        .await;
    }

    #[tokio::test]
    async fn admin_can_purge_a_soft_deleted_client() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let id = app.create_client(&admin, &json!({"nickname": "x"})).await.id();
        app.delete_with_token(&routes::client(id), &admin).await;

        let res = app
            .delete_with_token(&format!("{}?permanent=true", routes::client(id)), &admin)
            .await;

        assert_eq!(res.status, 204);
        assert_eq!(app.history_count(id).await, 3);
    }

    #[tokio::test]
    async fn permanent_delete_requires_admin() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;
        let id = app.create_client(&token, &json!({"nickname": "x"})).await.id();

        let res = app
            .delete_with_token(&format!("{}?permanent=true", routes::client(id)), &token)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
        assert!(client::Entity::find_by_id(id).one(&app.db).await.unwrap().is_some());
        assert_eq!(app.history_count(id).await, 1);
    }
}

mod list {
    use super::*;

    #[tokio::test]
    async fn search_matches_names_and_numbers() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;
        let jean = app
            .create_client(
                &token,
                &json!({"firstName": "Jean", "surname": "Dupont", "contactIdentifiers": [phone("0611111111")]}),
            )
            .await
            .id();
        app.create_client(
            &token,
            &json!({"firstName": "Marie", "contactIdentifiers": [phone("0622222222")]}),
        )
        .await;

        let res = app
            .get_with_token(&format!("{}?search=DUPONT", routes::CLIENTS), &token)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["id"], jean);

        let res = app
            .get_with_token(&format!("{}?search=06%2011%2011", routes::CLIENTS), &token)
            .await;
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["id"], jean);

        let res = app.get_with_token(routes::CLIENTS, &token).await;
        assert_eq!(res.body["pagination"]["total"], 2);
    }

    #[tokio::test]
    async fn search_by_composite_id() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;
        let res = app
            .create_client(
                &token,
                &json!({"nickname": "JD", "contactIdentifiers": [phone("0611111111"), phone("0622222222")]}),
            )
            .await;
        let id = res.id();
        let composite = res.body["contactIdentifiers"][1]["compositeId"]
            .as_str()
            .unwrap()
            .to_string();
        app.create_client(&token, &json!({"nickname": "other"})).await;

        let res = app
            .get_with_token(&format!("{}?search={composite}", routes::CLIENTS), &token)
            .await;

        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["id"], id);
    }

    #[tokio::test]
    async fn soft_deleted_clients_are_hidden() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;
        let id = app.create_client(&token, &json!({"nickname": "a"})).await.id();
        app.create_client(&token, &json!({"nickname": "b"})).await;
        app.delete_with_token(&routes::client(id), &token).await;

        let res = app.get_with_token(routes::CLIENTS, &token).await;

        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["slug"], "b");
    }
}

mod visibility {
    use super::*;

    #[tokio::test]
    async fn other_users_clients_are_hidden() {
        let app = TestApp::spawn().await;
        let (_, alice) = app.create_user("alice").await;
        let (_, bob) = app.create_user("bob").await;
        let id = app.create_client(&alice, &json!({"nickname": "a"})).await.id();

        let res = app.get_with_token(&routes::client(id), &bob).await;
        assert_eq!(res.status, 404);

        let res = app
            .patch_with_token(&routes::client(id), &json!({"priority": "Low"}), &bob)
            .await;
        assert_eq!(res.status, 404);

        let res = app.get_with_token(routes::CLIENTS, &bob).await;
        assert_eq!(res.body["pagination"]["total"], 0);
    }

    #[tokio::test]
    async fn shared_category_grants_access() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let (_, alice) = app.create_user("alice").await;
        let (bob_id, bob) = app.create_user("bob").await;
        let category = app.create_category(&admin, "Lyon").await;

        let res = app
            .put_with_token(
                &routes::user_categories(bob_id),
                &json!({"categoryIds": [category]}),
                &admin,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let id = app
            .create_client(&alice, &json!({"nickname": "a", "categoryIds": [category]}))
            .await
            .id();
        app.create_client(&alice, &json!({"nickname": "b"})).await;

        let res = app.get_with_token(&routes::client(id), &bob).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["categoryIds"], json!([category]));

        let res = app.get_with_token(routes::CLIENTS, &bob).await;
        assert_eq!(res.body["pagination"]["total"], 1);

        let res = app.get_with_token(routes::CLIENTS, &admin).await;
        assert_eq!(res.body["pagination"]["total"], 2);
    }
}

mod conflict_recheck {
    use sea_orm::DbErr;
    use server::error::AppError;
    use server::services::uniqueness::duplicates_after_conflict;

    use super::*;

    fn input(number: &str) -> ::common::ContactIdentifierInput {
        ::common::ContactIdentifierInput {
            account_number: number.to_string(),
            account_type: "Phone".to_string(),
            info: None,
        }
    }

    fn cause() -> DbErr {
        DbErr::Custom("duplicate key value violates unique constraint".into())
    }

    #[tokio::test]
    async fn names_the_client_that_won_the_race() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;
        let holder = app
            .create_client(
                &token,
                &json!({"firstName": "Jean", "contactIdentifiers": [phone("0611111111")]}),
            )
            .await
            .id();

        let err =
            duplicates_after_conflict(&app.db, &[input("0611111111")], None, &cause()).await;

        match err {
            AppError::DuplicateIdentifiers { duplicates, .. } => {
                assert_eq!(duplicates.len(), 1);
                assert_eq!(duplicates[0].client_id, holder);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn still_a_conflict_when_no_holder_is_found() {
        let app = TestApp::spawn().await;

        let err =
            duplicates_after_conflict(&app.db, &[input("0699999999")], None, &cause()).await;

        match err {
            AppError::DuplicateIdentifiers { duplicates, message } => {
                assert!(duplicates.is_empty());
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
