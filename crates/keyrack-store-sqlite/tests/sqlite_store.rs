use keyrack_store_sqlite::SqliteKeyStore;
use uuid::Uuid;

use keyrack_storage::{
    CreateKeyParams, KeyFilter, KeyId, KeyKind, KeyPatch, KeyStore, ProjectId, SortDirection,
    SortField, SortSpec, StoreError, TagName,
};

fn project() -> ProjectId {
    ProjectId(Uuid::new_v4())
}

fn params(project_id: ProjectId, name: &str) -> CreateKeyParams {
    CreateKeyParams {
        project_id,
        name: name.to_string(),
        kind: KeyKind::Password,
        login: Some("admin".to_string()),
        url: Some("https://db.example.com".to_string()),
        comment: None,
        body: b"stored-body".to_vec(),
        file: None,
        whitelist: String::new(),
    }
}

#[tokio::test]
async fn create_then_get_roundtrip() {
    let s = SqliteKeyStore::open_in_memory().await.unwrap();
    let p = project();

    let created = s.create_key(&params(p, "db-password")).await.unwrap();
    let got = s.get_key(&created.id).await.unwrap();

    assert_eq!(got.name, "db-password");
    assert_eq!(got.project_id, p);
    assert_eq!(got.kind, KeyKind::Password);
    assert_eq!(got.body, b"stored-body");
    assert_eq!(got.whitelist, "");
}

#[tokio::test]
async fn get_missing_key_maps_to_notfound() {
    let s = SqliteKeyStore::open_in_memory().await.unwrap();
    let err = s.get_key(&KeyId::generate()).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound));
}

#[tokio::test]
async fn update_patches_only_given_fields() {
    let s = SqliteKeyStore::open_in_memory().await.unwrap();
    let key = s.create_key(&params(project(), "api-token")).await.unwrap();

    let patch = KeyPatch {
        login: Some(Some("service".to_string())),
        body: Some(b"rotated".to_vec()),
        ..Default::default()
    };
    let updated = s.update_key(&key.id, &patch).await.unwrap();

    assert_eq!(updated.login.as_deref(), Some("service"));
    assert_eq!(updated.body, b"rotated");
    // untouched fields survive
    assert_eq!(updated.name, "api-token");
    assert_eq!(updated.url, key.url);
}

#[tokio::test]
async fn update_can_rehome_key_to_another_project() {
    let s = SqliteKeyStore::open_in_memory().await.unwrap();
    let p1 = project();
    let p2 = project();
    let key = s.create_key(&params(p1, "moving")).await.unwrap();

    let patch = KeyPatch {
        project_id: Some(p2),
        ..Default::default()
    };
    let updated = s.update_key(&key.id, &patch).await.unwrap();
    assert_eq!(updated.project_id, p2);

    let in_p1 = s
        .list_keys(&p1, &KeyFilter::All, &SortSpec::default())
        .await
        .unwrap();
    assert!(in_p1.is_empty());
    let in_p2 = s
        .list_keys(&p2, &KeyFilter::All, &SortSpec::default())
        .await
        .unwrap();
    assert_eq!(in_p2.len(), 1);
}

#[tokio::test]
async fn delete_is_final_and_cascades_tag_links() {
    let s = SqliteKeyStore::open_in_memory().await.unwrap();
    let key = s.create_key(&params(project(), "doomed")).await.unwrap();
    let tag = s
        .find_or_create_tag(&TagName("infra".to_string()))
        .await
        .unwrap();
    s.set_key_tags(&key.id, &[tag.id]).await.unwrap();

    s.delete_key(&key.id).await.unwrap();

    assert!(matches!(
        s.get_key(&key.id).await.unwrap_err(),
        StoreError::NotFound
    ));
    // second delete reports NotFound (no soft-delete state)
    assert!(matches!(
        s.delete_key(&key.id).await.unwrap_err(),
        StoreError::NotFound
    ));
}

#[tokio::test]
async fn override_key_id_preserves_record_and_tags() {
    let s = SqliteKeyStore::open_in_memory().await.unwrap();
    let key = s.create_key(&params(project(), "migrated")).await.unwrap();
    let tag = s
        .find_or_create_tag(&TagName("legacy".to_string()))
        .await
        .unwrap();
    s.set_key_tags(&key.id, &[tag.id]).await.unwrap();

    let forced = KeyId::generate();
    s.override_key_id(&key.id, &forced).await.unwrap();

    assert!(matches!(
        s.get_key(&key.id).await.unwrap_err(),
        StoreError::NotFound
    ));
    let moved = s.get_key(&forced).await.unwrap();
    assert_eq!(moved.name, "migrated");

    let tags = s.list_key_tags(&forced).await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name.0, "legacy");
}

#[tokio::test]
async fn override_key_id_rejects_missing_source() {
    let s = SqliteKeyStore::open_in_memory().await.unwrap();
    let err = s
        .override_key_id(&KeyId::generate(), &KeyId::generate())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound));
}

#[tokio::test]
async fn project_scoping_isolation() {
    let s = SqliteKeyStore::open_in_memory().await.unwrap();
    let p1 = project();
    let p2 = project();

    s.create_key(&params(p1, "shared-name")).await.unwrap();
    s.create_key(&params(p2, "shared-name")).await.unwrap();

    let listed = s
        .list_keys(&p1, &KeyFilter::All, &SortSpec::default())
        .await
        .unwrap();

    // p2's record must never leak into p1's listing
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].project_id, p1);
}

#[tokio::test]
async fn list_sorts_by_name_with_id_tiebreak() {
    let s = SqliteKeyStore::open_in_memory().await.unwrap();
    let p = project();

    s.create_key(&params(p, "zeta")).await.unwrap();
    let dup_a = s.create_key(&params(p, "alpha")).await.unwrap();
    let dup_b = s.create_key(&params(p, "alpha")).await.unwrap();

    let listed = s
        .list_keys(&p, &KeyFilter::All, &SortSpec::default())
        .await
        .unwrap();

    let names: Vec<_> = listed.iter().map(|k| k.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "alpha", "zeta"]);
    // ties broken by id ascending
    assert_eq!(listed[0].id, dup_a.id.min(dup_b.id));
    assert_eq!(listed[1].id, dup_a.id.max(dup_b.id));
}

#[tokio::test]
async fn list_honors_descending_sort_override() {
    let s = SqliteKeyStore::open_in_memory().await.unwrap();
    let p = project();

    s.create_key(&params(p, "aaa")).await.unwrap();
    s.create_key(&params(p, "bbb")).await.unwrap();

    let listed = s
        .list_keys(
            &p,
            &KeyFilter::All,
            &SortSpec {
                field: SortField::Name,
                direction: SortDirection::Desc,
            },
        )
        .await
        .unwrap();

    let names: Vec<_> = listed.iter().map(|k| k.name.as_str()).collect();
    assert_eq!(names, vec!["bbb", "aaa"]);
}

#[tokio::test]
async fn list_filters_by_exact_name_and_url() {
    let s = SqliteKeyStore::open_in_memory().await.unwrap();
    let p = project();

    s.create_key(&params(p, "db-password")).await.unwrap();
    s.create_key(&params(p, "db-password-old")).await.unwrap();

    let by_name = s
        .list_keys(
            &p,
            &KeyFilter::Name("db-password".to_string()),
            &SortSpec::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_name.len(), 1);

    let by_url = s
        .list_keys(
            &p,
            &KeyFilter::Url("https://db.example.com".to_string()),
            &SortSpec::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_url.len(), 2);

    let no_match = s
        .list_keys(
            &p,
            &KeyFilter::Url("https://other.example.com".to_string()),
            &SortSpec::default(),
        )
        .await
        .unwrap();
    assert!(no_match.is_empty());
}

#[tokio::test]
async fn tag_find_or_create_reuses_existing_row() {
    let s = SqliteKeyStore::open_in_memory().await.unwrap();

    let first = s
        .find_or_create_tag(&TagName("prod".to_string()))
        .await
        .unwrap();
    let second = s
        .find_or_create_tag(&TagName("prod".to_string()))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);

    // case-sensitive: "Prod" is a different tag
    let other = s
        .find_or_create_tag(&TagName("Prod".to_string()))
        .await
        .unwrap();
    assert_ne!(first.id, other.id);
}

#[tokio::test]
async fn set_key_tags_replaces_previous_associations() {
    let s = SqliteKeyStore::open_in_memory().await.unwrap();
    let key = s.create_key(&params(project(), "tagged")).await.unwrap();

    let a = s.find_or_create_tag(&TagName("a".to_string())).await.unwrap();
    let b = s.find_or_create_tag(&TagName("b".to_string())).await.unwrap();
    let c = s.find_or_create_tag(&TagName("c".to_string())).await.unwrap();

    s.set_key_tags(&key.id, &[a.id, b.id]).await.unwrap();
    s.set_key_tags(&key.id, &[c.id]).await.unwrap();

    let tags = s.list_key_tags(&key.id).await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name.0, "c");
}

#[tokio::test]
async fn list_by_tag_is_project_scoped() {
    let s = SqliteKeyStore::open_in_memory().await.unwrap();
    let p1 = project();
    let p2 = project();

    let k1 = s.create_key(&params(p1, "in-p1")).await.unwrap();
    let k2 = s.create_key(&params(p2, "in-p2")).await.unwrap();
    let tag = s
        .find_or_create_tag(&TagName("shared".to_string()))
        .await
        .unwrap();
    s.set_key_tags(&k1.id, &[tag.id]).await.unwrap();
    s.set_key_tags(&k2.id, &[tag.id]).await.unwrap();

    let listed = s
        .list_keys(&p1, &KeyFilter::Tag(tag.id), &SortSpec::default())
        .await
        .unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "in-p1");
}

#[tokio::test]
async fn find_key_by_name_matches_import_semantics() {
    let s = SqliteKeyStore::open_in_memory().await.unwrap();
    let p = project();

    assert!(s.find_key_by_name("absent").await.unwrap().is_none());

    let created = s.create_key(&params(p, "present")).await.unwrap();
    let found = s.find_key_by_name("present").await.unwrap().unwrap();
    assert_eq!(found.id, created.id);
}

#[tokio::test]
async fn unicode_names_roundtrip() {
    let s = SqliteKeyStore::open_in_memory().await.unwrap();
    let p = project();

    let created = s.create_key(&params(p, "🔑-секрет")).await.unwrap();
    let found = s.find_key_by_name("🔑-секрет").await.unwrap().unwrap();
    assert_eq!(found.id, created.id);

    let tag = s
        .find_or_create_tag(&TagName("生产".to_string()))
        .await
        .unwrap();
    assert_eq!(tag.name.0, "生产");
}
