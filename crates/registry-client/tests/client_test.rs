//! Integration tests for the registry client against the in-memory registry.

use std::fs;
use std::sync::Arc;

use registry_client::{
    ClientConfig, FsBlobStore, FsStoreConfig, Query, RawResponse, RegistryClient, RegistryError,
};
use registry_core::{
    Dataset, Entity, EntityKind, Model, ObjectProvider, Reference, ReferenceSet, Workflow,
};
use registry_test::{
    sample_dataset, sample_model, MemoryBlobStore, MockRegistry, RequestMethod,
};
use serde_json::{json, Value};
use tempfile::TempDir;

const DOMAIN: &str = "http://registry.test";

fn setup() -> (RegistryClient, Arc<MockRegistry>) {
    let registry = Arc::new(MockRegistry::new());
    let client = RegistryClient::with_transport(ClientConfig::new(DOMAIN), registry.clone());
    (client, registry)
}

fn setup_with_store() -> (RegistryClient, Arc<MockRegistry>, Arc<MemoryBlobStore>) {
    let (client, registry) = setup();
    let store = Arc::new(MemoryBlobStore::default());
    (client.with_store(store.clone()), registry, store)
}

// ============================================================================
// Insert
// ============================================================================

#[tokio::test]
async fn test_insert_dataset_returns_server_id() {
    let (client, registry) = setup();
    registry.queue_id("abc123");

    let mut dataset = Dataset::new("ns", "n", "v1").with_location(Reference::http("http://x/y"));
    let id = client.insert(&mut dataset).await.unwrap();

    assert_eq!(id, "abc123");
    assert_eq!(dataset.id(), Some("abc123"));

    let body = registry.last_insert().unwrap();
    assert_eq!(body["location"], json!({"http": {"url": "http://x/y"}}));
    assert_eq!(body["namespace"], "ns");

    let posts = registry.requests_for(RequestMethod::Post, EntityKind::Dataset);
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].url, format!("{DOMAIN}/api/v1/data"));
}

#[tokio::test]
async fn test_insert_without_location_touches_nothing() {
    let (client, registry, store) = setup_with_store();

    let mut model = Model::new("ns", "m", "v1").with_source(Reference::local("/tmp/train.csv"));
    let err = client.insert(&mut model).await.unwrap_err();

    assert!(matches!(err, RegistryError::MissingField { ref field, .. } if field == "location"));
    assert_eq!(err.to_string(), "location of <Model ns/m:v1> not provided");
    assert_eq!(registry.request_count(), 0);
    assert_eq!(store.upload_count(), 0);
    assert!(model.id().is_none());
}

#[tokio::test]
async fn test_insert_uploads_each_local_path_once() {
    let dir = TempDir::new().unwrap();
    let train = dir.path().join("train.csv");
    let test = dir.path().join("test.csv");
    fs::write(&train, "smiles,label\nCCO,1\n").unwrap();
    fs::write(&test, "smiles,label\nCCN,0\n").unwrap();

    let (client, registry, store) = setup_with_store();
    let mut dataset = Dataset::new("ns", "split", "v1")
        .with_location(ReferenceSet::map([
            ("train.csv", Reference::local(&train)),
            ("test.csv", Reference::local(&test)),
        ]))
        .with_resources(ReferenceSet::list([
            Reference::local(&train),
            Reference::http("https://x/readme.md"),
        ]));

    client.insert(&mut dataset).await.unwrap();
    assert_eq!(store.upload_count(), 2);

    let body = registry.last_insert().unwrap();
    let uploaded = &body["location"]["dict"]["train.csv"]["s3"];
    assert_eq!(uploaded["bucket"], "test-bucket");
    assert_eq!(body["resources"]["list"][0]["s3"], *uploaded);
    assert!(dataset
        .references()
        .iter()
        .all(|(_, r)| r.local_path().is_none()));

    // Second insert of the resolved record uploads nothing.
    client.insert(&mut dataset).await.unwrap();
    assert_eq!(store.upload_count(), 2);
}

#[tokio::test]
async fn test_insert_stored_parameters_upload() {
    let dir = TempDir::new().unwrap();
    let params = dir.path().join("params.yaml");
    fs::write(&params, "lr: 0.01\n").unwrap();

    let (client, registry, store) = setup_with_store();
    let mut model = Model::new("ns", "m", "v1")
        .with_location(Reference::http("https://x/model.pt"))
        .with_parameters(registry_core::Document::local(&params));

    client.insert(&mut model).await.unwrap();
    assert_eq!(store.upload_count(), 1);
    assert!(registry.last_insert().unwrap()["parameters"]["s3"]["key"]
        .as_str()
        .unwrap()
        .ends_with("params.yaml"));
}

#[tokio::test]
async fn test_insert_local_with_fs_store() {
    let dir = TempDir::new().unwrap();
    let weights = dir.path().join("weights");
    fs::create_dir_all(&weights).unwrap();
    fs::write(weights.join("model.pt"), [0u8, 1, 2]).unwrap();

    let store = FsBlobStore::new(
        FsStoreConfig::new(dir.path().join("blobs")).with_provider(ObjectProvider::Oss),
    )
    .unwrap();
    let (client, registry) = setup();
    let client = client.with_store(Arc::new(store));

    let mut model = Model::new("ns", "m", "v1").with_location(Reference::local(&weights));
    client.insert(&mut model).await.unwrap();

    let body = registry.last_insert().unwrap();
    let location = &body["location"]["oss"];
    assert!(location["endpoint"].as_str().unwrap().starts_with("file://"));
    assert!(location["key"].as_str().unwrap().ends_with("/weights"));
}

#[tokio::test]
async fn test_insert_http_error_leaves_id_unset() {
    let (client, registry) = setup();
    registry.fail_next_http(503, "unavailable");

    let mut dataset = sample_dataset();
    let err = client.insert(&mut dataset).await.unwrap_err();

    assert!(matches!(err, RegistryError::HttpError { status: 503, .. }));
    assert!(dataset.id().is_none());
}

#[tokio::test]
async fn test_insert_server_code_leaves_id_unset() {
    let (client, registry) = setup();
    registry.fail_next_code(1, "version already exists");

    let mut workflow = Workflow::new("ns", "wf", "v1");
    let err = client.insert(&mut workflow).await.unwrap_err();

    assert!(matches!(
        err,
        RegistryError::ServerError { code: 1, ref message } if message == "version already exists"
    ));
    assert!(workflow.id().is_none());
}

#[tokio::test]
async fn test_insert_response_without_id() {
    let (client, registry) = setup();
    registry.respond_next(RawResponse {
        status: 200,
        body: json!({"code": 0, "data": {}}).to_string(),
    });

    let mut workflow = Workflow::new("ns", "wf", "v1");
    let err = client.insert(&mut workflow).await.unwrap_err();
    assert!(matches!(err, RegistryError::MalformedResponse { .. }));
}

// ============================================================================
// Query
// ============================================================================

#[tokio::test]
async fn test_query_skips_malformed_record() {
    let (client, registry) = setup();
    registry.seed(
        EntityKind::Dataset,
        json!({"namespace": "ns", "name": "ok", "version": "v1", "location": {"http": {"url": "http://x"}}}),
    );
    registry.seed(EntityKind::Dataset, json!({"namespace": "ns", "version": "v1"}));

    let found: Vec<Dataset> = client.query(&Query::new()).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].meta.name, "ok");
}

#[tokio::test]
async fn test_query_sends_filters() {
    let (client, registry) = setup();
    let query = Query::new().namespace("test_*").name("bace").version("latest");
    let found: Vec<Model> = client.query(&query).await.unwrap();
    assert!(found.is_empty());

    let gets = registry.requests_for(RequestMethod::Get, EntityKind::Model);
    assert_eq!(
        gets[0].params,
        vec![
            ("namespace".to_string(), "test_*".to_string()),
            ("name".to_string(), "bace".to_string()),
            ("version".to_string(), "latest".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_query_latest_version() {
    let (client, registry) = setup();
    for version in ["v1.0.0", "v1.10.0", "v1.2.0"] {
        registry.seed(
            EntityKind::Workflow,
            json!({"namespace": "test_ns", "name": "wf", "version": version}),
        );
    }

    let found: Vec<Workflow> = client
        .query(&Query::new().namespace("test_*").version("latest"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].meta.version, "v1.10.0");
}

#[tokio::test]
async fn test_query_failure_is_not_empty_result() {
    let (client, registry) = setup();
    registry.fail_next_code(5, "database down");
    let result: Result<Vec<Workflow>, _> = client.query(&Query::new()).await;
    assert!(matches!(result, Err(RegistryError::ServerError { code: 5, .. })));

    registry.respond_next(RawResponse {
        status: 200,
        body: json!({"code": 0, "data": {"workflows": null}}).to_string(),
    });
    let result: Vec<Workflow> = client.query(&Query::new()).await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_query_absent_location_markers() {
    let (client, registry) = setup();
    registry.seed(
        EntityKind::Dataset,
        json!({"namespace": "ns", "name": "a", "version": "v1", "location": ""}),
    );
    registry.seed(
        EntityKind::Dataset,
        json!({"namespace": "ns", "name": "b", "version": "v1", "location": "null"}),
    );

    let found: Vec<Dataset> = client.query(&Query::new()).await.unwrap();
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|d| d.location.is_none()));
}

#[tokio::test]
async fn test_get_by_id() {
    let (client, registry) = setup();
    registry.queue_id("d7");
    let mut dataset = sample_dataset();
    client.insert(&mut dataset).await.unwrap();

    let found: Dataset = client.get("d7").await.unwrap().unwrap();
    assert_eq!(found, dataset);
    assert!(client.get::<Dataset>("d8").await.unwrap().is_none());
}

// ============================================================================
// Link hydration
// ============================================================================

#[tokio::test]
async fn test_model_link_triggers_one_query() {
    let (client, registry) = setup();
    registry.seed(
        EntityKind::Model,
        json!({"namespace": "ns", "name": "gnn", "version": "v1", "id": "m1",
               "location": {"http": {"url": "http://x/m.pt"}}}),
    );

    let mut dataset = Dataset::new("ns", "preds", "v1")
        .with_location(Reference::http("http://x/preds.csv"))
        .with_source(ReferenceSet::map([("a", Reference::model("m1"))]));
    client.insert(&mut dataset).await.unwrap();
    assert_eq!(
        registry.last_insert().unwrap()["source"],
        json!({"dict": {"a": {"model": {"id": "m1"}}}})
    );

    let found: Vec<Dataset> = client.query(&Query::new()).await.unwrap();
    let model_queries = registry.requests_for(RequestMethod::Get, EntityKind::Model);
    assert_eq!(model_queries.len(), 1);
    assert_eq!(model_queries[0].params, vec![("id".to_string(), "m1".to_string())]);

    let Some(ReferenceSet::Map(source)) = &found[0].source else {
        panic!("expected map source");
    };
    let Reference::Model(link) = &source["a"] else {
        panic!("expected model link");
    };
    assert_eq!(link.record().unwrap().meta.name, "gnn");
}

#[tokio::test]
async fn test_repeated_links_are_memoized() {
    let (client, registry) = setup();
    registry.seed(EntityKind::Dataset, json!({"namespace": "ns", "name": "raw", "version": "v1", "id": "d1"}));
    for name in ["m-a", "m-b"] {
        registry.seed(
            EntityKind::Model,
            json!({"namespace": "ns", "name": name, "version": "v1",
                   "source": {"list": [{"dataset": {"id": "d1"}}, {"dataset": {"id": "d1"}}]}}),
        );
    }

    let found: Vec<Model> = client.query(&Query::new()).await.unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(registry.requests_for(RequestMethod::Get, EntityKind::Dataset).len(), 1);
    for model in &found {
        for (_, reference) in model.references() {
            let Reference::Dataset(link) = reference else {
                panic!("expected dataset link");
            };
            assert!(link.is_resolved());
        }
    }
}

#[tokio::test]
async fn test_link_cycle_terminates() {
    let (client, registry) = setup();
    registry.seed(
        EntityKind::Dataset,
        json!({"namespace": "ns", "name": "self", "version": "v1", "id": "d1",
               "source": {"dataset": {"id": "d1"}}}),
    );

    let found: Vec<Dataset> = client.query(&Query::by_id("d1")).await.unwrap();
    assert_eq!(found.len(), 1);
    // Top-level fetch plus one fetch of the link target; the nested
    // self-reference is left unresolved.
    assert_eq!(registry.requests_for(RequestMethod::Get, EntityKind::Dataset).len(), 2);

    let Some(ReferenceSet::Single(Reference::Dataset(outer))) = &found[0].source else {
        panic!("expected dataset link");
    };
    let inner = outer.record().unwrap();
    let Some(ReferenceSet::Single(Reference::Dataset(nested))) = &inner.source else {
        panic!("expected nested dataset link");
    };
    assert!(!nested.is_resolved());
}

#[tokio::test]
async fn test_mutual_links_terminate() {
    let (client, registry) = setup();
    registry.seed(
        EntityKind::Model,
        json!({"namespace": "ns", "name": "m", "version": "v1", "id": "m1",
               "source": {"dataset": {"id": "d1"}}}),
    );
    registry.seed(
        EntityKind::Dataset,
        json!({"namespace": "ns", "name": "d", "version": "v1", "id": "d1",
               "source": {"model": {"id": "m1"}}}),
    );

    let found: Vec<Model> = client.query(&Query::by_id("m1")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(registry.requests_for(RequestMethod::Get, EntityKind::Dataset).len(), 1);
    assert_eq!(registry.requests_for(RequestMethod::Get, EntityKind::Model).len(), 2);
}

#[tokio::test]
async fn test_link_depth_zero_skips_hydration() {
    let registry = Arc::new(MockRegistry::new());
    let client = RegistryClient::with_transport(
        ClientConfig::new(DOMAIN).with_max_link_depth(0),
        registry.clone(),
    );
    registry.seed(EntityKind::Model, sample_model("d1").to_wire().unwrap());

    let found: Vec<Model> = client.query(&Query::new()).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(registry.request_count(), 1);
}

#[tokio::test]
async fn test_depth_limited_record_not_reused_for_shallower_link() {
    let registry = Arc::new(MockRegistry::new());
    let client = RegistryClient::with_transport(
        ClientConfig::new(DOMAIN).with_max_link_depth(2),
        registry.clone(),
    );
    for (id, source) in [
        ("d0", json!({"dict": {"a": {"dataset": {"id": "d1"}}, "b": {"dataset": {"id": "d2"}}}})),
        ("d1", json!({"dataset": {"id": "d2"}})),
        ("d2", json!({"dataset": {"id": "d3"}})),
        ("d3", Value::Null),
    ] {
        registry.seed(
            EntityKind::Dataset,
            json!({"namespace": "ns", "name": id, "version": "v1", "id": id, "source": source}),
        );
    }

    let found: Vec<Dataset> = client.query(&Query::by_id("d0")).await.unwrap();
    let Some(ReferenceSet::Map(source)) = &found[0].source else {
        panic!("expected map source");
    };

    // Reached through d1, d2 sits at the depth limit and its own link is cut.
    let Reference::Dataset(via_d1) = &source["a"] else {
        panic!("expected dataset link");
    };
    let d1 = via_d1.record().unwrap();
    let Some(ReferenceSet::Single(Reference::Dataset(d1_to_d2))) = &d1.source else {
        panic!("expected dataset link");
    };
    let Some(ReferenceSet::Single(Reference::Dataset(cut))) = &d1_to_d2.record().unwrap().source
    else {
        panic!("expected dataset link");
    };
    assert!(!cut.is_resolved());

    // Linked directly from d0, d2 is expanded one level further.
    let Reference::Dataset(direct) = &source["b"] else {
        panic!("expected dataset link");
    };
    let Some(ReferenceSet::Single(Reference::Dataset(d2_to_d3))) = &direct.record().unwrap().source
    else {
        panic!("expected dataset link");
    };
    assert_eq!(d2_to_d3.record().map(|d| d.meta.name.as_str()), Some("d3"));
}

#[tokio::test]
async fn test_failed_link_query_leaves_link_unresolved() {
    let (client, registry) = setup();
    let model = sample_model("d1").to_wire().unwrap();
    registry.respond_next(RawResponse {
        status: 200,
        body: json!({"code": 0, "data": {"models": [model]}}).to_string(),
    });
    registry.fail_next_http(500, "boom");

    let found: Vec<Model> = client.query(&Query::new()).await.unwrap();
    assert_eq!(found.len(), 1);
    let Some(ReferenceSet::Map(source)) = &found[0].source else {
        panic!("expected map source");
    };
    let Reference::Dataset(link) = &source["train"] else {
        panic!("expected dataset link");
    };
    assert_eq!(link.id(), "d1");
    assert!(!link.is_resolved());
}

// ============================================================================
// Downloads
// ============================================================================

#[tokio::test]
async fn test_download_collects_failures() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(MockRegistry::new());
    let store = Arc::new(MemoryBlobStore::default());
    let client = RegistryClient::with_transport(
        ClientConfig::new(DOMAIN).with_download_dir(dir.path()),
        registry.clone(),
    )
    .with_store(store.clone());

    registry.serve("https://files.test/sets/train.csv", "a,b\n");
    let object = store.put("blobs/weights.bin", vec![9u8; 8]);

    let dataset = Dataset::new("ns", "d", "v1")
        .with_location(ReferenceSet::list([
            Reference::http("https://files.test/sets/train.csv"),
            Reference::http("https://files.test/missing.csv"),
            Reference::s3(object),
        ]))
        .with_code(Reference::git("https://git.test/repo.git", "main"))
        .with_source(Reference::model("m1"));

    let report = client.download(&dataset).await;

    assert_eq!(report.downloaded.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.skipped.len(), 2);
    assert!(!report.is_complete());
    assert_eq!(
        fs::read_to_string(dir.path().join("files.test/sets/train.csv")).unwrap(),
        "a,b\n"
    );
    assert_eq!(
        fs::read(dir.path().join("test-bucket/blobs/weights.bin")).unwrap(),
        vec![9u8; 8]
    );
}

#[tokio::test]
async fn test_query_with_download_survives_failures() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(MockRegistry::new());
    let client = RegistryClient::with_transport(
        ClientConfig::new(DOMAIN).with_download_dir(dir.path()),
        registry.clone(),
    );
    registry.seed(EntityKind::Dataset, sample_dataset().to_wire().unwrap());

    let found: Vec<Dataset> = client
        .query(&Query::new().with_download())
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(
        registry
            .requests()
            .iter()
            .filter(|r| r.method == RequestMethod::Fetch)
            .count(),
        1
    );
}
