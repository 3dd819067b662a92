//! End-to-end tests for rpcmap-core over temporary directory trees.

use crate::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

const ORDERS_PROTO: &str = r#"
syntax = "proto3";
package acme.Orders;

service Orders {
  rpc Create (CreateRequest) returns (CreateReply);
  rpc Get (GetRequest) returns (GetReply);
}
"#;

fn write_file(file: &Path, content: &str) {
    fs::create_dir_all(file.parent().unwrap()).unwrap();
    fs::write(file, content).unwrap();
}

fn setup_temp_project() -> PathBuf {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir()
        .join("rpcmap_tests")
        .join(format!("{}_{}", timestamp, id));

    if dir.exists() {
        fs::remove_dir_all(&dir).ok();
    }
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn config_for(root: &Path) -> ScanConfig {
    ScanConfig {
        roots: vec![root.to_path_buf()],
        ..ScanConfig::default()
    }
}

fn analyze(root: &Path) -> ScanResult {
    Rpcmap::new(config_for(root)).analyze().unwrap()
}

fn method_set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn billing_source(call: &str) -> String {
    format!(
        "using Acme.Orders;\n\nnamespace Billing\n{{\n    public class Charger\n    {{\n        \
         private readonly OrdersClient client;\n\n        public async Task Run(CreateRequest req)\n        \
         {{\n            {}\n        }}\n    }}\n}}\n",
        call
    )
}

#[test]
fn test_plain_call_through_client_field() {
    let root = setup_temp_project();
    write_file(&root.join("protos/orders.proto"), ORDERS_PROTO);
    write_file(&root.join("Billing/Charger.cs"), &billing_source("client.Create();"));

    let result = analyze(&root);

    assert_eq!(result.graph.links.len(), 1);
    assert_eq!(
        result.graph.links.methods("Billing", "Orders"),
        Some(&method_set(&[".Create"]))
    );
    let services: Vec<&str> = result.graph.services.iter().map(String::as_str).collect();
    assert_eq!(services, vec!["Billing", "Orders"]);
}

#[test]
fn test_call_through_assigned_client() {
    let root = setup_temp_project();
    write_file(&root.join("protos/orders.proto"), ORDERS_PROTO);
    write_file(
        &root.join("Billing/C.cs"),
        "namespace Billing { class C { void M() { var client = OrdersClient; client.Create(); } } }",
    );

    let result = analyze(&root);

    assert_eq!(result.stats.sources.files_with_calls, 1);
    assert_eq!(result.graph.links.len(), 1);
    assert_eq!(
        result.graph.links.methods("Billing", "Orders"),
        Some(&method_set(&[".Create"]))
    );
}

#[test]
fn test_call_through_constructed_client() {
    let root = setup_temp_project();
    write_file(&root.join("protos/orders.proto"), ORDERS_PROTO);
    write_file(
        &root.join("Billing/Charger.cs"),
        "namespace Billing.Api\n{\n    public class Charger\n    {\n        \
         public async Task Run(GrpcChannel channel, GetRequest req)\n        {\n            \
         var orders = new Acme.Orders.OrdersClient(channel);\n            \
         var reply = await orders.GetAsync(req);\n        }\n    }\n}\n",
    );

    let result = analyze(&root);

    assert_eq!(
        result.graph.links.methods("Billing", "Orders"),
        Some(&method_set(&[".Get"]))
    );
}

// Async variant with arguments maps to the same method
#[test]
fn test_async_call_with_arguments() {
    let root = setup_temp_project();
    write_file(&root.join("protos/orders.proto"), ORDERS_PROTO);
    write_file(
        &root.join("Billing/Charger.cs"),
        &billing_source("var reply = await client.CreateAsync(req);"),
    );

    let result = analyze(&root);

    assert_eq!(
        result.graph.links.methods("Billing", "Orders"),
        Some(&method_set(&[".Create"]))
    );
}

// Test projects are pruned before they are ever read
#[test]
fn test_test_project_excluded() {
    let root = setup_temp_project();
    write_file(&root.join("protos/orders.proto"), ORDERS_PROTO);
    write_file(
        &root.join("Foo.Tests/ChargerTests.cs"),
        "namespace Foo { class T { OrdersClient client; void M() { client.Get(); } } }",
    );

    let config = config_for(&root);
    let located: Vec<PathBuf> =
        locate(&root, &config.source_extension, &config.exclude).collect();
    assert!(located.is_empty(), "Foo.Tests must be pruned: {:?}", located);

    let result = analyze(&root);
    assert!(result.graph.links.is_empty());
    assert!(result.graph.services.is_empty());
    assert_eq!(result.stats.sources.files_scanned, 0);
}

// The same method called from two files counts once per edge
#[test]
fn test_method_deduplicated_across_files() {
    let root = setup_temp_project();
    write_file(&root.join("protos/orders.proto"), ORDERS_PROTO);
    write_file(&root.join("Billing/Charger.cs"), &billing_source("client.Create();"));
    write_file(&root.join("Billing/Refunder.cs"), &billing_source("client.Create();"));

    let result = analyze(&root);

    assert_eq!(result.stats.sources.files_scanned, 2);
    assert_eq!(result.stats.sources.link_records, 2);
    assert_eq!(result.graph.links.weight("Billing", "Orders"), 1);
}

#[test]
fn test_file_without_clients_yields_no_links() {
    let root = setup_temp_project();
    write_file(&root.join("protos/orders.proto"), ORDERS_PROTO);
    write_file(
        &root.join("Billing/Plain.cs"),
        "namespace Billing { class Plain { void Run() { other.Create(); } } }",
    );

    let result = analyze(&root);
    assert_eq!(result.stats.sources.files_scanned, 1);
    assert_eq!(result.stats.sources.files_with_calls, 0);
    assert!(result.graph.links.is_empty());
}

#[test]
fn test_catalog_counts_every_declared_method() {
    let root = setup_temp_project();
    write_file(&root.join("protos/orders.proto"), ORDERS_PROTO);
    write_file(
        &root.join("protos/billing.proto"),
        "package acme.Billing;\nservice Billing { rpc Charge (A) returns (B); }\n\
         service Refunds { rpc Issue (A) returns (B); rpc Void (A) returns (B); }\n",
    );
    write_file(&root.join("protos/common.proto"), "package acme.Common;\nmessage Money {}\n");

    let (catalog, stats) = Rpcmap::new(config_for(&root)).build_catalog();

    assert_eq!(catalog.len(), 5);
    assert_eq!(stats.files_parsed, 3);
    assert_eq!(stats.files_failed, 0);
}

#[test]
fn test_malformed_schema_is_skipped() {
    let root = setup_temp_project();
    write_file(&root.join("protos/orders.proto"), ORDERS_PROTO);
    write_file(
        &root.join("protos/broken.proto"),
        "package acme.Broken;\nservice Broken {\n  rpc Oops (A) returns (B);\n",
    );
    write_file(&root.join("Billing/Charger.cs"), &billing_source("client.Get();"));

    let result = analyze(&root);

    assert_eq!(result.stats.schema.files_failed, 1);
    assert_eq!(result.stats.schema.methods, 2);
    assert_eq!(result.graph.links.weight("Billing", "Orders"), 1);
}

#[test]
fn test_single_segment_package_drops_records() {
    let root = setup_temp_project();
    write_file(
        &root.join("protos/orders.proto"),
        "package orders;\nservice Orders { rpc Create (A) returns (B); }\n",
    );
    write_file(&root.join("Billing/Charger.cs"), &billing_source("client.Create();"));

    let result = analyze(&root);

    assert_eq!(result.stats.sources.dropped_records, 1);
    assert_eq!(result.stats.sources.link_records, 0);
    assert!(result.graph.links.is_empty());
}

#[test]
fn test_missing_namespace_drops_records() {
    let root = setup_temp_project();
    write_file(&root.join("protos/orders.proto"), ORDERS_PROTO);
    write_file(
        &root.join("Scripts/Tool.cs"),
        "class Tool { OrdersClient client; void M() { client.Create(); } }",
    );

    let result = analyze(&root);

    assert_eq!(result.stats.sources.dropped_records, 1);
    assert_eq!(result.stats.sources.files_with_calls, 0);
    assert!(result.graph.services.is_empty());
}

#[test]
fn test_missing_root_is_not_fatal() {
    let root = setup_temp_project();
    write_file(&root.join("protos/orders.proto"), ORDERS_PROTO);
    write_file(&root.join("Billing/Charger.cs"), &billing_source("client.Create();"));

    let config = ScanConfig {
        roots: vec![root.join("does-not-exist"), root.clone()],
        ..ScanConfig::default()
    };
    let result = Rpcmap::new(config).analyze().unwrap();
    assert_eq!(result.graph.links.weight("Billing", "Orders"), 1);
}

#[test]
fn test_multiple_roots_share_one_catalog() {
    let protos = setup_temp_project();
    let server = setup_temp_project();
    write_file(&protos.join("orders.proto"), ORDERS_PROTO);
    write_file(&server.join("Billing/Charger.cs"), &billing_source("client.Get();"));

    let config = ScanConfig {
        roots: vec![protos, server],
        ..ScanConfig::default()
    };
    let result = Rpcmap::new(config).analyze().unwrap();
    assert_eq!(
        result.graph.links.methods("Billing", "Orders"),
        Some(&method_set(&[".Get"]))
    );
}

#[test]
fn test_worker_count_does_not_change_result() {
    let root = setup_temp_project();
    write_file(&root.join("protos/orders.proto"), ORDERS_PROTO);
    for i in 0..40 {
        let call = if i % 2 == 0 { "client.Create();" } else { "client.GetAsync(req);" };
        let source = billing_source(call).replace("namespace Billing", &format!("namespace Svc{}.Api", i % 5));
        write_file(&root.join(format!("Svc{}/File{}.cs", i % 5, i)), &source);
    }

    let single = Rpcmap::new(config_for(&root)).with_workers(1).analyze().unwrap();
    let pooled = Rpcmap::new(config_for(&root)).with_workers(10).analyze().unwrap();

    assert_eq!(single.graph, pooled.graph);
    assert_eq!(single.stats.sources.link_records, 40);
    assert_eq!(pooled.graph.links.len(), 5);
    assert_eq!(pooled.graph.links.weight("Svc0", "Orders"), 2);
}

#[test]
fn test_rerun_renders_identical_output() {
    let root = setup_temp_project();
    write_file(&root.join("protos/orders.proto"), ORDERS_PROTO);
    write_file(
        &root.join("protos/billing.proto"),
        "package acme.Billing;\nservice Billing { rpc Charge (A) returns (B); }\n",
    );
    write_file(&root.join("Billing/Charger.cs"), &billing_source("client.Create();"));
    write_file(
        &root.join("Shipping/Dispatcher.cs"),
        "namespace Shipping.Core { class D { BillingClient billing; OrdersClient orders; \
         void M() { billing.ChargeAsync(x); orders.Get(); } } }",
    );

    let first = analyze(&root);
    let second = analyze(&root);

    assert_eq!(first.graph, second.graph);
    for mode in [OutputMode::Draw, OutputMode::Table, OutputMode::Json] {
        assert_eq!(
            render(mode, &first, DEFAULT_RADIUS),
            render(mode, &second, DEFAULT_RADIUS)
        );
    }
    assert_eq!(first.graph.links.len(), 3);
}

#[test]
fn test_custom_schema_parser() {
    struct Fixed;

    impl SchemaParser for Fixed {
        fn parse(&self, _path: &Path) -> RpcmapResult<Vec<SchemaFile>> {
            Ok(vec![SchemaFile {
                package: "acme.Ledger".to_string(),
                services: vec![ServiceDecl {
                    name: "Ledger".to_string(),
                    methods: vec![MethodDecl {
                        name: "Post".to_string(),
                    }],
                }],
            }])
        }
    }

    let root = setup_temp_project();
    write_file(&root.join("schema/ledger.proto"), "ignored by the fake parser");
    write_file(
        &root.join("Billing/Poster.cs"),
        "namespace Billing { class P { LedgerClient ledger; void M() { ledger.PostAsync(e); } } }",
    );

    let result = Rpcmap::new(config_for(&root))
        .with_parser(Fixed)
        .analyze()
        .unwrap();
    assert_eq!(result.graph.links.weight("Billing", "Ledger"), 1);
}

#[test]
fn test_no_roots_is_fatal() {
    let err = Rpcmap::new(ScanConfig::default()).analyze().unwrap_err();
    assert!(!err.is_recoverable());
}
