//! Lifecycle scenarios for aws_fsx_openzfs_volume

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

mod support;

use regex::Regex;
use std::collections::HashMap;
use tfplug::acctest::{
    capture_resource_id, check_exists, check_no_resource_attr, check_not_recreated,
    check_recreated, check_resource_attr, check_resource_attr_ptr, check_resource_attr_set,
    check_type_set_elem_nested_attrs, compose, compose_config, init_logging, match_resource_attr,
    random_with_prefix, Body, Capture, Config, Expr, TestOutcome, TestStep, RESOURCE_PREFIX,
};

use fsx::api::Volume;
use support::Harness;

const TYPE: &str = "aws_fsx_openzfs_volume";
const ADDR: &str = "aws_fsx_openzfs_volume.test";

fn base_config() -> Config {
    Config::new().variable("root_volume_id")
}

fn volume(name: &str) -> Body {
    Body::new()
        .attr("name", name)
        .attr("parent_volume_id", Expr::var("root_volume_id"))
}

fn single(body: Body) -> Config {
    compose_config([base_config(), Config::new().resource(TYPE, "test", body)])
}

fn config_basic(name: &str) -> Config {
    single(volume(name))
}

fn config_parent(name: &str, name2: &str) -> Config {
    compose_config([
        base_config(),
        Config::new()
            .resource(TYPE, "test", volume(name))
            .resource(
                TYPE,
                "test2",
                Body::new()
                    .attr("name", name2)
                    .attr("parent_volume_id", Expr::reference(ADDR, "id")),
            ),
    ])
}

fn config_tags(name: &str, tags: &[(&str, &str)]) -> Config {
    single(volume(name).attr("tags", Expr::map(tags.iter().copied())))
}

fn config_copy_tags(name: &str, copy: bool) -> Config {
    single(
        volume(name)
            .attr("copy_tags_to_snapshots", copy)
            .attr("tags", Expr::map([("key1", "value1")])),
    )
}

fn config_compression(name: &str, compression: &str) -> Config {
    single(volume(name).attr("data_compression_type", compression))
}

fn config_read_only(name: &str, read_only: bool) -> Config {
    single(volume(name).attr("read_only", read_only))
}

fn config_storage_capacity(name: &str, quota: i64, reservation: i64) -> Config {
    single(
        volume(name)
            .attr("storage_capacity_quota_gib", quota)
            .attr("storage_capacity_reservation_gib", reservation),
    )
}

fn client_configuration(clients: &str, options: &[&str]) -> Body {
    Body::new()
        .attr("clients", clients)
        .attr("options", Expr::strings(options))
}

fn config_nfs_exports_single(name: &str) -> Config {
    single(volume(name).block(
        "nfs_exports",
        Body::new().block(
            "client_configurations",
            client_configuration("10.0.1.0/24", &["async", "rw"]),
        ),
    ))
}

fn config_nfs_exports_pair(name: &str) -> Config {
    single(
        volume(name).block(
            "nfs_exports",
            Body::new()
                .block(
                    "client_configurations",
                    client_configuration("10.0.1.0/24", &["async", "rw"]),
                )
                .block("client_configurations", client_configuration("*", &["sync", "rw"])),
        ),
    )
}

fn quota(id: i64, gib: i64, kind: &str) -> Body {
    Body::new()
        .attr("id", id)
        .attr("storage_capacity_quota_gib", gib)
        .attr("type", kind)
}

fn config_quotas_single(name: &str, gib: i64) -> Config {
    single(volume(name).block("user_and_group_quotas", quota(10, gib, "USER")))
}

fn config_quotas_many(name: &str, user_gib: i64, group_gib: i64) -> Config {
    single(
        volume(name)
            .block("user_and_group_quotas", quota(10, user_gib, "USER"))
            .block("user_and_group_quotas", quota(20, group_gib, "GROUP"))
            .block("user_and_group_quotas", quota(5, group_gib, "GROUP"))
            .block("user_and_group_quotas", quota(100, user_gib, "USER")),
    )
}

/// Regional ARN of an OpenZFS volume
fn volume_arn() -> Regex {
    Regex::new(r"^arn:aws[a-z-]*:fsx:[a-z]{2}(-[a-z]+)+-\d:\d{12}:volume/fs-[0-9a-f]+/fsvol-[0-9a-f]+$").unwrap()
}

fn import_step() -> TestStep {
    TestStep::import(ADDR).verify()
}

fn assert_passed(outcome: TestOutcome) {
    assert_eq!(outcome, TestOutcome::Passed);
}

#[tokio::test(flavor = "multi_thread")]
async fn volume_basic() {
    init_logging();
    let harness = Harness::new().await;
    let name = random_with_prefix(RESOURCE_PREFIX);
    let volume: Capture<Volume> = Capture::new();

    let outcome = harness
        .case()
        .step(TestStep::config(config_basic(&name)).check(compose(vec![
            check_exists(harness.finder(), ADDR, &volume),
            match_resource_attr(ADDR, "arn", volume_arn()),
            check_resource_attr(ADDR, "copy_tags_to_snapshots", "false"),
            check_resource_attr(ADDR, "data_compression_type", "NONE"),
            check_resource_attr(ADDR, "name", &name),
            check_resource_attr(ADDR, "nfs_exports.#", "1"),
            check_resource_attr(ADDR, "nfs_exports.0.client_configurations.#", "1"),
            check_resource_attr(ADDR, "nfs_exports.0.client_configurations.0.clients", "*"),
            check_resource_attr(ADDR, "nfs_exports.0.client_configurations.0.options.#", "1"),
            check_resource_attr(
                ADDR,
                "nfs_exports.0.client_configurations.0.options.0",
                "crossmnt",
            ),
            check_resource_attr_set(ADDR, "parent_volume_id"),
            check_resource_attr(ADDR, "parent_volume_id", harness.root_volume_id()),
            check_resource_attr(ADDR, "read_only", "false"),
            check_resource_attr(ADDR, "record_size_kib", "128"),
            check_resource_attr(ADDR, "tags.%", "0"),
            check_resource_attr(ADDR, "user_and_group_quotas.#", "0"),
            check_resource_attr(ADDR, "volume_type", "OPENZFS"),
            check_no_resource_attr(ADDR, "origin_snapshot.#"),
        ])))
        .step(import_step())
        .run()
        .await
        .unwrap();
    assert_passed(outcome);

    if let Some(fake) = harness.fake() {
        assert_eq!(fake.volume_count(), 0);
        assert!(fake.calls().contains(&"CreateVolume".to_string()));
        assert!(fake.calls().contains(&"DeleteVolume".to_string()));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn volume_parent_volume() {
    init_logging();
    let harness = Harness::new().await;
    let name = random_with_prefix(RESOURCE_PREFIX);
    let name2 = random_with_prefix(RESOURCE_PREFIX);
    let parent: Capture<Volume> = Capture::new();
    let child: Capture<Volume> = Capture::new();
    let parent_id: Capture<String> = Capture::new();
    let addr2 = "aws_fsx_openzfs_volume.test2";

    let outcome = harness
        .case()
        .step(TestStep::config(config_parent(&name, &name2)).check(compose(vec![
            check_exists(harness.finder(), ADDR, &parent),
            check_exists(harness.finder(), addr2, &child),
            capture_resource_id(ADDR, &parent_id),
            check_resource_attr_ptr(addr2, "parent_volume_id", &parent_id),
            check_resource_attr(addr2, "name", &name2),
            match_resource_attr(addr2, "arn", volume_arn()),
        ])))
        .step(import_step())
        .step(TestStep::import(addr2).verify())
        .run()
        .await
        .unwrap();
    assert_passed(outcome);
}

#[tokio::test(flavor = "multi_thread")]
async fn volume_tags() {
    init_logging();
    let harness = Harness::new().await;
    let name = random_with_prefix(RESOURCE_PREFIX);
    let (v1, v2, v3): (Capture<Volume>, Capture<Volume>, Capture<Volume>) =
        (Capture::new(), Capture::new(), Capture::new());

    let outcome = harness
        .case()
        .step(
            TestStep::config(config_tags(&name, &[("key1", "value1")])).check(compose(vec![
                check_exists(harness.finder(), ADDR, &v1),
                check_resource_attr(ADDR, "tags.%", "1"),
                check_resource_attr(ADDR, "tags.key1", "value1"),
            ])),
        )
        .step(import_step())
        .step(
            TestStep::config(config_tags(
                &name,
                &[("key1", "value1updated"), ("key2", "value2")],
            ))
            .check(compose(vec![
                check_exists(harness.finder(), ADDR, &v2),
                check_not_recreated(&v1, &v2),
                check_resource_attr(ADDR, "tags.%", "2"),
                check_resource_attr(ADDR, "tags.key1", "value1updated"),
                check_resource_attr(ADDR, "tags.key2", "value2"),
            ])),
        )
        .step(
            TestStep::config(config_tags(&name, &[("key2", "value2")])).check(compose(vec![
                check_exists(harness.finder(), ADDR, &v3),
                check_not_recreated(&v2, &v3),
                check_resource_attr(ADDR, "tags.%", "1"),
                check_resource_attr(ADDR, "tags.key2", "value2"),
            ])),
        )
        .run()
        .await
        .unwrap();
    assert_passed(outcome);

    if let Some(fake) = harness.fake() {
        let calls = fake.calls();
        assert!(calls.contains(&"TagResource".to_string()));
        assert!(calls.contains(&"UntagResource".to_string()));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn volume_copy_tags_forces_replacement() {
    init_logging();
    let harness = Harness::new().await;
    let name = random_with_prefix(RESOURCE_PREFIX);
    let (v1, v2): (Capture<Volume>, Capture<Volume>) = (Capture::new(), Capture::new());

    let outcome = harness
        .case()
        .step(TestStep::config(config_copy_tags(&name, true)).check(compose(vec![
            check_exists(harness.finder(), ADDR, &v1),
            check_resource_attr(ADDR, "copy_tags_to_snapshots", "true"),
            check_resource_attr(ADDR, "tags.%", "1"),
        ])))
        .step(import_step())
        .step(TestStep::config(config_copy_tags(&name, false)).check(compose(vec![
            check_exists(harness.finder(), ADDR, &v2),
            check_recreated(&v1, &v2),
            check_resource_attr(ADDR, "copy_tags_to_snapshots", "false"),
        ])))
        .run()
        .await
        .unwrap();
    assert_passed(outcome);
}

#[tokio::test(flavor = "multi_thread")]
async fn volume_name_updates_in_place() {
    init_logging();
    let harness = Harness::new().await;
    let name1 = random_with_prefix(RESOURCE_PREFIX);
    let name2 = random_with_prefix(RESOURCE_PREFIX);
    let (v1, v2): (Capture<Volume>, Capture<Volume>) = (Capture::new(), Capture::new());

    let outcome = harness
        .case()
        .step(TestStep::config(config_basic(&name1)).check(compose(vec![
            check_exists(harness.finder(), ADDR, &v1),
            check_resource_attr(ADDR, "name", &name1),
        ])))
        .step(import_step())
        .step(TestStep::config(config_basic(&name2)).check(compose(vec![
            check_exists(harness.finder(), ADDR, &v2),
            check_not_recreated(&v1, &v2),
            check_resource_attr(ADDR, "name", &name2),
        ])))
        .run()
        .await
        .unwrap();
    assert_passed(outcome);
}

#[tokio::test(flavor = "multi_thread")]
async fn volume_data_compression_type() {
    init_logging();
    let harness = Harness::new().await;
    let name = random_with_prefix(RESOURCE_PREFIX);
    let (v1, v2): (Capture<Volume>, Capture<Volume>) = (Capture::new(), Capture::new());

    let outcome = harness
        .case()
        .step(TestStep::config(config_compression(&name, "ZSTD")).check(compose(vec![
            check_exists(harness.finder(), ADDR, &v1),
            check_resource_attr(ADDR, "data_compression_type", "ZSTD"),
        ])))
        .step(import_step())
        .step(TestStep::config(config_compression(&name, "NONE")).check(compose(vec![
            check_exists(harness.finder(), ADDR, &v2),
            check_not_recreated(&v1, &v2),
            check_resource_attr(ADDR, "data_compression_type", "NONE"),
        ])))
        .run()
        .await
        .unwrap();
    assert_passed(outcome);
}

#[tokio::test(flavor = "multi_thread")]
async fn volume_read_only() {
    init_logging();
    let harness = Harness::new().await;
    let name = random_with_prefix(RESOURCE_PREFIX);
    let (v1, v2): (Capture<Volume>, Capture<Volume>) = (Capture::new(), Capture::new());

    let outcome = harness
        .case()
        .step(TestStep::config(config_read_only(&name, false)).check(compose(vec![
            check_exists(harness.finder(), ADDR, &v1),
            check_resource_attr(ADDR, "read_only", "false"),
        ])))
        .step(import_step())
        .step(TestStep::config(config_read_only(&name, true)).check(compose(vec![
            check_exists(harness.finder(), ADDR, &v2),
            check_not_recreated(&v1, &v2),
            check_resource_attr(ADDR, "read_only", "true"),
        ])))
        .run()
        .await
        .unwrap();
    assert_passed(outcome);
}

#[tokio::test(flavor = "multi_thread")]
async fn volume_storage_capacity() {
    init_logging();
    let harness = Harness::new().await;
    let name = random_with_prefix(RESOURCE_PREFIX);
    let (v1, v2): (Capture<Volume>, Capture<Volume>) = (Capture::new(), Capture::new());

    let outcome = harness
        .case()
        .step(TestStep::config(config_storage_capacity(&name, 30, 20)).check(compose(vec![
            check_exists(harness.finder(), ADDR, &v1),
            check_resource_attr(ADDR, "storage_capacity_quota_gib", "30"),
            check_resource_attr(ADDR, "storage_capacity_reservation_gib", "20"),
        ])))
        .step(import_step())
        .step(TestStep::config(config_storage_capacity(&name, 40, 30)).check(compose(vec![
            check_exists(harness.finder(), ADDR, &v2),
            check_not_recreated(&v1, &v2),
            check_resource_attr(ADDR, "storage_capacity_quota_gib", "40"),
            check_resource_attr(ADDR, "storage_capacity_reservation_gib", "30"),
        ])))
        .run()
        .await
        .unwrap();
    assert_passed(outcome);
}

#[tokio::test(flavor = "multi_thread")]
async fn volume_nfs_exports() {
    init_logging();
    let harness = Harness::new().await;
    let name = random_with_prefix(RESOURCE_PREFIX);
    let (v1, v2): (Capture<Volume>, Capture<Volume>) = (Capture::new(), Capture::new());
    let set_path = "nfs_exports.0.client_configurations.*";

    let outcome = harness
        .case()
        .step(TestStep::config(config_nfs_exports_single(&name)).check(compose(vec![
            check_exists(harness.finder(), ADDR, &v1),
            check_resource_attr(ADDR, "nfs_exports.#", "1"),
            check_resource_attr(ADDR, "nfs_exports.0.client_configurations.#", "1"),
            check_type_set_elem_nested_attrs(
                ADDR,
                set_path,
                HashMap::from([
                    ("clients", "10.0.1.0/24"),
                    ("options.#", "2"),
                    ("options.0", "async"),
                    ("options.1", "rw"),
                ]),
            ),
        ])))
        .step(import_step())
        .step(TestStep::config(config_nfs_exports_pair(&name)).check(compose(vec![
            check_exists(harness.finder(), ADDR, &v2),
            check_not_recreated(&v1, &v2),
            check_resource_attr(ADDR, "nfs_exports.#", "1"),
            check_resource_attr(ADDR, "nfs_exports.0.client_configurations.#", "2"),
            check_type_set_elem_nested_attrs(
                ADDR,
                set_path,
                HashMap::from([
                    ("clients", "10.0.1.0/24"),
                    ("options.#", "2"),
                    ("options.0", "async"),
                    ("options.1", "rw"),
                ]),
            ),
            check_type_set_elem_nested_attrs(
                ADDR,
                set_path,
                HashMap::from([
                    ("clients", "*"),
                    ("options.#", "2"),
                    ("options.0", "sync"),
                    ("options.1", "rw"),
                ]),
            ),
        ])))
        .run()
        .await
        .unwrap();
    assert_passed(outcome);
}

#[tokio::test(flavor = "multi_thread")]
async fn volume_user_and_group_quotas() {
    init_logging();
    let harness = Harness::new().await;
    let name = random_with_prefix(RESOURCE_PREFIX);
    let (v1, v2): (Capture<Volume>, Capture<Volume>) = (Capture::new(), Capture::new());

    let outcome = harness
        .case()
        .step(TestStep::config(config_quotas_single(&name, 256)).check(compose(vec![
            check_exists(harness.finder(), ADDR, &v1),
            check_resource_attr(ADDR, "user_and_group_quotas.#", "1"),
            check_resource_attr(ADDR, "user_and_group_quotas.0.id", "10"),
            check_resource_attr(ADDR, "user_and_group_quotas.0.storage_capacity_quota_gib", "256"),
            check_resource_attr(ADDR, "user_and_group_quotas.0.type", "USER"),
        ])))
        .step(import_step())
        .step(TestStep::config(config_quotas_many(&name, 128, 1024)).check(compose(vec![
            check_exists(harness.finder(), ADDR, &v2),
            check_not_recreated(&v1, &v2),
            check_resource_attr(ADDR, "user_and_group_quotas.#", "4"),
            check_resource_attr(ADDR, "user_and_group_quotas.0.id", "10"),
            check_resource_attr(ADDR, "user_and_group_quotas.0.storage_capacity_quota_gib", "128"),
            check_resource_attr(ADDR, "user_and_group_quotas.0.type", "USER"),
            check_resource_attr(ADDR, "user_and_group_quotas.1.id", "20"),
            check_resource_attr(ADDR, "user_and_group_quotas.1.storage_capacity_quota_gib", "1024"),
            check_resource_attr(ADDR, "user_and_group_quotas.1.type", "GROUP"),
            check_resource_attr(ADDR, "user_and_group_quotas.2.id", "5"),
            check_resource_attr(ADDR, "user_and_group_quotas.2.storage_capacity_quota_gib", "1024"),
            check_resource_attr(ADDR, "user_and_group_quotas.2.type", "GROUP"),
            check_resource_attr(ADDR, "user_and_group_quotas.3.id", "100"),
            check_resource_attr(ADDR, "user_and_group_quotas.3.storage_capacity_quota_gib", "128"),
            check_resource_attr(ADDR, "user_and_group_quotas.3.type", "USER"),
        ])))
        .run()
        .await
        .unwrap();
    assert_passed(outcome);
}

#[tokio::test(flavor = "multi_thread")]
async fn volume_rejects_bad_parent_volume_id() {
    init_logging();
    let harness = Harness::new().await;
    let name = random_with_prefix(RESOURCE_PREFIX);

    let config = Config::new().resource(
        TYPE,
        "test",
        Body::new().attr("name", name.as_str()).attr("parent_volume_id", "vol-123"),
    );
    let outcome = harness
        .case()
        .step(TestStep::config(config).expect_error(Regex::new("must match an FSx volume ID").unwrap()))
        .run()
        .await
        .unwrap();
    assert_passed(outcome);

    if let Some(fake) = harness.fake() {
        assert!(!fake.calls().contains(&"CreateVolume".to_string()));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn volumes_converge_concurrently() {
    init_logging();
    let harness = Harness::new().await;

    let cases = (0..3).map(|_| {
        let name = random_with_prefix(RESOURCE_PREFIX);
        let volume: Capture<Volume> = Capture::new();
        harness
            .case()
            .step(TestStep::config(config_basic(&name)).check(compose(vec![
                check_exists(harness.finder(), ADDR, &volume),
                check_resource_attr(ADDR, "name", &name),
            ])))
            .run()
    });
    let results = futures::future::join_all(cases).await;

    for result in results {
        assert_passed(result.unwrap());
    }
    if let Some(fake) = harness.fake() {
        assert_eq!(fake.volume_count(), 0);
        let creates = fake.calls().iter().filter(|c| *c == "CreateVolume").count();
        assert_eq!(creates, 3);
    }
}

#[test]
fn volume_arn_pattern_is_regional() {
    let arn = volume_arn();
    assert!(arn.is_match(
        "arn:aws:fsx:us-east-1:123456789012:volume/fs-0123456789abcdef0/fsvol-000000000000a001"
    ));
    assert!(arn.is_match(
        "arn:aws-us-gov:fsx:us-gov-west-1:123456789012:volume/fs-0abc/fsvol-0def"
    ));
    assert!(!arn.is_match("arn:aws:fsx::123456789012:volume/fs-0abc/fsvol-0def"));
    assert!(!arn.is_match("volume/fs-x/fsvol-y"));
}
