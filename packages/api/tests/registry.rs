mod common;

use common::STRIPE_SOURCE;
use relay_api::registry::{DestinationRegistry, NewDestination};
use relay_routing::{ProcessorType, SigningSecret};

fn destination(processor_id: i32, destination_id: &str) -> NewDestination {
    NewDestination {
        source_id: STRIPE_SOURCE.to_string(),
        destination_id: destination_id.to_string(),
        signing_secret: SigningSecret::new("whsec_c2VjcmV0"),
        processor_id,
        created_by: Some("tester".to_string()),
    }
}

#[tokio::test]
async fn create_generates_id_and_timestamp() {
    let ctx = common::context().await;

    let record = ctx
        .registry
        .create(destination(ctx.stripe_processor, "ep_1"))
        .await
        .unwrap();

    assert!(record.id > 0);
    assert_eq!(record.signing_secret, "whsec_c2VjcmV0");
    let stored = ctx.registry.get_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(stored.destination_id, "ep_1");
    assert_eq!(stored.created_by.as_deref(), Some("tester"));
}

#[tokio::test]
async fn newest_destination_wins() {
    let ctx = common::context().await;
    ctx.registry
        .create(destination(ctx.stripe_processor, "ep_old"))
        .await
        .unwrap();
    ctx.registry
        .create(destination(ctx.stripe_processor, "ep_new"))
        .await
        .unwrap();

    let by_type = ctx
        .registry
        .get_by_processor_type(ProcessorType::Stripe, true)
        .await
        .unwrap()
        .unwrap();
    let by_processor = ctx
        .registry
        .get_by_processor_id(ctx.stripe_processor)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(by_type.destination_id, "ep_new");
    assert_eq!(by_processor.destination_id, "ep_new");
}

#[tokio::test]
async fn destination_ids_are_unique() {
    let ctx = common::context().await;
    ctx.registry
        .create(destination(ctx.stripe_processor, "ep_1"))
        .await
        .unwrap();

    assert!(ctx
        .registry
        .create(destination(ctx.gocardless_processor, "ep_1"))
        .await
        .is_err());
}

#[tokio::test]
async fn lookup_by_type_joins_on_the_processor() {
    let ctx = common::context().await;
    ctx.registry
        .create(destination(ctx.gocardless_processor, "ep_gc"))
        .await
        .unwrap();

    assert!(ctx
        .registry
        .get_by_processor_type(ProcessorType::Stripe, false)
        .await
        .unwrap()
        .is_none());
    assert_eq!(
        ctx.registry
            .get_by_processor_type(ProcessorType::GoCardless, true)
            .await
            .unwrap()
            .map(|r| r.destination_id),
        Some("ep_gc".to_string())
    );
}

#[tokio::test]
async fn schema_bootstrap_is_idempotent() {
    let ctx = common::context().await;
    relay_api::schema::ensure_schema(&ctx.db).await.unwrap();
    assert_eq!(ctx.registry.list_processors().await.unwrap().len(), 2);
}
