//! Integration tests for message handling against the in-memory store.


use std::sync::Arc;

use fluent_projections::{
    Error, Fields, FilterValue, InMemoryStore, MessageHandler, Projection,
    StoreProviderFactory,
};
use handlers::ItemViewHandler;
use messages::{
    ItemAdded, ItemRegistered, ItemRemoved, ItemRetired, ItemValueChanged, OwnerCounted,
    OwnerItemsPurged, OwnerItemsReset,
};
use views::{ItemView, OwnerTally};

type Factory = StoreProviderFactory<InMemoryStore>;

fn factory() -> Factory {
    StoreProviderFactory::new(InMemoryStore::new())
}

fn item_handler(factory: Factory) -> MessageHandler<ItemView, Factory> {
    MessageHandler::new(factory)
        .on::<ItemAdded, _>(|b| b.add_new().map("id"))
        .unwrap()
        .on::<ItemRegistered, _>(|b| b.add_new().map("id").map("owner"))
        .unwrap()
        .on::<ItemValueChanged, _>(|b| b.update().when_equal("id").map("value"))
        .unwrap()
        .on::<ItemRemoved, _>(|b| b.remove().when_equal("id"))
        .unwrap()
        .on::<OwnerItemsReset, _>(|b| b.update().when_equal("owner").map("value"))
        .unwrap()
        .on::<OwnerItemsPurged, _>(|b| b.remove().when_equal("owner"))
        .unwrap()
}

fn by_id(id: i32) -> [FilterValue; 1] {
    [FilterValue::new("id", id)]
}

#[test]
fn derived_schema_matches_struct() {
    assert_eq!(ItemView::TABLE, "item_views");
    assert_eq!(ItemView::KEY, &["id"]);
    assert_eq!(OwnerTally::TABLE, "owner_tallys");
    assert_eq!(OwnerTally::KEY, &["id"]);

    let names: Vec<_> = ItemView::FIELDS.iter().map(|field| field.name()).collect();
    assert_eq!(names, vec!["id", "value", "owner"]);
}

#[tokio::test]
async fn serde_renamed_message_fields_bind_by_serialized_name() {
    let names: Vec<_> = ItemRetired::FIELDS.iter().map(|field| field.name()).collect();
    assert_eq!(names, vec!["itemId", "retiredBy"]);

    let rust_name = MessageHandler::<ItemView, _>::new(factory())
        .on::<ItemRetired, _>(|b| b.remove().when_equal("id"));
    assert!(matches!(rust_name, Err(Error::UnknownField { field, .. }) if field == "id"));

    let handler = item_handler(factory())
        .on::<ItemRetired, _>(|b| b.remove().when_equal_to("itemId", "id"))
        .unwrap();
    handler.handle(&ItemAdded { id: 7 }).await.unwrap();

    let removed = handler
        .handle(&ItemRetired {
            id: 7,
            retired_by: "ann".into(),
        })
        .await
        .unwrap();

    assert_eq!(removed, 1);
    assert!(handler.read(&by_id(7)).await.unwrap().is_empty());
}

#[tokio::test]
async fn add_new_inserts_projection_with_defaults() {
    let handler = item_handler(factory());

    let written = handler.handle(&ItemAdded { id: 777 }).await.unwrap();

    assert_eq!(written, 1);
    assert_eq!(
        handler.read(&by_id(777)).await.unwrap(),
        vec![ItemView {
            id: 777,
            value: 0,
            owner: String::new(),
        }]
    );
}

#[tokio::test]
async fn update_overwrites_mapped_field_only() {
    let handler = item_handler(factory());
    handler
        .handle(&ItemRegistered {
            id: 777,
            owner: "ann".into(),
        })
        .await
        .unwrap();

    let written = handler
        .handle(&ItemValueChanged { id: 777, value: 111 })
        .await
        .unwrap();

    assert_eq!(written, 1);
    assert_eq!(
        handler.read(&by_id(777)).await.unwrap(),
        vec![ItemView {
            id: 777,
            value: 111,
            owner: "ann".into(),
        }]
    );
}

#[tokio::test]
async fn remove_deletes_matching_projection() {
    let handler = item_handler(factory());
    handler.handle(&ItemAdded { id: 777 }).await.unwrap();
    handler
        .handle(&ItemValueChanged { id: 777, value: 111 })
        .await
        .unwrap();

    let written = handler.handle(&ItemRemoved { id: 777 }).await.unwrap();

    assert_eq!(written, 1);
    assert!(handler.read(&by_id(777)).await.unwrap().is_empty());
}

#[tokio::test]
async fn removing_twice_is_a_no_op() {
    let handler = item_handler(factory());
    handler.handle(&ItemAdded { id: 777 }).await.unwrap();

    handler.handle(&ItemRemoved { id: 777 }).await.unwrap();
    let written = handler.handle(&ItemRemoved { id: 777 }).await.unwrap();

    assert_eq!(written, 0);
    assert!(handler.read(&by_id(777)).await.unwrap().is_empty());
}

#[tokio::test]
async fn expression_without_operation_is_invalid() {
    let handler = MessageHandler::<ItemView, _>::new(factory());

    let err = handler
        .handle_with(&ItemAdded { id: 1 }, |b| b)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidMapping(_)));
}

#[tokio::test]
async fn duplicate_insert_leaves_store_untouched() {
    let handler = item_handler(factory());
    handler
        .handle(&ItemRegistered {
            id: 1,
            owner: "ann".into(),
        })
        .await
        .unwrap();

    let err = handler.handle(&ItemAdded { id: 1 }).await.unwrap_err();

    assert!(matches!(err, Error::ConstraintViolation { .. }));
    assert_eq!(
        handler.read(&[]).await.unwrap(),
        vec![ItemView {
            id: 1,
            value: 0,
            owner: "ann".into(),
        }]
    );
}

#[tokio::test]
async fn filters_on_non_key_fields_touch_every_match() {
    let handler = item_handler(factory());
    for (id, owner) in [(1, "ann"), (2, "ann"), (3, "bob")] {
        handler
            .handle(&ItemRegistered {
                id,
                owner: owner.into(),
            })
            .await
            .unwrap();
    }

    let written = handler
        .handle(&OwnerItemsReset {
            owner: "ann".into(),
            value: 5,
        })
        .await
        .unwrap();
    assert_eq!(written, 2);

    let ann = handler
        .read(&[FilterValue::new("owner", "ann")])
        .await
        .unwrap();
    assert!(ann.iter().all(|item| item.value == 5));
    assert_eq!(handler.read(&by_id(3)).await.unwrap()[0].value, 0);

    let removed = handler
        .handle(&OwnerItemsPurged {
            owner: "ann".into(),
        })
        .await
        .unwrap();
    assert_eq!(removed, 2);
    assert_eq!(handler.read(&[]).await.unwrap().len(), 1);
}

#[tokio::test]
async fn renamed_fields_map_across_types() {
    let handler = MessageHandler::<OwnerTally, _>::new(factory())
        .on::<OwnerCounted, _>(|b| b.add_new().map_to("owner", "id").map_to("count", "items"))
        .unwrap();

    handler
        .handle(&OwnerCounted {
            owner: "ann".into(),
            count: 4,
        })
        .await
        .unwrap();

    let tallies = handler
        .read(&[FilterValue::new("id", "ann")])
        .await
        .unwrap();
    assert_eq!(
        tallies,
        vec![OwnerTally {
            id: "ann".into(),
            items: 4,
        }]
    );
}

#[tokio::test]
async fn per_message_methods_follow_the_same_lifecycle() {
    let handler = ItemViewHandler::new(factory());

    handler.item_added(&ItemAdded { id: 7777 }).await.unwrap();
    handler
        .item_value_changed(&ItemValueChanged { id: 7777, value: 111 })
        .await
        .unwrap();
    assert_eq!(handler.inner().read(&by_id(7777)).await.unwrap()[0].value, 111);

    handler.item_removed(&ItemRemoved { id: 7777 }).await.unwrap();
    assert!(handler.inner().read(&by_id(7777)).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_handles_use_independent_units_of_work() {
    let handler = Arc::new(item_handler(factory()));

    let tasks: Vec<_> = (0..32)
        .map(|id| {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move { handler.handle(&ItemAdded { id }).await })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), 1);
    }

    let mut ids: Vec<i32> = handler
        .read(&[])
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.id)
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (0..32).collect::<Vec<_>>());
}

#[tokio::test]
async fn shared_store_is_visible_across_handlers() {
    let store = InMemoryStore::new();
    let writer = item_handler(StoreProviderFactory::new(store.clone()));
    let reader = MessageHandler::<ItemView, _>::new(StoreProviderFactory::new(store.clone()));

    writer.handle(&ItemAdded { id: 5 }).await.unwrap();

    assert_eq!(reader.read(&by_id(5)).await.unwrap().len(), 1);
    assert_eq!(store.rows("item_views").unwrap().len(), 1);
}
