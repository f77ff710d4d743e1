//! Integration tests for unit-of-work boundaries: failures, rollback, isolation.


use faulty_store::FaultyStore;
use fluent_projections::{
    Error, FilterValue, Message, MessageHandler, OperationKind, Projection, ProjectionProvider,
    ProviderFactory, StoreProviderFactory, UnitOfWork, UnitState,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Projection)]
#[projection(table = "balances")]
struct Balance {
    #[projection(key)]
    account: String,
    #[projection(key)]
    currency: String,
    branch: String,
    amount: i64,
}

#[derive(Serialize, Message)]
struct AccountOpened {
    account: String,
    currency: String,
    branch: String,
}

#[derive(Serialize, Message)]
struct BranchRebalanced {
    branch: String,
    amount: i64,
}

type Handler = MessageHandler<Balance, StoreProviderFactory<FaultyStore>>;

fn handler(store: &FaultyStore) -> Handler {
    MessageHandler::new(StoreProviderFactory::new(store.clone()))
        .on::<AccountOpened, _>(|b| b.add_new().map("account").map("currency").map("branch"))
        .unwrap()
        .on::<BranchRebalanced, _>(|b| b.update().when_equal("branch").map("amount"))
        .unwrap()
}

fn opened(account: &str, currency: &str) -> AccountOpened {
    AccountOpened {
        account: account.into(),
        currency: currency.into(),
        branch: "north".into(),
    }
}

#[test]
fn composite_key_is_derived() {
    assert_eq!(Balance::KEY, &["account", "currency"]);
}

#[tokio::test]
async fn unavailable_store_fails_before_any_operation() {
    let store = FaultyStore::new();
    let handler = handler(&store);
    store.set_unavailable(true);

    let err = handler.handle(&opened("a-1", "EUR")).await.unwrap_err();

    assert!(matches!(err, Error::StoreUnavailable(_)));
    assert_eq!(store.commits(), 0);

    store.set_unavailable(false);
    assert!(handler.read(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn unfiltered_update_is_rejected_before_store_access() {
    let store = FaultyStore::new();
    let handler = handler(&store);
    store.set_unavailable(true);

    let err = handler
        .handle_with(
            &BranchRebalanced {
                branch: "north".into(),
                amount: 50,
            },
            |b| b.update().map("amount"),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::MissingFilter {
            kind: OperationKind::Update,
            projection: "balances",
        }
    ));
    assert_eq!(store.commits(), 0);
}

#[tokio::test]
async fn failure_mid_operation_rolls_back_earlier_writes() {
    let store = FaultyStore::new();
    let handler = handler(&store);
    for (account, currency) in [("a-1", "EUR"), ("a-1", "USD"), ("a-2", "EUR")] {
        handler.handle(&opened(account, currency)).await.unwrap();
    }
    let commits_before = store.commits();
    store.fail_updates_after(1);

    let err = handler
        .handle(&BranchRebalanced {
            branch: "north".into(),
            amount: 50,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Store(_)));
    assert_eq!(store.commits(), commits_before);
    let balances = handler.read(&[]).await.unwrap();
    assert_eq!(balances.len(), 3);
    assert!(balances.iter().all(|balance| balance.amount == 0));
}

#[tokio::test]
async fn constraint_violation_is_not_committed() {
    let store = FaultyStore::new();
    let handler = handler(&store);
    handler.handle(&opened("a-1", "EUR")).await.unwrap();
    let commits_before = store.commits();

    let err = handler.handle(&opened("a-1", "EUR")).await.unwrap_err();

    assert!(matches!(err, Error::ConstraintViolation { .. }));
    assert_eq!(store.commits(), commits_before);

    // Same account, other currency: a distinct composite key.
    handler.handle(&opened("a-1", "USD")).await.unwrap();
    assert_eq!(handler.read(&[]).await.unwrap().len(), 2);
}

#[tokio::test]
async fn uncommitted_writes_stay_private_to_their_unit() {
    let factory = StoreProviderFactory::new(FaultyStore::new());

    let mut writer = factory.create().await.unwrap();
    writer
        .insert(&Balance {
            account: "a-1".into(),
            currency: "EUR".into(),
            branch: "north".into(),
            amount: 10,
        })
        .await
        .unwrap();

    let own: Vec<Balance> = writer
        .read(&[FilterValue::new("account", "a-1")])
        .await
        .unwrap();
    assert_eq!(own.len(), 1);

    let mut reader = factory.create().await.unwrap();
    assert!(reader.read::<Balance>(&[]).await.unwrap().is_empty());

    writer.commit().await.unwrap();
    assert_eq!(writer.state(), UnitState::Committed);

    let mut reader = factory.create().await.unwrap();
    assert_eq!(reader.read::<Balance>(&[]).await.unwrap().len(), 1);
}

#[tokio::test]
async fn committed_unit_rejects_further_work() {
    let factory = StoreProviderFactory::new(FaultyStore::new());
    let mut provider = factory.create().await.unwrap();
    provider.commit().await.unwrap();

    assert!(matches!(
        provider.commit().await.unwrap_err(),
        Error::InvalidState(_)
    ));
    assert!(matches!(
        provider
            .remove::<Balance>(&[FilterValue::new("account", "a-1")])
            .await
            .unwrap_err(),
        Error::InvalidState(_)
    ));
}

#[tokio::test]
async fn interleaved_updates_keep_the_first_commit() {
    let store = FaultyStore::new();
    let handler = handler(&store);
    handler.handle(&opened("a-1", "EUR")).await.unwrap();
    let factory = handler.factory();
    let key = [
        FilterValue::new("account", "a-1"),
        FilterValue::new("currency", "EUR"),
    ];

    let mut slow = factory.create().await.unwrap();
    let mut stale: Balance = slow.read(&key).await.unwrap().remove(0);

    let mut fast = factory.create().await.unwrap();
    let mut moved: Balance = fast.read(&key).await.unwrap().remove(0);
    moved.branch = "south".into();
    fast.update(&moved).await.unwrap();
    fast.commit().await.unwrap();

    stale.amount = 5;
    slow.update(&stale).await.unwrap();
    let err = slow.commit().await.unwrap_err();

    assert!(matches!(err, Error::ConstraintViolation { .. }));
    assert_eq!(slow.state(), UnitState::RolledBack);
    let balances = handler.read(&key).await.unwrap();
    assert_eq!(balances[0].branch, "south");
    assert_eq!(balances[0].amount, 0);
}
