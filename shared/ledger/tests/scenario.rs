use std::sync::Arc;

use pretty_assertions::assert_eq;
use subpool_core::{parse_units, AccountId, ManualClock, SECONDS_PER_DAY};
use subpool_ledger::{
    Asset, InMemoryAsset, PoolError, PoolSchedule, PoolState, PoolsConfig, Position, SubPools,
};

const T0: u64 = 1_700_000_000;

fn account(name: &str) -> AccountId {
    AccountId::new(name).unwrap()
}

fn units(s: &str) -> u128 {
    parse_units(s).unwrap()
}

#[test_log::test(tokio::test)]
async fn abc_club_lifecycle() {
    let owner = account("owner");
    let trader0 = account("trader0");
    let investor0 = account("investor0");
    let investor1 = account("investor1");
    let custody = account("pool");

    // the owner mints 5000 DAI and hands it out
    let dai = InMemoryAsset::new();
    dai.mint(&owner, units("5000")).await.unwrap();
    for (to, amount) in [(trader0, "2000"), (investor0, "2000"), (investor1, "1000")] {
        dai.transfer(&owner, &to, units(amount)).await.unwrap();
    }

    let clock = Arc::new(ManualClock::new(T0));
    let pools = SubPools::initialize(
        custody,
        dai,
        PoolsConfig {
            asset: "DAI".to_string(),
            fee_enabled: true,
        },
        clock.clone(),
    );
    assert!(pools.fee_enabled());

    // trader0 creates the club
    let pool = pools
        .create_pool(&trader0, PoolSchedule::new(27, 1, 2), "ABC Club")
        .await
        .unwrap();
    assert_eq!(pool, 0);

    // trader0 deposits 2000, investor0 deposits 1000
    pools.asset().approve(&trader0, &custody, units("2000")).await;
    let trader_shares = pools.deposit(&trader0, pool, units("2000")).await.unwrap();
    assert_eq!(trader_shares, units("2000"));
    pools.asset().approve(&investor0, &custody, units("1000")).await;
    let investor_shares = pools.deposit(&investor0, pool, units("1000")).await.unwrap();
    assert_eq!(investor_shares, units("1000"));

    // trader0 starts the pool, the fund is now operating
    pools.start_pool(&trader0, pool).await.unwrap();
    assert_eq!(pools.pool_info(pool).await.unwrap().state, PoolState::Active);

    clock.advance_days(4);

    // deposits are closed, withdrawals work
    pools.asset().approve(&investor1, &custody, units("1000")).await;
    assert_eq!(
        pools.deposit(&investor1, pool, units("1000")).await,
        Err(PoolError::WindowClosed(pool))
    );

    let position = pools.query_position(pool, &investor0).await.unwrap();
    let half = position.shares / 2;
    let paid = pools.withdraw(&investor0, pool, half).await.unwrap();
    assert_eq!(paid, units("500"));
    assert_eq!(
        pools.asset().balance_of(&investor0).await,
        units("1500")
    );

    // move to the 27th day, which is past the gap start
    clock.set(T0 + 27 * SECONDS_PER_DAY);
    assert_eq!(
        pools.withdraw(&investor0, pool, half).await,
        Err(PoolError::InGapPeriod(pool))
    );

    let info = pools.pool_info(pool).await.unwrap();
    assert_eq!(info.state, PoolState::Closed);
    assert_eq!(info.total_shares, units("2500"));
    assert_eq!(info.total_assets, units("2500"));
    assert_eq!(
        pools.query_position(pool, &investor0).await.unwrap(),
        Position {
            shares: units("500")
        }
    );
    assert_eq!(
        pools.asset().balance_of(&custody).await,
        units("2500")
    );
}
