//! End-to-end session behavior against the scripted server.

use pogo_client::{
    CredentialStore, CredentialStoreExt, LocationFeed, MemoryCredentialStore, PollOutcome,
    SessionError, SessionManager, SessionOptions, UserCredentials, AUTH_TOKEN, LAST_PROVIDER,
    NEARBY_SLOTS, REMEMBER_LOGIN,
};
use pogo_core::{AuthProvider, Geoposition, ItemId, PokemonId};
use pogo_net::codec;
use pogo_net::protocol::{CatchPokemonMessage, CatchStatus, GetMapObjectsMessage};
use pogo_net::{
    ApiError, FailurePolicy, RequestType, RpcClient, SessionSigningState, MAX_RETRIES,
};
use pogo_testkit::{
    fixture_inventory, fixture_settings, FixtureDevice, FixtureWorld, IdentitySealer,
    ScriptedTransport, FIXTURE_EGG_ID,
};
use std::sync::Arc;
use std::time::Duration;

const START: Geoposition = Geoposition {
    latitude: 40.7829,
    longitude: -73.9654,
    altitude: 10.0,
};

struct Harness {
    transport: Arc<ScriptedTransport>,
    store: Arc<MemoryCredentialStore>,
    feed: LocationFeed,
    session: SessionManager,
}

fn harness_with(world: FixtureWorld, options: SessionOptions) -> Harness {
    let transport = Arc::new(ScriptedTransport::new(world));
    let client = RpcClient::new(
        transport.clone(),
        Arc::new(FixtureDevice::default()),
        Arc::new(IdentitySealer),
    )
    .with_signing_state(SessionSigningState::new());
    let store = Arc::new(MemoryCredentialStore::new());
    let feed = LocationFeed::new(START);
    let session = SessionManager::new(client, store.clone(), feed.clone(), options);
    Harness {
        transport,
        store,
        feed,
        session,
    }
}

fn harness() -> Harness {
    harness_with(FixtureWorld::default(), SessionOptions::default())
}

async fn logged_in() -> Harness {
    let mut h = harness();
    assert!(h.session.login(AuthProvider::Ptc, "ash", "pikachu").await.unwrap());
    h.session.start_data_update().await.unwrap();
    h
}

#[tokio::test]
async fn login_persists_credentials_and_data_update_fills_views() {
    let h = logged_in().await;

    assert_eq!(h.store.get(AUTH_TOKEN).unwrap().as_deref(), Some("token-1"));
    assert_eq!(h.store.last_provider().unwrap(), Some(AuthProvider::Ptc));
    assert_eq!(
        h.store.user_credentials().unwrap(),
        Some(UserCredentials {
            username: "ash".into(),
            secret: "pikachu".into(),
        })
    );

    let session = &h.session;
    assert_eq!(session.map().catchable().len(), 2);
    assert_eq!(session.map().nearby().len(), NEARBY_SLOTS);
    assert!(session.map().nearby()[2].is_placeholder());
    assert_eq!(session.map().pokestops().len(), 1);
    assert_eq!(session.inventory().pokemons().len(), 2);
    assert_eq!(session.inventory().eggs().len(), 1);
    assert_eq!(session.inventory().catch_items().len(), 3);
    assert!(session.settings().is_some());
    assert!(session.is_tracking_location());

    let bulbasaur = session.inventory().pokemon(101).unwrap();
    assert_eq!(
        session.extra_data_for_pokemon(bulbasaur).unwrap().candy_to_evolve,
        25
    );
    let egg = session.inventory().eggs()[0].clone();
    assert_eq!(egg.id, FIXTURE_EGG_ID);
    assert_eq!(session.incubator_for_egg(&egg).unwrap().id, "inc-busy");
    assert_eq!(session.templates().upgrade_cost(3).map(|c| c.stardust), Some(400));
}

#[tokio::test]
async fn map_poll_batches_five_calls_in_order() {
    let mut h = logged_in().await;
    h.transport.clear_history().await;
    h.session.update_map_objects().await.unwrap();

    assert_eq!(
        h.transport.sent_request_types().await,
        vec![vec![
            RequestType::GetMapObjects,
            RequestType::GetHatchedEggs,
            RequestType::GetInventory,
            RequestType::CheckAwardedBadges,
            RequestType::DownloadSettings,
        ]]
    );
    let sent = h.transport.sent().await;
    let message: GetMapObjectsMessage = codec::from_bytes(&sent[0].requests[0].request_message).unwrap();
    assert_eq!(message.latitude, START.latitude);
}

#[tokio::test]
async fn login_without_token_clears_stale_token() {
    let mut h = harness();
    h.store.set(AUTH_TOKEN, Some("old")).unwrap();
    h.transport.reject_logins(true).await;

    assert!(!h.session.login(AuthProvider::Google, "ash", "pikachu").await.unwrap());
    assert_eq!(h.store.get(AUTH_TOKEN).unwrap(), None);
    assert_eq!(h.store.user_credentials().unwrap(), None);
    assert_eq!(h.store.get(LAST_PROVIDER).unwrap(), None);
}

#[tokio::test]
async fn initialize_resumes_with_stored_token() {
    let mut h = harness();
    h.store.set(AUTH_TOKEN, Some("token-9")).unwrap();
    h.store.set(LAST_PROVIDER, Some("google")).unwrap();

    assert!(h.session.initialize_session().await.unwrap());
    assert!(h.transport.logins().await.is_empty());
    assert_eq!(h.session.client().provider().await, AuthProvider::Google);
    assert!(h.session.client().has_ticket().await);
}

#[tokio::test]
async fn initialize_with_expired_token_logs_in_with_stored_credentials() {
    let mut h = harness();
    h.store.set(AUTH_TOKEN, Some("stale")).unwrap();
    h.store.set(LAST_PROVIDER, Some("ptc")).unwrap();
    h.store
        .set_user_credentials(Some(&UserCredentials {
            username: "ash".into(),
            secret: "pikachu".into(),
        }))
        .unwrap();
    h.transport.expire_token("stale").await;

    assert!(h.session.initialize_session().await.unwrap());
    assert_eq!(
        h.transport.logins().await,
        vec![(AuthProvider::Ptc, "ash".to_string())]
    );
    assert_eq!(h.store.get(AUTH_TOKEN).unwrap().as_deref(), Some("token-1"));
}

#[tokio::test(start_paused = true)]
async fn initialize_starts_a_fresh_failure_policy() {
    let Harness {
        transport,
        store,
        session,
        ..
    } = harness();
    let mut policy = FailurePolicy::with_retry_delay(Duration::from_millis(20));
    for _ in 0..3 {
        policy.on_failure().await;
    }
    let mut session = session.with_failure_policy(policy);
    store.set(AUTH_TOKEN, Some("token-9")).unwrap();

    assert!(session.initialize_session().await.unwrap());
    assert_eq!(session.policy().counter().consecutive_failures(), 0);
    assert_eq!(session.policy().retry_delay(), Duration::from_millis(20));

    // Relogin points count from the fresh policy: four failures stay retries.
    transport.fail_ticketed_next(4).await;
    session.update_profile().await.unwrap();
    assert!(transport.logins().await.is_empty());
}

#[tokio::test]
async fn initialize_without_stored_state_fails() {
    let mut h = harness();
    assert!(matches!(
        h.session.initialize_session().await,
        Err(SessionError::NoStoredCredentials)
    ));
}

#[tokio::test(start_paused = true)]
async fn fifth_failure_relogs_and_reissues_the_call() {
    let mut h = logged_in().await;
    h.transport.fail_ticketed_next(5).await;

    h.session.update_inventory().await.unwrap();

    assert_eq!(h.transport.logins().await.len(), 2);
    assert_eq!(h.session.policy().counter().consecutive_failures(), 0);
    assert!(h.session.is_polling());
    assert_eq!(h.store.get(AUTH_TOKEN).unwrap().as_deref(), Some("token-2"));
    assert_eq!(h.session.inventory().pokemons().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn four_failures_retry_without_relogin() {
    let mut h = logged_in().await;
    h.transport.fail_ticketed_next(4).await;

    h.session.update_profile().await.unwrap();

    assert_eq!(h.transport.logins().await.len(), 1);
    assert_eq!(h.session.profile().map(|p| p.username.as_str()), Some("ash"));
}

#[tokio::test(start_paused = true)]
async fn fiftieth_failure_aborts_the_call() {
    let mut h = logged_in().await;
    h.transport.fail_ticketed_next(1_000).await;

    let err = h.session.update_inventory().await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Api(ApiError::RetriesExhausted { attempts }) if attempts == MAX_RETRIES
    ));
    // Relogins at 5, 10, ..., 45 on top of the first login.
    assert_eq!(h.transport.logins().await.len(), 10);
    assert_eq!(h.session.policy().counter().consecutive_failures(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_relogin_counts_and_is_retried() {
    let mut h = logged_in().await;
    h.session.toggle_update_timer(true).await.unwrap();
    // Five call failures, then the session open of the first relogin.
    h.transport.fail_next(6).await;

    h.session.update_inventory().await.unwrap();

    // First login, the relogin whose session open failed, the one that held.
    assert_eq!(h.transport.logins().await.len(), 3);
    assert_eq!(h.session.policy().counter().consecutive_failures(), 0);
    assert!(!h.session.is_relogin_pending());
    assert!(h.session.is_polling());
    assert!(h.session.is_tracking_location());
    assert!(h.session.client().has_ticket().await);
    assert_eq!(h.store.get(AUTH_TOKEN).unwrap().as_deref(), Some("token-3"));
}

#[tokio::test(start_paused = true)]
async fn relogins_failing_to_the_bound_leave_polling_armed() {
    let mut h = logged_in().await;
    h.session.toggle_update_timer(true).await.unwrap();
    h.transport.fail_next(1_000).await;

    let err = h.session.update_inventory().await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Api(ApiError::RetriesExhausted { attempts }) if attempts == MAX_RETRIES
    ));
    // Failures 6 through 50 were relogin attempts.
    assert_eq!(h.transport.logins().await.len(), 1 + 45);
    assert_eq!(h.session.policy().counter().consecutive_failures(), 0);
    assert!(h.session.is_polling());
    assert!(h.session.is_relogin_pending());

    // Once the server recovers, the next tick logs in again and refreshes.
    h.transport.fail_next(0).await;
    tokio::time::advance(Duration::from_secs(60)).await;
    assert!(matches!(
        h.session.poll_tick().await.unwrap(),
        PollOutcome::Updated(_)
    ));
    assert!(!h.session.is_relogin_pending());
    assert!(h.session.client().has_ticket().await);
    assert!(h.session.is_tracking_location());
}

#[tokio::test]
async fn expired_token_mid_call_relogs_once() {
    let mut h = logged_in().await;
    h.transport.expire_next(1).await;

    h.session.update_profile().await.unwrap();

    assert_eq!(h.transport.logins().await.len(), 2);
    assert_eq!(h.session.policy().counter().consecutive_failures(), 0);
}

#[tokio::test]
async fn relogin_without_prior_login_fails() {
    let mut h = harness();
    assert!(matches!(
        h.session.relogin().await,
        Err(SessionError::NoStoredCredentials)
    ));
}

#[tokio::test(start_paused = true)]
async fn poll_tick_skips_within_minimum_refresh() {
    let mut h = logged_in().await;
    h.session.toggle_update_timer(true).await.unwrap();
    assert!(h.session.is_polling());
    h.transport.clear_history().await;

    tokio::time::advance(Duration::from_secs(5)).await;
    assert_eq!(h.session.poll_tick().await.unwrap(), PollOutcome::Skipped);
    assert!(h.transport.sent().await.is_empty());

    tokio::time::advance(Duration::from_secs(6)).await;
    assert!(matches!(
        h.session.poll_tick().await.unwrap(),
        PollOutcome::Updated(_)
    ));
    assert_eq!(h.transport.count_of(RequestType::GetMapObjects).await, 1);
}

#[tokio::test(start_paused = true)]
async fn resuming_timer_refreshes_when_stale() {
    let mut h = logged_in().await;
    h.session.toggle_update_timer(false).await.unwrap();
    h.transport.clear_history().await;

    tokio::time::advance(Duration::from_secs(11)).await;
    h.session.toggle_update_timer(true).await.unwrap();
    assert_eq!(h.transport.count_of(RequestType::GetMapObjects).await, 1);

    h.session.toggle_update_timer(true).await.unwrap();
    assert_eq!(h.transport.count_of(RequestType::GetMapObjects).await, 1);
}

#[tokio::test(start_paused = true)]
async fn run_loop_reports_tick_errors_and_keeps_going() {
    let world = FixtureWorld {
        settings: fixture_settings(0.0),
        ..FixtureWorld::default()
    };
    let mut h = harness_with(
        world,
        SessionOptions {
            poll_interval: Some(Duration::from_secs(1)),
            ..SessionOptions::default()
        },
    );
    h.session.login(AuthProvider::Ptc, "ash", "pikachu").await.unwrap();
    h.session.start_data_update().await.unwrap();
    h.session.toggle_update_timer(true).await.unwrap();
    h.transport
        .set_response(RequestType::GetMapObjects, &"not a map")
        .await
        .unwrap();

    let mut errors = 0;
    let ticks = h
        .session
        .run(std::future::pending(), Some(3), |err| {
            assert!(matches!(err, SessionError::Api(ApiError::Codec(_))));
            errors += 1;
        })
        .await;

    assert_eq!(ticks, 3);
    assert_eq!(errors, 3);
    assert!(h.session.is_polling());
}

#[tokio::test]
async fn logout_clears_session_state() {
    let mut h = logged_in().await;
    h.session.toggle_update_timer(true).await.unwrap();

    h.session.logout().await.unwrap();

    assert_eq!(h.store.get(AUTH_TOKEN).unwrap(), None);
    assert_eq!(h.store.user_credentials().unwrap(), None);
    assert!(!h.session.is_polling());
    assert!(!h.session.is_tracking_location());
    assert!(h.session.map().catchable().is_empty());
    assert!(h.session.map().pokestops().is_empty());
    assert_eq!(h.session.map().nearby().len(), NEARBY_SLOTS);
    assert!(h.session.map().nearby().iter().all(|n| n.is_placeholder()));
    assert_eq!(h.session.client().token().await, None);
}

#[tokio::test]
async fn logout_keeps_credentials_when_remembered() {
    let mut h = logged_in().await;
    h.store.set(REMEMBER_LOGIN, Some("true")).unwrap();

    h.session.logout().await.unwrap();

    assert_eq!(h.store.get(AUTH_TOKEN).unwrap(), None);
    assert!(h.store.user_credentials().unwrap().is_some());
}

#[tokio::test]
async fn level_up_rewards_follow_level_changes() {
    let mut h = logged_in().await;

    assert!(h.session.update_player_stats(true).await.unwrap().is_some());
    assert!(h.session.update_player_stats(true).await.unwrap().is_none());

    h.transport
        .update_world(|world| world.inventory = fixture_inventory(6))
        .await;
    assert!(h.session.update_player_stats(false).await.unwrap().is_none());
    assert_eq!(h.session.player_stats().map(|s| s.level), Some(6));

    h.transport
        .update_world(|world| world.inventory = fixture_inventory(7))
        .await;
    let rewards = h.session.update_player_stats(true).await.unwrap();
    assert!(rewards.is_some());
    assert_eq!(h.transport.count_of(RequestType::LevelUpRewards).await, 2);
}

#[tokio::test]
async fn missing_player_stats_is_structural() {
    let mut h = logged_in().await;
    h.transport.update_world(|world| world.inventory.clear()).await;
    assert!(matches!(
        h.session.update_player_stats(true).await,
        Err(SessionError::MissingPlayerStats)
    ));
}

#[tokio::test]
async fn position_changes_are_pushed_past_min_distance() {
    let h = logged_in().await;
    h.transport.clear_history().await;

    // About a metre away: below the 10 m threshold.
    h.feed.publish(Geoposition::new(40.78291, -73.9654, 10.0));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.transport.count_of(RequestType::PlayerUpdate).await, 0);

    h.feed.publish(Geoposition::new(40.7900, -73.9654, 12.0));
    for _ in 0..100 {
        if h.transport.count_of(RequestType::PlayerUpdate).await > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.transport.count_of(RequestType::PlayerUpdate).await, 1);
    assert_eq!(h.session.client().position().await.latitude, 40.7900);
}

#[tokio::test]
async fn game_actions_go_through_the_session() {
    let mut h = logged_in().await;

    let encounter = h.session.encounter_pokemon(1001, "spawn-1001").await.unwrap();
    assert_eq!(encounter.capture_probability.len(), 3);

    let caught = h
        .session
        .catch_pokemon(1001, "spawn-1001", ItemId::PokeBall, true)
        .await
        .unwrap();
    assert_eq!(caught.status, CatchStatus::CatchSuccess);
    let sent = h.transport.sent().await;
    let throw: CatchPokemonMessage =
        codec::from_bytes(&sent.last().unwrap().requests[0].request_message).unwrap();
    assert!((0.0..1.95).contains(&throw.normalized_reticle_size));
    assert!((0.0..1.0).contains(&throw.spin_modifier));
    assert_eq!(throw.normalized_hit_position, 1.0);
    assert!(throw.hit_pokemon);

    h.session
        .use_capture_item(1001, "spawn-1001", ItemId::RazzBerry)
        .await
        .unwrap();
    let pikachu = h.session.inventory().pokemon(102).unwrap().clone();
    h.session.power_up_pokemon(&pikachu).await.unwrap();
    h.session.evolve_pokemon(&pikachu).await.unwrap();
    assert_eq!(h.session.transfer_pokemon(pikachu.id).await.unwrap().candy_awarded, 1);

    let details = h.session.get_fort("stop-1", 40.7830, -73.9650).await.unwrap();
    assert_eq!(details.fort_id, "stop-1");
    h.session.search_fort("stop-1", 40.7830, -73.9650).await.unwrap();

    let incubator = h.session.inventory().free_incubators()[0].clone();
    let egg = h.session.inventory().eggs()[0].clone();
    h.session.use_egg_incubator(&incubator, &egg).await.unwrap();

    assert!(matches!(
        h.session.extra_data_for_pokemon(&pogo_core::PokemonData {
            pokemon_id: PokemonId(151),
            ..Default::default()
        }),
        Err(SessionError::UnknownPokemon(PokemonId(151)))
    ));
}

#[tokio::test]
async fn cached_settings_and_templates_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let options = SessionOptions {
        cache_path: Some(dir.path().join("cache.json")),
        ..SessionOptions::default()
    };

    let mut first = harness_with(FixtureWorld::default(), options.clone());
    first.session.login(AuthProvider::Ptc, "ash", "pikachu").await.unwrap();
    first.session.start_data_update().await.unwrap();
    assert_eq!(first.transport.count_of(RequestType::DownloadItemTemplates).await, 1);
    assert!(dir.path().join("cache.json").exists());

    let mut second = harness_with(FixtureWorld::default(), options);
    second.store.set(LAST_PROVIDER, Some("ptc")).unwrap();
    second
        .store
        .set_user_credentials(Some(&UserCredentials {
            username: "ash".into(),
            secret: "pikachu".into(),
        }))
        .unwrap();
    assert!(second.session.initialize_session().await.unwrap());
    second.session.start_data_update().await.unwrap();

    assert_eq!(second.transport.count_of(RequestType::DownloadItemTemplates).await, 0);
    assert_eq!(second.transport.count_of(RequestType::DownloadSettings).await, 0);
    assert!(!second.session.templates().is_empty());
}
