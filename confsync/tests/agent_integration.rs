//! End-to-end tests for the agent lifecycle.
//!
//! These tests run the real agent against a scripted in-memory
//! configuration client and observe the destination files it materializes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use confsync::agent::{Agent, ClientFactory, ProfileLoader};
use confsync::config::{AppSettings, Profile};
use confsync::remote::{
    ConfigClient, ConfigSnapshot, FetchParams, NotificationUpdate, RemoteError,
};

/// Scripted client: serves fixed data per (appId, namespace) and counts
/// fetches per appId.
struct ScriptedClient {
    data: HashMap<(String, String), HashMap<String, String>>,
    fetches_by_app: Mutex<HashMap<String, usize>>,
    notify_changed: AtomicBool,
}

impl ScriptedClient {
    fn new() -> Self {
        Self {
            data: HashMap::new(),
            fetches_by_app: Mutex::new(HashMap::new()),
            notify_changed: AtomicBool::new(true),
        }
    }

    fn serve(mut self, app_id: &str, namespace: &str, pairs: &[(&str, &str)]) -> Self {
        self.data.insert(
            (app_id.to_string(), namespace.to_string()),
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    fn fetches_for(&self, app_id: &str) -> usize {
        *self
            .fetches_by_app
            .lock()
            .unwrap()
            .get(app_id)
            .unwrap_or(&0)
    }
}

#[async_trait]
impl ConfigClient for ScriptedClient {
    async fn fetch_config(&self, params: &FetchParams) -> Result<ConfigSnapshot, RemoteError> {
        *self
            .fetches_by_app
            .lock()
            .unwrap()
            .entry(params.app_id.clone())
            .or_insert(0) += 1;

        let key = (params.app_id.clone(), params.namespace.clone());
        match self.data.get(&key) {
            Some(configs) => Ok(ConfigSnapshot {
                configs: configs.clone(),
                release_token: Some("rel-1".to_string()),
            }),
            None => Err(RemoteError::Transport(format!(
                "no data scripted for {}/{}",
                params.app_id, params.namespace
            ))),
        }
    }

    async fn fetch_notification(
        &self,
        _params: &FetchParams,
        last: i64,
    ) -> Result<NotificationUpdate, RemoteError> {
        // First poll reports a change, every later poll reports none.
        if self.notify_changed.swap(false, Ordering::SeqCst) {
            Ok(NotificationUpdate {
                changed: true,
                notification_id: last + 1,
            })
        } else {
            Ok(NotificationUpdate {
                changed: false,
                notification_id: last,
            })
        }
    }
}

fn profile_with_app(dir: &Path, app_id: &str, namespaces: &[&str], all_in_one: bool) -> Profile {
    let mut profile = Profile::default();
    profile.server.address = "http://config.example:8080".to_string();
    profile.client.all_in_one = all_in_one;
    profile.apps.push(AppSettings {
        app_id: app_id.to_string(),
        namespaces: namespaces.iter().map(|ns| ns.to_string()).collect(),
        poll_interval_secs: 1,
        ..AppSettings::default()
    });
    profile.apps[0].in_one.filename = dir.join(format!("{app_id}.env"));
    profile
}

fn static_loader(profile: Profile) -> ProfileLoader {
    Box::new(move || Ok(profile.clone()))
}

fn factory_for(client: Arc<ScriptedClient>) -> ClientFactory {
    Box::new(move |_profile| Ok(Arc::clone(&client) as Arc<dyn ConfigClient>))
}

async fn wait_for_file(path: &Path) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !path.exists() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("file {} never appeared", path.display()));
}

#[tokio::test]
async fn test_all_in_one_materializes_after_every_namespace_reports() {
    let dir = TempDir::new().unwrap();
    let client = Arc::new(
        ScriptedClient::new()
            .serve("x", "a.properties", &[("k1", "v1")])
            .serve("x", "b.yml", &[("k2", "v2")]),
    );

    let profile = profile_with_app(dir.path(), "x", &["a.properties", "b.yml"], true);
    let target = profile.apps[0].in_one.filename.clone();

    let agent = Agent::new(static_loader(profile), factory_for(Arc::clone(&client)));
    let handle = agent.signal_handle();
    let run = tokio::spawn(agent.run());

    wait_for_file(&target).await;
    assert_eq!(
        std::fs::read_to_string(&target).unwrap(),
        "###a###\nk1=v1\n\n###b###\nk2=v2\n\n"
    );

    handle.request_stop();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("agent must stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_broken_namespace_blocks_all_in_one_write() {
    let dir = TempDir::new().unwrap();
    // Only one of the two namespaces ever fetches successfully.
    let client = Arc::new(ScriptedClient::new().serve("x", "a.properties", &[("k1", "v1")]));

    let profile = profile_with_app(dir.path(), "x", &["a.properties", "broken.yml"], true);
    let target = profile.apps[0].in_one.filename.clone();

    let agent = Agent::new(static_loader(profile), factory_for(Arc::clone(&client)));
    let handle = agent.signal_handle();
    let run = tokio::spawn(agent.run());

    // Give the poller several rounds; the gate must hold with a namespace
    // permanently missing.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!target.exists());

    handle.request_stop();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("agent must stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_per_namespace_mode_writes_separate_files() {
    let dir = TempDir::new().unwrap();
    let client = Arc::new(
        ScriptedClient::new()
            .serve("x", "mysql.properties", &[("host", "db1")])
            .serve("x", "redis.yml", &[("content", "port: 6379\n")]),
    );

    let profile = profile_with_app(
        dir.path(),
        "x",
        &["mysql.properties", "redis.yml"],
        false,
    );

    let agent = Agent::new(static_loader(profile), factory_for(Arc::clone(&client)));
    let handle = agent.signal_handle();
    let run = tokio::spawn(agent.run());

    let mysql_target = dir.path().join("mysql.env");
    let redis_target = dir.path().join("redis.yml");
    wait_for_file(&mysql_target).await;
    wait_for_file(&redis_target).await;

    assert_eq!(
        std::fs::read_to_string(&mysql_target).unwrap(),
        "host=db1\n"
    );
    assert_eq!(
        std::fs::read_to_string(&redis_target).unwrap(),
        "port: 6379\n"
    );

    handle.request_stop();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("agent must stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_watch_mode_fetches_on_notification() {
    let dir = TempDir::new().unwrap();
    let client = Arc::new(ScriptedClient::new().serve("x", "a.properties", &[("k1", "v1")]));

    let mut profile = profile_with_app(dir.path(), "x", &["a.properties"], true);
    profile.client.poll_or_watch = "watch".to_string();
    let target = profile.apps[0].in_one.filename.clone();

    let agent = Agent::new(static_loader(profile), factory_for(Arc::clone(&client)));
    let handle = agent.signal_handle();
    let run = tokio::spawn(agent.run());

    wait_for_file(&target).await;
    assert_eq!(
        std::fs::read_to_string(&target).unwrap(),
        "###a###\nk1=v1\n\n"
    );

    handle.request_stop();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("agent must stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_restart_swaps_worker_population_to_new_profile() {
    let dir = TempDir::new().unwrap();
    let client = Arc::new(
        ScriptedClient::new()
            .serve("old-app", "a.properties", &[("k1", "v1")])
            .serve("new-app", "b.properties", &[("k2", "v2")]),
    );

    let old_profile = profile_with_app(dir.path(), "old-app", &["a.properties"], true);
    let new_profile = profile_with_app(dir.path(), "new-app", &["b.properties"], true);
    let old_target = old_profile.apps[0].in_one.filename.clone();
    let new_target = new_profile.apps[0].in_one.filename.clone();

    // The loader serves the old profile first, the new one on reload.
    let loads = Arc::new(AtomicUsize::new(0));
    let loads_in_loader = Arc::clone(&loads);
    let loader: ProfileLoader = Box::new(move || {
        if loads_in_loader.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(old_profile.clone())
        } else {
            Ok(new_profile.clone())
        }
    });

    let agent = Agent::new(loader, factory_for(Arc::clone(&client)));
    let handle = agent.signal_handle();
    let run = tokio::spawn(agent.run());

    wait_for_file(&old_target).await;

    handle.request_restart();
    wait_for_file(&new_target).await;

    // The removed application must have no worker left: its fetch count
    // settles once the new generation is up.
    let old_fetches = client.fetches_for("old-app");
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(
        client.fetches_for("old-app"),
        old_fetches,
        "a removed application must not be fetched after restart"
    );
    assert!(client.fetches_for("new-app") > 0);

    handle.request_stop();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("agent must stop")
        .unwrap()
        .unwrap();
}
