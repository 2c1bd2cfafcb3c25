// FICHIER : src-app/tests/club_suite.rs

use clubhouse::admin::SchemaRegistry;
use clubhouse::store::file::{FileStore, FileStoreConfig};
use clubhouse::store::memory::MemoryStore;
use clubhouse::store::seed::seed_sample_data;
use clubhouse::store::worker::StoreWorker;
use clubhouse::store::DocumentStore;
use clubhouse::utils::{AppConfig, Arc, Once};

#[path = "club_suite/admin_flow.rs"]
pub mod admin_flow;

#[path = "club_suite/file_engine.rs"]
pub mod file_engine;

#[path = "club_suite/member_flow.rs"]
pub mod member_flow;

#[path = "club_suite/schema_inference.rs"]
pub mod schema_inference;

// --- ENVIRONNEMENT DE TEST (Commun à tous) ---

static INIT: Once = Once::new();

pub struct TestEnv {
    pub config: AppConfig,
    pub store: Arc<dyn DocumentStore>,
    pub registry: Arc<SchemaRegistry>,
    pub _tmp_dir: tempfile::TempDir,
}

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("info")
            .with_test_writer()
            .try_init();
    });
}

/// Base fichier amorcée, servie par le worker (comme le CLI).
pub async fn init_test_env() -> TestEnv {
    init_tracing();

    let tmp_dir = tempfile::tempdir().expect("create temp dir");
    let config = AppConfig::with_data_root(tmp_dir.path());

    let engine = FileStore::create(FileStoreConfig::from_app(&config))
        .await
        .expect("create file store");
    let store: Arc<dyn DocumentStore> = Arc::new(StoreWorker::spawn(Arc::new(engine)));
    seed_sample_data(store.as_ref()).await.expect("seed");

    TestEnv {
        registry: Arc::new(SchemaRegistry::builtin().expect("builtin schemas")),
        config,
        store,
        _tmp_dir: tmp_dir,
    }
}

/// Magasin en mémoire amorcé, pour l'injection de pannes.
pub async fn init_memory_env() -> (Arc<MemoryStore>, Arc<SchemaRegistry>, AppConfig) {
    init_tracing();

    let store = Arc::new(MemoryStore::new());
    seed_sample_data(store.as_ref()).await.expect("seed");
    (
        store,
        Arc::new(SchemaRegistry::builtin().expect("builtin schemas")),
        AppConfig::default(),
    )
}
