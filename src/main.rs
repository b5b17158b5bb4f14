use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;
use vigil_alert::{
    AlertOrchestrator, EscalationSignals, Geolocator, LocationTracker, NotifierRegistry,
    NullGeolocator, StaticGeolocator,
};
use vigil_audio::{AmplitudeGate, DeviceManager, MicCapture, RecordingWindow};
use vigil_core::{Clock, Contact, SystemClock};
use vigil_detect::{ClassificationAdapter, ClassifierRegistry, NullTranscriber};
use vigil_monitor::{AudioMonitor, KeywordListener, ListenerSettings, MonitorSettings};
use vigil_store::{MemoryStore, RecordStore};

#[derive(Parser)]
#[command(name = "vigil", about = "Personal-safety audio guard")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

/// Presentation signal sink for headless runs: status text in the log.
struct StatusSignals;

impl EscalationSignals for StatusSignals {
    fn escalation_started(&self) {
        tracing::info!("status: emergency active, sharing location");
    }

    fn escalation_ended(&self) {
        tracing::info!("status: ready");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = vigil_core::AppConfig::load_from_file(&cli.config)
        .with_context(|| format!("failed to load config from {:?}", cli.config))?;

    let env_filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::Registry::default().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false),
    );
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    tracing::info!("vigil starting");

    std::fs::create_dir_all(&config.storage.data_dir)
        .with_context(|| format!("failed to create data dir {:?}", config.storage.data_dir))?;

    let user_id = config.general.user_id;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Guardian records seeded from config
    let store = Arc::new(MemoryStore::new());
    for guardian in &config.guardian {
        store
            .add_guardian(user_id, Contact::new(&guardian.name, &guardian.number))
            .await
            .context("failed to seed guardian record")?;
    }
    if config.guardian.is_empty() {
        tracing::warn!("no guardians configured; alerts will have no one to notify");
    }
    let store = store as Arc<dyn RecordStore>;

    // Classifier engine
    let classifier_registry = ClassifierRegistry::new();
    let mut classifier = classifier_registry
        .create(&config.classifier.engine)
        .with_context(|| format!("unknown classifier engine '{}'", config.classifier.engine))?;
    classifier
        .initialize(config.classifier.extra.clone())
        .await
        .with_context(|| {
            format!(
                "failed to initialize classifier engine '{}'",
                config.classifier.engine
            )
        })?;
    tracing::info!("classifier engine '{}' active", config.classifier.engine);

    // Notifier
    let notifier_registry = NotifierRegistry::new();
    let mut notifier = notifier_registry
        .create(&config.alert.notifier)
        .with_context(|| format!("unknown notifier '{}'", config.alert.notifier))?;
    let notifier_config = match &config.alert.notifier_config {
        Some(value) => value.clone(),
        None => {
            // The file notifier gets a sensible default outbox.
            let outbox = PathBuf::from(&config.storage.data_dir).join("outbox.txt");
            let mut table = toml::map::Map::new();
            table.insert(
                "path".to_string(),
                toml::Value::String(outbox.to_string_lossy().to_string()),
            );
            toml::Value::Table(table)
        }
    };
    notifier
        .initialize(notifier_config)
        .await
        .with_context(|| format!("failed to initialize notifier '{}'", config.alert.notifier))?;
    let notifier: Arc<dyn vigil_alert::Notifier> = Arc::from(notifier);
    tracing::info!("notifier '{}' active", config.alert.notifier);

    // Geolocation: a fixed position if configured, otherwise last-known only
    let geolocator: Arc<dyn Geolocator> = match (
        config.location.static_latitude,
        config.location.static_longitude,
    ) {
        (Some(latitude), Some(longitude)) => Arc::new(StaticGeolocator::new(
            latitude,
            longitude,
            Arc::clone(&clock),
        )),
        _ => {
            tracing::warn!("no geolocation provider configured; using stored positions only");
            Arc::new(NullGeolocator)
        }
    };

    let tracker = Arc::new(LocationTracker::new(
        geolocator,
        Arc::clone(&store),
        user_id,
    ));
    let orchestrator = Arc::new(AlertOrchestrator::new(
        Arc::clone(&notifier),
        Arc::new(StatusSignals),
        Arc::clone(&tracker),
        Arc::clone(&clock),
        Duration::from_secs(config.alert.stand_down_seconds),
        Duration::from_secs(config.location.update_interval_seconds),
    ));

    let window = Arc::new(RecordingWindow::new(
        &config.storage.data_dir,
        user_id,
        config.audio.sample_rate,
        config.audio.channels,
        config.audio.chunk_size,
        Arc::clone(&clock),
    ));
    let adapter = Arc::new(ClassificationAdapter::new(
        classifier,
        config.alert.decision_threshold,
    ));

    let device_manager = DeviceManager::new();

    // Keep capture nodes alive for the duration of the program
    let mut _captures = Vec::new();

    let monitor = if config.monitor.enabled {
        let device = device_manager
            .get_input_device(&config.audio.device_name)
            .with_context(|| {
                format!("failed to get input device '{}'", config.audio.device_name)
            })?;
        let (capture, _handle, source) = MicCapture::new(
            &device,
            config.audio.sample_rate,
            config.audio.channels,
            config.audio.chunk_size,
        )
        .context("failed to open capture stream for monitoring")?;
        _captures.push(capture);

        let monitor = AudioMonitor::new(
            AmplitudeGate::new(config.audio.gain, config.monitor.trigger_threshold),
            Arc::clone(&window),
            Arc::clone(&adapter),
            Arc::clone(&store),
            Arc::clone(&tracker),
            Arc::clone(&orchestrator),
            MonitorSettings {
                user_id,
                record_seconds: config.monitor.record_seconds,
                country_code: config.alert.country_code.clone(),
            },
        );
        monitor.start(source);
        Some(monitor)
    } else {
        tracing::info!("passive monitoring disabled by config");
        None
    };

    let listener = if config.listener.enabled {
        let device = device_manager
            .get_input_device(&config.audio.device_name)
            .with_context(|| {
                format!("failed to get input device '{}'", config.audio.device_name)
            })?;
        let (capture, _handle, source) = MicCapture::new(
            &device,
            config.audio.sample_rate,
            config.audio.channels,
            config.audio.chunk_size,
        )
        .context("failed to open capture stream for keyword listening")?;
        _captures.push(capture);

        let listener = KeywordListener::new(
            Arc::clone(&window),
            Arc::clone(&adapter),
            Arc::clone(&store),
            Arc::clone(&tracker),
            Arc::clone(&orchestrator),
            ListenerSettings {
                user_id,
                keyword: config.listener.keyword.clone(),
                min_clip_peak: config.listener.min_clip_peak,
                record_seconds: config.listener.record_seconds,
                cooldown: Duration::from_secs(config.listener.cooldown_seconds),
                phrase_timeout: Duration::from_secs(config.listener.phrase_timeout_seconds),
                country_code: config.alert.country_code.clone(),
                emergency_number: config.alert.emergency_number.clone(),
            },
        );
        // No speech-to-text engine ships with this build; the null
        // transcriber keeps the loop wired for one that does.
        listener.start(NullTranscriber, source);
        Some(listener)
    } else {
        tracing::info!("keyword listening disabled by config");
        None
    };

    tracing::info!("vigil running — press ctrl-c to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to wait for ctrl-c")?;

    tracing::info!("shutting down");
    if let Some(listener) = listener {
        listener.stop().await;
    }
    if let Some(monitor) = monitor {
        monitor.stop().await;
    }
    orchestrator.stop().await;
    if let Err(e) = notifier.shutdown().await {
        tracing::warn!("notifier shutdown failed: {e}");
    }

    Ok(())
}
