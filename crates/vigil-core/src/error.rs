use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to enumerate devices: {0}")]
    DeviceEnumeration(String),

    #[error("failed to build stream: {0}")]
    StreamBuild(String),

    #[error("stream error: {0}")]
    StreamError(String),

    #[error("audio source closed")]
    SourceClosed,

    #[error("failed to persist clip: {0}")]
    ClipWrite(String),
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classifier initialization failed: {0}")]
    InitializationFailed(String),

    #[error("classifier inference failed: {0}")]
    InferenceFailed(String),

    #[error("clip could not be read: {0}")]
    ClipRead(String),

    #[error("classifier engine not found: {0}")]
    EngineNotFound(String),
}

#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("transcription engine failed: {0}")]
    EngineFailed(String),
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("notifier initialization failed: {0}")]
    InitializationFailed(String),

    #[error("failed to send message: {0}")]
    SendFailed(String),

    #[error("notifier not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store failure: {0}")]
    Backend(String),
}
