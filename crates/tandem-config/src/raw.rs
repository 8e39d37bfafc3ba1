use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawLauncher {
    pub python: Option<String>,
    pub workdir: Option<String>,
    pub grace_period_secs: Option<u64>,
    pub stop_timeout_ms: Option<u64>,
    pub readiness: Option<RawReadiness>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawReadiness {
    pub strategy: Option<RawStrategy>,
    pub attempts: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RawStrategy {
    Fixed,
    Probe,
}
