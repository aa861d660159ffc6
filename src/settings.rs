pub const DEFAULT_METRICS_NAME: &str = "http-metrics";

#[derive(Debug, Clone)]
pub struct HttpMetricsSettings {
    pub name: String,
    /// When set, a repeated completion signal for the same request or response
    /// does not publish a second record.
    pub publish_once_per_request: bool,
}

impl HttpMetricsSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            publish_once_per_request: true,
        }
    }

    pub fn set_publish_once_per_request(&mut self, value: bool) {
        self.publish_once_per_request = value;
    }
}

impl Default for HttpMetricsSettings {
    fn default() -> Self {
        Self::new(DEFAULT_METRICS_NAME)
    }
}
