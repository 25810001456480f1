#[derive(Debug, Clone, Default)]
pub struct AccrualConfig {
    pub base_url: String,
}

impl AccrualConfig {
    /// Creates a config for an accrual service rooted at `base_url`, e.g. `http://localhost:8080`.
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn order_url(&self, number: &str) -> String {
        format!("{}/api/orders/{number}", self.base_url)
    }
}
