pub trait Configuration: Clone + Send + Sync + 'static {
    fn port(&self) -> u16;
    fn admin_password(&self) -> String;
    fn database_url(&self) -> Option<String>;
    /// Upper bound in bytes for request bodies copied into the request log.
    fn request_log_body_limit(&self) -> usize;
}
