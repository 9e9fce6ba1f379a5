//! `/health` endpoint.

use std::time::Instant;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the server is up.
    pub status: String,
    pub uptime_secs: u64,
}

pub fn health_check(start_time: Instant) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn serializes_status_and_uptime() {
        let started = Instant::now().checked_sub(Duration::from_secs(90)).unwrap();
        let body = serde_json::to_value(health_check(started)).unwrap();
        assert_eq!(body["status"], "ok");
        assert!(body["uptime_secs"].as_u64().unwrap() >= 89);
        assert_eq!(body.as_object().unwrap().len(), 2);
    }
}
