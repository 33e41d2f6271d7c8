use crate::dto::HealthRes;

/// Simple health service for load balancer checks
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Static health check; the service is healthy whenever it can answer.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Tiny CM is alive".into(),
        }
    }
}
