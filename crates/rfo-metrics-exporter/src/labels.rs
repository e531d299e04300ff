//! Label values written by the recorder.
//!
//! These are the stable strings dashboards and alerts match on; each enum
//! renders through `as_str`.

/// Placeholder for labels that do not apply (no error, list operations...).
pub const NOT_APPLICABLE: &str = "NA";

/// Outcome of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Fail,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => "SUCCESS",
            Status::Fail => "FAIL",
        }
    }
}

/// Result of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "HEALTHY",
            HealthStatus::Unhealthy => "UNHEALTHY",
        }
    }
}

/// Aspect of a redis/sentinel deployment a health check looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckIndicator {
    RedisReplicaMismatch,
    SentinelReplicaMismatch,
    NoMaster,
    NumberOfMasters,
    SentinelWrongMaster,
    SlaveWrongMaster,
    SentinelNotReady,
    RegexNotFound,
    SentinelNumberInMemoryMismatch,
    RedisSlavesNumberInMemoryMismatch,
    Misc,
}

impl CheckIndicator {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckIndicator::RedisReplicaMismatch => "REDIS_STATEFULSET_REPLICAS_MISMATCH",
            CheckIndicator::SentinelReplicaMismatch => "SENTINEL_DEPLOYMENT_REPLICAS_MISMATCH",
            CheckIndicator::NoMaster => "NO_MASTER_AVAILABLE",
            CheckIndicator::NumberOfMasters => "MASTER_COUNT_IS_NOT_ONE",
            CheckIndicator::SentinelWrongMaster => "SENTINEL_IS_CONFIGURED_WITH_WRONG_MASTER_IP",
            CheckIndicator::SlaveWrongMaster => "SLAVE_IS_CONFIGURED_WITH_WRONG_MASTER_IP",
            CheckIndicator::SentinelNotReady => "SENTINEL_NOT_READY",
            CheckIndicator::RegexNotFound => "SENTINEL_REGEX_NOT_FOUND",
            CheckIndicator::SentinelNumberInMemoryMismatch => "SENTINEL_NUMBER_IN_MEMORY_MISMATCH",
            CheckIndicator::RedisSlavesNumberInMemoryMismatch => {
                "REDIS_SLAVES_NUMBER_IN_MEMORY_MISMATCH"
            }
            CheckIndicator::Misc => "MISC_ERROR",
        }
    }
}

/// Failure classes of orchestration API calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum K8sErrorKind {
    Forbidden,
    Unauthorized,
    NotFound,
    Misc,
}

impl K8sErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            K8sErrorKind::Forbidden => "USER_FORBIDDEN_TO_PERFORM_ACTION",
            K8sErrorKind::Unauthorized => "CLIENT_NOT_AUTHORISED",
            K8sErrorKind::NotFound => "RESOURCE_NOT_FOUND",
            K8sErrorKind::Misc => "MISC_ERROR_CHECK_LOGS",
        }
    }

    /// Map an HTTP status code returned by the API server.
    pub fn from_status_code(code: u16) -> Self {
        match code {
            401 => K8sErrorKind::Unauthorized,
            403 => K8sErrorKind::Forbidden,
            404 => K8sErrorKind::NotFound,
            _ => K8sErrorKind::Misc,
        }
    }
}

/// Failure classes of connections/commands against redis or sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedisErrorKind {
    WrongPassword,
    NoAuth,
    NoPerm,
    IoTimeout,
    ConnectionRefused,
    Misc,
}

impl RedisErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RedisErrorKind::WrongPassword => "WRONG_PASSWORD_USED",
            RedisErrorKind::NoAuth => "AUTH_CREDENTIALS_NOT_PROVIDED",
            RedisErrorKind::NoPerm => "REDIS_USER_DOES_NOT_HAVE_PERMISSIONS",
            RedisErrorKind::IoTimeout => "CONNECTION_TIMEDOUT",
            RedisErrorKind::ConnectionRefused => "CONNECTION_REFUSED",
            RedisErrorKind::Misc => "MISC_ERROR",
        }
    }

    /// Classify a redis client error message.
    pub fn classify(message: &str) -> Self {
        let m = message.to_ascii_lowercase();
        if m.contains("wrongpass") || m.contains("invalid password") {
            RedisErrorKind::WrongPassword
        } else if m.contains("noauth") {
            RedisErrorKind::NoAuth
        } else if m.contains("noperm") {
            RedisErrorKind::NoPerm
        } else if m.contains("i/o timeout") || m.contains("timed out") {
            RedisErrorKind::IoTimeout
        } else if m.contains("connection refused") {
            RedisErrorKind::ConnectionRefused
        } else {
            RedisErrorKind::Misc
        }
    }
}

/// Which process an instance operation targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceKind {
    Redis,
    Sentinel,
}

impl InstanceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InstanceKind::Redis => "REDIS",
            InstanceKind::Sentinel => "SENTINEL",
        }
    }
}

/// Operations performed against redis/sentinel instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedisOperation {
    ApplyRedisConfig,
    ApplyExternalMaster,
    ApplySentinelConfig,
    MonitorRedisWithPort,
    ResetSentinel,
    GetNumSentinelsInMem,
    GetNumRedisSlavesInMem,
    GetSlaveOf,
    IsMaster,
    MakeMaster,
    MakeSlaveOf,
    GetSentinelMonitor,
    CheckSentinelQuorum,
    SlaveIsReady,
}

impl RedisOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            RedisOperation::ApplyRedisConfig => "APPLY_REDIS_CONFIG",
            RedisOperation::ApplyExternalMaster => "APPLY_EXT_MASTER_ALL",
            RedisOperation::ApplySentinelConfig => "APPLY_SENTINEL_CONFIG",
            RedisOperation::MonitorRedisWithPort => "SET_SENTINEL_TO_MONITOR_REDIS_WITH_GIVEN_PORT",
            RedisOperation::ResetSentinel => "RESET_ALL_SENTINEL_CONFIG",
            RedisOperation::GetNumSentinelsInMem => "GET_NUMBER_OF_SENTINELS_IN_MEMORY",
            RedisOperation::GetNumRedisSlavesInMem => "GET_NUMBER_OF_REDIS_SLAVES_IN_MEMORY",
            RedisOperation::GetSlaveOf => "GET_MASTER_OF_GIVEN_SLAVE_INSTANCE",
            RedisOperation::IsMaster => "CHECK_IF_INSTANCE_IS_MASTER",
            RedisOperation::MakeMaster => "MAKE_INSTANCE_AS_MASTER",
            RedisOperation::MakeSlaveOf => "MAKE_SLAVE_OF_GIVEN_MASTER_INSTANCE",
            RedisOperation::GetSentinelMonitor => "SENTINEL_GET_MASTER_INSTANCE",
            RedisOperation::CheckSentinelQuorum => "SENTINEL_CKQUORUM",
            RedisOperation::SlaveIsReady => "CHECK_IF_SLAVE_IS_READY",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_redis_errors() {
        assert_eq!(
            RedisErrorKind::classify("WRONGPASS invalid username-password pair"),
            RedisErrorKind::WrongPassword
        );
        assert_eq!(
            RedisErrorKind::classify("NOAUTH Authentication required."),
            RedisErrorKind::NoAuth
        );
        assert_eq!(
            RedisErrorKind::classify(
                "NOPERM this user has no permissions to run the 'config' command"
            ),
            RedisErrorKind::NoPerm
        );
        assert_eq!(
            RedisErrorKind::classify("dial tcp 10.0.0.5:6379: i/o timeout"),
            RedisErrorKind::IoTimeout
        );
        assert_eq!(
            RedisErrorKind::classify("dial tcp 10.0.0.5:6379: connect: connection refused"),
            RedisErrorKind::ConnectionRefused
        );
        assert_eq!(RedisErrorKind::classify("ERR unknown"), RedisErrorKind::Misc);
    }

    #[test]
    fn k8s_status_codes() {
        assert_eq!(K8sErrorKind::from_status_code(403), K8sErrorKind::Forbidden);
        assert_eq!(K8sErrorKind::from_status_code(404).as_str(), "RESOURCE_NOT_FOUND");
        assert_eq!(K8sErrorKind::from_status_code(500), K8sErrorKind::Misc);
    }
}
