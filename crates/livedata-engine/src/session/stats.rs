use serde::Serialize;

/// Counters describing what a session did with its notifications
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Store notifications received while active
    pub notifications: u64,
    /// Transitions discarded by the change detector
    pub no_op_transitions: u64,
    /// Re-executions whose result equalled the last delivered one
    pub same_result_suppressions: u64,
    /// Buffered results replaced before the consumer pulled them
    pub coalesced_overwrites: u64,
    /// Items handed to the consumer, including the initial result
    pub deliveries: u64,
}
