// Metric descriptions of the coordination layer
// Values are recorded by aira-consistency through the `metrics` facade

use metrics::{describe_counter, describe_gauge};

/// Initialize all metric descriptions
/// Should be called once at application startup
pub fn init_metrics() {
    // Election metrics
    describe_counter!(
        "aira_election_attempts_total",
        "Total number of leader lease acquisition attempts"
    );
    describe_gauge!(
        "aira_election_leader",
        "1 while this process holds the leader lease, 0 otherwise"
    );
    describe_counter!(
        "aira_election_refresh_failures_total",
        "Total number of failed leader lease refreshes"
    );

    // Mutex metrics
    describe_counter!(
        "aira_mutex_acquired_total",
        "Total number of distributed mutex acquisitions"
    );
}
