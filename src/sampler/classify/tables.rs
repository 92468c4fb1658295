//! Static classification tables, built once and shared by every instance.

use super::Slot;
use crate::sink::MetricKind::{self, Derive, Gauge};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Label attached to the emission of a matched key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Label {
    /// The series stands alone.
    None,
    /// The raw key itself.
    Key,
    Fixed(&'static str),
}

/// Where an exactly-matched key ends up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rule {
    pub series: &'static str,
    pub label: Label,
    pub kind: MetricKind,
}

const fn rule(series: &'static str, label: &'static str, kind: MetricKind) -> Rule {
    Rule {
        series,
        label: Label::Fixed(label),
        kind,
    }
}

const fn unlabeled(series: &'static str, kind: MetricKind) -> Rule {
    Rule {
        series,
        label: Label::None,
        kind,
    }
}

const fn keyed(series: &'static str, kind: MetricKind) -> Rule {
    Rule {
        series,
        label: Label::Key,
        kind,
    }
}

/// Status keys sharing a prefix; the rest of the key is the label.
pub struct PrefixRule {
    pub prefix: &'static str,
    pub series: &'static str,
    pub skip_zero: bool,
    /// Keys starting with this are dropped entirely.
    pub ignore: Option<&'static str>,
}

pub const PREFIX_RULES: &[PrefixRule] = &[
    PrefixRule {
        prefix: "Com_",
        series: "mysql_commands",
        skip_zero: true,
        ignore: Some("Com_stmt_"),
    },
    PrefixRule {
        prefix: "Handler_",
        series: "mysql_handler",
        skip_zero: true,
        ignore: None,
    },
    PrefixRule {
        prefix: "Table_locks_",
        series: "mysql_locks",
        skip_zero: false,
        ignore: None,
    },
    PrefixRule {
        prefix: "Select_",
        series: "mysql_select",
        skip_zero: false,
        ignore: None,
    },
];

pub static ACCUMULATORS: Lazy<HashMap<&'static str, Slot>> = Lazy::new(|| {
    HashMap::from([
        ("Qcache_hits", Slot::QcacheHits),
        ("Qcache_inserts", Slot::QcacheInserts),
        ("Qcache_not_cached", Slot::QcacheNotCached),
        ("Qcache_lowmem_prunes", Slot::QcachePrunes),
        ("Qcache_queries_in_cache", Slot::QcacheQueries),
        ("Threads_running", Slot::ThreadsRunning),
        ("Threads_connected", Slot::ThreadsConnected),
        ("Threads_cached", Slot::ThreadsCached),
        ("Threads_created", Slot::ThreadsCreated),
        ("Bytes_received", Slot::BytesReceived),
        ("Bytes_sent", Slot::BytesSent),
    ])
});

/// Exact status keys outside any prefix group.
pub static GENERAL: Lazy<HashMap<&'static str, Rule>> = Lazy::new(|| {
    HashMap::from([
        ("Sort_merge_passes", unlabeled("mysql_sort_merge_passes", Derive)),
        ("Sort_rows", unlabeled("mysql_sort_rows", Derive)),
        ("Sort_range", rule("mysql_sort", "range", Derive)),
        ("Sort_scan", rule("mysql_sort", "scan", Derive)),
        ("Slow_queries", unlabeled("mysql_slow_queries", Derive)),
        ("Uptime", unlabeled("uptime", Gauge)),
        ("Questions", unlabeled("questions", Gauge)),
    ])
});

/// `Innodb_*` keys of `SHOW GLOBAL STATUS`.
pub static INNODB_STATUS: Lazy<HashMap<&'static str, Rule>> = Lazy::new(|| {
    HashMap::from([
        // buffer pool
        ("Innodb_buffer_pool_pages_data", rule("mysql_bpool_pages", "data", Gauge)),
        ("Innodb_buffer_pool_pages_dirty", rule("mysql_bpool_pages", "dirty", Gauge)),
        ("Innodb_buffer_pool_pages_free", rule("mysql_bpool_pages", "free", Gauge)),
        ("Innodb_buffer_pool_pages_misc", rule("mysql_bpool_pages", "misc", Gauge)),
        ("Innodb_buffer_pool_pages_total", rule("mysql_bpool_pages", "total", Gauge)),
        ("Innodb_buffer_pool_pages_flushed", rule("mysql_bpool_counters", "pages_flushed", Derive)),
        ("Innodb_buffer_pool_read_ahead_rnd", rule("mysql_bpool_counters", "read_ahead_rnd", Derive)),
        ("Innodb_buffer_pool_read_ahead", rule("mysql_bpool_counters", "read_ahead", Derive)),
        ("Innodb_buffer_pool_read_ahead_evicted", rule("mysql_bpool_counters", "read_ahead_evicted", Derive)),
        ("Innodb_buffer_pool_read_requests", rule("mysql_bpool_counters", "read_requests", Derive)),
        ("Innodb_buffer_pool_reads", rule("mysql_bpool_counters", "reads", Derive)),
        ("Innodb_buffer_pool_wait_free", rule("mysql_bpool_counters", "wait_free", Derive)),
        ("Innodb_buffer_pool_write_requests", rule("mysql_bpool_counters", "write_requests", Derive)),
        ("Innodb_buffer_pool_bytes_data", rule("mysql_bpool_bytes", "data", Gauge)),
        ("Innodb_buffer_pool_bytes_dirty", rule("mysql_bpool_bytes", "dirty", Gauge)),
        // data
        ("Innodb_data_fsyncs", rule("mysql_innodb_data", "fsyncs", Derive)),
        ("Innodb_data_read", rule("mysql_innodb_data", "read", Derive)),
        ("Innodb_data_reads", rule("mysql_innodb_data", "reads", Derive)),
        ("Innodb_data_writes", rule("mysql_innodb_data", "writes", Derive)),
        ("Innodb_data_written", rule("mysql_innodb_data", "written", Derive)),
        // doublewrite
        ("Innodb_dblwr_writes", rule("mysql_innodb_dblwr", "writes", Derive)),
        ("Innodb_dblwr_pages_written", rule("mysql_innodb_dblwr", "written", Derive)),
        ("Innodb_dblwr_page_size", rule("mysql_innodb_dblwr", "page_size", Gauge)),
        // log
        ("Innodb_log_waits", rule("mysql_innodb_log", "waits", Derive)),
        ("Innodb_log_write_requests", rule("mysql_innodb_log", "write_requests", Derive)),
        ("Innodb_log_writes", rule("mysql_innodb_log", "writes", Derive)),
        ("Innodb_os_log_fsyncs", rule("mysql_innodb_log", "fsyncs", Derive)),
        ("Innodb_os_log_written", rule("mysql_innodb_log", "written", Derive)),
        // pages
        ("Innodb_pages_created", rule("mysql_innodb_pages", "created", Derive)),
        ("Innodb_pages_read", rule("mysql_innodb_pages", "read", Derive)),
        ("Innodb_pages_written", rule("mysql_innodb_pages", "written", Derive)),
        // row lock
        ("Innodb_row_lock_time", rule("mysql_innodb_row_lock", "time", Derive)),
        ("Innodb_row_lock_waits", rule("mysql_innodb_row_lock", "waits", Derive)),
        // rows
        ("Innodb_rows_deleted", rule("mysql_innodb_rows", "deleted", Derive)),
        ("Innodb_rows_inserted", rule("mysql_innodb_rows", "inserted", Derive)),
        ("Innodb_rows_read", rule("mysql_innodb_rows", "read", Derive)),
        ("Innodb_rows_updated", rule("mysql_innodb_rows", "updated", Derive)),
    ])
});

/// `information_schema.innodb_metrics` names; the name is the label.
pub static INNODB_METRICS: Lazy<HashMap<&'static str, Rule>> = Lazy::new(|| {
    let operations = keyed("operations", Derive);
    HashMap::from([
        ("metadata_mem_pool_size", keyed("bytes", Gauge)),
        ("lock_deadlocks", keyed("mysql_locks", Derive)),
        ("lock_timeouts", keyed("mysql_locks", Derive)),
        ("lock_row_lock_current_waits", keyed("mysql_locks", Derive)),
        ("buffer_pool_size", keyed("bytes", Gauge)),
        ("os_log_bytes_written", operations),
        ("os_log_pending_fsyncs", operations),
        ("os_log_pending_writes", operations),
        ("trx_rseg_history_len", keyed("gauge", Gauge)),
        ("adaptive_hash_searches", operations),
        ("file_num_open_files", keyed("gauge", Gauge)),
        ("ibuf_merges_insert", operations),
        ("ibuf_merges_delete_mark", operations),
        ("ibuf_merges_delete", operations),
        ("ibuf_merges_discard_insert", operations),
        ("ibuf_merges_discard_delete_mark", operations),
        ("ibuf_merges_discard_delete", operations),
        ("ibuf_merges_discard_merges", operations),
        ("ibuf_size", keyed("bytes", Gauge)),
        ("innodb_activity_count", keyed("gauge", Gauge)),
        ("innodb_rwlock_s_spin_waits", operations),
        ("innodb_rwlock_x_spin_waits", operations),
        ("innodb_rwlock_s_spin_rounds", operations),
        ("innodb_rwlock_x_spin_rounds", operations),
        ("innodb_rwlock_s_os_waits", operations),
        ("innodb_rwlock_x_os_waits", operations),
        ("dml_reads", operations),
        ("dml_inserts", operations),
        ("dml_deletes", operations),
        ("dml_updates", operations),
    ])
});

/// Galera `wsrep_*` status keys; the full key is the label.
pub static WSREP: Lazy<HashMap<&'static str, Rule>> = Lazy::new(|| {
    let operations = keyed("operations", Derive);
    HashMap::from([
        ("wsrep_apply_oooe", operations),
        ("wsrep_apply_oool", operations),
        ("wsrep_causal_reads", operations),
        ("wsrep_commit_oooe", operations),
        ("wsrep_commit_oool", operations),
        ("wsrep_flow_control_recv", operations),
        ("wsrep_flow_control_sent", operations),
        ("wsrep_flow_control_paused", operations),
        ("wsrep_local_bf_aborts", operations),
        ("wsrep_local_cert_failures", operations),
        ("wsrep_local_commits", operations),
        ("wsrep_local_replays", operations),
        ("wsrep_received", operations),
        ("wsrep_replicated", operations),
        ("wsrep_received_bytes", keyed("total_bytes", Derive)),
        ("wsrep_replicated_bytes", keyed("total_bytes", Derive)),
        ("wsrep_apply_window", keyed("gauge", Gauge)),
        ("wsrep_commit_window", keyed("gauge", Gauge)),
        ("wsrep_cluster_size", keyed("gauge", Gauge)),
        ("wsrep_cert_deps_distance", keyed("gauge", Gauge)),
        ("wsrep_local_recv_queue", keyed("queue_length", Gauge)),
        ("wsrep_local_send_queue", keyed("queue_length", Gauge)),
    ])
});
