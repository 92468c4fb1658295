//! Row classification: raw `(key, value)` pairs in, typed emissions out.
//!
//! Every status key goes through [`classify_status`], a single ordered rule
//! match returning a [`Classified`]. Prefix groups come first, then the
//! accumulator keys, then the exact-name tables. Accumulated values are held
//! by [`StatusScan`] until the whole result has been read and are emitted as
//! composite groups by [`StatusScan::finish`].

pub mod tables;

use crate::sink::{Emission, MetricKind};
use tables::{
    ACCUMULATORS, GENERAL, INNODB_METRICS, INNODB_STATUS, Label, PREFIX_RULES, Rule, WSREP,
};

/// Outcome of matching one status key.
#[derive(Clone, Debug, PartialEq)]
pub enum Classified {
    /// No rule matched, or the rule suppresses this value.
    Skip,
    Emit(Emission),
    /// Contribution to a composite group emitted at the end of the scan.
    Accumulate(Slot, i64),
}

/// Members of the composite groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    QcacheHits,
    QcacheInserts,
    QcacheNotCached,
    QcachePrunes,
    QcacheQueries,
    ThreadsRunning,
    ThreadsConnected,
    ThreadsCached,
    ThreadsCreated,
    BytesReceived,
    BytesSent,
}

/// Classify one row of `SHOW [GLOBAL] STATUS`.
///
/// `Innodb_*` keys are only considered when `innodb` is set.
#[must_use]
pub fn classify_status(key: &str, value: &str, innodb: bool) -> Classified {
    let val = parse_counter(value);

    for rule in PREFIX_RULES {
        if let Some(label) = key.strip_prefix(rule.prefix) {
            if rule.skip_zero && val == 0 {
                return Classified::Skip;
            }
            if rule.ignore.is_some_and(|ignored| key.starts_with(ignored)) {
                return Classified::Skip;
            }
            return Classified::Emit(Emission::derive(rule.series, Some(label), val));
        }
    }

    if let Some(slot) = ACCUMULATORS.get(key) {
        return Classified::Accumulate(*slot, val);
    }

    if key.starts_with("Innodb_") {
        if !innodb {
            return Classified::Skip;
        }
        return INNODB_STATUS
            .get(key)
            .map_or(Classified::Skip, |rule| Classified::Emit(emission(rule, key, val)));
    }

    GENERAL
        .get(key)
        .map_or(Classified::Skip, |rule| Classified::Emit(emission(rule, key, val)))
}

/// Classify one row of `information_schema.innodb_metrics`.
#[must_use]
pub fn classify_innodb_metric(name: &str, count: &str) -> Option<Emission> {
    INNODB_METRICS
        .get(name)
        .map(|rule| emission(rule, name, parse_counter(count)))
}

/// Classify one `wsrep_*` status row.
#[must_use]
pub fn classify_wsrep(key: &str, value: &str) -> Option<Emission> {
    WSREP
        .get(key)
        .map(|rule| emission(rule, key, parse_counter(value)))
}

#[allow(clippy::cast_precision_loss)]
fn emission(rule: &Rule, key: &str, val: i64) -> Emission {
    let label = match rule.label {
        Label::None => None,
        Label::Key => Some(key),
        Label::Fixed(label) => Some(label),
    };
    match rule.kind {
        MetricKind::Gauge => Emission::gauge(rule.series, label, val as f64),
        MetricKind::Derive => Emission::derive(rule.series, label, val),
    }
}

/// Composite groups collected across one status result.
#[derive(Clone, Debug)]
pub struct Accumulators {
    qcache_hits: i64,
    qcache_inserts: i64,
    qcache_not_cached: i64,
    qcache_prunes: i64,
    qcache_queries: f64,
    threads_running: f64,
    threads_connected: f64,
    threads_cached: f64,
    threads_created: i64,
    bytes_received: i64,
    bytes_sent: i64,
}

impl Default for Accumulators {
    fn default() -> Self {
        Self {
            qcache_hits: 0,
            qcache_inserts: 0,
            qcache_not_cached: 0,
            qcache_prunes: 0,
            qcache_queries: f64::NAN,
            threads_running: f64::NAN,
            threads_connected: f64::NAN,
            threads_cached: f64::NAN,
            threads_created: 0,
            bytes_received: 0,
            bytes_sent: 0,
        }
    }
}

impl Accumulators {
    #[allow(clippy::cast_precision_loss)]
    pub fn record(&mut self, slot: Slot, val: i64) {
        match slot {
            Slot::QcacheHits => self.qcache_hits = val,
            Slot::QcacheInserts => self.qcache_inserts = val,
            Slot::QcacheNotCached => self.qcache_not_cached = val,
            Slot::QcachePrunes => self.qcache_prunes = val,
            Slot::QcacheQueries => self.qcache_queries = val as f64,
            Slot::ThreadsRunning => self.threads_running = val as f64,
            Slot::ThreadsConnected => self.threads_connected = val as f64,
            Slot::ThreadsCached => self.threads_cached = val as f64,
            Slot::ThreadsCreated => self.threads_created = val,
            Slot::BytesReceived => self.bytes_received = val,
            Slot::BytesSent => self.bytes_sent = val,
        }
    }

    /// Emit the groups: query cache only if one of its counters moved, threads
    /// only if `Threads_created` is non-zero, traffic always.
    #[must_use]
    pub fn finish(&self) -> Vec<Emission> {
        let mut out = Vec::with_capacity(11);

        if self.qcache_hits != 0
            || self.qcache_inserts != 0
            || self.qcache_not_cached != 0
            || self.qcache_prunes != 0
        {
            out.push(Emission::derive("cache_result", Some("qcache-hits"), self.qcache_hits));
            out.push(Emission::derive("cache_result", Some("qcache-inserts"), self.qcache_inserts));
            out.push(Emission::derive(
                "cache_result",
                Some("qcache-not_cached"),
                self.qcache_not_cached,
            ));
            out.push(Emission::derive("cache_result", Some("qcache-prunes"), self.qcache_prunes));
            out.push(Emission::gauge("cache_size", Some("qcache"), self.qcache_queries));
        }

        if self.threads_created != 0 {
            out.push(Emission::gauge("threads", Some("running"), self.threads_running));
            out.push(Emission::gauge("threads", Some("connected"), self.threads_connected));
            out.push(Emission::gauge("threads", Some("cached"), self.threads_cached));
            out.push(Emission::derive("total_threads", Some("created"), self.threads_created));
        }

        out.push(Emission::derive("mysql_octets", Some("rx"), self.bytes_received));
        out.push(Emission::derive("mysql_octets", Some("tx"), self.bytes_sent));

        out
    }
}

/// Scan state for one status result.
#[derive(Debug, Default)]
pub struct StatusScan {
    innodb: bool,
    emissions: Vec<Emission>,
    accumulators: Accumulators,
}

impl StatusScan {
    #[must_use]
    pub fn new(innodb: bool) -> Self {
        Self {
            innodb,
            ..Self::default()
        }
    }

    pub fn observe(&mut self, key: &str, value: &str) {
        match classify_status(key, value, self.innodb) {
            Classified::Skip => {}
            Classified::Emit(emission) => self.emissions.push(emission),
            Classified::Accumulate(slot, val) => self.accumulators.record(slot, val),
        }
    }

    /// Row emissions in arrival order, followed by the composite groups.
    #[must_use]
    pub fn finish(self) -> Vec<Emission> {
        let mut out = self.emissions;
        out.extend(self.accumulators.finish());
        out
    }
}

/// Integer prefix of `value` (leading whitespace and sign allowed), 0 if there
/// is none. Out-of-range values saturate.
#[must_use]
pub fn parse_counter(value: &str) -> i64 {
    let s = value.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, s.get(1..).unwrap_or("")),
        Some(b'+') => (false, s.get(1..).unwrap_or("")),
        _ => (false, s),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let digits = digits.get(..end).unwrap_or("");
    if digits.is_empty() {
        return 0;
    }

    match digits.parse::<i64>() {
        Ok(v) if negative => -v,
        Ok(v) => v,
        Err(_) if negative => i64::MIN,
        Err(_) => i64::MAX,
    }
}

/// Floating point prefix of `value`, 0.0 if there is none.
#[must_use]
pub fn parse_gauge(value: &str) -> f64 {
    let s = value.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;

    if matches!(bytes.first(), Some(b'-' | b'+')) {
        end = 1;
    }
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }

    if !seen_digit {
        return 0.0;
    }
    s.get(..end)
        .and_then(|prefix| prefix.parse::<f64>().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::Value;

    fn scan(rows: &[(&str, &str)], innodb: bool) -> Vec<Emission> {
        let mut scan = StatusScan::new(innodb);
        for (k, v) in rows {
            scan.observe(k, v);
        }
        scan.finish()
    }

    fn series<'a>(emissions: &'a [Emission], name: &str) -> Vec<&'a Emission> {
        emissions.iter().filter(|e| e.series == name).collect()
    }

    #[test]
    fn test_com_zero_is_suppressed() {
        assert_eq!(classify_status("Com_select", "0", false), Classified::Skip);
        assert_eq!(
            classify_status("Com_select", "42", false),
            Classified::Emit(Emission::derive("mysql_commands", Some("select"), 42))
        );
    }

    #[test]
    fn test_com_stmt_is_ignored() {
        assert_eq!(classify_status("Com_stmt_execute", "12", false), Classified::Skip);
    }

    #[test]
    fn test_handler_zero_is_suppressed() {
        assert_eq!(classify_status("Handler_write", "0", false), Classified::Skip);
        assert_eq!(
            classify_status("Handler_write", "7", false),
            Classified::Emit(Emission::derive("mysql_handler", Some("write"), 7))
        );
    }

    #[test]
    fn test_locks_and_select_keep_zero() {
        assert_eq!(
            classify_status("Table_locks_waited", "0", false),
            Classified::Emit(Emission::derive("mysql_locks", Some("waited"), 0))
        );
        assert_eq!(
            classify_status("Select_scan", "0", false),
            Classified::Emit(Emission::derive("mysql_select", Some("scan"), 0))
        );
    }

    #[test]
    fn test_general_table() {
        assert_eq!(
            classify_status("Sort_merge_passes", "3", false),
            Classified::Emit(Emission::derive("mysql_sort_merge_passes", None, 3))
        );
        assert_eq!(
            classify_status("Sort_scan", "9", false),
            Classified::Emit(Emission::derive("mysql_sort", Some("scan"), 9))
        );
        assert_eq!(
            classify_status("Uptime", "3600", false),
            Classified::Emit(Emission::gauge("uptime", None, 3600.0))
        );
        assert_eq!(
            classify_status("Slow_queries", "2", false),
            Classified::Emit(Emission::derive("mysql_slow_queries", None, 2))
        );
        assert_eq!(classify_status("Aborted_clients", "5", false), Classified::Skip);
    }

    #[test]
    fn test_innodb_gated_by_flag() {
        assert_eq!(
            classify_status("Innodb_buffer_pool_pages_free", "100", false),
            Classified::Skip
        );
        assert_eq!(
            classify_status("Innodb_buffer_pool_pages_free", "100", true),
            Classified::Emit(Emission::gauge("mysql_bpool_pages", Some("free"), 100.0))
        );
        assert_eq!(
            classify_status("Innodb_os_log_written", "2048", true),
            Classified::Emit(Emission::derive("mysql_innodb_log", Some("written"), 2048))
        );
        assert_eq!(classify_status("Innodb_have_atomic_builtins", "ON", true), Classified::Skip);
    }

    #[test]
    fn test_accumulators() {
        assert_eq!(
            classify_status("Qcache_hits", "5", false),
            Classified::Accumulate(Slot::QcacheHits, 5)
        );
        assert_eq!(
            classify_status("Threads_created", "0", false),
            Classified::Accumulate(Slot::ThreadsCreated, 0)
        );
        assert_eq!(classify_status("Qcache_free_blocks", "1", false), Classified::Skip);
    }

    #[test]
    fn test_idle_groups_are_suppressed() {
        let out = scan(
            &[
                ("Qcache_hits", "0"),
                ("Qcache_inserts", "0"),
                ("Qcache_not_cached", "0"),
                ("Qcache_lowmem_prunes", "0"),
                ("Qcache_queries_in_cache", "12"),
                ("Threads_running", "2"),
                ("Threads_created", "0"),
            ],
            false,
        );

        assert!(series(&out, "cache_result").is_empty());
        assert!(series(&out, "cache_size").is_empty());
        assert!(series(&out, "threads").is_empty());
        assert!(series(&out, "total_threads").is_empty());
        assert_eq!(series(&out, "mysql_octets").len(), 2);
    }

    #[test]
    fn test_active_groups_emit_all_members() {
        let out = scan(
            &[
                ("Qcache_not_cached", "4"),
                ("Threads_connected", "8"),
                ("Threads_created", "11"),
                ("Bytes_received", "1000"),
                ("Bytes_sent", "2000"),
            ],
            false,
        );

        let cache = series(&out, "cache_result");
        assert_eq!(cache.len(), 4);
        assert!(cache.contains(&&Emission::derive("cache_result", Some("qcache-hits"), 0)));
        assert!(cache.contains(&&Emission::derive("cache_result", Some("qcache-not_cached"), 4)));

        let size = series(&out, "cache_size");
        assert_eq!(size.len(), 1);
        assert!(matches!(size.first().map(|e| e.value), Some(Value::Gauge(v)) if v.is_nan()));

        let threads = series(&out, "threads");
        assert_eq!(threads.len(), 3);
        assert!(threads.contains(&&Emission::gauge("threads", Some("connected"), 8.0)));

        assert!(out.contains(&Emission::derive("total_threads", Some("created"), 11)));
        assert!(out.contains(&Emission::derive("mysql_octets", Some("rx"), 1000)));
        assert!(out.contains(&Emission::derive("mysql_octets", Some("tx"), 2000)));
    }

    #[test]
    fn test_scan_emits_rows_before_groups() {
        let out = scan(&[("Bytes_sent", "1"), ("Com_insert", "3")], false);
        assert_eq!(
            out.first(),
            Some(&Emission::derive("mysql_commands", Some("insert"), 3))
        );
    }

    #[test]
    fn test_innodb_metrics_table() {
        assert_eq!(
            classify_innodb_metric("lock_deadlocks", "2"),
            Some(Emission::derive("mysql_locks", Some("lock_deadlocks"), 2))
        );
        assert_eq!(
            classify_innodb_metric("buffer_pool_size", "134217728"),
            Some(Emission::gauge("bytes", Some("buffer_pool_size"), 134_217_728.0))
        );
        assert_eq!(classify_innodb_metric("buffer_pages_created", "5"), None);
    }

    #[test]
    fn test_wsrep_table() {
        assert_eq!(
            classify_wsrep("wsrep_cluster_size", "3"),
            Some(Emission::gauge("gauge", Some("wsrep_cluster_size"), 3.0))
        );
        assert_eq!(
            classify_wsrep("wsrep_received_bytes", "4096"),
            Some(Emission::derive("total_bytes", Some("wsrep_received_bytes"), 4096))
        );
        assert_eq!(classify_wsrep("wsrep_cluster_status", "Primary"), None);
    }

    #[test]
    fn test_parse_counter() {
        assert_eq!(parse_counter("42"), 42);
        assert_eq!(parse_counter("  17abc"), 17);
        assert_eq!(parse_counter("-5"), -5);
        assert_eq!(parse_counter("+8"), 8);
        assert_eq!(parse_counter("ON"), 0);
        assert_eq!(parse_counter(""), 0);
        assert_eq!(parse_counter("0.75"), 0);
        assert_eq!(parse_counter("99999999999999999999"), i64::MAX);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_parse_gauge() {
        assert_eq!(parse_gauge("12"), 12.0);
        assert_eq!(parse_gauge("0.5 sec"), 0.5);
        assert_eq!(parse_gauge("-1.25"), -1.25);
        assert_eq!(parse_gauge("abc"), 0.0);
        assert_eq!(parse_gauge("."), 0.0);
        assert_eq!(parse_gauge(""), 0.0);
    }
}
