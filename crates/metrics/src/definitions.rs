//! Metric name and label definitions.
//!
//! Centralizing these keeps names consistent between the crates that record
//! them and the dashboards that read them.

/// Outbound reply normalization metrics
pub mod auto_reply {
    /// Replies that made it through normalization
    pub const REPLIES_NORMALIZED_TOTAL: &str = "courier_auto_reply_replies_normalized_total";
    /// Replies suppressed, by skip reason (empty, silent, heartbeat)
    pub const REPLIES_SKIPPED_TOTAL: &str = "courier_auto_reply_replies_skipped_total";
    /// Heartbeat tokens removed from reply text
    pub const HEARTBEAT_STRIPPED_TOTAL: &str = "courier_auto_reply_heartbeat_stripped_total";
    /// Outbound regex rules skipped because they failed to compile
    pub const OUTBOUND_REGEX_INVALID_TOTAL: &str =
        "courier_auto_reply_outbound_regex_invalid_total";
    /// Channel directives extracted from reply text, by directive name
    pub const DIRECTIVES_PARSED_TOTAL: &str = "courier_auto_reply_directives_parsed_total";
}

/// Common label keys
pub mod labels {
    pub const REASON: &str = "reason";
    pub const DIRECTIVE: &str = "directive";
}
