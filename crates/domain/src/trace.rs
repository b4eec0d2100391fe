use serde::Serialize;

/// Structured trace events emitted across all Recurra crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    TemplateCreated {
        template_id: String,
        start_date: String,
        next_due_date: String,
    },
    OccurrencePosted {
        template_id: String,
        record_id: String,
        intended_date: String,
        occurrence_date: String,
        next_due_date: String,
        posted_count: u32,
    },
    OccurrenceSkipped {
        template_id: String,
        skipped_date: String,
        next_due_date: String,
    },
    ScheduleStatusChanged {
        template_id: String,
        from: String,
        to: String,
    },
    ScheduleCompleted {
        template_id: String,
        posted_count: u32,
    },
    ScheduleStalled {
        template_id: String,
        at: String,
    },
    CatchUpOverflow {
        template_id: String,
        counted: u32,
        budget: u32,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "rc_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let ev = TraceEvent::ScheduleCompleted {
            template_id: "t1".into(),
            posted_count: 3,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "ScheduleCompleted");
        assert_eq!(json["posted_count"], 3);
    }
}
