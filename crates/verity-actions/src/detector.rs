//! Action intent detection
//!
//! Scans user text for trigger phrases. The trigger table is ordered and the
//! first phrase found wins, so "ring mig och skicka sms" is a callback.

use crate::types::{ActionKind, ActionPayload};
use once_cell::sync::Lazy;
use regex::Regex;

/// Default subject for ticket actions
pub const DEFAULT_TICKET_SUBJECT: &str = "Kundsupport";

const DEFAULT_TRIGGERS: &[(&str, ActionKind)] = &[
    ("ring mig", ActionKind::ScheduleCallback),
    ("ring upp", ActionKind::ScheduleCallback),
    ("skicka sms", ActionKind::SendSms),
    ("sms:a", ActionKind::SendSms),
    ("skapa ärende", ActionKind::CreateTicket),
    ("öppna ticket", ActionKind::CreateTicket),
];

static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    match Regex::new(r"\+?[0-9]+[\s-]?[0-9]+[\s-]?[0-9]+[\s-]?[0-9]+[\s-]?[0-9]+") {
        Ok(re) => re,
        Err(e) => unreachable!("static phone pattern failed to compile: {e}"),
    }
});

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| match Regex::new(r"\s+") {
    Ok(re) => re,
    Err(e) => unreachable!("static whitespace pattern failed to compile: {e}"),
});

/// A trigger that fired
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedIntent {
    /// Action the trigger maps to
    pub kind: ActionKind,
    /// Parameters pulled from the text
    pub payload: ActionPayload,
}

/// Trigger-phrase detector
#[derive(Debug, Clone)]
pub struct IntentDetector {
    triggers: Vec<(String, ActionKind)>,
    ticket_subject: String,
}

impl IntentDetector {
    /// Detector with the built-in trigger table
    #[must_use]
    pub fn new() -> Self {
        Self::with_triggers(
            DEFAULT_TRIGGERS.iter().map(|(phrase, kind)| ((*phrase).to_string(), *kind)),
        )
    }

    /// Detector over a custom, ordered trigger table
    #[must_use]
    pub fn with_triggers(triggers: impl IntoIterator<Item = (String, ActionKind)>) -> Self {
        Self {
            triggers: triggers
                .into_iter()
                .map(|(phrase, kind)| (phrase.to_lowercase(), kind))
                .collect(),
            ticket_subject: DEFAULT_TICKET_SUBJECT.to_string(),
        }
    }

    /// With ticket subject
    #[inline]
    #[must_use]
    pub fn with_ticket_subject(mut self, subject: impl Into<String>) -> Self {
        self.ticket_subject = subject.into();
        self
    }

    /// Detect the first trigger phrase in `text`, if any
    #[must_use]
    pub fn detect(&self, text: &str) -> Option<DetectedIntent> {
        let lower = text.to_lowercase();
        let (phrase, kind) = self.triggers.iter().find(|(phrase, _)| lower.contains(phrase.as_str()))?;
        tracing::debug!("Trigger {:?} matched -> {}", phrase, kind);

        let mut payload = ActionPayload::default();
        if let Some(phone) = extract_phone(text) {
            payload.phone = Some(phone);
        }
        if *kind == ActionKind::CreateTicket {
            payload.subject = Some(self.ticket_subject.clone());
        }

        Some(DetectedIntent { kind: *kind, payload })
    }
}

impl Default for IntentDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// First phone-like digit sequence in `text`, whitespace collapsed
#[must_use]
pub fn extract_phone(text: &str) -> Option<String> {
    PHONE_PATTERN
        .find(text)
        .map(|m| WHITESPACE_RUN.replace_all(m.as_str(), " ").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn callback_trigger() {
        let intent = IntentDetector::new().detect("Kan du ring mig?").unwrap();
        assert_eq!(intent.kind, ActionKind::ScheduleCallback);
        assert_eq!(intent.payload, ActionPayload::default());
    }

    #[test]
    fn sms_trigger_is_case_insensitive() {
        let intent = IntentDetector::new().detect("Skicka SMS till mig").unwrap();
        assert_eq!(intent.kind, ActionKind::SendSms);
    }

    #[test]
    fn ticket_gets_default_subject() {
        let intent = IntentDetector::new().detect("Skapa ärende åt mig").unwrap();
        assert_eq!(intent.kind, ActionKind::CreateTicket);
        assert_eq!(intent.payload.subject.as_deref(), Some(DEFAULT_TICKET_SUBJECT));
    }

    #[test]
    fn first_trigger_in_table_wins() {
        let intent = IntentDetector::new()
            .detect("skicka sms eller ring mig")
            .unwrap();
        assert_eq!(intent.kind, ActionKind::ScheduleCallback);
    }

    #[test]
    fn phone_number_lands_in_payload() {
        let intent = IntentDetector::new()
            .detect("Ring mig på +46 8 123 45 67 tack")
            .unwrap();
        assert_eq!(intent.payload.phone.as_deref(), Some("+46 8 123 45 67"));
    }

    #[test]
    fn no_trigger_no_action() {
        assert_eq!(IntentDetector::new().detect("Vad kostar Basic?"), None);
    }

    #[test]
    fn custom_table_and_subject() {
        let detector = IntentDetector::with_triggers([
            ("Call Me".to_string(), ActionKind::ScheduleCallback),
            ("open ticket".to_string(), ActionKind::CreateTicket),
        ])
        .with_ticket_subject("Support");
        assert_eq!(detector.detect("please CALL me").unwrap().kind, ActionKind::ScheduleCallback);
        assert_eq!(
            detector.detect("open ticket").unwrap().payload.subject.as_deref(),
            Some("Support")
        );
        assert_eq!(detector.detect("ring mig"), None);
    }

    #[test]
    fn phone_extraction_collapses_whitespace() {
        assert_eq!(extract_phone("nr 070 123\t45 67").as_deref(), Some("070 123 45 67"));
        assert_eq!(extract_phone("inga siffror"), None);
    }
}
