//! Scripted demo generator
//!
//! Stands in for a real model: picks a canned answer by topic, streams it
//! word by word with randomized pacing, and can be made to hallucinate
//! numbers so the grounding check has something to reject.

use crate::error::GenerationError;
use crate::generator::TokenGenerator;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const PRICING_ANSWER: &str = "Basic kostar 99 kr/månad, Standard 199 kr, Premium 399 kr.";
const WITHDRAWAL_ANSWER: &str = "Privatpersoner har 30 dagars ångerrätt.";
const CONTACT_ANSWER: &str = "Ring +46 8 123 45 67, öppet 08:00-18:00.";
const UNKNOWN_ANSWER: &str = "Jag vet inte svaret på den frågan.";

const HALLUCINATED_PRICING: &str = "Basic kostar 75 kr/månad med 75% rabatt just nu!";
const HALLUCINATED_CONTACT: &str = "Ring +46 8 999 00 11, öppet dygnet runt!";
const HALLUCINATED_DEFAULT: &str = "Vi erbjuder 90% rabatt och 24/7 support på alla planer!";

/// Word that forces a hallucinated answer
const HALLUCINATE_TRIGGER: &str = "hallucinate";

/// Pacing and misbehaviour of the scripted generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptedConfig {
    /// Lower bound of the per-token delay
    pub min_token_delay_ms: u64,
    /// Upper bound of the per-token delay
    pub max_token_delay_ms: u64,
    /// Chance that an off-topic question gets a hallucinated answer
    pub fallback_hallucination_rate: f64,
}

impl Default for ScriptedConfig {
    fn default() -> Self {
        Self {
            min_token_delay_ms: 20,
            max_token_delay_ms: 80,
            fallback_hallucination_rate: 0.2,
        }
    }
}

/// Canned-answer generator
#[derive(Debug, Clone, Default)]
pub struct ScriptedGenerator {
    config: ScriptedConfig,
}

impl ScriptedGenerator {
    /// Generator with the given pacing
    #[inline]
    #[must_use]
    pub fn new(config: ScriptedConfig) -> Self {
        Self { config }
    }

    /// Answer the generator will stream for `prompt`
    #[must_use]
    pub fn answer_for(&self, prompt: &str) -> &'static str {
        let lower = prompt.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        if lower.contains(HALLUCINATE_TRIGGER) {
            if mentions(&["pris", "kostar"]) {
                return HALLUCINATED_PRICING;
            }
            if mentions(&["kontakt", "ring"]) {
                return HALLUCINATED_CONTACT;
            }
            return HALLUCINATED_DEFAULT;
        }

        if mentions(&["pris", "kostar", "kostnad", "premium", "basic", "standard"]) {
            return PRICING_ANSWER;
        }
        if mentions(&["ångerrätt", "ångra"]) {
            return WITHDRAWAL_ANSWER;
        }
        if mentions(&["kontakt", "ring", "telefon", "öppettid"]) {
            return CONTACT_ANSWER;
        }

        let rate = self.config.fallback_hallucination_rate.clamp(0.0, 1.0);
        if rand::rng().random_bool(rate) {
            HALLUCINATED_DEFAULT
        } else {
            UNKNOWN_ANSWER
        }
    }

    fn next_delay(&self) -> Duration {
        let low = self.config.min_token_delay_ms;
        let high = self.config.max_token_delay_ms.max(low);
        Duration::from_millis(rand::rng().random_range(low..=high))
    }
}

#[async_trait::async_trait]
impl TokenGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        tokens: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> Result<(), GenerationError> {
        let answer = self.answer_for(prompt);

        for word in answer.split(' ') {
            if cancel.is_cancelled() {
                return Err(GenerationError::Cancelled);
            }

            let delay = self.next_delay();
            tokio::select! {
                () = cancel.cancelled() => return Err(GenerationError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }

            if tokens.send(format!("{word} ")).await.is_err() {
                return Err(GenerationError::Cancelled);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> ScriptedGenerator {
        ScriptedGenerator::new(ScriptedConfig {
            min_token_delay_ms: 1,
            max_token_delay_ms: 1,
            fallback_hallucination_rate: 0.0,
        })
    }

    #[test]
    fn picks_answers_by_topic() {
        let generator = quiet();
        assert_eq!(generator.answer_for("Vad kostar Premium?"), PRICING_ANSWER);
        assert_eq!(generator.answer_for("Hur lång är ångerrätten?"), WITHDRAWAL_ANSWER);
        assert_eq!(generator.answer_for("Vilket telefonnummer?"), CONTACT_ANSWER);
        assert_eq!(generator.answer_for("Vad är meningen med livet?"), UNKNOWN_ANSWER);
    }

    #[test]
    fn hallucinate_trigger_wins() {
        let generator = quiet();
        assert_eq!(generator.answer_for("hallucinate pris"), HALLUCINATED_PRICING);
        assert_eq!(generator.answer_for("hallucinate kontakt"), HALLUCINATED_CONTACT);
        assert_eq!(generator.answer_for("hallucinate"), HALLUCINATED_DEFAULT);
    }

    #[test]
    fn certain_fallback_hallucination() {
        let generator = ScriptedGenerator::new(ScriptedConfig {
            fallback_hallucination_rate: 1.0,
            ..ScriptedConfig::default()
        });
        assert_eq!(generator.answer_for("okänd fråga"), HALLUCINATED_DEFAULT);
    }

    #[tokio::test(start_paused = true)]
    async fn streams_words_with_trailing_space() {
        let (tx, mut rx) = mpsc::channel(64);
        quiet()
            .generate("kontakt", tx, CancellationToken::new())
            .await
            .unwrap();

        let mut streamed = String::new();
        while let Some(token) = rx.recv().await {
            assert!(token.ends_with(' '));
            streamed.push_str(&token);
        }
        assert_eq!(streamed.trim(), CONTACT_ANSWER);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_cancelled() {
        let (tx, mut rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = quiet().generate("kontakt", tx, cancel).await;
        assert_eq!(result, Err(GenerationError::Cancelled));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn closed_channel_counts_as_cancellation() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let result = quiet().generate("pris", tx, CancellationToken::new()).await;
        assert_eq!(result, Err(GenerationError::Cancelled));
    }
}
