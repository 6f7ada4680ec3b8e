//! Hypothesis reconciliation for streaming recognition.
//!
//! Overlapping chunks produce successive hypotheses for the same stretch of
//! speech. The stabilizer commits text word-by-word from position zero: a new
//! hypothesis only grows the stable text when it agrees with everything
//! committed so far for the current utterance. Committed text never shrinks
//! and never mutates.

/// Word-prefix stabilizer for streaming transcript hypotheses.
///
/// Tracks two layers of text: the stable text of the in-progress utterance,
/// and the session transcript accumulated from finished utterances.
#[derive(Debug, Default)]
pub struct TranscriptStabilizer {
    /// Stable words of the in-progress utterance.
    utterance: Vec<String>,
    /// Concatenated stable text of all finished utterances.
    transcript: String,
}

impl TranscriptStabilizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile a new hypothesis against the current utterance.
    ///
    /// Returns the newly committed words, if any. The first non-empty
    /// hypothesis of an utterance is accepted wholesale; afterwards the
    /// stable text grows only when the hypothesis extends it, meaning its
    /// word prefix matches every word already committed.
    pub fn stabilize(&mut self, hypothesis: &str) -> Option<String> {
        let words: Vec<&str> = hypothesis.split_whitespace().collect();
        if words.is_empty() {
            return None;
        }

        if self.utterance.is_empty() {
            self.utterance = words.iter().map(|w| w.to_string()).collect();
            return Some(self.utterance.join(" "));
        }

        let matched = self
            .utterance
            .iter()
            .zip(words.iter())
            .take_while(|(stable, new)| stable.as_str() == **new)
            .count();

        // A hypothesis that disagrees with committed text is discarded; the
        // next chunk gets another chance to extend.
        if matched < self.utterance.len() || words.len() <= self.utterance.len() {
            return None;
        }

        let delta = words[self.utterance.len()..].join(" ");
        self.utterance
            .extend(words[self.utterance.len()..].iter().map(|w| w.to_string()));
        Some(delta)
    }

    /// Seal the in-progress utterance into the session transcript.
    ///
    /// Returns the sealed utterance text, or `None` if nothing was committed.
    pub fn finish_utterance(&mut self) -> Option<String> {
        if self.utterance.is_empty() {
            return None;
        }
        let sealed = std::mem::take(&mut self.utterance).join(" ");
        if !self.transcript.is_empty() {
            self.transcript.push(' ');
        }
        self.transcript.push_str(&sealed);
        Some(sealed)
    }

    /// Stable text of the in-progress utterance.
    pub fn utterance_text(&self) -> String {
        self.utterance.join(" ")
    }

    /// Full session transcript: finished utterances plus the stable part of
    /// the current one.
    pub fn transcript(&self) -> String {
        match (self.transcript.is_empty(), self.utterance.is_empty()) {
            (true, _) => self.utterance.join(" "),
            (false, true) => self.transcript.clone(),
            (false, false) => format!("{} {}", self.transcript, self.utterance.join(" ")),
        }
    }
}
