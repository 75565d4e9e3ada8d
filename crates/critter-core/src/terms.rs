//! Terms of service shown before any chat starts.

use serde::Serialize;

pub static CLAUSES: &[&str] = &[
    "I acknowledge that: This platform is powered by artificial intelligence and not by a human clinician. \
     The AI provides informational guidance and supportive conversation only. It does not diagnose, treat, \
     or cure any mental-health condition. I should not regard its suggestions as medical advice or a \
     substitute for professional therapy.",
    "I understand and agree that: My chat interactions may be stored as plain-text transcripts for \
     research, service improvement and quality assurance. No personally identifiable information will be \
     shared with third parties without my explicit consent, except as required by law.",
    "I agree that: The service is provided \"as is\" without warranties of any kind. The developers and \
     operators disclaim liability for any outcomes resulting from my use of the AI's suggestions. Any \
     decisions or actions I take based on AI interactions are my sole responsibility.",
    "I acknowledge that: I may withdraw my consent for data collection at any time, and can request \
     deletion of my stored transcripts.",
    "I understand: These terms may be updated periodically, and I may be required to re-consent to \
     continue using the service.",
    "I recognize that: This AI-Therapist is not designed or certified for crisis intervention or \
     emergency mental-health care. In the event of self-harm ideation, suicidal thoughts, or any acute \
     mental-health crisis, I will immediately contact local emergency services or a qualified \
     mental-health professional or call a suicide prevention hotline (e.g., 988 in the U.S., or my \
     country's equivalent).",
];

pub const ACKNOWLEDGEMENT: &str =
    "By answering \"I Agree\", you confirm that you have read and agree to our terms.";

#[derive(Debug, Clone, Serialize)]
pub struct Terms {
    pub clauses: &'static [&'static str],
    pub acknowledgement: &'static str,
}

pub fn terms() -> Terms {
    Terms {
        clauses: CLAUSES,
        acknowledgement: ACKNOWLEDGEMENT,
    }
}

/// Accepts "I agree", "agree", "yes" and "y", in any case.
pub fn is_acceptance(answer: &str) -> bool {
    matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "i agree" | "agree" | "yes" | "y"
    )
}
