use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
	Admiration,
	Amusement,
	Anger,
	Annoyance,
	Approval,
	Caring,
	Confusion,
	Curiosity,
	Desire,
	Disappointment,
	Disapproval,
	Disgust,
	Embarrassment,
	Excitement,
	Fear,
	Gratitude,
	Grief,
	Joy,
	Love,
	Nervousness,
	Optimism,
	Pride,
	Realization,
	Relief,
	Remorse,
	Sadness,
	Surprise,
	Neutral,
}
impl Emotion {
	pub const ALL: [Self; 28] = [
		Self::Admiration,
		Self::Amusement,
		Self::Anger,
		Self::Annoyance,
		Self::Approval,
		Self::Caring,
		Self::Confusion,
		Self::Curiosity,
		Self::Desire,
		Self::Disappointment,
		Self::Disapproval,
		Self::Disgust,
		Self::Embarrassment,
		Self::Excitement,
		Self::Fear,
		Self::Gratitude,
		Self::Grief,
		Self::Joy,
		Self::Love,
		Self::Nervousness,
		Self::Optimism,
		Self::Pride,
		Self::Realization,
		Self::Relief,
		Self::Remorse,
		Self::Sadness,
		Self::Surprise,
		Self::Neutral,
	];

	pub fn parse(raw: &str) -> Option<Self> {
		let raw = raw.trim();

		Self::ALL.into_iter().find(|emotion| emotion.as_str().eq_ignore_ascii_case(raw))
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Admiration => "admiration",
			Self::Amusement => "amusement",
			Self::Anger => "anger",
			Self::Annoyance => "annoyance",
			Self::Approval => "approval",
			Self::Caring => "caring",
			Self::Confusion => "confusion",
			Self::Curiosity => "curiosity",
			Self::Desire => "desire",
			Self::Disappointment => "disappointment",
			Self::Disapproval => "disapproval",
			Self::Disgust => "disgust",
			Self::Embarrassment => "embarrassment",
			Self::Excitement => "excitement",
			Self::Fear => "fear",
			Self::Gratitude => "gratitude",
			Self::Grief => "grief",
			Self::Joy => "joy",
			Self::Love => "love",
			Self::Nervousness => "nervousness",
			Self::Optimism => "optimism",
			Self::Pride => "pride",
			Self::Realization => "realization",
			Self::Relief => "relief",
			Self::Remorse => "remorse",
			Self::Sadness => "sadness",
			Self::Surprise => "surprise",
			Self::Neutral => "neutral",
		}
	}

	fn pattern(self) -> &'static str {
		match self {
			Self::Admiration => {
				r"\b(admir\w*|impress(ed|ive)|amazing|incredible|brilliant|respect(ed)?|in awe)\b"
			},
			Self::Amusement => r"\b(ha(ha)+|lol|lmao|funny|hilarious|amus\w*|giggl\w*|chuckl\w*)\b",
			Self::Anger => r"\b(angry|anger|furious|rage|enraged|livid|mad at|seething|hate you)\b",
			Self::Annoyance => r"\b(annoy\w*|irritat\w*|ugh+|frustrat\w*|bother(ed|ing)|fed up)\b",
			Self::Approval => r"\b(approve\w*|well done|good job|agreed|exactly|that's right)\b",
			Self::Caring => r"\b(take care|are you (ok|okay|alright)|worried about you|care about)\b",
			Self::Confusion => r"\b(confus\w*|puzzl\w*|don't understand|what do you mean|huh)\b",
			Self::Curiosity => r"\b(curious|wonder(ing)?|intrigu\w*|tell me more|i want to know)\b",
			Self::Desire => r"\b(want(ed)? (you|it|this)|crave\w*|long(ing)? for|yearn\w*|wish i)\b",
			Self::Disappointment => r"\b(disappoint\w*|let down|letdown|too bad|what a shame)\b",
			Self::Disapproval => r"\b(disapprov\w*|not okay|unacceptable|shouldn't have|how dare)\b",
			Self::Disgust => r"\b(disgust\w*|gross|revolting|repuls\w*|nasty|vile|eww+)\b",
			Self::Embarrassment => r"\b(embarrass\w*|blush\w*|awkward|ashamed|mortified)\b",
			Self::Excitement => r"\b(excit\w*|thrill\w*|can't wait|pumped|eager\w*)\b",
			Self::Fear => r"\b(afraid|scared|fear\w*|terrif\w*|frighten\w*|panic\w*)\b",
			Self::Gratitude => r"\b(thank(s| you)|grateful|appreciate\w*|thankful)\b",
			Self::Grief => r"\b(grie(f|ving|ve)|mourn\w*|passed away|funeral|heartbroken)\b",
			Self::Joy => r"\b(happy|joy\w*|glad|delight\w*|cheerful|smil(e|es|ed|ing))\b",
			Self::Love => r"\b(love(d|s)?|adore\w*|darling|sweetheart|beloved)\b",
			Self::Nervousness => r"\b(nervous\w*|anxious|anxiety|jittery|uneasy|tense)\b",
			Self::Optimism => r"\b(hope(ful|fully)?|optimis\w*|it will be (fine|okay)|bright side)\b",
			Self::Pride => r"\b(proud|pride|accomplish\w*|achiev\w*)\b",
			Self::Realization => r"\b(realiz\w*|i see now|oh i get it|it dawned|suddenly understood)\b",
			Self::Relief => r"\b(relie(f|ved)|phew|thank goodness|finally over)\b",
			Self::Remorse => r"\b(sorry|apologi\w*|regret\w*|my fault|forgive me)\b",
			Self::Sadness => r"\b(sad|sadness|unhappy|cry(ing)?|tears|depress\w*|miserable)\b",
			Self::Surprise => r"\b(surpris\w*|wow|whoa|shock\w*|unexpected|no way)\b",
			Self::Neutral => r"\b(okay|ok|fine|alright|sure)\b",
		}
	}
}

static EMOTION_PATTERNS: LazyLock<Vec<(Emotion, Regex)>> = LazyLock::new(|| {
	Emotion::ALL
		.into_iter()
		.filter_map(|emotion| match Regex::new(&format!("(?i){}", emotion.pattern())) {
			Ok(regex) => Some((emotion, regex)),
			Err(err) => {
				tracing::warn!(
					error = %err,
					emotion = emotion.as_str(),
					"Emotion pattern failed to compile."
				);

				None
			},
		})
		.collect()
});

/// Emotions whose keyword pattern occurs in `text`.
pub fn detect_emotions(text: &str) -> Vec<Emotion> {
	EMOTION_PATTERNS
		.iter()
		.filter(|(_, regex)| regex.is_match(text))
		.map(|(emotion, _)| *emotion)
		.collect()
}

pub fn text_shows_emotion(text: &str, emotion: Emotion) -> bool {
	EMOTION_PATTERNS
		.iter()
		.find(|(candidate, _)| *candidate == emotion)
		.map(|(_, regex)| regex.is_match(text))
		.unwrap_or(false)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_label_parses_and_compiles() {
		for emotion in Emotion::ALL {
			assert_eq!(Emotion::parse(emotion.as_str()), Some(emotion));
		}

		assert_eq!(EMOTION_PATTERNS.len(), Emotion::ALL.len());
		assert_eq!(Emotion::parse(" JOY "), Some(Emotion::Joy));
		assert_eq!(Emotion::parse("ennui"), None);
	}

	#[test]
	fn detects_keyword_emotions() {
		let detected = detect_emotions("I'm so scared, but thank you for staying.");

		assert!(detected.contains(&Emotion::Fear));
		assert!(detected.contains(&Emotion::Gratitude));
		assert!(!detected.contains(&Emotion::Anger));
		assert!(text_shows_emotion("She was FURIOUS with him.", Emotion::Anger));
	}
}
