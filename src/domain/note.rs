//! Lot-identifier convention carried inside the free-text note column.
//!
//! Persisted notes look like `trim id=3 took profits into earnings`. The verb is
//! the first token, `id=<n>` may appear anywhere, and everything else is user text.
//! Split events additionally carry `parts=<qty>@<stop>,<qty>@<stop>`.

use crate::domain::{LotId, SplitPart};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

const ID_PREFIX: &str = "id=";
const PARTS_PREFIX: &str = "parts=";

/// Action verb written as the first token of a generated note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteVerb {
    Trim,
    Close,
    Stop,
    Split,
}

impl NoteVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteVerb::Trim => "trim",
            NoteVerb::Close => "close",
            NoteVerb::Stop => "stop",
            NoteVerb::Split => "split",
        }
    }
}

impl std::fmt::Display for NoteVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build `"<verb> id=<lot_id> <free_text>"`.
///
/// The id token is omitted when `lot_id` is `None`; no trailing space is emitted
/// for empty `free_text`. Tokens of `free_text` starting with `id=` are dropped,
/// so the only id a note can decode to is `lot_id`.
pub fn encode(verb: NoteVerb, lot_id: Option<LotId>, free_text: &str) -> String {
    encode_tokens(verb, lot_id, None, free_text)
}

/// Build a split note: `"split id=<lot_id> parts=<q>@<s>,... <free_text>"`.
pub fn encode_split(lot_id: Option<LotId>, parts: &[SplitPart], free_text: &str) -> String {
    encode_tokens(NoteVerb::Split, lot_id, Some(encode_parts(parts)), free_text)
}

fn encode_tokens(
    verb: NoteVerb,
    lot_id: Option<LotId>,
    extra: Option<String>,
    free_text: &str,
) -> String {
    let mut note = verb.as_str().to_string();
    if let Some(id) = lot_id {
        note.push(' ');
        note.push_str(ID_PREFIX);
        note.push_str(&id.to_string());
    }
    if let Some(extra) = extra {
        note.push(' ');
        note.push_str(&extra);
    }
    let free_text = strip_id_tokens(free_text);
    if !free_text.is_empty() {
        note.push(' ');
        note.push_str(&free_text);
    }
    note
}

fn strip_id_tokens(free_text: &str) -> Cow<'_, str> {
    if !free_text
        .split_whitespace()
        .any(|token| token.starts_with(ID_PREFIX))
    {
        return Cow::Borrowed(free_text);
    }
    let kept: Vec<&str> = free_text
        .split_whitespace()
        .filter(|token| !token.starts_with(ID_PREFIX))
        .collect();
    Cow::Owned(kept.join(" "))
}

/// Find the first `id=<integer>` token in a note.
///
/// Tokens that start with `id=` but do not hold an integer are skipped, so
/// decoding never fails; callers decide what a missing id means.
pub fn decode(note: &str) -> Option<LotId> {
    note.split_whitespace()
        .filter_map(|token| token.strip_prefix(ID_PREFIX))
        .find_map(|raw| raw.parse::<u64>().ok())
        .map(LotId::new)
}

/// Read the leading verb of a note, if it is one of ours.
pub fn decode_verb(note: &str) -> Option<NoteVerb> {
    let first = note.split_whitespace().next()?;
    match first.to_ascii_lowercase().as_str() {
        "trim" => Some(NoteVerb::Trim),
        "close" => Some(NoteVerb::Close),
        "stop" => Some(NoteVerb::Stop),
        "split" => Some(NoteVerb::Split),
        _ => None,
    }
}

/// Format split parts as a single `parts=` token.
pub fn encode_parts(parts: &[SplitPart]) -> String {
    let joined = parts
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("{}{}", PARTS_PREFIX, joined)
}

/// Parse the `parts=` token of a note.
///
/// Returns `Ok(None)` when the note has no such token, and an error message when
/// the token is present but unreadable.
pub fn decode_parts(note: &str) -> Result<Option<Vec<SplitPart>>, String> {
    let Some(raw) = note
        .split_whitespace()
        .find_map(|token| token.strip_prefix(PARTS_PREFIX))
    else {
        return Ok(None);
    };

    if raw.is_empty() {
        return Err("empty parts token".to_string());
    }

    raw.split(',')
        .map(SplitPart::parse)
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Decimal;

    fn part(qty: &str, stop: &str) -> SplitPart {
        SplitPart::new(
            Decimal::from_str_canonical(qty).unwrap(),
            Decimal::from_str_canonical(stop).unwrap(),
        )
    }

    #[test]
    fn encode_matches_persisted_format() {
        assert_eq!(encode(NoteVerb::Trim, Some(LotId::new(3)), ""), "trim id=3");
        assert_eq!(
            encode(NoteVerb::Stop, Some(LotId::new(12)), "raise to breakeven"),
            "stop id=12 raise to breakeven"
        );
        assert_eq!(encode(NoteVerb::Close, None, "flat"), "close flat");
    }

    #[test]
    fn decode_roundtrips_for_arbitrary_text() {
        let texts = ["", "x", "id=abc", "sold id=99 later", "  spaced  out  ", "ünïcode"];
        for id in [0u64, 1, 7, 42, u64::MAX] {
            for text in texts {
                for verb in [NoteVerb::Trim, NoteVerb::Close, NoteVerb::Stop, NoteVerb::Split] {
                    let note = encode(verb, Some(LotId::new(id)), text);
                    assert_eq!(decode(&note), Some(LotId::new(id)), "note: {note:?}");
                }
            }
        }
    }

    #[test]
    fn decode_tolerates_token_position() {
        assert_eq!(decode("id=5"), Some(LotId::new(5)));
        assert_eq!(decode("gap up, sold id=5 into strength"), Some(LotId::new(5)));
        assert_eq!(decode("sold into strength id=5"), Some(LotId::new(5)));
    }

    #[test]
    fn decode_skips_unparsable_tokens() {
        assert_eq!(decode("id=abc id=4"), Some(LotId::new(4)));
        assert_eq!(decode("id= id=-2"), None);
        assert_eq!(decode("lid=3 valid=2"), None);
        assert_eq!(decode(""), None);
    }

    #[test]
    fn decode_verb_reads_first_token() {
        assert_eq!(decode_verb("trim id=1"), Some(NoteVerb::Trim));
        assert_eq!(decode_verb("CLOSE id=1"), Some(NoteVerb::Close));
        assert_eq!(decode_verb("breakout buy"), None);
        assert_eq!(decode_verb(""), None);
    }

    #[test]
    fn split_note_carries_parts() {
        let parts = vec![part("5", "420"), part("5", "415")];
        let note = encode_split(Some(LotId::new(2)), &parts, "scale stops");
        assert_eq!(note, "split id=2 parts=5@420,5@415 scale stops");
        assert_eq!(decode(&note), Some(LotId::new(2)));
        assert_eq!(decode_verb(&note), Some(NoteVerb::Split));
        assert_eq!(decode_parts(&note).unwrap(), Some(parts));
    }

    #[test]
    fn decode_parts_absent_and_malformed() {
        assert_eq!(decode_parts("split id=2").unwrap(), None);
        assert!(decode_parts("split id=2 parts=").is_err());
        assert!(decode_parts("split id=2 parts=5@420,oops").is_err());
        assert!(decode_parts("split id=2 parts=5").is_err());
    }

    #[test]
    fn test_free_text_cannot_supply_an_id() {
        let note = encode(NoteVerb::Stop, None, "moved id=7 after earnings");
        assert_eq!(note, "stop moved after earnings");
        assert_eq!(decode(&note), None);

        let note = encode(NoteVerb::Trim, Some(LotId::new(2)), "id=9");
        assert_eq!(note, "trim id=2");
        assert_eq!(decode(&note), Some(LotId::new(2)));

        let note = encode(NoteVerb::Trim, Some(LotId::new(2)), "keep  spacing");
        assert_eq!(note, "trim id=2 keep  spacing");
    }
}
