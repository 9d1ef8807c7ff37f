pub mod library;

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use icu_normalizer::ComposingNormalizerBorrowed;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Noun,
    Verb,
    Adjective,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Noun, Category::Verb, Category::Adjective];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Noun => "Noun",
            Category::Verb => "Verb",
            Category::Adjective => "Adjective",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Category::Noun => 0,
            Category::Verb => 1,
            Category::Adjective => 2,
        }
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    fn bit(self) -> u8 {
        1 << self.index()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CorpusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "noun" => Ok(Category::Noun),
            "verb" => Ok(Category::Verb),
            "adjective" => Ok(Category::Adjective),
            _ => Err(CorpusError::UnknownCategory(s.to_string())),
        }
    }
}

/// Set of quizzed categories a token belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PosSet(u8);

impl PosSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, category: Category) {
        self.0 |= category.bit();
    }

    pub fn contains(self, category: Category) -> bool {
        self.0 & category.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = Category> {
        Category::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Category> for PosSet {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        let mut set = PosSet::empty();
        for category in iter {
            set.insert(category);
        }
        set
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Punctuation,
    ParagraphBreak,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
    pub pos: PosSet,
    pub composite: Option<String>,
    pub no_space_after: bool,
    pub feedback: BTreeMap<Category, String>,
}

impl Token {
    fn paragraph_break() -> Self {
        Self {
            text: String::new(),
            kind: TokenKind::ParagraphBreak,
            pos: PosSet::empty(),
            composite: None,
            no_space_after: true,
            feedback: BTreeMap::new(),
        }
    }

    pub fn is_punctuation(&self) -> bool {
        self.kind == TokenKind::Punctuation
    }

    pub fn is_paragraph_break(&self) -> bool {
        self.kind == TokenKind::ParagraphBreak
    }

    /// Only words can be clicked; punctuation and breaks are inert.
    pub fn is_selectable(&self) -> bool {
        self.kind == TokenKind::Word
    }

    pub fn matches(&self, category: Category) -> bool {
        self.pos.contains(category)
    }

    /// Ends a sentence when it is punctuation carrying `.`, `!` or `?`.
    fn ends_sentence(&self) -> bool {
        self.is_punctuation() && self.text.contains(['.', '!', '?'])
    }
}

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("could not read corpus {source_name}: {reason}")]
    Unreadable { source_name: String, reason: String },
    #[error("malformed corpus JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("record {index} is neither a break nor a word")]
    MissingWord { index: usize },
    #[error("record {index} has unsupported type {kind:?}")]
    UnknownRecordType { index: usize, kind: String },
    #[error("unknown text identifier {0:?}")]
    UnknownText(String),
    #[error("unknown category {0:?}")]
    UnknownCategory(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPos {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawGroupId {
    Text(String),
    Number(i64),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    #[serde(rename = "type")]
    kind: Option<String>,
    word: Option<String>,
    pos: Option<RawPos>,
    composite_verb: Option<RawGroupId>,
    #[serde(default)]
    no_space_after: bool,
    #[serde(default)]
    feedback: BTreeMap<String, String>,
}

/// Read-only token sequence for one text, shared by every category's progress.
#[derive(Clone, Debug)]
pub struct Corpus {
    tokens: Vec<Token>,
    sentences: Vec<Range<usize>>,
}

impl Corpus {
    pub fn from_json(json: &str) -> Result<Self, CorpusError> {
        let records: Vec<RawRecord> = serde_json::from_str(json)?;
        let tokens = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| normalize_record(index, record))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_tokens(tokens))
    }

    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        let sentences = segment_sentences(&tokens);
        Self { tokens, sentences }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// Token index ranges of each sentence, in order. Paragraph breaks are
    /// never inside a sentence.
    pub fn sentences(&self) -> &[Range<usize>] {
        &self.sentences
    }

    /// Every token index sharing `group`, in corpus order.
    pub fn group_members(&self, group: &str) -> Vec<usize> {
        self.tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.composite.as_deref() == Some(group))
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices toggled together with `index`: the whole composite group, or
    /// just the token itself.
    pub fn selection_unit(&self, index: usize) -> Vec<usize> {
        match self.tokens.get(index).and_then(|t| t.composite.as_deref()) {
            Some(group) => self.group_members(group),
            None => vec![index],
        }
    }

    /// Whether a space is rendered after the token at `index`.
    pub fn space_after(&self, index: usize) -> bool {
        let Some(token) = self.tokens.get(index) else {
            return false;
        };
        if token.no_space_after || token.is_paragraph_break() {
            return false;
        }
        match self.tokens.get(index + 1) {
            Some(next) => !next.is_punctuation() && !next.is_paragraph_break(),
            None => false,
        }
    }
}

fn normalize_record(index: usize, record: RawRecord) -> Result<Token, CorpusError> {
    if let Some(kind) = record.kind {
        if kind == "break" {
            return Ok(Token::paragraph_break());
        }
        return Err(CorpusError::UnknownRecordType { index, kind });
    }

    let word = record.word.ok_or(CorpusError::MissingWord { index })?;
    let tags = match record.pos {
        Some(RawPos::One(tag)) => vec![tag],
        Some(RawPos::Many(tags)) => tags,
        None => Vec::new(),
    };

    let is_punctuation = tags.is_empty() || tags.iter().any(|t| t == "Punctuation");
    let pos: PosSet = tags.iter().filter_map(|t| t.parse().ok()).collect();

    let mut feedback = BTreeMap::new();
    for (key, message) in record.feedback {
        match key.parse::<Category>() {
            Ok(category) => {
                feedback.insert(category, message);
            }
            Err(_) => log::warn!("record {index}: ignoring feedback for unknown category {key:?}"),
        }
    }

    let composite = record.composite_verb.map(|id| match id {
        RawGroupId::Text(s) => s,
        RawGroupId::Number(n) => n.to_string(),
    });

    Ok(Token {
        text: normalize_text(&word),
        kind: if is_punctuation {
            TokenKind::Punctuation
        } else {
            TokenKind::Word
        },
        pos: if is_punctuation { PosSet::empty() } else { pos },
        composite: if is_punctuation { None } else { composite },
        no_space_after: record.no_space_after,
        feedback,
    })
}

fn normalize_text(text: &str) -> String {
    ComposingNormalizerBorrowed::new_nfc()
        .normalize(text)
        .into_owned()
}

fn segment_sentences(tokens: &[Token]) -> Vec<Range<usize>> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for (i, token) in tokens.iter().enumerate() {
        if token.is_paragraph_break() {
            if start < i {
                sentences.push(start..i);
            }
            start = i + 1;
        } else if token.ends_sentence() {
            sentences.push(start..i + 1);
            start = i + 1;
        }
    }
    if start < tokens.len() {
        sentences.push(start..tokens.len());
    }

    sentences
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn word(text: &str, pos: &[Category]) -> Token {
        Token {
            text: text.to_string(),
            kind: TokenKind::Word,
            pos: pos.iter().copied().collect(),
            composite: None,
            no_space_after: false,
            feedback: BTreeMap::new(),
        }
    }

    pub(crate) fn composite(text: &str, pos: &[Category], group: &str) -> Token {
        Token {
            composite: Some(group.to_string()),
            ..word(text, pos)
        }
    }

    pub(crate) fn punct(text: &str) -> Token {
        Token {
            text: text.to_string(),
            kind: TokenKind::Punctuation,
            pos: PosSet::empty(),
            composite: None,
            no_space_after: false,
            feedback: BTreeMap::new(),
        }
    }

    pub(crate) fn brk() -> Token {
        Token::paragraph_break()
    }

    #[test]
    fn test_parse_single_and_array_pos() {
        let json = r#"[
            {"word": "puella", "pos": "Noun"},
            {"word": "bona", "pos": ["Noun", "Adjective"]},
            {"word": "cantat", "pos": "Verb"}
        ]"#;
        let corpus = Corpus::from_json(json).unwrap();
        assert_eq!(corpus.len(), 3);
        assert!(corpus.tokens()[0].matches(Category::Noun));
        assert_eq!(corpus.tokens()[1].pos.len(), 2);
        assert!(corpus.tokens()[1].matches(Category::Adjective));
        assert!(!corpus.tokens()[2].matches(Category::Noun));
    }

    #[test]
    fn test_parse_break_punctuation_and_distractor() {
        let json = r#"[
            {"word": "Et", "pos": "Conjunction"},
            {"word": ",", "pos": "Punctuation"},
            {"type": "break"},
            {"word": "!"}
        ]"#;
        let corpus = Corpus::from_json(json).unwrap();
        let tokens = corpus.tokens();
        assert!(tokens[0].is_selectable());
        assert!(tokens[0].pos.is_empty());
        assert!(tokens[1].is_punctuation());
        assert!(tokens[2].is_paragraph_break());
        assert!(tokens[3].is_punctuation());
    }

    #[test]
    fn test_parse_composite_and_feedback() {
        let json = r#"[
            {"word": "vocata", "pos": "Verb", "compositeVerb": 1,
             "feedback": {"Adjective": "A participle, but part of a verb here.", "Adverb": "x"}},
            {"word": "est", "pos": "Verb", "compositeVerb": "1"}
        ]"#;
        let corpus = Corpus::from_json(json).unwrap();
        assert_eq!(corpus.tokens()[0].composite.as_deref(), Some("1"));
        assert_eq!(corpus.selection_unit(1), vec![0, 1]);
        assert_eq!(corpus.tokens()[0].feedback.len(), 1);
        assert!(corpus.tokens()[0].feedback.contains_key(&Category::Adjective));
    }

    #[test]
    fn test_parse_rejects_record_without_word() {
        let err = Corpus::from_json(r#"[{"pos": "Noun"}]"#).unwrap_err();
        assert!(matches!(err, CorpusError::MissingWord { index: 0 }));

        let err = Corpus::from_json(r#"[{"type": "chapter"}]"#).unwrap_err();
        assert!(matches!(err, CorpusError::UnknownRecordType { index: 0, .. }));

        assert!(matches!(
            Corpus::from_json("{not json").unwrap_err(),
            CorpusError::Malformed(_)
        ));
    }

    #[test]
    fn test_nfc_normalizes_combining_macron() {
        let json = "[{\"word\": \"pu\u{0065}\u{0304}lla\", \"pos\": \"Noun\"}]";
        let corpus = Corpus::from_json(json).unwrap();
        assert_eq!(corpus.tokens()[0].text, "pu\u{0113}lla");
    }

    #[test]
    fn test_sentences_split_on_terminal_punctuation_and_breaks() {
        let corpus = Corpus::from_tokens(vec![
            word("Puella", &[Category::Noun]),
            word("cantat", &[Category::Verb]),
            punct("."),
            word("Nauta", &[Category::Noun]),
            punct(","),
            word("audit", &[Category::Verb]),
            brk(),
            word("Finis", &[Category::Noun]),
        ]);
        assert_eq!(corpus.sentences(), &[0..3, 3..6, 7..8]);
    }

    #[test]
    fn test_space_after_skips_before_punctuation() {
        let mut last = word("nauta", &[Category::Noun]);
        last.no_space_after = true;
        let corpus = Corpus::from_tokens(vec![
            word("Puella", &[Category::Noun]),
            word("cantat", &[Category::Verb]),
            punct("."),
            last,
            word("x", &[]),
        ]);
        assert!(corpus.space_after(0));
        assert!(!corpus.space_after(1));
        assert!(corpus.space_after(2));
        assert!(!corpus.space_after(3));
        assert!(!corpus.space_after(4));
    }

    #[test]
    fn test_category_cycle_and_parse() {
        assert_eq!(Category::Noun.next(), Category::Verb);
        assert_eq!(Category::Noun.prev(), Category::Adjective);
        assert_eq!("adjective".parse::<Category>().unwrap(), Category::Adjective);
        assert!("Adverb".parse::<Category>().is_err());
    }
}
