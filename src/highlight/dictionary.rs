//! Spell-check dictionaries
//!
//! The highlighter only needs [`Dictionary::check`]. A `.dic` file with a
//! sibling `.aff` file is loaded as a full Hunspell dictionary
//! ([`HunspellDictionary`], backed by spellbook), so affixed forms such as
//! plurals are known. Without the `.aff` file, [`WordListDictionary`] reads
//! the listed stems or a plain one-word-per-line list. The [`SpellChecker`]
//! owns the active dictionary and is the only place it is changed.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{Error, Result};

/// Locale used when neither the settings nor the environment name one.
pub const FALLBACK_LOCALE: &str = "en_US";

/// System directories searched for `<locale>.dic`.
const SYSTEM_DICTIONARY_DIRS: &[&str] = &["/usr/share/hunspell", "/usr/share/myspell"];

// ─────────────────────────────────────────────────────────────────────────────
// Dictionary Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Word lookup used by the spell-check pass.
pub trait Dictionary {
    /// Whether `word` is spelled correctly.
    fn check(&self, word: &str) -> bool;

    /// An empty dictionary disables spell checking instead of rejecting
    /// every word.
    fn is_empty(&self) -> bool {
        false
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Word List Dictionary
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory set of known words for one locale.
#[derive(Debug, Clone, Default)]
pub struct WordListDictionary {
    locale: String,
    words: HashSet<String>,
}

impl WordListDictionary {
    pub fn from_words<I, S>(locale: &str, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            locale: locale.to_string(),
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a Hunspell `.dic` file or a plain word list.
    ///
    /// A leading line holding only the entry count is skipped, as are affix
    /// flags (`word/FLAGS`), morphological fields and `#` comments.
    pub fn parse(locale: &str, contents: &str) -> Self {
        let mut lines = contents.lines().peekable();
        if lines
            .peek()
            .is_some_and(|first| first.trim().parse::<usize>().is_ok())
        {
            lines.next();
        }

        let words = lines
            .filter(|line| !line.starts_with('#'))
            .filter_map(|line| {
                let entry = line.split(['/', '\t', ' ']).next().unwrap_or("").trim();
                (!entry.is_empty()).then(|| entry.to_string())
            });
        Self::from_words(locale, words)
    }

    /// Load a dictionary file.
    pub fn load(locale: &str, path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| Error::Dictionary {
            path: path.to_path_buf(),
            source: e,
        })?;
        let dictionary = Self::parse(locale, &contents);
        info!(
            "Loaded {} words for {} from {}",
            dictionary.len(),
            locale,
            path.display()
        );
        Ok(dictionary)
    }

    /// Find the dictionary file for `locale` in `dirs`.
    ///
    /// Both `en_US` and `en-US` spellings of the locale are tried.
    pub fn find(locale: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
        let names = [
            format!("{}.dic", locale),
            format!("{}.dic", locale.replace('-', "_")),
            format!("{}.dic", locale.replace('_', "-")),
        ];
        dirs.iter()
            .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
            .find(|path| path.is_file())
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }
}

impl Dictionary for WordListDictionary {
    /// Exact matches are accepted, and so are capitalised or upper-case forms
    /// of known words. Tokens made only of digits and underscores are not
    /// words and always pass.
    fn check(&self, word: &str) -> bool {
        if is_not_a_word(word) {
            return true;
        }
        if self.words.contains(word) {
            return true;
        }

        let lower = word.to_lowercase();
        if lower != word && self.words.contains(&lower) {
            return true;
        }

        // All-caps spelling of a capitalised entry, e.g. "PARIS" for "Paris"
        let mut chars = lower.chars();
        let capitalized = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => return false,
        };
        word.chars().all(|c| !c.is_lowercase()) && self.words.contains(&capitalized)
    }

    fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

fn is_not_a_word(token: &str) -> bool {
    token.chars().all(|c| c.is_numeric() || c == '_')
}

// ─────────────────────────────────────────────────────────────────────────────
// Hunspell Dictionary
// ─────────────────────────────────────────────────────────────────────────────

/// Hunspell dictionary with its affix rules applied.
pub struct HunspellDictionary {
    locale: String,
    inner: spellbook::Dictionary,
}

impl HunspellDictionary {
    /// Build from the contents of a `.aff` and a `.dic` file.
    pub fn parse(locale: &str, aff: &str, dic: &str) -> std::result::Result<Self, String> {
        let inner = spellbook::Dictionary::new(aff, dic).map_err(|e| e.to_string())?;
        Ok(Self {
            locale: locale.to_string(),
            inner,
        })
    }

    /// Load `<name>.dic` together with `aff_path`.
    pub fn load(locale: &str, dic_path: &Path, aff_path: &Path) -> Result<Self> {
        let read = |path: &Path| {
            fs::read_to_string(path).map_err(|e| Error::Dictionary {
                path: path.to_path_buf(),
                source: e,
            })
        };
        let aff = read(aff_path)?;
        let dic = read(dic_path)?;
        let dictionary = Self::parse(locale, &aff, &dic).map_err(|message| Error::Dictionary {
            path: dic_path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidData, message),
        })?;
        info!(
            "Loaded Hunspell dictionary for {} from {}",
            locale,
            dic_path.display()
        );
        Ok(dictionary)
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }
}

impl Dictionary for HunspellDictionary {
    fn check(&self, word: &str) -> bool {
        is_not_a_word(word) || self.inner.check(word)
    }
}

/// Load the dictionary at `dic_path`, as Hunspell when a sibling `.aff`
/// file exists and as a word list otherwise.
pub fn load_dictionary(locale: &str, dic_path: &Path) -> Result<Box<dyn Dictionary>> {
    let aff_path = dic_path.with_extension("aff");
    if aff_path.is_file() {
        Ok(Box::new(HunspellDictionary::load(locale, dic_path, &aff_path)?))
    } else {
        debug!("No affix file next to {}, reading stems only", dic_path.display());
        Ok(Box::new(WordListDictionary::load(locale, dic_path)?))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Spell Checker
// ─────────────────────────────────────────────────────────────────────────────

/// Owner of the process-wide active dictionary.
///
/// Every change bumps [`SpellChecker::generation`], which tells highlighters
/// that their spell spans are stale.
pub struct SpellChecker {
    dictionary: Option<Box<dyn Dictionary>>,
    locale: Option<String>,
    search_dirs: Vec<PathBuf>,
    generation: u64,
}

impl SpellChecker {
    /// A disabled checker that looks in `extra_dirs` before the system
    /// and user dictionary directories.
    pub fn new(extra_dirs: &[PathBuf]) -> Self {
        let mut search_dirs = extra_dirs.to_vec();
        search_dirs.extend(SYSTEM_DICTIONARY_DIRS.iter().map(PathBuf::from));
        if let Some(data) = dirs::data_dir() {
            search_dirs.push(data.join("retext").join("dictionaries"));
        }
        Self {
            dictionary: None,
            locale: None,
            search_dirs,
            generation: 0,
        }
    }

    /// The active dictionary, if spell checking is on and it knows any words.
    pub fn dictionary(&self) -> Option<&dyn Dictionary> {
        self.dictionary.as_deref().filter(|d| !d.is_empty())
    }

    pub fn is_enabled(&self) -> bool {
        self.dictionary.is_some()
    }

    /// Locale of the active dictionary.
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Turn spell checking on with the dictionary for `locale`, or for the
    /// system locale when `None`.
    ///
    /// On failure the previous dictionary, if any, stays active.
    pub fn enable(&mut self, locale: Option<&str>) -> Result<()> {
        let locale = locale
            .map(str::to_string)
            .unwrap_or_else(system_locale);
        let path = WordListDictionary::find(&locale, &self.search_dirs).ok_or_else(|| {
            Error::Dictionary {
                path: PathBuf::from(format!("{}.dic", locale)),
                source: io::Error::new(io::ErrorKind::NotFound, "no dictionary for locale"),
            }
        })?;
        let dictionary = load_dictionary(&locale, &path)?;
        self.set_dictionary(&locale, dictionary);
        Ok(())
    }

    /// Install a dictionary directly.
    pub fn set_dictionary(&mut self, locale: &str, dictionary: Box<dyn Dictionary>) {
        self.dictionary = Some(dictionary);
        self.locale = Some(locale.to_string());
        self.generation += 1;
        debug!("Spell checking enabled for {}", locale);
    }

    /// Turn spell checking off.
    pub fn disable(&mut self) {
        if self.dictionary.take().is_some() {
            self.generation += 1;
            debug!("Spell checking disabled");
        }
        self.locale = None;
    }

    /// Switch to another locale. Only reloads when spell checking is on.
    pub fn set_locale(&mut self, locale: &str) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        self.enable(Some(locale))
    }
}

impl Default for SpellChecker {
    fn default() -> Self {
        Self::new(&[])
    }
}

/// Locale from `LC_ALL`, `LC_MESSAGES` or `LANG`, e.g. `de_DE.UTF-8` → `de_DE`.
pub fn system_locale() -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find_map(|value| parse_locale(&value))
        .unwrap_or_else(|| FALLBACK_LOCALE.to_string())
}

fn parse_locale(value: &str) -> Option<String> {
    let locale = value.split(['.', '@']).next()?.trim();
    if locale.is_empty() || locale == "C" || locale == "POSIX" {
        None
    } else {
        Some(locale.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_hunspell_dic() {
        let dict = WordListDictionary::parse(
            "en_US",
            "4\nhello/S\nworld\tpo:noun\n# comment\n\nNASA\n",
        );
        assert_eq!(dict.len(), 3);
        assert!(dict.check("hello"));
        assert!(dict.check("world"));
        assert!(!dict.check("comment"));
    }

    #[test]
    fn test_parse_plain_word_list() {
        let dict = WordListDictionary::parse("en_US", "apple\nbanana\n");
        assert!(dict.check("apple"));
        assert!(dict.check("banana"));
        assert!(!dict.check("cherry"));
    }

    #[test]
    fn test_check_case_forms() {
        let dict = WordListDictionary::from_words("en_US", ["hello", "Paris", "NASA"]);
        assert!(dict.check("hello"));
        assert!(dict.check("Hello"));
        assert!(dict.check("HELLO"));
        assert!(dict.check("Paris"));
        assert!(dict.check("PARIS"));
        assert!(!dict.check("paris"));
        assert!(dict.check("NASA"));
        assert!(!dict.check("Nasa"));
    }

    #[test]
    fn test_numbers_always_pass() {
        let dict = WordListDictionary::from_words("en_US", ["x"]);
        assert!(dict.check("2024"));
        assert!(dict.check("__"));
        assert!(!dict.check("abc123"));
    }

    #[test]
    fn test_find_and_load() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("nb_NO.dic"), "2\nhei\nverden\n").unwrap();

        let dirs = vec![temp.path().to_path_buf()];
        let path = WordListDictionary::find("nb-NO", &dirs).unwrap();
        let dict = WordListDictionary::load("nb_NO", &path).unwrap();
        assert_eq!(dict.locale(), "nb_NO");
        assert!(dict.check("verden"));

        assert!(WordListDictionary::find("xx_XX", &dirs).is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let result = WordListDictionary::load("en_US", Path::new("/nonexistent/en_US.dic"));
        assert!(matches!(result, Err(Error::Dictionary { .. })));
    }

    #[test]
    fn test_spell_checker_enable_disable() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("en_GB.dic"), "colour\n").unwrap();
        fs::write(temp.path().join("en_AU.dic"), "arvo\n").unwrap();

        let mut checker = SpellChecker::new(&[temp.path().to_path_buf()]);
        assert!(checker.dictionary().is_none());
        let start = checker.generation();

        checker.enable(Some("en_GB")).unwrap();
        assert!(checker.is_enabled());
        assert_eq!(checker.locale(), Some("en_GB"));
        assert!(checker.dictionary().unwrap().check("colour"));
        assert!(checker.generation() > start);

        checker.set_locale("en_AU").unwrap();
        assert!(checker.dictionary().unwrap().check("arvo"));

        checker.disable();
        assert!(checker.dictionary().is_none());
        assert!(checker.locale().is_none());

        // Changing locale while disabled does not turn it on
        checker.set_locale("en_GB").unwrap();
        assert!(!checker.is_enabled());
    }

    const EN_AFF: &str = "SET UTF-8\n\nSFX S Y 1\nSFX S 0 s .\n\nSFX D Y 1\nSFX D 0 ed [^e]\n";
    const EN_DIC: &str = "3\ncat/S\nwalk/D\nthe\n";

    #[test]
    fn test_hunspell_applies_affix_rules() {
        let dict = HunspellDictionary::parse("en_US", EN_AFF, EN_DIC).unwrap();
        assert!(dict.check("cat"));
        assert!(dict.check("cats"));
        assert!(dict.check("walked"));
        assert!(dict.check("2024"));
        assert!(!dict.check("catz"));
        assert!(!dict.check("thes"));
    }

    #[test]
    fn test_spell_checker_prefers_affix_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("en_US.aff"), EN_AFF).unwrap();
        fs::write(temp.path().join("en_US.dic"), EN_DIC).unwrap();

        let mut checker = SpellChecker::new(&[temp.path().to_path_buf()]);
        checker.enable(Some("en_US")).unwrap();
        let dict = checker.dictionary().unwrap();
        assert!(dict.check("cats"));
        assert!(dict.check("walked"));
        assert!(!dict.check("catz"));
    }

    #[test]
    fn test_word_list_without_affix_file_knows_only_stems() {
        let temp = TempDir::new().unwrap();
        let dic = temp.path().join("en_US.dic");
        fs::write(&dic, EN_DIC).unwrap();

        let dict = load_dictionary("en_US", &dic).unwrap();
        assert!(dict.check("cat"));
        assert!(!dict.check("cats"));
    }

    #[test]
    fn test_spell_checker_missing_locale_stays_off() {
        let temp = TempDir::new().unwrap();
        let mut checker = SpellChecker::new(&[temp.path().to_path_buf()]);
        assert!(checker.enable(Some("zz_ZZ")).is_err());
        assert!(!checker.is_enabled());
    }

    #[test]
    fn test_empty_dictionary_is_not_active() {
        let mut checker = SpellChecker::default();
        checker.set_dictionary("en_US", Box::new(WordListDictionary::default()));
        assert!(checker.is_enabled());
        assert!(checker.dictionary().is_none());
    }

    #[test]
    fn test_parse_locale() {
        assert_eq!(parse_locale("de_DE.UTF-8").as_deref(), Some("de_DE"));
        assert_eq!(parse_locale("sr_RS@latin").as_deref(), Some("sr_RS"));
        assert_eq!(parse_locale("C"), None);
        assert_eq!(parse_locale(""), None);
    }
}
