//! Built-in word lists.
//!
//! Search phrases are the cartesian product of [`TERMS`] and [`SUFFIXES`],
//! lowercased and joined by a single space (`"sql injection fix"`). The two
//! restricted lists drive repository classification: [`NAME_RESTRICTED`] is
//! matched against the `owner/repo` slug, [`DESCRIPTION_RESTRICTED`] against
//! the decoded README. All matching is case-insensitive substring search.
//!
//! Every list can be replaced from the `[vocabulary]` config section.

/// Vulnerability-class terms.
pub const TERMS: &[&str] = &[
    "buffer overflow",
    "denial of service",
    "dos",
    "XML External Entity (XXE)",
    "CVE",
    "Cross-Site Scripting (XSS)",
    "National Vulnerability Database (NVD)",
    "malicious code",
    "Cross-Site Request Forgery (CSRF)",
    "directory traversal",
    "Remote Code Execution (RCE)",
    "Cross-Site Request Forgery (XSRF)",
    "session fixation",
    "cross-origin resource sharing (CORS)",
    "infinite loop",
    "brute force",
    "cache overflow",
    "command injection",
    "cross frame scripting",
    "CSV injection",
    "eval injection",
    "execution after redirect",
    "format string",
    "path disclosure",
    "function injection",
    "replay attack",
    "session hijacking",
    "smurf attack",
    "SQL injection",
    "flooding",
    "data tampering",
    "input sanitization",
    "hardcoded secret",
    "insecure deserialization",
    "credential leakage",
    "information disclosure",
    "user enumeration",
    "race condition",
    "parameter pollution",
    "XML injection",
    "API key exposure",
    "arbitrary file upload",
    "insufficient logging",
];

/// Action and remediation suffixes paired with every term.
pub const SUFFIXES: &[&str] = &[
    "prevent",
    "fix",
    "attack",
    "protect",
    "issue",
    "correct",
    "update",
    "improve",
    "change",
    "check",
    "malicious",
    "insecure",
    "vulnerable",
    "vulnerability",
    "remediate",
    "secure",
    "audit",
    "identify",
    "document",
    "expose",
    "monitor",
    "analyze",
];

/// Substrings that mark a repository as restricted by name alone.
///
/// Names are matched after [`name_words`], so `"ctf "` and `" ctf"` hit
/// `acme/ctf-tools` but not `acme/actfx`.
pub const NAME_RESTRICTED: &[&str] = &[
    "offensive",
    "pentest",
    "vulnerab",
    "security",
    "hack",
    "exploit",
    "ctf ",
    " ctf",
    "capture the flag",
    "attack",
];

/// Substrings that mark a repository as restricted when found in its README.
pub const DESCRIPTION_RESTRICTED: &[&str] = &[
    "offensive security",
    "pentest",
    "exploits",
    "vulnerability research",
    "hacking",
    "security framework",
    "vulnerability database",
    "simulated attack",
    "security research",
];

/// Pair every term with every suffix. Term-major order, both lowercased.
pub fn keyword_phrases(terms: &[String], suffixes: &[String]) -> Vec<String> {
    terms
        .iter()
        .flat_map(|term| {
            suffixes
                .iter()
                .map(move |suffix| format!("{} {}", term.to_lowercase(), suffix.to_lowercase()))
        })
        .collect()
}

/// First restricted word found in `text`, if any.
///
/// `words` are expected to be lowercase already (the config layer
/// normalizes them).
pub fn find_restricted<'a>(text: &str, words: &'a [String]) -> Option<&'a str> {
    let haystack = text.to_lowercase();
    words
        .iter()
        .find(|word| haystack.contains(word.as_str()))
        .map(String::as_str)
}

/// Turn an `owner/repo` slug into space separated words.
///
/// Slugs never contain spaces, so separators (`/`, `-`, `_`, `.`) become
/// spaces and the phrase-style entries of [`NAME_RESTRICTED`] can match.
pub fn name_words(slug: &str) -> String {
    slug.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect()
}
