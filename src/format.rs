//! `%`-token templates for subtitles and frame file names.
//!
//! | token | value                                   |
//! |-------|-----------------------------------------|
//! | `%r`  | rule string                             |
//! | `%R`  | rule string with `/` replaced by `-`    |
//! | `%d`  | dimensions as `WxH`                     |
//! | `%D`  | dimensions as `W-H`                     |
//! | `%f`  | flicker mode number                     |
//! | `%a`  | flicker mode letter (`X` when off)      |
//! | `%s`  | seed                                    |
//! | `%S`  | seed without `[` and `]`                |
//! | `%t`  | tick                                    |
//! | `%T`  | tick zero-padded to 8 digits            |
//! | `%i`  | `i` when the frame is inverted          |
//! | `%o`  | `s` when the tick is a selected tick    |
//! | `%pr` | post-process rule string                |
//! | `%PR` | post-process rule with `/` as `-`       |
//! | `%pt` | post-process tick count as `Nx`         |
//!
//! Anything else, including unknown tokens, is copied through.

/// Live values substituted into a template.
#[derive(Clone, Debug)]
pub(crate) struct FormatBindings<'a> {
    pub(crate) rule: &'a str,
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) flicker_mode: u8,
    pub(crate) flicker_letter: char,
    pub(crate) seed: &'a str,
    pub(crate) tick: i64,
    pub(crate) inverted: bool,
    pub(crate) selected: bool,
    /// Post-process rule and tick count, when post-processing is on.
    pub(crate) post: Option<(&'a str, u32)>,
}

// Two letter keys first so `%pr` never reads as an unknown `%p`.
const KEYS: &[&str] = &[
    "pr", "PR", "pt", "r", "R", "d", "D", "f", "a", "s", "S", "t", "T", "i", "o",
];

impl FormatBindings<'_> {
    fn value(&self, key: &str) -> String {
        match key {
            "r" => self.rule.to_string(),
            "R" => self.rule.replace('/', "-"),
            "d" => format!("{}x{}", self.width, self.height),
            "D" => format!("{}-{}", self.width, self.height),
            "f" => self.flicker_mode.to_string(),
            "a" => self.flicker_letter.to_string(),
            "s" => self.seed.to_string(),
            "S" => self.seed.replace(['[', ']'], ""),
            "t" => self.tick.to_string(),
            "T" => format!("{:08}", self.tick),
            "i" => if self.inverted { "i" } else { " " }.to_string(),
            "o" => if self.selected { "s" } else { " " }.to_string(),
            "pr" => self.post.map(|(r, _)| r.to_string()).unwrap_or_default(),
            "PR" => self.post.map(|(r, _)| r.replace('/', "-")).unwrap_or_default(),
            "pt" => self.post.map(|(_, n)| format!("{n}x")).unwrap_or_default(),
            _ => String::new(),
        }
    }
}

pub(crate) fn expand(template: &str, bindings: &FormatBindings) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        match KEYS.iter().find(|k| after.starts_with(**k)) {
            Some(key) => {
                out.push_str(&bindings.value(key));
                rest = &after[key.len()..];
            }
            None => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings() -> FormatBindings<'static> {
        FormatBindings {
            rule: "23/3,2x/3",
            width: 80,
            height: 24,
            flicker_mode: 2,
            flicker_letter: 'B',
            seed: "[ABCDE]",
            tick: 42,
            inverted: true,
            selected: false,
            post: None,
        }
    }

    #[test]
    fn test_basic_tokens() {
        let b = bindings();
        assert_eq!(expand("%r|%R", &b), "23/3,2x/3|23-3,2x-3");
        assert_eq!(expand("%d %D", &b), "80x24 80-24");
        assert_eq!(expand("%f%a", &b), "2B");
        assert_eq!(expand("%s %S", &b), "[ABCDE] ABCDE");
        assert_eq!(expand("%t %T", &b), "42 00000042");
        assert_eq!(expand("[%i%o]", &b), "[i ]");
    }

    #[test]
    fn test_file_name_template() {
        let b = bindings();
        assert_eq!(expand("%R/%S/%T.png", &b), "23-3,2x-3/ABCDE/00000042.png");
    }

    #[test]
    fn test_post_tokens() {
        let mut b = bindings();
        assert_eq!(expand("<%pr|%PR|%pt>", &b), "<||>");
        b.post = Some(("1/2", 5));
        assert_eq!(expand("<%pr|%PR|%pt>", &b), "<1/2|1-2|5x>");
    }

    #[test]
    fn test_unknown_tokens_pass_through() {
        let b = bindings();
        assert_eq!(expand("100% %q %p %", &b), "100% %q %p %");
        assert_eq!(expand("%%t", &b), "%42");
        assert_eq!(expand("{%t}", &b), "{42}");
    }
}
