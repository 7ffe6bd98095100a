//! Source Convention Checker
//!
//! Scans the `src/` trees of the workspace crates for the few violations that
//! matter most: banned prefixes/suffixes, generic module names, malformed
//! `# Errors` sections and silenced dead code.

use std::fs;
use std::path::{Path, PathBuf};

const CRATE_SOURCES: [&str; 4] = [
    "vidrelay-core/src",
    "vidrelay-search/src",
    "vidrelay-web/src",
    "vidrelay-cli/src",
];

/// A convention violation found in the code
#[derive(Debug)]
struct Violation {
    file_path: String,
    line_number: usize,
    kind: &'static str,
    message: String,
}

#[derive(Default)]
struct ConventionChecker {
    violations: Vec<Violation>,
    files_checked: usize,
}

impl ConventionChecker {
    fn record(&mut self, file_path: &Path, line_number: usize, kind: &'static str, message: String) {
        self.violations.push(Violation {
            file_path: file_path.display().to_string(),
            line_number,
            kind,
            message,
        });
    }

    fn collect_rust_files(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                Self::collect_rust_files(&path, files)?;
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                files.push(path);
            }
        }
        Ok(())
    }

    fn check_function_prefixes(&mut self, file_path: &Path, content: &str) {
        let banned = [
            ("get_", "Use the noun directly: token() not get_token()"),
            ("set_", "Use a descriptive verb: update_origin() not set_origin()"),
            ("handle_", "Be specific: movie_stream() not handle_movie()"),
        ];

        for (line_num, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with("//") {
                continue;
            }
            let is_fn = ["pub fn ", "pub async fn ", "fn ", "async fn "]
                .iter()
                .any(|start| trimmed.starts_with(start));
            if !is_fn {
                continue;
            }
            for (prefix, correction) in banned {
                if trimmed.contains(&format!("fn {prefix}")) {
                    self.record(
                        file_path,
                        line_num + 1,
                        "BANNED_FUNCTION_PREFIX",
                        format!("Function uses banned prefix '{prefix}'. {correction}"),
                    );
                }
            }
        }
    }

    fn check_type_suffixes(&mut self, file_path: &Path, content: &str) {
        let banned = ["Factory", "Service"];
        let struct_only = ["Manager", "Handler", "Processor", "Controller"];

        for (line_num, line) in content.lines().enumerate() {
            let words: Vec<&str> = line.split_whitespace().collect();
            let offset = usize::from(words.first() == Some(&"pub"));
            let Some(&keyword) = words.get(offset) else {
                continue;
            };
            if !matches!(keyword, "struct" | "enum" | "trait") {
                continue;
            }
            let Some(name) = words
                .get(offset + 1)
                .and_then(|word| word.split(['<', '{', '(', ';']).next())
            else {
                continue;
            };

            let applicable = banned
                .iter()
                .chain(struct_only.iter().filter(|_| keyword != "trait"));
            for suffix in applicable {
                if name.ends_with(suffix) {
                    self.record(
                        file_path,
                        line_num + 1,
                        "BANNED_TYPE_SUFFIX",
                        format!("Type '{name}' uses banned '{suffix}' suffix"),
                    );
                }
            }
        }
    }

    fn check_module_name(&mut self, file_path: &Path) {
        let Some(stem) = file_path.file_stem().map(|s| s.to_string_lossy()) else {
            return;
        };
        if ["utils", "common", "helpers", "misc", "stuff"].contains(&&*stem) {
            self.record(
                file_path,
                1,
                "BANNED_MODULE_NAME",
                format!("Module name '{stem}' is too generic"),
            );
        }
    }

    /// `# Errors` must be followed by `///` and `- \`Type\` - condition` bullets.
    fn check_errors_sections(&mut self, file_path: &Path, content: &str) {
        let lines: Vec<&str> = content.lines().map(str::trim).collect();

        for (i, line) in lines.iter().enumerate() {
            if *line != "/// # Errors" {
                continue;
            }
            if lines.get(i + 1) != Some(&"///") {
                self.record(
                    file_path,
                    i + 1,
                    "INVALID_DOC_FORMAT",
                    "# Errors must be followed by a blank `///` line".to_string(),
                );
                continue;
            }

            let bullets: Vec<(usize, &str)> = lines
                .iter()
                .enumerate()
                .skip(i + 2)
                .take_while(|(_, l)| l.starts_with("///") && !l.starts_with("/// #"))
                .filter_map(|(n, l)| {
                    let text = l.trim_start_matches('/').trim();
                    (!text.is_empty()).then_some((n, text))
                })
                .collect();

            if bullets.is_empty() {
                self.record(
                    file_path,
                    i + 1,
                    "INVALID_DOC_FORMAT",
                    "# Errors section is empty".to_string(),
                );
            }
            for (n, text) in bullets {
                let well_formed = text
                    .strip_prefix("- `")
                    .is_some_and(|rest| rest.contains("` - "));
                // Continuation lines of a wrapped bullet are indented text, not bullets
                if !well_formed && text.starts_with('-') {
                    self.record(
                        file_path,
                        n + 1,
                        "INVALID_DOC_FORMAT",
                        "Use `- `ErrorType` - condition`".to_string(),
                    );
                }
            }
        }
    }

    fn check_dead_code(&mut self, file_path: &Path, content: &str) {
        for (line_num, line) in content.lines().enumerate() {
            if line.trim_start().starts_with("#[allow(dead_code)]") {
                self.record(
                    file_path,
                    line_num + 1,
                    "DEAD_CODE_ALLOWED",
                    "Remove unused code instead of allowing it".to_string(),
                );
            }
        }
    }

    fn check_file(&mut self, file_path: &Path) -> std::io::Result<()> {
        let content = fs::read_to_string(file_path)?;

        self.check_function_prefixes(file_path, &content);
        self.check_type_suffixes(file_path, &content);
        self.check_module_name(file_path);
        self.check_errors_sections(file_path, &content);
        self.check_dead_code(file_path, &content);

        self.files_checked += 1;
        Ok(())
    }

    fn check_workspace(&mut self) -> std::io::Result<()> {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("..");
        let mut files = Vec::new();
        for source in CRATE_SOURCES {
            Self::collect_rust_files(&root.join(source), &mut files)?;
        }
        for file in files {
            self.check_file(&file)?;
        }
        Ok(())
    }

    fn report(&self) -> bool {
        for v in &self.violations {
            println!("{}:{}:{} - {}", v.file_path, v.line_number, v.kind, v.message);
        }
        println!(
            "Files checked: {}, violations: {}",
            self.files_checked,
            self.violations.len()
        );
        self.violations.is_empty()
    }
}

#[test]
fn test_banned_function_prefixes() {
    let mut checker = ConventionChecker::default();
    let code = r#"
impl Relay {
    pub fn get_token(&self) -> u32 { 42 }
    pub async fn set_origin(&mut self) { }
    fn handle_movie(&self) { }
    pub fn getter(&self) -> u32 { 1 }
    fn derive_get_path(&self) { }
    // fn get_commented() {}
}
"#;
    checker.check_function_prefixes(Path::new("relay.rs"), code);

    let kinds: Vec<&str> = checker.violations.iter().map(|v| v.kind).collect();
    assert_eq!(kinds, vec!["BANNED_FUNCTION_PREFIX"; 3]);
    assert_eq!(checker.violations[0].line_number, 3);
}

#[test]
fn test_banned_type_suffixes() {
    let mut checker = ConventionChecker::default();
    let code = r#"
pub struct TokenFactory;
pub struct StreamService { }
struct PlaylistHandler {}
pub enum ConfigManager { A }
pub trait ModuleManager: Send {}
pub struct TokenProvider<T> { inner: T }
"#;
    checker.check_type_suffixes(Path::new("types.rs"), code);

    let names: Vec<&str> = checker
        .violations
        .iter()
        .map(|v| v.message.as_str())
        .collect();
    assert_eq!(names.len(), 4, "{names:?}");
    assert!(!names.iter().any(|m| m.contains("ModuleManager")));
    assert!(!names.iter().any(|m| m.contains("TokenProvider")));
}

#[test]
fn test_generic_module_names() {
    let mut checker = ConventionChecker::default();
    for name in ["utils.rs", "helpers.rs", "policy.rs", "mod.rs", "common.rs"] {
        checker.check_module_name(Path::new(name));
    }
    assert_eq!(checker.violations.len(), 3);
}

#[test]
fn test_errors_section_format() {
    let mut checker = ConventionChecker::default();
    let code = r#"
/// Fetch.
///
/// # Errors
///
/// - `StreamError::Network` - Transport failed
pub fn fetch() {}

/// Broken.
///
/// # Errors
/// Returns an error sometimes
pub fn broken() {}

/// Unformatted.
///
/// # Errors
///
/// - StreamError when it fails
pub fn unformatted() {}
"#;
    checker.check_errors_sections(Path::new("stream.rs"), code);

    let lines: Vec<usize> = checker.violations.iter().map(|v| v.line_number).collect();
    assert_eq!(lines, vec![11, 19]);
}

#[test]
fn test_dead_code_allowance_flagged() {
    let mut checker = ConventionChecker::default();
    checker.check_dead_code(
        Path::new("lib.rs"),
        "#[allow(dead_code)]\nfn unused() {}\n#[allow(clippy::too_many_lines)]\nfn long() {}\n",
    );
    assert_eq!(checker.violations.len(), 1);
}

#[test]
fn test_workspace_follows_conventions() {
    let mut checker = ConventionChecker::default();
    checker
        .check_workspace()
        .expect("Failed to scan workspace sources");

    assert!(checker.files_checked > 0);
    assert!(
        checker.report(),
        "Convention violations found - see output above"
    );
}
