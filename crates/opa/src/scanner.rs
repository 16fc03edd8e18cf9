//! Lightweight outline scanning of Rego modules.
//!
//! The engine only needs each module's package and the names of its rules.
//! Rather than parse Rego, the scanner reads rule heads that start at the
//! beginning of a line, which is how `opa fmt` lays modules out.

use regex::Regex;
use std::sync::LazyLock;

static PACKAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*package\s+([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)")
        .expect("package pattern is valid")
});

static RULE_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:default\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*(?:\[|\(|\{|:=|=|\bcontains\b|\bif\b|$)",
    )
    .expect("rule head pattern is valid")
});

const KEYWORDS: &[&str] = &[
    "package", "import", "else", "some", "every", "not", "with", "as", "default", "in",
];

/// The package and rule heads of one Rego module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleOutline {
    /// Package path without the `data.` prefix, e.g. `kubernetes.pods`.
    pub package: String,
    /// Rule names in definition order. A name appears once per definition.
    pub rules: Vec<String>,
}

/// Scan a module's source. Returns `None` when no package is declared.
#[must_use]
pub fn scan_module(source: &str) -> Option<ModuleOutline> {
    let mut package = None;
    let mut rules = Vec::new();

    for line in source.lines() {
        let line = strip_comment(line.trim_end_matches('\r'));

        if package.is_none() {
            if let Some(captures) = PACKAGE.captures(line) {
                package = Some(captures[1].to_string());
                continue;
            }
        }

        let Some(captures) = RULE_HEAD.captures(line) else {
            continue;
        };
        let name = &captures[1];
        if KEYWORDS.contains(&name) {
            continue;
        }
        rules.push(name.to_string());
    }

    let package = package?;
    Some(ModuleOutline { package, rules })
}

fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '\\' if in_string => escaped = !escaped,
            '"' if !escaped => in_string = !in_string,
            '#' if !in_string => return line[..index].trim_end(),
            _ => escaped = false,
        }
    }
    line.trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_classic_module() {
        let source = r#"package main

import data.lib.images

deny[msg] {
  input.kind == "Deployment"
  not input.spec.template.spec.securityContext.runAsNonRoot
  msg := "Containers must not run as root"
}

warn[msg] {
  images.uses_latest(input)
  msg := "avoid the latest tag"
}

deny[msg] {
  input.kind == "Service"
  msg = "no services"
}

is_deployment {
  input.kind == "Deployment"
}
"#;

        let outline = scan_module(source).unwrap();
        assert_eq!(outline.package, "main");
        assert_eq!(outline.rules, vec!["deny", "warn", "deny", "is_deployment"]);
    }

    #[test]
    fn test_scan_v1_syntax() {
        let source = r#"package kubernetes.pods

import rego.v1

default allow := false

deny_privileged contains msg if {
	some container in input.spec.containers
	container.securityContext.privileged
	msg := sprintf("%s is privileged", [container.name])
}

warn_latest contains msg if {
	endswith(input.image, ":latest")
	msg := "latest"
}

exception contains rules if {
	input.metadata.name == "legacy"
	rules := ["privileged"]
}

required_labels := {"app", "team"}

has_label(name) if input.metadata.labels[name]
"#;

        let outline = scan_module(source).unwrap();
        assert_eq!(outline.package, "kubernetes.pods");
        assert_eq!(
            outline.rules,
            vec![
                "allow",
                "deny_privileged",
                "warn_latest",
                "exception",
                "required_labels",
                "has_label"
            ]
        );
    }

    #[test]
    fn test_indented_lines_are_not_rule_heads() {
        let source = "package main\n\ndeny[msg] {\n  x = 1\n  msg := \"x\"\n}\n";
        let outline = scan_module(source).unwrap();
        assert_eq!(outline.rules, vec!["deny"]);
    }

    #[test]
    fn test_comments_are_ignored() {
        let source = "# deny[msg] { true }\npackage main # the main package\n\n# warn[msg] {\ndeny[msg] { # comment\n  msg := \"a # b\"\n}\n";
        let outline = scan_module(source).unwrap();
        assert_eq!(outline.package, "main");
        assert_eq!(outline.rules, vec!["deny"]);
    }

    #[test]
    fn test_missing_package() {
        assert_eq!(scan_module("deny[msg] { true }\n"), None);
    }

    #[test]
    fn test_strip_comment_respects_strings() {
        assert_eq!(strip_comment(r#"msg := "a # b" # c"#), r#"msg := "a # b""#);
        assert_eq!(strip_comment(r#"msg := "a \" # b""#), r#"msg := "a \" # b""#);
        assert_eq!(strip_comment("# whole line"), "");
    }
}
