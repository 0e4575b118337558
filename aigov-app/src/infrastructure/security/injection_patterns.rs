use regex_lite::Regex;
use std::sync::OnceLock;

/// A named attack signature. Matching is case-insensitive.
#[derive(Debug, Clone, Copy)]
pub struct InjectionPattern {
    pub name: &'static str,
    pub pattern: &'static str,
}

/// Applied in order, every entry on every scan.
pub const INJECTION_PATTERNS: &[InjectionPattern] = &[
    InjectionPattern {
        name: "role_override_marker",
        pattern: r"(?i)\b(?:system|assistant|developer)\s*:",
    },
    InjectionPattern {
        name: "chat_template_token",
        pattern: r"(?i)<\|[a-z_]*\|>|<</?sys>>|\[/?(?:inst|sys|system)\]",
    },
    InjectionPattern {
        name: "delimiter_confusion",
        pattern: r"(?i)(?:#{3,}|-{3,}|={3,})\s*(?:end\s+of\s+|begin\s+|new\s+)?(?:system|instructions?|prompt|context)\b",
    },
    InjectionPattern {
        name: "code_fence",
        pattern: r"`{3,}|~{3,}",
    },
    InjectionPattern {
        name: "instruction_override",
        pattern: r"(?i)\b(?:ignore|disregard|forget|override|bypass)\s+(?:(?:all|any|the|your|my|of|these|those|every)\s+)*(?:(?:previous|prior|above|earlier|preceding|system|original)\s+)?(?:instructions?|prompts?|rules|directions|guidelines|context|commands?)\b",
    },
    InjectionPattern {
        name: "new_instructions",
        pattern: r"(?i)\bnew\s+(?:instructions?|rules|task)\s*:",
    },
    InjectionPattern {
        name: "role_reassignment",
        pattern: r"(?i)\b(?:you\s+are\s+now|from\s+now\s+on\s+you\s+are|pretend\s+(?:to\s+be|you\s+are)|roleplay\s+as|act\s+as\s+if\s+you)\b",
    },
    InjectionPattern {
        name: "prompt_extraction",
        pattern: r"(?i)\b(?:reveal|show|print|repeat|output|display)\s+(?:me\s+)?(?:your|the)\s+(?:system\s+(?:prompt|message)|(?:initial\s+|hidden\s+|original\s+)?(?:prompt|instructions))\b",
    },
    InjectionPattern {
        name: "jailbreak_mode",
        pattern: r"(?i)\b(?:jailbreak(?:ing|ed)?|dan\s+mode|developer\s+mode|do\s+anything\s+now)\b",
    },
];

pub(crate) fn compiled_patterns() -> &'static [(&'static str, Regex)] {
    static COMPILED: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        INJECTION_PATTERNS
            .iter()
            .map(|p| {
                let re = Regex::new(p.pattern)
                    .unwrap_or_else(|e| panic!("injection pattern {} does not compile: {}", p.name, e));
                (p.name, re)
            })
            .collect()
    })
}
