use clap::ValueEnum;

/// One category and the keywords that select it
#[derive(Debug)]
pub struct Rule {
    pub category: &'static str,
    pub keywords: &'static [&'static str],
}

/// Ordered keyword rules. Rules are tried in declaration order, keywords
/// within a rule likewise; the first keyword contained in either the app
/// or the title wins.
#[derive(Debug)]
pub struct RuleTable {
    pub rules: &'static [Rule],
    pub fallback: &'static str,
}

pub static GROUPED_RULES: RuleTable = RuleTable {
    rules: &[
        Rule {
            category: "work",
            keywords: &["code", "vscode", "pycharm", "github", "notion", "slack", "teams", "zoom", "jira", "confluence"],
        },
        Rule {
            category: "social",
            keywords: &["discord", "instagram", "whatsapp", "twitter", "facebook", "linkedin", "telegram"],
        },
        Rule {
            category: "entertainment",
            keywords: &["youtube", "netflix", "spotify", "twitch", "gaming", "steam", "epic"],
        },
        Rule {
            category: "browsing",
            keywords: &["chrome", "firefox", "edge", "safari", "browser"],
        },
        Rule {
            category: "writing",
            keywords: &["word", "notepad", "docs", "writing", "document"],
        },
        Rule {
            category: "design",
            keywords: &["photoshop", "figma", "canva", "illustrator", "sketch"],
        },
        Rule {
            category: "productivity",
            keywords: &["calendar", "email", "gmail", "outlook", "trello", "asana"],
        },
    ],
    fallback: "other",
};

pub static FLAT_RULES: RuleTable = RuleTable {
    rules: &[
        Rule { category: "Entertainment", keywords: &["youtube"] },
        Rule { category: "Entertainment", keywords: &["netflix"] },
        Rule { category: "Social", keywords: &["instagram"] },
        Rule { category: "Social", keywords: &["facebook"] },
        Rule { category: "Work", keywords: &["linkedin"] },
        Rule { category: "Work", keywords: &["github"] },
        Rule { category: "Work", keywords: &["stackoverflow"] },
        Rule { category: "Communication", keywords: &["gmail"] },
        Rule { category: "Productivity", keywords: &["notion"] },
        Rule { category: "Research", keywords: &["google"] },
        Rule { category: "AI/Tools", keywords: &["chatgpt"] },
    ],
    fallback: "Other",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RuleSet {
    /// Multi-keyword categories, lowercase labels
    #[default]
    Grouped,
    /// One keyword per rule, capitalised labels
    Flat,
}

impl RuleSet {
    pub fn table(self) -> &'static RuleTable {
        match self {
            RuleSet::Grouped => &GROUPED_RULES,
            RuleSet::Flat => &FLAT_RULES,
        }
    }
}

impl RuleTable {
    /// Case-insensitive substring match, so "code" also matches "encoded".
    pub fn classify(&self, app: &str, title: &str) -> &'static str {
        let app = app.to_lowercase();
        let title = title.to_lowercase();

        self.rules
            .iter()
            .find(|rule| {
                rule.keywords
                    .iter()
                    .any(|keyword| app.contains(keyword) || title.contains(keyword))
            })
            .map(|rule| rule.category)
            .unwrap_or(self.fallback)
    }
}
