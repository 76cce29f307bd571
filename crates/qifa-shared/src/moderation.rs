use serde::Serialize;

/// A labelled group of banned terms.
#[derive(Debug, Clone, Copy)]
pub struct ModerationCategory {
    pub label: &'static str,
    pub terms: &'static [&'static str],
}

/// Versioned keyword table. Category order is the match priority.
#[derive(Debug, Clone, Copy)]
pub struct ModerationTable {
    pub version: u32,
    pub categories: &'static [ModerationCategory],
}

pub static DEFAULT_TABLE: ModerationTable = ModerationTable {
    version: 1,
    categories: &[
        ModerationCategory {
            label: "暴力/恐吓",
            terms: &[
                "暴力", "血腥", "杀人", "自杀", "砍人", "炸弹", "tuer", "恐怖", "枪击", "分尸", "虐待",
            ],
        },
        ModerationCategory {
            label: "色情/低俗",
            terms: &[
                "色情", "裸体", "援交", "约炮", "招嫖", "av", "三级片", "淫秽", "sexe", "裸聊", "SM",
            ],
        },
        ModerationCategory {
            label: "非法金融/诈骗",
            terms: &[
                "赌博", "六合彩", "办证", "发票", "刷单", "套现", "高利贷", "洗钱", "换汇", "出u", "出米",
                "面交", "私换",
            ],
        },
        ModerationCategory {
            label: "学术不端",
            terms: &["代写", "代考", "枪手", "保录", "修改成绩", "论文代发", "作弊"],
        },
        ModerationCategory {
            label: "违禁品",
            terms: &["毒品", "大麻", "枪支", "迷药", "海洛因", "drogue", "冰毒", "笑气"],
        },
        ModerationCategory {
            label: "歧视/仇恨",
            terms: &["黑鬼", "阿三", "棒子", "鬼子", "尼哥", "nigger", "negro", "支那"],
        },
        ModerationCategory {
            label: "政治敏感",
            terms: &["法轮功", "台独", "港独", "藏独"],
        },
        ModerationCategory {
            label: "辱骂/人身攻击",
            terms: &[
                "傻逼", "脑残", "尼玛", "去死", "merde", "putain", "connard", "白痴", "智障", "废物", "滚",
            ],
        },
    ],
};

/// Outcome of a content check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "verdict")]
pub enum Verdict {
    Clean,
    Violation { category: String, term: String },
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Clean)
    }

    /// User-facing explanation, `None` when clean.
    pub fn reason(&self) -> Option<String> {
        match self {
            Verdict::Clean => None,
            Verdict::Violation { category, .. } => Some(format!("内容包含【{category}】违规词汇")),
        }
    }
}

#[derive(Debug, Clone)]
struct Term {
    original: &'static str,
    folded: String,
    ascii: bool,
}

#[derive(Debug, Clone)]
struct CompiledCategory {
    label: &'static str,
    terms: Vec<Term>,
}

/// Keyword matcher over a [`ModerationTable`].
///
/// ASCII terms match case-insensitively on ASCII word boundaries, so `av`
/// does not fire inside `have`. Terms with any non-ASCII character match as
/// case-folded substrings, since unsegmented CJK text has no word boundaries.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    version: u32,
    categories: Vec<CompiledCategory>,
}

impl ContentFilter {
    pub fn new(table: &ModerationTable) -> Self {
        let categories = table
            .categories
            .iter()
            .map(|cat| CompiledCategory {
                label: cat.label,
                terms: cat
                    .terms
                    .iter()
                    .map(|t| {
                        let ascii = t.is_ascii();
                        Term {
                            original: t,
                            folded: if ascii { t.to_ascii_lowercase() } else { t.to_lowercase() },
                            ascii,
                        }
                    })
                    .collect(),
            })
            .collect();

        Self {
            version: table.version,
            categories,
        }
    }

    pub fn table_version(&self) -> u32 {
        self.version
    }

    /// Returns the first violation in table order, or `Verdict::Clean`.
    pub fn check(&self, text: &str) -> Verdict {
        if text.is_empty() {
            return Verdict::Clean;
        }

        let ascii_folded = text.to_ascii_lowercase();
        let folded = text.to_lowercase();

        for cat in &self.categories {
            for term in &cat.terms {
                let hit = if term.ascii {
                    contains_word(&ascii_folded, &term.folded)
                } else {
                    folded.contains(&term.folded)
                };
                if hit {
                    return Verdict::Violation {
                        category: cat.label.to_string(),
                        term: term.original.to_string(),
                    };
                }
            }
        }

        Verdict::Clean
    }
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::new(&DEFAULT_TABLE)
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

// `haystack` must be ASCII-lowercased so byte offsets line up with the input.
// Bytes of multi-byte UTF-8 sequences are never word bytes, matching the
// ASCII-only notion of a word boundary.
fn contains_word(haystack: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    let bytes = haystack.as_bytes();
    haystack.match_indices(word).any(|(start, _)| {
        let end = start + word.len();
        let before_ok = start == 0 || !is_word_byte(bytes[start - 1]);
        let after_ok = end >= bytes.len() || !is_word_byte(bytes[end]);
        before_ok && after_ok
    })
}
